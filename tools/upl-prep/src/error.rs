// SPDX-License-Identifier: MPL-2.0

use universal_payload::Error;

/// The exit codes of `upl-prep`, one per class of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Errno {
    GetManifest = 1,
    ParseManifest = 2,
    MissingArgument = 3,
    ReadInput = 4,
    ExtractPlacement = 5,
    Relocate = 6,
    WriteOutput = 7,
    ProbeCpu = 8,
    AlignHob = 9,
}

impl From<&Error> for Errno {
    fn from(err: &Error) -> Self {
        match err {
            Error::BlobReadFailure(_)
            | Error::NodeNotFound(_)
            | Error::PropertyNotFound(_)
            | Error::PropertyConversion(..) => Errno::ExtractPlacement,
            Error::UnsupportedImageFormat
            | Error::UnsupportedHeaderLayout
            | Error::RelocSectionReadFailure
            | Error::MalformedRelocationHeader
            | Error::MalformedRelocationEntry
            | Error::RelocationOutOfBounds { .. } => Errno::Relocate,
            Error::AddressInfoNotFound
            | Error::AddressInfoReadFailure(_)
            | Error::AddressInfoConversion(_) => Errno::ProbeCpu,
            Error::AlignmentRangeError { .. } => Errno::AlignHob,
        }
    }
}

/// Print error message to console
#[macro_export]
macro_rules! error_msg {
    () => {
        std::eprint!("")
    };
    ($($arg:tt)*) => {{
        std::eprint!("[Error]: ");
        std::eprint!($($arg)*);
        std::eprint!("\n")
    }};
}

/// Print warning message to console
#[macro_export]
macro_rules! warn_msg {
    () => {
        std::eprint!("")
    };
    ($($arg:tt)*) => {{
        std::eprint!("[Warn]: ");
        std::eprint!($($arg)*);
        std::eprint!("\n")
    }};
}
