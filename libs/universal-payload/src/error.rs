// SPDX-License-Identifier: MPL-2.0

use core::{fmt, mem::size_of};

pub type Result<T> = core::result::Result<T, Error>;

/// The errors of preparing a Universal Payload.
///
/// Each variant names the stage that failed, and where relevant the node,
/// property or address involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The FIT blob cannot be read or is not a flattened device tree.
    BlobReadFailure(String),
    NodeNotFound(FitNode),
    PropertyNotFound(FitProperty),
    /// The property exists but its value has the wrong width.
    PropertyConversion(FitProperty, PropertyDecodeError),
    /// The embedded image does not carry a parsable PE header, or its byte
    /// range lies outside of the blob.
    UnsupportedImageFormat,
    /// The optional header is not the PE32+ one.
    UnsupportedHeaderLayout,
    /// The raw data of a `.reloc` section lies outside of the image.
    RelocSectionReadFailure,
    /// The relocation directory ends inside a block header, or a block
    /// header declares a size smaller than the header itself.
    MalformedRelocationHeader,
    /// The relocation directory ends inside the entries of a block.
    MalformedRelocationEntry,
    /// A 64-bit fixup at `addr` does not fit in an image of `image_len` bytes.
    RelocationOutOfBounds { addr: u64, image_len: usize },
    AddressInfoNotFound,
    AddressInfoReadFailure(String),
    AddressInfoConversion(String),
    /// A HOB buffer of `buf_len` bytes cannot be padded to `expect_len` bytes.
    AlignmentRangeError { expect_len: u64, buf_len: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BlobReadFailure(reason) => write!(f, "failed to read FIT blob: {}", reason),
            Error::NodeNotFound(node) => write!(f, "failed to find '{}' node", node),
            Error::PropertyNotFound(prop) => write!(f, "failed to find '{}' property", prop),
            Error::PropertyConversion(prop, err) => write!(
                f,
                "failed to convert property '{}' to u{}: {}",
                prop,
                prop.cell_width() * 8,
                err
            ),
            Error::UnsupportedImageFormat => write!(f, "failed to parse the PE image"),
            Error::UnsupportedHeaderLayout => write!(f, "unsupported PE optional header format"),
            Error::RelocSectionReadFailure => write!(f, "failed to read .reloc section data"),
            Error::MalformedRelocationHeader => {
                write!(f, "truncated or malformed relocation block header")
            }
            Error::MalformedRelocationEntry => write!(f, "truncated relocation block entries"),
            Error::RelocationOutOfBounds { addr, image_len } => write!(
                f,
                "relocation address {:#x} out of bounds of the {:#x}-byte image",
                addr, image_len
            ),
            Error::AddressInfoNotFound => write!(f, "'address sizes' information not found"),
            Error::AddressInfoReadFailure(reason) => {
                write!(f, "failed to read 'address sizes': {}", reason)
            }
            Error::AddressInfoConversion(reason) => {
                write!(f, "failed to convert physical bits size: {}", reason)
            }
            Error::AlignmentRangeError {
                expect_len,
                buf_len,
            } => write!(
                f,
                "cannot pad a {}-byte buffer to {} bytes",
                buf_len, expect_len
            ),
        }
    }
}

impl std::error::Error for Error {}

/// The device tree nodes on the path to the payload description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitNode {
    Images,
    Tianocore,
}

impl FitNode {
    pub fn name(&self) -> &'static str {
        match self {
            FitNode::Images => "images",
            FitNode::Tianocore => "tianocore",
        }
    }
}

impl fmt::Display for FitNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The properties of the `tianocore` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitProperty {
    Load,
    EntryStart,
    DataOffset,
    DataSize,
}

impl FitProperty {
    pub fn name(&self) -> &'static str {
        match self {
            FitProperty::Load => "load",
            FitProperty::EntryStart => "entry-start",
            FitProperty::DataOffset => "data-offset",
            FitProperty::DataSize => "data-size",
        }
    }

    /// The width in bytes of the big-endian cell holding the value.
    pub fn cell_width(&self) -> usize {
        match self {
            FitProperty::Load | FitProperty::EntryStart => size_of::<u64>(),
            FitProperty::DataOffset | FitProperty::DataSize => size_of::<u32>(),
        }
    }
}

impl fmt::Display for FitProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A property value that cannot be decoded as a big-endian integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDecodeError {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for PropertyDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected a {}-byte value, found {} bytes",
            self.expected, self.actual
        )
    }
}
