// SPDX-License-Identifier: MPL-2.0

//! Architecture-specific parts: the hand-off trampolines and the probe of
//! the host physical address width.

pub mod aarch64;
pub mod x86_64;

use core::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

/// The distance from the HOB address to the top of the stack that the
/// trampoline sets up. The stack grows down into the HOB region.
pub const TRAMPOLINE_STACK_TOP_OFFSET: u64 = 0x2000;

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        pub use self::x86_64::physical_address_bits;
    } else if #[cfg(target_arch = "aarch64")] {
        pub use self::aarch64::physical_address_bits;
    } else {
        /// The host architecture has no known way to tell its physical
        /// address width.
        pub fn physical_address_bits() -> crate::Result<u8> {
            Err(crate::Error::AddressInfoNotFound)
        }
    }
}

/// The instruction set architectures a payload can be handed off on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arch {
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "aarch64")]
    Aarch64,
}

impl Arch {
    /// The architecture this crate is compiled for, if it is supported.
    pub fn host() -> Option<Arch> {
        if cfg!(target_arch = "x86_64") {
            Some(Arch::X86_64)
        } else if cfg!(target_arch = "aarch64") {
            Some(Arch::Aarch64)
        } else {
            None
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
        }
    }

    /// The length in bytes of the trampoline for this architecture.
    pub fn trampoline_len(&self) -> usize {
        match self {
            Arch::X86_64 => x86_64::TRAMPOLINE_LEN,
            Arch::Aarch64 => aarch64::TRAMPOLINE_LEN,
        }
    }

    /// Appends the trampoline that jumps to `entry` with `hob_addr` as the
    /// hand-off argument to `buf`.
    pub fn build_trampoline(self, buf: Vec<u8>, hob_addr: u64, entry: u64) -> Vec<u8> {
        match self {
            Arch::X86_64 => x86_64::build_trampoline(buf, hob_addr, entry),
            Arch::Aarch64 => aarch64::build_trampoline(buf, hob_addr, entry),
        }
    }
}

impl Display for Arch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchParseError(String);

impl Display for ArchParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unsupported architecture '{}', expected 'x86_64' or 'aarch64'",
            self.0
        )
    }
}

impl std::error::Error for ArchParseError {}

impl FromStr for Arch {
    type Err = ArchParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x86_64" | "x86-64" | "amd64" => Ok(Arch::X86_64),
            "aarch64" | "arm64" => Ok(Arch::Aarch64),
            other => Err(ArchParseError(other.to_string())),
        }
    }
}
