// SPDX-License-Identifier: MPL-2.0

//! Preparation of a UEFI Universal Payload (UPL) for a kexec hand-off.
//!
//! A Universal Payload is shipped as a Flattened Image Tree (FIT): a device
//! tree blob sits at the start of the file and describes where the embedded
//! PE32+ image lives in the file and where it wants to be loaded. Getting it
//! ready for kexec takes three steps:
//!
//! 1. read the placement metadata from the `/images/tianocore` node
//!    ([`PlacementInfo`]);
//! 2. apply the base relocations of the embedded image for the address it
//!    will actually run at ([`relocate`]);
//! 3. emit a small trampoline that sets up a stack and the hand-off block
//!    argument before jumping to the relocated entry ([`Arch::build_trampoline`]).
//!
//! # Example
//!
//! ```no_run
//! use universal_payload::{relocate, Arch, PlacementInfo};
//!
//! let mut blob = std::fs::read("upl.fit").unwrap();
//! let mut info = PlacementInfo::from_fit(&blob).unwrap();
//! relocate(&mut blob, &mut info, 0x1000_0000).unwrap();
//!
//! let hob_addr = 0x900_0000;
//! let trampoline = Arch::X86_64.build_trampoline(Vec::new(), hob_addr, info.entry_start);
//! assert_eq!(trampoline.len(), 56);
//! ```

#![forbid(unsafe_code)]

pub mod arch;
pub mod error;
pub mod fit;
pub mod hob;
pub mod pe;
pub mod reloc;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use self::{
    arch::{physical_address_bits, Arch, TRAMPOLINE_STACK_TOP_OFFSET},
    error::{Error, Result},
    fit::PlacementInfo,
    hob::align_hob_length,
    reloc::relocate,
};
