// SPDX-License-Identifier: MPL-2.0

//! The x86-64 hand-off.
//!
//! The kexec loader cannot set general purpose registers before jumping into
//! the payload, so the trampoline loads them itself from three 64-bit
//! immediates placed right after the code:
//!
//! ```text
//! [0..7)    mov rax, qword ptr [rip + 0x19]
//! [7..10)   mov rsp, rax
//! [10..17)  mov rax, qword ptr [rip + 0x17]
//! [17..20)  mov rcx, rax
//! [20..27)  mov rax, qword ptr [rip + 0x15]
//! [27..29)  jmp rax
//! [29..32)  padding
//! [32..40)  stack top
//! [40..48)  HOB address
//! [48..56)  entry point
//! ```

use std::{
    fs::File,
    io::{BufRead, BufReader},
};

use lazy_static::lazy_static;
use regex::Regex;

use super::TRAMPOLINE_STACK_TOP_OFFSET;
use crate::error::{Error, Result};

pub const TRAMPOLINE_LEN: usize = 56;

const TRAMPOLINE_CODE: [u8; 32] = [
    0x48, 0x8b, 0x05, 0x19, 0x00, 0x00, 0x00, // mov rax, [rip + 0x19]
    0x48, 0x89, 0xc4, // mov rsp, rax
    0x48, 0x8b, 0x05, 0x17, 0x00, 0x00, 0x00, // mov rax, [rip + 0x17]
    0x48, 0x89, 0xc1, // mov rcx, rax
    0x48, 0x8b, 0x05, 0x15, 0x00, 0x00, 0x00, // mov rax, [rip + 0x15]
    0xff, 0xe0, // jmp rax
    0x00, 0x00, 0x00, // padding
];

/// Appends the trampoline to `buf`.
///
/// The payload is entered with `rcx` holding `hob_addr` and `rsp` pointing
/// [`TRAMPOLINE_STACK_TOP_OFFSET`] bytes above it.
pub fn build_trampoline(mut buf: Vec<u8>, hob_addr: u64, entry: u64) -> Vec<u8> {
    let stack_top = hob_addr.wrapping_add(TRAMPOLINE_STACK_TOP_OFFSET);

    buf.reserve(TRAMPOLINE_LEN);
    buf.extend_from_slice(&TRAMPOLINE_CODE);
    buf.extend_from_slice(&stack_top.to_le_bytes());
    buf.extend_from_slice(&hob_addr.to_le_bytes());
    buf.extend_from_slice(&entry.to_le_bytes());
    buf
}

const CPUINFO_PATH: &str = "/proc/cpuinfo";

lazy_static! {
    // E.g., "address sizes	: 39 bits physical, 48 bits virtual".
    static ref ADDRESS_SIZES: Regex =
        Regex::new(r"address sizes\s*:\s*(\d+)\s+bits physical,\s*(\d+)\s+bits virtual").unwrap();
}

/// Returns the physical address width of the host CPU, as reported by
/// `/proc/cpuinfo`.
pub fn physical_address_bits() -> Result<u8> {
    let file = File::open(CPUINFO_PATH).map_err(|err| {
        Error::AddressInfoReadFailure(format!("failed to open {}: {}", CPUINFO_PATH, err))
    })?;
    parse_physical_address_bits(BufReader::new(file))
}

/// Scans `reader` line by line for the first `address sizes` line and
/// returns the physical address width in it.
pub fn parse_physical_address_bits<R: BufRead>(reader: R) -> Result<u8> {
    for line in reader.lines() {
        let line = line.map_err(|err| Error::AddressInfoReadFailure(err.to_string()))?;
        let Some(caps) = ADDRESS_SIZES.captures(&line) else {
            continue;
        };
        let bits = caps[1]
            .parse::<u8>()
            .map_err(|err| Error::AddressInfoConversion(format!("'{}': {}", &caps[1], err)))?;
        log::debug!("Physical address width: {} bits", bits);
        return Ok(bits);
    }

    Err(Error::AddressInfoNotFound)
}
