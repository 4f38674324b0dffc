// SPDX-License-Identifier: MPL-2.0

//! The AArch64 hand-off.
//!
//! The payload expects the HOB address in `x0`, `x1` cleared and a usable
//! stack, none of which kexec sets up. The trampoline loads them from
//! PC-relative literals:
//!
//! ```text
//! [0..4)    ldr x4, #0x18      // entry
//! [4..8)    ldr x0, #0x1c      // HOB address
//! [8..12)   mov x1, xzr
//! [12..16)  ldr x2, #0x1c      // stack top
//! [16..20)  mov sp, x2
//! [20..24)  br  x4
//! [24..32)  entry point
//! [32..40)  HOB address
//! [40..48)  stack top
//! ```

use super::TRAMPOLINE_STACK_TOP_OFFSET;
use crate::error::Result;

pub const TRAMPOLINE_LEN: usize = 48;

const TRAMPOLINE_CODE: [u32; 6] = [
    0x580000c4, // ldr x4, #0x18
    0x580000e0, // ldr x0, #0x1c
    0xaa1f03e1, // mov x1, xzr
    0x580000e2, // ldr x2, #0x1c
    0x9100005f, // mov sp, x2
    0xd61f0080, // br  x4
];

/// Appends the trampoline to `buf`.
pub fn build_trampoline(mut buf: Vec<u8>, hob_addr: u64, entry: u64) -> Vec<u8> {
    let stack_top = hob_addr.wrapping_add(TRAMPOLINE_STACK_TOP_OFFSET);

    buf.reserve(TRAMPOLINE_LEN);
    for insn in TRAMPOLINE_CODE {
        buf.extend_from_slice(&insn.to_le_bytes());
    }
    for literal in [entry, hob_addr, stack_top] {
        // Low word first, which is the little-endian layout of the u64.
        buf.extend_from_slice(&(literal as u32).to_le_bytes());
        buf.extend_from_slice(&((literal >> 32) as u32).to_le_bytes());
    }
    buf
}

/// The physical address width reported on AArch64 hosts.
///
/// Linux does not expose the width in `/proc/cpuinfo` on AArch64, so this is
/// a fixed value wide enough for the platforms payloads are booted on.
// TODO: Derive the width from ID_AA64MMFR0_EL1.PARange, which Linux exposes
// through the `/sys/devices/system/cpu/cpu0/regs/identification` registers.
pub const PLACEHOLDER_PHYSICAL_ADDRESS_BITS: u8 = 44;

pub fn physical_address_bits() -> Result<u8> {
    Ok(PLACEHOLDER_PHYSICAL_ADDRESS_BITS)
}

#[cfg(test)]
mod test {
    use super::*;

    fn read_u64(bytes: &[u8], offset: usize) -> u64 {
        u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap())
    }

    fn word(bytes: &[u8], index: usize) -> u32 {
        u32::from_le_bytes(bytes[index * 4..index * 4 + 4].try_into().unwrap())
    }

    #[test]
    fn trampoline_layout() {
        let tramp = build_trampoline(Vec::new(), 0x9_0000_0000, 0x1_1000_5ac3);

        assert_eq!(tramp.len(), TRAMPOLINE_LEN);
        for (i, insn) in TRAMPOLINE_CODE.iter().enumerate() {
            assert_eq!(word(&tramp, i), *insn);
        }
        assert_eq!(read_u64(&tramp, 24), 0x1_1000_5ac3);
        assert_eq!(read_u64(&tramp, 32), 0x9_0000_0000);
        assert_eq!(read_u64(&tramp, 40), 0x9_0000_2000);
        // The high words are stored after the low ones.
        assert_eq!(word(&tramp, 7), 0x1);
        assert_eq!(word(&tramp, 9), 0x9);
    }

    #[test]
    fn literal_loads_hit_immediates() {
        // LDR (literal): the word offset from the instruction is in bits 5..24.
        let loads = [(0, 24), (1, 32), (3, 40)];
        for (index, target) in loads {
            let imm19 = (TRAMPOLINE_CODE[index] >> 5) & 0x7ffff;
            assert_eq!(index * 4 + imm19 as usize * 4, target);
        }
    }

    #[test]
    fn trampoline_is_deterministic() {
        let a = build_trampoline(Vec::new(), 0x4000_0000, 0x4010_0000);
        let b = build_trampoline(Vec::new(), 0x4000_0000, 0x4010_0000);
        assert_eq!(a, b);
    }

    #[test]
    fn placeholder_width() {
        assert_eq!(physical_address_bits(), Ok(44));
    }
}
