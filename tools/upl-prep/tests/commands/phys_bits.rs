// SPDX-License-Identifier: MPL-2.0

use crate::util::*;

fn probe() -> Option<u8> {
    let output = upl_prep(["phys-bits"]).output().unwrap();
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout).trim().parse().ok()
}

#[cfg(target_arch = "aarch64")]
#[test]
fn phys_bits_placeholder() {
    assert_eq!(probe(), Some(44));
}

#[cfg(target_arch = "x86_64")]
#[test]
fn phys_bits_from_cpuinfo() {
    use std::{fs::File, io::BufReader};

    use universal_payload::arch::x86_64::parse_physical_address_bits;

    // Some sandboxes hide `/proc/cpuinfo` or strip the line.
    let Ok(cpuinfo) = File::open("/proc/cpuinfo") else {
        return;
    };
    let Ok(expected) = parse_physical_address_bits(BufReader::new(cpuinfo)) else {
        return;
    };
    assert_eq!(probe(), Some(expected));
}
