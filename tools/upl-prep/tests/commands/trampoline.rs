// SPDX-License-Identifier: MPL-2.0

use std::fs;

use crate::util::*;

#[test]
fn x86_64_trampoline() {
    let dir = work_dir("x86_64_trampoline");
    let out = dir.join("tramp.bin");

    let output = upl_prep([
        "trampoline",
        "--arch",
        "x86_64",
        "--hob-address",
        "0x9000000",
        "--entry",
        "0x10005ac3",
        "-o",
    ])
    .arg(&out)
    .output()
    .unwrap();
    assert_success(&output);

    let tramp = fs::read(&out).unwrap();
    assert_eq!(tramp.len(), 56);
    assert_eq!(read_u64(&tramp, 32), 0x900_2000);
    assert_eq!(read_u64(&tramp, 40), 0x900_0000);
    assert_eq!(read_u64(&tramp, 48), 0x1000_5ac3);
}

#[test]
fn aarch64_trampoline_from_manifest() {
    let dir = work_dir("aarch64_trampoline_from_manifest");
    let manifest = dir.join("board.toml");
    fs::write(
        &manifest,
        "[payload]\narch = \"aarch64\"\nhob-address = 0x40000000\n",
    )
    .unwrap();
    let out = dir.join("tramp.bin");

    let output = upl_prep(["trampoline", "--entry", "0x40105ac3", "--config"])
        .arg(&manifest)
        .arg("-o")
        .arg(&out)
        .output()
        .unwrap();
    assert_success(&output);

    let tramp = fs::read(&out).unwrap();
    assert_eq!(tramp.len(), 48);
    assert_eq!(&tramp[..4], &0x580000c4u32.to_le_bytes());
    assert_eq!(read_u64(&tramp, 24), 0x4010_5ac3);
    assert_eq!(read_u64(&tramp, 32), 0x4000_0000);
    assert_eq!(read_u64(&tramp, 40), 0x4000_2000);
}

#[test]
fn trampoline_without_hob_address() {
    let dir = work_dir("trampoline_without_hob_address");

    let output = upl_prep(["trampoline", "--arch", "x86_64", "--entry", "0x1000", "-o"])
        .arg(dir.join("tramp.bin"))
        .current_dir(&dir)
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains_msg(&output, "hob-address");
}

#[test]
fn trampoline_missing_manifest() {
    let dir = work_dir("trampoline_missing_manifest");

    let output = upl_prep(["trampoline", "--entry", "0x1000", "--config"])
        .arg(dir.join("none.toml"))
        .arg("-o")
        .arg(dir.join("tramp.bin"))
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains_msg(&output, "Cannot read file");
}
