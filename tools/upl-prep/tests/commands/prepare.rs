// SPDX-License-Identifier: MPL-2.0

use std::fs;

use crate::util::*;

#[test]
fn prepare_relocates_and_builds_trampoline() {
    let dir = work_dir("prepare_relocates_and_builds_trampoline");
    let fit = write_sample_fit(&dir);
    let out = dir.join("relocated.fit");
    let tramp = dir.join("tramp.bin");

    let output = upl_prep(["prepare"])
        .arg(&fit)
        .args([
            "--load-address",
            "0x10000000",
            "--hob-address",
            "0x9000000",
            "--arch",
            "x86_64",
            "-o",
        ])
        .arg(&out)
        .arg("--trampoline")
        .arg(&tramp)
        .output()
        .unwrap();
    assert_success(&output);

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["placement"]["entry-start"], 0x1000_5ac3u64);
    assert_eq!(report["arch"], "x86_64");
    assert_eq!(report["stack-top"], 0x900_2000u64);
    assert_eq!(report["trampoline-len"], 56);

    let relocated = fs::read(&out).unwrap();
    assert_eq!(read_pointer(&relocated), POINTER - LOAD + 0x1000_0000);
    // The trampoline jumps to the relocated entry.
    let tramp = fs::read(&tramp).unwrap();
    assert_eq!(read_u64(&tramp, 48), 0x1000_5ac3);
}

#[test]
fn command_line_overrides_manifest() {
    let dir = work_dir("command_line_overrides_manifest");
    write_sample_fit(&dir);
    fs::write(
        dir.join("UplPrep.toml"),
        "[payload]\n\
         arch = \"x86_64\"\n\
         load-address = 0x20000000\n\
         hob-address = 0x9000000\n",
    )
    .unwrap();

    let output = upl_prep([
        "prepare",
        "upl.fit",
        "--arch",
        "aarch64",
        "--load-address",
        "0x10000000",
        "-o",
        "relocated.fit",
        "--trampoline",
        "tramp.bin",
    ])
    .current_dir(&dir)
    .output()
    .unwrap();
    assert_success(&output);

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["placement"]["load"], 0x1000_0000u64);
    assert_eq!(report["arch"], "aarch64");
    assert_eq!(report["hob-address"], 0x900_0000u64);

    let tramp = fs::read(dir.join("tramp.bin")).unwrap();
    assert_eq!(tramp.len(), 48);
    assert_eq!(read_u64(&tramp, 24), 0x1000_5ac3);
}
