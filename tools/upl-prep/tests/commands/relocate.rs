// SPDX-License-Identifier: MPL-2.0

use std::fs;

use universal_payload::testing::{fit_blob, PeImageBuilder};

use crate::util::*;

const DST: u64 = 0x1000_0000;

#[test]
fn relocate_to_new_address() {
    let dir = work_dir("relocate_to_new_address");
    let fit = write_sample_fit(&dir);
    let out = dir.join("relocated.fit");

    let output = upl_prep(["relocate"])
        .arg(&fit)
        .args(["--load-address", "0x10000000", "-o"])
        .arg(&out)
        .output()
        .unwrap();
    assert_success(&output);

    let info = parse_placement(&output);
    assert_eq!(info.load, DST);
    assert_eq!(info.entry_start, 0x1000_5ac3);

    let relocated = fs::read(&out).unwrap();
    assert_eq!(relocated.len(), sample_fit().len());
    assert_eq!(read_pointer(&relocated), POINTER - IMAGE_BASE + DST + 0x1000);
    // The input is left alone.
    assert_eq!(fs::read(&fit).unwrap(), sample_fit());
}

#[test]
fn relocate_with_manifest() {
    let dir = work_dir("relocate_with_manifest");
    let fit = write_sample_fit(&dir);
    fs::write(
        dir.join("UplPrep.toml"),
        "[payload]\nload-address = 0x10000000\n",
    )
    .unwrap();

    let output = upl_prep(["relocate", "upl.fit", "-o", "relocated.fit"])
        .current_dir(&dir)
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(parse_placement(&output).load, DST);
    assert!(dir.join("relocated.fit").is_file());
    assert!(fit.is_file());
}

#[test]
fn relocate_without_load_address() {
    let dir = work_dir("relocate_without_load_address");
    let fit = write_sample_fit(&dir);

    let output = upl_prep(["relocate"])
        .arg(&fit)
        .arg("-o")
        .arg(dir.join("relocated.fit"))
        .current_dir(&dir)
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains_msg(&output, "load-address");
    assert!(!dir.join("relocated.fit").exists());
}

#[test]
fn relocate_pe32_payload() {
    let dir = work_dir("relocate_pe32_payload");
    let image = PeImageBuilder::new(IMAGE_BASE).pe32().build();
    let fit = dir.join("pe32.fit");
    fs::write(&fit, fit_blob(LOAD, ENTRY, &image)).unwrap();

    let output = upl_prep(["relocate"])
        .arg(&fit)
        .args(["--load-address", "0x10000000", "-o"])
        .arg(dir.join("relocated.fit"))
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains_msg(&output, "unsupported PE optional header format");
}

#[test]
fn reject_bad_manifest() {
    let dir = work_dir("reject_bad_manifest");
    let fit = write_sample_fit(&dir);
    let manifest = dir.join("custom.toml");
    fs::write(&manifest, "[payload]\nload-adress = 0x10000000\n").unwrap();

    let output = upl_prep(["relocate"])
        .arg(&fit)
        .arg("--config")
        .arg(&manifest)
        .arg("-o")
        .arg(dir.join("relocated.fit"))
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains_msg(&output, "Cannot parse TOML file");
}
