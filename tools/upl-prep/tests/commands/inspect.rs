// SPDX-License-Identifier: MPL-2.0

use std::fs;

use universal_payload::{testing::FIT_DATA_OFFSET, PlacementInfo};

use crate::util::*;

#[test]
fn inspect_prints_placement() {
    let dir = work_dir("inspect_prints_placement");
    let fit = write_sample_fit(&dir);

    let output = upl_prep(["inspect"]).arg(&fit).output().unwrap();
    assert_success(&output);

    let info = parse_placement(&output);
    assert_eq!(
        info,
        PlacementInfo {
            load: LOAD,
            entry_start: ENTRY,
            data_offset: FIT_DATA_OFFSET,
            data_size: (sample_fit().len() - FIT_DATA_OFFSET as usize) as u32,
        }
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"entry-start\""));
}

#[test]
fn inspect_missing_file() {
    let dir = work_dir("inspect_missing_file");
    let output = upl_prep(["inspect"]).arg(dir.join("none.fit")).output().unwrap();
    assert_failure(&output);
    assert_stderr_contains_msg(&output, "Cannot read file");
}

#[test]
fn inspect_not_a_fit() {
    let dir = work_dir("inspect_not_a_fit");
    let fit = dir.join("garbage.fit");
    fs::write(&fit, [0x5a; 0x100]).unwrap();

    let output = upl_prep(["inspect"]).arg(&fit).output().unwrap();
    assert_failure(&output);
    assert_stderr_contains_msg(&output, "failed to read FIT blob");
}
