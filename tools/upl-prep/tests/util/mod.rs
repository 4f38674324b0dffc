// SPDX-License-Identifier: MPL-2.0

//! The common utils for the integration tests

use std::{
    ffi::OsStr,
    fs::{self, create_dir_all, remove_dir_all},
    path::{Path, PathBuf},
    process::Output,
};

use assert_cmd::Command;
use universal_payload::{
    reloc::{RelocEntry, RelocType},
    testing::{fit_blob, reloc_block, PeImageBuilder, FIT_DATA_OFFSET},
    PlacementInfo,
};

pub const LOAD: u64 = 0x80_0000;
pub const ENTRY: u64 = 0x80_5ac3;
pub const IMAGE_BASE: u64 = LOAD + FIT_DATA_OFFSET as u64;
/// The RVA of the pointer that gets relocated in [`sample_fit`].
pub const POINTER_RVA: u32 = 0x600;
/// The value of that pointer when the image runs at its preferred base.
pub const POINTER: u64 = IMAGE_BASE + 0x400;

pub fn upl_prep<T: AsRef<OsStr>, I: IntoIterator<Item = T>>(args: I) -> Command {
    let mut command = Command::cargo_bin("upl-prep").unwrap();
    command.args(args);
    command
}

/// Creates an empty directory for the files of one test.
pub fn work_dir(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("upl-prep-tests")
        .join(test_name);
    if dir.exists() {
        remove_dir_all(&dir).unwrap();
    }
    create_dir_all(&dir).unwrap();
    dir
}

/// A FIT image whose payload holds one DIR64-relocated pointer at
/// [`POINTER_RVA`].
pub fn sample_fit() -> Vec<u8> {
    let builder = PeImageBuilder::new(IMAGE_BASE)
        .entry_point((ENTRY - LOAD) as u32)
        .section(".text", vec![0xc3; 0x10]);
    assert_eq!(builder.next_rva(), POINTER_RVA);

    let image = builder
        .section(".data", POINTER.to_le_bytes().to_vec())
        .section(
            ".reloc",
            reloc_block(POINTER_RVA, &[RelocEntry::new(RelocType::Dir64, 0)]),
        )
        .build();
    fit_blob(LOAD, ENTRY, &image)
}

/// Writes [`sample_fit`] into `dir` and returns its path.
pub fn write_sample_fit(dir: &Path) -> PathBuf {
    let path = dir.join("upl.fit");
    fs::write(&path, sample_fit()).unwrap();
    path
}

/// Reads the relocated pointer from a blob built from [`sample_fit`].
pub fn read_pointer(blob: &[u8]) -> u64 {
    let offset = (FIT_DATA_OFFSET + POINTER_RVA) as usize;
    read_u64(blob, offset)
}

pub fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap())
}

pub fn parse_placement(output: &Output) -> PlacementInfo {
    serde_json::from_slice(&output.stdout).unwrap()
}

pub fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "Command output {:#?} seems failed, stderr:\n {}",
        output,
        String::from_utf8_lossy(&output.stderr)
    );
}

pub fn assert_failure(output: &Output) {
    assert!(
        !output.status.success(),
        "Command output {:#?} seems succeeded",
        output
    );
}

pub fn assert_stderr_contains_msg(output: &Output, msg: &str) {
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(msg), "stderr does not contain '{}':\n{}", msg, stderr);
}
