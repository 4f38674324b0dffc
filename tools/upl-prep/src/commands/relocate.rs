// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

use universal_payload::PlacementInfo;

use super::util::{exit_on_error, print_json, read_input, write_output};
use crate::config_manager::RelocateConfig;

pub fn execute_relocate_command(config: &RelocateConfig) {
    let (blob, info) = relocate_fit(&config.fit, config.load_address);
    write_output(&config.output, &blob);
    print_json(&info);
}

/// Reads the FIT image at `path` and relocates its payload to run with the
/// image loaded at `load_address`.
pub(super) fn relocate_fit(path: &Path, load_address: u64) -> (Vec<u8>, PlacementInfo) {
    let mut blob = read_input(path);
    let mut info = exit_on_error(
        PlacementInfo::from_fit(&blob),
        "Cannot extract the payload placement",
    );
    exit_on_error(
        universal_payload::relocate(&mut blob, &mut info, load_address),
        "Cannot relocate the payload",
    );
    (blob, info)
}
