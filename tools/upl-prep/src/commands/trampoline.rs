// SPDX-License-Identifier: MPL-2.0

use super::util::write_output;
use crate::config_manager::TrampolineConfig;

pub fn execute_trampoline_command(config: &TrampolineConfig) {
    log::info!(
        "Building {} trampoline: hob={:#x}, entry={:#x}",
        config.arch,
        config.hob_address,
        config.entry
    );
    let trampoline = config
        .arch
        .build_trampoline(Vec::new(), config.hob_address, config.entry);
    write_output(&config.output, &trampoline);
}
