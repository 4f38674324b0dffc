// SPDX-License-Identifier: MPL-2.0

use serde::Serialize;
use universal_payload::{Arch, PlacementInfo, TRAMPOLINE_STACK_TOP_OFFSET};

use super::{
    relocate::relocate_fit,
    util::{print_json, write_output},
};
use crate::config_manager::PrepareConfig;

/// What `prepare` prints once both files are written.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct PrepareReport {
    placement: PlacementInfo,
    arch: Arch,
    hob_address: u64,
    stack_top: u64,
    trampoline_len: usize,
}

pub fn execute_prepare_command(config: &PrepareConfig) {
    let (blob, info) = relocate_fit(&config.fit, config.load_address);
    let trampoline = config
        .arch
        .build_trampoline(Vec::new(), config.hob_address, info.entry_start);

    write_output(&config.output, &blob);
    write_output(&config.trampoline, &trampoline);

    print_json(&PrepareReport {
        placement: info,
        arch: config.arch,
        hob_address: config.hob_address,
        stack_top: config.hob_address.wrapping_add(TRAMPOLINE_STACK_TOP_OFFSET),
        trampoline_len: trampoline.len(),
    });
}
