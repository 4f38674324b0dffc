// SPDX-License-Identifier: MPL-2.0

//! This module contains subcommands of upl-prep.

mod inspect;
mod phys_bits;
mod prepare;
mod relocate;
mod trampoline;
mod util;

pub use self::{
    inspect::execute_inspect_command, phys_bits::execute_phys_bits_command,
    prepare::execute_prepare_command, relocate::execute_relocate_command,
    trampoline::execute_trampoline_command,
};
