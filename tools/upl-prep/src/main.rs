// SPDX-License-Identifier: MPL-2.0

#![forbid(unsafe_code)]

mod cli;
mod commands;
mod config_manager;
mod error;

fn main() {
    cli::main();
}
