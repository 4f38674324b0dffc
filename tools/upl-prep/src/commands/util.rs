// SPDX-License-Identifier: MPL-2.0

use std::{fs, path::Path, process};

use serde::Serialize;

use crate::{error::Errno, error_msg};

/// Reads the whole file at `path`, or exits.
pub fn read_input(path: &Path) -> Vec<u8> {
    fs::read(path).unwrap_or_else(|err| {
        error_msg!("Cannot read file {}: {}", path.display(), err);
        process::exit(Errno::ReadInput as _);
    })
}

/// Writes `bytes` to the file at `path`, or exits.
pub fn write_output(path: &Path, bytes: &[u8]) {
    if let Err(err) = fs::write(path, bytes) {
        error_msg!("Cannot write file {}: {}", path.display(), err);
        process::exit(Errno::WriteOutput as _);
    }
    log::info!("Wrote {} bytes to {}", bytes.len(), path.display());
}

/// Unwraps the result of a library call, or exits with the code matching
/// the error.
pub fn exit_on_error<T>(result: universal_payload::Result<T>, context: &str) -> T {
    result.unwrap_or_else(|err| {
        error_msg!("{}: {}", context, err);
        process::exit(Errno::from(&err) as _);
    })
}

/// Prints `value` to the standard output as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(err) => {
            error_msg!("Cannot serialize the output: {}", err);
            process::exit(Errno::WriteOutput as _);
        }
    }
}
