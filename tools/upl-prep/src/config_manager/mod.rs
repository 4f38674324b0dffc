// SPDX-License-Identifier: MPL-2.0

//! This module combines the optional manifest `UplPrep.toml` with the
//! command-line arguments, the latter taking precedence, to obtain the final
//! configuration of the `relocate`, `trampoline` and `prepare` subcommands.

pub mod manifest;


use std::{
    fs,
    path::{Path, PathBuf},
    process,
};

use universal_payload::Arch;

use self::manifest::{PayloadSettings, TomlManifest};
use crate::{
    cli::{PrepareArgs, RelocateArgs, TrampolineArgs},
    error::Errno,
    error_msg, warn_msg,
};

pub const MANIFEST_FILE_NAME: &str = "UplPrep.toml";

/// Configurations for relocate subcommand
#[derive(Debug)]
pub struct RelocateConfig {
    pub fit: PathBuf,
    pub load_address: u64,
    pub output: PathBuf,
}

impl RelocateConfig {
    pub fn parse(manifest_path: Option<&Path>, args: &RelocateArgs) -> Self {
        let settings = merge_settings(
            manifest_path,
            &PayloadSettings {
                load_address: args.load_address,
                ..Default::default()
            },
        );
        Self {
            fit: args.fit.clone(),
            load_address: require(settings.load_address, "load-address"),
            output: args.output.clone(),
        }
    }
}

/// Configurations for trampoline subcommand
#[derive(Debug)]
pub struct TrampolineConfig {
    pub arch: Arch,
    pub hob_address: u64,
    pub entry: u64,
    pub output: PathBuf,
}

impl TrampolineConfig {
    pub fn parse(manifest_path: Option<&Path>, args: &TrampolineArgs) -> Self {
        let settings = merge_settings(
            manifest_path,
            &PayloadSettings {
                arch: args.arch_args.arch,
                hob_address: args.hob_address,
                ..Default::default()
            },
        );
        Self {
            arch: require_arch(settings.arch),
            hob_address: require(settings.hob_address, "hob-address"),
            entry: args.entry,
            output: args.output.clone(),
        }
    }
}

/// Configurations for prepare subcommand
#[derive(Debug)]
pub struct PrepareConfig {
    pub fit: PathBuf,
    pub arch: Arch,
    pub load_address: u64,
    pub hob_address: u64,
    pub output: PathBuf,
    pub trampoline: PathBuf,
}

impl PrepareConfig {
    pub fn parse(manifest_path: Option<&Path>, args: &PrepareArgs) -> Self {
        let settings = merge_settings(
            manifest_path,
            &PayloadSettings {
                arch: args.arch_args.arch,
                load_address: args.load_address,
                hob_address: args.hob_address,
            },
        );
        Self {
            fit: args.fit.clone(),
            arch: require_arch(settings.arch),
            load_address: require(settings.load_address, "load-address"),
            hob_address: require(settings.hob_address, "hob-address"),
            output: args.output.clone(),
            trampoline: args.trampoline.clone(),
        }
    }
}

fn merge_settings(manifest_path: Option<&Path>, cli_settings: &PayloadSettings) -> PayloadSettings {
    let mut settings = load_manifest(manifest_path).payload;
    settings.apply(cli_settings);
    log::debug!("Payload settings: {:?}", settings);
    settings
}

/// Loads the manifest at `path`, or `UplPrep.toml` in the current directory
/// if no path is given. Only the explicitly given manifest must exist.
fn load_manifest(path: Option<&Path>) -> TomlManifest {
    let manifest_path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default_path = PathBuf::from(MANIFEST_FILE_NAME);
            if !default_path.is_file() {
                return TomlManifest::default();
            }
            default_path
        }
    };

    let Ok(contents) = fs::read_to_string(&manifest_path) else {
        error_msg!("Cannot read file {}", manifest_path.display());
        process::exit(Errno::GetManifest as _);
    };
    let manifest = parse_manifest(&contents).unwrap_or_else(|err| {
        error_msg!(
            "Cannot parse TOML file {}:\n{}",
            manifest_path.display(),
            err
        );
        process::exit(Errno::ParseManifest as _);
    });
    if manifest.payload == PayloadSettings::default() {
        warn_msg!(
            "{} has no settings in its `payload` table",
            manifest_path.display()
        );
    }
    log::debug!("Loaded manifest {}", manifest_path.display());
    manifest
}

fn parse_manifest(contents: &str) -> Result<TomlManifest, toml::de::Error> {
    toml::from_str(contents)
}

fn require(value: Option<u64>, key: &str) -> u64 {
    value.unwrap_or_else(|| {
        error_msg!(
            "`--{}` is not given on the command line nor as `payload.{}` in the manifest",
            key,
            key
        );
        process::exit(Errno::MissingArgument as _);
    })
}

fn require_arch(arch: Option<Arch>) -> Arch {
    arch.or_else(Arch::host).unwrap_or_else(|| {
        error_msg!("The host architecture is not supported, please specify `--arch`");
        process::exit(Errno::MissingArgument as _);
    })
}
