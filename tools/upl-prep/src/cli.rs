// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use clap::{crate_version, Args, Parser};
use universal_payload::Arch;

use crate::{
    commands::{
        execute_inspect_command, execute_phys_bits_command, execute_prepare_command,
        execute_relocate_command, execute_trampoline_command,
    },
    config_manager::{PrepareConfig, RelocateConfig, TrampolineConfig},
};

pub fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let config_path = cli.config.as_deref();
    match &cli.command {
        UplSubcommand::Inspect(args) => execute_inspect_command(args),
        UplSubcommand::Relocate(args) => {
            let config = RelocateConfig::parse(config_path, args);
            execute_relocate_command(&config);
        }
        UplSubcommand::Trampoline(args) => {
            let config = TrampolineConfig::parse(config_path, args);
            execute_trampoline_command(&config);
        }
        UplSubcommand::Prepare(args) => {
            let config = PrepareConfig::parse(config_path, args);
            execute_prepare_command(&config);
        }
        UplSubcommand::PhysBits => execute_phys_bits_command(),
    }
}

fn init_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let env = env_logger::Env::default().default_filter_or(default_filter);
    // A logger installed by the embedding process is kept.
    let _ = env_logger::Builder::from_env(env).try_init();
}

#[derive(Debug, Parser)]
#[command(name = "upl-prep", version = crate_version!())]
/// Prepare a FIT-packaged UEFI Universal Payload for a kexec hand-off
pub struct Cli {
    #[command(subcommand)]
    command: UplSubcommand,
    #[arg(
        short,
        long,
        global = true,
        help = "Log debug messages unless RUST_LOG says otherwise"
    )]
    verbose: bool,
    #[arg(
        long,
        global = true,
        help = "Path of the manifest, `UplPrep.toml` in the current directory by default",
        value_name = "PATH"
    )]
    config: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub enum UplSubcommand {
    #[command(about = "Print the placement metadata of a FIT image as JSON")]
    Inspect(InspectArgs),
    #[command(about = "Relocate the payload of a FIT image to a new load address")]
    Relocate(RelocateArgs),
    #[command(about = "Emit the trampoline that jumps to a payload entry")]
    Trampoline(TrampolineArgs),
    #[command(about = "Relocate a FIT image and emit the trampoline for its new entry")]
    Prepare(PrepareArgs),
    #[command(about = "Print the physical address width of the host CPU")]
    PhysBits,
}

#[derive(Debug, Parser)]
pub struct InspectArgs {
    #[arg(name = "FIT", help = "Path of the FIT image")]
    pub fit: PathBuf,
}

#[derive(Debug, Parser)]
pub struct RelocateArgs {
    #[arg(name = "FIT", help = "Path of the FIT image")]
    pub fit: PathBuf,
    #[arg(
        long,
        help = "Address the FIT image will be loaded at",
        value_name = "ADDR",
        value_parser = parse_address
    )]
    pub load_address: Option<u64>,
    #[arg(short, long, help = "Path of the relocated FIT image", value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(Debug, Parser)]
pub struct TrampolineArgs {
    #[arg(
        long,
        help = "Address of the hand-off blocks",
        value_name = "ADDR",
        value_parser = parse_address
    )]
    pub hob_address: Option<u64>,
    #[arg(
        long,
        help = "Entry point to jump to",
        value_name = "ADDR",
        value_parser = parse_address
    )]
    pub entry: u64,
    #[command(flatten)]
    pub arch_args: ArchArgs,
    #[arg(short, long, help = "Path of the trampoline", value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(Debug, Parser)]
pub struct PrepareArgs {
    #[arg(name = "FIT", help = "Path of the FIT image")]
    pub fit: PathBuf,
    #[arg(
        long,
        help = "Address the FIT image will be loaded at",
        value_name = "ADDR",
        value_parser = parse_address
    )]
    pub load_address: Option<u64>,
    #[arg(
        long,
        help = "Address of the hand-off blocks",
        value_name = "ADDR",
        value_parser = parse_address
    )]
    pub hob_address: Option<u64>,
    #[command(flatten)]
    pub arch_args: ArchArgs,
    #[arg(short, long, help = "Path of the relocated FIT image", value_name = "PATH")]
    pub output: PathBuf,
    #[arg(long, help = "Path of the trampoline", value_name = "PATH")]
    pub trampoline: PathBuf,
}

#[derive(Debug, Args)]
pub struct ArchArgs {
    #[arg(
        long,
        help = "Architecture of the trampoline ('x86_64' or 'aarch64'), the host's by default",
        value_name = "ARCH"
    )]
    pub arch: Option<Arch>,
}

/// Parses a decimal or `0x`-prefixed hexadecimal address. Underscores are
/// allowed as digit separators.
pub fn parse_address(s: &str) -> Result<u64, String> {
    let digits = s.trim().replace('_', "");
    let parsed = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => digits.parse::<u64>(),
    };
    parsed.map_err(|err| format!("invalid address '{}': {}", s, err))
}
