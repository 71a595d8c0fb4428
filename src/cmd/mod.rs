//! Subcommand dispatch and execution.
//!
//! [`dispatch`] routes the parsed CLI to [`run`], [`init`], [`validate`],
//! or [`health`]. Each handler lives in its own submodule.

pub mod health;
pub mod init;
pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::DetourError;

pub async fn dispatch(cli: Cli) -> Result<(), DetourError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Init(ref args)) => init::execute(args),
        Some(Commands::Validate(ref args)) => validate::execute(args),
        Some(Commands::Health(args)) => health::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  detour v{version}: rule-driven HTTP dispatcher\n\n  \
         No command provided. To get started:\n\n    \
         detour init                   Generate a starter rule file\n    \
         detour run                    Start (auto-detects ./detour.yaml)\n    \
         detour run -r rules.yaml      Start with a specific rule file\n    \
         detour --help                 See all commands and options\n"
    );
}
