// crates/plugstore-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Tests
// Description: Argument parsing and log filter checks.
// Purpose: Keep the command surface and telemetry setup stable.
// ============================================================================

//! ## Overview
//! Parses representative command lines with `clap` and exercises the log
//! filter selection without installing a global subscriber.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions are permitted."
)]

use std::path::Path;

use clap::CommandFactory;
use clap::Parser;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use crate::telemetry::build_filter;

#[test]
fn command_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn serve_accepts_config_path() {
    let cli = Cli::try_parse_from(["plugstore", "serve", "--config", "custom.toml"]).unwrap();
    let Some(Commands::Serve(command)) = cli.command else {
        panic!("expected serve command");
    };
    assert_eq!(command.config.as_deref(), Some(Path::new("custom.toml")));
}

#[test]
fn config_subcommands_parse() {
    let cli = Cli::try_parse_from(["plugstore", "config", "example"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Config {
            command: ConfigCommand::Example
        })
    ));
    let cli = Cli::try_parse_from(["plugstore", "config", "validate"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Config {
            command: ConfigCommand::Validate(_)
        })
    ));
}

#[test]
fn version_flag_is_global() {
    let cli = Cli::try_parse_from(["plugstore", "--version"]).unwrap();
    assert!(cli.show_version);
    assert!(cli.command.is_none());
}

#[test]
fn unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["plugstore", "migrate"]).is_err());
}

#[test]
fn log_filter_prefers_non_empty_override() {
    assert!(build_filter("info", None).is_ok());
    assert!(build_filter("info", Some("plugstore_service=debug")).is_ok());
    assert!(build_filter("info", Some("   ")).is_ok());
}
