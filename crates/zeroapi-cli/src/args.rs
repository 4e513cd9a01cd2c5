//! Command-line argument definitions for the zeroapi CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Global flags select the configuration file and logging
//! verbosity; the [`Command`] decides what is done with the input files.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use zeroapi::SymbolKind;

/// Command-line arguments for the zeroapi tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate `.api` files and report every diagnostic
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List the declarations of a file
    Symbols {
        file: PathBuf,

        /// Only list symbols of this kind
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
    },

    /// Print the declaration referred to at a byte offset
    Goto { file: PathBuf, offset: usize },
}

/// Symbol kinds accepted by `--kind`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Struct,
    Handler,
    Route,
    Import,
    Service,
}

impl From<KindArg> for SymbolKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Struct => SymbolKind::Struct,
            KindArg::Handler => SymbolKind::Handler,
            KindArg::Route => SymbolKind::Route,
            KindArg::Import => SymbolKind::Import,
            KindArg::Service => SymbolKind::Service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let args = Args::parse_from(["zeroapi", "check", "a.api", "b.api"]);
        match args.command {
            Command::Check { files } => assert_eq!(files.len(), 2),
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(args.log_level, "warn");
    }

    #[test]
    fn test_parse_symbols_with_kind() {
        let args = Args::parse_from([
            "zeroapi",
            "--log-level",
            "debug",
            "symbols",
            "a.api",
            "--kind",
            "handler",
        ]);
        assert_eq!(args.log_level, "debug");
        assert!(matches!(
            args.command,
            Command::Symbols {
                kind: Some(KindArg::Handler),
                ..
            }
        ));
    }

    #[test]
    fn test_check_requires_files() {
        assert!(Args::try_parse_from(["zeroapi", "check"]).is_err());
    }
}
