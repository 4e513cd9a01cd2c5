//! CLI logic for the zeroapi tool.
//!
//! `check` validates files and renders their diagnostics, `symbols` lists
//! declarations and `goto` prints where a reference points.

pub mod error_adapter;

mod args;
mod config;

pub use args::{Args, Command, KindArg};
pub use config::{ConfigError, LOCAL_CONFIG, load_config};

use std::{
    io::{self, Write},
    path::PathBuf,
};

use log::info;
use miette::GraphicalReportHandler;
use thiserror::Error;

use zeroapi::{Analyzer, ZeroApiError};

/// Errors that end a CLI run with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    ZeroApi(#[from] ZeroApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{failed} of {total} file(s) failed the check")]
    CheckFailed { failed: usize, total: usize },

    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),
}

/// Run the zeroapi CLI, writing results to stdout.
///
/// # Errors
///
/// Returns `CliError` for unreadable files or configuration, and when at
/// least one checked file fails.
pub fn run(args: &Args) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with_output(args, &mut out)
}

/// Run the zeroapi CLI, writing results to `out`.
pub fn run_with_output(args: &Args, out: &mut impl Write) -> Result<(), CliError> {
    let app_config = config::load_config(args.config.as_ref())?;
    let analyzer = Analyzer::new(app_config);

    match &args.command {
        Command::Check { files } => check(&analyzer, files, out),
        Command::Symbols { file, kind } => {
            let document = analyzer.load(file)?;
            for symbol in analyzer.symbols(&document, kind.map(Into::into)) {
                write!(
                    out,
                    "{}:{}:{}\t{}\t{}",
                    document.path().display(),
                    symbol.line,
                    symbol.column,
                    symbol.kind,
                    symbol.name
                )?;
                if let Some(stem) = &symbol.file_stem {
                    write!(out, "\t{stem}.go")?;
                }
                writeln!(out)?;
            }
            Ok(())
        }
        Command::Goto { file, offset } => {
            let document = analyzer.load(file)?;
            match analyzer.goto(&document, *offset) {
                Some(location) => writeln!(out, "{location}")?,
                None => info!(offset; "No declaration found at offset"),
            }
            Ok(())
        }
    }
}

fn check(
    analyzer: &Analyzer,
    files: &[PathBuf],
    out: &mut impl Write,
) -> Result<(), CliError> {
    let handler = GraphicalReportHandler::new();
    let mut failed = 0;

    for file in files {
        let report = analyzer.check(file)?;
        if !report.diagnostics().is_empty() {
            writeln!(
                out,
                "{}: {} error(s), {} warning(s)",
                report.document().path().display(),
                report.error_count(),
                report.warning_count()
            )?;
        }

        match report.into_result() {
            Ok(report) => {
                for diagnostic in report.diagnostics() {
                    let rendered = error_adapter::render_diagnostic(
                        &handler,
                        diagnostic,
                        report.document().source(),
                    );
                    write!(out, "{rendered}")?;
                }
            }
            Err(err) => {
                failed += 1;
                let err = CliError::from(err);
                for reportable in error_adapter::to_reportables(&err) {
                    write!(out, "{}", error_adapter::render(&handler, &reportable))?;
                }
            }
        }
    }

    info!(files = files.len(), failed; "Check finished");
    if failed > 0 {
        return Err(CliError::CheckFailed {
            failed,
            total: files.len(),
        });
    }
    Ok(())
}
