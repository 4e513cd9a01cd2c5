use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::{TempDir, tempdir};

use zeroapi_cli::{Args, CliError, Command, KindArg, run_with_output};

/// Collects all .api files from a directory
fn collect_api_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "api"))
            .collect(),
        Err(_) => Vec::new(),
    };

    // Sort for consistent test output
    files.sort();
    files
}

fn demos_dir() -> PathBuf {
    // Demos live at the workspace root
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

/// An empty config file, so user or project configs do not leak in.
fn empty_config() -> (TempDir, String) {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("zeroapi.toml");
    fs::write(&path, "").expect("Failed to write config");
    let path = path.to_string_lossy().to_string();
    (dir, path)
}

fn args(config: &str, command: Command) -> Args {
    Args {
        config: Some(config.to_string()),
        log_level: "off".to_string(),
        command,
    }
}

fn run_to_string(args: &Args) -> (Result<(), CliError>, String) {
    let mut out = Vec::new();
    let result = run_with_output(args, &mut out);
    (result, String::from_utf8_lossy(&out).into_owned())
}

#[test]
fn e2e_smoke_test_valid_demos() {
    let (_dir, config) = empty_config();
    let demos = collect_api_files(&demos_dir());
    assert!(!demos.is_empty(), "No demos found in demos/");

    let mut failed = Vec::new();
    for demo in &demos {
        let (result, output) = run_to_string(&args(
            &config,
            Command::Check {
                files: vec![demo.clone()],
            },
        ));
        if let Err(err) = result {
            failed.push(format!("{}: {err}\n{output}", demo.display()));
        }
    }

    assert!(failed.is_empty(), "Valid demos failed:\n{}", failed.join("\n"));
}

#[test]
fn e2e_smoke_test_invalid_demos() {
    let (_dir, config) = empty_config();
    let demos = collect_api_files(&demos_dir().join("invalid"));
    assert!(!demos.is_empty(), "No demos found in demos/invalid/");

    for demo in &demos {
        let (result, output) = run_to_string(&args(
            &config,
            Command::Check {
                files: vec![demo.clone()],
            },
        ));
        assert!(
            matches!(result, Err(CliError::CheckFailed { failed: 1, total: 1 })),
            "{} unexpectedly passed",
            demo.display()
        );
        assert!(output.contains("error(s)"), "no summary for {}", demo.display());
    }
}

#[test]
fn e2e_duplicate_demo_reports_expected_codes() {
    let (_dir, config) = empty_config();
    let demo = demos_dir().join("invalid/duplicate.api");
    let (_, output) = run_to_string(&args(&config, Command::Check { files: vec![demo] }));

    for code in ["E200", "E201", "E202", "E203", "E205"] {
        assert!(output.contains(code), "missing {code} in:\n{output}");
    }
}

#[test]
fn e2e_symbols_and_goto() {
    let (_dir, config) = empty_config();
    let demo = demos_dir().join("user.api");

    let (result, output) = run_to_string(&args(
        &config,
        Command::Symbols {
            file: demo.clone(),
            kind: Some(KindArg::Handler),
        },
    ));
    assert!(result.is_ok());
    let lines: Vec<_> = output.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].ends_with("handler\tLoginHandler\tlogin.go"));

    let source = fs::read_to_string(&demo).expect("Failed to read demo");
    let offset = source.find("(LoginResp)").expect("reference") + 1;
    let (result, output) = run_to_string(&args(&config, Command::Goto { file: demo, offset }));
    assert!(result.is_ok());

    // the prefix ends in the declaration's indentation, so it counts that line too
    let line = source[..source.find("LoginResp {").expect("declaration")]
        .lines()
        .count();
    assert!(output.trim_end().ends_with(&format!(":{line}:5")), "{output}");
}

#[test]
fn e2e_missing_file() {
    let (dir, config) = empty_config();
    let (result, _) = run_to_string(&args(
        &config,
        Command::Check {
            files: vec![dir.path().join("absent.api")],
        },
    ));
    assert!(matches!(result, Err(CliError::ZeroApi(_))));
}
