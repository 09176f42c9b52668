//! Tests for add and run subcommands.

use super::parse;
use crate::cli::CliCommand;

#[test]
fn cli_parse_add() {
    match parse(&["dlm", "add", "https://example.com/file.iso"]) {
        CliCommand::Add { url, download_dir } => {
            assert_eq!(url, "https://example.com/file.iso");
            assert!(download_dir.is_none());
        }
        _ => panic!("expected Add"),
    }
}

#[test]
fn cli_parse_add_download_dir() {
    match parse(&[
        "dlm",
        "add",
        "https://example.com/x",
        "--download-dir",
        "/tmp",
    ]) {
        CliCommand::Add { url, download_dir } => {
            assert_eq!(url, "https://example.com/x");
            assert_eq!(download_dir.as_deref(), Some(std::path::Path::new("/tmp")));
        }
        _ => panic!("expected Add with --download-dir"),
    }
}

#[test]
fn cli_parse_run() {
    match parse(&["dlm", "run"]) {
        CliCommand::Run {
            force_restart,
            overwrite,
        } => {
            assert!(!force_restart);
            assert!(!overwrite);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_force_restart() {
    match parse(&["dlm", "run", "--force-restart"]) {
        CliCommand::Run {
            force_restart,
            overwrite,
        } => {
            assert!(force_restart);
            assert!(!overwrite);
        }
        _ => panic!("expected Run with force_restart"),
    }
}

#[test]
fn cli_parse_run_overwrite() {
    match parse(&["dlm", "run", "--overwrite"]) {
        CliCommand::Run { overwrite, .. } => assert!(overwrite),
        _ => panic!("expected Run with overwrite"),
    }
}
