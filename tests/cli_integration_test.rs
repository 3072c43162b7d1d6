//! CLI integration tests for command-line behavior.
//!
//! Tests the actual command-line interface, argument parsing, and output
//! formatting.

mod common;

use anyhow::Result;
use assert_cmd::Command;
use common::*;
use predicates::prelude::*;
use tempfile::TempDir;

fn cli() -> Result<Command> {
    let mut cmd = Command::cargo_bin("anonymizer")?;
    cmd.env("ENCRYPTION_KEY", "cli-test-passphrase");
    Ok(cmd)
}

#[test]
#[ignore] // Requires compiled binary
fn test_help_message() -> Result<()> {
    cli()?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("anonymize"))
        .stdout(predicate::str::contains("restore"))
        .stdout(predicate::str::contains("lookup"))
        .stdout(predicate::str::contains("--verbose"));
    Ok(())
}

#[test]
#[ignore] // Requires compiled binary
fn test_missing_key_is_reported() -> Result<()> {
    let temp = TempDir::new()?;
    let input = create_smith_pdf(&temp.path().join("paper.pdf"))?;
    Command::cargo_bin("anonymizer")?
        .env_remove("ENCRYPTION_KEY")
        .args(["scan", "-i"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ENCRYPTION_KEY"));
    Ok(())
}

#[test]
#[ignore] // Requires compiled binary
fn test_missing_input_file() -> Result<()> {
    cli()?
        .args(["scan", "-i", "/nonexistent/paper.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    Ok(())
}

#[test]
#[ignore] // Requires compiled binary
fn test_anonymize_restore_and_lookup() -> Result<()> {
    let temp = TempDir::new()?;
    let input = create_smith_pdf(&temp.path().join("paper.pdf"))?;
    let anonymized = temp.path().join("anon.pdf");
    let restored = temp.path().join("restored.pdf");
    let mapping = temp.path().join("mapping.json");

    cli()?
        .args(["anonymize", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&anonymized)
        .arg("-m")
        .arg(&mapping)
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Redacted 3 instance(s)"));
    assert_redacted(&anonymized, "jsmith@example.edu");

    let hash = anonymizer::FieldCodec::hash_one_way("jsmith@example.edu");
    cli()?
        .args(["lookup", "--hash", &hash, "-m"])
        .arg(&mapping)
        .assert()
        .success()
        .stdout(predicate::str::contains("jsmith@example.edu"));

    cli()?
        .args(["restore", "-i"])
        .arg(&anonymized)
        .arg("-o")
        .arg(&restored)
        .arg("-m")
        .arg(&mapping)
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Restored 3 instance(s)"));
    assert_preserved(&restored, "jsmith@example.edu");
    Ok(())
}

#[test]
#[ignore] // Requires compiled binary
fn test_scan_prints_authors() -> Result<()> {
    let temp = TempDir::new()?;
    let input = create_smith_pdf(&temp.path().join("paper.pdf"))?;
    cli()?
        .args(["scan", "-i"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Author 1:"))
        .stdout(predicate::str::contains("John Smith"));
    Ok(())
}

#[test]
#[ignore] // Requires compiled binary
fn test_invalid_field_kind_rejected() -> Result<()> {
    cli()?
        .args([
            "anonymize", "-i", "in.pdf", "-o", "out.pdf", "-m", "m.json", "--fields", "phone",
        ])
        .assert()
        .failure();
    Ok(())
}
