//! Tests for the otp CLI help output

use std::process::Command;

#[test]
fn test_no_args_shows_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_otp"))
        .output()
        .expect("Failed to execute otp command");

    assert!(output.status.success(), "Command should exit successfully");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Usage:"),
        "Output should contain 'Usage:': {}",
        stdout
    );
    assert!(stdout.contains("login"), "Output should list login: {}", stdout);
}

#[test]
fn test_login_help_lists_server_flag() {
    let output = Command::new(env!("CARGO_BIN_EXE_otp"))
        .args(["login", "--help"])
        .output()
        .expect("Failed to execute otp command");

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--server"), "{}", stdout);
    assert!(stdout.contains("--resend-cooldown"), "{}", stdout);
}
