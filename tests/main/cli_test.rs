//! CLI contract tests.

use std::fs;

use assert_cmd::Command;

fn humbler() -> Command {
    let mut cmd = Command::cargo_bin("humbler").expect("binary should build");
    for var in [
        "LOG_FILE_PATH",
        "DB_FILE_PATH",
        "JSON_DEATH_MESSAGES",
        "JSON_USER_WHITELIST",
        "JSON_DEBUG_BOTS",
        "JSON_HUMBLED_RESPONSES",
        "MINECRAFT_SEASON",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_lists_subcommands() {
    let output = humbler().arg("--help").output().expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for sub in ["start", "deaths", "scoreboard", "check"] {
        assert!(stdout.contains(sub), "missing {sub} in help");
    }
}

#[test]
fn check_reports_match_and_subject() {
    let dir = tempfile::tempdir().expect("tempdir");
    let deaths = dir.path().join("deaths.json");
    let whitelist = dir.path().join("whitelist.json");
    fs::write(&deaths, r#"{"deathMessages": ["was slain by"]}"#).expect("write");
    fs::write(&whitelist, r#"[{"name": "Alice"}, {"name": "Bob"}]"#).expect("write");

    let output = humbler()
        .current_dir(dir.path())
        .env("JSON_DEATH_MESSAGES", &deaths)
        .env("JSON_USER_WHITELIST", &whitelist)
        .args([
            "check",
            "[12:00:01] [Server thread/INFO]: Alice was slain by Zombie",
        ])
        .output()
        .expect("run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("match:       true"));
    assert!(stdout.contains("transformed: Alice was slain by Zombie"));
    assert!(stdout.contains("subject:     Alice"));
}

#[test]
fn scoreboard_on_fresh_store_is_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = humbler()
        .current_dir(dir.path())
        .env("DB_FILE_PATH", dir.path().join("deaths.db"))
        .arg("scoreboard")
        .output()
        .expect("run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No one has been humbled yet"));
}

#[test]
fn invalid_config_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("humbler.toml");
    fs::write(&config, "[notify]\ntimeout_secs = 0\n").expect("write");

    humbler()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("scoreboard")
        .assert()
        .failure();
}
