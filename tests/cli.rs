use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn cli_shows_help() {
    let mut cmd = Command::cargo_bin("freqmap").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("freqmap"))
        .stdout(predicate::str::contains("replay"));
}

#[test]
fn catalog_prints_operators() {
    let mut cmd = Command::cargo_bin("freqmap").unwrap();
    cmd.arg("catalog");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"CarrisMetropolitana\""))
        .stdout(predicate::str::contains("\"max_services_parish\": 60.0"));
}

#[test]
fn plan_lists_parish_stack_bottom_first() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("freqmap").unwrap();
    cmd.args(["plan", "--prefs"])
        .arg(dir.path().join("prefs.json"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("date=20250326 hour=20 mode=parishes"))
        .stdout(predicate::str::contains("#1 parishes"))
        .stdout(predicate::str::contains("#2 municipalities"))
        .stdout(predicate::str::contains("/20250326/2000.geojson"));
}

#[test]
fn replay_prints_commands_per_step() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("freqmap").unwrap();
    cmd.args(["replay", "--query", "?map=lines", "--prefs"])
        .arg(dir.path().join("prefs.json"))
        .args(["off:CP", "on:CP", "tick", "color:light"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("> off:CP"))
        .stdout(predicate::str::contains("unmount #7 CP"))
        .stdout(predicate::str::contains(
            "mount #10 CP https://lisboaparapessoas.github.io/rede-madrugada/geojson/20250326/CP_2000_shapes_aggregated.geojson",
        ))
        .stdout(predicate::str::contains("CP_2100_shapes_aggregated.geojson"))
        .stdout(predicate::str::contains("basemap https://{s}.basemaps.cartocdn.com/light_all"))
        .stdout(predicate::str::contains("mounted:"));

    let stored = std::fs::read_to_string(dir.path().join("prefs.json")).unwrap();
    assert!(stored.contains("\"light\""));
}

#[test]
fn replay_rejects_unknown_steps() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("freqmap").unwrap();
    cmd.args(["replay", "--prefs"])
        .arg(dir.path().join("prefs.json"))
        .arg("hour:99");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));

    let mut cmd = Command::cargo_bin("freqmap").unwrap();
    cmd.args(["replay", "--prefs"])
        .arg(dir.path().join("prefs.json"))
        .arg("jump:3");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown step"));
}

#[test]
fn play_offline_advances_hours() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("freqmap").unwrap();
    cmd.args(["play", "--ticks", "2", "--tick-ms", "200", "--prefs"])
        .arg(dir.path().join("prefs.json"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("hour 20\nhour 21\nhour 22"));
}

#[test]
fn play_stops_with_a_single_hour_slot() {
    let dir = tempdir().unwrap();
    let mut catalog: serde_json::Value = serde_json::from_str(
        &String::from_utf8(
            Command::cargo_bin("freqmap")
                .unwrap()
                .arg("catalog")
                .output()
                .unwrap()
                .stdout,
        )
        .unwrap(),
    )
    .unwrap();
    catalog["hours"] = serde_json::json!([0]);
    let catalog_path = dir.path().join("catalog.json");
    std::fs::write(&catalog_path, catalog.to_string()).unwrap();

    let mut cmd = assert_cmd::Command::cargo_bin("freqmap").unwrap();
    cmd.args(["play", "--ticks", "2", "--tick-ms", "10", "--catalog"])
        .arg(&catalog_path)
        .arg("--prefs")
        .arg(dir.path().join("prefs.json"))
        .timeout(std::time::Duration::from_secs(10));
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("hour 00\nhour 00"));
}

// Live test (opt-in): cargo test --features online
#[cfg(feature = "online")]
#[test]
fn play_online_fetches_layers() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("freqmap").unwrap();
    cmd.args(["play", "--ticks", "1", "--tick-ms", "10", "--fetch", "--prefs"])
        .arg(dir.path().join("prefs.json"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("running max"));
}
