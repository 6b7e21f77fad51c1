use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use std::process::Command;

fn letterlight() -> Command {
    let mut cmd = Command::cargo_bin("letterlight").expect("binary exists");
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn headless_renders_the_default_scene() {
    letterlight()
        .arg("--headless")
        .assert()
        .success()
        .stdout(contains("Rendered frame 800x600: 1 draw call(s), 96 vertices"))
        .stdout(contains(" - light_color=(1.00, 1.00, 1.00)"))
        .stdout(contains(" - specular_color=(1.00, 1.00, 1.00)"))
        .stdout(contains(" - shininess=150.00"));
}

#[test]
fn flags_reach_the_uploaded_uniforms() {
    letterlight()
        .args([
            "--headless",
            "--size",
            "320x240",
            "--light-color",
            "red",
            "--specular-color",
            "BLUE",
            "--shininess",
            "30",
            "--rotation",
            "-45",
        ])
        .assert()
        .success()
        .stdout(contains("Rendered frame 320x240: 1 draw call(s), 96 vertices"))
        .stdout(contains(" - light_color=(1.00, 0.60, 0.60)"))
        .stdout(contains(" - specular_color=(0.60, 0.60, 1.00)"))
        .stdout(contains(" - shininess=30.00"));
}

#[test]
fn unknown_color_is_rejected() {
    letterlight()
        .args(["--headless", "--light-color", "purple"])
        .assert()
        .failure()
        .stderr(contains("--light-color expects red, green, blue or white"))
        .stderr(contains("unknown color `purple`"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn non_positive_shininess_is_rejected() {
    letterlight()
        .args(["--headless", "--shininess", "0"])
        .assert()
        .failure()
        .stderr(contains("invalid shininess: 0"));
}

#[test]
fn unknown_argument_prints_usage() {
    letterlight()
        .arg("--fullscreen")
        .assert()
        .failure()
        .stderr(contains("Unknown argument: --fullscreen"))
        .stderr(contains("Usage: letterlight"));
}

#[test]
fn help_prints_usage() {
    letterlight()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Usage: letterlight"));
}
