//! Shared helpers for driving the framebot binary.

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

/// Run framebot with logging quiet and no token in the environment.
pub fn framebot(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_framebot"))
        .args(args)
        .env_remove("FRAMEBOT_ACCESS_TOKEN")
        .env("FRAMEBOT_LOG", "warn")
        .output()
        .expect("run framebot")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// `framebot init` into `dir`, asserting success.
pub fn init(dir: &Path, title: &str) {
    let dir = dir.to_str().expect("utf-8 temp path");
    let output = framebot(&["init", "--directory", dir, "--title", title]);
    assert!(output.status.success(), "init failed: {}", stderr(&output));
}

/// Apply `change` to the JSON config in `dir`.
pub fn edit_config(dir: &Path, change: impl FnOnce(&mut Value)) {
    let path = dir.join("config.json");
    let mut config: Value =
        serde_json::from_slice(&fs::read(&path).expect("read config")).expect("parse config");
    change(&mut config);
    fs::write(path, serde_json::to_vec_pretty(&config).expect("encode config"))
        .expect("write config");
}

pub fn write_frames(dir: &Path, numbers: &[u64]) {
    let frames = dir.join("frames");
    fs::create_dir_all(&frames).expect("create frames dir");
    for number in numbers {
        fs::write(frames.join(format!("{number}.jpg")), b"img").expect("write frame");
    }
}
