//! Stamps the metadata printed by `panel_core_cli version`.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");

    let commit = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".into());
    let built = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();
    let target = format!("{} [{}]", cargo_var("TARGET"), cargo_var("PROFILE"));

    for (name, value) in [("COMMIT", commit), ("DATE", built), ("TARGET", target)] {
        println!("cargo:rustc-env=PANEL_CORE_BUILD_{name}={value}");
    }
}

fn cargo_var(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| "unknown".into())
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
