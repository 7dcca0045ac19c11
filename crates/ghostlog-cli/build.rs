//! Embeds build metadata shown by `ghostlog version`.

use std::env;
use std::process::Command;

fn main() {
    let build_date = chrono::Utc::now().format("%Y-%m-%d").to_string();
    println!("cargo:rustc-env=GHOSTLOG_BUILD_DATE={}", build_date);

    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=GHOSTLOG_TARGET={}", target);

    // RUSTC names the compiler cargo builds with
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let rustc_version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=GHOSTLOG_RUSTC_VERSION={}", rustc_version);

    println!("cargo:rerun-if-changed=build.rs");
}
