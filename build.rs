//! Embeds the git revision for the health endpoint.
//!
//! `DETOUR_GIT_SHORT_OVERRIDE` wins over git so container builds without
//! `.git` can still stamp a revision. Falls back to `"unknown"`.

use std::process::Command;

fn git_short() -> String {
    if let Some(v) = std::env::var("DETOUR_GIT_SHORT_OVERRIDE")
        .ok()
        .filter(|s| !s.is_empty())
    {
        return v;
    }

    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".into())
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs");
    println!("cargo:rerun-if-env-changed=DETOUR_GIT_SHORT_OVERRIDE");

    println!("cargo:rustc-env=DETOUR_GIT_SHORT={}", git_short());
}
