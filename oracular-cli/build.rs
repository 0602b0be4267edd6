// Build script: expose ORACULAR_VERSION to the binary
//
// Tagged builds report the tag ("v0.2.0" -> "0.2.0"). Untagged builds report
// the crate version plus the abbreviated commit. Without git the crate
// version is used as is.

use std::process::Command;

fn main() {
    let version = git_version().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=ORACULAR_VERSION={}", version);
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");
}

fn git_version() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();

    match described.strip_prefix('v') {
        // "v0.2.0" or "v0.2.0-3-gabc123-dirty": keep the tag part
        Some(tagged) => Some(tagged.split('-').next().unwrap_or(tagged).to_string()),
        // bare commit such as "abc123" or "abc123-dirty"
        None => Some(format!("{}+{}", env!("CARGO_PKG_VERSION"), described)),
    }
}
