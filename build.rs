use std::process::Command;

/// Short hash of the checked-out commit, if this is a git checkout.
fn commit() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--short=10", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let hash = String::from_utf8(out.stdout).ok()?;
    let hash = hash.trim();
    (!hash.is_empty()).then(|| hash.to_string())
}

fn main() {
    let commit = commit().unwrap_or_else(|| "unknown".into());
    // Reported as `serverInfo.version` by the JSON-RPC server.
    println!("cargo:rustc-env=SCRIPTMARK_BUILD_COMMIT={commit}");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}
