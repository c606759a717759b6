use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::process::Command;

pub fn host_name() -> String {
    if let Ok(output) = Command::new("uname").arg("-n").output() {
        let v = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !v.is_empty() {
            return v;
        }
    }
    "unknown-host".to_string()
}

/// Hex SHA-256 of a file's bytes, or `None` if it cannot be read.
pub fn sha256_file(path: &Path) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    let digest = Sha256::digest(bytes);
    Some(format!("{digest:x}"))
}
