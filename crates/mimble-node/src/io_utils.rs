//! JSON file helpers shared by config and chain-state persistence.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn parse_hex32(name: &str, value: &str) -> Result<[u8; 32], String> {
    let bytes = hex::decode(value.trim()).map_err(|e| format!("{name}: {e}"))?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| format!("{name}: expected 32 bytes, got {}", bytes.len()))
}

/// `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<Option<T>, String> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(format!("read {what} {}: {e}", path.display())),
    };
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|e| format!("parse {what} {}: {e}", path.display()))
}

/// Pretty JSON with a trailing newline. Written beside the target and renamed
/// over it, so readers see the old file or the new one, never a mix.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<(), String> {
    let mut raw = serde_json::to_vec_pretty(value).map_err(|e| format!("encode {what}: {e}"))?;
    raw.push(b'\n');

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("create {what} parent {}: {e}", parent.display()))?;
    }
    let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
    fs::write(&tmp, &raw).map_err(|e| format!("write {what} {}: {e}", tmp.display()))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        format!("rename {what} {}: {e}", path.display())
    })
}
