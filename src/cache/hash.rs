//! Digests for calculation keys.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex SHA-256 of the JSON form of `material`.
///
/// Two calc nodes get the same digest exactly when their key material
/// (node name, result type, child keys, node data) serializes identically,
/// so struct field order is part of the key.
pub fn key_digest<T: Serialize>(material: &T) -> Result<String, serde_json::Error> {
    let mut hasher = Sha256::new();
    serde_json::to_writer(&mut HashWriter(&mut hasher), material)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Feeds serializer output straight into the hasher.
struct HashWriter<'a>(&'a mut Sha256);

impl std::io::Write for HashWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
