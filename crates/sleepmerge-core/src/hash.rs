//! Stable hashing helpers for rows, datasets and manifests.

use blake3::Hasher;
use serde::Serialize;

use crate::types::{Dataset, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// Lowercase hex, 64 chars.
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    Hash256(*blake3::hash(bytes).as_bytes())
}

fn update_row(h: &mut Hasher, row: &Row) {
    // Length-prefix every field so ["ab","c"] and ["a","bc"] differ.
    h.update(&(row.len() as u64).to_le_bytes());
    for field in row.fields() {
        h.update(&(field.len() as u64).to_le_bytes());
        h.update(field.as_bytes());
    }
}

/// Order-sensitive digest of a dataset (header + rows).
pub fn hash_dataset(ds: &Dataset) -> Hash256 {
    let mut h = Hasher::new();
    update_row(&mut h, &ds.header.to_row());
    for row in &ds.rows {
        update_row(&mut h, row);
    }
    Hash256(h.finalize().into())
}

/// Hash any serde-serializable value deterministically (via JSON).
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256, crate::error::Error> {
    let bytes = serde_json::to_vec(v)?;
    Ok(hash_bytes(&bytes))
}
