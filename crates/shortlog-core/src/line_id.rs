//! Deterministic identifiers for log lines.
//!
//! Hash format: `blake3:<lowercase hex>`, computed over the little-endian
//! seed followed by the line's UTF-8 bytes.

/// Seed used when keying a shortlog association.
pub const SHORTLOG_SEED: u32 = 1;

/// Identify `line` under `seed`.
#[must_use]
pub fn line_hash(line: &str, seed: u32) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(line.as_bytes());
    format!("blake3:{}", hasher.finalize().to_hex())
}
