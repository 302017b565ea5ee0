//! The package manifest: what's inside a deployment bundle and the
//! checksums that let a loader (local or remote) verify it came through
//! intact.

use serde::{Deserialize, Serialize};

pub const FORMAT_VERSION: u32 = 1;

/// Classification of a packaged asset, matching where it's filed in the
/// archive (`native/`, `script/`, `assumptions/`, `data/`, or the
/// top-level `model.<ext>`/`livecalc.config.json`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Config,
    Model,
    Native,
    Script,
    Assumption,
    Policy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEntry {
    pub relative_path: String,
    pub sha256_hex: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    /// RFC 3339 timestamp, e.g. `2026-07-27T00:00:00Z`.
    pub created_at: String,
    pub assets: Vec<AssetEntry>,
    /// SHA-256 over the sorted `"path:sha256\n"` lines of every entry,
    /// including `livecalc.config.json` itself. Content-based rather than
    /// archive-byte-based, so two builds of the same inputs produce the
    /// same package hash even if zip metadata (timestamps, compression
    /// level) differs — this is what remote parity checks compare.
    pub package_sha256: String,
    /// The pipeline configuration, embedded directly so a reader of
    /// `manifest.json` alone doesn't need to re-extract `livecalc.config.json`.
    pub config: serde_json::Value,
}

impl Manifest {
    /// `assets` must include the `livecalc.config.json` entry itself.
    pub fn compute_package_sha256(assets: &[AssetEntry]) -> String {
        let mut lines: Vec<String> =
            assets.iter().map(|a| format!("{}:{}", a.relative_path, a.sha256_hex)).collect();
        lines.sort();
        livecalc_integrity::sha256_hex(lines.join("\n").as_bytes())
    }
}
