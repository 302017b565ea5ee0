//! Assembles a deployment bundle: a ZIP archive containing the pipeline
//! configuration, its referenced model/engine/assumption/policy files, and
//! a manifest recording their checksums.

use std::io::Write;
use std::path::Path;

use livecalc_integrity::sha256_hex;
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::error::PackageError;
use crate::manifest::{AssetEntry, AssetType, Manifest, FORMAT_VERSION};

pub struct PackageBuilder {
    config_json: Vec<u8>,
    assets: Vec<(String, Vec<u8>, AssetType)>,
}

impl PackageBuilder {
    pub fn new(config_json: Vec<u8>) -> Self {
        Self { config_json, assets: Vec::new() }
    }

    /// The actuarial model file the config references, e.g. `add_model("bin", bytes)`.
    pub fn add_model(&mut self, ext: &str, contents: Vec<u8>) -> &mut Self {
        self.assets.push((format!("model.{ext}"), contents, AssetType::Model));
        self
    }

    /// A `native://<name>` engine's compiled module plus its metadata sidecar.
    pub fn add_native_module(&mut self, name: &str, wasm_bytes: Vec<u8>, meta_json: Vec<u8>) -> &mut Self {
        self.assets.push((format!("native/{name}.bin"), wasm_bytes, AssetType::Native));
        self.assets.push((format!("native/{name}.meta"), meta_json, AssetType::Native));
        self
    }

    /// A `script://<name>` engine's Lua source.
    pub fn add_script_module(&mut self, name: &str, source: Vec<u8>) -> &mut Self {
        self.assets.push((format!("script/{name}.src"), source, AssetType::Script));
        self
    }

    /// A local assumption file resolved for `include_assumptions`.
    pub fn add_assumption(&mut self, relative_path: impl Into<String>, contents: Vec<u8>) -> &mut Self {
        self.assets.push((format!("assumptions/{}", relative_path.into()), contents, AssetType::Assumption));
        self
    }

    /// A local policy file resolved for `include_policies`.
    pub fn add_policy(&mut self, relative_path: impl Into<String>, contents: Vec<u8>) -> &mut Self {
        self.assets.push((format!("data/{}", relative_path.into()), contents, AssetType::Policy));
        self
    }

    /// Write the ZIP archive to `output_path`, returning the manifest that
    /// was embedded in it.
    pub fn build(&self, output_path: &Path) -> Result<Manifest, PackageError> {
        let file = std::fs::File::create(output_path)?;
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        zip.start_file("livecalc.config.json", options)?;
        zip.write_all(&self.config_json)?;

        let mut asset_entries = Vec::with_capacity(self.assets.len() + 1);
        asset_entries.push(AssetEntry {
            relative_path: "livecalc.config.json".to_string(),
            sha256_hex: sha256_hex(&self.config_json),
            size: self.config_json.len() as u64,
            asset_type: AssetType::Config,
        });
        for (path, contents, asset_type) in &self.assets {
            zip.start_file(path, options)?;
            zip.write_all(contents)?;
            asset_entries.push(AssetEntry {
                relative_path: path.clone(),
                sha256_hex: sha256_hex(contents),
                size: contents.len() as u64,
                asset_type: *asset_type,
            });
        }

        let config: serde_json::Value = serde_json::from_slice(&self.config_json)?;
        let package_sha256 = Manifest::compute_package_sha256(&asset_entries);
        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            created_at: chrono::Utc::now().to_rfc3339(),
            assets: asset_entries,
            package_sha256,
            config,
        };

        zip.start_file("manifest.json", options)?;
        zip.write_all(&serde_json::to_vec_pretty(&manifest)?)?;
        zip.finish()?;

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_package_with_matching_manifest_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.zip");
        let mut builder = PackageBuilder::new(br#"{"pipeline":{"nodes":[]}}"#.to_vec());
        builder.add_model("bin", vec![1, 2, 3, 4]);
        builder.add_native_module("fast_sum", vec![0u8; 16], br#"{"version":1}"#.to_vec());
        let manifest = builder.build(&path).unwrap();
        assert_eq!(manifest.assets.len(), 4);
        assert!(!manifest.package_sha256.is_empty());
        assert_eq!(manifest.format_version, FORMAT_VERSION);
        assert!(path.exists());
    }
}
