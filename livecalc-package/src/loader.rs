//! Opens a package built by [`crate::PackageBuilder`], verifying every
//! asset's checksum and the package-level hash before handing back its
//! contents — and lets a caller compare that hash against a remote
//! build for parity.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use livecalc_config::ConfigDocument;
use livecalc_integrity::sha256_hex;

use crate::error::PackageError;
use crate::manifest::Manifest;

pub struct LoadedPackage {
    pub manifest: Manifest,
    pub pipeline_config: ConfigDocument,
    pub assets: HashMap<String, Vec<u8>>,
}

impl LoadedPackage {
    /// Compare this package's content hash against one computed elsewhere
    /// (e.g. by the same build running on a remote deploy target). This is
    /// the local half of "remote package parity": the actual cross-process
    /// transport of that hash (and of the run's status stream back to a
    /// submitter) is left to whatever host embeds this crate, since no
    /// daemon/IPC layer lives here.
    pub fn verify_parity(&self, remote_package_sha256: &str) -> Result<(), PackageError> {
        if self.manifest.package_sha256 == remote_package_sha256 {
            Ok(())
        } else {
            Err(PackageError::ParityMismatch {
                local: self.manifest.package_sha256.clone(),
                remote: remote_package_sha256.to_string(),
            })
        }
    }
}

pub fn open(path: &Path) -> Result<LoadedPackage, PackageError> {
    let file = std::fs::File::open(path)?;
    let mut zip = zip::ZipArchive::new(file)?;

    let manifest: Manifest = {
        let mut entry = zip
            .by_name("manifest.json")
            .map_err(|_| PackageError::MissingEntry("manifest.json".to_string()))?;
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        serde_json::from_slice(&buf)?
    };

    let config_bytes = {
        let mut entry = zip
            .by_name("livecalc.config.json")
            .map_err(|_| PackageError::MissingEntry("livecalc.config.json".to_string()))?;
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        buf
    };
    let pipeline_config: ConfigDocument = serde_json::from_slice(&config_bytes)?;

    let mut assets = HashMap::with_capacity(manifest.assets.len());
    for asset in &manifest.assets {
        let buf = if asset.relative_path == "livecalc.config.json" {
            config_bytes.clone()
        } else {
            let mut entry = zip
                .by_name(&asset.relative_path)
                .map_err(|_| PackageError::MissingEntry(asset.relative_path.clone()))?;
            let mut buf = Vec::new();
            entry.read_to_end(&mut buf)?;
            buf
        };
        let actual = sha256_hex(&buf);
        if actual != asset.sha256_hex {
            return Err(PackageError::ChecksumMismatch {
                asset: asset.relative_path.clone(),
                expected: asset.sha256_hex.clone(),
                actual,
            });
        }
        assets.insert(asset.relative_path.clone(), buf);
    }

    let recomputed = Manifest::compute_package_sha256(&manifest.assets);
    if recomputed != manifest.package_sha256 {
        return Err(PackageError::ChecksumMismatch {
            asset: "manifest".to_string(),
            expected: manifest.package_sha256.clone(),
            actual: recomputed,
        });
    }

    Ok(LoadedPackage { manifest, pipeline_config, assets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PackageBuilder;

    #[test]
    fn round_trips_a_built_package() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.zip");
        let mut builder = PackageBuilder::new(br#"{"pipeline":{"nodes":[]}}"#.to_vec());
        builder.add_assumption("rates.json", vec![9, 9, 9]);
        builder.build(&path).unwrap();

        let loaded = open(&path).unwrap();
        assert_eq!(loaded.assets.len(), 2);
        assert!(loaded.verify_parity(&loaded.manifest.package_sha256.clone()).is_ok());
        assert!(loaded.verify_parity("deadbeef").is_err());
    }
}
