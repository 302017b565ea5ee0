//! Package builder and loader (C11): bundles a pipeline config and its
//! assets into a ZIP archive with SHA-256 manifests, and verifies
//! integrity and remote parity on load.

mod builder;
mod error;
mod loader;
mod manifest;

pub use builder::PackageBuilder;
pub use error::PackageError;
pub use loader::{open, LoadedPackage};
pub use manifest::{AssetEntry, AssetType, Manifest};
