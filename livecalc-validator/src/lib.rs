//! Pipeline DAG validation and bus resource catalog extraction.
//!
//! Given a parsed [`livecalc_config::PipelineConfig`], [`validate`] either
//! returns a [`ValidatedPipeline`] (topological node order plus the bus
//! resource catalog the memory layer needs) or the list of structural
//! errors that make the pipeline unrunnable.

mod error;
mod resource;
mod validator;

pub use error::{ConfigError, ValidationWarning};
pub use resource::{aligned_size_bytes, parse_size_spec, resolve_size_spec, BusResourceDescriptor, ElementType};
pub use validator::{validate, ValidatedPipeline};
