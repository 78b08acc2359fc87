//! Immutable building configuration registry.
//!
//! Configurations are TOML documents, either compiled into the binary or read
//! from a directory with the same layout. The registry is read-only once
//! built and is shared across callers behind an `Arc`.

pub mod error;
pub mod loader;
pub mod registry;
pub mod validate;

pub use error::RegistryError;
pub use loader::{QualitativeMix, RegistrySettings};
pub use registry::{Registry, ResolvedConfig};
pub use validate::IntegrityViolation;
