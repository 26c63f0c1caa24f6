//! LangSift Serve
//!
//! The model lifecycle behind the serving layer:
//!
//! - [`registry`]: the on-disk model catalogue with atomic writes and
//!   hard invariants around the default model
//! - [`rebuild`]: corpus-to-artifact rebuilding with measured metrics
//!   and atomic persistence
//! - [`cache`]: per-id coalesced loading with exactly one rebuild
//!   attempt for missing or corrupt artifacts
//! - [`inference`]: prediction that always returns a structured result
//! - [`upload`]: extension and size screening for uploaded files
//!
//! The flow is registry -> cache -> inference; the rebuilder sits
//! underneath the cache and is also invoked directly at startup to
//! guarantee the default model exists.

pub mod cache;
pub mod inference;
pub mod rebuild;
pub mod registry;
pub mod upload;

pub use cache::{LoadedModel, ModelCache};
pub use inference::InferenceService;
pub use rebuild::{RebuildConfig, Rebuilder};
pub use registry::{ModelDescriptor, Registry, RegistryStore};
pub use upload::{UploadPolicy, UploadRejection, ALLOWED_EXTENSIONS, DEFAULT_MAX_UPLOAD_BYTES};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cache::{LoadedModel, ModelCache};
    pub use crate::inference::InferenceService;
    pub use crate::rebuild::{RebuildConfig, Rebuilder};
    pub use crate::registry::{ModelDescriptor, Registry, RegistryStore};
    pub use crate::upload::UploadPolicy;
}
