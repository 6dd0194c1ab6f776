//! Resource manifests.
//!
//! Two manifest shapes exist:
//!
//! - [`TargetManifest`](models::TargetManifest): what *should* exist, published
//!   remotely. Carries resources with compressed sizes, the assets packed into
//!   them with their dependency graph, and named resource groups.
//! - [`LocalManifest`](models::LocalManifest): what *does* exist in a local
//!   storage area (the immutable bundle or the mutable download cache).
//!
//! Bytes become manifests through a [`ManifestCodec`]; [`FramedCodec`] is the
//! default one and the top-level [`decode_target`]/[`decode_local`] helpers
//! use it.

mod codec;
pub mod error;
pub mod models;
mod validate;

pub use crate::codec::{FramedCodec, MAX_BODY_LEN, ManifestCodec};
use crate::error::Result;
use crate::models::{LocalManifest, TargetManifest};
use tracing::instrument;

/// Decode and validate a target manifest with the default codec.
#[instrument(skip(bytes), fields(bytes = bytes.as_ref().len()))]
pub fn decode_target(bytes: impl AsRef<[u8]>) -> Result<TargetManifest> {
    FramedCodec::new().decode_target(bytes.as_ref())
}

/// Decode and validate a local manifest with the default codec.
#[instrument(skip(bytes), fields(bytes = bytes.as_ref().len()))]
pub fn decode_local(bytes: impl AsRef<[u8]>) -> Result<LocalManifest> {
    FramedCodec::new().decode_local(bytes.as_ref())
}
