//! Resource version reconciliation.
//!
//! A check compares three manifests:
//!
//! - the **target** manifest, published remotely, listing every resource
//!   that should exist;
//! - the **read-only** manifest of the immutable area bundled with the
//!   application;
//! - the **read-write** manifest of the mutable area holding earlier
//!   downloads.
//!
//! Each resource ends up with a [`Disposition`]. Usable resources go into
//! the resolved index of a new [`ResourceSnapshot`], resources that must be
//! fetched are reported as [`UpdateRequest`]s, and cached files that are no
//! longer wanted are deleted. Nothing is ever downloaded here.
//!
//! The primary entry point is [`ResourceChecker::check`].

mod assets;
mod checker;
mod context;
pub mod error;
mod events;
mod groups;
mod record;
mod recovery;
mod session;
mod settings;
mod source;

pub use crate::assets::{AssetIndex, AssetInfo};
pub use crate::checker::ResourceChecker;
pub use crate::context::{
    CachedResourceEntry, ManifestMetadata, ResolvedResourceEntry, ResourceContext, ResourceSnapshot, StorageArea,
};
pub use crate::events::{BestEffortFailure, CheckEvent, CheckOutcome, CheckSummary, UpdateRequest};
pub use crate::groups::{DEFAULT_GROUP, ResourceGroup, ResourceGroups};
pub use crate::record::{CheckRecord, Disposition, LocalObservation, TargetObservation, Verdict, classify};
pub use crate::recovery::{RecoveryOutcome, recover};
pub use crate::settings::CheckerSettings;
pub use crate::source::ManifestSource;
