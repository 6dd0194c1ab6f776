mod load_type;
mod local;
mod name;
mod target;

pub use self::load_type::LoadType;
pub use self::local::{LocalManifest, LocalResource};
pub use self::name::ResourceName;
pub use self::target::{TargetAsset, TargetManifest, TargetResource, TargetResourceGroup};
