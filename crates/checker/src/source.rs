use derive_more::Display;

/// One of the three manifests a check waits for.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestSource {
    /// The authoritative manifest published remotely.
    #[display("target")]
    Target,
    /// The manifest of the immutable storage area.
    #[display("read-only")]
    ReadOnly,
    /// The manifest of the mutable storage area.
    #[display("read-write")]
    ReadWrite,
}

impl ManifestSource {
    pub const ALL: [ManifestSource; 3] = [ManifestSource::Target, ManifestSource::ReadOnly, ManifestSource::ReadWrite];

    /// Ready-flag bit of this source.
    pub(crate) const fn bit(self) -> u8 {
        match self {
            Self::Target => 0b001,
            Self::ReadOnly => 0b010,
            Self::ReadWrite => 0b100,
        }
    }

    /// All ready-flag bits set.
    pub(crate) const ALL_BITS: u8 = 0b111;
}
