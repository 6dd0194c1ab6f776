//! Manifest wire format.
//!
//! ```text
//! +-------+---------+------+-------+-----------+----------------+
//! | magic | version | kind | flags | crc32 LE  | body ...       |
//! | RMAN  | u8 = 1  | T/L  | u8    | u32       | JSON (or gzip) |
//! +-------+---------+------+-------+-----------+----------------+
//! ```
//!
//! The CRC covers the body exactly as stored (after compression), so a
//! truncated or bit-flipped download is rejected before decompression.

use crate::error::{ErrorKind, Result};
use crate::models::{LocalManifest, TargetManifest};
use exn::ResultExt;
use flate2::Compression as GzLevel;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{Read, Write};

const MAGIC: &[u8; 4] = b"RMAN";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = 4 + 1 + 1 + 1 + 4;
const FLAG_GZIP: u8 = 0b0000_0001;

/// Default ceiling for a decompressed manifest body.
pub const MAX_BODY_LEN: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Target,
    Local,
}
impl Kind {
    fn tag(self) -> u8 {
        match self {
            Kind::Target => b'T',
            Kind::Local => b'L',
        }
    }

    fn name(self) -> &'static str {
        match self {
            Kind::Target => "target",
            Kind::Local => "local",
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            b'T' => Ok(Kind::Target),
            b'L' => Ok(Kind::Local),
            _ => exn::bail!(ErrorKind::MalformedFrame("unknown manifest kind")),
        }
    }
}

/// Turns raw bytes into validated manifest value objects.
///
/// Implementations must only hand back manifests that passed
/// [`TargetManifest::validate`] / [`LocalManifest::validate`].
pub trait ManifestCodec: Send + Sync {
    fn decode_target(&self, bytes: &[u8]) -> Result<TargetManifest>;
    fn decode_local(&self, bytes: &[u8]) -> Result<LocalManifest>;
    fn encode_target(&self, manifest: &TargetManifest) -> Result<Vec<u8>>;
    fn encode_local(&self, manifest: &LocalManifest) -> Result<Vec<u8>>;
}

/// The default [`ManifestCodec`]: a checksummed frame around a JSON body,
/// optionally gzip-compressed.
///
/// Decoding accepts either body encoding regardless of how the codec was
/// configured; `compress` only affects encoding. A gzip body inflating past
/// the body limit ([`MAX_BODY_LEN`] unless changed) is rejected.
#[derive(Debug, Clone, Copy)]
pub struct FramedCodec {
    compress: bool,
    max_body_len: u64,
}
impl Default for FramedCodec {
    fn default() -> Self {
        Self { compress: false, max_body_len: MAX_BODY_LEN }
    }
}
impl FramedCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gzip bodies when encoding.
    pub fn compressed() -> Self {
        Self { compress: true, ..Self::default() }
    }

    pub fn with_max_body_len(mut self, max_body_len: u64) -> Self {
        self.max_body_len = max_body_len;
        self
    }

    fn encode<T: Serialize>(&self, kind: Kind, value: &T) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(value).or_raise(|| ErrorKind::Encode)?;
        let (flags, body) = match self.compress {
            true => {
                let mut encoder = GzEncoder::new(Vec::new(), GzLevel::best());
                encoder.write_all(&json).or_raise(|| ErrorKind::Encode)?;
                (FLAG_GZIP, encoder.finish().or_raise(|| ErrorKind::Encode)?)
            },
            false => (0, json),
        };
        let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
        frame.extend_from_slice(MAGIC);
        frame.push(FORMAT_VERSION);
        frame.push(kind.tag());
        frame.push(flags);
        frame.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    fn decode<T: DeserializeOwned>(&self, expected: Kind, bytes: &[u8]) -> Result<T> {
        if bytes.len() < HEADER_LEN {
            exn::bail!(ErrorKind::MalformedFrame("shorter than header"));
        }
        let (header, body) = bytes.split_at(HEADER_LEN);
        if &header[..4] != MAGIC {
            exn::bail!(ErrorKind::MalformedFrame("bad magic bytes"));
        }
        if header[4] != FORMAT_VERSION {
            exn::bail!(ErrorKind::UnsupportedVersion(header[4]));
        }
        let kind = Kind::from_tag(header[5])?;
        if kind != expected {
            exn::bail!(ErrorKind::WrongKind { expected: expected.name(), found: kind.name() });
        }
        let flags = header[6];
        let expected_crc = u32::from_le_bytes([header[7], header[8], header[9], header[10]]);
        let actual_crc = crc32fast::hash(body);
        if expected_crc != actual_crc {
            exn::bail!(ErrorKind::ChecksumMismatch { expected: expected_crc, actual: actual_crc });
        }
        if flags & FLAG_GZIP == 0 {
            return serde_json::from_slice(body).or_raise(|| ErrorKind::Deserialize);
        }
        // One byte past the limit is enough to tell it was exceeded.
        let mut json = Vec::new();
        GzDecoder::new(body)
            .take(self.max_body_len.saturating_add(1))
            .read_to_end(&mut json)
            .or_raise(|| ErrorKind::Decompression)?;
        if json.len() as u64 > self.max_body_len {
            exn::bail!(ErrorKind::Decompression);
        }
        serde_json::from_slice(&json).or_raise(|| ErrorKind::Deserialize)
    }
}

impl ManifestCodec for FramedCodec {
    fn decode_target(&self, bytes: &[u8]) -> Result<TargetManifest> {
        let manifest: TargetManifest = self.decode(Kind::Target, bytes)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn decode_local(&self, bytes: &[u8]) -> Result<LocalManifest> {
        let manifest: LocalManifest = self.decode(Kind::Local, bytes)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn encode_target(&self, manifest: &TargetManifest) -> Result<Vec<u8>> {
        self.encode(Kind::Target, manifest)
    }

    fn encode_local(&self, manifest: &LocalManifest) -> Result<Vec<u8>> {
        self.encode(Kind::Local, manifest)
    }
}
