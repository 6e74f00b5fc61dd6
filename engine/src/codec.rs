//! Backup file codec.
//!
//! A backup file is a gzip stream wrapping the CBOR encoding of a
//! [`Snapshot`]. Default-valued fields are never written (see
//! [`crate::snapshot`]), so the CBOR payload stays compact.
//!
//! Anything that does not decompress, or decompresses into bytes that are not
//! exactly one snapshot, is reported as [`Error::CorruptBackup`].

use crate::{error::Result, Error, Snapshot};
use flate2::{read::GzDecoder, write::GzEncoder};
use std::io::{Read, Write};
use tracing::instrument;

/// Gzip compression level used for new backups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compression(u32);

impl Compression {
    pub const MAX: u32 = 9;

    /// Create a compression level, rejecting anything outside `0..=9`.
    pub fn new(level: u32) -> Result<Self> {
        if level > Self::MAX {
            return Err(Error::InvalidConfig(format!(
                "compression level {} out of range 0..={}",
                level,
                Self::MAX
            )));
        }
        Ok(Self(level))
    }

    pub fn level(&self) -> u32 {
        self.0
    }
}

impl Default for Compression {
    fn default() -> Self {
        Self(6)
    }
}

impl From<Compression> for flate2::Compression {
    fn from(level: Compression) -> Self {
        flate2::Compression::new(level.0)
    }
}

/// Encode a snapshot with the default compression level.
pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>> {
    encode_with(snapshot, Compression::default())
}

/// Encode a snapshot into a compressed backup payload.
#[instrument(skip(snapshot), fields(items = snapshot.items.len(), level = level.level()))]
pub fn encode_with(snapshot: &Snapshot, level: Compression) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), level.into());
    ciborium::into_writer(snapshot, &mut encoder)
        .map_err(|e| Error::Serialization(format!("failed to encode snapshot: {e}")))?;
    encoder.flush()?;
    let bytes = encoder.finish()?;
    tracing::debug!(size = bytes.len(), "encoded snapshot");
    Ok(bytes)
}

/// Decode a compressed backup payload.
#[instrument(skip(bytes), fields(size = bytes.len()))]
pub fn decode(bytes: &[u8]) -> Result<Snapshot> {
    if bytes.is_empty() {
        return Err(Error::CorruptBackup("backup is empty".into()));
    }

    let mut raw = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut raw)
        .map_err(|e| Error::CorruptBackup(format!("decompression failed: {e}")))?;

    let mut reader = raw.as_slice();
    let snapshot: Snapshot = ciborium::from_reader(&mut reader)
        .map_err(|e| Error::CorruptBackup(format!("malformed snapshot: {e}")))?;
    if !reader.is_empty() {
        return Err(Error::CorruptBackup(format!(
            "{} trailing bytes after snapshot",
            reader.len()
        )));
    }

    snapshot.validate()?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{BackupCategory, BackupItem, BackupTrack, BackupUnit};

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::new(1_706_745_600_000);
        snapshot.categories.push(BackupCategory {
            name: "Action".into(),
            order: 2,
            flags: 0,
        });
        snapshot.items.push(BackupItem {
            external_key: "/series/1".into(),
            source_id: 11,
            title: "First".into(),
            tags: vec!["a".into(), "b".into()],
            favorite: true,
            last_update: 200,
            units: vec![BackupUnit {
                unit_key: "c1".into(),
                read: true,
                progress: 3,
                number: 1.5,
                ..Default::default()
            }],
            categories: vec![2],
            tracks: vec![BackupTrack {
                site_id: 1,
                last_read: 15.0,
                total_chapters: 18,
                ..Default::default()
            }],
            ..Default::default()
        });
        snapshot
    }

    #[test]
    fn roundtrip() {
        let snapshot = sample();
        let bytes = encode(&snapshot).unwrap();
        assert_eq!(decode(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn empty_snapshot_roundtrip() {
        let bytes = encode(&Snapshot::default()).unwrap();
        assert_eq!(decode(&bytes).unwrap(), Snapshot::default());
    }

    #[test]
    fn uncompressed_input_is_corrupt() {
        let mut cbor = Vec::new();
        ciborium::into_writer(&sample(), &mut cbor).unwrap();
        assert!(matches!(decode(&cbor), Err(Error::CorruptBackup(_))));
    }

    #[test]
    fn compressed_garbage_is_corrupt() {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"definitely not cbor").unwrap();
        let bytes = encoder.finish().unwrap();
        assert!(matches!(decode(&bytes), Err(Error::CorruptBackup(_))));
    }

    #[test]
    fn truncated_input_is_corrupt() {
        let bytes = encode(&sample()).unwrap();
        let truncated = &bytes[..bytes.len() / 2];
        assert!(matches!(decode(truncated), Err(Error::CorruptBackup(_))));
    }

    #[test]
    fn empty_input_is_corrupt() {
        assert!(matches!(decode(&[]), Err(Error::CorruptBackup(_))));
    }

    #[test]
    fn compression_level_bounds() {
        assert!(Compression::new(0).is_ok());
        assert!(Compression::new(9).is_ok());
        assert!(matches!(
            Compression::new(10),
            Err(Error::InvalidConfig(_))
        ));
    }
}
