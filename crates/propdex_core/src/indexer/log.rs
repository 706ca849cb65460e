//! Durable operation log for the full-text indexer.
//!
//! Record layout:
//!
//! ```text
//! magic "PDXL" (4) | payload length u32 LE (4) | CBOR payload | CRC32 u32 LE (4)
//! ```
//!
//! The CRC covers magic, length and payload. A batch of operations is
//! always followed by a `Commit` record in the same append; on recovery
//! everything after the last commit is dropped.

use crate::document::Document;
use crate::error::{IndexError, IndexResult};
use propdex_storage::{Directory, IndexFile};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Name of the live log file.
pub(crate) const LOG_FILE: &str = "index.log";

/// Name of the file a compaction writes before swapping it in.
pub(crate) const COMPACT_FILE: &str = "index.log.tmp";

/// Magic bytes identifying a log record.
const LOG_MAGIC: [u8; 4] = *b"PDXL";

/// magic (4) + length (4)
const HEADER_SIZE: usize = 8;

const CRC_SIZE: usize = 4;

/// One logged index operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum IndexOp {
    /// Add a document.
    Add(Document),
    /// Replace the documents matching the document's `id_field` value.
    Update {
        id_field: String,
        document: Document,
    },
    /// Delete by identifier and class.
    Delete { id: String, class: String },
    /// Everything before this record is committed.
    Commit { generation: u64 },
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RecordError {
    Truncated,
    BadMagic,
    Checksum { expected: u32, actual: u32 },
    Payload(String),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => f.write_str("truncated record"),
            Self::BadMagic => f.write_str("bad record magic"),
            Self::Checksum { expected, actual } => write!(
                f,
                "checksum mismatch (expected {expected:#010x}, got {actual:#010x})"
            ),
            Self::Payload(reason) => write!(f, "undecodable payload: {reason}"),
        }
    }
}

/// Frames one operation.
pub(crate) fn encode_record(op: &IndexOp) -> IndexResult<Vec<u8>> {
    let mut payload = Vec::new();
    ciborium::into_writer(op, &mut payload)
        .map_err(|e| IndexError::write(format!("cannot encode log record: {e}")))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| IndexError::write("log record payload too large"))?;

    let mut record = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
    record.extend_from_slice(&LOG_MAGIC);
    record.extend_from_slice(&len.to_le_bytes());
    record.extend_from_slice(&payload);
    let crc = crc32fast::hash(&record);
    record.extend_from_slice(&crc.to_le_bytes());
    Ok(record)
}

/// Decodes the record at the start of `bytes`, returning it with its
/// framed length.
pub(crate) fn decode_record(bytes: &[u8]) -> Result<(IndexOp, usize), RecordError> {
    if bytes.len() < HEADER_SIZE {
        return Err(RecordError::Truncated);
    }
    if bytes[..4] != LOG_MAGIC {
        return Err(RecordError::BadMagic);
    }
    let len_bytes: [u8; 4] = bytes[4..8]
        .try_into()
        .map_err(|_| RecordError::Truncated)?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    let total = HEADER_SIZE + len + CRC_SIZE;
    if bytes.len() < total {
        return Err(RecordError::Truncated);
    }

    let body = &bytes[..HEADER_SIZE + len];
    let crc_bytes: [u8; 4] = bytes[HEADER_SIZE + len..total]
        .try_into()
        .map_err(|_| RecordError::Truncated)?;
    let expected = u32::from_le_bytes(crc_bytes);
    let actual = crc32fast::hash(body);
    if expected != actual {
        return Err(RecordError::Checksum { expected, actual });
    }

    let op = ciborium::from_reader(&body[HEADER_SIZE..])
        .map_err(|e| RecordError::Payload(e.to_string()))?;
    Ok((op, total))
}

/// Result of replaying a log.
#[derive(Debug, Default)]
pub(crate) struct Recovered {
    /// Committed operations in log order, commit markers removed.
    pub ops: Vec<IndexOp>,
    /// Generation of the last commit.
    pub generation: u64,
    /// Byte length of the committed prefix.
    pub committed_len: u64,
    /// Operations after the last commit that were dropped.
    pub discarded: usize,
    /// Whether an unreadable tail was found.
    pub torn: bool,
}

/// Replays log bytes.
///
/// # Errors
///
/// Returns [`IndexError::Corrupted`] if an unreadable record is followed
/// by a valid commit, which means committed data was damaged.
pub(crate) fn recover(bytes: &[u8]) -> IndexResult<Recovered> {
    let mut recovered = Recovered::default();
    let mut batch = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        match decode_record(&bytes[offset..]) {
            Ok((IndexOp::Commit { generation }, len)) => {
                offset += len;
                recovered.ops.append(&mut batch);
                recovered.generation = generation;
                recovered.committed_len = offset as u64;
            }
            Ok((op, len)) => {
                offset += len;
                batch.push(op);
            }
            Err(err) => {
                if commit_follows(bytes, offset + 1) {
                    return Err(IndexError::corrupted(format!(
                        "{err} at offset {offset} precedes committed records"
                    )));
                }
                warn!(offset, error = %err, "dropping torn tail of index log");
                recovered.torn = true;
                break;
            }
        }
    }

    recovered.discarded = batch.len();
    if recovered.discarded > 0 {
        debug!(
            discarded = recovered.discarded,
            "dropping uncommitted index operations"
        );
    }
    Ok(recovered)
}

/// Returns true if a valid commit record starts anywhere at or after `from`.
fn commit_follows(bytes: &[u8], from: usize) -> bool {
    (from..bytes.len().saturating_sub(HEADER_SIZE - 1)).any(|start| {
        bytes[start..].starts_with(&LOG_MAGIC)
            && matches!(
                decode_record(&bytes[start..]),
                Ok((IndexOp::Commit { .. }, _))
            )
    })
}

/// Append handle over the log file.
pub(crate) struct IndexLog {
    file: Box<dyn IndexFile>,
    sync_on_commit: bool,
}

impl IndexLog {
    /// Opens the named log file in `directory`.
    pub fn open(directory: &dyn Directory, name: &str, sync_on_commit: bool) -> IndexResult<Self> {
        Ok(Self {
            file: directory.open_file(name)?,
            sync_on_commit,
        })
    }

    /// Wraps an already open file.
    pub fn from_file(file: Box<dyn IndexFile>, sync_on_commit: bool) -> Self {
        Self {
            file,
            sync_on_commit,
        }
    }

    /// Appends `ops` followed by a commit record as one write.
    ///
    /// On failure the file is cut back to its previous length so a later
    /// commit never lands behind a partial batch.
    pub fn append_commit(&mut self, ops: &[IndexOp], generation: u64) -> IndexResult<()> {
        let mut data = Vec::new();
        for op in ops {
            data.extend_from_slice(&encode_record(op)?);
        }
        data.extend_from_slice(&encode_record(&IndexOp::Commit { generation })?);

        let before = self.size()?;
        let written = self.file.append(&data).and_then(|_| {
            if self.sync_on_commit {
                self.file.sync()
            } else {
                self.file.flush()
            }
        });
        if let Err(err) = written {
            if let Err(cleanup) = self.file.truncate(before) {
                warn!(error = %cleanup, "cannot cut back failed log append");
            }
            return Err(IndexError::write(err.to_string()));
        }
        Ok(())
    }

    /// Current size in bytes.
    pub fn size(&self) -> IndexResult<u64> {
        self.file
            .size()
            .map_err(|e| IndexError::write(e.to_string()))
    }

    /// Forces appended data to durable storage.
    pub fn sync(&mut self) -> IndexResult<()> {
        self.file.sync().map_err(|e| IndexError::write(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propdex_storage::RamDirectory;

    fn doc(id: &str) -> Document {
        let mut doc = Document::new();
        doc.add_keyword(crate::document::ENTITY_ID_FIELD, id);
        doc
    }

    fn log_bytes(batches: &[(&[IndexOp], u64)]) -> Vec<u8> {
        let dir = RamDirectory::new();
        let mut log = IndexLog::open(&dir, LOG_FILE, true).unwrap();
        for (ops, generation) in batches {
            log.append_commit(ops, *generation).unwrap();
        }
        dir.file_bytes(LOG_FILE).unwrap()
    }

    #[test]
    fn record_layout() {
        let record = encode_record(&IndexOp::Commit { generation: 7 }).unwrap();
        assert_eq!(&record[..4], b"PDXL");
        let len = u32::from_le_bytes(record[4..8].try_into().unwrap()) as usize;
        assert_eq!(record.len(), HEADER_SIZE + len + CRC_SIZE);
        let (op, consumed) = decode_record(&record).unwrap();
        assert_eq!(op, IndexOp::Commit { generation: 7 });
        assert_eq!(consumed, record.len());
    }

    #[test]
    fn detects_bit_flips() {
        let mut record = encode_record(&IndexOp::Add(doc("p1"))).unwrap();
        let mid = record.len() / 2;
        record[mid] ^= 0xFF;
        assert!(matches!(
            decode_record(&record),
            Err(RecordError::Checksum { .. })
        ));
        assert_eq!(decode_record(&record[..6]), Err(RecordError::Truncated));
        assert_eq!(decode_record(b"XXXXXXXXXXXX"), Err(RecordError::BadMagic));
    }

    #[test]
    fn replays_committed_batches() {
        let bytes = log_bytes(&[
            (&[IndexOp::Add(doc("p1")), IndexOp::Add(doc("p2"))], 1),
            (
                &[IndexOp::Delete {
                    id: "p1".into(),
                    class: "Person".into(),
                }],
                2,
            ),
        ]);
        let recovered = recover(&bytes).unwrap();
        assert_eq!(recovered.ops.len(), 3);
        assert_eq!(recovered.generation, 2);
        assert_eq!(recovered.committed_len, bytes.len() as u64);
        assert!(!recovered.torn);
    }

    #[test]
    fn drops_uncommitted_and_torn_tail() {
        let mut bytes = log_bytes(&[(&[IndexOp::Add(doc("p1"))], 1)]);
        let committed = bytes.len() as u64;
        bytes.extend_from_slice(&encode_record(&IndexOp::Add(doc("p2"))).unwrap());
        let torn = encode_record(&IndexOp::Add(doc("p3"))).unwrap();
        bytes.extend_from_slice(&torn[..torn.len() - 3]);

        let recovered = recover(&bytes).unwrap();
        assert_eq!(recovered.ops, vec![IndexOp::Add(doc("p1"))]);
        assert_eq!(recovered.committed_len, committed);
        assert_eq!(recovered.discarded, 1);
        assert!(recovered.torn);
    }

    #[test]
    fn damage_before_a_commit_is_corruption() {
        let mut bytes = log_bytes(&[
            (&[IndexOp::Add(doc("p1"))], 1),
            (&[IndexOp::Add(doc("p2"))], 2),
        ]);
        bytes[HEADER_SIZE + 2] ^= 0xFF;
        let err = recover(&bytes).unwrap_err();
        assert!(matches!(err, IndexError::Corrupted { .. }));
    }

    #[test]
    fn empty_log() {
        let recovered = recover(&[]).unwrap();
        assert!(recovered.ops.is_empty());
        assert_eq!(recovered.generation, 0);
        assert_eq!(recovered.committed_len, 0);
    }
}
