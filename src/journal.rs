//! Ledger journal - durable append-only record of committed pairs
//!
//! One frame per debit/credit pair, so the atomic commit unit maps to a
//! single record on disk. A torn tail frame is detected by length or
//! checksum and replay stops there.
//!
//! # Frame layout (8-byte header + payload)
//!
//! ```text
//! ┌─────────────┬─────────┬──────────────────────────────┐
//! │ payload_len │ 2 bytes │ bincode payload size         │
//! │ record_type │ 1 byte  │ 1 = ledger pair              │
//! │ version     │ 1 byte  │ payload format version       │
//! │ checksum    │ 4 bytes │ CRC32 of payload             │
//! └─────────────┴─────────┴──────────────────────────────┘
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ledger::LedgerEntry;

const FRAME_HEADER_SIZE: usize = 8;
const RECORD_TYPE_PAIR: u8 = 1;
const PAYLOAD_VERSION: u8 = 0;

/// Journal configuration
#[derive(Debug, Clone)]
pub struct JournalConfig {
    pub path: String,
    /// fsync after every pair (durability over throughput; pairs are rare
    /// compared to an order stream)
    pub sync_on_append: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: "data/ledger.journal".to_string(),
            sync_on_append: true,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PairRecord {
    debit: LedgerEntry,
    credit: LedgerEntry,
}

/// Append-only journal writer.
pub struct Journal {
    writer: BufWriter<File>,
    config: JournalConfig,
    appended_pairs: u64,
}

impl Journal {
    /// Open (or create) the journal file for appending. Creates parent
    /// directories as needed.
    pub fn open(config: JournalConfig) -> io::Result<Self> {
        if let Some(parent) = Path::new(&config.path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self {
            writer: BufWriter::with_capacity(16 * 1024, file),
            config,
            appended_pairs: 0,
        })
    }

    /// Append one debit/credit pair as a single frame and make it
    /// durable before returning.
    pub fn append_pair(&mut self, debit: &LedgerEntry, credit: &LedgerEntry) -> io::Result<()> {
        let payload = bincode::serialize(&PairRecord {
            debit: debit.clone(),
            credit: credit.clone(),
        })
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if payload.len() > u16::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "journal payload exceeds frame limit",
            ));
        }

        let mut header = [0u8; FRAME_HEADER_SIZE];
        header[0..2].copy_from_slice(&(payload.len() as u16).to_le_bytes());
        header[2] = RECORD_TYPE_PAIR;
        header[3] = PAYLOAD_VERSION;
        header[4..8].copy_from_slice(&crc32(&payload).to_le_bytes());

        self.writer.write_all(&header)?;
        self.writer.write_all(&payload)?;
        self.writer.flush()?;
        if self.config.sync_on_append {
            self.writer.get_ref().sync_data()?;
        }
        self.appended_pairs += 1;
        Ok(())
    }

    pub fn appended_pairs(&self) -> u64 {
        self.appended_pairs
    }

    /// Replay all intact frames from a journal file. A missing file is an
    /// empty journal; a torn or corrupt tail frame ends the replay with a
    /// warning rather than an error, matching append-crash semantics.
    pub fn replay(path: &str) -> io::Result<Vec<LedgerEntry>> {
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;

        let mut entries = Vec::new();
        let mut offset = 0usize;

        while offset + FRAME_HEADER_SIZE <= buf.len() {
            let header = &buf[offset..offset + FRAME_HEADER_SIZE];
            let payload_len = u16::from_le_bytes([header[0], header[1]]) as usize;
            let record_type = header[2];
            let checksum = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

            let payload_start = offset + FRAME_HEADER_SIZE;
            let payload_end = payload_start + payload_len;
            if payload_end > buf.len() {
                warn!(offset, "truncated journal frame, stopping replay");
                break;
            }

            let payload = &buf[payload_start..payload_end];
            if crc32(payload) != checksum {
                warn!(offset, "journal frame checksum mismatch, stopping replay");
                break;
            }

            if record_type == RECORD_TYPE_PAIR {
                match bincode::deserialize::<PairRecord>(payload) {
                    Ok(record) => {
                        entries.push(record.debit);
                        entries.push(record.credit);
                    }
                    Err(e) => {
                        warn!(offset, error = %e, "undecodable journal frame, stopping replay");
                        break;
                    }
                }
            }

            offset = payload_end;
        }

        Ok(entries)
    }
}

fn crc32(payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::types::TransferId;

    fn temp_journal_path(tag: &str) -> String {
        std::env::temp_dir()
            .join(format!("neoledger-journal-{}-{}.bin", tag, ulid::Ulid::new()))
            .to_string_lossy()
            .into_owned()
    }

    fn entry(entry_id: u64, account_id: u64, delta: i64, balance_after: u64) -> LedgerEntry {
        LedgerEntry {
            entry_id,
            transfer_id: TransferId::new(),
            account_id,
            seq: entry_id,
            delta,
            balance_after,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn test_append_and_replay() {
        let path = temp_journal_path("roundtrip");
        let mut journal = Journal::open(JournalConfig {
            path: path.clone(),
            sync_on_append: false,
        })
        .unwrap();

        let d = entry(1, 10, -100, 900);
        let c = entry(2, 20, 100, 1_100);
        journal.append_pair(&d, &c).unwrap();
        assert_eq!(journal.appended_pairs(), 1);
        drop(journal);

        let replayed = Journal::replay(&path).unwrap();
        assert_eq!(replayed, vec![d, c]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_replay_missing_file_is_empty() {
        let path = temp_journal_path("missing");
        assert!(Journal::replay(&path).unwrap().is_empty());
    }

    #[test]
    fn test_replay_stops_at_torn_frame() {
        let path = temp_journal_path("torn");
        let mut journal = Journal::open(JournalConfig {
            path: path.clone(),
            sync_on_append: false,
        })
        .unwrap();
        journal.append_pair(&entry(1, 10, -5, 95), &entry(2, 20, 5, 105)).unwrap();
        journal.append_pair(&entry(3, 10, -5, 90), &entry(4, 20, 5, 110)).unwrap();
        drop(journal);

        // Chop bytes off the tail to simulate a crash mid-append.
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 7]).unwrap();

        let replayed = Journal::replay(&path).unwrap();
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[0].entry_id, 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_replay_rejects_corrupt_checksum() {
        let path = temp_journal_path("corrupt");
        let mut journal = Journal::open(JournalConfig {
            path: path.clone(),
            sync_on_append: false,
        })
        .unwrap();
        journal.append_pair(&entry(1, 10, -5, 95), &entry(2, 20, 5, 105)).unwrap();
        drop(journal);

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        assert!(Journal::replay(&path).unwrap().is_empty());
        let _ = std::fs::remove_file(&path);
    }
}
