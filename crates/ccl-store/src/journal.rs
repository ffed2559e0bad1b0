use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ccl_types::LedgerEntry;

use crate::error::{StoreError, StoreResult};

/// Flush/sync strategy for the journal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every append (an acknowledged entry survives power loss).
    #[default]
    EveryWrite,
    /// Flush to the OS only (survives a process crash, not power loss).
    OsDefault,
}

/// Header size: 4 bytes length + 4 bytes length CRC + 4 bytes payload CRC.
const HEADER_SIZE: usize = 12;

/// Append-only entry journal.
///
/// On-disk format, repeated once per entry:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of the length field (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (JSON-encoded LedgerEntry)]
/// ```
///
/// Each frame is assembled in memory and written with a single call, so a
/// crash can only leave a torn frame at the very end of the file. The
/// length has its own checksum: a frame whose header is intact but whose
/// payload runs past the end of the file is torn, while a damaged header
/// is corruption.
pub struct Journal {
    path: PathBuf,
    file: File,
    /// End of the last complete frame.
    offset: u64,
    sync_mode: SyncMode,
    /// Set when a failed append could not be rolled back. The file may end
    /// in a partial frame, so further appends are refused until the
    /// journal is truncated or reopened.
    broken: bool,
}

impl Journal {
    /// Open (or create) the journal file at the given path.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset,
            sync_mode,
            broken: false,
        })
    }

    /// Append one entry. Returns the byte offset of its frame.
    ///
    /// If the write fails the file is cut back to its previous length so
    /// no partial frame is left behind.
    pub fn append(&mut self, entry: &LedgerEntry) -> StoreResult<u64> {
        if self.broken {
            return Err(StoreError::Unavailable(format!(
                "journal {} has an unrolled partial frame; reopen required",
                self.path.display()
            )));
        }

        let payload =
            serde_json::to_vec(entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len()).map_err(|_| {
            StoreError::Serialization(format!("entry {} too large to journal", entry.id))
        })?;
        let length_bytes = length.to_le_bytes();

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.extend_from_slice(&length_bytes);
        frame.extend_from_slice(&crc32fast::hash(&length_bytes).to_le_bytes());
        frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        frame.extend_from_slice(&payload);

        let entry_offset = self.offset;
        if let Err(e) = self.write_frame(&frame) {
            if let Err(rollback) = self.file.set_len(entry_offset) {
                self.broken = true;
                warn!(
                    offset = entry_offset,
                    error = %rollback,
                    "journal rollback failed; refusing further appends"
                );
            }
            return Err(e.into());
        }

        self.offset += frame.len() as u64;
        debug!(offset = entry_offset, len = payload.len(), id = %entry.id, "journal append");
        Ok(entry_offset)
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.file.write_all(frame)?;
        self.file.flush()?;
        if self.sync_mode == SyncMode::EveryWrite {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Read back every complete entry, in append order.
    ///
    /// Only an interrupted append is repaired: a partial header, or an
    /// intact header whose payload runs past the end of the file, is
    /// logged and truncated away. A damaged header is reported as
    /// [`StoreError::CorruptJournal`] and nothing is truncated. A payload
    /// that fails its CRC but still decodes is loaded with a warning, so
    /// the signature sweep reports it; one that does not decode is
    /// corruption.
    pub fn recover(&mut self) -> StoreResult<Vec<LedgerEntry>> {
        let bytes = fs::read(&self.path)?;
        let file_len = bytes.len() as u64;
        let mut entries = Vec::new();
        let mut offset: usize = 0;

        while offset < bytes.len() {
            let remaining = bytes.len() - offset;
            if remaining < HEADER_SIZE {
                self.cut_torn_tail(offset as u64, file_len)?;
                break;
            }

            let header = &bytes[offset..offset + HEADER_SIZE];
            let length_bytes = [header[0], header[1], header[2], header[3]];
            let length_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
            let expected_crc = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);

            if crc32fast::hash(&length_bytes) != length_crc {
                return Err(StoreError::CorruptJournal {
                    offset: offset as u64,
                    reason: "frame header checksum mismatch".into(),
                });
            }
            let length = u32::from_le_bytes(length_bytes) as usize;
            if length == 0 {
                return Err(StoreError::CorruptJournal {
                    offset: offset as u64,
                    reason: "zero-length frame".into(),
                });
            }
            if remaining - HEADER_SIZE < length {
                self.cut_torn_tail(offset as u64, file_len)?;
                break;
            }

            let payload = &bytes[offset + HEADER_SIZE..offset + HEADER_SIZE + length];
            let actual_crc = crc32fast::hash(payload);
            let decoded = serde_json::from_slice::<LedgerEntry>(payload);
            let entry = match (actual_crc == expected_crc, decoded) {
                (true, Ok(entry)) => entry,
                (false, Ok(entry)) => {
                    warn!(
                        offset,
                        id = %entry.id,
                        expected = expected_crc,
                        actual = actual_crc,
                        "journal frame modified after write; loading it for verification"
                    );
                    entry
                }
                (_, Err(e)) => {
                    return Err(StoreError::CorruptJournal {
                        offset: offset as u64,
                        reason: if actual_crc == expected_crc {
                            e.to_string()
                        } else {
                            format!(
                                "CRC expected {expected_crc:#010x}, got {actual_crc:#010x}: {e}"
                            )
                        },
                    })
                }
            };
            entries.push(entry);
            offset += HEADER_SIZE + length;
        }

        debug!(recovered = entries.len(), "journal recovery complete");
        Ok(entries)
    }

    fn cut_torn_tail(&mut self, at: u64, file_len: u64) -> StoreResult<()> {
        warn!(
            offset = at,
            discarded = file_len - at,
            path = %self.path.display(),
            "torn journal frame; truncating"
        );
        self.file.set_len(at)?;
        self.file.sync_all()?;
        self.offset = at;
        Ok(())
    }

    /// Remove every frame.
    pub fn truncate(&mut self) -> StoreResult<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.offset = 0;
        self.broken = false;
        debug!("journal truncated");
        Ok(())
    }

    /// Current end of the journal in bytes.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
