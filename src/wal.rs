use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use crate::model::Event;

/// Bytes of framing around each payload: length prefix and crc32 suffix.
const FRAME_OVERHEAD: u64 = 8;

/// Append-only Write-Ahead Log for the floor plan and confirmed reservations.
///
/// Format per entry: `[u32: len][bincode: Event][u32: crc32]`, little-endian.
/// A torn or corrupt tail (crash mid-append) is cut off by [`Wal::recover`]
/// before the file is reopened for appending.
pub struct Wal {
    file: File,
    path: PathBuf,
    /// Set when a failed append could not be rolled back; every later append is refused.
    poisoned: bool,
    #[cfg(test)]
    pub(crate) fail_next_sync: bool,
}

/// Result of reading a WAL file front to back.
struct Scan {
    events: Vec<Event>,
    /// Length of the intact prefix.
    valid_len: u64,
    file_len: u64,
}

impl Wal {
    /// Open (or create) the WAL file at `path`.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            poisoned: false,
            #[cfg(test)]
            fail_next_sync: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a batch of events and fsync once. Nothing is acknowledged
    /// until the whole batch is on disk. On failure the file is cut back
    /// to its previous length, so a rejected batch never resurfaces on replay.
    pub fn append_all(&mut self, events: &[Event]) -> io::Result<()> {
        if self.poisoned {
            return Err(io::Error::other("WAL is unusable after a failed rollback"));
        }
        let mut buf = Vec::new();
        for event in events {
            encode_frame(&mut buf, event)?;
        }

        let len_before = self.file.metadata()?.len();
        if let Err(e) = self.write_durably(&buf) {
            let rollback = self
                .file
                .set_len(len_before)
                .and_then(|()| self.file.sync_all());
            if let Err(re) = rollback {
                tracing::error!(
                    "{}: rollback to {len_before} bytes failed, refusing further writes: {re}",
                    self.path.display()
                );
                self.poisoned = true;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Append a single event and fsync.
    #[cfg(test)]
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        self.append_all(std::slice::from_ref(event))
    }

    fn write_durably(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf)?;
        #[cfg(test)]
        if std::mem::take(&mut self.fail_next_sync) {
            return Err(io::Error::other("injected fsync failure"));
        }
        self.file.sync_all()
    }

    /// Read every intact event from disk. A missing file replays as empty.
    pub fn replay(path: &Path) -> io::Result<Vec<Event>> {
        Ok(scan(path)?.events)
    }

    /// Replay, then truncate any torn or corrupt tail so entries appended
    /// afterwards stay reachable on the next replay.
    pub fn recover(path: &Path) -> io::Result<Vec<Event>> {
        let scan = scan(path)?;
        if scan.valid_len < scan.file_len {
            tracing::warn!(
                "{}: truncating {} damaged bytes after {} events",
                path.display(),
                scan.file_len - scan.valid_len,
                scan.events.len()
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(scan.valid_len)?;
            file.sync_all()?;
        }
        Ok(scan.events)
    }
}

fn encode_frame(buf: &mut Vec<u8>, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "WAL entry too large"))?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&payload);
    buf.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    Ok(())
}

fn scan(path: &Path) -> io::Result<Scan> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(Scan {
                events: Vec::new(),
                valid_len: 0,
                file_len: 0,
            });
        }
        Err(e) => return Err(e),
    };
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    let mut events = Vec::new();
    let mut valid_len = 0u64;

    while let Some(payload) = read_frame(&mut reader, file_len - valid_len)? {
        match bincode::deserialize::<Event>(&payload) {
            Ok(event) => events.push(event),
            Err(_) => {
                tracing::warn!(
                    "{}: undecodable entry after {} events",
                    path.display(),
                    events.len()
                );
                break;
            }
        }
        valid_len += payload.len() as u64 + FRAME_OVERHEAD;
    }

    Ok(Scan {
        events,
        valid_len,
        file_len,
    })
}

/// Read one `[len][payload][crc]` frame with at most `remaining` bytes left in the file.
/// `None` at EOF, on truncation, or on CRC mismatch.
fn read_frame(reader: &mut impl Read, remaining: u64) -> io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    if !read_or_eof(reader, &mut len_buf)? {
        return Ok(None);
    }
    let len = u64::from(u32::from_le_bytes(len_buf));
    if len + FRAME_OVERHEAD > remaining {
        return Ok(None);
    }
    let mut payload = vec![0u8; len as usize];
    if !read_or_eof(reader, &mut payload)? {
        return Ok(None);
    }
    let mut crc_buf = [0u8; 4];
    if !read_or_eof(reader, &mut crc_buf)? {
        return Ok(None);
    }
    if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
        return Ok(None);
    }
    Ok(Some(payload))
}

fn read_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}
