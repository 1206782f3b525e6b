/*!
 * Append-Only File (AOF) Persistence
 *
 * Durability for mutating commands: every mutating request is appended,
 * RESP-encoded, to a single file. Restarting replays that file through
 * the same command registry against an empty store to reconstruct state.
 */

use crate::commands::Registry;
use crate::error::{Error, Result};
use crate::resp::{self, Reader, Value};
use crate::store::Store;
use log::warn;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct AofInner {
    file: File,
    at_end: bool,
    closed: bool,
}

/// An append-only log guarded by a single exclusive mutex covering file
/// position, the closed flag, and every write.
pub struct Aof {
    inner: Mutex<AofInner>,
}

impl Aof {
    /// Creates or opens the file at `path` for reading and writing, and
    /// launches the background flusher that calls fsync once per second
    /// until the returned handle is closed. The flusher is part of
    /// `open`'s own contract — there is no separate call an embedder
    /// needs to remember to make for periodic-fsync durability.
    pub fn open(path: impl AsRef<Path>) -> Result<Arc<Aof>> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path.as_ref())?;
        let aof = Arc::new(Aof {
            inner: Mutex::new(AofInner {
                file,
                at_end: false,
                closed: false,
            }),
        });
        let _ = spawn_flusher(Arc::clone(&aof));
        Ok(aof)
    }

    /// Seeks to the start, dispatches every logged request through
    /// `registry` against `store`, discarding the responses, then seeks
    /// to the end and marks the file ready for live appends. Unknown
    /// commands and non-Array records are skipped silently, for forward
    /// compatibility with logs written by a newer command set.
    pub fn replay(&self, store: &Store, registry: &Registry) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.file.seek(SeekFrom::Start(0))?;
        let mut reader = Reader::new(&mut inner.file);
        loop {
            match reader.read_value() {
                Ok(value) => replay_one(store, registry, &value),
                // Any codec/IO failure, including a clean EOF, ends replay.
                Err(_) => break,
            }
        }
        inner.file.seek(SeekFrom::End(0))?;
        inner.at_end = true;
        Ok(())
    }

    /// Serializes `value` and appends it under the exclusive mutex. Seeks
    /// to the end first if the file position isn't already known to be
    /// there (e.g. right after `open` with no prior `replay`).
    pub fn append(&self, value: &Value) -> Result<()> {
        let bytes = resp::encode(value);
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(Error::Closed);
        }
        if !inner.at_end {
            inner.file.seek(SeekFrom::End(0))?;
            inner.at_end = true;
        }
        inner.file.write_all(&bytes)?;
        Ok(())
    }

    /// Marks the log closed and fsyncs once more. Subsequent `append`
    /// calls return `Error::Closed`.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        if let Err(e) = inner.file.sync_all() {
            warn!("aof: final fsync on close failed: {}", e);
        }
    }
}

fn replay_one(store: &Store, registry: &Registry, value: &Value) {
    let items = match value.as_array() {
        Some(items) if !items.is_empty() => items,
        _ => return,
    };
    let name = match items[0].as_bulk() {
        Some(b) => b,
        None => return,
    };
    match registry.lookup(name) {
        Some(descriptor) => {
            descriptor.invoke(store, &items[1..]);
        }
        None => warn!("aof replay: skipping unknown command"),
    }
}

/// Spawns the background flusher: acquire the mutex, check closed, fsync,
/// release, sleep one second — terminating the first time it observes
/// the closed flag. Internal to `open`, which is the only caller.
fn spawn_flusher(aof: Arc<Aof>) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("aof-flusher".into())
        .spawn(move || loop {
            let mut inner = aof.inner.lock();
            if inner.closed {
                break;
            }
            if let Err(e) = inner.file.sync_data() {
                warn!("aof: periodic fsync failed: {}", e);
            }
            drop(inner);
            thread::sleep(Duration::from_secs(1));
        })
        .expect("failed to spawn aof-flusher thread")
}
