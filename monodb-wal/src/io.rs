//! Platform file-I/O capability boundary.
//!
//! A thin seam between the engine and the filesystem, per the capability set
//! called for in the design notes: `create, open_rw, open_r, read_at, write,
//! seek, sync, data_sync, truncate, enumerate_dir`. There is exactly one
//! implementation in this workspace, so these are free functions rather than
//! a trait object — the point is to keep platform specifics (sparse vs.
//! eager preallocation, the `Seek`-then-read emulation of positioned reads)
//! collected in one place, not to support multiple backends.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Creates a new file at `path`, truncating if one exists, and preallocates
/// it to `size` bytes. Preallocation is sparse: `set_len` extends the file
/// without writing zeroes, which every target this crate ships on supports.
pub fn create(path: &Path, size: u64) -> io::Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .read(true)
        .write(true)
        .open(path)?;
    file.set_len(size)?;
    Ok(file)
}

/// Opens an existing file read/write.
pub fn open_rw(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).write(true).open(path)
}

/// Opens an existing file read-only.
pub fn open_r(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).open(path)
}

/// Reads `buf.len()` bytes starting at `offset`, without disturbing any
/// other cursor position the caller cares about. `std` has no portable
/// positioned-read primitive that works uniformly across platforms for this
/// crate's target set, so this is emulated with `seek` + `read_exact`.
pub fn read_at(file: &mut File, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(buf)
}

/// Writes `buf` at the file's current position, returning the number of
/// bytes actually written (a short write is reported, not silently retried —
/// the caller treats short writes as failures per the writer's contract).
pub fn write(file: &mut File, buf: &[u8]) -> io::Result<usize> {
    file.write(buf)
}

pub fn seek(file: &mut File, offset: u64) -> io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    Ok(())
}

/// Full sync: data and metadata both durable.
pub fn sync(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Data-only sync where the platform offers one; `File::sync_data` falls
/// back to a full sync on platforms that don't distinguish the two, which
/// satisfies `Flush(false)`'s "never return before any durability guarantee"
/// contract either way.
pub fn data_sync(file: &File) -> io::Result<()> {
    file.sync_data()
}

pub fn truncate(file: &File, len: u64) -> io::Result<()> {
    file.set_len(len)
}

/// Ensures `path` exists and is a directory, creating it (and parents) if
/// missing.
pub fn open_or_create_directory(path: &Path) -> io::Result<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists and is not a directory", path.display()),
            ));
        }
        return Ok(());
    }
    fs::create_dir_all(path)
}

/// Lists the file names directly inside `dir` (non-recursive), skipping
/// subdirectories.
pub fn enumerate_dir(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}
