// File-backed collection of records: whole-file JSON array, locked read-modify-write, atomic replace.
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use fs2::FileExt;
use libc::{EACCES, EPERM};

use crate::core::error::{Error, ErrorKind};
use crate::core::record::Record;

const EMPTY_COLLECTION: &[u8] = b"[]";

/// One collection file (`users.json`, `tweets.json`, ...) and its write lock.
///
/// Mutations (`append`, `replace`, `remove`) run as a single critical section:
/// load the full array, change it in memory, write it back. Threads are
/// serialized by an in-process mutex and processes by an exclusive lock on a
/// `<file>.lock` sidecar. Writes land in `<file>.tmp` and are renamed into
/// place, so readers never take the lock and never observe a partial file.
pub struct Collection<R> {
    path: PathBuf,
    lock_path: PathBuf,
    tmp_path: PathBuf,
    writer: Mutex<()>,
    _records: PhantomData<fn() -> R>,
}

impl<R: Record> Collection<R> {
    /// Opens the collection at `path`, writing an empty array first if the file is missing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, Error> {
        let collection = Self::at(path.as_ref());
        {
            let _lock = collection.write_lock()?;
            if !collection.path.exists() {
                collection.write_bytes(EMPTY_COLLECTION)?;
                tracing::debug!(
                    kind = R::KIND,
                    path = %collection.path.display(),
                    "created empty collection"
                );
            }
        }
        collection.load()?;
        Ok(collection)
    }

    /// Opens an existing collection, validating that it parses.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let collection = Self::at(path.as_ref());
        if !collection.path.exists() {
            return Err(Error::new(ErrorKind::NotFound)
                .with_message(format!("{} collection not found", R::KIND))
                .with_path(&collection.path)
                .with_hint("Run `chirp init` to create empty collections."));
        }
        collection.load()?;
        Ok(collection)
    }

    fn at(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            lock_path: sidecar(path, "lock"),
            tmp_path: sidecar(path, "tmp"),
            writer: Mutex::new(()),
            _records: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> Result<Vec<R>, Error> {
        self.load()
    }

    pub fn find(&self, id: &str) -> Result<R, Error> {
        self.load()?
            .into_iter()
            .find(|record| record.id() == id)
            .ok_or_else(|| not_found::<R>(R::ID_FIELD, id))
    }

    pub fn find_by_field(&self, field: &str, value: &str) -> Result<R, Error> {
        self.load()?
            .into_iter()
            .find(|record| record.field(field) == Some(value))
            .ok_or_else(|| not_found::<R>(field, value))
    }

    pub fn append(&self, record: R) -> Result<R, Error> {
        let _lock = self.write_lock()?;
        let mut records = self.load()?;
        if records.iter().any(|existing| existing.id() == record.id()) {
            return Err(duplicate::<R>(R::ID_FIELD, record.id()));
        }
        check_unique_fields(&records, &record, None)?;
        records.push(record.clone());
        self.store(&records)?;
        Ok(record)
    }

    /// Applies `mutate` to the first record with identifier `id` and persists the result.
    ///
    /// When nothing matches, `NotFound` is returned and the file is left untouched.
    pub fn replace<F>(&self, id: &str, mutate: F) -> Result<R, Error>
    where
        F: FnOnce(&mut R),
    {
        let _lock = self.write_lock()?;
        let mut records = self.load()?;
        let Some(index) = records.iter().position(|record| record.id() == id) else {
            return Err(not_found::<R>(R::ID_FIELD, id));
        };

        let mut updated = records[index].clone();
        mutate(&mut updated);
        if updated.id() != id {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("{} is immutable", R::ID_FIELD))
                .with_path(&self.path));
        }
        check_unique_fields(&records, &updated, Some(index))?;

        records[index] = updated.clone();
        self.store(&records)?;
        Ok(updated)
    }

    pub fn remove(&self, id: &str) -> Result<R, Error> {
        let _lock = self.write_lock()?;
        let mut records = self.load()?;
        let Some(index) = records.iter().position(|record| record.id() == id) else {
            return Err(not_found::<R>(R::ID_FIELD, id));
        };
        let removed = records.remove(index);
        self.store(&records)?;
        Ok(removed)
    }

    fn write_lock(&self) -> Result<WriteLock<'_>, Error> {
        let guard = self
            .writer
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|err| {
                Error::new(io_error_kind(&err))
                    .with_message("failed to open lock file")
                    .with_path(&self.lock_path)
                    .with_source(err)
            })?;
        file.lock_exclusive().map_err(|err| {
            Error::new(lock_error_kind(&err))
                .with_message("failed to lock collection")
                .with_path(&self.lock_path)
                .with_source(err)
        })?;
        Ok(WriteLock {
            file,
            _guard: guard,
        })
    }

    fn load(&self) -> Result<Vec<R>, Error> {
        let bytes = fs::read(&self.path).map_err(|err| {
            Error::new(io_error_kind(&err))
                .with_message(format!("failed to read {} collection", R::KIND))
                .with_path(&self.path)
                .with_source(err)
        })?;
        serde_json::from_slice(&bytes).map_err(|err| {
            tracing::warn!(
                kind = R::KIND,
                path = %self.path.display(),
                error = %err,
                "collection file does not parse"
            );
            Error::new(ErrorKind::Corrupt)
                .with_message(format!("{} collection is not a valid JSON array", R::KIND))
                .with_path(&self.path)
                .with_hint("Restore the file from a backup or inspect it with `chirp doctor`.")
                .with_source(err)
        })
    }

    fn store(&self, records: &[R]) -> Result<(), Error> {
        let bytes = serde_json::to_vec(records).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message(format!("failed to encode {} collection", R::KIND))
                .with_source(err)
        })?;
        self.write_bytes(&bytes)?;
        tracing::debug!(
            kind = R::KIND,
            path = %self.path.display(),
            records = records.len(),
            "collection rewritten"
        );
        Ok(())
    }

    fn write_bytes(&self, bytes: &[u8]) -> Result<(), Error> {
        if let Err(err) = self.write_tmp(bytes) {
            let _ = fs::remove_file(&self.tmp_path);
            return Err(err);
        }
        fs::rename(&self.tmp_path, &self.path).map_err(|err| {
            let _ = fs::remove_file(&self.tmp_path);
            Error::new(io_error_kind(&err))
                .with_message("failed to replace collection file")
                .with_path(&self.path)
                .with_source(err)
        })?;
        sync_parent_dir(&self.path)
    }

    fn write_tmp(&self, bytes: &[u8]) -> Result<(), Error> {
        let io_err = |err: io::Error| {
            Error::new(io_error_kind(&err))
                .with_message("failed to write collection file")
                .with_path(&self.tmp_path)
                .with_source(err)
        };
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&self.tmp_path)
            .map_err(io_err)?;
        file.write_all(bytes).map_err(io_err)?;
        file.flush().map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        Ok(())
    }
}

struct WriteLock<'a> {
    file: File,
    _guard: MutexGuard<'a, ()>,
}

impl Drop for WriteLock<'_> {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn check_unique_fields<R: Record>(
    records: &[R],
    candidate: &R,
    skip: Option<usize>,
) -> Result<(), Error> {
    for (field, value) in candidate.unique_fields() {
        let taken = records
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != skip)
            .any(|(_, existing)| existing.field(field) == Some(value));
        if taken {
            return Err(duplicate::<R>(field, value));
        }
    }
    Ok(())
}

fn not_found<R: Record>(field: &str, value: &str) -> Error {
    Error::new(ErrorKind::NotFound)
        .with_message(format!("no {} record with {field} `{value}`", R::KIND))
}

fn duplicate<R: Record>(field: &str, value: &str) -> Error {
    Error::new(ErrorKind::Duplicate)
        .with_message(format!("{} record with {field} `{value}` already exists", R::KIND))
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<(), Error> {
    let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) else {
        return Ok(());
    };
    File::open(parent)
        .and_then(|dir| dir.sync_all())
        .map_err(|err| {
            Error::new(io_error_kind(&err))
                .with_message("failed to sync collection directory")
                .with_path(parent)
                .with_source(err)
        })
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<(), Error> {
    Ok(())
}

fn io_error_kind(err: &io::Error) -> ErrorKind {
    match err.kind() {
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}

fn lock_error_kind(err: &io::Error) -> ErrorKind {
    let errno = err.raw_os_error().unwrap_or_default();
    if errno == EACCES || errno == EPERM {
        return ErrorKind::Permission;
    }
    match err.kind() {
        io::ErrorKind::WouldBlock => ErrorKind::Busy,
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}
