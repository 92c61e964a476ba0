//! Table Module
//!
//! Couples one B+ tree index with one append-mostly data file and a column
//! list, behind a per-table mutex.
//!
//! ## Responsibilities
//! - Enforce primary-key uniqueness (the index itself does not)
//! - Append rows, soft-delete in place, compact on demand
//! - Rebuild the index from an existing file on open
//!
//! ## Concurrency
//! Every operation, reads included, holds the table's exclusive lock for its
//! full duration. That coarse single mutex is a deliberate choice: it keeps
//! the index free of internal synchronization and gives each table a total
//! operation order at the cost of serializing readers with writers.
//! Operations on different tables proceed in parallel.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Result, TabulaError};
use crate::index::BPlusTree;
use crate::row::{self, DecodedRow};

/// Maximum number of columns in a table
pub const MAX_COLUMNS: usize = 100;

/// A disk-backed table addressed by integer primary key.
///
/// The first column is the primary-key column; callers pass the key's text
/// form as the first value, and compaction re-derives keys from it.
pub struct Table {
    name: String,
    columns: Vec<String>,
    path: PathBuf,
    sync_on_commit: bool,
    inner: Mutex<TableInner>,
}

/// State guarded by the table lock
struct TableInner {
    index: BPlusTree,
    file: File,
}

impl Table {
    /// Open or create a table backed by `{tables_dir}/{lowercased name}.dat`.
    ///
    /// Validates the column list before touching the filesystem. When the
    /// data file already holds records, the index is rebuilt from the live
    /// lines so rows from a previous process stay reachable.
    pub(crate) fn create<S: AsRef<str>>(
        tables_dir: &Path,
        name: &str,
        columns: &[S],
        sync_on_commit: bool,
    ) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(TabulaError::InvalidArgument(
                "table name must not be empty".to_string(),
            ));
        }
        if columns.is_empty() || columns.len() > MAX_COLUMNS {
            return Err(TabulaError::InvalidArgument(format!(
                "column count {} outside 1..={}",
                columns.len(),
                MAX_COLUMNS
            )));
        }
        for (i, column) in columns.iter().enumerate() {
            if column.as_ref().trim().is_empty() {
                return Err(TabulaError::InvalidArgument(format!(
                    "column {} has an empty name",
                    i
                )));
            }
        }

        let path = tables_dir.join(format!("{}.dat", name.to_lowercase()));
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let index = if file.metadata()?.len() > 0 {
            let index = Self::rebuild_index(&mut file)?;
            tracing::debug!(
                "Rebuilt index for table '{}': {} live rows",
                name,
                index.len()
            );
            index
        } else {
            BPlusTree::new()
        };

        tracing::debug!("Table '{}' ready at {}", name, path.display());

        Ok(Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            path,
            sync_on_commit,
            inner: Mutex::new(TableInner { index, file }),
        })
    }

    // =========================================================================
    // Row Operations
    // =========================================================================

    /// Insert a new row. Returns the file offset of the appended record.
    ///
    /// Fails with [`TabulaError::DuplicateKey`] when the key is already
    /// present; the existing row is left untouched. A failed append is
    /// truncated back out of the file so no orphan line survives for
    /// compaction to resurrect.
    pub fn insert<S: AsRef<str>>(&self, key: i64, values: &[S]) -> Result<u64> {
        self.check_arity(values)?;
        let mut inner = self.inner.lock();

        if inner.index.search(key).is_some() {
            return Err(TabulaError::DuplicateKey(key));
        }

        let offset = inner.file.seek(SeekFrom::End(0))?;
        let record = row::encode(values);
        if let Err(e) = append_record(&mut inner.file, &record) {
            self.truncate_partial_append(&mut inner, offset);
            return Err(e);
        }

        // The append is flushed; this in-memory update cannot fail.
        inner.index.insert(key, offset);
        Ok(offset)
    }

    /// Read a row by primary key.
    ///
    /// An absent key is `Ok(None)`, not an error. A record the index points
    /// at but that turns out deleted, truncated, or malformed also reads as
    /// `Ok(None)`, with a diagnostic that separates it from a plain miss.
    pub fn get(&self, key: i64) -> Result<Option<Vec<String>>> {
        let mut inner = self.inner.lock();
        let offset = match inner.index.search(key) {
            Some(offset) => offset,
            None => return Ok(None),
        };

        let line = match read_record_at(&mut inner.file, offset)? {
            Some(line) => line,
            None => {
                tracing::error!(
                    "Index for table '{}' maps key {} to offset {} past end of file",
                    self.name,
                    key,
                    offset
                );
                return Ok(None);
            }
        };

        match row::decode(&line, self.columns.len()) {
            Ok(DecodedRow::Live(values)) => Ok(Some(values)),
            Ok(DecodedRow::Deleted) => {
                // The index never holds soft-deleted keys; this is dead space
                // the index should not have reached.
                tracing::warn!(
                    "Indexed row for key {} in table '{}' is marked deleted",
                    key,
                    self.name
                );
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(
                    "Corrupt record for key {} at offset {} in table '{}': {}",
                    key,
                    offset,
                    self.name,
                    e
                );
                Ok(None)
            }
        }
    }

    /// Replace a row's values: the old record is soft-deleted in place and
    /// the new one appended, so the row's offset changes. The primary key
    /// itself is assumed immutable across an update.
    pub fn update<S: AsRef<str>>(&self, key: i64, values: &[S]) -> Result<u64> {
        self.check_arity(values)?;
        let mut inner = self.inner.lock();

        let old_offset = inner
            .index
            .search(key)
            .ok_or(TabulaError::RowNotFound(key))?;

        write_marker(&mut inner.file, old_offset, row::DELETED_MARKER)?;

        let new_offset = inner.file.seek(SeekFrom::End(0))?;
        let record = row::encode(values);
        if let Err(e) = append_record(&mut inner.file, &record) {
            self.truncate_partial_append(&mut inner, new_offset);
            // Best effort: revive the old record so the row is not lost.
            if let Err(revive) = write_marker(&mut inner.file, old_offset, row::LIVE_MARKER) {
                tracing::error!(
                    "Failed to restore row {} in table '{}' after aborted update: {}",
                    key,
                    self.name,
                    revive
                );
            }
            return Err(e);
        }

        inner.index.delete(key);
        inner.index.insert(key, new_offset);
        Ok(new_offset)
    }

    /// Soft-delete a row: flip its marker byte in place and drop the key from
    /// the index. The record stays on disk as dead space until compaction.
    pub fn delete(&self, key: i64) -> Result<()> {
        let mut inner = self.inner.lock();
        let offset = inner
            .index
            .search(key)
            .ok_or(TabulaError::RowNotFound(key))?;

        write_marker(&mut inner.file, offset, row::DELETED_MARKER)?;
        inner.index.delete(key);
        Ok(())
    }

    /// Return every live row in ascending primary-key order.
    pub fn scan(&self) -> Result<Vec<(i64, Vec<String>)>> {
        let mut inner = self.inner.lock();
        let entries: Vec<(i64, u64)> = inner.index.iter().collect();

        let mut rows = Vec::with_capacity(entries.len());
        for (key, offset) in entries {
            let line = match read_record_at(&mut inner.file, offset)? {
                Some(line) => line,
                None => {
                    tracing::error!(
                        "Index for table '{}' maps key {} to offset {} past end of file",
                        self.name,
                        key,
                        offset
                    );
                    continue;
                }
            };
            match row::decode(&line, self.columns.len()) {
                Ok(DecodedRow::Live(values)) => rows.push((key, values)),
                Ok(DecodedRow::Deleted) => {
                    tracing::warn!(
                        "Indexed row for key {} in table '{}' is marked deleted",
                        key,
                        self.name
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Skipping corrupt record for key {} in table '{}': {}",
                        key,
                        self.name,
                        e
                    );
                }
            }
        }
        Ok(rows)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Rewrite the data file without its soft-deleted records and rebuild the
    /// index against the new offsets.
    ///
    /// Live lines are streamed unchanged into a temp file, which is synced
    /// and renamed over the original only once it is complete; a failure at
    /// any earlier point leaves the original file untouched.
    pub fn compact(&self) -> Result<()> {
        let mut inner = self.inner.lock();

        let tmp_path = self.path.with_extension("dat.tmp");
        let new_index = match write_compacted(&mut inner.file, &tmp_path) {
            Ok(index) => index,
            Err(e) => {
                let _ = std::fs::remove_file(&tmp_path);
                return Err(e);
            }
        };

        std::fs::rename(&tmp_path, &self.path)?;
        inner.file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        inner.index = new_index;

        tracing::debug!(
            "Compacted table '{}': {} live rows retained",
            self.name,
            inner.index.len()
        );
        Ok(())
    }

    /// Flush buffered data to the OS. Durability beyond OS buffers is only
    /// promised when the database was configured with `sync_on_commit`.
    pub fn commit(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.file.flush()?;
        if self.sync_on_commit {
            inner.file.sync_data()?;
        }
        Ok(())
    }

    /// Wipe the table: truncate the data file to zero length and replace the
    /// index with an empty one. This is a full truncate, not an undo.
    pub fn rollback(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.file.set_len(0)?;
        inner.file.seek(SeekFrom::Start(0))?;
        inner.index.clear();
        tracing::debug!("Rolled back table '{}' (file truncated, index cleared)", self.name);
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column names, primary key first
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Path of the backing data file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live rows
    pub fn row_count(&self) -> usize {
        self.inner.lock().index.len()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_arity<S: AsRef<str>>(&self, values: &[S]) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(TabulaError::InvalidArgument(format!(
                "expected {} values, got {}",
                self.columns.len(),
                values.len()
            )));
        }
        Ok(())
    }

    fn truncate_partial_append(&self, inner: &mut TableInner, offset: u64) {
        if let Err(e) = inner.file.set_len(offset) {
            tracing::error!(
                "Failed to truncate partial append in table '{}': {}",
                self.name,
                e
            );
        }
    }

    /// Build a fresh index from the live lines of an existing data file
    fn rebuild_index(file: &mut File) -> Result<BPlusTree> {
        let mut index = BPlusTree::new();
        scan_live_records(file, |offset, line| {
            match row::primary_key(line) {
                Some(key) => index.insert(key, offset),
                None => tracing::warn!(
                    "Skipping row with unparsable primary key at offset {}",
                    offset
                ),
            }
            Ok(())
        })?;
        Ok(index)
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        tracing::debug!("Closing table '{}'", self.name);
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// File Helpers
// =============================================================================

/// Append one encoded record and flush it to the OS
fn append_record(file: &mut File, record: &[u8]) -> Result<()> {
    file.write_all(record)?;
    file.flush()?;
    Ok(())
}

/// Overwrite the single marker byte of the record at `offset`
fn write_marker(file: &mut File, offset: u64, marker: u8) -> Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(&[marker])?;
    file.flush()?;
    Ok(())
}

/// Read one newline-terminated record starting at `offset`.
/// `Ok(None)` means the offset sits at or past end of file.
fn read_record_at(file: &mut File, offset: u64) -> Result<Option<Vec<u8>>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut reader = BufReader::new(&mut *file);
    let mut line = Vec::new();
    let n = reader.read_until(b'\n', &mut line)?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Stream the file start-to-end, invoking `visit` with the byte offset and
/// raw bytes of every live line. Soft-deleted lines are skipped; any other
/// marker is logged and skipped.
fn scan_live_records<F>(file: &mut File, mut visit: F) -> Result<()>
where
    F: FnMut(u64, &[u8]) -> Result<()>,
{
    file.seek(SeekFrom::Start(0))?;
    let mut reader = BufReader::new(&mut *file);
    let mut offset = 0u64;
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }
        match line.first() {
            Some(&row::LIVE_MARKER) => visit(offset, &line)?,
            Some(&row::DELETED_MARKER) => {}
            Some(&other) => {
                tracing::warn!(
                    "Skipping record with unexpected marker 0x{:02x} at offset {}",
                    other,
                    offset
                );
            }
            None => {}
        }
        offset += n as u64;
    }
    Ok(())
}

/// Copy every live line into a temp file, building the index that maps each
/// line's primary key to its new offset. The temp file is synced to disk
/// before this returns.
fn write_compacted(file: &mut File, tmp_path: &Path) -> Result<BPlusTree> {
    let tmp = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(tmp_path)?;
    let mut writer = BufWriter::new(tmp);
    let mut index = BPlusTree::new();
    let mut write_offset = 0u64;

    scan_live_records(file, |offset, line| {
        match row::primary_key(line) {
            Some(key) => {
                writer.write_all(line)?;
                index.insert(key, write_offset);
                write_offset += line.len() as u64;
            }
            None => tracing::warn!(
                "Dropping row with unparsable primary key at offset {} during compaction",
                offset
            ),
        }
        Ok(())
    })?;

    let tmp = writer
        .into_inner()
        .map_err(|e| TabulaError::Storage(format!("Failed to flush compacted file: {}", e)))?;
    tmp.sync_all()?;
    Ok(index)
}
