//! Zip destination for pruned files.
//!
//! Entries are named by basename only, so the archive namespace is flat: a
//! basename that is archived again replaces the earlier entry, whether it came
//! from a previous run or from another directory in the same batch. Only the
//! most recently staged contents survive under that name.

use crate::error::{PagekeepError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Anything pruned files can be appended to.
///
/// Nothing written through [`ArchiveSink::append`] counts as durable until
/// [`ArchiveSink::finish`] returns `Ok`.
pub trait ArchiveSink {
    /// Stage one entry. A name staged twice keeps the later contents.
    ///
    /// # Errors
    ///
    /// Fails when the entry cannot be written.
    fn append(&mut self, name: &str, contents: &[u8]) -> Result<()>;

    /// Flush and finalise everything appended so far.
    ///
    /// # Errors
    ///
    /// Fails when the archive cannot be written out.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Zip archive updated in place, created on first use.
///
/// Entries are staged into a scratch zip next to the archive. On
/// [`ArchiveSink::finish`] they are copied into the archive without being
/// recompressed: appended when no name is replaced, otherwise the archive is
/// rebuilt without the stale entries and renamed over the original.
pub struct ZipSink {
    path: PathBuf,
    existing: BTreeSet<String>,
    staging: ZipWriter<NamedTempFile>,
    /// Final entry name -> index of its latest copy in `staging`.
    latest: BTreeMap<String, usize>,
    staged: usize,
}

impl ZipSink {
    /// Open `path` for updating, treating a missing or empty file as an empty
    /// archive.
    ///
    /// # Errors
    ///
    /// Fails if an existing file is not a zip or the scratch file cannot be
    /// created.
    pub fn open(path: &Path) -> Result<Self> {
        let existing = if path.metadata().is_ok_and(|m| m.len() > 0) {
            let archive = ZipArchive::new(File::open(path)?).map_err(|source| {
                PagekeepError::ArchiveOpen {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            archive.file_names().map(str::to_string).collect()
        } else {
            BTreeSet::new()
        };

        let staging = ZipWriter::new(NamedTempFile::new_in(parent_dir(path))?);

        Ok(Self {
            path: path.to_path_buf(),
            existing,
            staging,
            latest: BTreeMap::new(),
            staged: 0,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn finalize(self) -> std::result::Result<(), ZipError> {
        let Self {
            path,
            existing,
            staging,
            latest,
            ..
        } = self;

        let mut staged = ZipArchive::new(staging.finish()?)?;
        let replaces_existing = latest.keys().any(|name| existing.contains(name));

        if !existing.is_empty() && !replaces_existing {
            let file = OpenOptions::new().read(true).write(true).open(&path)?;
            let mut writer = ZipWriter::new_append(file)?;
            copy_latest(&mut staged, &latest, &mut writer)?;
            writer.finish()?.sync_all()?;
            return Ok(());
        }

        let mut writer = ZipWriter::new(NamedTempFile::new_in(parent_dir(&path))?);
        if !existing.is_empty() {
            let mut current = ZipArchive::new(File::open(&path)?)?;
            for index in 0..current.len() {
                let entry = current.by_index_raw(index)?;
                if !latest.contains_key(entry.name()) {
                    writer.raw_copy_file(entry)?;
                }
            }
        }
        copy_latest(&mut staged, &latest, &mut writer)?;

        let rebuilt = writer.finish()?;
        rebuilt.as_file().sync_all()?;
        rebuilt.persist(&path).map_err(|err| ZipError::Io(err.error))?;
        Ok(())
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Copy the latest staged copy of every name into `writer` under its final
/// name.
fn copy_latest<R: Read + Seek, W: Write + Seek>(
    staged: &mut ZipArchive<R>,
    latest: &BTreeMap<String, usize>,
    writer: &mut ZipWriter<W>,
) -> std::result::Result<(), ZipError> {
    for (name, &index) in latest {
        let entry = staged.by_index_raw(index)?;
        writer.raw_copy_file_rename(entry, name.as_str())?;
    }
    Ok(())
}

impl ArchiveSink for ZipSink {
    fn append(&mut self, name: &str, contents: &[u8]) -> Result<()> {
        let write_error = |source| PagekeepError::ArchiveWrite {
            entry: name.to_string(),
            source,
        };

        // Scratch entries are keyed by position so repeated names never clash.
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.staging
            .start_file(self.staged.to_string(), options)
            .map_err(write_error)?;
        self.staging
            .write_all(contents)
            .map_err(|err| write_error(ZipError::Io(err)))?;

        self.latest.insert(name.to_string(), self.staged);
        self.staged += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let path = self.path.clone();
        (*self)
            .finalize()
            .map_err(|source| PagekeepError::ArchiveFinalize { path, source })
    }
}
