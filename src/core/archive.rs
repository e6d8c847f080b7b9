//! ZIP archive enumeration
//!
//! Reads an archive fully into memory and yields its entries lazily, one
//! decompressed file at a time, in the archive's own order.

use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::path::Path;

use zip::ZipArchive;

use crate::error::{Result, Zip2RepoError};

/// Largest archive accepted from disk (100 MiB)
pub const MAX_ARCHIVE_BYTES: u64 = 100 * 1024 * 1024;

/// One entry of an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Slash-separated path, unique within the archive
    pub path: String,
    /// Directory entries carry no content and are never uploaded
    pub is_directory: bool,
    /// Raw file bytes
    pub content: Vec<u8>,
}

/// In-memory ZIP archive reader
pub struct ArchiveReader {
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl ArchiveReader {
    /// Open an archive from raw bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes))?;
        Ok(Self { archive })
    }

    /// Open a `.zip` file from disk
    pub fn open(path: &Path) -> Result<Self> {
        let is_zip = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if !is_zip {
            return Err(Zip2RepoError::InvalidInput(format!(
                "'{}' is not a ZIP file. Only .zip archives are supported.",
                path.display()
            )));
        }

        let size = std::fs::metadata(path)?.len();
        if size > MAX_ARCHIVE_BYTES {
            return Err(Zip2RepoError::InvalidInput(format!(
                "'{}' is {:.2} MB; archives are limited to 100 MB.",
                path.display(),
                size as f64 / 1024.0 / 1024.0
            )));
        }

        tracing::debug!(path = %path.display(), size, "reading archive");
        Self::from_bytes(std::fs::read(path)?)
    }

    /// Number of entries, directories included
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Whether the archive has no entries at all
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Iterate over entries in archive order
    ///
    /// Content is decompressed only when an entry is reached.
    pub fn entries(&mut self) -> Entries<'_> {
        Entries {
            archive: &mut self.archive,
            index: 0,
            seen: HashSet::new(),
        }
    }
}

/// Lazy iterator returned by [`ArchiveReader::entries`]
pub struct Entries<'a> {
    archive: &'a mut ZipArchive<Cursor<Vec<u8>>>,
    index: usize,
    seen: HashSet<String>,
}

impl Entries<'_> {
    fn read_entry(&mut self, index: usize) -> Result<ArchiveEntry> {
        let mut file = self.archive.by_index(index)?;
        let path = file.name().to_string();
        let is_directory = file.is_dir();

        if path.split('/').any(|segment| segment == "." || segment == "..") {
            return Err(Zip2RepoError::Archive(format!(
                "entry '{}' contains a relative path segment",
                path
            )));
        }

        if !self.seen.insert(path.clone()) {
            return Err(Zip2RepoError::Archive(format!(
                "duplicate entry '{}'",
                path
            )));
        }

        let mut content = Vec::new();
        if !is_directory {
            content.reserve(file.size() as usize);
            file.read_to_end(&mut content)?;
        }

        Ok(ArchiveEntry {
            path,
            is_directory,
            content,
        })
    }
}

impl Iterator for Entries<'_> {
    type Item = Result<ArchiveEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.archive.len() {
            return None;
        }
        let index = self.index;
        self.index += 1;
        Some(self.read_entry(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.archive.len() - self.index;
        (remaining, Some(remaining))
    }
}

/// Build an in-memory archive from `(path, content)` pairs
///
/// A `None` content adds a directory entry.
#[cfg(test)]
pub(crate) fn build_zip(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (path, content) in entries {
        match content {
            Some(bytes) => {
                writer.start_file(*path, options).unwrap();
                writer.write_all(bytes).unwrap();
            }
            None => writer.add_directory(*path, options).unwrap(),
        }
    }
    writer.finish().unwrap().into_inner()
}
