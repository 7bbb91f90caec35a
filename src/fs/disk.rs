use super::{
    is_a_directory, not_a_directory, not_found, take_entries, FileSource,
    Metadata, OpenFile,
};
use crate::cleanpath::{base, clean};
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use std::vec;

/// A [`FileSource`] reading files from a directory on disk.
///
/// This is useful during development, to serve the same assets that
/// would be embedded by [`StaticFiles`](crate::StaticFiles) without
/// rebuilding after each change.
/// No digests are known for files on disk, so no `ETag` headers are
/// produced, and no compressed representations are available.
#[derive(Debug, Clone)]
pub struct DiskFs {
    root: PathBuf,
}

impl DiskFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DiskFs { root: root.into() }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        // A clean path has no `..` elements, so this stays inside root.
        let path = clean(path);
        path.split('/')
            .filter(|p| !p.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

impl FileSource for DiskFs {
    type File = DiskFile;

    fn open(&self, path: &str) -> io::Result<DiskFile> {
        let full = self.full_path(path);
        let path = clean(path);
        // Below a regular file is missing, not an internal error.
        let meta = fs::metadata(&full).map_err(|e| {
            if e.kind() != io::ErrorKind::PermissionDenied && !full.exists() {
                not_found(&path)
            } else {
                e
            }
        })?;
        let name = base(&path).to_string();
        if meta.is_dir() {
            Ok(DiskFile {
                name,
                meta,
                inner: Inner::Dir {
                    path: full,
                    listing: None,
                },
            })
        } else {
            Ok(DiskFile {
                name,
                meta,
                inner: Inner::File(File::open(&full)?),
            })
        }
    }
}

/// An open file or directory of a [`DiskFs`].
#[derive(Debug)]
pub struct DiskFile {
    name: String,
    meta: fs::Metadata,
    inner: Inner,
}

#[derive(Debug)]
enum Inner {
    File(File),
    Dir {
        path: PathBuf,
        listing: Option<vec::IntoIter<Metadata>>,
    },
}

fn convert(name: &str, meta: &fs::Metadata) -> Metadata {
    let modified = meta.modified().unwrap_or(UNIX_EPOCH);
    if meta.is_dir() {
        Metadata::dir(name, modified)
    } else {
        Metadata::file(name, meta.len(), modified, None)
    }
}

fn list(dir: &Path) -> io::Result<Vec<Metadata>> {
    let mut result = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        result.push(convert(&name, &entry.metadata()?));
    }
    result.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(result)
}

impl OpenFile for DiskFile {
    fn metadata(&self) -> io::Result<Metadata> {
        Ok(convert(&self.name, &self.meta))
    }

    fn read_dir(&mut self, count: usize) -> io::Result<Vec<Metadata>> {
        match &mut self.inner {
            Inner::File(_) => Err(not_a_directory()),
            Inner::Dir { path, listing } => {
                if listing.is_none() {
                    *listing = Some(list(path)?.into_iter());
                }
                Ok(listing
                    .as_mut()
                    .map(|l| take_entries(l, count))
                    .unwrap_or_default())
            }
        }
    }
}

impl Read for DiskFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::File(f) => f.read(buf),
            Inner::Dir { .. } => Err(is_a_directory()),
        }
    }
}

impl Seek for DiskFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.inner {
            Inner::File(f) => f.seek(pos),
            Inner::Dir { .. } => Ok(0),
        }
    }
}
