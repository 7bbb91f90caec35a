//! Files by path, as seen by the http serving code.
//!
//! The serving code never touches a [`ContentStore`] directly.
//! Instead, it opens paths through a [`FileSource`], and reads, seeks
//! and lists through the returned [`OpenFile`] handle, the same way it
//! would with files on disk.
//!
//! [`ContentStore`]: crate::ContentStore
use bytes::Bytes;
use std::io::{self, Read, Seek};
use std::sync::Arc;
use std::time::SystemTime;

mod disk;
mod embedded;

pub use self::disk::{DiskFile, DiskFs};
pub use self::embedded::{EmbeddedFile, EmbeddedFs};

/// Something that can open files and directories by path.
///
/// A path given to `open` is `/`-separated and absolute.
/// Implementations must clean it (or treat it as clean), and must
/// return an error of kind [`io::ErrorKind::NotFound`] for paths that
/// do not exist.
pub trait FileSource: Send + Sync {
    type File: OpenFile;

    fn open(&self, path: &str) -> io::Result<Self::File>;
}

/// An open file or directory.
///
/// Reading and seeking works on files.  For directories, reading
/// fails and [`read_dir`](Self::read_dir) lists the content.
pub trait OpenFile: Read + Seek {
    /// Size, modification time etc of this file or directory.
    fn metadata(&self) -> io::Result<Metadata>;

    /// Read the next `count` entries of a directory.
    ///
    /// If `count` is zero, all remaining entries are returned.
    /// When the listing is exhausted, an empty vector is returned;
    /// open the directory again to restart it.
    /// Fails if this is not a directory.
    fn read_dir(&mut self, count: usize) -> io::Result<Vec<Metadata>>;

    /// A gzip compressed representation of the whole file, if one is
    /// available without compressing anything now.
    fn gzip(&self) -> Option<Bytes> {
        None
    }

    /// The whole (uncompressed) content, if it is already resident in
    /// memory.  Slices of it can be served without copying.
    fn resident(&self) -> Option<Bytes> {
        None
    }
}

/// Metadata about a file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    name: String,
    len: u64,
    modified: SystemTime,
    is_dir: bool,
    digest: Option<String>,
}

impl Metadata {
    pub(crate) fn file(
        name: &str,
        len: u64,
        modified: SystemTime,
        digest: Option<&str>,
    ) -> Self {
        Metadata {
            name: name.into(),
            len,
            modified,
            is_dir: false,
            digest: digest.map(Into::into),
        }
    }
    pub(crate) fn dir(name: &str, modified: SystemTime) -> Self {
        Metadata {
            name: name.into(),
            len: 0,
            modified,
            is_dir: true,
            digest: None,
        }
    }

    /// The base name, e.g. `style.css` for `/css/style.css`.
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Size in bytes of the (uncompressed) content.
    pub fn len(&self) -> u64 {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    pub fn modified(&self) -> SystemTime {
        self.modified
    }
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }
    /// The content digest, if known.  Used as a strong `ETag`.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }
}

impl<S: FileSource + ?Sized> FileSource for Arc<S> {
    type File = S::File;

    fn open(&self, path: &str) -> io::Result<Self::File> {
        (**self).open(path)
    }
}

impl<S: FileSource + ?Sized> FileSource for &S {
    type File = S::File;

    fn open(&self, path: &str) -> io::Result<Self::File> {
        (**self).open(path)
    }
}

pub(crate) fn not_found(path: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        crate::EmbedError::NotFound(path.into()),
    )
}

pub(crate) fn is_a_directory() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "is a directory")
}

pub(crate) fn not_a_directory() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "not a directory")
}

/// Take up to `count` (or all, if zero) entries from a listing.
pub(crate) fn take_entries(
    listing: &mut std::vec::IntoIter<Metadata>,
    count: usize,
) -> Vec<Metadata> {
    if count == 0 {
        listing.collect()
    } else {
        listing.take(count).collect()
    }
}

/// A file source whose files fail to read, for testing error handling.
#[cfg(test)]
pub(crate) mod faulty {
    use super::{not_a_directory, FileSource, Metadata, OpenFile};
    use crate::cleanpath::base;
    use bytes::Bytes;
    use std::io::{self, Read, Seek, SeekFrom};
    use std::time::{Duration, UNIX_EPOCH};

    pub const MODIFIED: u64 = 1483228800;

    /// Every path is a ten byte file with a digest and a gzip
    /// representation, but reading or seeking fails.
    /// If `metadata_fails`, so does getting the metadata.
    pub struct Faulty {
        pub metadata_fails: bool,
    }

    pub struct FaultyFile {
        name: String,
        metadata_fails: bool,
    }

    fn failure() -> io::Error {
        io::Error::new(io::ErrorKind::Other, "device error")
    }

    impl FileSource for Faulty {
        type File = FaultyFile;

        fn open(&self, path: &str) -> io::Result<FaultyFile> {
            Ok(FaultyFile {
                name: base(path).to_string(),
                metadata_fails: self.metadata_fails,
            })
        }
    }

    impl OpenFile for FaultyFile {
        fn metadata(&self) -> io::Result<Metadata> {
            if self.metadata_fails {
                return Err(failure());
            }
            let modified = UNIX_EPOCH + Duration::from_secs(MODIFIED);
            Ok(Metadata::file(&self.name, 10, modified, Some("abc")))
        }
        fn read_dir(&mut self, _count: usize) -> io::Result<Vec<Metadata>> {
            Err(not_a_directory())
        }
        fn gzip(&self) -> Option<Bytes> {
            Some(Bytes::from_static(b"\x1f\x8b not really"))
        }
    }

    impl Read for FaultyFile {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(failure())
        }
    }

    impl Seek for FaultyFile {
        fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
            Err(failure())
        }
    }
}
