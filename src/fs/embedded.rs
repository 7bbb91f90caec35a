use super::{
    is_a_directory, not_a_directory, not_found, take_entries, FileSource,
    Metadata, OpenFile,
};
use crate::cleanpath::{base, clean};
use crate::store::{Asset, ContentStore};
use bytes::Bytes;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use std::vec;

/// A [`FileSource`] backed by a [`ContentStore`].
///
/// Cloning is cheap; all clones share the same store.
///
/// ```
/// # fn main() -> std::io::Result<()> {
/// use embedfs::{Asset, ContentStore, EmbeddedFs, FileSource, OpenFile};
/// use std::io::{Read, Seek, SeekFrom};
///
/// let mut store = ContentStore::new();
/// store.insert(Asset::new("/a/b.txt", "0123456789", 0)).unwrap();
/// let fs = EmbeddedFs::new(store);
///
/// let mut file = fs.open("/a/../a/b.txt")?;
/// assert_eq!(file.metadata()?.len(), 10);
/// file.seek(SeekFrom::Start(6))?;
/// let mut tail = String::new();
/// file.read_to_string(&mut tail)?;
/// assert_eq!(tail, "6789");
///
/// let mut dir = fs.open("/a")?;
/// assert!(dir.metadata()?.is_dir());
/// assert_eq!(dir.read_dir(0)?[0].name(), "b.txt");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EmbeddedFs {
    store: Arc<ContentStore>,
}

impl EmbeddedFs {
    pub fn new(store: impl Into<Arc<ContentStore>>) -> Self {
        EmbeddedFs {
            store: store.into(),
        }
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }
}

impl FileSource for EmbeddedFs {
    type File = EmbeddedFile;

    fn open(&self, path: &str) -> io::Result<EmbeddedFile> {
        let path = clean(path);
        if let Some(asset) = self.store.get_shared(&path) {
            Ok(EmbeddedFile {
                inner: Inner::File {
                    cursor: Cursor::new(asset.raw().clone()),
                    asset: asset.clone(),
                },
            })
        } else if self.store.is_dir(&path) {
            Ok(EmbeddedFile {
                inner: Inner::Dir {
                    store: self.store.clone(),
                    path,
                    listing: None,
                },
            })
        } else {
            Err(not_found(&path))
        }
    }
}

/// An open asset or directory of an [`EmbeddedFs`].
///
/// Reads are served directly from the resident buffer of the asset.
#[derive(Debug)]
pub struct EmbeddedFile {
    inner: Inner,
}

#[derive(Debug)]
enum Inner {
    File {
        asset: Arc<Asset>,
        cursor: Cursor<Bytes>,
    },
    Dir {
        store: Arc<ContentStore>,
        path: String,
        listing: Option<vec::IntoIter<Metadata>>,
    },
}

impl EmbeddedFile {
    /// The asset, unless this is a directory.
    pub fn asset(&self) -> Option<&Asset> {
        match &self.inner {
            Inner::File { asset, .. } => Some(asset.as_ref()),
            Inner::Dir { .. } => None,
        }
    }
}

fn asset_metadata(asset: &Asset) -> Metadata {
    Metadata::file(
        base(asset.path()),
        asset.raw().len() as u64,
        asset.modified(),
        Some(asset.digest()),
    )
}

fn list(store: &ContentStore, dir: &str) -> Vec<Metadata> {
    store
        .children(dir)
        .into_iter()
        .filter_map(|child| {
            if child.is_dir {
                Some(Metadata::dir(&child.name, UNIX_EPOCH))
            } else {
                let path = if dir == "/" {
                    format!("/{}", child.name)
                } else {
                    format!("{}/{}", dir, child.name)
                };
                store.get(&path).map(asset_metadata)
            }
        })
        .collect()
}

impl OpenFile for EmbeddedFile {
    fn metadata(&self) -> io::Result<Metadata> {
        Ok(match &self.inner {
            Inner::File { asset, .. } => asset_metadata(asset),
            Inner::Dir { path, .. } => Metadata::dir(base(path), UNIX_EPOCH),
        })
    }

    fn read_dir(&mut self, count: usize) -> io::Result<Vec<Metadata>> {
        match &mut self.inner {
            Inner::File { .. } => Err(not_a_directory()),
            Inner::Dir {
                store,
                path,
                listing,
            } => {
                let listing = listing
                    .get_or_insert_with(|| list(store, path).into_iter());
                Ok(take_entries(listing, count))
            }
        }
    }

    fn gzip(&self) -> Option<Bytes> {
        self.asset().and_then(Asset::compressed).cloned()
    }

    fn resident(&self) -> Option<Bytes> {
        self.asset().map(|asset| asset.raw().clone())
    }
}

impl Read for EmbeddedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::File { cursor, .. } => cursor.read(buf),
            Inner::Dir { .. } => Err(is_a_directory()),
        }
    }
}

impl Seek for EmbeddedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.inner {
            Inner::File { cursor, .. } => cursor.seek(pos),
            Inner::Dir { .. } => Ok(0),
        }
    }
}
