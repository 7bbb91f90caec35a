use crate::cleanpath::{clean, parent};
use crate::codec::{self, digest};
use crate::dirindex::{Child, DirIndex};
use crate::preconditions::HTTP_DATE_LIMIT;
use crate::{EmbedError, Result};
use bytes::Bytes;
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One asset, in the form it is written by [`StaticFiles`].
///
/// The payloads are base64 encoded (standard alphabet, padding
/// optional, whitespace ignored).  At least one of them must be
/// present.  If only `compressed` is given, the raw content is
/// recovered by decompressing it once, when the asset is added.
///
/// [`StaticFiles`]: crate::StaticFiles
#[derive(Debug, Clone, Copy, Default)]
pub struct Content<'a> {
    /// Absolute logical path, like `/css/style.css`.
    pub path: &'a str,
    /// Digest of the raw content, see [`digest`](crate::digest).
    pub digest: &'a str,
    /// Modification time, in seconds since the unix epoch.
    pub modified: u64,
    /// Base64 of the raw content.
    pub raw: Option<&'a str>,
    /// Base64 of the gzip compressed content.
    pub compressed: Option<&'a str>,
}

/// An asset held in a [`ContentStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    path: String,
    digest: String,
    modified: u64,
    raw: Bytes,
    compressed: Option<Bytes>,
}

impl Asset {
    /// Create an asset from raw content, computing its digest.
    ///
    /// `modified` is in seconds since the unix epoch.  It must be
    /// before year 10000 for the asset to be accepted by
    /// [`ContentStore::insert`].
    pub fn new(path: &str, raw: impl Into<Bytes>, modified: u64) -> Self {
        let raw = raw.into();
        Asset {
            path: clean(path),
            digest: digest(&raw),
            modified,
            raw,
            compressed: None,
        }
    }

    /// Add a gzip compressed representation of this asset.
    ///
    /// The caller is responsible for `gzip` being the compressed raw
    /// content.  An empty buffer means no compressed representation.
    pub fn with_gzip(mut self, gzip: impl Into<Bytes>) -> Self {
        let gzip = gzip.into();
        self.compressed = if gzip.is_empty() { None } else { Some(gzip) };
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
    pub fn digest(&self) -> &str {
        &self.digest
    }
    /// The modification time, at most the first second of year 10000.
    pub fn modified(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.modified.min(HTTP_DATE_LIMIT))
    }
    /// The uncompressed content.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }
    /// The gzip compressed content, if any.
    pub fn compressed(&self) -> Option<&Bytes> {
        self.compressed.as_ref()
    }
}

/// All embedded assets, keyed by path.
///
/// A store is populated once, by calling [`add`](Self::add) for each
/// asset (typically from the function generated by [`StaticFiles`]),
/// and is read-only after that.
/// To serve it, wrap it in an `Arc` and give it to an
/// [`EmbeddedFs`](crate::EmbeddedFs).
///
/// ```
/// # fn main() -> embedfs::Result<()> {
/// use embedfs::{Content, ContentStore};
/// let mut store = ContentStore::new();
/// store.add(Content {
///     path: "/a/b/c.txt",
///     digest: "irrelevant-here",
///     modified: 1483228800,
///     raw: Some("aGVsbG8="),
///     compressed: None,
/// })?;
/// assert_eq!(store.get_contents("/a/b/c.txt")?, "hello");
/// assert!(store.is_dir("/a/b"));
/// # Ok(())
/// # }
/// ```
///
/// [`StaticFiles`]: crate::StaticFiles
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    files: BTreeMap<String, Arc<Asset>>,
    dirs: DirIndex,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and add an asset, replacing any asset with the same path.
    ///
    /// Fails if a payload can't be decoded, if no payload is given, if
    /// the modification time is not before year 10000, or if the path
    /// is already used by a directory (or the asset would be inside
    /// another asset).  Such errors mean that the embedded data is
    /// broken and the program should not start serving.
    pub fn add(&mut self, content: Content) -> Result<()> {
        let path = clean(content.path);
        let compressed = match content.compressed {
            Some(data) if !data.trim().is_empty() => Some(
                codec::decode(data).map_err(|e| EmbedError::base64(&path, e))?,
            ),
            _ => None,
        };
        let raw = match (content.raw, &compressed) {
            (Some(data), _) if !data.trim().is_empty() => {
                codec::decode(data).map_err(|e| EmbedError::base64(&path, e))?
            }
            (_, Some(gz)) => {
                codec::gunzip(gz).map_err(|e| EmbedError::gzip(&path, e))?
            }
            (Some(_), None) => Vec::new(),
            (None, None) => return Err(EmbedError::MissingContent(path)),
        };
        self.insert(Asset {
            path,
            digest: content.digest.to_string(),
            modified: content.modified,
            raw: raw.into(),
            compressed: compressed.filter(|c| !c.is_empty()).map(Bytes::from),
        })
    }

    /// Add an already decoded asset, replacing any asset with the same
    /// path.
    pub fn insert(&mut self, asset: Asset) -> Result<()> {
        let path = asset.path.as_str();
        if self.dirs.contains(path) || self.has_file_above(path) {
            return Err(EmbedError::Conflict(asset.path));
        }
        if asset.modified >= HTTP_DATE_LIMIT {
            return Err(EmbedError::Modified {
                path: asset.path,
                secs: asset.modified,
            });
        }
        let (len, gz) = (asset.raw.len(), asset.compressed.as_ref());
        let gz = gz.map_or(0, Bytes::len);
        self.dirs.ensure(parent(path));
        let path = asset.path.clone();
        if self.files.insert(path.clone(), Arc::new(asset)).is_some() {
            debug!("Replaced {} ({} bytes, {} compressed)", path, len, gz);
        } else {
            debug!("Added {} ({} bytes, {} compressed)", path, len, gz);
        }
        Ok(())
    }

    fn has_file_above(&self, path: &str) -> bool {
        let mut dir = parent(path);
        while dir != "/" {
            if self.files.contains_key(dir) {
                return true;
            }
            dir = parent(dir);
        }
        false
    }

    /// Get the asset at `path`, if any.
    pub fn get(&self, path: &str) -> Option<&Asset> {
        self.files.get(&clean(path)).map(AsRef::as_ref)
    }

    pub(crate) fn get_shared(&self, path: &str) -> Option<&Arc<Asset>> {
        self.files.get(path)
    }

    /// Get the raw content of the asset at `path`.
    ///
    /// This is intended for using asset data outside of http serving,
    /// e.g. inlining it in a template.
    pub fn get_contents(&self, path: &str) -> Result<Bytes> {
        self.get(path)
            .map(|asset| asset.raw.clone())
            .ok_or_else(|| EmbedError::NotFound(clean(path)))
    }

    /// True if `path` is a (synthetic) directory.
    pub fn is_dir(&self, path: &str) -> bool {
        self.dirs.contains(&clean(path))
    }

    /// True if `path` is either an asset or a directory.
    pub fn contains(&self, path: &str) -> bool {
        let path = clean(path);
        self.files.contains_key(&path) || self.dirs.contains(&path)
    }

    /// Names directly inside the directory `path`, sorted by name.
    pub fn children(&self, path: &str) -> Vec<Child> {
        let path = clean(path);
        if self.dirs.contains(&path) {
            self.dirs.children(&path, &self.files)
        } else {
            Vec::new()
        }
    }

    /// The number of assets.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// All assets, ordered by path.
    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.files.values().map(AsRef::as_ref)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::{gzip, PAYLOAD};
    use base64::Engine;

    fn b64(data: &[u8]) -> String {
        PAYLOAD.encode(data)
    }

    fn add_raw(store: &mut ContentStore, path: &str, data: &[u8]) {
        let raw = b64(data);
        store
            .add(Content {
                path,
                digest: &digest(data),
                modified: 1483228800,
                raw: Some(&raw),
                compressed: None,
            })
            .unwrap();
    }

    #[test]
    fn get_contents_returns_raw() {
        let mut store = ContentStore::new();
        add_raw(&mut store, "/a.txt", b"0123456789");
        assert_eq!(store.get_contents("/a.txt").unwrap(), "0123456789");
        assert_eq!(store.get_contents("a.txt").unwrap(), "0123456789");
    }

    #[test]
    fn get_contents_missing() {
        let store = ContentStore::new();
        let err = store.get_contents("/nope.css").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn compressed_only_is_decompressed() {
        let data = b"body { color: black; }\n".repeat(20);
        let gz = b64(&gzip(&data).unwrap());
        let mut store = ContentStore::new();
        store
            .add(Content {
                path: "/style.css",
                digest: &digest(&data),
                modified: 0,
                raw: None,
                compressed: Some(&gz),
            })
            .unwrap();
        let asset = store.get("/style.css").unwrap();
        assert_eq!(asset.raw(), &data[..]);
        assert_eq!(asset.compressed().map(|c| b64(c)), Some(gz.clone()));
    }

    #[test]
    fn blank_raw_with_compressed() {
        let gz = b64(&gzip(b"x").unwrap());
        let mut store = ContentStore::new();
        store
            .add(Content {
                path: "/x",
                raw: Some("\n"),
                compressed: Some(&gz),
                ..Content::default()
            })
            .unwrap();
        assert_eq!(store.get_contents("/x").unwrap(), "x");
    }

    #[test]
    fn empty_asset() {
        let mut store = ContentStore::new();
        store
            .add(Content {
                path: "/empty.txt",
                raw: Some(""),
                ..Content::default()
            })
            .unwrap();
        assert!(store.get_contents("/empty.txt").unwrap().is_empty());
        assert_eq!(store.get("/empty.txt").unwrap().compressed(), None);
    }

    #[test]
    fn no_content_is_an_error() {
        let mut store = ContentStore::new();
        let err = store
            .add(Content {
                path: "/x",
                ..Content::default()
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "No content given for /x");
    }

    #[test]
    fn bad_base64_is_an_error() {
        let mut store = ContentStore::new();
        let err = store
            .add(Content {
                path: "/x",
                raw: Some("@@@@"),
                ..Content::default()
            })
            .unwrap_err();
        assert!(matches!(err, EmbedError::Base64 { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn bad_gzip_is_an_error() {
        let mut store = ContentStore::new();
        let not_gzip = b64(b"this is not gzip data");
        let err = store
            .add(Content {
                path: "/x",
                compressed: Some(&not_gzip),
                ..Content::default()
            })
            .unwrap_err();
        assert!(matches!(err, EmbedError::Gzip { .. }));
    }

    #[test]
    fn directories_are_created() {
        let mut store = ContentStore::new();
        add_raw(&mut store, "/a/b/c.txt", b"c");
        assert!(store.is_dir("/"));
        assert!(store.is_dir("/a"));
        assert!(store.is_dir("/a/b"));
        assert!(!store.is_dir("/x"));
        assert!(store.get("/x").is_none());
        assert!(store.contains("/a/b/c.txt"));
        assert!(store.contains("a/b/"));
        assert!(!store.contains("/x"));
        assert_eq!(
            store.children("/a"),
            [Child {
                name: "b".into(),
                is_dir: true
            }],
        );
        assert!(store.children("/x").is_empty());
    }

    #[test]
    fn file_and_dir_conflict() {
        let mut store = ContentStore::new();
        add_raw(&mut store, "/a/b", b"b");
        let inside = b64(b"c");
        let err = store
            .add(Content {
                path: "/a/b/c",
                raw: Some(&inside),
                ..Content::default()
            })
            .unwrap_err();
        assert!(matches!(err, EmbedError::Conflict(_)));
        let err = store.insert(Asset::new("/a", "a", 0)).unwrap_err();
        assert!(matches!(err, EmbedError::Conflict(_)));
        assert!(store.insert(Asset::new("/", "root", 0)).is_err());
    }

    #[test]
    fn adding_twice_is_same_as_once() {
        let mut once = ContentStore::new();
        add_raw(&mut once, "/a/b/c.txt", b"same");
        let mut twice = once.clone();
        add_raw(&mut twice, "/a/b/c.txt", b"same");
        assert_eq!(twice.len(), 1);
        assert_eq!(twice.dirs, once.dirs);
        assert_eq!(twice.get("/a/b/c.txt"), once.get("/a/b/c.txt"));
    }

    #[test]
    fn same_content_same_digest() {
        let mut store = ContentStore::new();
        store.insert(Asset::new("/a.txt", "abc", 1)).unwrap();
        let first = store.get("/a.txt").unwrap().digest().to_string();
        store.insert(Asset::new("/a.txt", "abc", 2)).unwrap();
        assert_eq!(store.get("/a.txt").unwrap().digest(), first);
        store.insert(Asset::new("/a.txt", "abd", 2)).unwrap();
        assert_ne!(store.get("/a.txt").unwrap().digest(), first);
    }

    #[test]
    fn replacing_keeps_latest() {
        let mut store = ContentStore::new();
        store.insert(Asset::new("/a.txt", "first", 1)).unwrap();
        store.insert(Asset::new("a.txt", "second", 2)).unwrap();
        assert_eq!(store.len(), 1);
        let asset = store.get("/a.txt").unwrap();
        assert_eq!(asset.raw(), "second");
        assert_eq!(asset.modified(), UNIX_EPOCH + Duration::from_secs(2));
    }

    #[test]
    fn modified_must_be_an_http_date() {
        let mut store = ContentStore::new();
        let last = HTTP_DATE_LIMIT - 1;
        store.insert(Asset::new("/last.txt", "ok", last)).unwrap();
        let err = store
            .insert(Asset::new("/a.txt", "0123456789", HTTP_DATE_LIMIT))
            .unwrap_err();
        assert!(matches!(err, EmbedError::Modified { .. }));
        let raw = b64(b"x");
        let err = store
            .add(Content {
                path: "/b.txt",
                modified: u64::MAX,
                raw: Some(&raw),
                ..Content::default()
            })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Modification time 18446744073709551615 of /b.txt is out of range",
        );
        assert!(!store.contains("/a.txt"));
        assert!(!store.contains("/b.txt"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn modified_time_is_total() {
        let asset = Asset::new("/a.txt", "a", u64::MAX);
        let limit = UNIX_EPOCH + Duration::from_secs(HTTP_DATE_LIMIT);
        assert_eq!(asset.modified(), limit);
    }

    #[test]
    fn iter_in_path_order() {
        let mut store = ContentStore::new();
        store.insert(Asset::new("/b.css", "b", 0)).unwrap();
        store.insert(Asset::new("/a/z.js", "z", 0)).unwrap();
        store.insert(Asset::new("/a.css", "a", 0)).unwrap();
        assert_eq!(
            store.iter().map(Asset::path).collect::<Vec<_>>(),
            ["/a.css", "/a/z.js", "/b.css"],
        );
    }
}
