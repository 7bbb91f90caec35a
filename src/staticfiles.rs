use super::codec::{digest, encode_wrapped, gzip};
use super::{EmbedError, Result};
use crate::cleanpath::{clean, extension};
use crate::preconditions::HTTP_DATE_LIMIT;
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs::{create_dir_all, read_dir, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Settings for how [`StaticFiles`] prepares assets.
///
/// Extensions are matched case-insensitively and given without the
/// dot.
///
/// ```
/// use embedfs::Config;
/// let config = Config::default()
///     .compress("wasm")
///     .no_compress("txt")
///     .exclude("map")
///     .modified(1483228800);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    compress: BTreeSet<String>,
    no_compress: BTreeSet<String>,
    exclude: BTreeSet<String>,
    recurse: bool,
    modified: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        let set = |exts: &[&str]| -> BTreeSet<String> {
            exts.iter().map(|e| e.to_string()).collect()
        };
        Config {
            compress: set(&[
                "css", "js", "html", "htm", "svg", "json", "txt", "xml",
            ]),
            no_compress: set(&[
                "jpg", "jpeg", "png", "gif", "woff", "woff2", "eot", "ttf",
                "ico", "webp", "gz",
            ]),
            exclude: BTreeSet::new(),
            recurse: true,
            modified: None,
        }
    }
}

impl Config {
    /// Compress files with this extension.
    pub fn compress(mut self, ext: &str) -> Self {
        let ext = ext.to_ascii_lowercase();
        self.no_compress.remove(&ext);
        self.compress.insert(ext);
        self
    }

    /// Never compress files with this extension.
    pub fn no_compress(mut self, ext: &str) -> Self {
        let ext = ext.to_ascii_lowercase();
        self.compress.remove(&ext);
        self.no_compress.insert(ext);
        self
    }

    /// Skip files with this extension when adding directories.
    pub fn exclude(mut self, ext: &str) -> Self {
        self.exclude.insert(ext.to_ascii_lowercase());
        self
    }

    /// Set to false to add only the files directly in a directory.
    pub fn recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    /// Use this modification time (seconds since the epoch) for all
    /// files, rather than their time in the file system.
    ///
    /// This is useful for reproducible builds.
    pub fn modified(mut self, modified: u64) -> Self {
        self.modified = Some(modified);
        self
    }

    fn ext(path: &str) -> Option<String> {
        extension(path).map(str::to_ascii_lowercase)
    }

    fn should_compress(&self, path: &str) -> bool {
        Self::ext(path).is_some_and(|ext| {
            self.compress.contains(&ext) && !self.no_compress.contains(&ext)
        })
    }

    fn is_excluded(&self, path: &str) -> bool {
        Self::ext(path).is_some_and(|ext| self.exclude.contains(&ext))
    }
}

/// Prepare static files for embedding, in a build script.
///
/// Each added file gets a digest of its content (used as `ETag` when
/// it is served), a modification time, and a base64 payload.  Files
/// with a compressible extension are stored gzip compressed if that
/// makes them smaller; the raw content is recovered from that when the
/// store is built.
///
/// The generated file `assets.rs` in the output directory contains a
/// function `content_store() -> embedfs::Result<embedfs::ContentStore>`.
/// The function is complete when the `StaticFiles` is dropped.
///
/// In `build.rs`:
///
/// ```no_run
/// use embedfs::{Result, StaticFiles};
///
/// fn main() -> Result<()> {
///     let mut statics = StaticFiles::from_env()?;
///     statics.add_files("static")
/// }
/// ```
///
/// And in the program:
///
/// ```ignore
/// include!(concat!(env!("OUT_DIR"), "/assets.rs"));
///
/// let store = content_store().expect("embedded assets");
/// let server = embedfs::AssetServer::new(embedfs::EmbeddedFs::new(store));
/// ```
pub struct StaticFiles {
    /// Rust source file `assets.rs` being written.
    src: File,
    config: Config,
    /// Maps url paths to digests.
    paths: BTreeMap<String, String>,
}

impl StaticFiles {
    /// Create `assets.rs` in the `OUT_DIR` of a build, with default
    /// configuration.
    pub fn from_env() -> Result<Self> {
        Ok(StaticFiles::for_dir(env_path("OUT_DIR")?, Config::default())?)
    }

    /// Create `assets.rs` in `outdir`.
    pub fn for_dir<P: AsRef<Path>>(
        outdir: P,
        config: Config,
    ) -> io::Result<Self> {
        let outdir = outdir.as_ref();
        create_dir_all(outdir)?;
        let mut src = File::create(outdir.join("assets.rs"))?;
        src.write_all(
            b"/// Create a content store containing all embedded assets.
///
/// Call this once at startup and share the store (in an `Arc`), since
/// each call decodes all the assets again.
pub fn content_store() -> embedfs::Result<embedfs::ContentStore> {
    let mut store = embedfs::ContentStore::new();
",
        )?;
        Ok(StaticFiles {
            src,
            config,
            paths: BTreeMap::new(),
        })
    }

    /// Add all files from a directory, `indir`, with urls relative to
    /// the root.
    ///
    /// A relative `indir` is taken relative to `CARGO_MANIFEST_DIR`.
    pub fn add_files<P: AsRef<Path>>(&mut self, indir: P) -> Result<()> {
        self.add_files_as(indir, "/")
    }

    /// Add all files from a directory, `indir`, with urls in the
    /// directory `to`.
    ///
    /// Hidden files (with a name starting with a dot) and files with
    /// an excluded extension are skipped.
    /// Subdirectories are added recursively, unless disabled in the
    /// [`Config`].
    pub fn add_files_as<P: AsRef<Path>>(
        &mut self,
        indir: P,
        to: &str,
    ) -> Result<()> {
        let indir = indir.as_ref();
        let indir = if indir.is_relative() {
            env_path("CARGO_MANIFEST_DIR")?.join(indir)
        } else {
            indir.into()
        };
        println!("cargo:rerun-if-changed={}", indir.display());
        let mut entries = read_dir(&indir)?.collect::<io::Result<Vec<_>>>()?;
        entries.sort_by_key(|entry| entry.file_name());
        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let to = clean(&format!("{to}/{name}"));
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                if self.config.recurse {
                    self.add_files_as(entry.path(), &to)?;
                }
            } else if !self.config.is_excluded(&to) {
                self.add_file_as(entry.path(), &to)?;
            }
        }
        Ok(())
    }

    /// Add one specific file, served at `url`.
    pub fn add_file_as<P: AsRef<Path>>(
        &mut self,
        path: P,
        url: &str,
    ) -> Result<()> {
        let path = path.as_ref();
        println!("cargo:rerun-if-changed={}", path.display());
        let mut input = File::open(path)?;
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        let modified = match self.config.modified {
            Some(modified) => modified,
            None => input
                .metadata()?
                .modified()?
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };
        self.add_asset(url, &data, modified, &path.display())
    }

    /// Add a file by its url and content.
    ///
    /// Any modification time in the [`Config`] takes precedence over
    /// `modified`.
    pub fn add_file_data(
        &mut self,
        url: &str,
        data: &[u8],
        modified: u64,
    ) -> Result<()> {
        let modified = self.config.modified.unwrap_or(modified);
        self.add_asset(url, data, modified, &"data")
    }

    fn add_asset(
        &mut self,
        url: &str,
        data: &[u8],
        modified: u64,
        source: &dyn std::fmt::Display,
    ) -> Result<()> {
        let url = clean(url);
        if modified >= HTTP_DATE_LIMIT {
            return Err(EmbedError::Modified {
                path: url,
                secs: modified,
            });
        }
        let digest = digest(data);
        let compressed = if self.config.should_compress(&url) {
            Some(gzip(data)?).filter(|gz| gz.len() < data.len())
        } else {
            None
        };
        let (raw, compressed) = match &compressed {
            Some(gz) => ("None".to_string(), payload(gz)),
            None => (payload(data), "None".to_string()),
        };
        writeln!(
            self.src,
            "    // From {source}\
             \n    store.add(embedfs::Content {{\
             \n        path: {url:?},\
             \n        digest: {digest:?},\
             \n        modified: {modified},\
             \n        raw: {raw},\
             \n        compressed: {compressed},\
             \n    }})?;",
        )?;
        self.paths.insert(url, digest);
        Ok(())
    }

    /// Get a mapping from url paths to the digests of their content.
    ///
    /// ```
    /// # use embedfs::{Config, Result, StaticFiles};
    /// # use std::path::PathBuf;
    /// # fn main() -> Result<()> {
    /// # let p = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    /// #     .join("target/test-tmp/doc-paths");
    /// let mut statics = StaticFiles::for_dir(p, Config::default())?;
    /// statics.add_file_data("black.css", b"body{color:black}\n", 0)?;
    /// statics.add_file_data("/s/blue.css", b"body{color:blue}\n", 0)?;
    /// assert_eq!(
    ///     statics.get_paths().iter()
    ///         .map(|(a, b)| format!("{} -> {}", a, b))
    ///         .collect::<Vec<_>>(),
    ///     vec!["/black.css -> r3rltVhWzdbakf9IZQJ4Aw".to_string(),
    ///          "/s/blue.css -> GZGxfXagItRTHrkw1sUOPw".to_string()],
    /// );
    /// # Ok(())
    /// # }
    /// ```
    pub fn get_paths(&self) -> &BTreeMap<String, String> {
        &self.paths
    }
}

impl Drop for StaticFiles {
    /// Write the end of the `content_store` function.
    fn drop(&mut self) {
        // Ignore a possible write failure, rather than a panic in drop.
        let _ = writeln!(self.src, "    Ok(store)\n}}");
    }
}

/// A payload as a rust expression, a string literal of wrapped base64.
fn payload(data: &[u8]) -> String {
    format!(
        "Some(\"\n{}\")",
        encode_wrapped(data, 80).lines().format("\n"),
    )
}

fn env_path(var: &str) -> Result<PathBuf> {
    env::var(var)
        .map(PathBuf::from)
        .map_err(|e| EmbedError::Env(var.into(), e))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::{decode, gunzip};
    use std::fs::{read_to_string, write};

    fn testdir(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("target")
            .join("test-tmp")
            .join(name)
    }

    fn generated(dir: &Path) -> String {
        read_to_string(dir.join("assets.rs")).unwrap()
    }

    #[test]
    fn default_compression() {
        let config = Config::default();
        assert!(config.should_compress("/s/style.css"));
        assert!(config.should_compress("/INDEX.HTML"));
        assert!(!config.should_compress("/logo.png"));
        assert!(!config.should_compress("/README"));
    }

    #[test]
    fn changed_compression() {
        let config = Config::default().no_compress("css").compress("wasm");
        assert!(!config.should_compress("/style.css"));
        assert!(config.should_compress("/app.wasm"));
    }

    #[test]
    fn small_file_is_raw() {
        let dir = testdir("gen-small");
        {
            let mut statics =
                StaticFiles::for_dir(&dir, Config::default()).unwrap();
            statics.add_file_data("/a.txt", b"0123456789", 17).unwrap();
        }
        let src = generated(&dir);
        assert!(src.starts_with("/// Create a content store"));
        assert!(src.contains(
            "    store.add(embedfs::Content {\n        \
             path: \"/a.txt\",\n        \
             digest: \"eB5eJF1ptWaXm4bijSPyxw\",\n        \
             modified: 17,\n        \
             raw: Some(\"\nMDEyMzQ1Njc4OQ\"),\n        \
             compressed: None,\n    })?;\n"
        ));
        assert!(src.ends_with("    Ok(store)\n}\n"));
    }

    #[test]
    fn modified_beyond_http_dates() {
        let dir = testdir("gen-late");
        let mut statics =
            StaticFiles::for_dir(&dir, Config::default()).unwrap();
        let err = statics
            .add_file_data("/late.txt", b"late", 253402300800)
            .unwrap_err();
        assert!(matches!(err, EmbedError::Modified { .. }));
        assert!(statics.get_paths().is_empty());
    }

    #[test]
    fn large_text_is_compressed() {
        let dir = testdir("gen-large");
        let data = "body { color: black; }\n".repeat(50);
        {
            let mut statics =
                StaticFiles::for_dir(&dir, Config::default()).unwrap();
            statics.add_file_data("/style.css", data.as_bytes(), 0).unwrap();
        }
        let src = generated(&dir);
        assert!(src.contains("raw: None,"));
        let start = src.find("compressed: Some(\"").unwrap() + 18;
        let end = start + src[start..].find('"').unwrap();
        let gz = decode(&src[start..end]).unwrap();
        assert_eq!(gunzip(&gz).unwrap(), data.as_bytes());
        assert!(src[start..end].lines().all(|line| line.len() <= 80));
    }

    #[test]
    fn incompressible_is_raw() {
        let dir = testdir("gen-png");
        {
            let mut statics =
                StaticFiles::for_dir(&dir, Config::default()).unwrap();
            statics.add_file_data("/x.png", &[0; 400], 0).unwrap();
        }
        assert!(generated(&dir).contains("compressed: None,"));
    }

    #[test]
    fn add_directory() {
        let indir = testdir("gen-dir-in");
        create_dir_all(indir.join("css")).unwrap();
        write(indir.join("index.html"), b"<p>Hello</p>").unwrap();
        write(indir.join("css").join("style.css"), b"p{}").unwrap();
        write(indir.join("notes.md"), b"# Skip me").unwrap();
        write(indir.join(".hidden"), b"secret").unwrap();
        let out = testdir("gen-dir-out");
        let config = Config::default().exclude("MD").modified(1483228800);
        let mut statics = StaticFiles::for_dir(&out, config).unwrap();
        statics.add_files(&indir).unwrap();
        assert_eq!(
            statics.get_paths().keys().collect::<Vec<_>>(),
            ["/css/style.css", "/index.html"],
        );
        drop(statics);
        assert!(generated(&out).contains("modified: 1483228800,"));
    }

    #[test]
    fn add_directory_as() {
        let indir = testdir("gen-as-in");
        create_dir_all(indir.join("sub")).unwrap();
        write(indir.join("a.js"), b"a()").unwrap();
        write(indir.join("sub").join("b.js"), b"b()").unwrap();
        let out = testdir("gen-as-out");
        let config = Config::default().recurse(false);
        let mut statics = StaticFiles::for_dir(&out, config).unwrap();
        statics.add_files_as(&indir, "/vendor/lib").unwrap();
        assert_eq!(
            statics.get_paths().keys().collect::<Vec<_>>(),
            ["/vendor/lib/a.js"],
        );
    }
}
