//! Embed static files in your program, and serve them over http like
//! a file server would.
//!
//! Static assets (css, javascript, images, ...) are prepared in a
//! build script by [`StaticFiles`]: each file gets a content digest, and
//! textual files get a gzip compressed representation.  The result is
//! compiled into the program as a function building a [`ContentStore`].
//!
//! At run time, an [`AssetServer`] answers [`http::Request`]s from the
//! store, with full support for conditional requests (`ETag`,
//! `If-None-Match`, `If-Modified-Since`, ...), range requests and
//! directory indexes.  Clients accepting gzip get the precompressed
//! representation, nothing is compressed at request time.
//!
//! The server reads files only through the [`FileSource`] trait, so
//! the same server can serve files from disk during development, see
//! [`DiskFs`].
//!
//! # Example
//!
//! In `build.rs`:
//!
//! ```no_run
//! # fn main() -> embedfs::Result<()> {
//! let mut statics = embedfs::StaticFiles::from_env()?;
//! statics.add_files("static")?;
//! # Ok(())
//! # }
//! ```
//!
//! In the program:
//!
//! ```ignore
//! include!(concat!(env!("OUT_DIR"), "/assets.rs"));
//!
//! let store = content_store()?;
//! let server = embedfs::AssetServer::new(embedfs::EmbeddedFs::new(store));
//! // In a request handler:
//! let response = server.serve(&request);
//! ```
//!
//! See the [Using_static_files] chapter for more.
#![forbid(unsafe_code)]

mod cleanpath;
mod codec;
mod dirindex;
mod errors;
mod fs;
mod listing;
mod preconditions;
mod range;
mod serve_file;
mod server;
mod sniff;
mod staticfiles;
mod store;

pub mod Using_static_files;

pub use self::codec::digest;
pub use self::dirindex::{Child, DirIndex};
pub use self::errors::{EmbedError, Result};
pub use self::fs::{
    DiskFile, DiskFs, EmbeddedFile, EmbeddedFs, FileSource, Metadata,
    OpenFile,
};
pub use self::serve_file::serve_file;
pub use self::server::AssetServer;
pub use self::staticfiles::{Config, StaticFiles};
pub use self::store::{Asset, Content, ContentStore};
