// This module is only a chapter of the documentation.
#![allow(non_snake_case)]
//! How to embed static files in a program and serve them.
//!
//! Most web applications have some static resources: css, javascript,
//! pictures.  Distributing them as separate files beside the binary
//! means one more thing to keep in sync at deploy time.
//! With embedfs, the files are prepared at build time (digested and
//! compressed), compiled into the binary, and served with the same
//! semantics as a file server reading them from disk.

pub mod a_Overview {
    //! This section describes how to set up a project to embed
    //! static files.
    //!
    //! Add embedfs both as a dependency and as a build dependency in
    //! `Cargo.toml`:
    //!
    //! ```toml
    //! [build-dependencies]
    //! embedfs = "0.3"
    //!
    //! [dependencies]
    //! embedfs = "0.3"
    //! ```
    //!
    //! Then tell embedfs to prepare the files in `build.rs`:
    //!
    //! ```no_run
    //! use embedfs::{Result, StaticFiles};
    //!
    //! fn main() -> Result<()> {
    //!     let mut statics = StaticFiles::from_env()?;
    //!     statics.add_files("static")
    //! }
    //! ```
    //!
    //! This writes the file `assets.rs` to the build output directory.
    //! It contains a single function, `content_store`, which builds a
    //! [`ContentStore`](crate::ContentStore) containing each file in
    //! the `static` directory.  A file `static/css/style.css` gets the
    //! path `/css/style.css`.
    //!
    //! Include the generated code in your program, and build the store
    //! once, at startup:
    //!
    //! ```ignore
    //! include!(concat!(env!("OUT_DIR"), "/assets.rs"));
    //!
    //! fn main() {
    //!     let store = content_store().expect("embedded assets");
    //!     let fs = embedfs::EmbeddedFs::new(store);
    //!     let server = embedfs::AssetServer::new(fs);
    //!     // ... give the server to your request handlers.
    //! }
    //! ```
    //!
    //! Building the store fails only if the generated data is broken;
    //! there is no reason to start serving in that case.
}

pub mod b_Serving {
    //! How requests are handled.
    //!
    //! An [`AssetServer`](crate::AssetServer) takes an
    //! [`http::Request`] and returns an [`http::Response`] with a
    //! [`bytes::Bytes`] body, so it can be used with any web framework
    //! built on the `http` crate.
    //!
    //! ```
    //! # fn main() -> embedfs::Result<()> {
    //! use embedfs::{Asset, AssetServer, ContentStore, EmbeddedFs};
    //! use http::{header, Request, StatusCode};
    //!
    //! let mut store = ContentStore::new();
    //! store.insert(Asset::new("/a.txt", "0123456789", 1483228800))?;
    //! let server = AssetServer::new(EmbeddedFs::new(store));
    //!
    //! let req = Request::get("/a.txt")
    //!     .header(header::RANGE, "bytes=0-4")
    //!     .body(())
    //!     .unwrap();
    //! let res = server.serve(&req);
    //! assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    //! assert_eq!(res.headers()[header::CONTENT_RANGE], "bytes 0-4/10");
    //! assert_eq!(res.body(), "01234");
    //! # Ok(())
    //! # }
    //! ```
    //!
    //! Each asset has an `ETag` based on an md5 digest of its content,
    //! and a `Last-Modified` time, so clients can cache it and
    //! revalidate it with `If-None-Match` or `If-Modified-Since`.
    //!
    //! If a compressed representation of an asset exists, and a client
    //! sends a plain `GET` accepting gzip, that representation is sent
    //! as is, with `Content-Encoding: gzip`.  It has an `ETag` of its
    //! own, with a `-gzip` suffix, so a cached raw representation is
    //! never mistaken for a compressed one.
    //! Other requests, including range requests, get the raw content.
    //!
    //! Directories are served as a file server would: the
    //! `index.html` of the directory if there is one, otherwise a
    //! listing of the directory.
}

pub mod c_Development {
    //! Serving files from disk while developing.
    //!
    //! Rebuilding to see each change of a stylesheet gets tedious.
    //! A [`DiskFs`](crate::DiskFs) serves the same directory, read
    //! from disk on each request, through the same server:
    //!
    //! ```no_run
    //! use embedfs::{AssetServer, DiskFs};
    //!
    //! let server = AssetServer::new(DiskFs::new("static"));
    //! ```
    //!
    //! Files on disk have no precomputed digest or compressed
    //! representation, so they are served without `ETag` and
    //! uncompressed.
    //! Since the server is generic over its
    //! [`FileSource`](crate::FileSource), picking one or the other can
    //! be done with a cargo feature in your application.
}

pub mod d_Configuration {
    //! Choosing what to compress and include.
    //!
    //! By default, textual files (css, js, html, svg, json, txt, xml)
    //! are stored compressed and other files are stored raw.
    //! A compressed file is only used if it is actually smaller than
    //! the original.
    //! This can be changed with a [`Config`](crate::Config):
    //!
    //! ```no_run
    //! use embedfs::{Config, Result, StaticFiles};
    //! # fn main() -> Result<()> {
    //! let config = Config::default()
    //!     .compress("wasm")
    //!     .exclude("map")
    //!     .modified(1483228800);
    //! let out_dir = std::env::var("OUT_DIR").unwrap();
    //! let mut statics = StaticFiles::for_dir(out_dir, config)?;
    //! statics.add_files_as("node_modules/some-lib/dist", "/vendor")?;
    //! statics.add_file_data("/version.txt", b"1.0.0\n", 1483228800)?;
    //! # Ok(())
    //! # }
    //! ```
    //!
    //! Setting a fixed modification time makes the generated code (and
    //! the `Last-Modified` headers) independent of when the files were
    //! checked out.
}
