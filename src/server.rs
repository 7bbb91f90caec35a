use crate::cleanpath::clean;
use crate::fs::{FileSource, OpenFile};
use crate::preconditions::{check_preconditions, Outcome};
use crate::serve_file::{
    etag, finish, io_error, request_path, respond, serve_file,
    set_last_modified, sniff_file,
};
use crate::sniff::by_extension;
use crate::{EmbedError, Result};
use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use log::debug;
use std::io::{self, Read};

/// An http handler serving the files of a [`FileSource`].
///
/// For a `GET` request from a client accepting gzip, the stored gzip
/// representation of an asset is served as it is, with an `ETag`
/// distinct from that of the raw content.  Any other request (`HEAD`,
/// range requests, clients not accepting gzip, assets without a gzip
/// representation, directories) is handled by [`serve_file`].
///
/// The server does not care about the http stack used; give it an
/// [`http::Request`] and send the [`http::Response`] it returns.
///
/// ```
/// # fn main() -> embedfs::Result<()> {
/// use embedfs::{Asset, AssetServer, ContentStore, EmbeddedFs};
/// use http::{header, Request, StatusCode};
///
/// let mut store = ContentStore::new();
/// let css = "body { margin: 0 }";
/// store.insert(Asset::new("/style.css", css, 1483228800))?;
/// let server = AssetServer::new(EmbeddedFs::new(store));
///
/// let req = Request::get("/style.css").body(()).unwrap();
/// let res = server.serve(&req);
/// assert_eq!(res.status(), StatusCode::OK);
/// let ctype = &res.headers()[header::CONTENT_TYPE];
/// assert_eq!(ctype, "text/css; charset=utf-8");
/// assert_eq!(server.get_contents("/style.css")?, css);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AssetServer<S> {
    source: S,
}

impl<S: FileSource> AssetServer<S> {
    pub fn new(source: S) -> Self {
        AssetServer { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Handle a request.
    ///
    /// The body of the request is ignored.
    pub fn serve<B>(&self, req: &Request<B>) -> Response<Bytes> {
        let path = clean(&request_path(req));
        let mut headers = HeaderMap::new();
        let file = self.source.open(&path).and_then(|file| {
            let meta = file.metadata()?;
            Ok((file, meta))
        });
        let (mut file, meta) = match file {
            Ok(found) => found,
            Err(err) => return io_error(req, &path, &err, headers),
        };
        if meta.is_dir() {
            return serve_file(&self.source, req, headers);
        }

        let gzip = file.gzip().filter(|gz| !gz.is_empty());
        if gzip.is_some() {
            let vary = HeaderValue::from_static("Accept-Encoding");
            headers.insert(header::VARY, vary);
        }
        let fast = *req.method() == Method::GET
            && !req.headers().contains_key(header::RANGE)
            && accepts_gzip(req.headers());
        match (gzip, meta.digest()) {
            (Some(gzip), Some(digest)) if fast => {
                debug!("Serving gzip of {}", path);
                if let Some(etag) = etag(digest, "-gzip") {
                    headers.insert(header::ETAG, etag);
                }
                set_last_modified(&mut headers, meta.modified());
                let outcome = check_preconditions(
                    req.method(),
                    req.headers(),
                    &mut headers,
                    meta.modified(),
                );
                if let Outcome::Done(status) = outcome {
                    return respond(status, headers, Bytes::new());
                }
                let res = gzip_response(req, &path, &mut file, gzip, &headers);
                match res {
                    Ok(res) => res,
                    Err(err) => io_error(req, &path, &err, headers),
                }
            }
            (_, digest) => {
                if let Some(etag) = digest.and_then(|d| etag(d, "")) {
                    headers.insert(header::ETAG, etag);
                }
                serve_file(&self.source, req, headers)
            }
        }
    }

    /// Get the raw content of the file at `path`.
    ///
    /// This is intended for using asset data outside of http serving,
    /// e.g. inlining it in a template.
    pub fn get_contents(&self, path: &str) -> Result<Bytes> {
        let path = clean(path);
        let mut file = self.source.open(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                EmbedError::NotFound(path.clone())
            } else {
                EmbedError::Io(e)
            }
        })?;
        if file.metadata()?.is_dir() {
            return Err(EmbedError::NotFound(path));
        }
        if let Some(all) = file.resident() {
            return Ok(all);
        }
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(buf.into())
    }
}

/// Respond with the stored gzip representation of a file.
fn gzip_response<F: OpenFile, B>(
    req: &Request<B>,
    path: &str,
    file: &mut F,
    gzip: Bytes,
    headers: &HeaderMap,
) -> io::Result<Response<Bytes>> {
    // The type of the content, not of the gzip stream.
    let ctype = match by_extension(path) {
        Some(ctype) => ctype,
        None => sniff_file(file)?.to_string(),
    };
    let ctype = HeaderValue::from_str(&ctype)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut headers = headers.clone();
    headers.insert(header::CONTENT_TYPE, ctype);
    headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(gzip.len()));
    Ok(finish(req, StatusCode::OK, headers, gzip))
}

/// True if the `Accept-Encoding` headers accept gzip, by name or by `*`.
///
/// A coding with `q=0` is not accepted, and gzip named explicitly
/// takes precedence over `*`.
fn accepts_gzip(headers: &HeaderMap) -> bool {
    let (mut gzip, mut any) = (None, None);
    let codings = headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','));
    for coding in codings {
        let mut parts = coding.split(';');
        let name = parts.next().unwrap_or_default().trim();
        let refused = parts.any(|param| {
            param
                .trim()
                .strip_prefix("q=")
                .and_then(|q| q.parse::<f32>().ok())
                .is_some_and(|q| q == 0.0)
        });
        if name.eq_ignore_ascii_case("gzip") {
            gzip = Some(!refused);
        } else if name == "*" {
            any = Some(!refused);
        }
    }
    gzip.or(any).unwrap_or(false)
}
