//! Generic file serving: the same thing a disk based file server does,
//! for any [`FileSource`].
use crate::cleanpath::{base, clean};
use crate::fs::{FileSource, Metadata, OpenFile};
use crate::listing::{encode_path, write_listing};
use crate::preconditions::{
    check_modified_since, check_preconditions, http_date, Outcome,
};
use crate::range::{parse_range, total_length, ByteRange, RangeError};
use crate::sniff::{by_extension, sniff, SNIFF_LEN};
use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use log::{debug, error};
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::time::SystemTime;

const INDEX_PAGE: &str = "/index.html";

/// Serve the file or directory named by the path of `req` from `source`.
///
/// Any `headers` given are included in the response (unless the
/// response is an error).  If an `ETag` is among them, it is used for
/// the conditional request headers.  If a `Content-Type` is among them,
/// no content type is guessed.
///
/// This handles:
/// * redirects to canonical urls: directories end with a slash, files
///   don't, and `index.html` is not named explicitly;
/// * the `index.html` of a directory, or else an html listing of it;
/// * conditional requests (`If-Match`, `If-None-Match`,
///   `If-Modified-Since`, `If-Unmodified-Since` and `If-Range`);
/// * single and multiple byte ranges;
/// * `HEAD` requests, which get the headers but no body.
///
/// Failures are never returned, they are reported as http errors.
///
/// ```
/// use bytes::Bytes;
/// use embedfs::{serve_file, Asset, ContentStore, EmbeddedFs};
/// use http::{header, HeaderMap, Request, StatusCode};
///
/// let mut store = ContentStore::new();
/// store.insert(Asset::new("/a.txt", "0123456789", 0)).unwrap();
/// let fs = EmbeddedFs::new(store);
///
/// let req = Request::get("/a.txt")
///     .header(header::RANGE, "bytes=0-4")
///     .body(())
///     .unwrap();
/// let res = serve_file(&fs, &req, HeaderMap::new());
/// assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
/// assert_eq!(res.headers()[header::CONTENT_RANGE], "bytes 0-4/10");
/// assert_eq!(res.body(), &Bytes::from("01234"));
/// ```
pub fn serve_file<S, B>(
    source: &S,
    req: &Request<B>,
    mut headers: HeaderMap,
) -> Response<Bytes>
where
    S: FileSource + ?Sized,
{
    let url = request_path(req);
    if url.ends_with(INDEX_PAGE) {
        return redirect(req, "./", headers);
    }
    let name = clean(&url);
    let (mut file, mut meta) = match open(source, &name) {
        Ok(found) => found,
        Err(err) => return io_error(req, &name, &err, headers),
    };
    if meta.is_dir() && !url.ends_with('/') {
        // Relative to the url as requested, which may not be clean.
        let to = format!("{}/", encode_path(base(&url)));
        return redirect(req, &to, headers);
    }
    if !meta.is_dir() && url.ends_with('/') {
        let to = format!("../{}", encode_path(base(&name)));
        return redirect(req, &to, headers);
    }

    let mut path = name;
    if meta.is_dir() {
        let index = format!("{}{}", path.trim_end_matches('/'), INDEX_PAGE);
        match open(source, &index) {
            Ok((index_file, index_meta)) if !index_meta.is_dir() => {
                debug!("Serving {} for {}", index, path);
                file = index_file;
                meta = index_meta;
                path = index;
            }
            _ => return dir_list(req, &path, &mut file, &meta, headers),
        }
    }
    if let Some(etag) = meta.digest().and_then(|d| etag(d, "")) {
        headers.entry(header::ETAG).or_insert(etag);
    }
    match serve_content(req, &path, &mut file, &meta, headers.clone()) {
        Ok(res) => res,
        Err(err) => io_error(req, &path, &err, headers),
    }
}

/// The percent-decoded path of a request.
pub(crate) fn request_path<B>(req: &Request<B>) -> Cow<str> {
    percent_decode_str(req.uri().path()).decode_utf8_lossy()
}

fn open<S>(source: &S, path: &str) -> io::Result<(S::File, Metadata)>
where
    S: FileSource + ?Sized,
{
    let file = source.open(path)?;
    let meta = file.metadata()?;
    Ok((file, meta))
}

fn dir_list<F: OpenFile, B>(
    req: &Request<B>,
    name: &str,
    dir: &mut F,
    meta: &Metadata,
    mut headers: HeaderMap,
) -> Response<Bytes> {
    let (method, conditions, modified) =
        (req.method(), req.headers(), meta.modified());
    if let Some(status) =
        check_modified_since(method, conditions, &mut headers, modified)
    {
        return respond(status, headers, Bytes::new());
    }
    set_last_modified(&mut headers, modified);
    let mut body = Vec::new();
    let listed = dir
        .read_dir(0)
        .and_then(|entries| write_listing(&mut body, &entries));
    if let Err(err) = listed {
        error!("Error reading directory {}: {}", name, err);
        return error_response(
            req,
            "Error reading directory",
            StatusCode::INTERNAL_SERVER_ERROR,
            headers,
        );
    }
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    finish(req, StatusCode::OK, headers, body.into())
}

fn serve_content<F: OpenFile, B>(
    req: &Request<B>,
    name: &str,
    file: &mut F,
    meta: &Metadata,
    mut headers: HeaderMap,
) -> io::Result<Response<Bytes>> {
    let modified = meta.modified();
    set_last_modified(&mut headers, modified);
    let outcome = check_preconditions(
        req.method(),
        req.headers(),
        &mut headers,
        modified,
    );
    let range = match outcome {
        Outcome::Done(status) => {
            return Ok(respond(status, headers, Bytes::new()))
        }
        Outcome::Proceed { range } => range,
    };

    if !headers.contains_key(header::CONTENT_TYPE) {
        let ctype = match by_extension(name) {
            Some(ctype) => ctype,
            None => sniff_file(file)?.to_string(),
        };
        headers.insert(header::CONTENT_TYPE, header_value(&ctype)?);
    }
    let ctype = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let size = meta.len();
    let parsed =
        range.as_deref().map(|r| parse_range(r, size)).transpose();
    let mut ranges = match parsed {
        Ok(ranges) => ranges.unwrap_or_default(),
        Err(RangeError::NoOverlap) if size == 0 => Vec::new(),
        Err(err) => {
            if err == RangeError::NoOverlap {
                headers.insert(
                    header::CONTENT_RANGE,
                    header_value(&format!("bytes */{size}"))?,
                );
            }
            debug!("Range {:?} of {}: {}", range, name, err.message());
            return Ok(error_response(
                req,
                err.message(),
                StatusCode::RANGE_NOT_SATISFIABLE,
                headers,
            ));
        }
    };
    // A client asking for more than the whole file gets the whole file.
    if total_length(&ranges) > size {
        ranges.clear();
    }

    let (status, body) = match ranges.as_slice() {
        [] => {
            let whole = ByteRange {
                start: 0,
                length: size,
            };
            (StatusCode::OK, read_range(file, whole)?)
        }
        [range] => {
            headers.insert(
                header::CONTENT_RANGE,
                header_value(&range.content_range(size))?,
            );
            (StatusCode::PARTIAL_CONTENT, read_range(file, *range)?)
        }
        ranges => {
            let boundary =
                boundary(meta, range.as_deref().unwrap_or_default());
            let mixed = format!("multipart/byteranges; boundary={boundary}");
            headers.insert(header::CONTENT_TYPE, header_value(&mixed)?);
            let body = multipart(file, ranges, &ctype, size, &boundary)?;
            (StatusCode::PARTIAL_CONTENT, body)
        }
    };
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    Ok(finish(req, status, headers, body))
}

/// Guess the content type from the start of a file, and rewind it.
pub(crate) fn sniff_file<F: OpenFile>(
    file: &mut F,
) -> io::Result<&'static str> {
    if let Some(all) = file.resident() {
        return Ok(sniff(&all[..all.len().min(SNIFF_LEN)]));
    }
    let mut buf = Vec::with_capacity(SNIFF_LEN);
    file.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut buf)?;
    file.seek(SeekFrom::Start(0))?;
    Ok(sniff(&buf))
}

fn read_range<F: OpenFile>(
    file: &mut F,
    range: ByteRange,
) -> io::Result<Bytes> {
    let start = range.start as usize;
    let end = start + range.length as usize;
    if let Some(all) = file.resident() {
        return if end <= all.len() {
            Ok(all.slice(start..end))
        } else {
            Err(io::ErrorKind::UnexpectedEof.into())
        };
    }
    file.seek(SeekFrom::Start(range.start))?;
    let mut buf = vec![0; range.length as usize];
    file.read_exact(&mut buf)?;
    Ok(buf.into())
}

fn multipart<F: OpenFile>(
    file: &mut F,
    ranges: &[ByteRange],
    ctype: &str,
    size: u64,
    boundary: &str,
) -> io::Result<Bytes> {
    let mut body = Vec::new();
    for (i, range) in ranges.iter().enumerate() {
        if i > 0 {
            body.write_all(b"\r\n")?;
        }
        write!(
            body,
            "--{boundary}\r\nContent-Range: {}\r\n\
             Content-Type: {ctype}\r\n\r\n",
            range.content_range(size),
        )?;
        body.write_all(&read_range(file, *range)?)?;
    }
    write!(body, "\r\n--{boundary}--\r\n")?;
    Ok(body.into())
}

/// A multipart boundary, the same for every request for the same
/// ranges of the same content.
fn boundary(meta: &Metadata, range: &str) -> String {
    let id = meta.digest().unwrap_or(meta.name());
    format!("{:x}", md5::compute(format!("{id} {range}")))
}

/// An `ETag` header value for a content digest.
pub(crate) fn etag(digest: &str, suffix: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("\"{digest}{suffix}\"")).ok()
}

/// Set `Last-Modified`, unless the time is unknown or out of range.
pub(crate) fn set_last_modified(
    headers: &mut HeaderMap,
    modified: SystemTime,
) {
    let value =
        http_date(modified).and_then(|d| HeaderValue::from_str(&d).ok());
    if let Some(value) = value {
        headers.insert(header::LAST_MODIFIED, value);
    }
}

fn header_value(value: &str) -> io::Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn redirect<B>(
    req: &Request<B>,
    to: &str,
    mut headers: HeaderMap,
) -> Response<Bytes> {
    let to = match req.uri().query() {
        Some(query) => format!("{to}?{query}"),
        None => to.to_string(),
    };
    match HeaderValue::from_str(&to) {
        Ok(location) => {
            debug!("Redirecting {} to {}", req.uri().path(), to);
            headers.insert(header::LOCATION, location);
            respond(StatusCode::MOVED_PERMANENTLY, headers, Bytes::new())
        }
        Err(err) => {
            error!("Bad redirect location {:?}: {}", to, err);
            error_response(
                req,
                "500 Internal Server Error",
                StatusCode::INTERNAL_SERVER_ERROR,
                headers,
            )
        }
    }
}

/// Map an error from opening or reading a file to a http error.
pub(crate) fn io_error<B>(
    req: &Request<B>,
    name: &str,
    err: &io::Error,
    headers: HeaderMap,
) -> Response<Bytes> {
    match err.kind() {
        io::ErrorKind::NotFound => {
            debug!("Not found: {}", name);
            let status = StatusCode::NOT_FOUND;
            error_response(req, "404 page not found", status, headers)
        }
        io::ErrorKind::PermissionDenied => {
            error_response(req, "403 Forbidden", StatusCode::FORBIDDEN, headers)
        }
        _ => {
            error!("Failed to serve {}: {}", name, err);
            error_response(
                req,
                "500 Internal Server Error",
                StatusCode::INTERNAL_SERVER_ERROR,
                headers,
            )
        }
    }
}

/// A plain text error response.
fn error_response<B>(
    req: &Request<B>,
    message: &str,
    status: StatusCode,
    mut headers: HeaderMap,
) -> Response<Bytes> {
    headers.remove(header::CONTENT_ENCODING);
    headers.remove(header::ETAG);
    headers.remove(header::LAST_MODIFIED);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    finish(req, status, headers, Bytes::from(format!("{message}\n")))
}

/// Set `Content-Length` (unless the body is encoded) and drop the body
/// of a `HEAD` response.
pub(crate) fn finish<B>(
    req: &Request<B>,
    status: StatusCode,
    mut headers: HeaderMap,
    body: Bytes,
) -> Response<Bytes> {
    if !headers.contains_key(header::CONTENT_ENCODING) {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
    }
    let body = if *req.method() == Method::HEAD {
        Bytes::new()
    } else {
        body
    };
    respond(status, headers, body)
}

pub(crate) fn respond(
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
) -> Response<Bytes> {
    let mut res = Response::new(body);
    *res.status_mut() = status;
    *res.headers_mut() = headers;
    res
}
