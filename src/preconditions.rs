//! Evaluation of conditional request headers.
//!
//! Both the compressed fast path and the generic file serving use
//! [`check_preconditions`], so they always agree on when to answer
//! `304 Not Modified` or `412 Precondition Failed`.
use http::header::{self, HeaderMap, HeaderName};
use http::{Method, StatusCode};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while};
use nom::character::complete::char;
use nom::combinator::{opt, recognize};
use nom::multi::many0;
use nom::sequence::preceded;
use nom::{IResult, Parser};
use std::time::{SystemTime, UNIX_EPOCH};

/// The result of checking the preconditions of a request.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The response is decided by the preconditions alone, and has
    /// no body.  The response headers are already adjusted.
    Done(StatusCode),
    /// Go on serving the content, honoring `range` if present.
    Proceed { range: Option<String> },
}

/// The value of a single condition.  `None` means the header is
/// absent or should be ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cond {
    None,
    True,
    False,
}

fn is_etagc(c: char) -> bool {
    c == '!' || ('#'..='~').contains(&c) || !c.is_ascii()
}

/// An entity tag, including quotes and any `W/` prefix.
fn entity_tag(input: &str) -> IResult<&str, &str> {
    recognize((opt(tag("W/")), char('"'), take_while(is_etagc), char('"')))
        .parse(input)
}

/// A list of entity tags (or `*`).  Parsing stops silently at the first
/// element that is not an entity tag.
fn tag_list(input: &str) -> IResult<&str, Vec<&str>> {
    many0(preceded(
        take_while(|c: char| c == ' ' || c == '\t' || c == ','),
        alt((tag("*"), entity_tag)),
    ))
    .parse(input)
}

fn tags(value: &str) -> Vec<&str> {
    tag_list(value).map(|(_, tags)| tags).unwrap_or_default()
}

fn strong_match(a: &str, b: &str) -> bool {
    a == b && a.starts_with('"')
}

fn weak_match(a: &str, b: &str) -> bool {
    a.trim_start_matches("W/") == b.trim_start_matches("W/")
}

fn header_str<'a>(
    headers: &'a HeaderMap,
    name: HeaderName,
) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// The first second of year 10000.  Http dates can't express it or
/// anything later.
pub(crate) const HTTP_DATE_LIMIT: u64 = 253402300800;

/// Seconds since the epoch, or `None` for an unknown (epoch) time.
pub(crate) fn unix_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
        .filter(|s| *s > 0)
}

/// Format a time as an http date, unless it is unknown or too late.
pub(crate) fn http_date(time: SystemTime) -> Option<String> {
    unix_secs(time)
        .filter(|s| *s < HTTP_DATE_LIMIT)
        .map(|_| httpdate::fmt_http_date(time))
}

fn http_secs(value: &str) -> Option<u64> {
    httpdate::parse_http_date(value)
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
}

fn if_match(req: &HeaderMap, etag: Option<&str>) -> Cond {
    let Some(value) = header_str(req, header::IF_MATCH) else {
        return Cond::None;
    };
    let matched = tags(value)
        .into_iter()
        .any(|t| t == "*" || etag.is_some_and(|e| strong_match(t, e)));
    if matched {
        Cond::True
    } else {
        Cond::False
    }
}

fn if_unmodified_since(req: &HeaderMap, modified: SystemTime) -> Cond {
    let (Some(value), Some(modified)) =
        (header_str(req, header::IF_UNMODIFIED_SINCE), unix_secs(modified))
    else {
        return Cond::None;
    };
    match http_secs(value) {
        Some(since) if modified <= since => Cond::True,
        Some(_) => Cond::False,
        None => Cond::None,
    }
}

/// `False` means some tag matches, so the request is not fulfilled.
fn if_none_match(req: &HeaderMap, etag: Option<&str>) -> Cond {
    let Some(value) = header_str(req, header::IF_NONE_MATCH) else {
        return Cond::None;
    };
    let matched = tags(value)
        .into_iter()
        .any(|t| t == "*" || etag.is_some_and(|e| weak_match(t, e)));
    if matched {
        Cond::False
    } else {
        Cond::True
    }
}

fn if_modified_since(
    method: &Method,
    req: &HeaderMap,
    modified: SystemTime,
) -> Cond {
    if *method != Method::GET && *method != Method::HEAD {
        return Cond::None;
    }
    let (Some(value), Some(modified)) =
        (header_str(req, header::IF_MODIFIED_SINCE), unix_secs(modified))
    else {
        return Cond::None;
    };
    match http_secs(value) {
        Some(since) if modified <= since => Cond::False,
        Some(_) => Cond::True,
        None => Cond::None,
    }
}

fn if_range(
    method: &Method,
    req: &HeaderMap,
    etag: Option<&str>,
    modified: SystemTime,
) -> Cond {
    if *method != Method::GET && *method != Method::HEAD {
        return Cond::None;
    }
    let Some(value) = header_str(req, header::IF_RANGE) else {
        return Cond::None;
    };
    if let Ok((_, tag)) = entity_tag(value.trim_start()) {
        return if etag.is_some_and(|e| strong_match(tag, e)) {
            Cond::True
        } else {
            Cond::False
        };
    }
    match (unix_secs(modified), http_secs(value)) {
        (Some(modified), Some(date)) if modified == date => Cond::True,
        _ => Cond::False,
    }
}

/// Check the conditional headers of a request against the current
/// `ETag` (as already set in `res`) and modification time.
///
/// If-Match (or If-Unmodified-Since) is checked first, then
/// If-None-Match (or If-Modified-Since).  If the request should go on,
/// the `Range` header is returned unless an If-Range condition
/// cancels it.
pub fn check_preconditions(
    method: &Method,
    req: &HeaderMap,
    res: &mut HeaderMap,
    modified: SystemTime,
) -> Outcome {
    let etag = header_str(res, header::ETAG).map(str::to_string);
    let etag = etag.as_deref();

    let mut cond = if_match(req, etag);
    if cond == Cond::None {
        cond = if_unmodified_since(req, modified);
    }
    if cond == Cond::False {
        return Outcome::Done(StatusCode::PRECONDITION_FAILED);
    }
    match if_none_match(req, etag) {
        Cond::False if *method == Method::GET || *method == Method::HEAD => {
            return Outcome::Done(not_modified(res));
        }
        Cond::False => return Outcome::Done(StatusCode::PRECONDITION_FAILED),
        Cond::None
            if if_modified_since(method, req, modified) == Cond::False =>
        {
            return Outcome::Done(not_modified(res));
        }
        _ => (),
    }
    let range = header_str(req, header::RANGE)
        .filter(|_| if_range(method, req, etag, modified) != Cond::False)
        .map(str::to_string);
    Outcome::Proceed { range }
}

/// Check only If-Modified-Since, for content that has no `ETag`.
pub fn check_modified_since(
    method: &Method,
    req: &HeaderMap,
    res: &mut HeaderMap,
    modified: SystemTime,
) -> Option<StatusCode> {
    if if_modified_since(method, req, modified) == Cond::False {
        Some(not_modified(res))
    } else {
        None
    }
}

/// Strip headers that must not be part of a 304 response.
fn not_modified(res: &mut HeaderMap) -> StatusCode {
    res.remove(header::CONTENT_TYPE);
    res.remove(header::CONTENT_LENGTH);
    res.remove(header::CONTENT_ENCODING);
    if res.contains_key(header::ETAG) {
        res.remove(header::LAST_MODIFIED);
    }
    StatusCode::NOT_MODIFIED
}
