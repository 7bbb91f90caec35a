//! Guessing content types, by file extension or by content.
use crate::cleanpath::extension;

/// The maximum number of bytes considered by [`sniff`].
pub const SNIFF_LEN: usize = 512;

/// Content type by the extension of a path, if it is known.
///
/// Textual types get an explicit utf-8 charset.
pub fn by_extension(path: &str) -> Option<String> {
    let mime = mime_guess::from_ext(extension(path)?).first()?;
    let textual = mime.type_() == mime_guess::mime::TEXT
        || mime.subtype() == mime_guess::mime::JAVASCRIPT
        || mime.subtype() == mime_guess::mime::JSON
        || mime.suffix() == Some(mime_guess::mime::XML);
    if textual && mime.get_param(mime_guess::mime::CHARSET).is_none() {
        Some(format!("{}; charset=utf-8", mime.essence_str()))
    } else {
        Some(mime.to_string())
    }
}

/// Signatures that match a prefix of the content exactly.
static EXACT: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"\xFE\xFF", "text/plain; charset=utf-16be"),
    (b"\xFF\xFE", "text/plain; charset=utf-16le"),
    (b"\xEF\xBB\xBF", "text/plain; charset=utf-8"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"BM", "image/bmp"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"\x00\x00\x02\x00", "image/x-icon"),
    (b"wOFF", "font/woff"),
    (b"wOF2", "font/woff2"),
    (b"OggS\x00", "application/ogg"),
    (b"\x1F\x8B\x08", "application/x-gzip"),
    (b"PK\x03\x04", "application/zip"),
    (b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    (b"\x00\x61\x73\x6D", "application/wasm"),
];

/// Case-insensitive html tags that are recognized after leading
/// whitespace, when followed by a space or `>`.
static HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

/// Guess the content type of some data by looking at (at most) its
/// first [`SNIFF_LEN`] bytes.
///
/// This never fails; unknown binary data is
/// `application/octet-stream` and unknown text is `text/plain`.
pub fn sniff(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];
    let text = {
        let start = data
            .iter()
            .position(|b| !is_whitespace(*b))
            .unwrap_or(data.len());
        &data[start..]
    };
    if HTML_TAGS.iter().any(|sig| html_tag_at(text, sig)) {
        return "text/html; charset=utf-8";
    }
    if text.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }
    let exact = EXACT.iter().find(|(sig, _)| data.starts_with(sig));
    if let Some((_, ctype)) = exact {
        return ctype;
    }
    let riff = data.len() >= 14 && data.starts_with(b"RIFF");
    if riff && &data[8..14] == b"WEBPVP" {
        return "image/webp";
    }
    if data.iter().any(|b| is_binary(*b)) {
        "application/octet-stream"
    } else {
        "text/plain; charset=utf-8"
    }
}

fn html_tag_at(data: &[u8], sig: &[u8]) -> bool {
    data.len() > sig.len()
        && data[..sig.len()].eq_ignore_ascii_case(sig)
        && matches!(data[sig.len()], b' ' | b'>')
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

fn is_binary(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
