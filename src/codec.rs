//! Encodings shared by asset preparation and the content store.
use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};

/// Standard alphabet, written without padding, read with or without.
pub(crate) const PAYLOAD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The digest of some content, as used in an `ETag`.
///
/// This is the full 128 bits of an md5 sum, as 22 url-safe base64
/// characters.
///
/// ```
/// let digest = embedfs::digest(b"body{color:black}\n");
/// assert_eq!(digest, "r3rltVhWzdbakf9IZQJ4Aw");
/// ```
pub fn digest(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(md5::compute(data).0)
}

/// Decode a base64 payload, ignoring any whitespace (line breaks) in it.
pub(crate) fn decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact = data
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect::<Vec<u8>>();
    PAYLOAD.decode(compact)
}

/// Encode a payload as base64 lines of at most `width` characters.
pub(crate) fn encode_wrapped(data: &[u8], width: usize) -> String {
    let encoded = PAYLOAD.encode(data);
    let lines = encoded.len() / width + 1;
    let mut out = String::with_capacity(encoded.len() + lines);
    // base64 output is ascii, so any byte offset is a char boundary.
    for line in encoded.as_bytes().chunks(width) {
        out.push_str(std::str::from_utf8(line).unwrap_or_default());
        out.push('\n');
    }
    out
}

pub(crate) fn gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}

pub(crate) fn gunzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}
