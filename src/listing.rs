//! Html listings of directories without an index file.
use crate::fs::Metadata;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::io::{self, Write};

/// Bytes that must be escaped in the path part of a relative url.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'\'')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Write an html listing of some directory entries, sorted by name.
///
/// Directories are written with a trailing slash.
pub fn write_listing(
    out: &mut impl Write,
    entries: &[Metadata],
) -> io::Result<()> {
    let mut entries = entries.iter().collect::<Vec<_>>();
    entries.sort_by(|a, b| a.name().cmp(b.name()));
    out.write_all(b"<!doctype html>\n")?;
    out.write_all(
        b"<meta name=\"viewport\" content=\"width=device-width\">\n",
    )?;
    out.write_all(b"<pre>\n")?;
    for entry in entries {
        let mut name = entry.name().to_string();
        if entry.is_dir() {
            name.push('/');
        }
        write!(out, "<a href=\"{}\">", href(&name))?;
        write!(HtmlEscaper(&mut *out), "{name}")?;
        out.write_all(b"</a>\n")?;
    }
    out.write_all(b"</pre>\n")
}

/// A relative url for `name`.
///
/// A name like `a:b` would look like an url with a scheme, so it
/// gets a leading `./`.
fn href(name: &str) -> String {
    let encoded = encode_path(name);
    match name.find(':') {
        Some(colon) if !name[..colon].contains('/') => format!("./{encoded}"),
        _ => encoded,
    }
}

/// Percent-encode a path for use in an url.
pub(crate) fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH).to_string()
}

struct HtmlEscaper<W>(W);

impl<W: Write> Write for HtmlEscaper<W> {
    // Writing less than everything is fine, write_all will call again
    // with the rest of the data.
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = data
            .iter()
            .take_while(|&&c| {
                c != b'"' && c != b'&' && c != b'\'' && c != b'<' && c != b'>'
            })
            .count();
        if n > 0 {
            self.0.write(&data[..n])
        } else {
            self.write_one_escaped(data)
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write> HtmlEscaper<W> {
    #[inline(never)]
    fn write_one_escaped(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.write_all(match data.first() {
            Some(b'"') => b"&#34;",
            Some(b'&') => b"&amp;",
            Some(b'<') => b"&lt;",
            Some(b'>') => b"&gt;",
            None => return Ok(0),
            _ => b"&#39;",
        })?;
        Ok(1)
    }
}
