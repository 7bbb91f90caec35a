//! Lexical handling of `/`-separated logical paths.
use itertools::Itertools;

/// Return the shortest absolute path equivalent to `path`.
///
/// Empty and `.` elements are dropped, `..` removes the preceding
/// element (and is ignored at the root), and the result always starts
/// with a single `/` and never ends with one (except for the root
/// itself).
pub fn clean(path: &str) -> String {
    let mut parts = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => (),
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }
    format!("/{}", parts.iter().format("/"))
}

/// The directory containing a clean path.  The root is its own parent.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(pos) => &path[..pos],
    }
}

/// The last element of a clean path.
pub fn base(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) if pos + 1 < path.len() => &path[pos + 1..],
        _ => "/",
    }
}

/// The extension of the last element of a path, without the dot.
pub fn extension(path: &str) -> Option<&str> {
    let name = base(path);
    match name.rfind('.') {
        Some(pos) if pos > 0 => Some(&name[pos + 1..]),
        _ => None,
    }
}
