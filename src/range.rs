//! Parsing of `Range` request headers.
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, space0, u64 as number};
use nom::combinator::{all_consuming, map, opt};
use nom::multi::separated_list1;
use nom::sequence::{delimited, preceded, separated_pair};
use nom::{IResult, Parser};

/// A satisfiable byte range of some content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub length: u64,
}

impl ByteRange {
    /// The value of a `Content-Range` header for this range.
    pub fn content_range(&self, size: u64) -> String {
        format!(
            "bytes {}-{}/{}",
            self.start,
            self.start + self.length - 1,
            size
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    /// The header is not a valid byte range specification.
    Invalid,
    /// No range overlaps the content.
    NoOverlap,
}

impl RangeError {
    pub fn message(self) -> &'static str {
        match self {
            RangeError::Invalid => "invalid range",
            RangeError::NoOverlap => "invalid range: failed to overlap",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Spec {
    /// `first-` or `first-last`.
    FromTo(u64, Option<u64>),
    /// `-length`, the last bytes of the content.
    Suffix(u64),
}

fn spec(input: &str) -> IResult<&str, Spec> {
    alt((
        map(preceded(char('-'), number), Spec::Suffix),
        map(
            separated_pair(number, (space0, char('-'), space0), opt(number)),
            |(first, last)| Spec::FromTo(first, last),
        ),
    ))
    .parse(input)
}

/// Empty list elements are allowed and ignored.
fn specs(input: &str) -> IResult<&str, Vec<Option<Spec>>> {
    preceded(
        tag("bytes="),
        separated_list1(char(','), delimited(space0, opt(spec), space0)),
    )
    .parse(input)
}

/// Parse a `Range` header for content of `size` bytes.
///
/// Ranges that start beyond the end of the content are ignored, and
/// ranges extending beyond it are truncated.  If no range remains
/// but some were given, [`RangeError::NoOverlap`] is returned.
pub fn parse_range(
    header: &str,
    size: u64,
) -> Result<Vec<ByteRange>, RangeError> {
    let (_, specs) = all_consuming(specs)
        .parse(header)
        .map_err(|_| RangeError::Invalid)?;
    let mut ranges = Vec::new();
    let mut no_overlap = false;
    for spec in specs.into_iter().flatten() {
        match spec {
            Spec::Suffix(len) => {
                if len == 0 || size == 0 {
                    no_overlap = true;
                    continue;
                }
                let len = len.min(size);
                ranges.push(ByteRange {
                    start: size - len,
                    length: len,
                });
            }
            Spec::FromTo(start, last) => {
                if start >= size {
                    no_overlap = true;
                    continue;
                }
                let last = match last {
                    Some(last) if last < start => {
                        return Err(RangeError::Invalid)
                    }
                    Some(last) => last.min(size - 1),
                    None => size - 1,
                };
                ranges.push(ByteRange {
                    start,
                    length: last - start + 1,
                });
            }
        }
    }
    if no_overlap && ranges.is_empty() {
        return Err(RangeError::NoOverlap);
    }
    Ok(ranges)
}

/// The total number of bytes in some ranges.
pub fn total_length(ranges: &[ByteRange]) -> u64 {
    ranges.iter().map(|r| r.length).sum()
}

#[cfg(test)]
mod test {
    use super::*;

    fn r(start: u64, length: u64) -> ByteRange {
        ByteRange { start, length }
    }

    #[test]
    fn first_five() {
        assert_eq!(parse_range("bytes=0-4", 10), Ok(vec![r(0, 5)]));
        assert_eq!(r(0, 5).content_range(10), "bytes 0-4/10");
    }

    #[test]
    fn open_ended() {
        assert_eq!(parse_range("bytes=7-", 10), Ok(vec![r(7, 3)]));
    }

    #[test]
    fn suffix() {
        assert_eq!(parse_range("bytes=-3", 10), Ok(vec![r(7, 3)]));
        assert_eq!(parse_range("bytes=-30", 10), Ok(vec![r(0, 10)]));
    }

    #[test]
    fn truncated_end() {
        assert_eq!(parse_range("bytes=5-100", 10), Ok(vec![r(5, 5)]));
    }

    #[test]
    fn several() {
        assert_eq!(
            parse_range("bytes=0-1, 4-5,,8-", 10),
            Ok(vec![r(0, 2), r(4, 2), r(8, 2)]),
        );
    }

    #[test]
    fn whitespace_around_dash() {
        assert_eq!(parse_range("bytes= 2 - 3 ", 10), Ok(vec![r(2, 2)]));
    }

    #[test]
    fn no_overlap() {
        assert_eq!(parse_range("bytes=10-20", 10), Err(RangeError::NoOverlap));
        assert_eq!(parse_range("bytes=-0", 10), Err(RangeError::NoOverlap));
        assert_eq!(parse_range("bytes=0-", 0), Err(RangeError::NoOverlap));
    }

    #[test]
    fn partly_overlapping() {
        assert_eq!(parse_range("bytes=20-30,1-1", 10), Ok(vec![r(1, 1)]));
    }

    #[test]
    fn invalid() {
        assert_eq!(parse_range("bytes=4-2", 10), Err(RangeError::Invalid));
        assert_eq!(parse_range("chars=0-4", 10), Err(RangeError::Invalid));
        assert_eq!(parse_range("bytes=a-b", 10), Err(RangeError::Invalid));
        assert_eq!(parse_range("bytes=1-2-3", 10), Err(RangeError::Invalid));
        assert_eq!(parse_range("bytes=--2", 10), Err(RangeError::Invalid));
    }

    #[test]
    fn empty_list() {
        assert_eq!(parse_range("bytes=", 10), Ok(vec![]));
    }

    #[test]
    fn total() {
        assert_eq!(total_length(&[r(0, 2), r(4, 2)]), 4);
    }
}
