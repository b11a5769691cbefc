// HTTP byte-range parsing

/// Represents a single byte range
#[derive(Debug, Clone, PartialEq)]
pub struct ByteRange {
    /// Start position (None for suffix ranges)
    pub start: Option<u64>,
    /// End position (None for open-ended ranges)
    pub end: Option<u64>,
}

impl ByteRange {
    /// Resolve against an object of `len` bytes into inclusive offsets.
    ///
    /// Returns None when the range cannot be satisfied.
    pub fn resolve(&self, len: u64) -> Option<(u64, u64)> {
        if len == 0 {
            return None;
        }
        match (self.start, self.end) {
            (Some(start), end) => {
                if start >= len {
                    return None;
                }
                let end = end.map_or(len - 1, |e| e.min(len - 1));
                if end < start {
                    return None;
                }
                Some((start, end))
            }
            (None, Some(suffix)) => {
                if suffix == 0 {
                    return None;
                }
                Some((len.saturating_sub(suffix), len - 1))
            }
            (None, None) => None,
        }
    }
}

/// Represents a parsed Range header
#[derive(Debug, Clone, PartialEq)]
pub struct RangeHeader {
    /// Unit (typically "bytes")
    pub unit: String,
    /// List of ranges
    pub ranges: Vec<ByteRange>,
}

impl RangeHeader {
    /// The single byte range, if this header names exactly one
    pub fn single_bytes_range(&self) -> Option<&ByteRange> {
        if self.unit.eq_ignore_ascii_case("bytes") && self.ranges.len() == 1 {
            self.ranges.first()
        } else {
            None
        }
    }
}

/// Parses an HTTP Range header value
/// Supports formats like:
/// - bytes=0-1023 (single range)
/// - bytes=1000- (open-ended)
/// - bytes=-1000 (suffix)
/// - bytes=0-100,200-300 (multiple ranges)
pub fn parse_range_header(header_value: &str) -> Option<RangeHeader> {
    let (unit, ranges_str) = header_value.trim().split_once('=')?;
    let unit = unit.trim();
    if unit.is_empty() {
        return None;
    }

    let mut ranges = Vec::new();
    for range_str in ranges_str.split(',') {
        let (start_str, end_str) = range_str.trim().split_once('-')?;
        let start_str = start_str.trim();
        let end_str = end_str.trim();

        // Empty start means suffix range, empty end means open-ended
        let start = if start_str.is_empty() {
            None
        } else {
            Some(start_str.parse::<u64>().ok()?)
        };
        let end = if end_str.is_empty() {
            None
        } else {
            Some(end_str.parse::<u64>().ok()?)
        };

        if start.is_none() && end.is_none() {
            return None;
        }
        ranges.push(ByteRange { start, end });
    }

    if ranges.is_empty() {
        return None;
    }

    Some(RangeHeader {
        unit: unit.to_string(),
        ranges,
    })
}

/// `Content-Range` value for a satisfied range
pub fn content_range(start: u64, end: u64, total: u64) -> String {
    format!("bytes {}-{}/{}", start, end, total)
}
