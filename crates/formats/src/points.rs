use foundation::GeoPoint;

/// Why a single point record was rejected. The record is dropped; the rest of
/// the stream continues.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    FieldCount { found: usize },
    InvalidNumber { field: usize, value: String },
    OutOfRange { latitude: f64, longitude: f64 },
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::FieldCount { found } => {
                write!(f, "expected 3 fields (lat,lng,weight), found {found}")
            }
            RecordError::InvalidNumber { field, value } => {
                write!(f, "field {field} is not a number: {value:?}")
            }
            RecordError::OutOfRange {
                latitude,
                longitude,
            } => write!(f, "location out of range: lat={latitude} lng={longitude}"),
        }
    }
}

impl std::error::Error for RecordError {}

/// Parse one `(lat, lng, weight)` record.
///
/// Exactly three fields are required. Negative weights normalize to `0`.
pub fn parse_record<'a>(
    fields: impl IntoIterator<Item = &'a str>,
) -> Result<GeoPoint, RecordError> {
    let mut values = [0.0f64; 3];
    let mut found = 0usize;
    for raw in fields {
        if found < 3 {
            let trimmed = raw.trim();
            let v = trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| RecordError::InvalidNumber {
                    field: found,
                    value: trimmed.to_string(),
                })?;
            values[found] = v;
        }
        found += 1;
    }
    if found != 3 {
        return Err(RecordError::FieldCount { found });
    }

    let [latitude, longitude, weight] = values;
    let point = GeoPoint::new(latitude, longitude, weight.max(0.0));
    if !point.has_valid_location() {
        return Err(RecordError::OutOfRange {
            latitude,
            longitude,
        });
    }
    Ok(point)
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DecodeStats {
    pub bytes: usize,
    pub records: usize,
    pub malformed: usize,
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Incremental decoder for line-delimited point data.
///
/// Bytes go through a `csv_core` reader, so records may be split across
/// chunks anywhere, fields may be quoted, and a leading UTF-8 BOM is
/// skipped. `finish` flushes a final record without a terminator.
pub struct PointDecoder {
    reader: csv_core::Reader,
    head: Vec<u8>,
    started: bool,
    record: Vec<u8>,
    ends: Vec<usize>,
    record_len: usize,
    ends_len: usize,
    points: Vec<GeoPoint>,
    stats: DecodeStats,
}

impl Default for PointDecoder {
    fn default() -> Self {
        Self {
            reader: csv_core::Reader::new(),
            head: Vec::new(),
            started: false,
            record: vec![0; 128],
            ends: vec![0; 4],
            record_len: 0,
            ends_len: 0,
            points: Vec::new(),
            stats: DecodeStats::default(),
        }
    }
}

impl std::fmt::Debug for PointDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointDecoder")
            .field("points", &self.points.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPoints {
    pub points: Vec<GeoPoint>,
    pub stats: DecodeStats,
}

impl PointDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Feed a chunk; returns how many points it completed.
    pub fn push(&mut self, chunk: &[u8]) -> usize {
        self.stats.bytes += chunk.len();
        let before = self.points.len();

        if self.started {
            self.feed(chunk, false);
        } else {
            self.head.extend_from_slice(chunk);
            if self.head.len() >= UTF8_BOM.len() {
                self.start();
            }
        }

        self.points.len() - before
    }

    pub fn finish(mut self) -> DecodedPoints {
        if !self.started {
            self.start();
        }
        self.feed(&[], true);
        DecodedPoints {
            points: self.points,
            stats: self.stats,
        }
    }

    fn start(&mut self) {
        self.started = true;
        let head = std::mem::take(&mut self.head);
        self.feed(head.strip_prefix(UTF8_BOM).unwrap_or(&head), false);
    }

    /// Empty input is end-of-stream to `csv_core`, so it is only passed
    /// through when `eof` is set.
    fn feed(&mut self, mut input: &[u8], eof: bool) {
        use csv_core::ReadRecordResult;

        loop {
            if input.is_empty() && !eof {
                return;
            }
            let (result, read, written, ended) = self.reader.read_record(
                input,
                &mut self.record[self.record_len..],
                &mut self.ends[self.ends_len..],
            );
            input = &input[read..];
            self.record_len += written;
            self.ends_len += ended;
            match result {
                ReadRecordResult::InputEmpty => {}
                ReadRecordResult::OutputFull => {
                    let len = self.record.len() * 2;
                    self.record.resize(len, 0);
                }
                ReadRecordResult::OutputEndsFull => {
                    let len = self.ends.len() * 2;
                    self.ends.resize(len, 0);
                }
                ReadRecordResult::Record => {
                    self.accept_record();
                    self.record_len = 0;
                    self.ends_len = 0;
                }
                ReadRecordResult::End => return,
            }
        }
    }

    fn accept_record(&mut self) {
        let mut fields = Vec::with_capacity(self.ends_len);
        let mut start = 0;
        for &end in &self.ends[..self.ends_len] {
            match std::str::from_utf8(&self.record[start..end]) {
                Ok(field) => fields.push(field),
                Err(_) => {
                    self.stats.malformed += 1;
                    return;
                }
            }
            start = end;
        }
        // A line holding only whitespace is blank, not a one-field record.
        if let [only] = fields.as_slice() {
            if only.trim().is_empty() {
                return;
            }
        }
        match parse_record(fields) {
            Ok(point) => {
                self.stats.records += 1;
                self.points.push(point);
            }
            Err(_) => self.stats.malformed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DecodedPoints, PointDecoder, RecordError, parse_record};
    use foundation::GeoPoint;

    #[test]
    fn parses_three_numeric_fields() {
        let p = parse_record(["1.0", " 2.0", "3 "]).unwrap();
        assert_eq!(p, GeoPoint::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn rejects_wrong_field_counts() {
        assert_eq!(
            parse_record(["1.0", "2.0"]),
            Err(RecordError::FieldCount { found: 2 })
        );
        assert_eq!(
            parse_record(["1", "2", "3", "4"]),
            Err(RecordError::FieldCount { found: 4 })
        );
    }

    #[test]
    fn rejects_non_numbers_and_bad_locations() {
        assert!(matches!(
            parse_record(["lat", "lng", "weight"]),
            Err(RecordError::InvalidNumber { field: 0, .. })
        ));
        assert!(matches!(
            parse_record(["1", "NaN", "2"]),
            Err(RecordError::InvalidNumber { field: 1, .. })
        ));
        assert!(matches!(
            parse_record(["95", "0", "2"]),
            Err(RecordError::OutOfRange { .. })
        ));
    }

    #[test]
    fn negative_weight_normalizes_to_zero() {
        assert_eq!(parse_record(["0", "0", "-2"]).unwrap().intensity, 0.0);
    }

    fn decode(chunks: &[&[u8]]) -> DecodedPoints {
        let mut dec = PointDecoder::new();
        for chunk in chunks {
            dec.push(chunk);
        }
        dec.finish()
    }

    #[test]
    fn blank_and_crlf_lines() {
        let out = decode(&[b"   \r\n1,2,3\r\n\r\n"]);
        assert_eq!(out.points, vec![GeoPoint::new(1.0, 2.0, 3.0)]);
        assert_eq!(out.stats.malformed, 0);
    }

    #[test]
    fn decoder_accepts_quoted_fields_and_leading_bom() {
        let out = decode(&[b"\xEF\xBB", b"\xBF1.0,2.0,3\n\"1.1\",\"2.1\",\"4\"\n1.2,2.2,5\n"]);
        assert_eq!(
            out.points,
            vec![
                GeoPoint::new(1.0, 2.0, 3.0),
                GeoPoint::new(1.1, 2.1, 4.0),
                GeoPoint::new(1.2, 2.2, 5.0),
            ]
        );
        assert_eq!(out.stats.malformed, 0);
    }

    #[test]
    fn decoder_flushes_unterminated_last_record() {
        let out = decode(&[b"1,1,1\n2,", b"2,2"]);
        assert_eq!(out.points.len(), 2);
        assert_eq!(out.points[1], GeoPoint::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn decoder_joins_records_split_across_chunks() {
        let mut dec = PointDecoder::new();
        assert_eq!(dec.push(b"1.0,2.0,3\n1.1,2"), 1);
        assert_eq!(dec.push(b".1,0\n"), 1);
        let out = dec.finish();
        assert_eq!(
            out.points,
            vec![GeoPoint::new(1.0, 2.0, 3.0), GeoPoint::new(1.1, 2.1, 0.0)]
        );
        assert_eq!(out.stats.records, 2);
        assert_eq!(out.stats.malformed, 0);
    }

    #[test]
    fn decoder_drops_malformed_lines_and_keeps_going() {
        let mut dec = PointDecoder::new();
        dec.push(b"lat,lng,weight\n1,2,3\n\n1,2\n4,5,1");
        let out = dec.finish();
        assert_eq!(out.points.len(), 2);
        assert_eq!(out.stats.malformed, 2);
        assert_eq!(out.points[1], GeoPoint::new(4.0, 5.0, 1.0));
    }

    #[test]
    fn decoder_counts_invalid_utf8_as_malformed() {
        let mut dec = PointDecoder::new();
        dec.push(&[0xff, 0xfe, b'\n']);
        dec.push(b"1,1,1\n");
        let out = dec.finish();
        assert_eq!(out.stats.malformed, 1);
        assert_eq!(out.points.len(), 1);
    }
}
