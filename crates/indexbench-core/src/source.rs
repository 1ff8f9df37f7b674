//! Line-file corpus reader
//!
//! The corpus is a text file with one document per line. Each line holds
//! three tab-separated fields (title, date, body). An optional first line
//! starting with [`HEADER_INDICATOR`] names the fields and is skipped.
//!
//! ```text
//! FIELDS_HEADER_INDICATOR###\tdoctitle\tdocdate\tbody
//! Water\t01-JAN-2019 00:00:00.000\tWater is a transparent ...
//! ```

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

use crate::error::{BenchError, Result};

/// Prefix of the optional header line
pub const HEADER_INDICATOR: &str = "FIELDS_HEADER_INDICATOR###";

const FIELD_COUNT: usize = 3;

/// A single corpus document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    pub body: String,
}

impl Record {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Byte length of title plus body
    pub fn plain_text_len(&self) -> u64 {
        (self.title.len() + self.body.len()) as u64
    }
}

/// Lazy, finite, non-restartable sequence of [`Record`]s read from a line file
pub struct LineFileSource<R> {
    reader: Option<R>,
    pending: Option<String>,
    line: u64,
    max_text_size: Option<usize>,
    buf: String,
}

impl LineFileSource<BufReader<File>> {
    /// Open a line file.
    ///
    /// When `max_text_size` is set, record bodies longer than that many bytes
    /// are clipped (at a character boundary) before being returned.
    pub fn open<P: AsRef<Path>>(path: P, max_text_size: Option<usize>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening corpus {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), max_text_size)
    }
}

impl<R: BufRead> LineFileSource<R> {
    /// Wrap a buffered reader, consuming the header line if there is one
    pub fn from_reader(mut reader: R, max_text_size: Option<usize>) -> Result<Self> {
        let mut first = String::new();
        let read = reader.read_line(&mut first)?;

        let pending = if read == 0 || first.starts_with(HEADER_INDICATOR) {
            None
        } else {
            Some(first)
        };
        let line = if pending.is_some() { 0 } else { read.min(1) as u64 };

        Ok(Self {
            reader: Some(reader),
            pending,
            line,
            max_text_size: max_text_size.filter(|&max| max > 0),
            buf: String::new(),
        })
    }

    /// Read the next record, or `None` once the input is exhausted or closed
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let raw = match self.pending.take() {
            Some(line) => line,
            None => {
                let Some(reader) = self.reader.as_mut() else {
                    return Ok(None);
                };
                self.buf.clear();
                if reader.read_line(&mut self.buf)? == 0 {
                    self.close();
                    return Ok(None);
                }
                std::mem::take(&mut self.buf)
            }
        };
        self.line += 1;

        let mut record = parse_line(&raw, self.line)?;
        if let Some(max) = self.max_text_size {
            clip(&mut record.body, max);
        }
        Ok(Some(record))
    }

    /// Release the underlying reader; iteration ends permanently
    pub fn close(&mut self) {
        self.reader = None;
        self.pending = None;
    }
}

impl<R: BufRead> Iterator for LineFileSource<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.close();
                Some(Err(e))
            }
        }
    }
}

fn parse_line(raw: &str, line: u64) -> Result<Record> {
    let trimmed = raw.strip_suffix('\n').unwrap_or(raw);
    let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);

    let fields: Vec<&str> = trimmed.split('\t').collect();
    if fields.len() != FIELD_COUNT {
        return Err(BenchError::RecordParse {
            line,
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    }

    Ok(Record::new(fields[0], fields[2]))
}

/// Truncate to at most `max` bytes without splitting a character
fn clip(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn source(input: &str, max: Option<usize>) -> LineFileSource<Cursor<Vec<u8>>> {
        LineFileSource::from_reader(Cursor::new(input.as_bytes().to_vec()), max).unwrap()
    }

    #[test]
    fn test_skips_header_line() {
        let input = "FIELDS_HEADER_INDICATOR###\tdoctitle\tdocdate\tbody\n\
                     Water\t01-JAN-2019\tWater is wet\n\
                     Fire\t02-JAN-2019\tFire is hot\n";
        let records: Vec<Record> = source(input, None).map(|r| r.unwrap()).collect();

        assert_eq!(
            records,
            vec![
                Record::new("Water", "Water is wet"),
                Record::new("Fire", "Fire is hot"),
            ]
        );
    }

    #[test]
    fn test_without_header_or_trailing_newline() {
        let input = "Water\tdate\tWater is wet\nFire\tdate\tFire is hot";
        let records: Vec<Record> = source(input, None).map(|r| r.unwrap()).collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Water");
        assert_eq!(records[1].body, "Fire is hot");
    }

    #[test]
    fn test_crlf_is_stripped() {
        let mut src = source("A\tdate\tbody text\r\n", None);
        let record = src.next_record().unwrap().unwrap();
        assert_eq!(record.body, "body text");
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let input = "FIELDS_HEADER_INDICATOR###\tdoctitle\tdocdate\tbody\n\
                     Good\tdate\tbody\n\
                     only-one-field\n";
        let mut src = source(input, None);
        assert!(src.next_record().unwrap().is_some());

        match src.next_record() {
            Err(BenchError::RecordParse {
                line,
                expected,
                found,
            }) => {
                assert_eq!(line, 3);
                assert_eq!(expected, 3);
                assert_eq!(found, 1);
            }
            other => panic!("Expected RecordParse error, got {:?}", other),
        }
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let mut src = source("bad line\nA\tdate\tbody\n", None);
        assert!(matches!(src.next(), Some(Err(BenchError::RecordParse { .. }))));
        assert!(src.next().is_none());
    }

    #[test]
    fn test_body_truncation_leaves_title() {
        let mut src = source("A long title\tdate\t0123456789\n", Some(4));
        let record = src.next_record().unwrap().unwrap();
        assert_eq!(record.title, "A long title");
        assert_eq!(record.body, "0123");
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        // 'é' is two bytes; clipping at 2 would split it
        let mut src = source("t\td\taéb\n", Some(2));
        let record = src.next_record().unwrap().unwrap();
        assert_eq!(record.body, "a");
    }

    #[test]
    fn test_zero_max_disables_truncation() {
        let mut src = source("t\td\tbody\n", Some(0));
        assert_eq!(src.next_record().unwrap().unwrap().body, "body");
    }

    #[test]
    fn test_close_ends_iteration() {
        let mut src = source("A\td\tb\nB\td\tb\n", None);
        assert!(src.next_record().unwrap().is_some());
        src.close();
        assert!(src.next_record().unwrap().is_none());
        assert!(src.next().is_none());
    }

    #[test]
    fn test_empty_input() {
        let mut src = source("", None);
        assert!(src.next_record().unwrap().is_none());
    }

    #[test]
    fn test_plain_text_len() {
        assert_eq!(Record::new("abc", "de").plain_text_len(), 5);
    }
}
