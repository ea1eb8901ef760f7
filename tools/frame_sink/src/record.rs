use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const RESULT_DELIMITER: &str = ";result=";
/// Large enough for a hex encoded VGA JPEG plus its result array.
pub const DEFAULT_MAX_LINE: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub payload: Vec<u8>,
    pub detections: Vec<Detection>,
}

impl Record {
    pub fn top_label(&self) -> Option<&str> {
        self.detections
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .map(|detection| detection.label.as_str())
    }

    pub fn is_jpeg(&self) -> bool {
        self.payload.starts_with(&[0xFF, 0xD8])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// A line grew past the limit; bytes up to the next newline are dropped.
    Overlong { len: usize },
}

/// Splits a byte stream into newline terminated records.
pub struct RecordReader {
    pending: Vec<u8>,
    max_line: usize,
    discarding: bool,
}

impl RecordReader {
    pub fn new(max_line: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line,
            discarding: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    pub fn next_line(&mut self) -> Option<Result<Vec<u8>, ReadError>> {
        loop {
            let Some(pos) = self.pending.iter().position(|b| *b == b'\n') else {
                if self.pending.len() <= self.max_line {
                    return None;
                }
                let len = self.pending.len();
                self.pending.clear();
                if self.discarding {
                    return None;
                }
                self.discarding = true;
                return Some(Err(ReadError::Overlong { len }));
            };

            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if self.discarding {
                self.discarding = false;
                continue;
            }
            if line.len() > self.max_line {
                return Some(Err(ReadError::Overlong { len: line.len() }));
            }
            return Some(Ok(line));
        }
    }

    /// Bytes left without a terminator, e.g. after the peer hung up mid record.
    pub fn pending_len(&self) -> usize {
        if self.discarding {
            0
        } else {
            self.pending.len()
        }
    }
}

pub fn parse_record(line: &[u8]) -> Result<Record> {
    let line = std::str::from_utf8(line).context("record is not utf-8")?;
    let mut parts = line.split(RESULT_DELIMITER);
    let (Some(hex), Some(json), None) = (parts.next(), parts.next(), parts.next()) else {
        bail!("expected exactly one `{RESULT_DELIMITER}` delimiter");
    };

    let payload = decode_hex(hex)?;
    if payload.is_empty() {
        bail!("empty payload");
    }
    let detections: Vec<Detection> =
        serde_json::from_str(json).context("result is not a detection array")?;
    for detection in &detections {
        if !(0.0..=1.0).contains(&detection.confidence) {
            bail!(
                "confidence {} for `{}` is outside [0, 1]",
                detection.confidence,
                detection.label
            );
        }
    }

    Ok(Record {
        payload,
        detections,
    })
}

fn decode_hex(hex: &str) -> Result<Vec<u8>> {
    let digits = hex.as_bytes();
    if digits.len() % 2 != 0 {
        bail!("hex payload has odd length {}", digits.len());
    }
    digits
        .chunks_exact(2)
        .enumerate()
        .map(|(index, pair)| match (nibble(pair[0]), nibble(pair[1])) {
            (Some(high), Some(low)) => Ok(high << 4 | low),
            _ => bail!("invalid hex digit near offset {}", index * 2),
        })
        .collect()
}

fn nibble(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}
