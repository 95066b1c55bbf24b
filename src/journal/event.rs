//! Event definitions and record codec
//!
//! An [`Event`] is the unit of durability: one logged mutation with its
//! commit-order sequence number. This module also owns the tab-delimited
//! record codec and the percent-escaping that keeps control characters
//! (including the delimiter itself) out of the framing.

use crate::error::{KvError, Result};

/// Field delimiter in the on-disk record format
const FIELD_SEPARATOR: char = '\t';

/// Mutation kinds, with their on-disk/on-table numeric codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventKind {
    /// Remove a key
    Delete = 1,

    /// Insert or overwrite a key
    Put = 2,
}

impl EventKind {
    /// Numeric code used in records and table rows
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse a numeric kind code
    pub fn from_code(code: u64) -> Result<Self> {
        match code {
            1 => Ok(EventKind::Delete),
            2 => Ok(EventKind::Put),
            other => Err(KvError::MalformedRecord(format!(
                "unknown event kind {}",
                other
            ))),
        }
    }
}

/// One logged mutation
///
/// `sequence` is 0 while the event sits in the commit queue; the commit
/// worker assigns the real number at commit time (file backend) or the
/// database assigns it on insert (sqlite backend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Strictly increasing commit-order number within one log
    pub sequence: u64,

    /// The mutation kind
    pub kind: EventKind,

    /// The affected key
    pub key: String,

    /// The value for Put; empty and unused for Delete
    pub value: String,
}

impl Event {
    /// An unsequenced Put event
    pub fn put(key: &str, value: &str) -> Self {
        Self {
            sequence: 0,
            kind: EventKind::Put,
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    /// An unsequenced Delete event
    pub fn delete(key: &str) -> Self {
        Self {
            sequence: 0,
            kind: EventKind::Delete,
            key: key.to_string(),
            value: String::new(),
        }
    }

    /// Serialize to one on-disk record line.
    ///
    /// Format: `sequence\tkind\tkey\tvalue\n` with key and value escaped so
    /// the record stays parseable by the same split logic used for reading.
    pub fn encode_record(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{sep}{}\n",
            self.sequence,
            self.kind.code(),
            escape_field(&self.key),
            escape_field(&self.value),
            sep = FIELD_SEPARATOR,
        )
    }

    /// Parse one record line (no trailing newline).
    pub fn decode_record(line: &str) -> Result<Self> {
        let mut fields = line.splitn(4, FIELD_SEPARATOR);
        let (sequence, kind, key, value) = match (
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
        ) {
            (Some(s), Some(k), Some(key), Some(value)) => (s, k, key, value),
            _ => {
                return Err(KvError::MalformedRecord(format!(
                    "expected 4 tab-delimited fields: {:?}",
                    line
                )))
            }
        };

        let sequence: u64 = sequence.parse().map_err(|_| {
            KvError::MalformedRecord(format!("invalid sequence number {:?}", sequence))
        })?;
        let kind_code: u64 = kind
            .parse()
            .map_err(|_| KvError::MalformedRecord(format!("invalid event kind {:?}", kind)))?;

        Ok(Self {
            sequence,
            kind: EventKind::from_code(kind_code)?,
            key: unescape_field(key)?,
            value: unescape_field(value)?,
        })
    }
}

/// Percent-escape a field so it cannot contain the delimiter, newlines,
/// or other control characters.
pub fn escape_field(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

/// Reverse [`escape_field`].
pub fn unescape_field(escaped: &str) -> Result<String> {
    urlencoding::decode(escaped)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| KvError::FieldDecode(e.to_string()))
}

/// Enforces strict sequence monotonicity over one replay stream.
///
/// A record whose sequence is less than or equal to the highest one already
/// seen marks the stream as corrupt; replay must stop at that point.
#[derive(Debug, Default)]
pub struct SequenceValidator {
    last: u64,
}

impl SequenceValidator {
    /// Validate the next sequence number in commit order.
    pub fn check(&mut self, sequence: u64) -> Result<()> {
        if sequence <= self.last {
            return Err(KvError::OutOfSequence {
                last: self.last,
                found: sequence,
            });
        }
        self.last = sequence;
        Ok(())
    }

    /// Highest sequence accepted so far (0 before any record)
    pub fn last(&self) -> u64 {
        self.last
    }
}
