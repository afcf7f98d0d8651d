//! Hierarchical keys
//!
//! An HKey is an ordered sequence of (table ordinal, key values) segments
//! encoding a row's position within its group. The byte encoding is the
//! group's traversal order: a parent's encoded key is a strict prefix of
//! every descendant's key, and siblings order by their own key columns.
//! HKeys compare by encoding alone, never by table identity, so an orphan
//! row (parent key absent from storage) is still a well-formed key.

use crate::types::Value;
use chrono::Datelike;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;

/// One (ordinal, key values) step of an HKey
#[derive(Debug, Clone, PartialEq)]
pub struct HKeySegment {
    pub ordinal: u32,
    pub values: Vec<Value>,
}

/// A row's position within its group
#[derive(Clone)]
pub struct HKey {
    segments: Vec<HKeySegment>,
    encoded: Vec<u8>,
}

impl HKey {
    /// A root-segment key
    pub fn root(ordinal: u32, values: Vec<Value>) -> Self {
        HKey {
            segments: Vec::new(),
            encoded: Vec::new(),
        }
        .child(ordinal, values)
    }

    /// Extend this key with a child table's segment
    pub fn child(&self, ordinal: u32, values: Vec<Value>) -> Self {
        let mut segments = self.segments.clone();
        let mut encoded = self.encoded.clone();
        encode_segment(ordinal, &values, &mut encoded);
        segments.push(HKeySegment { ordinal, values });
        HKey { segments, encoded }
    }

    pub fn segments(&self) -> &[HKeySegment] {
        &self.segments
    }

    /// The ordinal of the table this key addresses (last segment)
    pub fn ordinal(&self) -> u32 {
        self.segments.last().map(|s| s.ordinal).unwrap_or(0)
    }

    /// The order-preserving byte encoding; storage iterates in this order
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// The ancestor key made of the first `n` segments
    pub fn prefix(&self, n: usize) -> Self {
        let mut key = HKey {
            segments: Vec::new(),
            encoded: Vec::new(),
        };
        for seg in self.segments.iter().take(n) {
            key = key.child(seg.ordinal, seg.values.clone());
        }
        key
    }

    /// True if `other` addresses a row in this key's subtree (or the same
    /// row). A key is a prefix of itself.
    pub fn is_prefix_of(&self, other: &HKey) -> bool {
        self.segments.len() <= other.segments.len()
            && other.encoded.starts_with(&self.encoded)
    }
}

impl PartialEq for HKey {
    fn eq(&self, other: &Self) -> bool {
        self.encoded == other.encoded
    }
}

impl Eq for HKey {}

impl PartialOrd for HKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.encoded.cmp(&other.encoded)
    }
}

impl fmt::Debug for HKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hkey[")?;
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "({}", seg.ordinal)?;
            for v in &seg.values {
                write!(f, ",{}", v)?;
            }
            write!(f, ")")?;
        }
        write!(f, "]")
    }
}

fn encode_segment(ordinal: u32, values: &[Value], out: &mut Vec<u8>) {
    out.extend_from_slice(&ordinal.to_be_bytes());
    for v in values {
        encode_value_sortable(v, out);
    }
}

/// Encode a value so that byte order matches value order. Integers are
/// sign-flipped big-endian, floats use the IEEE 754 total-order trick,
/// decimals encode as sign class + adjusted exponent + significant
/// digits, byte strings are NUL-escaped and NUL-terminated.
pub fn encode_value_sortable(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => {
            out.push(0x00); // NULL sorts first
        }
        Value::Bool(b) => {
            out.push(0x01);
            out.push(u8::from(*b));
        }
        Value::I32(i) => {
            out.push(0x04);
            let u = (*i as u32) ^ (1u32 << 31);
            out.extend_from_slice(&u.to_be_bytes());
        }
        Value::I64(i) => {
            out.push(0x05);
            let u = (*i as u64) ^ (1u64 << 63);
            out.extend_from_slice(&u.to_be_bytes());
        }
        Value::F64(f) => {
            out.push(0x0D);
            let bits = f.to_bits();
            let sortable = if f.is_sign_negative() {
                !bits
            } else {
                bits ^ (1u64 << 63)
            };
            out.extend_from_slice(&sortable.to_be_bytes());
        }
        Value::Decimal(d) => {
            out.push(0x0E);
            encode_decimal_sortable(d, out);
        }
        Value::Str(s) => {
            out.push(0x10);
            encode_bytes_escaped(s.as_bytes(), out);
        }
        Value::Date(d) => {
            out.push(0x11);
            let u = (d.num_days_from_ce() as u32) ^ (1u32 << 31);
            out.extend_from_slice(&u.to_be_bytes());
        }
        Value::Timestamp(t) => {
            out.push(0x12);
            let micros = t.and_utc().timestamp_micros();
            let u = (micros as u64) ^ (1u64 << 63);
            out.extend_from_slice(&u.to_be_bytes());
        }
        Value::Uuid(u) => {
            out.push(0x13);
            out.extend_from_slice(u.as_bytes());
        }
        Value::Bytea(b) => {
            out.push(0x14);
            encode_bytes_escaped(b, out);
        }
    }
}

// Decimals cannot compare mantissa bytes directly: the mantissa/scale pair
// is a floating representation, so 1.5 (15, 1) has a larger mantissa than
// 2 (2, 0). Encode the normalized scientific form instead: a sign class
// byte, the sign-flipped adjusted exponent (position of the leading
// digit), then the significant digits with a terminator so a digit string
// sorts before its extensions. Negative values complement the exponent and
// digit bytes, reversing magnitude order.
fn encode_decimal_sortable(d: &Decimal, out: &mut Vec<u8>) {
    // Normalize so equal values with different scales encode alike
    let d = d.normalize();
    if d.is_zero() {
        out.push(0x01);
        return;
    }
    let digits = d.mantissa().unsigned_abs().to_string();
    let exponent = digits.len() as i32 - d.scale() as i32;
    let mut body = Vec::with_capacity(5 + digits.len());
    body.extend_from_slice(&((exponent as u32) ^ (1u32 << 31)).to_be_bytes());
    body.extend_from_slice(digits.as_bytes());
    body.push(0x00);
    if d.is_sign_positive() {
        out.push(0x02);
        out.extend_from_slice(&body);
    } else {
        out.push(0x00);
        out.extend(body.iter().map(|b| !b));
    }
}

// 0x00 bytes are escaped as 0x00 0xFF, the terminator is a bare 0x00, so a
// string always sorts before any of its extensions.
fn encode_bytes_escaped(bytes: &[u8], out: &mut Vec<u8>) {
    for &b in bytes {
        out.push(b);
        if b == 0x00 {
            out.push(0xFF);
        }
    }
    out.push(0x00);
}
