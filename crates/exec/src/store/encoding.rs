//! Row payload encoding for the persistent backend
//!
//! Keys are encoded HKeys (order-preserving, see `hkey`); payloads use the
//! compact tagged format here. The payload carries the owning table id and
//! the HKey segments so a row decodes without reversing the sortable key
//! encoding.

use crate::error::{Error, Result};
use crate::hkey::HKey;
use crate::types::{Row, Schema, TableId, Value};
use chrono::{DateTime, Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::io::{Cursor, Read};

/// Serialize a base row: table id, HKey segments, then column values
pub fn encode_row(table: TableId, hkey: &HKey, values: &[Value]) -> Vec<u8> {
    let mut out = Vec::new();
    encode_row_into(table, hkey, values, &mut out);
    out
}

/// `encode_row` into a caller-provided buffer; the write path feeds it
/// pooled scratch buffers
pub fn encode_row_into(table: TableId, hkey: &HKey, values: &[Value], out: &mut Vec<u8>) {
    out.extend_from_slice(&table.0.to_be_bytes());
    out.extend_from_slice(&(hkey.segments().len() as u16).to_be_bytes());
    for seg in hkey.segments() {
        out.extend_from_slice(&seg.ordinal.to_be_bytes());
        out.extend_from_slice(&(seg.values.len() as u16).to_be_bytes());
        for v in &seg.values {
            encode_value(v, out);
        }
    }
    out.extend_from_slice(&(values.len() as u16).to_be_bytes());
    for v in values {
        encode_value(v, out);
    }
}

/// Deserialize a row written by `encode_row`, resolving its RowType
/// through the schema snapshot
pub fn decode_row(schema: &Schema, bytes: &[u8]) -> Result<Row> {
    let mut r = Cursor::new(bytes);
    let table = TableId(read_u32(&mut r)?);
    let nsegs = read_u16(&mut r)? as usize;
    let mut hkey: Option<HKey> = None;
    for _ in 0..nsegs {
        let ordinal = read_u32(&mut r)?;
        let nvals = read_u16(&mut r)? as usize;
        let mut vals = Vec::with_capacity(nvals);
        for _ in 0..nvals {
            vals.push(decode_value(&mut r)?);
        }
        hkey = Some(match hkey {
            None => HKey::root(ordinal, vals),
            Some(k) => k.child(ordinal, vals),
        });
    }
    let hkey = hkey.ok_or_else(|| Error::Corrupted("row payload without HKey".into()))?;
    let nvals = read_u16(&mut r)? as usize;
    let mut values = Vec::with_capacity(nvals);
    for _ in 0..nvals {
        values.push(decode_value(&mut r)?);
    }
    let row_type = schema.row_type(table)?;
    if row_type.arity() != values.len() {
        return Err(Error::Corrupted(format!(
            "row for {} has {} values, type has {}",
            row_type,
            values.len(),
            row_type.arity()
        )));
    }
    Ok(Row::base(row_type, values, hkey))
}

fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(0x00),
        Value::Bool(b) => {
            out.push(0x01);
            out.push(u8::from(*b));
        }
        Value::I32(i) => {
            out.push(0x04);
            out.extend_from_slice(&i.to_be_bytes());
        }
        Value::I64(i) => {
            out.push(0x05);
            out.extend_from_slice(&i.to_be_bytes());
        }
        Value::F64(f) => {
            out.push(0x0D);
            out.extend_from_slice(&f.to_bits().to_be_bytes());
        }
        Value::Decimal(d) => {
            out.push(0x0E);
            out.extend_from_slice(&d.mantissa().to_be_bytes());
            out.extend_from_slice(&d.scale().to_be_bytes());
        }
        Value::Str(s) => {
            out.push(0x10);
            out.extend_from_slice(&(s.len() as u32).to_be_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        Value::Date(d) => {
            out.push(0x11);
            out.extend_from_slice(&d.num_days_from_ce().to_be_bytes());
        }
        Value::Timestamp(t) => {
            out.push(0x12);
            out.extend_from_slice(&t.and_utc().timestamp_micros().to_be_bytes());
        }
        Value::Uuid(u) => {
            out.push(0x13);
            out.extend_from_slice(u.as_bytes());
        }
        Value::Bytea(b) => {
            out.push(0x14);
            out.extend_from_slice(&(b.len() as u32).to_be_bytes());
            out.extend_from_slice(b);
        }
    }
}

fn decode_value(r: &mut Cursor<&[u8]>) -> Result<Value> {
    let tag = read_u8(r)?;
    match tag {
        0x00 => Ok(Value::Null),
        0x01 => Ok(Value::Bool(read_u8(r)? != 0)),
        0x04 => {
            let mut buf = [0u8; 4];
            read_exact(r, &mut buf)?;
            Ok(Value::I32(i32::from_be_bytes(buf)))
        }
        0x05 => {
            let mut buf = [0u8; 8];
            read_exact(r, &mut buf)?;
            Ok(Value::I64(i64::from_be_bytes(buf)))
        }
        0x0D => {
            let mut buf = [0u8; 8];
            read_exact(r, &mut buf)?;
            Ok(Value::F64(f64::from_bits(u64::from_be_bytes(buf))))
        }
        0x0E => {
            let mut mantissa = [0u8; 16];
            read_exact(r, &mut mantissa)?;
            let mut scale = [0u8; 4];
            read_exact(r, &mut scale)?;
            Ok(Value::Decimal(Decimal::from_i128_with_scale(
                i128::from_be_bytes(mantissa),
                u32::from_be_bytes(scale),
            )))
        }
        0x10 => {
            let len = read_u32(r)? as usize;
            let mut buf = vec![0u8; len];
            read_exact(r, &mut buf)?;
            String::from_utf8(buf)
                .map(Value::Str)
                .map_err(|e| Error::Corrupted(e.to_string()))
        }
        0x11 => {
            let mut buf = [0u8; 4];
            read_exact(r, &mut buf)?;
            NaiveDate::from_num_days_from_ce_opt(i32::from_be_bytes(buf))
                .map(Value::Date)
                .ok_or_else(|| Error::Corrupted("date out of range".into()))
        }
        0x12 => {
            let mut buf = [0u8; 8];
            read_exact(r, &mut buf)?;
            DateTime::from_timestamp_micros(i64::from_be_bytes(buf))
                .map(|t| Value::Timestamp(t.naive_utc()))
                .ok_or_else(|| Error::Corrupted("timestamp out of range".into()))
        }
        0x13 => {
            let mut buf = [0u8; 16];
            read_exact(r, &mut buf)?;
            Ok(Value::Uuid(uuid::Uuid::from_bytes(buf)))
        }
        0x14 => {
            let len = read_u32(r)? as usize;
            let mut buf = vec![0u8; len];
            read_exact(r, &mut buf)?;
            Ok(Value::Bytea(buf))
        }
        other => Err(Error::Corrupted(format!("unknown value tag {:#04x}", other))),
    }
}

fn read_exact(r: &mut Cursor<&[u8]>, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf)
        .map_err(|_| Error::Corrupted("truncated row payload".into()))
}

fn read_u8(r: &mut Cursor<&[u8]>) -> Result<u8> {
    let mut buf = [0u8; 1];
    read_exact(r, &mut buf)?;
    Ok(buf[0])
}

fn read_u16(r: &mut Cursor<&[u8]>) -> Result<u16> {
    let mut buf = [0u8; 2];
    read_exact(r, &mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

fn read_u32(r: &mut Cursor<&[u8]>) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact(r, &mut buf)?;
    Ok(u32::from_be_bytes(buf))
}
