use std::num::IntErrorKind;

use crate::buffer::WriteBuffer;
use crate::error::Error;
use crate::host::{HostValue, Tensor};
use crate::schema::{Descriptor, Flags, I64Mode};
use crate::types::TType;
use crate::Result;

// i64 bounds in the f64 domain. 2^63 itself is exactly representable as a
// double but not as an i64, so the upper comparison is strict.
const I64_MIN_F: f64 = -9_223_372_036_854_775_808.0;
const I64_MAX_F: f64 = 9_223_372_036_854_775_808.0;

/// Walks `(descriptor, host value)` and appends Binary Protocol bytes.
pub(crate) fn write_value<V: HostValue>(
    desc: &Descriptor,
    value: &V,
    out: &mut WriteBuffer,
    flags: Flags,
    depth: usize,
) -> Result<()> {
    if depth == 0 {
        return Err(Error::Schema("value nesting exceeds depth bound".into()));
    }
    match desc.ttype() {
        TType::Bool => {
            out.put_u8(value.as_bool()? as u8);
            Ok(())
        }
        TType::Byte => {
            let d = value.as_f64()?;
            let b = d as u8;
            if b as f64 != d {
                return Err(Error::Range { what: "byte" });
            }
            out.put_u8(b);
            Ok(())
        }
        TType::Double => {
            out.put_f64(value.as_f64()?);
            Ok(())
        }
        TType::I16 => {
            let d = value.as_f64()?;
            let v = d as i16;
            if v as f64 != d {
                return Err(Error::Range { what: "i16" });
            }
            out.put_i16(v);
            Ok(())
        }
        TType::I32 | TType::Enum => {
            let d = value.as_f64()?;
            let v = d as i32;
            if v as f64 != d {
                return Err(Error::Range { what: "i32" });
            }
            out.put_i32(v);
            Ok(())
        }
        TType::I64 => {
            out.put_i64(i64_from_host(value, flags)?);
            Ok(())
        }
        TType::String => {
            let bytes = value.as_bytes()?;
            if bytes.len() > i32::MAX as usize {
                return Err(Error::Range { what: "string length" });
            }
            out.put_i32(bytes.len() as i32);
            out.append(bytes);
            Ok(())
        }
        TType::Struct => write_struct(desc, value, out, flags, depth),
        TType::Map => write_map(desc, value, out, flags, depth),
        TType::Set | TType::List => write_sequence(desc, value, out, flags, depth),
        TType::Stop | TType::Void => {
            Err(Error::Schema(format!("{} is not encodable", desc.ttype())))
        }
    }
}

fn i64_from_host<V: HostValue>(value: &V, flags: Flags) -> Result<i64> {
    match flags.i64_mode {
        I64Mode::Number => {
            let d = value.as_f64()?;
            // NaN fails both comparisons
            if !(d >= I64_MIN_F && d < I64_MAX_F) {
                return Err(Error::Range { what: "i64" });
            }
            let v = d as i64;
            if v as f64 != d {
                return Err(Error::Range { what: "i64" });
            }
            Ok(v)
        }
        I64Mode::String => parse_i64_decimal(value.as_bytes()?),
        I64Mode::Tensor => match value.as_tensor()? {
            Tensor::Long(v) if !v.is_empty() => Ok(v[0]),
            t => Err(Error::TypeMismatch {
                expected: "non-empty i64 tensor",
                found: t.kind().to_string(),
            }),
        },
    }
}

fn parse_i64_decimal(bytes: &[u8]) -> Result<i64> {
    if bytes.is_empty() {
        return Err(Error::Parse("i64 can not convert from empty string".into()));
    }
    let s = std::str::from_utf8(bytes)
        .map_err(|_| Error::Parse("i64 string is not valid utf-8".into()))?;
    match s.parse::<i64>() {
        Ok(v) => Ok(v),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                Err(Error::Range { what: "i64" })
            }
            _ => Err(Error::Parse("i64 did not consume the entire string".into())),
        },
    }
}

// Fields are emitted in ascending field id order; absent and nil entries
// are skipped entirely.
fn write_struct<V: HostValue>(
    desc: &Descriptor,
    value: &V,
    out: &mut WriteBuffer,
    flags: Flags,
    depth: usize,
) -> Result<()> {
    for field in desc.fields() {
        match value.record_get(field.record_key())? {
            Some(v) if !v.is_nil() => {
                out.put_u8(field.ttype().wire_tag());
                out.put_u16(field.field_id());
                write_value(field, v, out, flags, depth - 1)?;
            }
            _ => {}
        }
    }
    out.put_u8(TType::Stop as u8);
    Ok(())
}

fn write_map<V: HostValue>(
    desc: &Descriptor,
    value: &V,
    out: &mut WriteBuffer,
    flags: Flags,
    depth: usize,
) -> Result<()> {
    let (Some(key_desc), Some(value_desc)) = (desc.key_desc(), desc.value_desc()) else {
        return Err(Error::Schema("map descriptor missing key/value".into()));
    };
    out.put_u8(key_desc.ttype().wire_tag());
    out.put_u8(value_desc.ttype().wire_tag());
    let count = value.map_len()?;
    if count > i32::MAX as usize {
        return Err(Error::Range { what: "map count" });
    }
    out.put_i32(count as i32);
    value.map_visit(&mut |k, v| {
        write_value(key_desc, k, out, flags, depth - 1)?;
        write_value(value_desc, v, out, flags, depth - 1)
    })
}

fn write_sequence<V: HostValue>(
    desc: &Descriptor,
    value: &V,
    out: &mut WriteBuffer,
    flags: Flags,
    depth: usize,
) -> Result<()> {
    let Some(elem_desc) = desc.value_desc() else {
        return Err(Error::Schema("sequence descriptor missing value".into()));
    };
    out.put_u8(elem_desc.ttype().wire_tag());
    if flags.seq_as_tensor && elem_desc.ttype().is_tensor_element() {
        return write_tensor(elem_desc.ttype(), value.as_tensor()?, out);
    }
    let len = value.seq_len()?;
    if len > i32::MAX as usize {
        return Err(Error::Range { what: "list count" });
    }
    out.put_i32(len as i32);
    for i in 1..=len {
        write_value(elem_desc, value.seq_get(i)?, out, flags, depth - 1)?;
    }
    Ok(())
}

// The tensor kind must match the declared element type; elements go out
// straight from the typed storage.
fn write_tensor(elem: TType, tensor: &Tensor, out: &mut WriteBuffer) -> Result<()> {
    let mismatch = |found: &Tensor| Error::TypeMismatch {
        expected: elem.name(),
        found: found.kind().to_string(),
    };
    if tensor.len() > i32::MAX as usize {
        return Err(Error::Range { what: "list count" });
    }
    out.put_i32(tensor.len() as i32);
    match (elem, tensor) {
        (TType::Byte, Tensor::Byte(v)) => out.append(v),
        (TType::I16, Tensor::Short(v)) => {
            for x in v {
                out.put_i16(*x);
            }
        }
        (TType::I32, Tensor::Int(v)) => {
            for x in v {
                out.put_i32(*x);
            }
        }
        (TType::I64, Tensor::Long(v)) => {
            for x in v {
                out.put_i64(*x);
            }
        }
        (TType::Double, Tensor::Double(v)) => {
            for x in v {
                out.put_f64(*x);
            }
        }
        (_, t) => return Err(mismatch(t)),
    }
    Ok(())
}
