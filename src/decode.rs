use crate::buffer::ReadCursor;
use crate::error::Error;
use crate::host::{HostValue, RecordKey, Tensor};
use crate::schema::{Descriptor, Flags, I64Mode};
use crate::types::TType;
use crate::Result;

const I64_MAX_F: f64 = 9_223_372_036_854_775_808.0;

/// Walks the cursor under `ttype` and materializes a host value.
///
/// `ttype` is the tag driving this node: the descriptor's declared type at
/// the root, the tag read off the wire inside containers. `desc` narrows
/// the walk when the schema has a node for this position; `None` decodes
/// permissively from the wire tags alone.
pub(crate) fn read_value<V: HostValue>(
    ttype: TType,
    cur: &mut ReadCursor<'_>,
    flags: Flags,
    desc: Option<&Descriptor>,
    depth: usize,
) -> Result<V> {
    if depth == 0 {
        return Err(Error::Schema("value nesting exceeds depth bound".into()));
    }
    match ttype {
        TType::Stop | TType::Void => Ok(V::nil()),
        TType::Bool => Ok(V::from_bool(cur.get_u8()? != 0)),
        TType::Byte => Ok(V::from_f64(cur.get_u8()? as f64)),
        TType::Double => Ok(V::from_f64(cur.get_f64()?)),
        TType::I16 => Ok(V::from_f64(cur.get_i16()? as f64)),
        TType::I32 | TType::Enum => Ok(V::from_f64(cur.get_i32()? as f64)),
        TType::I64 => read_i64(cur, flags),
        TType::String => {
            let len = cur.get_i32()?;
            // a negative length reads as an over-long one
            let bytes = cur.take_exact(len as u32 as usize)?;
            Ok(V::from_text(bytes.to_vec()))
        }
        TType::Struct => read_struct(cur, flags, desc, depth),
        TType::Map => read_map(cur, flags, desc, depth),
        TType::Set | TType::List => read_sequence(cur, flags, desc, depth),
    }
}

fn read_i64<V: HostValue>(cur: &mut ReadCursor<'_>, flags: Flags) -> Result<V> {
    let v = cur.get_i64()?;
    match flags.i64_mode {
        I64Mode::Number => {
            let d = v as f64;
            if d >= I64_MAX_F || d as i64 != v {
                return Err(Error::Range { what: "i64" });
            }
            Ok(V::from_f64(d))
        }
        I64Mode::String => Ok(V::from_string(v.to_string())),
        I64Mode::Tensor => Ok(V::from_tensor(Tensor::Long(vec![v]))),
    }
}

fn read_struct<V: HostValue>(
    cur: &mut ReadCursor<'_>,
    flags: Flags,
    desc: Option<&Descriptor>,
    depth: usize,
) -> Result<V> {
    let mut record = V::new_record();
    let mut vt = cur.get_u8()?;
    while vt != TType::Stop as u8 {
        let fid = cur.get_u16()?;
        let field_desc = match desc {
            Some(d) => {
                let field = d.field_by_id(fid);
                if field.is_none() && !d.fields().is_empty() {
                    return Err(Error::UnknownField {
                        field_id: fid,
                        offset: cur.position(),
                    });
                }
                field
            }
            None => None,
        };
        let key = match field_desc {
            Some(f) => f.record_key().clone(),
            None => RecordKey::Id(fid),
        };
        // the body parses under the wire tag, not the declared one
        let value = read_value(TType::from_wire(vt)?, cur, flags, field_desc, depth - 1)?;
        record.record_set(key, value)?;
        vt = cur.get_u8()?;
    }
    Ok(record)
}

fn read_map<V: HostValue>(
    cur: &mut ReadCursor<'_>,
    flags: Flags,
    desc: Option<&Descriptor>,
    depth: usize,
) -> Result<V> {
    let kt = cur.get_u8()?;
    let vt = cur.get_u8()?;
    let count = cur.get_i32()?;
    let mut map = V::new_map();
    for _ in 0..count.max(0) {
        let key = read_value(
            TType::from_wire(kt)?,
            cur,
            flags,
            desc.and_then(|d| d.key_desc()),
            depth - 1,
        )?;
        let value = read_value(
            TType::from_wire(vt)?,
            cur,
            flags,
            desc.and_then(|d| d.value_desc()),
            depth - 1,
        )?;
        map.map_set(key, value)?;
    }
    Ok(map)
}

fn read_sequence<V: HostValue>(
    cur: &mut ReadCursor<'_>,
    flags: Flags,
    desc: Option<&Descriptor>,
    depth: usize,
) -> Result<V> {
    let vt = cur.get_u8()?;
    let count = cur.get_i32()?;
    let n = count.max(0) as usize;
    if flags.seq_as_tensor {
        if let Some(tensor) = read_tensor(vt, n, cur)? {
            return Ok(V::from_tensor(tensor));
        }
    }
    let elem_desc = desc.and_then(|d| d.value_desc());
    let mut seq = V::new_seq(n.min(cur.remaining()));
    for _ in 0..n {
        let value = read_value(TType::from_wire(vt)?, cur, flags, elem_desc, depth - 1)?;
        seq.seq_push(value)?;
    }
    Ok(seq)
}

// Fixed element widths let the whole payload be bounds-checked before any
// storage is allocated.
fn read_tensor(vt: u8, n: usize, cur: &mut ReadCursor<'_>) -> Result<Option<Tensor>> {
    fn ensure(cur: &ReadCursor<'_>, n: usize, width: usize) -> Result<()> {
        if cur.remaining() < n * width {
            return Err(Error::Underflow {
                offset: cur.position(),
                needed: n * width,
                remaining: cur.remaining(),
            });
        }
        Ok(())
    }

    let tensor = if vt == TType::Byte as u8 {
        Tensor::Byte(cur.take_exact(n)?.to_vec())
    } else if vt == TType::I16 as u8 {
        ensure(cur, n, 2)?;
        let mut v = Vec::with_capacity(n);
        for _ in 0..n {
            v.push(cur.get_i16()?);
        }
        Tensor::Short(v)
    } else if vt == TType::I32 as u8 {
        ensure(cur, n, 4)?;
        let mut v = Vec::with_capacity(n);
        for _ in 0..n {
            v.push(cur.get_i32()?);
        }
        Tensor::Int(v)
    } else if vt == TType::I64 as u8 {
        ensure(cur, n, 8)?;
        let mut v = Vec::with_capacity(n);
        for _ in 0..n {
            v.push(cur.get_i64()?);
        }
        Tensor::Long(v)
    } else if vt == TType::Double as u8 {
        ensure(cur, n, 8)?;
        let mut v = Vec::with_capacity(n);
        for _ in 0..n {
            v.push(cur.get_f64()?);
        }
        Tensor::Double(v)
    } else {
        return Ok(None);
    };
    Ok(Some(tensor))
}
