use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::host::RecordKey;
use crate::types::TType;
use crate::Result;

/// Spec recursion bound for descriptor construction; the walkers carry
/// their own configurable bound.
const BUILD_MAX_DEPTH: usize = 128;

/// Representation of 64-bit integers on the host side. The wire format is
/// the same 8 big-endian bytes in every mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum I64Mode {
    /// Round-trip through f64; lossy values are a range error.
    #[default]
    Number,
    /// Exchanged as decimal strings.
    String,
    /// Exchanged as 1-element i64 tensors.
    Tensor,
}

/// Root policy switches, read once at the root and passed to every
/// recursive call. Nested nodes cannot override them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub i64_mode: I64Mode,
    /// Lists and sets of numeric elements are exchanged as typed tensors.
    pub seq_as_tensor: bool,
}

/// Schema input: a scalar type name shorthand, or a structured node.
///
/// Unknown keys in a structured node are ignored; unknown type names are a
/// construction error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaSpec {
    Name(String),
    Node(Box<SpecNode>),
}

impl Default for SchemaSpec {
    /// A bare node: a permissive struct with no declared fields.
    fn default() -> Self {
        SchemaSpec::Node(Box::default())
    }
}

impl From<&str> for SchemaSpec {
    fn from(name: &str) -> Self {
        SchemaSpec::Name(name.to_string())
    }
}

impl From<SpecNode> for SchemaSpec {
    fn from(node: SpecNode) -> Self {
        SchemaSpec::Node(Box::new(node))
    }
}

/// One structured schema node. `ttype` defaults to `struct` when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecNode {
    #[serde(default)]
    pub ttype: Option<String>,
    /// Field name used as the record key; the numeric field id otherwise.
    #[serde(default)]
    pub name: Option<String>,
    /// For `struct`: `(field_id, sub-spec)` pairs.
    #[serde(default)]
    pub fields: Vec<(u16, SchemaSpec)>,
    /// For `map`.
    #[serde(default)]
    pub key: Option<SchemaSpec>,
    /// For `map`, `set`, `list`.
    #[serde(default)]
    pub value: Option<SchemaSpec>,
    #[serde(default)]
    pub i64string: bool,
    #[serde(default)]
    pub i64tensor: bool,
    #[serde(default)]
    pub tensors: bool,
}

#[derive(Debug)]
pub(crate) enum Shape {
    Scalar,
    /// Sorted by ascending field id, no duplicates.
    Struct(Vec<Descriptor>),
    Map(Box<Descriptor>, Box<Descriptor>),
    /// Shared by set and list.
    Seq(Box<Descriptor>),
}

/// Immutable schema node. Built once from a [`SchemaSpec`], then shared by
/// any number of encode/decode calls; the walkers never mutate it.
#[derive(Debug)]
pub struct Descriptor {
    ttype: TType,
    shape: Shape,
    field_id: u16,
    record_key: RecordKey,
    flags: Flags,
}

impl Descriptor {
    pub fn from_spec(spec: &SchemaSpec) -> Result<Self> {
        Self::build(spec, BUILD_MAX_DEPTH)
    }

    fn build(spec: &SchemaSpec, depth: usize) -> Result<Self> {
        if depth == 0 {
            return Err(Error::Schema("spec nesting exceeds depth bound".into()));
        }
        match spec {
            SchemaSpec::Name(name) => {
                let ttype = TType::from_name(name)?;
                let shape = match ttype {
                    TType::Map => {
                        return Err(Error::Schema(
                            "map requires key and value schemas".into(),
                        ));
                    }
                    TType::Set | TType::List => {
                        return Err(Error::Schema(format!(
                            "{ttype} requires a value schema"
                        )));
                    }
                    TType::Struct => Shape::Struct(Vec::new()),
                    _ => Shape::Scalar,
                };
                Ok(Descriptor {
                    ttype,
                    shape,
                    field_id: 0,
                    record_key: RecordKey::Id(0),
                    flags: Flags::default(),
                })
            }
            SchemaSpec::Node(node) => {
                let flags = flags_of(node)?;
                let ttype = match &node.ttype {
                    Some(name) => TType::from_name(name)?,
                    None => TType::Struct,
                };
                let shape = match ttype {
                    TType::Struct => {
                        let mut fields = Vec::with_capacity(node.fields.len());
                        for (fid, sub) in &node.fields {
                            let mut field = Self::build(sub, depth - 1)?;
                            field.field_id = *fid;
                            if !matches!(field.record_key, RecordKey::Name(_)) {
                                field.record_key = RecordKey::Id(*fid);
                            }
                            fields.push(field);
                        }
                        fields.sort_by_key(|f| f.field_id);
                        for pair in fields.windows(2) {
                            if pair[0].field_id == pair[1].field_id {
                                return Err(Error::Schema(format!(
                                    "duplicate field id {}",
                                    pair[0].field_id
                                )));
                            }
                        }
                        Shape::Struct(fields)
                    }
                    TType::Map => {
                        let (Some(key), Some(value)) = (&node.key, &node.value) else {
                            return Err(Error::Schema(
                                "map requires key and value schemas".into(),
                            ));
                        };
                        Shape::Map(
                            Box::new(Self::build(key, depth - 1)?),
                            Box::new(Self::build(value, depth - 1)?),
                        )
                    }
                    TType::Set | TType::List => {
                        let Some(value) = &node.value else {
                            return Err(Error::Schema(format!(
                                "{ttype} requires a value schema"
                            )));
                        };
                        Shape::Seq(Box::new(Self::build(value, depth - 1)?))
                    }
                    _ => Shape::Scalar,
                };
                let record_key = match &node.name {
                    Some(name) => RecordKey::Name(name.clone()),
                    None => RecordKey::Id(0),
                };
                Ok(Descriptor {
                    ttype,
                    shape,
                    field_id: 0,
                    record_key,
                    flags,
                })
            }
        }
    }

    pub fn ttype(&self) -> TType {
        self.ttype
    }

    pub(crate) fn flags(&self) -> Flags {
        self.flags
    }

    pub(crate) fn field_id(&self) -> u16 {
        self.field_id
    }

    pub(crate) fn record_key(&self) -> &RecordKey {
        &self.record_key
    }

    pub(crate) fn fields(&self) -> &[Descriptor] {
        match &self.shape {
            Shape::Struct(fields) => fields,
            _ => &[],
        }
    }

    pub(crate) fn field_by_id(&self, fid: u16) -> Option<&Descriptor> {
        self.fields().iter().find(|f| f.field_id == fid)
    }

    pub(crate) fn key_desc(&self) -> Option<&Descriptor> {
        match &self.shape {
            Shape::Map(key, _) => Some(key),
            _ => None,
        }
    }

    pub(crate) fn value_desc(&self) -> Option<&Descriptor> {
        match &self.shape {
            Shape::Map(_, value) => Some(value),
            Shape::Seq(value) => Some(value),
            _ => None,
        }
    }
}

fn flags_of(node: &SpecNode) -> Result<Flags> {
    if node.i64string && node.i64tensor {
        return Err(Error::Schema(
            "i64string and i64tensor are mutually exclusive".into(),
        ));
    }
    let i64_mode = if node.i64string {
        I64Mode::String
    } else if node.i64tensor {
        I64Mode::Tensor
    } else {
        I64Mode::Number
    };
    Ok(Flags {
        i64_mode,
        seq_as_tensor: node.tensors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(json: serde_json::Value) -> SchemaSpec {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_scalar_shorthand() {
        let desc = Descriptor::from_spec(&"i32".into()).unwrap();
        assert_eq!(desc.ttype(), TType::I32);
        assert!(desc.fields().is_empty());
    }

    #[test]
    fn test_default_is_permissive_struct() {
        let desc = Descriptor::from_spec(&SchemaSpec::default()).unwrap();
        assert_eq!(desc.ttype(), TType::Struct);
        assert!(desc.fields().is_empty());

        // "struct" shorthand behaves the same
        let desc = Descriptor::from_spec(&"struct".into()).unwrap();
        assert_eq!(desc.ttype(), TType::Struct);
    }

    #[test]
    fn test_bare_composite_shorthand_rejected() {
        for name in ["map", "set", "list"] {
            assert!(
                Descriptor::from_spec(&name.into()).is_err(),
                "bare {:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_struct_fields_sorted_by_id() {
        let s = spec(serde_json::json!({
            "fields": [[3, "i32"], [1, "string"], [2, "bool"]]
        }));
        let desc = Descriptor::from_spec(&s).unwrap();
        let ids: Vec<u16> = desc.fields().iter().map(|f| f.field_id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicate_field_ids_rejected() {
        let s = spec(serde_json::json!({
            "fields": [[1, "i32"], [1, "string"]]
        }));
        let err = Descriptor::from_spec(&s).unwrap_err();
        assert!(matches!(err, Error::Schema(_)), "got {:?}", err);
    }

    #[test]
    fn test_field_name_becomes_record_key() {
        let s = spec(serde_json::json!({
            "fields": [[1, {"ttype": "i32", "name": "x"}], [2, "string"]]
        }));
        let desc = Descriptor::from_spec(&s).unwrap();
        assert_eq!(desc.fields()[0].record_key(), &RecordKey::from("x"));
        assert_eq!(desc.fields()[1].record_key(), &RecordKey::Id(2));
    }

    #[test]
    fn test_map_requires_both_children() {
        let s = spec(serde_json::json!({"ttype": "map", "key": "string"}));
        assert!(Descriptor::from_spec(&s).is_err());

        let s = spec(serde_json::json!({"ttype": "map", "key": "string", "value": "i16"}));
        let desc = Descriptor::from_spec(&s).unwrap();
        assert_eq!(desc.key_desc().unwrap().ttype(), TType::String);
        assert_eq!(desc.value_desc().unwrap().ttype(), TType::I16);
    }

    #[test]
    fn test_exclusive_i64_modes() {
        let s = spec(serde_json::json!({"ttype": "i64", "i64string": true, "i64tensor": true}));
        assert!(Descriptor::from_spec(&s).is_err());

        let s = spec(serde_json::json!({"ttype": "i64", "i64string": true}));
        let desc = Descriptor::from_spec(&s).unwrap();
        assert_eq!(desc.flags().i64_mode, I64Mode::String);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let s = spec(serde_json::json!({"ttype": "i32", "comment": "ignored"}));
        assert_eq!(Descriptor::from_spec(&s).unwrap().ttype(), TType::I32);
    }

    #[test]
    fn test_unknown_ttype_rejected() {
        let s = spec(serde_json::json!({"ttype": "i8"}));
        assert!(Descriptor::from_spec(&s).is_err());
    }

    #[test]
    fn test_depth_bound() {
        let mut s = serde_json::json!("i32");
        for _ in 0..200 {
            s = serde_json::json!({"ttype": "list", "value": s});
        }
        let err = Descriptor::from_spec(&spec(s)).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }
}
