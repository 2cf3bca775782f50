use crate::error::Error;
use crate::Result;

/// Thrift Binary Protocol wire type tags. The numeric values appear on the
/// wire and are fixed by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TType {
    Stop = 0,
    Void = 1,
    Bool = 2,
    Byte = 3,
    Double = 4,
    I16 = 6,
    I32 = 8,
    I64 = 10,
    String = 11,
    Struct = 12,
    Map = 13,
    Set = 14,
    List = 15,
    /// Schema-only alias; exchanged as I32 on the wire.
    Enum = 16,
}

impl TType {
    /// Resolves a schema type name. `stop` is not a schema type.
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match name {
            "void" => TType::Void,
            "bool" => TType::Bool,
            "byte" => TType::Byte,
            "double" => TType::Double,
            "i16" => TType::I16,
            "i32" => TType::I32,
            "i64" => TType::I64,
            "string" => TType::String,
            "struct" => TType::Struct,
            "map" => TType::Map,
            "set" => TType::Set,
            "list" => TType::List,
            "enum" => TType::Enum,
            _ => return Err(Error::Schema(format!("unknown ttype name {name:?}"))),
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            TType::Stop => "stop",
            TType::Void => "void",
            TType::Bool => "bool",
            TType::Byte => "byte",
            TType::Double => "double",
            TType::I16 => "i16",
            TType::I32 => "i32",
            TType::I64 => "i64",
            TType::String => "string",
            TType::Struct => "struct",
            TType::Map => "map",
            TType::Set => "set",
            TType::List => "list",
            TType::Enum => "enum",
        }
    }

    /// Resolves a tag byte read from the wire.
    pub fn from_wire(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => TType::Stop,
            1 => TType::Void,
            2 => TType::Bool,
            3 => TType::Byte,
            4 => TType::Double,
            6 => TType::I16,
            8 => TType::I32,
            10 => TType::I64,
            11 => TType::String,
            12 => TType::Struct,
            13 => TType::Map,
            14 => TType::Set,
            15 => TType::List,
            16 => TType::Enum,
            _ => return Err(Error::Parse(format!("unknown wire type tag {tag}"))),
        })
    }

    /// The tag byte written for this type. ENUM is indistinguishable from
    /// I32 on the wire.
    pub fn wire_tag(self) -> u8 {
        match self {
            TType::Enum => TType::I32 as u8,
            t => t as u8,
        }
    }

    /// Element types that qualify for tensor-backed sequences.
    pub fn is_tensor_element(self) -> bool {
        matches!(
            self,
            TType::Byte | TType::I16 | TType::I32 | TType::I64 | TType::Double
        )
    }
}

impl std::fmt::Display for TType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_values() {
        let tests = vec![
            (TType::Stop, 0),
            (TType::Void, 1),
            (TType::Bool, 2),
            (TType::Byte, 3),
            (TType::Double, 4),
            (TType::I16, 6),
            (TType::I32, 8),
            (TType::I64, 10),
            (TType::String, 11),
            (TType::Struct, 12),
            (TType::Map, 13),
            (TType::Set, 14),
            (TType::List, 15),
            (TType::Enum, 16),
        ];
        for (t, tag) in tests {
            assert_eq!(t as u8, tag, "tag value for {}", t);
            assert_eq!(TType::from_wire(tag).unwrap(), t);
        }
    }

    #[test]
    fn test_name_mapping() {
        for name in [
            "void", "bool", "byte", "double", "i16", "i32", "i64", "string", "struct", "map",
            "set", "list", "enum",
        ] {
            let t = TType::from_name(name).unwrap();
            assert_eq!(t.name(), name);
        }
        assert!(TType::from_name("i8").is_err());
        assert!(TType::from_name("stop").is_err());
    }

    #[test]
    fn test_enum_is_i32_on_wire() {
        assert_eq!(TType::Enum.wire_tag(), 8);
        assert_eq!(TType::I32.wire_tag(), 8);
    }

    #[test]
    fn test_unassigned_tags_rejected() {
        for tag in [5u8, 7, 9, 17, 255] {
            assert!(TType::from_wire(tag).is_err(), "tag {} should be unknown", tag);
        }
    }
}
