use crate::buffer::{ReadCursor, WriteBuffer};
use crate::decode::read_value;
use crate::encode::write_value;
use crate::error::Error;
use crate::host::{HostValue, Tensor};
use crate::schema::{Descriptor, SchemaSpec};
use crate::Result;

/// Recursion bound applied to encode and decode unless overridden.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// A schema-bound codec handle.
///
/// Construction validates the spec once; the resulting handle is immutable
/// and can serve any number of encode/decode calls, concurrently from
/// multiple threads, since every call owns its buffer and output value.
#[derive(Debug)]
pub struct Codec {
    desc: Descriptor,
    max_depth: usize,
}

impl Codec {
    pub fn new(spec: &SchemaSpec) -> Result<Self> {
        Ok(Self {
            desc: Descriptor::from_spec(spec)?,
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }

    /// Overrides the walker recursion bound.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Encodes a host value to Binary Protocol bytes.
    pub fn encode<V: HostValue>(&self, value: &V) -> Result<Vec<u8>> {
        let mut out = WriteBuffer::new();
        write_value(&self.desc, value, &mut out, self.desc.flags(), self.max_depth)?;
        tracing::trace!(ttype = %self.desc.ttype(), len = out.len(), "encoded value");
        Ok(out.into_bytes())
    }

    /// Decodes Binary Protocol bytes to a host value.
    pub fn decode<V: HostValue>(&self, bytes: &[u8]) -> Result<V> {
        tracing::trace!(ttype = %self.desc.ttype(), len = bytes.len(), "decoding value");
        let mut cur = ReadCursor::new(bytes);
        read_value(
            self.desc.ttype(),
            &mut cur,
            self.desc.flags(),
            Some(&self.desc),
            self.max_depth,
        )
    }

    /// Like [`Codec::encode`], but hands the bytes back as a byte tensor.
    pub fn encode_to_tensor<V: HostValue>(&self, value: &V) -> Result<Tensor> {
        Ok(Tensor::Byte(self.encode(value)?))
    }

    /// Like [`Codec::decode`], reading straight out of a byte tensor's
    /// storage without an intermediate copy.
    pub fn decode_from_tensor<V: HostValue>(&self, tensor: &Tensor) -> Result<V> {
        match tensor {
            Tensor::Byte(bytes) => self.decode(bytes),
            t => Err(Error::TypeMismatch {
                expected: "byte tensor",
                found: t.kind().to_string(),
            }),
        }
    }
}
