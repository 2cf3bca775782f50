//! Schema-driven codec for the Thrift Binary Protocol.
//!
//! A [`SchemaSpec`] describes the expected wire shape; [`Codec`] walks it to
//! encode host values to bytes and back. The walkers are generic over the
//! [`HostValue`] adapter; [`Value`] is the dynamic value type shipped here.

pub mod buffer;
mod codec;
mod decode;
mod encode;
pub mod error;
pub mod host;
pub mod schema;
pub mod types;
pub mod value;

pub type Result<T> = std::result::Result<T, error::Error>;

pub use codec::{Codec, DEFAULT_MAX_DEPTH};
pub use error::Error;
pub use host::{HostValue, RecordKey, Tensor};
pub use schema::{Descriptor, I64Mode, SchemaSpec, SpecNode};
pub use types::TType;
pub use value::Value;
