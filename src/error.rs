/// Errors surfaced by schema construction, encode, and decode.
///
/// The first error aborts the current operation; nothing is recovered
/// internally and no partial output is returned.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Decode tried to read past the end of the input buffer.
    #[error("read of {needed} byte(s) at offset {offset} overruns input ({remaining} left)")]
    Underflow {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// A number cannot be represented losslessly in the declared width.
    #[error("{what} value out of range")]
    Range { what: &'static str },

    /// Malformed wire bytes or an unparseable i64 decimal string.
    #[error("{0}")]
    Parse(String),

    /// Struct decode hit a field id absent from a non-empty descriptor.
    #[error("field id {field_id} out of range for struct (at offset {offset})")]
    UnknownField { field_id: u16, offset: usize },

    /// The schema spec was rejected at construction.
    #[error("invalid schema: {0}")]
    Schema(String),

    /// The host value does not provide the capability the descriptor needs.
    #[error("type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },
}
