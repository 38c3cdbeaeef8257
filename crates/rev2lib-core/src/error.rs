//! Error types for the Rev2 protocol adapter.

use thiserror::Error;

use crate::device::DataKind;

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding, classifying or transforming Rev2 data.
///
/// Every operation in this crate is a pure function over its inputs, so an
/// error always describes the input that was rejected. Nothing is retried
/// here; asking the device for a fresh dump is up to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The message is not the kind of Rev2 SysEx the operation expects, or
    /// its payload cannot be decoded.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// A working buffer has the wrong length for the requested operation.
    #[error("Invalid buffer shape: expected {expected} bytes, got {actual}")]
    InvalidBufferShape { expected: usize, actual: usize },

    /// The operation is not available for this kind of data.
    #[error("Unsupported data kind: {0}")]
    UnsupportedDataKind(DataKind),

    /// A sequencer track index is out of range.
    #[error("Invalid sequencer track: {0}")]
    InvalidTrack(usize),

    /// A displayed setting value lies outside its definition's range.
    #[error("Value {value} for '{name}' is outside {min}..={max}")]
    ValueOutOfRange {
        name: String,
        value: i32,
        min: i32,
        max: i32,
    },

    /// No global setting carries the given name.
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),
}
