//! Error types for the mapping crate.

use thiserror::Error;

/// Result type for mapping operations.
pub type Result<T> = std::result::Result<T, MapError>;

/// Errors surfaced by tree I/O and parameter validation.
///
/// Out-of-range coordinates on update/query paths are not errors; those
/// operations return `None` and leave the tree untouched. `OutOfRange` is
/// only raised where a coordinate is a hard precondition (e.g. bounding-box
/// setters).
#[derive(Error, Debug)]
pub enum MapError {
  /// Underlying I/O failure, including truncated streams.
  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),

  /// The stream header names a different tree type.
  #[error("unknown tree type header: {0:?}")]
  UnknownHeader(String),

  /// Structurally invalid stream contents.
  #[error("malformed stream: {0}")]
  Malformed(String),

  /// Sensor-model parameter outside its legal domain.
  #[error("invalid parameter: {0}")]
  InvalidParameter(String),

  /// Coordinate cannot be expressed in the 16-bit key space.
  #[error("coordinate out of key range: ({0}, {1}, {2})")]
  OutOfRange(f32, f32, f32),
}
