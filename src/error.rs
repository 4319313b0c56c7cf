use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced at the editor boundary. Conversion-engine failures are
/// handled internally by the raster fallback and never appear here; only
/// the fallback's own failure does, as `ImageLoad`.
#[derive(Error, Debug)]
pub enum EditorError {
    /// The raster source could not be decoded or carries no usable
    /// dimensions. User-visible.
    #[error("image could not be loaded: {0}")]
    ImageLoad(String),

    /// A vectorization job is already running; jobs are never queued.
    #[error("a conversion is already in flight")]
    ConversionInFlight,

    /// Snapshot carries a schema version this build does not understand.
    #[error("snapshot version {found} is not supported (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },

    /// Snapshot payload is not valid serialized form.
    #[error("snapshot could not be decoded: {0}")]
    SnapshotDecode(#[from] serde_json::Error),

    #[error("no object with id {0}")]
    UnknownObject(Uuid),

    #[error("raster export failed: {0}")]
    Render(String),
}
