mod document;
mod drawing;
mod error;
mod export;
mod handoff;
mod history;
mod session;
mod vectorize;

// Re-export the main public interface
pub use document::{Document, Reorder, StyleUpdate, TransformRequest, Viewport, fit_scale};
pub use drawing::{DrawableObject, ImageSrc, ObjectKind, TextAlign, TextStyle, Tool};
pub use error::EditorError;
pub use export::{to_png, to_svg};
pub use handoff::{CandidateImage, PendingImage, SourceKind};
pub use history::{DEFAULT_CAPACITY, History, SNAPSHOT_VERSION, Snapshot};
pub use session::{ConversionStatus, EditorSession, TEXT_PLACEHOLDER};
pub use vectorize::{
    CurveMode, DEFAULT_TICK_BUDGET, Step, TICKS_PER_STEP, TraceError, TraceOptions, TraceResult,
    TracingEngine, Vectorizer, decompose_svg,
};
