use serde::{Deserialize, Serialize};

use crate::drawing::ImageSrc;

/// Candidate image descriptor produced by the extraction collaborator.
/// Field names mirror the handoff JSON (`type`, `isSlide`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateImage {
    pub id: String,
    pub src: ImageSrc,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "isSlide", default)]
    pub is_slide: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "img")]
    Img,
    #[serde(rename = "canvas")]
    Canvas,
}

/// At-most-once handoff slot: the collaborator writes one descriptor, the
/// editor consumes it exactly once, and consumption clears the slot so a
/// stale record is never re-delivered.
#[derive(Debug, Default)]
pub struct PendingImage {
    slot: Option<CandidateImage>,
}

impl PendingImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, image: CandidateImage) {
        if let Some(previous) = self.slot.replace(image) {
            log::warn!("handoff: replacing unconsumed pending image {}", previous.id);
        }
    }

    /// Consume the pending descriptor, clearing the slot. An empty slot is
    /// not an error; the editor stays usable for manual composition.
    pub fn take(&mut self) -> Option<CandidateImage> {
        let taken = self.slot.take();
        if taken.is_none() {
            log::info!("handoff: no pending image found");
        }
        taken
    }
}
