use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EditorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Select,
    Rectangle,
    Ellipse,
    Line,
    Arrow,
    Text,
    Image,
}

impl Tool {
    /// Tools that run a pointer-drag draw session. Select manipulates
    /// existing objects and Image goes through the file side channel.
    pub fn is_drawing(self) -> bool {
        !matches!(self, Tool::Select | Tool::Image)
    }
}

/// Source of raster pixels: an opaque URL (http or data URL) or raw
/// encoded bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageSrc {
    Url(String),
    Bytes(Vec<u8>),
}

impl ImageSrc {
    /// Resolve the natural pixel dimensions of the source. Byte sources are
    /// decoded to validate them; URL sources trust the declared dimensions
    /// from the handoff descriptor.
    pub fn probe(&self, declared_w: u32, declared_h: u32) -> Result<(f32, f32), EditorError> {
        match self {
            ImageSrc::Bytes(bytes) => {
                let img = image::load_from_memory(bytes)
                    .map_err(|e| EditorError::ImageLoad(e.to_string()))?;
                Ok((img.width() as f32, img.height() as f32))
            }
            ImageSrc::Url(url) => {
                if url.is_empty() {
                    return Err(EditorError::ImageLoad("empty image source".into()));
                }
                if declared_w == 0 || declared_h == 0 {
                    return Err(EditorError::ImageLoad(format!(
                        "source declares unusable dimensions {declared_w}x{declared_h}"
                    )));
                }
                Ok((declared_w as f32, declared_h as f32))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f32,
    pub color: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        TextStyle {
            font_family: "Helvetica".into(),
            font_size: 24.0,
            color: "#333333".into(),
            bold: false,
            italic: false,
            underline: false,
            align: TextAlign::Left,
        }
    }
}

/// Shape-specific payload of a drawable object. Line and Arrow store their
/// free endpoint relative to the object position; the arrowhead is derived
/// from the endpoint angle, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    Image {
        src: ImageSrc,
        width: f32,
        height: f32,
    },
    Rectangle {
        width: f32,
        height: f32,
        fill: String,
        stroke: String,
        stroke_width: f32,
    },
    Ellipse {
        rx: f32,
        ry: f32,
        fill: String,
        stroke: String,
        stroke_width: f32,
    },
    Line {
        x2: f32,
        y2: f32,
        stroke: String,
        stroke_width: f32,
    },
    Arrow {
        x2: f32,
        y2: f32,
        stroke: String,
        stroke_width: f32,
    },
    Text {
        content: String,
        style: TextStyle,
    },
    Path {
        data: String,
        fill: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawableObject {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub angle: f32,
    pub opacity: f32,
    pub selectable: bool,
    pub evented: bool,
    pub kind: ObjectKind,
}

impl DrawableObject {
    pub fn new(x: f32, y: f32, kind: ObjectKind) -> Self {
        DrawableObject {
            id: Uuid::new_v4(),
            x,
            y,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            opacity: 1.0,
            selectable: true,
            evented: true,
            kind,
        }
    }

    /// A locked object: not selectable, not hit-testable. Used for the
    /// background layer and for uncommitted draw-session transients.
    pub fn locked(x: f32, y: f32, kind: ObjectKind) -> Self {
        let mut obj = Self::new(x, y, kind);
        obj.selectable = false;
        obj.evented = false;
        obj
    }

    /// Unscaled intrinsic size. Paths have no cheap intrinsic size, so a
    /// width/height transform request on them is a no-op.
    pub fn base_size(&self) -> [f32; 2] {
        match &self.kind {
            ObjectKind::Image { width, height, .. } => [*width, *height],
            ObjectKind::Rectangle { width, height, .. } => [*width, *height],
            ObjectKind::Ellipse { rx, ry, .. } => [rx * 2.0, ry * 2.0],
            ObjectKind::Line { x2, y2, .. } | ObjectKind::Arrow { x2, y2, .. } => {
                [x2.abs(), y2.abs()]
            }
            ObjectKind::Text { content, style } => {
                let widest = content
                    .lines()
                    .map(|l| l.chars().count())
                    .max()
                    .unwrap_or(0);
                [
                    widest as f32 * style.font_size * 0.6,
                    content.lines().count().max(1) as f32 * style.font_size * 1.2,
                ]
            }
            ObjectKind::Path { .. } => [0.0, 0.0],
        }
    }

    /// Arrowhead orientation in degrees for Arrow objects: the endpoint
    /// angle rotated a quarter turn so the head points along the line.
    pub fn head_angle_deg(&self) -> Option<f32> {
        match &self.kind {
            ObjectKind::Arrow { x2, y2, .. } => Some(y2.atan2(*x2).to_degrees() + 90.0),
            _ => None,
        }
    }

    /// Hit test in canvas coordinates. Rotation is ignored, matching the
    /// axis-aligned interaction model of selection boxes and handles.
    pub fn contains(&self, pos: [f32; 2]) -> bool {
        if self.scale_x == 0.0 || self.scale_y == 0.0 {
            return false;
        }
        let local = [
            (pos[0] - self.x) / self.scale_x,
            (pos[1] - self.y) / self.scale_y,
        ];
        match &self.kind {
            ObjectKind::Image { width, height, .. }
            | ObjectKind::Rectangle { width, height, .. } => {
                local[0] >= 0.0 && local[0] <= *width && local[1] >= 0.0 && local[1] <= *height
            }
            ObjectKind::Ellipse { rx, ry, .. } => {
                if *rx <= 0.0 || *ry <= 0.0 {
                    return false;
                }
                let nx = (local[0] - rx) / rx;
                let ny = (local[1] - ry) / ry;
                nx * nx + ny * ny <= 1.0
            }
            ObjectKind::Line {
                x2,
                y2,
                stroke_width,
                ..
            }
            | ObjectKind::Arrow {
                x2,
                y2,
                stroke_width,
                ..
            } => {
                point_to_segment_distance(local, [0.0, 0.0], [*x2, *y2])
                    <= (stroke_width * 2.0).max(4.0)
            }
            ObjectKind::Text { .. } => {
                let size = self.base_size();
                local[0] >= -5.0
                    && local[0] <= size[0] + 5.0
                    && local[1] >= -5.0
                    && local[1] <= size[1] + 5.0
            }
            ObjectKind::Path { .. } => false,
        }
    }
}

fn point_to_segment_distance(point: [f32; 2], a: [f32; 2], b: [f32; 2]) -> f32 {
    let len_sq = (b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2);
    if len_sq == 0.0 {
        return ((point[0] - a[0]).powi(2) + (point[1] - a[1]).powi(2)).sqrt();
    }
    let t = ((point[0] - a[0]) * (b[0] - a[0]) + (point[1] - a[1]) * (b[1] - a[1])) / len_sq;
    let t = t.clamp(0.0, 1.0);
    let proj = [a[0] + t * (b[0] - a[0]), a[1] + t * (b[1] - a[1])];
    ((point[0] - proj[0]).powi(2) + (point[1] - proj[1]).powi(2)).sqrt()
}
