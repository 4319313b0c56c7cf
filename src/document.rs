use uuid::Uuid;

use crate::drawing::{DrawableObject, ImageSrc, ObjectKind, TextAlign};
use crate::error::EditorError;
use crate::history::Snapshot;

/// Available on-screen area the canvas is fitted into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

/// Aspect-preserving fit factor. Never upscales beyond the source's
/// natural resolution.
pub fn fit_scale(natural_w: f32, natural_h: f32, viewport: Viewport) -> f32 {
    if natural_w <= 0.0 || natural_h <= 0.0 {
        return 1.0;
    }
    (viewport.width / natural_w)
        .min(viewport.height / natural_h)
        .min(1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reorder {
    Front,
    Forward,
    Backward,
    Back,
}

/// Partial transform request. Absent fields leave the corresponding object
/// field untouched; non-positive width/height leave the scale untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformRequest {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub angle: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

/// Partial style request. Fields apply only where the object kind carries
/// the matching attribute.
#[derive(Debug, Clone, Default)]
pub struct StyleUpdate {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: Option<f32>,
    pub opacity: Option<f32>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub align: Option<TextAlign>,
}

/// The scene graph: canvas dimensions, one locked background layer and the
/// ordered editable object sequence (index 0 paints first). The background
/// lives outside the sequence, so it is structurally below every editable
/// object and never enters snapshots or selections.
#[derive(Debug, Default)]
pub struct Document {
    width: f32,
    height: f32,
    background: Option<DrawableObject>,
    objects: Vec<DrawableObject>,
}

impl Document {
    pub fn new(width: f32, height: f32) -> Self {
        Document {
            width,
            height,
            background: None,
            objects: Vec::new(),
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn objects(&self) -> &[DrawableObject] {
        &self.objects
    }

    pub fn background(&self) -> Option<&DrawableObject> {
        self.background.as_ref()
    }

    pub fn add_object(&mut self, obj: DrawableObject) -> Uuid {
        let id = obj.id;
        self.objects.push(obj);
        id
    }

    pub fn remove_object(&mut self, id: Uuid) -> Option<DrawableObject> {
        let idx = self.objects.iter().position(|o| o.id == id)?;
        Some(self.objects.remove(idx))
    }

    /// Drop every editable object. The background stays.
    pub fn clear_editable(&mut self) -> usize {
        let removed = self.objects.len();
        self.objects.clear();
        removed
    }

    pub fn find(&self, id: Uuid) -> Option<&DrawableObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn find_mut(&mut self, id: Uuid) -> Option<&mut DrawableObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Topmost hit-testable object under `pos`, in paint order.
    pub fn top_object_at(&self, pos: [f32; 2]) -> Option<&DrawableObject> {
        self.objects
            .iter()
            .rev()
            .find(|o| o.evented && o.contains(pos))
    }

    /// Install `src` as the locked background layer, resizing the canvas to
    /// the image fitted into `viewport`. Returns the applied fit factor.
    pub fn set_background(
        &mut self,
        src: ImageSrc,
        natural_w: f32,
        natural_h: f32,
        viewport: Viewport,
    ) -> f32 {
        let scale = fit_scale(natural_w, natural_h, viewport);
        self.width = natural_w * scale;
        self.height = natural_h * scale;

        let mut bg = DrawableObject::locked(
            0.0,
            0.0,
            ObjectKind::Image {
                src,
                width: natural_w,
                height: natural_h,
            },
        );
        bg.scale_x = scale;
        bg.scale_y = scale;
        self.background = Some(bg);
        scale
    }

    /// Explicitly make the background layer interactive again.
    pub fn unlock_background(&mut self) {
        if let Some(bg) = self.background.as_mut() {
            bg.selectable = true;
            bg.evented = true;
        }
    }

    /// Change an object's position in the paint order. `Back` puts it at
    /// index 0 of the editable sequence; the background is stored out of
    /// band and therefore stays strictly below it.
    pub fn reorder(&mut self, id: Uuid, op: Reorder) -> Result<(), EditorError> {
        let idx = self
            .objects
            .iter()
            .position(|o| o.id == id)
            .ok_or(EditorError::UnknownObject(id))?;
        let top = self.objects.len() - 1;
        match op {
            Reorder::Front => {
                let obj = self.objects.remove(idx);
                self.objects.push(obj);
            }
            Reorder::Forward => {
                if idx < top {
                    self.objects.swap(idx, idx + 1);
                }
            }
            Reorder::Backward => {
                if idx > 0 {
                    self.objects.swap(idx, idx - 1);
                }
            }
            Reorder::Back => {
                let obj = self.objects.remove(idx);
                self.objects.insert(0, obj);
            }
        }
        Ok(())
    }

    pub fn apply_transform(&mut self, id: Uuid, req: &TransformRequest) -> Result<(), EditorError> {
        let obj = self
            .objects
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(EditorError::UnknownObject(id))?;
        if let Some(x) = req.x {
            obj.x = x;
        }
        if let Some(y) = req.y {
            obj.y = y;
        }
        if let Some(angle) = req.angle {
            obj.angle = angle;
        }
        let base = obj.base_size();
        if let Some(w) = req.width
            && w > 0.0
            && base[0] > 0.0
        {
            obj.scale_x = w / base[0];
        }
        if let Some(h) = req.height
            && h > 0.0
            && base[1] > 0.0
        {
            obj.scale_y = h / base[1];
        }
        Ok(())
    }

    pub fn apply_style(&mut self, id: Uuid, update: &StyleUpdate) -> Result<(), EditorError> {
        let obj = self
            .objects
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(EditorError::UnknownObject(id))?;
        if let Some(opacity) = update.opacity {
            obj.opacity = opacity.clamp(0.0, 1.0);
        }
        match &mut obj.kind {
            ObjectKind::Rectangle {
                fill,
                stroke,
                stroke_width,
                ..
            }
            | ObjectKind::Ellipse {
                fill,
                stroke,
                stroke_width,
                ..
            } => {
                if let Some(f) = &update.fill {
                    *fill = f.clone();
                }
                if let Some(s) = &update.stroke {
                    *stroke = s.clone();
                }
                if let Some(w) = update.stroke_width {
                    *stroke_width = w;
                }
            }
            ObjectKind::Line {
                stroke,
                stroke_width,
                ..
            }
            | ObjectKind::Arrow {
                stroke,
                stroke_width,
                ..
            } => {
                if let Some(s) = &update.stroke {
                    *stroke = s.clone();
                }
                if let Some(w) = update.stroke_width {
                    *stroke_width = w;
                }
            }
            ObjectKind::Text { style, .. } => {
                if let Some(f) = &update.fill {
                    style.color = f.clone();
                }
                if let Some(family) = &update.font_family {
                    style.font_family = family.clone();
                }
                if let Some(size) = update.font_size {
                    style.font_size = size;
                }
                if let Some(b) = update.bold {
                    style.bold = b;
                }
                if let Some(i) = update.italic {
                    style.italic = i;
                }
                if let Some(u) = update.underline {
                    style.underline = u;
                }
                if let Some(a) = update.align {
                    style.align = a;
                }
            }
            ObjectKind::Path { fill, .. } => {
                if let Some(f) = &update.fill {
                    *fill = f.clone();
                }
            }
            ObjectKind::Image { .. } => {}
        }
        Ok(())
    }

    /// Serialize the editable sequence only; the background never appears.
    pub fn serialize_editable(&self) -> Result<Snapshot, EditorError> {
        Snapshot::capture(&self.objects)
    }

    /// Whole-state replacement of the editable sequence. The snapshot is
    /// decoded in full before anything is touched, so a failed restore
    /// leaves the document unchanged.
    pub fn restore_editable(&mut self, snapshot: &Snapshot) -> Result<(), EditorError> {
        let objects = snapshot.decode()?;
        self.objects = objects;
        Ok(())
    }
}
