use uuid::Uuid;

use crate::document::{Document, Reorder, StyleUpdate, TransformRequest, Viewport};
use crate::drawing::{DrawableObject, ImageSrc, ObjectKind, TextStyle, Tool};
use crate::error::EditorError;
use crate::handoff::CandidateImage;
use crate::history::History;
use crate::vectorize::{Step, TraceOptions, TraceResult, TracingEngine, Vectorizer, decompose_svg};

pub const TEXT_PLACEHOLDER: &str = "Enter text";

const MIN_RECT_SIDE: f32 = 4.0;
const MIN_ELLIPSE_RADIUS: f32 = 2.0;
const MIN_LINE_LENGTH: f32 = 4.0;
const IMAGE_INSERT_OFFSET: [f32; 2] = [100.0, 100.0];

/// Transient state of an in-progress pointer drag.
#[derive(Debug, Clone, Copy)]
struct DrawSession {
    anchor: [f32; 2],
    object: Uuid,
}

struct PendingConversion {
    vectorizer: Vectorizer,
    image: CandidateImage,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConversionStatus {
    Idle,
    Running { progress: f32 },
    Finished,
}

/// All mutable editor state for one session: the document, its history, the
/// active tool, the optional draw session and the at-most-one conversion
/// job. Every committed mutation and its history capture go through here as
/// one unit.
pub struct EditorSession {
    document: Document,
    history: History,
    viewport: Viewport,
    tool: Tool,
    draw: Option<DrawSession>,
    selection: Vec<Uuid>,
    editing_text: Option<Uuid>,
    job: Option<PendingConversion>,
    pub stroke_color: String,
    pub fill_color: String,
    pub stroke_width: f32,
}

impl EditorSession {
    pub fn new(viewport: Viewport) -> Self {
        let mut session = EditorSession {
            document: Document::new(viewport.width, viewport.height),
            history: History::new(),
            viewport,
            tool: Tool::Select,
            draw: None,
            selection: Vec::new(),
            editing_text: None,
            job: None,
            stroke_color: "#000000".into(),
            fill_color: "none".into(),
            stroke_width: 2.0,
        };
        // Baseline snapshot so a full undo run lands on the pristine state.
        session.commit();
        session
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn selection(&self) -> &[Uuid] {
        &self.selection
    }

    /// Object currently in text-edit mode. On entry all of its content is
    /// selected, so the first keystroke replaces the placeholder.
    pub fn text_edit(&self) -> Option<Uuid> {
        self.editing_text
    }

    pub fn conversion_in_flight(&self) -> bool {
        self.job.is_some()
    }

    fn commit(&mut self) {
        match self.document.serialize_editable() {
            Ok(snapshot) => self.history.capture(snapshot),
            Err(e) => log::error!("history capture failed: {e}"),
        }
    }

    // ---- tool state machine ----------------------------------------------

    /// Switch the active tool. Activating a drawing tool cancels any draw in
    /// progress, drops multi-selection and makes existing objects
    /// non-interactive until the tool reverts to Select.
    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool == tool {
            return;
        }
        self.cancel_draw();
        if tool.is_drawing() || tool == Tool::Image {
            self.selection.clear();
        }
        self.editing_text = None;
        self.tool = tool;
    }

    /// Whether existing objects respond to pointer input right now.
    pub fn objects_interactive(&self) -> bool {
        !self.tool.is_drawing()
    }

    pub fn pointer_down(&mut self, pos: [f32; 2]) {
        match self.tool {
            Tool::Select => {
                let hit = self
                    .document
                    .top_object_at(pos)
                    .filter(|o| o.selectable)
                    .map(|o| o.id);
                match hit {
                    Some(id) => self.selection = vec![id],
                    None => self.selection.clear(),
                }
            }
            Tool::Image => {
                // Insertion happens through the file side channel, never a drag.
            }
            Tool::Text => {
                let obj = DrawableObject::new(
                    pos[0],
                    pos[1],
                    ObjectKind::Text {
                        content: TEXT_PLACEHOLDER.into(),
                        style: TextStyle::default(),
                    },
                );
                let id = self.document.add_object(obj);
                self.commit();
                self.editing_text = Some(id);
                self.selection = vec![id];
                self.tool = Tool::Select;
            }
            Tool::Rectangle | Tool::Ellipse | Tool::Line | Tool::Arrow => {
                let kind = match self.tool {
                    Tool::Rectangle => ObjectKind::Rectangle {
                        width: 0.0,
                        height: 0.0,
                        fill: self.fill_color.clone(),
                        stroke: self.stroke_color.clone(),
                        stroke_width: self.stroke_width,
                    },
                    Tool::Ellipse => ObjectKind::Ellipse {
                        rx: 0.0,
                        ry: 0.0,
                        fill: self.fill_color.clone(),
                        stroke: self.stroke_color.clone(),
                        stroke_width: self.stroke_width,
                    },
                    Tool::Line => ObjectKind::Line {
                        x2: 0.0,
                        y2: 0.0,
                        stroke: self.stroke_color.clone(),
                        stroke_width: self.stroke_width,
                    },
                    _ => ObjectKind::Arrow {
                        x2: 0.0,
                        y2: 0.0,
                        stroke: self.stroke_color.clone(),
                        stroke_width: self.stroke_width,
                    },
                };
                let transient = DrawableObject::locked(pos[0], pos[1], kind);
                let id = self.document.add_object(transient);
                self.draw = Some(DrawSession { anchor: pos, object: id });
            }
        }
    }

    pub fn pointer_move(&mut self, pos: [f32; 2]) {
        let Some(draw) = self.draw else {
            return;
        };
        let anchor = draw.anchor;
        let Some(obj) = self.document.find_mut(draw.object) else {
            self.draw = None;
            return;
        };
        let dx = pos[0] - anchor[0];
        let dy = pos[1] - anchor[1];
        match &mut obj.kind {
            ObjectKind::Rectangle { width, height, .. } => {
                obj.x = anchor[0].min(pos[0]);
                obj.y = anchor[1].min(pos[1]);
                *width = dx.abs();
                *height = dy.abs();
            }
            ObjectKind::Ellipse { rx, ry, .. } => {
                obj.x = anchor[0].min(pos[0]);
                obj.y = anchor[1].min(pos[1]);
                *rx = dx.abs() / 2.0;
                *ry = dy.abs() / 2.0;
            }
            ObjectKind::Line { x2, y2, .. } | ObjectKind::Arrow { x2, y2, .. } => {
                *x2 = dx;
                *y2 = dy;
            }
            _ => {}
        }
    }

    /// Finalize the draw session: commit the shape, or silently discard it
    /// when degenerate. Either way the tool reverts to Select.
    pub fn pointer_up(&mut self, pos: [f32; 2]) {
        self.pointer_move(pos);
        let Some(draw) = self.draw.take() else {
            return;
        };
        self.tool = Tool::Select;

        let degenerate = self
            .document
            .find(draw.object)
            .is_none_or(|obj| match &obj.kind {
                ObjectKind::Rectangle { width, height, .. } => {
                    *width < MIN_RECT_SIDE || *height < MIN_RECT_SIDE
                }
                ObjectKind::Ellipse { rx, ry, .. } => {
                    *rx < MIN_ELLIPSE_RADIUS || *ry < MIN_ELLIPSE_RADIUS
                }
                ObjectKind::Line { x2, y2, .. } | ObjectKind::Arrow { x2, y2, .. } => {
                    (x2 * x2 + y2 * y2).sqrt() < MIN_LINE_LENGTH
                }
                _ => true,
            });

        if degenerate {
            // Expected, frequent user behavior; drop without touching history.
            self.document.remove_object(draw.object);
            log::debug!("discarded degenerate shape");
            return;
        }

        if let Some(obj) = self.document.find_mut(draw.object) {
            obj.selectable = true;
            obj.evented = true;
        }
        self.commit();
        self.selection = vec![draw.object];
    }

    /// Escape cancels the active selection, any text edit and any draw in
    /// progress, and forces the tool back to Select.
    pub fn press_escape(&mut self) {
        self.cancel_draw();
        self.selection.clear();
        self.editing_text = None;
        self.tool = Tool::Select;
    }

    fn cancel_draw(&mut self) {
        if let Some(draw) = self.draw.take() {
            self.document.remove_object(draw.object);
        }
    }

    /// Resolve the Image tool's file side channel: insert at a fixed offset,
    /// downscaled when wider than half the canvas, then revert to Select.
    pub fn insert_image(
        &mut self,
        src: ImageSrc,
        declared_w: u32,
        declared_h: u32,
    ) -> Result<Uuid, EditorError> {
        let (width, height) = src.probe(declared_w, declared_h)?;
        let mut obj = DrawableObject::new(
            IMAGE_INSERT_OFFSET[0],
            IMAGE_INSERT_OFFSET[1],
            ObjectKind::Image { src, width, height },
        );
        let max_width = self.document.width() * 0.5;
        if max_width > 0.0 && width > max_width {
            let scale = max_width / width;
            obj.scale_x = scale;
            obj.scale_y = scale;
        }
        let id = self.document.add_object(obj);
        self.commit();
        self.selection = vec![id];
        self.tool = Tool::Select;
        Ok(id)
    }

    /// Replace the content of the object in text-edit mode and leave the
    /// edit. A no-op when nothing is being edited.
    pub fn commit_text(&mut self, content: &str) -> Result<(), EditorError> {
        let Some(id) = self.editing_text.take() else {
            return Ok(());
        };
        let obj = self
            .document
            .find_mut(id)
            .ok_or(EditorError::UnknownObject(id))?;
        if let ObjectKind::Text { content: current, .. } = &mut obj.kind {
            *current = content.to_string();
        }
        self.commit();
        Ok(())
    }

    // ---- selection -------------------------------------------------------

    /// Add an object to the multi-selection. Refused while a drawing tool is
    /// active, and for locked objects; the background can never be part of
    /// it. Returns whether the object was added.
    pub fn extend_selection(&mut self, id: Uuid) -> bool {
        if !self.objects_interactive() {
            return false;
        }
        let Some(obj) = self.document.find(id) else {
            return false;
        };
        if !obj.selectable {
            return false;
        }
        if !self.selection.contains(&id) {
            self.selection.push(id);
        }
        true
    }

    /// Remove every selected object as one committed mutation.
    pub fn delete_selection(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        let ids = std::mem::take(&mut self.selection);
        let mut removed = 0;
        for id in ids {
            if self.document.remove_object(id).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            self.commit();
        }
    }

    /// Remove every editable object. The background stays.
    pub fn clear(&mut self) {
        self.selection.clear();
        self.editing_text = None;
        if self.document.clear_editable() > 0 {
            self.commit();
        }
    }

    // ---- committed property edits ----------------------------------------

    pub fn transform_object(&mut self, id: Uuid, req: &TransformRequest) -> Result<(), EditorError> {
        self.document.apply_transform(id, req)?;
        self.commit();
        Ok(())
    }

    pub fn style_object(&mut self, id: Uuid, update: &StyleUpdate) -> Result<(), EditorError> {
        self.document.apply_style(id, update)?;
        self.commit();
        Ok(())
    }

    pub fn reorder_object(&mut self, id: Uuid, op: Reorder) -> Result<(), EditorError> {
        self.document.reorder(id, op)?;
        self.commit();
        Ok(())
    }

    pub fn remove_object(&mut self, id: Uuid) -> Result<(), EditorError> {
        self.document
            .remove_object(id)
            .ok_or(EditorError::UnknownObject(id))?;
        self.selection.retain(|s| *s != id);
        self.commit();
        Ok(())
    }

    // ---- undo / redo -----------------------------------------------------

    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let Some(snapshot) = self.history.undo().cloned() else {
            return Ok(false);
        };
        self.restore(&snapshot)?;
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        let Some(snapshot) = self.history.redo().cloned() else {
            return Ok(false);
        };
        self.restore(&snapshot)?;
        Ok(true)
    }

    fn restore(&mut self, snapshot: &crate::history::Snapshot) -> Result<(), EditorError> {
        self.history.pause();
        let result = self.document.restore_editable(snapshot);
        self.history.resume();
        result?;
        self.selection
            .retain(|id| self.document.find(*id).is_some());
        self.editing_text = self
            .editing_text
            .filter(|id| self.document.find(*id).is_some());
        Ok(())
    }

    // ---- vectorization ---------------------------------------------------

    /// Start converting the handed-off image. On engine-init failure the
    /// raster fallback is applied immediately. Only one job may be in
    /// flight; jobs are never queued.
    pub fn open_image(
        &mut self,
        image: CandidateImage,
        engine: Box<dyn TracingEngine>,
        options: &TraceOptions,
    ) -> Result<(), EditorError> {
        if self.job.is_some() {
            return Err(EditorError::ConversionInFlight);
        }
        match Vectorizer::start(engine, &image.src, options) {
            Ok(vectorizer) => {
                log::info!("starting vectorization of {}", image.id);
                self.job = Some(PendingConversion { vectorizer, image });
                Ok(())
            }
            Err(e) => {
                log::warn!("vectorization unavailable ({e}), falling back to raster mode");
                self.apply_fallback(image)
            }
        }
    }

    /// Advance the in-flight conversion by one cooperative step. The host
    /// event loop calls this between input events; each call runs a bounded
    /// batch of engine ticks.
    pub fn pump_conversion(&mut self) -> Result<ConversionStatus, EditorError> {
        let step = match self.job.as_mut() {
            None => return Ok(ConversionStatus::Idle),
            Some(job) => job.vectorizer.step(),
        };
        match step {
            Step::Running { progress } => Ok(ConversionStatus::Running { progress }),
            Step::Done(outcome) => {
                let image = match self.job.take() {
                    Some(job) => job.image,
                    None => return Ok(ConversionStatus::Idle),
                };
                match outcome.and_then(|svg| decompose_svg(&svg, self.viewport)) {
                    Ok(result) => {
                        self.apply_trace_result(image, result);
                        Ok(ConversionStatus::Finished)
                    }
                    Err(e) => {
                        log::warn!("conversion failed ({e}), falling back to raster mode");
                        self.apply_fallback(image)?;
                        Ok(ConversionStatus::Finished)
                    }
                }
            }
        }
    }

    /// Install the decomposed result: original raster as locked background,
    /// traced paths as selectable foreground. Intermediate states are
    /// collapsed into a single history capture.
    fn apply_trace_result(&mut self, image: CandidateImage, result: TraceResult) {
        self.history.pause();
        self.document.set_background(
            image.src,
            result.natural_width,
            result.natural_height,
            self.viewport,
        );
        for obj in result.objects {
            self.document.add_object(obj);
        }
        self.history.resume();
        self.commit();
    }

    /// Raster fallback: the original image becomes the locked background.
    /// A pure background mutation, so history is not captured. Its own
    /// failure (unloadable image) is the one user-visible conversion error.
    fn apply_fallback(&mut self, image: CandidateImage) -> Result<(), EditorError> {
        let (width, height) = image.src.probe(image.width, image.height)?;
        self.document
            .set_background(image.src, width, height, self.viewport);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::SourceKind;
    use crate::vectorize::TraceError;

    fn session() -> EditorSession {
        EditorSession::new(Viewport {
            width: 800.0,
            height: 500.0,
        })
    }

    fn descriptor() -> CandidateImage {
        CandidateImage {
            id: "img_0".into(),
            src: ImageSrc::Url("data:image/png;base64,abcd".into()),
            kind: SourceKind::Img,
            width: 1000,
            height: 600,
            label: None,
            is_slide: true,
        }
    }

    struct FixedEngine {
        ticks: u32,
        svg: Option<String>,
        fail_init: bool,
    }

    impl FixedEngine {
        fn with_svg(svg: &str) -> Box<Self> {
            Box::new(FixedEngine {
                ticks: 250,
                svg: Some(svg.into()),
                fail_init: false,
            })
        }

        fn never_finishing() -> Box<Self> {
            Box::new(FixedEngine {
                ticks: u32::MAX,
                svg: None,
                fail_init: false,
            })
        }
    }

    impl TracingEngine for FixedEngine {
        fn init(&mut self, _src: &ImageSrc, _options: &TraceOptions) -> Result<(), TraceError> {
            if self.fail_init {
                return Err(TraceError::Init("unavailable".into()));
            }
            Ok(())
        }

        fn tick(&mut self) -> bool {
            if self.ticks == 0 {
                return false;
            }
            self.ticks = self.ticks.saturating_sub(1);
            true
        }

        fn progress(&self) -> f32 {
            0.5
        }

        fn take_svg(&mut self) -> Option<String> {
            self.svg.take()
        }
    }

    const TRACED: &str = concat!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"1000\" height=\"600\">",
        "<path d=\"M0 0 L10 10 Z\" fill=\"#aabbcc\"/>",
        "<path d=\"M5 5 L20 20 Z\" fill=\"#112233\"/>",
        "</svg>"
    );

    fn pump_until_done(session: &mut EditorSession) {
        while session.conversion_in_flight() {
            session.pump_conversion().unwrap();
        }
    }

    #[test]
    fn tiny_rectangle_is_rejected() {
        let mut s = session();
        s.set_tool(Tool::Rectangle);
        s.pointer_down([10.0, 10.0]);
        s.pointer_move([11.0, 10.5]);
        s.pointer_up([12.0, 11.0]);

        assert!(s.document().objects().is_empty());
        assert_eq!(s.tool(), Tool::Select);
        assert!(s.selection().is_empty());
        // Rejection never enters history: only the baseline exists.
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn committed_rectangle_becomes_active_selection() {
        let mut s = session();
        s.set_tool(Tool::Rectangle);
        s.pointer_down([10.0, 10.0]);
        s.pointer_move([60.0, 40.0]);
        s.pointer_up([110.0, 80.0]);

        assert_eq!(s.document().objects().len(), 1);
        let obj = &s.document().objects()[0];
        assert!(obj.selectable && obj.evented);
        match &obj.kind {
            ObjectKind::Rectangle { width, height, .. } => {
                assert_eq!((*width, *height), (100.0, 70.0));
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!((obj.x, obj.y), (10.0, 10.0));
        assert_eq!(s.selection(), &[obj.id]);
        assert_eq!(s.tool(), Tool::Select);
        assert_eq!(s.history().len(), 2);
    }

    #[test]
    fn rectangle_origin_uses_min_corner() {
        let mut s = session();
        s.set_tool(Tool::Rectangle);
        s.pointer_down([110.0, 80.0]);
        s.pointer_up([10.0, 10.0]);

        let obj = &s.document().objects()[0];
        assert_eq!((obj.x, obj.y), (10.0, 10.0));
    }

    #[test]
    fn ellipse_halves_deltas_and_rejects_thin_ones() {
        let mut s = session();
        s.set_tool(Tool::Ellipse);
        s.pointer_down([0.0, 0.0]);
        s.pointer_up([40.0, 20.0]);
        match &s.document().objects()[0].kind {
            ObjectKind::Ellipse { rx, ry, .. } => assert_eq!((*rx, *ry), (20.0, 10.0)),
            other => panic!("unexpected kind {other:?}"),
        }

        s.set_tool(Tool::Ellipse);
        s.pointer_down([0.0, 0.0]);
        s.pointer_up([40.0, 3.0]); // ry = 1.5 < 2
        assert_eq!(s.document().objects().len(), 1);
    }

    #[test]
    fn short_line_is_rejected_and_long_arrow_committed() {
        let mut s = session();
        s.set_tool(Tool::Line);
        s.pointer_down([0.0, 0.0]);
        s.pointer_up([2.0, 2.0]);
        assert!(s.document().objects().is_empty());

        s.set_tool(Tool::Arrow);
        s.pointer_down([10.0, 10.0]);
        s.pointer_up([50.0, 10.0]);
        assert_eq!(s.document().objects().len(), 1);
        let obj = &s.document().objects()[0];
        assert_eq!(obj.head_angle_deg(), Some(90.0));
    }

    #[test]
    fn text_tool_places_placeholder_and_reverts() {
        let mut s = session();
        s.set_tool(Tool::Text);
        s.pointer_down([30.0, 40.0]);

        assert_eq!(s.tool(), Tool::Select);
        let obj = &s.document().objects()[0];
        match &obj.kind {
            ObjectKind::Text { content, .. } => assert_eq!(content, TEXT_PLACEHOLDER),
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(s.text_edit(), Some(obj.id));
        assert_eq!(s.selection(), &[obj.id]);

        s.commit_text("Revenue 2024").unwrap();
        assert!(s.text_edit().is_none());
        match &s.document().objects()[0].kind {
            ObjectKind::Text { content, .. } => assert_eq!(content, "Revenue 2024"),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn wide_image_is_downscaled_to_half_canvas() {
        let mut s = session();
        s.set_tool(Tool::Image);
        let id = s
            .insert_image(ImageSrc::Url("photo.png".into()), 1000, 400)
            .unwrap();
        let obj = s.document().find(id).unwrap();
        assert_eq!((obj.x, obj.y), (100.0, 100.0));
        // 1000 > 800 * 0.5, scaled down to 400 wide.
        assert_eq!(obj.scale_x, 0.4);
        assert_eq!(s.tool(), Tool::Select);

        s.set_tool(Tool::Image);
        let small = s
            .insert_image(ImageSrc::Url("icon.png".into()), 200, 200)
            .unwrap();
        assert_eq!(s.document().find(small).unwrap().scale_x, 1.0);
    }

    #[test]
    fn escape_cancels_draw_and_selection() {
        let mut s = session();
        s.set_tool(Tool::Rectangle);
        s.pointer_down([0.0, 0.0]);
        s.pointer_move([50.0, 50.0]);
        s.press_escape();

        assert!(s.document().objects().is_empty());
        assert_eq!(s.tool(), Tool::Select);
        assert!(s.selection().is_empty());
    }

    #[test]
    fn drawing_tool_blocks_multi_selection() {
        let mut s = session();
        s.set_tool(Tool::Rectangle);
        s.pointer_down([0.0, 0.0]);
        s.pointer_up([50.0, 50.0]);
        let a = s.document().objects()[0].id;
        s.set_tool(Tool::Rectangle);
        s.pointer_down([100.0, 100.0]);
        s.pointer_up([160.0, 160.0]);
        let b = s.document().objects()[1].id;

        assert!(s.extend_selection(a));
        assert!(s.extend_selection(b));
        assert_eq!(s.selection().len(), 2);

        s.set_tool(Tool::Ellipse);
        assert!(s.selection().is_empty());
        assert!(!s.extend_selection(a));
    }

    #[test]
    fn three_adds_and_two_undos_leave_first_object() {
        let mut s = session();
        for i in 0..3 {
            s.set_tool(Tool::Rectangle);
            let x = i as f32 * 100.0;
            s.pointer_down([x, 0.0]);
            s.pointer_up([x + 50.0, 50.0]);
        }
        assert_eq!(s.document().objects().len(), 3);

        s.undo().unwrap();
        s.undo().unwrap();
        assert_eq!(s.document().objects().len(), 1);
        assert_eq!(s.document().objects()[0].x, 0.0);
    }

    #[test]
    fn undo_then_redo_restores_pre_undo_state() {
        let mut s = session();
        s.set_tool(Tool::Rectangle);
        s.pointer_down([0.0, 0.0]);
        s.pointer_up([50.0, 50.0]);
        let before = s.document().serialize_editable().unwrap();

        assert!(s.undo().unwrap());
        assert!(s.document().objects().is_empty());
        assert!(s.redo().unwrap());
        assert_eq!(s.document().serialize_editable().unwrap(), before);
    }

    #[test]
    fn successful_conversion_installs_background_and_paths() {
        let mut s = session();
        s.open_image(descriptor(), FixedEngine::with_svg(TRACED), &TraceOptions::default())
            .unwrap();
        assert!(s.conversion_in_flight());
        pump_until_done(&mut s);

        assert!(s.document().background().is_some());
        assert_eq!(s.document().objects().len(), 2);
        assert_eq!(s.document().width(), 800.0);
        assert_eq!(s.document().height(), 480.0);
        // Load collapses to exactly one capture beyond the baseline.
        assert_eq!(s.history().len(), 2);

        s.undo().unwrap();
        assert!(s.document().objects().is_empty());
        assert!(s.document().background().is_some());
    }

    #[test]
    fn budget_exhaustion_falls_back_to_raster_background() {
        let mut s = session();
        s.open_image(descriptor(), FixedEngine::never_finishing(), &TraceOptions::default())
            .unwrap();
        // Bounded despite the engine never finishing.
        let mut steps = 0u32;
        while s.conversion_in_flight() {
            s.pump_conversion().unwrap();
            steps += 1;
            assert!(steps <= 1_001, "tick loop failed to terminate");
        }

        let bg = s.document().background().unwrap();
        assert!(!bg.selectable && !bg.evented);
        assert!(s.document().objects().is_empty());
        assert_eq!(s.document().width(), 800.0);
        // Pure background mutation: no capture beyond the baseline.
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn fallback_with_unloadable_image_is_user_visible() {
        let mut s = session();
        let mut image = descriptor();
        image.width = 0;
        s.open_image(image, FixedEngine::never_finishing(), &TraceOptions::default())
            .unwrap();
        assert!(s.conversion_in_flight());
        let outcome = loop {
            match s.pump_conversion() {
                Ok(ConversionStatus::Idle) => panic!("job vanished without outcome"),
                Ok(_) if s.conversion_in_flight() => continue,
                other => break other,
            }
        };
        assert!(matches!(outcome, Err(EditorError::ImageLoad(_))));
        assert!(s.document().background().is_none());
    }

    #[test]
    fn second_job_is_refused_while_one_runs() {
        let mut s = session();
        s.open_image(descriptor(), FixedEngine::with_svg(TRACED), &TraceOptions::default())
            .unwrap();
        let err = s.open_image(
            descriptor(),
            FixedEngine::with_svg(TRACED),
            &TraceOptions::default(),
        );
        assert!(matches!(err, Err(EditorError::ConversionInFlight)));
    }

    #[test]
    fn init_failure_falls_back_immediately() {
        let mut s = session();
        let engine = Box::new(FixedEngine {
            ticks: 0,
            svg: None,
            fail_init: true,
        });
        s.open_image(descriptor(), engine, &TraceOptions::default())
            .unwrap();
        assert!(!s.conversion_in_flight());
        assert!(s.document().background().is_some());
    }

    #[test]
    fn delete_selection_is_one_capture() {
        let mut s = session();
        for i in 0..2 {
            s.set_tool(Tool::Rectangle);
            let x = i as f32 * 100.0;
            s.pointer_down([x, 0.0]);
            s.pointer_up([x + 50.0, 50.0]);
        }
        let ids: Vec<_> = s.document().objects().iter().map(|o| o.id).collect();
        for id in &ids {
            s.extend_selection(*id);
        }
        let before = s.history().len();
        s.delete_selection();
        assert!(s.document().objects().is_empty());
        assert_eq!(s.history().len(), before + 1);
    }
}
