use thiserror::Error;

use crate::document::{Viewport, fit_scale};
use crate::drawing::{DrawableObject, ImageSrc, ObjectKind};

/// Absolute cap on engine ticks per conversion. Guarantees termination even
/// on pathological input.
pub const DEFAULT_TICK_BUDGET: u32 = 100_000;

/// Ticks advanced per cooperative step; also the progress-report cadence.
pub const TICKS_PER_STEP: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveMode {
    Polygon,
    Spline,
}

impl CurveMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CurveMode::Polygon => "polygon",
            CurveMode::Spline => "spline",
        }
    }
}

/// Conversion parameters recognized by the tracing engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceOptions {
    /// Color quantization granularity (significant bits).
    pub color_precision: u8,
    /// Minimum region size retained, in pixels.
    pub filter_speckle: u32,
    /// Angle in degrees below which a vertex is treated as a corner.
    pub corner_threshold: u32,
    /// Minimum segment length.
    pub length_threshold: f32,
    /// Curve-splice angle tolerance in degrees.
    pub splice_threshold: u32,
    pub mode: CurveMode,
}

impl Default for TraceOptions {
    fn default() -> Self {
        TraceOptions {
            color_precision: 6,
            filter_speckle: 4,
            corner_threshold: 60,
            length_threshold: 4.0,
            splice_threshold: 45,
            mode: CurveMode::Spline,
        }
    }
}

/// Why a conversion failed. Every variant is recovered by the raster
/// fallback; none of them is user-visible on its own.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("tracing engine failed to initialize: {0}")]
    Init(String),

    #[error("tracing engine produced no vector output")]
    EmptyOutput,

    #[error("tick budget of {budget} exhausted")]
    BudgetExhausted { budget: u32 },

    #[error("vector output could not be parsed: {0}")]
    MalformedSvg(String),
}

/// The external tracing engine, treated as an opaque, possibly-failing
/// black box. One instance serves exactly one conversion.
pub trait TracingEngine {
    fn init(&mut self, src: &ImageSrc, options: &TraceOptions) -> Result<(), TraceError>;

    /// Advance internal state by one bounded unit of work. Returns `true`
    /// while more work remains.
    fn tick(&mut self) -> bool;

    /// Completion fraction in `0.0..=1.0`. Only required to be monotonic.
    fn progress(&self) -> f32;

    /// The vector markup document, available once `tick` returned `false`.
    fn take_svg(&mut self) -> Option<String>;
}

#[derive(Debug)]
pub enum Step {
    Running { progress: f32 },
    Done(Result<String, TraceError>),
}

/// Drives a tracing engine through its tick loop cooperatively: each `step`
/// advances at most [`TICKS_PER_STEP`] ticks and then yields, so pointer and
/// keyboard handling stay interleaved with a running conversion.
pub struct Vectorizer {
    engine: Box<dyn TracingEngine>,
    budget: u32,
    ticks: u32,
    finished: bool,
}

impl Vectorizer {
    pub fn start(
        mut engine: Box<dyn TracingEngine>,
        src: &ImageSrc,
        options: &TraceOptions,
    ) -> Result<Self, TraceError> {
        engine.init(src, options)?;
        Ok(Vectorizer {
            engine,
            budget: DEFAULT_TICK_BUDGET,
            ticks: 0,
            finished: false,
        })
    }

    pub fn with_budget(mut self, budget: u32) -> Self {
        self.budget = budget.max(1);
        self
    }

    pub fn ticks_used(&self) -> u32 {
        self.ticks
    }

    /// Run one bounded batch of ticks. Progress is clamped below 1.0 until
    /// the engine actually reports completion.
    pub fn step(&mut self) -> Step {
        if self.finished {
            return Step::Done(Err(TraceError::EmptyOutput));
        }
        for _ in 0..TICKS_PER_STEP {
            if !self.engine.tick() {
                self.finished = true;
                log::info!("vectorize: conversion complete after {} ticks", self.ticks);
                return Step::Done(self.engine.take_svg().ok_or(TraceError::EmptyOutput));
            }
            self.ticks += 1;
            if self.ticks >= self.budget {
                self.finished = true;
                log::warn!("vectorize: tick budget {} exhausted", self.budget);
                return Step::Done(Err(TraceError::BudgetExhausted {
                    budget: self.budget,
                }));
            }
        }
        Step::Running {
            progress: self.engine.progress().clamp(0.0, 0.99),
        }
    }

    /// Pump the loop to completion, reporting progress once per step.
    pub fn run(mut self, mut on_progress: impl FnMut(f32)) -> Result<String, TraceError> {
        loop {
            match self.step() {
                Step::Running { progress } => on_progress(progress),
                Step::Done(result) => {
                    if result.is_ok() {
                        on_progress(1.0);
                    }
                    return result;
                }
            }
        }
    }
}

/// Decomposed conversion output: one addressable object per traced path,
/// rescaled to fit the viewport.
#[derive(Debug)]
pub struct TraceResult {
    pub objects: Vec<DrawableObject>,
    pub natural_width: f32,
    pub natural_height: f32,
    pub scale: f32,
}

/// Split the engine's vector markup into individually addressable path
/// objects. Positions and scales are rescaled with the same aspect-fit
/// formula used for background sizing.
pub fn decompose_svg(svg: &str, viewport: Viewport) -> Result<TraceResult, TraceError> {
    let doc =
        roxmltree::Document::parse(svg).map_err(|e| TraceError::MalformedSvg(e.to_string()))?;
    let root = doc.root_element();
    if !root.has_tag_name("svg") {
        return Err(TraceError::MalformedSvg(format!(
            "root element is <{}>, expected <svg>",
            root.tag_name().name()
        )));
    }

    let (natural_width, natural_height) = svg_dimensions(&root)
        .ok_or_else(|| TraceError::MalformedSvg("missing width/height and viewBox".into()))?;
    let scale = fit_scale(natural_width, natural_height, viewport);

    let mut objects = Vec::new();
    for node in root.descendants().filter(|n| n.has_tag_name("path")) {
        let Some(data) = node.attribute("d") else {
            continue;
        };
        let fill = node.attribute("fill").unwrap_or("#000000").to_string();
        let (tx, ty) = node
            .attribute("transform")
            .and_then(parse_translate)
            .unwrap_or((0.0, 0.0));

        let mut obj = DrawableObject::new(
            tx * scale,
            ty * scale,
            ObjectKind::Path {
                data: data.to_string(),
                fill,
            },
        );
        obj.scale_x = scale;
        obj.scale_y = scale;
        objects.push(obj);
    }

    if objects.is_empty() {
        return Err(TraceError::EmptyOutput);
    }
    log::info!(
        "vectorize: decomposed {} paths, fit scale {:.3}",
        objects.len(),
        scale
    );
    Ok(TraceResult {
        objects,
        natural_width,
        natural_height,
        scale,
    })
}

fn svg_dimensions(root: &roxmltree::Node) -> Option<(f32, f32)> {
    let parse = |v: &str| v.trim().trim_end_matches("px").parse::<f32>().ok();
    if let (Some(w), Some(h)) = (
        root.attribute("width").and_then(|v| parse(v)),
        root.attribute("height").and_then(|v| parse(v)),
    ) && w > 0.0
        && h > 0.0
    {
        return Some((w, h));
    }
    let view_box = root.attribute("viewBox")?;
    let parts: Vec<f32> = view_box
        .split([' ', ','])
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    match parts.as_slice() {
        [_, _, w, h] if *w > 0.0 && *h > 0.0 => Some((*w, *h)),
        _ => None,
    }
}

fn parse_translate(transform: &str) -> Option<(f32, f32)> {
    let start = transform.find("translate(")? + "translate(".len();
    let rest = &transform[start..];
    let end = rest.find(')')?;
    let mut nums = rest[..end]
        .split([' ', ','])
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<f32>().ok());
    let tx = nums.next()?;
    let ty = nums.next().unwrap_or(0.0);
    Some((tx, ty))
}
