use std::fmt::Write as _;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::document::Document;
use crate::drawing::{DrawableObject, ImageSrc, ObjectKind, TextAlign};
use crate::error::EditorError;

/// Side length of the synthesized arrowhead triangle, in canvas units.
const HEAD_SIZE: f32 = 15.0;

/// Serialize the whole scene as standalone SVG markup: background layer
/// first, then the editable sequence in paint order.
pub fn to_svg(doc: &Document) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" \
         viewBox=\"0 0 {} {}\">",
        doc.width(),
        doc.height(),
        doc.width(),
        doc.height()
    );
    if let Some(bg) = doc.background() {
        push_object(&mut out, bg);
    }
    for obj in doc.objects() {
        push_object(&mut out, obj);
    }
    out.push_str("</svg>");
    out
}

/// Rasterize the scene to encoded PNG bytes.
pub fn to_png(doc: &Document) -> Result<Vec<u8>, EditorError> {
    let svg = to_svg(doc);
    let options = resvg::usvg::Options::default();
    let tree = resvg::usvg::Tree::from_str(&svg, &options)
        .map_err(|e| EditorError::Render(e.to_string()))?;

    let width = doc.width().ceil().max(1.0) as u32;
    let height = doc.height().ceil().max(1.0) as u32;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| EditorError::Render(format!("invalid pixmap size {width}x{height}")))?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::identity(),
        &mut pixmap.as_mut(),
    );
    pixmap
        .encode_png()
        .map_err(|e| EditorError::Render(e.to_string()))
}

fn push_object(out: &mut String, obj: &DrawableObject) {
    let _ = write!(
        out,
        "<g transform=\"translate({} {}) rotate({}) scale({} {})\" opacity=\"{}\">",
        obj.x, obj.y, obj.angle, obj.scale_x, obj.scale_y, obj.opacity
    );
    match &obj.kind {
        ObjectKind::Image { src, width, height } => {
            let _ = write!(
                out,
                "<image href=\"{}\" width=\"{}\" height=\"{}\"/>",
                escape(&image_href(src)),
                width,
                height
            );
        }
        ObjectKind::Rectangle {
            width,
            height,
            fill,
            stroke,
            stroke_width,
        } => {
            let _ = write!(
                out,
                "<rect width=\"{}\" height=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
                width,
                height,
                escape(fill),
                escape(stroke),
                stroke_width
            );
        }
        ObjectKind::Ellipse {
            rx,
            ry,
            fill,
            stroke,
            stroke_width,
        } => {
            let _ = write!(
                out,
                "<ellipse cx=\"{rx}\" cy=\"{ry}\" rx=\"{rx}\" ry=\"{ry}\" \
                 fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
                escape(fill),
                escape(stroke),
                stroke_width
            );
        }
        ObjectKind::Line {
            x2,
            y2,
            stroke,
            stroke_width,
        } => {
            let _ = write!(
                out,
                "<line x1=\"0\" y1=\"0\" x2=\"{x2}\" y2=\"{y2}\" \
                 stroke=\"{}\" stroke-width=\"{}\"/>",
                escape(stroke),
                stroke_width
            );
        }
        ObjectKind::Arrow {
            x2,
            y2,
            stroke,
            stroke_width,
        } => {
            let _ = write!(
                out,
                "<line x1=\"0\" y1=\"0\" x2=\"{x2}\" y2=\"{y2}\" \
                 stroke=\"{}\" stroke-width=\"{}\"/>",
                escape(stroke),
                stroke_width
            );
            // Head synthesized from the endpoint angle, never stored.
            if let Some(angle) = obj.head_angle_deg() {
                let half = HEAD_SIZE / 2.0;
                let _ = write!(
                    out,
                    "<g transform=\"translate({x2} {y2}) rotate({angle})\">\
                     <polygon points=\"0,-{half} {half},{half} -{half},{half}\" fill=\"{}\"/>\
                     </g>",
                    escape(stroke)
                );
            }
        }
        ObjectKind::Text { content, style } => {
            let anchor = match style.align {
                TextAlign::Left => "start",
                TextAlign::Center => "middle",
                TextAlign::Right => "end",
            };
            let _ = write!(
                out,
                "<text font-family=\"{}\" font-size=\"{}\" fill=\"{}\" text-anchor=\"{anchor}\"",
                escape(&style.font_family),
                style.font_size,
                escape(&style.color)
            );
            if style.bold {
                out.push_str(" font-weight=\"bold\"");
            }
            if style.italic {
                out.push_str(" font-style=\"italic\"");
            }
            if style.underline {
                out.push_str(" text-decoration=\"underline\"");
            }
            out.push('>');
            for (i, line) in content.lines().enumerate() {
                let y = (i as f32 * 1.2 + 1.0) * style.font_size;
                let _ = write!(out, "<tspan x=\"0\" y=\"{y}\">{}</tspan>", escape(line));
            }
            out.push_str("</text>");
        }
        ObjectKind::Path { data, fill } => {
            let _ = write!(
                out,
                "<path d=\"{}\" fill=\"{}\"/>",
                escape(data),
                escape(fill)
            );
        }
    }
    out.push_str("</g>");
}

fn image_href(src: &ImageSrc) -> String {
    match src {
        ImageSrc::Url(url) => url.clone(),
        ImageSrc::Bytes(bytes) => {
            let mime = match image::guess_format(bytes) {
                Ok(image::ImageFormat::Png) => "image/png",
                Ok(image::ImageFormat::Jpeg) => "image/jpeg",
                _ => "application/octet-stream",
            };
            format!("data:{mime};base64,{}", BASE64.encode(bytes))
        }
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
