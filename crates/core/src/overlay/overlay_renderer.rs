use crate::detection::domain::face_counter::FaceCount;
use crate::shared::frame::Frame;

use super::glyphs::{glyph_bits, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

/// Fixed presentation parameters for the overlay.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayStyle {
    pub marker_radius: i32,
    pub marker_color: [u8; 3],
    /// Bottom-left corner of the label text, in pixels.
    pub label_origin: (i32, i32),
    /// Pixel size of one glyph cell.
    pub label_scale: i32,
    pub label_color: [u8; 3],
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            marker_radius: 15,
            marker_color: [0, 255, 0],
            label_origin: (50, 100),
            label_scale: 6,
            label_color: [255, 0, 0],
        }
    }
}

/// Draws a filled disc at each face's reference landmark and the person
/// count label. Presentation only: nothing downstream reads the result.
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    pub fn render(&self, frame: &mut Frame, count: &FaceCount) {
        let (w, h) = (frame.width(), frame.height());
        for detection in count.detections() {
            let (cx, cy) = detection.reference_pixel(w, h);
            fill_circle(frame, cx, cy, self.style.marker_radius, self.style.marker_color);
        }
        let (x, y) = self.style.label_origin;
        draw_text(
            frame,
            x,
            y,
            &label_text(count.person_count()),
            self.style.label_scale,
            self.style.label_color,
        );
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(OverlayStyle::default())
    }
}

pub fn label_text(person_count: u32) -> String {
    format!("Count: {person_count}")
}

fn fill_circle(frame: &mut Frame, cx: i32, cy: i32, radius: i32, color: [u8; 3]) {
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= r2 {
                frame.put_pixel(cx + dx, cy + dy, color);
            }
        }
    }
}

/// Renders `text` with its baseline at `y`; unknown characters advance blank.
fn draw_text(frame: &mut Frame, mut x: i32, y: i32, text: &str, scale: i32, color: [u8; 3]) {
    let top = y - GLYPH_HEIGHT * scale;
    for ch in text.chars() {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (pattern >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                        let px = x + col * scale;
                        let py = top + row as i32 * scale;
                        fill_rect(frame, px, py, scale, scale, color);
                    }
                }
            }
        }
        x += GLYPH_ADVANCE * scale;
    }
}

fn fill_rect(frame: &mut Frame, x: i32, y: i32, w: i32, h: i32, color: [u8; 3]) {
    for py in y..y + h {
        for px in x..x + w {
            frame.put_pixel(px, py, color);
        }
    }
}
