use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;

pub const MIN_BRUSH: i32 = 1;
pub const MAX_BRUSH: i32 = 64;
pub const DEFAULT_BRUSH: i32 = 6;

/// A freehand stroke in image coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub points: Vec<(f32, f32)>,
    pub color: [u8; 4],
    pub size: u32,
}

impl Stroke {
    pub fn new(color: [u8; 4], size: u32) -> Self {
        Self {
            points: Vec::new(),
            color,
            size: size.max(1),
        }
    }
}

/// Draw `strokes` on a copy of `base`, oldest first.
pub fn render(base: &RgbaImage, strokes: &[Stroke]) -> RgbaImage {
    let mut out = base.clone();
    for stroke in strokes {
        draw_stroke(&mut out, stroke);
    }
    out
}

fn draw_stroke(canvas: &mut RgbaImage, stroke: &Stroke) {
    let radius = (stroke.size / 2).max(1) as i32;
    let color = Rgba(stroke.color);
    let stamp = |canvas: &mut RgbaImage, (x, y): (f32, f32)| {
        draw_filled_circle_mut(canvas, (x.round() as i32, y.round() as i32), radius, color);
    };

    let Some(&first) = stroke.points.first() else {
        return;
    };
    stamp(canvas, first);

    // Stamp along each segment so fast drags leave no gaps.
    let spacing = (radius as f32 * 0.5).max(1.0);
    for pair in stroke.points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let len = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
        let steps = (len / spacing).ceil().max(1.0) as usize;
        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            stamp(canvas, (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t));
        }
    }
}
