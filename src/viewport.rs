use egui::{Pos2, Vec2};

use crate::selection::Point;

const ZOOM_IN_FACTOR: f32 = 1.25;
const ZOOM_OUT_FACTOR: f32 = 0.8;
/// Zooming in stops once the scale reaches this.
const MAX_SCALE: f32 = 3.0;
/// Zooming out stops once the scale drops to this.
const MIN_SCALE: f32 = 0.333;

/// Display scale of the document. Not persisted; reset on every new image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    scale: f32,
    fit_to_window: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            fit_to_window: false,
        }
    }
}

impl Viewport {
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn fit_to_window(&self) -> bool {
        self.fit_to_window
    }

    /// Back to 1:1 for a freshly loaded image. Fit-to-window survives.
    pub fn reset(&mut self) {
        self.scale = 1.0;
    }

    pub fn can_zoom_in(&self) -> bool {
        self.scale < MAX_SCALE
    }

    pub fn can_zoom_out(&self) -> bool {
        self.scale > MIN_SCALE
    }

    pub fn zoom_in(&mut self) -> bool {
        if !self.can_zoom_in() {
            return false;
        }
        self.scale *= ZOOM_IN_FACTOR;
        true
    }

    pub fn zoom_out(&mut self) -> bool {
        if !self.can_zoom_out() {
            return false;
        }
        self.scale *= ZOOM_OUT_FACTOR;
        true
    }

    pub fn normal_size(&mut self) {
        self.scale = 1.0;
    }

    pub fn set_fit_to_window(&mut self, fit: bool) {
        self.fit_to_window = fit;
        if !fit {
            self.normal_size();
        }
    }

    /// Scale actually used to draw an image of `image_size` into `available`.
    pub fn effective_scale(&self, image_size: Vec2, available: Vec2) -> f32 {
        if !self.fit_to_window || image_size.x <= 0.0 || image_size.y <= 0.0 {
            return self.scale;
        }
        (available.x / image_size.x)
            .min(available.y / image_size.y)
            .max(f32::EPSILON)
    }

    pub fn display_size(&self, image_size: Vec2, available: Vec2) -> Vec2 {
        image_size * self.effective_scale(image_size, available)
    }

    /// Map a position relative to the drawn image's top-left corner to image pixels.
    pub fn to_image(pos: Pos2, scale: f32) -> Point {
        Point::new((pos.x / scale).floor() as i32, (pos.y / scale).floor() as i32)
    }
}
