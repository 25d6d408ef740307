use image::{RgbaImage, imageops};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Selection with inclusive corners, top-left first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionRect {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl SelectionRect {
    pub fn width(&self) -> u32 {
        (self.bottom_right.x - self.top_left.x + 1).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom_right.y - self.top_left.y + 1).max(0) as u32
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Turn a drag from `anchor` to `release` into a top-left/bottom-right
/// rectangle clamped to a `width x height` image.
///
/// Out-of-bounds points are pulled to the border, never rejected.
pub fn normalize(anchor: Point, release: Point, width: u32, height: u32) -> SelectionRect {
    let (mut a, mut b) = (anchor, release);
    if b.x < a.x && b.y < a.y {
        std::mem::swap(&mut a, &mut b);
    } else {
        if b.x < a.x {
            std::mem::swap(&mut a.x, &mut b.x);
        }
        if b.y < a.y {
            std::mem::swap(&mut a.y, &mut b.y);
        }
    }

    b.x = b.x.min(width as i32 - 1);
    b.y = b.y.min(height as i32 - 1);
    a.x = a.x.max(0);
    a.y = a.y.max(0);

    SelectionRect {
        top_left: a,
        bottom_right: b,
    }
}

/// Copy the pixels under `rect`. Degenerate rectangles yield an empty image.
pub fn extract(img: &RgbaImage, rect: &SelectionRect) -> RgbaImage {
    let (w, h) = img.dimensions();
    let x0 = rect.top_left.x.max(0);
    let y0 = rect.top_left.y.max(0);
    let x1 = rect.bottom_right.x.min(w as i32 - 1);
    let y1 = rect.bottom_right.y.min(h as i32 - 1);
    let cw = (x1 - x0 + 1).max(0) as u32;
    let ch = (y1 - y0 + 1).max(0) as u32;
    if cw == 0 || ch == 0 {
        return RgbaImage::new(cw, ch);
    }
    imageops::crop_imm(img, x0 as u32, y0 as u32, cw, ch).to_image()
}
