use image::RgbaImage;
use rayon::prelude::*;

/// Fixed contrast multiplier paired with the brightness slider.
pub const CONTRAST_ALPHA: f32 = 2.2;

const SEPIA: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// `out = alpha * in + beta` per colour channel, saturated to `0..=255`.
pub fn brightness_contrast(img: &RgbaImage, alpha: f32, beta: i32) -> RgbaImage {
    let mut out = img.clone();
    let beta = beta as f32;
    out.par_chunks_exact_mut(4).for_each(|px| {
        for c in px.iter_mut().take(3) {
            *c = saturate(alpha * *c as f32 + beta);
        }
    });
    out
}

pub fn sepia(img: &RgbaImage) -> RgbaImage {
    let mut out = img.clone();
    out.par_chunks_exact_mut(4).for_each(|px| {
        let rgb = [px[0] as f32, px[1] as f32, px[2] as f32];
        for (c, row) in SEPIA.iter().enumerate() {
            px[c] = saturate(row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2]);
        }
    });
    out
}

fn saturate(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use image::{ImageBuffer, Rgba, RgbaImage};

    use super::{CONTRAST_ALPHA, brightness_contrast, sepia};

    fn one_pixel(rgba: [u8; 4]) -> RgbaImage {
        ImageBuffer::from_pixel(1, 1, Rgba(rgba))
    }

    #[test]
    fn brightness_saturates_instead_of_wrapping() {
        let out = brightness_contrast(&one_pixel([200, 200, 200, 255]), CONTRAST_ALPHA, 300);
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn brightness_scales_and_offsets() {
        let out = brightness_contrast(&one_pixel([10, 20, 0, 128]), CONTRAST_ALPHA, 5);
        assert_eq!(out.get_pixel(0, 0).0, [27, 49, 5, 128]);
    }

    #[test]
    fn brightness_recompute_is_byte_identical() {
        let img = ImageBuffer::from_fn(16, 16, |x, y| Rgba([(x * 7) as u8, (y * 11) as u8, 33, 255]));
        let a = brightness_contrast(&img, CONTRAST_ALPHA, 37);
        let b = brightness_contrast(&img, CONTRAST_ALPHA, 37);
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn sepia_warms_neutral_grey() {
        let out = sepia(&one_pixel([100, 100, 100, 255]));
        let p = out.get_pixel(0, 0);
        assert!(p[0] > p[1] && p[1] > p[2]);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn sepia_saturates_white() {
        let out = sepia(&one_pixel([255, 255, 255, 255]));
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 239, 255]);
    }
}
