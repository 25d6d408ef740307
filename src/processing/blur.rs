use image::{GrayImage, ImageBuffer, Luma, RgbaImage};
use imageproc::filter::{box_filter, gaussian_blur_f32, median_filter};
use rayon::prelude::*;

/// Normalized `k x k` box filter, applied to each colour channel.
pub fn homogeneous(img: &RgbaImage, k: u32) -> RgbaImage {
    let radius = k / 2;
    let mut out = img.clone();
    for c in 0..3 {
        let channel = extract_channel(img, c);
        let blurred = box_filter(&channel, radius, radius);
        for (px, v) in out.pixels_mut().zip(blurred.pixels()) {
            px[c] = v[0];
        }
    }
    out
}

/// Gaussian blur with the sigma a `k`-wide kernel implies.
pub fn gaussian(img: &RgbaImage, k: u32) -> RgbaImage {
    let mut out = gaussian_blur_f32(img, kernel_sigma(k));
    for (px, src) in out.pixels_mut().zip(img.pixels()) {
        px[3] = src[3];
    }
    out
}

pub fn median(img: &RgbaImage, k: u32) -> RgbaImage {
    let radius = k / 2;
    median_filter(img, radius, radius)
}

/// Edge-preserving blur over a circular window of diameter `k`.
///
/// Colour sigma is `2k`, spatial sigma is `k / 2`; colour distance is the L1
/// distance over RGB, edges replicate.
pub fn bilateral(img: &RgbaImage, k: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let radius = (k / 2) as i32;
    let sigma_color = 2.0 * k as f32;
    let sigma_space = (k / 2).max(1) as f32;
    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);

    let mut window = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r = ((dx * dx + dy * dy) as f32).sqrt();
            if r > radius as f32 {
                continue;
            }
            window.push((dx, dy, (r * r * space_coeff).exp()));
        }
    }
    let color_weight: Vec<f32> = (0..=255 * 3)
        .map(|d| ((d * d) as f32 * color_coeff).exp())
        .collect();

    let mut out = RgbaImage::new(w, h);
    let row_len = w as usize * 4;
    out.par_chunks_exact_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i32;
            for x in 0..w as i32 {
                let center = img.get_pixel(x as u32, y as u32);
                let mut sum = [0.0f32; 3];
                let mut weight_sum = 0.0f32;
                for &(dx, dy, ws) in &window {
                    let sx = (x + dx).clamp(0, w as i32 - 1) as u32;
                    let sy = (y + dy).clamp(0, h as i32 - 1) as u32;
                    let p = img.get_pixel(sx, sy);
                    let dist: u32 = (0..3)
                        .map(|c| (p[c] as i32 - center[c] as i32).unsigned_abs())
                        .sum();
                    let wt = ws * color_weight[dist as usize];
                    for c in 0..3 {
                        sum[c] += wt * p[c] as f32;
                    }
                    weight_sum += wt;
                }
                let o = &mut row[x as usize * 4..x as usize * 4 + 4];
                for c in 0..3 {
                    o[c] = (sum[c] / weight_sum).round().clamp(0.0, 255.0) as u8;
                }
                o[3] = center[3];
            }
        });
    out
}

/// Sigma for a Gaussian kernel of width `k` when none is given explicitly.
pub fn kernel_sigma(k: u32) -> f32 {
    0.3 * ((k as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

fn extract_channel(img: &RgbaImage, c: usize) -> GrayImage {
    ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
        Luma([img.get_pixel(x, y)[c]])
    })
}
