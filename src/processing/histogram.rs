use image::{GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};
use imageproc::contrast::equalize_histogram;
use imageproc::drawing::draw_line_segment_mut;

pub const PLOT_WIDTH: u32 = 512;
pub const PLOT_HEIGHT: u32 = 400;

const BINS: usize = 256;
const CHANNEL_COLORS: [Rgba<u8>; 3] = [
    Rgba([255, 0, 0, 255]),
    Rgba([0, 255, 0, 255]),
    Rgba([0, 0, 255, 255]),
];

/// Equalize luma in YCrCb space, leaving chroma alone.
pub fn equalize(img: &RgbaImage) -> RgbaImage {
    let (w, h) = img.dimensions();
    let mut chroma = Vec::with_capacity((w * h) as usize);
    let luma: GrayImage = ImageBuffer::from_fn(w, h, |x, y| {
        let p = img.get_pixel(x, y);
        let (y_val, cr, cb) = rgb_to_ycrcb(p[0] as f32, p[1] as f32, p[2] as f32);
        chroma.push((cr, cb));
        Luma([y_val.round().clamp(0.0, 255.0) as u8])
    });
    let equalized = equalize_histogram(&luma);

    let mut out = img.clone();
    for ((px, l), (cr, cb)) in out.pixels_mut().zip(equalized.pixels()).zip(chroma) {
        let (r, g, b) = ycrcb_to_rgb(l[0] as f32, cr, cb);
        px[0] = to_u8(r);
        px[1] = to_u8(g);
        px[2] = to_u8(b);
    }
    out
}

/// Per-channel 256-bin histograms in RGB order.
pub fn channel_histograms(img: &RgbaImage) -> [[u32; BINS]; 3] {
    let mut hist = [[0u32; BINS]; 3];
    for p in img.pixels() {
        for (c, bins) in hist.iter_mut().enumerate() {
            bins[p[c] as usize] += 1;
        }
    }
    hist
}

/// Line chart of the RGB histograms, each channel min-max normalized to the plot height.
pub fn plot(img: &RgbaImage) -> RgbaImage {
    let hist = channel_histograms(img);
    let mut canvas = RgbaImage::from_pixel(PLOT_WIDTH, PLOT_HEIGHT, Rgba([0, 0, 0, 255]));
    let bin_w = (PLOT_WIDTH as f32 / BINS as f32).round();
    let bottom = (PLOT_HEIGHT - 1) as f32;

    for (bins, color) in hist.iter().zip(CHANNEL_COLORS) {
        let heights = normalize(bins, PLOT_HEIGHT as f32);
        for i in 1..BINS {
            let start = (bin_w * (i - 1) as f32, (bottom - heights[i - 1]).max(0.0));
            let end = (bin_w * i as f32, (bottom - heights[i]).max(0.0));
            draw_line_segment_mut(&mut canvas, start, end, color);
        }
    }
    canvas
}

fn normalize(bins: &[u32; BINS], height: f32) -> [f32; BINS] {
    let min = bins.iter().copied().min().unwrap_or(0) as f32;
    let max = bins.iter().copied().max().unwrap_or(0) as f32;
    let mut out = [0.0; BINS];
    if max > min {
        for (o, &b) in out.iter_mut().zip(bins) {
            *o = ((b as f32 - min) / (max - min) * height).round();
        }
    }
    out
}

fn rgb_to_ycrcb(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cr = (r - y) * 0.713 + 128.0;
    let cb = (b - y) * 0.564 + 128.0;
    (y, cr, cb)
}

fn ycrcb_to_rgb(y: f32, cr: f32, cb: f32) -> (f32, f32, f32) {
    let r = y + 1.403 * (cr - 128.0);
    let g = y - 0.714 * (cr - 128.0) - 0.344 * (cb - 128.0);
    let b = y + 1.773 * (cb - 128.0);
    (r, g, b)
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
