//! File decode/encode. Formats are whatever the `image` crate was built with,
//! plus camera RAW through `rawler`.

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::{debug, info};

/// Suffix appended when a save path has no extension.
pub const DEFAULT_SUFFIX: &str = "jpg";
const JPEG_QUALITY: u8 = 90;

static RAW_EXTS: &[&str] = &["raf", "dng", "nef", "cr2", "arw"];

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    let Some(ext) = path.extension().map(|e| e.to_string_lossy()) else {
        return false;
    };
    exts.iter().any(|known| ext.eq_ignore_ascii_case(known))
}

pub fn is_raw_image(path: &Path) -> bool {
    has_extension(path, RAW_EXTS)
}

/// Extensions the open dialog should offer.
pub fn readable_extensions() -> Vec<&'static str> {
    let mut exts: Vec<&'static str> = ImageFormat::all()
        .filter(|f| f.reading_enabled())
        .flat_map(|f| f.extensions_str().iter().copied())
        .chain(RAW_EXTS.iter().copied())
        .collect();
    exts.sort_unstable();
    exts.dedup();
    exts
}

/// Extensions the save dialog should offer.
pub fn writable_extensions() -> Vec<&'static str> {
    let mut exts: Vec<&'static str> = ImageFormat::all()
        .filter(|f| f.writing_enabled())
        .flat_map(|f| f.extensions_str().iter().copied())
        .collect();
    exts.sort_unstable();
    exts.dedup();
    exts
}

/// Decode `path` to RGBA8, honouring the EXIF orientation tag.
pub fn decode(path: &Path) -> anyhow::Result<RgbaImage> {
    let img = open_image(path)?;
    let orientation = read_orientation(path);
    debug!(path = %path.display(), orientation, "decoded image");
    Ok(apply_orientation(img, orientation).into_rgba8())
}

fn open_image(path: &Path) -> anyhow::Result<DynamicImage> {
    if let Ok(img) = image::open(path) {
        return Ok(img);
    }
    if !is_raw_image(path) {
        // Re-attempt to get the original error message.
        return Ok(image::open(path)?);
    }

    let raw = rawler::decode_file(path)?;
    let develop = rawler::imgop::develop::RawDevelop::default();
    let intermediate = develop.develop_intermediate(&raw)?;
    intermediate
        .to_dynamic_image()
        .ok_or_else(|| anyhow::anyhow!("raw develop produced invalid image"))
}

/// EXIF orientation (1..=8), or 1 when absent or unreadable.
fn read_orientation(path: &Path) -> u32 {
    let Ok(file) = std::fs::File::open(path) else {
        return 1;
    };
    let mut reader = std::io::BufReader::new(file);
    let Ok(exif) = exif::Reader::new().read_from_container(&mut reader) else {
        return 1;
    };
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Where a save to `path` actually lands: paths without an extension get
/// [`DEFAULT_SUFFIX`].
pub fn resolve_save_path(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(DEFAULT_SUFFIX)
    }
}

/// Encode `img` to `path`, choosing the format from the extension.
/// Returns the path written.
pub fn encode(img: &RgbaImage, path: &Path) -> anyhow::Result<PathBuf> {
    let path = resolve_save_path(path);
    let format = ImageFormat::from_path(&path)?;
    if !format.writing_enabled() {
        anyhow::bail!("{format:?} images cannot be written");
    }

    let dynamic = DynamicImage::ImageRgba8(img.clone());
    match format {
        ImageFormat::Jpeg => {
            let file = std::fs::File::create(&path)?;
            let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), JPEG_QUALITY);
            DynamicImage::ImageRgb8(dynamic.to_rgb8()).write_with_encoder(encoder)?;
        }
        ImageFormat::Pnm => {
            DynamicImage::ImageRgb8(dynamic.to_rgb8()).save_with_format(&path, format)?;
        }
        _ => dynamic.save_with_format(&path, format)?,
    }
    info!(path = %path.display(), ?format, "image written");
    Ok(path)
}
