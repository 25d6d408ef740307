use std::borrow::Cow;

use image::RgbaImage;
use tracing::debug;

use crate::error::{EditError, EditResult};

/// Where Copy and Paste exchange images.
pub trait ImageClipboard {
    /// `Ok(None)` when the clipboard holds no image.
    fn read_image(&mut self) -> EditResult<Option<RgbaImage>>;
    fn write_image(&mut self, img: &RgbaImage) -> EditResult<()>;
}

/// The OS clipboard, opened per operation.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl ImageClipboard for SystemClipboard {
    fn read_image(&mut self) -> EditResult<Option<RgbaImage>> {
        let mut clip = arboard::Clipboard::new().map_err(|e| EditError::Clipboard(e.to_string()))?;
        match clip.get_image() {
            Ok(data) => Ok(RgbaImage::from_raw(
                data.width as u32,
                data.height as u32,
                data.bytes.into_owned(),
            )),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(err) => {
                debug!(%err, "clipboard read failed");
                Err(EditError::Clipboard(err.to_string()))
            }
        }
    }

    fn write_image(&mut self, img: &RgbaImage) -> EditResult<()> {
        let mut clip = arboard::Clipboard::new().map_err(|e| EditError::Clipboard(e.to_string()))?;
        let data = arboard::ImageData {
            width: img.width() as usize,
            height: img.height() as usize,
            bytes: Cow::Borrowed(img.as_raw()),
        };
        clip.set_image(data)
            .map_err(|e| EditError::Clipboard(e.to_string()))
    }
}

/// In-process clipboard for exercising copy/paste without a display server.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    image: Option<RgbaImage>,
}

#[cfg(test)]
impl ImageClipboard for MemoryClipboard {
    fn read_image(&mut self) -> EditResult<Option<RgbaImage>> {
        Ok(self.image.clone())
    }

    fn write_image(&mut self, img: &RgbaImage) -> EditResult<()> {
        self.image = Some(img.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use image::{ImageBuffer, Rgba};

    use super::{ImageClipboard, MemoryClipboard};

    #[test]
    fn memory_clipboard_starts_empty() {
        assert!(MemoryClipboard::default().read_image().unwrap().is_none());
    }

    #[test]
    fn memory_clipboard_returns_last_write() {
        let mut clip = MemoryClipboard::default();
        clip.write_image(&ImageBuffer::from_pixel(2, 2, Rgba([1, 2, 3, 4])))
            .unwrap();
        clip.write_image(&ImageBuffer::from_pixel(1, 1, Rgba([9, 9, 9, 9])))
            .unwrap();
        let img = clip.read_image().unwrap().unwrap();
        assert_eq!(img.dimensions(), (1, 1));
    }
}
