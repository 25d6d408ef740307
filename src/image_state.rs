use std::sync::Arc;

use image::RgbaImage;

/// Shared, immutable-by-convention bitmap. Cloning only bumps a refcount.
pub type Snapshot = Arc<RgbaImage>;

/// Holds the committed document image and the staged preview image.
///
/// `current` is only ever replaced through [`ImageState::commit`] (edits) or
/// [`ImageState::replace`] (a new document); `working` is scratch space owned
/// by whatever preview is open.
#[derive(Debug, Clone)]
pub struct ImageState {
    current: Snapshot,
    working: Snapshot,
}

impl ImageState {
    pub fn new(image: Snapshot) -> Self {
        Self {
            working: image.clone(),
            current: image,
        }
    }

    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    pub fn working(&self) -> &Snapshot {
        &self.working
    }

    /// Reset the working image to the committed one at the start of a preview.
    pub fn begin_working(&mut self) {
        self.working = self.current.clone();
    }

    /// Stage a preview result without touching `current`.
    pub fn stage(&mut self, image: Snapshot) {
        self.working = image;
    }

    pub fn commit(&mut self, image: Snapshot) {
        self.current = image;
        self.working = self.current.clone();
    }

    pub fn discard_preview(&mut self) {
        self.working = self.current.clone();
    }

    /// Swap in a freshly loaded or pasted document.
    pub fn replace(&mut self, image: Snapshot) {
        self.commit(image);
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.current.dimensions()
    }
}
