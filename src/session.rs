use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::actions::ActionState;
use crate::clipboard::ImageClipboard;
use crate::codec;
use crate::error::{EditError, EditResult};
use crate::history::History;
use crate::image_state::{ImageState, Snapshot};
use crate::preview::{PreviewController, PreviewSession, RecomputeJob};
use crate::processing::EffectKind;
use crate::selection::{self, Point};
use crate::viewport::Viewport;

/// Bit depth reported in status messages; documents are always RGBA8.
const DEPTH: u32 = 32;

/// The open document and everything that edits it.
///
/// Every operation either succeeds and returns a status line, or fails and
/// leaves the session exactly as it was.
#[derive(Debug)]
pub struct EditSession {
    image: Option<ImageState>,
    history: History,
    preview: PreviewController,
    viewport: Viewport,
    crop_mode: bool,
    path: Option<PathBuf>,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(crate::processing::DEFAULT_MAX_KERNEL)
    }
}

impl EditSession {
    pub fn new(max_kernel: i32) -> Self {
        Self {
            image: None,
            history: History::new(),
            preview: PreviewController::new(max_kernel),
            viewport: Viewport::default(),
            crop_mode: false,
            path: None,
        }
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.image.as_ref().map(ImageState::current)
    }

    /// The image to display: the preview while one is open, else the document.
    pub fn working(&self) -> Option<&Snapshot> {
        self.image.as_ref().map(ImageState::working)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn preview(&self) -> Option<&PreviewSession> {
        self.preview.session()
    }

    pub fn is_previewing(&self) -> bool {
        self.preview.is_previewing()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn crop_mode(&self) -> bool {
        self.crop_mode
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn action_state(&self) -> ActionState {
        ActionState {
            has_image: self.has_image(),
            crop_mode: self.crop_mode,
            fit_to_window: self.viewport.fit_to_window(),
        }
    }

    pub fn load(&mut self, path: &Path) -> EditResult<String> {
        self.ensure_no_preview()?;
        let image = codec::decode(path).map_err(|source| EditError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let (w, h) = image.dimensions();
        self.set_image(image);
        self.path = Some(path.to_path_buf());
        info!(path = %path.display(), w, h, "opened image");
        Ok(format!(
            "Opened \"{}\", {w}x{h}, Depth: {DEPTH}",
            path.display()
        ))
    }

    /// Make `image` the new document. History from the previous document is
    /// dropped and the viewport returns to 1:1.
    pub fn set_image(&mut self, image: RgbaImage) {
        match &mut self.image {
            Some(state) => state.replace(Arc::new(image)),
            None => self.image = Some(ImageState::new(Arc::new(image))),
        }
        self.history.clear();
        self.viewport.reset();
        self.path = None;
    }

    pub fn save_as(&mut self, path: &Path) -> EditResult<String> {
        let current = self.require_image()?.current().clone();
        let written = codec::encode(&current, path).map_err(|source| EditError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %written.display(), "wrote image");
        let message = format!("Wrote \"{}\"", written.display());
        self.path = Some(written);
        Ok(message)
    }

    pub fn copy(&self, clipboard: &mut impl ImageClipboard) -> EditResult<String> {
        let current = self.require_image()?.current();
        clipboard.write_image(current)?;
        debug!(w = current.width(), h = current.height(), "copied to clipboard");
        Ok(format!(
            "Copied {}x{} to clipboard",
            current.width(),
            current.height()
        ))
    }

    pub fn paste(&mut self, clipboard: &mut impl ImageClipboard) -> EditResult<String> {
        self.ensure_no_preview()?;
        let image = clipboard.read_image()?.ok_or(EditError::EmptyClipboard)?;
        let (w, h) = image.dimensions();
        self.set_image(image);
        info!(w, h, "pasted image from clipboard");
        Ok(format!(
            "Obtained image from clipboard, {w}x{h}, Depth: {DEPTH}"
        ))
    }

    pub fn begin_effect(&mut self, kind: EffectKind) -> EditResult<String> {
        let current = self.require_image()?.current().clone();
        let working = self.preview.begin(kind, &current)?.working().clone();
        self.stage(working);
        Ok(format!("Previewing {}", kind.label()))
    }

    /// Change the open preview's parameter and recompute synchronously.
    /// Returns the value actually used after coercion.
    pub fn set_parameter(&mut self, value: i32) -> EditResult<i32> {
        let coerced = self.preview.on_parameter_changed(value)?;
        self.sync_working();
        Ok(coerced)
    }

    /// Change the parameter but leave the recompute to the caller, typically
    /// on a worker thread. Feed the result back through [`Self::complete_recompute`].
    pub fn request_parameter(&mut self, value: i32) -> EditResult<Option<RecomputeJob>> {
        let job = self.preview.request_parameter(value)?;
        if job.is_none() {
            self.sync_working();
        }
        Ok(job)
    }

    /// Stage a finished recompute. Stale generations are ignored.
    pub fn complete_recompute(&mut self, generation: u64, image: RgbaImage) -> bool {
        let staged = self.preview.complete(generation, image);
        if staged {
            self.sync_working();
        }
        staged
    }

    /// Preview the selection dragged from `anchor` to `release`, both in
    /// image pixel coordinates.
    pub fn begin_crop(&mut self, anchor: Point, release: Point) -> EditResult<String> {
        if !self.crop_mode {
            return Err(EditError::InvalidState("crop mode is off"));
        }
        let state = self.require_image()?;
        let (width, height) = state.dimensions();
        let current = state.current().clone();
        let rect = selection::normalize(anchor, release, width, height);
        let working = self.preview.begin_crop(&current, &rect)?.working().clone();
        self.stage(working);
        if rect.is_degenerate() {
            return Ok("Empty selection".to_string());
        }
        Ok(format!(
            "Selected {}x{} at ({}, {})",
            rect.width(),
            rect.height(),
            rect.top_left.x,
            rect.top_left.y
        ))
    }

    pub fn begin_paint(&mut self) -> EditResult<String> {
        let current = self.require_image()?.current().clone();
        let working = self.preview.begin_paint(&current)?.working().clone();
        self.stage(working);
        Ok("Painting".to_string())
    }

    pub fn set_brush_color(&mut self, color: [u8; 4]) -> EditResult<()> {
        self.preview.set_brush_color(color)
    }

    /// Add a stroke through `points` (image coordinates) to the paint preview.
    pub fn paint_stroke(&mut self, points: Vec<(f32, f32)>) -> EditResult<()> {
        self.preview.add_stroke(points)?;
        self.sync_working();
        Ok(())
    }

    pub fn accept(&mut self) -> EditResult<String> {
        let command = self.preview.accept()?;
        let label = command.label.clone();
        let after = self.history.push(command);
        if let Some(state) = &mut self.image {
            state.commit(after);
        }
        Ok(format!("Applied {label}"))
    }

    pub fn cancel(&mut self) -> EditResult<String> {
        let label = self
            .preview
            .session()
            .map(|s| s.kind().label())
            .unwrap_or_default();
        self.preview.cancel()?;
        if let Some(state) = &mut self.image {
            state.discard_preview();
        }
        Ok(format!("Cancelled {label}"))
    }

    pub fn undo(&mut self) -> EditResult<String> {
        self.ensure_no_preview()?;
        let label = self.history.undo_label().unwrap_or_default().to_string();
        let image = self.history.undo()?;
        self.commit_from_history(image);
        Ok(format!("Undo {label}"))
    }

    pub fn redo(&mut self) -> EditResult<String> {
        self.ensure_no_preview()?;
        let label = self.history.redo_label().unwrap_or_default().to_string();
        let image = self.history.redo()?;
        self.commit_from_history(image);
        Ok(format!("Redo {label}"))
    }

    pub fn set_crop_mode(&mut self, on: bool) -> EditResult<()> {
        if on {
            self.require_image()?;
            if self.viewport.fit_to_window() {
                return Err(EditError::InvalidState(
                    "crop mode is unavailable while fitting to window",
                ));
            }
            // Selections map through the plain scale, so start at 1:1.
            self.viewport.normal_size();
        }
        debug!(on, "crop mode");
        self.crop_mode = on;
        Ok(())
    }

    pub fn set_fit_to_window(&mut self, fit: bool) -> EditResult<()> {
        if fit && self.crop_mode {
            return Err(EditError::InvalidState(
                "fit to window is unavailable in crop mode",
            ));
        }
        self.viewport.set_fit_to_window(fit);
        Ok(())
    }

    fn require_image(&self) -> EditResult<&ImageState> {
        self.image.as_ref().ok_or(EditError::NoImage)
    }

    fn ensure_no_preview(&self) -> EditResult<()> {
        if self.preview.is_previewing() {
            warn!("rejected while a preview is open");
            return Err(EditError::InvalidState("close the open preview first"));
        }
        Ok(())
    }

    fn stage(&mut self, working: Snapshot) {
        if let Some(state) = &mut self.image {
            state.begin_working();
            state.stage(working);
        }
    }

    fn sync_working(&mut self) {
        if let Some(working) = self.preview.session().map(|s| s.working().clone()) {
            self.stage(working);
        }
    }

    fn commit_from_history(&mut self, image: Snapshot) {
        if let Some(state) = &mut self.image {
            state.commit(image);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::{ImageBuffer, Rgba, RgbaImage};

    use super::EditSession;
    use crate::clipboard::MemoryClipboard;
    use crate::error::EditError;
    use crate::processing::{self, EffectKind};
    use crate::selection::Point;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        ImageBuffer::from_fn(w, h, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8, 255])
        })
    }

    fn loaded(img: RgbaImage) -> EditSession {
        let mut session = EditSession::default();
        session.set_image(img);
        session
    }

    #[test]
    fn sepia_gaussian_cancel_then_undo_returns_to_original() {
        let i0 = gradient(16, 12);
        let mut session = loaded(i0.clone());

        session.begin_effect(EffectKind::Sepia).unwrap();
        session.accept().unwrap();
        let i1 = processing::apply(EffectKind::Sepia, &i0, 0);
        assert_eq!(**session.current().unwrap(), i1);
        assert_eq!(session.history().len(), 1);

        session.begin_effect(EffectKind::GaussianBlur).unwrap();
        assert_eq!(session.set_parameter(4).unwrap(), 5);
        assert_eq!(
            **session.working().unwrap(),
            processing::apply(EffectKind::GaussianBlur, &i1, 5)
        );
        session.cancel().unwrap();
        assert_eq!(**session.current().unwrap(), i1);
        assert_eq!(session.history().len(), 1);

        session.undo().unwrap();
        assert_eq!(**session.current().unwrap(), i0);
        assert_eq!(session.history().cursor(), 0);
    }

    #[test]
    fn undoing_every_edit_restores_the_loaded_image() {
        let i0 = gradient(10, 10);
        let mut session = loaded(i0.clone());
        for _ in 0..3 {
            session.begin_effect(EffectKind::Sepia).unwrap();
            session.accept().unwrap();
        }
        assert_ne!(**session.current().unwrap(), i0);

        while session.undo().is_ok() {}
        assert_eq!(session.history().cursor(), 0);
        assert_eq!(**session.current().unwrap(), i0);
    }

    #[test]
    fn brush_size_changes_without_recompute() {
        let img = gradient(8, 8);
        let mut session = loaded(img.clone());
        session.begin_paint().unwrap();
        assert_eq!(session.set_parameter(12).unwrap(), 12);
        assert_eq!(session.preview().unwrap().parameter(), Some(12));
        assert_eq!(**session.working().unwrap(), img);
    }

    #[test]
    fn preview_leaves_current_untouched() {
        let i0 = gradient(8, 8);
        let mut session = loaded(i0.clone());
        session.begin_effect(EffectKind::Brightness).unwrap();
        session.set_parameter(40).unwrap();
        assert_eq!(**session.current().unwrap(), i0);
        assert_ne!(**session.working().unwrap(), i0);
    }

    #[test]
    fn second_preview_is_rejected_and_first_survives() {
        let mut session = loaded(gradient(8, 8));
        session.begin_effect(EffectKind::MedianBlur).unwrap();
        session.set_parameter(7).unwrap();
        let before = session.working().unwrap().clone();

        let err = session.begin_effect(EffectKind::Sepia).unwrap_err();
        assert!(matches!(err, EditError::InvalidState(_)));
        let open = session.preview().unwrap();
        assert_eq!(open.parameter(), Some(7));
        assert!(Arc::ptr_eq(session.working().unwrap(), &before));
    }

    #[test]
    fn undo_and_redo_are_refused_while_previewing() {
        let mut session = loaded(gradient(8, 8));
        session.begin_effect(EffectKind::Sepia).unwrap();
        session.accept().unwrap();
        session.begin_effect(EffectKind::Brightness).unwrap();
        assert!(matches!(session.undo(), Err(EditError::InvalidState(_))));
        assert!(matches!(session.redo(), Err(EditError::InvalidState(_))));
        assert_eq!(session.history().cursor(), 1);
    }

    #[test]
    fn undo_with_empty_history_fails_without_change() {
        let i0 = gradient(4, 4);
        let mut session = loaded(i0.clone());
        assert!(matches!(session.undo(), Err(EditError::EmptyHistory(_))));
        assert!(matches!(session.redo(), Err(EditError::EmptyHistory(_))));
        assert_eq!(**session.current().unwrap(), i0);
    }

    #[test]
    fn crop_requires_crop_mode() {
        let mut session = loaded(gradient(100, 100));
        let err = session
            .begin_crop(Point::new(10, 10), Point::new(20, 20))
            .unwrap_err();
        assert!(matches!(err, EditError::InvalidState(_)));
        assert!(!session.is_previewing());
    }

    #[test]
    fn crop_from_reversed_drag_is_normalized() {
        let img = gradient(100, 100);
        let mut session = loaded(img.clone());
        session.set_crop_mode(true).unwrap();
        session
            .begin_crop(Point::new(50, 10), Point::new(10, 50))
            .unwrap();
        assert_eq!(session.working().unwrap().dimensions(), (41, 41));
        session.accept().unwrap();

        let current = session.current().unwrap();
        assert_eq!(current.dimensions(), (41, 41));
        assert_eq!(current.get_pixel(0, 0), img.get_pixel(10, 10));
        session.undo().unwrap();
        assert_eq!(**session.current().unwrap(), img);
    }

    #[test]
    fn selection_outside_the_image_previews_empty() {
        let mut session = loaded(gradient(20, 20));
        session.set_crop_mode(true).unwrap();
        let message = session
            .begin_crop(Point::new(30, 30), Point::new(40, 40))
            .unwrap();
        assert_eq!(message, "Empty selection");
        assert_eq!(session.working().unwrap().width(), 0);
        session.cancel().unwrap();
        assert_eq!(session.current().unwrap().dimensions(), (20, 20));
    }

    #[test]
    fn crop_mode_is_refused_while_fitting_to_window() {
        let mut session = loaded(gradient(10, 10));
        session.set_fit_to_window(true).unwrap();
        assert!(session.set_crop_mode(true).is_err());
        assert!(!session.crop_mode());
        assert!(!session.action_state().enabled(crate::actions::Action::CropMode));
    }

    #[test]
    fn crop_mode_needs_an_image() {
        let mut session = EditSession::default();
        assert!(matches!(session.set_crop_mode(true), Err(EditError::NoImage)));
    }

    #[test]
    fn effects_need_an_image() {
        let mut session = EditSession::default();
        assert!(matches!(
            session.begin_effect(EffectKind::Sepia),
            Err(EditError::NoImage)
        ));
        assert!(!session.is_previewing());
    }

    #[test]
    fn paint_strokes_commit_as_one_edit() {
        let img = ImageBuffer::from_pixel(40, 40, Rgba([255, 255, 255, 255]));
        let mut session = loaded(img.clone());
        session.begin_paint().unwrap();
        session.set_brush_color([255, 0, 0, 255]).unwrap();
        session.paint_stroke(vec![(5.0, 20.0), (35.0, 20.0)]).unwrap();
        session.paint_stroke(vec![(20.0, 5.0), (20.0, 35.0)]).unwrap();
        assert_eq!(**session.current().unwrap(), img);

        session.accept().unwrap();
        assert_eq!(session.history().len(), 1);
        assert_eq!(*session.current().unwrap().get_pixel(20, 20), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn async_recompute_drops_stale_results() {
        let img = gradient(12, 12);
        let mut session = loaded(img.clone());
        session.begin_effect(EffectKind::Brightness).unwrap();

        let first = session.request_parameter(10).unwrap().unwrap();
        let second = session.request_parameter(60).unwrap().unwrap();
        let newest = second.run();
        assert!(session.complete_recompute(second.generation, newest.clone()));
        assert!(!session.complete_recompute(first.generation, first.run()));
        assert_eq!(**session.working().unwrap(), newest);
    }

    #[test]
    fn paste_replaces_document_and_clears_history() {
        let mut clip = MemoryClipboard::default();
        let mut session = loaded(gradient(8, 8));
        session.begin_effect(EffectKind::Sepia).unwrap();
        session.accept().unwrap();

        let pasted = gradient(5, 3);
        session.copy(&mut clip).unwrap();
        let mut other = MemoryClipboard::default();
        crate::clipboard::ImageClipboard::write_image(&mut other, &pasted).unwrap();

        let message = session.paste(&mut other).unwrap();
        assert_eq!(message, "Obtained image from clipboard, 5x3, Depth: 32");
        assert_eq!(**session.current().unwrap(), pasted);
        assert!(session.history().is_empty());
        assert!(session.path().is_none());
    }

    #[test]
    fn paste_from_empty_clipboard_keeps_document() {
        let img = gradient(6, 6);
        let mut session = loaded(img.clone());
        let err = session.paste(&mut MemoryClipboard::default()).unwrap_err();
        assert_eq!(err.to_string(), "No image in clipboard");
        assert_eq!(**session.current().unwrap(), img);
    }

    #[test]
    fn copy_puts_current_image_on_clipboard() {
        let img = gradient(6, 4);
        let session = loaded(img.clone());
        let mut clip = MemoryClipboard::default();
        session.copy(&mut clip).unwrap();
        let read = crate::clipboard::ImageClipboard::read_image(&mut clip).unwrap();
        assert_eq!(read, Some(img));
    }

    #[test]
    fn save_then_load_reports_status() {
        let dir = std::env::temp_dir().join(format!("retouch-session-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("doc.png");

        let img = gradient(9, 7);
        let mut session = loaded(img.clone());
        let wrote = session.save_as(&path).unwrap();
        assert_eq!(wrote, format!("Wrote \"{}\"", path.display()));

        let mut reopened = EditSession::default();
        let opened = reopened.load(&path).unwrap();
        assert_eq!(opened, format!("Opened \"{}\", 9x7, Depth: 32", path.display()));
        assert_eq!(**reopened.current().unwrap(), img);
        assert_eq!(reopened.path(), Some(path.as_path()));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_save_keeps_document_and_path() {
        let img = gradient(5, 5);
        let mut session = loaded(img.clone());
        let target = std::env::temp_dir().join(format!(
            "retouch-session-{}-doc.notaformat",
            std::process::id()
        ));
        let err = session.save_as(&target).unwrap_err();
        assert!(matches!(err, EditError::Encode { .. }));
        assert!(err.is_dialog_worthy());
        assert!(session.path().is_none());
        assert_eq!(**session.current().unwrap(), img);
        assert!(!target.exists());
    }

    #[test]
    fn failed_load_keeps_previous_document() {
        let img = gradient(4, 4);
        let mut session = loaded(img.clone());
        let missing = std::env::temp_dir().join("retouch-definitely-missing.png");
        let err = session.load(&missing).unwrap_err();
        assert!(err.is_dialog_worthy());
        assert_eq!(**session.current().unwrap(), img);
    }

    #[test]
    fn new_document_resets_zoom() {
        let mut session = loaded(gradient(4, 4));
        session.viewport_mut().zoom_in();
        session.set_image(gradient(2, 2));
        assert_eq!(session.viewport().scale(), 1.0);
    }
}
