//! Preview sessions: a filter result shown to the user before it is committed.
//!
//! The controller is a two-state machine. `Idle` accepts `begin*`;
//! `Previewing` accepts parameter changes, `accept` and `cancel`. Anything
//! else is an [`EditError::InvalidState`].

use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, info};

use crate::error::{EditError, EditResult};
use crate::history::EditCommand;
use crate::image_state::Snapshot;
use crate::processing::{self, EffectKind, ParamRange, histogram, paint};
use crate::selection::{self, SelectionRect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewKind {
    Effect(EffectKind),
    Crop,
    Paint,
}

impl PreviewKind {
    pub fn label(self) -> &'static str {
        match self {
            PreviewKind::Effect(kind) => kind.label(),
            PreviewKind::Crop => "Crop",
            PreviewKind::Paint => "Paint",
        }
    }
}

/// Before/after histogram charts shown alongside an equalization preview.
#[derive(Debug, Clone)]
pub struct HistogramPair {
    pub before: RgbaImage,
    pub after: RgbaImage,
}

/// One filter invocation. Created fresh by every `begin`.
#[derive(Debug)]
pub struct PreviewSession {
    kind: PreviewKind,
    snapshot: Snapshot,
    working: Snapshot,
    range: Option<ParamRange>,
    parameter: Option<i32>,
    /// Generation of the newest recompute requested for this session.
    generation: u64,
    histograms: Option<HistogramPair>,
    strokes: Vec<paint::Stroke>,
    brush_color: [u8; 4],
}

impl PreviewSession {
    fn new(kind: PreviewKind, snapshot: Snapshot, working: Snapshot) -> Self {
        Self {
            kind,
            snapshot,
            working,
            range: None,
            parameter: None,
            generation: 0,
            histograms: None,
            strokes: Vec::new(),
            brush_color: [0, 0, 0, 255],
        }
    }

    pub fn kind(&self) -> PreviewKind {
        self.kind
    }

    /// The image the preview was started from.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn working(&self) -> &Snapshot {
        &self.working
    }

    pub fn parameter(&self) -> Option<i32> {
        self.parameter
    }

    pub fn range(&self) -> Option<ParamRange> {
        self.range
    }

    /// Whether the parameter control should be enabled for this preview.
    pub fn accepts_parameter(&self) -> bool {
        self.range.is_some()
    }

    pub fn histograms(&self) -> Option<&HistogramPair> {
        self.histograms.as_ref()
    }

    pub fn strokes(&self) -> &[paint::Stroke] {
        &self.strokes
    }

    pub fn brush_color(&self) -> [u8; 4] {
        self.brush_color
    }
}

/// A recompute that may run off the UI thread.
///
/// Only the result of the newest job for the open session is ever staged;
/// see [`PreviewController::complete`].
#[derive(Debug, Clone)]
pub struct RecomputeJob {
    pub generation: u64,
    pub kind: EffectKind,
    pub parameter: i32,
    pub source: Snapshot,
}

impl RecomputeJob {
    pub fn run(&self) -> RgbaImage {
        processing::apply(self.kind, &self.source, self.parameter)
    }
}

#[derive(Debug, Default)]
enum PreviewState {
    #[default]
    Idle,
    Previewing(PreviewSession),
}

#[derive(Debug)]
pub struct PreviewController {
    state: PreviewState,
    max_kernel: i32,
    next_generation: u64,
}

impl Default for PreviewController {
    fn default() -> Self {
        Self::new(processing::DEFAULT_MAX_KERNEL)
    }
}

impl PreviewController {
    pub fn new(max_kernel: i32) -> Self {
        Self {
            state: PreviewState::Idle,
            max_kernel,
            next_generation: 1,
        }
    }

    pub fn is_previewing(&self) -> bool {
        matches!(self.state, PreviewState::Previewing(_))
    }

    pub fn session(&self) -> Option<&PreviewSession> {
        match &self.state {
            PreviewState::Previewing(session) => Some(session),
            PreviewState::Idle => None,
        }
    }

    /// Start previewing `kind` on `current` at the effect's default parameter.
    pub fn begin(&mut self, kind: EffectKind, current: &Snapshot) -> EditResult<&PreviewSession> {
        self.ensure_idle()?;
        let range = kind.param_range(self.max_kernel);
        let parameter = range.map(|r| r.coerce(r.default));
        let working = Arc::new(processing::apply(kind, current, parameter.unwrap_or(0)));

        let mut session =
            PreviewSession::new(PreviewKind::Effect(kind), current.clone(), working.clone());
        session.range = range;
        session.parameter = parameter;
        if kind == EffectKind::HistogramEqualization {
            session.histograms = Some(HistogramPair {
                before: histogram::plot(current),
                after: histogram::plot(&working),
            });
        }
        info!(effect = kind.label(), ?parameter, "preview started");
        Ok(self.open(session))
    }

    /// Preview the region of `current` under `rect`. Degenerate regions are allowed.
    pub fn begin_crop(
        &mut self,
        current: &Snapshot,
        rect: &SelectionRect,
    ) -> EditResult<&PreviewSession> {
        self.ensure_idle()?;
        let cropped = Arc::new(selection::extract(current, rect));
        info!(
            width = cropped.width(),
            height = cropped.height(),
            "crop preview started"
        );
        Ok(self.open(PreviewSession::new(
            PreviewKind::Crop,
            current.clone(),
            cropped,
        )))
    }

    pub fn begin_paint(&mut self, current: &Snapshot) -> EditResult<&PreviewSession> {
        self.ensure_idle()?;
        let mut session = PreviewSession::new(PreviewKind::Paint, current.clone(), current.clone());
        session.range = Some(ParamRange {
            min: paint::MIN_BRUSH,
            max: paint::MAX_BRUSH,
            default: paint::DEFAULT_BRUSH,
            odd_kernel: false,
        });
        session.parameter = Some(paint::DEFAULT_BRUSH);
        info!("paint session started");
        Ok(self.open(session))
    }

    /// Coerce `value` and schedule a recompute from the original snapshot.
    ///
    /// Returns `None` when the new value needs no recompute (brush size).
    pub fn request_parameter(&mut self, value: i32) -> EditResult<Option<RecomputeJob>> {
        let generation = self.next_generation;
        let session = self.session_mut()?;
        let Some(range) = session.range else {
            return Err(EditError::InvalidState("effect has no adjustable parameter"));
        };
        let coerced = range.coerce(value);
        session.parameter = Some(coerced);

        let PreviewKind::Effect(kind) = session.kind else {
            return Ok(None);
        };
        session.generation = generation;
        let job = RecomputeJob {
            generation,
            kind,
            parameter: coerced,
            source: session.snapshot.clone(),
        };
        self.next_generation += 1;
        debug!(effect = kind.label(), requested = value, coerced, generation, "recompute requested");
        Ok(Some(job))
    }

    /// Stage a recompute result. Results from superseded requests, or from a
    /// session that has since closed, are dropped and `false` is returned.
    pub fn complete(&mut self, generation: u64, image: RgbaImage) -> bool {
        let PreviewState::Previewing(session) = &mut self.state else {
            debug!(generation, "recompute finished after preview closed");
            return false;
        };
        if session.generation != generation {
            debug!(
                generation,
                latest = session.generation,
                "discarding stale recompute"
            );
            return false;
        }
        session.working = Arc::new(image);
        true
    }

    /// Synchronous parameter change: coerce, recompute, stage. Returns the
    /// coerced value.
    pub fn on_parameter_changed(&mut self, value: i32) -> EditResult<i32> {
        if let Some(job) = self.request_parameter(value)? {
            let image = job.run();
            self.complete(job.generation, image);
        }
        Ok(self
            .session()
            .and_then(PreviewSession::parameter)
            .unwrap_or(value))
    }

    pub fn set_brush_color(&mut self, color: [u8; 4]) -> EditResult<()> {
        let session = self.paint_session_mut()?;
        session.brush_color = color;
        Ok(())
    }

    /// Add a stroke drawn with the current brush and redraw from the snapshot.
    pub fn add_stroke(&mut self, points: Vec<(f32, f32)>) -> EditResult<()> {
        let session = self.paint_session_mut()?;
        let size = session.parameter.unwrap_or(paint::DEFAULT_BRUSH).max(1) as u32;
        let mut stroke = paint::Stroke::new(session.brush_color, size);
        stroke.points = points;
        session.strokes.push(stroke);
        session.working = Arc::new(paint::render(&session.snapshot, &session.strokes));
        Ok(())
    }

    /// Turn the open preview into a history command and return to idle.
    pub fn accept(&mut self) -> EditResult<EditCommand> {
        let session = self.close("accept")?;
        info!(preview = session.kind.label(), "preview accepted");
        Ok(EditCommand::new(
            session.kind.label(),
            session.snapshot,
            session.working,
        ))
    }

    pub fn cancel(&mut self) -> EditResult<()> {
        let session = self.close("cancel")?;
        info!(preview = session.kind.label(), "preview cancelled");
        Ok(())
    }

    fn ensure_idle(&self) -> EditResult<()> {
        if self.is_previewing() {
            return Err(EditError::InvalidState("another preview is already open"));
        }
        Ok(())
    }

    fn open(&mut self, session: PreviewSession) -> &PreviewSession {
        self.state = PreviewState::Previewing(session);
        match &self.state {
            PreviewState::Previewing(session) => session,
            PreviewState::Idle => unreachable!("state was just set to previewing"),
        }
    }

    fn close(&mut self, action: &'static str) -> EditResult<PreviewSession> {
        match std::mem::take(&mut self.state) {
            PreviewState::Previewing(session) => Ok(session),
            PreviewState::Idle => {
                debug!(action, "no preview open");
                Err(EditError::InvalidState("no preview is open"))
            }
        }
    }

    fn session_mut(&mut self) -> EditResult<&mut PreviewSession> {
        match &mut self.state {
            PreviewState::Previewing(session) => Ok(session),
            PreviewState::Idle => Err(EditError::InvalidState("no preview is open")),
        }
    }

    fn paint_session_mut(&mut self) -> EditResult<&mut PreviewSession> {
        let session = self.session_mut()?;
        if session.kind != PreviewKind::Paint {
            return Err(EditError::InvalidState("no paint session is open"));
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::{ImageBuffer, Rgba};

    use super::{PreviewController, PreviewKind};
    use crate::error::EditError;
    use crate::image_state::Snapshot;
    use crate::processing::{self, EffectKind};
    use crate::selection::{Point, normalize};

    fn image() -> Snapshot {
        Arc::new(ImageBuffer::from_fn(16, 12, |x, y| {
            Rgba([(x * 15) as u8, (y * 20) as u8, 90, 255])
        }))
    }

    #[test]
    fn begin_computes_default_preview() {
        let img = image();
        let mut ctl = PreviewController::default();
        let session = ctl.begin(EffectKind::GaussianBlur, &img).unwrap();
        assert_eq!(session.parameter(), Some(3));
        assert!(session.accepts_parameter());
        let expected = processing::apply(EffectKind::GaussianBlur, &img, 3);
        assert_eq!(**session.working(), expected);
    }

    #[test]
    fn parameterless_effects_preview_immediately_without_slider() {
        let img = image();
        let mut ctl = PreviewController::default();
        let session = ctl.begin(EffectKind::Sepia, &img).unwrap();
        assert!(!session.accepts_parameter());
        assert_ne!(**session.working(), *img);
        assert!(matches!(
            ctl.on_parameter_changed(5),
            Err(EditError::InvalidState(_))
        ));
    }

    #[test]
    fn equalization_carries_histogram_plots() {
        let mut ctl = PreviewController::default();
        let session = ctl.begin(EffectKind::HistogramEqualization, &image()).unwrap();
        assert!(session.histograms().is_some());
    }

    #[test]
    fn parameter_change_coerces_and_recomputes_from_snapshot() {
        let img = image();
        let mut ctl = PreviewController::default();
        ctl.begin(EffectKind::MedianBlur, &img).unwrap();
        assert_eq!(ctl.on_parameter_changed(4).unwrap(), 5);
        assert_eq!(ctl.on_parameter_changed(0).unwrap(), 3);

        let session = ctl.session().unwrap();
        let expected = processing::apply(EffectKind::MedianBlur, &img, 3);
        assert_eq!(**session.working(), expected);
        assert!(Arc::ptr_eq(session.snapshot(), &img));
    }

    #[test]
    fn begin_while_previewing_is_rejected_and_preview_kept() {
        let img = image();
        let mut ctl = PreviewController::default();
        ctl.begin(EffectKind::Brightness, &img).unwrap();
        ctl.on_parameter_changed(40).unwrap();
        let before = ctl.session().unwrap().working().clone();

        let err = ctl.begin(EffectKind::GaussianBlur, &img).unwrap_err();
        assert!(matches!(err, EditError::InvalidState(_)));

        let session = ctl.session().unwrap();
        assert_eq!(session.kind(), PreviewKind::Effect(EffectKind::Brightness));
        assert_eq!(session.parameter(), Some(40));
        assert!(Arc::ptr_eq(session.working(), &before));
    }

    #[test]
    fn accept_emits_before_and_after() {
        let img = image();
        let mut ctl = PreviewController::default();
        ctl.begin(EffectKind::Brightness, &img).unwrap();
        ctl.on_parameter_changed(10).unwrap();
        let working = ctl.session().unwrap().working().clone();

        let cmd = ctl.accept().unwrap();
        assert_eq!(cmd.label, "Brightness");
        assert!(Arc::ptr_eq(&cmd.before, &img));
        assert!(Arc::ptr_eq(&cmd.after, &working));
        assert!(!ctl.is_previewing());
    }

    #[test]
    fn actions_outside_preview_are_invalid() {
        let mut ctl = PreviewController::default();
        assert!(matches!(ctl.accept(), Err(EditError::InvalidState(_))));
        assert!(matches!(ctl.cancel(), Err(EditError::InvalidState(_))));
        assert!(matches!(
            ctl.on_parameter_changed(3),
            Err(EditError::InvalidState(_))
        ));
    }

    #[test]
    fn cancel_returns_to_idle() {
        let mut ctl = PreviewController::default();
        ctl.begin(EffectKind::BilateralBlur, &image()).unwrap();
        ctl.cancel().unwrap();
        assert!(!ctl.is_previewing());
        assert!(ctl.begin(EffectKind::Sepia, &image()).is_ok());
    }

    #[test]
    fn stale_recompute_results_are_discarded() {
        let img = image();
        let mut ctl = PreviewController::default();
        ctl.begin(EffectKind::HomogeneousBlur, &img).unwrap();

        let older = ctl.request_parameter(5).unwrap().unwrap();
        let newer = ctl.request_parameter(9).unwrap().unwrap();
        assert!(newer.generation > older.generation);

        assert!(ctl.complete(newer.generation, newer.run()));
        assert!(!ctl.complete(older.generation, older.run()));

        let expected = processing::apply(EffectKind::HomogeneousBlur, &img, 9);
        assert_eq!(**ctl.session().unwrap().working(), expected);
    }

    #[test]
    fn results_arriving_after_close_are_dropped() {
        let mut ctl = PreviewController::default();
        ctl.begin(EffectKind::GaussianBlur, &image()).unwrap();
        let job = ctl.request_parameter(7).unwrap().unwrap();
        ctl.cancel().unwrap();
        assert!(!ctl.complete(job.generation, job.run()));
    }

    #[test]
    fn crop_preview_has_no_parameter() {
        let img = image();
        let mut ctl = PreviewController::default();
        let rect = normalize(Point::new(8, 6), Point::new(2, 1), 16, 12);
        let session = ctl.begin_crop(&img, &rect).unwrap();
        assert!(!session.accepts_parameter());
        assert_eq!(session.working().dimensions(), (7, 6));
    }

    #[test]
    fn paint_strokes_redraw_from_snapshot() {
        let img = image();
        let mut ctl = PreviewController::default();
        ctl.begin_paint(&img).unwrap();
        ctl.set_brush_color([255, 0, 255, 255]).unwrap();
        assert_eq!(ctl.on_parameter_changed(4).unwrap(), 4);
        ctl.add_stroke(vec![(3.0, 3.0), (10.0, 3.0)]).unwrap();

        let session = ctl.session().unwrap();
        assert_eq!(session.strokes().len(), 1);
        assert_eq!(session.strokes()[0].size, 4);
        assert_eq!(session.working().get_pixel(6, 3).0, [255, 0, 255, 255]);
        assert_eq!(*session.snapshot(), img);
    }

    #[test]
    fn strokes_need_a_paint_session() {
        let mut ctl = PreviewController::default();
        ctl.begin(EffectKind::Sepia, &image()).unwrap();
        assert!(matches!(
            ctl.add_stroke(vec![(1.0, 1.0)]),
            Err(EditError::InvalidState(_))
        ));
    }
}
