use std::sync::{Arc, mpsc};

use image::RgbaImage;
use tracing::debug;

use crate::error::EditResult;
use crate::image_state::Snapshot;
use crate::preview::{PreviewKind, RecomputeJob};
use crate::selection::Point;
use crate::session::EditSession;
use crate::viewport::Viewport;

enum BgResult {
    Recomputed { generation: u64, image: RgbaImage },
}

/// Something the user did on the canvas that the session has to act on.
pub enum CanvasEvent {
    Crop { anchor: Point, release: Point },
    Stroke(Vec<(f32, f32)>),
}

enum Drag {
    Crop { anchor: Point, pointer: egui::Pos2 },
    Paint { points: Vec<(f32, f32)> },
}

/// Draws the document and runs preview recomputes off the UI thread.
pub struct Viewer {
    texture: Option<egui::TextureHandle>,
    /// The snapshot `texture` was uploaded from.
    shown: Option<Snapshot>,
    histograms: Option<[egui::TextureHandle; 2]>,
    drag: Option<Drag>,
    /// A recompute is running on the worker.
    processing: bool,
    /// Newest job requested while the worker was busy. Older ones are
    /// superseded and never run.
    queued: Option<RecomputeJob>,
    tx: mpsc::SyncSender<BgResult>,
    rx: mpsc::Receiver<BgResult>,
}

impl Viewer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::sync_channel(8);
        Self {
            texture: None,
            shown: None,
            histograms: None,
            drag: None,
            processing: false,
            queued: None,
            tx,
            rx,
        }
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Set the open preview's parameter and schedule its recompute.
    pub fn request_parameter(
        &mut self,
        session: &mut EditSession,
        value: i32,
        ctx: &egui::Context,
    ) -> EditResult<()> {
        let Some(job) = session.request_parameter(value)? else {
            return Ok(());
        };
        if self.processing {
            self.queued = Some(job);
        } else {
            self.spawn(job, ctx);
        }
        Ok(())
    }

    fn spawn(&mut self, job: RecomputeJob, ctx: &egui::Context) {
        self.processing = true;
        let tx = self.tx.clone();
        let ctx2 = ctx.clone();
        std::thread::spawn(move || {
            let image = job.run();
            let _ = tx.send(BgResult::Recomputed {
                generation: job.generation,
                image,
            });
            ctx2.request_repaint();
        });
    }

    /// Hand finished recomputes to the session and start the queued one.
    pub fn drain(&mut self, session: &mut EditSession, ctx: &egui::Context) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                BgResult::Recomputed { generation, image } => {
                    self.processing = false;
                    if !session.complete_recompute(generation, image) {
                        debug!(generation, "recompute result dropped");
                    }
                }
            }
        }
        if !self.processing {
            if let Some(job) = self.queued.take() {
                if session.is_previewing() {
                    self.spawn(job, ctx);
                }
            }
        }
    }

    /// Re-upload the texture when the displayed snapshot changed.
    fn sync_texture(&mut self, ctx: &egui::Context, image: Option<&Snapshot>) {
        let same = match (&self.shown, image) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if same {
            return;
        }
        self.shown = image.cloned();
        self.texture = image
            .filter(|img| img.width() > 0 && img.height() > 0)
            .map(|img| ctx.load_texture("document", color_image(img), egui::TextureOptions::LINEAR));
    }

    fn sync_histograms(&mut self, ctx: &egui::Context, session: &EditSession) {
        match session.preview().and_then(|p| p.histograms()) {
            Some(pair) if self.histograms.is_none() => {
                let opts = egui::TextureOptions::LINEAR;
                self.histograms = Some([
                    ctx.load_texture("histogram_before", color_image(&pair.before), opts),
                    ctx.load_texture("histogram_after", color_image(&pair.after), opts),
                ]);
            }
            Some(_) => {}
            None => self.histograms = None,
        }
    }

    pub fn histogram_textures(&self) -> Option<&[egui::TextureHandle; 2]> {
        self.histograms.as_ref()
    }

    /// Draw the working image in a scroll area and translate pointer drags
    /// into crop selections or paint strokes.
    pub fn show_canvas(&mut self, ui: &mut egui::Ui, session: &EditSession) -> Option<CanvasEvent> {
        let ctx = ui.ctx().clone();
        self.sync_texture(&ctx, session.working());
        self.sync_histograms(&ctx, session);

        let Some(working) = session.working() else {
            ui.centered_and_justified(|ui| {
                ui.label("Open an image or paste one from the clipboard");
            });
            return None;
        };
        let Some(texture) = self.texture.clone() else {
            ui.centered_and_justified(|ui| {
                ui.label(format!(
                    "Empty selection ({}x{})",
                    working.width(),
                    working.height()
                ));
            });
            return None;
        };

        let cropping = session.crop_mode() && !session.is_previewing();
        let painting = session
            .preview()
            .is_some_and(|p| p.kind() == PreviewKind::Paint);
        let viewport = *session.viewport();
        let available = ui.available_size();

        let mut event = None;
        egui::ScrollArea::both()
            .id_salt("canvas_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let tex_size = texture.size_vec2();
                let scale = viewport.effective_scale(tex_size, available);
                let sense = if cropping || painting {
                    egui::Sense::click_and_drag()
                } else {
                    egui::Sense::hover()
                };
                let (rect, response) =
                    ui.allocate_exact_size(viewport.display_size(tex_size, available), sense);
                ui.painter().image(
                    texture.id(),
                    rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
                if self.processing {
                    ui.painter()
                        .rect_filled(rect, 0.0, egui::Color32::from_black_alpha(60));
                }
                let local = |p: egui::Pos2| (p - rect.min).to_pos2();

                if response.drag_started() {
                    let origin = ui.input(|i| i.pointer.press_origin());
                    if let Some(pos) = origin.or(response.interact_pointer_pos()) {
                        self.drag = if cropping {
                            Some(Drag::Crop {
                                anchor: Viewport::to_image(local(pos), scale),
                                pointer: pos,
                            })
                        } else if painting {
                            let p = local(pos);
                            Some(Drag::Paint {
                                points: vec![(p.x / scale, p.y / scale)],
                            })
                        } else {
                            None
                        };
                    }
                }

                if response.dragged() {
                    if let Some(pos) = response.interact_pointer_pos() {
                        match &mut self.drag {
                            Some(Drag::Crop { pointer, .. }) => *pointer = pos,
                            Some(Drag::Paint { points }) => {
                                let p = local(pos);
                                points.push((p.x / scale, p.y / scale));
                            }
                            None => {}
                        }
                    }
                }

                match &self.drag {
                    Some(Drag::Crop { anchor, pointer }) => {
                        let start = rect.min
                            + egui::vec2(anchor.x as f32 * scale, anchor.y as f32 * scale);
                        ui.painter().rect_stroke(
                            egui::Rect::from_two_pos(start, *pointer),
                            0.0,
                            egui::Stroke::new(1.0, egui::Color32::WHITE),
                            egui::StrokeKind::Middle,
                        );
                    }
                    Some(Drag::Paint { points }) if points.len() > 1 => {
                        let screen: Vec<egui::Pos2> = points
                            .iter()
                            .map(|&(x, y)| rect.min + egui::vec2(x * scale, y * scale))
                            .collect();
                        let width = session
                            .preview()
                            .and_then(|p| p.parameter())
                            .unwrap_or(1) as f32
                            * scale;
                        let [r, g, b, a] = session
                            .preview()
                            .map(|p| p.brush_color())
                            .unwrap_or([0, 0, 0, 255]);
                        ui.painter().add(egui::Shape::line(
                            screen,
                            egui::Stroke::new(width, egui::Color32::from_rgba_unmultiplied(r, g, b, a)),
                        ));
                    }
                    _ => {}
                }

                if response.drag_stopped() {
                    event = match self.drag.take() {
                        Some(Drag::Crop { anchor, pointer }) => Some(CanvasEvent::Crop {
                            anchor,
                            release: Viewport::to_image(local(pointer), scale),
                        }),
                        Some(Drag::Paint { points }) => Some(CanvasEvent::Stroke(points)),
                        None => None,
                    };
                }
            });
        event
    }
}

fn color_image(img: &RgbaImage) -> egui::ColorImage {
    let size = [img.width() as usize, img.height() as usize];
    egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw())
}
