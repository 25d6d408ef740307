use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::actions::{Action, Menu};
use crate::clipboard::SystemClipboard;
use crate::codec;
use crate::config::AppConfig;
use crate::error::{EditError, EditResult};
use crate::preview::PreviewKind;
use crate::processing::EffectKind;
use crate::session::EditSession;
use crate::viewer::{CanvasEvent, Viewer};

const APP_NAME: &str = "Retouch";

pub struct RetouchApp {
    session: EditSession,
    viewer: Viewer,
    clipboard: SystemClipboard,
    config: AppConfig,
    status: String,
    error_dialog: Option<String>,
    show_about: bool,
    title: String,
}

impl RetouchApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        initial: Option<PathBuf>,
    ) -> Self {
        let session = EditSession::new(config.max_kernel());
        let mut app = Self {
            session,
            viewer: Viewer::new(),
            clipboard: SystemClipboard,
            config,
            status: String::new(),
            error_dialog: None,
            show_about: false,
            title: APP_NAME.to_string(),
        };
        if let Some(path) = initial {
            let result = app.load(&path);
            app.report(result);
        }
        app
    }

    /// Whether `action` can run right now. An open preview or error dialog
    /// blocks everything except leaving the program.
    fn is_enabled(&self, action: Action) -> bool {
        let blocked = self.session.is_previewing() || self.error_dialog.is_some();
        if blocked && !matches!(action, Action::About | Action::Exit) {
            return false;
        }
        self.session.action_state().enabled(action)
    }

    fn run(&mut self, action: Action, ctx: &egui::Context) {
        if !self.is_enabled(action) {
            return;
        }
        let result = match action {
            Action::Open => match self.pick_open_path() {
                Some(path) => self.load(&path),
                None => return,
            },
            Action::SaveAs => match self.pick_save_path() {
                Some(path) => self.save(&path),
                None => return,
            },
            Action::Exit => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                return;
            }
            Action::Copy => self.session.copy(&mut self.clipboard),
            Action::Paste => self.session.paste(&mut self.clipboard),
            Action::CropMode => {
                let on = !self.session.crop_mode();
                self.session.set_crop_mode(on).map(|()| {
                    if on {
                        "Drag over the image to select a region".to_string()
                    } else {
                        "Crop mode off".to_string()
                    }
                })
            }
            Action::Paint => self.session.begin_paint(),
            Action::Undo => self.session.undo(),
            Action::Redo => self.session.redo(),
            Action::ZoomIn => Ok(self.zoom(true)),
            Action::ZoomOut => Ok(self.zoom(false)),
            Action::NormalSize => {
                self.session.viewport_mut().normal_size();
                Ok("Zoom 100%".to_string())
            }
            Action::FitToWindow => {
                let fit = !self.session.viewport().fit_to_window();
                self.session.set_fit_to_window(fit).map(|()| String::new())
            }
            Action::Effect(kind) => self.session.begin_effect(kind),
            Action::About => {
                self.show_about = true;
                return;
            }
        };
        self.report(result);
    }

    fn load(&mut self, path: &Path) -> EditResult<String> {
        let message = self.session.load(path)?;
        self.remember_dir(path);
        Ok(message)
    }

    fn save(&mut self, path: &Path) -> EditResult<String> {
        let message = self.session.save_as(path)?;
        self.remember_dir(path);
        Ok(message)
    }

    fn remember_dir(&mut self, path: &Path) {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            self.config.last_dir = Some(dir.to_path_buf());
        }
    }

    fn zoom(&mut self, zoom_in: bool) -> String {
        let viewport = self.session.viewport_mut();
        let changed = if zoom_in {
            viewport.zoom_in()
        } else {
            viewport.zoom_out()
        };
        if !changed {
            return "Zoom limit reached".to_string();
        }
        format!("Zoom {:.0}%", viewport.scale() * 100.0)
    }

    fn pick_open_path(&self) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new()
            .set_title("Open File")
            .add_filter("Images", &codec::readable_extensions());
        if let Some(dir) = self.config.dialog_dir() {
            dialog = dialog.set_directory(dir);
        }
        dialog.pick_file()
    }

    fn pick_save_path(&self) -> Option<PathBuf> {
        let stem = self
            .session
            .path()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .unwrap_or("untitled");
        let mut dialog = rfd::FileDialog::new()
            .set_title("Save File As")
            .set_file_name(format!("{stem}.{}", codec::DEFAULT_SUFFIX))
            .add_filter("JPEG", &["jpg", "jpeg"])
            .add_filter("Images", &codec::writable_extensions());
        if let Some(dir) = self.config.dialog_dir() {
            dialog = dialog.set_directory(dir);
        }
        dialog.save_file()
    }

    /// Route an outcome to the status bar, or to a dialog for file errors.
    fn report(&mut self, result: EditResult<String>) {
        match result {
            Ok(message) => {
                if !message.is_empty() {
                    info!(status = %message);
                    self.status = message;
                }
            }
            Err(err) if err.is_dialog_worthy() => {
                warn!(%err, "file operation failed");
                self.error_dialog = Some(err.to_string());
            }
            Err(err) => {
                if !matches!(err, EditError::EmptyClipboard) {
                    warn!(%err, "action failed");
                }
                self.status = err.to_string();
            }
        }
    }

    fn consume_shortcuts(&mut self, ctx: &egui::Context) -> Vec<Action> {
        let mut triggered = Vec::new();
        for (action, shortcut) in Action::shortcut_order() {
            if self.is_enabled(action) && ctx.input_mut(|i| i.consume_shortcut(&shortcut)) {
                triggered.push(action);
            }
        }
        triggered
    }

    fn action_button(&self, ui: &mut egui::Ui, action: Action) -> bool {
        let mut button = egui::Button::new(action.label());
        if let Some(shortcut) = action.shortcut() {
            button = button.shortcut_text(ui.ctx().format_shortcut(&shortcut));
        }
        if let Some(checked) = self.session.action_state().checked(action) {
            button = button.selected(checked);
        }
        ui.add_enabled(self.is_enabled(action), button).clicked()
    }

    fn menu_section(&self, ui: &mut egui::Ui, menu: Menu, clicked: &mut Option<Action>) {
        for action in Action::ALL.into_iter().filter(|a| a.menu() == menu) {
            if self.action_button(ui, action) {
                *clicked = Some(action);
                ui.close_menu();
            }
        }
    }

    fn show_menu_bar(&self, ui: &mut egui::Ui) -> Option<Action> {
        let mut clicked = None;
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| self.menu_section(ui, Menu::File, &mut clicked));
            ui.menu_button("Edit", |ui| self.menu_section(ui, Menu::Edit, &mut clicked));
            ui.menu_button("View", |ui| self.menu_section(ui, Menu::View, &mut clicked));
            ui.menu_button("Filter", |ui| {
                self.menu_section(ui, Menu::Filter, &mut clicked);
                ui.menu_button("Blur", |ui| self.menu_section(ui, Menu::Blur, &mut clicked));
            });
            ui.menu_button("Help", |ui| self.menu_section(ui, Menu::Help, &mut clicked));
        });
        clicked
    }

    fn show_toolbar(&self, ui: &mut egui::Ui) -> Option<Action> {
        let mut clicked = None;
        ui.vertical(|ui| {
            for action in Action::TOOLBAR {
                let label = action.label().trim_end_matches("...");
                let mut button = egui::Button::new(label).min_size(egui::vec2(96.0, 0.0));
                if let Some(checked) = self.session.action_state().checked(action) {
                    button = button.selected(checked);
                }
                if ui.add_enabled(self.is_enabled(action), button).clicked() {
                    clicked = Some(action);
                }
            }
        });
        clicked
    }

    fn show_preview_window(&mut self, ctx: &egui::Context) {
        let Some(preview) = self.session.preview() else {
            return;
        };
        let kind = preview.kind();
        let range = preview.range();
        let parameter = preview.parameter();
        let accepts_parameter = preview.accepts_parameter();
        let brush = preview.brush_color();
        let working_size = preview.working().dimensions();
        let original_size = preview.snapshot().dimensions();
        let stroke_count = preview.strokes().len();
        let processing = self.viewer.is_processing();

        let mut requested = None;
        let mut color = None;
        let mut accept = false;
        let mut cancel = ctx.input(|i| i.key_pressed(egui::Key::Escape));
        let mut open = true;

        egui::Window::new(kind.label())
            .id(egui::Id::new("preview_window"))
            .open(&mut open)
            .resizable(false)
            .collapsible(false)
            .default_pos([120.0, 90.0])
            .show(ctx, |ui| {
                if let (Some(range), Some(mut value)) = (range, parameter) {
                    let label = if kind == PreviewKind::Paint {
                        "Brush size"
                    } else if range.odd_kernel {
                        "Kernel size"
                    } else {
                        "Amount"
                    };
                    ui.horizontal(|ui| {
                        ui.label(label);
                        let slider = egui::Slider::new(&mut value, range.min..=range.max)
                            .clamping(egui::SliderClamping::Always);
                        if ui.add_enabled(accepts_parameter, slider).changed() {
                            requested = Some(value);
                        }
                    });
                }

                if kind == PreviewKind::Paint {
                    ui.horizontal(|ui| {
                        ui.label("Colour");
                        let [r, g, b, a] = brush;
                        let mut c = egui::Color32::from_rgba_unmultiplied(r, g, b, a);
                        if ui.color_edit_button_srgba(&mut c).changed() {
                            color = Some(c.to_srgba_unmultiplied());
                        }
                    });
                    let hint = match stroke_count {
                        0 => "Drag over the image to paint".to_string(),
                        1 => "1 stroke".to_string(),
                        n => format!("{n} strokes"),
                    };
                    ui.label(egui::RichText::new(hint).weak());
                }

                if kind == PreviewKind::Crop {
                    ui.label(format!(
                        "Selection {}x{} of {}x{}",
                        working_size.0, working_size.1, original_size.0, original_size.1
                    ));
                }

                if let Some([before, after]) = self.viewer.histogram_textures() {
                    ui.separator();
                    ui.horizontal(|ui| {
                        for (caption, tex) in [("Before", before), ("After", after)] {
                            ui.vertical(|ui| {
                                ui.label(egui::RichText::new(caption).weak());
                                let size = tex.size_vec2() * 0.5;
                                ui.add(egui::Image::from_texture(
                                    egui::load::SizedTexture::new(tex.id(), size),
                                ));
                            });
                        }
                    });
                }

                ui.separator();
                ui.horizontal(|ui| {
                    if processing {
                        ui.spinner();
                    }
                    accept = ui
                        .add_enabled(!processing, egui::Button::new("Accept"))
                        .clicked();
                    cancel |= ui.button("Cancel").clicked();
                });
            });

        if let Some(value) = requested {
            // Brush size only affects later strokes, so there is nothing to
            // hand to the worker.
            let result = if kind == PreviewKind::Paint {
                self.session.set_parameter(value).map(|_| String::new())
            } else {
                self.viewer
                    .request_parameter(&mut self.session, value, ctx)
                    .map(|()| String::new())
            };
            self.report(result);
        }
        if let Some(color) = color {
            let result = self.session.set_brush_color(color).map(|()| String::new());
            self.report(result);
        }
        if accept {
            let result = self.session.accept();
            self.report(result);
        } else if cancel || !open {
            let result = self.session.cancel();
            self.report(result);
        }
    }

    fn show_dialogs(&mut self, ctx: &egui::Context) {
        if let Some(message) = self.error_dialog.clone() {
            egui::Window::new(APP_NAME)
                .id(egui::Id::new("error_dialog"))
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(message);
                    if ui.button("OK").clicked() {
                        self.error_dialog = None;
                    }
                });
        }

        egui::Window::new(format!("About {APP_NAME}"))
            .open(&mut self.show_about)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(egui::RichText::new(APP_NAME).strong());
                ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                ui.add_space(4.0);
                ui.label(
                    "View images, apply filters with a live preview, crop, paint, \
                     and step back and forth through every edit.",
                );
                ui.add_space(4.0);
                let filters: Vec<&str> = EffectKind::ALL.iter().map(|k| k.label()).collect();
                ui.weak(format!("Filters: {}", filters.join(", ")));
            });
    }

    fn handle_canvas(&mut self, event: CanvasEvent) {
        let result = match event {
            CanvasEvent::Crop { anchor, release } => self.session.begin_crop(anchor, release),
            CanvasEvent::Stroke(points) => {
                self.session.paint_stroke(points).map(|()| String::new())
            }
        };
        self.report(result);
    }

    fn window_title(&self) -> String {
        match self.session.path().and_then(|p| p.file_name()) {
            Some(name) => format!("{} - {APP_NAME}", name.to_string_lossy()),
            None => APP_NAME.to_string(),
        }
    }
}

impl eframe::App for RetouchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Track window size for saving on exit
        if let Some(rect) = ctx.input(|i| i.viewport().inner_rect) {
            self.config.window_width = Some(rect.width());
            self.config.window_height = Some(rect.height());
        }

        self.viewer.drain(&mut self.session, ctx);

        let mut actions = self.consume_shortcuts(ctx);

        egui::TopBottomPanel::top("main_menu").show(ctx, |ui| {
            actions.extend(self.show_menu_bar(ui));
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(current) = self.session.current() {
                    ui.weak(format!("{}x{}", current.width(), current.height()));
                    ui.separator();
                }
                ui.label(&self.status);
                let history = self.session.history();
                if !history.is_empty() {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let mb = history.memory_usage() as f64 / (1024.0 * 1024.0);
                        ui.weak(format!(
                            "Edits {}/{} ({mb:.1} MB)",
                            history.cursor(),
                            history.len()
                        ))
                        .on_hover_text(history.labels().collect::<Vec<_>>().join(", "));
                    });
                }
            });
        });

        egui::SidePanel::left("toolbar")
            .resizable(false)
            .show(ctx, |ui| {
                actions.extend(self.show_toolbar(ui));
            });

        let mut canvas_event = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            canvas_event = self.viewer.show_canvas(ui, &self.session);
        });
        if let Some(event) = canvas_event {
            self.handle_canvas(event);
        }

        self.show_preview_window(ctx);
        self.show_dialogs(ctx);

        for action in actions {
            self.run(action, ctx);
        }

        let title = self.window_title();
        if title != self.title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.title = title;
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.config.save();
    }
}
