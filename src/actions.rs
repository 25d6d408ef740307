//! The menu/toolbar action surface and its enablement rules.
//!
//! Enablement is never stored: it is recomputed every frame from
//! [`ActionState`], so widgets cannot drift out of sync with the document.

use egui::{Key, KeyboardShortcut, Modifiers};

use crate::processing::EffectKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Open,
    SaveAs,
    Exit,
    Copy,
    Paste,
    CropMode,
    Paint,
    Undo,
    Redo,
    ZoomIn,
    ZoomOut,
    NormalSize,
    FitToWindow,
    Effect(EffectKind),
    About,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Menu {
    File,
    Edit,
    View,
    Filter,
    Blur,
    Help,
}

impl Action {
    /// Every action in menu order.
    pub const ALL: [Action; 21] = [
        Action::Open,
        Action::SaveAs,
        Action::Exit,
        Action::Copy,
        Action::CropMode,
        Action::Paint,
        Action::Undo,
        Action::Redo,
        Action::Paste,
        Action::ZoomIn,
        Action::ZoomOut,
        Action::NormalSize,
        Action::FitToWindow,
        Action::Effect(EffectKind::Brightness),
        Action::Effect(EffectKind::HistogramEqualization),
        Action::Effect(EffectKind::Sepia),
        Action::Effect(EffectKind::HomogeneousBlur),
        Action::Effect(EffectKind::GaussianBlur),
        Action::Effect(EffectKind::MedianBlur),
        Action::Effect(EffectKind::BilateralBlur),
        Action::About,
    ];

    /// Actions shown on the side toolbar.
    pub const TOOLBAR: [Action; 10] = [
        Action::SaveAs,
        Action::Copy,
        Action::ZoomIn,
        Action::ZoomOut,
        Action::NormalSize,
        Action::FitToWindow,
        Action::CropMode,
        Action::Undo,
        Action::Redo,
        Action::Paint,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Action::Open => "Open...",
            Action::SaveAs => "Save As...",
            Action::Exit => "Exit",
            Action::Copy => "Copy",
            Action::Paste => "Paste",
            Action::CropMode => "Crop Mode",
            Action::Paint => "Paint",
            Action::Undo => "Undo",
            Action::Redo => "Redo",
            Action::ZoomIn => "Zoom In (25%)",
            Action::ZoomOut => "Zoom Out (25%)",
            Action::NormalSize => "Normal Size",
            Action::FitToWindow => "Fit to Window",
            Action::Effect(kind) => kind.label(),
            Action::About => "About",
        }
    }

    pub fn menu(self) -> Menu {
        match self {
            Action::Open | Action::SaveAs | Action::Exit => Menu::File,
            Action::Copy
            | Action::Paste
            | Action::CropMode
            | Action::Paint
            | Action::Undo
            | Action::Redo => Menu::Edit,
            Action::ZoomIn | Action::ZoomOut | Action::NormalSize | Action::FitToWindow => {
                Menu::View
            }
            Action::Effect(kind) if kind.is_blur() => Menu::Blur,
            Action::Effect(_) => Menu::Filter,
            Action::About => Menu::Help,
        }
    }

    pub fn shortcut(self) -> Option<KeyboardShortcut> {
        let cmd = |key| Some(KeyboardShortcut::new(Modifiers::COMMAND, key));
        match self {
            Action::Open => cmd(Key::O),
            Action::SaveAs => Some(KeyboardShortcut::new(
                Modifiers::COMMAND | Modifiers::SHIFT,
                Key::S,
            )),
            Action::Exit => cmd(Key::Q),
            Action::Copy => cmd(Key::C),
            Action::Paste => cmd(Key::V),
            Action::CropMode => cmd(Key::R),
            Action::Paint => cmd(Key::P),
            Action::Undo => cmd(Key::Z),
            Action::Redo => cmd(Key::Y),
            Action::ZoomIn => cmd(Key::Plus),
            Action::ZoomOut => cmd(Key::Minus),
            Action::NormalSize => cmd(Key::S),
            Action::FitToWindow => cmd(Key::F),
            Action::Effect(EffectKind::Brightness) => cmd(Key::B),
            Action::Effect(EffectKind::HistogramEqualization) => cmd(Key::H),
            Action::Effect(EffectKind::Sepia) => cmd(Key::A),
            Action::Effect(EffectKind::HomogeneousBlur) => cmd(Key::L),
            Action::Effect(EffectKind::GaussianBlur) => cmd(Key::G),
            Action::Effect(EffectKind::MedianBlur) => cmd(Key::M),
            Action::Effect(EffectKind::BilateralBlur) => cmd(Key::T),
            Action::About => None,
        }
    }

    /// Actions with shortcuts, the ones with extra modifiers first so that a
    /// plain `Cmd+S` match never swallows `Cmd+Shift+S`.
    pub fn shortcut_order() -> Vec<(Action, KeyboardShortcut)> {
        let mut out: Vec<(Action, KeyboardShortcut)> = Action::ALL
            .into_iter()
            .filter_map(|a| a.shortcut().map(|s| (a, s)))
            .collect();
        out.sort_by_key(|(_, s)| std::cmp::Reverse(modifier_count(s.modifiers)));
        out
    }
}

fn modifier_count(m: Modifiers) -> u8 {
    m.alt as u8 + m.shift as u8 + m.command as u8 + m.ctrl as u8 + m.mac_cmd as u8
}

/// Everything enablement depends on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionState {
    pub has_image: bool,
    pub crop_mode: bool,
    pub fit_to_window: bool,
}

impl ActionState {
    pub fn enabled(&self, action: Action) -> bool {
        match action {
            Action::Open | Action::Paste | Action::About | Action::Exit => true,
            Action::SaveAs
            | Action::Copy
            | Action::Paint
            | Action::Undo
            | Action::Redo
            | Action::Effect(_) => self.has_image,
            Action::ZoomIn | Action::ZoomOut | Action::NormalSize => {
                self.has_image && !self.crop_mode && !self.fit_to_window
            }
            Action::FitToWindow => self.has_image && !self.crop_mode,
            Action::CropMode => self.has_image && !self.fit_to_window,
        }
    }

    /// Checked state of toggle actions.
    pub fn checked(&self, action: Action) -> Option<bool> {
        match action {
            Action::CropMode => Some(self.crop_mode),
            Action::FitToWindow => Some(self.fit_to_window),
            _ => None,
        }
    }
}
