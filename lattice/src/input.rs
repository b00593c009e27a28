//! Input model: modifier keys, mouse buttons, gestures, and the drag state.
//!
//! `Modifiers` is what the host reports with each pointer event. `Gesture`
//! is the normalized meaning of a modifier combination on a primary
//! pointer-down; the selection reducer dispatches on it rather than on raw
//! flags. `InputState` tracks the single drag that may be in progress
//! between pointer-down and pointer-up.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::backend::PickFilter;
use crate::graph::MassId;
use crate::point::Vec3;

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held. Ignored by gesture dispatch.
    pub meta: bool,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A keyboard key as reported by the host (e.g. `"s"`, `"?"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// Normalized meaning of a modifier combination on a primary pointer-down.
///
/// Precedence when several modifiers are held: Ctrl+Shift, Ctrl+Alt, Ctrl,
/// Alt, Shift, then no modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// No modifier: drag the picked mass (and any multi-selection).
    Drag,
    /// Alt: add a mass to the multi-selection and drag the selection.
    SelectMass,
    /// Ctrl: clear the mass selection.
    ClearMasses,
    /// Ctrl+Shift: clear the spring selection and the revealed set.
    ClearSprings,
    /// Shift: select a spring, revealing its group.
    SelectSpring,
    /// Ctrl+Alt: select a spring with its rest-length control.
    RevealSpring,
}

impl Gesture {
    #[must_use]
    pub fn from_modifiers(m: Modifiers) -> Self {
        match (m.ctrl, m.shift, m.alt) {
            (true, true, _) => Self::ClearSprings,
            (true, false, true) => Self::RevealSpring,
            (true, false, false) => Self::ClearMasses,
            (false, _, true) => Self::SelectMass,
            (false, true, false) => Self::SelectSpring,
            (false, false, false) => Self::Drag,
        }
    }

    /// What the pick for this gesture may hit; `None` when no pick is needed.
    #[must_use]
    pub fn pick_filter(self) -> Option<PickFilter> {
        match self {
            Self::Drag => Some(PickFilter::Everything),
            Self::SelectMass => Some(PickFilter::Bodies),
            Self::SelectSpring | Self::RevealSpring => Some(PickFilter::Links),
            Self::ClearMasses | Self::ClearSprings => None,
        }
    }
}

/// State of the pointer between down and up.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Masses follow the pointer; the camera is detached until release.
    DraggingMasses {
        /// Every mass that moves with the pointer.
        masses: Vec<MassId>,
        /// Drag-plane position at the previous pointer event.
        last_world: Vec3,
    },
}

impl InputState {
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::DraggingMasses { .. })
    }
}
