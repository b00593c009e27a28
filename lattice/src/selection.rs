//! Selection state and the pointer-down reducer.
//!
//! Three independent memberships are tracked: selected masses, selected
//! springs, and revealed springs (group-mates highlighted because another
//! member of their group was selected). Alongside them sits the registry of
//! rest-length controls currently shown: at most one per group, plus
//! ephemeral per-spring controls for ungrouped springs.
//!
//! [`SelectionState::pointer_down`] is a reducer: given the graph (read
//! only), a [`Gesture`] and what the pick hit, it updates the sets and
//! returns the notices the presentation layer must apply, plus the masses
//! to drag if the gesture starts a drag. Everything here holds ids only; the
//! edit layer purges ids before the graph deletes the objects they name.
//!
//! A control stays visible while any spring it governs is selected or
//! revealed; every removal path ends in [`SelectionState::reconcile_controls`].

#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;

use crate::consts::{CONTROL_MAX, CONTROL_MIN};
use crate::graph::{GroupId, MassId, SpringGraph, SpringId};
use crate::input::Gesture;

/// What the pointer landed on, resolved to graph ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Mass(MassId),
    Spring(SpringId),
    /// A pickable scene object that is not part of the graph.
    Other,
    Nothing,
}

/// Identity of a rest-length control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    /// Shared control of a group with two or more springs.
    Group(GroupId),
    /// Ephemeral control of one ungrouped spring; never persisted.
    Single(SpringId),
}

/// A control currently shown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Control {
    pub id: ControlId,
    pub value: f64,
}

/// Slider bounds for rest-length controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ControlRange {
    fn default() -> Self {
        Self { min: CONTROL_MIN, max: CONTROL_MAX }
    }
}

impl ControlRange {
    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Presentation-layer notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    MassSelected { mass: MassId, selected: bool },
    /// `group` is set when the spring was selected as a representative of a shared group.
    SpringSelected { spring: SpringId, selected: bool, group: Option<GroupId> },
    SpringRevealed { spring: SpringId, revealed: bool },
    ShowControl { control: ControlId, springs: Vec<SpringId>, value: f64, label: String },
    HideControl { control: ControlId },
}

/// Output of one pointer-down.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reduction {
    pub notices: Vec<Notice>,
    /// Masses to drag until pointer-up, if the gesture starts a drag.
    pub drag: Option<Vec<MassId>>,
}

/// Slider header text for a control value.
#[must_use]
pub fn control_label(value: f64) -> String {
    format!("Spring length: {value:.2}")
}

/// Transient selection; never persisted.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    masses: Vec<MassId>,
    springs: Vec<SpringId>,
    revealed: Vec<SpringId>,
    controls: Vec<Control>,
    range: ControlRange,
}

impl SelectionState {
    #[must_use]
    pub fn new(range: ControlRange) -> Self {
        Self { range, ..Self::default() }
    }

    // --- Queries ---

    /// Selected masses in selection order.
    #[must_use]
    pub fn masses(&self) -> &[MassId] {
        &self.masses
    }

    /// Selected springs in selection order.
    #[must_use]
    pub fn springs(&self) -> &[SpringId] {
        &self.springs
    }

    #[must_use]
    pub fn revealed(&self) -> &[SpringId] {
        &self.revealed
    }

    #[must_use]
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    #[must_use]
    pub fn control(&self, id: ControlId) -> Option<&Control> {
        self.controls.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn is_mass_selected(&self, mass: MassId) -> bool {
        self.masses.contains(&mass)
    }

    #[must_use]
    pub fn is_spring_selected(&self, spring: SpringId) -> bool {
        self.springs.contains(&spring)
    }

    #[must_use]
    pub fn is_revealed(&self, spring: SpringId) -> bool {
        self.revealed.contains(&spring)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.masses.is_empty() && self.springs.is_empty() && self.revealed.is_empty()
    }

    // --- Reducer ---

    /// Apply a primary pointer-down.
    pub fn pointer_down(&mut self, graph: &SpringGraph, gesture: Gesture, hit: Hit) -> Reduction {
        match (gesture, hit) {
            (Gesture::Drag, Hit::Mass(mass)) => {
                let mut dragged = self.masses.clone();
                if !dragged.contains(&mass) {
                    dragged.push(mass);
                }
                Reduction { notices: Vec::new(), drag: Some(dragged) }
            }
            (Gesture::Drag, _) => Reduction::default(),
            (Gesture::SelectMass, hit) => {
                let notices = match hit {
                    Hit::Mass(mass) => self.select_mass(mass),
                    _ => Vec::new(),
                };
                let drag = (!self.masses.is_empty()).then(|| self.masses.clone());
                Reduction { notices, drag }
            }
            (Gesture::ClearMasses, _) => Reduction { notices: self.clear_masses(), drag: None },
            (Gesture::ClearSprings, _) => Reduction { notices: self.clear_springs(), drag: None },
            (Gesture::SelectSpring, Hit::Spring(spring)) => {
                Reduction { notices: self.select_spring(graph, spring, false), drag: None }
            }
            (Gesture::RevealSpring, Hit::Spring(spring)) => {
                Reduction { notices: self.select_spring(graph, spring, true), drag: None }
            }
            (Gesture::SelectSpring | Gesture::RevealSpring, _) => Reduction::default(),
        }
    }

    // --- Masses ---

    /// Add a mass to the multi-selection.
    pub fn select_mass(&mut self, mass: MassId) -> Vec<Notice> {
        if self.masses.contains(&mass) {
            return Vec::new();
        }
        self.masses.push(mass);
        vec![Notice::MassSelected { mass, selected: true }]
    }

    /// Deselect every mass.
    pub fn clear_masses(&mut self) -> Vec<Notice> {
        self.masses.drain(..).map(|mass| Notice::MassSelected { mass, selected: false }).collect()
    }

    /// Forget a mass that is about to be removed from the graph.
    pub fn purge_mass(&mut self, mass: MassId) -> Vec<Notice> {
        if !self.masses.contains(&mass) {
            return Vec::new();
        }
        self.masses.retain(|m| *m != mass);
        vec![Notice::MassSelected { mass, selected: false }]
    }

    // --- Springs ---

    /// Select a spring individually.
    ///
    /// If its group is shared, the other members are revealed and the group
    /// control is shown. An ungrouped spring gets its own ephemeral control
    /// only when `single_control` is set.
    pub fn select_spring(&mut self, graph: &SpringGraph, spring: SpringId, single_control: bool) -> Vec<Notice> {
        let Some(group) = graph.group_of(spring) else {
            return Vec::new();
        };
        let shared = !group.is_singleton();
        let mut notices = Vec::new();

        if !self.springs.contains(&spring) {
            self.springs.push(spring);
            self.revealed.retain(|s| *s != spring);
            notices.push(Notice::SpringSelected { spring, selected: true, group: shared.then_some(group.id) });
        }

        if shared {
            for member in &group.members {
                if *member == spring || self.springs.contains(member) || self.revealed.contains(member) {
                    continue;
                }
                self.revealed.push(*member);
                notices.push(Notice::SpringRevealed { spring: *member, revealed: true });
            }
            notices.extend(self.show_control(graph, ControlId::Group(group.id)));
        } else if single_control {
            notices.extend(self.show_control(graph, ControlId::Single(spring)));
        }
        notices
    }

    /// Drop a spring from the selected and revealed sets, hiding controls left without a representative.
    pub fn deselect_spring(&mut self, graph: &SpringGraph, spring: SpringId) -> Vec<Notice> {
        let mut notices = Vec::new();
        if self.springs.contains(&spring) {
            self.springs.retain(|s| *s != spring);
            notices.push(Notice::SpringSelected { spring, selected: false, group: None });
        }
        if self.revealed.contains(&spring) {
            self.revealed.retain(|s| *s != spring);
            notices.push(Notice::SpringRevealed { spring, revealed: false });
        }
        notices.extend(self.reconcile_controls(graph));
        notices
    }

    /// Forget a spring that is about to be removed from the graph.
    pub fn purge_spring(&mut self, graph: &SpringGraph, spring: SpringId) -> Vec<Notice> {
        self.deselect_spring(graph, spring)
    }

    /// Deselect every spring, un-reveal every group-mate, and hide every control.
    pub fn clear_springs(&mut self) -> Vec<Notice> {
        let mut notices: Vec<Notice> = self
            .springs
            .drain(..)
            .map(|spring| Notice::SpringSelected { spring, selected: false, group: None })
            .collect();
        notices.extend(self.revealed.drain(..).map(|spring| Notice::SpringRevealed { spring, revealed: false }));
        notices.extend(self.controls.drain(..).map(|c| Notice::HideControl { control: c.id }));
        notices
    }

    // --- Controls ---

    /// Springs governed by a control, as of the current graph.
    #[must_use]
    pub fn control_members(graph: &SpringGraph, id: ControlId) -> Vec<SpringId> {
        match id {
            ControlId::Group(group) => graph.group(group).map(|g| g.members.clone()).unwrap_or_default(),
            ControlId::Single(spring) => graph.spring(spring).map(|s| vec![s.id]).unwrap_or_default(),
        }
    }

    /// Show a control unless it is already shown. Its initial value is the
    /// first member's rest length, clamped to the slider range.
    pub fn show_control(&mut self, graph: &SpringGraph, id: ControlId) -> Option<Notice> {
        if self.control(id).is_some() {
            return None;
        }
        let springs = Self::control_members(graph, id);
        let first = springs.first().and_then(|s| graph.spring(*s))?;
        let value = self.range.clamp(first.params.rest_length);
        self.controls.push(Control { id, value });
        Some(Notice::ShowControl { control: id, springs, value, label: control_label(value) })
    }

    /// Record a new slider value. Returns the clamped value, or `None` if the control is not shown.
    pub fn set_control_value(&mut self, id: ControlId, value: f64) -> Option<f64> {
        let clamped = self.range.clamp(value);
        let control = self.controls.iter_mut().find(|c| c.id == id)?;
        control.value = clamped;
        Some(clamped)
    }

    /// Hide every control that governs any of `springs`.
    pub fn hide_controls_touching(&mut self, graph: &SpringGraph, springs: &[SpringId]) -> Vec<Notice> {
        let mut notices = Vec::new();
        self.controls.retain(|c| {
            let touches = Self::control_members(graph, c.id).iter().any(|s| springs.contains(s));
            if touches {
                notices.push(Notice::HideControl { control: c.id });
            }
            !touches
        });
        notices
    }

    /// Hide controls that no longer have a selected or revealed member.
    pub fn reconcile_controls(&mut self, graph: &SpringGraph) -> Vec<Notice> {
        let mut notices = Vec::new();
        let springs = &self.springs;
        let revealed = &self.revealed;
        self.controls.retain(|c| {
            let live = match c.id {
                ControlId::Group(group) => graph
                    .group(group)
                    .is_some_and(|g| g.members.iter().any(|s| springs.contains(s) || revealed.contains(s))),
                ControlId::Single(spring) => {
                    springs.contains(&spring) && graph.group_of(spring).is_some_and(|g| g.is_singleton())
                }
            };
            if !live {
                notices.push(Notice::HideControl { control: c.id });
            }
            live
        });
        notices
    }
}
