//! Top-level engine: input events and commands in, host actions out.
//!
//! `EngineCore` owns the graph, the selection, the drag state, and the
//! configuration. Every handler returns the list of [`Action`]s the host
//! applies to its presentation layer. Snapshot IO is left to the host: save
//! and load commands come back as requests, and a validated
//! [`SnapshotPlan`] is handed in through [`EngineCore::load_snapshot`].

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::path::PathBuf;

use tracing::{debug, error, info};

use crate::backend::{Physics, PickTarget, Render};
use crate::config::EngineConfig;
use crate::edit::{self, EditOutcome, EditReport};
use crate::graph::{GraphError, MassId, SpringGraph, SpringId};
use crate::headless::Headless;
use crate::input::{Button, Gesture, InputState, Key, Modifiers};
use crate::point::{Point, Vec3};
use crate::selection::{ControlId, Hit, Notice, SelectionState};
use crate::snapshot::{LoadReport, Snapshot, SnapshotPlan};

/// Operations reachable from buttons, keys, or a script.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Add a mass at the given position, or at the configured spawn point.
    AddMass(Option<Vec3>),
    AddSpring,
    DeleteSelected,
    GroupSelected,
    MergeSelected,
    ConnectAllSelected,
    SaveSnapshot,
    /// Ask the host to load a snapshot; `None` means the host's default source.
    LoadSnapshot(Option<PathBuf>),
    PrintSnapshot,
}

impl Command {
    /// Key-up bindings.
    #[must_use]
    pub fn from_key(key: &Key) -> Option<Self> {
        let command = match key.0.as_str() {
            "s" => Self::AddMass(None),
            "w" => Self::AddSpring,
            "d" => Self::DeleteSelected,
            "g" => Self::GroupSelected,
            "m" => Self::MergeSelected,
            "c" => Self::ConnectAllSelected,
            "p" => Self::PrintSnapshot,
            "?" => Self::SaveSnapshot,
            "f" => Self::LoadSnapshot(None),
            _ => return None,
        };
        Some(command)
    }
}

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Notice(Notice),
    Edited(EditOutcome),
    MassAdded(MassId),
    MassesMoved { masses: Vec<MassId>, delta: Vec3 },
    CameraDetached,
    CameraAttached,
    /// Tab-indented snapshot JSON for the host to write out.
    SaveRequested { json: String },
    LoadRequested { path: Option<PathBuf> },
    Loaded(LoadReport),
    Printed(String),
    /// An operation was aborted part way. Deletes and merges may already
    /// have cleared the selection and removed springs when this is reported.
    Failed(String),
    RenderNeeded,
}

/// Core engine state: graph, selection, drag, and configuration.
pub struct EngineCore {
    pub graph: SpringGraph,
    pub selection: SelectionState,
    pub input: InputState,
    pub config: EngineConfig,
    /// Most recently shown control still on screen; falls back to the newest
    /// remaining one when it is hidden.
    last_control: Option<ControlId>,
}

impl EngineCore {
    #[must_use]
    pub fn new(config: EngineConfig, physics: Box<dyn Physics>, render: Box<dyn Render>) -> Self {
        Self {
            graph: SpringGraph::new(physics, render).with_defaults(config.spring),
            selection: SelectionState::new(config.control_range()),
            input: InputState::default(),
            config,
            last_control: None,
        }
    }

    /// Engine over an in-memory scene. The returned handle shares the scene's state.
    #[must_use]
    pub fn headless(config: EngineConfig) -> (Self, Headless) {
        let scene = Headless::with_pick_radius(config.pick_radius);
        let core = Self::new(config, Box::new(scene.clone()), Box::new(scene.clone()));
        (core, scene)
    }

    // --- Queries ---

    #[must_use]
    pub fn last_control(&self) -> Option<ControlId> {
        self.last_control
    }

    /// Capture the current graph.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.graph)
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        if button != Button::Primary {
            return Vec::new();
        }
        let gesture = Gesture::from_modifiers(modifiers);
        let hit = match gesture.pick_filter() {
            Some(filter) => self.resolve(self.graph.render().pick(screen_pt, filter)),
            None => Hit::Nothing,
        };
        debug!(?gesture, ?hit, "pointer down");

        let reduction = self.selection.pointer_down(&self.graph, gesture, hit);
        let mut actions = self.notices(reduction.notices);
        if let Some(masses) = reduction.drag {
            if let Some(world) = self.graph.render().ground_point(screen_pt) {
                self.input = InputState::DraggingMasses { masses, last_world: world };
                self.graph.render_mut().detach_camera();
                actions.push(Action::CameraDetached);
            }
        }
        if !actions.is_empty() {
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        let InputState::DraggingMasses { masses, last_world } = &mut self.input else {
            return Vec::new();
        };
        let Some(world) = self.graph.render().ground_point(screen_pt) else {
            return Vec::new();
        };
        let delta = world - *last_world;
        *last_world = world;

        let mut incident: Vec<SpringId> = Vec::new();
        for &m in masses.iter() {
            let Some(mass) = self.graph.mass(m) else {
                continue;
            };
            let position = mass.position + delta;
            incident.extend(mass.joints.iter().copied());
            if let Err(error) = self.graph.set_mass_position(m, position) {
                error!(%error, "drag target vanished");
            }
        }
        self.graph.refresh_visuals(&incident);
        vec![Action::MassesMoved { masses: masses.clone(), delta }, Action::RenderNeeded]
    }

    pub fn on_pointer_up(&mut self, _screen_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if !self.input.is_dragging() {
            return Vec::new();
        }
        self.input = InputState::Idle;
        self.graph.render_mut().attach_camera();
        vec![Action::CameraAttached]
    }

    pub fn on_key_up(&mut self, key: &Key, _modifiers: Modifiers) -> Vec<Action> {
        match Command::from_key(key) {
            Some(command) => self.execute(command),
            None => Vec::new(),
        }
    }

    // --- Commands ---

    pub fn execute(&mut self, command: Command) -> Vec<Action> {
        debug!(?command, "execute");
        match command {
            Command::AddMass(position) => {
                let id = self.graph.add_mass(position.unwrap_or(self.config.spawn));
                vec![Action::MassAdded(id), Action::RenderNeeded]
            }
            Command::AddSpring => {
                let result = edit::add_spring_from_selection(&mut self.graph, &self.selection);
                self.finish_edit(result)
            }
            Command::DeleteSelected => {
                let result = edit::delete_selected(&mut self.graph, &mut self.selection);
                self.finish_edit(result)
            }
            Command::GroupSelected => {
                let result = edit::group_selected(&mut self.graph, &mut self.selection);
                self.finish_edit(result)
            }
            Command::MergeSelected => {
                let result = edit::merge_selected(&mut self.graph, &mut self.selection);
                self.finish_edit(result)
            }
            Command::ConnectAllSelected => {
                let result = edit::connect_all_selected(&mut self.graph, &self.selection);
                self.finish_edit(result)
            }
            Command::SaveSnapshot => match self.snapshot().to_pretty_json() {
                Ok(json) => vec![Action::SaveRequested { json }],
                Err(error) => {
                    error!(%error, "snapshot encode failed");
                    vec![Action::Failed(error.to_string())]
                }
            },
            Command::PrintSnapshot => match self.snapshot().to_pretty_json() {
                Ok(json) => vec![Action::Printed(json)],
                Err(error) => {
                    error!(%error, "snapshot encode failed");
                    vec![Action::Failed(error.to_string())]
                }
            },
            Command::LoadSnapshot(path) => vec![Action::LoadRequested { path }],
        }
    }

    /// Append a validated snapshot to the graph. Selection is untouched.
    pub fn load_snapshot(&mut self, plan: SnapshotPlan) -> Vec<Action> {
        match plan.commit(&mut self.graph) {
            Ok(report) => {
                self.check_invariants();
                vec![Action::Loaded(report), Action::RenderNeeded]
            }
            Err(error) => {
                error!(%error, "snapshot commit failed");
                vec![Action::Failed(error.to_string())]
            }
        }
    }

    // --- Controls ---

    /// Move a control's slider: every spring it governs takes the clamped value
    /// as its rest length. Returns the applied value, or `None` if the control
    /// is not shown.
    pub fn set_control_value(&mut self, control: ControlId, value: f64) -> Option<f64> {
        let clamped = self.selection.set_control_value(control, value)?;
        let members = SelectionState::control_members(&self.graph, control);
        for spring in &members {
            if let Err(error) = self.graph.set_rest_length(*spring, clamped) {
                error!(%error, "rest length update failed");
            }
        }
        debug!(?control, value = clamped, springs = members.len(), "control moved");
        Some(clamped)
    }

    // --- Render loop ---

    /// One frame: friction and position sync for every mass, then every link
    /// visual redrawn. Returns the number of visuals updated.
    pub fn tick(&mut self) -> usize {
        self.graph.sync_from_physics(self.config.friction);
        let springs: Vec<SpringId> = self.graph.springs().map(|s| s.id).collect();
        self.graph.refresh_visuals(&springs)
    }

    // --- Internals ---

    fn resolve(&self, target: PickTarget) -> Hit {
        match target {
            PickTarget::Body(body) => self.graph.mass_for_body(body).map_or(Hit::Other, Hit::Mass),
            PickTarget::Visual(visual) => self.graph.spring_for_visual(visual).map_or(Hit::Other, Hit::Spring),
            PickTarget::Other => Hit::Other,
            PickTarget::Nothing => Hit::Nothing,
        }
    }

    fn notices(&mut self, notices: Vec<Notice>) -> Vec<Action> {
        for notice in &notices {
            match notice {
                Notice::ShowControl { control, .. } => self.last_control = Some(*control),
                Notice::HideControl { control } if self.last_control == Some(*control) => {
                    self.last_control = self.selection.controls().last().map(|c| c.id);
                }
                _ => {}
            }
        }
        notices.into_iter().map(Action::Notice).collect()
    }

    fn finish_edit(&mut self, result: Result<EditReport, GraphError>) -> Vec<Action> {
        match result {
            Ok(report) => {
                let skipped = report.is_skipped();
                let mut actions = self.notices(report.notices);
                if !skipped {
                    info!(outcome = ?report.outcome, "edit applied");
                    self.check_invariants();
                }
                actions.push(Action::Edited(report.outcome));
                if !skipped {
                    actions.push(Action::RenderNeeded);
                }
                actions
            }
            Err(error) => {
                error!(%error, "edit aborted");
                vec![Action::Failed(error.to_string())]
            }
        }
    }

    fn check_invariants(&self) {
        if let Err(error) = self.graph.verify() {
            error!(%error, "graph invariant violated");
        }
    }
}
