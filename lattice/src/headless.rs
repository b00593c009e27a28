//! In-memory physics and render collaborator.
//!
//! `Headless` keeps just enough scene state to answer the core's requests:
//! body positions and velocities, joint parameters, link visual endpoints,
//! and whether the camera currently owns the pointer. Picking is an
//! orthographic projection onto the XY plane: screen `(x, y)` is world
//! `(x, y, *)`. Bodies win over links; within a kind the nearest candidate
//! inside the pick radius wins.
//!
//! Clones share state, so a test or host can keep a handle for inspection
//! after boxing one copy into a [`crate::graph::SpringGraph`].

#[cfg(test)]
#[path = "headless_test.rs"]
mod headless_test;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::backend::{BodyHandle, JointHandle, Physics, PickFilter, PickTarget, Render, VisualHandle};
use crate::consts::PICK_RADIUS;
use crate::graph::SpringParams;
use crate::point::{Point, Vec3};

/// A simulated body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: Vec3,
    pub velocity: Vec3,
}

/// A joint as requested by the core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointState {
    pub a: BodyHandle,
    pub b: BodyHandle,
    pub params: SpringParams,
}

#[derive(Debug, Default)]
struct SceneState {
    next_handle: u64,
    bodies: BTreeMap<u64, BodyState>,
    joints: BTreeMap<u64, JointState>,
    visuals: BTreeMap<u64, (Vec3, Vec3)>,
    camera_attached: bool,
}

impl SceneState {
    fn mint(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// Shared-state headless scene.
#[derive(Debug, Clone)]
pub struct Headless {
    state: Rc<RefCell<SceneState>>,
    pick_radius: f64,
}

impl Default for Headless {
    fn default() -> Self {
        Self::new()
    }
}

impl Headless {
    #[must_use]
    pub fn new() -> Self {
        Self::with_pick_radius(PICK_RADIUS)
    }

    #[must_use]
    pub fn with_pick_radius(pick_radius: f64) -> Self {
        let state = SceneState { camera_attached: true, ..SceneState::default() };
        Self { state: Rc::new(RefCell::new(state)), pick_radius }
    }

    // --- Inspection ---

    #[must_use]
    pub fn body_count(&self) -> usize {
        self.state.borrow().bodies.len()
    }

    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.state.borrow().joints.len()
    }

    #[must_use]
    pub fn visual_count(&self) -> usize {
        self.state.borrow().visuals.len()
    }

    #[must_use]
    pub fn body(&self, handle: BodyHandle) -> Option<BodyState> {
        self.state.borrow().bodies.get(&handle.0).copied()
    }

    #[must_use]
    pub fn joint(&self, handle: JointHandle) -> Option<JointState> {
        self.state.borrow().joints.get(&handle.0).copied()
    }

    #[must_use]
    pub fn visual(&self, handle: VisualHandle) -> Option<(Vec3, Vec3)> {
        self.state.borrow().visuals.get(&handle.0).copied()
    }

    #[must_use]
    pub fn camera_attached(&self) -> bool {
        self.state.borrow().camera_attached
    }

    // --- Simulation stand-ins ---

    /// Set a body's velocity (stands in for forces the engine would apply).
    pub fn set_velocity(&self, handle: BodyHandle, velocity: Vec3) {
        if let Some(body) = self.state.borrow_mut().bodies.get_mut(&handle.0) {
            body.velocity = velocity;
        }
    }

    /// Advance every body by its velocity for `dt` seconds.
    pub fn integrate(&self, dt: f64) {
        for body in self.state.borrow_mut().bodies.values_mut() {
            body.position += body.velocity.scale(dt);
        }
    }

    fn pick_body(state: &SceneState, world: Vec3, radius: f64) -> Option<(u64, f64)> {
        state
            .bodies
            .iter()
            .map(|(h, b)| (*h, planar_distance(world, b.position)))
            .filter(|(_, d)| *d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    fn pick_visual(state: &SceneState, world: Vec3, radius: f64) -> Option<(u64, f64)> {
        state
            .visuals
            .iter()
            .map(|(h, (a, b))| (*h, flatten(world).distance_to_segment(flatten(*a), flatten(*b))))
            .filter(|(_, d)| *d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, 0.0)
}

fn planar_distance(a: Vec3, b: Vec3) -> f64 {
    (flatten(a) - flatten(b)).length()
}

impl Physics for Headless {
    fn create_body(&mut self, position: Vec3) -> BodyHandle {
        let mut state = self.state.borrow_mut();
        let handle = state.mint();
        state.bodies.insert(handle, BodyState { position, velocity: Vec3::ZERO });
        BodyHandle(handle)
    }

    fn destroy_body(&mut self, handle: BodyHandle) {
        self.state.borrow_mut().bodies.remove(&handle.0);
    }

    fn body_position(&self, handle: BodyHandle) -> Option<Vec3> {
        self.state.borrow().bodies.get(&handle.0).map(|b| b.position)
    }

    fn set_body_position(&mut self, handle: BodyHandle, position: Vec3) {
        if let Some(body) = self.state.borrow_mut().bodies.get_mut(&handle.0) {
            body.position = position;
        }
    }

    fn damp_velocity(&mut self, handle: BodyHandle, divisor: f64) {
        if divisor == 0.0 {
            return;
        }
        if let Some(body) = self.state.borrow_mut().bodies.get_mut(&handle.0) {
            body.velocity = body.velocity.scale(1.0 / divisor);
        }
    }

    fn create_joint(&mut self, a: BodyHandle, b: BodyHandle, params: SpringParams) -> JointHandle {
        let mut state = self.state.borrow_mut();
        let handle = state.mint();
        state.joints.insert(handle, JointState { a, b, params });
        JointHandle(handle)
    }

    fn destroy_joint(&mut self, handle: JointHandle) {
        self.state.borrow_mut().joints.remove(&handle.0);
    }

    fn set_joint_rest_length(&mut self, handle: JointHandle, length: f64) {
        if let Some(joint) = self.state.borrow_mut().joints.get_mut(&handle.0) {
            joint.params.rest_length = length;
        }
    }
}

impl Render for Headless {
    fn pick(&self, screen: Point, filter: PickFilter) -> PickTarget {
        let state = self.state.borrow();
        let world = Vec3::new(screen.x, screen.y, 0.0);
        if filter != PickFilter::Links {
            if let Some((handle, _)) = Self::pick_body(&state, world, self.pick_radius) {
                return PickTarget::Body(BodyHandle(handle));
            }
        }
        if filter != PickFilter::Bodies {
            if let Some((handle, _)) = Self::pick_visual(&state, world, self.pick_radius) {
                return PickTarget::Visual(VisualHandle(handle));
            }
        }
        PickTarget::Nothing
    }

    fn ground_point(&self, screen: Point) -> Option<Vec3> {
        Some(Vec3::new(screen.x, screen.y, 0.0))
    }

    fn create_link_visual(&mut self, a: Vec3, b: Vec3) -> VisualHandle {
        let mut state = self.state.borrow_mut();
        let handle = state.mint();
        state.visuals.insert(handle, (a, b));
        VisualHandle(handle)
    }

    fn update_link_visual(&mut self, handle: VisualHandle, a: Vec3, b: Vec3) {
        if let Some(visual) = self.state.borrow_mut().visuals.get_mut(&handle.0) {
            *visual = (a, b);
        }
    }

    fn destroy_visual(&mut self, handle: VisualHandle) {
        self.state.borrow_mut().visuals.remove(&handle.0);
    }

    fn attach_camera(&mut self) {
        self.state.borrow_mut().camera_attached = true;
    }

    fn detach_camera(&mut self) {
        self.state.borrow_mut().camera_attached = false;
    }
}
