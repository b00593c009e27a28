//! Collaborator contracts for the external physics and render engines.
//!
//! The core never simulates forces or draws anything itself. It asks a
//! [`Physics`] implementation for bodies and spring joints and a [`Render`]
//! implementation for link visuals, picking, and camera control. Both are
//! handed to [`crate::graph::SpringGraph`] at construction.
//!
//! Handles are opaque tokens minted by the collaborator. Joints are always
//! destroyed by handle; the core makes no assumption about how an engine
//! orders its internal joint bookkeeping.

use std::fmt;

use crate::graph::SpringParams;
use crate::point::{Point, Vec3};

/// Physics-side body for one mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub u64);

/// Physics-side spring joint for one spring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointHandle(pub u64);

/// Render-side pickable link visual (the spring's cylinder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualHandle(pub u64);

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

impl fmt::Display for JointHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Joint({})", self.0)
    }
}

impl fmt::Display for VisualHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Visual({})", self.0)
    }
}

/// Restricts which scene objects a pick may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickFilter {
    /// Any pickable object.
    Everything,
    /// Only mass bodies.
    Bodies,
    /// Only spring link visuals.
    Links,
}

/// What a pick ray hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickTarget {
    /// A mass body.
    Body(BodyHandle),
    /// A spring link visual.
    Visual(VisualHandle),
    /// Some other pickable scene object.
    Other,
    /// Nothing under the pointer.
    Nothing,
}

/// Force-solving engine.
pub trait Physics {
    /// Create a body at `position`.
    fn create_body(&mut self, position: Vec3) -> BodyHandle;

    /// Destroy a body. Unknown handles are ignored.
    fn destroy_body(&mut self, handle: BodyHandle);

    /// Current simulated position of a body.
    fn body_position(&self, handle: BodyHandle) -> Option<Vec3>;

    /// Teleport a body (drag, merge).
    fn set_body_position(&mut self, handle: BodyHandle, position: Vec3);

    /// Divide a body's linear velocity by `divisor` (per-frame friction).
    fn damp_velocity(&mut self, handle: BodyHandle, divisor: f64);

    /// Connect two bodies with a damped spring joint.
    fn create_joint(&mut self, a: BodyHandle, b: BodyHandle, params: SpringParams) -> JointHandle;

    /// Remove a joint by handle. Unknown handles are ignored.
    fn destroy_joint(&mut self, handle: JointHandle);

    /// Change a joint's rest length in place.
    fn set_joint_rest_length(&mut self, handle: JointHandle, length: f64);
}

/// Scene and presentation engine.
pub trait Render {
    /// Hit-test the visible scene at a screen position.
    fn pick(&self, screen: Point, filter: PickFilter) -> PickTarget;

    /// Project a screen position onto the drag plane.
    fn ground_point(&self, screen: Point) -> Option<Vec3>;

    /// Create the link visual drawn between two endpoints.
    fn create_link_visual(&mut self, a: Vec3, b: Vec3) -> VisualHandle;

    /// Move an existing link visual's endpoints.
    fn update_link_visual(&mut self, handle: VisualHandle, a: Vec3, b: Vec3);

    /// Dispose of a link visual. Unknown handles are ignored.
    fn destroy_visual(&mut self, handle: VisualHandle);

    /// Give pointer control back to the camera.
    fn attach_camera(&mut self);

    /// Take pointer control away from the camera for the duration of a drag.
    fn detach_camera(&mut self);
}
