//! Graph store: masses, springs, and the spring-group partition.
//!
//! `SpringGraph` exclusively owns every mass, spring, and group. Springs
//! reference their endpoints and their group by id; masses keep the list of
//! incident springs (their joint list); groups keep their member springs.
//! Every mutation keeps these three views consistent:
//!
//! - a spring is present in both of its endpoints' joint lists,
//! - a spring belongs to exactly one live group, and that group lists it,
//! - groups partition the spring set.
//!
//! Groups are an indexed table keyed by [`GroupId`]. Unioning groups moves
//! all members into a fresh group and retires the old ids, so no two springs
//! ever alias a shared mutable set.
//!
//! The store drives the physics and render collaborators as a side effect of
//! structural changes: a spring owns one physics joint and one link visual,
//! a mass owns one physics body.

#[cfg(test)]
#[path = "graph_test.rs"]
mod graph_test;

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::{BodyHandle, JointHandle, Physics, Render, VisualHandle};
use crate::consts::{DEFAULT_DAMPING, DEFAULT_REST_LENGTH, DEFAULT_STIFFNESS};
use crate::point::Vec3;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Mint a fresh random id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }
    };
}

id_type!(
    /// Stable identifier of a mass.
    MassId,
    "Mass"
);
id_type!(
    /// Stable identifier of a spring.
    SpringId,
    "Spring"
);
id_type!(
    /// Identifier of a spring group. Retired when the group is unioned or emptied.
    GroupId,
    "Group"
);

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("a spring needs two distinct endpoints")]
    InvalidEndpoints,
    #[error("unknown mass: {0}")]
    UnknownMass(MassId),
    #[error("unknown spring: {0}")]
    UnknownSpring(SpringId),
    #[error("{0} still has incident springs")]
    MassHasSprings(MassId),
    #[error("joint lists out of sync for {0}")]
    AsymmetricJoints(SpringId),
    #[error("{0} is not a member of exactly one live group")]
    OrphanSpring(SpringId),
}

// =============================================================================
// TYPES
// =============================================================================

/// Physical parameters of a damped spring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringParams {
    pub rest_length: f64,
    pub stiffness: f64,
    pub damping: f64,
}

impl Default for SpringParams {
    fn default() -> Self {
        Self { rest_length: DEFAULT_REST_LENGTH, stiffness: DEFAULT_STIFFNESS, damping: DEFAULT_DAMPING }
    }
}

/// A point body.
#[derive(Debug, Clone)]
pub struct Mass {
    pub id: MassId,
    /// Last known position; the physics engine moves the body, the render loop copies it back.
    pub position: Vec3,
    pub body: BodyHandle,
    /// Incident springs, in no particular order.
    pub joints: Vec<SpringId>,
}

/// A damped spring between two distinct masses.
#[derive(Debug, Clone)]
pub struct Spring {
    pub id: SpringId,
    pub start: MassId,
    pub end: MassId,
    pub params: SpringParams,
    pub group: GroupId,
    pub joint: JointHandle,
    pub visual: VisualHandle,
}

impl Spring {
    /// The endpoint opposite `mass`, if `mass` is an endpoint.
    #[must_use]
    pub fn other_end(&self, mass: MassId) -> Option<MassId> {
        if self.start == mass {
            Some(self.end)
        } else if self.end == mass {
            Some(self.start)
        } else {
            None
        }
    }

    /// Whether the spring joins `a` and `b` in either direction.
    #[must_use]
    pub fn connects(&self, a: MassId, b: MassId) -> bool {
        (self.start == a && self.end == b) || (self.start == b && self.end == a)
    }
}

/// A cell of the spring partition; all members share one rest-length control.
#[derive(Debug, Clone)]
pub struct Group {
    pub id: GroupId,
    pub members: Vec<SpringId>,
}

impl Group {
    /// A group of one spring has a per-spring control rather than a shared one.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.members.len() < 2
    }
}

// =============================================================================
// STORE
// =============================================================================

/// The live mass-spring multigraph.
pub struct SpringGraph {
    masses: HashMap<MassId, Mass>,
    /// Creation order; snapshot indices follow it.
    mass_order: Vec<MassId>,
    springs: HashMap<SpringId, Spring>,
    spring_order: Vec<SpringId>,
    groups: HashMap<GroupId, Group>,
    group_order: Vec<GroupId>,
    bodies: HashMap<BodyHandle, MassId>,
    visuals: HashMap<VisualHandle, SpringId>,
    defaults: SpringParams,
    physics: Box<dyn Physics>,
    render: Box<dyn Render>,
}

impl SpringGraph {
    /// Create an empty graph driving the given collaborators.
    #[must_use]
    pub fn new(physics: Box<dyn Physics>, render: Box<dyn Render>) -> Self {
        Self {
            masses: HashMap::new(),
            mass_order: Vec::new(),
            springs: HashMap::new(),
            spring_order: Vec::new(),
            groups: HashMap::new(),
            group_order: Vec::new(),
            bodies: HashMap::new(),
            visuals: HashMap::new(),
            defaults: SpringParams::default(),
            physics,
            render,
        }
    }

    /// Parameters used by [`Self::add_spring`] and [`Self::connect_all`].
    #[must_use]
    pub fn with_defaults(mut self, defaults: SpringParams) -> Self {
        self.defaults = defaults;
        self
    }

    // --- Collaborators ---

    #[must_use]
    pub fn render(&self) -> &dyn Render {
        self.render.as_ref()
    }

    pub fn render_mut(&mut self) -> &mut dyn Render {
        self.render.as_mut()
    }

    // --- Masses ---

    /// Add a mass with an empty joint list.
    pub fn add_mass(&mut self, position: Vec3) -> MassId {
        let id = MassId::new();
        let body = self.physics.create_body(position);
        self.masses.insert(id, Mass { id, position, body, joints: Vec::new() });
        self.mass_order.push(id);
        self.bodies.insert(body, id);
        debug!(mass = %id, x = position.x, y = position.y, z = position.z, "mass added");
        id
    }

    /// Remove a mass. Its joint list must already be empty.
    ///
    /// # Errors
    ///
    /// `MassHasSprings` while incident springs remain, `UnknownMass` if absent.
    pub fn delete_mass(&mut self, id: MassId) -> Result<Mass, GraphError> {
        let mass = self.masses.get(&id).ok_or(GraphError::UnknownMass(id))?;
        if !mass.joints.is_empty() {
            return Err(GraphError::MassHasSprings(id));
        }
        let Some(mass) = self.masses.remove(&id) else {
            return Err(GraphError::UnknownMass(id));
        };
        self.mass_order.retain(|m| *m != id);
        self.bodies.remove(&mass.body);
        self.physics.destroy_body(mass.body);
        debug!(mass = %id, "mass deleted");
        Ok(mass)
    }

    #[must_use]
    pub fn mass(&self, id: MassId) -> Option<&Mass> {
        self.masses.get(&id)
    }

    /// All masses in creation order.
    pub fn masses(&self) -> impl Iterator<Item = &Mass> {
        self.mass_order.iter().filter_map(|id| self.masses.get(id))
    }

    #[must_use]
    pub fn mass_count(&self) -> usize {
        self.masses.len()
    }

    /// Position of a mass in creation order; snapshot node index.
    #[must_use]
    pub fn mass_index(&self, id: MassId) -> Option<usize> {
        self.mass_order.iter().position(|m| *m == id)
    }

    /// Resolve a physics body back to its mass.
    #[must_use]
    pub fn mass_for_body(&self, body: BodyHandle) -> Option<MassId> {
        self.bodies.get(&body).copied()
    }

    /// Move a mass, keeping the physics body in step.
    ///
    /// # Errors
    ///
    /// `UnknownMass` if absent.
    pub fn set_mass_position(&mut self, id: MassId, position: Vec3) -> Result<(), GraphError> {
        let mass = self.masses.get_mut(&id).ok_or(GraphError::UnknownMass(id))?;
        mass.position = position;
        self.physics.set_body_position(mass.body, position);
        Ok(())
    }

    // --- Springs ---

    /// Connect two masses with a default-parameter spring.
    ///
    /// # Errors
    ///
    /// See [`Self::add_spring_with`].
    pub fn add_spring(&mut self, a: MassId, b: MassId) -> Result<SpringId, GraphError> {
        self.add_spring_with(a, b, self.defaults)
    }

    /// Connect two masses. The new spring starts in a singleton group.
    ///
    /// # Errors
    ///
    /// `InvalidEndpoints` for a self-loop, `UnknownMass` if an endpoint is absent.
    pub fn add_spring_with(&mut self, a: MassId, b: MassId, params: SpringParams) -> Result<SpringId, GraphError> {
        if a == b {
            return Err(GraphError::InvalidEndpoints);
        }
        let (body_a, pos_a) = self.masses.get(&a).map(|m| (m.body, m.position)).ok_or(GraphError::UnknownMass(a))?;
        let (body_b, pos_b) = self.masses.get(&b).map(|m| (m.body, m.position)).ok_or(GraphError::UnknownMass(b))?;

        let id = SpringId::new();
        let group = GroupId::new();
        let joint = self.physics.create_joint(body_a, body_b, params);
        let visual = self.render.create_link_visual(pos_a, pos_b);

        self.groups.insert(group, Group { id: group, members: vec![id] });
        self.group_order.push(group);
        self.springs.insert(id, Spring { id, start: a, end: b, params, group, joint, visual });
        self.spring_order.push(id);
        self.visuals.insert(visual, id);
        for end in [a, b] {
            if let Some(mass) = self.masses.get_mut(&end) {
                mass.joints.push(id);
            }
        }

        debug!(spring = %id, start = %a, end = %b, rest_length = params.rest_length, "spring added");
        Ok(id)
    }

    /// Whether any spring joins `a` and `b`, in either direction.
    #[must_use]
    pub fn spring_exists(&self, a: MassId, b: MassId) -> bool {
        self.masses.get(&a).is_some_and(|mass| {
            mass.joints
                .iter()
                .filter_map(|s| self.springs.get(s))
                .any(|s| s.connects(a, b))
        })
    }

    /// Add a default spring for every unordered pair in `masses` not yet connected.
    /// Returns exactly the springs created.
    ///
    /// # Errors
    ///
    /// `UnknownMass` if any input mass is absent; nothing is created in that case.
    pub fn connect_all(&mut self, masses: &[MassId]) -> Result<Vec<SpringId>, GraphError> {
        let mut distinct: Vec<MassId> = Vec::with_capacity(masses.len());
        for &m in masses {
            if !self.masses.contains_key(&m) {
                return Err(GraphError::UnknownMass(m));
            }
            if !distinct.contains(&m) {
                distinct.push(m);
            }
        }

        let mut added = Vec::new();
        for (i, &a) in distinct.iter().enumerate() {
            for &b in &distinct[i + 1..] {
                if !self.spring_exists(a, b) {
                    added.push(self.add_spring(a, b)?);
                }
            }
        }
        info!(masses = distinct.len(), added = added.len(), "connected all pairs");
        Ok(added)
    }

    /// Remove a spring from both endpoints, its group, and the collaborators.
    ///
    /// The spring's group is left in place even if now empty; callers run
    /// [`Self::cleanup_group`] on the returned spring's `group` afterwards.
    ///
    /// # Errors
    ///
    /// `UnknownSpring` if absent. `AsymmetricJoints` if either endpoint's joint
    /// list lacks the spring; nothing is modified in that case.
    pub fn delete_spring(&mut self, id: SpringId) -> Result<Spring, GraphError> {
        let spring = self.springs.get(&id).ok_or(GraphError::UnknownSpring(id))?;
        let listed = |m: MassId| self.masses.get(&m).is_some_and(|mass| mass.joints.contains(&id));
        if !listed(spring.start) || !listed(spring.end) {
            return Err(GraphError::AsymmetricJoints(id));
        }

        let Some(spring) = self.springs.remove(&id) else {
            return Err(GraphError::UnknownSpring(id));
        };
        self.spring_order.retain(|s| *s != id);
        for end in [spring.start, spring.end] {
            if let Some(mass) = self.masses.get_mut(&end) {
                mass.joints.retain(|s| *s != id);
            }
        }
        if let Some(group) = self.groups.get_mut(&spring.group) {
            group.members.retain(|s| *s != id);
        }
        self.visuals.remove(&spring.visual);
        self.render.destroy_visual(spring.visual);
        self.physics.destroy_joint(spring.joint);

        debug!(spring = %id, "spring deleted");
        Ok(spring)
    }

    #[must_use]
    pub fn spring(&self, id: SpringId) -> Option<&Spring> {
        self.springs.get(&id)
    }

    /// All springs in creation order.
    pub fn springs(&self) -> impl Iterator<Item = &Spring> {
        self.spring_order.iter().filter_map(|id| self.springs.get(id))
    }

    #[must_use]
    pub fn spring_count(&self) -> usize {
        self.springs.len()
    }

    /// Resolve a link visual back to its spring.
    #[must_use]
    pub fn spring_for_visual(&self, visual: VisualHandle) -> Option<SpringId> {
        self.visuals.get(&visual).copied()
    }

    /// Change one spring's rest length in the graph and the physics joint.
    ///
    /// # Errors
    ///
    /// `UnknownSpring` if absent.
    pub fn set_rest_length(&mut self, id: SpringId, length: f64) -> Result<(), GraphError> {
        let spring = self.springs.get_mut(&id).ok_or(GraphError::UnknownSpring(id))?;
        spring.params.rest_length = length;
        self.physics.set_joint_rest_length(spring.joint, length);
        Ok(())
    }

    /// Redraw the link visuals of `springs` from their endpoints' positions.
    pub fn refresh_visuals(&mut self, springs: &[SpringId]) -> usize {
        let mut updated = 0;
        for id in springs {
            let Some(spring) = self.springs.get(id) else {
                continue;
            };
            let (Some(a), Some(b)) = (self.masses.get(&spring.start), self.masses.get(&spring.end)) else {
                continue;
            };
            self.render.update_link_visual(spring.visual, a.position, b.position);
            updated += 1;
        }
        updated
    }

    /// Pull simulated positions back from physics after applying friction.
    pub fn sync_from_physics(&mut self, friction: f64) {
        for id in &self.mass_order {
            let Some(mass) = self.masses.get_mut(id) else {
                continue;
            };
            self.physics.damp_velocity(mass.body, friction);
            if let Some(position) = self.physics.body_position(mass.body) {
                mass.position = position;
            }
        }
    }

    // --- Groups ---

    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    /// All live groups in creation order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.group_order.iter().filter_map(|id| self.groups.get(id))
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// The group a spring belongs to.
    #[must_use]
    pub fn group_of(&self, spring: SpringId) -> Option<&Group> {
        self.springs.get(&spring).and_then(|s| self.groups.get(&s.group))
    }

    /// Union the groups of `springs` into one new group.
    ///
    /// Returns `None` when fewer than two distinct springs are given or they
    /// already share a group. Otherwise every member of every referenced
    /// group moves into the new group and the old groups are retired.
    ///
    /// # Errors
    ///
    /// `UnknownSpring` if any input spring is absent; nothing changes in that case.
    pub fn group_springs(&mut self, springs: &[SpringId]) -> Result<Option<GroupId>, GraphError> {
        let mut distinct: Vec<SpringId> = Vec::with_capacity(springs.len());
        let mut merging: Vec<GroupId> = Vec::new();
        for &id in springs {
            let spring = self.springs.get(&id).ok_or(GraphError::UnknownSpring(id))?;
            if !distinct.contains(&id) {
                distinct.push(id);
            }
            if !merging.contains(&spring.group) {
                merging.push(spring.group);
            }
        }
        if distinct.len() < 2 || merging.len() < 2 {
            return Ok(None);
        }

        let id = GroupId::new();
        let mut members = Vec::new();
        for old in &merging {
            if let Some(group) = self.groups.remove(old) {
                members.extend(group.members);
            }
        }
        self.group_order.retain(|g| !merging.contains(g));
        for member in &members {
            if let Some(spring) = self.springs.get_mut(member) {
                spring.group = id;
            }
        }

        info!(group = %id, merged = merging.len(), members = members.len(), "springs grouped");
        self.groups.insert(id, Group { id, members });
        self.group_order.push(id);
        Ok(Some(id))
    }

    /// Drop a group once none of its members remain. Returns whether it was removed.
    ///
    /// Unknown (already retired) groups are a no-op.
    pub fn cleanup_group(&mut self, id: GroupId) -> bool {
        let empty = self.groups.get(&id).is_some_and(|g| g.members.iter().all(|s| !self.springs.contains_key(s)));
        if empty {
            self.groups.remove(&id);
            self.group_order.retain(|g| *g != id);
            debug!(group = %id, "empty group removed");
        }
        empty
    }

    // --- Invariants ---

    /// Check joint-list symmetry and the group partition.
    ///
    /// Groups left empty by a deletion but not yet cleaned up are tolerated.
    ///
    /// # Errors
    ///
    /// The first violation found.
    pub fn verify(&self) -> Result<(), GraphError> {
        let mut seen: HashSet<SpringId> = HashSet::with_capacity(self.springs.len());
        for group in self.groups.values() {
            for member in &group.members {
                let in_group = self.springs.get(member).is_some_and(|s| s.group == group.id);
                if !in_group || !seen.insert(*member) {
                    return Err(GraphError::OrphanSpring(*member));
                }
            }
        }
        for spring in self.springs.values() {
            if !seen.contains(&spring.id) {
                return Err(GraphError::OrphanSpring(spring.id));
            }
            for end in [spring.start, spring.end] {
                let listed = self.masses.get(&end).is_some_and(|m| m.joints.contains(&spring.id));
                if !listed {
                    return Err(GraphError::AsymmetricJoints(spring.id));
                }
            }
        }
        for mass in self.masses.values() {
            for joint in &mass.joints {
                let attached = self.springs.get(joint).is_some_and(|s| s.other_end(mass.id).is_some());
                if !attached {
                    return Err(GraphError::AsymmetricJoints(*joint));
                }
            }
        }
        Ok(())
    }
}
