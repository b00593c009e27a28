//! Composite edit operations over the graph and the selection.
//!
//! Each operation reads the current selection, purges every id it is about
//! to delete from the selection before touching the graph, performs the
//! structural change, and returns the notices produced along the way.
//! Invoking an operation without enough selected objects is not an error:
//! it yields [`EditOutcome::Skipped`] and logs at `info`.

#[cfg(test)]
#[path = "edit_test.rs"]
mod edit_test;

use tracing::info;

use crate::graph::{GraphError, GroupId, MassId, SpringGraph, SpringId, SpringParams};
use crate::point::Vec3;
use crate::selection::{ControlId, Notice, SelectionState};

/// What an edit did.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// The selection did not satisfy the operation's precondition.
    Skipped { reason: &'static str },
    SpringAdded { spring: SpringId },
    Deleted { masses: Vec<MassId>, springs: Vec<SpringId> },
    Merged { target: MassId, removed: Vec<MassId>, created: Vec<SpringId> },
    Connected { springs: Vec<SpringId> },
    Grouped { group: GroupId },
}

/// Outcome plus the presentation notices emitted while applying it.
#[derive(Debug, Clone, PartialEq)]
pub struct EditReport {
    pub outcome: EditOutcome,
    pub notices: Vec<Notice>,
}

impl EditReport {
    fn done(outcome: EditOutcome, notices: Vec<Notice>) -> Self {
        Self { outcome, notices }
    }

    fn skipped(op: &'static str, reason: &'static str) -> Self {
        info!(op, reason, "edit skipped");
        Self { outcome: EditOutcome::Skipped { reason }, notices: Vec::new() }
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, EditOutcome::Skipped { .. })
    }
}

/// Connect the two selected masses with a default spring.
///
/// # Errors
///
/// Graph errors from [`SpringGraph::add_spring`].
pub fn add_spring_from_selection(graph: &mut SpringGraph, selection: &SelectionState) -> Result<EditReport, GraphError> {
    let &[a, b] = selection.masses() else {
        return Ok(EditReport::skipped("add-spring", "exactly two masses must be selected"));
    };
    let spring = graph.add_spring(a, b)?;
    info!(%spring, start = %a, end = %b, "spring added from selection");
    Ok(EditReport::done(EditOutcome::SpringAdded { spring }, Vec::new()))
}

/// Delete the selected springs and masses, plus every spring incident to a selected mass.
///
/// Springs go before their endpoints; each touched group is cleaned up once
/// after all removals. Both selection sets end empty.
///
/// # Errors
///
/// `UnknownMass` if the selection names a mass not in the graph; any
/// invariant violation reported by the graph.
pub fn delete_selected(graph: &mut SpringGraph, selection: &mut SelectionState) -> Result<EditReport, GraphError> {
    let masses = selection.masses().to_vec();
    let mut springs = selection.springs().to_vec();
    for &m in &masses {
        let mass = graph.mass(m).ok_or(GraphError::UnknownMass(m))?;
        for s in &mass.joints {
            if !springs.contains(s) {
                springs.push(*s);
            }
        }
    }
    if masses.is_empty() && springs.is_empty() {
        return Ok(EditReport::skipped("delete", "nothing selected"));
    }

    let mut notices = selection.clear_springs();
    notices.extend(selection.clear_masses());

    let mut touched: Vec<GroupId> = Vec::new();
    for &s in &springs {
        let removed = graph.delete_spring(s)?;
        if !touched.contains(&removed.group) {
            touched.push(removed.group);
        }
    }
    for group in touched {
        graph.cleanup_group(group);
    }
    for &m in &masses {
        graph.delete_mass(m)?;
    }

    info!(masses = masses.len(), springs = springs.len(), "selection deleted");
    Ok(EditReport::done(EditOutcome::Deleted { masses, springs }, notices))
}

/// Merge the selected masses into the first selected one.
///
/// Springs between two members of the merge set disappear. A spring from a
/// non-target member to an outside mass is replaced by one from the target
/// with the same parameters. The target moves to the centroid of the
/// original positions and the mass selection is cleared.
///
/// # Errors
///
/// `UnknownMass` if the selection names a mass not in the graph; any
/// invariant violation reported by the graph.
pub fn merge_selected(graph: &mut SpringGraph, selection: &mut SelectionState) -> Result<EditReport, GraphError> {
    let members = selection.masses().to_vec();
    let Some(&target) = members.first() else {
        return Ok(EditReport::skipped("merge", "at least two masses must be selected"));
    };
    if members.len() < 2 {
        return Ok(EditReport::skipped("merge", "at least two masses must be selected"));
    }

    let mut positions: Vec<Vec3> = Vec::with_capacity(members.len());
    let mut doomed: Vec<SpringId> = Vec::new();
    let mut replacements: Vec<(MassId, SpringParams)> = Vec::new();
    for &m in &members {
        let mass = graph.mass(m).ok_or(GraphError::UnknownMass(m))?;
        positions.push(mass.position);
        for &s in &mass.joints {
            if doomed.contains(&s) {
                continue;
            }
            let spring = graph.spring(s).ok_or(GraphError::UnknownSpring(s))?;
            let Some(other) = spring.other_end(m) else {
                return Err(GraphError::AsymmetricJoints(s));
            };
            if members.contains(&other) {
                doomed.push(s);
            } else if m != target {
                doomed.push(s);
                replacements.push((other, spring.params));
            }
        }
    }

    let mut notices = Vec::new();
    for &s in &doomed {
        notices.extend(selection.purge_spring(graph, s));
    }
    let mut touched: Vec<GroupId> = Vec::new();
    for &s in &doomed {
        let removed = graph.delete_spring(s)?;
        if !touched.contains(&removed.group) {
            touched.push(removed.group);
        }
    }
    for group in touched {
        graph.cleanup_group(group);
    }

    let mut created = Vec::with_capacity(replacements.len());
    for (outside, params) in replacements {
        created.push(graph.add_spring_with(target, outside, params)?);
    }

    let removed: Vec<MassId> = members.iter().copied().filter(|m| *m != target).collect();
    for &m in &removed {
        notices.extend(selection.purge_mass(m));
        graph.delete_mass(m)?;
    }
    if let Some(center) = Vec3::centroid(&positions) {
        graph.set_mass_position(target, center)?;
    }
    notices.extend(selection.clear_masses());
    notices.extend(selection.reconcile_controls(graph));

    let mut touched_springs = created.clone();
    if let Some(mass) = graph.mass(target) {
        touched_springs.extend(mass.joints.iter().copied());
    }
    graph.refresh_visuals(&touched_springs);

    info!(%target, removed = removed.len(), deleted = doomed.len(), created = created.len(), "masses merged");
    Ok(EditReport::done(EditOutcome::Merged { target, removed, created }, notices))
}

/// Connect every unconnected pair of selected masses.
///
/// # Errors
///
/// Graph errors from [`SpringGraph::connect_all`].
pub fn connect_all_selected(graph: &mut SpringGraph, selection: &SelectionState) -> Result<EditReport, GraphError> {
    if selection.masses().len() < 2 {
        return Ok(EditReport::skipped("connect-all", "at least two masses must be selected"));
    }
    let springs = graph.connect_all(selection.masses())?;
    Ok(EditReport::done(EditOutcome::Connected { springs }, Vec::new()))
}

/// Union the groups of the selected springs and show the new group's control.
///
/// Every control governing a spring that is about to be absorbed is hidden
/// first, so no control outlives the group it was bound to.
///
/// # Errors
///
/// `UnknownSpring` if the selection names a spring not in the graph.
pub fn group_selected(graph: &mut SpringGraph, selection: &mut SelectionState) -> Result<EditReport, GraphError> {
    let springs = selection.springs().to_vec();
    if springs.len() < 2 {
        return Ok(EditReport::skipped("group", "at least two springs must be selected"));
    }

    let mut groups: Vec<GroupId> = Vec::new();
    let mut absorbed: Vec<SpringId> = Vec::new();
    for &s in &springs {
        let group = graph.group_of(s).ok_or(GraphError::UnknownSpring(s))?;
        if !groups.contains(&group.id) {
            groups.push(group.id);
            absorbed.extend(group.members.iter().copied());
        }
    }
    if groups.len() < 2 {
        return Ok(EditReport::skipped("group", "selected springs already share a group"));
    }

    let mut notices = selection.hide_controls_touching(graph, &absorbed);
    let Some(group) = graph.group_springs(&springs)? else {
        return Ok(EditReport::skipped("group", "selected springs already share a group"));
    };
    notices.extend(selection.show_control(graph, ControlId::Group(group)));
    Ok(EditReport::done(EditOutcome::Grouped { group }, notices))
}
