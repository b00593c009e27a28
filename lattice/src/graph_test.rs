#![allow(clippy::float_cmp)]

use std::collections::HashSet;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;
use crate::headless::Headless;

// =============================================================
// Helpers
// =============================================================

fn make_graph() -> (SpringGraph, Headless) {
    let scene = Headless::new();
    let graph = SpringGraph::new(Box::new(scene.clone()), Box::new(scene.clone()));
    (graph, scene)
}

fn add_masses(graph: &mut SpringGraph, n: usize) -> Vec<MassId> {
    (0..n).map(|i| graph.add_mass(Vec3::new(i as f64, 0.0, 0.0))).collect()
}

fn members(graph: &SpringGraph, group: GroupId) -> HashSet<SpringId> {
    graph.group(group).unwrap().members.iter().copied().collect()
}

/// Union of all group members equals the live spring set, with no overlaps.
fn assert_partition(graph: &SpringGraph) {
    graph.verify().unwrap();
    let live: HashSet<SpringId> = graph.springs().map(|s| s.id).collect();
    let mut covered = HashSet::new();
    for group in graph.groups() {
        for member in &group.members {
            assert!(covered.insert(*member), "{member} in more than one group");
        }
    }
    assert_eq!(covered, live);
}

// =============================================================
// Masses
// =============================================================

#[test]
fn add_mass_creates_body_with_empty_joints() {
    let (mut graph, scene) = make_graph();
    let m = graph.add_mass(Vec3::new(1.0, 2.0, 3.0));
    let mass = graph.mass(m).unwrap();
    assert!(mass.joints.is_empty());
    assert_eq!(mass.position, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(scene.body(mass.body).unwrap().position, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(graph.mass_for_body(mass.body), Some(m));
}

#[test]
fn masses_iterate_in_creation_order() {
    let (mut graph, _) = make_graph();
    let ids = add_masses(&mut graph, 4);
    let listed: Vec<MassId> = graph.masses().map(|m| m.id).collect();
    assert_eq!(listed, ids);
    assert_eq!(graph.mass_index(ids[2]), Some(2));
}

#[test]
fn delete_mass_with_springs_fails() {
    let (mut graph, _) = make_graph();
    let ids = add_masses(&mut graph, 2);
    graph.add_spring(ids[0], ids[1]).unwrap();
    assert_eq!(graph.delete_mass(ids[0]).unwrap_err(), GraphError::MassHasSprings(ids[0]));
    assert_eq!(graph.mass_count(), 2);
}

#[test]
fn delete_springs_then_mass_succeeds() {
    let (mut graph, scene) = make_graph();
    let ids = add_masses(&mut graph, 3);
    let s1 = graph.add_spring(ids[0], ids[1]).unwrap();
    let s2 = graph.add_spring(ids[0], ids[2]).unwrap();
    graph.group_springs(&[s1, s2]).unwrap();

    for s in [s1, s2] {
        let removed = graph.delete_spring(s).unwrap();
        graph.cleanup_group(removed.group);
    }
    graph.delete_mass(ids[0]).unwrap();

    assert_eq!(graph.mass_count(), 2);
    assert_eq!(graph.group_count(), 0);
    assert_eq!(scene.body_count(), 2);
    assert_partition(&graph);
    assert_eq!(graph.mass_index(ids[1]), Some(0));
}

#[test]
fn delete_unknown_mass_fails() {
    let (mut graph, _) = make_graph();
    let ghost = MassId::new();
    assert_eq!(graph.delete_mass(ghost).unwrap_err(), GraphError::UnknownMass(ghost));
}

#[test]
fn set_mass_position_moves_body() {
    let (mut graph, scene) = make_graph();
    let m = graph.add_mass(Vec3::ZERO);
    graph.set_mass_position(m, Vec3::new(4.0, 5.0, 6.0)).unwrap();
    let body = graph.mass(m).unwrap().body;
    assert_eq!(scene.body_position(body), Some(Vec3::new(4.0, 5.0, 6.0)));
}

// =============================================================
// Springs
// =============================================================

#[test]
fn add_spring_self_loop_is_invalid() {
    let (mut graph, scene) = make_graph();
    let m = graph.add_mass(Vec3::ZERO);
    assert_eq!(graph.add_spring(m, m).unwrap_err(), GraphError::InvalidEndpoints);
    assert_eq!(scene.joint_count(), 0);
    assert_eq!(graph.group_count(), 0);
}

#[test]
fn add_spring_unknown_endpoint_fails() {
    let (mut graph, _) = make_graph();
    let m = graph.add_mass(Vec3::ZERO);
    let ghost = MassId::new();
    assert_eq!(graph.add_spring(m, ghost).unwrap_err(), GraphError::UnknownMass(ghost));
    assert!(graph.mass(m).unwrap().joints.is_empty());
}

#[test]
fn add_spring_registers_everywhere() {
    let (mut graph, scene) = make_graph();
    let ids = add_masses(&mut graph, 2);
    let s = graph.add_spring(ids[0], ids[1]).unwrap();
    let spring = graph.spring(s).unwrap().clone();

    assert!(graph.mass(ids[0]).unwrap().joints.contains(&s));
    assert!(graph.mass(ids[1]).unwrap().joints.contains(&s));
    assert_eq!(spring.params, SpringParams::default());
    assert_eq!(members(&graph, spring.group), HashSet::from([s]));
    assert!(graph.group(spring.group).unwrap().is_singleton());
    assert_eq!(scene.joint(spring.joint).unwrap().params.stiffness, 10.0);
    assert_eq!(scene.visual(spring.visual), Some((Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0))));
    assert_eq!(graph.spring_for_visual(spring.visual), Some(s));
}

#[test]
fn add_spring_uses_configured_defaults() {
    let scene = Headless::new();
    let custom = SpringParams { rest_length: 2.0, stiffness: 3.0, damping: 0.1 };
    let mut graph = SpringGraph::new(Box::new(scene.clone()), Box::new(scene)).with_defaults(custom);
    let ids = add_masses(&mut graph, 2);
    let s = graph.add_spring(ids[0], ids[1]).unwrap();
    assert_eq!(graph.spring(s).unwrap().params, custom);
}

#[test]
fn parallel_springs_are_allowed() {
    let (mut graph, _) = make_graph();
    let ids = add_masses(&mut graph, 2);
    graph.add_spring(ids[0], ids[1]).unwrap();
    graph.add_spring(ids[1], ids[0]).unwrap();
    assert_eq!(graph.spring_count(), 2);
    assert_eq!(graph.group_count(), 2);
}

#[test]
fn spring_exists_either_direction() {
    let (mut graph, _) = make_graph();
    let ids = add_masses(&mut graph, 3);
    graph.add_spring(ids[0], ids[1]).unwrap();
    assert!(graph.spring_exists(ids[0], ids[1]));
    assert!(graph.spring_exists(ids[1], ids[0]));
    assert!(!graph.spring_exists(ids[0], ids[2]));
}

#[test]
fn spring_other_end() {
    let (mut graph, _) = make_graph();
    let ids = add_masses(&mut graph, 3);
    let s = graph.add_spring(ids[0], ids[1]).unwrap();
    let spring = graph.spring(s).unwrap();
    assert_eq!(spring.other_end(ids[0]), Some(ids[1]));
    assert_eq!(spring.other_end(ids[1]), Some(ids[0]));
    assert_eq!(spring.other_end(ids[2]), None);
}

#[test]
fn delete_spring_releases_collaborators_but_keeps_group() {
    let (mut graph, scene) = make_graph();
    let ids = add_masses(&mut graph, 2);
    let s = graph.add_spring(ids[0], ids[1]).unwrap();
    let removed = graph.delete_spring(s).unwrap();

    assert_eq!(scene.joint_count(), 0);
    assert_eq!(scene.visual_count(), 0);
    assert!(graph.mass(ids[0]).unwrap().joints.is_empty());
    assert!(graph.mass(ids[1]).unwrap().joints.is_empty());
    // Empty group lingers until cleanup.
    assert!(graph.group(removed.group).unwrap().members.is_empty());
    assert!(graph.cleanup_group(removed.group));
    assert!(graph.group(removed.group).is_none());
}

#[test]
fn delete_unknown_spring_fails() {
    let (mut graph, _) = make_graph();
    let ghost = SpringId::new();
    assert_eq!(graph.delete_spring(ghost).unwrap_err(), GraphError::UnknownSpring(ghost));
}

#[test]
fn set_rest_length_reaches_joint() {
    let (mut graph, scene) = make_graph();
    let ids = add_masses(&mut graph, 2);
    let s = graph.add_spring(ids[0], ids[1]).unwrap();
    graph.set_rest_length(s, 8.0).unwrap();
    let spring = graph.spring(s).unwrap();
    assert_eq!(spring.params.rest_length, 8.0);
    assert_eq!(scene.joint(spring.joint).unwrap().params.rest_length, 8.0);
}

#[test]
fn refresh_visuals_follows_positions() {
    let (mut graph, scene) = make_graph();
    let ids = add_masses(&mut graph, 2);
    let s = graph.add_spring(ids[0], ids[1]).unwrap();
    graph.set_mass_position(ids[1], Vec3::new(0.0, 9.0, 0.0)).unwrap();
    assert_eq!(graph.refresh_visuals(&[s, SpringId::new()]), 1);
    let visual = graph.spring(s).unwrap().visual;
    assert_eq!(scene.visual(visual), Some((Vec3::ZERO, Vec3::new(0.0, 9.0, 0.0))));
}

#[test]
fn sync_from_physics_copies_positions_and_damps() {
    let (mut graph, scene) = make_graph();
    let m = graph.add_mass(Vec3::ZERO);
    let body = graph.mass(m).unwrap().body;
    scene.set_velocity(body, Vec3::new(2.0, 0.0, 0.0));
    scene.integrate(1.0);
    graph.sync_from_physics(2.0);
    assert_eq!(graph.mass(m).unwrap().position, Vec3::new(2.0, 0.0, 0.0));
    assert_eq!(scene.body(body).unwrap().velocity, Vec3::new(1.0, 0.0, 0.0));
}

// =============================================================
// connect_all
// =============================================================

#[test]
fn connect_all_is_idempotent() {
    let (mut graph, _) = make_graph();
    let ids = add_masses(&mut graph, 4);
    let first = graph.connect_all(&ids).unwrap();
    let second = graph.connect_all(&ids).unwrap();
    assert_eq!(first.len(), 6);
    assert!(second.is_empty());
    assert_eq!(graph.spring_count(), 4 * 3 / 2);
    assert_partition(&graph);
}

#[test]
fn connect_all_skips_existing_pairs() {
    let (mut graph, _) = make_graph();
    let ids = add_masses(&mut graph, 3);
    graph.add_spring(ids[1], ids[0]).unwrap();
    let added = graph.connect_all(&ids).unwrap();
    assert_eq!(added.len(), 2);
    assert_eq!(graph.spring_count(), 3);
}

#[test]
fn connect_all_ignores_duplicate_inputs() {
    let (mut graph, _) = make_graph();
    let ids = add_masses(&mut graph, 2);
    let added = graph.connect_all(&[ids[0], ids[0], ids[1]]).unwrap();
    assert_eq!(added.len(), 1);
}

#[test]
fn connect_all_unknown_mass_creates_nothing() {
    let (mut graph, _) = make_graph();
    let ids = add_masses(&mut graph, 2);
    let ghost = MassId::new();
    assert!(graph.connect_all(&[ids[0], ids[1], ghost]).is_err());
    assert_eq!(graph.spring_count(), 0);
}

// =============================================================
// Groups
// =============================================================

#[test]
fn group_springs_needs_two_distinct() {
    let (mut graph, _) = make_graph();
    let ids = add_masses(&mut graph, 2);
    let s = graph.add_spring(ids[0], ids[1]).unwrap();
    assert_eq!(graph.group_springs(&[]).unwrap(), None);
    assert_eq!(graph.group_springs(&[s]).unwrap(), None);
    assert_eq!(graph.group_springs(&[s, s]).unwrap(), None);
}

#[test]
fn group_springs_pulls_in_all_group_mates() {
    let (mut graph, _) = make_graph();
    let ids = add_masses(&mut graph, 5);
    let s: Vec<SpringId> = (0..4).map(|i| graph.add_spring(ids[i], ids[i + 1]).unwrap()).collect();

    let g1 = graph.group_springs(&[s[0], s[1]]).unwrap().unwrap();
    let g2 = graph.group_springs(&[s[2], s[3]]).unwrap().unwrap();
    // One representative from each group is enough.
    let g3 = graph.group_springs(&[s[0], s[3]]).unwrap().unwrap();

    assert_eq!(members(&graph, g3), s.iter().copied().collect());
    assert!(graph.group(g1).is_none());
    assert!(graph.group(g2).is_none());
    assert_eq!(graph.group_count(), 1);
    for id in &s {
        assert_eq!(graph.spring(*id).unwrap().group, g3);
    }
    assert_partition(&graph);
}

#[test]
fn group_springs_again_returns_none() {
    let (mut graph, _) = make_graph();
    let ids = add_masses(&mut graph, 4);
    let s: Vec<SpringId> = (0..3).map(|i| graph.add_spring(ids[i], ids[i + 1]).unwrap()).collect();
    let g = graph.group_springs(&s).unwrap();
    assert!(g.is_some());
    assert_eq!(graph.group_springs(&s).unwrap(), None);
    assert_eq!(graph.group_springs(&s[..2]).unwrap(), None);
    assert_eq!(graph.group_count(), 1);
}

#[test]
fn group_springs_unknown_spring_changes_nothing() {
    let (mut graph, _) = make_graph();
    let ids = add_masses(&mut graph, 3);
    let a = graph.add_spring(ids[0], ids[1]).unwrap();
    let b = graph.add_spring(ids[1], ids[2]).unwrap();
    let ghost = SpringId::new();
    assert_eq!(graph.group_springs(&[a, b, ghost]).unwrap_err(), GraphError::UnknownSpring(ghost));
    assert_eq!(graph.group_count(), 2);
}

#[test]
fn cleanup_group_keeps_non_empty_group() {
    let (mut graph, _) = make_graph();
    let ids = add_masses(&mut graph, 3);
    let a = graph.add_spring(ids[0], ids[1]).unwrap();
    let b = graph.add_spring(ids[1], ids[2]).unwrap();
    let g = graph.group_springs(&[a, b]).unwrap().unwrap();
    graph.delete_spring(a).unwrap();
    assert!(!graph.cleanup_group(g));
    assert_eq!(members(&graph, g), HashSet::from([b]));
}

#[test]
fn cleanup_retired_group_is_noop() {
    let (mut graph, _) = make_graph();
    assert!(!graph.cleanup_group(GroupId::new()));
}

#[test]
fn group_of_tracks_membership() {
    let (mut graph, _) = make_graph();
    let ids = add_masses(&mut graph, 3);
    let a = graph.add_spring(ids[0], ids[1]).unwrap();
    let b = graph.add_spring(ids[1], ids[2]).unwrap();
    let g = graph.group_springs(&[a, b]).unwrap().unwrap();
    assert_eq!(graph.group_of(a).unwrap().id, g);
    assert!(graph.group_of(SpringId::new()).is_none());
}

// =============================================================
// Partition under random edit sequences
// =============================================================

#[test]
fn partition_holds_under_random_edits() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..20 {
        let (mut graph, scene) = make_graph();
        let ids = add_masses(&mut graph, 8);
        for _ in 0..120 {
            let live: Vec<SpringId> = graph.springs().map(|s| s.id).collect();
            match rng.random_range(0..3) {
                0 => {
                    let a = ids[rng.random_range(0..ids.len())];
                    let b = ids[rng.random_range(0..ids.len())];
                    let result = graph.add_spring(a, b);
                    assert_eq!(result.is_err(), a == b);
                }
                1 if !live.is_empty() => {
                    let s = live[rng.random_range(0..live.len())];
                    let removed = graph.delete_spring(s).unwrap();
                    graph.cleanup_group(removed.group);
                }
                2 if live.len() >= 2 => {
                    let picks: Vec<SpringId> =
                        (0..rng.random_range(2..=3)).map(|_| live[rng.random_range(0..live.len())]).collect();
                    graph.group_springs(&picks).unwrap();
                }
                _ => {}
            }
            assert_partition(&graph);
            assert!(graph.groups().all(|g| !g.members.is_empty()));
        }
        assert_eq!(scene.joint_count(), graph.spring_count());
        assert_eq!(scene.visual_count(), graph.spring_count());
    }
}
