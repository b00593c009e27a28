//! Snapshot codec: the persisted node/edge/group JSON form of a graph.
//!
//! DESIGN
//! ======
//! Masses are written as `nodes` keyed by their creation index. Springs are
//! written as `edges` keyed by the text pair `(i,j)` of their endpoints'
//! node keys, in group order. Every live group, singletons included, is
//! written as a list of edge keys under `groups`.
//!
//! Loading is two-phase. [`Snapshot::plan`] validates the whole payload
//! into a [`SnapshotPlan`] without touching any graph; only
//! [`SnapshotPlan::commit`] mutates, and it cannot fail on input data. A
//! malformed file therefore never leaves half a network behind. Commit
//! appends to whatever the graph already holds.
//!
//! ERROR HANDLING
//! ==============
//! Parse failures surface as `Json`, structural problems as `Malformed`,
//! file access as `Io`. Two springs with the same endpoint indices cannot
//! both be keyed; the later one is dropped with a warning on capture.

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod snapshot_test;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{info, warn};

use crate::graph::{GraphError, GroupId, MassId, SpringGraph, SpringId, SpringParams};
use crate::point::Vec3;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed snapshot: {0}")]
    Malformed(String),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Edge key: the node keys of a spring's start and end, rendered `(i,j)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub start: usize,
    pub end: usize,
}

impl EdgeKey {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.start, self.end)
    }
}

impl FromStr for EdgeKey {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || SnapshotError::Malformed(format!("bad edge key {s:?}"));
        let inner = s.trim().strip_prefix('(').and_then(|r| r.strip_suffix(')')).ok_or_else(bad)?;
        let (start, end) = inner.split_once(',').ok_or_else(bad)?;
        let start = start.trim().parse().map_err(|_| bad())?;
        let end = end.trim().parse().map_err(|_| bad())?;
        Ok(Self { start, end })
    }
}

impl Serialize for EdgeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EdgeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Mass position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Spring parameters as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub length: f64,
    pub stiffness: f64,
    pub damping: f64,
}

impl From<SpringParams> for EdgeRecord {
    fn from(p: SpringParams) -> Self {
        Self { length: p.rest_length, stiffness: p.stiffness, damping: p.damping }
    }
}

impl From<EdgeRecord> for SpringParams {
    fn from(r: EdgeRecord) -> Self {
        Self { rest_length: r.length, stiffness: r.stiffness, damping: r.damping }
    }
}

/// The persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: BTreeMap<usize, NodeRecord>,
    /// File order is creation order on load.
    #[serde(with = "ordered_edges")]
    pub edges: Vec<(EdgeKey, EdgeRecord)>,
    #[serde(default)]
    pub groups: BTreeMap<usize, Vec<EdgeKey>>,
}

/// `edges` is a JSON object whose entry order matters; keep it as a list.
mod ordered_edges {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    use super::{EdgeKey, EdgeRecord};

    pub fn serialize<S: Serializer>(edges: &[(EdgeKey, EdgeRecord)], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(edges.len()))?;
        for (key, record) in edges {
            map.serialize_entry(key, record)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<(EdgeKey, EdgeRecord)>, D::Error> {
        struct EdgesVisitor;

        impl<'de> Visitor<'de> for EdgesVisitor {
            type Value = Vec<(EdgeKey, EdgeRecord)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of edge keys to spring parameters")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut edges = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry::<EdgeKey, EdgeRecord>()? {
                    edges.push(entry);
                }
                Ok(edges)
            }
        }

        deserializer.deserialize_map(EdgesVisitor)
    }
}

// =============================================================================
// CAPTURE / ENCODE
// =============================================================================

impl Snapshot {
    /// Capture the graph's masses, springs, and groups.
    #[must_use]
    pub fn capture(graph: &SpringGraph) -> Self {
        let mut nodes = BTreeMap::new();
        let mut index: HashMap<MassId, usize> = HashMap::new();
        for (i, mass) in graph.masses().enumerate() {
            nodes.insert(i, NodeRecord { x: mass.position.x, y: mass.position.y, z: mass.position.z });
            index.insert(mass.id, i);
        }

        let mut edges: Vec<(EdgeKey, EdgeRecord)> = Vec::with_capacity(graph.spring_count());
        let mut seen: HashSet<EdgeKey> = HashSet::new();
        let mut groups = BTreeMap::new();
        for group in graph.groups() {
            let mut keys = Vec::with_capacity(group.members.len());
            for spring in group.members.iter().filter_map(|s| graph.spring(*s)) {
                let (Some(&start), Some(&end)) = (index.get(&spring.start), index.get(&spring.end)) else {
                    continue;
                };
                let key = EdgeKey::new(start, end);
                if !seen.insert(key) {
                    warn!(%key, spring = %spring.id, "parallel spring dropped from snapshot");
                    continue;
                }
                edges.push((key, spring.params.into()));
                keys.push(key);
            }
            if !keys.is_empty() {
                groups.insert(groups.len(), keys);
            }
        }
        Self { nodes, edges, groups }
    }

    /// Tab-indented JSON.
    ///
    /// # Errors
    ///
    /// `Json` if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String, SnapshotError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        String::from_utf8(buf).map_err(|e| SnapshotError::Malformed(e.to_string()))
    }

    /// # Errors
    ///
    /// `Json` if `text` is not a snapshot document.
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(text)?)
    }

    // =========================================================================
    // VALIDATE
    // =========================================================================

    /// Validate the document into a plan that can be committed without failure.
    ///
    /// # Errors
    ///
    /// `Malformed` for self-loop edges, edges naming missing nodes, duplicate
    /// edge keys, group entries naming unknown edges, or an edge listed in
    /// more than one group.
    pub fn plan(&self) -> Result<SnapshotPlan, SnapshotError> {
        let nodes: Vec<(usize, Vec3)> = self.nodes.iter().map(|(&k, n)| (k, Vec3::new(n.x, n.y, n.z))).collect();

        let mut edge_index: HashMap<EdgeKey, usize> = HashMap::with_capacity(self.edges.len());
        let mut edges = Vec::with_capacity(self.edges.len());
        for (key, record) in &self.edges {
            if key.start == key.end {
                return Err(SnapshotError::Malformed(format!("edge {key} is a self-loop")));
            }
            for end in [key.start, key.end] {
                if !self.nodes.contains_key(&end) {
                    return Err(SnapshotError::Malformed(format!("edge {key} names missing node {end}")));
                }
            }
            if edge_index.insert(*key, edges.len()).is_some() {
                return Err(SnapshotError::Malformed(format!("duplicate edge {key}")));
            }
            edges.push((*key, SpringParams::from(*record)));
        }

        let mut owner: HashMap<usize, usize> = HashMap::new();
        let mut groups = Vec::with_capacity(self.groups.len());
        for (&group, keys) in &self.groups {
            let mut members = Vec::with_capacity(keys.len());
            for key in keys {
                let &edge = edge_index
                    .get(key)
                    .ok_or_else(|| SnapshotError::Malformed(format!("group {group} names unknown edge {key}")))?;
                match owner.get(&edge) {
                    Some(&other) if other != group => {
                        return Err(SnapshotError::Malformed(format!(
                            "edge {key} listed in groups {other} and {group}"
                        )));
                    }
                    Some(_) => continue,
                    None => {
                        owner.insert(edge, group);
                        members.push(edge);
                    }
                }
            }
            groups.push(members);
        }

        Ok(SnapshotPlan { nodes, edges, groups })
    }
}

// =============================================================================
// PLAN / COMMIT
// =============================================================================

/// A validated snapshot, ready to append to a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotPlan {
    nodes: Vec<(usize, Vec3)>,
    edges: Vec<(EdgeKey, SpringParams)>,
    /// Indices into `edges`.
    groups: Vec<Vec<usize>>,
}

/// Objects created by a commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub masses: Vec<MassId>,
    pub springs: Vec<SpringId>,
    pub groups: Vec<GroupId>,
}

impl SnapshotPlan {
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Append the planned masses, springs, and groups to `graph`.
    ///
    /// # Errors
    ///
    /// Only graph invariant violations; input data was checked by [`Snapshot::plan`].
    pub fn commit(self, graph: &mut SpringGraph) -> Result<LoadReport, GraphError> {
        let mut report = LoadReport::default();
        let mut masses: HashMap<usize, MassId> = HashMap::with_capacity(self.nodes.len());
        for (key, position) in self.nodes {
            let id = graph.add_mass(position);
            masses.insert(key, id);
            report.masses.push(id);
        }
        for (key, params) in &self.edges {
            let (Some(&a), Some(&b)) = (masses.get(&key.start), masses.get(&key.end)) else {
                return Err(GraphError::InvalidEndpoints);
            };
            report.springs.push(graph.add_spring_with(a, b, *params)?);
        }
        for members in &self.groups {
            let springs: Vec<SpringId> = members.iter().filter_map(|&i| report.springs.get(i).copied()).collect();
            if let Some(group) = graph.group_springs(&springs)? {
                report.groups.push(group);
            }
        }
        info!(
            masses = report.masses.len(),
            springs = report.springs.len(),
            groups = report.groups.len(),
            "snapshot committed"
        );
        Ok(report)
    }
}

// =============================================================================
// FILE IO
// =============================================================================

/// Write a snapshot as tab-indented JSON.
///
/// # Errors
///
/// `Json` or `Io`.
pub async fn save_to_path(snapshot: &Snapshot, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
    let path = path.as_ref();
    let json = snapshot.to_pretty_json()?;
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), nodes = snapshot.nodes.len(), edges = snapshot.edges.len(), "snapshot saved");
    Ok(())
}

/// Read, parse, and validate a snapshot file. The graph is not touched.
///
/// # Errors
///
/// `Io`, `Json`, or `Malformed`.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<SnapshotPlan, SnapshotError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path).await?;
    let plan = Snapshot::from_json(&text)?.plan()?;
    info!(path = %path.display(), nodes = plan.node_count(), edges = plan.edge_count(), "snapshot loaded");
    Ok(plan)
}
