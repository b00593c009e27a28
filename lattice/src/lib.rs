//! Interaction and graph-consistency core for an editable mass-spring network.
//!
//! This crate owns everything between raw pointer/keyboard input and the
//! external 3D scene and physics engine: the live multigraph of masses and
//! springs, the partition of springs into groups that share one rest-length
//! control, the modifier-driven selection state machine, the composite edit
//! operations that keep all of that consistent, and the JSON snapshot codec.
//! Rendering and force integration are reached only through the
//! [`backend::Physics`] and [`backend::Render`] traits; the host applies the
//! [`engine::Action`]s returned from every input handler to its presentation
//! layer (highlighting, slider panels).
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level [`engine::EngineCore`]: event dispatch, commands, render-loop tick |
//! | [`graph`] | Graph store: masses, springs, spring groups |
//! | [`selection`] | Selection sets, group reveal, and the pointer-down reducer |
//! | [`input`] | Modifier keys, buttons, gestures, and the drag state |
//! | [`edit`] | Composite edits: delete, merge, connect-all, group |
//! | [`snapshot`] | Node/edge/group JSON snapshots |
//! | [`backend`] | Physics and render collaborator contracts |
//! | [`headless`] | In-memory collaborator used by tests and the CLI host |
//! | [`config`] | Engine configuration from environment variables |
//! | [`point`] | 3-vector math |
//! | [`consts`] | Shared numeric defaults |

pub mod backend;
pub mod config;
pub mod consts;
pub mod edit;
pub mod engine;
pub mod graph;
pub mod headless;
pub mod input;
pub mod point;
pub mod selection;
pub mod snapshot;
