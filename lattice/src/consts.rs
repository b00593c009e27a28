//! Shared numeric defaults for the lattice crate.

// ── Springs ─────────────────────────────────────────────────────

/// Rest length given to springs created without an explicit length.
pub const DEFAULT_REST_LENGTH: f64 = 5.0;

/// Stiffness given to springs created without an explicit stiffness.
pub const DEFAULT_STIFFNESS: f64 = 10.0;

/// Damping coefficient given to springs created without an explicit damping.
pub const DEFAULT_DAMPING: f64 = 0.5;

// ── Controls ────────────────────────────────────────────────────

/// Lower bound of the rest-length slider.
pub const CONTROL_MIN: f64 = 1.0;

/// Upper bound of the rest-length slider.
pub const CONTROL_MAX: f64 = 10.0;

// ── Simulation ──────────────────────────────────────────────────

/// Per-frame velocity divisor applied to every body by the render loop.
pub const FRICTION_DIVISOR: f64 = 1.05;

// ── Scene ───────────────────────────────────────────────────────

/// Where `add-mass` places a new mass when no position is given.
pub const SPAWN_POSITION: (f64, f64, f64) = (0.0, 1.0, 0.0);

/// World-space hit slop for picking masses and springs (a mass is a unit-radius sphere).
pub const PICK_RADIUS: f64 = 1.0;
