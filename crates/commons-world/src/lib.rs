//! Grid geometry, routing, and spatial memory for the Commons simulation.
//!
//! This crate owns the spatial half of agent cognition: the belief grid an
//! agent maintains about the world, the frame transforms that fold
//! egocentric observations into that grid, and the router that turns a
//! chosen high-level action into a queue of primitive steps.
//!
//! # Modules
//!
//! - [`error`] -- Error types for grid and routing operations.
//! - [`grid`] -- Rectangular symbol grids with ascii parsing.
//! - [`transform`] -- Local/global frame transforms and connected-component
//!   labeling of same-typed cells.
//! - [`router`] -- BFS shortest paths with a two-phase obstacle fallback
//!   and orientation-aware step generation.
//! - [`spatial`] -- Per-agent spatial memory: last-known-symbol grid,
//!   timestamped merge, and action-to-step translation.
//! - [`scenario`] -- The default shared-resource harvesting map.

pub mod error;
pub mod grid;
pub mod router;
pub mod scenario;
pub mod spatial;
pub mod transform;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use grid::Grid;
pub use router::{RouteQuery, route};
pub use spatial::{SpatialConfig, SpatialMemory};
pub use transform::{Component, connected_components, global_to_local, local_to_global};
