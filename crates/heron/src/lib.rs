#![forbid(unsafe_code)]

//! Incremental force-directed graph layout.
//!
//! `heron` simulates nodes as charged particles and edges as logarithmic springs. A quad-tree
//! keeps the repulsion pass local, and an adaptive time step lets the simulation settle on its
//! own. The engine is step-driven: callers invoke [`Graph::update`] as often as their time
//! budget allows and watch the returned energy.

pub mod config;
pub mod error;
pub mod geom;
pub mod graph;
pub mod physics;
pub mod quadtree;
pub mod rng;

pub use config::PhysicsConfig;
pub use error::{Error, Result};
pub use geom::{Point, Size, Square, Vector, point, vector};
pub use graph::Graph;
pub use physics::{Edge, Node};
pub use quadtree::{CellId, QuadTree};
