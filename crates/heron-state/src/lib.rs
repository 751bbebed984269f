#![forbid(unsafe_code)]

//! State-diagram layout in three refinement phases.
//!
//! A [`StateChart`] is laid out coarse first (states only), then with a box per transition,
//! then complete with self-loops and connector waypoints. Each phase is a [`heron::Graph`]
//! seeded from the converged positions of the one before. Hosts call [`StateLayout::step`]
//! once per frame and draw [`StateLayout::snapshot`].

pub mod clock;
pub mod cluster;
pub mod config;
pub mod diagram;
pub mod error;
pub mod layout;
pub mod model;
mod seed;
pub mod snapshot;

pub use clock::{Clock, StepClock, SystemClock};
pub use cluster::Cluster;
pub use config::LayoutConfig;
pub use diagram::{Detail, Diagram, ElementKind};
pub use error::{Error, Result};
pub use layout::{Phase, Progress, StateLayout};
pub use model::{Dimensions, INITIAL_STATE_ID, State, StateChart, Transition};
pub use snapshot::{EdgeLayout, LayoutSnapshot, NodeLayout};
