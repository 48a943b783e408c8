//! Incremental layout of a result set from its pairwise distances.
//!
//! [`TsneOptimizer`] turns a [`DistanceMatrix`] into 2D coordinates a step at
//! a time, [`Simulator`] eases on-screen node positions toward them while
//! resolving overlaps, and [`NodeArena`] keeps node identity stable across
//! result-set changes. [`LayoutEngine`] ties the three together.

mod collide;
mod engine;
mod error;
mod matrix;
mod quadtree;
mod reconcile;
mod simulator;
mod tsne;

pub use engine::LayoutEngine;
pub use error::LayoutError;
pub use matrix::DistanceMatrix;
pub use reconcile::{LinkKind, LinkRecord, NodeArena, ReconcileDiff, ResolvedLink};
pub use simulator::{Simulator, SimulatorParams};
pub use tsne::{TsneOptimizer, TsneParams};
