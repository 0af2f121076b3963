//! # Utilities Module
//!
//! Grid pathfinding used by tunnel carving and connectivity checks.

pub mod pathfinding;

pub use self::pathfinding::*;
