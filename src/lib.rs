//! # Delve
//!
//! Procedural level generation for cave-and-vault roguelike dungeons.
//!
//! ## Architecture Overview
//!
//! A level is built in a single synchronous call that is a pure function of the
//! configuration, the vault library and the state of the caller's random source.
//! Each generation attempt runs the same pipeline:
//!
//! - **Terrain Synthesizer**: fills the grid with a stochastic cave shape
//! - **Foliage Overlay**: stamps an independent foliage pattern onto the floor
//! - **Vault Placer**: fits hand-authored room templates without overlap
//! - **Vault Connector**: carves tunnels along weighted shortest paths
//! - **Validator & Pruner**: walls off anything unreachable from the start
//! - **Waypoint Extractor**: collects patrol points for monster AI
//!
//! Attempts whose pruned passable area is too small are discarded wholesale and
//! retried, so callers only ever receive a fully connected level.
//!
//! ```
//! use delve::{GenerationConfig, Generator, LevelGenerator};
//!
//! let config = GenerationConfig::new(7);
//! let mut rng = delve::generation::utils::create_rng(&config);
//! let level = LevelGenerator::new().generate(&config, &mut rng).unwrap();
//! assert!(level.passable_cells > config.min_passable_cells);
//! ```

pub mod generation;
pub mod map;
pub mod utils;

pub use generation::*;
pub use map::*;
pub use utils::*;

/// Core error type for level generation.
#[derive(thiserror::Error, Debug)]
pub enum DelveError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Generation configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A vault template could not be parsed
    #[error("Invalid vault template: {0}")]
    InvalidTemplate(String),

    /// Generation failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// No tunnel route exists between two entry points. The tunnel cost
    /// function keeps every cell traversable, so this indicates a defect.
    #[error("No tunnel path from {from:?} to {to:?}")]
    TunnelPathNotFound { from: Position, to: Position },
}

/// Result type used throughout the Delve codebase.
pub type DelveResult<T> = Result<T, DelveError>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default generation constants.
pub mod config {
    /// Default dungeon width in cells
    pub const DEFAULT_DUNGEON_WIDTH: i32 = 80;

    /// Default dungeon height in cells
    pub const DEFAULT_DUNGEON_HEIGHT: i32 = 21;

    /// Passable cells an accepted level must exceed on the default grid
    pub const DEFAULT_MIN_PASSABLE_CELLS: usize = 1000;

    /// Largest grid, in cells, a config may ask for
    pub const MAX_DUNGEON_CELLS: i64 = 1 << 22;

    /// Highest acceptance threshold as a share of the interior cells
    pub const MAX_PASSABLE_DENSITY: f64 = 0.75;
}
