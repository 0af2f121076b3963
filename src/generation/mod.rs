//! # Generation Module
//!
//! Procedural level generation: cave synthesis, vault placement, tunnel
//! carving, connectivity repair and waypoint extraction.
//!
//! The stages are plain functions over a [`GenerationContext`]; the
//! [`LevelGenerator`] driver wires them together and owns the retry loop.

pub mod connector;
pub mod context;
pub mod dungeon;
pub mod foliage;
pub mod templates;
pub mod terrain;
pub mod validation;
pub mod vaults;
pub mod waypoints;

pub use connector::*;
pub use context::*;
pub use dungeon::*;
pub use foliage::*;
pub use templates::*;
pub use terrain::*;
pub use validation::*;
pub use vaults::*;
pub use waypoints::*;

use crate::{config, DelveError, DelveResult};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for level generation.
///
/// Controls the grid size, the acceptance threshold, the vault mix and the
/// tuned constants of the tunnel network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    /// Grid width in cells
    pub width: i32,
    /// Grid height in cells
    pub height: i32,
    /// An attempt is accepted only with strictly more passable cells than this
    pub min_passable_cells: usize,
    /// Big vaults placed with the unconstrained rule after the biased pair
    pub big_vaults_random: u32,
    /// Small vaults placed with the unconstrained rule
    pub small_vaults_random: u32,
    /// Template picks per requested vault before giving up
    pub placement_attempts: u32,
    /// Transform and anchor candidates tried per picked template
    pub transform_attempts: u32,
    /// Fewest redundant tunnels added after the spanning pass
    pub extra_tunnels_min: u32,
    /// Most redundant tunnels added after the spanning pass
    pub extra_tunnels_max: u32,
    /// Vaults with this many tunnels get no redundant ones
    pub max_tunnels_per_vault: u32,
    /// Nearest neighbours considered for a redundant tunnel
    pub neighbor_search_width: usize,
    /// Neighbours considered when the search is extended
    pub far_neighbor_search_width: usize,
    /// Probability of extending the neighbour search (0.0 to 1.0)
    pub far_neighbor_chance: f64,
    /// Probability a carved tunnel cell becomes rubble (0.0 to 1.0)
    pub tunnel_rubble_chance: f64,
    /// Probability a carved tunnel cell becomes foliage (0.0 to 1.0)
    pub tunnel_foliage_chance: f64,
    /// Whether to run the foliage overlay
    pub foliage: bool,
}

impl GenerationConfig {
    /// Creates the standard configuration for the given seed.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::GenerationConfig;
    ///
    /// let config = GenerationConfig::new(12345);
    /// assert_eq!((config.width, config.height), (80, 21));
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            width: config::DEFAULT_DUNGEON_WIDTH,
            height: config::DEFAULT_DUNGEON_HEIGHT,
            min_passable_cells: config::DEFAULT_MIN_PASSABLE_CELLS,
            big_vaults_random: 1,
            small_vaults_random: 5,
            placement_attempts: 500,
            transform_attempts: 10,
            extra_tunnels_min: 3,
            extra_tunnels_max: 5,
            max_tunnels_per_vault: 3,
            neighbor_search_width: 2,
            far_neighbor_search_width: 4,
            far_neighbor_chance: 0.2,
            tunnel_rubble_chance: 0.04,
            tunnel_foliage_chance: 0.04,
            foliage: true,
        }
    }

    /// Creates a configuration for testing with fewer vaults, a lower
    /// acceptance threshold and smaller attempt budgets.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            min_passable_cells: 600,
            small_vaults_random: 2,
            placement_attempts: 100,
            foliage: false,
            ..Self::new(seed)
        }
    }

    /// Parses a configuration from JSON text. Missing fields take their
    /// default values; unknown fields are rejected.
    pub fn from_json_str(text: &str) -> DelveResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> DelveResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Resizes the grid and scales `min_passable_cells` by the change in
    /// interior area, so the acceptance density stays the same.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::GenerationConfig;
    ///
    /// let config = GenerationConfig::new(7).with_size(160, 21);
    /// assert_eq!(config.width, 160);
    /// assert!(config.min_passable_cells > 2000);
    /// ```
    pub fn with_size(mut self, width: i32, height: i32) -> Self {
        let before = Self::interior_cells(self.width, self.height);
        let after = Self::interior_cells(width, height);
        if before > 0 {
            let scaled = self.min_passable_cells as u128 * after as u128 / before as u128;
            self.min_passable_cells = usize::try_from(scaled).unwrap_or(usize::MAX);
        }
        self.width = width;
        self.height = height;
        self
    }

    /// Cells inside the solid outer ring of a `width` x `height` grid.
    fn interior_cells(width: i32, height: i32) -> u64 {
        let inner = |side: i32| u64::try_from(side.saturating_sub(2)).unwrap_or(0);
        inner(width) * inner(height)
    }

    /// Checks that the configuration can produce a level.
    pub fn validate(&self) -> DelveResult<()> {
        if self.width < 20 || self.height < 10 {
            return Err(DelveError::InvalidConfig(format!(
                "grid {}x{} is smaller than the 20x10 minimum",
                self.width, self.height
            )));
        }
        let cells = i64::from(self.width) * i64::from(self.height);
        if cells > config::MAX_DUNGEON_CELLS {
            return Err(DelveError::InvalidConfig(format!(
                "grid {}x{} exceeds the {} cell maximum",
                self.width,
                self.height,
                config::MAX_DUNGEON_CELLS
            )));
        }
        let interior = Self::interior_cells(self.width, self.height);
        let ceiling = (interior as f64 * config::MAX_PASSABLE_DENSITY) as usize;
        if self.min_passable_cells > ceiling {
            return Err(DelveError::InvalidConfig(format!(
                "min_passable_cells {} exceeds {} ({}% of the {} interior cells)",
                self.min_passable_cells,
                ceiling,
                config::MAX_PASSABLE_DENSITY * 100.0,
                interior
            )));
        }
        if self.extra_tunnels_min > self.extra_tunnels_max {
            return Err(DelveError::InvalidConfig(format!(
                "extra_tunnels_min {} exceeds extra_tunnels_max {}",
                self.extra_tunnels_min, self.extra_tunnels_max
            )));
        }
        if self.placement_attempts == 0 || self.transform_attempts == 0 {
            return Err(DelveError::InvalidConfig(
                "placement and transform attempt budgets must be positive".to_string(),
            ));
        }
        if self.neighbor_search_width == 0
            || self.far_neighbor_search_width < self.neighbor_search_width
        {
            return Err(DelveError::InvalidConfig(format!(
                "neighbour search widths {} / {} must be positive and non-decreasing",
                self.neighbor_search_width, self.far_neighbor_search_width
            )));
        }
        for (name, value) in [
            ("far_neighbor_chance", self.far_neighbor_chance),
            ("tunnel_rubble_chance", self.tunnel_rubble_chance),
            ("tunnel_foliage_chance", self.tunnel_foliage_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DelveError::InvalidConfig(format!(
                    "{} must be within 0.0..=1.0, got {}",
                    name, value
                )));
            }
        }
        if self.tunnel_rubble_chance + self.tunnel_foliage_chance > 1.0 {
            return Err(DelveError::InvalidConfig(
                "tunnel rubble and foliage chances add up to more than 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Trait for procedural generators.
///
/// Generators consume the caller's random source so that generation can be
/// followed by other seeded steps on the same stream.
pub trait Generator<T> {
    /// Generates content using the provided configuration and random number generator.
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> DelveResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T, config: &GenerationConfig) -> DelveResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// Utility functions for generation algorithms.
pub mod utils {
    use super::*;
    use rand::SeedableRng;

    /// Creates a seeded random number generator from the config.
    pub fn create_rng(config: &GenerationConfig) -> StdRng {
        StdRng::seed_from_u64(config.seed)
    }
}
