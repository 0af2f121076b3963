//! # Level Generation Driver
//!
//! Runs the whole pipeline and retries until a level is good enough.
//!
//! One attempt is:
//! 1. Synthesize a cave and optionally overlay foliage
//! 2. Place a big and a small vault biased to the center and an edge
//! 3. Fill in more vaults anywhere they fit
//! 4. Connect the vaults with tunnels
//! 5. Run the registered terrain hooks
//! 6. Prune everything unreachable and count what is left
//!
//! An attempt with too few passable cells is thrown away whole and the next
//! one starts from scratch on the same random stream, so the result stays a
//! deterministic function of the seed.

use super::connector::connect_vaults;
use super::context::GenerationContext;
use super::foliage::overlay_foliage;
use super::templates::{VaultLibrary, VaultSize};
use super::terrain::{CaveAlgorithm, CaveSynthesizer, RandomCave};
use super::validation::{find_start, is_fully_connected, prune_unreachable};
use super::vaults::{place_vaults, PlacementRule, Vault};
use super::waypoints::extract_waypoints;
use super::{GenerationConfig, Generator};
use crate::{DelveError, DelveResult, Grid, Mask, Position, TerrainGrid, TerrainKind};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A terrain effect applied after the tunnels are dug and before pruning.
///
/// Hooks may damage connectivity; the pruning pass that follows repairs it.
pub trait TerrainHook {
    /// Mutates the in-progress level.
    fn apply(&self, ctx: &mut GenerationContext, rng: &mut StdRng) -> DelveResult<()>;

    /// Name used in log output.
    fn name(&self) -> &'static str {
        "terrain hook"
    }
}

/// An accepted level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedLevel {
    pub width: i32,
    pub height: i32,
    /// Cave algorithm behind the base terrain
    pub theme: CaveAlgorithm,
    pub terrain: TerrainGrid,
    /// Placed vaults, most central first
    pub vaults: Vec<Vault>,
    pub vault_mask: Mask,
    pub tunnel_mask: Mask,
    /// Cells dug only for redundant tunnels
    pub extra_tunnel_cells: Vec<Position>,
    /// Patrol points for wandering monsters
    pub waypoints: Vec<Position>,
    /// Cell the reachable region was grown from
    pub start: Position,
    pub passable_cells: usize,
    /// Attempt that produced this level, counting from 1
    pub attempts: u32,
}

impl GeneratedLevel {
    /// One-line description for logs and the command line.
    pub fn summary(&self) -> String {
        format!(
            "{}x{} {:?}: {} passable cells, {} vaults, {} waypoints, {} tunnel cells, attempt {}",
            self.width,
            self.height,
            self.theme,
            self.passable_cells,
            self.vaults.len(),
            self.waypoints.len(),
            self.tunnel_mask.set_positions().len(),
            self.attempts
        )
    }
}

/// Generates complete levels with vaults, tunnels and waypoints.
///
/// The cave synthesizer is a type parameter so tests can substitute their own.
///
/// # Examples
///
/// ```
/// use delve::{generation::utils, GenerationConfig, Generator, LevelGenerator};
///
/// let config = GenerationConfig::for_testing(7);
/// let mut rng = utils::create_rng(&config);
/// let level = LevelGenerator::new().generate(&config, &mut rng).unwrap();
/// assert!(level.passable_cells > config.min_passable_cells);
/// ```
pub struct LevelGenerator<S: CaveSynthesizer = RandomCave> {
    synthesizer: S,
    library: VaultLibrary,
    hooks: Vec<Box<dyn TerrainHook>>,
}

impl LevelGenerator<RandomCave> {
    /// Creates a generator with random cave themes and the built-in vaults.
    pub fn new() -> Self {
        Self::with_synthesizer(RandomCave)
    }
}

impl Default for LevelGenerator<RandomCave> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CaveSynthesizer> LevelGenerator<S> {
    /// Creates a generator around a specific cave synthesizer.
    pub fn with_synthesizer(synthesizer: S) -> Self {
        Self {
            synthesizer,
            library: VaultLibrary::builtin(),
            hooks: Vec::new(),
        }
    }

    /// Replaces the vault templates.
    pub fn with_library(mut self, library: VaultLibrary) -> Self {
        self.library = library;
        self
    }

    /// Registers a terrain hook; hooks run in registration order.
    pub fn with_hook(mut self, hook: impl TerrainHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn synthesizer(&self) -> &S {
        &self.synthesizer
    }

    pub fn library(&self) -> &VaultLibrary {
        &self.library
    }

    /// Runs one attempt. `Ok(None)` means the level came out too small.
    fn attempt(
        &self,
        config: &GenerationConfig,
        rng: &mut StdRng,
        attempt: u32,
    ) -> DelveResult<Option<GeneratedLevel>> {
        let mut terrain = Grid::new(config.width, config.height, TerrainKind::Wall);
        let theme = self.synthesizer.synthesize(&mut terrain, rng);
        let mut ctx = GenerationContext::new(terrain, theme);

        if config.foliage {
            overlay_foliage(&mut ctx.terrain, rng);
        }

        let (big_rule, small_rule) = if rng.gen_bool(0.5) {
            (PlacementRule::Center, PlacementRule::Edge)
        } else {
            (PlacementRule::Edge, PlacementRule::Center)
        };
        let requests = [
            (VaultSize::Big, 1, big_rule),
            (VaultSize::Small, 1, small_rule),
            (VaultSize::Big, config.big_vaults_random, PlacementRule::Random),
            (VaultSize::Small, config.small_vaults_random, PlacementRule::Random),
        ];
        for (size, count, rule) in requests {
            place_vaults(&mut ctx, &self.library, size, count, rule, config, rng);
        }

        connect_vaults(&mut ctx, config, rng)?;

        for hook in &self.hooks {
            debug!("Running {} on attempt {}", hook.name(), attempt);
            hook.apply(&mut ctx, rng)?;
        }

        let Some(start) = find_start(&ctx) else {
            debug!("Attempt {} ({:?}) has no passable cells", attempt, theme);
            return Ok(None);
        };
        let passable_cells = prune_unreachable(&mut ctx, start);
        if passable_cells <= config.min_passable_cells {
            debug!(
                "Attempt {} ({:?}) rejected: {} passable cells, need more than {}",
                attempt, theme, passable_cells, config.min_passable_cells
            );
            return Ok(None);
        }

        let waypoints = extract_waypoints(&ctx);
        Ok(Some(GeneratedLevel {
            width: ctx.width(),
            height: ctx.height(),
            theme: ctx.theme,
            terrain: ctx.terrain,
            vaults: ctx.vaults,
            vault_mask: ctx.vault_mask,
            tunnel_mask: ctx.tunnel_mask,
            extra_tunnel_cells: ctx.extra_tunnel_cells,
            waypoints,
            start,
            passable_cells,
            attempts: attempt,
        }))
    }
}

impl<S: CaveSynthesizer> Generator<GeneratedLevel> for LevelGenerator<S> {
    /// Generates a level, retrying until one is accepted.
    ///
    /// There is no retry limit; the defaults are tuned so that almost every
    /// attempt succeeds.
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> DelveResult<GeneratedLevel> {
        config.validate()?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if let Some(level) = self.attempt(config, rng, attempt)? {
                info!(
                    "Generated {}x{} level on attempt {}: {:?}, {} passable cells, {} vaults",
                    level.width,
                    level.height,
                    attempt,
                    level.theme,
                    level.passable_cells,
                    level.vaults.len()
                );
                return Ok(level);
            }
        }
    }

    fn validate(&self, level: &GeneratedLevel, config: &GenerationConfig) -> DelveResult<()> {
        let fail = |message: String| Err(DelveError::GenerationFailed(message));

        if level.terrain.width() != config.width || level.terrain.height() != config.height {
            return fail(format!(
                "level is {}x{}, expected {}x{}",
                level.terrain.width(),
                level.terrain.height(),
                config.width,
                config.height
            ));
        }
        let passable = level.terrain.passable_count();
        if passable != level.passable_cells || passable <= config.min_passable_cells {
            return fail(format!(
                "{} passable cells (reported {}), need more than {}",
                passable, level.passable_cells, config.min_passable_cells
            ));
        }
        if !level.terrain.is_passable(level.start) || !is_fully_connected(&level.terrain) {
            return fail("passable cells are not all connected".to_string());
        }

        let bounds = level.terrain.bounds();
        for (index, vault) in level.vaults.iter().enumerate() {
            let rect = vault.rect();
            if rect.x < 0 || rect.y < 0 || rect.right() > bounds.right() || rect.bottom() > bounds.bottom() {
                return fail(format!("vault {} at {:?} leaves the grid", index, rect));
            }
            if let Some(other) = level.vaults[index + 1..]
                .iter()
                .find(|other| other.rect().grown(1).intersects(&rect.grown(1)))
            {
                return fail(format!(
                    "vaults at {:?} and {:?} are too close",
                    rect,
                    other.rect()
                ));
            }
        }

        if let Some(waypoint) = level.waypoints.iter().find(|&&pos| !level.terrain.is_passable(pos)) {
            return fail(format!("waypoint {:?} is not passable", waypoint));
        }
        if let Some(cell) = level
            .tunnel_mask
            .set_positions()
            .into_iter()
            .find(|&pos| !level.terrain.is_passable(pos))
        {
            return fail(format!("tunnel cell {:?} is not passable", cell));
        }

        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "LevelGenerator"
    }
}
