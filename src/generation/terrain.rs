//! # Terrain Synthesis
//!
//! Stochastic cave shapes that form the base layer of every level.
//!
//! Four families are available: a noise-smoothing cellular automaton, a
//! random-walk carver, a tree-structured random-walk carver, and left/right
//! blends of two different base shapes. Synthesis never fails; caves that
//! turn out too small are rejected later by the validator.

use crate::{Direction, Grid, Position, Rect, TerrainGrid, TerrainKind};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Initial open-cell densities the automaton picks from.
pub const AUTOMATON_OPEN_CHANCES: [f64; 3] = [0.42, 0.45, 0.48];

/// Wall-neighbour counts (out of 8) at which a cell becomes wall, per smoothing round.
pub const AUTOMATON_WALL_THRESHOLDS: [usize; 2] = [6, 5];

/// Random-walk target, in carved cells per column of the region.
pub const WALK_CELLS_PER_COLUMN: usize = 16;

/// Tree-walk target, in carved cells per column of the region.
pub const TREE_CELLS_PER_COLUMN: usize = 15;

/// Longest walk the tree carver keeps before discarding it.
pub const TREE_MAX_WALK: usize = 200;

/// Columns shared by both halves of a blended cave.
pub const BLEND_OVERLAP: i32 = 4;

/// A single cave-shaping algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseCave {
    /// Random fill followed by majority-rule smoothing
    Automaton,
    /// One walker carving until a cell budget is spent
    RandomWalk,
    /// Walks from random cells that are kept once they hit the existing cave
    TreeWalk,
}

impl BaseCave {
    pub const ALL: [BaseCave; 3] = [BaseCave::Automaton, BaseCave::RandomWalk, BaseCave::TreeWalk];
}

/// The cave shape of a level, recorded as the level's theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaveAlgorithm {
    Automaton,
    RandomWalk,
    TreeWalk,
    /// Two different shapes on overlapping left and right halves
    Blend { left: BaseCave, right: BaseCave },
}

impl CaveAlgorithm {
    /// Picks an algorithm: each base shape and the blend family are equally likely.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        match rng.gen_range(0..4) {
            0 => CaveAlgorithm::Automaton,
            1 => CaveAlgorithm::RandomWalk,
            2 => CaveAlgorithm::TreeWalk,
            _ => {
                let mut pair = BaseCave::ALL;
                pair.shuffle(rng);
                CaveAlgorithm::Blend {
                    left: pair[0],
                    right: pair[1],
                }
            }
        }
    }

    /// Writes this cave shape into a wall-filled grid.
    pub fn apply<R: Rng>(self, terrain: &mut TerrainGrid, rng: &mut R) {
        let bounds = terrain.bounds();
        match self {
            CaveAlgorithm::Automaton => carve_region(terrain, bounds, BaseCave::Automaton, rng),
            CaveAlgorithm::RandomWalk => carve_region(terrain, bounds, BaseCave::RandomWalk, rng),
            CaveAlgorithm::TreeWalk => carve_region(terrain, bounds, BaseCave::TreeWalk, rng),
            CaveAlgorithm::Blend { left, right } => {
                let half = bounds.width / 2;
                let left_region = Rect::new(0, 0, half + BLEND_OVERLAP, bounds.height);
                let right_x = half - BLEND_OVERLAP;
                let right_region = Rect::new(right_x, 0, bounds.width - right_x, bounds.height);
                carve_region(terrain, left_region, left, rng);
                carve_region(terrain, right_region, right, rng);
            }
        }
    }
}

/// Source of the base cave layer for a generation attempt.
pub trait CaveSynthesizer {
    /// Overwrites the wall-filled `terrain` with a cave and reports which
    /// algorithm produced it.
    fn synthesize(&self, terrain: &mut TerrainGrid, rng: &mut StdRng) -> CaveAlgorithm;
}

/// Picks a random [`CaveAlgorithm`] for every attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCave;

impl CaveSynthesizer for RandomCave {
    fn synthesize(&self, terrain: &mut TerrainGrid, rng: &mut StdRng) -> CaveAlgorithm {
        let algorithm = CaveAlgorithm::random(rng);
        algorithm.apply(terrain, rng);
        algorithm
    }
}

/// Always uses the same [`CaveAlgorithm`].
#[derive(Debug, Clone, Copy)]
pub struct FixedCave(pub CaveAlgorithm);

impl CaveSynthesizer for FixedCave {
    fn synthesize(&self, terrain: &mut TerrainGrid, rng: &mut StdRng) -> CaveAlgorithm {
        self.0.apply(terrain, rng);
        self.0
    }
}

/// Runs one base algorithm on a scratch grid the size of `region` and opens
/// every cell it opened. Cells it leaves as wall are not touched, so
/// overlapping regions combine.
fn carve_region<R: Rng>(terrain: &mut TerrainGrid, region: Rect, cave: BaseCave, rng: &mut R) {
    let scratch = match cave {
        BaseCave::Automaton => {
            let open_chance = *AUTOMATON_OPEN_CHANCES
                .choose(rng)
                .unwrap_or(&AUTOMATON_OPEN_CHANCES[0]);
            automaton_cave(
                rng,
                region.width,
                region.height,
                TerrainKind::Floor,
                open_chance,
                &AUTOMATON_WALL_THRESHOLDS,
            )
        }
        BaseCave::RandomWalk => random_walk_cave(
            rng,
            region.width,
            region.height,
            region.width as usize * WALK_CELLS_PER_COLUMN,
        ),
        BaseCave::TreeWalk => tree_walk_cave(
            rng,
            region.width,
            region.height,
            region.width as usize * TREE_CELLS_PER_COLUMN,
            TREE_MAX_WALK,
        ),
    };

    for (local, &kind) in scratch.iter() {
        if kind != TerrainKind::Wall {
            let pos = Position::new(region.x + local.x, region.y + local.y);
            if let Some(cell) = terrain.get_mut(pos) {
                *cell = kind;
            }
        }
    }
}

/// Cellular-automaton cave on a fresh `width` x `height` grid.
///
/// Every cell starts as `open` with probability `open_chance`, then each
/// entry of `wall_thresholds` is one smoothing round: a cell becomes wall when
/// at least that many of its 8 neighbours are walls, and `open` otherwise.
/// Cells outside the grid count as walls, and the outer ring ends up wall.
pub fn automaton_cave<R: Rng>(
    rng: &mut R,
    width: i32,
    height: i32,
    open: TerrainKind,
    open_chance: f64,
    wall_thresholds: &[usize],
) -> TerrainGrid {
    let mut grid = Grid::new(width, height, TerrainKind::Wall);
    for pos in grid.bounds().positions() {
        if rng.gen_bool(open_chance) {
            grid[pos] = open;
        }
    }

    for &threshold in wall_thresholds {
        let mut next = Grid::new(width, height, TerrainKind::Wall);
        for pos in grid.bounds().positions() {
            let walls = pos
                .adjacent_positions()
                .into_iter()
                .filter(|&n| grid.get(n).map_or(true, |&kind| kind == TerrainKind::Wall))
                .count();
            if walls < threshold {
                next[pos] = open;
            }
        }
        grid = next;
    }

    // Same solid frame the walkers and vault placement keep.
    for pos in grid.bounds().positions() {
        if grid.on_border(pos) {
            grid[pos] = TerrainKind::Wall;
        }
    }
    grid
}

/// Direction for a walker: horizontal moves are 3 in 10 each, vertical 2 in 10.
fn walker_direction<R: Rng>(rng: &mut R) -> Direction {
    match rng.gen_range(0..10) {
        0..=2 => Direction::East,
        3..=5 => Direction::West,
        6 | 7 => Direction::North,
        _ => Direction::South,
    }
}

/// Region cells a walker may visit; the outer ring stays wall.
fn walk_area(width: i32, height: i32) -> Rect {
    Rect::new(1, 1, (width - 2).max(1), (height - 2).max(1))
}

/// Single-walker cave carved from the center until `target` cells are floor.
///
/// The target is capped at 90% of the walkable area.
pub fn random_walk_cave<R: Rng>(rng: &mut R, width: i32, height: i32, target: usize) -> TerrainGrid {
    let mut grid = Grid::new(width, height, TerrainKind::Wall);
    let area = walk_area(width, height);
    let target = target.min(area.area() * 9 / 10);
    let max_steps = area.area() * 100;

    let mut pos = Position::new(width / 2, height / 2);
    let mut carved = 0;
    for _ in 0..max_steps {
        if carved >= target {
            break;
        }
        if let Some(cell) = grid.get_mut(pos) {
            if *cell == TerrainKind::Wall {
                *cell = TerrainKind::Floor;
                carved += 1;
            }
        }
        let next = pos.step(walker_direction(rng));
        if area.contains(next) {
            pos = next;
        }
    }

    grid
}

/// Tree-structured cave: a small blob at the center grows by random walks
/// that start on a wall cell and are carved whole once they touch the
/// existing cave. Walks longer than `max_walk` steps are dropped.
///
/// The result is connected by construction.
pub fn tree_walk_cave<R: Rng>(
    rng: &mut R,
    width: i32,
    height: i32,
    target: usize,
    max_walk: usize,
) -> TerrainGrid {
    let mut grid = Grid::new(width, height, TerrainKind::Wall);
    let area = walk_area(width, height);
    let target = target.min(area.area() * 9 / 10);
    let max_walks = area.area() * 20;

    let center = Position::new(width / 2, height / 2);
    let mut carved = 0;
    for pos in std::iter::once(center).chain(center.cardinal_adjacent_positions()) {
        if area.contains(pos) && grid[pos] == TerrainKind::Wall {
            grid[pos] = TerrainKind::Floor;
            carved += 1;
        }
    }

    let mut walk = Vec::with_capacity(max_walk + 1);
    for _ in 0..max_walks {
        if carved >= target {
            break;
        }
        let start = Position::new(
            rng.gen_range(area.x..area.right()),
            rng.gen_range(area.y..area.bottom()),
        );
        if grid[start] != TerrainKind::Wall {
            continue;
        }

        walk.clear();
        walk.push(start);
        let mut pos = start;
        let mut joined = false;
        for _ in 0..max_walk {
            let next = pos.step(walker_direction(rng));
            if area.contains(next) {
                pos = next;
            }
            if grid[pos] != TerrainKind::Wall {
                joined = true;
                break;
            }
            walk.push(pos);
        }

        if joined {
            for &pos in &walk {
                if grid[pos] == TerrainKind::Wall {
                    grid[pos] = TerrainKind::Floor;
                    carved += 1;
                }
            }
        }
    }

    grid
}
