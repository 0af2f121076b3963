//! Foliage overlay: a second automaton pass that grows vegetation over open ground.

use super::terrain::{automaton_cave, AUTOMATON_OPEN_CHANCES, AUTOMATON_WALL_THRESHOLDS};
use crate::{TerrainGrid, TerrainKind};
use rand::seq::SliceRandom;
use rand::Rng;

/// Turns `Floor` cells into `Foliage` wherever an independent automaton pass
/// over a same-size scratch grid grew foliage. Other cell kinds are never
/// touched. Returns the number of converted cells.
pub fn overlay_foliage<R: Rng>(terrain: &mut TerrainGrid, rng: &mut R) -> usize {
    let open_chance = *AUTOMATON_OPEN_CHANCES
        .choose(rng)
        .unwrap_or(&AUTOMATON_OPEN_CHANCES[0]);
    let scratch = automaton_cave(
        rng,
        terrain.width(),
        terrain.height(),
        TerrainKind::Foliage,
        open_chance,
        &AUTOMATON_WALL_THRESHOLDS,
    );

    let mut converted = 0;
    for (pos, &grown) in scratch.iter() {
        if grown != TerrainKind::Foliage {
            continue;
        }
        if let Some(cell) = terrain.get_mut(pos) {
            if *cell == TerrainKind::Floor {
                *cell = TerrainKind::Foliage;
                converted += 1;
            }
        }
    }
    converted
}
