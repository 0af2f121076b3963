//! # Connectivity Validation
//!
//! Keeps only the passable region reachable from a known start cell and
//! measures how much of the level survived.

use super::context::GenerationContext;
use crate::{cardinal_neighbors, distance_map, Grid, Position, TerrainGrid, TerrainKind};
use log::trace;

/// Step distances from `start` to every cell reachable through passable
/// cells. Nothing is reachable from an impassable start.
pub fn reachable_from(terrain: &TerrainGrid, start: Position) -> Grid<Option<u32>> {
    let bounds = terrain.bounds();
    let sources: Vec<Position> = Some(start)
        .filter(|&pos| terrain.is_passable(pos))
        .into_iter()
        .collect();
    distance_map(
        terrain.width(),
        terrain.height(),
        &sources,
        |pos| cardinal_neighbors(bounds, pos).filter(|&next| terrain.is_passable(next)),
        None,
    )
}

/// Checks that every passable cell can reach every other one.
pub fn is_fully_connected(terrain: &TerrainGrid) -> bool {
    let Some((start, _)) = terrain.iter().find(|(_, kind)| kind.is_passable()) else {
        return true;
    };
    let reached = reachable_from(terrain, start);
    terrain
        .iter()
        .all(|(pos, kind)| !kind.is_passable() || reached[pos].is_some())
}

/// Picks the cell pruning starts from.
///
/// The first passable cell, row by row, of the most central vault's footprint;
/// failing that, the passable cell nearest the grid center. `None` when
/// nothing is passable.
pub fn find_start(ctx: &GenerationContext) -> Option<Position> {
    let in_vault = ctx.most_central_vault().and_then(|index| {
        ctx.vaults[index]
            .rect()
            .positions()
            .find(|&pos| ctx.terrain.is_passable(pos))
    });
    if in_vault.is_some() {
        return in_vault;
    }

    let center = ctx.bounds().center();
    ctx.terrain
        .iter()
        .filter(|(_, kind)| kind.is_passable())
        .map(|(pos, _)| pos)
        .min_by_key(|&pos| (pos.manhattan_distance(center), pos.y, pos.x))
}

/// Walls off every passable cell that cannot be reached from `start` and
/// drops those cells from the tunnel mask. Returns the passable cells left.
///
/// Running it a second time with the same start changes nothing.
pub fn prune_unreachable(ctx: &mut GenerationContext, start: Position) -> usize {
    let reached = reachable_from(&ctx.terrain, start);

    let mut pruned = 0;
    let mut remaining = 0;
    for pos in ctx.bounds().positions() {
        if !ctx.terrain.is_passable(pos) {
            continue;
        }
        if reached[pos].is_some() {
            remaining += 1;
        } else {
            ctx.terrain[pos] = TerrainKind::Wall;
            ctx.tunnel_mask[pos] = false;
            pruned += 1;
        }
    }
    if pruned > 0 {
        ctx.extra_tunnel_cells.retain(|&pos| ctx.tunnel_mask.is_set(pos));
    }

    trace!("Pruned {} unreachable cells from {:?}, {} remain", pruned, start, remaining);
    remaining
}
