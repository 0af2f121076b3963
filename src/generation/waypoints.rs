//! Patrol waypoints for wandering monsters.

use super::context::GenerationContext;
use super::templates::PlaceKind;
use crate::Position;

/// Collects every vault patrol place that is still passable, vault by vault.
///
/// An empty list is valid; callers fall back to random passable cells.
pub fn extract_waypoints(ctx: &GenerationContext) -> Vec<Position> {
    ctx.vaults
        .iter()
        .flat_map(|vault| vault.places_of(PlaceKind::Patrol))
        .filter(|&pos| ctx.terrain.is_passable(pos))
        .collect()
}
