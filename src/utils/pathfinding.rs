//! # Pathfinding Primitives
//!
//! Thin wrappers around the `pathfinding` crate for 4-directional grids.
//!
//! Callers supply neighbour and cost closures, so the same primitives serve
//! both passability-driven flood fills and cost-driven tunnel routing where
//! every cell is traversable at some price.

use crate::{Grid, Position, Rect};
use ::pathfinding::prelude::{astar, dijkstra_all};

/// Returns the in-bounds cardinal neighbours of `pos`.
///
/// # Examples
///
/// ```
/// use delve::{cardinal_neighbors, Position, Rect};
///
/// let bounds = Rect::new(0, 0, 10, 10);
/// assert_eq!(cardinal_neighbors(bounds, Position::new(0, 0)).count(), 2);
/// assert_eq!(cardinal_neighbors(bounds, Position::new(5, 5)).count(), 4);
/// ```
pub fn cardinal_neighbors(bounds: Rect, pos: Position) -> impl Iterator<Item = Position> {
    pos.cardinal_adjacent_positions()
        .into_iter()
        .filter(move |&next| bounds.contains(next))
}

/// Finds the cheapest path from `from` to `to`.
///
/// `cost(a, b)` prices the step from `a` onto its neighbour `b` and must be at
/// least 1, which keeps the Manhattan heuristic admissible. Returns the path
/// including both endpoints and its total cost, or `None` when `to` cannot be
/// reached through the supplied neighbours.
pub fn shortest_path<N, I, C>(
    from: Position,
    to: Position,
    mut neighbors: N,
    mut cost: C,
) -> Option<(Vec<Position>, u32)>
where
    N: FnMut(Position) -> I,
    I: IntoIterator<Item = Position>,
    C: FnMut(Position, Position) -> u32,
{
    astar(
        &from,
        |&pos| {
            neighbors(pos)
                .into_iter()
                .map(|next| (next, cost(pos, next).max(1)))
                .collect::<Vec<_>>()
        },
        |&pos| pos.manhattan_distance(to),
        |&pos| pos == to,
    )
}

/// Computes step distances from the nearest of `sources` to every reachable cell.
///
/// Cells farther than `max_range` (when given) and unreachable cells are
/// `None`; sources themselves are at distance 0.
pub fn distance_map<N, I>(
    width: i32,
    height: i32,
    sources: &[Position],
    mut neighbors: N,
    max_range: Option<u32>,
) -> Grid<Option<u32>>
where
    N: FnMut(Position) -> I,
    I: IntoIterator<Item = Position>,
{
    let mut distances = Grid::new(width, height, None);

    // A virtual root linked to every source at zero cost turns the
    // multi-source search into a single-source one.
    let reached = dijkstra_all(&None::<Position>, |node| match node {
        None => sources.iter().map(|&source| (Some(source), 0u32)).collect::<Vec<_>>(),
        Some(pos) => neighbors(*pos)
            .into_iter()
            .map(|next| (Some(next), 1u32))
            .collect::<Vec<_>>(),
    });

    for (node, (_, distance)) in reached {
        let Some(pos) = node else { continue };
        if max_range.is_some_and(|range| distance > range) {
            continue;
        }
        if let Some(cell) = distances.get_mut(pos) {
            *cell = Some(distance);
        }
    }

    distances
}
