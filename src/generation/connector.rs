//! # Vault Connector
//!
//! Links placed vaults with tunnels carved along weighted shortest paths.
//!
//! The network is built in two passes. The spanning pass walks the vaults
//! from the most central outwards and ties every still unconnected vault to
//! its nearest predecessor, so every vault ends up reachable. The redundancy
//! pass then adds a few extra tunnels between near neighbours to create loops.
//!
//! Every cell is traversable for routing purposes; the step cost steers
//! tunnels away from vault interiors and towards solid rock.

use super::context::GenerationContext;
use super::GenerationConfig;
use crate::{cardinal_neighbors, shortest_path, DelveError, DelveResult, Mask, Position, TerrainKind};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

/// Step costs used when routing a tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunnelCosts {
    /// Stepping onto the destination entry
    pub destination: u32,
    /// Stepping onto any vault entry point
    pub entry: u32,
    /// Stepping into a vault footprint outside existing tunnels
    pub vault_interior: u32,
    /// Stepping onto open ground
    pub passable: u32,
    /// Base cost of digging through a wall-like cell
    pub wall: u32,
    /// Surcharge for digging along the outer ring of the grid
    pub border: u32,
    /// Surcharge for digging out of open ground
    pub leaving_open: u32,
}

impl TunnelCosts {
    pub const DEFAULT: TunnelCosts = TunnelCosts {
        destination: 1,
        entry: 30,
        vault_interior: 1000,
        passable: 1,
        wall: 10,
        border: 3,
        leaving_open: 2,
    };
}

impl Default for TunnelCosts {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Cost of extending a tunnel from `from` onto its neighbour `to` while
/// heading for `destination`.
///
/// `entries` marks the entry points of every vault.
pub fn tunnel_step_cost(
    ctx: &GenerationContext,
    entries: &Mask,
    costs: &TunnelCosts,
    from: Position,
    to: Position,
    destination: Position,
) -> u32 {
    if to == destination {
        return costs.destination;
    }
    if entries.is_set(to) {
        return costs.entry;
    }
    if ctx.vault_mask.is_set(to) && !ctx.tunnel_mask.is_set(to) {
        return costs.vault_interior;
    }
    if ctx.terrain.is_passable(to) {
        return costs.passable;
    }

    let bounds = ctx.bounds();
    let hugging = cardinal_neighbors(bounds, to)
        .filter(|&next| next != from)
        .filter(|&next| !ctx.terrain.on_border(next) && ctx.terrain[next] == TerrainKind::Wall)
        .count() as u32;

    let mut cost = costs.wall.saturating_sub(hugging);
    if ctx.terrain.on_border(to) {
        cost += costs.border;
    }
    if ctx.terrain.is_passable(from) {
        cost += costs.leaving_open;
    }
    cost.max(1)
}

/// Builds the tunnel network between all placed vaults.
///
/// Sorts `ctx.vaults` by distance to the grid center first, so afterwards
/// index 0 is the most central vault. Returns the number of tunnels carved.
///
/// # Errors
///
/// [`DelveError::TunnelPathNotFound`] when two entries cannot be joined,
/// which means the routing costs or a template are broken.
pub fn connect_vaults<R: Rng>(
    ctx: &mut GenerationContext,
    config: &GenerationConfig,
    rng: &mut R,
) -> DelveResult<usize> {
    let center = ctx.bounds().center();
    ctx.vaults
        .sort_by_key(|vault| vault.center().manhattan_distance(center));

    let spanning = connect_spanning(ctx, config, rng)?;
    let extra = connect_redundant(ctx, config, rng)?;
    debug!(
        "Connected {} vaults with {} spanning and {} extra tunnels",
        ctx.vaults.len(),
        spanning,
        extra
    );
    Ok(spanning + extra)
}

fn connect_spanning<R: Rng>(
    ctx: &mut GenerationContext,
    config: &GenerationConfig,
    rng: &mut R,
) -> DelveResult<usize> {
    let mut carved = 0;
    for index in 1..ctx.vaults.len() {
        if ctx.vaults[index].tunnels > 0 {
            continue;
        }
        let here = ctx.vaults[index].center();
        let nearest = (0..index).min_by_key(|&other| ctx.vaults[other].center().manhattan_distance(here));
        if let Some(nearest) = nearest {
            carve_tunnel(ctx, index, nearest, false, config, rng)?;
            carved += 1;
        }
    }
    Ok(carved)
}

fn connect_redundant<R: Rng>(
    ctx: &mut GenerationContext,
    config: &GenerationConfig,
    rng: &mut R,
) -> DelveResult<usize> {
    let count = ctx.vaults.len();
    if count < 2 {
        return Ok(0);
    }

    let rounds = rng.gen_range(config.extra_tunnels_min..=config.extra_tunnels_max);
    let mut carved = 0;
    for _ in 0..rounds {
        let index = rng.gen_range(0..count);
        if ctx.vaults[index].tunnels >= config.max_tunnels_per_vault {
            continue;
        }

        let here = ctx.vaults[index].center();
        let mut others: Vec<usize> = (0..count).filter(|&other| other != index).collect();
        others.sort_by_key(|&other| ctx.vaults[other].center().manhattan_distance(here));

        let width = if rng.gen_bool(config.far_neighbor_chance) {
            config.far_neighbor_search_width
        } else {
            config.neighbor_search_width
        };
        let partner = others[rng.gen_range(0..width.clamp(1, others.len()))];
        if ctx.vaults[partner].tunnels >= config.max_tunnels_per_vault {
            continue;
        }

        carve_tunnel(ctx, index, partner, true, config, rng)?;
        carved += 1;
    }
    Ok(carved)
}

/// Chooses the entry of `vault` to tunnel from: the unused entry closest to
/// `toward`, or the closest of all entries once every one is used. Ties are
/// broken randomly.
fn pick_entry<R: Rng>(
    ctx: &GenerationContext,
    vault: usize,
    toward: Position,
    rng: &mut R,
) -> Option<(usize, Position)> {
    let vault = &ctx.vaults[vault];
    let all: Vec<(usize, Position)> = vault.entries().enumerate().collect();
    let mut candidates: Vec<(usize, Position)> = all
        .iter()
        .copied()
        .filter(|&(slot, _)| !vault.entry_used.get(slot).copied().unwrap_or(false))
        .collect();
    if candidates.is_empty() {
        candidates = all;
    }
    candidates.shuffle(rng);
    candidates
        .into_iter()
        .min_by_key(|&(_, pos)| pos.manhattan_distance(toward))
}

/// Carves one tunnel between vaults `a` and `b`.
fn carve_tunnel<R: Rng>(
    ctx: &mut GenerationContext,
    a: usize,
    b: usize,
    extra: bool,
    config: &GenerationConfig,
    rng: &mut R,
) -> DelveResult<()> {
    let center_a = ctx.vaults[a].center();
    let center_b = ctx.vaults[b].center();
    let (Some((slot_a, from)), Some((slot_b, to))) = (
        pick_entry(ctx, a, center_b, rng),
        pick_entry(ctx, b, center_a, rng),
    ) else {
        return Err(DelveError::GenerationFailed(
            "vault without entry points in the connector".to_string(),
        ));
    };

    let entries = ctx.entry_mask();
    let bounds = ctx.bounds();
    let costs = TunnelCosts::DEFAULT;
    let routing: &GenerationContext = ctx;
    let (path, cost) = shortest_path(
        from,
        to,
        |pos| cardinal_neighbors(bounds, pos),
        |step_from, step_to| tunnel_step_cost(routing, &entries, &costs, step_from, step_to, to),
    )
    .ok_or(DelveError::TunnelPathNotFound { from, to })?;

    let last = path.len() - 1;
    let mut dug = 0;
    for (step, &pos) in path.iter().enumerate() {
        if ctx.terrain.is_passable(pos) {
            continue;
        }
        let kind = if step == 0 || step == last {
            TerrainKind::Floor
        } else {
            tunnel_cell_kind(config, rng)
        };
        ctx.terrain[pos] = kind;
        ctx.tunnel_mask[pos] = true;
        if extra {
            ctx.extra_tunnel_cells.push(pos);
        }
        dug += 1;
    }

    for (vault, slot) in [(a, slot_a), (b, slot_b)] {
        let vault = &mut ctx.vaults[vault];
        vault.tunnels += 1;
        if let Some(used) = vault.entry_used.get_mut(slot) {
            *used = true;
        }
    }

    debug!(
        "Tunnel {:?} -> {:?}: {} steps, cost {}, {} cells dug{}",
        from,
        to,
        path.len(),
        cost,
        dug,
        if extra { " (extra)" } else { "" }
    );
    Ok(())
}

fn tunnel_cell_kind<R: Rng>(config: &GenerationConfig, rng: &mut R) -> TerrainKind {
    let roll: f64 = rng.gen();
    if roll < config.tunnel_rubble_chance {
        TerrainKind::Rubble
    } else if roll < config.tunnel_rubble_chance + config.tunnel_foliage_chance {
        TerrainKind::Foliage
    } else {
        TerrainKind::Floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{stamp_vault, CaveAlgorithm, Transform, Vault, VaultSize, VaultTemplate};
    use crate::{distance_map, Grid};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const ROOM: &str = "##+##\n#...#\n+.P.+\n#...#\n##+##";

    fn context_with_rooms(anchors: &[Position]) -> GenerationContext {
        let mut ctx = GenerationContext::new(Grid::new(60, 20, TerrainKind::Wall), CaveAlgorithm::TreeWalk);
        let template = VaultTemplate::parse(ROOM).unwrap();
        for &anchor in anchors {
            stamp_vault(
                &mut ctx,
                Vault::new(template.clone(), Transform::default(), anchor, VaultSize::Small),
            );
        }
        ctx
    }

    fn reachable_from(ctx: &GenerationContext, start: Position) -> Grid<Option<u32>> {
        let bounds = ctx.bounds();
        distance_map(
            ctx.width(),
            ctx.height(),
            &[start],
            |pos| cardinal_neighbors(bounds, pos).filter(|&n| ctx.terrain.is_passable(n)),
            None,
        )
    }

    #[test]
    fn test_step_cost_ordering() {
        let ctx = context_with_rooms(&[Position::new(10, 5)]);
        let entries = ctx.entry_mask();
        let costs = TunnelCosts::DEFAULT;
        let far = Position::new(50, 10);
        let entry = Position::new(12, 5);

        assert_eq!(tunnel_step_cost(&ctx, &entries, &costs, Position::new(12, 4), entry, entry), 1);
        assert_eq!(tunnel_step_cost(&ctx, &entries, &costs, Position::new(12, 4), entry, far), 30);
        assert_eq!(
            tunnel_step_cost(&ctx, &entries, &costs, Position::new(11, 5), Position::new(11, 6), far),
            1000
        );
        // Deep rock: three interior wall neighbours besides the one we came from.
        assert_eq!(
            tunnel_step_cost(&ctx, &entries, &costs, Position::new(29, 10), Position::new(30, 10), far),
            7
        );
        // Outer ring: both remaining neighbours are border cells, plus the surcharge.
        assert_eq!(
            tunnel_step_cost(&ctx, &entries, &costs, Position::new(30, 1), Position::new(30, 0), far),
            13
        );
    }

    #[test]
    fn test_step_cost_rewards_open_ground_and_penalises_leaving_it() {
        let mut ctx = context_with_rooms(&[]);
        ctx.terrain[Position::new(30, 10)] = TerrainKind::Floor;
        let entries = ctx.entry_mask();
        let costs = TunnelCosts::DEFAULT;
        let far = Position::new(50, 10);

        assert_eq!(
            tunnel_step_cost(&ctx, &entries, &costs, Position::new(29, 10), Position::new(30, 10), far),
            1
        );
        assert_eq!(
            tunnel_step_cost(&ctx, &entries, &costs, Position::new(30, 10), Position::new(31, 10), far),
            9
        );
    }

    #[test]
    fn test_connect_two_vaults_carves_a_walkable_tunnel() {
        let mut ctx = context_with_rooms(&[Position::new(5, 7), Position::new(45, 7)]);
        let config = GenerationConfig {
            extra_tunnels_min: 0,
            extra_tunnels_max: 0,
            ..GenerationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(6);

        let tunnels = connect_vaults(&mut ctx, &config, &mut rng).unwrap();
        assert_eq!(tunnels, 1);
        assert!(ctx.vaults.iter().all(|vault| vault.tunnels == 1));
        assert!(ctx.extra_tunnel_cells.is_empty());

        let distances = reachable_from(&ctx, ctx.vaults[0].center());
        assert!(distances[ctx.vaults[1].center()].is_some());
        for pos in ctx.tunnel_mask.set_positions() {
            assert!(ctx.terrain.is_passable(pos));
        }

        // Facing entries are chosen: east side of the left room, west side of the right one.
        assert_eq!(ctx.terrain[Position::new(9, 9)], TerrainKind::Floor);
        assert_eq!(ctx.terrain[Position::new(45, 9)], TerrainKind::Floor);
        assert_eq!(ctx.terrain[Position::new(5, 9)], TerrainKind::Wall);
    }

    #[test]
    fn test_tunnels_avoid_third_vault_interior() {
        // The middle room sits right between the two others.
        let mut ctx = context_with_rooms(&[
            Position::new(5, 7),
            Position::new(27, 7),
            Position::new(50, 7),
        ]);
        let middle_interior: Vec<Position> = crate::Rect::new(28, 8, 3, 3).positions().collect();
        let config = GenerationConfig {
            extra_tunnels_min: 0,
            extra_tunnels_max: 0,
            ..GenerationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(12);
        connect_vaults(&mut ctx, &config, &mut rng).unwrap();

        for pos in middle_interior {
            assert!(!ctx.tunnel_mask.is_set(pos));
        }
        let start = ctx.vaults[0].center();
        let distances = reachable_from(&ctx, start);
        for vault in &ctx.vaults {
            assert!(distances[vault.center()].is_some());
        }
    }

    #[test]
    fn test_redundant_tunnels_are_recorded() {
        let anchors: Vec<Position> = (0..4).map(|i| Position::new(3 + i * 14, 7)).collect();
        let mut ctx = context_with_rooms(&anchors);
        let config = GenerationConfig {
            extra_tunnels_min: 4,
            extra_tunnels_max: 4,
            ..GenerationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(31);

        let tunnels = connect_vaults(&mut ctx, &config, &mut rng).unwrap();
        assert!(tunnels >= 3);
        assert!(ctx.vaults.iter().all(|vault| vault.tunnels >= 1));
        for &pos in &ctx.extra_tunnel_cells {
            assert!(ctx.tunnel_mask.is_set(pos));
            assert!(ctx.terrain.is_passable(pos));
        }
        let total_tunnels: u32 = ctx.vaults.iter().map(|vault| vault.tunnels).sum();
        assert_eq!(total_tunnels as usize, tunnels * 2);
    }

    #[test]
    fn test_single_vault_needs_no_tunnels() {
        let mut ctx = context_with_rooms(&[Position::new(20, 7)]);
        let mut rng = StdRng::seed_from_u64(2);
        let tunnels = connect_vaults(&mut ctx, &GenerationConfig::default(), &mut rng).unwrap();
        assert_eq!(tunnels, 0);
        assert!(ctx.tunnel_mask.set_positions().is_empty());
    }
}
