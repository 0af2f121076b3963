//! # Vault Placement
//!
//! Fits oriented vault templates into the level without overlap and stamps
//! them onto the terrain.

use super::context::GenerationContext;
use super::templates::{Place, PlaceKind, TemplateCell, Transform, VaultLibrary, VaultSize, VaultTemplate};
use super::GenerationConfig;
use crate::{Position, Rect};
use log::{trace, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Cells kept clear around every vault footprint, checked from the candidate side.
///
/// Scanning the candidate grown by this margin keeps the footprint plus a
/// one-cell margin of any two vaults disjoint.
pub const VAULT_SPACING: i32 = 2;

/// A template stamped onto the level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Top-left corner of the footprint
    pub anchor: Position,
    pub size: VaultSize,
    /// Orientation the template was placed with
    pub transform: Transform,
    /// The template after orientation
    pub template: VaultTemplate,
    /// Named places in level coordinates
    pub places: Vec<Place>,
    /// Tunnels attached so far
    pub tunnels: u32,
    /// Per entry point, in [`Vault::entries`] order: whether a tunnel claimed it
    pub entry_used: Vec<bool>,
    /// Rule the anchor was drawn with
    pub rule: PlacementRule,
}

impl Vault {
    /// Creates a vault from an already oriented template.
    pub fn new(template: VaultTemplate, transform: Transform, anchor: Position, size: VaultSize) -> Self {
        let places: Vec<Place> = template
            .places()
            .iter()
            .map(|place| Place {
                pos: anchor + place.pos,
                kind: place.kind,
            })
            .collect();
        let entries = places.iter().filter(|place| place.kind == PlaceKind::Entry).count();

        Self {
            anchor,
            size,
            transform,
            template,
            places,
            tunnels: 0,
            entry_used: vec![false; entries],
            rule: PlacementRule::Random,
        }
    }

    /// Records the placement rule the anchor came from.
    pub fn with_rule(mut self, rule: PlacementRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn width(&self) -> i32 {
        self.template.width()
    }

    pub fn height(&self) -> i32 {
        self.template.height()
    }

    /// The footprint in level coordinates.
    pub fn rect(&self) -> Rect {
        Rect::new(self.anchor.x, self.anchor.y, self.width(), self.height())
    }

    pub fn center(&self) -> Position {
        self.rect().center()
    }

    /// Level positions of places of one kind.
    pub fn places_of(&self, kind: PlaceKind) -> impl Iterator<Item = Position> + '_ {
        self.places
            .iter()
            .filter(move |place| place.kind == kind)
            .map(|place| place.pos)
    }

    /// Entry points in level coordinates.
    pub fn entries(&self) -> impl Iterator<Item = Position> + '_ {
        self.places_of(PlaceKind::Entry)
    }
}

/// Where candidate anchors for a placement request are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementRule {
    /// Anywhere in the grid
    Random,
    /// A small band around the grid center
    Center,
    /// A band along the left or right border
    Edge,
}

impl PlacementRule {
    /// Draws a top-left anchor for a `width` x `height` footprint in a
    /// `grid_width` x `grid_height` level. The anchor may not fit; callers
    /// check the footprint.
    pub fn anchor<R: Rng>(
        self,
        rng: &mut R,
        grid_width: i32,
        grid_height: i32,
        width: i32,
        height: i32,
    ) -> Position {
        match self {
            PlacementRule::Random => Position::new(
                rng.gen_range(0..grid_width.max(1)),
                rng.gen_range(0..grid_height.max(1)),
            ),
            PlacementRule::Center => Position::new(
                grid_width / 2 - width / 2 + rng.gen_range(-6..=6),
                grid_height / 2 - height / 2 + rng.gen_range(-2..=2),
            ),
            PlacementRule::Edge => {
                let x = if rng.gen_bool(0.5) {
                    rng.gen_range(1..=7)
                } else {
                    let right = grid_width - 1 - width;
                    rng.gen_range(right - 6..=right)
                };
                let y = rng.gen_range(1..=(grid_height - 1 - height).max(1));
                Position::new(x, y)
            }
        }
    }
}

/// Checks that `rect` keeps off the outer ring and clear of every placed vault.
pub fn footprint_fits(ctx: &GenerationContext, rect: Rect) -> bool {
    if rect.x < 1
        || rect.y < 1
        || rect.right() > ctx.width() - 1
        || rect.bottom() > ctx.height() - 1
    {
        return false;
    }
    !rect
        .grown(VAULT_SPACING)
        .positions()
        .any(|pos| ctx.vault_mask.is_set(pos))
}

/// Writes a vault onto the terrain, marks its footprint and records it.
pub fn stamp_vault(ctx: &mut GenerationContext, vault: Vault) {
    for (local, cell) in vault.template.cells() {
        let pos = vault.anchor + local;
        if let TemplateCell::Terrain(kind) = cell {
            if let Some(terrain) = ctx.terrain.get_mut(pos) {
                *terrain = kind;
            }
        }
        if let Some(flag) = ctx.vault_mask.get_mut(pos) {
            *flag = true;
        }
    }
    ctx.vaults.push(vault);
}

/// Places `count` vaults of one size class using `rule` for the anchors.
///
/// Each vault gets `placement_attempts` template picks with
/// `transform_attempts` orientation and anchor candidates apiece. Returns
/// `false` as soon as a vault cannot be placed; vaults placed before that are
/// kept.
pub fn place_vaults<R: Rng>(
    ctx: &mut GenerationContext,
    library: &VaultLibrary,
    size: VaultSize,
    count: u32,
    rule: PlacementRule,
    config: &GenerationConfig,
    rng: &mut R,
) -> bool {
    let templates = library.templates(size);
    if templates.is_empty() && count > 0 {
        warn!("No {:?} vault templates to place", size);
        return false;
    }

    for placed in 0..count {
        match find_placement(ctx, templates, rule, config, rng) {
            Some((template, transform, anchor)) => {
                trace!("{:?} vault placed at {:?} with {:?}", size, anchor, transform);
                let oriented = template.transformed(transform);
                stamp_vault(ctx, Vault::new(oriented, transform, anchor, size).with_rule(rule));
            }
            None => {
                warn!(
                    "Could not place {:?} vault {} of {} with {:?} rule",
                    size,
                    placed + 1,
                    count,
                    rule
                );
                return false;
            }
        }
    }
    true
}

fn find_placement<'a, R: Rng>(
    ctx: &GenerationContext,
    templates: &'a [VaultTemplate],
    rule: PlacementRule,
    config: &GenerationConfig,
    rng: &mut R,
) -> Option<(&'a VaultTemplate, Transform, Position)> {
    for _ in 0..config.placement_attempts {
        let template = templates.choose(rng)?;
        for _ in 0..config.transform_attempts {
            let transform = Transform::random(rng, template.width(), template.height());
            // Odd quarter turns swap the footprint dimensions.
            let (width, height) = if transform.quarter_turns % 2 == 1 {
                (template.height(), template.width())
            } else {
                (template.width(), template.height())
            };
            let anchor = rule.anchor(rng, ctx.width(), ctx.height(), width, height);
            if footprint_fits(ctx, Rect::new(anchor.x, anchor.y, width, height)) {
                return Some((template, transform, anchor));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::CaveAlgorithm;
    use crate::{Grid, TerrainKind};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn empty_context(width: i32, height: i32) -> GenerationContext {
        GenerationContext::new(Grid::new(width, height, TerrainKind::Wall), CaveAlgorithm::Automaton)
    }

    #[test]
    fn test_vault_places_are_absolute() {
        let template = VaultTemplate::parse("#+#\n+P#\n###").unwrap();
        let vault = Vault::new(template, Transform::default(), Position::new(10, 4), VaultSize::Small);

        assert_eq!(vault.rect(), Rect::new(10, 4, 3, 3));
        assert_eq!(vault.center(), Position::new(11, 5));
        let entries: Vec<_> = vault.entries().collect();
        assert_eq!(entries, vec![Position::new(11, 4), Position::new(10, 5)]);
        assert_eq!(vault.entry_used, vec![false, false]);
        assert_eq!(vault.places_of(PlaceKind::Patrol).next(), Some(Position::new(11, 5)));
    }

    #[test]
    fn test_footprint_fits_rejects_border_and_neighbours() {
        let mut ctx = empty_context(40, 20);
        assert!(footprint_fits(&ctx, Rect::new(1, 1, 5, 5)));
        assert!(!footprint_fits(&ctx, Rect::new(0, 1, 5, 5)));
        assert!(!footprint_fits(&ctx, Rect::new(35, 1, 5, 5)));
        assert!(!footprint_fits(&ctx, Rect::new(1, 15, 5, 5)));

        let template = VaultTemplate::parse("#+#\n#P#\n###").unwrap();
        stamp_vault(&mut ctx, Vault::new(template, Transform::default(), Position::new(10, 5), VaultSize::Small));

        // Footprint spans x 10..13; one free column on each side is not enough.
        assert!(!footprint_fits(&ctx, Rect::new(14, 5, 3, 3)));
        assert!(footprint_fits(&ctx, Rect::new(15, 5, 3, 3)));
        assert!(!footprint_fits(&ctx, Rect::new(6, 5, 3, 3)));
        assert!(footprint_fits(&ctx, Rect::new(5, 5, 3, 3)));
    }

    #[test]
    fn test_stamp_keeps_existing_terrain_for_keep_cells() {
        let mut ctx = empty_context(20, 10);
        ctx.terrain[Position::new(4, 3)] = TerrainKind::Rubble;
        let template = VaultTemplate::parse("#+#\n#?#\n#P#").unwrap();
        stamp_vault(&mut ctx, Vault::new(template, Transform::default(), Position::new(3, 2), VaultSize::Small));

        assert_eq!(ctx.terrain[Position::new(4, 3)], TerrainKind::Rubble);
        assert_eq!(ctx.terrain[Position::new(4, 4)], TerrainKind::Floor);
        assert_eq!(ctx.terrain[Position::new(4, 2)], TerrainKind::Wall);
        assert!(ctx.vault_mask.is_set(Position::new(3, 2)));
        assert!(ctx.vault_mask.is_set(Position::new(5, 4)));
        assert!(!ctx.vault_mask.is_set(Position::new(6, 4)));
        assert_eq!(ctx.vaults.len(), 1);
    }

    #[test]
    fn test_center_and_edge_anchors_land_in_their_bands() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..200 {
            let center = PlacementRule::Center.anchor(&mut rng, 80, 21, 10, 7);
            assert!((29..=41).contains(&center.x));
            assert!((5..=9).contains(&center.y));

            let edge = PlacementRule::Edge.anchor(&mut rng, 80, 21, 10, 7);
            assert!((1..=7).contains(&edge.x) || (63..=69).contains(&edge.x));
            assert!((1..=13).contains(&edge.y));
        }
    }

    #[test]
    fn test_place_vaults_never_overlaps() {
        let library = VaultLibrary::builtin();
        let config = GenerationConfig::default();
        let mut rng = StdRng::seed_from_u64(77);
        let mut ctx = empty_context(80, 21);

        place_vaults(&mut ctx, &library, VaultSize::Big, 1, PlacementRule::Center, &config, &mut rng);
        place_vaults(&mut ctx, &library, VaultSize::Small, 6, PlacementRule::Random, &config, &mut rng);

        assert!(!ctx.vaults.is_empty());
        let bounds = ctx.bounds();
        for (i, a) in ctx.vaults.iter().enumerate() {
            assert!(bounds.contains(a.anchor));
            assert!(a.rect().right() <= bounds.right() && a.rect().bottom() <= bounds.bottom());
            for b in &ctx.vaults[i + 1..] {
                assert!(!a.rect().grown(1).intersects(&b.rect().grown(1)));
            }
        }
    }

    #[test]
    fn test_place_vaults_reports_soft_failure() {
        let library = VaultLibrary::builtin();
        let config = GenerationConfig {
            placement_attempts: 5,
            ..GenerationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        // Too small for any big template once the border is excluded.
        let mut ctx = empty_context(20, 6);

        let placed = place_vaults(&mut ctx, &library, VaultSize::Big, 1, PlacementRule::Random, &config, &mut rng);
        assert!(!placed);
        assert!(ctx.vaults.is_empty());
    }
}
