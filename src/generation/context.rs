//! # Generation Context
//!
//! The state of one generation attempt. Every pipeline stage takes the context
//! by exclusive reference; a failed attempt drops it and the next one starts
//! from a fresh value.

use super::terrain::CaveAlgorithm;
use super::vaults::Vault;
use crate::{Grid, Mask, Position, Rect, TerrainGrid};

/// Everything a generation attempt builds up before it is accepted.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    /// Terrain cells
    pub terrain: TerrainGrid,
    /// Cave algorithm that shaped the base terrain
    pub theme: CaveAlgorithm,
    /// Vaults in placement order until the connector sorts them by centrality
    pub vaults: Vec<Vault>,
    /// Cells covered by a vault footprint
    pub vault_mask: Mask,
    /// Cells carved by a tunnel
    pub tunnel_mask: Mask,
    /// Cells carved only for redundant tunnels
    pub extra_tunnel_cells: Vec<Position>,
}

impl GenerationContext {
    /// Wraps freshly synthesized terrain; masks start empty.
    pub fn new(terrain: TerrainGrid, theme: CaveAlgorithm) -> Self {
        let (width, height) = (terrain.width(), terrain.height());
        Self {
            terrain,
            theme,
            vaults: Vec::new(),
            vault_mask: Grid::new(width, height, false),
            tunnel_mask: Grid::new(width, height, false),
            extra_tunnel_cells: Vec::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.terrain.width()
    }

    pub fn height(&self) -> i32 {
        self.terrain.height()
    }

    pub fn bounds(&self) -> Rect {
        self.terrain.bounds()
    }

    /// Marks every entry point of every vault.
    pub fn entry_mask(&self) -> Mask {
        let mut mask = Grid::new(self.width(), self.height(), false);
        for entry in self.vaults.iter().flat_map(Vault::entries) {
            if let Some(cell) = mask.get_mut(entry) {
                *cell = true;
            }
        }
        mask
    }

    /// Index of the vault whose center is closest to the grid center; the
    /// first one wins ties.
    pub fn most_central_vault(&self) -> Option<usize> {
        let center = self.bounds().center();
        self.vaults
            .iter()
            .enumerate()
            .min_by_key(|(index, vault)| (vault.center().manhattan_distance(center), *index))
            .map(|(index, _)| index)
    }
}
