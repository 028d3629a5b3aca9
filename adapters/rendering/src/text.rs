//! In-memory surface that prints the map as ASCII.

use std::{collections::BTreeMap, io::Write};

use anyhow::{Context, Result as AnyResult};
use skirmish_core::{CoinAmount, Side, Structure, Team, Thickness, TileClass, TileCoord};

use crate::{CoinLayer, Decoratable, StructurePlaceable, TileSurface, UnitLayer};

/// Every layer kept as plain maps, drawn topmost first: characters,
/// structures, coins, grass, ground.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextSurface {
    ground: BTreeMap<TileCoord, TileClass>,
    decorations: BTreeMap<TileCoord, Thickness>,
    structures: BTreeMap<TileCoord, char>,
    coins: BTreeMap<TileCoord, CoinAmount>,
    units: BTreeMap<TileCoord, Team>,
}

impl TextSurface {
    /// Creates an empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ground tiles drawn.
    #[must_use]
    pub fn ground_len(&self) -> usize {
        self.ground.len()
    }

    /// Glyph shown for the tile.
    #[must_use]
    pub fn glyph_at(&self, tile: TileCoord) -> char {
        if let Some(team) = self.units.get(&tile) {
            return char::from_digit(team.index() as u32, 10).unwrap_or('@');
        }
        if let Some(glyph) = self.structures.get(&tile) {
            return *glyph;
        }
        if let Some(amount) = self.coins.get(&tile) {
            return match amount.get() {
                1 => 'c',
                3 => 'C',
                _ => '$',
            };
        }
        if let Some(thickness) = self.decorations.get(&tile) {
            return match thickness {
                Thickness::Thick => 'W',
                Thickness::Medium => 'w',
                Thickness::Thin => ',',
            };
        }
        match self.ground.get(&tile) {
            Some(TileClass::Corner(_)) => '+',
            Some(TileClass::Edge(Side::North | Side::South)) => '-',
            Some(TileClass::Edge(Side::East | Side::West)) => '|',
            Some(TileClass::Interior) => '.',
            None => ' ',
        }
    }

    /// Renders every drawn tile row by row.
    ///
    /// The grid spans the bounding box of all layers; roofs above the top row
    /// extend it upward.
    #[must_use]
    pub fn render(&self) -> String {
        let Some((min, max)) = self.bounds() else {
            return String::new();
        };
        let mut out = String::new();
        for y in min.y()..=max.y() {
            let row: String = (min.x()..=max.x())
                .map(|x| self.glyph_at(TileCoord::new(x, y)))
                .collect();
            out.push_str(row.trim_end());
            out.push('\n');
        }
        out
    }

    /// Writes [`TextSurface::render`] to the writer.
    pub fn write_ascii<W: Write>(&self, writer: &mut W) -> AnyResult<()> {
        writer
            .write_all(self.render().as_bytes())
            .context("failed to write map")?;
        writer.flush().context("failed to flush map output")
    }

    fn bounds(&self) -> Option<(TileCoord, TileCoord)> {
        let tiles = self
            .ground
            .keys()
            .chain(self.decorations.keys())
            .chain(self.structures.keys())
            .chain(self.coins.keys())
            .chain(self.units.keys());

        tiles.fold(None, |bounds, tile| {
            let (min, max) = bounds.unwrap_or((*tile, *tile));
            Some((
                TileCoord::new(min.x().min(tile.x()), min.y().min(tile.y())),
                TileCoord::new(max.x().max(tile.x()), max.y().max(tile.y())),
            ))
        })
    }
}

impl TileSurface for TextSurface {
    fn clear(&mut self) {
        self.ground.clear();
    }

    fn set_ground(&mut self, tile: TileCoord, class: TileClass) {
        let _ = self.ground.insert(tile, class);
    }

    fn as_decoratable(&mut self) -> Option<&mut dyn Decoratable> {
        Some(self)
    }

    fn as_structure_placeable(&mut self) -> Option<&mut dyn StructurePlaceable> {
        Some(self)
    }

    fn as_coin_layer(&mut self) -> Option<&mut dyn CoinLayer> {
        Some(self)
    }

    fn as_unit_layer(&mut self) -> Option<&mut dyn UnitLayer> {
        Some(self)
    }
}

impl Decoratable for TextSurface {
    fn clear_decorations(&mut self) {
        self.decorations.clear();
    }

    fn set_decoration(&mut self, tile: TileCoord, thickness: Thickness) {
        let _ = self.decorations.insert(tile, thickness);
    }
}

impl StructurePlaceable for TextSurface {
    fn clear_structures(&mut self) {
        self.structures.clear();
    }

    fn place_structure(&mut self, structure: Structure) {
        let _ = self.structures.insert(structure.base, 'H');
        let _ = self.structures.insert(structure.roof(), '^');
    }
}

impl CoinLayer for TextSurface {
    fn clear_coins(&mut self) {
        self.coins.clear();
    }

    fn set_coin(&mut self, tile: TileCoord, amount: CoinAmount) {
        let _ = self.coins.insert(tile, amount);
    }
}

impl UnitLayer for TextSurface {
    fn clear_units(&mut self) {
        self.units.clear();
    }

    fn place_unit(&mut self, tile: TileCoord, team: Team) {
        let _ = self.units.insert(tile, team);
    }
}
