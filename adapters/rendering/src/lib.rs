#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Skirmish adapters.
//!
//! A drawing backend exposes a ground [`TileSurface`] and may offer further
//! layers through the `as_*` discovery hooks. [`SceneBinding`] resolves those
//! capabilities once and redraws every available layer from the world on
//! [`SceneBinding::rebuild`].

use glam::Vec2;
use skirmish_core::{CoinAmount, Structure, Team, Thickness, TileClass, TileCoord};
use skirmish_world::{query, World};
use thiserror::Error;
use tracing::{debug, warn};

mod text;

pub use text::TextSurface;

/// Drawing target for ground tiles.
pub trait TileSurface {
    /// Erases every ground tile.
    fn clear(&mut self);

    /// Draws ground of the provided class on the tile.
    fn set_ground(&mut self, tile: TileCoord, class: TileClass);

    /// Grass layer, when the backend has one.
    fn as_decoratable(&mut self) -> Option<&mut dyn Decoratable> {
        None
    }

    /// Structure layer, when the backend has one.
    fn as_structure_placeable(&mut self) -> Option<&mut dyn StructurePlaceable> {
        None
    }

    /// Coin layer, when the backend has one.
    fn as_coin_layer(&mut self) -> Option<&mut dyn CoinLayer> {
        None
    }

    /// Character layer, when the backend has one.
    fn as_unit_layer(&mut self) -> Option<&mut dyn UnitLayer> {
        None
    }
}

/// Layer drawing grass over the ground.
pub trait Decoratable {
    /// Erases every decoration.
    fn clear_decorations(&mut self);
    /// Paints grass of the provided thickness on the tile.
    fn set_decoration(&mut self, tile: TileCoord, thickness: Thickness);
}

/// Layer drawing structures. A structure covers its base and the roof above it.
pub trait StructurePlaceable {
    /// Removes every structure.
    fn clear_structures(&mut self);
    /// Draws the structure.
    fn place_structure(&mut self, structure: Structure);
}

/// Layer drawing coins lying on the ground.
pub trait CoinLayer {
    /// Removes every coin.
    fn clear_coins(&mut self);
    /// Draws a coin on the tile.
    fn set_coin(&mut self, tile: TileCoord, amount: CoinAmount);
}

/// Layer drawing characters.
pub trait UnitLayer {
    /// Removes every character.
    fn clear_units(&mut self);
    /// Draws a character of the team on the tile.
    fn place_unit(&mut self, tile: TileCoord, team: Team);
}

/// Layers a bound surface turned out to support.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Grass can be drawn.
    pub decorations: bool,
    /// Structures can be drawn.
    pub structures: bool,
    /// Coins can be drawn.
    pub coins: bool,
    /// Characters can be drawn.
    pub units: bool,
}

impl Capabilities {
    fn discover<S: TileSurface>(surface: &mut S) -> Self {
        Self {
            decorations: surface.as_decoratable().is_some(),
            structures: surface.as_structure_placeable().is_some(),
            coins: surface.as_coin_layer().is_some(),
            units: surface.as_unit_layer().is_some(),
        }
    }
}

/// Number of items drawn by one rebuild, per layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Ground tiles drawn.
    pub tiles: usize,
    /// Decorated tiles drawn.
    pub decorations: usize,
    /// Structures drawn.
    pub structures: usize,
    /// Coins drawn.
    pub coins: usize,
    /// Characters drawn.
    pub units: usize,
}

/// Surface composed with the capabilities it exposes.
#[derive(Debug)]
pub struct SceneBinding<S> {
    surface: Option<S>,
    capabilities: Capabilities,
}

impl<S: TileSurface> SceneBinding<S> {
    /// Binds the surface and records which optional layers it supports.
    ///
    /// A missing surface is allowed; rebuilds then do nothing.
    pub fn bind(surface: Option<S>) -> Self {
        let mut surface = surface;
        let capabilities = surface
            .as_mut()
            .map(Capabilities::discover)
            .unwrap_or_default();
        debug!(
            ground = surface.is_some(),
            decorations = capabilities.decorations,
            structures = capabilities.structures,
            coins = capabilities.coins,
            units = capabilities.units,
            "scene bound"
        );
        Self {
            surface,
            capabilities,
        }
    }

    /// Layers discovered at bind time.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Bound surface, if any.
    #[must_use]
    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    /// Releases the bound surface.
    pub fn into_surface(self) -> Option<S> {
        self.surface
    }

    /// Clears and redraws every available layer from the world.
    ///
    /// Only layers recorded at bind time are drawn; the surface is never asked
    /// again about layers it lacked.
    pub fn rebuild(&mut self, world: &World) -> RebuildReport {
        let Some(surface) = self.surface.as_mut() else {
            warn!("no ground surface bound, skipping rebuild");
            return RebuildReport::default();
        };
        let mut report = RebuildReport::default();

        surface.clear();
        for (tile, class) in query::terrain(world).iter() {
            surface.set_ground(tile, class);
            report.tiles += 1;
        }

        if self.capabilities.decorations {
            if let Some(layer) = surface.as_decoratable() {
                layer.clear_decorations();
                for (tile, thickness) in query::decorations(world).iter() {
                    layer.set_decoration(tile, thickness);
                    report.decorations += 1;
                }
            }
        }

        if self.capabilities.structures {
            if let Some(layer) = surface.as_structure_placeable() {
                layer.clear_structures();
                for structure in query::structures(world) {
                    layer.place_structure(*structure);
                    report.structures += 1;
                }
            }
        }

        if self.capabilities.coins {
            if let Some(layer) = surface.as_coin_layer() {
                layer.clear_coins();
                for (tile, amount) in query::coins(world).iter() {
                    layer.set_coin(tile, amount);
                    report.coins += 1;
                }
            }
        }

        if self.capabilities.units {
            if let Some(layer) = surface.as_unit_layer() {
                layer.clear_units();
                for character in query::characters(world).iter() {
                    layer.place_unit(character.tile(), character.team());
                    report.units += 1;
                }
            }
        }

        debug!(
            tiles = report.tiles,
            decorations = report.decorations,
            structures = report.structures,
            coins = report.coins,
            units = report.units,
            "scene rebuilt"
        );
        report
    }
}

/// Raw pointer activity in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    /// Primary button went down.
    Press(Vec2),
    /// Primary button went up.
    Release(Vec2),
    /// Pointer moved without a button change.
    Move(Vec2),
}

impl PointerEvent {
    /// Position carried by the event.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        match self {
            Self::Press(position) | Self::Release(position) | Self::Move(position) => *position,
        }
    }
}

/// Mapping between world units and tiles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    origin: Vec2,
    tile_length: f32,
}

impl Viewport {
    /// Creates a viewport whose tile `(0, 0)` starts at `origin`.
    ///
    /// Returns an error when `tile_length` is not a positive finite number.
    pub fn new(origin: Vec2, tile_length: f32) -> Result<Self, RenderingError> {
        if !tile_length.is_finite() || tile_length <= f32::EPSILON {
            return Err(RenderingError::InvalidTileLength { tile_length });
        }
        Ok(Self {
            origin,
            tile_length,
        })
    }

    /// Side length of a tile in world units.
    #[must_use]
    pub const fn tile_length(&self) -> f32 {
        self.tile_length
    }

    /// Tile containing the world position.
    #[must_use]
    pub fn tile_at(&self, position: Vec2) -> TileCoord {
        let local = (position - self.origin) / self.tile_length;
        let snapped = local.floor();
        TileCoord::new(snapped.x as i32, snapped.y as i32)
    }

    /// Top-left corner of the tile in world units.
    #[must_use]
    pub fn tile_origin(&self, tile: TileCoord) -> Vec2 {
        self.origin + Vec2::new(tile.x() as f32, tile.y() as f32) * self.tile_length
    }

    /// Tile pressed by the event. Releases and moves resolve to nothing.
    #[must_use]
    pub fn resolve_press(&self, event: PointerEvent) -> Option<TileCoord> {
        match event {
            PointerEvent::Press(position) => Some(self.tile_at(position)),
            PointerEvent::Release(_) | PointerEvent::Move(_) => None,
        }
    }
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq, Error)]
pub enum RenderingError {
    /// Tiles must have a positive size to map pointer positions.
    #[error("tile length must be positive and finite (received {tile_length})")]
    InvalidTileLength {
        /// Provided length that failed validation.
        tile_length: f32,
    },
}
