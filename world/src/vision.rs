//! Coin and enemy sighting.

use std::collections::BTreeSet;

use skirmish_core::{CharacterId, TileCoord};

use crate::World;

impl World {
    /// Scans the square of `vision_radius` around the character.
    pub(crate) fn look_around(&mut self, id: CharacterId) {
        let Some(character) = self.characters.get(id) else {
            return;
        };
        let center = character.tile;
        let radius = self.config.vision_radius as i32;
        let square = (-radius..=radius)
            .flat_map(move |dy| (-radius..=radius).map(move |dx| center.offset(dx, dy)));
        self.observe(id, square);
    }

    /// Scans every tile of the chunk the character stands in.
    pub(crate) fn scan_current_chunk(&mut self, id: CharacterId) {
        let Some(character) = self.characters.get(id) else {
            return;
        };
        let tiles = character.chunk.tiles(self.config.chunk_size);
        self.observe(id, tiles);
    }

    /// Merges sightings into the character's lists after dropping coins that
    /// were picked up and enemies that died.
    fn observe<I>(&mut self, id: CharacterId, tiles: I)
    where
        I: IntoIterator<Item = TileCoord>,
    {
        let Self {
            characters, coins, ..
        } = self;
        let Some(character) = characters.get(id) else {
            return;
        };
        let team = character.team;

        let mut seen_coins: BTreeSet<TileCoord> = character
            .seen_coins
            .iter()
            .copied()
            .filter(|tile| coins.has_coin(*tile))
            .collect();
        let mut seen_enemies: BTreeSet<CharacterId> = character
            .seen_enemies
            .iter()
            .copied()
            .filter(|enemy| characters.get(*enemy).is_some())
            .collect();

        for tile in tiles {
            if coins.has_coin(tile) {
                let _ = seen_coins.insert(tile);
            }
            for other in characters.at_tile(tile).filter(|other| other.team != team) {
                let _ = seen_enemies.insert(other.id);
            }
        }

        if let Some(character) = characters.get_mut(id) {
            character.seen_coins = seen_coins;
            character.seen_enemies = seen_enemies;
        }
    }
}
