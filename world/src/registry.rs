//! Character storage indexed by identifier, tile, chunk and team.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use skirmish_core::{CharacterId, CharacterState, ChunkCoord, Team, TileCoord};
use skirmish_system_behavior::{BehaviorSnapshot, Effect};
use thiserror::Error;

/// Reasons a spawn request fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SpawnError {
    /// Every tile in the chunk is missing, built on, or taken.
    #[error("no open tile in chunk {0}")]
    NoOpenTile(ChunkCoord),
    /// The explicit spawn tile is missing, built on, or taken.
    #[error("tile {0} is not open")]
    TileNotOpen(TileCoord),
    /// The explicit spawn tile lies outside the base chunk.
    #[error("tile {tile} lies outside chunk {chunk}")]
    TileOutsideChunk {
        /// Requested tile.
        tile: TileCoord,
        /// Requested base chunk.
        chunk: ChunkCoord,
    },
}

/// Live unit tracked by the registry.
#[derive(Clone, Debug)]
pub struct Character {
    pub(crate) id: CharacterId,
    pub(crate) team: Team,
    pub(crate) tile: TileCoord,
    pub(crate) chunk: ChunkCoord,
    pub(crate) base_chunk: ChunkCoord,
    pub(crate) target_chunk: Option<ChunkCoord>,
    pub(crate) mission_complete: bool,
    pub(crate) chunk_scanned: bool,
    pub(crate) accepting_missions: bool,
    pub(crate) health: u32,
    pub(crate) max_health: u32,
    pub(crate) state: CharacterState,
    pub(crate) path: VecDeque<TileCoord>,
    pub(crate) path_goal: Option<TileCoord>,
    pub(crate) step_timer: f32,
    pub(crate) seen_coins: BTreeSet<TileCoord>,
    pub(crate) seen_enemies: BTreeSet<CharacterId>,
}

impl Character {
    /// Identifier assigned at spawn.
    #[must_use]
    pub fn id(&self) -> CharacterId {
        self.id
    }

    /// Team the character fights for.
    #[must_use]
    pub fn team(&self) -> Team {
        self.team
    }

    /// Tile the character stands on.
    #[must_use]
    pub fn tile(&self) -> TileCoord {
        self.tile
    }

    /// Chunk containing [`Character::tile`].
    #[must_use]
    pub fn current_chunk(&self) -> ChunkCoord {
        self.chunk
    }

    /// Chunk the character spawned in.
    #[must_use]
    pub fn base_chunk(&self) -> ChunkCoord {
        self.base_chunk
    }

    /// Chunk the character is heading for, if any.
    #[must_use]
    pub fn target_chunk(&self) -> Option<ChunkCoord> {
        self.target_chunk
    }

    /// Whether the current mission has been carried out.
    #[must_use]
    pub fn mission_complete(&self) -> bool {
        self.mission_complete
    }

    /// Whether the character will take a mission in the current planning round.
    #[must_use]
    pub fn accepting_missions(&self) -> bool {
        self.accepting_missions
    }

    /// Remaining health.
    #[must_use]
    pub fn health(&self) -> u32 {
        self.health
    }

    /// Health the character spawned with.
    #[must_use]
    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    /// Current behaviour state.
    #[must_use]
    pub fn state(&self) -> CharacterState {
        self.state
    }

    /// Tiles still to walk, nearest first.
    pub fn path(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.path.iter().copied()
    }

    /// Whether a path is queued.
    #[must_use]
    pub fn is_traveling(&self) -> bool {
        !self.path.is_empty()
    }

    /// Coins spotted and still lying on the ground.
    pub fn seen_coins(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.seen_coins.iter().copied()
    }

    /// Enemies spotted and still alive.
    pub fn seen_enemies(&self) -> impl Iterator<Item = CharacterId> + '_ {
        self.seen_enemies.iter().copied()
    }

    /// At base, no target pending, and the last mission finished.
    #[must_use]
    pub fn is_idle_at_base(&self) -> bool {
        self.behavior_snapshot().is_idle_at_base()
    }

    pub(crate) fn behavior_snapshot(&self) -> BehaviorSnapshot {
        BehaviorSnapshot {
            current_chunk: self.chunk,
            base_chunk: self.base_chunk,
            target_chunk: self.target_chunk,
            mission_complete: self.mission_complete,
            chunk_scanned: self.chunk_scanned,
        }
    }

    /// Mirrors the flag-changing behaviour effects onto the character.
    pub(crate) fn absorb(&mut self, effect: &Effect) {
        match effect {
            Effect::ClearTarget => self.target_chunk = None,
            Effect::MarkMissionComplete => self.mission_complete = true,
            Effect::RedirectHome => self.target_chunk = Some(self.base_chunk),
            Effect::ScanMissionChunk => self.chunk_scanned = true,
            Effect::StopTravel => self.stop_travel(),
            Effect::PlanPath { .. } | Effect::Advance { .. } => {}
        }
    }

    pub(crate) fn stop_travel(&mut self) {
        self.path.clear();
        self.path_goal = None;
        self.step_timer = 0.0;
    }
}

/// Owner of every live character.
///
/// Iteration always follows identifier order, which is spawn order.
#[derive(Debug)]
pub struct CharacterRegistry {
    chunk_size: u32,
    characters: BTreeMap<CharacterId, Character>,
    by_tile: BTreeMap<TileCoord, BTreeSet<CharacterId>>,
    by_chunk: BTreeMap<ChunkCoord, BTreeSet<CharacterId>>,
    selection: BTreeSet<CharacterId>,
    spawn_locations: BTreeMap<Team, Vec<TileCoord>>,
    next_id: CharacterId,
}

impl CharacterRegistry {
    /// Creates an empty registry for chunks of the provided size.
    #[must_use]
    pub fn new(chunk_size: u32) -> Self {
        Self {
            chunk_size,
            characters: BTreeMap::new(),
            by_tile: BTreeMap::new(),
            by_chunk: BTreeMap::new(),
            selection: BTreeSet::new(),
            spawn_locations: BTreeMap::new(),
            next_id: CharacterId::new(0),
        }
    }

    /// Drops every character and adopts a new chunk size.
    ///
    /// The identifier counter keeps running so identifiers are never reused.
    pub fn reset(&mut self, chunk_size: u32) {
        self.chunk_size = chunk_size;
        self.characters.clear();
        self.by_tile.clear();
        self.by_chunk.clear();
        self.selection.clear();
        self.spawn_locations.clear();
    }

    /// Creates a character whose base is `chunk`.
    ///
    /// Without an explicit tile the chunk centre is tried first, then every
    /// tile in row-major order. `is_open` reports ground that is not built
    /// on; tiles holding another character are skipped here.
    pub fn spawn<F>(
        &mut self,
        team: Team,
        chunk: ChunkCoord,
        tile_override: Option<TileCoord>,
        max_health: u32,
        is_open: F,
    ) -> Result<CharacterId, SpawnError>
    where
        F: Fn(TileCoord) -> bool,
    {
        let tile = match tile_override {
            Some(tile) if tile.chunk(self.chunk_size) != chunk => {
                return Err(SpawnError::TileOutsideChunk { tile, chunk });
            }
            Some(tile) if !is_open(tile) || self.is_occupied(tile) => {
                return Err(SpawnError::TileNotOpen(tile));
            }
            Some(tile) => tile,
            None => self
                .find_open_tile(chunk, &is_open)
                .ok_or(SpawnError::NoOpenTile(chunk))?,
        };

        let id = self.next_id;
        self.next_id = CharacterId::new(id.get() + 1);

        let max_health = max_health.max(1);
        let character = Character {
            id,
            team,
            tile,
            chunk,
            base_chunk: chunk,
            target_chunk: None,
            mission_complete: true,
            chunk_scanned: false,
            accepting_missions: true,
            health: max_health,
            max_health,
            state: CharacterState::Idle,
            path: VecDeque::new(),
            path_goal: None,
            step_timer: 0.0,
            seen_coins: BTreeSet::new(),
            seen_enemies: BTreeSet::new(),
        };

        self.index(id, tile);
        let _ = self.characters.insert(id, character);
        self.spawn_locations.entry(team).or_default().push(tile);
        Ok(id)
    }

    fn find_open_tile<F>(&self, chunk: ChunkCoord, is_open: &F) -> Option<TileCoord>
    where
        F: Fn(TileCoord) -> bool,
    {
        let free = |tile: TileCoord| is_open(tile) && !self.is_occupied(tile);
        let center = chunk.center(self.chunk_size);
        if free(center) {
            return Some(center);
        }
        chunk.tiles(self.chunk_size).find(|tile| free(*tile))
    }

    /// Removes a character from every index. Unknown identifiers are ignored.
    ///
    /// Returns whether a character was removed.
    pub fn kill(&mut self, id: CharacterId) -> bool {
        let Some(character) = self.characters.remove(&id) else {
            return false;
        };
        self.unindex(id, character.tile);
        let _ = self.selection.remove(&id);
        true
    }

    /// Number of live characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    /// Reports whether no character is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Looks up a live character.
    #[must_use]
    pub fn get(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    /// Live characters in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Character> {
        self.characters.values_mut()
    }

    /// Identifiers of live characters in spawn order.
    #[must_use]
    pub fn ids(&self) -> Vec<CharacterId> {
        self.characters.keys().copied().collect()
    }

    /// Characters standing on the tile.
    pub fn at_tile(&self, tile: TileCoord) -> impl Iterator<Item = &Character> {
        self.lookup(self.by_tile.get(&tile))
    }

    /// Characters inside the chunk.
    pub fn in_chunk(&self, chunk: ChunkCoord) -> impl Iterator<Item = &Character> {
        self.lookup(self.by_chunk.get(&chunk))
    }

    /// Characters belonging to the team.
    pub fn of_team(&self, team: Team) -> impl Iterator<Item = &Character> {
        self.characters
            .values()
            .filter(move |character| character.team == team)
    }

    /// Characters of every other team.
    pub fn enemies_of(&self, team: Team) -> impl Iterator<Item = &Character> {
        self.characters
            .values()
            .filter(move |character| character.team != team)
    }

    /// First character on the tile that does not belong to `team`.
    #[must_use]
    pub fn enemy_at(&self, tile: TileCoord, team: Team) -> Option<CharacterId> {
        self.at_tile(tile)
            .find(|character| character.team != team)
            .map(Character::id)
    }

    /// Whether a teammate other than `except` stands on the tile.
    #[must_use]
    pub fn friendly_at(&self, tile: TileCoord, team: Team, except: CharacterId) -> bool {
        self.at_tile(tile)
            .any(|character| character.team == team && character.id != except)
    }

    /// Whether anyone stands on the tile.
    #[must_use]
    pub fn is_occupied(&self, tile: TileCoord) -> bool {
        self.by_tile.get(&tile).is_some_and(|ids| !ids.is_empty())
    }

    /// Tiles the team's characters were spawned on, oldest first.
    #[must_use]
    pub fn spawn_locations(&self, team: Team) -> &[TileCoord] {
        self.spawn_locations
            .get(&team)
            .map_or(&[], |tiles| tiles.as_slice())
    }

    /// Moves a character and keeps the tile and chunk indices in step.
    pub(crate) fn relocate(&mut self, id: CharacterId, tile: TileCoord) {
        let chunk = tile.chunk(self.chunk_size);
        let Some(character) = self.characters.get_mut(&id) else {
            return;
        };
        let previous = character.tile;
        character.tile = tile;
        character.chunk = chunk;
        self.unindex(id, previous);
        self.index(id, tile);
    }

    /// Replaces the selection, ignoring unknown identifiers.
    pub fn set_selection<I>(&mut self, ids: I) -> Vec<CharacterId>
    where
        I: IntoIterator<Item = CharacterId>,
    {
        self.selection = ids
            .into_iter()
            .filter(|id| self.characters.contains_key(id))
            .collect();
        self.selection.iter().copied().collect()
    }

    /// Selected characters, dropping any that died since the last read.
    pub fn selection(&mut self) -> Vec<CharacterId> {
        let characters = &self.characters;
        self.selection.retain(|id| characters.contains_key(id));
        self.selection.iter().copied().collect()
    }

    /// Selected characters that are still alive, without pruning.
    pub fn selected(&self) -> impl Iterator<Item = CharacterId> + '_ {
        self.selection
            .iter()
            .copied()
            .filter(|id| self.characters.contains_key(id))
    }

    /// Whether the team has at least one live member.
    #[must_use]
    pub fn has_members(&self, team: Team) -> bool {
        self.of_team(team).next().is_some()
    }

    /// Every live member of the team is idle at base.
    #[must_use]
    pub fn team_complete(&self, team: Team) -> bool {
        self.of_team(team).all(Character::is_idle_at_base)
    }

    /// Every team is complete and at least one character is alive.
    #[must_use]
    pub fn all_teams_complete(&self) -> bool {
        !self.characters.is_empty() && self.characters.values().all(Character::is_idle_at_base)
    }

    fn lookup<'a>(
        &'a self,
        ids: Option<&'a BTreeSet<CharacterId>>,
    ) -> impl Iterator<Item = &'a Character> + 'a {
        ids.into_iter()
            .flatten()
            .filter_map(|id| self.characters.get(id))
    }

    fn index(&mut self, id: CharacterId, tile: TileCoord) {
        let _ = self.by_tile.entry(tile).or_default().insert(id);
        let _ = self
            .by_chunk
            .entry(tile.chunk(self.chunk_size))
            .or_default()
            .insert(id);
    }

    fn unindex(&mut self, id: CharacterId, tile: TileCoord) {
        if let Some(ids) = self.by_tile.get_mut(&tile) {
            let _ = ids.remove(&id);
            if ids.is_empty() {
                let _ = self.by_tile.remove(&tile);
            }
        }
        let chunk = tile.chunk(self.chunk_size);
        if let Some(ids) = self.by_chunk.get_mut(&chunk) {
            let _ = ids.remove(&id);
            if ids.is_empty() {
                let _ = self.by_chunk.remove(&chunk);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(index: u8) -> Team {
        Team::new(index).expect("valid team")
    }

    fn always_open(_: TileCoord) -> bool {
        true
    }

    #[test]
    fn spawn_prefers_chunk_centre() {
        let mut registry = CharacterRegistry::new(5);
        let id = registry
            .spawn(team(0), ChunkCoord::new(1, 1), None, 10, always_open)
            .expect("spawn");
        let character = registry.get(id).expect("alive");
        assert_eq!(character.tile(), TileCoord::new(7, 7));
        assert_eq!(character.current_chunk(), ChunkCoord::new(1, 1));
        assert!(character.is_idle_at_base());
    }

    #[test]
    fn spawn_falls_back_to_row_major_scan() {
        let mut registry = CharacterRegistry::new(3);
        let blocked = [TileCoord::new(1, 1), TileCoord::new(0, 0)];
        let id = registry
            .spawn(team(1), ChunkCoord::new(0, 0), None, 10, |tile| {
                !blocked.contains(&tile)
            })
            .expect("spawn");
        assert_eq!(registry.get(id).map(Character::tile), Some(TileCoord::new(1, 0)));
    }

    #[test]
    fn spawn_skips_occupied_tiles() {
        let mut registry = CharacterRegistry::new(3);
        let first = registry
            .spawn(team(0), ChunkCoord::new(0, 0), None, 10, always_open)
            .expect("spawn");
        let second = registry
            .spawn(team(2), ChunkCoord::new(0, 0), None, 10, always_open)
            .expect("spawn");

        assert_eq!(registry.get(first).map(Character::tile), Some(TileCoord::new(1, 1)));
        assert_eq!(registry.get(second).map(Character::tile), Some(TileCoord::new(0, 0)));
        assert_eq!(
            registry.spawn(team(1), ChunkCoord::new(0, 0), Some(TileCoord::new(1, 1)), 10, always_open),
            Err(SpawnError::TileNotOpen(TileCoord::new(1, 1)))
        );
        assert_eq!(second.get(), first.get() + 1);
    }

    #[test]
    fn spawn_fails_when_chunk_is_full() {
        let mut registry = CharacterRegistry::new(3);
        assert_eq!(
            registry.spawn(team(0), ChunkCoord::new(0, 0), None, 10, |_| false),
            Err(SpawnError::NoOpenTile(ChunkCoord::new(0, 0)))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn tile_override_must_sit_in_chunk() {
        let mut registry = CharacterRegistry::new(3);
        let tile = TileCoord::new(5, 5);
        assert_eq!(
            registry.spawn(team(0), ChunkCoord::new(0, 0), Some(tile), 10, always_open),
            Err(SpawnError::TileOutsideChunk {
                tile,
                chunk: ChunkCoord::new(0, 0)
            })
        );
    }

    #[test]
    fn relocation_updates_indices() {
        let mut registry = CharacterRegistry::new(3);
        let id = registry
            .spawn(team(0), ChunkCoord::new(0, 0), None, 10, always_open)
            .expect("spawn");

        registry.relocate(id, TileCoord::new(3, 1));

        assert_eq!(registry.at_tile(TileCoord::new(1, 1)).count(), 0);
        assert_eq!(registry.at_tile(TileCoord::new(3, 1)).count(), 1);
        assert_eq!(registry.in_chunk(ChunkCoord::new(0, 0)).count(), 0);
        assert_eq!(registry.in_chunk(ChunkCoord::new(1, 0)).count(), 1);
        assert!(!registry.team_complete(team(0)));
    }

    #[test]
    fn selection_prunes_dead_characters() {
        let mut registry = CharacterRegistry::new(3);
        let first = registry
            .spawn(team(0), ChunkCoord::new(0, 0), None, 10, always_open)
            .expect("spawn");
        let second = registry
            .spawn(team(0), ChunkCoord::new(1, 0), None, 10, always_open)
            .expect("spawn");

        let selected = registry.set_selection([first, second, CharacterId::new(99)]);
        assert_eq!(selected, vec![first, second]);

        let _ = registry.characters.remove(&first);
        assert_eq!(registry.selected().collect::<Vec<_>>(), vec![second]);
        assert_eq!(registry.selection(), vec![second]);
        assert_eq!(registry.selection.len(), 1);
    }
}
