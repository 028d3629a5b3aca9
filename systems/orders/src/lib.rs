#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure orders system translating pointer presses into selection and mission commands.

use skirmish_core::{CharacterId, ChunkCoord, Command, Event, Phase, TileCoord};
use tracing::debug;

/// Location a pointer press resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PressTarget {
    /// Tile under the pointer.
    pub tile: TileCoord,
    /// Chunk containing [`PressTarget::tile`].
    pub chunk: ChunkCoord,
}

impl PressTarget {
    /// Creates a press target for the tile, deriving the chunk from `chunk_size`.
    #[must_use]
    pub const fn new(tile: TileCoord, chunk_size: u32) -> Self {
        Self {
            tile,
            chunk: tile.chunk(chunk_size),
        }
    }
}

/// Input snapshot distilled from adapter-provided frame input data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OrderInput {
    /// Primary press resolved to a map location on this frame.
    pub press: Option<PressTarget>,
    /// Indicates whether the player asked to drop the selection on this frame.
    pub cancel: bool,
}

/// Orders system that tracks phase and selection from events and emits commands.
#[derive(Clone, Debug)]
pub struct Orders {
    phase: Phase,
    selection: Vec<CharacterId>,
}

impl Default for Orders {
    fn default() -> Self {
        Self::new()
    }
}

impl Orders {
    /// Creates a new orders system instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: Phase::Planning,
            selection: Vec::new(),
        }
    }

    /// Selection as last reported by the world.
    #[must_use]
    pub fn selection(&self) -> &[CharacterId] {
        &self.selection
    }

    /// Consumes world events and adapter-derived input to emit order commands.
    ///
    /// A press on one of the player's characters toggles it in the selection.
    /// A press anywhere else during planning sends every selected character on
    /// a mission to the pressed chunk and clears the selection. The
    /// `friendly_at` closure should report the player's character on a tile.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        input: OrderInput,
        mut friendly_at: F,
        out: &mut Vec<Command>,
    ) where
        F: FnMut(TileCoord) -> Option<CharacterId>,
    {
        for event in events {
            match event {
                Event::PhaseChanged { phase } => self.phase = *phase,
                Event::SelectionChanged { characters } => self.selection.clone_from(characters),
                Event::CharacterKilled { character } => {
                    self.selection.retain(|selected| selected != character);
                }
                Event::MapGenerated { .. } => self.selection.clear(),
                _ => {}
            }
        }

        if input.cancel && !self.selection.is_empty() {
            out.push(Command::ClearSelection);
            return;
        }

        let Some(press) = input.press else {
            return;
        };

        if let Some(character) = friendly_at(press.tile) {
            let mut characters = self.selection.clone();
            if let Some(index) = characters.iter().position(|id| *id == character) {
                let _ = characters.remove(index);
            } else {
                characters.push(character);
            }
            debug!(%character, selected = characters.len(), "selection toggled");
            out.push(Command::SetSelection { characters });
            return;
        }

        if self.phase != Phase::Planning || self.selection.is_empty() {
            return;
        }

        debug!(chunk = %press.chunk, units = self.selection.len(), "missions ordered");
        out.extend(
            self.selection
                .iter()
                .map(|character| Command::AssignMission {
                    character: *character,
                    chunk: press.chunk,
                }),
        );
        out.push(Command::ClearSelection);
    }
}
