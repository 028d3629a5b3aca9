//! Behaviour driving, path following and coin pickup.

use std::time::Duration;

use skirmish_core::{CharacterId, ChunkCoord, Event, TileCoord};
use skirmish_system_behavior::{step, Effect};
use skirmish_system_pathfinding::AvoidanceField;
use tracing::{debug, info};

use crate::{registry::Character, World};

impl World {
    /// Runs one behaviour step for every live character in spawn order.
    pub(crate) fn run_behavior(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        for id in self.characters.ids() {
            let Some(character) = self.characters.get(id) else {
                continue;
            };
            let transition = step(character.state, &character.behavior_snapshot(), dt);

            if transition.changed() {
                if let Some(character) = self.characters.get_mut(id) {
                    character.state = transition.to;
                }
                debug!(character = %id, from = ?transition.from, to = ?transition.to, "state changed");
                out_events.push(Event::StateChanged {
                    character: id,
                    from: transition.from,
                    to: transition.to,
                });
            }

            for effect in transition.effects {
                self.apply_effect(id, effect, out_events);
            }
            self.look_around(id);
        }
    }

    fn apply_effect(&mut self, id: CharacterId, effect: Effect, out_events: &mut Vec<Event>) {
        if let Some(character) = self.characters.get_mut(id) {
            character.absorb(&effect);
        }

        match effect {
            Effect::ScanMissionChunk => self.scan_current_chunk(id),
            Effect::PlanPath { destination } => {
                let goal = destination.center(self.config.chunk_size);
                let _ = self.plan_path(id, goal, out_events);
            }
            Effect::Advance { destination, dt } => self.advance(id, destination, dt, out_events),
            Effect::ClearTarget
            | Effect::MarkMissionComplete
            | Effect::RedirectHome
            | Effect::StopTravel => {}
        }
    }

    /// Replaces the character's path with a fresh route to `goal`.
    ///
    /// Returns `false` when the goal cannot be reached right now.
    fn plan_path(&mut self, id: CharacterId, goal: TileCoord, out_events: &mut Vec<Event>) -> bool {
        let Self {
            characters,
            terrain,
            pathfinder,
            config,
            ..
        } = self;
        let Some(character) = characters.get(id) else {
            return false;
        };
        let start = character.tile;
        let team = character.team;

        let enemy_tiles = character
            .seen_enemies
            .iter()
            .filter_map(|enemy| characters.get(*enemy))
            .map(Character::tile)
            .collect();
        let avoidance = AvoidanceField::new(
            enemy_tiles,
            config.enemy_avoid_radius,
            config.enemy_avoid_penalty,
        );

        let path = pathfinder.find_path_avoiding(
            start,
            goal,
            &*terrain,
            |tile| characters.friendly_at(tile, team, id),
            &avoidance,
        );
        let steps = path.len();

        if let Some(character) = characters.get_mut(id) {
            character.path = path.into();
            character.path_goal = Some(goal);
        }

        if steps == 0 && start != goal {
            out_events.push(Event::PathUnavailable {
                character: id,
                destination: goal,
            });
            return false;
        }

        out_events.push(Event::PathPlanned {
            character: id,
            destination: goal,
            steps,
        });
        true
    }

    /// Spends `dt` walking toward the centre of `destination`.
    ///
    /// Walking stops as soon as the character stands anywhere inside the
    /// destination chunk.
    fn advance(
        &mut self,
        id: CharacterId,
        destination: ChunkCoord,
        dt: Duration,
        out_events: &mut Vec<Event>,
    ) {
        let goal = destination.center(self.config.chunk_size);
        let retry_steps = self.config.blocked_retry_delay * self.config.speed;

        let stale = self
            .characters
            .get(id)
            .is_some_and(|character| character.path_goal != Some(goal));
        if stale {
            let _ = self.plan_path(id, goal, out_events);
        }

        let gained = dt.as_secs_f32() * self.config.speed;
        if let Some(character) = self.characters.get_mut(id) {
            character.step_timer += gained;
        }

        loop {
            let Some(character) = self.characters.get(id) else {
                return;
            };
            if character.step_timer < 1.0 || character.chunk == destination {
                return;
            }
            let from = character.tile;
            let team = character.team;

            let Some(next) = character.path.front().copied() else {
                if !self.plan_path(id, goal, out_events) {
                    if let Some(character) = self.characters.get_mut(id) {
                        character.step_timer = 0.0;
                    }
                    return;
                }
                continue;
            };

            if next != goal && self.characters.friendly_at(next, team, id) {
                debug!(character = %id, blocked = %next, "friendly in the way, replanning");
                let _ = self.plan_path(id, goal, out_events);
                if let Some(character) = self.characters.get_mut(id) {
                    character.step_timer = -retry_steps;
                }
                return;
            }

            if let Some(character) = self.characters.get_mut(id) {
                character.step_timer -= 1.0;
                let _ = character.path.pop_front();
            }
            self.characters.relocate(id, next);
            out_events.push(Event::CharacterMoved {
                character: id,
                from,
                to: next,
            });

            if let Some(amount) = self.coins.take(next) {
                let purse = &mut self.team_coins[team.index()];
                *purse = purse.saturating_add(amount.get());
                info!(character = %id, %team, tile = %next, amount = amount.get(), "coin collected");
                out_events.push(Event::CoinCollected {
                    character: id,
                    team,
                    tile: next,
                    amount,
                });
            }
        }
    }
}
