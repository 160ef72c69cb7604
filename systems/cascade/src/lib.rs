#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Move resolver that drives a player action through detection, activation,
//! clearing and refill until the board is stable.
//!
//! The resolver is a synchronous state machine. Each call to
//! [`MoveResolver::advance`] performs exactly one transition and appends the
//! events it produced, so presentation layers can play them back step by step
//! before requesting the next transition.

use std::collections::BTreeSet;

use gemfall_core::{
    BoosterKind, CellCoord, ClearCause, Command, Event, Match, PowerupSpawn, TileColor, TileId,
    BASIS_POINTS, CASCADE_MULTIPLIER_BPS, STABILIZE_ITERATION_CAP,
};
use gemfall_system_match_detection::MatchDetector;
use gemfall_system_powerup_activation::{ActivationConfig, PowerupActivation, Trigger};
use gemfall_world::{self as world, query, World};
use thiserror::Error;

/// Tuning parameters for the move resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolverConfig {
    stabilize_cap: u32,
    auto_shuffle: bool,
}

impl ResolverConfig {
    /// Creates a new resolver configuration.
    #[must_use]
    pub const fn new(stabilize_cap: u32, auto_shuffle: bool) -> Self {
        Self {
            stabilize_cap,
            auto_shuffle,
        }
    }

    /// Maximum match-removal passes when stabilising a board.
    #[must_use]
    pub const fn stabilize_cap(&self) -> u32 {
        self.stabilize_cap
    }

    /// Whether a board without any possible move is reshuffled automatically.
    #[must_use]
    pub const fn auto_shuffle(&self) -> bool {
        self.auto_shuffle
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::new(STABILIZE_ITERATION_CAP, true)
    }
}

/// Reasons a player action is refused before it touches the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MoveError {
    /// A previous action is still resolving.
    #[error("a move is still being resolved")]
    Busy,
    /// A coordinate lies outside the grid.
    #[error("cell lies outside the grid")]
    OutOfBounds,
    /// The two cells are not orthogonal neighbours.
    #[error("cells are not adjacent")]
    NotAdjacent,
    /// A tile is frozen or locked in place.
    #[error("tile cannot be moved")]
    NotSwappable,
    /// A referenced cell or identifier holds no tile.
    #[error("no tile at the requested location")]
    MissingTile,
    /// The tapped tile carries no power-up.
    #[error("tile is not a power-up")]
    NotAPowerup,
    /// The booster needs a target cell.
    #[error("booster requires a target cell")]
    MissingTarget,
}

/// Tiles and obstacles one clearing step removes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClearPlan {
    /// Cells whose tiles are cleared.
    pub tiles: Vec<CellCoord>,
    /// Cells whose obstacles are hit directly.
    pub hits: Vec<CellCoord>,
    /// Reason reported with the cleared tiles.
    pub cause: ClearCause,
    /// Power-ups created once the tiles are gone.
    pub spawns: Vec<(PowerupSpawn, TileColor)>,
    /// Power-ups whose cached targets are dropped after the clear.
    pub released: Vec<TileId>,
}

/// Resolution phase of the current player action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for input.
    Idle,
    /// Two tiles were exchanged and await evaluation.
    SwapApplied {
        /// Cell the player dragged from.
        first: CellCoord,
        /// Cell the player dragged onto.
        second: CellCoord,
    },
    /// A power-up chain is about to fire.
    Activating(Trigger),
    /// Matches were found and await clearing.
    MatchesFound(Vec<Match>),
    /// Tiles are about to be cleared.
    Clearing(ClearPlan),
    /// Gravity and refill are about to run.
    Refilling,
    /// No matches remain; the action completes on the next transition.
    Stable,
}

/// Drives player actions through the cascade state machine.
#[derive(Debug)]
pub struct MoveResolver {
    config: ResolverConfig,
    detector: MatchDetector,
    activation: PowerupActivation,
    phase: Phase,
    level: u32,
    consumes_move: bool,
    activated: BTreeSet<TileId>,
}

impl MoveResolver {
    /// Creates an idle resolver.
    #[must_use]
    pub fn new(config: ResolverConfig, activation: ActivationConfig) -> Self {
        Self {
            config,
            detector: MatchDetector::new(),
            activation: PowerupActivation::new(activation),
            phase: Phase::Idle,
            level: 0,
            consumes_move: false,
            activated: BTreeSet::new(),
        }
    }

    /// Current resolution phase.
    #[must_use]
    pub const fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Reports whether an action is in flight and new input must wait.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Number of detection passes that found matches during the current action.
    #[must_use]
    pub const fn cascade_level(&self) -> u32 {
        self.level
    }

    /// Exposes the power-up system, including its cached propeller targets.
    #[must_use]
    pub const fn activation(&self) -> &PowerupActivation {
        &self.activation
    }

    /// Exchanges two tiles and begins resolving the move.
    pub fn swap(
        &mut self,
        world: &mut World,
        first: CellCoord,
        second: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), MoveError> {
        self.ensure_idle()?;

        let view = query::grid_view(world);
        let (Some(a), Some(b)) = (view.cell(first), view.cell(second)) else {
            return Err(MoveError::OutOfBounds);
        };
        if !first.is_adjacent(second) {
            return Err(MoveError::NotAdjacent);
        }
        if a.tile().is_none() || b.tile().is_none() {
            return Err(MoveError::MissingTile);
        }
        if a.movable_tile().is_none() || b.movable_tile().is_none() {
            return Err(MoveError::NotSwappable);
        }

        world::apply(world, Command::SwapTiles { first, second }, out_events);
        self.begin(true, Phase::SwapApplied { first, second });
        Ok(())
    }

    /// Fires a power-up in place.
    pub fn tap_powerup(&mut self, world: &World, tile: TileId) -> Result<(), MoveError> {
        self.ensure_idle()?;
        let tile = query::tile(world, tile).ok_or(MoveError::MissingTile)?;
        if !tile.is_powerup() {
            return Err(MoveError::NotAPowerup);
        }

        self.begin(true, Phase::Activating(Trigger::Single { tile, hint: None }));
        Ok(())
    }

    /// Applies a booster. Boosters never consume a move.
    pub fn apply_booster(
        &mut self,
        world: &mut World,
        kind: BoosterKind,
        target: Option<CellCoord>,
        out_events: &mut Vec<Event>,
    ) -> Result<(), MoveError> {
        self.ensure_idle()?;
        if kind.needs_target() && target.is_none() {
            return Err(MoveError::MissingTarget);
        }
        if let (Some(cell), true) = (target, kind.needs_target()) {
            let state = *query::grid_view(world)
                .cell(cell)
                .ok_or(MoveError::OutOfBounds)?;
            let usable = match kind {
                BoosterKind::Powerup(_) => state.is_playable(),
                _ => !state.is_blocked(),
            };
            if !usable {
                return Err(MoveError::MissingTile);
            }
        }

        out_events.push(Event::BoosterApplied { kind, target });

        let phase = match (kind, target) {
            (BoosterKind::Shuffle, _) => {
                shuffle(world, &mut self.detector, self.config, out_events);
                Phase::Stable
            }
            (BoosterKind::Hammer, Some(cell)) => {
                match query::tile_at(world, cell) {
                    Some(tile) if tile.is_powerup() => {
                        Phase::Activating(Trigger::Single { tile, hint: None })
                    }
                    _ => {
                        world::apply(world, Command::RemoveObstacle { cell }, out_events);
                        Phase::Clearing(ClearPlan {
                            tiles: vec![cell],
                            hits: Vec::new(),
                            cause: ClearCause::Booster,
                            spawns: Vec::new(),
                            released: Vec::new(),
                        })
                    }
                }
            }
            (BoosterKind::Powerup(powerup), Some(cell)) => {
                let color = query::tile_at(world, cell)
                    .map(|tile| tile.color)
                    .or_else(|| query::palette(world).first().copied())
                    .unwrap_or(TileColor::Red);
                let covered = query::grid_view(world)
                    .cell(cell)
                    .and_then(|state| state.obstacle())
                    .is_some_and(|obstacle| obstacle.kind().protects_tile());
                if covered {
                    world::apply(world, Command::RemoveObstacle { cell }, out_events);
                }
                if query::tile_at(world, cell).is_some() {
                    world::apply(
                        world,
                        Command::Clear {
                            tiles: vec![cell],
                            hits: Vec::new(),
                            cause: ClearCause::Booster,
                        },
                        out_events,
                    );
                }
                world::apply(
                    world,
                    Command::PlaceTile {
                        cell,
                        color,
                        powerup: Some(powerup),
                    },
                    out_events,
                );
                let tile = query::tile_at(world, cell).ok_or(MoveError::MissingTile)?;
                Phase::Activating(Trigger::Single { tile, hint: None })
            }
            (_, None) => return Err(MoveError::MissingTarget),
        };

        self.begin(false, phase);
        Ok(())
    }

    /// Performs a single transition and returns the phase reached.
    pub fn advance(&mut self, world: &mut World, out_events: &mut Vec<Event>) -> &Phase {
        let phase = std::mem::replace(&mut self.phase, Phase::Idle);
        self.phase = match phase {
            Phase::Idle => Phase::Idle,
            Phase::SwapApplied { first, second } => {
                self.evaluate_swap(world, first, second, out_events)
            }
            Phase::Activating(trigger) => self.fire(world, trigger, out_events),
            Phase::MatchesFound(matches) => self.announce(matches, out_events),
            Phase::Clearing(plan) => self.clear(world, plan, out_events),
            Phase::Refilling => self.refill(world, out_events),
            Phase::Stable => self.complete(world, out_events),
        };
        &self.phase
    }

    /// Advances until the current action has fully resolved.
    pub fn run_to_stable(&mut self, world: &mut World, out_events: &mut Vec<Event>) {
        while self.is_processing() {
            let _ = self.advance(world, out_events);
        }
    }

    fn ensure_idle(&self) -> Result<(), MoveError> {
        if self.is_processing() {
            Err(MoveError::Busy)
        } else {
            Ok(())
        }
    }

    fn begin(&mut self, consumes_move: bool, phase: Phase) {
        self.level = 0;
        self.consumes_move = consumes_move;
        self.activated.clear();
        self.phase = phase;
    }

    fn evaluate_swap(
        &mut self,
        world: &mut World,
        first: CellCoord,
        second: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Phase {
        let dragged = query::tile_at(world, second);
        let other = query::tile_at(world, first);

        match (dragged, other) {
            (Some(a), Some(b)) if a.is_powerup() && b.is_powerup() => {
                out_events.push(Event::PowerupsCombined {
                    first: a,
                    second: b,
                    cell: second,
                });
                return Phase::Activating(Trigger::Combo {
                    first: a,
                    second: b,
                    cell: second,
                });
            }
            (Some(powerup), Some(partner)) | (Some(partner), Some(powerup))
                if powerup.is_powerup() =>
            {
                return Phase::Activating(Trigger::Single {
                    tile: powerup,
                    hint: Some(partner.color),
                });
            }
            _ => {}
        }

        let matches = self.detector.find_all_matches(&query::grid_view(world));
        if matches.is_empty() {
            world::apply(world, Command::SwapTiles { first, second }, out_events);
            out_events.push(Event::SwapReverted { first, second });
            return Phase::Idle;
        }
        Phase::MatchesFound(matches)
    }

    fn fire(&mut self, world: &World, trigger: Trigger, out_events: &mut Vec<Event>) -> Phase {
        let view = query::grid_view(world);
        let outcome = self
            .activation
            .resolve_chain(&view, trigger, &mut self.activated);

        let mut released = Vec::new();
        for activation in &outcome.activations {
            released.push(activation.tile.id);
            released.extend(activation.partner.map(|partner| partner.id));
            out_events.push(Event::PowerupActivated {
                tile: activation.tile,
                target: activation.target,
                wave: activation.wave,
                cells: activation.cells.clone(),
            });
        }

        Phase::Clearing(ClearPlan {
            tiles: outcome.cells.clone(),
            hits: outcome.cells,
            cause: ClearCause::Powerup,
            spawns: Vec::new(),
            released,
        })
    }

    fn announce(&mut self, matches: Vec<Match>, out_events: &mut Vec<Event>) -> Phase {
        self.level += 1;
        out_events.push(Event::CascadeLevel {
            level: self.level,
            multiplier_bps: cascade_multiplier_bps(self.level),
        });

        let mut tiles = Vec::new();
        let mut spawns = Vec::new();
        for found in &matches {
            tiles.extend(found.cells());
            if let (Some(spawn), Some(color)) = (found.powerup, found.color()) {
                spawns.push((spawn, color));
            }
        }
        out_events.push(Event::MatchFound { matches });

        Phase::Clearing(ClearPlan {
            tiles,
            hits: Vec::new(),
            cause: ClearCause::Match,
            spawns,
            released: Vec::new(),
        })
    }

    fn clear(&mut self, world: &mut World, plan: ClearPlan, out_events: &mut Vec<Event>) -> Phase {
        world::apply(
            world,
            Command::Clear {
                tiles: plan.tiles,
                hits: plan.hits,
                cause: plan.cause,
            },
            out_events,
        );

        for (spawn, color) in plan.spawns {
            let occupied = query::grid_view(world).cell(spawn.cell).is_some_and(|cell| {
                cell.tile().is_some_and(|tile| tile.is_powerup())
                    || cell
                        .obstacle()
                        .is_some_and(|obstacle| obstacle.kind().protects_tile())
            });
            if occupied {
                continue;
            }
            world::apply(
                world,
                Command::SpawnPowerup {
                    cell: spawn.cell,
                    kind: spawn.kind,
                    color,
                },
                out_events,
            );
        }

        self.activation.release(plan.released);
        Phase::Refilling
    }

    fn refill(&mut self, world: &mut World, out_events: &mut Vec<Event>) -> Phase {
        world::apply(world, Command::ApplyGravity, out_events);
        world::apply(world, Command::Refill, out_events);

        let matches = self.detector.find_all_matches(&query::grid_view(world));
        if matches.is_empty() {
            Phase::Stable
        } else {
            Phase::MatchesFound(matches)
        }
    }

    fn complete(&mut self, world: &mut World, out_events: &mut Vec<Event>) -> Phase {
        if self.config.auto_shuffle()
            && self
                .detector
                .find_possible_move(&query::grid_view(world))
                .is_none()
        {
            shuffle(world, &mut self.detector, self.config, out_events);
        }

        out_events.push(Event::MoveCompleted {
            cascades: self.level,
            consumes_move: self.consumes_move,
        });
        self.activated.clear();
        Phase::Idle
    }
}

impl Default for MoveResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default(), ActivationConfig::default())
    }
}

/// Score multiplier of a cascade level in basis points.
///
/// Level one scores at face value and each further level multiplies by
/// [`CASCADE_MULTIPLIER_BPS`].
#[must_use]
pub fn cascade_multiplier_bps(level: u32) -> u32 {
    let mut multiplier = u64::from(BASIS_POINTS);
    for _ in 1..level {
        multiplier = multiplier * u64::from(CASCADE_MULTIPLIER_BPS) / u64::from(BASIS_POINTS);
        if multiplier > u64::from(u32::MAX) {
            return u32::MAX;
        }
    }
    u32::try_from(multiplier).unwrap_or(u32::MAX)
}

/// Replaces matched tiles until a detection pass finds nothing or the cap is reached.
///
/// Returns `true` when the board ended up free of matches.
pub fn stabilize(
    world: &mut World,
    detector: &mut MatchDetector,
    cap: u32,
    out_events: &mut Vec<Event>,
) -> bool {
    for _ in 0..cap {
        let matches = detector.find_all_matches(&query::grid_view(world));
        if matches.is_empty() {
            return true;
        }
        for found in matches {
            for cell in found.cells() {
                world::apply(world, Command::ReplaceTile { cell }, out_events);
            }
        }
    }
    detector
        .find_all_matches(&query::grid_view(world))
        .is_empty()
}

/// Shuffles the board and stabilises it, retrying until a move exists or the cap is reached.
pub fn shuffle(
    world: &mut World,
    detector: &mut MatchDetector,
    config: ResolverConfig,
    out_events: &mut Vec<Event>,
) {
    for _ in 0..config.stabilize_cap().max(1) {
        world::apply(world, Command::Shuffle, out_events);
        let _ = stabilize(world, detector, config.stabilize_cap(), out_events);
        if detector
            .find_possible_move(&query::grid_view(world))
            .is_some()
        {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_grows_per_level() {
        assert_eq!(cascade_multiplier_bps(0), 10_000);
        assert_eq!(cascade_multiplier_bps(1), 10_000);
        assert_eq!(cascade_multiplier_bps(2), 15_000);
        assert_eq!(cascade_multiplier_bps(3), 22_500);
    }

    #[test]
    fn multiplier_saturates() {
        assert_eq!(cascade_multiplier_bps(200), u32::MAX);
    }

    #[test]
    fn resolver_starts_idle() {
        let resolver = MoveResolver::default();
        assert!(!resolver.is_processing());
        assert_eq!(resolver.phase(), &Phase::Idle);
    }
}
