#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic scoring system that turns resolver events into score and
//! level progress.

/// Level objectives tracking obstacle-clearing progress.
pub mod objectives;

use gemfall_core::{ClearCause, Event, LevelOutcome, ObstacleKind, BASIS_POINTS};

pub use objectives::{ObjectiveProgress, Objectives};

const DEFAULT_TILE_SCORE: u64 = 10;
const DEFAULT_POWERUP_BONUS: u64 = 50;

/// Point values awarded by the scoring system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoringConfig {
    tile_score: u64,
    powerup_bonus: u64,
}

impl ScoringConfig {
    /// Creates a new scoring configuration.
    #[must_use]
    pub const fn new(tile_score: u64, powerup_bonus: u64) -> Self {
        Self {
            tile_score,
            powerup_bonus,
        }
    }

    /// Points per cleared tile.
    #[must_use]
    pub const fn tile_score(&self) -> u64 {
        self.tile_score
    }

    /// Bonus for a match that creates a power-up.
    #[must_use]
    pub const fn powerup_bonus(&self) -> u64 {
        self.powerup_bonus
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_SCORE, DEFAULT_POWERUP_BONUS)
    }
}

/// Move budget and win conditions of a level.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelGoals {
    /// Moves available to the player.
    pub moves: u32,
    /// Score that wins the level on its own, if any.
    pub target_score: Option<u64>,
    /// Obstacles that must be destroyed.
    pub objectives: Objectives,
}

/// Pure scoring system that tracks score, moves and objectives.
#[derive(Debug)]
pub struct Scoring {
    config: ScoringConfig,
    goals: LevelGoals,
    score: u64,
    moves_remaining: u32,
    multiplier_bps: u32,
    outcome: Option<LevelOutcome>,
}

impl Scoring {
    /// Creates a scoring system for a fresh level session.
    #[must_use]
    pub fn new(config: ScoringConfig, goals: LevelGoals) -> Self {
        Self {
            config,
            moves_remaining: goals.moves,
            goals,
            score: 0,
            multiplier_bps: BASIS_POINTS,
            outcome: None,
        }
    }

    /// Current score.
    #[must_use]
    pub const fn score(&self) -> u64 {
        self.score
    }

    /// Moves the player has left.
    #[must_use]
    pub const fn moves_remaining(&self) -> u32 {
        self.moves_remaining
    }

    /// Final outcome once the level has ended.
    #[must_use]
    pub const fn outcome(&self) -> Option<LevelOutcome> {
        self.outcome
    }

    /// Objective progress tracked for the level.
    #[must_use]
    pub const fn objectives(&self) -> &Objectives {
        &self.goals.objectives
    }

    /// Consumes resolver events and publishes score and progress updates.
    ///
    /// Events after the level has finished are ignored.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Event>) {
        for event in events {
            if self.outcome.is_some() {
                return;
            }

            match event {
                Event::CascadeLevel { multiplier_bps, .. } => {
                    self.multiplier_bps = *multiplier_bps;
                }
                Event::MatchFound { matches } => {
                    let delta: u64 = matches
                        .iter()
                        .map(|found| self.add_match_score(found.len(), found.powerup.is_some()))
                        .sum();
                    self.publish_score(delta, out);
                }
                Event::TilesCleared { tiles, cause } if *cause != ClearCause::Match => {
                    let count = u64::try_from(tiles.len()).unwrap_or(u64::MAX);
                    let delta = self.scaled(count.saturating_mul(self.config.tile_score()));
                    self.score = self.score.saturating_add(delta);
                    self.publish_score(delta, out);
                }
                Event::ObstacleCleared { kind, .. } => self.on_obstacle_cleared(*kind, 1, out),
                Event::MoveCompleted { consumes_move, .. } => {
                    if *consumes_move {
                        self.moves_remaining = self.moves_remaining.saturating_sub(1);
                    }
                    self.multiplier_bps = BASIS_POINTS;
                    self.evaluate(out);
                }
                _ => {}
            }
        }
    }

    /// Awards points for a match at the current cascade multiplier and returns them.
    pub fn add_match_score(&mut self, tile_count: usize, powerup_created: bool) -> u64 {
        let tiles = u64::try_from(tile_count).unwrap_or(u64::MAX);
        let mut base = tiles.saturating_mul(self.config.tile_score());
        if powerup_created {
            base = base.saturating_add(self.config.powerup_bonus());
        }
        let delta = self.scaled(base);
        self.score = self.score.saturating_add(delta);
        delta
    }

    /// Records destroyed obstacles against the level objectives.
    pub fn on_obstacle_cleared(&mut self, kind: ObstacleKind, count: u32, out: &mut Vec<Event>) {
        if let Some(progress) = self.goals.objectives.record(kind, count) {
            out.push(Event::ObjectiveProgress {
                kind,
                cleared: progress.cleared,
                required: progress.required,
            });
        }
    }

    fn scaled(&self, points: u64) -> u64 {
        points.saturating_mul(u64::from(self.multiplier_bps)) / u64::from(BASIS_POINTS)
    }

    fn publish_score(&self, delta: u64, out: &mut Vec<Event>) {
        if delta > 0 {
            out.push(Event::ScoreChanged {
                score: self.score,
                delta,
            });
        }
    }

    fn goals_met(&self) -> bool {
        let has_goals = !self.goals.objectives.is_empty() || self.goals.target_score.is_some();
        has_goals
            && self.goals.objectives.all_complete()
            && self
                .goals
                .target_score
                .map_or(true, |target| self.score >= target)
    }

    fn evaluate(&mut self, out: &mut Vec<Event>) {
        let outcome = if self.goals_met() {
            LevelOutcome::Won
        } else if self.moves_remaining == 0 {
            LevelOutcome::Lost
        } else {
            return;
        };

        self.outcome = Some(outcome);
        out.push(Event::LevelFinished {
            outcome,
            score: self.score,
        });
    }
}
