#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that resolves power-up effects and chain reactions.
//!
//! Activations never mutate the grid. They report the affected cells so the
//! resolver can submit a single clear command per activation chain.

use std::collections::{BTreeMap, BTreeSet};

use gemfall_core::{CellCoord, GridView, PowerupKind, Tile, TileColor, TileId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const DEFAULT_BOMB_RADIUS: u32 = 2;
const DEFAULT_COMBO_BOMB_RADIUS: u32 = 3;
const DEFAULT_COLOR_COMBO_BOMB_RADIUS: u32 = 1;
const DEFAULT_TARGETING_SEED: u64 = 0x6d2b_79f5_0d3a_11c7;
const OBSTACLE_TARGET_WEIGHT: u32 = 10;

/// Tuning parameters for power-up effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivationConfig {
    bomb_radius: u32,
    combo_bomb_radius: u32,
    color_combo_bomb_radius: u32,
    targeting_seed: u64,
}

impl ActivationConfig {
    /// Creates a new configuration.
    #[must_use]
    pub const fn new(
        bomb_radius: u32,
        combo_bomb_radius: u32,
        color_combo_bomb_radius: u32,
        targeting_seed: u64,
    ) -> Self {
        Self {
            bomb_radius,
            combo_bomb_radius,
            color_combo_bomb_radius,
            targeting_seed,
        }
    }

    /// Chebyshev radius of a single bomb.
    #[must_use]
    pub const fn bomb_radius(&self) -> u32 {
        self.bomb_radius
    }

    /// Chebyshev radius of two bombs combined.
    #[must_use]
    pub const fn combo_bomb_radius(&self) -> u32 {
        self.combo_bomb_radius
    }

    /// Chebyshev radius of each explosion in a color bomb and bomb combination.
    #[must_use]
    pub const fn color_combo_bomb_radius(&self) -> u32 {
        self.color_combo_bomb_radius
    }

    /// Seed mixed with tile identifiers to break propeller targeting ties.
    #[must_use]
    pub const fn targeting_seed(&self) -> u64 {
        self.targeting_seed
    }
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_BOMB_RADIUS,
            DEFAULT_COMBO_BOMB_RADIUS,
            DEFAULT_COLOR_COMBO_BOMB_RADIUS,
            DEFAULT_TARGETING_SEED,
        )
    }
}

/// What set a chain of activations in motion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// One power-up fires on its own.
    Single {
        /// Power-up tile that fires.
        tile: Tile,
        /// Color a color bomb should target, typically the tile it was swapped with.
        hint: Option<TileColor>,
    },
    /// Two power-ups were swapped into each other.
    Combo {
        /// Power-up the player dragged.
        first: Tile,
        /// Power-up that was dragged onto.
        second: Tile,
        /// Cell where the combined effect originates.
        cell: CellCoord,
    },
}

/// A single power-up effect within a chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Activation {
    /// Power-up that fired.
    pub tile: Tile,
    /// Partner power-up when the effect is a combination.
    pub partner: Option<Tile>,
    /// Destination chosen by a propeller, if one took part.
    pub target: Option<CellCoord>,
    /// Zero-based breadth-first wave of the activation.
    pub wave: u32,
    /// Cells affected by this activation, ordered row-major.
    pub cells: Vec<CellCoord>,
}

/// Combined result of an activation chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainOutcome {
    /// Every activation in wave order.
    pub activations: Vec<Activation>,
    /// Union of affected cells, ordered row-major.
    pub cells: Vec<CellCoord>,
    /// Tiles held by the affected cells, including the fired power-ups.
    pub tiles: Vec<Tile>,
}

impl ChainOutcome {
    /// Reports whether the tile fired as part of the chain.
    #[must_use]
    pub fn activated(&self, id: TileId) -> bool {
        self.activations.iter().any(|activation| {
            activation.tile.id == id || activation.partner.is_some_and(|partner| partner.id == id)
        })
    }
}

/// Power-up activation system with a propeller target cache.
#[derive(Debug, Default)]
pub struct PowerupActivation {
    config: ActivationConfig,
    targets: BTreeMap<TileId, CellCoord>,
}

impl PowerupActivation {
    /// Creates a new activation system.
    #[must_use]
    pub fn new(config: ActivationConfig) -> Self {
        Self {
            config,
            targets: BTreeMap::new(),
        }
    }

    /// Configuration used by the system.
    #[must_use]
    pub const fn config(&self) -> &ActivationConfig {
        &self.config
    }

    /// Activates a power-up and returns every other tile the chain clears.
    ///
    /// `activated` guards against re-triggering. A tile already present in
    /// the set fires nothing.
    pub fn activate(
        &mut self,
        view: &GridView<'_>,
        tile: Tile,
        hint: Option<TileColor>,
        activated: &mut BTreeSet<TileId>,
    ) -> Vec<Tile> {
        let outcome = self.resolve_chain(view, Trigger::Single { tile, hint }, activated);
        outcome
            .tiles
            .into_iter()
            .filter(|cleared| cleared.id != tile.id)
            .collect()
    }

    /// Resolves a trigger and every power-up it reveals, breadth-first.
    pub fn resolve_chain(
        &mut self,
        view: &GridView<'_>,
        trigger: Trigger,
        activated: &mut BTreeSet<TileId>,
    ) -> ChainOutcome {
        let mut outcome = ChainOutcome::default();
        let mut wave: Vec<Activation> = Vec::new();

        match trigger {
            Trigger::Single { tile, hint } => {
                if activated.insert(tile.id) {
                    wave.push(self.single(view, tile, hint, 0));
                }
            }
            Trigger::Combo {
                first,
                second,
                cell,
            } => {
                let _ = activated.insert(first.id);
                let _ = activated.insert(second.id);
                wave.push(self.combo(view, first, second, cell));
            }
        }

        let mut affected: BTreeSet<CellCoord> = BTreeSet::new();
        let mut index = 0;
        while !wave.is_empty() {
            index += 1;
            let mut revealed: Vec<(Tile, TileColor)> = Vec::new();
            for activation in &wave {
                for cell in &activation.cells {
                    let _ = affected.insert(*cell);
                    let Some(tile) = view.tile(*cell) else {
                        continue;
                    };
                    if tile.is_powerup() && activated.insert(tile.id) {
                        revealed.push((tile, activation.tile.color));
                    }
                }
            }

            outcome.activations.append(&mut wave);
            for (tile, trigger_color) in revealed {
                wave.push(self.single(view, tile, Some(trigger_color), index));
            }
        }

        outcome.tiles = affected.iter().filter_map(|cell| view.tile(*cell)).collect();
        outcome.cells = affected.into_iter().collect();
        outcome
    }

    /// Returns the propeller target for the tile, computing and caching it on first use.
    pub fn target_for(&mut self, view: &GridView<'_>, tile: Tile) -> Option<CellCoord> {
        self.target_avoiding(view, tile, &BTreeSet::new())
    }

    /// Returns the cached target of the tile without computing one.
    #[must_use]
    pub fn cached_target(&self, id: TileId) -> Option<CellCoord> {
        self.targets.get(&id).copied()
    }

    /// Drops cached targets for tiles that left the board.
    pub fn release<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = TileId>,
    {
        for id in ids {
            let _ = self.targets.remove(&id);
        }
    }

    fn single(
        &mut self,
        view: &GridView<'_>,
        tile: Tile,
        hint: Option<TileColor>,
        wave: u32,
    ) -> Activation {
        let mut cells = BTreeSet::new();
        let _ = cells.insert(tile.cell);
        let mut target = None;

        match tile.powerup {
            Some(PowerupKind::RocketH) => cells.extend(row(view, tile.cell.row())),
            Some(PowerupKind::RocketV) => cells.extend(column(view, tile.cell.column())),
            Some(PowerupKind::Bomb) => {
                cells.extend(area(view, tile.cell, self.config.bomb_radius()));
            }
            Some(PowerupKind::ColorBomb) => {
                if let Some(color) = resolve_color(view, hint.into_iter()) {
                    cells.extend(color_tiles(view, color).map(|found| found.cell));
                }
            }
            Some(PowerupKind::Propeller) => {
                target = self.target_for(view, tile);
                cells.extend(plus(view, target.unwrap_or(tile.cell)));
            }
            None => {}
        }

        Activation {
            tile,
            partner: None,
            target,
            wave,
            cells: cells.into_iter().collect(),
        }
    }

    fn combo(&mut self, view: &GridView<'_>, first: Tile, second: Tile, cell: CellCoord) -> Activation {
        let (low, high) = match (first.powerup, second.powerup) {
            (Some(a), Some(b)) if b < a => (second, first),
            _ => (first, second),
        };

        let mut cells = BTreeSet::new();
        let _ = cells.insert(first.cell);
        let _ = cells.insert(second.cell);
        let mut target = None;

        use PowerupKind::{Bomb, ColorBomb, Propeller};
        match (low.powerup, high.powerup) {
            (Some(a), Some(b)) if a.is_rocket() && b.is_rocket() => {
                cells.extend(row(view, cell.row()));
                cells.extend(column(view, cell.column()));
            }
            (Some(a), Some(Bomb)) if a.is_rocket() => {
                for offset in [-1, 0, 1] {
                    if let Some(line) = shift(cell.row(), offset, view.rows()) {
                        cells.extend(row(view, line));
                    }
                    if let Some(line) = shift(cell.column(), offset, view.columns()) {
                        cells.extend(column(view, line));
                    }
                }
            }
            (Some(Bomb), Some(Bomb)) => {
                cells.extend(area(view, cell, self.config.combo_bomb_radius()));
            }
            (Some(rocket), Some(ColorBomb)) if rocket.is_rocket() => {
                if let Some(color) = resolve_color(view, std::iter::once(low.color)) {
                    for (index, found) in color_tiles(view, color).enumerate() {
                        let _ = cells.insert(found.cell);
                        let fires_row = (index % 2 == 0) == (rocket == PowerupKind::RocketH);
                        if fires_row {
                            cells.extend(row(view, found.cell.row()));
                        } else {
                            cells.extend(column(view, found.cell.column()));
                        }
                    }
                }
            }
            (Some(Bomb), Some(ColorBomb)) => {
                if let Some(color) = resolve_color(view, std::iter::once(low.color)) {
                    let radius = self.config.color_combo_bomb_radius();
                    for found in color_tiles(view, color) {
                        cells.extend(area(view, found.cell, radius));
                    }
                }
            }
            (Some(ColorBomb), Some(ColorBomb)) => {
                cells.extend(
                    view.iter()
                        .filter(|candidate| !candidate.is_blocked())
                        .map(|candidate| candidate.coord()),
                );
            }
            (Some(ColorBomb), Some(Propeller)) => {
                if let Some(color) = resolve_color(view, std::iter::once(high.color)) {
                    for found in color_tiles(view, color) {
                        cells.extend(plus(view, found.cell));
                    }
                }
            }
            (Some(rocket), Some(Propeller)) if rocket.is_rocket() => {
                target = self.target_for(view, high);
                let origin = target.unwrap_or(cell);
                cells.extend(plus(view, origin));
                if rocket == PowerupKind::RocketH {
                    cells.extend(row(view, origin.row()));
                } else {
                    cells.extend(column(view, origin.column()));
                }
            }
            (Some(Bomb), Some(Propeller)) => {
                target = self.target_for(view, high);
                let origin = target.unwrap_or(cell);
                cells.extend(plus(view, origin));
                cells.extend(area(view, origin, self.config.bomb_radius()));
            }
            (Some(Propeller), Some(Propeller)) => {
                cells.extend(plus(view, cell));
                target = self.target_for(view, low);
                let avoid: BTreeSet<CellCoord> = target.into_iter().collect();
                let second_target = self.target_avoiding(view, high, &avoid);
                for destination in target.into_iter().chain(second_target) {
                    cells.extend(plus(view, destination));
                }
            }
            _ => {
                let mut fallback = BTreeSet::new();
                for tile in [low, high] {
                    let activation = self.single(view, tile, Some(low.color), 0);
                    target = target.or(activation.target);
                    fallback.extend(activation.cells);
                }
                cells.extend(fallback);
            }
        }

        Activation {
            tile: first,
            partner: Some(second),
            target,
            wave: 0,
            cells: cells.into_iter().collect(),
        }
    }

    fn target_avoiding(
        &mut self,
        view: &GridView<'_>,
        tile: Tile,
        avoid: &BTreeSet<CellCoord>,
    ) -> Option<CellCoord> {
        if let Some(cached) = self.targets.get(&tile.id) {
            return Some(*cached);
        }

        let home: BTreeSet<CellCoord> = plus(view, tile.cell).collect();
        let mut best: Vec<CellCoord> = Vec::new();
        let mut best_score = 0;
        for cell in view.iter() {
            let coord = cell.coord();
            if cell.is_blocked() || home.contains(&coord) || avoid.contains(&coord) {
                continue;
            }
            if cell.tile().is_none() && cell.obstacle().is_none() {
                continue;
            }

            let obstacle_weight = if cell.obstacle().is_some() {
                OBSTACLE_TARGET_WEIGHT
            } else {
                0
            };
            let tiles = plus(view, coord)
                .filter(|neighbor| view.tile(*neighbor).is_some())
                .count();
            let score = obstacle_weight + u32::try_from(tiles).unwrap_or(u32::MAX);

            if score > best_score {
                best_score = score;
                best.clear();
            }
            if score == best_score {
                best.push(coord);
            }
        }

        if best.is_empty() {
            return None;
        }
        let seed = self.config.targeting_seed() ^ u64::from(tile.id.get());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let chosen = best[rng.gen_range(0..best.len())];
        let _ = self.targets.insert(tile.id, chosen);
        Some(chosen)
    }
}

/// Picks the first available color from the candidates, else the most frequent one on the board.
fn resolve_color<I>(view: &GridView<'_>, mut candidates: I) -> Option<TileColor>
where
    I: Iterator<Item = TileColor>,
{
    if let Some(color) = candidates.next() {
        return Some(color);
    }

    let mut counts: BTreeMap<TileColor, usize> = BTreeMap::new();
    for tile in view.tiles().filter(|tile| !tile.is_powerup()) {
        *counts.entry(tile.color).or_default() += 1;
    }
    let mut best: Option<(TileColor, usize)> = None;
    for (color, count) in counts {
        if best.map_or(true, |(_, current)| count > current) {
            best = Some((color, count));
        }
    }
    best.map(|(color, _)| color)
}

fn color_tiles<'a>(view: &GridView<'a>, color: TileColor) -> impl Iterator<Item = Tile> + 'a {
    view.tiles()
        .filter(move |tile| !tile.is_powerup() && tile.color == color)
}

fn open_cell(view: &GridView<'_>, coord: CellCoord) -> bool {
    view.cell(coord).is_some_and(|cell| !cell.is_blocked())
}

fn row<'a>(view: &GridView<'a>, line: u32) -> impl Iterator<Item = CellCoord> + 'a {
    let view = *view;
    (0..view.columns())
        .map(move |column| CellCoord::new(line, column))
        .filter(move |coord| open_cell(&view, *coord))
}

fn column<'a>(view: &GridView<'a>, line: u32) -> impl Iterator<Item = CellCoord> + 'a {
    let view = *view;
    (0..view.rows())
        .map(move |row| CellCoord::new(row, line))
        .filter(move |coord| open_cell(&view, *coord))
}

fn area<'a>(
    view: &GridView<'a>,
    center: CellCoord,
    radius: u32,
) -> impl Iterator<Item = CellCoord> + 'a {
    let view = *view;
    let rows = center.row().saturating_sub(radius)..=center.row().saturating_add(radius);
    rows.flat_map(move |row| {
        let columns =
            center.column().saturating_sub(radius)..=center.column().saturating_add(radius);
        columns.map(move |column| CellCoord::new(row, column))
    })
    .filter(move |coord| open_cell(&view, *coord))
}

fn plus<'a>(view: &GridView<'a>, center: CellCoord) -> impl Iterator<Item = CellCoord> + 'a {
    let view = *view;
    std::iter::once(center)
        .chain(center.neighbors(view.rows(), view.columns()))
        .filter(move |coord| open_cell(&view, *coord))
}

fn shift(value: u32, offset: i64, limit: u32) -> Option<u32> {
    let shifted = u32::try_from(i64::from(value) + offset).ok()?;
    (shifted < limit).then_some(shifted)
}
