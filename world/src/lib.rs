#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative grid state management for Gemfall.

pub mod layout;

use std::collections::BTreeSet;

use gemfall_core::{
    Cell, CellCoord, ClearCause, Command, Event, Obstacle, PowerupKind, SwapRejection, Tile,
    TileColor, TileId, TileMove, WELCOME_BANNER,
};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub use layout::{LayoutCell, LayoutError, LevelLayout};

const DEFAULT_GRID_ROWS: u32 = 8;
const DEFAULT_GRID_COLUMNS: u32 = 8;
const DEFAULT_PALETTE_SIZE: u8 = 5;
const DEFAULT_SEED: u64 = 0x42f0_e1eb_d4a5_3c21;
const MIN_PALETTE_SIZE: u8 = 3;

const FIXTURE_BLOCKED: char = '#';
const FIXTURE_EMPTY: char = '_';

/// Configuration parameters required to construct a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldConfig {
    palette_size: u8,
    seed: u64,
}

impl WorldConfig {
    /// Creates a configuration with the provided palette size and refill seed.
    #[must_use]
    pub const fn new(palette_size: u8, seed: u64) -> Self {
        Self { palette_size, seed }
    }

    /// Number of colors drawn by refills, before clamping to the supported range.
    #[must_use]
    pub const fn palette_size(&self) -> u8 {
        self.palette_size
    }

    /// Seed of the refill random number generator.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE_SIZE, DEFAULT_SEED)
    }
}

/// Represents the authoritative Gemfall grid for one level session.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    rows: u32,
    columns: u32,
    cells: Vec<Cell>,
    palette: Vec<TileColor>,
    rng: ChaCha8Rng,
    next_tile_id: u32,
}

impl World {
    /// Creates a default open board filled with random tiles.
    #[must_use]
    pub fn new(config: WorldConfig) -> Self {
        let mut world = Self::empty(DEFAULT_GRID_ROWS, DEFAULT_GRID_COLUMNS, config);
        let _ = world.fill_empty_cells();
        world
    }

    /// Creates a world from a decoded level layout, filling tile cells randomly.
    #[must_use]
    pub fn from_layout(layout: &LevelLayout, config: WorldConfig) -> Self {
        let mut world = Self::empty(layout.rows(), layout.columns(), config);
        for (index, authored) in layout.cells().iter().enumerate() {
            let coord = world.cells[index].coord();
            if authored.blocked {
                world.cells[index] = Cell::blocked(coord);
                continue;
            }

            let mut cell = Cell::open(coord).with_obstacle(authored.obstacle);
            if authored.holds_tile() {
                let tile = world.new_tile(coord, authored.powerup);
                cell = cell.with_tile(Some(tile));
            }
            world.cells[index] = cell;
        }
        world
    }

    /// Creates a world from rows of color letters.
    ///
    /// Each character is a [`TileColor`] code, `#` for a blocked cell or `_`
    /// for an empty playable cell. Used to build exact boards for puzzles and
    /// deterministic scenarios.
    pub fn from_color_rows<S: AsRef<str>>(
        rows: &[S],
        config: WorldConfig,
    ) -> Result<Self, LayoutError> {
        let decoded = layout::decode_rows(rows, |_, _, code| match code {
            FIXTURE_BLOCKED => Some(FixtureCell::Blocked),
            FIXTURE_EMPTY => Some(FixtureCell::Empty),
            other => TileColor::from_code(other).map(FixtureCell::Tile),
        })?;

        let mut world = Self::empty(decoded.rows, decoded.columns, config);
        for (index, fixture) in decoded.cells.into_iter().enumerate() {
            let coord = world.cells[index].coord();
            world.cells[index] = match fixture {
                FixtureCell::Blocked => Cell::blocked(coord),
                FixtureCell::Empty => Cell::open(coord),
                FixtureCell::Tile(color) => {
                    let tile = world.tile_with_color(coord, color, None);
                    Cell::open(coord).with_tile(Some(tile))
                }
            };
        }
        Ok(world)
    }

    fn empty(rows: u32, columns: u32, config: WorldConfig) -> Self {
        let palette_size = usize::from(
            config
                .palette_size()
                .clamp(MIN_PALETTE_SIZE, TileColor::ALL.len() as u8),
        );
        let mut cells = Vec::new();
        for row in 0..rows {
            for column in 0..columns {
                cells.push(Cell::open(CellCoord::new(row, column)));
            }
        }
        Self {
            banner: WELCOME_BANNER,
            rows,
            columns,
            cells,
            palette: TileColor::ALL[..palette_size].to_vec(),
            rng: ChaCha8Rng::seed_from_u64(config.seed()),
            next_tile_id: 0,
        }
    }

    fn allocate_tile_id(&mut self) -> TileId {
        let id = TileId::new(self.next_tile_id);
        self.next_tile_id = self.next_tile_id.saturating_add(1);
        id
    }

    fn random_color(&mut self) -> TileColor {
        let index = self.rng.gen_range(0..self.palette.len());
        self.palette[index]
    }

    fn random_color_except(&mut self, excluded: TileColor) -> TileColor {
        let candidates: Vec<TileColor> = self
            .palette
            .iter()
            .copied()
            .filter(|color| *color != excluded)
            .collect();
        if candidates.is_empty() {
            return excluded;
        }
        candidates[self.rng.gen_range(0..candidates.len())]
    }

    fn new_tile(&mut self, cell: CellCoord, powerup: Option<PowerupKind>) -> Tile {
        let color = self.random_color();
        self.tile_with_color(cell, color, powerup)
    }

    fn tile_with_color(
        &mut self,
        cell: CellCoord,
        color: TileColor,
        powerup: Option<PowerupKind>,
    ) -> Tile {
        Tile {
            id: self.allocate_tile_id(),
            color,
            cell,
            powerup,
        }
    }

    fn index(&self, coord: CellCoord) -> Option<usize> {
        if coord.row() < self.rows && coord.column() < self.columns {
            let row = usize::try_from(coord.row()).ok()?;
            let column = usize::try_from(coord.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }

    fn cell(&self, coord: CellCoord) -> Option<Cell> {
        self.index(coord).map(|index| self.cells[index])
    }

    fn set_tile(&mut self, coord: CellCoord, tile: Option<Tile>) {
        if let Some(index) = self.index(coord) {
            self.cells[index] = self.cells[index].with_tile(tile);
        }
    }

    fn set_obstacle(&mut self, coord: CellCoord, obstacle: Option<Obstacle>) {
        if let Some(index) = self.index(coord) {
            self.cells[index] = self.cells[index].with_obstacle(obstacle);
        }
    }

    fn swap(&mut self, first: CellCoord, second: CellCoord) -> Result<(), SwapRejection> {
        let (Some(a), Some(b)) = (self.cell(first), self.cell(second)) else {
            return Err(SwapRejection::OutOfBounds);
        };
        if !first.is_adjacent(second) {
            return Err(SwapRejection::NotAdjacent);
        }
        if a.tile().is_none() || b.tile().is_none() {
            return Err(SwapRejection::MissingTile);
        }
        let (Some(first_tile), Some(second_tile)) = (a.movable_tile(), b.movable_tile()) else {
            return Err(SwapRejection::Immovable);
        };

        self.set_tile(first, Some(second_tile));
        self.set_tile(second, Some(first_tile));
        Ok(())
    }

    fn damage_obstacle(&mut self, coord: CellCoord, out_events: &mut Vec<Event>) {
        let Some(obstacle) = self.cell(coord).and_then(|cell| cell.obstacle()) else {
            return;
        };
        let remaining = obstacle.damaged();
        self.set_obstacle(coord, remaining);
        out_events.push(match remaining {
            Some(obstacle) => Event::ObstacleDamaged {
                cell: coord,
                kind: obstacle.kind(),
                remaining_layers: obstacle.layers(),
            },
            None => Event::ObstacleCleared {
                cell: coord,
                kind: obstacle.kind(),
            },
        });
    }

    fn clear(
        &mut self,
        tiles: Vec<CellCoord>,
        hits: Vec<CellCoord>,
        cause: ClearCause,
        out_events: &mut Vec<Event>,
    ) {
        let mut damaged: BTreeSet<CellCoord> = BTreeSet::new();
        let mut obstacle_events = Vec::new();
        let tiles: BTreeSet<CellCoord> = tiles.into_iter().collect();
        let protected: BTreeSet<CellCoord> = tiles
            .iter()
            .copied()
            .filter(|coord| {
                self.cell(*coord)
                    .and_then(|cell| cell.obstacle())
                    .is_some_and(|obstacle| obstacle.kind().protects_tile())
            })
            .collect();

        let hits: BTreeSet<CellCoord> = hits.into_iter().collect();
        for coord in hits {
            if self.cell(coord).and_then(|cell| cell.obstacle()).is_some() {
                self.damage_obstacle(coord, &mut obstacle_events);
                let _ = damaged.insert(coord);
            }
        }

        let mut cleared = Vec::new();
        for coord in tiles {
            let Some(cell) = self.cell(coord) else {
                continue;
            };
            let Some(tile) = cell.tile() else {
                continue;
            };

            if cell.obstacle().is_some() && damaged.insert(coord) {
                self.damage_obstacle(coord, &mut obstacle_events);
            }
            if protected.contains(&coord) {
                continue;
            }

            self.set_tile(coord, None);
            cleared.push(tile);
        }

        for tile in &cleared {
            for neighbor in tile.cell.neighbors(self.rows, self.columns) {
                let takes_damage = self
                    .cell(neighbor)
                    .and_then(|cell| cell.obstacle())
                    .is_some_and(|obstacle| obstacle.kind().takes_adjacent_damage());
                if takes_damage && damaged.insert(neighbor) {
                    self.damage_obstacle(neighbor, &mut obstacle_events);
                }
            }
        }

        if !cleared.is_empty() {
            out_events.push(Event::TilesCleared {
                tiles: cleared,
                cause,
            });
        }
        out_events.extend(obstacle_events);
    }

    fn is_gravity_barrier(cell: &Cell) -> bool {
        !cell.is_playable()
            || cell
                .obstacle()
                .is_some_and(|obstacle| obstacle.kind().locks_tile())
    }

    fn apply_gravity(&mut self) -> Vec<TileMove> {
        let mut moves = Vec::new();
        for column in 0..self.columns {
            let mut write: Option<u32> = None;
            for row in (0..self.rows).rev() {
                let coord = CellCoord::new(row, column);
                let Some(cell) = self.cell(coord) else {
                    continue;
                };
                if Self::is_gravity_barrier(&cell) {
                    write = None;
                    continue;
                }

                match (cell.tile(), write) {
                    (None, None) => write = Some(row),
                    (None, Some(_)) => {}
                    (Some(_), None) => {}
                    (Some(tile), Some(target)) => {
                        let destination = CellCoord::new(target, column);
                        self.set_tile(coord, None);
                        self.set_tile(destination, Some(tile));
                        moves.push(TileMove {
                            tile: tile.id,
                            from: coord,
                            to: destination,
                        });
                        write = Some(target - 1);
                    }
                }
            }
        }
        moves
    }

    fn fill_empty_cells(&mut self) -> Vec<Tile> {
        let mut spawned = Vec::new();
        for index in 0..self.cells.len() {
            let cell = self.cells[index];
            if !cell.is_playable() || cell.tile().is_some() {
                continue;
            }
            let tile = self.new_tile(cell.coord(), None);
            self.cells[index] = cell.with_tile(Some(tile));
            spawned.push(tile);
        }
        spawned
    }

    fn shuffle(&mut self) -> Vec<TileMove> {
        let slots: Vec<usize> = (0..self.cells.len())
            .filter(|index| self.cells[*index].movable_tile().is_some())
            .collect();
        let mut payload: Vec<Tile> = slots
            .iter()
            .filter_map(|index| self.cells[*index].tile())
            .collect();
        payload.shuffle(&mut self.rng);

        let mut moves = Vec::new();
        for (slot, tile) in slots.into_iter().zip(payload) {
            let cell = self.cells[slot];
            if tile.cell != cell.coord() {
                moves.push(TileMove {
                    tile: tile.id,
                    from: tile.cell,
                    to: cell.coord(),
                });
            }
            self.cells[slot] = cell.with_tile(Some(tile));
        }
        moves
    }
}

#[derive(Clone, Copy, Debug)]
enum FixtureCell {
    Blocked,
    Empty,
    Tile(TileColor),
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::SwapTiles { first, second } => match world.swap(first, second) {
            Ok(()) => out_events.push(Event::TilesSwapped { first, second }),
            Err(reason) => out_events.push(Event::SwapRejected {
                first,
                second,
                reason,
            }),
        },
        Command::Clear { tiles, hits, cause } => world.clear(tiles, hits, cause, out_events),
        Command::RemoveObstacle { cell } => {
            if let Some(obstacle) = world.cell(cell).and_then(|current| current.obstacle()) {
                world.set_obstacle(cell, None);
                out_events.push(Event::ObstacleCleared {
                    cell,
                    kind: obstacle.kind(),
                });
            }
        }
        Command::SpawnPowerup { cell, kind, color } => {
            let Some(current) = world.cell(cell) else {
                return;
            };
            if !current.is_playable() || current.tile().is_some_and(|tile| tile.is_powerup()) {
                return;
            }
            let tile = world.tile_with_color(cell, color, Some(kind));
            world.set_tile(cell, Some(tile));
            out_events.push(Event::PowerupCreated {
                tile,
                replaced: current.tile(),
            });
        }
        Command::ApplyGravity => {
            let moves = world.apply_gravity();
            if !moves.is_empty() {
                out_events.push(Event::TilesFell { moves });
            }
        }
        Command::Refill => {
            let tiles = world.fill_empty_cells();
            if !tiles.is_empty() {
                out_events.push(Event::TilesSpawned { tiles });
            }
        }
        Command::ReplaceTile { cell } => {
            let Some(previous) = world.cell(cell).and_then(|current| current.tile()) else {
                return;
            };
            if previous.is_powerup() {
                return;
            }
            let color = world.random_color_except(previous.color);
            let tile = world.tile_with_color(cell, color, None);
            world.set_tile(cell, Some(tile));
            out_events.push(Event::TileReplaced { previous, tile });
        }
        Command::Shuffle => {
            let moves = world.shuffle();
            out_events.push(Event::BoardShuffled { moves });
        }
        Command::PlaceTile {
            cell,
            color,
            powerup,
        } => {
            if !world.cell(cell).is_some_and(|current| current.is_playable()) {
                return;
            }
            let tile = world.tile_with_color(cell, color, powerup);
            world.set_tile(cell, Some(tile));
            out_events.push(Event::TilePlaced { tile });
        }
        Command::PlaceObstacle { cell, obstacle } => {
            if world.cell(cell).map_or(true, |current| current.is_blocked()) {
                return;
            }
            if obstacle.kind().is_solid() {
                world.set_tile(cell, None);
            }
            world.set_obstacle(cell, Some(obstacle));
            out_events.push(Event::ObstaclePlaced { cell, obstacle });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use gemfall_core::{CellCoord, GridView, Tile, TileColor, TileId};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Exposes a read-only view of the cell grid.
    #[must_use]
    pub fn grid_view(world: &World) -> GridView<'_> {
        GridView::new(&world.cells, world.rows, world.columns)
    }

    /// Provides the grid dimensions as `(rows, columns)`.
    #[must_use]
    pub fn dimensions(world: &World) -> (u32, u32) {
        (world.rows, world.columns)
    }

    /// Colors drawn by refills during this session.
    #[must_use]
    pub fn palette(world: &World) -> &[TileColor] {
        &world.palette
    }

    /// Returns the tile held by the cell, if any.
    #[must_use]
    pub fn tile_at(world: &World, cell: CellCoord) -> Option<Tile> {
        world.cell(cell).and_then(|current| current.tile())
    }

    /// Looks up a live tile by identifier.
    #[must_use]
    pub fn tile(world: &World, id: TileId) -> Option<Tile> {
        grid_view(world).tile_by_id(id)
    }

    /// Reports whether every tile's stored coordinates match its containing cell.
    #[must_use]
    pub fn positions_consistent(world: &World) -> bool {
        world
            .cells
            .iter()
            .all(|cell| cell.tile().map_or(true, |tile| tile.cell == cell.coord()))
    }

    /// Counts playable cells that currently hold no tile.
    #[must_use]
    pub fn empty_playable_cells(world: &World) -> usize {
        world
            .cells
            .iter()
            .filter(|cell| cell.is_playable() && cell.tile().is_none())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemfall_core::ObstacleKind;

    fn fixture(rows: &[&str]) -> World {
        World::from_color_rows(rows, WorldConfig::default()).expect("fixture parses")
    }

    fn colors(world: &World) -> Vec<String> {
        let (rows, columns) = query::dimensions(world);
        (0..rows)
            .map(|row| {
                (0..columns)
                    .map(|column| {
                        query::tile_at(world, CellCoord::new(row, column))
                            .map_or('_', |tile| tile.color.code())
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn default_world_is_full() {
        let world = World::new(WorldConfig::default());
        assert_eq!(query::dimensions(&world), (8, 8));
        assert_eq!(query::empty_playable_cells(&world), 0);
        assert!(query::positions_consistent(&world));
        assert_eq!(query::palette(&world).len(), 5);
    }

    #[test]
    fn palette_size_is_clamped() {
        let world = World::new(WorldConfig::new(1, 7));
        assert_eq!(query::palette(&world).len(), 3);
        let world = World::new(WorldConfig::new(40, 7));
        assert_eq!(query::palette(&world).len(), 6);
    }

    #[test]
    fn layout_places_obstacles_and_powerups() {
        let layout = LevelLayout::from_rows(&["X.B", "IH."]).expect("layout");
        let world = World::from_layout(&layout, WorldConfig::default());
        let view = query::grid_view(&world);

        assert!(view.cell(CellCoord::new(0, 0)).expect("cell").is_blocked());
        assert!(view.tile(CellCoord::new(0, 2)).is_none());
        let iced = view.cell(CellCoord::new(1, 0)).expect("cell");
        assert_eq!(iced.obstacle().map(|o| o.kind()), Some(ObstacleKind::Ice));
        assert!(iced.tile().is_some());
        assert_eq!(
            view.tile(CellCoord::new(1, 1)).and_then(|tile| tile.powerup),
            Some(PowerupKind::RocketH)
        );
    }

    #[test]
    fn same_seed_produces_same_board() {
        let layout = LevelLayout::from_rows(&["......"; 6]).expect("layout");
        let first = World::from_layout(&layout, WorldConfig::new(5, 99));
        let second = World::from_layout(&layout, WorldConfig::new(5, 99));
        assert_eq!(colors(&first), colors(&second));
    }

    #[test]
    fn swap_exchanges_tiles_and_updates_coordinates() {
        let mut world = fixture(&["rb", "gy"]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SwapTiles {
                first: CellCoord::new(0, 0),
                second: CellCoord::new(0, 1),
            },
            &mut events,
        );
        assert_eq!(colors(&world), vec!["br", "gy"]);
        assert!(query::positions_consistent(&world));
        assert_eq!(
            events,
            vec![Event::TilesSwapped {
                first: CellCoord::new(0, 0),
                second: CellCoord::new(0, 1),
            }]
        );
    }

    #[test]
    fn swap_rejects_diagonal_and_frozen_tiles() {
        let mut world = fixture(&["rb", "gy"]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SwapTiles {
                first: CellCoord::new(0, 0),
                second: CellCoord::new(1, 1),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::PlaceObstacle {
                cell: CellCoord::new(1, 0),
                obstacle: Obstacle::new(ObstacleKind::Ice, 1),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::SwapTiles {
                first: CellCoord::new(0, 0),
                second: CellCoord::new(1, 0),
            },
            &mut events,
        );

        let reasons: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                Event::SwapRejected { reason, .. } => Some(*reason),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![SwapRejection::NotAdjacent, SwapRejection::Immovable]
        );
        assert_eq!(colors(&world), vec!["rb", "gy"]);
    }

    #[test]
    fn clear_damages_adjacent_obstacles_once() {
        let mut world = fixture(&["rrr", "bgb"]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceObstacle {
                cell: CellCoord::new(1, 1),
                obstacle: Obstacle::new(ObstacleKind::Ice, 2),
            },
            &mut events,
        );
        events.clear();

        apply(
            &mut world,
            Command::Clear {
                tiles: vec![
                    CellCoord::new(0, 0),
                    CellCoord::new(0, 1),
                    CellCoord::new(0, 2),
                ],
                hits: Vec::new(),
                cause: ClearCause::Match,
            },
            &mut events,
        );

        let damage: Vec<_> = events
            .iter()
            .filter(|event| matches!(event, Event::ObstacleDamaged { .. }))
            .collect();
        assert_eq!(damage.len(), 1, "ice adjacent to three cleared tiles loses one layer");
        assert!(matches!(
            damage[0],
            Event::ObstacleDamaged {
                remaining_layers: 1,
                kind: ObstacleKind::Ice,
                ..
            }
        ));
    }

    #[test]
    fn protected_tiles_survive_clears() {
        let mut world = fixture(&["rb"]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceObstacle {
                cell: CellCoord::new(0, 0),
                obstacle: Obstacle::new(ObstacleKind::Chain, 1),
            },
            &mut events,
        );
        events.clear();

        apply(
            &mut world,
            Command::Clear {
                tiles: vec![CellCoord::new(0, 0)],
                hits: vec![CellCoord::new(0, 0)],
                cause: ClearCause::Powerup,
            },
            &mut events,
        );

        assert!(query::tile_at(&world, CellCoord::new(0, 0)).is_some());
        assert_eq!(
            events,
            vec![Event::ObstacleCleared {
                cell: CellCoord::new(0, 0),
                kind: ObstacleKind::Chain,
            }]
        );
    }

    #[test]
    fn grass_clears_with_its_tile() {
        let mut world = fixture(&["r"]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceObstacle {
                cell: CellCoord::new(0, 0),
                obstacle: Obstacle::new(ObstacleKind::Grass, 1),
            },
            &mut events,
        );
        events.clear();
        apply(
            &mut world,
            Command::Clear {
                tiles: vec![CellCoord::new(0, 0)],
                hits: Vec::new(),
                cause: ClearCause::Match,
            },
            &mut events,
        );
        assert!(events.contains(&Event::ObstacleCleared {
            cell: CellCoord::new(0, 0),
            kind: ObstacleKind::Grass,
        }));
        assert!(query::tile_at(&world, CellCoord::new(0, 0)).is_none());
    }

    #[test]
    fn gravity_compacts_preserving_order_and_respects_barriers() {
        let mut world = fixture(&["r_", "b#", "_g", "y_"]);
        let mut events = Vec::new();
        apply(&mut world, Command::ApplyGravity, &mut events);
        assert_eq!(colors(&world), vec!["__", "r_", "b_", "yg"]);
        assert!(query::positions_consistent(&world));
        match events.as_slice() {
            [Event::TilesFell { moves }] => assert_eq!(moves.len(), 3),
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn refill_fills_every_playable_cell() {
        let mut world = fixture(&["_#", "__"]);
        let mut events = Vec::new();
        apply(&mut world, Command::Refill, &mut events);
        assert_eq!(query::empty_playable_cells(&world), 0);
        match events.as_slice() {
            [Event::TilesSpawned { tiles }] => assert_eq!(tiles.len(), 3),
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn replace_tile_changes_color_and_id() {
        let mut world = fixture(&["r"]);
        let before = query::tile_at(&world, CellCoord::new(0, 0)).expect("tile");
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ReplaceTile {
                cell: CellCoord::new(0, 0),
            },
            &mut events,
        );
        let after = query::tile_at(&world, CellCoord::new(0, 0)).expect("tile");
        assert_ne!(before.id, after.id);
        assert_ne!(before.color, after.color);
    }

    #[test]
    fn shuffle_preserves_tile_multiset() {
        let mut world = fixture(&["rrbb", "ggyy", "rbgy"]);
        let mut before: Vec<_> = query::grid_view(&world).tiles().map(|t| t.id).collect();
        let mut events = Vec::new();
        apply(&mut world, Command::Shuffle, &mut events);
        let mut after: Vec<_> = query::grid_view(&world).tiles().map(|t| t.id).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
        assert!(query::positions_consistent(&world));
    }

    #[test]
    fn spawn_powerup_never_overwrites_powerups() {
        let mut world = fixture(&["r"]);
        let mut events = Vec::new();
        let spawn = Command::SpawnPowerup {
            cell: CellCoord::new(0, 0),
            kind: PowerupKind::Bomb,
            color: TileColor::Red,
        };
        apply(&mut world, spawn.clone(), &mut events);
        apply(&mut world, spawn, &mut events);
        let created = events
            .iter()
            .filter(|event| matches!(event, Event::PowerupCreated { .. }))
            .count();
        assert_eq!(created, 1);
    }
}
