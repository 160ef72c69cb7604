#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Gemfall match engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Resolvers submit [`Command`] values
//! describing desired grid mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values that
//! presentation, scoring and objective layers react to. Systems read the grid
//! exclusively through the immutable [`GridView`] snapshot.

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Gemfall.";

/// Minimum run length that counts as a match.
pub const MIN_MATCH: usize = 3;

/// Run length that produces a rocket when found on a single line.
pub const ROCKET_MATCH: usize = 4;

/// Run length that produces a color bomb.
pub const COLOR_BOMB_MATCH: usize = 5;

/// Upper bound on match-removal passes when stabilising a freshly generated board.
pub const STABILIZE_ITERATION_CAP: u32 = 100;

/// Fixed-point scale used for multipliers expressed in basis points.
pub const BASIS_POINTS: u32 = 10_000;

/// Multiplier applied per cascade level beyond the first, in basis points.
pub const CASCADE_MULTIPLIER_BPS: u32 = 15_000;

/// Commands that express all permissible grid mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Exchanges the tiles held by two orthogonally adjacent cells.
    SwapTiles {
        /// Cell the player dragged from.
        first: CellCoord,
        /// Cell the player dragged onto.
        second: CellCoord,
    },
    /// Removes tiles and damages obstacles for a single clearing step.
    Clear {
        /// Cells whose tiles should be removed.
        tiles: Vec<CellCoord>,
        /// Cells struck directly by a power-up; their obstacles lose a layer.
        hits: Vec<CellCoord>,
        /// Reason the clear was requested.
        cause: ClearCause,
    },
    /// Removes every layer of the obstacle occupying the cell.
    RemoveObstacle {
        /// Cell whose obstacle should be destroyed.
        cell: CellCoord,
    },
    /// Places a freshly created power-up tile into the cell.
    SpawnPowerup {
        /// Destination cell for the power-up.
        cell: CellCoord,
        /// Kind of power-up to create.
        kind: PowerupKind,
        /// Color inherited from the tiles that produced the power-up.
        color: TileColor,
    },
    /// Compacts surviving tiles downward within every column.
    ApplyGravity,
    /// Fills every empty playable cell with a random tile from the palette.
    Refill,
    /// Replaces a regular tile with a freshly generated one of another color.
    ReplaceTile {
        /// Cell holding the tile to replace.
        cell: CellCoord,
    },
    /// Randomly permutes every movable tile on the board.
    Shuffle,
    /// Places a specific tile into the cell, replacing any existing tile.
    PlaceTile {
        /// Destination cell.
        cell: CellCoord,
        /// Color assigned to the new tile.
        color: TileColor,
        /// Optional power-up carried by the new tile.
        powerup: Option<PowerupKind>,
    },
    /// Places an obstacle into the cell.
    PlaceObstacle {
        /// Destination cell.
        cell: CellCoord,
        /// Obstacle to install.
        obstacle: Obstacle,
    },
}

/// Events broadcast by the world and systems after processing commands.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Confirms that two tiles exchanged cells.
    TilesSwapped {
        /// Cell the player dragged from.
        first: CellCoord,
        /// Cell the player dragged onto.
        second: CellCoord,
    },
    /// Reports that a swap request was rejected by the world.
    SwapRejected {
        /// Cell the player dragged from.
        first: CellCoord,
        /// Cell the player dragged onto.
        second: CellCoord,
        /// Specific reason the swap failed.
        reason: SwapRejection,
    },
    /// Announces that a swap produced nothing and was undone.
    SwapReverted {
        /// Cell the player dragged from.
        first: CellCoord,
        /// Cell the player dragged onto.
        second: CellCoord,
    },
    /// Announces a new detection pass within the current move.
    CascadeLevel {
        /// One-based index of the detection pass.
        level: u32,
        /// Score multiplier applied to this pass, in basis points.
        multiplier_bps: u32,
    },
    /// Lists the matches detected by a single pass.
    MatchFound {
        /// Matches in priority order (line matches before squares).
        matches: Vec<Match>,
    },
    /// Reports that two power-ups were swapped into each other.
    PowerupsCombined {
        /// Power-up the player dragged.
        first: Tile,
        /// Power-up that was dragged onto.
        second: Tile,
        /// Cell where the combined effect originates.
        cell: CellCoord,
    },
    /// Reports a single power-up activation within a chain.
    PowerupActivated {
        /// Power-up tile that fired.
        tile: Tile,
        /// Destination chosen by targeting power-ups, if any.
        target: Option<CellCoord>,
        /// Zero-based breadth-first wave index of the activation.
        wave: u32,
        /// Cells affected by the activation.
        cells: Vec<CellCoord>,
    },
    /// Confirms that a power-up tile was created.
    PowerupCreated {
        /// Tile carrying the new power-up.
        tile: Tile,
        /// Regular tile that was displaced, if the cell was occupied.
        replaced: Option<Tile>,
    },
    /// Confirms that tiles were removed from the grid.
    TilesCleared {
        /// Removed tiles, ordered row-major by their former cell.
        tiles: Vec<Tile>,
        /// Reason the tiles were cleared.
        cause: ClearCause,
    },
    /// Reports that an obstacle lost a layer but survives.
    ObstacleDamaged {
        /// Cell holding the obstacle.
        cell: CellCoord,
        /// Kind of the damaged obstacle.
        kind: ObstacleKind,
        /// Layers left after the damage.
        remaining_layers: u8,
    },
    /// Reports that an obstacle was destroyed.
    ObstacleCleared {
        /// Cell that held the obstacle.
        cell: CellCoord,
        /// Kind of the destroyed obstacle.
        kind: ObstacleKind,
    },
    /// Confirms that an obstacle was installed.
    ObstaclePlaced {
        /// Cell holding the obstacle.
        cell: CellCoord,
        /// Installed obstacle.
        obstacle: Obstacle,
    },
    /// Reports tiles that moved downward during gravity compaction.
    TilesFell {
        /// Individual tile movements in column-major order.
        moves: Vec<TileMove>,
    },
    /// Reports tiles generated to fill empty cells.
    TilesSpawned {
        /// Newly generated tiles.
        tiles: Vec<Tile>,
    },
    /// Reports that a regular tile was replaced while stabilising the board.
    TileReplaced {
        /// Tile that was removed.
        previous: Tile,
        /// Tile that took its place.
        tile: Tile,
    },
    /// Confirms that a specific tile was placed.
    TilePlaced {
        /// Tile that was placed.
        tile: Tile,
    },
    /// Reports that the board was shuffled.
    BoardShuffled {
        /// Tile movements caused by the shuffle.
        moves: Vec<TileMove>,
    },
    /// Reports that a booster was applied.
    BoosterApplied {
        /// Booster that was used.
        kind: BoosterKind,
        /// Targeted cell, if the booster needs one.
        target: Option<CellCoord>,
    },
    /// Announces that a player action resolved to a stable board.
    MoveCompleted {
        /// Number of match detection passes that found matches.
        cascades: u32,
        /// Whether the action consumes one of the level's moves.
        consumes_move: bool,
    },
    /// Reports a change in the running score.
    ScoreChanged {
        /// Score after the change.
        score: u64,
        /// Points added by the change.
        delta: u64,
    },
    /// Reports progress toward an obstacle objective.
    ObjectiveProgress {
        /// Obstacle kind tracked by the objective.
        kind: ObstacleKind,
        /// Obstacles of this kind destroyed so far.
        cleared: u32,
        /// Obstacles of this kind required to satisfy the objective.
        required: u32,
    },
    /// Announces that the level session ended.
    LevelFinished {
        /// Whether the player won or lost.
        outcome: LevelOutcome,
        /// Final score.
        score: u64,
    },
}

/// Reasons a tile clear was requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClearCause {
    /// Tiles belonged to detected matches.
    Match,
    /// Tiles were caught in power-up activations.
    Powerup,
    /// Tiles were removed by a booster.
    Booster,
}

/// Reasons a swap request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapRejection {
    /// One of the cells lies outside the grid.
    OutOfBounds,
    /// The cells are not orthogonal neighbours.
    NotAdjacent,
    /// One of the cells holds no tile.
    MissingTile,
    /// One of the tiles is frozen or locked by an obstacle.
    Immovable,
}

/// Outcome of a finished level session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelOutcome {
    /// Every objective was met before moves ran out.
    Won,
    /// Moves ran out with objectives outstanding.
    Lost,
}

/// Player-applied boosters that bypass the swap rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoosterKind {
    /// Clears the target cell's tile and destroys its obstacle.
    Hammer,
    /// Reshuffles the board.
    Shuffle,
    /// Places and immediately activates a power-up at the target cell.
    Powerup(PowerupKind),
}

impl BoosterKind {
    /// Reports whether the booster requires a target cell.
    #[must_use]
    pub const fn needs_target(self) -> bool {
        !matches!(self, Self::Shuffle)
    }
}

/// Unique identifier assigned to a tile for its whole lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(u32);

impl TileId {
    /// Creates a new tile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as row and column coordinates.
///
/// Ordering is row-major, which is the canonical iteration order used by
/// every system that needs determinism.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    row: u32,
    column: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the cell, growing downward.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the cell, growing rightward.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.row.abs_diff(other.row) + self.column.abs_diff(other.column)
    }

    /// Computes the Chebyshev (king-move) distance between two cell coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.row
            .abs_diff(other.row)
            .max(self.column.abs_diff(other.column))
    }

    /// Reports whether the cells are orthogonal neighbours.
    #[must_use]
    pub fn is_adjacent(self, other: CellCoord) -> bool {
        self.manhattan_distance(other) == 1
    }

    /// Returns the orthogonal neighbours of the cell that lie within `rows` x `columns`.
    pub fn neighbors(self, rows: u32, columns: u32) -> impl Iterator<Item = CellCoord> {
        let up = self.row.checked_sub(1).map(|row| CellCoord::new(row, self.column));
        let down = (self.row + 1 < rows).then(|| CellCoord::new(self.row + 1, self.column));
        let left = self
            .column
            .checked_sub(1)
            .map(|column| CellCoord::new(self.row, column));
        let right =
            (self.column + 1 < columns).then(|| CellCoord::new(self.row, self.column + 1));
        [up, down, left, right].into_iter().flatten()
    }
}

/// Color class of a regular tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileColor {
    /// Red tile.
    Red,
    /// Blue tile.
    Blue,
    /// Green tile.
    Green,
    /// Yellow tile.
    Yellow,
    /// Purple tile.
    Purple,
    /// Orange tile.
    Orange,
}

impl TileColor {
    /// Every color in palette order; a level uses a prefix of this list.
    pub const ALL: [TileColor; 6] = [
        Self::Red,
        Self::Blue,
        Self::Green,
        Self::Yellow,
        Self::Purple,
        Self::Orange,
    ];

    /// Single-letter code used by text fixtures and the CLI board dump.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Red => 'r',
            Self::Blue => 'b',
            Self::Green => 'g',
            Self::Yellow => 'y',
            Self::Purple => 'p',
            Self::Orange => 'o',
        }
    }

    /// Parses a single-letter color code, ignoring case.
    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|color| color.code() == code.to_ascii_lowercase())
    }
}

/// Kinds of power-up a match can produce.
///
/// The declaration order defines the canonical ordering used to build
/// combination keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PowerupKind {
    /// Clears the whole row.
    RocketH,
    /// Clears the whole column.
    RocketV,
    /// Clears a square area around its cell.
    Bomb,
    /// Clears every tile of one color.
    ColorBomb,
    /// Flies to a target cell and clears a small area there.
    Propeller,
}

impl PowerupKind {
    /// Reports whether the power-up is one of the two rockets.
    #[must_use]
    pub const fn is_rocket(self) -> bool {
        matches!(self, Self::RocketH | Self::RocketV)
    }
}

/// A tile occupying a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    /// Identifier that stays stable for the tile's whole life.
    pub id: TileId,
    /// Color class of the tile.
    pub color: TileColor,
    /// Cell currently holding the tile.
    pub cell: CellCoord,
    /// Power-up carried by the tile, if any.
    pub powerup: Option<PowerupKind>,
}

impl Tile {
    /// Reports whether the tile carries a power-up.
    #[must_use]
    pub const fn is_powerup(&self) -> bool {
        self.powerup.is_some()
    }

    /// Row of the cell holding the tile.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.cell.row()
    }

    /// Column of the cell holding the tile.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.cell.column()
    }
}

/// Board features that layer over or occupy cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    /// Floor layer under a free tile, cleared when that tile is cleared.
    Grass,
    /// Frozen cover that keeps its tile from matching or moving.
    Ice,
    /// Lock that keeps its tile from moving; clears on the tile hit the chain instead.
    Chain,
    /// Solid crate.
    Box,
    /// Solid block that only power-ups can damage.
    Stone,
    /// Solid barrel.
    Barrel,
    /// Solid bucket of ice.
    IceBucket,
}

impl ObstacleKind {
    /// Every obstacle kind in declaration order.
    pub const ALL: [ObstacleKind; 7] = [
        Self::Grass,
        Self::Ice,
        Self::Chain,
        Self::Box,
        Self::Stone,
        Self::Barrel,
        Self::IceBucket,
    ];

    /// Reports whether the obstacle fills the whole cell, leaving no room for a tile.
    #[must_use]
    pub const fn is_solid(self) -> bool {
        matches!(self, Self::Box | Self::Stone | Self::Barrel | Self::IceBucket)
    }

    /// Reports whether a tile under the obstacle is excluded from match detection.
    #[must_use]
    pub const fn blocks_matching(self) -> bool {
        matches!(self, Self::Ice)
    }

    /// Reports whether a tile under the obstacle is pinned in place.
    #[must_use]
    pub const fn locks_tile(self) -> bool {
        matches!(self, Self::Ice | Self::Chain)
    }

    /// Reports whether clearing the tile damages the obstacle instead of removing the tile.
    #[must_use]
    pub const fn protects_tile(self) -> bool {
        self.locks_tile()
    }

    /// Reports whether clearing a neighbouring tile damages the obstacle.
    #[must_use]
    pub const fn takes_adjacent_damage(self) -> bool {
        !matches!(self, Self::Grass | Self::Stone)
    }

    /// Stable snake-case name used by level files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Grass => "grass",
            Self::Ice => "ice",
            Self::Chain => "chain",
            Self::Box => "box",
            Self::Stone => "stone",
            Self::Barrel => "barrel",
            Self::IceBucket => "ice_bucket",
        }
    }

    /// Parses the snake-case name produced by [`ObstacleKind::name`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// An obstacle with a number of remaining layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Obstacle {
    kind: ObstacleKind,
    layers: u8,
}

impl Obstacle {
    /// Creates an obstacle; a zero layer count is raised to one.
    #[must_use]
    pub const fn new(kind: ObstacleKind, layers: u8) -> Self {
        let layers = if layers == 0 { 1 } else { layers };
        Self { kind, layers }
    }

    /// Kind of the obstacle.
    #[must_use]
    pub const fn kind(&self) -> ObstacleKind {
        self.kind
    }

    /// Layers left before the obstacle is destroyed.
    #[must_use]
    pub const fn layers(&self) -> u8 {
        self.layers
    }

    /// Removes one layer, returning `None` when the obstacle is destroyed.
    #[must_use]
    pub const fn damaged(self) -> Option<Self> {
        if self.layers <= 1 {
            None
        } else {
            Some(Self {
                kind: self.kind,
                layers: self.layers - 1,
            })
        }
    }
}

/// State of a single grid cell.
///
/// Cells are value types: the world replaces them wholesale through the
/// `with_*` builders rather than exposing field mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    coord: CellCoord,
    blocked: bool,
    obstacle: Option<Obstacle>,
    tile: Option<Tile>,
}

impl Cell {
    /// Creates an empty playable cell.
    #[must_use]
    pub const fn open(coord: CellCoord) -> Self {
        Self {
            coord,
            blocked: false,
            obstacle: None,
            tile: None,
        }
    }

    /// Creates a blocked cell that never holds a tile.
    #[must_use]
    pub const fn blocked(coord: CellCoord) -> Self {
        Self {
            coord,
            blocked: true,
            obstacle: None,
            tile: None,
        }
    }

    /// Returns the cell holding the provided tile, with its coordinates rewritten.
    #[must_use]
    pub fn with_tile(self, tile: Option<Tile>) -> Self {
        let tile = tile.map(|tile| Tile {
            cell: self.coord,
            ..tile
        });
        Self { tile, ..self }
    }

    /// Returns the cell holding the provided obstacle.
    #[must_use]
    pub const fn with_obstacle(self, obstacle: Option<Obstacle>) -> Self {
        Self { obstacle, ..self }
    }

    /// Fixed coordinates of the cell.
    #[must_use]
    pub const fn coord(&self) -> CellCoord {
        self.coord
    }

    /// Reports whether the cell is permanently blocked.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Obstacle layered over or occupying the cell.
    #[must_use]
    pub const fn obstacle(&self) -> Option<Obstacle> {
        self.obstacle
    }

    /// Tile held by the cell.
    #[must_use]
    pub const fn tile(&self) -> Option<Tile> {
        self.tile
    }

    /// Reports whether a tile may ever rest in this cell.
    #[must_use]
    pub fn is_playable(&self) -> bool {
        !self.blocked && !self.obstacle.is_some_and(|obstacle| obstacle.kind().is_solid())
    }

    /// Returns the held tile when it may take part in a line or square match.
    #[must_use]
    pub fn matchable_tile(&self) -> Option<Tile> {
        if self
            .obstacle
            .is_some_and(|obstacle| obstacle.kind().blocks_matching())
        {
            return None;
        }
        self.tile.filter(|tile| !tile.is_powerup())
    }

    /// Returns the held tile when it may be swapped or fall.
    #[must_use]
    pub fn movable_tile(&self) -> Option<Tile> {
        if self
            .obstacle
            .is_some_and(|obstacle| obstacle.kind().locks_tile())
        {
            return None;
        }
        self.tile
    }
}

/// Read-only view into the dense cell grid.
#[derive(Clone, Copy, Debug)]
pub struct GridView<'a> {
    cells: &'a [Cell],
    rows: u32,
    columns: u32,
}

impl<'a> GridView<'a> {
    /// Captures a new grid view backed by the provided row-major cell slice.
    #[must_use]
    pub fn new(cells: &'a [Cell], rows: u32, columns: u32) -> Self {
        Self {
            cells,
            rows,
            columns,
        }
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub const fn contains(&self, coord: CellCoord) -> bool {
        coord.row() < self.rows && coord.column() < self.columns
    }

    /// Returns the cell at the provided coordinate, if inside the grid.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&'a Cell> {
        self.index(coord).and_then(|index| self.cells.get(index))
    }

    /// Returns the tile at the provided coordinate, if any.
    #[must_use]
    pub fn tile(&self, coord: CellCoord) -> Option<Tile> {
        self.cell(coord).and_then(Cell::tile)
    }

    /// Returns the tile at the coordinate when it may take part in a match.
    #[must_use]
    pub fn matchable_tile(&self, coord: CellCoord) -> Option<Tile> {
        self.cell(coord).and_then(Cell::matchable_tile)
    }

    /// Looks up a tile by identifier.
    #[must_use]
    pub fn tile_by_id(&self, id: TileId) -> Option<Tile> {
        self.tiles().find(|tile| tile.id == id)
    }

    /// Iterator over every cell in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Cell> + 'a {
        self.cells.iter()
    }

    /// Iterator over every tile in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + 'a {
        self.cells.iter().filter_map(Cell::tile)
    }

    /// Exposes the backing cell slice.
    #[must_use]
    pub const fn cells(&self) -> &'a [Cell] {
        self.cells
    }

    fn index(&self, coord: CellCoord) -> Option<usize> {
        if self.contains(coord) {
            let row = usize::try_from(coord.row()).ok()?;
            let column = usize::try_from(coord.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Shape classification of a detected match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchShape {
    /// Straight horizontal run, also used as the default tag.
    Horizontal,
    /// Straight vertical run.
    Vertical,
    /// 2x2 block.
    Square,
    /// Two lines meeting at their ends.
    L,
    /// Two lines where one meets the other away from its ends.
    T,
}

/// Power-up a match produces and where it is placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PowerupSpawn {
    /// Kind of power-up created.
    pub kind: PowerupKind,
    /// Cell where the power-up appears.
    pub cell: CellCoord,
}

/// A detected group of same-colored tiles eligible for clearing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Match {
    /// Unique tiles in the match, ordered row-major by cell.
    pub tiles: Vec<Tile>,
    /// Shape classification.
    pub shape: MatchShape,
    /// Power-up produced by the match, if the shape qualifies.
    pub powerup: Option<PowerupSpawn>,
}

impl Match {
    /// Number of tiles in the match.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Reports whether the match holds no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Color shared by the match's tiles.
    #[must_use]
    pub fn color(&self) -> Option<TileColor> {
        self.tiles.first().map(|tile| tile.color)
    }

    /// Reports whether the match contains the tile.
    #[must_use]
    pub fn contains(&self, id: TileId) -> bool {
        self.tiles.iter().any(|tile| tile.id == id)
    }

    /// Cells covered by the match.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.tiles.iter().map(|tile| tile.cell)
    }
}

/// Movement of a single tile between two cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileMove {
    /// Tile that moved.
    pub tile: TileId,
    /// Cell the tile left.
    pub from: CellCoord,
    /// Cell the tile entered.
    pub to: CellCoord,
}
