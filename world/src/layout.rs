//! Decoding of the row-major single-character level layout format.

use gemfall_core::{Obstacle, ObstacleKind, PowerupKind};
use thiserror::Error;

/// Description of a single cell as authored in a level layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutCell {
    /// Whether the cell is permanently blocked.
    pub blocked: bool,
    /// Obstacle pre-placed in the cell.
    pub obstacle: Option<Obstacle>,
    /// Power-up pre-placed in the cell.
    pub powerup: Option<PowerupKind>,
}

impl LayoutCell {
    const TILE: Self = Self {
        blocked: false,
        obstacle: None,
        powerup: None,
    };

    const BLOCKED: Self = Self {
        blocked: true,
        obstacle: None,
        powerup: None,
    };

    const fn obstacle(kind: ObstacleKind, layers: u8) -> Self {
        Self {
            blocked: false,
            obstacle: Some(Obstacle::new(kind, layers)),
            powerup: None,
        }
    }

    const fn powerup(kind: PowerupKind) -> Self {
        Self {
            blocked: false,
            obstacle: None,
            powerup: Some(kind),
        }
    }

    /// Decodes a single layout character.
    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        let cell = match code {
            '.' => Self::TILE,
            'X' | 'S' => Self::BLOCKED,
            'I' => Self::obstacle(ObstacleKind::Ice, 1),
            'D' => Self::obstacle(ObstacleKind::Ice, 2),
            'G' => Self::obstacle(ObstacleKind::Grass, 1),
            'B' => Self::obstacle(ObstacleKind::Box, 1),
            'C' => Self::obstacle(ObstacleKind::Chain, 1),
            'O' => Self::obstacle(ObstacleKind::Stone, 1),
            'K' => Self::obstacle(ObstacleKind::Barrel, 1),
            'U' => Self::obstacle(ObstacleKind::IceBucket, 1),
            'H' => Self::powerup(PowerupKind::RocketH),
            'V' => Self::powerup(PowerupKind::RocketV),
            'R' => Self::powerup(PowerupKind::ColorBomb),
            'T' => Self::powerup(PowerupKind::Bomb),
            'P' => Self::powerup(PowerupKind::Propeller),
            _ => return None,
        };
        Some(cell)
    }

    /// Reports whether the cell starts out holding a tile.
    #[must_use]
    pub fn holds_tile(&self) -> bool {
        !self.blocked
            && !self
                .obstacle
                .is_some_and(|obstacle| obstacle.kind().is_solid())
    }
}

/// Errors that can occur while decoding a level layout.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The layout contained no rows.
    #[error("level layout is empty")]
    Empty,
    /// A row's width differs from the first row.
    #[error("layout row {row} has {found} cells but {expected} were expected")]
    RaggedRow {
        /// Zero-based index of the offending row.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A character did not map to any known cell code.
    #[error("unknown layout code '{code}' at row {row}, column {column}")]
    UnknownCode {
        /// Zero-based row of the character.
        row: usize,
        /// Zero-based column of the character.
        column: usize,
        /// The unrecognised character.
        code: char,
    },
}

/// Decoded rectangular level layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelLayout {
    rows: u32,
    columns: u32,
    cells: Vec<LayoutCell>,
}

impl LevelLayout {
    /// Parses a multi-line layout; blank lines are ignored and rows are trimmed.
    pub fn parse(source: &str) -> Result<Self, LayoutError> {
        let rows: Vec<&str> = source
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        Self::from_rows(&rows)
    }

    /// Decodes a layout from individual row strings.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, LayoutError> {
        let grid = decode_rows(rows, |_, _, code| LayoutCell::from_code(code))?;
        Ok(Self {
            rows: grid.rows,
            columns: grid.columns,
            cells: grid.cells,
        })
    }

    /// Number of rows in the layout.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns in the layout.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Layout cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[LayoutCell] {
        &self.cells
    }
}

pub(crate) struct DecodedRows<T> {
    pub(crate) rows: u32,
    pub(crate) columns: u32,
    pub(crate) cells: Vec<T>,
}

/// Shared row-major decoder used by the level layout and the color fixture format.
pub(crate) fn decode_rows<S, T, F>(rows: &[S], mut decode: F) -> Result<DecodedRows<T>, LayoutError>
where
    S: AsRef<str>,
    F: FnMut(usize, usize, char) -> Option<T>,
{
    let first = rows.first().ok_or(LayoutError::Empty)?;
    let expected = first.as_ref().trim().chars().count();
    if expected == 0 {
        return Err(LayoutError::Empty);
    }

    let mut cells = Vec::with_capacity(expected * rows.len());
    for (row, line) in rows.iter().enumerate() {
        let line = line.as_ref().trim();
        let found = line.chars().count();
        if found != expected {
            return Err(LayoutError::RaggedRow {
                row,
                expected,
                found,
            });
        }
        for (column, code) in line.chars().enumerate() {
            let cell = decode(row, column, code).ok_or(LayoutError::UnknownCode {
                row,
                column,
                code,
            })?;
            cells.push(cell);
        }
    }

    Ok(DecodedRows {
        rows: u32::try_from(rows.len()).unwrap_or(u32::MAX),
        columns: u32::try_from(expected).unwrap_or(u32::MAX),
        cells,
    })
}
