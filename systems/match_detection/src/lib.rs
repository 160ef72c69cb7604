#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that detects and classifies matches from grid snapshots.

use std::collections::{BTreeMap, BTreeSet};

use gemfall_core::{
    CellCoord, GridView, Match, MatchShape, PowerupKind, PowerupSpawn, Tile, TileColor, TileId,
    COLOR_BOMB_MATCH, MIN_MATCH, ROCKET_MATCH,
};

/// Match detector that reuses scratch buffers across detection passes.
#[derive(Debug, Default)]
pub struct MatchDetector {
    runs: Vec<Vec<Tile>>,
    parents: Vec<usize>,
    claimed: BTreeSet<TileId>,
}

impl MatchDetector {
    /// Creates a new match detector with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans the grid and returns every match, line and merged matches first.
    ///
    /// Every tile belongs to at most one returned match. Power-ups and tiles
    /// frozen under obstacles never participate.
    pub fn find_all_matches(&mut self, view: &GridView<'_>) -> Vec<Match> {
        self.collect_runs(view);
        let groups = self.merge_runs();

        self.claimed.clear();
        let mut matches = Vec::with_capacity(groups.len());
        for tiles in groups {
            self.claimed.extend(tiles.iter().map(|tile| tile.id));
            matches.push(classify(&tiles));
        }

        self.collect_squares(view, &mut matches);
        matches
    }

    /// Finds the first swap, row-major and rightward before downward, that
    /// would produce a match or trigger a power-up.
    #[must_use]
    pub fn find_possible_move(&self, view: &GridView<'_>) -> Option<(CellCoord, CellCoord)> {
        for row in 0..view.rows() {
            for column in 0..view.columns() {
                let first = CellCoord::new(row, column);
                let candidates = [
                    CellCoord::new(row, column + 1),
                    CellCoord::new(row + 1, column),
                ];
                for second in candidates {
                    if swap_is_productive(view, first, second) {
                        return Some((first, second));
                    }
                }
            }
        }
        None
    }

    fn collect_runs(&mut self, view: &GridView<'_>) {
        self.runs.clear();

        for row in 0..view.rows() {
            let mut run: Vec<Tile> = Vec::new();
            for column in 0..view.columns() {
                let tile = view.matchable_tile(CellCoord::new(row, column));
                self.extend_run(&mut run, tile);
            }
            self.close_run(&mut run);
        }

        for column in 0..view.columns() {
            let mut run: Vec<Tile> = Vec::new();
            for row in 0..view.rows() {
                let tile = view.matchable_tile(CellCoord::new(row, column));
                self.extend_run(&mut run, tile);
            }
            self.close_run(&mut run);
        }
    }

    fn extend_run(&mut self, run: &mut Vec<Tile>, tile: Option<Tile>) {
        match tile {
            Some(tile) if run.last().is_some_and(|last| last.color == tile.color) => {
                run.push(tile);
            }
            Some(tile) => {
                self.close_run(run);
                run.push(tile);
            }
            None => self.close_run(run),
        }
    }

    fn close_run(&mut self, run: &mut Vec<Tile>) {
        if run.len() >= MIN_MATCH {
            self.runs.push(std::mem::take(run));
        } else {
            run.clear();
        }
    }

    /// Merges runs sharing a tile, transitively, into disjoint tile sets.
    fn merge_runs(&mut self) -> Vec<Vec<Tile>> {
        self.parents.clear();
        self.parents.extend(0..self.runs.len());

        let mut owners: BTreeMap<TileId, usize> = BTreeMap::new();
        for index in 0..self.runs.len() {
            for position in 0..self.runs[index].len() {
                let id = self.runs[index][position].id;
                match owners.get(&id) {
                    Some(&owner) => self.union(owner, index),
                    None => {
                        let _ = owners.insert(id, index);
                    }
                }
            }
        }

        let mut groups: BTreeMap<usize, BTreeMap<CellCoord, Tile>> = BTreeMap::new();
        for index in 0..self.runs.len() {
            let root = self.find(index);
            let group = groups.entry(root).or_default();
            for tile in &self.runs[index] {
                let _ = group.insert(tile.cell, *tile);
            }
        }

        groups
            .into_values()
            .map(|tiles| tiles.into_values().collect())
            .collect()
    }

    fn find(&mut self, index: usize) -> usize {
        let mut root = index;
        while self.parents[root] != root {
            root = self.parents[root];
        }
        let mut current = index;
        while self.parents[current] != root {
            let next = self.parents[current];
            self.parents[current] = root;
            current = next;
        }
        root
    }

    fn union(&mut self, first: usize, second: usize) {
        let first = self.find(first);
        let second = self.find(second);
        if first != second {
            let (low, high) = (first.min(second), first.max(second));
            self.parents[high] = low;
        }
    }

    fn collect_squares(&mut self, view: &GridView<'_>, out: &mut Vec<Match>) {
        if view.rows() < 2 || view.columns() < 2 {
            return;
        }

        for row in 0..view.rows() - 1 {
            for column in 0..view.columns() - 1 {
                let origin = CellCoord::new(row, column);
                let block = [
                    origin,
                    CellCoord::new(row, column + 1),
                    CellCoord::new(row + 1, column),
                    CellCoord::new(row + 1, column + 1),
                ];
                let tiles: Vec<Tile> = block
                    .iter()
                    .filter_map(|coord| view.matchable_tile(*coord))
                    .collect();
                if tiles.len() != block.len() {
                    continue;
                }
                if tiles.iter().any(|tile| tile.color != tiles[0].color) {
                    continue;
                }
                if tiles.iter().any(|tile| self.claimed.contains(&tile.id)) {
                    continue;
                }

                self.claimed.extend(tiles.iter().map(|tile| tile.id));
                out.push(Match {
                    tiles,
                    shape: MatchShape::Square,
                    powerup: Some(PowerupSpawn {
                        kind: PowerupKind::Propeller,
                        cell: origin,
                    }),
                });
            }
        }
    }
}

/// Longest consecutive stretch of a tile set along one row or column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Span {
    /// Fixed row (for rows) or column (for columns) of the stretch.
    line: u32,
    start: u32,
    end: u32,
}

impl Span {
    const fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    const fn midpoint(&self) -> u32 {
        self.start + (self.end - self.start) / 2
    }

    const fn row_midpoint(&self) -> CellCoord {
        CellCoord::new(self.line, self.midpoint())
    }

    const fn column_midpoint(&self) -> CellCoord {
        CellCoord::new(self.midpoint(), self.line)
    }
}

/// Classifies a merged tile set into its shape and derived power-up.
///
/// Tiles are reordered row-major in the returned match.
#[must_use]
pub fn classify(tiles: &[Tile]) -> Match {
    let mut tiles: Vec<Tile> = tiles.to_vec();
    tiles.sort_by_key(|tile| tile.cell);
    tiles.dedup_by_key(|tile| tile.id);

    if tiles.is_empty() {
        return Match {
            tiles,
            shape: MatchShape::Horizontal,
            powerup: None,
        };
    }

    let cells: BTreeSet<CellCoord> = tiles.iter().map(|tile| tile.cell).collect();
    let rows: BTreeSet<u32> = cells.iter().map(|cell| cell.row()).collect();
    let columns: BTreeSet<u32> = cells.iter().map(|cell| cell.column()).collect();
    let count = tiles.len();

    let row_span = longest_span(&cells, Axis::Row);
    let column_span = longest_span(&cells, Axis::Column);
    let row_run = row_span.map_or(0, |span| span.len());
    let column_run = column_span.map_or(0, |span| span.len());
    let both_axes = rows.len() > 1 && columns.len() > 1;

    let (shape, powerup) = if to_len(row_run.max(column_run)) >= COLOR_BOMB_MATCH {
        let cell = match (row_span, column_span) {
            (Some(span), _) if row_run >= column_run => span.row_midpoint(),
            (_, Some(span)) => span.column_midpoint(),
            _ => tiles[0].cell,
        };
        let shape = if both_axes {
            bent_shape(&cells)
        } else if row_run >= column_run {
            MatchShape::Horizontal
        } else {
            MatchShape::Vertical
        };
        (shape, Some(spawn(PowerupKind::ColorBomb, cell)))
    } else if rows.len() == 1 {
        let powerup = row_span
            .filter(|_| count == ROCKET_MATCH)
            .map(|span| spawn(PowerupKind::RocketH, span.row_midpoint()));
        (MatchShape::Horizontal, powerup)
    } else if columns.len() == 1 {
        let powerup = column_span
            .filter(|_| count == ROCKET_MATCH)
            .map(|span| spawn(PowerupKind::RocketV, span.column_midpoint()));
        (MatchShape::Vertical, powerup)
    } else if count >= COLOR_BOMB_MATCH {
        (
            bent_shape(&cells),
            Some(spawn(PowerupKind::Bomb, intersection(&cells))),
        )
    } else if to_len(row_run) == ROCKET_MATCH {
        let powerup = row_span.map(|span| spawn(PowerupKind::RocketH, span.row_midpoint()));
        (MatchShape::Horizontal, powerup)
    } else if to_len(column_run) == ROCKET_MATCH {
        let powerup = column_span.map(|span| spawn(PowerupKind::RocketV, span.column_midpoint()));
        (MatchShape::Vertical, powerup)
    } else {
        (MatchShape::Horizontal, None)
    };

    Match {
        tiles,
        shape,
        powerup,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Row,
    Column,
}

fn to_len(run: u32) -> usize {
    usize::try_from(run).unwrap_or(usize::MAX)
}

const fn spawn(kind: PowerupKind, cell: CellCoord) -> PowerupSpawn {
    PowerupSpawn { kind, cell }
}

/// Finds the longest consecutive stretch along the axis; ties keep the first found.
fn longest_span(cells: &BTreeSet<CellCoord>, axis: Axis) -> Option<Span> {
    let mut lines: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for cell in cells {
        let (line, offset) = match axis {
            Axis::Row => (cell.row(), cell.column()),
            Axis::Column => (cell.column(), cell.row()),
        };
        lines.entry(line).or_default().push(offset);
    }

    let mut best: Option<Span> = None;
    for (line, mut offsets) in lines {
        offsets.sort_unstable();
        let mut start = offsets[0];
        let mut previous = offsets[0];
        for &offset in offsets.iter().skip(1).chain(std::iter::once(&u32::MAX)) {
            if offset != u32::MAX && offset == previous + 1 {
                previous = offset;
                continue;
            }
            let span = Span {
                line,
                start,
                end: previous,
            };
            if best.map_or(true, |current| span.len() > current.len()) {
                best = Some(span);
            }
            start = offset;
            previous = offset;
        }
    }
    best
}

/// Stretch of set cells along the axis that contains the cell.
fn span_through(cells: &BTreeSet<CellCoord>, cell: CellCoord, axis: Axis) -> (u32, u32) {
    let step = |offset: u32| match axis {
        Axis::Row => CellCoord::new(cell.row(), offset),
        Axis::Column => CellCoord::new(offset, cell.column()),
    };
    let origin = match axis {
        Axis::Row => cell.column(),
        Axis::Column => cell.row(),
    };

    let mut start = origin;
    while start > 0 && cells.contains(&step(start - 1)) {
        start -= 1;
    }
    let mut end = origin;
    while cells.contains(&step(end + 1)) {
        end += 1;
    }
    (start, end)
}

/// Cell with the largest row count plus column count within the set; ties pick the lowest cell.
fn intersection(cells: &BTreeSet<CellCoord>) -> CellCoord {
    let mut row_counts: BTreeMap<u32, usize> = BTreeMap::new();
    let mut column_counts: BTreeMap<u32, usize> = BTreeMap::new();
    for cell in cells {
        *row_counts.entry(cell.row()).or_default() += 1;
        *column_counts.entry(cell.column()).or_default() += 1;
    }

    let mut best: Option<(usize, CellCoord)> = None;
    for cell in cells {
        let weight = row_counts.get(&cell.row()).copied().unwrap_or(0)
            + column_counts.get(&cell.column()).copied().unwrap_or(0);
        if best.map_or(true, |(current, _)| weight > current) {
            best = Some((weight, *cell));
        }
    }
    best.map_or(CellCoord::new(0, 0), |(_, cell)| cell)
}

/// L when the arms meet at an end of both, T otherwise.
fn bent_shape(cells: &BTreeSet<CellCoord>) -> MatchShape {
    let pivot = intersection(cells);
    let (row_start, row_end) = span_through(cells, pivot, Axis::Row);
    let (column_start, column_end) = span_through(cells, pivot, Axis::Column);
    let row_end_point = pivot.column() == row_start || pivot.column() == row_end;
    let column_end_point = pivot.row() == column_start || pivot.row() == column_end;
    if row_end_point && column_end_point {
        MatchShape::L
    } else {
        MatchShape::T
    }
}

fn swap_is_productive(view: &GridView<'_>, first: CellCoord, second: CellCoord) -> bool {
    let movable = |coord: CellCoord| view.cell(coord).and_then(|cell| cell.movable_tile());
    let (Some(a), Some(b)) = (movable(first), movable(second)) else {
        return false;
    };
    if a.is_powerup() || b.is_powerup() {
        return true;
    }
    if a.color == b.color {
        return false;
    }

    let color_at = |coord: CellCoord| -> Option<TileColor> {
        if coord == first {
            Some(b.color)
        } else if coord == second {
            Some(a.color)
        } else {
            view.matchable_tile(coord).map(|tile| tile.color)
        }
    };

    forms_match_at(view, first, &color_at) || forms_match_at(view, second, &color_at)
}

fn forms_match_at<F>(view: &GridView<'_>, cell: CellCoord, color_at: &F) -> bool
where
    F: Fn(CellCoord) -> Option<TileColor>,
{
    let Some(color) = color_at(cell) else {
        return false;
    };
    let same = |row: i64, column: i64| -> bool {
        match (u32::try_from(row), u32::try_from(column)) {
            (Ok(row), Ok(column)) => {
                let coord = CellCoord::new(row, column);
                view.contains(coord) && color_at(coord) == Some(color)
            }
            _ => false,
        }
    };

    let row = i64::from(cell.row());
    let column = i64::from(cell.column());
    let reach = |dr: i64, dc: i64| -> usize {
        let mut count = 0;
        let (mut r, mut c) = (row + dr, column + dc);
        while same(r, c) {
            count += 1;
            r += dr;
            c += dc;
        }
        count
    };

    if 1 + reach(0, -1) + reach(0, 1) >= MIN_MATCH || 1 + reach(-1, 0) + reach(1, 0) >= MIN_MATCH {
        return true;
    }

    [(-1, -1), (-1, 0), (0, -1), (0, 0)].iter().any(|(dr, dc)| {
        let (top, left) = (row + dr, column + dc);
        same(top, left) && same(top, left + 1) && same(top + 1, left) && same(top + 1, left + 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(id: u32, row: u32, column: u32) -> Tile {
        Tile {
            id: TileId::new(id),
            color: TileColor::Green,
            cell: CellCoord::new(row, column),
            powerup: None,
        }
    }

    fn tiles(cells: &[(u32, u32)]) -> Vec<Tile> {
        cells
            .iter()
            .enumerate()
            .map(|(index, (row, column))| tile(index as u32, *row, *column))
            .collect()
    }

    #[test]
    fn empty_set_is_degenerate() {
        let classified = classify(&[]);
        assert!(classified.is_empty());
        assert_eq!(classified.shape, MatchShape::Horizontal);
        assert_eq!(classified.powerup, None);
    }

    #[test]
    fn even_runs_bias_toward_lower_index() {
        let classified = classify(&tiles(&[(0, 3), (0, 4), (0, 5), (0, 6)]));
        assert_eq!(
            classified.powerup,
            Some(spawn(PowerupKind::RocketH, CellCoord::new(0, 4)))
        );
    }

    #[test]
    fn vertical_five_is_vertical_color_bomb() {
        let classified = classify(&tiles(&[(1, 2), (2, 2), (3, 2), (4, 2), (5, 2)]));
        assert_eq!(classified.shape, MatchShape::Vertical);
        assert_eq!(
            classified.powerup,
            Some(spawn(PowerupKind::ColorBomb, CellCoord::new(3, 2)))
        );
    }

    #[test]
    fn cross_is_t_shaped_bomb_at_center() {
        let classified = classify(&tiles(&[(0, 1), (1, 0), (1, 1), (1, 2), (2, 1)]));
        assert_eq!(classified.shape, MatchShape::T);
        assert_eq!(
            classified.powerup,
            Some(spawn(PowerupKind::Bomb, CellCoord::new(1, 1)))
        );
    }

    #[test]
    fn long_arm_in_bent_shape_prefers_color_bomb() {
        let classified = classify(&tiles(&[
            (0, 0),
            (0, 1),
            (0, 2),
            (0, 3),
            (0, 4),
            (1, 0),
            (2, 0),
        ]));
        assert_eq!(classified.shape, MatchShape::L);
        assert_eq!(
            classified.powerup,
            Some(spawn(PowerupKind::ColorBomb, CellCoord::new(0, 2)))
        );
    }

    #[test]
    fn classification_is_order_independent() {
        let mut cells = tiles(&[(2, 0), (2, 1), (2, 2), (0, 0), (1, 0)]);
        let forward = classify(&cells);
        cells.reverse();
        assert_eq!(classify(&cells), forward);
    }
}
