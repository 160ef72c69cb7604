#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Gemfall level headlessly.

mod level;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use gemfall_core::{Cell, CellCoord, Event, LevelOutcome};
use gemfall_system_bootstrap::Bootstrap;
use gemfall_system_cascade::{MoveError, MoveResolver};
use gemfall_system_match_detection::MatchDetector;
use gemfall_system_scoring::{LevelGoals, Scoring, ScoringConfig};
use gemfall_world::{query, World, WorldConfig};

/// Command-line arguments accepted by the Gemfall runner.
#[derive(Debug, Parser)]
#[command(
    name = "gemfall",
    version,
    about = "Plays a Gemfall level headlessly and prints its event log"
)]
struct CliArgs {
    /// Path to a TOML level definition; the built-in level is used when omitted.
    #[arg(long)]
    level: Option<PathBuf>,
    /// Overrides the refill seed declared by the level.
    #[arg(long)]
    seed: Option<u64>,
    /// Scripted actions separated by `;`: `r,c:r,c` swaps two cells, `r,c` taps a power-up.
    #[arg(long)]
    moves: Option<String>,
    /// Plays suggested moves after the script until the level ends.
    #[arg(long)]
    auto: bool,
    /// Prints every event as it is emitted.
    #[arg(long)]
    verbose: bool,
}

/// A single scripted player action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Swap(CellCoord, CellCoord),
    Tap(CellCoord),
}

/// Entry point for the Gemfall command-line interface.
fn main() -> Result<()> {
    let args = CliArgs::parse();

    let definition = match &args.level {
        Some(path) => level::load(path)?,
        None => level::parse(level::DEFAULT_LEVEL).context("built-in level is invalid")?,
    };
    let actions = match &args.moves {
        Some(script) => parse_script(script)?,
        None => Vec::new(),
    };

    let defaults = WorldConfig::default();
    let config = WorldConfig::new(
        definition.colors.unwrap_or(defaults.palette_size()),
        args.seed.or(definition.seed).unwrap_or(defaults.seed()),
    );

    let mut bootstrap = Bootstrap::default();
    let mut setup = Vec::new();
    let mut world = bootstrap.start_level(&definition.layout, config, &mut setup);
    println!("{}", bootstrap.welcome_banner(&world));
    print_board(&world);

    let mut session = Session::new(definition.goals, args.verbose);
    for (index, action) in actions.into_iter().enumerate() {
        if session.finished() {
            break;
        }
        if let Err(error) = session.play(&mut world, action) {
            println!("move {}: rejected ({error})", index + 1);
        }
    }

    if args.auto {
        let mut detector = MatchDetector::new();
        while !session.finished() {
            let Some((first, second)) = detector.find_possible_move(&query::grid_view(&world))
            else {
                break;
            };
            let before = session.scoring.moves_remaining();
            session
                .play(&mut world, Action::Swap(first, second))
                .context("suggested move was rejected")?;
            if session.scoring.moves_remaining() == before {
                break;
            }
        }
    }

    print_board(&world);
    session.print_summary();
    Ok(())
}

/// Resolver and scoring state for the running level.
#[derive(Debug)]
struct Session {
    resolver: MoveResolver,
    scoring: Scoring,
    events: usize,
    verbose: bool,
}

impl Session {
    fn new(goals: LevelGoals, verbose: bool) -> Self {
        Self {
            resolver: MoveResolver::default(),
            scoring: Scoring::new(ScoringConfig::default(), goals),
            events: 0,
            verbose,
        }
    }

    fn finished(&self) -> bool {
        self.scoring.outcome().is_some()
    }

    fn play(&mut self, world: &mut World, action: Action) -> Result<(), MoveError> {
        let mut events = Vec::new();
        match action {
            Action::Swap(first, second) => self.resolver.swap(world, first, second, &mut events)?,
            Action::Tap(cell) => {
                let tile = query::tile_at(world, cell).ok_or(MoveError::MissingTile)?;
                self.resolver.tap_powerup(world, tile.id)?;
            }
        }
        self.resolver.run_to_stable(world, &mut events);

        let mut progress = Vec::new();
        self.scoring.handle(&events, &mut progress);
        events.extend(progress);
        self.record(&events);
        Ok(())
    }

    fn record(&mut self, events: &[Event]) {
        self.events += events.len();
        if self.verbose {
            for event in events {
                println!("  {event:?}");
            }
        }
    }

    fn print_summary(&self) {
        let outcome = match self.scoring.outcome() {
            Some(LevelOutcome::Won) => "won",
            Some(LevelOutcome::Lost) => "lost",
            None => "in progress",
        };
        println!(
            "score {} moves_left {} outcome {} events {}",
            self.scoring.score(),
            self.scoring.moves_remaining(),
            outcome,
            self.events
        );
        for (kind, progress) in self.scoring.objectives().iter() {
            println!(
                "objective {} {}/{}",
                kind.name(),
                progress.cleared,
                progress.required
            );
        }
    }
}

fn parse_script(script: &str) -> Result<Vec<Action>> {
    script
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_action)
        .collect()
}

fn parse_action(entry: &str) -> Result<Action> {
    match entry.split_once(':') {
        Some((first, second)) => Ok(Action::Swap(parse_cell(first)?, parse_cell(second)?)),
        None => Ok(Action::Tap(parse_cell(entry)?)),
    }
}

fn parse_cell(value: &str) -> Result<CellCoord> {
    let Some((row, column)) = value.trim().split_once(',') else {
        bail!("expected `row,column`, found `{value}`");
    };
    let row = row
        .trim()
        .parse()
        .with_context(|| format!("invalid row in `{value}`"))?;
    let column = column
        .trim()
        .parse()
        .with_context(|| format!("invalid column in `{value}`"))?;
    Ok(CellCoord::new(row, column))
}

fn print_board(world: &World) {
    let view = query::grid_view(world);
    let width = usize::try_from(view.columns()).unwrap_or(1).max(1);
    for row in view.cells().chunks(width) {
        let line: String = row.iter().map(cell_glyph).collect();
        println!("{line}");
    }
}

fn cell_glyph(cell: &Cell) -> char {
    if cell.is_blocked() {
        return '#';
    }
    match (cell.tile(), cell.obstacle()) {
        (Some(tile), _) if tile.is_powerup() => tile.color.code().to_ascii_uppercase(),
        (Some(tile), _) => tile.color.code(),
        (None, Some(obstacle)) if obstacle.kind().is_solid() => '=',
        _ => '_',
    }
}
