use gemfall_core::{
    BoosterKind, CellCoord, ClearCause, Command, Event, Obstacle, ObstacleKind, PowerupKind,
    TileColor,
};
use gemfall_system_cascade::{shuffle, stabilize, MoveError, MoveResolver, Phase, ResolverConfig};
use gemfall_system_match_detection::MatchDetector;
use gemfall_world::{self as world, query, LevelLayout, World, WorldConfig};

fn fixture(rows: &[&str]) -> World {
    World::from_color_rows(rows, WorldConfig::default()).expect("fixture parses")
}

fn stable_world(seed: u64) -> World {
    let layout = LevelLayout::from_rows(&["........"; 8]).expect("layout");
    let mut world = World::from_layout(&layout, WorldConfig::new(5, seed));
    let mut detector = MatchDetector::new();
    let mut events = Vec::new();
    assert!(stabilize(&mut world, &mut detector, 100, &mut events));
    world
}

fn apply(world: &mut World, command: Command) {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
}

fn completed(events: &[Event]) -> Vec<(u32, bool)> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::MoveCompleted {
                cascades,
                consumes_move,
            } => Some((*cascades, *consumes_move)),
            _ => None,
        })
        .collect()
}

#[test]
fn swap_without_match_reverts_and_consumes_nothing() {
    let mut world = fixture(&["rgb", "gbr", "brg"]);
    let mut resolver = MoveResolver::default();
    let mut events = Vec::new();

    resolver
        .swap(
            &mut world,
            CellCoord::new(0, 0),
            CellCoord::new(0, 1),
            &mut events,
        )
        .expect("swap accepted");
    resolver.run_to_stable(&mut world, &mut events);

    assert!(events.contains(&Event::SwapReverted {
        first: CellCoord::new(0, 0),
        second: CellCoord::new(0, 1),
    }));
    assert!(completed(&events).is_empty());
    assert_eq!(
        query::tile_at(&world, CellCoord::new(0, 0)).map(|tile| tile.color),
        Some(TileColor::Red)
    );
    assert!(!resolver.is_processing());
}

#[test]
fn matching_swap_clears_and_refills() {
    let mut world = fixture(&["rgry", "brbg", "ybyr"]);
    let mut resolver = MoveResolver::default();
    let mut events = Vec::new();

    resolver
        .swap(
            &mut world,
            CellCoord::new(0, 1),
            CellCoord::new(1, 1),
            &mut events,
        )
        .expect("swap accepted");
    resolver.run_to_stable(&mut world, &mut events);

    let level = events
        .iter()
        .position(|event| matches!(event, Event::CascadeLevel { level: 1, .. }))
        .expect("first cascade level");
    let found = events
        .iter()
        .position(|event| matches!(event, Event::MatchFound { .. }))
        .expect("match found");
    let cleared = events
        .iter()
        .position(|event| {
            matches!(
                event,
                Event::TilesCleared {
                    cause: ClearCause::Match,
                    ..
                }
            )
        })
        .expect("tiles cleared");
    assert!(level < found && found < cleared);

    let moves = completed(&events);
    assert_eq!(moves.len(), 1);
    assert!(moves[0].0 >= 1);
    assert!(moves[0].1);
    assert!(query::positions_consistent(&world));
    assert_eq!(query::empty_playable_cells(&world), 0);
}

#[test]
fn advance_steps_through_each_phase() {
    let mut world = fixture(&["rgry", "brbg", "ybyr"]);
    let mut resolver = MoveResolver::default();
    let mut events = Vec::new();
    resolver
        .swap(
            &mut world,
            CellCoord::new(0, 1),
            CellCoord::new(1, 1),
            &mut events,
        )
        .expect("swap accepted");

    assert!(matches!(resolver.phase(), Phase::SwapApplied { .. }));
    assert!(matches!(
        resolver.advance(&mut world, &mut events),
        Phase::MatchesFound(_)
    ));
    assert!(matches!(
        resolver.advance(&mut world, &mut events),
        Phase::Clearing(_)
    ));
    assert_eq!(resolver.advance(&mut world, &mut events), &Phase::Refilling);
    assert_eq!(resolver.cascade_level(), 1);
}

#[test]
fn new_input_is_rejected_while_processing() {
    let mut world = fixture(&["rgry", "brbg", "ybyr"]);
    let mut resolver = MoveResolver::default();
    let mut events = Vec::new();
    resolver
        .swap(
            &mut world,
            CellCoord::new(0, 1),
            CellCoord::new(1, 1),
            &mut events,
        )
        .expect("swap accepted");

    assert_eq!(
        resolver.swap(
            &mut world,
            CellCoord::new(2, 0),
            CellCoord::new(2, 1),
            &mut events
        ),
        Err(MoveError::Busy)
    );
}

#[test]
fn invalid_swaps_are_reported() {
    let mut world = fixture(&["rg_", "brb"]);
    apply(
        &mut world,
        Command::PlaceObstacle {
            cell: CellCoord::new(1, 0),
            obstacle: Obstacle::new(ObstacleKind::Chain, 1),
        },
    );
    let mut resolver = MoveResolver::default();
    let mut events = Vec::new();

    let mut attempt = |first: CellCoord, second: CellCoord| {
        resolver.swap(&mut world, first, second, &mut events)
    };
    assert_eq!(
        attempt(CellCoord::new(0, 0), CellCoord::new(1, 1)),
        Err(MoveError::NotAdjacent)
    );
    assert_eq!(
        attempt(CellCoord::new(1, 2), CellCoord::new(2, 2)),
        Err(MoveError::OutOfBounds)
    );
    assert_eq!(
        attempt(CellCoord::new(0, 1), CellCoord::new(0, 2)),
        Err(MoveError::MissingTile)
    );
    assert_eq!(
        attempt(CellCoord::new(0, 0), CellCoord::new(1, 0)),
        Err(MoveError::NotSwappable)
    );
    assert!(events.is_empty());
}

#[test]
fn four_match_creates_a_rocket_at_its_midpoint() {
    let mut world = fixture(&["rrgr", "bgrb", "ybyg"]);
    let mut resolver = MoveResolver::default();
    let mut events = Vec::new();
    resolver
        .swap(
            &mut world,
            CellCoord::new(0, 2),
            CellCoord::new(1, 2),
            &mut events,
        )
        .expect("swap accepted");
    resolver.run_to_stable(&mut world, &mut events);

    let created = events
        .iter()
        .find_map(|event| match event {
            Event::PowerupCreated { tile, .. } => Some(*tile),
            _ => None,
        })
        .expect("power-up created");
    assert_eq!(created.powerup, Some(PowerupKind::RocketH));
    assert_eq!(created.cell, CellCoord::new(0, 1));
    assert_eq!(created.color, TileColor::Red);
}

#[test]
fn powerup_swap_activates_without_a_match() {
    let mut world = fixture(&["rgb", "gbr", "brg"]);
    apply(
        &mut world,
        Command::PlaceTile {
            cell: CellCoord::new(1, 1),
            color: TileColor::Blue,
            powerup: Some(PowerupKind::RocketV),
        },
    );
    let mut resolver = MoveResolver::default();
    let mut events = Vec::new();
    resolver
        .swap(
            &mut world,
            CellCoord::new(1, 1),
            CellCoord::new(1, 2),
            &mut events,
        )
        .expect("swap accepted");
    resolver.run_to_stable(&mut world, &mut events);

    let activated = events
        .iter()
        .find_map(|event| match event {
            Event::PowerupActivated { tile, cells, .. } => Some((*tile, cells.clone())),
            _ => None,
        })
        .expect("rocket fired");
    assert_eq!(activated.0.powerup, Some(PowerupKind::RocketV));
    assert!(activated.1.iter().all(|cell| cell.column() == 2));
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::SwapReverted { .. })));
    assert_eq!(completed(&events).len(), 1);
    assert!(completed(&events)[0].1);
}

#[test]
fn two_powerups_combine_at_the_target_cell() {
    let mut world = stable_world(5);
    apply(
        &mut world,
        Command::PlaceTile {
            cell: CellCoord::new(3, 3),
            color: TileColor::Red,
            powerup: Some(PowerupKind::Bomb),
        },
    );
    apply(
        &mut world,
        Command::PlaceTile {
            cell: CellCoord::new(3, 4),
            color: TileColor::Blue,
            powerup: Some(PowerupKind::Bomb),
        },
    );
    let mut resolver = MoveResolver::default();
    let mut events = Vec::new();
    resolver
        .swap(
            &mut world,
            CellCoord::new(3, 3),
            CellCoord::new(3, 4),
            &mut events,
        )
        .expect("swap accepted");
    resolver.run_to_stable(&mut world, &mut events);

    let combined = events
        .iter()
        .find_map(|event| match event {
            Event::PowerupsCombined { first, cell, .. } => Some((*first, *cell)),
            _ => None,
        })
        .expect("combined");
    assert_eq!(combined.0.color, TileColor::Red);
    assert_eq!(combined.1, CellCoord::new(3, 4));
    assert!(query::positions_consistent(&world));
    assert_eq!(query::empty_playable_cells(&world), 0);
}

#[test]
fn tapping_requires_a_powerup() {
    let world = fixture(&["rgb"]);
    let mut resolver = MoveResolver::default();
    let tile = query::tile_at(&world, CellCoord::new(0, 0)).expect("tile");
    assert_eq!(
        resolver.tap_powerup(&world, tile.id),
        Err(MoveError::NotAPowerup)
    );
}

#[test]
fn hammer_destroys_obstacles_without_consuming_a_move() {
    let mut world = stable_world(9);
    apply(
        &mut world,
        Command::PlaceObstacle {
            cell: CellCoord::new(6, 2),
            obstacle: Obstacle::new(ObstacleKind::Box, 3),
        },
    );
    let mut resolver = MoveResolver::default();
    let mut events = Vec::new();

    assert_eq!(
        resolver.apply_booster(&mut world, BoosterKind::Hammer, None, &mut events),
        Err(MoveError::MissingTarget)
    );
    resolver
        .apply_booster(
            &mut world,
            BoosterKind::Hammer,
            Some(CellCoord::new(6, 2)),
            &mut events,
        )
        .expect("hammer accepted");
    resolver.run_to_stable(&mut world, &mut events);

    assert!(events.contains(&Event::ObstacleCleared {
        cell: CellCoord::new(6, 2),
        kind: ObstacleKind::Box,
    }));
    assert_eq!(completed(&events).last().map(|entry| entry.1), Some(false));
    assert_eq!(query::empty_playable_cells(&world), 0);
}

#[test]
fn powerup_booster_places_and_fires() {
    let mut world = stable_world(13);
    let mut resolver = MoveResolver::default();
    let mut events = Vec::new();
    resolver
        .apply_booster(
            &mut world,
            BoosterKind::Powerup(PowerupKind::RocketH),
            Some(CellCoord::new(4, 4)),
            &mut events,
        )
        .expect("booster accepted");
    resolver.run_to_stable(&mut world, &mut events);

    assert!(events
        .iter()
        .any(|event| matches!(event, Event::PowerupActivated { .. })));
    assert_eq!(completed(&events).last().map(|entry| entry.1), Some(false));
}

#[test]
fn powerup_booster_on_frozen_tile_breaks_the_ice_and_fires() {
    let target = CellCoord::new(4, 4);
    let mut world = stable_world(13);
    apply(
        &mut world,
        Command::PlaceObstacle {
            cell: target,
            obstacle: Obstacle::new(ObstacleKind::Ice, 2),
        },
    );
    let frozen = query::tile_at(&world, target).expect("frozen tile");
    let mut resolver = MoveResolver::default();
    let mut events = Vec::new();
    resolver
        .apply_booster(
            &mut world,
            BoosterKind::Powerup(PowerupKind::RocketH),
            Some(target),
            &mut events,
        )
        .expect("booster accepted");
    resolver.run_to_stable(&mut world, &mut events);

    assert!(events.contains(&Event::ObstacleCleared {
        cell: target,
        kind: ObstacleKind::Ice,
    }));
    assert!(events.iter().any(|event| matches!(
        event,
        Event::TilesCleared {
            tiles,
            cause: ClearCause::Booster,
        } if tiles.contains(&frozen)
    )));
    let fired = events
        .iter()
        .find_map(|event| match event {
            Event::PowerupActivated { tile, .. } if tile.cell == target => Some(*tile),
            _ => None,
        })
        .expect("rocket fired");
    assert_eq!(fired.powerup, Some(PowerupKind::RocketH));
    assert_eq!(query::tile(&world, fired.id), None);
    assert_eq!(
        query::grid_view(&world)
            .cell(target)
            .and_then(|cell| cell.obstacle()),
        None
    );
    assert_eq!(completed(&events).last().map(|entry| entry.1), Some(false));
}

#[test]
fn spawn_is_skipped_when_its_cell_already_holds_a_powerup() {
    let mut world = fixture(&["rrgr", "bgrb", "ybyg"]);
    let mut resolver = MoveResolver::default();
    let mut events = Vec::new();
    resolver
        .swap(
            &mut world,
            CellCoord::new(0, 2),
            CellCoord::new(1, 2),
            &mut events,
        )
        .expect("swap accepted");
    assert!(matches!(
        resolver.advance(&mut world, &mut events),
        Phase::MatchesFound(_)
    ));
    let plan = match resolver.advance(&mut world, &mut events) {
        Phase::Clearing(plan) => plan.clone(),
        other => panic!("expected a clearing phase, got {other:?}"),
    };
    let (spawn, _) = plan.spawns.first().copied().expect("rocket spawn planned");

    // A single ice layer keeps the bomb through the clear, then melts.
    apply(
        &mut world,
        Command::PlaceTile {
            cell: spawn.cell,
            color: TileColor::Blue,
            powerup: Some(PowerupKind::Bomb),
        },
    );
    apply(
        &mut world,
        Command::PlaceObstacle {
            cell: spawn.cell,
            obstacle: Obstacle::new(ObstacleKind::Ice, 1),
        },
    );
    let bomb = query::tile_at(&world, spawn.cell).expect("bomb placed");

    events.clear();
    assert_eq!(resolver.advance(&mut world, &mut events), &Phase::Refilling);

    assert!(events.contains(&Event::ObstacleCleared {
        cell: spawn.cell,
        kind: ObstacleKind::Ice,
    }));
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::PowerupCreated { .. })));
    assert_eq!(query::tile_at(&world, spawn.cell), Some(bomb));
}

#[test]
fn stabilize_gives_up_at_the_pass_cap() {
    let mut world = fixture(&["rrr", "rrr", "rrr"]);
    let mut detector = MatchDetector::new();
    let mut events = Vec::new();

    assert!(!stabilize(&mut world, &mut detector, 0, &mut events));
    assert!(events.is_empty());
    assert!(!detector
        .find_all_matches(&query::grid_view(&world))
        .is_empty());

    let settled = stabilize(&mut world, &mut detector, 1, &mut events);
    assert!(events
        .iter()
        .all(|event| matches!(event, Event::TileReplaced { .. })));
    assert!(!events.is_empty());
    assert_eq!(
        settled,
        detector
            .find_all_matches(&query::grid_view(&world))
            .is_empty()
    );

    assert!(stabilize(&mut world, &mut detector, 100, &mut events));
}

#[test]
fn cascades_always_settle_on_a_full_match_free_board() {
    let mut detector = MatchDetector::new();
    for seed in 0..12 {
        let mut world = stable_world(seed);
        let mut resolver = MoveResolver::default();
        for _ in 0..5 {
            let Some((first, second)) = detector.find_possible_move(&query::grid_view(&world))
            else {
                break;
            };
            let mut events = Vec::new();
            resolver
                .swap(&mut world, first, second, &mut events)
                .expect("suggested swap is valid");
            resolver.run_to_stable(&mut world, &mut events);

            assert!(query::positions_consistent(&world), "seed {seed}");
            assert_eq!(query::empty_playable_cells(&world), 0, "seed {seed}");
            assert!(
                detector
                    .find_all_matches(&query::grid_view(&world))
                    .is_empty(),
                "seed {seed}: board left with matches"
            );
        }
    }
}

#[test]
fn shuffle_keeps_tiles_and_removes_matches() {
    let mut world = stable_world(21);
    let before = query::grid_view(&world).tiles().count();
    let mut detector = MatchDetector::new();
    let mut events = Vec::new();
    shuffle(
        &mut world,
        &mut detector,
        ResolverConfig::default(),
        &mut events,
    );

    assert_eq!(query::grid_view(&world).tiles().count(), before);
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::BoardShuffled { .. })));
    assert!(detector
        .find_all_matches(&query::grid_view(&world))
        .is_empty());
    assert!(query::positions_consistent(&world));
}
