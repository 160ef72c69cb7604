#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure bootstrap system that prepares a Gemfall level session.

use gemfall_core::{Event, GridView};
use gemfall_system_cascade::{shuffle, stabilize, ResolverConfig};
use gemfall_system_match_detection::MatchDetector;
use gemfall_world::{query, LevelLayout, World, WorldConfig};

/// Produces the initial board and the data required to greet the player.
#[derive(Debug, Default)]
pub struct Bootstrap {
    detector: MatchDetector,
    config: ResolverConfig,
}

impl Bootstrap {
    /// Creates a bootstrap system that stabilises boards with the provided limits.
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            detector: MatchDetector::new(),
            config,
        }
    }

    /// Derives the banner that should be shown when the session starts.
    #[must_use]
    pub fn welcome_banner(&self, world: &World) -> &'static str {
        query::welcome_banner(world)
    }

    /// Exposes the read-only grid required for presentation.
    #[must_use]
    pub fn grid<'world>(&self, world: &'world World) -> GridView<'world> {
        query::grid_view(world)
    }

    /// Builds the level's world, clears any initial matches and guarantees a playable move.
    ///
    /// The events describe the setup mutations and are usually discarded by
    /// adapters that only present the settled board.
    pub fn start_level(
        &mut self,
        layout: &LevelLayout,
        config: WorldConfig,
        out_events: &mut Vec<Event>,
    ) -> World {
        let mut world = World::from_layout(layout, config);
        let _ = stabilize(
            &mut world,
            &mut self.detector,
            self.config.stabilize_cap(),
            out_events,
        );

        let playable = self
            .detector
            .find_possible_move(&query::grid_view(&world))
            .is_some();
        if !playable && self.config.auto_shuffle() {
            shuffle(&mut world, &mut self.detector, self.config, out_events);
        }
        world
    }
}
