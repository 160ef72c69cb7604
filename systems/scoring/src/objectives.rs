use std::collections::BTreeMap;

use gemfall_core::ObstacleKind;

/// Progress toward destroying a required number of obstacles of one kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectiveProgress {
    /// Obstacles destroyed so far.
    pub cleared: u32,
    /// Obstacles that must be destroyed.
    pub required: u32,
}

impl ObjectiveProgress {
    /// Reports whether the objective has been satisfied.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.cleared >= self.required
    }
}

/// Obstacle-count objectives keyed by obstacle kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Objectives {
    entries: BTreeMap<ObstacleKind, ObjectiveProgress>,
}

impl Objectives {
    /// Creates objectives from required counts; zero requirements are dropped.
    #[must_use]
    pub fn new<I>(required: I) -> Self
    where
        I: IntoIterator<Item = (ObstacleKind, u32)>,
    {
        let entries = required
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(kind, required)| {
                (
                    kind,
                    ObjectiveProgress {
                        cleared: 0,
                        required,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Records destroyed obstacles and returns the updated progress if the kind is tracked.
    pub fn record(&mut self, kind: ObstacleKind, count: u32) -> Option<ObjectiveProgress> {
        let entry = self.entries.get_mut(&kind)?;
        entry.cleared = entry.cleared.saturating_add(count);
        Some(*entry)
    }

    /// Progress for a single obstacle kind.
    #[must_use]
    pub fn get(&self, kind: ObstacleKind) -> Option<ObjectiveProgress> {
        self.entries.get(&kind).copied()
    }

    /// Reports whether no objectives are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reports whether every tracked objective is satisfied.
    #[must_use]
    pub fn all_complete(&self) -> bool {
        self.entries.values().all(ObjectiveProgress::is_complete)
    }

    /// Iterator over tracked objectives in obstacle order.
    pub fn iter(&self) -> impl Iterator<Item = (ObstacleKind, ObjectiveProgress)> + '_ {
        self.entries.iter().map(|(kind, progress)| (*kind, *progress))
    }
}
