use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{bail, Context, Result};
use gemfall_core::ObstacleKind;
use gemfall_system_scoring::{LevelGoals, Objectives};
use gemfall_world::LevelLayout;
use serde::Deserialize;

/// Level played when no level file is supplied.
pub(crate) const DEFAULT_LEVEL: &str = r#"
moves = 20
colors = 5
seed = 7
layout = [
    "X......X",
    "........",
    "..G..G..",
    "...II...",
    ".C....C.",
    "..B..B..",
    "........",
    "X......X",
]

[objectives]
grass = 2
ice = 2
"#;

/// Objective key that sets a score target instead of an obstacle count.
const SCORE_OBJECTIVE: &str = "score";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LevelFile {
    moves: u32,
    #[serde(default)]
    colors: Option<u8>,
    #[serde(default)]
    seed: Option<u64>,
    layout: Vec<String>,
    #[serde(default)]
    objectives: BTreeMap<String, u64>,
}

/// Level definition decoded from TOML.
#[derive(Debug)]
pub(crate) struct LevelDefinition {
    pub(crate) layout: LevelLayout,
    pub(crate) goals: LevelGoals,
    pub(crate) colors: Option<u8>,
    pub(crate) seed: Option<u64>,
}

/// Reads and decodes the level stored at `path`.
pub(crate) fn load(path: &Path) -> Result<LevelDefinition> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read level file at {}", path.display()))?;
    parse(&contents).with_context(|| format!("failed to load level {}", path.display()))
}

/// Decodes a level from TOML contents.
pub(crate) fn parse(contents: &str) -> Result<LevelDefinition> {
    let file: LevelFile = toml::from_str(contents).context("failed to parse level toml contents")?;
    if file.moves == 0 {
        bail!("level must grant at least one move");
    }

    let layout = LevelLayout::from_rows(file.layout.as_slice()).context("invalid level layout")?;

    let mut target_score = None;
    let mut required = Vec::with_capacity(file.objectives.len());
    for (name, count) in file.objectives {
        if name == SCORE_OBJECTIVE {
            target_score = Some(count);
            continue;
        }
        let Some(kind) = ObstacleKind::from_name(&name) else {
            bail!("unknown objective `{name}` in level");
        };
        let count = u32::try_from(count)
            .with_context(|| format!("objective `{name}` requires too many obstacles"))?;
        required.push((kind, count));
    }

    Ok(LevelDefinition {
        layout,
        goals: LevelGoals {
            moves: file.moves,
            target_score,
            objectives: Objectives::new(required),
        },
        colors: file.colors,
        seed: file.seed,
    })
}
