//! Everything that differs between the two canvas layouts the game ships with.
//!
//! `wide` (1440x810) is the default. `classic` (800x720) is the smaller
//! layout with fixed enemy lanes. A page picks one with `"preset"` in
//! `config.json` and can override any other field there, missing fields keep
//! the preset's values.

use crate::engine::{Point, Size};
use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Collision circle relative to the sprite's top left corner.
#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct HitCircle {
    pub offset: Point,
    pub radius: f64,
}

/// One row of a sprite sheet, frames `0..=max_frame`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnimationRow {
    pub row: u8,
    pub max_frame: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub size: Size,
    /// Leftmost x the player may reach, negative when the sheet has padding.
    pub left_bound: f64,
    /// How far above the floor still counts as standing.
    pub ground_margin: f64,
    pub fps: f64,
    pub running: AnimationRow,
    pub jumping: AnimationRow,
    pub hitbox: HitCircle,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let size = Size {
            width: 256.0,
            height: 128.0,
        };
        PlayerConfig {
            size,
            left_bound: -48.0,
            ground_margin: 10.0,
            fps: 10.0,
            running: AnimationRow {
                row: 0,
                max_frame: 7,
            },
            jumping: AnimationRow {
                row: 1,
                max_frame: 5,
            },
            // the runner sits 48px into its frame, left half only
            hitbox: HitCircle {
                offset: Point {
                    x: 48.0 + size.width / 4.0,
                    y: size.height / 2.0,
                },
                radius: size.width / 4.0,
            },
        }
    }
}

/// `min + random * spread`
#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SpeedRange {
    pub min: f64,
    pub spread: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub size: Size,
    pub fps: f64,
    pub max_frame: u8,
    pub speed: SpeedRange,
    /// Enemies spawn up to this many px above the floor.
    pub vertical_jitter: f64,
    pub hitbox: HitCircle,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        let size = Size {
            width: 191.0,
            height: 161.0,
        };
        EnemyConfig {
            size,
            fps: 10.0,
            max_frame: 2,
            speed: SpeedRange {
                min: 8.0,
                spread: 6.0,
            },
            vertical_jitter: 300.0,
            hitbox: HitCircle {
                offset: Point {
                    x: size.width / 2.0,
                    y: size.height / 2.0,
                },
                radius: size.width / 3.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub size: Size,
    pub speed: f64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        BackgroundConfig {
            size: Size {
                width: 1440.0,
                height: 810.0,
            },
            speed: 4.0,
        }
    }
}

/// How the random part of the spawn threshold is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SpawnOffset {
    /// Rolled again on every check.
    PerCheck { min: f64, spread: f64 },
    /// Rolled once when the session starts.
    PerGame { min: f64, spread: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Base delay between enemies in ms.
    pub interval: f64,
    pub offset: SpawnOffset,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        SpawnConfig {
            interval: 500.0,
            offset: SpawnOffset::PerCheck {
                min: 100.0,
                spread: 100_000.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetPaths {
    pub player: String,
    pub enemy: String,
    pub background: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        AssetPaths {
            player: "player.png".into(),
            enemy: "enemy.png".into(),
            background: "background.png".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GameConfig {
    pub canvas: Size,
    pub player: PlayerConfig,
    pub enemy: EnemyConfig,
    pub background: BackgroundConfig,
    pub spawn: SpawnConfig,
    pub assets: AssetPaths,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::wide()
    }
}

impl GameConfig {
    pub const PATH: &'static str = "config.json";

    /// 1440x810, enemies at random heights and speeds.
    pub fn wide() -> Self {
        GameConfig {
            canvas: Size {
                width: 1440.0,
                height: 810.0,
            },
            player: PlayerConfig::default(),
            enemy: EnemyConfig::default(),
            background: BackgroundConfig::default(),
            spawn: SpawnConfig::default(),
            assets: AssetPaths::default(),
        }
    }

    /// 800x720, every enemy runs the floor lane at the same speed.
    pub fn classic() -> Self {
        let player_size = Size {
            width: 200.0,
            height: 200.0,
        };
        let enemy_size = Size {
            width: 160.0,
            height: 119.0,
        };
        GameConfig {
            canvas: Size {
                width: 800.0,
                height: 720.0,
            },
            player: PlayerConfig {
                size: player_size,
                left_bound: 0.0,
                ground_margin: 0.0,
                fps: 20.0,
                running: AnimationRow {
                    row: 0,
                    max_frame: 8,
                },
                jumping: AnimationRow {
                    row: 1,
                    max_frame: 5,
                },
                hitbox: HitCircle {
                    offset: Point {
                        x: player_size.width / 2.0,
                        y: player_size.height / 2.0,
                    },
                    radius: player_size.width / 2.0,
                },
            },
            enemy: EnemyConfig {
                size: enemy_size,
                fps: 20.0,
                max_frame: 5,
                speed: SpeedRange {
                    min: 8.0,
                    spread: 0.0,
                },
                vertical_jitter: 0.0,
                hitbox: HitCircle {
                    offset: Point {
                        x: enemy_size.width / 2.0,
                        y: enemy_size.height / 2.0,
                    },
                    radius: enemy_size.width / 2.0,
                },
            },
            background: BackgroundConfig {
                size: Size {
                    width: 2400.0,
                    height: 720.0,
                },
                speed: 7.0,
            },
            spawn: SpawnConfig {
                interval: 1000.0,
                offset: SpawnOffset::PerGame {
                    min: 500.0,
                    spread: 1000.0,
                },
            },
            assets: AssetPaths::default(),
        }
    }

    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "wide" => Ok(GameConfig::wide()),
            "classic" => Ok(GameConfig::classic()),
            _ => bail!("Unknown preset '{}', expected 'wide' or 'classic'", name),
        }
    }

    /// Builds a config from the page's JSON: the `"preset"` key (default
    /// `wide`) picks the base, every other key overrides it, nested objects
    /// key by key.
    pub fn from_json(value: Value) -> Result<Self> {
        let mut overrides = match value {
            Value::Object(map) => map,
            other => bail!("config must be a JSON object, got {}", other),
        };
        let base = match overrides.remove("preset") {
            Some(Value::String(name)) => GameConfig::preset(&name)?,
            Some(other) => bail!("preset must be a name, got {}", other),
            None => GameConfig::default(),
        };

        let mut merged = serde_json::to_value(base)?;
        merge(&mut merged, Value::Object(overrides));
        serde_json::from_value(merged).context("config does not match the game layout")
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.canvas.width > 0.0 && self.canvas.height > 0.0,
            "canvas must have a positive size, got {:?}",
            self.canvas
        );
        for side in [self.canvas.width, self.canvas.height] {
            ensure!(
                side.fract() == 0.0 && side <= u32::MAX as f64,
                "canvas size must be whole pixels, got {:?}",
                self.canvas
            );
        }
        for (name, size) in [
            ("player", self.player.size),
            ("enemy", self.enemy.size),
            ("background", self.background.size),
        ] {
            ensure!(
                size.width > 0.0 && size.height > 0.0,
                "{} sprite must have a positive size, got {:?}",
                name,
                size
            );
        }
        ensure!(
            self.player.size.height <= self.canvas.height,
            "player is taller than the canvas"
        );
        ensure!(
            self.player.left_bound <= self.canvas.width - self.player.size.width,
            "player cannot fit between left bound {} and the right edge",
            self.player.left_bound
        );
        ensure!(
            self.player.fps > 0.0 && self.enemy.fps > 0.0,
            "animation fps must be positive"
        );
        ensure!(self.player.ground_margin >= 0.0, "ground margin must not be negative");
        ensure!(self.spawn.interval >= 0.0, "spawn interval must not be negative");
        ensure!(
            self.background.speed >= 0.0 && self.background.speed.is_finite(),
            "background must scroll left, got speed {}",
            self.background.speed
        );
        ensure!(
            self.enemy.speed.min > 0.0 && self.enemy.speed.spread >= 0.0,
            "enemies must move left"
        );
        Ok(())
    }

    /// Floor y of the player, its top edge when standing.
    pub fn player_floor(&self) -> f64 {
        self.canvas.height - self.player.size.height
    }
}

fn merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => merge_objects(base, overrides),
        (base, value) => *base = value,
    }
}

fn merge_objects(base: &mut Map<String, Value>, overrides: Map<String, Value>) {
    for (key, value) in overrides {
        match base.get_mut(&key) {
            Some(slot) => merge(slot, value),
            None => {
                base.insert(key, value);
            }
        }
    }
}
