// Sprite sheets are grids: one row per animation, one column per frame.
// ┌──────────────┬────────────────────────────────────────────────────┐
// │ mod.rs       │ SpriteSheet (grid math), Animation (frame timer),  │
// │              │ SpriteState + the Running/Jumping markers          │
// │ state.rs     │ PlayerContext physics, PlayerState<S> typestate    │
// │ player.rs    │ Player, the state machine the game talks to        │
// │ enemy.rs     │ Enemy, scrolls right to left until off screen      │
// └──────────────┴────────────────────────────────────────────────────┘
pub mod enemy;
pub mod player;
pub mod state;

use crate::config::{AnimationRow, PlayerConfig};
use crate::engine::{Point, Rect, Size};

/// Cell geometry of a sprite sheet, every frame has the same size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteSheet {
    frame_size: Size,
}

impl SpriteSheet {
    pub fn new(frame_size: Size) -> Self {
        SpriteSheet { frame_size }
    }

    pub fn frame_size(&self) -> Size {
        self.frame_size
    }

    /// Source rectangle of column `frame_x` in row `frame_y`.
    pub fn frame(&self, frame_x: u8, frame_y: u8) -> Rect {
        Rect::new(
            Point {
                x: f64::from(frame_x) * self.frame_size.width,
                y: f64::from(frame_y) * self.frame_size.height,
            },
            self.frame_size,
        )
    }
}

/// Walks the columns of one sheet row at a fixed fps, independent of the
/// display refresh rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    frame_x: u8,
    frame_y: u8,
    max_frame: u8,
    timer: f64,
    frame_interval: f64,
}

impl Animation {
    pub fn new(fps: f64, row: AnimationRow) -> Self {
        Animation {
            frame_x: 0,
            frame_y: row.row,
            max_frame: row.max_frame,
            timer: 0.0,
            frame_interval: 1000.0 / fps,
        }
    }

    pub fn frame_x(&self) -> u8 {
        self.frame_x
    }

    pub fn frame_y(&self) -> u8 {
        self.frame_y
    }

    pub fn max_frame(&self) -> u8 {
        self.max_frame
    }

    /// Accumulate `delta` ms and move to the next column once a whole
    /// interval has passed, wrapping after `max_frame`.
    pub fn tick(mut self, delta: f64) -> Self {
        self.timer += delta;
        if self.timer >= self.frame_interval {
            self.frame_x = if self.frame_x >= self.max_frame {
                0
            } else {
                self.frame_x + 1
            };
            self.timer = 0.0;
        }
        self
    }

    /// Play another row. Changing rows restarts at column 0 so a longer
    /// row's column never indexes past the end of a shorter one.
    pub fn play(mut self, row: AnimationRow) -> Self {
        if self.frame_y != row.row {
            self.frame_x = 0;
            self.frame_y = row.row;
        }
        self.max_frame = row.max_frame;
        self
    }
}

/// Player animation sets. Each marker type picks its row from the config,
/// the typestate in `state.rs` makes sure the right one is playing.
pub trait SpriteState: Copy {
    fn marker() -> Self;
    fn row(config: &PlayerConfig) -> AnimationRow;
}

#[derive(Debug, Copy, Clone)]
pub struct Running;

#[derive(Debug, Copy, Clone)]
pub struct Jumping;

impl SpriteState for Running {
    fn marker() -> Self {
        Running
    }

    fn row(config: &PlayerConfig) -> AnimationRow {
        config.running
    }
}

impl SpriteState for Jumping {
    fn marker() -> Self {
        Jumping
    }

    fn row(config: &PlayerConfig) -> AnimationRow {
        config.jumping
    }
}
