//! Player physics behind a typestate: `PlayerState<Running>` is on the
//! ground, `PlayerState<Jumping>` in the air. The only way between them is
//! `update`, which looks at where the step left the player.
//!
//! Jump impulse and gravity are per update, not scaled by delta time.
use crate::config::PlayerConfig;
use crate::engine::Point;
use crate::sprite::{Animation, Jumping, Running, SpriteState};

// physics consts, y grows downwards
const RUNNING_SPEED: f64 = 5.0;
const JUMP_IMPULSE: f64 = 32.0;
const GRAVITY: f64 = 1.0;

/// What the keyboard asks of the player this frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

/// Where the player may go on this canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub right: f64,
    pub floor: f64,
}

pub enum Footing {
    Grounded(PlayerState<Running>),
    Airborne(PlayerState<Jumping>),
}

#[derive(Debug, Copy, Clone)]
/// Shared data for :
/// - physics : position + speed + vertical velocity
/// - display : animation row + frame
pub struct PlayerContext {
    pub animation: Animation,
    pub position: Point,
    pub speed: f64,
    pub vy: f64,
    pub bounds: Bounds,
    pub config: PlayerConfig,
}

#[derive(Debug, Copy, Clone)]
pub struct PlayerState<S> {
    context: PlayerContext,
    // marker only, never read
    _state: S,
}

impl<S> PlayerState<S> {
    pub fn context(&self) -> &PlayerContext {
        &self.context
    }

    #[cfg(test)]
    pub fn move_to(&mut self, position: Point) {
        self.context.position = position;
    }
}

impl PlayerState<Running> {
    /// Standing at the left bound, on the ground.
    pub fn new(config: PlayerConfig, bounds: Bounds) -> Self {
        PlayerState {
            context: PlayerContext {
                animation: Animation::new(config.fps, Running::row(&config)),
                position: Point {
                    x: bounds.left,
                    y: bounds.floor - config.ground_margin,
                },
                speed: 0.0,
                vy: 0.0,
                bounds,
                config,
            },
            _state: Running,
        }
    }
}

impl<S: SpriteState> PlayerState<S> {
    pub fn update(self, controls: Controls, delta: f64) -> Footing {
        let context = self
            .context
            .animate(delta)
            .steer(controls)
            .jump(controls)
            .travel();

        if context.on_ground() {
            Footing::Grounded(context.land().settle().enter())
        } else {
            Footing::Airborne(context.fall().settle().enter())
        }
    }
}

impl PlayerContext {
    pub fn on_ground(&self) -> bool {
        self.position.y >= self.bounds.floor - self.config.ground_margin
    }

    fn animate(mut self, delta: f64) -> Self {
        self.animation = self.animation.tick(delta);
        self
    }

    /// Right wins when both directions are held.
    fn steer(mut self, controls: Controls) -> Self {
        self.speed = if controls.right {
            RUNNING_SPEED
        } else if controls.left {
            -RUNNING_SPEED
        } else {
            0.0
        };
        self
    }

    fn jump(mut self, controls: Controls) -> Self {
        if controls.jump && self.on_ground() {
            self.vy -= JUMP_IMPULSE;
        }
        self
    }

    fn travel(mut self) -> Self {
        self.position.x = (self.position.x + self.speed)
            .max(self.bounds.left)
            .min(self.bounds.right);
        self.position.y += self.vy;
        self
    }

    fn fall(mut self) -> Self {
        self.vy += GRAVITY;
        self
    }

    fn land(mut self) -> Self {
        self.vy = 0.0;
        self
    }

    /// Keep y on the canvas, the floor below and the top edge above.
    fn settle(mut self) -> Self {
        self.position.y = self.position.y.min(self.bounds.floor).max(0.0);
        self
    }

    fn enter<S: SpriteState>(mut self) -> PlayerState<S> {
        self.animation = self.animation.play(S::row(&self.config));
        PlayerState {
            context: self,
            _state: S::marker(),
        }
    }
}
