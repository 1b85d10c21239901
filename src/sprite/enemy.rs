use crate::config::{AnimationRow, EnemyConfig, GameConfig, HitCircle};
use crate::engine::{Circle, Draw, ImageAsset, Point, Rect};
use crate::game::GameState;
use crate::sprite::{Animation, SpriteSheet};
use rand::Rng;

/// Scrolls from the right edge to the left one. Once fully off screen it is
/// marked for deletion, scores a point and waits to be pruned.
#[derive(Debug, Clone)]
pub struct Enemy {
    position: Point,
    speed: f64,
    animation: Animation,
    sheet: SpriteSheet,
    hitbox: HitCircle,
    marked_for_deletion: bool,
}

impl Enemy {
    pub fn new(config: &EnemyConfig, position: Point, speed: f64) -> Self {
        Enemy {
            position,
            speed,
            animation: Animation::new(
                config.fps,
                AnimationRow {
                    row: 0,
                    max_frame: config.max_frame,
                },
            ),
            sheet: SpriteSheet::new(config.size),
            hitbox: config.hitbox,
            marked_for_deletion: false,
        }
    }

    /// Just past the right edge, lane and speed rolled from `rng`.
    pub fn spawn<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Self {
        let enemy = &config.enemy;
        let lift = rng.gen::<f64>() * enemy.vertical_jitter;
        let speed = enemy.speed.min + rng.gen::<f64>() * enemy.speed.spread;
        Enemy::new(
            enemy,
            Point {
                x: config.canvas.width,
                y: config.canvas.height - enemy.size.height - lift,
            },
            speed,
        )
    }

    pub fn update(&mut self, delta: f64, game_state: &mut GameState) {
        self.animation = self.animation.tick(delta);
        self.position.x -= self.speed;
        if !self.marked_for_deletion && self.position.x <= -self.sheet.frame_size().width {
            self.marked_for_deletion = true;
            game_state.award_point();
        }
    }

    pub fn draw(&self, surface: &mut dyn Draw) {
        let frame = self
            .sheet
            .frame(self.animation.frame_x(), self.animation.frame_y());
        surface.draw_sprite(
            ImageAsset::Enemy,
            &frame,
            &Rect::new(self.position, self.sheet.frame_size()),
        );
    }

    pub fn hit_circle(&self) -> Circle {
        Circle {
            center: Point {
                x: self.position.x + self.hitbox.offset.x,
                y: self.position.y + self.hitbox.offset.y,
            },
            radius: self.hitbox.radius,
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn is_marked_for_deletion(&self) -> bool {
        self.marked_for_deletion
    }
}
