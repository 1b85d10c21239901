use crate::config::GameConfig;
use crate::engine::input::{ArrowKey, KeyState};
use crate::engine::{Circle, Draw, ImageAsset, Point, Rect};
use crate::game::GameState;
use crate::sprite::enemy::Enemy;
use crate::sprite::state::{Bounds, Controls, Footing, PlayerContext, PlayerState};
use crate::sprite::{Jumping, Running, SpriteSheet};

/// ┌──────────────── State Transition Flow ──────────────────┐
/// │  From State  →  After update        →  To State         │
/// ├─────────────────────────────────────────────────────────┤
/// │  Running     →  still on the ground →  Running          │
/// │  Running     →  left the ground     →  Jumping          │
/// │  Jumping     →  still in the air    →  Jumping          │
/// │  Jumping     →  back on the ground  →  Running          │
/// └─────────────────────────────────────────────────────────┘
#[derive(Debug, Copy, Clone)]
enum PlayerStateMachine {
    Running(PlayerState<Running>),
    Jumping(PlayerState<Jumping>),
}

impl From<PlayerState<Running>> for PlayerStateMachine {
    fn from(state: PlayerState<Running>) -> Self {
        PlayerStateMachine::Running(state)
    }
}

impl From<PlayerState<Jumping>> for PlayerStateMachine {
    fn from(state: PlayerState<Jumping>) -> Self {
        PlayerStateMachine::Jumping(state)
    }
}

impl From<Footing> for PlayerStateMachine {
    fn from(footing: Footing) -> Self {
        match footing {
            Footing::Grounded(running_state) => running_state.into(),
            Footing::Airborne(jumping_state) => jumping_state.into(),
        }
    }
}

impl PlayerStateMachine {
    // consumes the old state, nothing can touch it after the transition
    fn update(self, controls: Controls, delta: f64) -> Self {
        match self {
            PlayerStateMachine::Running(state) => state.update(controls, delta).into(),
            PlayerStateMachine::Jumping(state) => state.update(controls, delta).into(),
        }
    }

    fn context(&self) -> &PlayerContext {
        match self {
            PlayerStateMachine::Running(state) => state.context(),
            PlayerStateMachine::Jumping(state) => state.context(),
        }
    }
}

pub struct Player {
    state: PlayerStateMachine,
    sheet: SpriteSheet,
}

impl Player {
    pub fn new(config: &GameConfig) -> Self {
        let size = config.player.size;
        let bounds = Bounds {
            left: config.player.left_bound,
            right: config.canvas.width - size.width,
            floor: config.player_floor(),
        };
        Player {
            state: PlayerState::new(config.player, bounds).into(),
            sheet: SpriteSheet::new(size),
        }
    }

    /// One frame: collide, animate, move.
    ///
    /// Any enemy overlapping the hit circle ends the game, the player still
    /// finishes its move for this frame.
    pub fn update(
        &mut self,
        keystate: &KeyState,
        delta: f64,
        enemies: &[Enemy],
        game_state: &mut GameState,
    ) {
        let hit_circle = self.hit_circle();
        if enemies
            .iter()
            .any(|enemy| enemy.hit_circle().intersects(&hit_circle))
        {
            game_state.end();
        }

        let controls = Controls {
            left: keystate.is_pressed(ArrowKey::Left),
            right: keystate.is_pressed(ArrowKey::Right),
            jump: keystate.is_pressed(ArrowKey::Up),
        };
        self.state = self.state.update(controls, delta);
    }

    pub fn draw(&self, surface: &mut dyn Draw) {
        let animation = self.state.context().animation;
        let frame = self.sheet.frame(animation.frame_x(), animation.frame_y());
        surface.draw_sprite(
            ImageAsset::Player,
            &frame,
            &Rect::new(self.position(), self.sheet.frame_size()),
        );
    }

    pub fn hit_circle(&self) -> Circle {
        let context = self.state.context();
        let hitbox = context.config.hitbox;
        Circle {
            center: Point {
                x: context.position.x + hitbox.offset.x,
                y: context.position.y + hitbox.offset.y,
            },
            radius: hitbox.radius,
        }
    }

    pub fn position(&self) -> Point {
        self.state.context().position
    }

    pub fn speed(&self) -> f64 {
        self.state.context().speed
    }

    pub fn velocity_y(&self) -> f64 {
        self.state.context().vy
    }

    pub fn on_ground(&self) -> bool {
        self.state.context().on_ground()
    }

    pub fn is_jumping(&self) -> bool {
        matches!(self.state, PlayerStateMachine::Jumping(_))
    }

    pub fn frame(&self) -> (u8, u8) {
        let animation = self.state.context().animation;
        (animation.frame_x(), animation.frame_y())
    }

    #[cfg(test)]
    fn place_at(&mut self, position: Point) {
        match &mut self.state {
            PlayerStateMachine::Running(state) => state.move_to(position),
            PlayerStateMachine::Jumping(state) => state.move_to(position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const FRAME: f64 = 16.0;

    fn keys(pressed: &[&str]) -> KeyState {
        let mut keystate = KeyState::new();
        for key in pressed {
            keystate.set_pressed(key);
        }
        keystate
    }

    fn step(player: &mut Player, keystate: &KeyState) -> GameState {
        let mut game_state = GameState::default();
        player.update(keystate, FRAME, &[], &mut game_state);
        game_state
    }

    #[test]
    fn idle_player_stays_on_the_floor_and_cycles_running_frames() {
        let config = GameConfig::classic();
        let mut player = Player::new(&config);
        let floor = config.player_floor();
        let mut frames = vec![];

        for _ in 0..36 {
            step(&mut player, &KeyState::new());
            assert_relative_eq!(player.position().y, floor);
            assert_relative_eq!(player.speed(), 0.0);
            assert!(!player.is_jumping());
            frames.push(player.frame().0);
        }

        // 50ms per frame at 16ms a tick, so a new column every 4th tick
        let expected: Vec<u8> = (1..=36).map(|tick| ((tick / 4) % 9) as u8).collect();
        assert_eq!(frames, expected);
        assert_eq!(player.frame(), (0, 0));
    }

    #[test]
    fn jump_applies_impulse_once_then_gravity_until_landing() {
        let config = GameConfig::wide();
        let mut player = Player::new(&config);
        let start_y = player.position().y;

        step(&mut player, &keys(&["ArrowUp"]));
        assert_relative_eq!(player.position().y, start_y - 32.0);
        // gravity already applied once in the same frame
        assert_relative_eq!(player.velocity_y(), -31.0);
        assert!(player.is_jumping());
        assert!(!player.on_ground());
        assert_eq!(player.frame().1, config.player.jumping.row);

        let mut previous_vy = player.velocity_y();
        let mut frames = 1;
        while player.is_jumping() {
            step(&mut player, &KeyState::new());
            frames += 1;
            if player.is_jumping() {
                assert_relative_eq!(player.velocity_y(), previous_vy + 1.0);
                previous_vy = player.velocity_y();
            }
            assert!(frames < 200, "player never landed");
        }

        assert_eq!(frames, 65);
        assert!(player.on_ground());
        assert_relative_eq!(player.velocity_y(), 0.0);
        assert_relative_eq!(player.position().y, start_y);
        assert_eq!(player.frame(), (0, config.player.running.row));
    }

    #[test]
    fn holding_up_in_the_air_does_not_jump_again() {
        let mut player = Player::new(&GameConfig::wide());
        let up = keys(&["ArrowUp"]);
        step(&mut player, &up);
        step(&mut player, &up);
        assert_relative_eq!(player.velocity_y(), -30.0);
    }

    #[test]
    fn horizontal_speed_follows_arrows_with_right_winning() {
        let mut player = Player::new(&GameConfig::classic());

        step(&mut player, &keys(&["ArrowRight"]));
        assert_relative_eq!(player.speed(), 5.0);
        assert_relative_eq!(player.position().x, 5.0);

        step(&mut player, &keys(&["ArrowLeft"]));
        assert_relative_eq!(player.speed(), -5.0);
        assert_relative_eq!(player.position().x, 0.0);

        step(&mut player, &keys(&["ArrowLeft", "ArrowRight"]));
        assert_relative_eq!(player.speed(), 5.0);
    }

    #[test]
    fn stays_inside_horizontal_bounds() {
        let config = GameConfig::wide();
        let mut player = Player::new(&config);

        for _ in 0..10 {
            step(&mut player, &keys(&["ArrowLeft"]));
            assert_relative_eq!(player.position().x, config.player.left_bound);
        }

        let right = keys(&["ArrowRight"]);
        for _ in 0..400 {
            step(&mut player, &right);
            assert!(player.position().x <= config.canvas.width - config.player.size.width);
        }
        assert_relative_eq!(
            player.position().x,
            config.canvas.width - config.player.size.width
        );
    }

    #[test]
    fn never_leaves_the_canvas_vertically() {
        // 200px tall player on a 720px canvas jumps higher than the floor
        let config = GameConfig::classic();
        let mut player = Player::new(&config);
        let up = keys(&["ArrowUp", "ArrowRight"]);

        for _ in 0..500 {
            step(&mut player, &up);
            let y = player.position().y;
            assert!((0.0..=config.player_floor()).contains(&y), "y = {}", y);
        }
    }

    #[test]
    fn overlapping_enemy_ends_the_game() {
        let config = GameConfig::classic();
        let mut player = Player::new(&config);
        let center = player.hit_circle().center;
        let enemy = Enemy::new(
            &config.enemy,
            Point {
                x: center.x - config.enemy.hitbox.offset.x,
                y: center.y - config.enemy.hitbox.offset.y,
            },
            8.0,
        );

        let mut game_state = GameState::default();
        player.update(&KeyState::new(), FRAME, &[enemy], &mut game_state);
        assert!(game_state.is_over());
    }

    #[test]
    fn distant_enemy_is_harmless() {
        let config = GameConfig::classic();
        let mut player = Player::new(&config);
        let enemy = Enemy::new(
            &config.enemy,
            Point {
                x: config.canvas.width,
                y: config.canvas.height - config.enemy.size.height,
            },
            8.0,
        );

        let mut game_state = GameState::default();
        player.update(&KeyState::new(), FRAME, &[enemy], &mut game_state);
        assert!(!game_state.is_over());
    }

    #[test]
    fn collision_is_decided_by_circle_distance() {
        let config = GameConfig::wide();
        let mut player = Player::new(&config);
        player.place_at(Point { x: 300.0, y: 600.0 });
        let player_circle = player.hit_circle();
        let reach = player_circle.radius + config.enemy.hitbox.radius;

        for (gap, expect_hit) in [(reach - 1.0, true), (reach + 0.5, false), (reach + 40.0, false)] {
            let enemy = Enemy::new(
                &config.enemy,
                Point {
                    x: player_circle.center.x + gap - config.enemy.hitbox.offset.x,
                    y: player_circle.center.y - config.enemy.hitbox.offset.y,
                },
                8.0,
            );
            let mut game_state = GameState::default();
            let mut probe = Player::new(&config);
            probe.place_at(Point { x: 300.0, y: 600.0 });
            probe.update(&KeyState::new(), FRAME, &[enemy], &mut game_state);
            assert_eq!(game_state.is_over(), expect_hit, "gap {}", gap);
        }
    }

    #[test]
    fn draws_the_current_frame_at_the_player_position() {
        use crate::engine::testing::RecordingSurface;

        let config = GameConfig::classic();
        let mut player = Player::new(&config);
        for _ in 0..8 {
            step(&mut player, &KeyState::new());
        }
        let mut surface = RecordingSurface::default();
        player.draw(&mut surface);

        let sprites = surface.sprites(ImageAsset::Player);
        assert_eq!(sprites.len(), 1);
        let (frame, destination) = sprites[0];
        assert_eq!(frame, Rect::from_x_y(400.0, 0.0, 200.0, 200.0));
        assert_eq!(destination, Rect::from_x_y(0.0, 520.0, 200.0, 200.0));
    }
}
