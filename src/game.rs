use crate::browser;
use crate::config::{BackgroundConfig, GameConfig, SpawnConfig, SpawnOffset};
use crate::engine::input::KeyState;
use crate::engine::{
    self, Align, Assets, Canvas, Draw, Game, ImageAsset, Label, Phase, Point, Rect, Renderer,
    Size,
};
use crate::sprite::enemy::Enemy;
use crate::sprite::player::Player;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::join;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use web_sys::{HtmlImageElement, HtmlInputElement};

/// ┌──────────────────────── Frame Sequence ─────────────────────────┐
/// │                                                                 │
/// │  GameLoop (engine.rs)      Runner (game.rs)    Session::step    │
/// │  rAF(timestamp) ─────────► step() ───────────► 1. delta         │
/// │  KeyState drained                              2. clear         │
/// │                                                3. background    │
/// │                                                4. player        │
/// │                                                5. enemies       │
/// │                                                6. HUD           │
/// │  next rAF ◄──── Phase::Running ◄──────────────────┘             │
/// │  stop     ◄──── Phase::GameOver                                 │
/// └─────────────────────────────────────────────────────────────────┘
pub enum Runner {
    /// Assets and config still have to be fetched.
    Loading,

    /// Everything is loaded, frames can be stepped.
    Loaded(Box<Play>),
}

pub struct Play {
    session: Session,
    assets: Assets,
    score_display: Option<HtmlInputElement>,
}

impl Runner {
    pub fn new() -> Self {
        Runner::Loading
    }

    async fn load_config() -> GameConfig {
        let config = browser::fetch_json::<serde_json::Value>(GameConfig::PATH)
            .await
            .and_then(GameConfig::from_json);
        match config {
            Ok(config) => config,
            Err(err) => {
                log!(
                    "No usable {} ({:#}), playing the default layout",
                    GameConfig::PATH,
                    err
                );
                GameConfig::default()
            }
        }
    }

    async fn load_sprite(source: &str) -> Result<HtmlImageElement> {
        engine::load_image(source)
            .await
            .with_context(|| format!("Failed to load sprite sheet from : {}", source))
    }
}

impl Default for Runner {
    fn default() -> Self {
        Runner::new()
    }
}

#[async_trait(?Send)]
impl Game for Runner {
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            Runner::Loading => {
                let config = Self::load_config().await;
                config.validate().context("Invalid game configuration")?;

                let (player, enemy, background) = join!(
                    Self::load_sprite(&config.assets.player),
                    Self::load_sprite(&config.assets.enemy),
                    Self::load_sprite(&config.assets.background),
                );
                let assets = Assets {
                    player: player?,
                    enemy: enemy?,
                    background: background?,
                };

                // validate() only lets whole pixel sizes through
                browser::resize_canvas(config.canvas.width as u32, config.canvas.height as u32)?;
                let score_display = browser::score_display()?;
                if score_display.is_none() {
                    log!("No #{} element, score only shown on the canvas", browser::html::SCORE_DISPLAY_ID);
                }

                log!(
                    "Starting a {}x{} run",
                    config.canvas.width,
                    config.canvas.height
                );
                Ok(Box::new(Runner::Loaded(Box::new(Play {
                    session: Session::new(config),
                    assets,
                    score_display,
                }))))
            }
            Runner::Loaded(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn step(&mut self, timestamp: f64, keystate: &KeyState, renderer: &Renderer) -> Phase {
        match self {
            Runner::Loaded(play) => {
                let mut canvas = Canvas {
                    renderer,
                    assets: &play.assets,
                    score_display: play.score_display.as_ref(),
                };
                play.session.step(timestamp, keystate, &mut canvas)
            }
            Runner::Loading => {
                error!("Frame requested before the game finished loading");
                Phase::GameOver
            }
        }
    }
}

/// Score and the game over flag, shared by everything updated in a frame.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GameState {
    score: u32,
    game_over: bool,
}

impl GameState {
    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_over(&self) -> bool {
        self.game_over
    }

    pub fn award_point(&mut self) {
        self.score += 1;
    }

    /// One way, a finished game stays finished.
    pub fn end(&mut self) {
        if !self.game_over {
            self.game_over = true;
            log!("GAME OVER, final score {}", self.score);
        }
    }

    pub fn phase(&self) -> Phase {
        if self.game_over {
            Phase::GameOver
        } else {
            Phase::Running
        }
    }
}

/// Endless backdrop, drawn twice side by side and reset after one width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Background {
    x: f64,
    size: Size,
    speed: f64,
}

impl Background {
    pub fn new(config: &BackgroundConfig) -> Self {
        Background {
            x: 0.0,
            size: config.size,
            speed: config.speed,
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn update(&mut self) {
        self.x -= self.speed;
        if self.x <= -self.size.width {
            self.x = 0.0;
        }
    }

    pub fn draw(&self, surface: &mut dyn Draw) {
        let frame = Rect::new(Point::default(), self.size);
        // second copy overlaps by `speed` so no seam shows while it catches up
        for x in [self.x, self.x + self.size.width - self.speed] {
            surface.draw_sprite(
                ImageAsset::Background,
                &frame,
                &Rect::new(Point { x, y: 0.0 }, self.size),
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Offset {
    Reroll { min: f64, spread: f64 },
    Fixed(f64),
}

/// Decides when the next enemy appears.
///
/// The timer only grows on frames that do not spawn, and goes back to 0 on
/// the frame that does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemySpawner {
    timer: f64,
    interval: f64,
    offset: Offset,
}

impl EnemySpawner {
    pub fn new<R: Rng + ?Sized>(config: &SpawnConfig, rng: &mut R) -> Self {
        let offset = match config.offset {
            SpawnOffset::PerCheck { min, spread } => Offset::Reroll { min, spread },
            SpawnOffset::PerGame { min, spread } => Offset::Fixed(min + rng.gen::<f64>() * spread),
        };
        EnemySpawner {
            timer: 0.0,
            interval: config.interval,
            offset,
        }
    }

    pub fn timer(&self) -> f64 {
        self.timer
    }

    /// `true` when an enemy should spawn this frame.
    pub fn update<R: Rng + ?Sized>(&mut self, delta: f64, rng: &mut R) -> bool {
        let offset = match self.offset {
            Offset::Reroll { min, spread } => min + rng.gen::<f64>() * spread,
            Offset::Fixed(offset) => offset,
        };
        if self.timer > self.interval + offset {
            self.timer = 0.0;
            true
        } else {
            self.timer += delta;
            false
        }
    }
}

const HUD_FONT: &str = "40px Helvetica";
const SHADOW_OFFSET: f64 = 2.0;
const GAME_OVER_Y: f64 = 200.0;

/// One run, from the first frame to the collision that ends it.
///
/// Owns everything the frame callback mutates, nothing here is global.
pub struct Session {
    config: GameConfig,
    background: Background,
    player: Player,
    enemies: Vec<Enemy>,
    spawner: EnemySpawner,
    state: GameState,
    last_timestamp: f64,
    rng: StdRng,
}

impl Session {
    pub fn new(config: GameConfig) -> Self {
        Session::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: GameConfig, mut rng: StdRng) -> Self {
        Session {
            background: Background::new(&config.background),
            player: Player::new(&config),
            enemies: Vec::new(),
            spawner: EnemySpawner::new(&config.spawn, &mut rng),
            state: GameState::default(),
            last_timestamp: 0.0,
            rng,
            config,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn spawner(&self) -> &EnemySpawner {
        &self.spawner
    }

    /// Run one frame at `timestamp` (ms, frame 0 is 0.0).
    ///
    /// A finished session draws nothing and keeps answering `GameOver`.
    pub fn step(&mut self, timestamp: f64, keystate: &KeyState, surface: &mut dyn Draw) -> Phase {
        if self.state.is_over() {
            return Phase::GameOver;
        }
        let delta = timestamp - self.last_timestamp;
        self.last_timestamp = timestamp;

        surface.clear(&Rect::new(Point::default(), self.config.canvas));
        self.background.draw(surface);
        self.background.update();
        self.player.draw(surface);
        self.player
            .update(keystate, delta, &self.enemies, &mut self.state);
        self.handle_enemies(delta, surface);
        self.display_status(surface);

        self.state.phase()
    }

    fn handle_enemies(&mut self, delta: f64, surface: &mut dyn Draw) {
        if self.spawner.update(delta, &mut self.rng) {
            self.enemies.push(Enemy::spawn(&self.config, &mut self.rng));
        }
        for enemy in self.enemies.iter_mut() {
            enemy.draw(surface);
            enemy.update(delta, &mut self.state);
        }
        self.enemies.retain(|enemy| !enemy.is_marked_for_deletion());
    }

    fn display_status(&self, surface: &mut dyn Draw) {
        let score = format!("Score: {}", self.state.score());
        draw_shadowed(surface, &score, Point { x: 20.0, y: 50.0 }, Align::Left);

        if self.state.is_over() {
            draw_shadowed(
                surface,
                "GAME OVER",
                Point {
                    x: self.config.canvas.width / 2.0,
                    y: GAME_OVER_Y,
                },
                Align::Center,
            );
        }

        surface.show_score(self.state.score());
    }
}

/// Black text with a white copy 2px down and right on top of it.
fn draw_shadowed(surface: &mut dyn Draw, text: &str, position: Point, align: Align) {
    for (color, offset) in [("black", 0.0), ("white", SHADOW_OFFSET)] {
        surface.draw_label(&Label {
            text: text.to_string(),
            position: Point {
                x: position.x + offset,
                y: position.y + offset,
            },
            color,
            font: HUD_FONT,
            align,
        });
    }
}
