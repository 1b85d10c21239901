use crate::browser;
use anyhow::{anyhow, Error, Result};
use async_trait::async_trait;
use futures::channel::oneshot::channel;
use serde::{Deserialize, Serialize};
// single threaded wasm, so Rc RefCell instead of Arc Mutex
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::{
    // unchecked_ref casts the closure into a js Function, we built the
    // closure ourselves so the expected type is known
    JsCast,
    JsValue,
};
use web_sys::{CanvasRenderingContext2d, HtmlImageElement, HtmlInputElement};

use self::input::KeyState;

/// Where a session is after a step.
///
/// `GameOver` is terminal, nothing brings a session back to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    GameOver,
}

#[async_trait(?Send)]
pub trait Game {
    async fn initialize(&self) -> Result<Box<dyn Game>>;
    /// Advance one animation frame. `timestamp` is in milliseconds since the
    /// loop started, frame 0 is `0.0`.
    fn step(&mut self, timestamp: f64, keystate: &KeyState, renderer: &Renderer) -> Phase;
}

/// Drives a [`Game`] with `requestAnimationFrame` until it reports
/// [`Phase::GameOver`].
///
/// Unlike a fixed step loop every frame is stepped exactly once with the
/// measured timestamp, timers inside the game consume the real delta.
pub struct GameLoop {
    started_at: f64,
}

type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

impl GameLoop {
    pub async fn start(game: impl Game + 'static) -> Result<()> {
        let mut keyevent_receiver = input::prepare_input()?;
        let mut game = game.initialize().await?;
        let mut keystate = KeyState::new();
        let renderer = Renderer::new(browser::context()?);
        let game_loop = GameLoop {
            started_at: browser::now()?,
        };

        input::process_input(&mut keystate, &mut keyevent_receiver);
        if game.step(0.0, &keystate, &renderer) == Phase::GameOver {
            return Ok(());
        }

        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            input::process_input(&mut keystate, &mut keyevent_receiver);
            let timestamp = game_loop.timestamp(perf);
            if game.step(timestamp, &keystate, &renderer) == Phase::GameOver {
                // no more frames, the closure stays parked in `f`
                return;
            }
            if let Some(closure) = f.borrow().as_ref() {
                if let Err(err) = browser::request_animation_frame(closure) {
                    error!("GameLoop: {:#}", err);
                }
            }
        }));

        browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: Loop is None"))?,
        )?;

        Ok(())
    }

    // rAF hands out the frame start time which can predate `started_at`
    fn timestamp(&self, perf: f64) -> f64 {
        (perf - self.started_at).max(0.0)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn distance(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Rect {
    pub position: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(position: Point, size: Size) -> Self {
        Rect { position, size }
    }

    pub fn from_x_y(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect::new(Point { x, y }, Size { width, height })
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }
}

/// Hit area used for every collision check in the game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

impl Circle {
    /// Touching circles do not collide, the distance has to be strictly
    /// smaller than the sum of the radii.
    pub fn intersects(&self, other: &Circle) -> bool {
        self.center.distance(other.center) < self.radius + other.radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

impl Align {
    fn as_str(&self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
        }
    }
}

/// One line of HUD text.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub position: Point,
    pub color: &'static str,
    pub font: &'static str,
    pub align: Align,
}

/// Sprite sheets the game blits from. The images themselves live behind the
/// [`Draw`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageAsset {
    Player,
    Enemy,
    Background,
}

/// Everything a frame needs to put on screen.
///
/// Entities only describe what to draw, the browser canvas ([`Canvas`]) and
/// the test recorder decide how.
pub trait Draw {
    fn clear(&mut self, area: &Rect);
    fn draw_sprite(&mut self, image: ImageAsset, frame: &Rect, destination: &Rect);
    fn draw_label(&mut self, label: &Label);
    /// Mirror the score into the page's score display.
    fn show_score(&mut self, score: u32);
}

pub struct Renderer {
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn new(context: CanvasRenderingContext2d) -> Self {
        Renderer { context }
    }

    pub fn clear(&self, rect: &Rect) {
        self.context
            .clear_rect(rect.x(), rect.y(), rect.width(), rect.height());
    }

    pub fn draw_image(
        &self,
        image: &HtmlImageElement,
        frame: &Rect,
        destination: &Rect,
    ) -> Result<()> {
        self.context
            .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                image,
                frame.x(),
                frame.y(),
                frame.width(),
                frame.height(),
                destination.x(),
                destination.y(),
                destination.width(),
                destination.height(),
            )
            .map_err(|err| anyhow!("Could not draw image : {:#?}", err))
    }

    pub fn draw_text(&self, label: &Label) -> Result<()> {
        self.context.set_font(label.font);
        self.context.set_text_align(label.align.as_str());
        self.context.set_fill_style_str(label.color);
        self.context
            .fill_text(&label.text, label.position.x, label.position.y)
            .map_err(|err| anyhow!("Could not draw text '{}' : {:#?}", label.text, err))
    }
}

/// Loaded sprite sheets, one per [`ImageAsset`].
pub struct Assets {
    pub player: HtmlImageElement,
    pub enemy: HtmlImageElement,
    pub background: HtmlImageElement,
}

impl Assets {
    fn image(&self, asset: ImageAsset) -> &HtmlImageElement {
        match asset {
            ImageAsset::Player => &self.player,
            ImageAsset::Enemy => &self.enemy,
            ImageAsset::Background => &self.background,
        }
    }
}

/// [`Draw`] on the browser canvas for the length of one frame.
pub struct Canvas<'a> {
    pub renderer: &'a Renderer,
    pub assets: &'a Assets,
    pub score_display: Option<&'a HtmlInputElement>,
}

impl Draw for Canvas<'_> {
    fn clear(&mut self, area: &Rect) {
        self.renderer.clear(area);
    }

    fn draw_sprite(&mut self, image: ImageAsset, frame: &Rect, destination: &Rect) {
        if let Err(err) = self
            .renderer
            .draw_image(self.assets.image(image), frame, destination)
        {
            error!("{:?}: {:#}", image, err);
        }
    }

    fn draw_label(&mut self, label: &Label) {
        if let Err(err) = self.renderer.draw_text(label) {
            error!("{:#}", err);
        }
    }

    fn show_score(&mut self, score: u32) {
        if let Some(display) = self.score_display {
            display.set_value(&score.to_string());
        }
    }
}

/// Asynchronously load an image from a given source path
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::new_image()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let source_name = source.to_string();
    let error_callback = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!(
                "Error loading image {}: {:#?}",
                source_name,
                err
            )));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callbacks alive until the image loads or fails
    success_callback.forget();
    error_callback.forget();

    // Result<Result<(), Error>, oneshot::Canceled>
    // - first ? is the channel
    // - second ? is the load itself
    rx.await??;

    Ok(image)
}

pub mod input {
    use crate::browser;
    use anyhow::Result;
    use futures::channel::mpsc::{unbounded, UnboundedReceiver};
    use wasm_bindgen::JsCast;

    /// The only keys the game listens to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ArrowKey {
        Up,
        Down,
        Left,
        Right,
    }

    impl ArrowKey {
        /// Maps a `KeyboardEvent.key` value, `None` for anything else.
        pub fn from_key(key: &str) -> Option<Self> {
            match key {
                "ArrowUp" => Some(ArrowKey::Up),
                "ArrowDown" => Some(ArrowKey::Down),
                "ArrowLeft" => Some(ArrowKey::Left),
                "ArrowRight" => Some(ArrowKey::Right),
                _ => None,
            }
        }
    }

    #[derive(Debug)]
    pub enum KeyPress {
        KeyDown(String),
        KeyUp(String),
    }

    /// Arrow keys currently held, in the order they went down.
    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    pub struct KeyState {
        held: Vec<ArrowKey>,
    }

    impl KeyState {
        pub fn new() -> Self {
            KeyState { held: Vec::new() }
        }

        pub fn is_pressed(&self, key: ArrowKey) -> bool {
            self.held.contains(&key)
        }

        pub fn held(&self) -> &[ArrowKey] {
            &self.held
        }

        pub fn set_pressed(&mut self, key: &str) {
            if let Some(key) = ArrowKey::from_key(key) {
                if !self.is_pressed(key) {
                    self.held.push(key);
                }
            }
        }

        pub fn set_released(&mut self, key: &str) {
            if let Some(key) = ArrowKey::from_key(key) {
                self.held.retain(|held| *held != key);
            }
        }
    }

    /// Hook `keydown`/`keyup` on the window and forward every key into a
    /// channel drained once per frame by [`process_input`].
    pub fn prepare_input() -> Result<UnboundedReceiver<KeyPress>> {
        let (keydown_sender, keyevent_receiver) = unbounded();
        let keyup_sender = keydown_sender.clone();

        let onkeydown = browser::closure_wrap(Box::new(move |event: web_sys::KeyboardEvent| {
            let _ = keydown_sender.unbounded_send(KeyPress::KeyDown(event.key()));
        }) as Box<dyn FnMut(web_sys::KeyboardEvent)>);

        let onkeyup = browser::closure_wrap(Box::new(move |event: web_sys::KeyboardEvent| {
            let _ = keyup_sender.unbounded_send(KeyPress::KeyUp(event.key()));
        }) as Box<dyn FnMut(web_sys::KeyboardEvent)>);

        let window = browser::window()?;
        window.set_onkeydown(Some(onkeydown.as_ref().unchecked_ref()));
        window.set_onkeyup(Some(onkeyup.as_ref().unchecked_ref()));
        onkeydown.forget();
        onkeyup.forget();

        Ok(keyevent_receiver)
    }

    pub fn process_input(state: &mut KeyState, keyevent_receiver: &mut UnboundedReceiver<KeyPress>) {
        // Err means the channel is empty for now, Ok(None) that it closed
        while let Ok(Some(event)) = keyevent_receiver.try_next() {
            match event {
                KeyPress::KeyDown(key) => state.set_pressed(&key),
                KeyPress::KeyUp(key) => state.set_released(&key),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use futures::channel::mpsc::unbounded;

        #[test]
        fn tracks_arrow_keys_in_press_order_without_duplicates() {
            let mut state = KeyState::new();
            state.set_pressed("ArrowRight");
            state.set_pressed("ArrowUp");
            state.set_pressed("ArrowRight");

            assert_eq!(state.held(), &[ArrowKey::Right, ArrowKey::Up]);
        }

        #[test]
        fn ignores_keys_that_are_not_arrows() {
            let mut state = KeyState::new();
            state.set_pressed("Space");
            state.set_pressed("a");
            state.set_released("Escape");

            assert!(state.held().is_empty());
        }

        #[test]
        fn releasing_removes_only_that_key() {
            let mut state = KeyState::new();
            state.set_pressed("ArrowLeft");
            state.set_pressed("ArrowUp");
            state.set_released("ArrowLeft");
            state.set_released("ArrowDown");

            assert!(!state.is_pressed(ArrowKey::Left));
            assert!(state.is_pressed(ArrowKey::Up));
            assert_eq!(state.held().len(), 1);
        }

        #[test]
        fn process_input_applies_queued_events_in_order() {
            let (sender, mut receiver) = unbounded();
            sender.unbounded_send(KeyPress::KeyDown("ArrowUp".into())).unwrap();
            sender.unbounded_send(KeyPress::KeyDown("ArrowLeft".into())).unwrap();
            sender.unbounded_send(KeyPress::KeyUp("ArrowUp".into())).unwrap();

            let mut state = KeyState::new();
            process_input(&mut state, &mut receiver);

            assert_eq!(state.held(), &[ArrowKey::Left]);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn distance_is_euclidean() {
        let a = Point { x: 0.0, y: 0.0 };
        let b = Point { x: 3.0, y: 4.0 };
        assert_relative_eq!(a.distance(b), 5.0);
    }

    #[test]
    fn overlapping_circles_intersect() {
        let a = Circle {
            center: Point { x: 100.0, y: 100.0 },
            radius: 50.0,
        };
        let b = Circle {
            center: Point { x: 160.0, y: 100.0 },
            radius: 20.0,
        };
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn touching_or_apart_circles_do_not_intersect() {
        let a = Circle {
            center: Point { x: 0.0, y: 0.0 },
            radius: 30.0,
        };
        let touching = Circle {
            center: Point { x: 0.0, y: 50.0 },
            radius: 20.0,
        };
        let apart = Circle {
            center: Point { x: 400.0, y: 300.0 },
            radius: 20.0,
        };
        assert!(!a.intersects(&touching));
        assert!(!a.intersects(&apart));
    }

    #[test]
    fn timestamps_are_relative_to_loop_start() {
        let game_loop = GameLoop { started_at: 1200.0 };
        assert_relative_eq!(game_loop.timestamp(1216.0), 16.0);
        assert_relative_eq!(game_loop.timestamp(1190.0), 0.0);
    }
}
