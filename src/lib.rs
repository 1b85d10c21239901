use wasm_bindgen::prelude::*;

#[macro_use]
pub mod browser;
pub mod config;
pub mod engine;
pub mod game;
pub mod sprite;

use crate::engine::GameLoop;
use crate::game::Runner;

/// Main entry for the WebAssembly module
/// - installs the panic hook
/// - waits for the start button, or starts right away on pages without one
#[wasm_bindgen(start)]
pub fn main_js() -> Result<(), JsValue> {
    // readable panic messages in the console
    console_error_panic_hook::set_once();

    let waiting = browser::on_first_click(browser::html::START_BUTTON_ID, start_game)
        .map_err(|err| JsValue::from_str(&format!("{:#}", err)))?;
    if !waiting {
        log!("No #{} button, starting now", browser::html::START_BUTTON_ID);
        start_game();
    }

    Ok(())
}

/// Load everything and run frames until the game is over. Reload the page to
/// play again.
#[wasm_bindgen]
pub fn start_game() {
    browser::spawn_local(async move {
        if let Err(err) = GameLoop::start(Runner::new()).await {
            error!("Could not start game loop: {:#}", err);
        }
    });
}
