use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use std::future::Future;
use wasm_bindgen::closure::{Closure, WasmClosure, WasmClosureFnOnce};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

#[rustfmt::skip]
use web_sys::{
    CanvasRenderingContext2d,
    Document,
    HtmlCanvasElement,
    HtmlElement,
    HtmlImageElement,
    HtmlInputElement,
    Response,
    Window,
};

/// Print to the browser console (stderr when running natively).
macro_rules! log {
    ($($t:tt)*) => {
        $crate::browser::log(&format!($($t)*))
    }
}

/// Same as `log!` but through `console.error`.
macro_rules! error {
    ($($t:tt)*) => {
        $crate::browser::error(&format!($($t)*))
    }
}

// ==================== Constants ====================
// Constants related to HTML elements
pub mod html {
    pub const CANVAS_ID: &str = "canvas1";
    pub const CONTEXT_2D: &str = "2d";
    pub const START_BUTTON_ID: &str = "start";
    pub const SCORE_DISPLAY_ID: &str = "player-points";
}

pub type LoopClosure = Closure<dyn FnMut(f64)>;

pub fn log(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    eprintln!("{message}");
}

pub fn error(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::error_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    eprintln!("ERROR {message}");
}

pub fn new_image() -> Result<HtmlImageElement> {
    HtmlImageElement::new().map_err(|err| anyhow!("Could not create image element : {:#?}", err))
}

pub fn context() -> Result<CanvasRenderingContext2d> {
    canvas()?
        .get_context(html::CONTEXT_2D)
        // Result<Option<Object>, JsValue>
        // - JsValue error becomes anyhow
        // - None becomes an error too
        .map_err(|js_value| anyhow!("Error getting context : {:#?}", js_value))?
        .ok_or_else(|| anyhow!("No 2d context found"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|element| {
            anyhow!(
                "Error converting {:#?} to CanvasRenderingContext2d",
                element
            )
        })
}

pub fn canvas() -> Result<HtmlCanvasElement> {
    document()?
        .get_element_by_id(html::CANVAS_ID)
        .ok_or_else(|| anyhow!("No Canvas Element found with ID : '{}'", html::CANVAS_ID))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlCanvasElement", element))
}

/// Canvas dimensions are fixed for the whole session, set once at start.
pub fn resize_canvas(width: u32, height: u32) -> Result<()> {
    let canvas = canvas()?;
    canvas.set_width(width);
    canvas.set_height(height);
    Ok(())
}

/// The `<input>` the score is mirrored into. Pages without one are fine.
pub fn score_display() -> Result<Option<HtmlInputElement>> {
    match document()?.get_element_by_id(html::SCORE_DISPLAY_ID) {
        Some(element) => element
            .dyn_into::<HtmlInputElement>()
            .map(Some)
            .map_err(|element| anyhow!("Error converting {:#?} to HtmlInputElement", element)),
        None => Ok(None),
    }
}

pub fn window() -> Result<Window> {
    web_sys::window().ok_or_else(|| anyhow!("Window not found"))
}

pub fn document() -> Result<Document> {
    window()?
        .document()
        .ok_or_else(|| anyhow!("No Document Found"))
}

/// Milliseconds since page load, same clock `requestAnimationFrame` uses.
pub fn now() -> Result<f64> {
    Ok(window()?
        .performance()
        .ok_or_else(|| anyhow!("Performance object not found"))?
        .now())
}

pub fn closure_once<F, A, R>(f: F) -> Closure<F::FnMut>
where
    F: 'static + WasmClosureFnOnce<A, R>,
{
    Closure::once(f)
}

pub fn closure_wrap<T: WasmClosure + ?Sized>(data: Box<T>) -> Closure<T> {
    Closure::wrap(data)
}

pub fn create_raf_closure(f: impl FnMut(f64) + 'static) -> LoopClosure {
    closure_wrap(Box::new(f) as Box<dyn FnMut(f64)>)
}

pub fn request_animation_frame(callback: &LoopClosure) -> Result<i32> {
    window()?
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Cannot request animation frame {:#?}", err))
}

/// Run `f` the first time the element with `id` is clicked, later clicks are
/// ignored. Returns `false` when no such element exists.
pub fn on_first_click(id: &str, f: impl FnOnce() + 'static) -> Result<bool> {
    let button = match document()?.get_element_by_id(id) {
        Some(element) => element
            .dyn_into::<HtmlElement>()
            .map_err(|element| anyhow!("Error converting {:#?} to HtmlElement", element))?,
        None => return Ok(false),
    };

    let mut pending = Some(f);
    let onclick = closure_wrap(Box::new(move || {
        if let Some(f) = pending.take() {
            f();
        }
    }) as Box<dyn FnMut()>);
    button.set_onclick(Some(onclick.as_ref().unchecked_ref()));
    // the button lives as long as the page
    onclick.forget();

    Ok(true)
}

pub fn spawn_local<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

pub async fn fetch_json<T>(json_path: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let resp_value = fetch_with_str(json_path).await?;
    let resp: Response = resp_value
        .dyn_into()
        .map_err(|element| anyhow!("error converting [{:#?}] to Response", element))?;
    if !resp.ok() {
        return Err(anyhow!("{} answered with status {}", json_path, resp.status()));
    }
    let json = resp
        .json()
        .map_err(|err| anyhow!("Could not get JSON from response [{:#?}]", err))?;

    let json_value = JsFuture::from(json)
        .await
        .map_err(|err| anyhow!("error fetching [{:#?}]", err))?;

    serde_wasm_bindgen::from_value(json_value)
        .map_err(|err| anyhow!("error converting response : {:#?}", err))
}

async fn fetch_with_str(resource: &str) -> Result<JsValue> {
    let resp = window()?.fetch_with_str(resource);

    JsFuture::from(resp)
        .await
        .map_err(|err| anyhow!("error fetching : {:#?}", err))
}
