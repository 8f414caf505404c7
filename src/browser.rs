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
    HtmlAnchorElement,
    HtmlCanvasElement,
    HtmlImageElement,
    HtmlInputElement,
    HtmlVideoElement,
    Response,
    Window,
};

// block-wrapped so the macro works in expression position (match arms)
macro_rules! log {
    ($($t:tt)*) => {{
        web_sys::console::log_1(&format!($($t)*).into());
    }}
}

// ==================== Constants ====================
// Element ids expected in the host page
mod html {
    pub const CANVAS_ID: &str = "canvas";
    pub const VIDEO_ID: &str = "preview";
    pub const EDIT_INPUT_ID: &str = "caption-edit";
    pub const CONTEXT_2D: &str = "2d";
}

pub fn window() -> Result<Window> {
    web_sys::window().ok_or_else(|| anyhow!("Window not found"))
}

pub fn document() -> Result<Document> {
    window()?
        .document()
        .ok_or_else(|| anyhow!("No Document Found"))
}

pub fn canvas() -> Result<HtmlCanvasElement> {
    document()?
        .get_element_by_id(html::CANVAS_ID)
        .ok_or_else(|| anyhow!("No Canvas Element found with ID : '{:#?}'", html::CANVAS_ID))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlCanvasElement", element))
}

pub fn context() -> Result<CanvasRenderingContext2d> {
    canvas()?
        .get_context(html::CONTEXT_2D)
        // Because return is Result<Option<Object>,JsValue>
        // - we map error(JsValue) to Error (anyhow)
        // - take the inner Option and map the None case to a value
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

/// The `<video>` element carrying the live camera preview. It sits under the
/// camera body graphic in the host page; we only sample frames from it.
pub fn video() -> Result<HtmlVideoElement> {
    document()?
        .get_element_by_id(html::VIDEO_ID)
        .ok_or_else(|| anyhow!("No video element found with ID : '{:#?}'", html::VIDEO_ID))?
        .dyn_into::<HtmlVideoElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlVideoElement", element))
}

/// The `<input>` overlay used for in-place caption editing. Lives in the host
/// page so focus/blur behave like any other form field.
pub fn edit_input() -> Result<HtmlInputElement> {
    document()?
        .get_element_by_id(html::EDIT_INPUT_ID)
        .ok_or_else(|| anyhow!("No input element found with ID : '{:#?}'", html::EDIT_INPUT_ID))?
        .dyn_into::<HtmlInputElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlInputElement", element))
}

pub fn create_html_image_element() -> Result<HtmlImageElement> {
    HtmlImageElement::new().map_err(|err| anyhow!("Could not create image element : {:#?}", err))
}

/// Offscreen canvas, never attached to the document. Used for freezing video
/// frames and for export rasterization.
pub fn create_offscreen_canvas(width: u32, height: u32) -> Result<HtmlCanvasElement> {
    let canvas = document()?
        .create_element("canvas")
        .map_err(|err| anyhow!("Could not create canvas element : {:#?}", err))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlCanvasElement", element))?;
    canvas.set_width(width);
    canvas.set_height(height);
    Ok(canvas)
}

pub fn context_of(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d> {
    canvas
        .get_context(html::CONTEXT_2D)
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

/// Triggers a browser download of `href` under `filename` by clicking a
/// detached anchor element.
pub fn download(href: &str, filename: &str) -> Result<()> {
    let anchor = document()?
        .create_element("a")
        .map_err(|err| anyhow!("Could not create anchor element : {:#?}", err))?
        .dyn_into::<HtmlAnchorElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlAnchorElement", element))?;
    anchor.set_download(filename);
    anchor.set_href(href);
    anchor.click();
    Ok(())
}

pub fn inner_size() -> Result<(f32, f32)> {
    let window = window()?;
    let width = window
        .inner_width()
        .map_err(|err| anyhow!("Error reading innerWidth : {:#?}", err))?
        .as_f64()
        .ok_or_else(|| anyhow!("innerWidth is not a number"))?;
    let height = window
        .inner_height()
        .map_err(|err| anyhow!("Error reading innerHeight : {:#?}", err))?
        .as_f64()
        .ok_or_else(|| anyhow!("innerHeight is not a number"))?;
    Ok((width as f32, height as f32))
}

/// BCP 47 tag of the browser UI, e.g. "fr-FR". Empty when the browser does
/// not expose one; the caption picker treats that as the default bucket.
pub fn navigator_language() -> String {
    window()
        .ok()
        .and_then(|window| window.navigator().language())
        .unwrap_or_default()
}

// ==================== Scheduling ====================

pub type LoopClosure = Closure<dyn FnMut(f64)>;

pub fn now() -> Result<f64> {
    Ok(window()?
        .performance()
        .ok_or_else(|| anyhow!("Performance object not found"))?
        .now())
}

pub fn request_animation_frame(callback: &LoopClosure) -> Result<i32> {
    window()?
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Cannot request animation frame {:#?}", err))
}

pub fn create_raf_closure(f: impl FnMut(f64) + 'static) -> LoopClosure {
    closure_wrap(Box::new(f))
}

/// One-shot timer. The callback is leaked to the JS runtime; callers schedule
/// a handful of these per capture, not per frame.
pub fn set_timeout(callback: impl FnOnce() + 'static, timeout_ms: i32) -> Result<i32> {
    let closure = closure_once(callback);
    let handle = window()?
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            timeout_ms,
        )
        .map_err(|err| anyhow!("Cannot set timeout : {:#?}", err))?;
    closure.forget();
    Ok(handle)
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

pub fn spawn_local<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

// ==================== Fetch ====================

pub async fn fetch_json<T>(json_path: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let resp_value = fetch_with_str(json_path).await?;
    let resp: Response = resp_value
        .dyn_into()
        .map_err(|element| anyhow!("error converting [{:#?}] to Response", element))?;
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

// browser-only smoke checks; run with wasm-pack test
#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn window_and_document_resolve() {
        assert!(window().is_ok());
        assert!(document().is_ok());
    }

    #[wasm_bindgen_test]
    fn offscreen_canvas_takes_requested_size() {
        let canvas = create_offscreen_canvas(300, 400).expect("canvas creation failed");
        assert_eq!(canvas.width(), 300);
        assert_eq!(canvas.height(), 400);
        assert!(context_of(&canvas).is_ok());
    }

    #[wasm_bindgen_test]
    fn timers_schedule() {
        assert!(set_timeout(|| (), 0).is_ok());
    }

    #[wasm_bindgen_test]
    fn logging_works_as_a_match_arm() {
        let outcome: Result<(), &str> = Err("expected");
        match outcome {
            Ok(()) => (),
            Err(err) => log!("recoverable failure ignored : {}", err),
        }
    }
}
