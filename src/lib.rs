// ==================== Modules ====================
#[macro_use]
mod browser;
mod camera;
mod caption;
mod engine;
mod export;
mod studio;
mod wall;

use engine::AppLoop;
use studio::RetroStudio;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsValue;

// ==================== Main Functions ====================
/// Main entry for the WebAssembly module
/// - installs panic reporting
/// - hands the studio to the animation-frame loop
#[wasm_bindgen]
pub fn main_js() -> Result<(), JsValue> {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();

    // spawns a new asynchronous task on the local thread, for the web
    // assembly environment, using wasm_bindgen_futures
    browser::spawn_local(async move {
        AppLoop::start(RetroStudio::new())
            .await
            .expect("Could not start the photo wall");
    });

    Ok(())
}
