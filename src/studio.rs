use crate::browser;
use crate::camera::{Camera, Shutter};
use crate::caption::{self, CaptionBook};
use crate::engine::{self, App, EventQueue, Point, Rect, Renderer, Size, UiEvent};
use crate::export;
use crate::wall::card::PhotoCard;
use crate::wall::{self, CardId, PhotoWall, PointerAction};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::channel::mpsc::UnboundedSender;
use futures::join;
use std::collections::HashMap;
use wasm_bindgen::JsValue;
use web_sys::{CssStyleDeclaration, HtmlImageElement};

/// Update flow per frame :
/// - engine::AppLoop ticks update() at a fixed step
/// - update() drains the UiEvent queue into PhotoWall mutations, then ticks
///   the wall clock (fade-in ramps, eject animation)
/// - draw() renders the wall snapshot : placed cards, tray card, camera
///   body, live preview, page chrome
///
/// The wall owns every invariant; this type owns the side effects around it
/// (tone, still grab and decode, timers, overlay input, export, download).
pub enum RetroStudio {
    /// Initial state while resources are being loaded
    /// Transition to `Ready` once initialization is complete
    Loading,

    Ready(Studio),
}

impl RetroStudio {
    const CAMERA_IMAGE_PATH: &'static str = "retro-camera.webp";
    const CAPTION_BOOK_PATH: &'static str = "captions.json";

    pub fn new() -> Self {
        RetroStudio::Loading
    }

    /// Optional phrase overrides; a missing or malformed file keeps the
    /// built-in buckets.
    async fn load_caption_book() -> CaptionBook {
        match browser::fetch_json::<HashMap<String, Vec<String>>>(Self::CAPTION_BOOK_PATH).await {
            Ok(table) => CaptionBook::with_overrides(table),
            Err(err) => {
                log!(
                    "No caption overrides from {} : {:#?} - using the built-in set",
                    Self::CAPTION_BOOK_PATH,
                    err
                );
                CaptionBook::built_in()
            }
        }
    }

    /// The camera body graphic is decoration; a load failure degrades to a
    /// flat placeholder rather than blocking startup.
    async fn load_camera_body() -> Option<HtmlImageElement> {
        match engine::load_image(Self::CAMERA_IMAGE_PATH).await {
            Ok(image) => Some(image),
            Err(err) => {
                log!(
                    "Failed to load camera image from {} : {:#?}",
                    Self::CAMERA_IMAGE_PATH,
                    err
                );
                None
            }
        }
    }
}

impl Default for RetroStudio {
    fn default() -> Self {
        RetroStudio::new()
    }
}

#[async_trait(?Send)]
impl App for RetroStudio {
    async fn initialize(&self) -> Result<Box<dyn App>> {
        match self {
            RetroStudio::Loading => {
                let (width, height) = browser::inner_size()?;
                let canvas = browser::canvas()?;
                canvas.set_width(width as u32);
                canvas.set_height(height as u32);

                // independent resources load simultaneously; total time is
                // the slowest of the three
                let (captions, camera_body, camera) = join!(
                    Self::load_caption_book(),
                    Self::load_camera_body(),
                    Camera::acquire(),
                );
                let camera = camera?;
                camera.release_on_pagehide()?;

                let (events, sender) = engine::prepare_input()?;

                Ok(Box::new(RetroStudio::Ready(Studio {
                    wall: PhotoWall::new(Size { width, height }),
                    events,
                    sender,
                    camera,
                    shutter: Shutter,
                    captions,
                    camera_body,
                    stills: HashMap::new(),
                })))
            }
            RetroStudio::Ready(_) => Err(anyhow!("Studio is already initialized")),
        }
    }

    fn update(&mut self, dt: f32) {
        if let RetroStudio::Ready(studio) = self {
            studio.update(dt);
        }
    }

    fn draw(&self, renderer: &Renderer) {
        if let RetroStudio::Ready(studio) = self {
            studio.draw(renderer);
        }
    }
}

// delays for the two deferred capture mutations
const FADE_DELAY_MS: i32 = 100;
const EJECT_DELAY_MS: i32 = wall::EJECT_DURATION_MS as i32;

pub struct Studio {
    wall: PhotoWall,
    events: EventQueue,
    sender: UnboundedSender<UiEvent>,
    camera: Camera,
    shutter: Shutter,
    captions: CaptionBook,
    camera_body: Option<HtmlImageElement>,
    // decoded stills by card id; entries for deleted cards are dropped
    stills: HashMap<CardId, HtmlImageElement>,
}

impl Studio {
    fn update(&mut self, dt: f32) {
        while let Some(event) = self.events.poll() {
            self.handle(event);
        }
        self.wall.update(dt);
    }

    fn handle(&mut self, event: UiEvent) {
        match event {
            UiEvent::PointerDown(point) => match self.wall.pointer_down(point) {
                PointerAction::Shutter => self.capture(),
                PointerAction::Export(id) => self.export(id),
                PointerAction::Regenerate(id) => self.regenerate(id),
                PointerAction::Deleted(id) => {
                    self.stills.remove(&id);
                    // the wall dropped the edit session if it pointed here
                    if self.wall.editing().is_none() {
                        self.hide_edit_overlay();
                    }
                }
                PointerAction::Grabbed(_) | PointerAction::None => (),
            },
            UiEvent::PointerMove(point) => self.wall.pointer_move(point),
            UiEvent::PointerUp => self.wall.pointer_up(),
            UiEvent::DoubleClick(point) => {
                if let Some(id) = self.wall.double_click(point) {
                    self.show_edit_overlay(id);
                }
            }
            UiEvent::EditInput(text) => self.wall.set_edit_buffer(&text),
            // blur and Enter both commit; a stale blur after the session
            // already closed falls through without touching the overlay
            UiEvent::EditCommit => {
                if self.wall.save_edit().is_some() {
                    self.hide_edit_overlay();
                }
            }
            UiEvent::EditCancel => {
                if self.wall.cancel_edit().is_some() {
                    self.hide_edit_overlay();
                }
            }
            UiEvent::FadeIn(id) => self.wall.begin_fade(id),
            UiEvent::EjectDone => self.wall.finish_eject(),
            UiEvent::StillReady(id, image) => {
                // drop decodes for cards deleted mid-flight
                if self.wall.card(id).is_some() {
                    self.stills.insert(id, image);
                }
            }
        }
    }

    // ---------- capture ----------

    fn capture(&mut self) {
        if self.wall.is_ejecting() {
            return;
        }
        let still = match self.camera.grab_still() {
            Ok(still) => still,
            Err(err) => {
                log!("Capture unavailable : {:#?}", err);
                return;
            }
        };
        self.shutter.click();

        let locale = browser::navigator_language();
        let phrase = self.captions.pick(&locale, caption::random_draw).to_string();
        let date = local_date(&locale);
        let Some(id) = self.wall.capture(still.clone(), date, phrase) else {
            return;
        };

        // two deferred mutations, deliberately not cancelled on delete :
        // both tolerate the card being gone when they fire
        let fade_sender = self.sender.clone();
        if let Err(err) = browser::set_timeout(
            move || {
                let _ = fade_sender.unbounded_send(UiEvent::FadeIn(id));
            },
            FADE_DELAY_MS,
        ) {
            log!("Error scheduling fade for card {} : {:#?}", id, err);
        }
        let eject_sender = self.sender.clone();
        if let Err(err) = browser::set_timeout(
            move || {
                let _ = eject_sender.unbounded_send(UiEvent::EjectDone);
            },
            EJECT_DELAY_MS,
        ) {
            log!("Error scheduling eject clear : {:#?}", err);
        }

        // decode the frozen frame for canvas drawing
        let still_sender = self.sender.clone();
        browser::spawn_local(async move {
            match engine::load_image(&still).await {
                Ok(image) => {
                    let _ = still_sender.unbounded_send(UiEvent::StillReady(id, image));
                }
                Err(err) => log!("Error decoding still for card {} : {:#?}", id, err),
            }
        });
    }

    fn export(&self, id: CardId) {
        let Some(card) = self.wall.card(id) else {
            return;
        };
        if let Err(err) = export::download_card(card, self.stills.get(&id)) {
            log!("Error exporting card {} : {:#?}", id, err);
        }
    }

    fn regenerate(&mut self, id: CardId) {
        let locale = browser::navigator_language();
        let phrase = self.captions.pick(&locale, caption::random_draw).to_string();
        self.wall.replace_caption(id, &phrase);
    }

    // ---------- caption edit overlay ----------

    fn show_edit_overlay(&self, id: CardId) {
        if let Err(err) = self.place_edit_overlay(id) {
            log!("Error showing caption editor : {:#?}", err);
        }
    }

    fn place_edit_overlay(&self, id: CardId) -> Result<()> {
        let card = self
            .wall
            .card(id)
            .ok_or_else(|| anyhow!("card {} is gone", id))?;
        let zone = wall::caption_zone(self.wall.origin_of(card));

        let input = browser::edit_input()?;
        input.set_value(card.caption());
        let style = input.style();
        set_style(&style, "display", "block")?;
        set_style(&style, "position", "fixed")?;
        set_style(&style, "left", &format!("{}px", zone.position.x))?;
        set_style(&style, "top", &format!("{}px", zone.position.y))?;
        set_style(&style, "width", &format!("{}px", zone.size.width))?;
        set_style(&style, "height", &format!("{}px", zone.size.height))?;
        let _ = input.focus();
        Ok(())
    }

    fn hide_edit_overlay(&self) {
        if let Ok(input) = browser::edit_input() {
            let _ = input.style().set_property("display", "none");
        }
    }

    // ---------- drawing ----------

    fn draw(&self, renderer: &Renderer) {
        let viewport = self.wall.viewport();
        let screen = Rect::new(Point { x: 0.0, y: 0.0 }, viewport);
        renderer.clear(&screen);
        renderer.fill_rect(&screen, "#fdf3e7");

        // tray cards render first so they emerge from behind the camera
        // body; the wall list order is the z-order and the dragging card is
        // always last
        for card in self.wall.cards().iter().filter(|card| !card.is_on_wall()) {
            self.draw_card(renderer, card, self.wall.tray_origin());
        }
        self.draw_camera(renderer);
        for card in self.wall.cards().iter().filter(|card| card.is_on_wall()) {
            self.draw_card(renderer, card, card.position());
        }

        self.draw_chrome(renderer);
    }

    fn draw_camera(&self, renderer: &Renderer) {
        let body = wall::camera_rect(self.wall.viewport());
        match &self.camera_body {
            Some(image) => renderer.draw_image(image, &body),
            None => renderer.fill_rect(&body, "#78350f"),
        }
        if self.camera.is_live() {
            renderer.draw_video(self.camera.video(), &wall::lens_zone(self.wall.viewport()));
        }
    }

    fn draw_card(&self, renderer: &Renderer, card: &PhotoCard, origin: Point) {
        renderer.set_alpha(card.opacity());

        let frame = wall::card_rect(origin);
        renderer.fill_rect(&frame, "#ffffff");
        renderer.stroke_rect(&frame, "rgba(0, 0, 0, 0.08)", 1.0);
        let photo = wall::photo_rect(origin);
        renderer.fill_rect(&photo, "#e5e7eb");
        if let Some(still) = self.stills.get(&card.id()) {
            renderer.draw_image(still, &photo);
        }

        let center_x = origin.x + wall::CARD_WIDTH * 0.5;
        let strip_top = origin.y + wall::CARD_HEIGHT - wall::CARD_PADDING - wall::CAPTION_STRIP;
        renderer.text(
            card.date(),
            Point {
                x: center_x,
                y: strip_top + 14.0,
            },
            "14px sans-serif",
            "#4b5563",
        );
        let editing_here = self.wall.editing().map(|(id, _)| id) == Some(card.id());
        if !editing_here {
            renderer.text(
                card.caption(),
                Point {
                    x: center_x,
                    y: strip_top + 42.0,
                },
                "500 18px sans-serif",
                "#1f2937",
            );
        }

        if card.is_on_wall() {
            renderer.text("↓", wall::export_zone(origin).center(), "16px sans-serif", "#92400e");
            renderer.text("✕", wall::delete_zone(origin).center(), "16px sans-serif", "#b91c1c");
            renderer.text("↻", wall::regen_zone(origin).center(), "16px sans-serif", "#92400e");
        }

        renderer.set_alpha(1.0);
    }

    fn draw_chrome(&self, renderer: &Renderer) {
        let viewport = self.wall.viewport();
        renderer.text(
            "Bao Retro Camera",
            Point {
                x: viewport.width * 0.5,
                y: 56.0,
            },
            "bold 56px serif",
            "#78350f",
        );

        let help = [
            "📸 Click the shutter to take a photo",
            "✋ Drag photos to arrange them",
            "✏️ Double-click a caption to edit",
        ];
        for (line, text) in help.iter().enumerate() {
            renderer.text(
                text,
                Point {
                    x: viewport.width - 220.0,
                    y: viewport.height - 96.0 + line as f32 * 28.0,
                },
                "16px sans-serif",
                "#92400e",
            );
        }
    }
}

/// Locale-formatted capture date. An empty navigator language falls back to
/// a concrete tag because toLocaleDateString rejects empty strings.
fn local_date(locale: &str) -> String {
    let tag = if locale.is_empty() { "en-US" } else { locale };
    js_sys::Date::new_0()
        .to_locale_date_string(tag, &JsValue::UNDEFINED)
        .into()
}

fn set_style(style: &CssStyleDeclaration, property: &str, value: &str) -> Result<()> {
    style
        .set_property(property, value)
        .map_err(|err| anyhow!("Error setting style {} : {:#?}", property, err))
}
