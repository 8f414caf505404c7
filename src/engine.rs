use crate::browser;
use crate::wall::CardId;
use anyhow::{anyhow, Error, Result};
// ELI5: web assembly is a single threaded environment, so Rc RefCell > Mutex
use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::channel::oneshot::channel;
use futures::{FutureExt, StreamExt};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::{
    // unchecked_ref (unsafe) cast from Javascript type to Rust type
    // - because we control the closure creation and specify the expected type,
    // in principle this should be generally safe (unsafe) code
    JsCast,
    JsValue,
};
use web_sys::{
    CanvasRenderingContext2d, FocusEvent, HtmlImageElement, HtmlVideoElement, KeyboardEvent,
    MouseEvent,
};

// ==================== Geometry ====================

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Rect {
    pub position: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(position: Point, size: Size) -> Self {
        Rect { position, size }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.position.x
            && point.x <= self.position.x + self.size.width
            && point.y >= self.position.y
            && point.y <= self.position.y + self.size.height
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.position.x + self.size.width * 0.5,
            y: self.position.y + self.size.height * 0.5,
        }
    }
}

// ==================== App loop ====================

#[async_trait(?Send)]
pub trait App {
    async fn initialize(&self) -> Result<Box<dyn App>>;
    fn update(&mut self, dt: f32);
    fn draw(&self, renderer: &Renderer);
}

// length of a fixed update step in milliseconds
const FRAME_SIZE: f32 = 1.0 / 60.0 * 1000.0;

pub struct AppLoop {
    last_frame: f64,
    accumulated_delta: f32,
}

type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

impl AppLoop {
    pub async fn start(app: impl App + 'static) -> Result<()> {
        let mut app = app.initialize().await?;
        let mut app_loop = AppLoop {
            last_frame: browser::now()?,
            accumulated_delta: 0.0,
        };
        let renderer = Renderer {
            context: browser::context()?,
        };
        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            app_loop.accumulated_delta += (perf - app_loop.last_frame) as f32;
            while app_loop.accumulated_delta > FRAME_SIZE {
                app.update(FRAME_SIZE);
                app_loop.accumulated_delta -= FRAME_SIZE;
            }
            app_loop.last_frame = perf;
            app.draw(&renderer);
            let _ = browser::request_animation_frame(f.borrow().as_ref().unwrap());
        }));

        browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("AppLoop: Loop is None"))?,
        )?;

        Ok(())
    }
}

// ==================== UI events ====================

/// Everything that can poke the photo wall between two frames. Pointer events
/// come from DOM listeners, the edit events from the caption input overlay,
/// the rest are posted by timers and async loads.
pub enum UiEvent {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
    DoubleClick(Point),
    EditInput(String),
    EditCommit,
    EditCancel,
    FadeIn(CardId),
    EjectDone,
    StillReady(CardId, HtmlImageElement),
}

pub struct EventQueue {
    receiver: UnboundedReceiver<UiEvent>,
}

impl EventQueue {
    /// Non-blocking drain : one queued event, or None when the queue is
    /// empty for this frame.
    pub fn poll(&mut self) -> Option<UiEvent> {
        self.receiver.next().now_or_never().flatten()
    }
}

fn point_of(event: &MouseEvent) -> Point {
    // the canvas fills the viewport at (0,0), so client coordinates are
    // canvas coordinates
    Point {
        x: event.client_x() as f32,
        y: event.client_y() as f32,
    }
}

/// Wires every DOM listener the wall needs and returns the queue to drain
/// plus a sender for timers and async loaders. Closures are forgotten: they
/// must outlive this function for as long as the page does.
pub fn prepare_input() -> Result<(EventQueue, UnboundedSender<UiEvent>)> {
    let (sender, receiver) = unbounded();
    let document = browser::document()?;

    let down_sender = sender.clone();
    let on_down = browser::closure_wrap(Box::new(move |event: MouseEvent| {
        let _ = down_sender.unbounded_send(UiEvent::PointerDown(point_of(&event)));
    }) as Box<dyn FnMut(MouseEvent)>);
    document
        .add_event_listener_with_callback("mousedown", on_down.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Cannot attach mousedown listener : {:#?}", err))?;
    on_down.forget();

    let move_sender = sender.clone();
    let on_move = browser::closure_wrap(Box::new(move |event: MouseEvent| {
        let _ = move_sender.unbounded_send(UiEvent::PointerMove(point_of(&event)));
    }) as Box<dyn FnMut(MouseEvent)>);
    document
        .add_event_listener_with_callback("mousemove", on_move.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Cannot attach mousemove listener : {:#?}", err))?;
    on_move.forget();

    let up_sender = sender.clone();
    let on_up = browser::closure_wrap(Box::new(move |_event: MouseEvent| {
        let _ = up_sender.unbounded_send(UiEvent::PointerUp);
    }) as Box<dyn FnMut(MouseEvent)>);
    document
        .add_event_listener_with_callback("mouseup", on_up.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Cannot attach mouseup listener : {:#?}", err))?;
    on_up.forget();

    let dbl_sender = sender.clone();
    let on_dbl = browser::closure_wrap(Box::new(move |event: MouseEvent| {
        let _ = dbl_sender.unbounded_send(UiEvent::DoubleClick(point_of(&event)));
    }) as Box<dyn FnMut(MouseEvent)>);
    document
        .add_event_listener_with_callback("dblclick", on_dbl.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Cannot attach dblclick listener : {:#?}", err))?;
    on_dbl.forget();

    prepare_edit_input(&sender)?;

    Ok((EventQueue { receiver }, sender))
}

/// Listeners on the caption `<input>` overlay :
/// - every keystroke mirrors the buffer into the wall (EditInput)
/// - Enter and blur both commit, Escape is the only discard path
/// - a blur fired after Escape hid the field commits against an already
///   cleared edit session, which is a no-op
fn prepare_edit_input(sender: &UnboundedSender<UiEvent>) -> Result<()> {
    let input = browser::edit_input()?;

    let typed_input = input.clone();
    let typed_sender = sender.clone();
    let on_input = browser::closure_wrap(Box::new(move |_event: web_sys::Event| {
        let _ = typed_sender.unbounded_send(UiEvent::EditInput(typed_input.value()));
    }) as Box<dyn FnMut(web_sys::Event)>);
    input
        .add_event_listener_with_callback("input", on_input.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Cannot attach input listener : {:#?}", err))?;
    on_input.forget();

    let key_sender = sender.clone();
    let on_key = browser::closure_wrap(Box::new(move |event: KeyboardEvent| {
        match event.key().as_str() {
            "Enter" => {
                let _ = key_sender.unbounded_send(UiEvent::EditCommit);
            }
            "Escape" => {
                let _ = key_sender.unbounded_send(UiEvent::EditCancel);
            }
            _ => (),
        }
    }) as Box<dyn FnMut(KeyboardEvent)>);
    input
        .add_event_listener_with_callback("keydown", on_key.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Cannot attach keydown listener : {:#?}", err))?;
    on_key.forget();

    let blur_sender = sender.clone();
    let on_blur = browser::closure_wrap(Box::new(move |_event: FocusEvent| {
        let _ = blur_sender.unbounded_send(UiEvent::EditCommit);
    }) as Box<dyn FnMut(FocusEvent)>);
    input
        .add_event_listener_with_callback("blur", on_blur.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Cannot attach blur listener : {:#?}", err))?;
    on_blur.forget();

    Ok(())
}

// ==================== Renderer ====================

pub struct Renderer {
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn clear(&self, rect: &Rect) {
        self.context.clear_rect(
            rect.position.x.into(),
            rect.position.y.into(),
            rect.size.width.into(),
            rect.size.height.into(),
        );
    }

    pub fn fill_rect(&self, rect: &Rect, style: &str) {
        self.context.set_fill_style_str(style);
        self.context.fill_rect(
            rect.position.x.into(),
            rect.position.y.into(),
            rect.size.width.into(),
            rect.size.height.into(),
        );
    }

    pub fn stroke_rect(&self, rect: &Rect, style: &str, line_width: f32) {
        self.context.set_stroke_style_str(style);
        self.context.set_line_width(line_width.into());
        self.context.stroke_rect(
            rect.position.x.into(),
            rect.position.y.into(),
            rect.size.width.into(),
            rect.size.height.into(),
        );
    }

    pub fn draw_image(&self, image: &HtmlImageElement, destination: &Rect) {
        self.context
            .draw_image_with_html_image_element_and_dw_and_dh(
                image,
                destination.position.x.into(),
                destination.position.y.into(),
                destination.size.width.into(),
                destination.size.height.into(),
            )
            .expect("Drawing is throwing exceptions! Unrecoverable error");
    }

    /// Live preview frame straight from the `<video>` element.
    pub fn draw_video(&self, video: &HtmlVideoElement, destination: &Rect) {
        self.context
            .draw_image_with_html_video_element_and_dw_and_dh(
                video,
                destination.position.x.into(),
                destination.position.y.into(),
                destination.size.width.into(),
                destination.size.height.into(),
            )
            .expect("Drawing is throwing exceptions! Unrecoverable error");
    }

    pub fn text(&self, text: &str, at: Point, font: &str, style: &str) {
        self.context.set_font(font);
        self.context.set_text_align("center");
        self.context.set_text_baseline("middle");
        self.context.set_fill_style_str(style);
        self.context
            .fill_text(text, at.x.into(), at.y.into())
            .expect("Drawing is throwing exceptions! Unrecoverable error");
    }

    pub fn set_alpha(&self, alpha: f32) {
        self.context.set_global_alpha(alpha.clamp(0.0, 1.0).into());
    }
}

// ==================== Async image loading ====================

/// Asynchronously load an image from a given source path or data URL
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::create_html_image_element()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let error_callback = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!(
                "[engine.rs::load_image] Error loading image: {:#?}",
                err
            )));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callback alive until image is loaded or errors
    success_callback.forget();
    error_callback.forget();

    // ?? - double unwrap because Result<Result<(), Error>, oneshot::Canceled>
    // - first unwrap yields channel result : Result<(), Error>
    // - second unwrap yields image load result : () or propagating Error
    rx.await??;

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_drains_in_order_then_runs_dry() {
        let (sender, receiver) = unbounded();
        let mut queue = EventQueue { receiver };
        sender.unbounded_send(UiEvent::PointerUp).unwrap();
        sender.unbounded_send(UiEvent::EditCommit).unwrap();

        assert!(matches!(queue.poll(), Some(UiEvent::PointerUp)));
        assert!(matches!(queue.poll(), Some(UiEvent::EditCommit)));
        assert!(queue.poll().is_none());
    }

    #[test]
    fn poll_survives_a_dropped_sender() {
        let (sender, receiver) = unbounded::<UiEvent>();
        let mut queue = EventQueue { receiver };
        drop(sender);
        assert!(queue.poll().is_none());
        assert!(queue.poll().is_none());
    }
}
