//! All code relating to individual card states sits behind this module and
//! enforces unrepresentable states : it is impossible to reach a state
//! transition without using ONLY the methods provided.
//! - PUBLIC  : CardState and CardContext struct are public
//! - PRIVATE : internal members are private
//!
//! On-wall-ness is encoded in the type itself. `CardState<Tray>` is the only
//! off-wall state and no method constructs it from a placed state, so the
//! one-way tray-to-wall transition holds by construction.

use crate::engine::Point;
use crate::wall::{CardId, Dragging, Idle, Tray};

/// How long the fade-in takes once the post-capture timer fires.
pub const FADE_DURATION_MS: f32 = 3000.0;

/// Shared data for every card state :
/// - identity : id + captured still + capture date (immutable after capture)
/// - display  : caption, wall position, fade-in opacity
#[derive(Debug, Clone)]
pub struct CardContext {
    pub id: CardId,
    pub image_data: String,
    pub date: String,
    pub caption: String,
    pub position: Point,
    pub opacity: f32,
    pub fading: bool,
}

impl CardContext {
    /// Advance the fade-in. Does nothing until the delayed fade event set
    /// `fading`; clamps at fully opaque.
    pub fn step_fade(&mut self, dt: f32) {
        if self.fading && self.opacity < 1.0 {
            self.opacity = (self.opacity + dt / FADE_DURATION_MS).min(1.0);
        }
    }
}

#[derive(Debug, Clone)]
pub struct CardState<S> {
    context: CardContext,
    // _state is used for type-level tracking (phantom type)
    // - its only purpose is to differentiate between states at compile
    // time, preventing invalid state transitions
    // - it's never read, so we underscored _state
    _state: S,
}

/// generic methods shared between all states
impl<S> CardState<S> {
    pub fn context(&self) -> &CardContext {
        &self.context
    }

    pub fn set_caption(&mut self, caption: String) {
        self.context.caption = caption;
    }

    pub fn begin_fade(&mut self) {
        self.context.fading = true;
    }

    pub fn step_fade(&mut self, dt: f32) {
        self.context.step_fade(dt);
    }
}

impl CardState<Tray> {
    /// A freshly ejected card : fully transparent, not yet on the wall.
    pub fn new(
        id: CardId,
        image_data: String,
        date: String,
        caption: String,
        position: Point,
    ) -> Self {
        CardState {
            context: CardContext {
                id,
                image_data,
                date,
                caption,
                position,
                opacity: 0.0,
                fading: false,
            },
            _state: Tray {},
        }
    }

    /// Grabbing a tray card is what commits it to the wall; the drop does
    /// not matter. `origin` is where the card visually sat at grab time so
    /// it does not jump under the pointer.
    pub fn grab(mut self, origin: Point) -> CardState<Dragging> {
        self.context.position = origin;
        CardState {
            context: self.context,
            _state: Dragging {},
        }
    }
}

impl CardState<Idle> {
    pub fn grab(self) -> CardState<Dragging> {
        CardState {
            context: self.context,
            _state: Dragging {},
        }
    }
}

impl CardState<Dragging> {
    pub fn drag_to(&mut self, position: Point) {
        self.context.position = position;
    }

    pub fn release(self) -> CardState<Idle> {
        CardState {
            context: self.context,
            _state: Idle {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tray_card() -> CardState<Tray> {
        CardState::new(
            CardId(1),
            "data:image/jpeg;base64,xxxx".into(),
            "1/2/2026".into(),
            "Beautiful moment".into(),
            Point { x: 500.0, y: 300.0 },
        )
    }

    #[test]
    fn new_card_starts_transparent() {
        let card = tray_card();
        assert_relative_eq!(card.context().opacity, 0.0);
        assert!(!card.context().fading);
    }

    #[test]
    fn fade_only_moves_after_begin_fade() {
        let mut card = tray_card();
        card.step_fade(100.0);
        assert_relative_eq!(card.context().opacity, 0.0);

        card.begin_fade();
        card.step_fade(FADE_DURATION_MS / 2.0);
        assert_relative_eq!(card.context().opacity, 0.5);
    }

    #[test]
    fn fade_clamps_at_opaque() {
        let mut card = tray_card();
        card.begin_fade();
        card.step_fade(FADE_DURATION_MS * 10.0);
        assert_relative_eq!(card.context().opacity, 1.0);
        // further ticking stays put
        card.step_fade(FADE_DURATION_MS);
        assert_relative_eq!(card.context().opacity, 1.0);
    }

    #[test]
    fn grab_from_tray_pins_the_grab_time_origin() {
        let card = tray_card();
        let dragging = card.grab(Point { x: 90.0, y: 90.0 });
        assert_relative_eq!(dragging.context().position.x, 90.0);
        assert_relative_eq!(dragging.context().position.y, 90.0);
    }

    #[test]
    fn drag_release_grab_keeps_position() {
        let mut dragging = tray_card().grab(Point { x: 0.0, y: 0.0 });
        dragging.drag_to(Point { x: 140.0, y: 150.0 });
        let idle = dragging.release();
        assert_relative_eq!(idle.context().position.x, 140.0);

        let dragging = idle.grab();
        assert_relative_eq!(dragging.context().position.y, 150.0);
    }

    #[test]
    fn caption_edit_leaves_the_rest_alone() {
        let mut card = tray_card();
        let before = card.context().clone();
        card.set_caption("Sweet time".into());
        assert_eq!(card.context().caption, "Sweet time");
        assert_eq!(card.context().id, before.id);
        assert_eq!(card.context().image_data, before.image_data);
        assert_eq!(card.context().date, before.date);
    }
}
