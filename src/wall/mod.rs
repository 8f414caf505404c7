//! The photo wall core : every card, every cross-card invariant, zero
//! `web-sys`. The browser shell (studio.rs) feeds pointer/edit events in and
//! reads card snapshots back out; this module decides what they mean.
//!
//! Cross-card invariants owned here :
//! - card ids are unique (monotonic counter, never reused)
//! - at most one card is dragging  (single `drag` selector field)
//! - at most one card is editing   (single `edit` selector field)
//! - captures are blocked while a card is still ejecting

pub mod card;
pub mod state;

use crate::engine::{Point, Rect, Size};
use self::card::{CardEvent, PhotoCard};

// ==================== Card identity ====================

/// Opaque card identifier, assigned at capture time, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardId(pub(crate) u64);

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Phantom types for the card state machine (see state.rs)
#[derive(Debug, Clone, Copy)]
pub struct Tray;
#[derive(Debug, Clone, Copy)]
pub struct Idle;
#[derive(Debug, Clone, Copy)]
pub struct Dragging;

// ==================== Layout ====================
// All geometry is in canvas pixels; the canvas fills the viewport.

pub const PHOTO_WIDTH: f32 = 300.0;
pub const PHOTO_HEIGHT: f32 = 400.0;
pub const CARD_PADDING: f32 = 16.0;
pub const CAPTION_STRIP: f32 = 64.0;
pub const CARD_WIDTH: f32 = PHOTO_WIDTH + CARD_PADDING * 2.0;
pub const CARD_HEIGHT: f32 = PHOTO_HEIGHT + CAPTION_STRIP + CARD_PADDING * 2.0;

pub const CAMERA_SIZE: f32 = 450.0;
pub const CAMERA_MARGIN: f32 = 64.0;

/// Capture blocks until the eject animation ends.
pub const EJECT_DURATION_MS: f32 = 2000.0;

const BUTTON_SIZE: f32 = 24.0;

pub fn card_rect(origin: Point) -> Rect {
    Rect {
        position: origin,
        size: Size {
            width: CARD_WIDTH,
            height: CARD_HEIGHT,
        },
    }
}

/// The photo inset inside the white frame.
pub fn photo_rect(origin: Point) -> Rect {
    Rect {
        position: Point {
            x: origin.x + CARD_PADDING,
            y: origin.y + CARD_PADDING,
        },
        size: Size {
            width: PHOTO_WIDTH,
            height: PHOTO_HEIGHT,
        },
    }
}

/// The caption line at the bottom of the card; double-click target.
pub fn caption_zone(origin: Point) -> Rect {
    Rect {
        position: Point {
            x: origin.x + CARD_PADDING,
            y: origin.y + CARD_HEIGHT - CARD_PADDING - CAPTION_STRIP * 0.5,
        },
        size: Size {
            width: PHOTO_WIDTH,
            height: CAPTION_STRIP * 0.5,
        },
    }
}

pub fn export_zone(origin: Point) -> Rect {
    button_zone(origin, 2)
}

pub fn delete_zone(origin: Point) -> Rect {
    button_zone(origin, 1)
}

/// Caption regenerate button, to the right of the caption line.
pub fn regen_zone(origin: Point) -> Rect {
    Rect {
        position: Point {
            x: origin.x + CARD_WIDTH - CARD_PADDING - BUTTON_SIZE,
            y: origin.y + CARD_HEIGHT - CARD_PADDING - CAPTION_STRIP,
        },
        size: Size {
            width: BUTTON_SIZE,
            height: BUTTON_SIZE,
        },
    }
}

fn button_zone(origin: Point, slot_from_right: u32) -> Rect {
    Rect {
        position: Point {
            x: origin.x + CARD_WIDTH - (BUTTON_SIZE + 8.0) * slot_from_right as f32,
            y: origin.y + 8.0,
        },
        size: Size {
            width: BUTTON_SIZE,
            height: BUTTON_SIZE,
        },
    }
}

pub fn camera_rect(viewport: Size) -> Rect {
    Rect {
        position: Point {
            x: CAMERA_MARGIN,
            y: viewport.height - CAMERA_MARGIN - CAMERA_SIZE,
        },
        size: Size {
            width: CAMERA_SIZE,
            height: CAMERA_SIZE,
        },
    }
}

/// The invisible shutter button over the camera graphic.
pub fn shutter_zone(viewport: Size) -> Rect {
    let camera = camera_rect(viewport);
    let size = CAMERA_SIZE * 0.11;
    Rect {
        position: Point {
            x: camera.position.x + CAMERA_SIZE * 0.18,
            y: camera.position.y + CAMERA_SIZE - CAMERA_SIZE * 0.40 - size,
        },
        size: Size {
            width: size,
            height: size,
        },
    }
}

/// Where the live preview shows through the camera lens.
pub fn lens_zone(viewport: Size) -> Rect {
    let camera = camera_rect(viewport);
    let size = CAMERA_SIZE * 0.27;
    Rect {
        position: Point {
            x: camera.position.x + CAMERA_SIZE * 0.62 - size * 0.5,
            y: camera.position.y + CAMERA_SIZE - CAMERA_SIZE * 0.32 - size,
        },
        size: Size {
            width: size,
            height: size,
        },
    }
}

fn tray_slot(viewport: Size, progress: f32) -> Point {
    let camera = camera_rect(viewport);
    Point {
        x: camera.center().x - CARD_WIDTH * 0.5,
        // the card rises out of the camera top as the ejection progresses
        y: camera.position.y - CARD_HEIGHT * 0.4 * progress,
    }
}

// ==================== Controller ====================

/// What a pointer-down resolved to. The shell reacts to the variants the
/// wall cannot satisfy on its own (shutter, export, regenerate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    None,
    Shutter,
    Grabbed(CardId),
    Deleted(CardId),
    Export(CardId),
    Regenerate(CardId),
}

/// Pointer offset relative to the grabbed card's top-left corner, recorded
/// at pointer-down so the card does not jump under the pointer.
struct DragGrip {
    id: CardId,
    offset: Point,
}

struct EditSession {
    id: CardId,
    buffer: String,
}

pub struct PhotoWall {
    cards: Vec<PhotoCard>,
    next_id: u64,
    viewport: Size,
    ejecting: bool,
    eject_elapsed: f32,
    drag: Option<DragGrip>,
    edit: Option<EditSession>,
}

impl PhotoWall {
    pub fn new(viewport: Size) -> Self {
        PhotoWall {
            cards: Vec::new(),
            next_id: 1,
            viewport,
            ejecting: false,
            eject_elapsed: 0.0,
            drag: None,
            edit: None,
        }
    }

    // ---------- capture lifecycle ----------

    /// Appends a new tray card, unless a previous capture is still ejecting
    /// (the only admission control in the system, purely time based).
    pub fn capture(&mut self, image_data: String, date: String, caption: String) -> Option<CardId> {
        if self.ejecting {
            return None;
        }
        let id = CardId(self.next_id);
        self.next_id += 1;
        let position = Point {
            x: self.viewport.width * 0.5 - CARD_WIDTH * 0.5,
            y: self.viewport.height * 0.5 - CARD_HEIGHT * 0.5,
        };
        self.cards
            .push(PhotoCard::new(id, image_data, date, caption, position));
        self.ejecting = true;
        self.eject_elapsed = 0.0;
        Some(id)
    }

    /// Posted by the delayed fade timer. The card may have been deleted in
    /// the meantime; that is a silent no-op.
    pub fn begin_fade(&mut self, id: CardId) {
        if let Some(index) = self.index_of(id) {
            self.cards[index].begin_fade();
        }
    }

    /// Posted by the delayed eject timer; re-arms the shutter.
    pub fn finish_eject(&mut self) {
        self.ejecting = false;
    }

    /// Per-frame tick : fade-in ramps and the eject animation clock.
    pub fn update(&mut self, dt: f32) {
        for card in &mut self.cards {
            card.step_fade(dt);
        }
        if self.ejecting {
            self.eject_elapsed += dt;
        }
    }

    // ---------- drag / placement ----------

    pub fn pointer_down(&mut self, pointer: Point) -> PointerAction {
        // wall cards sit above the camera; scan back-to-front since the
        // list renders in order (a handful to a few dozen cards, linear
        // lookup is fine)
        let placed = self
            .cards
            .iter()
            .rev()
            .find(|card| card.is_on_wall() && card_rect(card.position()).contains(pointer))
            .map(|card| (card.id(), card.position()));
        if let Some((id, origin)) = placed {
            if export_zone(origin).contains(pointer) {
                return PointerAction::Export(id);
            }
            if delete_zone(origin).contains(pointer) {
                self.delete(id);
                return PointerAction::Deleted(id);
            }
            if regen_zone(origin).contains(pointer) {
                return PointerAction::Regenerate(id);
            }
            self.grab(id, pointer, origin);
            return PointerAction::Grabbed(id);
        }

        if shutter_zone(self.viewport).contains(pointer) {
            return PointerAction::Shutter;
        }

        // the tray card pokes out of the camera; grabbing it commits it to
        // the wall (the grab, not the drop, is the commit point)
        let tray = self
            .cards
            .iter()
            .rev()
            .find(|card| !card.is_on_wall())
            .map(|card| card.id());
        if let Some(id) = tray {
            let origin = self.tray_origin();
            if card_rect(origin).contains(pointer) {
                self.grab(id, pointer, origin);
                return PointerAction::Grabbed(id);
            }
        }

        PointerAction::None
    }

    pub fn pointer_move(&mut self, pointer: Point) {
        let (id, offset) = match &self.drag {
            Some(grip) => (grip.id, grip.offset),
            None => return,
        };
        let position = Point {
            x: pointer.x - offset.x,
            y: pointer.y - offset.y,
        };
        self.apply(id, CardEvent::Drag { position });
    }

    /// Global pointer-up; a pointer-up with no dragging card is a no-op.
    pub fn pointer_up(&mut self) {
        if let Some(grip) = self.drag.take() {
            self.apply(grip.id, CardEvent::Release);
        }
    }

    fn grab(&mut self, id: CardId, pointer: Point, origin: Point) {
        // a second pointer-down while a drag is live always releases the
        // first card, keeping "at most one dragging" intact
        self.pointer_up();
        if let Some(index) = self.index_of(id) {
            let card = self.cards.remove(index);
            // re-appended so the grabbed card renders on top
            self.cards.push(card.apply(CardEvent::Grab { origin }));
            self.drag = Some(DragGrip {
                id,
                offset: Point {
                    x: pointer.x - origin.x,
                    y: pointer.y - origin.y,
                },
            });
        }
    }

    fn apply(&mut self, id: CardId, event: CardEvent) {
        if let Some(index) = self.index_of(id) {
            let card = self.cards.remove(index);
            self.cards.insert(index, card.apply(event));
        }
    }

    // ---------- caption editing ----------

    /// Caption double-click target lookup; enters edit mode on a hit.
    pub fn double_click(&mut self, pointer: Point) -> Option<CardId> {
        let hit = self
            .cards
            .iter()
            .rev()
            .find(|card| caption_zone(self.origin_of(card)).contains(pointer))
            .map(|card| card.id())?;
        self.start_edit(hit)
    }

    /// Enters edit mode for exactly one card; entering edit on a second
    /// card abandons the first (unsaved text discarded).
    pub fn start_edit(&mut self, id: CardId) -> Option<CardId> {
        let index = self.index_of(id)?;
        self.edit = Some(EditSession {
            id,
            buffer: self.cards[index].caption().to_string(),
        });
        Some(id)
    }

    pub fn set_edit_buffer(&mut self, text: &str) {
        if let Some(session) = &mut self.edit {
            session.buffer = text.to_string();
        }
    }

    /// Commits the buffered text as the card's caption and leaves edit
    /// mode. Blur and the confirm key both land here.
    pub fn save_edit(&mut self) -> Option<CardId> {
        let session = self.edit.take()?;
        if let Some(index) = self.index_of(session.id) {
            self.cards[index].set_caption(session.buffer);
        }
        Some(session.id)
    }

    /// Leaves edit mode without touching the caption; escape only.
    pub fn cancel_edit(&mut self) -> Option<CardId> {
        self.edit.take().map(|session| session.id)
    }

    pub fn editing(&self) -> Option<(CardId, &str)> {
        self.edit
            .as_ref()
            .map(|session| (session.id, session.buffer.as_str()))
    }

    // ---------- caption & deletion ----------

    /// Regenerate support : only the caption changes. Unknown id is a no-op.
    pub fn replace_caption(&mut self, id: CardId, phrase: &str) {
        if let Some(index) = self.index_of(id) {
            self.cards[index].set_caption(phrase.to_string());
        }
    }

    /// Unconditional removal, no confirmation, no undo. Clears the drag
    /// grip and edit session if they pointed at the card.
    pub fn delete(&mut self, id: CardId) {
        let before = self.cards.len();
        self.cards.retain(|card| card.id() != id);
        if self.cards.len() == before {
            return;
        }
        if self.drag.as_ref().map(|grip| grip.id) == Some(id) {
            self.drag = None;
        }
        if self.edit.as_ref().map(|session| session.id) == Some(id) {
            self.edit = None;
        }
    }

    // ---------- snapshots for the renderer ----------

    pub fn cards(&self) -> &[PhotoCard] {
        &self.cards
    }

    pub fn dragging_id(&self) -> Option<CardId> {
        self.drag.as_ref().map(|grip| grip.id)
    }

    pub fn is_ejecting(&self) -> bool {
        self.ejecting
    }

    /// 0.0 at the shutter click, 1.0 once the card has fully emerged.
    pub fn eject_progress(&self) -> f32 {
        if self.ejecting {
            (self.eject_elapsed / EJECT_DURATION_MS).min(1.0)
        } else {
            1.0
        }
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn tray_origin(&self) -> Point {
        tray_slot(self.viewport, self.eject_progress())
    }

    /// Visual top-left of a card : wall position once placed, the tray slot
    /// before that.
    pub fn origin_of(&self, card: &PhotoCard) -> Point {
        if card.is_on_wall() {
            card.position()
        } else {
            self.tray_origin()
        }
    }

    pub fn card(&self, id: CardId) -> Option<&PhotoCard> {
        self.index_of(id).map(|index| &self.cards[index])
    }

    fn index_of(&self, id: CardId) -> Option<usize> {
        self.cards.iter().position(|card| card.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const STILL: &str = "data:image/jpeg;base64,aaaa";

    fn wall() -> PhotoWall {
        PhotoWall::new(Size {
            width: 1280.0,
            height: 800.0,
        })
    }

    fn snap(wall: &mut PhotoWall) -> Option<CardId> {
        wall.capture(STILL.to_string(), "1/2/2026".to_string(), "Sweet time".to_string())
    }

    fn snap_and_eject(wall: &mut PhotoWall) -> CardId {
        let id = snap(wall).expect("capture blocked unexpectedly");
        wall.finish_eject();
        id
    }

    /// Grabs a card off the tray and parks it at `origin`.
    fn place_at(wall: &mut PhotoWall, origin: Point) -> CardId {
        let id = snap_and_eject(wall);
        let tray = wall.tray_origin();
        assert!(matches!(
            wall.pointer_down(Point {
                x: tray.x + CARD_WIDTH * 0.5,
                y: tray.y + 4.0
            }),
            PointerAction::Grabbed(_)
        ));
        wall.pointer_move(Point {
            x: origin.x + CARD_WIDTH * 0.5,
            y: origin.y + 4.0,
        });
        wall.pointer_up();
        assert_eq!(wall.card(id).unwrap().position(), origin);
        id
    }

    #[test]
    fn captures_produce_unique_ids() {
        let mut wall = wall();
        let a = snap_and_eject(&mut wall);
        let b = snap_and_eject(&mut wall);
        let c = snap_and_eject(&mut wall);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(wall.cards().len(), 3);
    }

    #[test]
    fn capture_during_eject_window_is_a_noop() {
        let mut wall = wall();
        assert!(snap(&mut wall).is_some());
        // second shutter press inside the 2000ms window
        assert!(snap(&mut wall).is_none());
        assert_eq!(wall.cards().len(), 1);

        wall.finish_eject();
        assert!(snap(&mut wall).is_some());
        assert_eq!(wall.cards().len(), 2);
    }

    #[test]
    fn opacity_reaches_one_after_fade() {
        let mut wall = wall();
        let id = snap_and_eject(&mut wall);
        assert_relative_eq!(wall.card(id).unwrap().opacity(), 0.0);

        wall.begin_fade(id);
        for _ in 0..240 {
            wall.update(16.7);
        }
        assert_relative_eq!(wall.card(id).unwrap().opacity(), 1.0);
    }

    #[test]
    fn fade_on_a_deleted_card_is_a_noop() {
        let mut wall = wall();
        let id = snap_and_eject(&mut wall);
        wall.delete(id);
        // the delayed callback still fires; nothing to apply it to
        wall.begin_fade(id);
        wall.update(5000.0);
        assert!(wall.cards().is_empty());
    }

    #[test]
    fn grabbing_the_tray_card_commits_it_to_the_wall() {
        let mut wall = wall();
        let id = snap_and_eject(&mut wall);
        assert!(!wall.card(id).unwrap().is_on_wall());

        let tray = wall.tray_origin();
        let action = wall.pointer_down(Point {
            x: tray.x + 10.0,
            y: tray.y + 10.0,
        });
        assert_eq!(action, PointerAction::Grabbed(id));
        assert!(wall.card(id).unwrap().is_on_wall());
        assert!(wall.card(id).unwrap().is_dragging());

        // releasing does not take it back off the wall
        wall.pointer_up();
        assert!(wall.card(id).unwrap().is_on_wall());
        assert!(!wall.card(id).unwrap().is_dragging());
    }

    #[test]
    fn drag_applies_the_recorded_offset() {
        let mut wall = wall();
        let id = place_at(&mut wall, Point { x: 90.0, y: 90.0 });

        // pointer-down at (100,100) on a card at (90,90) -> offset (10,10)
        wall.pointer_down(Point { x: 100.0, y: 100.0 });
        wall.pointer_move(Point { x: 150.0, y: 160.0 });
        let position = wall.card(id).unwrap().position();
        assert_relative_eq!(position.x, 140.0);
        assert_relative_eq!(position.y, 150.0);
    }

    #[test]
    fn at_most_one_card_drags_at_a_time() {
        let mut wall = wall();
        // parked clear of the tray slot so the second tray grab is not
        // intercepted
        let first = place_at(&mut wall, Point { x: 500.0, y: 100.0 });
        let second = place_at(&mut wall, Point { x: 900.0, y: 100.0 });

        wall.pointer_down(Point { x: 510.0, y: 110.0 });
        assert_eq!(wall.dragging_id(), Some(first));

        // no pointer-up in between : grabbing the second card must release
        // the first
        wall.pointer_down(Point { x: 910.0, y: 110.0 });
        assert_eq!(wall.dragging_id(), Some(second));
        let dragging = wall.cards().iter().filter(|card| card.is_dragging()).count();
        assert_eq!(dragging, 1);
    }

    #[test]
    fn pointer_up_without_a_drag_is_a_noop() {
        let mut wall = wall();
        snap_and_eject(&mut wall);
        wall.pointer_up();
        wall.pointer_move(Point { x: 5.0, y: 5.0 });
        assert!(wall.dragging_id().is_none());
    }

    #[test]
    fn save_commits_the_buffer_cancel_discards_it() {
        let mut wall = wall();
        let id = snap_and_eject(&mut wall);
        wall.replace_caption(id, "X");

        wall.start_edit(id);
        wall.set_edit_buffer("Y");
        assert_eq!(wall.save_edit(), Some(id));
        assert_eq!(wall.card(id).unwrap().caption(), "Y");
        assert!(wall.editing().is_none());

        wall.start_edit(id);
        wall.set_edit_buffer("Z");
        assert_eq!(wall.cancel_edit(), Some(id));
        assert_eq!(wall.card(id).unwrap().caption(), "Y");
    }

    #[test]
    fn editing_a_second_card_abandons_the_first() {
        let mut wall = wall();
        let first = snap_and_eject(&mut wall);
        let second = snap_and_eject(&mut wall);
        wall.replace_caption(first, "untouched");

        wall.start_edit(first);
        wall.set_edit_buffer("lost text");
        wall.start_edit(second);
        assert_eq!(wall.editing().map(|(id, _)| id), Some(second));

        wall.save_edit();
        assert_eq!(wall.card(first).unwrap().caption(), "untouched");
    }

    #[test]
    fn regenerate_changes_only_the_caption() {
        let mut wall = wall();
        let id = snap_and_eject(&mut wall);
        let before = wall.card(id).unwrap().clone();

        wall.replace_caption(id, "Precious memory");

        let after = wall.card(id).unwrap();
        assert_eq!(after.caption(), "Precious memory");
        assert_eq!(after.id(), before.id());
        assert_eq!(after.image_data(), before.image_data());
        assert_eq!(after.date(), before.date());
        assert_eq!(after.position(), before.position());
    }

    #[test]
    fn delete_removes_exactly_one_card() {
        let mut wall = wall();
        let keep_a = snap_and_eject(&mut wall);
        let doomed = snap_and_eject(&mut wall);
        let keep_b = snap_and_eject(&mut wall);
        wall.replace_caption(keep_b, "still here");

        wall.delete(doomed);

        assert_eq!(wall.cards().len(), 2);
        assert!(wall.card(doomed).is_none());
        assert!(wall.card(keep_a).is_some());
        assert_eq!(wall.card(keep_b).unwrap().caption(), "still here");
    }

    #[test]
    fn delete_clears_a_live_grip_and_edit_session() {
        let mut wall = wall();
        let id = place_at(&mut wall, Point { x: 50.0, y: 50.0 });
        wall.pointer_down(Point { x: 60.0, y: 60.0 });
        wall.start_edit(id);

        wall.delete(id);
        assert!(wall.dragging_id().is_none());
        assert!(wall.editing().is_none());
        // a commit arriving after the delete has nothing to commit to
        assert!(wall.save_edit().is_none());
    }

    #[test]
    fn unknown_ids_never_raise() {
        let mut wall = wall();
        let id = snap_and_eject(&mut wall);
        let ghost = CardId(9999);

        wall.delete(ghost);
        wall.replace_caption(ghost, "nope");
        wall.begin_fade(ghost);
        assert!(wall.start_edit(ghost).is_none());

        assert_eq!(wall.cards().len(), 1);
        assert_eq!(wall.card(id).unwrap().caption(), "Sweet time");
    }

    #[test]
    fn shutter_zone_resolves_to_a_shutter_action() {
        let mut wall = wall();
        let shutter = shutter_zone(wall.viewport()).center();
        assert_eq!(wall.pointer_down(shutter), PointerAction::Shutter);
    }

    #[test]
    fn card_buttons_resolve_before_the_body_grab() {
        let mut wall = wall();
        let id = place_at(&mut wall, Point { x: 400.0, y: 120.0 });
        let origin = wall.card(id).unwrap().position();

        assert_eq!(
            wall.pointer_down(export_zone(origin).center()),
            PointerAction::Export(id)
        );
        assert_eq!(
            wall.pointer_down(regen_zone(origin).center()),
            PointerAction::Regenerate(id)
        );
        assert_eq!(
            wall.pointer_down(delete_zone(origin).center()),
            PointerAction::Deleted(id)
        );
        assert!(wall.card(id).is_none());
    }
}
