use crate::engine::Point;
use crate::wall::state::{CardContext, CardState};
use crate::wall::{CardId, Dragging, Idle, Tray};

/// State Transition Flow
/// - Tray     -> Grab    -> Dragging   (commits the card to the wall)
/// - Idle     -> Grab    -> Dragging
/// - Dragging -> Drag    -> Dragging   (position follows the pointer)
/// - Dragging -> Release -> Idle
///
/// Everything else is a no-op; in particular nothing leads back to Tray.
pub enum CardEvent {
    Grab { origin: Point },
    Drag { position: Point },
    Release,
}

// CONSUMING self (state instance) and returning a new Self (state)
// - the `self` passed in as an argument is moved -> no longer accessible
// - invalid (state, event) pairs fall through and keep the current state
#[derive(Debug, Clone)]
enum CardStateMachine {
    Tray(CardState<Tray>),
    Idle(CardState<Idle>),
    Dragging(CardState<Dragging>),
}

impl From<CardState<Tray>> for CardStateMachine {
    fn from(state: CardState<Tray>) -> Self {
        CardStateMachine::Tray(state)
    }
}

impl From<CardState<Idle>> for CardStateMachine {
    fn from(state: CardState<Idle>) -> Self {
        CardStateMachine::Idle(state)
    }
}

impl From<CardState<Dragging>> for CardStateMachine {
    fn from(state: CardState<Dragging>) -> Self {
        CardStateMachine::Dragging(state)
    }
}

impl CardStateMachine {
    fn transition(self, event: CardEvent) -> Self {
        use CardStateMachine::*;
        match (self, event) {
            (Tray(state), CardEvent::Grab { origin }) => state.grab(origin).into(),
            (Idle(state), CardEvent::Grab { .. }) => state.grab().into(),
            (Dragging(mut state), CardEvent::Drag { position }) => {
                state.drag_to(position);
                state.into()
            }
            (Dragging(state), CardEvent::Release) => state.release().into(),
            // invalid transitions keep the current state, e.g. a Release
            // with no drag in progress
            (state, _) => state,
        }
    }

    fn context(&self) -> &CardContext {
        use CardStateMachine::*;
        match self {
            Tray(state) => state.context(),
            Idle(state) => state.context(),
            Dragging(state) => state.context(),
        }
    }
}

/// One printed photo card. Owns its state machine; the wall controller owns
/// the cross-card invariants (unique ids, single drag, single edit).
#[derive(Debug, Clone)]
pub struct PhotoCard {
    state: CardStateMachine,
}

impl PhotoCard {
    pub fn new(
        id: CardId,
        image_data: String,
        date: String,
        caption: String,
        position: Point,
    ) -> Self {
        PhotoCard {
            state: CardStateMachine::Tray(CardState::new(id, image_data, date, caption, position)),
        }
    }

    pub fn apply(self, event: CardEvent) -> Self {
        PhotoCard {
            state: self.state.transition(event),
        }
    }

    pub fn set_caption(&mut self, caption: String) {
        use CardStateMachine::*;
        match &mut self.state {
            Tray(state) => state.set_caption(caption),
            Idle(state) => state.set_caption(caption),
            Dragging(state) => state.set_caption(caption),
        }
    }

    pub fn begin_fade(&mut self) {
        use CardStateMachine::*;
        match &mut self.state {
            Tray(state) => state.begin_fade(),
            Idle(state) => state.begin_fade(),
            Dragging(state) => state.begin_fade(),
        }
    }

    pub fn step_fade(&mut self, dt: f32) {
        use CardStateMachine::*;
        match &mut self.state {
            Tray(state) => state.step_fade(dt),
            Idle(state) => state.step_fade(dt),
            Dragging(state) => state.step_fade(dt),
        }
    }

    pub fn id(&self) -> CardId {
        self.state.context().id
    }

    pub fn image_data(&self) -> &str {
        &self.state.context().image_data
    }

    pub fn date(&self) -> &str {
        &self.state.context().date
    }

    pub fn caption(&self) -> &str {
        &self.state.context().caption
    }

    pub fn position(&self) -> Point {
        self.state.context().position
    }

    pub fn opacity(&self) -> f32 {
        self.state.context().opacity
    }

    pub fn is_on_wall(&self) -> bool {
        !matches!(self.state, CardStateMachine::Tray(_))
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, CardStateMachine::Dragging(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn card() -> PhotoCard {
        PhotoCard::new(
            CardId(7),
            "data:image/jpeg;base64,yyyy".into(),
            "3/4/2026".into(),
            "Happy moment".into(),
            Point { x: 200.0, y: 100.0 },
        )
    }

    #[test]
    fn starts_in_the_tray() {
        let card = card();
        assert!(!card.is_on_wall());
        assert!(!card.is_dragging());
    }

    #[test]
    fn grab_commits_to_the_wall() {
        let card = card().apply(CardEvent::Grab {
            origin: Point { x: 50.0, y: 60.0 },
        });
        assert!(card.is_on_wall());
        assert!(card.is_dragging());
    }

    #[test]
    fn release_never_returns_to_the_tray() {
        let card = card()
            .apply(CardEvent::Grab {
                origin: Point { x: 0.0, y: 0.0 },
            })
            .apply(CardEvent::Release);
        assert!(card.is_on_wall());
        assert!(!card.is_dragging());

        // a stray release on an idle card changes nothing
        let card = card.apply(CardEvent::Release);
        assert!(card.is_on_wall());
        assert!(!card.is_dragging());
    }

    #[test]
    fn drag_only_moves_a_dragging_card() {
        let parked = card().apply(CardEvent::Drag {
            position: Point { x: 999.0, y: 999.0 },
        });
        assert_relative_eq!(parked.position().x, 200.0);

        let dragged = card()
            .apply(CardEvent::Grab {
                origin: Point { x: 200.0, y: 100.0 },
            })
            .apply(CardEvent::Drag {
                position: Point { x: 140.0, y: 150.0 },
            });
        assert_relative_eq!(dragged.position().x, 140.0);
        assert_relative_eq!(dragged.position().y, 150.0);
    }
}
