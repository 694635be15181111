use crate::sim::Intents;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    Jump,
    ToggleOverlay,
    Quit,
}

const ACTION_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    /// Held-key state as the player's intents for the next tick.
    pub(crate) fn player_intents(&self) -> Intents {
        Intents::new(
            self.is_down(InputAction::MoveLeft),
            self.is_down(InputAction::MoveRight),
            self.is_down(InputAction::Jump),
        )
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::Jump => 2,
            InputAction::ToggleOverlay => 3,
            InputAction::Quit => 4,
        }
    }
}
