#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveForward,
    MoveBack,
    StrafeLeft,
    StrafeRight,
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
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveForward => 0,
            InputAction::MoveBack => 1,
            InputAction::StrafeLeft => 2,
            InputAction::StrafeRight => 3,
            InputAction::Quit => 4,
        }
    }
}

/// Discrete input, queued in arrival order and drained once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Interact,
    Build,
    SelectKind(u8),
    /// Raw look delta in device units; only meaningful while pointer lock is active.
    Look { dx: f32, dy: f32 },
    PointerLock(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_states_track_each_action_independently() {
        let mut states = ActionStates::default();
        states.set(InputAction::MoveForward, true);
        states.set(InputAction::StrafeRight, true);
        states.set(InputAction::MoveForward, false);

        assert!(!states.is_down(InputAction::MoveForward));
        assert!(states.is_down(InputAction::StrafeRight));
        assert!(!states.is_down(InputAction::Quit));
    }
}
