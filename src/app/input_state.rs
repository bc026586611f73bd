use winit::keyboard::KeyCode;

/// Keys the demo tracks. Raw platform codes outside this set are dropped
/// at translation time instead of being used as an index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Escape,
    W,
    A,
    S,
    D,
    Space,
    Shift,
    Up,
    Down,
    Left,
    Right,
}

impl Key {
    pub const COUNT: usize = Key::Right as usize + 1;

    pub fn from_winit(code: KeyCode) -> Option<Key> {
        match code {
            KeyCode::Escape => Some(Key::Escape),
            KeyCode::KeyW => Some(Key::W),
            KeyCode::KeyA => Some(Key::A),
            KeyCode::KeyS => Some(Key::S),
            KeyCode::KeyD => Some(Key::D),
            KeyCode::Space => Some(Key::Space),
            KeyCode::ShiftLeft | KeyCode::ShiftRight => Some(Key::Shift),
            KeyCode::ArrowUp => Some(Key::Up),
            KeyCode::ArrowDown => Some(Key::Down),
            KeyCode::ArrowLeft => Some(Key::Left),
            KeyCode::ArrowRight => Some(Key::Right),
            _ => None,
        }
    }
}

/// Pressed/released state for every supported key, passed explicitly to
/// whoever consumes input.
#[derive(Default)]
pub struct InputState {
    pressed: [bool; Key::COUNT],
}

impl InputState {
    pub fn set_pressed(&mut self, key: Key, pressed: bool) {
        self.pressed[key as usize] = pressed;
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed[key as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_codes_translate() {
        assert_eq!(Key::from_winit(KeyCode::Escape), Some(Key::Escape));
        assert_eq!(Key::from_winit(KeyCode::KeyW), Some(Key::W));
        assert_eq!(Key::from_winit(KeyCode::ArrowLeft), Some(Key::Left));
    }

    #[test]
    fn unsupported_codes_are_rejected() {
        assert_eq!(Key::from_winit(KeyCode::F24), None);
        assert_eq!(Key::from_winit(KeyCode::NumpadAdd), None);
    }

    #[test]
    fn press_and_release_round_trip() {
        let mut input = InputState::default();
        assert!(!input.is_pressed(Key::W));
        input.set_pressed(Key::W, true);
        assert!(input.is_pressed(Key::W));
        assert!(!input.is_pressed(Key::S));
        input.set_pressed(Key::W, false);
        assert!(!input.is_pressed(Key::W));
    }
}
