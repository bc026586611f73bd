use crate::app::input_state::{InputState, Key};

/// A drained platform message, already translated from the windowing
/// layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message {
    /// Quit request; the payload becomes the process exit code.
    Quit { code: i32 },
    KeyDown(Key),
    KeyUp(Key),
    /// Window chatter the loop treats as an opaque tick.
    Other,
}

/// What the loop should do once the message queue is drained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Resubmit the pre-recorded frame for the next swapchain image.
    Render,
    /// Stop; the payload is the captured quit code.
    Exit(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    PumpingMessages,
    Rendering,
    Quitting { code: i32 },
}

/// Steady-state loop logic, fed by whatever drains the platform queue.
/// Messages observed after a quit are discarded, matching a message pump
/// that stops dispatching once the quit is seen.
pub struct FrameLoop {
    state: State,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self { state: State::PumpingMessages }
    }

    /// Feed one drained message. A returned message must be pushed back
    /// onto the queue: an Escape key-down turns into a quit with code 0,
    /// the way the original window procedure posts a quit message rather
    /// than exiting inline.
    pub fn handle(&mut self, message: Message, input: &mut InputState) -> Option<Message> {
        if let State::Quitting { .. } = self.state {
            return None;
        }
        self.state = State::PumpingMessages;

        match message {
            Message::Quit { code } => {
                self.state = State::Quitting { code };
                None
            }
            Message::KeyDown(Key::Escape) => Some(Message::Quit { code: 0 }),
            Message::KeyDown(key) => {
                input.set_pressed(key, true);
                None
            }
            Message::KeyUp(key) => {
                input.set_pressed(key, false);
                None
            }
            Message::Other => None,
        }
    }

    /// Called once the queue is empty: render, or exit with the captured
    /// code.
    pub fn step(&mut self) -> Step {
        match self.state {
            State::Quitting { code } => Step::Exit(code),
            _ => {
                self.state = State::Rendering;
                Step::Render
            }
        }
    }
}
