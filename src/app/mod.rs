mod frame_loop;
mod input_state;

pub use frame_loop::{FrameLoop, Message, Step};
pub use input_state::{InputState, Key};

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Fullscreen, Window, WindowId};
use crate::renderer::Renderer;

/// Window shell around the frame loop. Window events are translated into
/// loop messages here; the loop itself never sees the platform layer.
pub struct App {
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    input_state: InputState,
    messages: VecDeque<Message>,
    // Initialization happens inside a winit callback that cannot return
    // an error; it is parked here and surfaced by the run loop.
    init_error: Option<color_eyre::Report>,
}

impl App {
    pub fn new() -> Self {
        Self {
            window: None,
            renderer: None,
            input_state: InputState::default(),
            messages: VecDeque::new(),
            init_error: None,
        }
    }

    /// Runs until a quit message is drained; returns its payload. Every
    /// iteration drains the platform queue without blocking, then either
    /// exits or resubmits the pre-recorded frame.
    pub fn run(mut self, event_loop: &mut EventLoop<()>) -> Result<i32> {
        let mut frame_loop = FrameLoop::new();
        loop {
            let status = event_loop.pump_app_events(Some(Duration::ZERO), &mut self);
            if let Some(error) = self.init_error.take() {
                return Err(error);
            }
            if let PumpStatus::Exit(code) = status {
                // The platform tore the loop down underneath us.
                return Ok(code);
            }

            while let Some(message) = self.messages.pop_front() {
                if let Some(follow_up) = frame_loop.handle(message, &mut self.input_state) {
                    self.messages.push_back(follow_up);
                }
            }

            match frame_loop.step() {
                Step::Exit(code) => return Ok(code),
                Step::Render => {
                    if let Some(renderer) = self.renderer.as_mut() {
                        renderer.draw()?;
                    }
                }
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title("prism")
            .with_fullscreen(Some(Fullscreen::Borderless(None)));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(error) => {
                self.init_error = Some(eyre!("could not create window: {error}"));
                event_loop.exit();
                return;
            }
        };
        window.set_cursor_visible(false);
        log::info!("window created");

        match Renderer::new(window.clone()) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(error) => {
                self.init_error = Some(error.wrap_err("renderer initialization failed"));
                event_loop.exit();
                return;
            }
        }

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self
            .window
            .as_ref()
            .map_or(true, |window| window.id() != window_id)
        {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.messages.push_back(Message::Quit { code: 0 });
            }
            WindowEvent::KeyboardInput { event, .. } if !event.repeat => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    // Codes outside the supported set are dropped here.
                    if let Some(key) = Key::from_winit(code) {
                        let message = match event.state {
                            ElementState::Pressed => Message::KeyDown(key),
                            ElementState::Released => Message::KeyUp(key),
                        };
                        self.messages.push_back(message);
                    }
                }
            }
            _ => {}
        }
    }
}
