pub mod app;
pub mod renderer;

use std::io::Write;
use std::time::Instant;
use color_eyre::Result;
use winit::event_loop::EventLoop;
use app::App;

fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let mut event_loop = EventLoop::new()?;
    let app = App::new();

    match app.run(&mut event_loop) {
        Ok(code) => {
            log::info!("exiting with code {code}");
            // The quit payload is the process result, unmodified. The app
            // and every GPU resource it owned have already been dropped.
            std::process::exit(code);
        }
        Err(report) => {
            log::error!("fatal: {report:?}");
            std::process::exit(1);
        }
    }
}

/// Timestamped, source-location-tagged log lines, in the spirit of
/// `[file:line][elapsed][LEVEL] message`.
fn init_logging() {
    let epoch = Instant::now();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format(move |buf, record| {
        writeln!(
            buf,
            "[{}:{}][{:.6}][{}] {}",
            record.file().unwrap_or("?"),
            record.line().unwrap_or(0),
            epoch.elapsed().as_secs_f32(),
            record.level(),
            record.args(),
        )
    })
    .init();
}
