//! Windowed quadgrid demo: a tile sheet with pulsing opacity and a frame
//! counter label, each drawn as one batch.
//!
//! ```text
//! atlas-demo [ATLAS ITEM_WIDTH ITEM_HEIGHT ITEM_COUNT]
//! ```
//!
//! Set `RUST_LOG=debug` to see atlas allocation and layout messages.

mod app;
mod sheet;

use app::DemoConfig;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = DemoConfig::from_args(std::env::args().skip(1)).and_then(app::run);
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
