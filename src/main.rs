mod cli;
mod config;
mod events;
mod geometry;
mod gestures;
mod input;
mod ipc;
mod landmarks;
mod logging;
mod reducer;
mod tracker;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}
