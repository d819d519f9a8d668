mod engine;
mod utils;

use clap::Parser;

fn main() -> Result<(), engine::EngineError> {
    let cli = engine::cli::Cli::parse();
    utils::logger::init(cli.verbose);

    let universe = engine::Universe::new();
    let user_input = engine::user_input::UserInput::new();

    engine::Windowing::run_app(cli, universe, user_input)
}
