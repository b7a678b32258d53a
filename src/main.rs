use std::io;
use std::process::ExitCode;

use clap::Parser;

use burrow::app::{Outcome, Session};
use burrow::cli::Cli;
use burrow::config::Config;
use burrow::input::{self, CrosstermEvents};
use burrow::{logging, root, terminal, Result};

fn main() -> ExitCode {
    match run() {
        Ok(Some(outcome)) => match outcome.write_to(&mut io::stdout().lock()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("burrow: {err}");
                ExitCode::FAILURE
            }
        },
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("burrow: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<Option<Outcome>> {
    let cli = Cli::parse();
    if cli.print_config_schema {
        println!("{}", Config::schema_json()?);
        return Ok(None);
    }

    let mut config = Config::load(cli.config.as_deref())?;
    config.debug |= cli.debug;
    let root = root::resolve_from_env(cli.path.as_deref(), &config.root_markers)?;
    let log = logging::init(&config.log_filter, config.debug)?;

    terminal::ensure_tty_stdin()?;
    let (surface, guard) = terminal::setup()?;
    let inputs = input::spawn_pump(CrosstermEvents)?;
    let outcome = Session::new(root, &config, log).run(surface, inputs);
    drop(guard);
    outcome.map(Some)
}
