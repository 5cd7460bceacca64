use anyhow::{Context, Result};
use log::info;
use winnow_sm::config::USAGE;
use winnow_sm::{Config, Mode, Nodes};

fn main() -> Result<()> {
    // Initialize logging. Control verbosity with RUST_LOG env var:
    //   RUST_LOG=info   winnow-sm quest.txt   # load summary + transitions
    //   RUST_LOG=debug  winnow-sm quest.txt   # + registration and answers
    //   RUST_LOG=trace  winnow-sm quest.txt   # + every template resolution
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = Config::from_args(std::env::args().skip(1)).context(USAGE)?;

    match config.banner() {
        Some(banner) => println!("{banner}"),
        None => info!("Input file: {}", config.input.display()),
    }

    let mut nodes = Nodes::load(&config)
        .with_context(|| format!("failed to load {}", config.input.display()))?;

    match config.mode {
        Mode::Check => {
            println!("OK: {} nodes", nodes.len());
        }
        Mode::Dump => {
            let json = serde_json::to_string_pretty(&nodes).context("failed to serialize nodes")?;
            println!("{json}");
        }
        Mode::Run => {
            let outcome = nodes.run().context("script stopped")?;
            info!(
                "Reached node {} after {} steps",
                outcome.terminal, outcome.steps
            );
        }
    }

    Ok(())
}
