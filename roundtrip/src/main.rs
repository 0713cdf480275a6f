mod args;
mod logging;
mod scenarios;

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sql_marshal::prelude::*;

use crate::args::{Args, RunConfig};

fn main() {
    let args = Args::parse();
    let config = RunConfig::from_args(args);
    if let Err(err) = logging::init(config.log.as_deref(), config.quiet) {
        eprintln!("failed to open log file: {err}");
        std::process::exit(1);
    }

    let config_json = serde_json::to_string_pretty(&config).unwrap_or_else(|_| "{}".to_string());
    tracing::info!("config: {}", config_json);

    let mut conn = match SqliteOptionsBuilder::new(config.db.clone())
        .length_semantics(config.length_semantics)
        .build()
    {
        Ok(conn) => conn,
        Err(err) => {
            tracing::error!("failed to open {}: {err}", config.db);
            std::process::exit(1);
        }
    };

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut checks = 0;
    let mut failures = 0;
    for &scenario in &config.scenarios {
        match scenarios::run(scenario, &config, &mut conn, &mut rng) {
            Ok(outcome) => {
                tracing::info!(
                    "scenario={:?} checks={} failures={}",
                    outcome.scenario,
                    outcome.checks,
                    outcome.failures.len()
                );
                checks += outcome.checks;
                failures += outcome.failures.len();
            }
            Err(err) => {
                tracing::error!("scenario={scenario:?} aborted: {err}");
                failures += 1;
            }
        }
    }

    tracing::info!(
        "complete: scenarios={} checks={} failures={} seed={}",
        config.scenarios.len(),
        checks,
        failures,
        config.seed
    );
    if failures > 0 {
        std::process::exit(1);
    }
}
