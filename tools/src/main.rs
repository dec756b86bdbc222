//! dash-runner: command-line front end for the delinquency dashboard engine.
//!
//! Usage:
//!   dash-runner [--data-dir DIR] [--history-db PATH] <command> [arg]
//!
//!   dash-runner overview
//!   dash-runner predict '{"sim_age_days": 400, ...}'
//!   dash-runner single_predict '{"loan_count_30d": 3}'
//!   dash-runner --history-db history.db predict_single '{...}'
//!   dash-runner forecast 14
//!
//! Prints exactly one JSON object on stdout. Logs go to stderr (RUST_LOG).

use anyhow::Result;
use delinquency_core::{
    config::DashboardConfig,
    dispatch::{failure_envelope, Dispatcher, Response},
    resources::ResourceStore,
    store::HistoryStore,
};
use std::env;
use std::io::{self, Write};

/// Flags that consume the following argument.
const VALUE_FLAGS: &[&str] = &["--data-dir", "--history-db"];

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let data_dir = flag_value(&args, "--data-dir").unwrap_or(".");
    let positional = positional_args(&args);

    let response = match build_dispatcher(data_dir, flag_value(&args, "--history-db")) {
        Ok(dispatcher) => dispatcher.handle(
            positional.first().copied(),
            positional.get(1).copied(),
        ),
        Err(e) => Response { body: failure_envelope(&e), exit_code: 0 },
    };

    let mut stdout = io::stdout();
    writeln!(stdout, "{}", serde_json::to_string(&response.body)?)?;
    stdout.flush()?;

    std::process::exit(response.exit_code);
}

fn build_dispatcher(
    data_dir: &str,
    history_flag: Option<&str>,
) -> delinquency_core::error::DashResult<Dispatcher> {
    let config = DashboardConfig::load(data_dir)?;
    log::debug!("data dir {data_dir}, config {config:?}");

    let history_path = history_flag
        .map(str::to_string)
        .or_else(|| config.history_db.as_ref().map(|p| config.resolve(p).display().to_string()));

    let dispatcher = Dispatcher::new(ResourceStore::new(config));
    match history_path {
        Some(path) => {
            let history = HistoryStore::open(&path)?;
            history.migrate()?;
            log::info!("prediction history at {path}");
            Ok(dispatcher.with_history(history))
        }
        None => Ok(dispatcher),
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// Arguments that are neither flags nor flag values, in order.
fn positional_args(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if VALUE_FLAGS.contains(&args[i].as_str()) {
            i += 2;
            continue;
        }
        out.push(args[i].as_str());
        i += 1;
    }
    out
}
