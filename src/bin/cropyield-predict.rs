//! One-shot prediction: reads a request JSON object, prints the response envelope.

use std::io::Read;
use std::path::PathBuf;

use cropyield::config;
use cropyield::estimator::YieldEstimator;
use cropyield::logging::{self, Console};
use cropyield::service;
use cropyield::store::SqliteRowStore;

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

/// Returns whether the prediction succeeded; the envelope is printed either way.
fn run() -> Result<bool, String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(true);
    };
    if let Err(err) = logging::init(Console::Off) {
        eprintln!("Logging disabled: {err}");
    }

    let config = match &options.config_path {
        Some(path) => config::load_from_path(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    let db_path = match options.db_path {
        Some(path) => path,
        None => config.database_path().map_err(|err| err.to_string())?,
    };
    let body = read_input(options.input.as_deref())?;

    let store = SqliteRowStore::open(&db_path).map_err(|err| err.to_string())?;
    let estimator = YieldEstimator::new(store, config.estimator_settings());
    let (json, ok) = match service::handle_predict(&estimator, &body) {
        Ok(response) => (serde_json::to_string_pretty(&response), true),
        Err(err) => (serde_json::to_string_pretty(&err.envelope()), false),
    };
    let json = json.map_err(|err| err.to_string())?;
    println!("{json}");
    Ok(ok)
}

fn read_input(path: Option<&std::path::Path>) -> Result<Vec<u8>, String> {
    match path {
        Some(path) => std::fs::read(path)
            .map_err(|err| format!("Failed to read {}: {err}", path.display())),
        None => {
            let mut body = Vec::new();
            std::io::stdin()
                .read_to_end(&mut body)
                .map_err(|err| format!("Failed to read stdin: {err}"))?;
            Ok(body)
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config_path: Option<PathBuf>,
    db_path: Option<PathBuf>,
    input: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--db" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--db requires a value".to_string())?;
                options.db_path = Some(PathBuf::from(value));
            }
            "--input" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--input requires a value".to_string())?;
                options.input = Some(PathBuf::from(value));
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(Some(options))
}

fn help_text() -> String {
    [
        "cropyield-predict",
        "",
        "Usage:",
        "  cropyield-predict [--config <config.toml>] [--db <rows.db>] [--input <request.json>]",
        "",
        "Reads the request from stdin when --input is omitted.",
    ]
    .join("\n")
}
