//! HTTP server for the crop yield estimator.

use std::path::PathBuf;

use cropyield::config::{self, AppConfig};
use cropyield::dataset::{DatasetRepository, DirectorySource};
use cropyield::estimator::YieldEstimator;
use cropyield::logging::{self, Console};
use cropyield::service::http::{self, AppState};
use cropyield::store::SqliteRowStore;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    if let Err(err) = logging::init(Console::Stderr) {
        eprintln!("Logging disabled: {err}");
    }

    let config = load_config(&options)?;
    let db_path = match options.db_path {
        Some(path) => path,
        None => config.database_path().map_err(|err| err.to_string())?,
    };
    let store = SqliteRowStore::open(&db_path).map_err(|err| err.to_string())?;
    tracing::info!("Row store at {}", db_path.display());
    let estimator = YieldEstimator::new(store, config.estimator_settings());

    let dataset_dir = options.dataset_dir.or(config.dataset.dir.clone());
    let dataset = dataset_dir.map(|dir| {
        tracing::info!("Serving dataset files from {}", dir.display());
        DatasetRepository::new(DirectorySource::new(dir))
    });
    let bind_addr = options.bind_addr.unwrap_or(config.server.bind_addr);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to start runtime: {err}"))?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .map_err(|err| format!("Failed to bind {bind_addr}: {err}"))?;
        http::serve(listener, AppState::new(estimator, dataset))
            .await
            .map_err(|err| format!("Server error: {err}"))
    })
}

fn load_config(options: &CliOptions) -> Result<AppConfig, String> {
    match &options.config_path {
        Some(path) => config::load_from_path(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())
}

#[derive(Debug, Clone, Default, PartialEq)]
struct CliOptions {
    config_path: Option<PathBuf>,
    db_path: Option<PathBuf>,
    bind_addr: Option<String>,
    dataset_dir: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        match flag {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--config" | "--db" | "--bind" | "--dataset-dir" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| format!("{flag} requires a value"))?;
                match flag {
                    "--config" => options.config_path = Some(PathBuf::from(value)),
                    "--db" => options.db_path = Some(PathBuf::from(value)),
                    "--bind" => options.bind_addr = Some(value.clone()),
                    _ => options.dataset_dir = Some(PathBuf::from(value)),
                }
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(Some(options))
}

fn help_text() -> String {
    [
        "cropyield",
        "",
        "Serve crop yield predictions over HTTP.",
        "",
        "Usage:",
        "  cropyield [--config <config.toml>] [--db <rows.db>] [--bind <addr:port>]",
        "            [--dataset-dir <dir>]",
        "",
        "Routes:",
        "  POST /api/predict",
        "  GET  /api/dataset/metadata | /api/dataset/records | /api/dataset/summary",
        "  GET  /health",
    ]
    .join("\n")
}
