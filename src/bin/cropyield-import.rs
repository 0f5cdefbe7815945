//! Seed the `crops_dataset` table from a `crop_yield_sample.json` style file.

use std::path::PathBuf;

use cropyield::config;
use cropyield::dataset::load_records_file;
use cropyield::logging::{self, Console};
use cropyield::store::{ReferenceRow, SqliteRowStore};

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

    let db_path = match options.db_path {
        Some(path) => path,
        None => config::load_or_default()
            .and_then(|config| config.database_path())
            .map_err(|err| err.to_string())?,
    };
    let records = load_records_file(&options.input).map_err(|err| err.to_string())?;
    let rows: Vec<ReferenceRow> = records.iter().map(|record| record.to_reference_row()).collect();

    let store = SqliteRowStore::open(&db_path).map_err(|err| err.to_string())?;
    let inserted = if options.replace {
        store.replace_reference_rows(&rows)
    } else {
        store.insert_reference_rows(&rows)
    }
    .map_err(|err| err.to_string())?;
    let total = store.reference_row_count().map_err(|err| err.to_string())?;
    tracing::info!(inserted, total, "Imported reference rows");
    println!(
        "Imported {inserted} rows from {} into {} ({total} total)",
        options.input.display(),
        db_path.display()
    );
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    db_path: Option<PathBuf>,
    input: PathBuf,
    replace: bool,
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut db_path: Option<PathBuf> = None;
    let mut input: Option<PathBuf> = None;
    let mut replace = false;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--db" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--db requires a value".to_string())?;
                db_path = Some(PathBuf::from(value));
            }
            "--input" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--input requires a value".to_string())?;
                input = Some(PathBuf::from(value));
            }
            "--replace" => replace = true,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let Some(input) = input else {
        return Err("--input is required".to_string());
    };
    Ok(Some(CliOptions {
        db_path,
        input,
        replace,
    }))
}

fn help_text() -> String {
    [
        "cropyield-import",
        "",
        "Usage:",
        "  cropyield-import --input <crop_yield_sample.json> [--db <rows.db>] [--replace]",
        "",
        "--replace clears existing reference rows before inserting.",
    ]
    .join("\n")
}
