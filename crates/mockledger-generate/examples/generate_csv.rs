use std::env;
use std::path::PathBuf;

use mockledger_config::ConfigurationModel;
use mockledger_generate::{CsvOutputWriter, GenerationEngine};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut config_path: Option<PathBuf> = None;
    let mut out_dir = PathBuf::from("out");

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next().map(PathBuf::from),
            "--out" => out_dir = args.next().map(PathBuf::from).ok_or("missing --out value")?,
            _ => {
                if config_path.is_none() {
                    config_path = Some(PathBuf::from(arg));
                } else {
                    return Err("unexpected argument".into());
                }
            }
        }
    }

    let config = match config_path {
        Some(path) => {
            let loaded = ConfigurationModel::from_file(&path)?;
            for warning in &loaded.warnings {
                eprintln!("warning: {warning}");
            }
            loaded.config
        }
        None => ConfigurationModel::default(),
    };

    let engine = GenerationEngine::new();
    let report = engine.run(&config, &CsvOutputWriter::new(out_dir))?;

    for file in &report.files {
        println!("{}", file.display());
    }
    Ok(())
}
