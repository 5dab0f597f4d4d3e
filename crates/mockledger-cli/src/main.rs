mod logging;
mod prompt;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use mockledger_config::{
    ConfigError, ConfigLayers, ConfigurationModel, ItemConfig, PartialConfig, RelationshipPolicy,
    ValidationIssue, config_json_schema, load_partial, parse_id_list, write_json_atomic,
};
use mockledger_core::{EntityKind, ItemMode};
use mockledger_generate::{
    BatchController, CountOutcome, CsvOutputWriter, DEFAULT_BATCH_COUNTS, GenerationEngine,
    GenerationError,
};
use thiserror::Error;
use tracing::{info, warn};

use logging::{LogFormat, LoggingError, init_logging};
use prompt::{PromptCollector, PromptError};

const DEFAULT_CONFIG_FILE: &str = "mockledger_config.json";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("prompt error: {0}")]
    Prompt(#[from] PromptError),
    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{failed} of {total} batch counts failed")]
    BatchFailed { failed: usize, total: usize },
}

#[derive(Parser, Debug)]
#[command(name = "mockledger", version, about = "Mock business record generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Log output format on stderr.
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
    /// Also append JSON log lines to this file.
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate CSV files for the configured entity kinds.
    Generate(GenerateArgs),
    /// Inspect configuration files.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the JSON Schema of the configuration file.
    Schema,
    /// Print a configuration file resolved against the defaults.
    Show(ShowArgs),
}

#[derive(Args, Debug)]
struct ShowArgs {
    #[arg(long = "load-config", value_name = "PATH")]
    load_config: PathBuf,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Records per entity kind.
    #[arg(value_name = "COUNT")]
    count: Option<u64>,
    /// Entity kind to generate; repeat for several.
    #[arg(long = "entity", value_name = "KIND")]
    entities: Vec<EntityKind>,
    /// Run once per batch count.
    #[arg(long, default_value_t = false)]
    batch: bool,
    /// Counts for batch mode (defaults to 200,300,400,500).
    #[arg(long, value_name = "N,..", value_delimiter = ',')]
    batch_counts: Vec<u64>,
    /// Run batch counts in parallel.
    #[arg(long, default_value_t = false)]
    parallel: bool,
    #[arg(long, value_name = "PATH")]
    load_config: Option<PathBuf>,
    /// Save the resolved configuration (default: <out-dir>/mockledger_config.json).
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    save_config: Option<Option<PathBuf>>,
    /// Ask for every value not given by flags or the loaded file.
    #[arg(long, default_value_t = false)]
    interactive: bool,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,
    #[arg(long)]
    address_lines: Option<u8>,
    #[arg(long)]
    contacts: Option<u8>,
    /// Comma separated customer account ids.
    #[arg(long, value_name = "IDS")]
    account_ids: Option<String>,
    /// Comma separated supplier account ids.
    #[arg(long, value_name = "IDS")]
    supplier_ids: Option<String>,
    /// Comma separated invoice ids.
    #[arg(long, value_name = "IDS")]
    invoice_ids: Option<String>,
    /// Comma separated purchase invoice ids.
    #[arg(long, value_name = "IDS")]
    purchase_invoice_ids: Option<String>,
    /// Comma separated system item ids.
    #[arg(long, value_name = "IDS")]
    system_item_ids: Option<String>,
    /// Comma separated tax uuids.
    #[arg(long, value_name = "IDS")]
    tax_uuids: Option<String>,
    /// system_only, line_only or both.
    #[arg(long, value_name = "MODE")]
    item_mode: Option<ItemMode>,
    #[arg(long, value_name = "N")]
    max_items: Option<u32>,
    /// uniform, round_robin or weighted[:skew].
    #[arg(long, value_name = "POLICY")]
    policy: Option<RelationshipPolicy>,
    /// Write the run or batch report as JSON next to the CSV files.
    #[arg(long, default_value_t = false)]
    report: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = init_logging(cli.log_format, cli.log_file.as_deref())
        .map_err(CliError::from)
        .and_then(|()| run(cli.command));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Generate(args) => run_generate(args),
        Command::Config(ConfigCommand::Schema) => {
            println!("{}", serde_json::to_string_pretty(&config_json_schema())?);
            Ok(())
        }
        Command::Config(ConfigCommand::Show(args)) => {
            let loaded = load_partial(&args.load_config)?;
            report_warnings(&loaded.warnings);
            let resolved = ConfigurationModel::from_partial(loaded.layer)?;
            report_warnings(&resolved.warnings);
            println!("{}", serde_json::to_string_pretty(&resolved.config)?);
            Ok(())
        }
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let file = match &args.load_config {
        Some(path) => {
            let loaded = load_partial(path)?;
            report_warnings(&loaded.warnings);
            info!(path = %path.display(), "configuration loaded");
            loaded.layer
        }
        None => PartialConfig::default(),
    };
    let cli = cli_layer(&args, &file);
    let interactive = if args.interactive {
        let known = PartialConfig::merge(file.clone(), cli.clone());
        let stdin = io::stdin();
        PromptCollector::new(stdin.lock(), io::stdout()).collect(&known)?
    } else {
        PartialConfig::default()
    };

    let resolved = ConfigLayers {
        cli,
        file,
        interactive,
    }
    .resolve()?;
    report_warnings(&resolved.warnings);
    let config = resolved.config;

    if let Some(path) = save_path(&args) {
        config.to_file(&path)?;
        info!(path = %path.display(), "configuration saved");
    }

    let writer = CsvOutputWriter::new(&args.out_dir);
    let engine = GenerationEngine::new();
    if args.batch || !args.batch_counts.is_empty() {
        let counts = if args.batch_counts.is_empty() {
            DEFAULT_BATCH_COUNTS.to_vec()
        } else {
            args.batch_counts.clone()
        };
        let report = BatchController::new(engine)
            .parallel(args.parallel)
            .run_batch(&counts, &config, &writer);
        for outcome in &report.outcomes {
            match outcome {
                CountOutcome::Succeeded { count, report } => {
                    println!("count {count}: {} file(s)", report.files.len());
                    for path in &report.files {
                        println!("  {}", path.display());
                    }
                }
                CountOutcome::Failed { count, error } => println!("count {count}: failed: {error}"),
            }
        }
        if args.report {
            let path = args
                .out_dir
                .join(format!("batch_report_{}.json", report.batch_id));
            write_json_atomic(&path, &report)?;
        }
        if report.failed() > 0 {
            return Err(CliError::BatchFailed {
                failed: report.failed(),
                total: report.outcomes.len(),
            });
        }
    } else {
        let report = engine.run(&config, &writer)?;
        for path in &report.files {
            println!("{}", path.display());
        }
        if args.report {
            let path = args
                .out_dir
                .join(format!("run_report_{}.json", report.run_id));
            write_json_atomic(&path, &report)?;
        }
    }
    Ok(())
}

/// Flags as the highest-precedence layer. Item flags refine the loaded
/// file's item settings since nested structures replace whole.
fn cli_layer(args: &GenerateArgs, file: &PartialConfig) -> PartialConfig {
    let ids = |raw: &Option<String>| raw.as_deref().map(parse_id_list);

    let items = if args.item_mode.is_some() || args.max_items.is_some() || args.system_item_ids.is_some()
    {
        let mut items: ItemConfig = file.items.clone().unwrap_or_default();
        if let Some(mode) = args.item_mode {
            items.mode = mode;
        }
        if let Some(max) = args.max_items {
            items.max_items_per_document = max;
        }
        if let Some(system_ids) = ids(&args.system_item_ids) {
            items.system_item_ids = system_ids;
        }
        Some(items)
    } else {
        None
    };

    PartialConfig {
        record_count: args.count,
        entities: (!args.entities.is_empty()).then(|| args.entities.clone()),
        seed: args.seed,
        address_lines: args.address_lines,
        contacts: args.contacts,
        account_ids: ids(&args.account_ids),
        supplier_account_ids: ids(&args.supplier_ids),
        invoice_ids: ids(&args.invoice_ids),
        purchase_invoice_ids: ids(&args.purchase_invoice_ids),
        tax_uuids: ids(&args.tax_uuids),
        items,
        relationship_policy: args.policy,
        ..PartialConfig::default()
    }
}

fn save_path(args: &GenerateArgs) -> Option<PathBuf> {
    args.save_config.as_ref().map(|path| {
        path.clone()
            .unwrap_or_else(|| default_config_path(&args.out_dir))
    })
}

fn default_config_path(out_dir: &Path) -> PathBuf {
    out_dir.join(DEFAULT_CONFIG_FILE)
}

fn report_warnings(warnings: &[ValidationIssue]) {
    for issue in warnings {
        warn!(code = %issue.code, path = %issue.path, "{}", issue.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_args(argv: &[&str]) -> GenerateArgs {
        let argv = ["mockledger", "generate"].iter().chain(argv);
        match Cli::try_parse_from(argv).expect("valid arguments").command {
            Command::Generate(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn flags_become_the_cli_layer() {
        let args = generate_args(&[
            "25",
            "--entity",
            "account",
            "--entity",
            "purchase-invoice",
            "--supplier-ids",
            "S1, S2",
            "--policy",
            "weighted:2",
            "--address-lines",
            "3",
        ]);
        let layer = cli_layer(&args, &PartialConfig::default());

        assert_eq!(layer.record_count, Some(25));
        assert_eq!(
            layer.entities,
            Some(vec![EntityKind::Account, EntityKind::PurchaseInvoice])
        );
        assert_eq!(
            layer.supplier_account_ids,
            Some(vec!["S1".to_string(), "S2".to_string()])
        );
        assert_eq!(
            layer.relationship_policy,
            Some(RelationshipPolicy::Weighted { skew: 2.0 })
        );
        assert_eq!(layer.address_lines, Some(3));
        assert_eq!(layer.contacts, None);
        assert_eq!(layer.items, None);
    }

    #[test]
    fn item_flags_refine_the_loaded_item_settings() {
        let file = PartialConfig {
            items: Some(ItemConfig {
                system_item_ids: vec!["ITEM-1".to_string()],
                ..ItemConfig::default()
            }),
            ..PartialConfig::default()
        };
        let args = generate_args(&["--max-items", "3"]);
        let items = cli_layer(&args, &file).items.expect("items layer");

        assert_eq!(items.max_items_per_document, 3);
        assert_eq!(items.system_item_ids, vec!["ITEM-1".to_string()]);
        assert_eq!(items.mode, ItemMode::Both);
    }

    #[test]
    fn cli_layer_wins_over_the_file() {
        let file = PartialConfig {
            record_count: Some(500),
            contacts: Some(2),
            ..PartialConfig::default()
        };
        let args = generate_args(&["7"]);
        let resolved = ConfigLayers {
            cli: cli_layer(&args, &file),
            file,
            interactive: PartialConfig::default(),
        }
        .resolve()
        .expect("valid layers");

        assert_eq!(resolved.config.record_count, 7);
        assert_eq!(resolved.config.contacts, 2);
    }

    #[test]
    fn save_config_without_a_path_goes_to_the_output_directory() {
        let args = generate_args(&["--save-config", "--out-dir", "target/mock"]);
        assert_eq!(
            save_path(&args),
            Some(Path::new("target/mock").join(DEFAULT_CONFIG_FILE))
        );

        let args = generate_args(&["--save-config", "custom.json"]);
        assert_eq!(save_path(&args), Some(PathBuf::from("custom.json")));

        assert_eq!(save_path(&generate_args(&[])), None);
    }

    #[test]
    fn purchase_invoice_ids_feed_purchase_payments() {
        let args = generate_args(&[
            "--entity",
            "purchase_payment",
            "--purchase-invoice-ids",
            "PINV-1,PINV-2",
        ]);
        let layer = cli_layer(&args, &PartialConfig::default());
        assert_eq!(layer.entities, Some(vec![EntityKind::PurchasePayment]));
        assert_eq!(
            layer.purchase_invoice_ids,
            Some(vec!["PINV-1".to_string(), "PINV-2".to_string()])
        );
        assert_eq!(layer.invoice_ids, None);
    }

    #[test]
    fn batch_counts_are_comma_separated() {
        let args = generate_args(&["--batch-counts", "10,20,30", "--parallel"]);
        assert_eq!(args.batch_counts, vec![10, 20, 30]);
        assert!(args.parallel);
    }
}
