//! JSON:API Graph CLI
//!
//! Command-line interface for checking documents and model files and for
//! applying documents to an in-memory store.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use jsonapi_graph::{
    load_document_auto, load_model, Document, MemoryStore, NamingConvention, RegistryOptions,
    SchemaError, SchemaRegistry, TracingSink, UpdateStats, DEFAULT_ID_NAMES,
};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jsonapi-graph")]
#[command(about = "Parse JSON:API documents and apply them to a schema-driven record store")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG is used otherwise
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a document and print its normalized form
    Parse {
        /// Document source: file path or URL (http:// or https://)
        document: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a model file and build the schema registry from it
    CheckModel {
        /// Model file
        model: PathBuf,

        #[command(flatten)]
        schema: SchemaArgs,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Apply documents in order to a fresh store and print the resulting records
    Apply {
        /// Model file
        #[arg(long, short)]
        model: PathBuf,

        /// Document sources: file paths or URLs, applied in order
        #[arg(required = true)]
        documents: Vec<String>,

        #[command(flatten)]
        schema: SchemaArgs,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Print update and store counters to stderr
        #[arg(long)]
        stats: bool,
    },
}

#[derive(clap::Args)]
struct SchemaArgs {
    /// Naming convention for remote names: none, snake-case or hyphen
    #[arg(long, default_value = "snake-case", value_parser = parse_naming)]
    naming: NamingConvention,

    /// Identifier attribute names tried when none is flagged (repeatable)
    #[arg(long = "id-name")]
    id_names: Vec<String>,
}

impl SchemaArgs {
    fn options(&self) -> RegistryOptions {
        let id_names = if self.id_names.is_empty() {
            DEFAULT_ID_NAMES.iter().map(|s| s.to_string()).collect()
        } else {
            self.id_names.clone()
        };
        RegistryOptions::new()
            .naming(self.naming)
            .default_id_names(id_names)
            .diagnostics(Arc::new(TracingSink))
    }
}

fn parse_naming(s: &str) -> Result<NamingConvention, String> {
    NamingConvention::parse(s)
        .ok_or_else(|| format!("unknown naming convention '{}' (none, snake-case, hyphen)", s))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Parse {
            document,
            output,
            pretty,
        } => run_parse(&document, output, pretty),

        Commands::CheckModel {
            model,
            schema,
            json,
        } => run_check_model(&model, &schema, json),

        Commands::Apply {
            model,
            documents,
            schema,
            output,
            pretty,
            stats,
        } => run_apply(&model, &documents, &schema, output, pretty, stats),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_parse(source: &str, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let document = load_document_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_json(&document.to_wire(), output, pretty)
}

fn run_check_model(path: &Path, schema: &SchemaArgs, json_output: bool) -> Result<(), u8> {
    let registry = load_registry(path, schema, json_output)?;

    if json_output {
        let entities: Vec<Value> = registry
            .entities()
            .map(|entity| {
                json!({
                    "name": entity.name(),
                    "type": entity.remote_name(),
                    "id": entity.identifier().name(),
                    "attributes": entity.attributes().map(|a| a.remote_name()).collect::<Vec<_>>(),
                    "relationships": entity.relationships().map(|r| r.remote_name()).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", json!({ "valid": true, "entities": entities }));
    } else {
        println!("Valid");
        for entity in registry.entities() {
            println!(
                "  {} ({}): id '{}', {} attributes, {} relationships",
                entity.name(),
                entity.remote_name(),
                entity.identifier().name(),
                entity.attributes().count(),
                entity.relationships().count()
            );
        }
    }
    Ok(())
}

fn run_apply(
    model_path: &Path,
    sources: &[String],
    schema: &SchemaArgs,
    output: Option<PathBuf>,
    pretty: bool,
    print_stats: bool,
) -> Result<(), u8> {
    let model = load_model(model_path).map_err(|e| {
        report_schema_error(false, &e);
        e.exit_code() as u8
    })?;
    let registry = SchemaRegistry::new(&model, schema.options()).map_err(|e| {
        report_schema_error(false, &e);
        e.exit_code() as u8
    })?;
    let mut store = MemoryStore::for_model(&model);
    let mut totals = UpdateStats::default();

    for source in sources {
        let document = load_document_auto(source).map_err(|e| {
            eprintln!("Error: loading {}: {}", source, e);
            e.exit_code() as u8
        })?;
        let result = registry.update_document(&mut store, &document).map_err(|e| {
            eprintln!("Error: applying {}: {}", source, e);
            e.exit_code() as u8
        })?;
        totals.merge(&result.stats);
    }

    let resources = store
        .all_records()
        .iter()
        .map(|record| registry.serialize_record(&store, record))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            eprintln!("Error: serializing store: {}", e);
            e.exit_code() as u8
        })?;

    if print_stats {
        eprintln!(
            "{}",
            json!({ "update": totals, "store": store.stats(), "records": store.len() })
        );
    }

    let document = Document {
        data: Some(resources),
        ..Document::default()
    };
    write_json(&document.to_wire(), output, pretty)
}

fn load_registry(path: &Path, schema: &SchemaArgs, json_output: bool) -> Result<SchemaRegistry, u8> {
    let model = load_model(path).map_err(|e| {
        report_schema_error(json_output, &e);
        e.exit_code() as u8
    })?;
    SchemaRegistry::new(&model, schema.options()).map_err(|e| {
        report_schema_error(json_output, &e);
        e.exit_code() as u8
    })
}

/// Output a schema error in plain text or JSON format.
fn report_schema_error(json_output: bool, error: &SchemaError) {
    let violations = match error {
        SchemaError::InvalidModel { violations } => violations.clone(),
        _ => Vec::new(),
    };

    if json_output {
        let output = json!({
            "valid": false,
            "error": error.to_string(),
            "kind": error.kind(),
            "errors": violations,
        });
        println!("{}", output);
    } else {
        eprintln!("Error: {}", error);
        for violation in violations {
            eprintln!("  {}", violation);
        }
    }
}

fn write_json(value: &Value, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}
