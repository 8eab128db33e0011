//! nestmap CLI - Transform flat tables into nested JSON documents
//!
//! # Main Commands
//!
//! ```bash
//! nestmap transform --mapping mapping.csv input.csv -o out.json
//! nestmap serve                          # Start HTTP server (port 3000)
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! nestmap check-mapping mapping.csv      # Show rules, list groups, path conflicts
//! nestmap parse input.csv                # Just parse the input to JSON records
//! ```

use clap::{ArgAction, Parser, Subcommand};
use nestmap::logging::{init_logging, LogConfig, LogFormat};
use nestmap::{
    build_table, parse_file_auto, read_mapping_file, transform_files, write_output, EngineConfig, MappingError,
    RuleKind,
};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "nestmap")]
#[command(about = "Transform flat CSV records into nested JSON documents", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform an input table with a mapping table
    Transform {
        /// Mapping table (.csv or .json)
        #[arg(short, long)]
        mapping: PathBuf,

        /// Input table (.csv or .json)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Envelope key for the document array
        #[arg(long)]
        envelope: Option<String>,

        /// Transform records on a single thread
        #[arg(long)]
        sequential: bool,

        /// Highest list position to honor
        #[arg(long)]
        max_list_len: Option<usize>,

        /// Fail on mapping path conflicts instead of warning
        #[arg(long)]
        strict: bool,
    },

    /// Load a mapping table and report its rules and path conflicts
    CheckMapping {
        /// Mapping table (.csv or .json)
        mapping: PathBuf,
    },

    /// Parse an input table and output its records as JSON
    Parse {
        /// Input table (.csv or .json)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose).with_format(cli.log_format);
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    let result = match cli.command {
        Commands::Transform {
            mapping,
            input,
            output,
            envelope,
            sequential,
            max_list_len,
            strict,
        } => {
            let overrides = Overrides {
                envelope,
                sequential,
                max_list_len,
                strict,
            };
            cmd_transform(&mapping, &input, output.as_deref(), overrides)
        }

        Commands::CheckMapping { mapping } => cmd_check_mapping(&mapping),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// CLI flags that take precedence over the environment.
struct Overrides {
    envelope: Option<String>,
    sequential: bool,
    max_list_len: Option<usize>,
    strict: bool,
}

impl Overrides {
    fn apply(self, mut config: EngineConfig) -> EngineConfig {
        if let Some(key) = self.envelope {
            config.envelope_key = key;
        }
        if self.sequential {
            config.parallel = false;
        }
        if let Some(max) = self.max_list_len {
            config.max_list_len = max.max(1);
        }
        if self.strict {
            config.strict_paths = true;
        }
        config
    }
}

fn cmd_transform(
    mapping: &Path,
    input: &Path,
    output: Option<&Path>,
    overrides: Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = overrides.apply(EngineConfig::from_env()?);

    eprintln!("Processing: {}", input.display());
    eprintln!("   Mapping: {}", mapping.display());

    let result = transform_files(mapping, input, &config)?;

    eprintln!("   Encoding: {}", result.csv_info.encoding);
    if let Some(d) = result.csv_info.delimiter {
        eprintln!("   Delimiter: '{}'", format_delimiter(d));
    }
    eprintln!("   Rows: {}", result.csv_info.row_count);
    eprintln!(
        "   Values: {} raw, {} mapping default, {} datatype default ({} unconvertible)",
        result.stats.raw, result.stats.mapping_default, result.stats.datatype_default, result.stats.unconvertible
    );
    if result.stats.overwritten_nodes > 0 {
        eprintln!("   Overwritten nodes: {}", result.stats.overwritten_nodes);
    }

    write_output(&result.envelope, output)?;
    if let Some(path) = output {
        eprintln!("Output written to: {}", path.display());
    }

    eprintln!("Done: {} documents", result.documents);
    Ok(())
}

fn cmd_check_mapping(mapping: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::from_env()?;
    eprintln!("Checking mapping: {}", mapping.display());

    // conflicts are listed below, so load leniently
    let lenient = EngineConfig {
        strict_paths: false,
        ..config.clone()
    };
    let table = build_table(read_mapping_file(mapping)?, &lenient)?;

    println!("Rules ({}):", table.len());
    for entry in table.entries() {
        let rule = entry.rule();
        let source = match rule.kind {
            RuleKind::List => format!("{}<n>{}", rule.prefix, rule.variable),
            RuleKind::Scalar => rule.column_name(),
        };
        let alias = rule.alias.as_deref().map(|a| format!(" (alias {})", a)).unwrap_or_default();
        let default = rule.default.as_deref().map(|d| format!(" [default {}]", d)).unwrap_or_default();
        println!(
            "  {:>3}  {:<6} {}{} -> {} : {}{}",
            entry.row(),
            rule.kind.as_str(),
            source,
            alias,
            rule.path,
            rule.datatype,
            default
        );
    }

    if !table.groups().is_empty() {
        println!("\nList groups ({}):", table.groups().len());
        for group in table.groups() {
            println!("  {} ({} rules)", group.path, group.rules.len());
        }
    }

    let conflicts = table.path_conflicts();
    if conflicts.is_empty() {
        eprintln!("\nNo path conflicts");
        return Ok(());
    }

    println!("\nPath conflicts ({}):", conflicts.len());
    for conflict in &conflicts {
        println!("  {}", conflict);
    }

    if config.strict_paths {
        return Err(MappingError::PathConflicts(conflicts).into());
    }
    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Parsing: {}", input.display());

    let result = parse_file_auto(input)?;

    eprintln!("   Encoding: {}", result.encoding);
    match result.delimiter {
        Some(d) => eprintln!("   Delimiter: '{}' (auto-detected)", format_delimiter(d)),
        None => eprintln!("   Format: JSON"),
    }
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("Parsed {} records", result.records.len());

    let records: Vec<Value> = result.records.iter().map(|r| r.to_json()).collect();
    write_output(&records, output)?;

    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::from_env()?;
    nestmap::server::start_server(port, config).await?;
    Ok(())
}
