//! mbql - inspect and edit MBQL queries from the command line
//!
//! Usage:
//!   mbql quote <text> [--kind double|single|bracket]
//!   mbql compile <source> --metadata <file> --query <file>
//!   mbql drills --metadata <file> --query <file> --click <file>
//!   mbql drill drill-thru/sort --choice desc --metadata ... --query ... --click ...
//!
//! Results are printed to stdout as JSON, logs go to stderr.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mbql_drill::{trend, ClickContext, DrillType};
use mbql_expr::{classify, CompileContext, QuoteKind};
use mbql_ir::{ColumnMetadata, Expression, Metadata, Query};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error};

mod config;
mod logging;

use config::Config;

#[derive(Parser)]
#[command(name = "mbql")]
#[command(about = "Compile, format and drill through MBQL queries")]
#[command(version)]
struct Cli {
    /// YAML config file (defaults plus environment overrides when absent)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quote raw text for use in an expression
    Quote {
        text: String,

        #[arg(short, long, default_value = "double")]
        kind: QuoteArg,
    },

    /// Strip the quotes from quoted text
    Unquote { text: String },

    /// Render a column or metric name as an identifier
    FormatIdentifier { name: String },

    /// Report the node kind of a wire expression
    Classify {
        /// Wire JSON, e.g. '["+", 1, 2]'
        expression: String,
    },

    /// Compile expression source text to wire JSON
    Compile {
        source: String,

        #[command(flatten)]
        target: QueryArgs,

        /// Long display name of the expression being edited
        #[arg(long)]
        reference: Option<String>,
    },

    /// Render a wire expression as source text
    Format {
        /// Wire JSON, e.g. '["+", ["field", 10, null], 1]'
        expression: String,

        #[command(flatten)]
        target: QueryArgs,
    },

    /// List the drills available for a click
    Drills {
        #[command(flatten)]
        target: QueryArgs,

        /// JSON file with the click context
        #[arg(long)]
        click: PathBuf,
    },

    /// Apply one drill and print the resulting query
    Drill {
        /// Drill type, e.g. drill-thru/quick-filter
        drill_type: String,

        /// Choice to apply, defaults to the first one offered
        #[arg(long)]
        choice: Option<String>,

        #[command(flatten)]
        target: QueryArgs,

        /// JSON file with the click context
        #[arg(long)]
        click: PathBuf,
    },

    /// Headline value and change for a metric column of query results
    Trend {
        /// JSON file with `cols` and `rows`
        results: PathBuf,

        /// Name of the metric column
        #[arg(long)]
        metric: String,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// JSON file with database metadata
    #[arg(long)]
    metadata: PathBuf,

    /// JSON file with the query
    #[arg(long)]
    query: PathBuf,

    /// Stage index, defaults to the last stage
    #[arg(long)]
    stage: Option<usize>,
}

struct Target {
    metadata: Metadata,
    query: Query,
    stage: usize,
}

impl QueryArgs {
    fn load(&self) -> Result<Target> {
        let metadata: Metadata = read_json(&self.metadata)?;
        let query: Query = read_json(&self.query)?;
        let stage = self.stage.unwrap_or_else(|| query.last_stage_index());
        query.stage(stage)?;
        Ok(Target {
            metadata,
            query,
            stage,
        })
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum QuoteArg {
    Double,
    Single,
    Bracket,
}

impl From<QuoteArg> for QuoteKind {
    fn from(arg: QuoteArg) -> Self {
        match arg {
            QuoteArg::Double => QuoteKind::Double,
            QuoteArg::Single => QuoteKind::Single,
            QuoteArg::Bracket => QuoteKind::Bracket,
        }
    }
}

#[derive(Deserialize)]
struct Results {
    cols: Vec<ColumnMetadata>,
    rows: Vec<Vec<JsonValue>>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

fn parse_wire(text: &str) -> Result<Expression> {
    let value: JsonValue = serde_json::from_str(text).context("expression is not JSON")?;
    Ok(Expression::from_wire(&value)?)
}

fn run(command: Commands, config: &Config) -> Result<JsonValue> {
    match command {
        Commands::Quote { text, kind } => Ok(json!(mbql_expr::quote(&text, kind.into()))),

        Commands::Unquote { text } => Ok(json!(mbql_expr::unquote(&text)?)),

        Commands::FormatIdentifier { name } => Ok(json!(mbql_expr::format_identifier(
            &name,
            &config.editor.quotes
        ))),

        Commands::Classify { expression } => {
            let value: JsonValue =
                serde_json::from_str(&expression).context("expression is not JSON")?;
            Ok(json!({
                "kind": classify::classify(&value),
                "expression": classify::is_expression(&value),
            }))
        }

        Commands::Compile {
            source,
            target,
            reference,
        } => {
            let target = target.load()?;
            let ctx = CompileContext {
                reference: reference.as_deref(),
                config: &config.editor,
                ..CompileContext::new(&target.metadata, &target.query, target.stage)
            };
            let expr = mbql_expr::compile(&source, &ctx)?;
            debug!(source = %source, "Compiled expression");
            Ok(expr.to_wire())
        }

        Commands::Format { expression, target } => {
            let target = target.load()?;
            let expr = parse_wire(&expression)?;
            let text = mbql_expr::format_expression(
                &expr,
                &target.metadata,
                &target.query,
                target.stage,
                &config.editor,
            )?;
            Ok(json!(text))
        }

        Commands::Drills { target, click } => {
            let target = target.load()?;
            let click: ClickContext = read_json(&click)?;
            let drills = mbql_drill::available(&target.metadata, &target.query, target.stage, &click);
            Ok(serde_json::to_value(drills)?)
        }

        Commands::Drill {
            drill_type,
            choice,
            target,
            click,
        } => {
            let drill_type = DrillType::parse(&drill_type)
                .ok_or_else(|| anyhow!("unknown drill type: {drill_type}"))?;
            let target = target.load()?;
            let click: ClickContext = read_json(&click)?;

            let Some(descriptor) =
                mbql_drill::available(&target.metadata, &target.query, target.stage, &click)
                    .into_iter()
                    .find(|descriptor| descriptor.drill_type() == drill_type)
            else {
                bail!("{drill_type} is not available for this click");
            };
            let descriptor = match choice {
                Some(choice) => descriptor.select(choice),
                None => descriptor,
            };

            let query =
                mbql_drill::apply(&target.metadata, &target.query, target.stage, &descriptor)?;
            Ok(serde_json::to_value(query)?)
        }

        Commands::Trend { results, metric } => {
            let results: Results = read_json(&results)?;
            let trend = trend::compute_trend(&results.cols, &results.rows, &metric)
                .ok_or_else(|| anyhow!("no value for {metric} in the last row"))?;
            Ok(serde_json::to_value(trend)?)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::from_env(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logging::init(&config.logging) {
        eprintln!("Error: failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli.command, &config) {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "Failed to render output");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
