use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use nti_verdict::render::{bracketed, to_html, to_json, to_text};
use nti_verdict::{to_markup, DrillDown, Engine, NtiError, ScoredResult, Tables};

#[derive(Parser)]
#[command(
    name = "nti-verdict",
    about = "Render NTI scoring results and highlight tilt trigger phrases",
    version
)]
struct Cli {
    /// Tables document (JSON) replacing the built-in tilt-v1 tables
    #[arg(long, global = true)]
    tables: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the verdict for a scored result and its original text
    Render {
        /// Scored result JSON from the scoring service
        #[arg(long)]
        result: PathBuf,
        /// Original text (reads stdin if omitted)
        #[arg(long)]
        text: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Expand one tilt row with its highlighted source spans
        #[arg(long)]
        drill: Option<String>,
    },
    /// Highlight one tilt category's trigger phrases in a text
    Highlight {
        #[arg(long)]
        tag: String,
        /// Text to highlight (reads stdin if omitted)
        #[arg(long)]
        text: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print the effective tables as JSON
    Tables,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Html,
    Text,
}

fn read_text(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(p) => {
            std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))
        }
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("reading stdin")?;
            Ok(input)
        }
    }
}

fn load_engine(tables: Option<&Path>) -> anyhow::Result<Engine> {
    let tables = match tables {
        Some(p) => Tables::from_json(&read_text(Some(p))?)
            .with_context(|| format!("loading tables from {}", p.display()))?,
        None => Tables::canonical().clone(),
    };
    Ok(Engine::new(tables)?)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let engine = load_engine(cli.tables.as_deref())?;

    match cli.command {
        Commands::Render {
            result,
            text,
            format,
            drill,
        } => {
            let scored = ScoredResult::from_json(&read_text(Some(result.as_path()))?)
                .with_context(|| format!("parsing {}", result.display()))?;
            let text = read_text(text.as_deref())?;
            let model = engine.render(&scored, &text);

            let mut drill_down = DrillDown::new();
            if let Some(tag) = &drill {
                drill_down.toggle(tag);
            }
            let segments = drill_down.segments(&engine, &text);
            let expanded = drill_down.active().zip(segments.as_deref());

            match format {
                Format::Json => println!("{}", to_json(&model)?),
                Format::Html => println!("{}", to_html(&model, expanded)),
                Format::Text => println!("{}", to_text(&model, expanded)),
            }
        }
        Commands::Highlight { tag, text, format } => {
            let text = read_text(text.as_deref())?;
            let segments = engine.highlight(&text, &tag);
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&segments)?),
                Format::Html => println!("{}", to_markup(&segments)),
                Format::Text => println!("{}", bracketed(&segments)),
            }
        }
        Commands::Tables => {
            println!("{}", serde_json::to_string_pretty(engine.tables())?);
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        let code = e
            .downcast_ref::<NtiError>()
            .map(|err| err.error_code())
            .unwrap_or("NTI_ERROR");
        eprintln!("Error [{code}]: {e:#}");
        std::process::exit(1);
    }
}
