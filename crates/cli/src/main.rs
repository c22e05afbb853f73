use std::fmt::Write as _;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser, ValueEnum};
use metricgen_core::MetricsDocument;
use metricgen_engine::generate;
use metricgen_loader::{FsTree, Loader};
use metricgen_markers::Registry;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "metric-gen",
    about = "Generate kube-state-metrics CustomResourceStateMetrics configuration from annotated API types",
    override_usage = "metric-gen [flags] /path/to/package [/path/to/package]",
    disable_version_flag = true
)]
struct Cli {
    /// Print out all markers available with the requested generators.
    #[arg(short = 'w', long = "which-markers", action = ArgAction::SetTrue)]
    which_markers: bool,

    /// Print version information.
    #[arg(short = 'v', long = "version", action = ArgAction::SetTrue)]
    version: bool,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t = Output::Yaml)]
    output: Output,

    /// Write the document here instead of stdout
    #[arg(short = 'f', long = "output-file", env = "METRIC_GEN_OUTPUT_FILE")]
    output_file: Option<PathBuf>,

    /// Package directories holding the API types
    packages: Vec<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Yaml, Json }

fn init_tracing() {
    let env = std::env::var("METRIC_GEN_LOG").unwrap_or_else(|_| "warn".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

/// Marker documentation, one block per category.
fn marker_docs(registry: &Registry) -> String {
    let mut out = String::new();
    for (category, defs) in registry.help_by_category() {
        let _ = writeln!(out, "{category}\n");
        for def in defs {
            let _ = writeln!(out, "+{}  ({})", def.name, def.targets.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "));
            let _ = writeln!(out, "    {}", def.help.summary);
            if def.anonymous {
                let _ = writeln!(out, "    value: string");
            }
            for arg in &def.help.args {
                let optional = if arg.optional { " (optional)" } else { "" };
                let _ = writeln!(out, "    {}: {}{}  {}", arg.name, arg.kind, optional, arg.summary);
            }
            out.push('\n');
        }
    }
    out
}

fn render(document: &MetricsDocument, output: Output) -> Result<String> {
    Ok(match output {
        Output::Yaml => serde_yaml::to_string(document).context("encoding YAML")?,
        Output::Json => serde_json::to_string_pretty(document).context("encoding JSON")? + "\n",
    })
}

fn write_document(text: &str, target: Option<&PathBuf>) -> Result<()> {
    match target {
        Some(path) => std::fs::write(path, text).with_context(|| format!("writing {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes()).context("writing to stdout")?;
            stdout.flush().context("writing to stdout")
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let registry = Registry::metrics();

    let mut universe = Loader::new(FsTree, &registry).load_roots(&cli.packages).context("loading packages")?;
    let mut diagnostics = universe.take_diagnostics();
    let generation = generate(&universe).context("generating metrics configuration")?;
    diagnostics.extend(generation.diagnostics);

    let text = render(&generation.document, cli.output)?;
    write_document(&text, cli.output_file.as_ref())?;
    info!(resources = generation.document.spec.resources.len(), "document written");

    if diagnostics.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    for diagnostic in &diagnostics {
        eprintln!("{diagnostic}");
    }
    eprintln!("generator did not run successfully");
    Ok(ExitCode::FAILURE)
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    debug!(?cli, "arguments");

    if cli.version {
        println!("metric-gen {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }
    if cli.which_markers {
        eprint!("{}", marker_docs(&Registry::metrics()));
        return ExitCode::SUCCESS;
    }
    if cli.packages.is_empty() {
        eprintln!("error: Please provide package paths as parameters\n");
        let _ = Cli::command().write_help(&mut std::io::stderr());
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
