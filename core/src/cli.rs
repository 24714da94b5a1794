use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::actions::WorkflowAction;
use crate::analyzer::{analyze, Analysis, AnalyzeOptions};
use crate::config::Config;
use crate::diagnostics::Diagnostic;
use crate::i18n::Catalog;
use crate::steps::SemanticNode;

#[derive(Parser)]
#[command(name = "scriptlens")]
#[command(about = "Scriptlens - explain workflow scripts as steps and actions", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the statement-by-statement Steps view
    Steps {
        #[command(flatten)]
        input: InputArgs,

        /// Only show statements touching the page or plugins
        #[arg(long)]
        important_only: bool,
    },

    /// Show the grouped Actions view
    Actions {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Print the source with type syntax removed
    Raw {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Report parse errors and diagnostics
    Check {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Run every view at once
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Only show statements touching the page or plugins
        #[arg(long)]
        important_only: bool,
    },
}

#[derive(Args)]
pub struct InputArgs {
    /// Script to read, or `-` for stdin
    pub file: String,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<ExitCode> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<ExitCode> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

/// Install the stderr log subscriber; `RUST_LOG` wins over `level`
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run_cli_with_args(cli: Cli) -> Result<ExitCode> {
    let important_only = match &cli.command {
        Commands::Steps { important_only, .. } | Commands::Analyze { important_only, .. } => {
            important_only.then_some(true)
        }
        _ => None,
    };

    let config = Config::builder()
        .config_path(cli.config.clone())
        .important_only(important_only)
        .build()
        .context("Failed to load configuration")?;
    init_logging(&config.logging.level);

    let catalog = config
        .catalog()
        .context("Failed to load locale catalog")?;
    let options = AnalyzeOptions::from(&config);

    match cli.command {
        Commands::Steps { input, .. } => {
            let analysis = analyze_input(&input, &options, &catalog)?;
            match input.format {
                Format::Text => print!("{}", format_steps(&analysis.steps)),
                Format::Json => println!("{}", to_json(&analysis.steps)?),
            }
        }

        Commands::Actions { input } => {
            let analysis = analyze_input(&input, &options, &catalog)?;
            match input.format {
                Format::Text => print!("{}", format_actions(&analysis.actions)),
                Format::Json => println!("{}", to_json(&analysis.actions)?),
            }
        }

        Commands::Raw { input } => {
            let source = read_input(&input.file)?;
            let raw = crate::parser::strip::strip_types(&source);
            match input.format {
                Format::Text => print!("{}", raw),
                Format::Json => println!("{}", to_json(&raw)?),
            }
        }

        Commands::Check { input } => {
            let source = read_input(&input.file)?;
            return check(&input, &source, &options, &catalog);
        }

        Commands::Analyze { input, .. } => {
            let analysis = analyze_input(&input, &options, &catalog)?;
            match input.format {
                Format::Text => print!("{}", format_analysis(&analysis)),
                Format::Json => println!("{}", to_json(&analysis)?),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn check(
    input: &InputArgs,
    source: &str,
    options: &AnalyzeOptions,
    catalog: &Catalog,
) -> Result<ExitCode> {
    match analyze(source, options, catalog) {
        Ok(analysis) => {
            match input.format {
                Format::Text if analysis.diagnostics.is_empty() => {
                    println!("{}: no issues found", input.file)
                }
                Format::Text => print!("{}", format_diagnostics(&analysis.diagnostics)),
                Format::Json => println!("{}", to_json(&analysis.diagnostics)?),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            match input.format {
                Format::Text => eprintln!("{}: {}", input.file, failure),
                Format::Json => println!("{}", to_json(&failure)?),
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn analyze_input(
    input: &InputArgs,
    options: &AnalyzeOptions,
    catalog: &Catalog,
) -> Result<Analysis> {
    let source = read_input(&input.file)?;
    analyze(&source, options, catalog)
        .map_err(anyhow::Error::new)
        .with_context(|| format!("Failed to analyze {}", input.file))
}

fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        io::read_to_string(io::stdin()).context("Failed to read script from stdin")
    } else {
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output")
}

/* ===================== Text Output ===================== */

/// Indented outline of a Steps tree, one node per line
pub fn format_steps(nodes: &[SemanticNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

fn write_node(out: &mut String, node: &SemanticNode) {
    let indent = "  ".repeat(node.depth);
    out.push_str(&indent);
    out.push_str(&node.title);
    if let Some(summary) = &node.summary {
        out.push_str(": ");
        out.push_str(summary);
    }
    if node.important {
        out.push_str(" [important]");
    }
    out.push('\n');

    if let Some(message) = &node.message {
        out.push_str(&format!("{}  ! {}\n", indent, message));
    }
    if let Some(detail) = &node.detail {
        out.push_str(&format!("{}  > {}\n", indent, detail));
    }
    for child in &node.children {
        write_node(out, child);
    }
}

pub fn format_actions(actions: &[WorkflowAction]) -> String {
    let mut out = String::new();
    for (n, action) in actions.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{}] {} ({}, {})\n",
            n + 1,
            action.icon,
            action.title,
            action.action_type.as_str(),
            action.importance.as_str()
        ));
        out.push_str(&format!("   {}\n", action.description));
        if let Some(variables) = &action.variables {
            out.push_str(&format!("   variables: {}\n", variables.join(", ")));
        }
        for line in &action.details {
            out.push_str(&format!("   {}\n", line));
        }
    }
    out
}

pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|diagnostic| format!("{}\n", diagnostic))
        .collect()
}

fn format_analysis(analysis: &Analysis) -> String {
    let mut out = format!("revision {}\n\n== Steps ==\n", analysis.revision);
    out.push_str(&format_steps(&analysis.steps));
    out.push_str("\n== Actions ==\n");
    out.push_str(&format_actions(&analysis.actions));
    if !analysis.diagnostics.is_empty() {
        out.push_str("\n== Diagnostics ==\n");
        out.push_str(&format_diagnostics(&analysis.diagnostics));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn analysis(source: &str) -> Analysis {
        analyze(source, &AnalyzeOptions::default(), &Catalog::english()).expect("Should analyze")
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "scriptlens",
            "--config",
            "lens.toml",
            "steps",
            "flow.ts",
            "--format",
            "json",
            "--important-only",
        ])
        .expect("Should parse arguments");

        assert_eq!(cli.config, Some(PathBuf::from("lens.toml")));
        match cli.command {
            Commands::Steps {
                input,
                important_only,
            } => {
                assert_eq!(input.file, "flow.ts");
                assert_eq!(input.format, Format::Json);
                assert!(important_only);
            }
            _ => panic!("Expected steps command"),
        }
    }

    #[test]
    fn test_stdin_and_default_format() {
        let cli = Cli::try_parse_from(["scriptlens", "check", "-"]).expect("Should parse arguments");
        match cli.command {
            Commands::Check { input } => {
                assert_eq!(input.file, "-");
                assert_eq!(input.format, Format::Text);
            }
            _ => panic!("Expected check command"),
        }
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["scriptlens", "raw", "a.ts", "--format", "yaml"]).is_err());
    }

    #[test]
    fn test_format_steps_outline() {
        let analysis = analysis("function workflow() {\n  const x = 1;\n  if (x) { go(); }\n}");
        let text = format_steps(&analysis.steps);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "prepare variable: const x = 1");
        assert_eq!(lines[1], "condition: if (x)");
        assert_eq!(lines[2], "  > go");
        assert_eq!(lines[3], "  Then");
        assert_eq!(lines[4], "    run tool: go(…) args=0");
    }

    #[test]
    fn test_format_steps_shows_error_message() {
        let analysis = analysis("function workflow() {\n  if () { go(); }\n}");
        let text = format_steps(&analysis.steps);
        assert!(text.contains("If (invalid)"));
        assert!(text.contains("  ! Missing test or consequent"));
    }

    #[test]
    fn test_format_actions() {
        let analysis = analysis("function workflow() {\n  await page.goto('https://a.test');\n  return 1;\n}");
        let text = format_actions(&analysis.actions);

        assert!(text.starts_with("1. [navigation] Page navigation (navigation, high)\n"));
        assert!(text.contains("   Navigate to https://a.test\n"));
        assert!(text.contains("2. [return] Return result (return, high)\n"));
    }

    #[test]
    fn test_format_diagnostics() {
        let analysis = analysis("function workflow() {\n  return 1;\n  go();\n}");
        assert_eq!(
            format_diagnostics(&analysis.diagnostics),
            "warning at line 3, col 3: Unreachable code after `return` [unreachable-code]\n"
        );
    }
}
