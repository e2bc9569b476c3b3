use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::backends::{create_client, effective_mode};
use crate::batch::{run_batch, BatchEvent, BatchOptions, BatchReport, FailurePolicy};
use crate::config::{ClientMode, Overrides, Settings};
use crate::model::IssueSpec;
use crate::parser::{parse_specs, InputFormat};

const RULE_WIDTH: usize = 60;
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Parser)]
#[command(name = "linear-issue-maker", version, about = "Create Linear issues from CSV or text specs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create one issue per spec, in input order
    Create(CreateArgs),
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Input file (reads stdin when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    pub format: InputFormat,

    /// CSV field delimiter
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// Parse and print the specs without contacting Linear
    #[arg(long)]
    pub dry_run: bool,

    /// Fail instead of creating projects that do not exist yet
    #[arg(long)]
    pub no_create_missing_projects: bool,

    /// Keep going after a failed issue
    #[arg(long)]
    pub continue_on_error: bool,

    /// Only print the final summary
    #[arg(long)]
    pub no_progress: bool,

    #[arg(long, value_enum, default_value_t = ClientMode::Auto)]
    pub client_mode: ClientMode,

    #[arg(long, env = "LINEAR_MCP_SERVER_URL")]
    pub server_url: Option<String>,

    #[arg(long, env = "LINEAR_API_URL")]
    pub api_url: Option<String>,

    /// Access token used by both backends
    #[arg(long, env = "LINEAR_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// File holding the access token
    #[arg(long, env = "LINEAR_TOKEN_PATH")]
    pub token_path: Option<PathBuf>,
}

impl CreateArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            server_url: self.server_url.clone(),
            api_url: self.api_url.clone(),
            token: self.token.clone(),
            token_path: self.token_path.clone(),
        }
    }

    fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            create_missing_projects: !self.no_create_missing_projects,
            policy: if self.continue_on_error {
                FailurePolicy::ContinueOnError
            } else {
                FailurePolicy::StopOnFirstError
            },
        }
    }
}

impl Cli {
    pub async fn execute(self) -> Result<ExitCode> {
        match self.command {
            Command::Create(args) => execute_create(args).await,
        }
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read input from stdin")?;
            Ok(buf)
        }
    }
}

async fn execute_create(args: CreateArgs) -> Result<ExitCode> {
    let source = args.input.as_deref();
    let content = read_input(source)?;
    let format = args.format.detect(source, &content);

    let specs = match parse_specs(&content, format, source, args.delimiter) {
        Ok(specs) => specs,
        Err(e) => {
            eprintln!("{}", format!("{} parsing error: {e}", format_label(format)).red());
            return Ok(ExitCode::FAILURE);
        }
    };
    println!("Parsed {} issue(s)", specs.len());

    let mode = effective_mode(args.client_mode, &specs);
    let mode_display = mode_label(args.client_mode, mode);

    if args.dry_run {
        print!("{}", render_dry_run(&specs, &mode_display));
        return Ok(ExitCode::SUCCESS);
    }

    let client = Settings::load(args.overrides()).and_then(|settings| create_client(mode, &specs, &settings));
    let mut client = match client {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", format!("Failed to create client: {e:#}").red());
            return Ok(ExitCode::FAILURE);
        }
    };
    println!("Using {mode_display} client\n");

    let show_progress = !args.no_progress;
    let result = run_batch(client.as_mut(), &specs, args.batch_options(), |event| {
        if show_progress {
            print_event(event);
        }
    })
    .await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{}", format!("Failed to open {} session: {e}", mode.as_str()).red());
            return Ok(ExitCode::FAILURE);
        }
    };

    if report.aborted {
        if let Some(last) = report.failed.last() {
            eprintln!(
                "{}",
                format!("\nBatch creation stopped due to error: {}", last.error).red()
            );
        }
    }
    print!("{}", render_summary(&report));

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn format_label(format: InputFormat) -> &'static str {
    match format {
        InputFormat::Text => "Text",
        _ => "CSV",
    }
}

fn mode_label(requested: ClientMode, effective: ClientMode) -> String {
    if requested == ClientMode::Auto {
        format!("{} (auto-detected)", effective.as_str())
    } else {
        effective.as_str().to_string()
    }
}

/// First `max` characters of `text`, with an ellipsis when cut.
fn preview(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}

fn render_dry_run(specs: &[IssueSpec], mode_display: &str) -> String {
    let mut out = format!("Client mode: {mode_display}\n\nDry run, parsed issues:\n");
    for (i, spec) in specs.iter().enumerate() {
        out.push_str(&format!("\n{}. {}\n", i + 1, spec.title()));
        out.push_str(&format!("   Team: {}\n", spec.team()));
        out.push_str(&format!("   Project: {}\n", spec.project()));
        if let Some(template) = spec.template() {
            out.push_str(&format!("   Template: {template}\n"));
        }
        out.push_str(&format!("   Summary: {}\n", preview(spec.summary(), PREVIEW_CHARS)));
    }
    out
}

/// Progress line for one batch event. Failures go to stderr.
fn event_line(event: &BatchEvent<'_>) -> (String, bool) {
    match event {
        BatchEvent::Started { index, total, spec } => {
            (format!("[{index}/{total}] Creating: {}", spec.title()), false)
        }
        BatchEvent::ProjectCreated { spec } => {
            let line = format!(
                "  Created project '{}' in team '{}'",
                spec.project(),
                spec.team()
            );
            (line.yellow().to_string(), false)
        }
        BatchEvent::Created { issue } => {
            let target = issue.url().unwrap_or(issue.title());
            let line = format!("  ✓ Created {}: {target}", issue.display_id());
            (line.green().to_string(), false)
        }
        BatchEvent::Failed { spec, error } => {
            let line = format!("  ✗ Failed '{}': {error}", spec.title());
            (line.red().to_string(), true)
        }
    }
}

fn print_event(event: BatchEvent<'_>) {
    match event_line(&event) {
        (line, true) => eprintln!("{line}"),
        (line, false) => println!("{line}"),
    }
}

fn render_summary(report: &BatchReport) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = format!(
        "\n{rule}\nBatch creation complete!\n  Successfully created: {}\n  Failed: {}\n",
        report.created.len(),
        report.failed.len()
    );

    if !report.failed.is_empty() {
        out.push_str(&format!("\n{rule}\nFailed issues:\n"));
        for failed in &report.failed {
            let line = format!("  • {}: {}", failed.spec.title(), failed.error);
            out.push_str(&format!("{}\n", line.red()));
        }
    }

    if !report.created.is_empty() {
        out.push_str(&format!("\n{rule}\nCreated issues:\n"));
        for issue in &report.created {
            let line = format!("  • {}: {}", issue.display_id(), issue.title());
            out.push_str(&format!("{}\n", line.green()));
            if let Some(url) = issue.url() {
                out.push_str(&format!("    {url}\n"));
            }
        }
    }
    out
}
