//! Command-line interface for ziptree.
//!
//! Loads ZIP archives and folders into a single tree, optionally filters it,
//! selects PDFs and exports them, then prints the tree in the chosen format.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::exit;
use tracing_subscriber::EnvFilter;
use ziptree::output::{self, RenderContext};
use ziptree::{
    BuildOptionsBuilder, InputArchive, Notification, Notifier, ProgressUpdate, Session, Severity,
    ZiptreeError, collect_folder,
};

/// ziptree — browse archives and folders as one tree
#[derive(Parser)]
#[command(name = "ziptree", version, about, long_about = None)]
struct Cli {
    /// ZIP files or folders to load, in order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Tree)]
    format: OutputFormat,

    /// Only show nodes whose name contains this term (accent and case insensitive)
    #[arg(short, long)]
    filter: Option<String>,

    /// Select every visible PDF
    #[arg(long)]
    select_all: bool,

    /// Export the selected PDFs to this file, or into this directory under a dated name
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Maximum depth of nested archives to expand
    #[arg(long, default_value_t = 8)]
    max_nesting: usize,

    /// Extra ignore patterns (can be repeated)
    #[arg(short = 'I', long = "ignore")]
    ignore_patterns: Vec<String>,

    /// Load oversized inputs without asking
    #[arg(short, long)]
    yes: bool,

    /// Write the tree to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty JSON output
    #[arg(short, long)]
    pretty: bool,

    /// Do not print progress
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Tree,
    Paths,
    Json,
}

impl From<OutputFormat> for output::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Tree => output::OutputFormat::Tree,
            OutputFormat::Paths => output::OutputFormat::Paths,
            OutputFormat::Json => output::OutputFormat::Json,
        }
    }
}

/// Prints notifications to stderr and asks confirmations on stdin.
struct ConsoleNotifier {
    assume_yes: bool,
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: &Notification) {
        let tag = match notification.severity {
            Severity::Info => "info",
            Severity::Success => "ok",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        eprintln!("[{}] {}: {}", tag, notification.title, notification.message);
    }

    fn confirm(&self, notification: &Notification) -> bool {
        self.notify(notification);
        if self.assume_yes {
            return true;
        }
        eprint!("Continue? [y/N] ");
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }
}

fn print_progress(update: &ProgressUpdate) {
    eprintln!("{:>5.1}% {} {}", update.percent, update.stage.label(), update.detail);
}

/// `RUST_LOG` when it parses, otherwise warnings and errors only.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.inputs.iter().any(|p| p.is_dir()) && cli.inputs.iter().any(|p| !p.is_dir()) {
        Cli::command()
            .error(
                ErrorKind::ArgumentConflict,
                "folders and archives cannot be loaded in the same batch",
            )
            .exit();
    }
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), ZiptreeError> {
    let options = BuildOptionsBuilder::new()
        .max_nesting(cli.max_nesting)
        .ignore_patterns(cli.ignore_patterns)
        .build();
    let mut session = Session::new(options).with_notifier(ConsoleNotifier { assume_yes: cli.yes });
    if !cli.quiet {
        session = session.with_progress(print_progress);
    }

    let (folders, archives): (Vec<PathBuf>, Vec<PathBuf>) = cli.inputs.into_iter().partition(|p| p.is_dir());
    let report = if folders.is_empty() {
        session
            .load_archives(archives.iter().map(InputArchive::from_path).collect())
            .await
    } else {
        let mut files = Vec::new();
        for folder in &folders {
            files.extend(collect_folder(folder)?);
        }
        session.load_folder(files).await
    };
    // Failures were already reported through the notifier.
    if report.loaded.is_empty() {
        exit(1);
    }

    if let Some(term) = &cli.filter {
        session.apply_filter(term);
    }
    if cli.select_all {
        session.select_all(true);
    }
    if let Some(target) = &cli.export {
        let Ok(archive) = session.export_selected().await else {
            exit(1);
        };
        let path = if target.is_dir() {
            target.join(&archive.file_name)
        } else {
            target.clone()
        };
        std::fs::write(&path, archive.blob.bytes()).map_err(|e| ZiptreeError::io(&path, e))?;
        eprintln!("Wrote {} PDF(s) to {}", archive.included.len(), path.display());
    }

    let context = RenderContext {
        selection: Some(session.selection()),
        filter: session.filter(),
    };
    match &cli.output {
        Some(path) => output::write_tree_to_file(session.tree(), cli.format.into(), &context, path, cli.pretty)?,
        None => {
            let out = output::format_tree(session.tree(), cli.format.into(), &context, cli.pretty)?;
            println!("{}", out.trim_end());
        }
    }
    Ok(())
}
