//! CodeStudio CLI
//!
//! Drives a studio session from the command line. Each invocation opens the
//! saved project and transcript, performs one action, and saves again when
//! either changed.

use std::path::PathBuf;
use std::process;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};

use codestudio::config::{load_config, save_config};
use codestudio::generation::AnthropicClient;
use codestudio::store::StudioStore;
use codestudio::tree::FileNode;
use codestudio::util::{default_data_dir, expand_tilde};
use codestudio::{logging, Reply, Session};

#[derive(Parser)]
#[command(name = "codestudio")]
#[command(about = "Generate, edit, preview and export AI-built projects")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding config, credential and saved project (default: ~/.codestudio)
    #[arg(long)]
    data_dir: Option<String>,

    /// Log level, overriding the config file (RUST_LOG still takes precedence)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a prompt to the model and apply any files it returns
    Generate {
        #[arg(required = true)]
        prompt: Vec<String>,
    },
    /// Replace a project file with the contents of a local file
    Edit { path: String, source: PathBuf },
    /// Print a file, or list a folder
    Show { path: String },
    /// Print the whole project tree
    Tree,
    /// Write the project as a zip archive
    Export { output: Option<PathBuf> },
    /// Print the preview document, or write it to a file
    Preview {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Store the API key
    SetKey { key: String },
    /// Switch between the dark and light theme
    Theme,
    /// Forget the saved project and transcript so the next run starts fresh
    Reset,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = cli
        .data_dir
        .as_deref()
        .map(expand_tilde)
        .unwrap_or_else(default_data_dir);
    let mut config = load_config(&data_dir);
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    logging::init(level, Some(data_dir.join("logs").as_path()))?;

    let store = StudioStore::new(data_dir.clone());
    let session = Session::open(
        AnthropicClient::from_config(&config),
        store.clone(),
        config.theme,
    );

    match cli.command {
        Commands::Generate { prompt } => {
            let reply = session.send_message(&prompt.join(" ")).await?;
            session.save().await?;
            match reply {
                Reply::Generated { message, written, rejected } => {
                    println!("{message}");
                    for path in &written {
                        println!("  wrote {path}");
                    }
                    for file in &rejected {
                        println!("  skipped {}: {}", file.path, file.reason);
                    }
                }
                Reply::Chat { message } => println!("{message}"),
                Reply::Failed { message } => return Err(anyhow!(message)),
            }
        }
        Commands::Edit { path, source } => {
            let content = std::fs::read_to_string(&source)
                .with_context(|| format!("Failed to read {}", source.display()))?;
            session.edit_file(&path, &content).await?;
            session.save().await?;
        }
        Commands::Show { path } => match session.find(&path).await {
            Some(node) => match node.content() {
                Some(content) => print!("{content}"),
                None => print!("{}", render_tree(&node)),
            },
            None => bail!("No file or folder at {path}"),
        },
        Commands::Tree => print!("{}", render_tree(&session.tree().await)),
        Commands::Export { output } => {
            let output =
                output.unwrap_or_else(|| PathBuf::from(format!("{}.zip", config.project_name)));
            let entries = session.export_zip(&output).await?;
            println!("Wrote {entries} files to {}", output.display());
        }
        Commands::Preview { out } => {
            let document = session.preview_document().await;
            match out {
                Some(path) => std::fs::write(&path, document)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => print!("{document}"),
            }
        }
        Commands::SetKey { key } => {
            if key.trim().is_empty() {
                bail!("API key is empty");
            }
            session.set_api_key(&key).await?;
            println!("API key saved");
        }
        Commands::Theme => {
            config.theme = session.toggle_theme().await;
            save_config(&data_dir, &config)?;
            println!("Theme set to {}", config.theme);
        }
        Commands::Reset => {
            store.clear_tree()?;
            store.clear_transcript()?;
            println!("Saved project and transcript cleared");
        }
    }

    Ok(())
}

/// Indented listing in the same order the explorer shows it.
fn render_tree(node: &FileNode) -> String {
    let mut out = String::new();
    render_node(node, 0, &mut out);
    out
}

fn render_node(node: &FileNode, depth: usize, out: &mut String) {
    let label = if depth == 0 { node.path() } else { node.name() };
    out.push_str(&"  ".repeat(depth));
    out.push_str(label);
    if node.is_folder() && label != "/" {
        out.push('/');
    }
    out.push('\n');
    for child in node.children() {
        render_node(child, depth + 1, out);
    }
}
