//! CLI argument parsing and command dispatch.
//!
//! A small operational surface over the persistence layer using clap's
//! derive API: inspect, move, and share saved graphs without the
//! presentation layer.
//!
//! # Commands
//!
//! - `list`: List saved graphs
//! - `show`: Show a saved graph's summary and nodes
//! - `export`: Write a saved graph as portable text
//! - `import`: Read portable text into a new save
//! - `delete`: Delete a saved graph
//! - `share`: Print a share locator for a saved graph
//!
//! # Example
//!
//! ```bash
//! lineage --dir ~/.lineage list
//! lineage --dir ~/.lineage export g-4f2k81qa --output pipeline.json
//! lineage --dir ~/.lineage share g-4f2k81qa --base https://example.com/lineage
//! ```

use crate::persistence::{self, GraphStore};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

/// Lineage - a graph state and relationship engine for data lineage
///
/// Saved graphs live in a local store directory; this tool lists,
/// exports, imports, deletes, and shares them.
#[derive(Parser, Debug)]
#[command(name = "lineage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Store directory holding saved graphs
    #[arg(long, global = true, default_value = ".lineage")]
    pub dir: PathBuf,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List saved graphs
    List,

    /// Show a saved graph's summary and nodes
    Show(ShowArgs),

    /// Export a saved graph as portable text
    Export(ExportArgs),

    /// Import portable text as a new saved graph
    Import(ImportArgs),

    /// Delete a saved graph permanently
    Delete(DeleteArgs),

    /// Print a share locator embedding a saved graph
    Share(ShareArgs),
}

/// Arguments for the `show` command
#[derive(Parser, Debug, Clone)]
pub struct ShowArgs {
    /// Saved graph id (as printed by `list`)
    pub id: String,
}

/// Arguments for the `export` command
#[derive(Parser, Debug, Clone)]
pub struct ExportArgs {
    /// Saved graph id
    pub id: String,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `import` command
#[derive(Parser, Debug, Clone)]
pub struct ImportArgs {
    /// File containing exported portable text
    pub file: PathBuf,

    /// Display name for the new save
    #[arg(short, long)]
    pub name: String,
}

/// Arguments for the `delete` command
#[derive(Parser, Debug, Clone)]
pub struct DeleteArgs {
    /// Saved graph id
    pub id: String,
}

/// Arguments for the `share` command
#[derive(Parser, Debug, Clone)]
pub struct ShareArgs {
    /// Saved graph id
    pub id: String,

    /// Base URL the locator is built on
    #[arg(short, long)]
    pub base: String,
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the parsed command.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or the command's
    /// persistence operation fails; the message carries enough context
    /// to act on.
    pub fn execute(&self) -> Result<()> {
        let store = GraphStore::open(&self.dir)
            .with_context(|| format!("opening store at {}", self.dir.display()))?;

        match &self.command {
            Some(Commands::List) => {
                let summaries = store.list()?;
                if summaries.is_empty() {
                    println!("No saved graphs.");
                    return Ok(());
                }
                for summary in summaries {
                    println!(
                        "{}  {}  ({} nodes, {} edges)  saved {}",
                        summary.id.cyan(),
                        summary.name.bold(),
                        summary.node_count,
                        summary.edge_count,
                        summary.saved_at.format("%Y-%m-%d %H:%M UTC")
                    );
                }
                Ok(())
            }
            Some(Commands::Show(args)) => {
                let saved = store.load(&args.id)?;
                println!("{}  {}", saved.id.cyan(), saved.name.bold());
                println!("saved at: {}", saved.saved_at.format("%Y-%m-%d %H:%M UTC"));
                println!(
                    "{} nodes, {} edges",
                    saved.state.nodes.len(),
                    saved.state.edges.len()
                );
                for node in saved.state.nodes.values() {
                    let marker = if node.is_visible() { " " } else { "·" };
                    println!(
                        "  {} {}  {}  [{}]",
                        marker,
                        node.id.as_str().cyan(),
                        node.qualified_name,
                        node.object_type
                    );
                }
                Ok(())
            }
            Some(Commands::Export(args)) => {
                let saved = store.load(&args.id)?;
                let text = persistence::export_text(&saved.state)?;
                match &args.output {
                    Some(path) => {
                        fs::write(path, &text)
                            .with_context(|| format!("writing {}", path.display()))?;
                        println!("Exported {} to {}", args.id.cyan(), path.display());
                    }
                    None => println!("{text}"),
                }
                Ok(())
            }
            Some(Commands::Import(args)) => {
                let text = fs::read_to_string(&args.file)
                    .with_context(|| format!("reading {}", args.file.display()))?;
                let state = persistence::import_text(&text)?;
                let id = store.save_named(&args.name, &state)?;
                println!(
                    "Imported {} as {} ({} nodes)",
                    args.name.bold(),
                    id.cyan(),
                    state.nodes.len()
                );
                Ok(())
            }
            Some(Commands::Delete(args)) => {
                store.delete(&args.id)?;
                println!("Deleted {}", args.id.cyan());
                Ok(())
            }
            Some(Commands::Share(args)) => {
                let saved = store.load(&args.id)?;
                let locator = persistence::share_locator(&args.base, &saved.state)?;
                println!("{locator}");
                Ok(())
            }
            None => {
                println!("Lineage graph store");
                println!("Use --help for more information");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list() {
        let cli = Cli::try_parse_from(["lineage", "--dir", "/tmp/store", "list"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::List)));
        assert_eq!(cli.dir, PathBuf::from("/tmp/store"));
    }

    #[test]
    fn parses_export_with_output() {
        let cli =
            Cli::try_parse_from(["lineage", "export", "g-abc", "--output", "out.json"]).unwrap();
        match cli.command {
            Some(Commands::Export(args)) => {
                assert_eq!(args.id, "g-abc");
                assert_eq!(args.output, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn import_requires_name() {
        let result = Cli::try_parse_from(["lineage", "import", "in.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_share() {
        let cli = Cli::try_parse_from([
            "lineage",
            "share",
            "g-abc",
            "--base",
            "https://example.com/lineage",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Share(args)) => {
                assert_eq!(args.base, "https://example.com/lineage");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
