//! actx - versioned context store CLI
//!
//! The `actx` command gives agents (and the humans babysitting them) a
//! durable, branchable scratch-memory with full history.
//!
//! ## Commands
//!
//! - `init`: create the repository and its main branch
//! - `read` / `update` / `append`: work with the current context
//! - `history` / `snapshot` / `search`: explore past context states
//! - `branch`: create, list, or switch branches
//! - `config`: show or override per-branch configuration
//! - `validate`: check the on-disk layout

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use actx_core::{
    BranchManager, ConfigOverlay, ConfigResolver, ContextStore, VersionId,
};

#[derive(Parser)]
#[command(name = "actx")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Versioned context store for autonomous agents", long_about = None)]
struct Cli {
    /// Repository root (default: ~/.actx)
    #[arg(long, global = true, env = "ACTX_ROOT")]
    root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the context repository
    Init,

    /// Check the repository layout and report problems
    Validate,

    /// Show or set configuration for the current branch
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Show, list, create, or switch branches
    Branch {
        #[command(subcommand)]
        action: Option<BranchAction>,
    },

    /// Print the current context content
    Read,

    /// Replace the context with new content
    Update {
        /// Message describing this change
        message: String,

        /// New content (reads stdin when omitted)
        #[arg(long)]
        content: Option<String>,
    },

    /// Append text to the context
    Append {
        /// Message describing this change
        message: String,

        /// Text to append (reads stdin when omitted)
        #[arg(long)]
        text: Option<String>,
    },

    /// Show version history for the current branch
    History {
        /// Number of versions per page
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Resume the walk after this version id
        #[arg(long)]
        starting_after: Option<String>,
    },

    /// Print the context content at a specific version
    Snapshot {
        /// Version id (full or unique prefix of at least 7 chars)
        id: String,
    },

    /// Search history for versions matching any keyword
    Search {
        /// Keywords (case-insensitive substring match)
        #[arg(required = true)]
        keywords: Vec<String>,

        /// Maximum number of matches to collect
        #[arg(long, default_value = "100")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a config value for the current branch
    Set {
        /// Config key (token_approach, token_limit)
        key: String,

        /// Config value
        value: String,
    },
}

#[derive(Subcommand)]
enum BranchAction {
    /// List all branches
    List,

    /// Create a new branch
    Create {
        /// Branch name
        name: String,

        /// Source branch (default: current)
        #[arg(long = "from")]
        from_branch: Option<String>,
    },

    /// Switch to a branch
    Checkout {
        /// Branch name
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    actx_core::init_tracing(cli.json, level);

    let root = resolve_root(cli.root)?;

    match cli.command {
        Commands::Init => cmd_init(&root),
        Commands::Validate => cmd_validate(&root),
        Commands::Config { action } => match action {
            None => cmd_config_show(&root),
            Some(ConfigAction::Set { key, value }) => cmd_config_set(&root, &key, &value),
        },
        Commands::Branch { action } => match action {
            None => cmd_branch_show(&root),
            Some(BranchAction::List) => cmd_branch_list(&root),
            Some(BranchAction::Create { name, from_branch }) => {
                cmd_branch_create(&root, &name, from_branch.as_deref())
            }
            Some(BranchAction::Checkout { name }) => cmd_branch_checkout(&root, &name),
        },
        Commands::Read => cmd_read(&root),
        Commands::Update { message, content } => cmd_update(&root, &message, content),
        Commands::Append { message, text } => cmd_append(&root, &message, text),
        Commands::History {
            limit,
            starting_after,
        } => cmd_history(&root, limit, starting_after.as_deref()),
        Commands::Snapshot { id } => cmd_snapshot(&root, &id),
        Commands::Search { keywords, limit } => cmd_search(&root, &keywords, limit),
    }
}

fn resolve_root(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(root) = flag {
        return Ok(root);
    }
    let home = std::env::var_os("HOME")
        .context("cannot locate repository: set --root, ACTX_ROOT, or HOME")?;
    Ok(PathBuf::from(home).join(".actx"))
}

fn open_store(root: &PathBuf) -> Result<ContextStore> {
    ContextStore::open(root).with_context(|| format!("failed to open repository at {}", root.display()))
}

fn current_branch(store: &ContextStore) -> Result<String> {
    BranchManager::new(store)
        .current()
        .context("failed to resolve current branch")
}

/// Initialize the context repository
fn cmd_init(root: &PathBuf) -> Result<()> {
    ContextStore::initialize(root, "main")
        .with_context(|| format!("failed to initialize repository at {}", root.display()))?;

    println!("✓ actx initialized at {}", root.display());
    println!("  - Version store created at {}", root.join("objects").display());
    println!("  - Default config created at {}", root.join("config.json").display());
    println!("  - Branch 'main' ready");
    Ok(())
}

/// Check the repository layout and report problems
fn cmd_validate(root: &PathBuf) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    if !root.exists() {
        errors.push(format!(
            "{} does not exist. Run 'actx init' first.",
            root.display()
        ));
    } else {
        println!("✓ {} exists", root.display());

        let config_path = root.join("config.json");
        if !config_path.exists() {
            errors.push(format!("{} does not exist", config_path.display()));
        } else {
            println!("✓ {} exists", config_path.display());
            match std::fs::read_to_string(&config_path) {
                Ok(raw) if serde_json::from_str::<serde_json::Value>(&raw).is_ok() => {
                    println!("✓ config.json is valid JSON");
                }
                _ => errors.push(format!("{} is not valid JSON", config_path.display())),
            }
        }

        match ContextStore::open(root) {
            Ok(store) => {
                println!("✓ version store opens");
                match current_branch(&store) {
                    Ok(branch) => println!("✓ Current branch: {branch}"),
                    Err(e) => errors.push(format!("cannot resolve current branch: {e:#}")),
                }
            }
            Err(e) => errors.push(format!("version store error: {e}")),
        }

        for subdir in ["configs", "logs"] {
            let path = root.join(subdir);
            if path.is_dir() {
                println!("✓ {} exists", path.display());
            } else {
                errors.push(format!("{} does not exist", path.display()));
            }
        }
    }

    if errors.is_empty() {
        println!("\n✓ All checks passed!");
        Ok(())
    } else {
        eprintln!("\n✗ Validation failed:");
        for error in &errors {
            eprintln!("  - {error}");
        }
        bail!("validation failed with {} problem(s)", errors.len());
    }
}

/// Show effective configuration for the current branch
fn cmd_config_show(root: &PathBuf) -> Result<()> {
    let store = open_store(root)?;
    let branch = current_branch(&store)?;
    let config = ConfigResolver::new(root).effective(&branch, &ConfigOverlay::default())?;

    println!("# Configuration for branch: {branch}");
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Set a config value for the current branch
fn cmd_config_set(root: &PathBuf, key: &str, value: &str) -> Result<()> {
    let store = open_store(root)?;
    let branch = current_branch(&store)?;
    ConfigResolver::new(root).set_branch_override(&branch, key, value)?;

    println!("✓ Set {key}={value} for branch '{branch}'");
    Ok(())
}

/// Show the current branch name
fn cmd_branch_show(root: &PathBuf) -> Result<()> {
    let store = open_store(root)?;
    println!("{}", current_branch(&store)?);
    Ok(())
}

/// List all branches with the current one marked
fn cmd_branch_list(root: &PathBuf) -> Result<()> {
    let store = open_store(root)?;
    let branches = BranchManager::new(&store);
    let current = branches.current()?;

    for name in branches.list()? {
        let marker = if name == current { "*" } else { " " };
        println!("{marker} {name}");
    }
    Ok(())
}

/// Create a new branch
fn cmd_branch_create(root: &PathBuf, name: &str, from_branch: Option<&str>) -> Result<()> {
    let store = open_store(root)?;
    let branches = BranchManager::new(&store);
    let source = match from_branch {
        Some(source) => source.to_string(),
        None => branches.current()?,
    };
    branches.create(name, &source)?;

    println!("✓ Created branch '{name}' from '{source}'");
    Ok(())
}

/// Switch to a branch
fn cmd_branch_checkout(root: &PathBuf, name: &str) -> Result<()> {
    let store = open_store(root)?;
    BranchManager::new(&store).checkout(name)?;

    println!("✓ Switched to branch '{name}'");
    Ok(())
}

/// Print the current context content
fn cmd_read(root: &PathBuf) -> Result<()> {
    let store = open_store(root)?;
    let branch = current_branch(&store)?;
    let content = store.read_current(&branch)?;
    println!("{content}");
    Ok(())
}

/// Replace the context with new content
fn cmd_update(root: &PathBuf, message: &str, content: Option<String>) -> Result<()> {
    let store = open_store(root)?;
    let branch = current_branch(&store)?;
    let content = match content {
        Some(content) => content,
        None => read_stdin("Enter new context (Ctrl+D to finish):")?,
    };

    let id = store.replace(&branch, &content, message)?;
    println!("✓ Updated context: {}", id.short());
    Ok(())
}

/// Append text to the context
fn cmd_append(root: &PathBuf, message: &str, text: Option<String>) -> Result<()> {
    let store = open_store(root)?;
    let branch = current_branch(&store)?;
    let text = match text {
        Some(text) => text,
        None => read_stdin("Enter text to append (Ctrl+D to finish):")?,
    };

    let id = store.append(&branch, &text, message)?;
    println!("✓ Appended to context: {}", id.short());
    Ok(())
}

/// Show version history for the current branch
fn cmd_history(root: &PathBuf, limit: usize, starting_after: Option<&str>) -> Result<()> {
    let store = open_store(root)?;
    let branch = current_branch(&store)?;
    let after = starting_after
        .map(|raw| raw.parse::<VersionId>())
        .transpose()?;

    let page = store.history(&branch, limit, after.as_ref())?;

    println!(
        "# History ({} of {} versions)",
        page.versions.len(),
        page.total_versions
    );
    println!();
    for version in &page.versions {
        println!("{} - {}", version.id.short(), version.timestamp.to_rfc3339());
        println!("  {}", version.message);
        println!();
    }

    if page.has_more {
        if let Some(last) = page.versions.last() {
            println!("# More versions available. Use: --starting-after {}", last.id);
        }
    }
    Ok(())
}

/// Print the context content at a specific version
fn cmd_snapshot(root: &PathBuf, id: &str) -> Result<()> {
    let store = open_store(root)?;
    let snapshot = store.snapshot(id)?;

    println!("# Snapshot: {id}");
    println!("# Message: {}", snapshot.message);
    println!("# Time: {}", snapshot.timestamp.to_rfc3339());
    println!();
    println!("{}", snapshot.content);
    Ok(())
}

/// Search history for versions matching any keyword
fn cmd_search(root: &PathBuf, keywords: &[String], limit: usize) -> Result<()> {
    let store = open_store(root)?;
    let branch = current_branch(&store)?;
    let matches = store.search(&branch, keywords, limit)?;

    println!("# Searched branch '{branch}' for: {}", keywords.join(", "));
    println!("# Found {} matches", matches.len());
    println!();
    for version in &matches {
        println!("{} - {}", version.id.short(), version.timestamp.to_rfc3339());
        println!("  {}", version.message);
        println!();
    }
    Ok(())
}

fn read_stdin(prompt: &str) -> Result<String> {
    eprintln!("{prompt}");
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("failed to read from stdin")?;
    Ok(buffer)
}
