use std::path::PathBuf;

use clap::{Parser, Subcommand};
use repostore::{BatchPolicy, FileEntry, StoreError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "repostore")]
#[command(version)]
#[command(about = "Store files in a GitHub repository through the contents API", long_about = None)]
struct Cli {
    /// Config file (defaults to ./repostore.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log every API call to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the storage container if it does not exist
    Init,
    /// List stored files
    #[clap(visible_alias = "ls")]
    List {
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload local files by their file name
    #[clap(visible_alias = "up")]
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Keep going after a failed file
        #[arg(long)]
        best_effort: bool,
    },
    /// Delete a stored file by path, e.g. files/report.pdf
    #[clap(visible_alias = "rm")]
    Delete { path: String },
    /// Show the account behind GITHUB_TOKEN
    Whoami,
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("repostore=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("repostore=warn"))
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

/// Returns whether the command fully succeeded.
fn run(cli: Cli) -> Result<bool, StoreError> {
    let store = repostore::open_store(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => repostore::init_container(&store)?,
        Commands::List { json } => print_listing(&repostore::list_files(&store)?, json)?,
        Commands::Upload { files, best_effort } => {
            let store =
                if best_effort { store.with_batch_policy(BatchPolicy::BestEffort) } else { store };
            let report = repostore::upload_files(&store, &files)?;
            if !report.is_complete() {
                eprintln!(
                    "Error: {} of {} files uploaded",
                    report.uploaded_count(),
                    files.len()
                );
                return Ok(false);
            }
        }
        Commands::Delete { path } => repostore::delete_file(&store, &path)?,
        Commands::Whoami => println!("{}", repostore::whoami(&store)?),
    }
    Ok(true)
}

fn print_listing(entries: &[FileEntry], json: bool) -> Result<(), StoreError> {
    if json {
        let rendered = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::malformed("listing output", e.to_string()))?;
        println!("{}", rendered);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No files stored.");
        return Ok(());
    }
    for entry in entries {
        println!("{:>12}  {}", entry.size, entry.path);
    }
    Ok(())
}
