mod commands;

use anyhow::Result;
use arbiter_judge::{ArgShape, BackendKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arbiter-cli")]
#[command(about = "Arbiter CLI - Judge solutions, inspect harnesses and remote runtimes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Judge a source file against a JSON list of test cases
    Judge {
        /// Language name (javascript, python, cpp, java, rust)
        #[arg(short, long)]
        language: String,

        /// Path to the solution source
        #[arg(short, long)]
        source: PathBuf,

        /// Path to test cases: [{"input": "...", "expectedOutput": "..."}]
        #[arg(short, long)]
        tests: PathBuf,

        /// Entry point name, e.g. twoSum
        #[arg(short, long)]
        entry: String,

        /// Argument shape (plain, list, tree, cycle); inferred from the name when omitted
        #[arg(long)]
        shape: Option<ArgShape>,

        /// Per test case time limit in milliseconds
        #[arg(long)]
        time_limit: Option<u64>,

        /// Force a backend (local or remote)
        #[arg(short, long)]
        backend: Option<BackendKind>,

        /// Print the full result as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Print the harness generated for one input
    Harness {
        #[arg(short, long)]
        language: String,

        #[arg(short, long)]
        source: PathBuf,

        /// Test input, e.g. "[2,7,11,15], 9"
        #[arg(short, long)]
        input: String,

        #[arg(short, long)]
        entry: String,

        #[arg(long)]
        shape: Option<ArgShape>,
    },

    /// List the remote runtime catalog and the version chosen per language
    Runtimes,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Judge {
            language,
            source,
            tests,
            entry,
            shape,
            time_limit,
            backend,
            json,
        } => {
            commands::judge_file(
                &language,
                &source,
                &tests,
                commands::entry_point(&entry, shape),
                time_limit,
                backend,
                json,
            )
            .await?;
        }
        Commands::Harness {
            language,
            source,
            input,
            entry,
            shape,
        } => {
            commands::print_harness(&language, &source, &input, &commands::entry_point(&entry, shape))?;
        }
        Commands::Runtimes => {
            commands::list_runtimes().await?;
        }
    }

    Ok(())
}
