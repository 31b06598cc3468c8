//! OneLang runtime CLI - harness around the reflection registry and the
//! anchored matcher

mod demo;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use onelang_runtime::match_from_offset;
use onelang_runtime::reflect::Registry;

/// onert - OneLang runtime harness
#[derive(Parser, Debug)]
#[command(name = "onert")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Exercise the OneLang runtime support library", long_about = None)]
struct Cli {
    /// Show debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match PATTERN against SUBJECT starting exactly at OFFSET
    Match {
        #[arg(value_name = "PATTERN")]
        pattern: String,

        #[arg(value_name = "SUBJECT")]
        subject: String,

        /// Byte offset the match must start at
        #[arg(short, long, default_value_t = 0)]
        offset: usize,

        /// Print the groups as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Register the reflection fixture and exercise every operation
    Demo,
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Command::Match {
            pattern,
            subject,
            offset,
            json,
        } => {
            let Some(groups) = match_from_offset(&pattern, &subject, offset)? else {
                if json {
                    println!("null");
                } else {
                    eprintln!("no match");
                }
                std::process::exit(1);
            };
            if json {
                println!("{}", serde_json::to_string(&groups)?);
            } else {
                for group in groups {
                    println!("{group}");
                }
            }
        }
        Command::Demo => {
            let mut registry = Registry::new();
            demo::register(&mut registry);
            for line in demo::run(&registry)? {
                println!("{line}");
            }
        }
    }

    Ok(())
}
