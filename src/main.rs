use std::path::PathBuf;

use anyhow::Result;
use cerbedit::{run, save};
use clap::Parser;

/// Schema-driven TUI editor for YAML and JSON documents.
#[derive(Parser)]
#[command(name = "cerbedit", version, about)]
struct Cli {
    /// Document to edit (yaml, yml or json).
    document: PathBuf,

    /// Schema describing the document.
    #[arg(short, long, value_name = "FILE", default_value = ".schema.yaml")]
    schema: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match run(&cli.document, &cli.schema).await? {
        Some(document) => {
            save(&cli.document, &document).await?;
            println!("Saved {}", cli.document.display());
        }
        None => {
            println!("No changes saved.");
        }
    }
    Ok(())
}
