//! Standalone binary to validate contract files against the descriptor schema.
//! Used by CI to ensure contract files are loadable before release.

use anyhow::{bail, Context};
use callgate::contract::{is_contract_file, ContractLoader, ContractRegistry};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let contract_dir = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CALLGATE_CONTRACT_DIR").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("contracts"));

    println!("Using contract directory: {}", contract_dir.display());

    let loader = ContractLoader::new().context("descriptor schema did not compile")?;
    let mut files: Vec<PathBuf> = std::fs::read_dir(&contract_dir)
        .with_context(|| format!("cannot read {}", contract_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| is_contract_file(p))
        .collect();
    files.sort();

    let mut errors = Vec::new();
    let mut loaded = Vec::new();

    println!("\n=== Validating Contracts ===");
    for file in &files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        print!("Validating {}... ", name);
        match loader.load_file(file) {
            Ok(descriptors) => {
                let count = descriptors.len();
                println!("ok ({} contract{})", count, if count == 1 { "" } else { "s" });
                loaded.extend(descriptors);
            }
            Err(e) => {
                println!("FAILED");
                errors.push(format!("  {}: {}", name, e));
            }
        }
    }

    if !errors.is_empty() {
        eprintln!("\n=== Validation Errors ===");
        for error in &errors {
            eprintln!("{}", error);
        }
        bail!("{} of {} contract files failed validation", errors.len(), files.len());
    }

    let registry = ContractRegistry::builder()
        .register_all(loaded)
        .context("contract files disagree")?
        .build();
    println!(
        "\nAll {} files valid, {} commands: {}",
        files.len(),
        registry.len(),
        registry.commands().join(", ")
    );
    Ok(())
}
