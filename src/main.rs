//! Paper Anonymization CLI Application.
//!
//! This binary provides a command-line interface for the anonymizer
//! library: de-identify a paper, restore it, look up a single value, or
//! inspect what would be redacted.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use anonymizer::{
    AnonymizationService, AnonymizerConfig, AnonymizerError, EncryptionKey, FieldFlags,
    FieldKind, Mapping, KEY_ENV_VAR,
};

/// Paper Anonymization Tool
///
/// Reversibly remove author names, emails, affiliations, titles and
/// addresses from the header of academic-paper PDFs.
#[derive(Parser)]
#[command(name = "anonymizer")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Encryption passphrase (padded or truncated to 32 bytes)
    #[arg(long, env = KEY_ENV_VAR, hide_env_values = true, global = true)]
    key: Option<String>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// De-identify a PDF and write its mapping
    Anonymize {
        /// Input PDF file path
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Mapping JSON output path
        #[arg(short, long, value_name = "FILE")]
        mapping: PathBuf,

        /// Field kinds to redact (defaults to name, email, affiliation)
        #[arg(short, long, value_delimiter = ',', value_name = "KIND")]
        fields: Vec<FieldKind>,

        /// Append an ENCRYPTED INFORMATION page to the output
        #[arg(long)]
        embed_info_page: bool,

        /// Leave plaintext originals out of the mapping
        #[arg(long)]
        no_plaintext: bool,
    },

    /// Restore a de-identified PDF
    Restore {
        /// Input PDF file path
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Mapping JSON (defaults to the embedded ENCRYPTED INFORMATION page)
        #[arg(short, long, value_name = "FILE")]
        mapping: Option<PathBuf>,
    },

    /// Recover a single value from its hash or token
    Lookup {
        /// SHA-256 hash or encrypted token
        #[arg(long, value_name = "HASH")]
        hash: String,

        /// Mapping JSON
        #[arg(short, long, value_name = "FILE")]
        mapping: PathBuf,
    },

    /// Print the author records that would be redacted
    Scan {
        /// Input PDF file path
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },

    /// Extract text from a PDF (for debugging and verification)
    Extract {
        /// Input PDF file path
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output text file (optional, defaults to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

/// Command handler owning the configured service.
struct AnonymizeHandler {
    service: AnonymizationService,
    verbose: bool,
}

impl AnonymizeHandler {
    fn new(config: AnonymizerConfig, key: EncryptionKey, verbose: bool) -> Result<Self> {
        let service = AnonymizationService::with_mupdf(config, key)
            .context("Invalid configuration")?;
        Ok(Self { service, verbose })
    }

    fn anonymize(
        &self,
        input: &Path,
        output: &Path,
        mapping_path: &Path,
        options: FieldFlags,
    ) -> Result<()> {
        if self.verbose {
            println!("Input:   {}", input.display());
            println!("Output:  {}", output.display());
            println!("Mapping: {}", mapping_path.display());
            let kinds: Vec<&str> = options.enabled().map(|k| k.as_str()).collect();
            println!("Fields:  {}", kinds.join(", "));
        }

        let result = self
            .service
            .anonymize(input, output, options)
            .with_context(|| "Anonymization failed")?;

        result
            .mapping
            .save(mapping_path)
            .with_context(|| format!("Failed to write {}", mapping_path.display()))?;

        if self.verbose {
            println!("\nRedaction Summary:");
            println!("  Fields encrypted:   {}", result.mapping.encrypted_data.len());
            println!("  Instances redacted: {}", result.report.instances_redacted);
            println!("  Overlaps skipped:   {}", result.report.skipped_overlaps);
            println!("  Pages written:      {}", result.pages_written);
        }

        if result.report.has_redactions() {
            println!(
                "✓ Redacted {} instance(s) → {}",
                result.report.instances_redacted,
                output.display()
            );
        } else {
            println!("⚠ {}", AnonymizerError::NoSensitiveData);
        }
        Ok(())
    }

    fn restore(&self, input: &Path, output: &Path, mapping_path: Option<&Path>) -> Result<()> {
        let result = match mapping_path {
            Some(path) => {
                let mapping = Mapping::load(path)
                    .with_context(|| format!("Failed to read mapping {}", path.display()))?;
                self.service.restore(input, output, &mapping)
            }
            None => self.service.restore_embedded(input, output),
        }
        .with_context(|| "Restore failed")?;

        for failure in &result.failures {
            println!(
                "✗ field {} ({}): {}",
                failure.index, failure.kind, failure.reason
            );
        }
        println!(
            "✓ Restored {} instance(s) → {}",
            result.applied,
            output.display()
        );
        if !result.failures.is_empty() {
            anyhow::bail!("{} field(s) could not be restored", result.failures.len());
        }
        Ok(())
    }

    fn lookup(&self, hash: &str, mapping_path: &Path) -> Result<()> {
        let mapping = Mapping::load(mapping_path)
            .with_context(|| format!("Failed to read mapping {}", mapping_path.display()))?;
        let value = self
            .service
            .anonymizer()
            .reidentify_by_token(hash, &mapping)
            .with_context(|| "Lookup failed")?;
        println!("{}", value);
        Ok(())
    }

    fn scan(&self, input: &Path) -> Result<()> {
        let records = self
            .service
            .scan(input)
            .with_context(|| "Scan failed")?;
        if records.is_empty() {
            println!("⚠ {}", AnonymizerError::NoSensitiveData);
            return Ok(());
        }
        for (i, record) in records.iter().enumerate() {
            println!("Author {}:", i + 1);
            for kind in FieldKind::ALL {
                if let Some(value) = record.get(kind) {
                    println!("  {:<12} {}", format!("{}:", kind.label()), value.replace('\n', " / "));
                }
            }
        }
        Ok(())
    }

    fn extract(&self, input: &Path, output: Option<&Path>) -> Result<()> {
        let text = self
            .service
            .extract_text(input)
            .with_context(|| "Text extraction failed")?;

        if let Some(output_path) = output {
            std::fs::write(output_path, &text)
                .with_context(|| format!("Failed to write to {}", output_path.display()))?;
            println!(
                "✓ Extracted {} characters → {}",
                text.len(),
                output_path.display()
            );
        } else {
            println!("{}", text);
        }
        Ok(())
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AnonymizerConfig> {
    match path {
        Some(p) => AnonymizerConfig::load(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(AnonymizerConfig::default()),
    }
}

/// Field options from `--fields`, or the defaults when none are given.
fn build_options(fields: &[FieldKind]) -> FieldFlags {
    if fields.is_empty() {
        FieldFlags::default()
    } else {
        FieldFlags::from_kinds(fields)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    if let Commands::Anonymize {
        embed_info_page,
        no_plaintext,
        ..
    } = &cli.command
    {
        config.append_info_page |= *embed_info_page;
        if *no_plaintext {
            config.embed_plaintext = false;
        }
    }

    let key = match &cli.key {
        Some(passphrase) => EncryptionKey::from_passphrase(passphrase),
        None => EncryptionKey::from_env()
            .with_context(|| format!("Set --key or the {} environment variable", KEY_ENV_VAR))?,
    };
    let handler = AnonymizeHandler::new(config, key, cli.verbose)?;

    match &cli.command {
        Commands::Anonymize {
            input,
            output,
            mapping,
            fields,
            ..
        } => handler.anonymize(input, output, mapping, build_options(fields))?,
        Commands::Restore {
            input,
            output,
            mapping,
        } => handler.restore(input, output, mapping.as_deref())?,
        Commands::Lookup { hash, mapping } => handler.lookup(hash, mapping)?,
        Commands::Scan { input } => handler.scan(input)?,
        Commands::Extract { input, output } => handler.extract(input, output.as_deref())?,
    }

    Ok(())
}
