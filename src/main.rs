//! # EncodingBridge CLI - Character Encoding Detection and Conversion
//!
//! Command-line interface for detecting the encoding of files and converting
//! them between named encodings and code pages.

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io::{self, Read, Write};
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use anyhow::{Context, Result};
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand, ValueEnum};
#[cfg(feature = "cli")]
use serde::Serialize;
#[cfg(feature = "cli")]
use tracing::{debug, info};
#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
use encoding_bridge::config::Settings;
#[cfg(feature = "cli")]
use encoding_bridge::{
    CodePageId, Converter, DetectionResult, Detector, EncodingName, NameTable, Validation,
    ValidationPolicy,
};

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features disabled. Enable with --features cli");
    std::process::exit(1);
}

/// EncodingBridge: character encoding detection and conversion
#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "encoding-bridge")]
#[command(version, about, long_about = None)]
#[command(author = "EncodingBridge Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Settings file (JSON, any detectable encoding)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Convert files between character encodings
    Convert(ConvertArgs),

    /// Detect encoding of input files
    Detect(DetectArgs),

    /// List code pages that have a printable name
    List(ListArgs),

    /// Validate that a file is properly encoded
    Validate(ValidateArgs),

    /// Display detailed information about an encoding
    Info(InfoArgs),
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ConvertArgs {
    /// Source encoding (detected if not specified)
    #[arg(short = 'f', long = "from")]
    from: Option<EncodingName>,

    /// Target encoding (settings `targetEncoding` if not specified)
    #[arg(short = 't', long = "to")]
    to: Option<EncodingName>,

    /// Input file (stdin if not specified)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Never fall back to the native code page backend
    #[arg(long)]
    primary_only: bool,

    /// Replace malformed input and unmappable characters instead of failing
    #[arg(long)]
    permissive: bool,

    /// Strip BOM from input
    #[arg(long)]
    strip_bom: bool,

    /// Add BOM to output
    #[arg(long)]
    add_bom: bool,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct DetectArgs {
    /// Input file (stdin if not specified)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Maximum bytes to read for detection
    #[arg(long)]
    sample_size: Option<usize>,

    /// Top-level domain hint for better detection accuracy, e.g. `jp`
    #[arg(long)]
    tld: Option<String>,

    /// Do not look for a byte order mark
    #[arg(long)]
    no_bom_check: bool,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ListArgs {
    /// Only show names containing this text
    #[arg(short, long)]
    filter: Option<String>,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ValidateArgs {
    /// Input file (stdin if not specified)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Expected encoding (detected if not specified)
    #[arg(short, long)]
    encoding: Option<EncodingName>,

    /// Show position of first error
    #[arg(long)]
    show_errors: bool,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct InfoArgs {
    /// Encoding name or numeric code page
    encoding: String,
}

#[cfg(feature = "cli")]
#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct ConversionReport {
    success: bool,
    from: String,
    to: String,
    bytes_processed: usize,
    bytes_written: usize,
    processing_time_ms: u64,
}

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct DetectionReport<'a> {
    #[serde(flatten)]
    result: &'a DetectionResult,
    sample_size: usize,
}

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct EncodingInfo {
    id: Option<CodePageId>,
    name: Option<EncodingName>,
    validation_policy: Option<ValidationPolicy>,
    bom: Option<String>,
    primary_support: bool,
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings: {}", path.display()))?,
        None => Settings::default(),
    };
    debug!(?settings, "settings loaded");

    match cli.command {
        Commands::Convert(ref args) => convert_command(args, &cli, &settings)?,
        Commands::Detect(ref args) => detect_command(args, &cli, &settings)?,
        Commands::List(ref args) => list_command(args, &cli)?,
        Commands::Validate(ref args) => validate_command(args, &cli, &settings)?,
        Commands::Info(ref args) => info_command(args, &cli)?,
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn read_input(input: Option<&Path>) -> Result<Vec<u8>> {
    match input {
        Some(path) => {
            info!(path = %path.display(), "reading input");
            fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))
        }
        None => {
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .context("Failed to read from stdin")?;
            Ok(buffer)
        }
    }
}

#[cfg(feature = "cli")]
fn convert_command(args: &ConvertArgs, cli: &Cli, settings: &Settings) -> Result<()> {
    let start_time = std::time::Instant::now();
    let input_data = read_input(args.input.as_deref())?;

    let mut body: &[u8] = &input_data;
    let from = match &args.from {
        Some(from) => from.clone(),
        None => {
            let detected = settings.detector().detect(body).context("Detection failed")?;
            info!(
                encoding = %detected.encoding,
                confidence = detected.confidence,
                "detected source encoding"
            );
            detected.encoding
        }
    };
    let to = match &args.to {
        Some(to) => to.clone(),
        None => EncodingName::new(&settings.target_encoding)
            .context("Invalid targetEncoding in settings")?,
    };

    // Handle BOM stripping
    if args.strip_bom {
        if let Some(bom) = from.bom() {
            if body.starts_with(bom) {
                body = &body[bom.len()..];
                debug!(bytes = bom.len(), "stripped BOM");
            }
        }
    }

    let validation = if args.permissive {
        Validation::Permissive
    } else {
        settings.validation()
    };
    let primary_only = args.primary_only || settings.primary_only;
    let output_data = Converter::with_validation(validation)
        .convert(body, &from, &to, primary_only)
        .with_context(|| format!("Conversion from {} to {} failed", from, to))?;

    // Handle BOM addition
    let mut final_data = Vec::new();
    if args.add_bom {
        if let Some(bom) = to.bom() {
            final_data.extend_from_slice(bom);
        }
    }
    final_data.extend_from_slice(&output_data);

    match &args.output {
        Some(output_path) => {
            fs::write(output_path, &final_data).with_context(|| {
                format!("Failed to write output file: {}", output_path.display())
            })?;
            info!(path = %output_path.display(), "wrote output");
        }
        None => io::stdout()
            .write_all(&final_data)
            .context("Failed to write to stdout")?,
    }

    let processing_time = start_time.elapsed();
    info!(
        input = body.len(),
        output = final_data.len(),
        elapsed = ?processing_time,
        "conversion finished"
    );

    if let OutputFormat::Json = cli.format {
        let report = ConversionReport {
            success: true,
            from: from.to_string(),
            to: to.to_string(),
            bytes_processed: body.len(),
            bytes_written: final_data.len(),
            processing_time_ms: processing_time.as_millis() as u64,
        };
        eprintln!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn detect_command(args: &DetectArgs, cli: &Cli, settings: &Settings) -> Result<()> {
    let data = read_input(args.input.as_deref())?;

    let mut detector = match args.sample_size {
        Some(size) => Detector::with_sample_size(size),
        None => settings.detector(),
    };
    if args.no_bom_check {
        detector = detector.bom_check(false);
    }
    let result = match &args.tld {
        Some(tld) => detector.detect_with_hint(&data, tld),
        None => detector.detect(&data),
    }
    .context("Detection failed")?;
    let sample_size = data.len().min(detector.max_sample_size());

    match cli.format {
        OutputFormat::Json => {
            let report = DetectionReport {
                result: &result,
                sample_size,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("Detected encoding: {}", result.encoding);
            println!("Confidence: {:.1}%", result.confidence * 100.0);
            match result.bom_len() {
                Some(0) => {}
                Some(len) => println!("BOM: {} bytes", len),
                None => println!("BOM: not checked"),
            }
            println!("Sample size: {} bytes", sample_size);
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn list_command(args: &ListArgs, cli: &Cli) -> Result<()> {
    let filter = args.filter.as_deref().map(str::to_ascii_lowercase);
    let entries: Vec<(CodePageId, EncodingName)> = NameTable::global()
        .known()
        .filter(|(_, name)| match &filter {
            Some(filter) => name.as_str().contains(filter.as_str()),
            None => true,
        })
        .collect();

    match cli.format {
        OutputFormat::Json => {
            let encodings_info: Vec<_> = entries
                .iter()
                .map(|(id, name)| {
                    serde_json::json!({
                        "id": id,
                        "name": name,
                        "validation_policy": id.validation_policy(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&encodings_info)?);
        }
        OutputFormat::Text => {
            println!("Known code pages ({} total):", entries.len());
            println!();
            for (id, name) in entries {
                println!("{:>6}  {}", id, name);
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn validate_command(args: &ValidateArgs, _cli: &Cli, settings: &Settings) -> Result<()> {
    let input_data = read_input(args.input.as_deref())?;

    let encoding = match &args.encoding {
        Some(encoding) => encoding.clone(),
        None => {
            let detected = settings.detector().detect(&input_data).context("Detection failed")?;
            info!(encoding = %detected.encoding, "validating against detected encoding");
            detected.encoding
        }
    };

    let utf8 = EncodingName::new("utf-8")?;
    let result = Converter::with_validation(Validation::Strict).convert(
        &input_data,
        &encoding,
        &utf8,
        settings.primary_only,
    );

    match result {
        Ok(_) => {
            println!("✓ File is valid {}", encoding);
            std::process::exit(0);
        }
        Err(e) => {
            println!("✗ File is not valid {}", encoding);
            if args.show_errors {
                match e {
                    encoding_bridge::Error::MalformedInput { position, .. } => {
                        println!("  Error at position {}: malformed input", position);
                    }
                    encoding_bridge::Error::UnmappableTarget {
                        character,
                        position,
                        ..
                    } => {
                        println!(
                            "  Error at position {}: unmappable character '{}'",
                            position, character
                        );
                    }
                    _ => println!("  Error: {}", e),
                }
            }
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "cli")]
fn info_command(args: &InfoArgs, cli: &Cli) -> Result<()> {
    let table = NameTable::global();
    let (id, name) = match args.encoding.parse::<u32>() {
        Ok(raw) => {
            let id = CodePageId::new(raw).context("Code page 0 is not valid")?;
            (Some(id), table.id_to_name(id))
        }
        Err(_) => {
            let name = EncodingName::new(&args.encoding)?;
            (table.name_to_id(name.as_str()).ok(), Some(name))
        }
    };
    anyhow::ensure!(
        id.is_some() || name.is_some(),
        "Unknown encoding: {}",
        args.encoding
    );

    let primary_support = name
        .as_ref()
        .is_some_and(|name| encoding_bridge::convert(b"", name.as_str(), "utf-8", true).is_ok());
    let bom = id
        .and_then(CodePageId::bom)
        .or_else(|| name.as_ref().and_then(EncodingName::bom));
    let info = EncodingInfo {
        id,
        name,
        validation_policy: id.map(CodePageId::validation_policy),
        bom: bom.map(|b| format!("{:02X?}", b)),
        primary_support,
    };

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
        OutputFormat::Text => {
            match &info.name {
                Some(name) => println!("Encoding Information: {}", name),
                None => println!("Encoding Information: (no printable name)"),
            }
            match info.id {
                Some(id) => println!("Code page: {}", id),
                None => println!("Code page: none"),
            }
            if let Some(policy) = info.validation_policy {
                println!("Validation policy: {:?}", policy);
            }
            println!("BOM: {}", info.bom.as_deref().unwrap_or("None"));
            println!(
                "Primary backend: {}",
                if info.primary_support { "Yes" } else { "No" }
            );
        }
    }

    Ok(())
}
