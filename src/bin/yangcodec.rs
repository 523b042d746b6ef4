//! yangcodec command line entry point
//!
//! Converts, validates and sends configuration payloads using a JSON schema
//! descriptor. Input is read from a file or from stdin.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use rust_yangcodec::{
    CodecEngine, CodecRequest, CodecResult, CodecService, EncodingFormat, Remote, SchemaTree,
    SessionConfig, TcpProvider,
};

/// Schema-driven XML/JSON configuration codec
#[derive(Parser, Debug)]
#[command(name = "yangcodec", version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Re-encode a payload from one format to another
    Convert(ConvertArgs),

    /// Check that a payload conforms to the schema
    Validate(ValidateArgs),

    /// Send a payload to a device and print its reply
    Send(SendArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Schema descriptor (JSON)
    #[arg(long)]
    schema: PathBuf,

    /// Input encoding
    #[arg(long, value_enum)]
    from: Format,

    /// Output encoding
    #[arg(long, value_enum)]
    to: Format,

    /// Input file, stdin when omitted
    input: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Schema descriptor (JSON)
    #[arg(long)]
    schema: PathBuf,

    /// Input encoding
    #[arg(long, value_enum)]
    format: Format,

    /// Input file, stdin when omitted
    input: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Schema descriptor (JSON)
    #[arg(long)]
    schema: PathBuf,

    /// Payload and reply encoding
    #[arg(long, value_enum)]
    format: Format,

    /// Session descriptor (JSON)
    #[arg(long)]
    session: PathBuf,

    /// Input file, stdin when omitted
    input: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Format {
    Xml,
    Json,
}

impl From<Format> for EncodingFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Xml => EncodingFormat::Xml,
            Format::Json => EncodingFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Commands::Convert(args) => run_convert(&args),
        Commands::Validate(args) => run_validate(&args),
        Commands::Send(args) => run_send(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_engine(path: &Path) -> Result<CodecEngine> {
    let schema = SchemaTree::from_file(path)
        .with_context(|| format!("failed to load schema {}", path.display()))?;
    tracing::debug!(module = schema.module(), roots = schema.roots().len(), "schema loaded");
    Ok(CodecEngine::new(Arc::new(schema)))
}

fn read_input(input: Option<&Path>) -> Result<Vec<u8>> {
    match input {
        Some(path) => fs::read(path).with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(bytes: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(bytes)?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(())
}

fn run_convert(args: &ConvertArgs) -> Result<()> {
    let engine = load_engine(&args.schema)?;
    let input = read_input(args.input.as_deref())?;

    let tree = engine
        .decode(&input, args.from.into())
        .with_context(|| format!("invalid {} input", EncodingFormat::from(args.from)))?;
    let output = engine.encode(&tree, args.to.into())?;
    write_output(&output)
}

fn run_validate(args: &ValidateArgs) -> Result<()> {
    let engine = load_engine(&args.schema)?;
    let input = read_input(args.input.as_deref())?;
    let format = EncodingFormat::from(args.format);

    let tree = engine
        .decode(&input, format)
        .with_context(|| format!("invalid {} input", format))?;
    println!("valid: {}", tree.schema().name());
    Ok(())
}

fn run_send(args: &SendArgs) -> Result<()> {
    let engine = load_engine(&args.schema)?;
    let config = SessionConfig::from_file(&args.session)
        .with_context(|| format!("failed to load session {}", args.session.display()))?;
    let input = read_input(args.input.as_deref())?;
    let format = EncodingFormat::from(args.format);

    let tree = engine
        .decode(&input, format)
        .with_context(|| format!("invalid {} input", format))?;

    let remote = Remote::new(Arc::new(TcpProvider::new()), config);
    let service = CodecService::new(engine, Some(remote));
    let reply = match service.run(CodecRequest::encode(tree, format))? {
        CodecResult::Decoded(reply) => reply,
        CodecResult::Encoded(bytes) => return write_output(&bytes),
    };
    let output = service.engine().encode(&reply, format)?;
    write_output(&output)
}
