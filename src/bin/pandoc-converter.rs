//! CLI binary for pandoc-converter.
//!
//! A thin shim over the library crate: `serve` layers flags over the config
//! file and runs the gRPC server, `convert` runs one local conversion through
//! the same pipeline, and `formats` prints the registry.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pandoc_converter::{
    convert, convert_to_file, format, server, ConversionRequest, ConverterService, Format,
    Protocol, Settings,
};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default address (0.0.0.0:5000)
  pandoc-converter serve

  # Serve on a unix socket with TLS and a 2 minute converter limit
  pandoc-converter serve -t unix -b /run/converter.sock \
      -c server.crt -k server.key --timeout-secs 120

  # Give pandoc a PATH that contains a LaTeX engine (for pdf output)
  pandoc-converter serve -p /usr/local/texlive/bin/x86_64-linux:/usr/bin

  # One-shot local conversion
  pandoc-converter convert README.md --from markdown --to html5 -o README.html

  # List supported format tokens
  pandoc-converter formats

ENVIRONMENT VARIABLES:
  Every serve flag can also be set as PANDOC_CONVERTER_<FLAG>, for example
  PANDOC_CONVERTER_BIND=127.0.0.1:6000 or PANDOC_CONVERTER_PANDOC_PATH=/opt/pandoc.
  RUST_LOG overrides the log filter chosen by --verbose.

CONFIG FILE:
  YAML with the flag names as keys, read from --config or, when present,
  $HOME/.pandoc-converter.yaml. Flags and env vars take precedence over it.

    bind: 127.0.0.1:6000
    pandoc-path: /usr/local/bin/pandoc
    timeout-secs: 120
"#;

/// Convert documents between markup formats with pandoc, over gRPC.
#[derive(Parser, Debug)]
#[command(
    name = "pandoc-converter",
    version,
    about = "Convert documents between markup formats with pandoc, over gRPC",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PANDOC_CONVERTER_VERBOSE")]
    verbose: bool,

    /// YAML config file. Default: $HOME/.pandoc-converter.yaml, if present.
    #[arg(long, global = true, env = "PANDOC_CONVERTER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the gRPC conversion server.
    Serve(ServeArgs),
    /// Convert one local file through the conversion pipeline.
    Convert(ConvertArgs),
    /// List the supported format tokens.
    Formats {
        /// Print the registry as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Options shared by `serve` and `convert` that shape the converter process.
#[derive(clap::Args, Debug)]
struct ConverterArgs {
    /// Path to the pandoc executable. Default: search `pandoc` on PATH.
    #[arg(short = 'x', long, env = "PANDOC_CONVERTER_PANDOC_PATH")]
    pandoc_path: Option<PathBuf>,

    /// PATH environment handed to the pandoc process.
    #[arg(short = 'p', long, env = "PANDOC_CONVERTER_PATH_ENV_VAR")]
    path_env_var: Option<String>,

    /// Directory under which per-call workspaces are created.
    #[arg(long, env = "PANDOC_CONVERTER_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Kill pandoc after this many seconds.
    #[arg(long, env = "PANDOC_CONVERTER_TIMEOUT_SECS",
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Listener protocol: tcp or unix. Default: tcp.
    #[arg(short = 't', long, env = "PANDOC_CONVERTER_PROTOCOL")]
    protocol: Option<Protocol>,

    /// Address to bind: host:port for tcp, socket path for unix. Default: 0.0.0.0:5000.
    #[arg(short = 'b', long, env = "PANDOC_CONVERTER_BIND")]
    bind: Option<String>,

    /// PEM private key; TLS is enabled when both key and certificate are set.
    #[arg(short = 'k', long, env = "PANDOC_CONVERTER_TLS_KEY")]
    tls_key: Option<PathBuf>,

    /// PEM certificate chain.
    #[arg(short = 'c', long, env = "PANDOC_CONVERTER_TLS_CRT")]
    tls_crt: Option<PathBuf>,

    /// Maximum request/response message size in MiB. Default: 64.
    #[arg(long, env = "PANDOC_CONVERTER_MAX_MESSAGE_MB",
          value_parser = clap::value_parser!(u64).range(1..=4096))]
    max_message_mb: Option<u64>,

    #[command(flatten)]
    converter: ConverterArgs,
}

#[derive(clap::Args, Debug)]
struct ConvertArgs {
    /// Input file, or `-` for stdin.
    input: PathBuf,

    /// Source format token (see `formats`).
    #[arg(short, long, value_parser = parse_format)]
    from: Format,

    /// Target format token (see `formats`).
    #[arg(short, long, value_parser = parse_format)]
    to: Format,

    /// Write the result to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print conversion stats as JSON instead of the document.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    converter: ConverterArgs,
}

impl ConverterArgs {
    /// The converter settings given on the command line or in the environment.
    fn settings(&self) -> Settings {
        Settings {
            pandoc_path: self.pandoc_path.clone(),
            path_env_var: self.path_env_var.clone(),
            scratch_dir: self.scratch_dir.clone(),
            timeout_secs: self.timeout_secs,
            ..Settings::default()
        }
    }
}

impl ServeArgs {
    fn settings(&self) -> Settings {
        Settings {
            protocol: self.protocol,
            bind: self.bind.clone(),
            tls_key: self.tls_key.clone(),
            tls_crt: self.tls_crt.clone(),
            max_message_mb: self.max_message_mb,
            ..self.converter.settings()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let discovered = Settings::discover(cli.config.as_deref());

    // ── Logging setup ────────────────────────────────────────────────────
    let file_verbose = matches!(&discovered, Ok(Some((_, file))) if file.verbose());
    let filter = if cli.verbose || file_verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let file = match discovered.context("Failed to load config file")? {
        Some((path, file)) => {
            info!("using config file {}", path.display());
            file
        }
        None => Settings::default(),
    };

    match cli.command {
        Command::Serve(args) => run_serve(args.settings().or(file)).await,
        Command::Convert(args) => {
            let settings = args.converter.settings().or(file);
            run_convert(args, &settings).await
        }
        Command::Formats { json } => print_formats(json),
    }
}

async fn run_serve(settings: Settings) -> Result<()> {
    let config = settings
        .converter_config()
        .context("Invalid configuration")?;
    info!(
        pandoc = %config.pandoc_path.display(),
        scratch_root = %config.scratch_root.display(),
        "converter configured"
    );
    let server_config = settings
        .server_config()
        .context("Invalid server configuration")?;

    let service = ConverterService::new(Arc::new(config));
    server::serve(&server_config, service, shutdown_signal())
        .await
        .context("gRPC server failed")
}

async fn run_convert(args: ConvertArgs, settings: &Settings) -> Result<()> {
    let config = settings
        .converter_config()
        .context("Invalid configuration")?;

    let content = if args.input.as_os_str() == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        tokio::fs::read(&args.input)
            .await
            .with_context(|| format!("Failed to read input {:?}", args.input))?
    };
    let request = ConversionRequest::new(args.from, args.to, content);

    if let Some(ref output_path) = args.output {
        let stats = convert_to_file(request, output_path, &config)
            .await
            .context("Conversion failed")?;
        if args.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
            );
        } else {
            eprintln!(
                "{} → {} bytes in {}ms  →  {}",
                stats.input_bytes,
                stats.output_bytes,
                stats.total_duration_ms,
                output_path.display()
            );
        }
    } else {
        let result = convert(request, &config)
            .await
            .context("Conversion failed")?;
        if args.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&result.stats)
                    .context("Failed to serialise stats")?
            );
        } else {
            io::stdout()
                .lock()
                .write_all(&result.content)
                .context("Failed to write to stdout")?;
        }
    }

    Ok(())
}

fn print_formats(json: bool) -> Result<()> {
    if json {
        let listing: Vec<_> = format::registered()
            .map(|(f, token)| {
                serde_json::json!({
                    "name": f.as_str_name(),
                    "value": f as i32,
                    "token": token,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&listing).context("Failed to serialise formats")?
        );
    } else {
        for (f, token) in format::registered() {
            println!("{:>3}  {:<24} {}", f as i32, f.as_str_name(), token);
        }
    }
    Ok(())
}

/// Parse a format token (`markdown`, `html5`, …) into a [`Format`].
fn parse_format(s: &str) -> Result<Format, String> {
    format::format_for_token(s).ok_or_else(|| {
        format!("unknown format '{s}'; run `pandoc-converter formats` for the list")
    })
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                debug!("SIGTERM handler unavailable: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown signal received, draining");
}
