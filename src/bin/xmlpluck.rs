//! Command-line front end: extract matching elements from XML files and
//! print them as XML fragments or JSON objects, one per line.

use std::io::{self, BufRead, BufWriter, Write};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use xmlpluck::input::{self, STDIN};
use xmlpluck::parser::{ParseOptions, DEFAULT_MAX_CHILDREN, DEFAULT_MAX_DEPTH};
use xmlpluck::serial::{json, ExportOptions, XmlExporter};
use xmlpluck::{NamespacePolicy, PathSelector, PickError};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// xmlpluck -- extract sub-documents from large XML streams.
#[derive(Parser, Debug)]
#[command(name = "xmlpluck", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print each match as a JSON object.
    Json(Common),
    /// Print each match as an XML fragment.
    Xml(XmlArgs),
}

impl Command {
    fn common(&self) -> &Common {
        match self {
            Self::Json(common) => common,
            Self::Xml(args) => &args.common,
        }
    }
}

#[derive(Args, Debug)]
struct Common {
    /// Input files (use `-` for stdin). Gzip input is detected.
    #[arg(default_value = STDIN)]
    files: Vec<String>,

    /// Path selector, e.g. `/feed/entry` or `/*/`.
    #[arg(long, short, default_value = "/")]
    selector: String,

    /// How namespaces are represented in the output.
    #[arg(long, value_enum, default_value_t = Policy::Prefix)]
    namespace: Policy,

    /// Pretty-print the output.
    #[arg(long)]
    pretty: bool,

    /// Maximum element nesting depth.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Maximum number of children of one extracted element.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_CHILDREN)]
    max_children: usize,

    /// Maximum number of tokens read per file (unlimited by default).
    #[arg(long, value_name = "N")]
    max_tokens: Option<u64>,

    /// Log progress to stderr (`RUST_LOG` overrides).
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct XmlArgs {
    #[command(flatten)]
    common: Common,

    /// Write only the matched element, without its ancestors.
    #[arg(long)]
    isolated: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Policy {
    /// Resolve prefixes to namespace URIs.
    Expand,
    /// Drop namespaces entirely.
    Strip,
    /// Keep source prefixes and declarations.
    Prefix,
}

impl From<Policy> for NamespacePolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Expand => Self::Expand,
            Policy::Strip => Self::Strip,
            Policy::Prefix => Self::Prefix,
        }
    }
}

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

const EXIT_SUCCESS: u8 = 0;
const EXIT_EXTRACT_ERROR: u8 = 1;
const EXIT_IO_ERROR: u8 = 2;

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.command.common().verbose);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let code = run(&cli.command, &mut out);
    if let Err(e) = out.flush() {
        eprintln!("stdout: {e}");
        return ExitCode::from(EXIT_IO_ERROR);
    }
    ExitCode::from(code)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Processes every input file in order and returns an exit code. Stops at
/// the first failing file.
fn run(command: &Command, out: &mut impl Write) -> u8 {
    for filename in &command.common().files {
        let reader = match input::open(filename) {
            Ok(reader) => reader,
            Err(e) => {
                eprintln!("{filename}: {e}");
                return EXIT_IO_ERROR;
            }
        };
        match extract(command, reader, out) {
            Ok(count) => debug!(file = %filename, count, "file done"),
            Err(e) => {
                eprintln!("{filename}: {e}");
                return EXIT_EXTRACT_ERROR;
            }
        }
    }
    EXIT_SUCCESS
}

/// Extracts all matches from one input and returns how many were written.
fn extract(command: &Command, reader: Box<dyn BufRead>, out: &mut impl Write) -> Result<u64, PickError> {
    let common = command.common();
    let policy = NamespacePolicy::from(common.namespace);
    let options = ParseOptions::default()
        .namespace(policy)
        .max_depth(common.max_depth)
        .max_children(common.max_children)
        .max_tokens(common.max_tokens);
    let parser = xmlpluck::Parser::new(reader, PathSelector::new(&common.selector), options);

    let mut count = 0;
    match command {
        Command::Json(_) => {
            for found in parser {
                let value = json::element_to_value(found?.element());
                if common.pretty {
                    serde_json::to_writer_pretty(&mut *out, &value).map_err(io::Error::from)?;
                } else {
                    serde_json::to_writer(&mut *out, &value).map_err(io::Error::from)?;
                }
                out.write_all(b"\n")?;
                count += 1;
            }
        }
        Command::Xml(args) => {
            let export = ExportOptions::default()
                .ancestors(!args.isolated)
                .indent(common.pretty);
            let mut exporter = XmlExporter::new(&mut *out, policy, export);
            for found in parser {
                exporter.export(&found?)?;
                exporter.get_mut().write_all(b"\n")?;
                count += 1;
            }
        }
    }
    Ok(count)
}
