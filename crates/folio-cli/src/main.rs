mod commands;
mod output;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "folio",
    version,
    about = "Layout-driven extraction of records and tables from rulebook PDFs"
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump merged logical lines with font, size, style, page and column
    Lines {
        /// Path to a PDF or a JSON span dump
        input_file: PathBuf,

        /// Page range, e.g. "12" or "12-40"
        #[arg(long)]
        pages: Option<String>,

        /// Extraction config (TOML or JSON)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Detect records (stat blocks, spells) and segment their fields
    Records {
        /// Path to a PDF or a JSON span dump
        input_file: PathBuf,

        /// Built-in record profile: creature, spell
        #[arg(short, long)]
        profile: Option<String>,

        /// Extraction config (TOML or JSON); its profile is used unless --profile is given
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Page range, e.g. "12" or "12-40"
        #[arg(long)]
        pages: Option<String>,

        /// Emit raw records without field segmentation
        #[arg(long)]
        raw: bool,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write JSON output to a file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Extract the tables described by a target file
    Tables {
        /// Path to a PDF or a JSON span dump
        input_file: PathBuf,

        /// Table target file (TOML or JSON)
        #[arg(short, long, value_name = "FILE")]
        targets: PathBuf,

        /// Only extract these target ids
        #[arg(long, value_name = "ID")]
        only: Vec<String>,

        /// Report failing targets and continue instead of aborting
        #[arg(long)]
        skip_failures: bool,

        /// Extraction config (TOML or JSON)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write JSON output to a file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Render a PDF once and save its spans as a JSON span dump
    Dump {
        /// Path to a PDF
        input_file: PathBuf,

        /// Page range, e.g. "12" or "12-40"
        #[arg(long)]
        pages: Option<String>,

        /// Output file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: PathBuf,
    },
    /// Inspect built-in record profiles
    Profiles {
        #[command(subcommand)]
        action: ProfilesAction,
    },
    /// Validate a target file or an extraction config without extracting
    Validate {
        /// Table target file
        #[arg(short, long, value_name = "FILE", required_unless_present = "config")]
        targets: Option<PathBuf>,

        /// Extraction config
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ProfilesAction {
    /// List built-in profiles
    List,
    /// Print a built-in profile's TOML source
    Show {
        /// Profile name (e.g., "creature")
        name: String,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Lines {
            input_file,
            pages,
            config,
            output,
        } => commands::lines::run(&input_file, pages.as_deref(), config.as_deref(), &output),
        Commands::Records {
            input_file,
            profile,
            config,
            pages,
            raw,
            output,
            out,
        } => commands::records::run(commands::records::RecordArgs {
            input_file,
            profile,
            config,
            pages,
            raw,
            output,
            out,
        }),
        Commands::Tables {
            input_file,
            targets,
            only,
            skip_failures,
            config,
            output,
            out,
        } => commands::tables::run(commands::tables::TableArgs {
            input_file,
            targets,
            only,
            skip_failures,
            config,
            output,
            out,
        }),
        Commands::Dump {
            input_file,
            pages,
            out,
        } => commands::dump::run(&input_file, pages.as_deref(), &out),
        Commands::Profiles { action } => match action {
            ProfilesAction::List => commands::profiles::list(),
            ProfilesAction::Show { name } => commands::profiles::show(&name),
        },
        Commands::Validate { targets, config } => {
            commands::validate::run(targets.as_deref(), config.as_deref())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
