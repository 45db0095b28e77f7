//! grptrace binary
//!
//! Explains how a subject is a member of a group. Two read-only lookups
//! (`members` and `subject`) help find the names to trace.
//!
//! # Usage
//!
//! ```bash
//! # Against a YAML directory fixture
//! grptrace --config grptrace.yaml trace jdoe org:apps:admins
//! grptrace --config grptrace.yaml members org:apps:admins --filter immediate
//! grptrace --config grptrace.yaml subject jdoe@example.edu --identifier
//!
//! # Against Grouper, configured from the environment only
//! GRPTRACE_DIRECTORY__BACKEND=grouper \
//! GRPTRACE_DIRECTORY__BASE_URL=https://grouper.example.edu/grouper-ws/servicesRest/json/v4_0_000 \
//! grptrace trace jdoe org:apps:admins --json
//! ```

use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

use grptrace_cli::observability::{init_logging, LoggingConfig};
use grptrace_cli::{
    build_directory, build_tracer, render_json, AppConfig, MemberReport, SubjectReport,
    TextReport,
};
use grptrace_directory::{MemberFilter, SubjectLookup};
use grptrace_domain::TraceOptions;

/// grptrace - membership path tracer for hierarchical group directories
#[derive(Parser, Debug)]
#[command(name = "grptrace")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Explain how a subject is a member of a group
    Trace {
        /// Subject identifier
        subject_id: String,

        /// Fully qualified target group name
        group_name: String,

        /// Subject source to disambiguate the subject id
        #[arg(short, long)]
        source: Option<String>,

        /// Maximum nesting depth to follow (capped at 20)
        #[arg(short = 'd', long)]
        max_depth: Option<u32>,

        /// Print the result as JSON instead of a text tree
        #[arg(long)]
        json: bool,
    },

    /// List the members of a group
    Members {
        /// Fully qualified group name
        group_name: String,

        /// Which memberships to list (all, immediate, effective, composite, non-immediate)
        #[arg(short, long, default_value_t = MemberFilter::All)]
        filter: MemberFilter,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up a subject by id or identifier
    Subject {
        /// Subject id, or identifier with --identifier
        subject: String,

        /// Treat the argument as a login name or other identifier
        #[arg(short, long)]
        identifier: bool,

        /// Restrict the lookup to one subject source
        #[arg(short, long)]
        source: Option<String>,

        /// Print the matches as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::from_env()?,
    };

    let mut log_config = LoggingConfig::from_settings(&config.logging);
    if let Some(level) = verbosity_level(args.verbose) {
        log_config = log_config.with_level(level);
    }
    init_logging(log_config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = %config.directory.backend,
        "Starting grptrace"
    );

    match args.command {
        Command::Trace {
            subject_id,
            group_name,
            source,
            max_depth,
            json,
        } => {
            let tracer = build_tracer(&config)?;

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling trace");
                    on_interrupt.cancel();
                }
            });

            let mut options = TraceOptions::new().with_cancellation(cancel);
            if let Some(source) = source {
                options = options.with_subject_source_id(source);
            }
            if let Some(max_depth) = max_depth {
                options = options.with_max_depth(max_depth);
            }

            let result = tracer.trace(&subject_id, &group_name, &options).await?;

            if json {
                println!("{}", render_json(&result)?);
            } else {
                print!("{}", TextReport(&result));
            }
        }
        Command::Members {
            group_name,
            filter,
            json,
        } => {
            let directory = build_directory(&config)?;
            let members = directory.lookup.list_members(&group_name, filter).await?;
            let report = MemberReport {
                group_name: &group_name,
                filter,
                members: &members,
            };

            if json {
                println!("{}", render_json(&report)?);
            } else {
                print!("{report}");
            }
        }
        Command::Subject {
            subject,
            identifier,
            source,
            json,
        } => {
            let mut lookup = if identifier {
                SubjectLookup::by_identifier(subject)
            } else {
                SubjectLookup::by_id(subject)
            };
            if let Some(source) = source {
                lookup = lookup.with_source(source);
            }

            let directory = build_directory(&config)?;
            let subjects = directory.lookup.find_subjects(&lookup).await?;
            let report = SubjectReport {
                query: lookup.value(),
                subjects: &subjects,
            };

            if json {
                println!("{}", render_json(&report)?);
            } else {
                print!("{report}");
            }
        }
    }

    Ok(())
}

/// Maps `-v` occurrences to a log level overriding the configured one.
fn verbosity_level(count: u8) -> Option<Level> {
    match count {
        0 => None,
        1 => Some(Level::INFO),
        2 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}
