use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use atx_viewer::model::TestReport;
use atx_viewer::store::ReferenceStore;
use atx_viewer::{diff, loader, serialize, stats};

#[derive(Parser)]
#[command(name = "atx-viewer")]
#[command(about = "Inspect ASAM ATX test reports and compare them against a reference")]
struct Cli {
    /// Directory holding saved reference sets (default: ~/.atx-viewer)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse report files and print their test trees
    Parse {
        /// ATX report files (.xml, .atxml, or order-preserving .json)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print verdict totals, optionally grouped by a test constant
    Stats {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Test constant to group by (e.g. TT_TESTSCRIPT_ID)
        #[arg(long)]
        group_by: Option<String>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Compare current reports against reference reports
    Compare {
        /// Reference report files
        #[arg(long, num_args = 1.., conflicts_with = "reference_set", required_unless_present = "reference_set")]
        reference: Vec<PathBuf>,

        /// Name of a saved reference set
        #[arg(long)]
        reference_set: Option<String>,

        /// Current report files
        #[arg(long, num_args = 1.., required = true)]
        current: Vec<PathBuf>,
    },

    /// Manage saved reference sets
    Reference {
        #[command(subcommand)]
        command: ReferenceCommands,
    },
}

#[derive(Subcommand)]
enum ReferenceCommands {
    /// Parse files and save their reports as a named reference set
    Save {
        name: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List saved reference sets
    List,
    /// Print the reports of a saved reference set
    Show { name: String },
    /// Delete a saved reference set
    Delete { name: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = match cli.store {
        Some(dir) => ReferenceStore::with_base(dir),
        None => ReferenceStore::new(),
    };
    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Parse { files, format } => {
            info!(files = files.len(), format = %format, "parse command");
            let reports = rt.block_on(loader::load_files(files));
            print_reports(&reports, &format)
        }
        Commands::Stats {
            files,
            group_by,
            format,
        } => {
            let reports = rt.block_on(loader::load_files(files));
            print_stats(&reports, group_by.as_deref(), &format)
        }
        Commands::Compare {
            reference,
            reference_set,
            current,
        } => {
            let reference = match reference_set {
                Some(name) => {
                    info!(name = %name, "comparing against saved reference");
                    store.load_reports(&store.find(&name)?)?
                }
                None => rt.block_on(loader::load_files(reference)),
            };
            let current = rt.block_on(loader::load_files(current));
            let comparison = diff::compare_reports(&reference, &current);
            debug!(
                common = comparison.common.len(),
                missing = comparison.missing_in_current.len(),
                new = comparison.new_in_current.len(),
                "comparison complete"
            );
            print!("{}", diff::format_comparison(&comparison));
            Ok(())
        }
        Commands::Reference { command } => run_reference(&rt, &store, command),
    }
}

fn run_reference(
    rt: &tokio::runtime::Runtime,
    store: &ReferenceStore,
    command: ReferenceCommands,
) -> Result<()> {
    match command {
        ReferenceCommands::Save { name, files } => {
            let reports = rt.block_on(loader::load_files(files));
            match store.add_reference(&name, &reports)? {
                Some(id) => println!("saved reference '{name}' (id {id}, {} reports)", reports.len()),
                None => println!("no reports found, nothing saved"),
            }
        }
        ReferenceCommands::List => {
            for reference in store.list()? {
                println!(
                    "{}: {} ({} reports)",
                    reference.id,
                    reference.name,
                    reference.report_ids.len()
                );
            }
        }
        ReferenceCommands::Show { name } => {
            let reports = store.load_reports(&store.find(&name)?)?;
            print!("{}", serialize::to_compact_text(&reports));
        }
        ReferenceCommands::Delete { name } => {
            store.delete(&name)?;
            println!("deleted reference '{name}'");
        }
    }
    Ok(())
}

fn print_reports(reports: &[TestReport], format: &str) -> Result<()> {
    let output = match format {
        "json" => serde_json::to_string_pretty(reports)?,
        _ => serialize::to_compact_text(reports),
    };
    println!("{output}");
    Ok(())
}

fn print_stats(reports: &[TestReport], group_by: Option<&str>, format: &str) -> Result<()> {
    let totals = stats::report_stats(reports);
    let groups = group_by.map(|key| {
        let groups = stats::group_stats(reports, |tc| tc.constant(key).map(String::from));
        let votes = stats::group_votes(&groups);
        (key, groups, votes)
    });

    if format == "json" {
        let json = match &groups {
            Some((key, groups, votes)) => serde_json::json!({
                "total": totals,
                "groupBy": key,
                "groups": groups,
                "votes": votes,
            }),
            None => serde_json::json!({ "total": totals }),
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("{}", stats::overview_title(reports));
    println!("total: {}", serialize::format_stats(&totals));
    if let Some((key, groups, votes)) = &groups {
        print!("{}", serialize::format_groups(key, groups, votes));
    }
    Ok(())
}
