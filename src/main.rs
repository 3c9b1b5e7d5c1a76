mod config;
mod csv_import;
mod db;
mod filter;
mod models;
mod schema;
mod store;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;

use config::Config;
use csv_import::ParseError;
use db::SqliteBackend;
use filter::{ApplicationFilter, ProcessTag, StatusKind, sort_for_display};
use models::Application;
use schema::{Field, FieldKind};
use store::{MemoryBackend, RecordStore};

#[derive(Parser)]
#[command(name = "apptrack")]
#[command(about = "Job application tracker - record, import, and filter applications")]
struct Cli {
    /// Database file (defaults to $APPTRACK_DB or the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Record a new application
    Add {
        /// Company name
        #[arg(short, long)]
        company: String,

        /// Job title
        #[arg(short = 't', long)]
        title: String,

        /// Year applied
        #[arg(short, long)]
        year: Option<i64>,

        /// Where you applied (LinkedIn, company site, ...)
        #[arg(long)]
        applied_on: Option<String>,

        /// Connection to the company
        #[arg(long)]
        connection: Option<String>,

        /// Current status (e.g. "No Answer/Ongoing", "Rejected", "Offered")
        #[arg(short, long)]
        status: Option<String>,

        /// Design related role
        #[arg(long)]
        design: bool,

        /// You were referred
        #[arg(long)]
        referred: bool,

        /// Tailored application
        #[arg(long)]
        tailored: bool,

        /// Private posting
        #[arg(long)]
        private: bool,

        /// Interview steps, comma separated (email, one-sided, behavioural, portfolio, take-home, recruiter)
        #[arg(short, long)]
        process: Option<String>,
    },

    /// Import applications from a CSV file
    Import {
        /// CSV file (see `apptrack template`)
        file: PathBuf,

        /// Append to existing applications instead of replacing them
        #[arg(long)]
        merge: bool,

        /// Preview the import without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// List applications, ordered by year
    List {
        #[command(flatten)]
        filter: FilterArgs,

        /// Show non-matching applications too (matches marked `*`, others `·`)
        #[arg(long)]
        all: bool,
    },

    /// Show the number of stored applications
    Count,

    /// Write all applications as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all applications with a JSON export
    Restore {
        /// JSON file produced by `apptrack export`
        file: PathBuf,
    },

    /// Print the CSV import template
    Template {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete all applications
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Job title contains
    #[arg(long)]
    title: Option<String>,

    /// Company contains
    #[arg(long)]
    company: Option<String>,

    /// Connection to company contains
    #[arg(long)]
    connection: Option<String>,

    /// Status equals (case-insensitive)
    #[arg(long)]
    status: Option<String>,

    /// Year equals
    #[arg(long)]
    year: Option<i64>,

    /// Only design related roles
    #[arg(long)]
    design: bool,

    /// Only referred applications
    #[arg(long)]
    referred: bool,

    /// Only tailored applications
    #[arg(long)]
    tailored: bool,

    /// Required interview steps, comma separated
    #[arg(long)]
    process: Option<String>,
}

impl FilterArgs {
    fn into_filter(self) -> ApplicationFilter {
        let given = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        ApplicationFilter {
            job_title: given(self.title),
            company: given(self.company),
            connection: given(self.connection),
            status: given(self.status),
            year: self.year,
            design: self.design,
            referred: self.referred,
            tailored: self.tailored,
            process: self
                .process
                .as_deref()
                .map(ProcessTag::parse_list)
                .unwrap_or_default(),
        }
    }
}

fn setup_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("apptrack={}", level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    debug!("Logging initialized at level: {}", level);
}

fn open_store(config: &Config) -> Result<RecordStore<SqliteBackend>> {
    let backend = SqliteBackend::open_initialized(&config.db_path)?;
    Ok(RecordStore::with_key(backend, &config.storage_key))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.db, cli.verbose, cli.quiet);
    setup_logging(config.log_level);

    match cli.command {
        Commands::Init => {
            let backend = SqliteBackend::open(&config.db_path)?;
            backend.init()?;
            println!("Database initialized at {}", backend.path().display());
        }

        Commands::Add {
            company,
            title,
            year,
            applied_on,
            connection,
            status,
            design,
            referred,
            tailored,
            private,
            process,
        } => {
            let mut app = Application {
                company: Some(company),
                job_title: Some(title),
                year,
                applied_on: Some(applied_on.unwrap_or_default()),
                connection_to_company: Some(connection.unwrap_or_default()),
                status: Some(status.unwrap_or_default()),
                ..Default::default()
            };

            let tags = process.as_deref().map(ProcessTag::parse_list).unwrap_or_default();
            for field in Field::ALL.into_iter().filter(|f| f.kind() == FieldKind::Flag) {
                let from_process = tags.iter().any(|tag| tag.field() == field);
                match field {
                    Field::DesignRelated => app.set_flag(field, design),
                    Field::Referred => app.set_flag(field, referred),
                    Field::TailoredApp => app.set_flag(field, tailored),
                    Field::PrivatePosting => app.set_flag(field, private || from_process),
                    _ => app.set_flag(field, from_process),
                }
            }

            let mut store = open_store(&config)?;
            let id = store.add(app)?;
            println!("Added application {} ({} total)", id, store.count());
        }

        Commands::Import {
            file,
            merge,
            dry_run,
        } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read CSV file: {}", file.display()))?;

            let records = match csv_import::parse_csv_bytes(&bytes) {
                Ok(records) => records,
                Err(ParseError::DataValidationFailed(report)) => {
                    eprintln!("Validation errors in {}:", file.display());
                    for error in report.errors() {
                        eprintln!("  {}", error);
                    }
                    return Err(ParseError::DataValidationFailed(report).into());
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to parse CSV file: {}", file.display()));
                }
            };

            let mut store = open_store(&config)?;

            if dry_run {
                print_preview(&records);

                let mut simulated = RecordStore::new(MemoryBackend::new());
                simulated.save(&store.load())?;
                let imported = if merge {
                    simulated.import_merge(records)?
                } else {
                    simulated.import_replace(records)?
                };
                println!(
                    "\nWould import {} application(s); {} total afterwards.",
                    imported,
                    simulated.count()
                );
                println!("(Dry run - nothing was saved)");
            } else {
                let imported = if merge {
                    store.import_merge(records)?
                } else {
                    store.import_replace(records)?
                };
                println!(
                    "Successfully imported {} job application(s) ({} total).",
                    imported,
                    store.count()
                );
            }
        }

        Commands::List { filter, all } => {
            let store = open_store(&config)?;
            let filter = filter.into_filter();

            let mut records = store.load();
            sort_for_display(&mut records);

            let active = filter.is_active();
            let rows: Vec<(bool, &Application)> = records
                .iter()
                .map(|app| (filter.matches(app), app))
                .filter(|(matched, _)| all || *matched)
                .collect();

            if rows.is_empty() {
                println!("No applications found.");
            } else {
                println!(
                    "{:<2}{:<26} {:<6} {:<9} {:<20} {:<24} {}",
                    "", "ID", "YEAR", "OUTCOME", "COMPANY", "TITLE", "PROCESS"
                );
                println!("{}", "-".repeat(100));
                for (matched, app) in &rows {
                    let marker = row_marker(active && all, *matched);
                    let year = app.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<2}{:<26} {:<6} {:<9} {:<20} {:<24} {}",
                        marker,
                        truncate(app.id.as_deref().unwrap_or("-"), 26),
                        year,
                        StatusKind::classify(app.status.as_deref()).label(),
                        truncate(app.company.as_deref().unwrap_or(""), 18),
                        truncate(app.job_title.as_deref().unwrap_or(""), 22),
                        process_summary(app)
                    );
                }
                if active {
                    let matched = rows.iter().filter(|(m, _)| *m).count();
                    println!("\n{} of {} application(s) match.", matched, records.len());
                }
            }
        }

        Commands::Count => {
            let store = open_store(&config)?;
            println!("{}", store.count());
        }

        Commands::Export { output } => {
            let store = open_store(&config)?;
            let records = store.load();
            let json = serde_json::to_string_pretty(&records)?;
            match output {
                Some(path) => {
                    write_file(&path, &json)?;
                    println!("Exported {} application(s) to {}", records.len(), path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Restore { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read backup file: {}", file.display()))?;
            let mut store = open_store(&config)?;
            let restored = store.save_json(&content)?;
            println!("Restored {} application(s) from {}", restored, file.display());
        }

        Commands::Template { output } => {
            let template = schema::template_csv();
            match output {
                Some(path) => {
                    write_file(&path, &template)?;
                    println!("Template saved to: {}", path.display());
                }
                None => print!("{}", template),
            }
        }

        Commands::Clear { yes } => {
            if !yes {
                println!("This deletes every stored application. Re-run with --yes to confirm.");
            } else {
                let mut store = open_store(&config)?;
                let count = store.count();
                store.clear();
                println!("Removed {} application(s).", count);
            }
        }
    }

    Ok(())
}

fn print_preview(records: &[Application]) {
    println!("Preview (first 5 rows of {} total):", records.len());
    println!("{:<20} {:<24} {:<6} {:<20}", "COMPANY", "TITLE", "YEAR", "STATUS");
    println!("{}", "-".repeat(72));
    for app in records.iter().take(5) {
        println!(
            "{:<20} {:<24} {:<6} {:<20}",
            truncate(app.company.as_deref().unwrap_or(""), 18),
            truncate(app.job_title.as_deref().unwrap_or(""), 22),
            app.year.map(|y| y.to_string()).unwrap_or_default(),
            truncate(app.status.as_deref().unwrap_or(""), 18)
        );
    }
}

fn process_summary(app: &Application) -> String {
    let steps = [
        (Field::EmailQuestions, "email"),
        (Field::OneSidedInterview, "one-sided"),
        (Field::BehaviourialInterview, "behavioural"),
        (Field::PortfolioWalkthrough, "portfolio"),
        (Field::TakeHomeChallenge, "take-home"),
        (Field::RecruiterCall, "recruiter"),
        (Field::PrivatePosting, "private"),
    ];
    let taken: Vec<&str> = steps
        .iter()
        .filter(|(field, _)| app.flag(*field))
        .map(|(_, label)| *label)
        .collect();
    if taken.is_empty() {
        "-".to_string()
    } else {
        taken.join(",")
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("Failed to write to {}", path.display()))
}

/// With `--all` and an active filter, matches are starred and the rest dimmed.
fn row_marker(marking: bool, matched: bool) -> &'static str {
    match (marking, matched) {
        (true, true) => "*",
        (true, false) => "·",
        (false, _) => "",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
