mod clean;
mod config;
mod db;
mod extract;
mod logging;
mod models;
mod repair;
mod silver;
mod transform;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS, ExtractConfig, StagingPaths, StoreConfig};
use db::{JobFilter, SilverStore, load_silver_csv};
use extract::{JobBoardClient, save_bronze};
use std::path::PathBuf;
use std::time::Duration;
use transform::{RecordTransformer, transform_bronze_to_silver};

#[derive(Parser)]
#[command(name = "jobetl")]
#[command(about = "Job board pipeline - fetch listings, clean them, load them into SQLite")]
struct Cli {
    /// Directory for the bronze JSON and silver CSV files
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// SQLite database path (defaults to $JOBETL_DB, then the user data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct FetchArgs {
    /// Job board API endpoint
    #[arg(long, default_value = DEFAULT_API_URL)]
    url: String,

    /// Maximum number of pages to follow
    #[arg(long, default_value = "1")]
    pages: usize,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
}

impl FetchArgs {
    fn config(&self) -> ExtractConfig {
        ExtractConfig {
            url: self.url.clone(),
            timeout: Duration::from_secs(self.timeout),
            max_pages: self.pages,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch listings and save the bronze JSON
    Fetch {
        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Clean the bronze JSON into the silver CSV
    Transform {
        /// Bronze JSON (defaults to <data-dir>/bronze_jobs.json)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Silver CSV (defaults to <data-dir>/silver_jobs.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip mojibake repair
        #[arg(long)]
        no_repair: bool,
    },

    /// Load the silver CSV into the database
    Load {
        /// Silver CSV (defaults to <data-dir>/silver_jobs.csv)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Empty the table before loading
        #[arg(long)]
        replace: bool,
    },

    /// Fetch, transform and load in one go
    Run {
        #[command(flatten)]
        fetch: FetchArgs,

        /// Skip mojibake repair
        #[arg(long)]
        no_repair: bool,

        /// Empty the table before loading
        #[arg(long)]
        replace: bool,
    },

    /// List loaded jobs
    List {
        /// Filter by city
        #[arg(short, long)]
        city: Option<String>,

        /// Filter by country
        #[arg(long)]
        country: Option<String>,

        /// Only remote jobs
        #[arg(short, long)]
        remote: bool,

        /// Number of jobs to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show a loaded job
    Show {
        /// Job ID (numeric suffix of the listing slug)
        job_id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let paths = StagingPaths::in_dir(&cli.data_dir);
    let store_config = StoreConfig::resolve(cli.db.clone());

    match cli.command {
        Commands::Fetch { fetch } => {
            let count = run_fetch(&fetch, &paths)?;
            println!("Fetched {} jobs into {}", count, paths.bronze.display());
        }

        Commands::Transform {
            input,
            output,
            no_repair,
        } => {
            let input = input.unwrap_or(paths.bronze);
            let output = output.unwrap_or(paths.silver);
            let transformer = RecordTransformer::new(repair::for_flag(no_repair));
            let count = transform_bronze_to_silver(&transformer, &input, &output)?;
            if count == 0 {
                println!("No jobs found in {}.", input.display());
            } else {
                println!("Silver CSV created at {}", output.display());
                println!("Total records processed: {}", count);
            }
        }

        Commands::Load { input, replace } => {
            let input = input.unwrap_or(paths.silver);
            let mut store = SilverStore::open(&store_config)?;
            store.init()?;
            let total = load_silver_csv(&mut store, &input, replace)?;
            println!("Loaded {} into {} ({} rows)", input.display(), store.path().display(), total);
        }

        Commands::Run {
            fetch,
            no_repair,
            replace,
        } => {
            let fetched = run_fetch(&fetch, &paths)?;
            println!("Bronze: {} jobs -> {}", fetched, paths.bronze.display());

            let transformer = RecordTransformer::new(repair::for_flag(no_repair));
            let processed = transform_bronze_to_silver(&transformer, &paths.bronze, &paths.silver)?;
            if processed == 0 {
                println!("No jobs found in payload; nothing to load.");
                return Ok(());
            }
            println!("Silver: {} records -> {}", processed, paths.silver.display());

            let mut store = SilverStore::open(&store_config)?;
            store.init()?;
            let total = load_silver_csv(&mut store, &paths.silver, replace)?;
            println!("Store:  {} rows in {}", total, store.path().display());
        }

        Commands::List {
            city,
            country,
            remote,
            limit,
        } => {
            let store = SilverStore::open(&store_config)?;
            store.ensure_initialized()?;
            let filter = JobFilter {
                city,
                country,
                remote_only: remote,
                limit: Some(limit),
            };
            let jobs = store.list_jobs(&filter)?;
            if jobs.is_empty() {
                println!("No jobs found.");
            } else {
                println!(
                    "{:<10} {:<30} {:<22} {:<16} {:<6} {:<10}",
                    "JOB ID", "TITLE", "COMPANY", "CITY", "REMOTE", "CREATED"
                );
                println!("{}", "-".repeat(99));
                for job in jobs {
                    println!(
                        "{:<10} {:<30} {:<22} {:<16} {:<6} {:<10}",
                        truncate(&job.job_id, 10),
                        truncate(&job.title, 28),
                        truncate(&job.company_name, 20),
                        truncate(&job.city, 14),
                        if job.remote == 1 { "yes" } else { "no" },
                        truncate(&job.created_at, 10)
                    );
                }
            }
        }

        Commands::Show { job_id } => {
            let store = SilverStore::open(&store_config)?;
            store.ensure_initialized()?;
            match store.get_job(&job_id)? {
                Some(job) => {
                    println!("Job #{}", job.job_id);
                    println!("Title: {}", job.title);
                    println!("Slug title: {}", job.slug_title);
                    println!("Company: {}", job.company_name);
                    println!("Location: {}, {}, {}", job.city, job.region, job.country);
                    println!("Remote: {}", if job.remote == 1 { "yes" } else { "no" });
                    println!("URL: {}", job.url);
                    println!("Created: {}", job.created_at);
                    println!("Loaded: {}", job.loaded_at);
                    println!(
                        "\n--- Description ({} chars) ---\n{}",
                        job.description_length, job.description
                    );
                }
                None => {
                    println!("Job #{} not found.", job_id);
                }
            }
        }
    }

    Ok(())
}

fn run_fetch(args: &FetchArgs, paths: &StagingPaths) -> Result<usize> {
    let client = JobBoardClient::new(args.config())?;
    let jobs = client.fetch_jobs()?;
    save_bronze(&paths.bronze, &jobs)?;
    Ok(jobs.len())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
