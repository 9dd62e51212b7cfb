// src/main.rs
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use edgar_exhibits::batch::{self, BatchOptions, Filer};
use edgar_exhibits::config::{FetchConfig, ResolverConfig, DEFAULT_USER_AGENT};
use edgar_exhibits::edgar::{CompanyDirectory, EdgarClient, FilingQuery, LegacyOverrides, Resolver};
use edgar_exhibits::pipeline::{identify, CompanyJob, CompanyRef, Downloader};
use edgar_exhibits::render::PdfRenderer;
use edgar_exhibits::storage::{RunLog, StorageManager};
use edgar_exhibits::utils::{logging, AppError};

/// EDGAR exhibit fetcher (EX-2.1 primary, EX-10.1 fallback).
/// Downloads HTML + PDF into <save-dir>/<TICKER>/ from a deal sheet or for a single company.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Deal sheet, .xlsx or .csv (batch mode)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Company ticker (single mode), e.g. BMY
    #[arg(short, long)]
    ticker: Option<String>,

    /// Company legal name (single-mode fallback)
    #[arg(long)]
    name: Option<String>,

    /// CIK, padded to 10 digits if shorter
    #[arg(long)]
    cik: Option<String>,

    /// Form type to scan
    #[arg(long, default_value = "8-K")]
    filing: String,

    /// First filing date, YYYY-MM-DD inclusive (single mode)
    #[arg(long)]
    after: Option<NaiveDate>,

    /// Last filing date, YYYY-MM-DD inclusive (single mode)
    #[arg(long)]
    before: Option<NaiveDate>,

    /// Max filings per company
    #[arg(long)]
    limit: Option<usize>,

    /// Include */A amended forms
    #[arg(long)]
    include_amends: bool,

    /// Which party to pull for each deal row
    #[arg(long, value_enum, default_value_t = Filer::Acquirer)]
    filer: Filer,

    /// Half-window in days around the announce date
    #[arg(long, default_value_t = 5)]
    window_days: i64,

    /// Root output folder
    #[arg(long, default_value = "EDGAR_EXHIBITS")]
    save_dir: PathBuf,

    /// Skip HTML → PDF conversion
    #[arg(long)]
    no_pdf: bool,

    /// Minimum similarity for fuzzy company-name matches
    #[arg(long, default_value_t = 0.90)]
    fuzzy_threshold: f64,

    /// User-Agent sent to SEC (they require contact details)
    #[arg(long, env = "EDGAR_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    let single = args.ticker.is_some() || args.name.is_some() || args.cik.is_some();
    if args.input.is_none() && !single {
        return Err(AppError::Config(
            "Provide either --input (batch) or --ticker/--name/--cik (single)".to_string(),
        ));
    }
    let window = (args.after, args.before);
    if args.input.is_none() && (window.0.is_none() || window.1.is_none()) {
        return Err(AppError::Config("For single mode, provide --after and --before".to_string()));
    }
    if args.window_days < 0 || chrono::Duration::try_days(args.window_days).is_none() {
        return Err(AppError::Config(format!("--window-days {} is out of range", args.window_days)));
    }

    // 3. Initialize client, storage and renderer
    let client = EdgarClient::new(FetchConfig { user_agent: args.user_agent.clone(), ..FetchConfig::default() })?;
    let storage = StorageManager::new(&args.save_dir)?;
    let renderer = if args.no_pdf { None } else { Some(PdfRenderer::detect()) };
    if renderer.as_ref().map_or(false, |r| r.engines().is_empty()) {
        tracing::warn!("No PDF engine found; conversion errors will be recorded next to each exhibit");
    }
    let downloader = Downloader::new(&client, &storage).with_renderer(renderer.as_ref());

    // 4. Load the ticker table once for the run
    let directory = CompanyDirectory::load(&client).await?;
    let mut resolver = Resolver::new(
        directory,
        LegacyOverrides::default(),
        ResolverConfig { fuzzy_threshold: args.fuzzy_threshold },
    );

    // 5. Batch or single
    let result = match (&args.input, window) {
        (Some(input), _) => {
            let rows = batch::load_deals(input)?;
            tracing::info!("Loaded {} deal row(s) from {}", rows.len(), input.display());
            let options = BatchOptions {
                filer: args.filer,
                window_days: args.window_days,
                form: args.filing.clone(),
                include_amendments: args.include_amends,
                limit: args.limit,
            };
            Ok(batch::run_batch(&rows, &options, &mut resolver, &client, &downloader).await)
        }
        (None, (Some(after), Some(before))) => {
            run_single(&args, after, before, &mut resolver, &client, &downloader).await
        }
        (None, _) => return Err(AppError::Config("For single mode, provide --after and --before".to_string())),
    };

    // 6. Write the run logs
    let log = match result {
        Ok(log) => log,
        Err((log, err)) => {
            storage.write_run_log(&log)?;
            return Err(err);
        }
    };
    let (missing, not_found) = storage.write_run_log(&log)?;
    tracing::info!("Missing Exhibit 2.1 list: {}", missing.display());
    tracing::info!("Tickers/CIKs not found: {}", not_found.display());
    tracing::info!("Processing finished.");
    Ok(())
}

async fn run_single(
    args: &Args,
    after: NaiveDate,
    before: NaiveDate,
    resolver: &mut Resolver,
    client: &EdgarClient,
    downloader: &Downloader<'_, EdgarClient>,
) -> Result<RunLog, (RunLog, AppError)> {
    let mut log = RunLog::default();

    let company = CompanyRef {
        cik: args.cik.clone(),
        tickers: args.ticker.iter().map(|t| t.trim().to_uppercase()).collect(),
        names: args.name.iter().cloned().collect(),
    };
    let (cik, label) = match identify(resolver, client, &company, Some(after)).await {
        Ok(found) => found,
        Err(tried) => {
            let tried = if tried.is_empty() { "n/a".to_string() } else { tried.join(", ") };
            log.not_found.push(format!("Single | NO ID | after={} before={} | tried: {}", after, before, tried));
            return Err((log, AppError::Processing("Could not identify the company; see tickersnotfound.txt".to_string())));
        }
    };
    tracing::info!("Using CIK {} for {}", cik, label);

    let job = CompanyJob {
        row: 0,
        label,
        cik,
        query: FilingQuery::new(&args.filing)
            .between(Some(after), Some(before))
            .include_amendments(args.include_amends)
            .limit(args.limit),
    };
    downloader.download_company(&job, &mut log).await;
    Ok(log)
}
