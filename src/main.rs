//! slide-sieve - batch preprocessing for histology whole slide images.
//!
//! This binary parses the command line, installs logging and dispatches to
//! one job per subcommand.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slide_sieve::{
    clean::{clean_tiles, purge, CleanPlan},
    config::{CleanArgs, Cli, Command, CountArgs, ExtractArgs, InfoArgs, PurgeArgs},
    io::{BlockCache, FileRangeReader},
    nuclei::{count_nuclei, FeatureTable},
    slide::{DecodedBlockCache, SlideReader, TiffSlide},
    tile::extract_tiles,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Info(args) => run_info(args).await,
        Command::Extract(args) => run_extract(args).await,
        Command::Clean(args) => run_clean(args).await,
        Command::Purge(args) => run_purge(args).await,
        Command::Count(args) => run_count(args).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "slide_sieve=debug"
    } else {
        "slide_sieve=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Info Command
// =============================================================================

async fn run_info(args: InfoArgs) -> ExitCode {
    let slide = match TiffSlide::open_path(&args.slide).await {
        Ok(slide) => slide,
        Err(e) => {
            error!("Cannot open slide {}: {}", args.slide.display(), e);
            return ExitCode::FAILURE;
        }
    };

    println!("{}", slide.identifier());
    println!("─────────────────");
    for series in slide.all_series() {
        println!(
            "  [{}] {}x{} px, {} channel(s), block {}x{}, {}",
            series.index,
            series.width,
            series.height,
            series.channels,
            series.tile_width,
            series.tile_height,
            series.compression
        );
        if let Some(label) = &series.label {
            println!("      {}", label);
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Extract Command
// =============================================================================

async fn run_extract(args: ExtractArgs) -> ExitCode {
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let file = match FileRangeReader::open(&args.slide).await {
        Ok(file) => file,
        Err(e) => {
            error!("Cannot open slide {}: {}", args.slide.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let blocks = DecodedBlockCache::with_capacity(args.cache_bytes);
    let slide = match TiffSlide::with_cache(BlockCache::new(file), blocks).await {
        Ok(slide) => slide,
        Err(e) => {
            error!("Cannot read slide {}: {}", args.slide.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let params = args.extractor_params();
    info!(
        slide = %args.slide.display(),
        selector = %params.selector,
        output = %args.output.display(),
        "Extracting tiles"
    );

    match extract_tiles(&slide, &args.slide_stem(), &args.output, &params).await {
        Ok(summary) => {
            if summary.saved == 0 {
                warn!("No tile passed the filters");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Extraction failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Clean Command
// =============================================================================

async fn run_clean(args: CleanArgs) -> ExitCode {
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let params = args.classifier_params();
    let disposal = args.disposal();
    let root = args.root.clone();

    let result =
        tokio::task::spawn_blocking(move || clean_tiles(&root, &params, &disposal)).await;
    let outcome = match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            error!("Cleaning failed: {}", e);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("Cleaning task panicked: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(ref plan_path) = args.plan {
        if let Err(e) = outcome.plan.save(plan_path) {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
        info!(plan = %plan_path.display(), entries = outcome.plan.len(), "Wrote clean plan");
    }

    if outcome.summary.disposal_failures > 0 {
        warn!(
            failures = outcome.summary.disposal_failures,
            "Some files could not be disposed of"
        );
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Purge Command
// =============================================================================

async fn run_purge(args: PurgeArgs) -> ExitCode {
    let plan = match CleanPlan::load(&args.plan) {
        Ok(plan) => plan,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let summary = match tokio::task::spawn_blocking(move || purge(&plan)).await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Purge task panicked: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if summary.failed > 0 {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

// =============================================================================
// Count Command
// =============================================================================

async fn run_count(args: CountArgs) -> ExitCode {
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let params = args.nuclei_params();
    let root = args.root.clone();
    let output = args.output.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut table = FeatureTable::open(output)?;
        count_nuclei(&root, &mut table, &params)
    })
    .await;

    match result {
        Ok(Ok(_)) => {
            info!(table = %args.output.display(), "Data saved");
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!("Counting failed: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Counting task panicked: {}", e);
            ExitCode::FAILURE
        }
    }
}
