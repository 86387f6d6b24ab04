use adas_catalog_core::{
    read_dataset_file, validate, AdvancedCriteria, CalibrationCatalog, CalibrationKind,
    CatalogConfig, DatabaseConfig, Feature, LoadError, RawDataset, SearchConfig, SearchEngine,
    SearchFilters, SearchOutcome, VehicleMatch,
};
use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::Url;

const SEARCH_CACHE_FILE: &str = "search_cache.json";
const PROCEDURE_CACHE_FILE: &str = "procedure_cache.json";

#[derive(Parser)]
#[command(name = "adas-catalog", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Catalog file (`;`-delimited UTF-8). The built-in demo catalog is used when omitted.
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Directory for the search and procedure cache files. Caches stay in memory when unset.
    #[arg(long, env = "ADAS_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,

    /// Online calibration procedure endpoint.
    #[arg(long, env = "ADAS_PROCEDURE_ENDPOINT", global = true)]
    procedure_endpoint: Option<Url>,

    /// Timeout for one online procedure request.
    #[arg(long, env = "ADAS_FETCH_TIMEOUT_SECS", default_value = "15", global = true)]
    fetch_timeout_secs: u64,

    /// Lifetime of cached searches and procedures.
    #[arg(long, env = "ADAS_CACHE_TTL_HOURS", default_value = "24", global = true)]
    cache_ttl_hours: i64,

    /// Print JSON instead of text.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the catalog and print the quality report.
    Validate,
    /// Fuzzy search over the whole catalog.
    Search {
        query: String,
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        adas: Option<bool>,
        /// Calibration kind substring, e.g. "Dinamica" or "Static".
        #[arg(long)]
        kind: Option<String>,
        #[arg(long, default_value = "10")]
        max_results: usize,
    },
    /// Brand/model search with the stricter threshold.
    Quick {
        query: String,
        #[arg(long, default_value = "10")]
        max_results: usize,
    },
    /// Autocomplete suggestions for a partial query.
    Suggest {
        partial: String,
        #[arg(long, default_value = "5")]
        limit: usize,
    },
    /// Filter the catalog without scoring.
    Advanced {
        #[arg(long)]
        brand: Option<String>,
        #[arg(long, requires = "year_to")]
        year_from: Option<i32>,
        #[arg(long, requires = "year_from")]
        year_to: Option<i32>,
        #[arg(long)]
        adas: Option<bool>,
        #[arg(long)]
        kind: Option<String>,
        /// Required equipment; repeat for several.
        #[arg(long = "feature", value_enum)]
        features: Vec<FeatureArg>,
    },
    /// Calibration procedure for a brand, optionally narrowed to one calibration kind.
    Procedure {
        brand: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, value_enum)]
        focus: Option<FocusArg>,
        /// Also print the troubleshooting guide for this error code.
        #[arg(long)]
        error_code: Option<String>,
    },
    /// ADAS, index and usage statistics.
    Stats,
    /// Write the cleaned catalog as JSON.
    Export { output: PathBuf },
    /// Time a list of searches and print optimization hints.
    Bench {
        queries: Vec<String>,
        /// Run the list this many times; later rounds exercise the cache.
        #[arg(long, default_value = "2")]
        rounds: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FeatureArg {
    Windshield,
    Bumper,
    RearCamera,
    Matrix,
}

impl From<FeatureArg> for Feature {
    fn from(value: FeatureArg) -> Self {
        match value {
            FeatureArg::Windshield => Feature::WindshieldAdas,
            FeatureArg::Bumper => Feature::BumperAdas,
            FeatureArg::RearCamera => Feature::RearCamera,
            FeatureArg::Matrix => Feature::MatrixLights,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FocusArg {
    Static,
    Dynamic,
}

impl From<FocusArg> for CalibrationKind {
    fn from(value: FocusArg) -> Self {
        match value {
            FocusArg::Static => CalibrationKind::Static,
            FocusArg::Dynamic => CalibrationKind::Dynamic,
        }
    }
}

const DEFAULT_BENCH_QUERIES: [&str; 5] = [
    "BMW 118i",
    "92983",
    "volkswagen polo",
    "mercedes a200",
    "toyota corolla",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "adas-catalog boot"
    );

    // Catalog work is synchronous and the procedure client blocks.
    tokio::task::spawn_blocking(move || run(cli)).await?
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Validate => {
            let raw = match &cli.file {
                Some(path) => read_dataset_file(path, &DatabaseConfig::default())
                    .with_context(|| format!("reading {}", path.display()))?,
                None => RawDataset::demo(),
            };
            let report = validate(&raw);

            if cli.json {
                print_json(&report)?;
            } else {
                println!(
                    "rows={} passed={} quality_score={:.1}",
                    report.total_rows, report.validation_passed, report.quality_score
                );
                for error in &report.errors {
                    println!("  error: {error}");
                }
                for warning in &report.warnings {
                    println!("  warning: {warning}");
                }
                let stats = &report.statistics;
                println!(
                    "missing={:.2}% brands={} adas={} ({:.2}%)",
                    stats.missing_data_percentage,
                    stats.unique_brands,
                    stats.vehicles_with_adas,
                    stats.adas_percentage
                );
            }

            if !report.validation_passed {
                anyhow::bail!("catalog failed structural validation");
            }
        }
        Command::Search {
            query,
            brand,
            year,
            adas,
            kind,
            max_results,
        } => {
            let engine = load_engine(&cli)?;
            let filters = SearchFilters {
                brand: brand.clone(),
                year: *year,
                has_adas: *adas,
                calibration_kind: kind.clone(),
            };
            let outcome = engine.search(query, &filters, *max_results);
            print_outcome(&outcome, cli.json)?;
        }
        Command::Quick { query, max_results } => {
            let engine = load_engine(&cli)?;
            let outcome = engine.quick_search(query, *max_results);
            print_outcome(&outcome, cli.json)?;
        }
        Command::Suggest { partial, limit } => {
            let engine = load_engine(&cli)?;
            let suggestions = engine.suggestions(partial, *limit);
            if cli.json {
                print_json(&suggestions)?;
            } else {
                for suggestion in suggestions {
                    println!("{suggestion}");
                }
            }
        }
        Command::Advanced {
            brand,
            year_from,
            year_to,
            adas,
            kind,
            features,
        } => {
            let engine = load_engine(&cli)?;
            let criteria = AdvancedCriteria {
                brand: brand.clone(),
                year_range: year_from.zip(*year_to),
                has_adas: *adas,
                calibration_kind: kind.clone(),
                features: features.iter().copied().map(Feature::from).collect(),
            };
            let results = engine.advanced_search(&criteria);
            if cli.json {
                print_json(&results)?;
            } else {
                println!("results={}", results.len());
                for found in &results {
                    print_match(found);
                }
            }
        }
        Command::Procedure {
            brand,
            model,
            year,
            focus,
            error_code,
        } => {
            let catalog = CalibrationCatalog::from_config(&catalog_config(&cli));
            print_procedure(&catalog, brand, model.as_deref(), *year, *focus, cli.json)?;

            if let Some(code) = error_code {
                let guide = catalog.troubleshooting(brand, Some(code));
                if cli.json {
                    print_json(&guide)?;
                } else {
                    for issue in &guide.common_issues {
                        println!("problem: {}", issue.problem);
                        for solution in &issue.solutions {
                            println!("  - {solution}");
                        }
                    }
                }
            }
        }
        Command::Stats => {
            let engine = load_engine(&cli)?;
            let stats = engine.statistics();
            if cli.json {
                print_json(&stats)?;
            } else {
                let adas = &stats.adas;
                println!(
                    "vehicles={} with_adas={} ({:.2}%) windshield={} bumper={}",
                    adas.total_vehicles,
                    adas.vehicles_with_adas,
                    adas.adas_percentage,
                    adas.windshield_adas,
                    adas.bumper_adas
                );
                for (kind, count) in &adas.calibration_kinds {
                    println!("  calibration {kind}: {count}");
                }
                for (brand, count) in &adas.top_brands_with_adas {
                    println!("  brand {brand}: {count}");
                }
                println!(
                    "index: ids={} duplicates={} brands={} years={}",
                    stats.index.id_index_size,
                    stats.index.duplicate_ids,
                    stats.index.brands_count,
                    stats.index.years_count
                );
                println!("fresh={}", engine.is_data_fresh());
            }
        }
        Command::Export { output } => {
            let engine = load_engine(&cli)?;
            engine
                .export_json(output)
                .with_context(|| format!("exporting to {}", output.display()))?;
            println!("exported to {}", output.display());
        }
        Command::Bench { queries, rounds } => {
            let engine = load_engine(&cli)?;
            let queries = if queries.is_empty() {
                DEFAULT_BENCH_QUERIES.iter().map(|query| query.to_string()).collect()
            } else {
                queries.clone()
            };

            for round in 1..=*rounds {
                let report = engine.benchmark(&queries);
                if cli.json {
                    print_json(&report)?;
                } else {
                    println!(
                        "round={round} queries={} average_ms={:.2} cache_hit_rate={:.1}%",
                        report.total_queries,
                        report.average_ms,
                        report.cache_hit_rate()
                    );
                }
                for hint in report.optimization_hints() {
                    println!("  hint: {hint}");
                }
            }
        }
    }

    Ok(())
}

fn load_engine(cli: &Cli) -> anyhow::Result<SearchEngine> {
    let config = SearchConfig {
        cache_ttl_hours: cli.cache_ttl_hours,
        cache_path: cli.cache_dir.as_ref().map(|dir| dir.join(SEARCH_CACHE_FILE)),
        ..SearchConfig::default()
    };
    let engine = SearchEngine::new(config, DatabaseConfig::default());

    let loaded = match &cli.file {
        Some(path) => engine.load_from_path(path),
        None => engine.load_demo(),
    };

    match loaded {
        Ok(summary) => {
            if let Some(report) = summary.validation.as_ref().filter(|report| !report.errors.is_empty()) {
                warn!(errors = report.errors.len(), "catalog loaded with validation errors");
            }
            Ok(engine)
        }
        Err(LoadError::MissingColumns { columns, report }) => {
            for error in &report.errors {
                eprintln!("error: {error}");
            }
            anyhow::bail!("catalog is missing required columns: {}", columns.join(", "))
        }
        Err(error) => Err(error).with_context(|| source_label(cli.file.as_deref())),
    }
}

fn catalog_config(cli: &Cli) -> CatalogConfig {
    CatalogConfig {
        endpoint: cli.procedure_endpoint.clone(),
        fetch_timeout_secs: cli.fetch_timeout_secs,
        cache_ttl_hours: cli.cache_ttl_hours,
        cache_path: cli.cache_dir.as_ref().map(|dir| dir.join(PROCEDURE_CACHE_FILE)),
    }
}

fn source_label(path: Option<&Path>) -> String {
    match path {
        Some(path) => format!("loading {}", path.display()),
        None => "loading demo catalog".to_string(),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_outcome(outcome: &SearchOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(outcome);
    }

    let stats = &outcome.stats;
    println!(
        "query: {} method={} results={} elapsed_ms={:.2} cache_hit={}",
        stats.normalized_query, stats.method, stats.total_results, stats.elapsed_ms, stats.cache_hit
    );
    if let Some(message) = &stats.message {
        println!("  {message}");
    }
    for found in &outcome.results {
        print_match(found);
    }
    Ok(())
}

fn print_match(found: &VehicleMatch) {
    let record = &found.record;
    println!(
        "[{:.1}] id={} {} {} year={} adas={} calibration={}",
        found.score,
        record.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
        record.brand,
        record.model_name,
        record.year.map(|year| year.to_string()).unwrap_or_else(|| "-".to_string()),
        if record.has_adas { "Sim" } else { "Não" },
        record.calibration_kind
    );
}

fn print_procedure(
    catalog: &CalibrationCatalog,
    brand: &str,
    model: Option<&str>,
    year: Option<i32>,
    focus: Option<FocusArg>,
    json: bool,
) -> anyhow::Result<()> {
    if let Some(focus) = focus {
        let guide = catalog.step_by_step(brand, model, year, focus.into());
        if json {
            return print_json(&guide);
        }
        println!("{} ({})", guide.procedure.title, guide.focus);
        for (position, step) in guide.steps().iter().enumerate() {
            println!("  {}. {step}", position + 1);
        }
        return Ok(());
    }

    let procedure = catalog.get_procedure(brand, model, year);
    if json {
        return print_json(&procedure);
    }

    println!("{} [{}]", procedure.title, procedure.source);
    println!("estimated duration: {}", procedure.estimated_duration);
    println!("types: {}", procedure.calibration_types.join(", "));
    for (position, step) in procedure.steps.iter().enumerate() {
        println!("  {}. {step}", position + 1);
    }
    for requirement in &procedure.requirements {
        println!("  requirement: {requirement}");
    }
    for warning in &procedure.warnings {
        println!("  warning: {warning}");
    }
    for item in &procedure.equipment {
        println!("  equipment: {item}");
    }
    for note in &procedure.model_notes {
        println!("  note: {note}");
    }
    Ok(())
}
