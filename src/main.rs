use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use eximcast::{
    export, Catalog, CatalogEntry, DuplicatePolicy, Method, Pipeline, PipelineConfig,
    PipelineError, Report,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Duplicates {
    Reject,
    KeepLast,
    Sum,
}

impl From<Duplicates> for DuplicatePolicy {
    fn from(d: Duplicates) -> Self {
        match d {
            Duplicates::Reject => DuplicatePolicy::Reject,
            Duplicates::KeepLast => DuplicatePolicy::KeepLast,
            Duplicates::Sum => DuplicatePolicy::Sum,
        }
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Commodity import/export cleaning, dependency ratios and short-horizon forecast"
)]
struct Args {
    /// YAML catalog of commodities (and optional settings)
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Commodity name from the catalog
    #[arg(short = 'm', long, requires = "catalog", conflicts_with_all = ["input", "all"])]
    commodity: Option<String>,

    /// Trade table CSV to run directly
    #[arg(short, long, conflicts_with = "all")]
    input: Option<PathBuf>,

    /// Run every catalog commodity
    #[arg(long, requires = "catalog")]
    all: bool,

    /// List catalog commodities and exit
    #[arg(long, requires = "catalog")]
    list: bool,

    /// Future years to project (overrides catalog settings)
    #[arg(long)]
    horizon: Option<usize>,

    /// How rows sharing a year are handled (overrides catalog settings)
    #[arg(long, value_enum)]
    duplicates: Option<Duplicates>,

    /// Write the full report as JSON
    #[arg(long, conflicts_with = "all")]
    json_out: Option<PathBuf>,

    /// Write the combined actual/forecast table as parquet
    #[arg(long, conflicts_with = "all")]
    parquet_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // ─── 2) configuration ────────────────────────────────────────────
    let catalog = match &args.catalog {
        Some(path) => Some(Catalog::load(path)?),
        None => None,
    };
    let mut config = catalog
        .as_ref()
        .map(|c| c.settings.clone())
        .unwrap_or_else(PipelineConfig::default);
    if let Some(h) = args.horizon {
        config.horizon = h;
    }
    if let Some(d) = args.duplicates {
        config.duplicate_policy = d.into();
    }

    if args.list {
        if let Some(catalog) = &catalog {
            for name in catalog.names() {
                println!("{}", name);
            }
        }
        return Ok(());
    }

    let pipeline = Pipeline::new(config).context("invalid pipeline configuration")?;
    let settings = pipeline.config();
    info!(
        horizon = settings.horizon,
        duplicates = ?settings.duplicate_policy,
        min_points = settings.forecast.min_points,
        model = settings.forecast.primary_enabled,
        "pipeline ready"
    );

    // ─── 3) run ──────────────────────────────────────────────────────
    if args.all {
        let catalog = catalog.context("--all needs --catalog")?;
        let mut failed = 0;
        for (name, outcome) in pipeline.run_many(&catalog.commodities) {
            match outcome {
                Ok(report) => print_report(&report),
                Err(e) => {
                    failed += 1;
                    log_failure(&name, &e);
                }
            }
        }
        if failed > 0 {
            bail!("{} of {} commodities failed", failed, catalog.commodities.len());
        }
        return Ok(());
    }

    let entry = match (&args.commodity, &args.input, &catalog) {
        (Some(name), _, Some(catalog)) => catalog.find(name)?.clone(),
        (None, Some(path), _) => CatalogEntry {
            name: path.display().to_string(),
            path: path.clone(),
        },
        _ => bail!("pass --commodity with --catalog, --input, or --all"),
    };

    let report = match pipeline.run_entry(&entry) {
        Ok(r) => r,
        Err(e) => {
            log_failure(&entry.name, &e);
            return Err(e.into());
        }
    };
    print_report(&report);

    // ─── 4) exports ──────────────────────────────────────────────────
    if let Some(path) = &args.json_out {
        export::write_json(&report, path)?;
    }
    if let Some(path) = &args.parquet_out {
        export::write_parquet(&report.table, path)?;
    }

    info!("all done");
    Ok(())
}

fn log_failure(name: &str, e: &PipelineError) {
    match e {
        PipelineError::SourceUnavailable { .. } => error!(commodity = name, "no data: {}", e),
        PipelineError::Format { .. } => error!(commodity = name, "bad data: {}", e),
        _ => error!(commodity = name, "{}", e),
    }
}

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    v.map(|x| format!("{:.*}", precision, x))
        .unwrap_or_else(|| "-".to_string())
}

fn method_label(method: Method) -> &'static str {
    match method {
        Method::Model => "ARIMA(1,1,1)",
        Method::Fallback => "growth fallback (approximation)",
    }
}

fn print_report(report: &Report) {
    let title = report
        .commodity
        .clone()
        .unwrap_or_else(|| report.source.display().to_string());

    println!("== {} cleaned data ==", title);
    println!(
        "{:>6} {:>14} {:>14} {:>10} {:>10}",
        "Year", "Import", "Export", "Imp/Exp", "Exp/Imp"
    );
    for r in report.cleaned.records() {
        println!(
            "{:>6} {:>14.2} {:>14.2} {:>10} {:>10}",
            r.year,
            r.import_value,
            r.export_value,
            fmt_opt(r.dependency, 4),
            fmt_opt(r.export_dependency, 4)
        );
    }

    println!();
    println!("== {} forecast table ==", title);
    println!(
        "import: {}; export: {}",
        method_label(report.import_forecast.method),
        method_label(report.export_forecast.method)
    );
    println!(
        "{:>6} {:>14} {:>14} {:>16} {:>16}",
        "Year", "Import_actual", "Export_actual", "Import_forecast", "Export_forecast"
    );
    for r in report.table.rows() {
        println!(
            "{:>6} {:>14} {:>14} {:>16} {:>16}",
            r.year,
            fmt_opt(r.import_actual, 2),
            fmt_opt(r.export_actual, 2),
            fmt_opt(r.import_forecast, 2),
            fmt_opt(r.export_forecast, 2)
        );
    }
    println!();
}
