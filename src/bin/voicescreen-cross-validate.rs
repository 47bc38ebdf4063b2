//! Stratified K-fold cross-validation of a labeled cohort CSV.

use std::path::PathBuf;

use voicescreen::config::{self, Settings};
use voicescreen::dataset::{CohortTable, DIAGNOSIS_COLUMN, ID_COLUMN};
use voicescreen::logging;
use voicescreen::ml::metrics::summarize;
use voicescreen::ml::{CrossValOptions, ModelKind, cross_validate};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let settings = config::load_or_default().map_err(|err| err.to_string())?;
    let options = parse_args(std::env::args().skip(1).collect(), &settings)?;
    if let Err(err) = logging::init(&settings.log_level) {
        eprintln!("Logging disabled: {err}");
    }

    let cohort = CohortTable::read_csv(&options.cohort).map_err(|err| err.to_string())?;
    let features: Vec<String> = if options.features.is_empty() {
        cohort
            .column_names()
            .filter(|name| *name != ID_COLUMN && *name != DIAGNOSIS_COLUMN)
            .map(str::to_string)
            .collect()
    } else {
        options.features.clone()
    };
    let table = cross_validate(&cohort, &features, &options.cross_val).map_err(|err| err.to_string())?;

    if let Some(path) = &options.out {
        table.write_csv(path).map_err(|err| err.to_string())?;
    } else {
        table
            .to_csv_writer(std::io::stdout().lock())
            .map_err(|err| err.to_string())?;
    }

    let summary = summarize(&table, options.threshold);
    for fold in &summary.folds {
        eprintln!(
            "fold {:>2}  accuracy={:.3}  sensitivity={:.3}  specificity={:.3}  support={}",
            fold.fold, fold.accuracy, fold.sensitivity, fold.specificity, fold.support
        );
    }
    eprintln!(
        "mean      accuracy={:.3}±{:.3}  sensitivity={:.3}±{:.3}  specificity={:.3}±{:.3}",
        summary.accuracy.mean,
        summary.accuracy.std,
        summary.sensitivity.mean,
        summary.sensitivity.std,
        summary.specificity.mean,
        summary.specificity.std
    );
    if let Some(path) = &options.metrics_out {
        let json = serde_json::to_vec_pretty(&summary).map_err(|err| err.to_string())?;
        std::fs::write(path, json)
            .map_err(|err| format!("Failed to write {}: {err}", path.display()))?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    cohort: PathBuf,
    out: Option<PathBuf>,
    metrics_out: Option<PathBuf>,
    features: Vec<String>,
    cross_val: CrossValOptions,
    threshold: f64,
}

fn parse_args(args: Vec<String>, settings: &Settings) -> Result<CliOptions, String> {
    let mut cohort: Option<PathBuf> = None;
    let mut out = None;
    let mut metrics_out = None;
    let mut features = Vec::new();
    let mut cross_val = settings
        .classification
        .cross_val_options()
        .map_err(|err| format!("Invalid config: {err}"))?;
    let mut threshold = settings.classification.decision_threshold;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--cohort" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--cohort requires a value".to_string())?;
                cohort = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                out = Some(PathBuf::from(value));
            }
            "--metrics-out" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--metrics-out requires a value".to_string())?;
                metrics_out = Some(PathBuf::from(value));
            }
            "--features" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--features requires a value".to_string())?;
                features = value
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                cross_val.model = value.parse::<ModelKind>().map_err(|err| err.to_string())?;
            }
            "--folds" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--folds requires a value".to_string())?;
                cross_val.num_folds = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --folds value: {value}"))?;
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                cross_val.seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("Invalid --seed value: {value}"))?,
                );
            }
            "--threshold" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--threshold requires a value".to_string())?;
                threshold = value
                    .parse::<f64>()
                    .ok()
                    .filter(|t| (0.0..=1.0).contains(t))
                    .ok_or_else(|| format!("Invalid --threshold value: {value}"))?;
            }
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }

    let cohort = cohort.ok_or_else(|| format!("--cohort is required\n\n{}", help_text()))?;
    Ok(CliOptions {
        cohort,
        out,
        metrics_out,
        features,
        cross_val,
        threshold,
    })
}

fn help_text() -> String {
    [
        "voicescreen-cross-validate",
        "",
        "Runs stratified K-fold cross-validation and writes one probability column per fold.",
        "",
        "Usage:",
        "  voicescreen-cross-validate --cohort <csv> [options]",
        "",
        "Options:",
        "  --cohort <csv>        Table with ID, Diagnosis (0/1) and feature columns (required).",
        "  --features <a,b,..>   Feature columns to use (default: every other column).",
        "  --model <nb|lr|svm>   Classifier (default from config: svm).",
        "  --folds <n>           Fold count (default from config: 5).",
        "  --seed <u64>          Fixed fold shuffle seed.",
        "  --threshold <p>       Decision threshold for the fold metrics (default: 0.5).",
        "  --out <csv>           Result table path (default: stdout).",
        "  --metrics-out <json>  Write per-fold metrics and their summary as JSON.",
    ]
    .join("\n")
}
