//! Extract the 14 acoustic features from voice recordings into a cohort CSV.

use std::path::{Path, PathBuf};

use voicescreen::analysis::{
    Extraction, FEATURE_NAMES, PitchRange, PitchUnit, Recording, extract_batch,
};
use voicescreen::config::{self, Settings};
use voicescreen::dataset::{
    CohortRecord, CohortTable, ColumnData, DIAGNOSIS_COLUMN, Diagnosis, ID_COLUMN,
};
use voicescreen::logging;

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

    let range = PitchRange::new(options.f0_min, options.f0_max).map_err(|err| err.to_string())?;
    let inputs = match &options.manifest {
        Some(path) => read_manifest(path)?,
        None => options
            .files
            .iter()
            .map(|path| Input {
                id: file_id(path),
                path: path.clone(),
                diagnosis: None,
            })
            .collect(),
    };
    if inputs.is_empty() {
        return Err("No recordings given; pass audio files or --manifest".to_string());
    }
    let recordings: Vec<Recording> = inputs
        .iter()
        .map(|input| {
            Recording::from_file(&input.path, range, options.unit).with_id(input.id.clone())
        })
        .collect();

    let extractions = extract_batch(&recordings, options.workers);
    let failed = extractions.iter().filter(|e| !e.is_measured()).count();
    tracing::info!(
        recordings = extractions.len(),
        failed,
        "feature extraction finished"
    );

    let table = build_table(&inputs, &extractions)?;
    match &options.out {
        Some(path) => table.write_csv(path).map_err(|err| err.to_string())?,
        None => table
            .to_csv_writer(std::io::stdout().lock())
            .map_err(|err| err.to_string())?,
    }
    if failed > 0 {
        eprintln!("{failed} recording(s) could not be analysed and were written as zero vectors");
    }
    Ok(())
}

struct Input {
    id: String,
    path: PathBuf,
    diagnosis: Option<Diagnosis>,
}

fn file_id(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `ID,Diagnosis,Path` rows; relative paths resolve against the manifest's folder.
fn read_manifest(path: &Path) -> Result<Vec<Input>, String> {
    let table = CohortTable::read_csv(path).map_err(|err| err.to_string())?;
    let ids = text_or_numbers(&table, ID_COLUMN)?;
    let paths = text_or_numbers(&table, "Path")?;
    let labels = match table.column(DIAGNOSIS_COLUMN) {
        Some(ColumnData::Numeric(values)) => values
            .iter()
            .map(|&value| {
                Diagnosis::from_label(value)
                    .map(Some)
                    .ok_or_else(|| format!("Invalid Diagnosis value {value} in manifest"))
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(ColumnData::Text(_)) => {
            return Err("Manifest Diagnosis column must hold 0 or 1".to_string());
        }
        None => vec![None; table.row_count()],
    };
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(ids
        .into_iter()
        .zip(paths)
        .zip(labels)
        .map(|((id, file), diagnosis)| Input {
            id,
            path: base.join(file),
            diagnosis,
        })
        .collect())
}

fn text_or_numbers(table: &CohortTable, name: &str) -> Result<Vec<String>, String> {
    match table.column(name) {
        Some(ColumnData::Text(values)) => Ok(values.clone()),
        Some(ColumnData::Numeric(values)) => Ok(values.iter().map(f64::to_string).collect()),
        None => Err(format!("Manifest is missing the `{name}` column")),
    }
}

fn build_table(inputs: &[Input], extractions: &[Extraction]) -> Result<CohortTable, String> {
    let labels: Option<Vec<Diagnosis>> = inputs.iter().map(|input| input.diagnosis).collect();
    if let Some(labels) = labels {
        let records: Vec<CohortRecord> = extractions
            .iter()
            .zip(labels)
            .map(|(extraction, diagnosis)| CohortRecord {
                id: extraction.recording_id.clone(),
                diagnosis,
                features: extraction.features,
            })
            .collect();
        return Ok(CohortTable::from_records(&records));
    }
    let mut table = CohortTable::new()
        .with_column(
            ID_COLUMN,
            ColumnData::Text(extractions.iter().map(|e| e.recording_id.clone()).collect()),
        )
        .map_err(|err| err.to_string())?;
    for (idx, name) in FEATURE_NAMES.iter().enumerate() {
        let values = extractions
            .iter()
            .map(|e| e.features.to_array()[idx])
            .collect();
        table
            .push_column(*name, ColumnData::Numeric(values))
            .map_err(|err| err.to_string())?;
    }
    Ok(table)
}

#[derive(Debug, Clone)]
struct CliOptions {
    files: Vec<PathBuf>,
    manifest: Option<PathBuf>,
    out: Option<PathBuf>,
    f0_min: f64,
    f0_max: f64,
    unit: PitchUnit,
    workers: usize,
}

fn parse_args(args: Vec<String>, settings: &Settings) -> Result<CliOptions, String> {
    let mut options = CliOptions {
        files: Vec::new(),
        manifest: None,
        out: None,
        f0_min: settings.extraction.f0_min_hz,
        f0_max: settings.extraction.f0_max_hz,
        unit: settings.extraction.pitch_unit,
        workers: settings.extraction.worker_count as usize,
    };
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--manifest" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--manifest requires a value".to_string())?;
                options.manifest = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                options.out = Some(PathBuf::from(value));
            }
            "--f0-min" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--f0-min requires a value".to_string())?;
                options.f0_min = value
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid --f0-min value: {value}"))?;
            }
            "--f0-max" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--f0-max requires a value".to_string())?;
                options.f0_max = value
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid --f0-max value: {value}"))?;
            }
            "--unit" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--unit requires a value".to_string())?;
                options.unit = value.parse::<PitchUnit>()?;
            }
            "--workers" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--workers requires a value".to_string())?;
                options.workers = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --workers value: {value}"))?;
            }
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown argument: {flag}\n\n{}", help_text()));
            }
            file => options.files.push(PathBuf::from(file)),
        }
        idx += 1;
    }
    if options.manifest.is_some() && !options.files.is_empty() {
        return Err("Pass either audio files or --manifest, not both".to_string());
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "voicescreen-extract",
        "",
        "Measures pitch, intensity, HNR, jitter and shimmer for each recording.",
        "",
        "Usage:",
        "  voicescreen-extract [options] <audio>...",
        "  voicescreen-extract [options] --manifest <csv>",
        "",
        "Options:",
        "  --manifest <csv>   CSV with ID, Path and optional Diagnosis (0/1) columns.",
        "  --out <csv>        Output path (default: stdout).",
        "  --f0-min <hz>      Pitch floor (default from config: 75).",
        "  --f0-max <hz>      Pitch ceiling (default from config: 300).",
        "  --unit <name>      Pitch unit, e.g. Hertz, mel, \"semitones re 100 Hz\", ERB.",
        "  --workers <n>      Extraction threads (0 = one per core).",
    ]
    .join("\n")
}
