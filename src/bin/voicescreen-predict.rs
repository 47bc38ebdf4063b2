//! Low-confidence diabetes likelihood for a single voice recording.

use std::path::PathBuf;

use voicescreen::analysis::{PitchRange, PitchUnit, Recording, extract_with_status};
use voicescreen::config::{self, Settings};
use voicescreen::logging;
use voicescreen::ml::{Likelihood, ModelKind, predict_single};

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
    let extraction = extract_with_status(&Recording::from_file(&options.audio, range, options.unit));
    let prediction = predict_single(&extraction.features, options.model, options.threshold)
        .map_err(|err| err.to_string())?;

    eprintln!(
        "warning: trained on a single duplicated sample; this is not a cross-validated estimate"
    );
    if prediction.features_missing {
        eprintln!("warning: the recording could not be analysed; features were all zero");
    }
    if options.json {
        let json = serde_json::to_string_pretty(&prediction).map_err(|err| err.to_string())?;
        println!("{json}");
    } else {
        let verdict = match prediction.likelihood {
            Likelihood::High => "high",
            Likelihood::Low => "low",
        };
        println!(
            "likelihood of type 2 diabetes: {verdict} (p={:.3}, threshold {:.2}, model {})",
            prediction.probability, options.threshold, options.model
        );
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    audio: PathBuf,
    model: ModelKind,
    threshold: f64,
    f0_min: f64,
    f0_max: f64,
    unit: PitchUnit,
    json: bool,
}

fn parse_args(args: Vec<String>, settings: &Settings) -> Result<CliOptions, String> {
    let mut audio: Option<PathBuf> = None;
    let mut model = settings
        .classification
        .model_kind()
        .map_err(|err| format!("Invalid config: {err}"))?;
    let mut threshold = settings.classification.decision_threshold;
    let mut f0_min = settings.extraction.f0_min_hz;
    let mut f0_max = settings.extraction.f0_max_hz;
    let mut unit = settings.extraction.pitch_unit;
    let mut json = false;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--json" => json = true,
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                model = value.parse::<ModelKind>().map_err(|err| err.to_string())?;
            }
            "--threshold" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--threshold requires a value".to_string())?;
                threshold = value
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid --threshold value: {value}"))?;
            }
            "--f0-min" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--f0-min requires a value".to_string())?;
                f0_min = value
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid --f0-min value: {value}"))?;
            }
            "--f0-max" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--f0-max requires a value".to_string())?;
                f0_max = value
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid --f0-max value: {value}"))?;
            }
            "--unit" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--unit requires a value".to_string())?;
                unit = value.parse::<PitchUnit>()?;
            }
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown argument: {flag}\n\n{}", help_text()));
            }
            file => {
                if audio.replace(PathBuf::from(file)).is_some() {
                    return Err("Only one recording can be predicted at a time".to_string());
                }
            }
        }
        idx += 1;
    }

    let audio = audio.ok_or_else(|| format!("A recording is required\n\n{}", help_text()))?;
    Ok(CliOptions {
        audio,
        model,
        threshold,
        f0_min,
        f0_max,
        unit,
        json,
    })
}

fn help_text() -> String {
    [
        "voicescreen-predict",
        "",
        "Scores one recording with a model fitted on that recording alone. The result is",
        "low-confidence and not comparable to cross-validated probabilities.",
        "",
        "Usage:",
        "  voicescreen-predict [options] <audio>",
        "",
        "Options:",
        "  --model <nb|lr|svm>   Classifier (default from config: svm).",
        "  --threshold <p>       High/low cut-off (default from config: 0.5).",
        "  --f0-min <hz>         Pitch floor (default from config: 75).",
        "  --f0-max <hz>         Pitch ceiling (default from config: 300).",
        "  --unit <name>         Pitch unit (default from config: Hertz).",
        "  --json                Print the prediction as JSON.",
    ]
    .join("\n")
}
