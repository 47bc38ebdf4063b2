mod support;

use rand::{Rng, SeedableRng, rngs::StdRng};
use support::voicescreen_env::VoicescreenEnvGuard;
use tempfile::tempdir;
use voicescreen::analysis::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector};
use voicescreen::config;
use voicescreen::dataset::{
    CohortRecord, CohortTable, ColumnData, Diagnosis, ID_COLUMN, fold_column_name,
};
use voicescreen::ml::metrics::summarize;
use voicescreen::ml::{
    ClassificationError, CrossValOptions, FoldSplit, Likelihood, ModelKind, PredictionValidity,
    evaluate_fold, cross_validate, predict_single,
};

/// `per_class` subjects of each diagnosis with 14 synthetic features; diabetic rows are shifted.
fn synthetic_cohort(per_class: usize, seed: u64) -> CohortTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let records: Vec<CohortRecord> = (0..2 * per_class)
        .map(|idx| {
            let diagnosis = if idx < per_class {
                Diagnosis::NonDiabetic
            } else {
                Diagnosis::Diabetic
            };
            let shift = if diagnosis == Diagnosis::Diabetic { 1.5 } else { 0.0 };
            let mut values = [0.0; FEATURE_COUNT];
            for value in values.iter_mut() {
                *value = shift + rng.random_range(-1.0..1.0);
            }
            CohortRecord {
                id: format!("subject-{idx:02}"),
                diagnosis,
                features: FeatureVector::from_array(values),
            }
        })
        .collect();
    CohortTable::from_records(&records)
}

fn options(num_folds: usize, model: ModelKind, seed: u64) -> CrossValOptions {
    CrossValOptions {
        num_folds,
        model,
        seed: Some(seed),
    }
}

#[test]
fn naive_bayes_five_fold_populates_each_row_once() {
    let cohort = synthetic_cohort(10, 1);
    let table = cross_validate(&cohort, &FEATURE_NAMES, &options(5, ModelKind::NaiveBayes, 3))
        .unwrap();

    assert_eq!(table.row_count(), 20);
    assert_eq!(table.fold_count(), 5);
    assert_eq!(
        table.column_names(),
        ["ID", "Diagnosis"]
            .into_iter()
            .map(str::to_string)
            .chain((0..5).map(fold_column_name))
            .collect::<Vec<_>>()
    );
    for row in 0..table.row_count() {
        let populated: Vec<f64> = (0..5).filter_map(|fold| table.probability(row, fold)).collect();
        assert_eq!(populated.len(), 1, "row {row}");
        assert!((0.0..=1.0).contains(&populated[0]));
    }
    // each fold holds out two subjects of each diagnosis
    for fold in 0..5 {
        let held: Vec<Diagnosis> = (0..20)
            .filter(|&row| table.probability(row, fold).is_some())
            .map(|row| table.diagnoses()[row])
            .collect();
        assert_eq!(held.iter().filter(|d| **d == Diagnosis::Diabetic).count(), 2);
        assert_eq!(held.len(), 4);
    }
}

#[test]
fn every_model_separates_shifted_classes() {
    let cohort = synthetic_cohort(12, 2);
    for model in ModelKind::ALL {
        let table = cross_validate(&cohort, &FEATURE_NAMES, &options(4, model, 5)).unwrap();
        let summary = summarize(&table, 0.5);
        assert_eq!(summary.folds.len(), 4);
        assert!(summary.accuracy.mean > 0.7, "{model}: {:?}", summary.accuracy);
    }
}

#[test]
fn uneven_strata_split_with_sizes_differing_by_one() {
    let mut records = Vec::new();
    for idx in 0..13 {
        records.push(CohortRecord {
            id: format!("h{idx}"),
            diagnosis: Diagnosis::NonDiabetic,
            features: FeatureVector::from_array([idx as f64; FEATURE_COUNT]),
        });
    }
    for idx in 0..7 {
        records.push(CohortRecord {
            id: format!("d{idx}"),
            diagnosis: Diagnosis::Diabetic,
            features: FeatureVector::from_array([20.0 + idx as f64; FEATURE_COUNT]),
        });
    }
    let cohort = CohortTable::from_records(&records);
    let table =
        cross_validate(&cohort, &["meanF0", "HNR"], &options(3, ModelKind::LogisticRegression, 8))
            .unwrap();
    let mut sizes: Vec<usize> = (0..3)
        .map(|fold| {
            (0..table.row_count())
                .filter(|&row| table.probability(row, fold).is_some())
                .count()
        })
        .collect();
    sizes.sort_unstable();
    assert_eq!(sizes.iter().sum::<usize>(), 20);
    assert!(sizes[2] - sizes[0] <= 2);
}

#[test]
fn fold_count_above_smaller_stratum_is_rejected() {
    let cohort = synthetic_cohort(4, 3);
    assert_eq!(
        cross_validate(&cohort, &FEATURE_NAMES, &options(5, ModelKind::Svm, 0)),
        Err(ClassificationError::InvalidFoldCount { folds: 5, max: 4 })
    );
}

#[test]
fn repeated_subject_rows_are_held_out_together() {
    let mut rng = StdRng::seed_from_u64(12);
    let subjects = [
        ("a", Diagnosis::NonDiabetic),
        ("a", Diagnosis::NonDiabetic),
        ("b", Diagnosis::NonDiabetic),
        ("b", Diagnosis::NonDiabetic),
        ("c", Diagnosis::NonDiabetic),
        ("d", Diagnosis::Diabetic),
        ("d", Diagnosis::Diabetic),
        ("e", Diagnosis::Diabetic),
        ("f", Diagnosis::Diabetic),
        ("f", Diagnosis::Diabetic),
        ("f", Diagnosis::Diabetic),
    ];
    let records: Vec<CohortRecord> = subjects
        .iter()
        .map(|&(id, diagnosis)| {
            let shift = if diagnosis == Diagnosis::Diabetic { 2.0 } else { 0.0 };
            let mut values = [0.0; FEATURE_COUNT];
            for value in values.iter_mut() {
                *value = shift + rng.random_range(-1.0..1.0);
            }
            CohortRecord {
                id: id.to_string(),
                diagnosis,
                features: FeatureVector::from_array(values),
            }
        })
        .collect();
    let cohort = CohortTable::from_records(&records);

    let table =
        cross_validate(&cohort, &FEATURE_NAMES, &options(3, ModelKind::LogisticRegression, 4))
            .unwrap();
    assert_eq!(table.row_count(), subjects.len());
    for (id, _) in subjects {
        let folds: Vec<usize> = (0..table.row_count())
            .filter(|&row| table.ids()[row] == id)
            .map(|row| table.held_out(row).unwrap().0)
            .collect();
        assert!(folds.windows(2).all(|pair| pair[0] == pair[1]), "{id}: {folds:?}");
    }

    // three distinct subjects per diagnosis, whatever the row count
    assert_eq!(
        cross_validate(&cohort, &FEATURE_NAMES, &options(4, ModelKind::NaiveBayes, 4)),
        Err(ClassificationError::InvalidFoldCount { folds: 4, max: 3 })
    );
}

#[test]
fn missing_diagnosis_is_a_schema_error() {
    let cohort = CohortTable::new()
        .with_column(
            ID_COLUMN,
            ColumnData::Text(vec!["a".into(), "b".into(), "c".into(), "d".into()]),
        )
        .unwrap()
        .with_column("meanF0", ColumnData::Numeric(vec![100.0, 120.0, 180.0, 200.0]))
        .unwrap();
    assert!(matches!(
        cross_validate(&cohort, &["meanF0"], &options(2, ModelKind::NaiveBayes, 0)),
        Err(ClassificationError::Schema(_))
    ));
    let split = FoldSplit {
        train_non_diabetic: vec!["a".into()],
        train_diabetic: vec!["c".into()],
        test_non_diabetic: vec!["b".into()],
        test_diabetic: vec!["d".into()],
    };
    assert!(matches!(
        evaluate_fold(&cohort, &["meanF0"], &split, 0, ModelKind::NaiveBayes),
        Err(ClassificationError::Schema(_))
    ));
}

#[test]
fn empty_test_split_is_insufficient_data() {
    let cohort = synthetic_cohort(3, 4);
    let split = FoldSplit {
        train_non_diabetic: vec!["subject-00".into()],
        train_diabetic: vec!["subject-03".into()],
        ..FoldSplit::default()
    };
    assert!(matches!(
        evaluate_fold(&cohort, &FEATURE_NAMES, &split, 0, ModelKind::LogisticRegression),
        Err(ClassificationError::InsufficientData(_))
    ));
}

#[test]
fn identical_split_and_seed_give_identical_probabilities() {
    let cohort = synthetic_cohort(6, 6);
    let split = FoldSplit {
        train_non_diabetic: vec!["subject-00".into(), "subject-01".into(), "subject-02".into()],
        train_diabetic: vec!["subject-06".into(), "subject-07".into(), "subject-08".into()],
        test_non_diabetic: vec!["subject-03".into()],
        test_diabetic: vec!["subject-09".into()],
    };
    for model in ModelKind::ALL {
        let first = evaluate_fold(&cohort, &FEATURE_NAMES, &split, 0, model).unwrap();
        let second = evaluate_fold(&cohort, &FEATURE_NAMES, &split, 0, model).unwrap();
        assert_eq!(first, second, "{model}");
        assert_eq!(first.predictions.len(), 2);
    }
    let a = cross_validate(&cohort, &FEATURE_NAMES, &options(3, ModelKind::Svm, 11)).unwrap();
    let b = cross_validate(&cohort, &FEATURE_NAMES, &options(3, ModelKind::Svm, 11)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn result_table_csv_round_trips_through_the_cohort_reader() {
    let cohort = synthetic_cohort(5, 7);
    let table = cross_validate(&cohort, &FEATURE_NAMES, &options(5, ModelKind::NaiveBayes, 1))
        .unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("results.csv");
    table.write_csv(&path).unwrap();

    let reread = CohortTable::read_csv(&path).unwrap();
    assert_eq!(reread.row_count(), 10);
    // fold columns have empty cells, so they stay textual
    assert!(matches!(
        reread.column(&fold_column_name(0)),
        Some(ColumnData::Text(_))
    ));
}

#[test]
fn single_sample_prediction_is_flagged_low_confidence() {
    let features = FeatureVector::from_array([
        150.0, 18.0, 68.0, 6.0, 15.0, 0.008, 5e-5, 0.004, 0.005, 0.04, 0.35, 0.02, 0.025, 0.03,
    ]);
    let prediction = predict_single(&features, ModelKind::LogisticRegression, 0.5).unwrap();
    assert_eq!(prediction.validity, PredictionValidity::SingleSampleDegenerate);
    assert!(!prediction.features_missing);
    assert!((prediction.probability - 0.5).abs() < 1e-6);
    assert_eq!(prediction.likelihood, Likelihood::Low);

    let failed = predict_single(&FeatureVector::zeroed(), ModelKind::Svm, 0.5).unwrap();
    assert!(failed.features_missing);
}

#[test]
fn settings_are_read_from_the_config_home() {
    let dir = tempdir().unwrap();
    let _guard = VoicescreenEnvGuard::set_config_home(dir.path().to_path_buf());
    let path = config::config_path().unwrap();
    assert!(path.starts_with(dir.path()));
    std::fs::write(
        &path,
        "[classification]\nmodel = \"nb\"\nnum_folds = 3\nseed = 17\n",
    )
    .unwrap();

    let settings = config::load_or_default().unwrap();
    let options = settings.classification.cross_val_options().unwrap();
    assert_eq!(options.model, ModelKind::NaiveBayes);
    assert_eq!(options.num_folds, 3);
    assert_eq!(options.seed, Some(17));
}
