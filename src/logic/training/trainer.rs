//! Model Trainer - dataset in, validated artifact bundle out
//!
//! Every task follows the same path: read CSV rows, encode them through
//! the feature schema, split, fit, evaluate on the held-out rows, and
//! persist one bundle. A task that fails anywhere writes nothing.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use ndarray::{Array2, Axis};
use uuid::Uuid;

use super::metrics::{
    accuracy, classification_report, mean_absolute_error, mean_squared_error, r2_score, tier_distribution,
    TaskMetrics, TrainingReport,
};
use super::split::{stratified_split, train_test_split};
use crate::constants::{FOREST_N_ESTIMATORS, TEST_RATIO, TRAIN_SEED};
use crate::logic::artifacts::{check_encoder, ArtifactStore, TrainedArtifactSet};
use crate::logic::config::PipelineConfig;
use crate::logic::dataset::{
    dataset_fingerprint, dataset_path, read_dataset, rule_risk_score, DiseaseRow, NoShowRow, RiskFactors,
    RiskRow, SyntheticRecord,
};
use crate::logic::error::{ArtifactError, TrainingError};
use crate::logic::features::{encode, schema_for, FeatureSchema, FieldValue, TaskKind};
use crate::logic::model::encoder::LabelEncoder;
use crate::logic::model::estimator::Estimator;
use crate::logic::model::forest::{balanced_class_weights, ForestParams, RandomForestClassifier, RandomForestRegressor};
use crate::logic::model::logistic::{LogisticParams, LogisticRegression};
use crate::logic::model::scaler::StandardScaler;

/// Class names reported for the no-show task, by `did_come` value
pub const NOSHOW_CLASS_NAMES: [&str; 2] = ["No Show", "Showed Up"];

#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub dataset_dir: PathBuf,
    pub artifact_dir: PathBuf,
    /// Split and estimator seed
    pub seed: u64,
    pub test_ratio: f64,
    pub n_estimators: usize,
}

impl TrainerConfig {
    pub fn new(dataset_dir: impl Into<PathBuf>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset_dir: dataset_dir.into(),
            artifact_dir: artifact_dir.into(),
            seed: TRAIN_SEED,
            test_ratio: TEST_RATIO,
            n_estimators: FOREST_N_ESTIMATORS,
        }
    }

    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        Self::new(&config.dataset_dir, &config.artifact_dir)
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        if let Some(seed) = seed {
            self.seed = seed;
        }
        self
    }

    pub fn with_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }
}

// ============================================================================
// ASSEMBLY
// ============================================================================

/// Encode every row through the schema into a feature matrix
pub fn assemble<R: SyntheticRecord>(schema: &FeatureSchema, rows: &[R]) -> Result<Array2<f64>, TrainingError> {
    if R::TASK != schema.task {
        return Err(TrainingError::Fit {
            task: schema.task.to_string(),
            reason: format!("rows were generated for the {} task", R::TASK),
        });
    }

    let n_features = schema.feature_count();
    let mut data = Vec::with_capacity(rows.len() * n_features);

    for (i, row) in rows.iter().enumerate() {
        let vector = encode(schema, &row.to_record()).map_err(|source| TrainingError::Encoding {
            task: schema.task.to_string(),
            row: i,
            source,
        })?;
        data.extend_from_slice(vector.as_slice());
    }

    Array2::from_shape_vec((rows.len(), n_features), data).map_err(|e| TrainingError::Fit {
        task: schema.task.to_string(),
        reason: e.to_string(),
    })
}

/// Build the persisted encoder of every categorical feature.
///
/// Codes come from the schema's table, so a dataset that never contains
/// some category still trains. Every observed category must be known to
/// the schema.
pub fn fit_categorical_encoders<R: SyntheticRecord>(
    schema: &FeatureSchema,
    rows: &[R],
) -> Result<BTreeMap<String, LabelEncoder>, TrainingError> {
    let mut encoders = BTreeMap::new();
    if schema.categorical_encodings.is_empty() {
        return Ok(encoders);
    }

    let records: Vec<_> = rows.iter().map(R::to_record).collect();
    for (feature, codes) in &schema.categorical_encodings {
        let unknown = records.iter().find_map(|r| match r.get(feature) {
            Some(FieldValue::Text(s)) => {
                let value = s.trim();
                let known = value.is_empty() || codes.keys().any(|c| c.eq_ignore_ascii_case(value));
                (!known).then(|| value.to_string())
            }
            _ => None,
        });
        if let Some(value) = unknown {
            return Err(ArtifactError::EncoderMismatch {
                feature: feature.clone(),
                reason: format!("category '{}' is not in the schema", value),
            }
            .into());
        }

        let encoder = LabelEncoder::fit(codes.keys());
        check_encoder(feature, &encoder, codes)?;
        encoders.insert(feature.clone(), encoder);
    }

    Ok(encoders)
}

fn fit_error(task: TaskKind) -> impl Fn(String) -> TrainingError {
    move |reason| TrainingError::Fit {
        task: task.to_string(),
        reason,
    }
}

fn select(x: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    x.select(Axis(0), indices)
}

fn importances(schema: &FeatureSchema, values: &[f64]) -> Vec<(String, f64)> {
    schema.ordered_feature_names.iter().cloned().zip(values.iter().copied()).collect()
}

fn rows_of(x: &Array2<f64>) -> impl Iterator<Item = Vec<f64>> + '_ {
    x.axis_iter(Axis(0)).map(|row| row.to_vec())
}

fn bundle(
    schema: &FeatureSchema,
    estimator: Estimator,
    fitted_encoders: BTreeMap<String, LabelEncoder>,
    fitted_scaler: Option<StandardScaler>,
    report: TrainingReport,
) -> TrainedArtifactSet {
    TrainedArtifactSet {
        task: schema.task,
        schema_version: schema.version,
        layout_hash: schema.layout_hash(),
        bundle_id: Uuid::new_v4(),
        trained_at: Utc::now(),
        estimator,
        fitted_encoders,
        fitted_scaler,
        report,
    }
}

// ============================================================================
// PER-TASK FITTING
// ============================================================================

/// Random forest over symptoms and vitals, balanced class weights
pub fn fit_disease(rows: &[DiseaseRow], fingerprint: &str, config: &TrainerConfig) -> Result<TrainedArtifactSet, TrainingError> {
    let start = Instant::now();
    let schema = schema_for(TaskKind::Disease);
    let fail = fit_error(schema.task);

    let x = assemble(schema, rows)?;
    let mut encoders = fit_categorical_encoders(schema, rows)?;

    let label_encoder = LabelEncoder::fit(rows.iter().map(|r| r.diagnosis.as_str()));
    let labels = rows
        .iter()
        .map(|r| label_encoder.transform(&r.diagnosis))
        .collect::<Option<Vec<usize>>>()
        .ok_or_else(|| fail("diagnosis outside fitted classes".to_string()))?;
    if label_encoder.n_classes() < 2 {
        return Err(fail("need at least two diagnoses".to_string()));
    }

    let split = stratified_split(&labels, config.test_ratio, config.seed);
    let x_train = select(&x, &split.train);
    let x_test = select(&x, &split.test);
    let y_train: Vec<usize> = split.train.iter().map(|&i| labels[i]).collect();
    let y_test: Vec<usize> = split.test.iter().map(|&i| labels[i]).collect();

    log::info!(
        "Training disease model: {} train / {} test rows, {} classes",
        y_train.len(),
        y_test.len(),
        label_encoder.n_classes()
    );

    let params = ForestParams::classifier()
        .with_estimators(config.n_estimators)
        .with_seed(config.seed);
    let forest = RandomForestClassifier::fit(x_train.view(), &y_train, label_encoder.n_classes(), params).map_err(&fail)?;

    let predicted: Vec<usize> = rows_of(&x_test).map(|row| forest.predict_row(&row)).collect();
    let metrics = TaskMetrics::Classification {
        accuracy: accuracy(&y_test, &predicted),
        per_class: classification_report(&y_test, &predicted, &label_encoder.classes),
    };

    let report = TrainingReport {
        task: schema.task,
        schema_version: schema.version,
        dataset_fingerprint: fingerprint.to_string(),
        n_train: y_train.len(),
        n_test: y_test.len(),
        seed: config.seed,
        metrics,
        feature_importances: importances(schema, &forest.feature_importances),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    encoders.insert(schema.label_column.clone(), label_encoder);
    Ok(bundle(schema, Estimator::ForestClassifier(forest), encoders, None, report))
}

/// Random forest regressor on standardized vitals
pub fn fit_risk(rows: &[RiskRow], fingerprint: &str, config: &TrainerConfig) -> Result<TrainedArtifactSet, TrainingError> {
    let start = Instant::now();
    let schema = schema_for(TaskKind::Risk);
    let fail = fit_error(schema.task);

    let x = assemble(schema, rows)?;
    let encoders = fit_categorical_encoders(schema, rows)?;
    let y: Vec<f64> = rows.iter().map(|r| r.risk_score).collect();

    let split = train_test_split(rows.len(), config.test_ratio, config.seed);
    if split.train.is_empty() || split.test.is_empty() {
        return Err(fail(format!("{} rows are too few to split", rows.len())));
    }

    // Scaler sees the training split only
    let scaler = StandardScaler::fit(select(&x, &split.train).view());
    let x_train = scaler.transform(select(&x, &split.train).view());
    let x_test = scaler.transform(select(&x, &split.test).view());
    let y_train: Vec<f64> = split.train.iter().map(|&i| y[i]).collect();
    let y_test: Vec<f64> = split.test.iter().map(|&i| y[i]).collect();

    log::info!("Training risk model: {} train / {} test rows", y_train.len(), y_test.len());

    let params = ForestParams::regressor()
        .with_estimators(config.n_estimators)
        .with_seed(config.seed);
    let forest = RandomForestRegressor::fit(x_train.view(), &y_train, params).map_err(&fail)?;

    let predicted: Vec<f64> = rows_of(&x_test).map(|row| forest.predict_row(&row)).collect();
    let rule_scores: Vec<f64> = split
        .test
        .iter()
        .map(|&i| {
            let r = &rows[i];
            rule_risk_score(&RiskFactors {
                age: f64::from(r.age),
                pregnant: r.pregnancy == 1,
                glucose: f64::from(r.glucose),
                bp_systolic: f64::from(r.blood_pressure_systolic),
                bp_diastolic: f64::from(r.blood_pressure_diastolic),
                heart_rate: f64::from(r.heart_rate),
                bmi: r.bmi,
            })
        })
        .collect();

    let metrics = TaskMetrics::Regression {
        mse: mean_squared_error(&y_test, &predicted),
        r2: r2_score(&y_test, &predicted),
        recoverability_mae: mean_absolute_error(&rule_scores, &predicted),
        tier_distribution: tier_distribution(&y_test),
    };

    let report = TrainingReport {
        task: schema.task,
        schema_version: schema.version,
        dataset_fingerprint: fingerprint.to_string(),
        n_train: y_train.len(),
        n_test: y_test.len(),
        seed: config.seed,
        metrics,
        feature_importances: importances(schema, &forest.feature_importances),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    Ok(bundle(schema, Estimator::ForestRegressor(forest), encoders, Some(scaler), report))
}

/// L2 logistic regression on attendance, balanced class weights
pub fn fit_noshow(rows: &[NoShowRow], fingerprint: &str, config: &TrainerConfig) -> Result<TrainedArtifactSet, TrainingError> {
    let start = Instant::now();
    let schema = schema_for(TaskKind::NoShow);
    let fail = fit_error(schema.task);

    let x = assemble(schema, rows)?;
    let encoders = fit_categorical_encoders(schema, rows)?;

    let labels: Vec<usize> = rows.iter().map(|r| usize::from(r.did_come == 1)).collect();
    let split = stratified_split(&labels, config.test_ratio, config.seed);
    let x_train = select(&x, &split.train);
    let x_test = select(&x, &split.test);
    let y_train: Vec<usize> = split.train.iter().map(|&i| labels[i]).collect();
    let y_test: Vec<usize> = split.test.iter().map(|&i| labels[i]).collect();

    if y_train.is_empty() || y_train.iter().all(|&l| l == y_train[0]) {
        return Err(fail("training split has a single class".to_string()));
    }

    let class_weights = balanced_class_weights(&y_train, 2);
    let sample_weights: Vec<f64> = y_train.iter().map(|&l| class_weights[l]).collect();

    log::info!(
        "Training no-show model: {} train / {} test rows, no-show rate {:.1}%",
        y_train.len(),
        y_test.len(),
        100.0 * labels.iter().filter(|&&l| l == 0).count() as f64 / labels.len() as f64
    );

    let model = LogisticRegression::fit(x_train.view(), &y_train, &sample_weights, LogisticParams::default()).map_err(&fail)?;

    let predicted: Vec<usize> = rows_of(&x_test)
        .map(|row| usize::from(model.predict_proba_row(&row) >= 0.5))
        .collect();
    let class_names: Vec<String> = NOSHOW_CLASS_NAMES.iter().map(|s| s.to_string()).collect();
    let metrics = TaskMetrics::Classification {
        accuracy: accuracy(&y_test, &predicted),
        per_class: classification_report(&y_test, &predicted, &class_names),
    };

    let report = TrainingReport {
        task: schema.task,
        schema_version: schema.version,
        dataset_fingerprint: fingerprint.to_string(),
        n_train: y_train.len(),
        n_test: y_test.len(),
        seed: config.seed,
        metrics,
        feature_importances: Vec::new(),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    Ok(bundle(schema, Estimator::Logistic(model), encoders, None, report))
}

// ============================================================================
// BATCH ENTRY POINTS
// ============================================================================

/// Train one task from its dataset file and persist the bundle
pub fn train_task(config: &TrainerConfig, task: TaskKind) -> Result<TrainedArtifactSet, TrainingError> {
    let path = dataset_path(&config.dataset_dir, task);
    log::info!("Loading {} dataset from {}", task, path.display());

    let fingerprint = dataset_fingerprint(&path)?;
    let set = match task {
        TaskKind::Disease => fit_disease(&read_dataset::<DiseaseRow>(&path)?, &fingerprint, config)?,
        TaskKind::Risk => fit_risk(&read_dataset::<RiskRow>(&path)?, &fingerprint, config)?,
        TaskKind::NoShow => fit_noshow(&read_dataset::<NoShowRow>(&path)?, &fingerprint, config)?,
    };

    ArtifactStore::new(&config.artifact_dir).save(&set)?;
    log::info!("{}", set.report.headline());
    Ok(set)
}

/// Train every task in registry order; stops at the first failure
pub fn train_all(config: &TrainerConfig) -> Result<Vec<TrainedArtifactSet>, TrainingError> {
    TaskKind::ALL.iter().map(|task| train_task(config, *task)).collect()
}
