//! Record Store boundary
//!
//! Patients, appointments and visits live in the hospital system. The
//! pipeline only sees plain `Record`s built from them and hands
//! `PredictionResult`s back for attachment.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::logic::dataset::generator::bmi;
use crate::logic::error::{FeatureEncodingError, PredictionError};
use crate::logic::features::Record;
use crate::logic::model::inference::{PredictionResult, PredictionService};

/// What the pipeline needs from the hospital record store
pub trait RecordStore: Send + Sync {
    /// Missed appointments on file for a patient
    fn prior_no_shows(&self, patient_id: &str) -> u32;

    /// Store a prediction against the record it was made for
    fn attach_prediction(&self, subject_id: &str, result: &PredictionResult);
}

/// Store backed by in-process maps (tests, CLI)
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    no_shows: RwLock<HashMap<String, u32>>,
    predictions: RwLock<HashMap<String, Vec<PredictionResult>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_no_show(&self, patient_id: &str) {
        *self.no_shows.write().entry(patient_id.to_string()).or_default() += 1;
    }

    pub fn predictions_for(&self, subject_id: &str) -> Vec<PredictionResult> {
        self.predictions.read().get(subject_id).cloned().unwrap_or_default()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn prior_no_shows(&self, patient_id: &str) -> u32 {
        self.no_shows.read().get(patient_id).copied().unwrap_or(0)
    }

    fn attach_prediction(&self, subject_id: &str, result: &PredictionResult) {
        self.predictions
            .write()
            .entry(subject_id.to_string())
            .or_default()
            .push(result.clone());
    }
}

// ============================================================================
// RECORD BUILDERS
// ============================================================================

/// Parse a `"systolic/diastolic"` reading such as `"120/80"`
pub fn parse_blood_pressure(reading: &str) -> Result<(u32, u32), FeatureEncodingError> {
    let invalid = || FeatureEncodingError::NotNumeric {
        feature: "blood_pressure".to_string(),
        value: reading.to_string(),
    };

    let (sys, dia) = reading.trim().split_once('/').ok_or_else(invalid)?;
    let sys = sys.trim().parse().map_err(|_| invalid())?;
    let dia = dia.trim().parse().map_err(|_| invalid())?;
    Ok((sys, dia))
}

/// Vitals and symptoms captured at a visit (disease and risk input)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitVitals {
    pub patient_id: String,
    pub age: u32,
    /// "M" or "F"
    pub gender: String,
    /// Reading as entered, e.g. "120/80"
    pub blood_pressure: Option<String>,
    pub glucose: Option<f64>,
    pub heart_rate: Option<u32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub pregnant: bool,
    /// Symptom names present at the visit (e.g. "fever")
    pub symptoms: Vec<String>,
}

impl VisitVitals {
    /// Flatten into a record usable by the disease and risk schemas.
    ///
    /// Absent vitals are left out so the schema decides between default
    /// and missing-feature failure.
    pub fn to_record(&self) -> Result<Record, FeatureEncodingError> {
        let mut record = Record::new()
            .with("patient_id", self.patient_id.as_str())
            .with("age", self.age)
            .with("gender", self.gender.as_str())
            .with("pregnancy", self.pregnant);

        if let Some(reading) = &self.blood_pressure {
            let (sys, dia) = parse_blood_pressure(reading)?;
            record.set("blood_pressure_systolic", sys);
            record.set("blood_pressure_diastolic", dia);
        }
        if let Some(glucose) = self.glucose {
            // Disease and risk schemas name the same reading differently
            record.set("glucose", glucose);
            record.set("glucose_level", glucose);
        }
        if let Some(hr) = self.heart_rate {
            record.set("heart_rate", hr);
        }
        if let Some(weight) = self.weight_kg {
            record.set("weight", weight);
        }
        if let (Some(weight), Some(height)) = (self.weight_kg, self.height_cm) {
            if height > 0.0 {
                record.set("height", height);
                record.set("bmi", bmi(weight, height));
            }
        }
        for symptom in &self.symptoms {
            record.set(&symptom.trim().to_lowercase().replace(' ', "_"), 1u8);
        }

        Ok(record)
    }
}

/// Upcoming appointment (no-show input)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentInfo {
    pub appointment_id: String,
    pub patient_id: String,
    pub distance_km: f64,
    pub weather: Option<String>,
    pub sms_sent: bool,
}

impl AppointmentInfo {
    /// Record with the prior no-show count looked up in `store`
    pub fn to_record(&self, store: &dyn RecordStore) -> Record {
        let mut record = Record::new()
            .with("appointment_id", self.appointment_id.as_str())
            .with("patient_id", self.patient_id.as_str())
            .with("distance_from_hospital", self.distance_km)
            .with("previous_no_shows", store.prior_no_shows(&self.patient_id))
            .with("sms_sent", self.sms_sent);

        if let Some(weather) = &self.weather {
            record.set("weather_condition", weather.as_str());
        }
        record
    }
}

/// Predict and attach the result to the subject's record
pub fn predict_and_attach(
    service: &PredictionService,
    store: &dyn RecordStore,
    task_name: &str,
    subject_id: &str,
    record: &Record,
) -> Result<PredictionResult, PredictionError> {
    let result = service.predict(task_name, subject_id, record)?;
    store.attach_prediction(subject_id, &result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::{encode, schema_for, TaskKind};

    #[test]
    fn test_parse_blood_pressure() {
        assert_eq!(parse_blood_pressure("120/80").unwrap(), (120, 80));
        assert_eq!(parse_blood_pressure(" 145 / 95 ").unwrap(), (145, 95));
        assert!(parse_blood_pressure("120").is_err());
        assert!(parse_blood_pressure("high/80").is_err());
    }

    #[test]
    fn test_vitals_encode_for_disease_and_risk() {
        let vitals = VisitVitals {
            patient_id: "PAT-000001".to_string(),
            age: 52,
            gender: "F".to_string(),
            blood_pressure: Some("150/95".to_string()),
            glucose: Some(160.0),
            heart_rate: Some(88),
            weight_kg: Some(80.0),
            height_cm: Some(160.0),
            pregnant: false,
            symptoms: vec!["Fever".to_string(), "joint pain".to_string()],
        };
        let record = vitals.to_record().unwrap();

        let disease = schema_for(TaskKind::Disease);
        let v = encode(disease, &record).unwrap();
        assert_eq!(v.get_by_name(disease, "fever"), Some(1.0));
        assert_eq!(v.get_by_name(disease, "joint_pain"), Some(1.0));
        assert_eq!(v.get_by_name(disease, "cough"), Some(0.0));
        assert_eq!(v.get_by_name(disease, "gender"), Some(0.0));
        assert_eq!(v.get_by_name(disease, "glucose_level"), Some(160.0));

        let risk = schema_for(TaskKind::Risk);
        let v = encode(risk, &record).unwrap();
        assert_eq!(v.get_by_name(risk, "blood_pressure_systolic"), Some(150.0));
        assert_eq!(v.get_by_name(risk, "pregnancy"), Some(0.0));
        assert!((v.get_by_name(risk, "bmi").unwrap() - 31.25).abs() < 1e-9);
    }

    #[test]
    fn test_vitals_without_height_use_default_bmi() {
        let vitals = VisitVitals {
            age: 30,
            gender: "M".to_string(),
            blood_pressure: Some("120/80".to_string()),
            glucose: Some(90.0),
            heart_rate: Some(70),
            weight_kg: Some(70.0),
            ..Default::default()
        };
        let risk = schema_for(TaskKind::Risk);
        let v = encode(risk, &vitals.to_record().unwrap()).unwrap();
        assert_eq!(v.get_by_name(risk, "bmi"), Some(25.0));
    }

    #[test]
    fn test_bad_reading_fails() {
        let vitals = VisitVitals {
            blood_pressure: Some("n/a".to_string()),
            ..Default::default()
        };
        assert!(vitals.to_record().is_err());
    }

    #[test]
    fn test_appointment_uses_store_history() {
        let store = InMemoryRecordStore::new();
        store.record_no_show("PAT-7");
        store.record_no_show("PAT-7");

        let appointment = AppointmentInfo {
            appointment_id: "APT-1".to_string(),
            patient_id: "PAT-7".to_string(),
            distance_km: 25.0,
            weather: Some("Rainy".to_string()),
            sms_sent: false,
        };
        let schema = schema_for(TaskKind::NoShow);
        let v = encode(schema, &appointment.to_record(&store)).unwrap();
        assert_eq!(v.values, vec![25.0, 2.0, 0.0, 1.0]);

        let unknown = AppointmentInfo {
            patient_id: "PAT-8".to_string(),
            weather: None,
            ..appointment
        };
        let v = encode(schema, &unknown.to_record(&store)).unwrap();
        assert_eq!(v.values, vec![25.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_prediction_attached_to_subject() {
        use std::collections::BTreeMap;

        use crate::logic::artifacts::{ArtifactStore, TrainedArtifactSet};
        use crate::logic::model::logistic::{LogisticParams, LogisticRegression};
        use crate::logic::model::{Estimator, LabelEncoder};
        use crate::logic::training::{TaskMetrics, TrainingReport};

        let schema = schema_for(TaskKind::NoShow);
        let mut fitted_encoders = BTreeMap::new();
        fitted_encoders.insert(
            "weather_condition".to_string(),
            LabelEncoder::fit(["cloudy", "rainy", "sunny"]),
        );
        let set = TrainedArtifactSet {
            task: TaskKind::NoShow,
            schema_version: schema.version,
            layout_hash: schema.layout_hash(),
            bundle_id: uuid::Uuid::new_v4(),
            trained_at: chrono::Utc::now(),
            estimator: Estimator::Logistic(LogisticRegression {
                coef: vec![-0.25, -0.5, 1.0, 0.125],
                intercept: 1.5,
                n_iter: 1,
                converged: true,
                params: LogisticParams::default(),
            }),
            fitted_encoders,
            fitted_scaler: None,
            report: TrainingReport {
                task: TaskKind::NoShow,
                schema_version: schema.version,
                dataset_fingerprint: String::new(),
                n_train: 0,
                n_test: 0,
                seed: 42,
                metrics: TaskMetrics::Classification {
                    accuracy: 0.0,
                    per_class: Vec::new(),
                },
                feature_importances: Vec::new(),
                duration_ms: 0,
            },
        };

        let dir = tempfile::tempdir().unwrap();
        let service = PredictionService::new(ArtifactStore::new(dir.path()));
        service.install(set).unwrap();

        let store = InMemoryRecordStore::new();
        store.record_no_show("PAT-3");
        let appointment = AppointmentInfo {
            appointment_id: "APT-9".to_string(),
            patient_id: "PAT-3".to_string(),
            distance_km: 40.0,
            weather: Some("rainy".to_string()),
            sms_sent: false,
        };

        let result =
            predict_and_attach(&service, &store, "noshow", "APT-9", &appointment.to_record(&store)).unwrap();
        let attached = store.predictions_for("APT-9");
        assert_eq!(attached, vec![result]);
        assert!(store.predictions_for("APT-10").is_empty());

        // Failed predictions attach nothing
        assert!(predict_and_attach(&service, &store, "risk", "APT-9", &Record::new()).is_err());
        assert_eq!(store.predictions_for("APT-9").len(), 1);
    }
}
