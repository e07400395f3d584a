use serde::{Deserialize, Serialize};

use crate::logic::features::{Record, TaskKind};

/// Generated row for one task: raw attributes plus ground-truth label.
///
/// `to_record` exposes the attributes under the same names the record
/// store uses, so training rows are encoded exactly like live input.
pub trait SyntheticRecord: Serialize + for<'de> Deserialize<'de> {
    const TASK: TaskKind;

    fn to_record(&self) -> Record;
}

// ============================================================================
// DISEASE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRow {
    pub age: u32,
    pub gender: String,
    pub region: String,
    pub woreda: String,
    pub fever: u8,
    pub headache: u8,
    pub fatigue: u8,
    pub cough: u8,
    pub vomiting: u8,
    pub diarrhea: u8,
    pub joint_pain: u8,
    pub rash: u8,
    pub malaria_test: String,
    pub rdt_result: String,
    pub blood_pressure_systolic: u32,
    pub blood_pressure_diastolic: u32,
    pub glucose_level: u32,
    pub diagnosis: String,
}

impl SyntheticRecord for DiseaseRow {
    const TASK: TaskKind = TaskKind::Disease;

    fn to_record(&self) -> Record {
        Record::new()
            .with("age", self.age)
            .with("gender", self.gender.as_str())
            .with("region", self.region.as_str())
            .with("woreda", self.woreda.as_str())
            .with("fever", self.fever)
            .with("headache", self.headache)
            .with("fatigue", self.fatigue)
            .with("cough", self.cough)
            .with("vomiting", self.vomiting)
            .with("diarrhea", self.diarrhea)
            .with("joint_pain", self.joint_pain)
            .with("rash", self.rash)
            .with("malaria_test", self.malaria_test.as_str())
            .with("rdt_result", self.rdt_result.as_str())
            .with("blood_pressure_systolic", self.blood_pressure_systolic)
            .with("blood_pressure_diastolic", self.blood_pressure_diastolic)
            .with("glucose_level", self.glucose_level)
    }
}

// ============================================================================
// RISK
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRow {
    pub age: u32,
    pub pregnancy: u8,
    pub glucose: u32,
    pub blood_pressure_systolic: u32,
    pub blood_pressure_diastolic: u32,
    pub heart_rate: u32,
    pub weight: u32,
    pub height: u32,
    pub bmi: f64,
    pub risk_score: f64,
}

impl SyntheticRecord for RiskRow {
    const TASK: TaskKind = TaskKind::Risk;

    fn to_record(&self) -> Record {
        Record::new()
            .with("age", self.age)
            .with("pregnancy", self.pregnancy)
            .with("glucose", self.glucose)
            .with("blood_pressure_systolic", self.blood_pressure_systolic)
            .with("blood_pressure_diastolic", self.blood_pressure_diastolic)
            .with("heart_rate", self.heart_rate)
            .with("weight", self.weight)
            .with("height", self.height)
            .with("bmi", self.bmi)
    }
}

// ============================================================================
// NO-SHOW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoShowRow {
    pub patient_id: String,
    pub appointment_date: String,
    pub distance_from_hospital: f64,
    pub weather_condition: String,
    pub previous_no_shows: u32,
    pub sms_sent: u8,
    /// 1 = attended, 0 = no-show
    pub did_come: u8,
}

impl SyntheticRecord for NoShowRow {
    const TASK: TaskKind = TaskKind::NoShow;

    fn to_record(&self) -> Record {
        Record::new()
            .with("patient_id", self.patient_id.as_str())
            .with("appointment_date", self.appointment_date.as_str())
            .with("distance_from_hospital", self.distance_from_hospital)
            .with("weather_condition", self.weather_condition.as_str())
            .with("previous_no_shows", self.previous_no_shows)
            .with("sms_sent", self.sms_sent)
    }
}
