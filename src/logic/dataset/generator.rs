//! Synthetic Data Generator - Parametric labeled datasets
//!
//! Three generators (disease, risk, no-show), each driven by its own
//! seeded `StdRng`. Same seed + same sample count = identical rows.
//!
//! Symptoms are sampled independently per disease; co-occurrence is only
//! what the per-disease probabilities express.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::record::{DiseaseRow, NoShowRow, RiskRow};

// ============================================================================
// DISEASE PATTERNS
// ============================================================================

/// Symptoms emitted for every disease row, in column order
pub const SYMPTOM_COLUMNS: &[&str] = &[
    "fever", "headache", "fatigue", "cough", "vomiting", "diarrhea", "joint_pain", "rash",
];

/// Presence probability for symptoms a pattern doesn't list
const BACKGROUND_SYMPTOM_PROB: f64 = 0.1;

#[derive(Debug, Clone, Copy)]
pub struct DiseasePattern {
    pub name: &'static str,
    pub age_range: (u32, u32),
    pub symptoms: &'static [(&'static str, f64)],
    pub malaria_test: &'static str,
    pub bp_systolic: (u32, u32),
    pub bp_diastolic: (u32, u32),
    pub glucose: (u32, u32),
}

impl DiseasePattern {
    pub fn symptom_probability(&self, symptom: &str) -> f64 {
        self.symptoms
            .iter()
            .find(|(name, _)| *name == symptom)
            .map(|(_, p)| *p)
            .unwrap_or(BACKGROUND_SYMPTOM_PROB)
    }
}

pub const DISEASE_PATTERNS: &[DiseasePattern] = &[
    DiseasePattern {
        name: "Malaria",
        age_range: (15, 50),
        symptoms: &[("fever", 0.95), ("headache", 0.9), ("fatigue", 0.9), ("joint_pain", 0.7), ("vomiting", 0.3)],
        malaria_test: "positive",
        bp_systolic: (110, 130),
        bp_diastolic: (70, 85),
        glucose: (85, 100),
    },
    DiseasePattern {
        name: "Typhoid",
        age_range: (20, 55),
        symptoms: &[
            ("fever", 0.95), ("headache", 0.85), ("fatigue", 0.9),
            ("cough", 0.6), ("vomiting", 0.7), ("diarrhea", 0.6),
        ],
        malaria_test: "negative",
        bp_systolic: (120, 135),
        bp_diastolic: (75, 90),
        glucose: (90, 110),
    },
    DiseasePattern {
        name: "TB",
        age_range: (25, 65),
        symptoms: &[("cough", 0.95), ("fatigue", 0.9), ("fever", 0.7), ("headache", 0.5)],
        malaria_test: "negative",
        bp_systolic: (115, 130),
        bp_diastolic: (70, 85),
        glucose: (85, 105),
    },
    DiseasePattern {
        name: "Pneumonia",
        age_range: (5, 70),
        symptoms: &[("cough", 0.95), ("fever", 0.9), ("fatigue", 0.85), ("headache", 0.6)],
        malaria_test: "negative",
        bp_systolic: (120, 140),
        bp_diastolic: (75, 90),
        glucose: (90, 110),
    },
    DiseasePattern {
        name: "Diabetes",
        age_range: (35, 75),
        symptoms: &[("fatigue", 0.8), ("cough", 0.3), ("headache", 0.4)],
        malaria_test: "negative",
        bp_systolic: (135, 160),
        bp_diastolic: (85, 105),
        glucose: (180, 250),
    },
    DiseasePattern {
        name: "Hypertension",
        age_range: (40, 80),
        symptoms: &[("headache", 0.7), ("fatigue", 0.6)],
        malaria_test: "negative",
        bp_systolic: (150, 190),
        bp_diastolic: (95, 120),
        glucose: (95, 120),
    },
];

/// Regions and their woredas
pub const REGIONS: &[(&str, &[&str])] = &[
    ("Oromia", &["Adama", "Jimma", "Nekemte", "Dire Dawa", "Harar"]),
    ("Amhara", &["Bahir Dar", "Gondar", "Debre Markos", "Dessie", "Debre Birhan"]),
    ("Tigray", &["Mekelle", "Axum", "Shire", "Adigrat", "Wukro"]),
    ("SNNPR", &["Hawassa", "Arba Minch", "Wolaita", "Dilla", "Hosanna"]),
    ("Addis Ababa", &["Bole", "Kirkos", "Yeka", "Arada", "Lideta"]),
];

pub const WEATHER_CONDITIONS: &[&str] = &["sunny", "rainy", "cloudy"];

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn uniform_inclusive(rng: &mut StdRng, range: (u32, u32)) -> u32 {
    rng.gen_range(range.0..=range.1)
}

// ============================================================================
// DISEASE DATASET
// ============================================================================

pub fn generate_disease_dataset(n_samples: usize, seed: u64) -> Vec<DiseaseRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_samples).map(|_| disease_row(&mut rng)).collect()
}

fn disease_row(rng: &mut StdRng) -> DiseaseRow {
    let pattern = &DISEASE_PATTERNS[rng.gen_range(0..DISEASE_PATTERNS.len())];

    let age = uniform_inclusive(rng, pattern.age_range);
    let gender = if rng.gen_bool(0.5) { "M" } else { "F" };
    let (region, woredas) = REGIONS[rng.gen_range(0..REGIONS.len())];
    let woreda = woredas.choose(rng).copied().unwrap_or(region);

    let mut flags = [0u8; 8];
    for (flag, symptom) in flags.iter_mut().zip(SYMPTOM_COLUMNS) {
        *flag = u8::from(rng.gen::<f64>() < pattern.symptom_probability(symptom));
    }

    DiseaseRow {
        age,
        gender: gender.to_string(),
        region: region.to_string(),
        woreda: woreda.to_string(),
        fever: flags[0],
        headache: flags[1],
        fatigue: flags[2],
        cough: flags[3],
        vomiting: flags[4],
        diarrhea: flags[5],
        joint_pain: flags[6],
        rash: flags[7],
        malaria_test: pattern.malaria_test.to_string(),
        rdt_result: pattern.malaria_test.to_string(),
        blood_pressure_systolic: uniform_inclusive(rng, pattern.bp_systolic),
        blood_pressure_diastolic: uniform_inclusive(rng, pattern.bp_diastolic),
        glucose_level: uniform_inclusive(rng, pattern.glucose),
        diagnosis: pattern.name.to_string(),
    }
}

// ============================================================================
// RISK DATASET
// ============================================================================

/// Inputs of the rule-based risk score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskFactors {
    pub age: f64,
    pub pregnant: bool,
    pub glucose: f64,
    pub bp_systolic: f64,
    pub bp_diastolic: f64,
    pub heart_rate: f64,
    pub bmi: f64,
}

pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    weight_kg / (height_cm / 100.0).powi(2)
}

/// Ground-truth risk score: sum of independent contributions, clamped to [0, 1]
pub fn rule_risk_score(f: &RiskFactors) -> f64 {
    let mut score = 0.0;

    if f.age > 60.0 {
        score += 0.2;
    } else if f.age > 45.0 {
        score += 0.1;
    }

    if f.pregnant {
        score += 0.15;
        if f.age > 35.0 {
            score += 0.1;
        }
    }

    if f.glucose > 180.0 {
        score += 0.25;
    } else if f.glucose > 140.0 {
        score += 0.15;
    } else if f.glucose < 70.0 {
        score += 0.1;
    }

    if f.bp_systolic > 160.0 || f.bp_diastolic > 100.0 {
        score += 0.25;
    } else if f.bp_systolic > 140.0 || f.bp_diastolic > 90.0 {
        score += 0.15;
    }

    if f.heart_rate > 100.0 || f.heart_rate < 60.0 {
        score += 0.1;
    }

    if f.bmi > 30.0 {
        score += 0.15;
    } else if f.bmi < 18.5 {
        score += 0.1;
    }

    f64::clamp(score, 0.0, 1.0)
}

pub fn generate_risk_dataset(n_samples: usize, seed: u64) -> Vec<RiskRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_samples).map(|_| risk_row(&mut rng)).collect()
}

fn risk_row(rng: &mut StdRng) -> RiskRow {
    let age = rng.gen_range(18..=80);
    // Draw unconditionally so the stream doesn't depend on age
    let pregnancy = u8::from(rng.gen::<f64>() < 0.15 && age < 45);
    let glucose = rng.gen_range(70..=250);
    let bp_systolic = rng.gen_range(90..=190);
    let bp_diastolic = rng.gen_range(60..=120);
    let heart_rate = rng.gen_range(55..=120);
    let weight = rng.gen_range(45..=120);
    let height = rng.gen_range(150..=190);
    let body_mass = bmi(f64::from(weight), f64::from(height));

    let score = rule_risk_score(&RiskFactors {
        age: f64::from(age),
        pregnant: pregnancy == 1,
        glucose: f64::from(glucose),
        bp_systolic: f64::from(bp_systolic),
        bp_diastolic: f64::from(bp_diastolic),
        heart_rate: f64::from(heart_rate),
        bmi: body_mass,
    });

    RiskRow {
        age,
        pregnancy,
        glucose,
        blood_pressure_systolic: bp_systolic,
        blood_pressure_diastolic: bp_diastolic,
        heart_rate,
        weight,
        height,
        bmi: round2(body_mass),
        risk_score: round2(score),
    }
}

// ============================================================================
// NO-SHOW DATASET
// ============================================================================

pub const BASE_ATTENDANCE_PROB: f64 = 0.8;
pub const MIN_ATTENDANCE_PROB: f64 = 0.1;
pub const MAX_ATTENDANCE_PROB: f64 = 0.95;

/// Probability the patient shows up, clamped to [0.1, 0.95]
pub fn attendance_probability(distance_km: f64, weather: &str, previous_no_shows: u32, sms_sent: bool) -> f64 {
    let mut prob = BASE_ATTENDANCE_PROB;

    if distance_km > 30.0 {
        prob -= 0.2;
    } else if distance_km > 15.0 {
        prob -= 0.1;
    }

    if weather.eq_ignore_ascii_case("rainy") {
        prob -= 0.15;
    }

    if previous_no_shows > 2 {
        prob -= 0.2;
    } else if previous_no_shows > 0 {
        prob -= 0.1;
    }

    if sms_sent {
        prob += 0.15;
    }

    prob.clamp(MIN_ATTENDANCE_PROB, MAX_ATTENDANCE_PROB)
}

pub fn generate_noshow_dataset(n_samples: usize, seed: u64) -> Vec<NoShowRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default();

    (0..n_samples)
        .map(|i| {
            let date = start + Duration::days(rng.gen_range(0..=365));
            let distance = round2(rng.gen_range(0.5..50.0));
            let weather = WEATHER_CONDITIONS[rng.gen_range(0..WEATHER_CONDITIONS.len())];
            let previous_no_shows = rng.gen_range(0..=5);
            let sms_sent = rng.gen_bool(0.5);

            let show_prob = attendance_probability(distance, weather, previous_no_shows, sms_sent);
            let did_come = u8::from(rng.gen::<f64>() < show_prob);

            NoShowRow {
                patient_id: format!("PAT-{:06}", i + 1),
                appointment_date: date.format("%Y-%m-%d").to_string(),
                distance_from_hospital: distance,
                weather_condition: weather.to_string(),
                previous_no_shows,
                sms_sent: u8::from(sms_sent),
                did_come,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_factors() -> RiskFactors {
        RiskFactors {
            age: 40.0,
            pregnant: false,
            glucose: 100.0,
            bp_systolic: 120.0,
            bp_diastolic: 80.0,
            heart_rate: 75.0,
            bmi: 24.0,
        }
    }

    #[test]
    fn test_same_seed_same_rows() {
        assert_eq!(generate_disease_dataset(200, 7), generate_disease_dataset(200, 7));
        assert_eq!(generate_risk_dataset(200, 7), generate_risk_dataset(200, 7));
        assert_eq!(generate_noshow_dataset(200, 7), generate_noshow_dataset(200, 7));
    }

    #[test]
    fn test_different_seed_different_rows() {
        assert_ne!(generate_risk_dataset(50, 1), generate_risk_dataset(50, 2));
    }

    #[test]
    fn test_disease_rows_follow_patterns() {
        for row in generate_disease_dataset(500, 42) {
            let pattern = DISEASE_PATTERNS.iter().find(|p| p.name == row.diagnosis).unwrap();
            assert!(row.age >= pattern.age_range.0 && row.age <= pattern.age_range.1);
            assert!(row.glucose_level >= pattern.glucose.0 && row.glucose_level <= pattern.glucose.1);
            assert!(row.blood_pressure_systolic >= pattern.bp_systolic.0);
            assert!(row.blood_pressure_systolic <= pattern.bp_systolic.1);
            assert_eq!(row.malaria_test, pattern.malaria_test);
            assert_eq!(row.rdt_result, row.malaria_test);
            assert!(row.gender == "M" || row.gender == "F");

            let (_, woredas) = REGIONS.iter().find(|(r, _)| *r == row.region).unwrap();
            assert!(woredas.contains(&row.woreda.as_str()));
        }
    }

    #[test]
    fn test_disease_labels_roughly_uniform() {
        let rows = generate_disease_dataset(3000, 42);
        for pattern in DISEASE_PATTERNS {
            let count = rows.iter().filter(|r| r.diagnosis == pattern.name).count();
            // Expected 500 each
            assert!(count > 400 && count < 600, "{}: {}", pattern.name, count);
        }
    }

    #[test]
    fn test_risk_score_in_unit_interval() {
        for row in generate_risk_dataset(2000, 42) {
            assert!((0.0..=1.0).contains(&row.risk_score));
            if row.pregnancy == 1 {
                assert!(row.age < 45);
            }
        }
    }

    #[test]
    fn test_risk_score_monotone_in_glucose() {
        let mut low = base_factors();
        low.glucose = 130.0;
        let mut high = base_factors();
        high.glucose = 200.0;
        assert!(rule_risk_score(&high) > rule_risk_score(&low));

        // Holds against every other field combination in the dataset
        for row in generate_risk_dataset(300, 3) {
            let mut f = RiskFactors {
                age: f64::from(row.age),
                pregnant: row.pregnancy == 1,
                glucose: 140.0,
                bp_systolic: f64::from(row.blood_pressure_systolic),
                bp_diastolic: f64::from(row.blood_pressure_diastolic),
                heart_rate: f64::from(row.heart_rate),
                bmi: row.bmi,
            };
            let below = rule_risk_score(&f);
            f.glucose = 181.0;
            let above = rule_risk_score(&f);
            // Clamping at 1.0 is the only way the contribution can vanish
            assert!(above > below || below == 1.0);
        }
    }

    #[test]
    fn test_risk_score_clamped() {
        let worst = RiskFactors {
            age: 70.0,
            pregnant: true,
            glucose: 240.0,
            bp_systolic: 180.0,
            bp_diastolic: 110.0,
            heart_rate: 110.0,
            bmi: 35.0,
        };
        assert_eq!(rule_risk_score(&worst), 1.0);
        assert_eq!(rule_risk_score(&base_factors()), 0.0);
    }

    #[test]
    fn test_bmi() {
        assert!((bmi(80.0, 200.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_attendance_probability_bounds() {
        for distance in [0.5, 10.0, 20.0, 40.0] {
            for weather in WEATHER_CONDITIONS {
                for prior in 0..=5 {
                    for sms in [false, true] {
                        let p = attendance_probability(distance, weather, prior, sms);
                        assert!((MIN_ATTENDANCE_PROB..=MAX_ATTENDANCE_PROB).contains(&p));
                    }
                }
            }
        }
    }

    #[test]
    fn test_attendance_probability_rules() {
        assert!((attendance_probability(5.0, "sunny", 0, false) - 0.8).abs() < 1e-9);
        assert!((attendance_probability(5.0, "sunny", 0, true) - 0.95).abs() < 1e-9);
        // 0.8 - 0.1 (distance) - 0.15 (rain) - 0.1 (prior)
        assert!((attendance_probability(25.0, "rainy", 2, false) - 0.45).abs() < 1e-9);
        assert!((attendance_probability(25.0, "rainy", 2, true) - 0.60).abs() < 1e-9);
        // 0.8 - 0.2 - 0.15 - 0.2 = 0.25
        assert!((attendance_probability(45.0, "rainy", 5, false) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_noshow_rows() {
        let rows = generate_noshow_dataset(100, 42);
        assert_eq!(rows[0].patient_id, "PAT-000001");
        assert_eq!(rows[99].patient_id, "PAT-000100");
        for row in &rows {
            assert!(row.distance_from_hospital >= 0.5 && row.distance_from_hospital <= 50.0);
            assert!(WEATHER_CONDITIONS.contains(&row.weather_condition.as_str()));
            assert!(row.previous_no_shows <= 5);
            assert!(row.appointment_date.starts_with("2023") || row.appointment_date.starts_with("2024"));
        }
    }
}
