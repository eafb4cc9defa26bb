//! # Weight Calculator (C2)
//!
//! Pure, deterministic functions with no I/O: criticality scoring, load
//! factor, overall edge weight, and the criticality<->score conversion
//! (spec §4.2). Every output is clamped into its documented range
//! regardless of input, including negative or absurdly large inputs
//! (spec §8 property 6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Criticality {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Criticality {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CRITICAL" => Some(Criticality::Critical),
            "HIGH" => Some(Criticality::High),
            "MEDIUM" => Some(Criticality::Medium),
            "LOW" => Some(Criticality::Low),
            "INFO" => Some(Criticality::Info),
            _ => None,
        }
    }
}

/// Exact criticality-to-score map (spec §4.2); unknown inputs map to 0.5.
pub fn criticality_to_score(criticality: &str) -> f64 {
    match Criticality::parse(criticality) {
        Some(Criticality::Critical) => 1.0,
        Some(Criticality::High) => 0.75,
        Some(Criticality::Medium) => 0.5,
        Some(Criticality::Low) => 0.25,
        Some(Criticality::Info) => 0.1,
        None => 0.5,
    }
}

/// Inverse of [`criticality_to_score`]. Round-trips for the five known
/// labels (spec §8 property 5).
pub fn score_to_criticality(score: f64) -> &'static str {
    if score >= 0.9 {
        "CRITICAL"
    } else if score >= 0.7 {
        "HIGH"
    } else if score >= 0.4 {
        "MEDIUM"
    } else if score >= 0.2 {
        "LOW"
    } else {
        "INFO"
    }
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Inputs to [`criticality_score`] (spec §4.2).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CriticalityInputs {
    pub source_criticality: f64,
    pub target_criticality: f64,
    pub business_impact: f64,
    pub redundancy_level: f64,
    pub historical_failures: f64,
    pub recovery_complexity: f64,
}

/// `score = 0.30*avg(sourceCrit,targetCrit) + 0.25*businessImpact +
///  0.15*(1/max(redundancyLevel,1)) + 0.20*min(historicalFailures/100,1) +
///  0.10*recoveryComplexity`, clamped to `[0,1]` (spec §4.2).
pub fn criticality_score(inputs: CriticalityInputs) -> f64 {
    let source = clamp01(inputs.source_criticality);
    let target = clamp01(inputs.target_criticality);
    let business_impact = clamp01(inputs.business_impact);
    let recovery_complexity = clamp01(inputs.recovery_complexity);
    let redundancy = inputs.redundancy_level.max(1.0);
    let historical_failures = inputs.historical_failures.max(0.0);

    let score = 0.30 * ((source + target) / 2.0)
        + 0.25 * business_impact
        + 0.15 * (1.0 / redundancy)
        + 0.20 * (historical_failures / 100.0).min(1.0)
        + 0.10 * recovery_complexity;

    clamp01(score)
}

/// Inputs to [`load_factor`] (spec §4.2).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LoadInputs {
    pub requests_per_second: f64,
    pub capacity: f64,
    pub peak_requests_per_second: f64,
    pub manual_weight: f64,
}

/// `load = 0.5*(rps/capacity*100) + 0.3*(peak/capacity*100) +
///  0.2*manualWeight`, clamped to `[0,100]`; `capacity` is coerced to
/// `max(capacity,1)` (spec §4.2).
pub fn load_factor(inputs: LoadInputs) -> f64 {
    let capacity = inputs.capacity.max(1.0);
    let rps_pct = (inputs.requests_per_second / capacity) * 100.0;
    let peak_pct = (inputs.peak_requests_per_second / capacity) * 100.0;

    let load = 0.5 * rps_pct + 0.3 * peak_pct + 0.2 * inputs.manual_weight;
    load.clamp(0.0, 100.0)
}

/// Inputs to [`overall_weight`] (spec §4.2).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WeightInputs {
    pub criticality_score: f64,
    pub load_factor: f64,
    pub latency_ms: f64,
    pub max_latency_ms: f64,
    pub redundancy_level: f64,
}

/// `weight = 0.40*criticalityScore + 0.30*(loadFactor/100) +
///  0.20*latencyFactor + 0.10*(1/redundancyLevel)` where
/// `latencyFactor = 1 - min(latencyMs/maxLatencyMs, 1)` when
/// `latencyMs>0`, else `1.0` (spec §4.2).
pub fn overall_weight(inputs: WeightInputs) -> f64 {
    let criticality_score = clamp01(inputs.criticality_score);
    let load_factor = inputs.load_factor.clamp(0.0, 100.0);
    let redundancy = inputs.redundancy_level.max(1.0);

    let latency_factor = if inputs.latency_ms > 0.0 {
        let max_latency = inputs.max_latency_ms.max(1.0);
        1.0 - (inputs.latency_ms / max_latency).min(1.0)
    } else {
        1.0
    };

    let weight = 0.40 * criticality_score
        + 0.30 * (load_factor / 100.0)
        + 0.20 * latency_factor
        + 0.10 * (1.0 / redundancy);

    clamp01(weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criticality_roundtrips_known_labels() {
        for label in ["CRITICAL", "HIGH", "MEDIUM", "LOW", "INFO"] {
            let score = criticality_to_score(label);
            assert_eq!(score_to_criticality(score), label);
        }
    }

    #[test]
    fn unknown_criticality_maps_to_medium_score() {
        assert_eq!(criticality_to_score("banana"), 0.5);
    }

    #[test]
    fn criticality_score_stays_in_unit_range_for_extreme_inputs() {
        let inputs = CriticalityInputs {
            source_criticality: 1_000_000.0,
            target_criticality: -5.0,
            business_impact: 50.0,
            redundancy_level: -3.0,
            historical_failures: -10.0,
            recovery_complexity: 2.0,
        };
        let score = criticality_score(inputs);
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn scenario_s3_high_criticality_with_low_redundancy() {
        let inputs = CriticalityInputs {
            source_criticality: 1.0,
            target_criticality: 1.0,
            business_impact: 1.0,
            redundancy_level: 1.0,
            historical_failures: 0.0,
            recovery_complexity: 1.0,
        };
        let score = criticality_score(inputs);
        assert!((0.80..=1.00).contains(&score), "got {score}");

        let higher_redundancy = criticality_score(CriticalityInputs {
            redundancy_level: 5.0,
            ..inputs
        });
        assert!(higher_redundancy < score);
    }

    #[test]
    fn load_factor_clamped_for_extreme_inputs() {
        let huge = load_factor(LoadInputs {
            requests_per_second: 1e12,
            capacity: 1.0,
            peak_requests_per_second: 1e12,
            manual_weight: 1e9,
        });
        assert_eq!(huge, 100.0);

        let negative_capacity = load_factor(LoadInputs {
            requests_per_second: 10.0,
            capacity: -5.0,
            peak_requests_per_second: 5.0,
            manual_weight: 0.0,
        });
        assert!((0.0..=100.0).contains(&negative_capacity));
    }

    #[test]
    fn overall_weight_defaults_latency_factor_to_one_when_zero() {
        let weight = overall_weight(WeightInputs {
            criticality_score: 0.5,
            load_factor: 50.0,
            latency_ms: 0.0,
            max_latency_ms: 1000.0,
            redundancy_level: 2.0,
        });
        assert!((0.0..=1.0).contains(&weight));
    }

    #[test]
    fn overall_weight_stays_in_unit_range() {
        let weight = overall_weight(WeightInputs {
            criticality_score: 2.0,
            load_factor: 500.0,
            latency_ms: 5000.0,
            max_latency_ms: 100.0,
            redundancy_level: 0.0,
        });
        assert!((0.0..=1.0).contains(&weight));
    }
}
