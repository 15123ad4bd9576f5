//! Characterisation strategy result model.
//!
//! # Responsibility
//! - Give the loosely structured strategy payload a typed, all-optional shape.
//! - Extract every field independently so one malformed value never hides
//!   the others.
//!
//! # Invariants
//! - `from_json` never fails; unreadable fields become `None`.
//! - Sub-wedges keep the order of the payload.

use serde_json::Value;

/// Strategy computed by the characterisation service for one screening.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StrategyResult {
    pub screening_id: Option<i64>,
    pub collection_plans: Vec<CollectionPlan>,
}

/// One proposed collection plan.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollectionPlan {
    pub plan_number: Option<u32>,
    /// Target resolution in Å.
    pub resolution: Option<f64>,
    /// Target transmission in percent.
    pub transmission: Option<f64>,
    pub sub_wedges: Vec<SubWedge>,
}

/// One contiguous rotation range of a plan.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubWedge {
    pub rotation_axis_start: Option<f64>,
    pub rotation_axis_end: Option<f64>,
    pub oscillation_width: Option<f64>,
    pub transmission: Option<f64>,
    /// Beam wavelength in Å.
    pub wavelength: Option<f64>,
    pub exposure_time: Option<f64>,
}

impl StrategyResult {
    /// Reads a strategy payload; never fails.
    pub fn from_json(value: &Value) -> Self {
        let collection_plans = lookup(value, &["characterisationResult", "strategyResult", "collectionPlan"])
            .and_then(Value::as_array)
            .map(|plans| plans.iter().map(CollectionPlan::from_json).collect())
            .unwrap_or_default();

        Self {
            screening_id: wrapped(value, &["screeningId"]).and_then(as_i64),
            collection_plans,
        }
    }

    /// The plan used to generate collections; later plans are alternatives.
    pub fn first_plan(&self) -> Option<&CollectionPlan> {
        self.collection_plans.first()
    }
}

impl CollectionPlan {
    fn from_json(value: &Value) -> Self {
        let sub_wedges = lookup(value, &["collectionStrategy", "subWedge"])
            .and_then(Value::as_array)
            .map(|wedges| wedges.iter().map(SubWedge::from_json).collect())
            .unwrap_or_default();

        Self {
            plan_number: wrapped(value, &["collectionPlanNumber"])
                .and_then(as_i64)
                .and_then(|number| u32::try_from(number).ok()),
            resolution: wrapped(value, &["strategySummary", "resolution"]).and_then(as_f64),
            transmission: wrapped(value, &["strategySummary", "attenuation"]).and_then(as_f64),
            sub_wedges,
        }
    }
}

impl SubWedge {
    fn from_json(value: &Value) -> Self {
        let goniostat = lookup(value, &["experimentalCondition", "goniostat"]);
        let beam = lookup(value, &["experimentalCondition", "beam"]);
        let field = |parent: Option<&Value>, name: &str| {
            parent
                .and_then(|parent| wrapped(parent, &[name]))
                .and_then(as_f64)
        };

        Self {
            rotation_axis_start: field(goniostat, "rotationAxisStart"),
            rotation_axis_end: field(goniostat, "rotationAxisEnd"),
            oscillation_width: field(goniostat, "oscillationWidth"),
            transmission: field(beam, "transmission"),
            wavelength: field(beam, "wavelength"),
            exposure_time: field(beam, "exposureTime"),
        }
    }
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// Scalars in the payload are wrapped as `{"value": ...}`.
fn wrapped<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    lookup(value, path).and_then(|node| node.get("value"))
}

fn as_f64(value: &Value) -> Option<f64> {
    let number: Option<f64> = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
