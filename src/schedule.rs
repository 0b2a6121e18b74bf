//! Schedule and FAQ data, plus the aggregations behind the two charts.
//!
//! The aggregations are pure: they sort a copy of the entries by week
//! (stable, so rows sharing a week keep their input order) and walk it once.
//! Week is the only key; duplicate weeks are never merged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Text shown for an FAQ key the generative service did not fill in.
pub const FAQ_PLACEHOLDER: &str = "—";

/// Inclusive range of total weight that reads as a complete syllabus.
pub const COMPLETE_WEIGHT_RANGE: (f64, f64) = (90.0, 110.0);

/// One row of the weekly schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Course week, starting at 1.
    pub week: u32,
    /// Number of assignments/assessments due that week.
    pub assignments: u32,
    /// Share of the final grade assessed that week, in percent.
    pub weight_pct: f64,
    pub notes: String,
}

/// The three policy answers pulled out of the syllabus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqMap {
    pub late_work_policy: Option<String>,
    pub attendance_policy: Option<String>,
    pub course_structure: Option<String>,
}

impl FaqMap {
    /// Recognised keys, in display order.
    pub const KEYS: [&'static str; 3] = ["late_work_policy", "attendance_policy", "course_structure"];

    /// Value for `key`, or [`FAQ_PLACEHOLDER`] when absent or unknown.
    pub fn get(&self, key: &str) -> &str {
        let value = match key {
            "late_work_policy" => self.late_work_policy.as_deref(),
            "attendance_policy" => self.attendance_policy.as_deref(),
            "course_structure" => self.course_structure.as_deref(),
            _ => None,
        };
        match value {
            Some(v) if !v.trim().is_empty() => v,
            _ => FAQ_PLACEHOLDER,
        }
    }

    /// Whether none of the keys carries text.
    pub fn is_empty(&self) -> bool {
        Self::KEYS.iter().all(|k| self.get(k) == FAQ_PLACEHOLDER)
    }

    /// Pick the recognised keys out of a loose JSON object.
    ///
    /// Unknown keys are ignored; non-string scalars are stringified; `null`,
    /// arrays and nested objects count as absent.
    pub fn from_json(map: &Map<String, Value>) -> Self {
        let field = |key: &str| match map.get(key) {
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        };
        Self {
            late_work_policy: field("late_work_policy"),
            attendance_policy: field("attendance_policy"),
            course_structure: field("course_structure"),
        }
    }
}

// ── Aggregations ─────────────────────────────────────────────────────────

fn sorted_by_week(entries: &[ScheduleEntry]) -> Vec<&ScheduleEntry> {
    let mut sorted: Vec<&ScheduleEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.week);
    sorted
}

/// Running total of `weight_pct` by week.
///
/// Returns parallel `(weeks, cumulative)` vectors of the same length as
/// `entries`. No normalisation: the total may exceed 100.
pub fn cumulative_weights(entries: &[ScheduleEntry]) -> (Vec<u32>, Vec<f64>) {
    let mut weeks = Vec::with_capacity(entries.len());
    let mut cumulative = Vec::with_capacity(entries.len());
    let mut total = 0.0;
    for entry in sorted_by_week(entries) {
        total += entry.weight_pct;
        weeks.push(entry.week);
        cumulative.push(total);
    }
    (weeks, cumulative)
}

/// Assignment count per row, sorted by week and left unaggregated.
pub fn assignments_by_week(entries: &[ScheduleEntry]) -> (Vec<u32>, Vec<u32>) {
    sorted_by_week(entries)
        .into_iter()
        .map(|e| (e.week, e.assignments))
        .unzip()
}

/// Sum of `weight_pct` over every entry, duplicates included.
pub fn total_weight(entries: &[ScheduleEntry]) -> f64 {
    entries.iter().map(|e| e.weight_pct).sum()
}

/// Whether a total weight falls within [`COMPLETE_WEIGHT_RANGE`].
pub fn weight_looks_complete(total: f64) -> bool {
    let (lo, hi) = COMPLETE_WEIGHT_RANGE;
    (lo..=hi).contains(&total)
}

// ── Coercion of generative output ────────────────────────────────────────

/// Coerce loosely typed schedule items into entries.
///
/// Each item is handled on its own; an item that cannot be coerced is
/// skipped. Returns the surviving entries sorted by week and the number of
/// skipped items.
pub fn coerce_schedule(items: &[Value]) -> (Vec<ScheduleEntry>, usize) {
    let mut entries: Vec<ScheduleEntry> = items.iter().filter_map(coerce_entry).collect();
    let dropped = items.len() - entries.len();
    entries.sort_by_key(|e| e.week);
    (entries, dropped)
}

/// Coerce one item: `week` is required and must be ≥ 1; `assignments`
/// defaults to 0, `weight_pct` to 0.0 and `notes` to "".
pub fn coerce_entry(item: &Value) -> Option<ScheduleEntry> {
    let obj = item.as_object()?;

    let week = as_integer(obj.get("week")?)?;
    if week < 1 {
        return None;
    }

    let assignments = match obj.get("assignments") {
        None | Some(Value::Null) => 0,
        Some(v) => as_integer(v)?,
    };
    if assignments < 0 {
        return None;
    }

    let weight_pct = match obj.get("weight_pct") {
        None | Some(Value::Null) => 0.0,
        Some(v) => as_float(v)?,
    };
    if weight_pct < 0.0 {
        return None;
    }

    let notes = match obj.get("notes") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    };

    Some(ScheduleEntry {
        week: u32::try_from(week).ok()?,
        assignments: u32::try_from(assignments).ok()?,
        weight_pct,
        notes,
    })
}

/// Integers, floats (truncated toward zero), booleans and integer strings.
fn as_integer(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Numbers, booleans and numeric strings (a trailing `%` is tolerated).
fn as_float(v: &Value) -> Option<f64> {
    let f = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim_end().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    f.is_finite().then_some(f)
}
