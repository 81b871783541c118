use super::codec::{Stage, encode_array, fixed_point_fits};
use super::column::ColumnPlan;
use super::encoding::TypedArray;
use crate::core::models::field::{ColumnValues, Field, ValueKind};

const INTEGER_CANDIDATES: &[&[Stage]] = &[
    &[Stage::IntegerPacking],
    &[Stage::Delta, Stage::IntegerPacking],
    &[Stage::RunLength, Stage::IntegerPacking],
    &[Stage::Delta, Stage::RunLength, Stage::IntegerPacking],
];

const MAX_FIXED_POINT_DIGITS: i32 = 4;

#[derive(Debug)]
enum ValueType {
    Int(Vec<i32>),
    Float(Vec<f64>),
    Str,
}

/// Whether a text column holds integers, floats or strings. Markers are
/// ignored; a column without present values is a string column.
fn value_type(field: &Field) -> ValueType {
    if let Field::Binary(binary) = field {
        return match binary.values() {
            ColumnValues::Int(v) => ValueType::Int(v.clone()),
            ColumnValues::Float(v) => ValueType::Float(v.clone()),
            ColumnValues::Str(_) => ValueType::Str,
        };
    }

    let present: Vec<usize> = (0..field.row_count())
        .filter(|&r| field.value_kind(r) == ValueKind::Present)
        .collect();
    if present.is_empty() {
        return ValueType::Str;
    }

    let is_int = present.iter().all(|&r| {
        let text = field.str(r);
        text.parse::<i32>().is_ok_and(|v| v.to_string() == text)
    });
    if is_int {
        return ValueType::Int((0..field.row_count()).map(|r| field.int(r)).collect());
    }

    let is_float = present
        .iter()
        .all(|&r| field.str(r).parse::<f64>().is_ok_and(f64::is_finite));
    if is_float {
        return ValueType::Float((0..field.row_count()).map(|r| field.float(r)).collect());
    }
    ValueType::Str
}

/// Plan used when nothing better is known: plain 32-bit integers, 64-bit
/// floats or a string table.
pub fn default_plan(field: &Field) -> ColumnPlan {
    match value_type(field) {
        ValueType::Int(_) => ColumnPlan::Int(Vec::new()),
        ValueType::Float(_) => ColumnPlan::Float(Vec::new()),
        ValueType::Str => ColumnPlan::Str,
    }
}

/// Whether `plan` can encode this column without losing values. Integer plans
/// need integer columns; float plans accept integers and floats whose scaled
/// values stay within 32 bits.
pub fn plan_fits(field: &Field, plan: &ColumnPlan) -> bool {
    let scaled_fit = |stages: &[Stage], values: &[f64]| match stages.first() {
        Some(Stage::FixedPoint { factor }) => values.iter().all(|&v| fixed_point_fits(v, *factor)),
        _ => true,
    };
    match (plan, value_type(field)) {
        (ColumnPlan::Str, _) => true,
        (ColumnPlan::Int(_), ValueType::Int(_)) => true,
        (ColumnPlan::Float(stages), ValueType::Int(values)) => {
            let values: Vec<f64> = values.into_iter().map(f64::from).collect();
            scaled_fit(stages, &values)
        }
        (ColumnPlan::Float(stages), ValueType::Float(values)) => scaled_fit(stages, &values),
        _ => false,
    }
}

/// Picks the plan that produces the fewest bytes for this column.
pub fn classify(field: &Field) -> ColumnPlan {
    match value_type(field) {
        ValueType::Int(values) => ColumnPlan::Int(smallest_integer_chain(&values)),
        ValueType::Float(values) => ColumnPlan::Float(fixed_point_chain(&values)),
        ValueType::Str => ColumnPlan::Str,
    }
}

fn smallest_integer_chain(values: &[i32]) -> Vec<Stage> {
    INTEGER_CANDIDATES
        .iter()
        .filter_map(|stages| {
            encode_array(TypedArray::int32(values.to_vec()), stages)
                .ok()
                .map(|encoded| (encoded.data.len(), *stages))
        })
        .min_by_key(|(size, _)| *size)
        .map(|(_, stages)| stages.to_vec())
        .unwrap_or_default()
}

/// Fixed point with the fewest decimal digits that represents every value
/// exactly, or no stages at all when none does.
fn fixed_point_chain(values: &[f64]) -> Vec<Stage> {
    (0..=MAX_FIXED_POINT_DIGITS)
        .map(|digits| 10f64.powi(digits))
        .find(|&factor| values.iter().all(|&v| is_exact(v, factor)))
        .map(|factor| {
            let mut stages = vec![Stage::FixedPoint { factor }];
            stages.extend(smallest_integer_chain(&quantize(values, factor)));
            stages
        })
        .unwrap_or_default()
}

fn is_exact(value: f64, factor: f64) -> bool {
    let scaled = value * factor;
    if scaled.abs() >= f64::from(i32::MAX) {
        return false;
    }
    let restored = scaled.round() / factor;
    (restored - value).abs() <= 1e-9 * value.abs().max(1.0)
}

fn quantize(values: &[f64], factor: f64) -> Vec<i32> {
    values.iter().map(|v| (v * factor).round() as i32).collect()
}
