use super::codec::{Stage, decode_array, decode_parts, encode_array};
use super::encoding::{DataType, EncodedData, Encoding, TypedArray};
use super::error::{DecodeError, EncodeError};
use crate::core::models::field::{BinaryField, ColumnValues, Field, ValueKind};
use std::collections::HashMap;

const STRING_INDEX_STAGES: &[Stage] = &[Stage::Delta, Stage::RunLength, Stage::IntegerPacking];
const STRING_OFFSET_STAGES: &[Stage] = &[Stage::Delta, Stage::IntegerPacking];
const MASK_STAGES: &[Stage] = &[Stage::RunLength, Stage::IntegerPacking];

/// A field in its binary form.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedColumn {
    pub name: String,
    pub data: EncodedData,
    /// Present only when some row holds a `.` or `?` marker.
    pub mask: Option<EncodedData>,
}

/// How a column's values are read and which stages encode them.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnPlan {
    Int(Vec<Stage>),
    Float(Vec<Stage>),
    Str,
}

impl ColumnPlan {
    /// Plan for a named preset; presets starting with fixed point read floats.
    pub fn from_stages(stages: &[Stage]) -> Self {
        match stages.first() {
            Some(Stage::FixedPoint { .. }) => ColumnPlan::Float(stages.to_vec()),
            _ => ColumnPlan::Int(stages.to_vec()),
        }
    }

    /// Plan that reproduces the stages of a recorded descriptor chain.
    pub fn from_encoding(chain: &[Encoding]) -> Option<Self> {
        let mut stages = Vec::with_capacity(chain.len());
        let mut is_float = false;
        for (i, encoding) in chain.iter().enumerate() {
            match encoding {
                Encoding::StringArray { .. } if chain.len() == 1 => return Some(ColumnPlan::Str),
                Encoding::StringArray { .. } => return None,
                Encoding::FixedPoint { factor, .. } => {
                    is_float |= i == 0;
                    stages.push(Stage::FixedPoint { factor: *factor });
                }
                Encoding::Delta { .. } => stages.push(Stage::Delta),
                Encoding::RunLength { .. } => stages.push(Stage::RunLength),
                Encoding::IntegerPacking { .. } => stages.push(Stage::IntegerPacking),
                Encoding::ByteArray { data_type } => {
                    is_float |= i == 0 && data_type.is_float();
                }
            }
        }
        Some(if is_float {
            ColumnPlan::Float(stages)
        } else {
            ColumnPlan::Int(stages)
        })
    }
}

/// Encodes one field according to `plan`.
///
/// # Errors
///
/// Returns [`EncodeError`] if the plan's stages do not fit its value type.
pub fn encode_column(name: &str, field: &Field, plan: &ColumnPlan) -> Result<EncodedColumn, EncodeError> {
    let rows = 0..field.row_count();
    let data = match plan {
        ColumnPlan::Int(stages) => {
            encode_array(TypedArray::int32(rows.map(|r| field.int(r)).collect()), stages)?
        }
        ColumnPlan::Float(stages) => encode_array(
            TypedArray::float64(rows.map(|r| field.float(r)).collect()),
            stages,
        )?,
        ColumnPlan::Str => encode_strings(field)?,
    };
    let mask = if field.has_markers() {
        let codes = (0..field.row_count())
            .map(|r| i32::from(field.value_kind(r).mask_code()))
            .collect();
        Some(encode_array(
            TypedArray::Int {
                data_type: DataType::Uint8,
                values: codes,
            },
            MASK_STAGES,
        )?)
    } else {
        None
    };
    Ok(EncodedColumn {
        name: name.to_string(),
        data,
        mask,
    })
}

fn encode_strings(field: &Field) -> Result<EncodedData, EncodeError> {
    let mut lookup: HashMap<String, i32> = HashMap::new();
    let mut string_data = String::new();
    let mut offsets = vec![0i32];
    let mut indices = Vec::with_capacity(field.row_count());

    for row in 0..field.row_count() {
        if field.value_kind(row) != ValueKind::Present {
            indices.push(-1);
            continue;
        }
        let value = field.str(row);
        let index = match lookup.get(value.as_ref()).copied() {
            Some(index) => index,
            None => {
                let index = lookup.len() as i32;
                string_data.push_str(&value);
                offsets.push(string_data.len() as i32);
                lookup.insert(value.into_owned(), index);
                index
            }
        };
        indices.push(index);
    }

    let data = encode_array(TypedArray::int32(indices), STRING_INDEX_STAGES)?;
    let offsets = encode_array(TypedArray::int32(offsets), STRING_OFFSET_STAGES)?;
    Ok(EncodedData {
        encoding: vec![Encoding::StringArray {
            data_encoding: data.encoding,
            string_data,
            offset_encoding: offsets.encoding,
            offsets: offsets.data,
        }],
        data: data.data,
    })
}

/// Rebuilds a field with `row_count` rows from its binary form.
///
/// # Errors
///
/// Fails if any descriptor chain is invalid or a decoded array does not have
/// `row_count` elements.
pub fn decode_column(column: &EncodedColumn, row_count: usize) -> Result<Field, DecodeError> {
    let values = match column.data.encoding.as_slice() {
        [
            Encoding::StringArray {
                data_encoding,
                string_data,
                offset_encoding,
                offsets,
            },
        ] => ColumnValues::Str(decode_strings(
            data_encoding,
            &column.data.data,
            string_data,
            offset_encoding,
            offsets,
            row_count,
        )?),
        _ => match decode_array(&column.data, row_count)? {
            TypedArray::Int { values, .. } => ColumnValues::Int(values),
            TypedArray::Float { values, .. } => ColumnValues::Float(values),
        },
    };
    check_rows(row_count, values.len())?;

    let mask = match &column.mask {
        Some(mask) => {
            let codes = match decode_array(mask, row_count)? {
                TypedArray::Int { values, .. } => values,
                TypedArray::Float { .. } => {
                    return Err(DecodeError::TypeMismatch {
                        encoding: "mask",
                        found: "float data",
                    });
                }
            };
            check_rows(row_count, codes.len())?;
            Some(codes.into_iter().map(|c| c as u8).collect())
        }
        None => None,
    };

    Ok(Field::Binary(BinaryField::new(
        values,
        mask,
        column.data.encoding.clone(),
    )))
}

fn decode_strings(
    data_encoding: &[Encoding],
    data: &[u8],
    string_data: &str,
    offset_encoding: &[Encoding],
    offsets: &[u8],
    row_count: usize,
) -> Result<Vec<String>, DecodeError> {
    let indices = int_values(decode_parts(data_encoding, data, row_count)?)?;
    let offsets = int_values(decode_parts(
        offset_encoding,
        offsets,
        string_data.len() + 1,
    )?)?;

    let strings = offsets
        .windows(2)
        .map(|w| {
            let (start, end) = (w[0].max(0) as usize, w[1].max(0) as usize);
            if end > string_data.len() {
                return Err(DecodeError::LengthMismatch {
                    expected: end,
                    actual: string_data.len(),
                });
            }
            string_data
                .get(start..end)
                .ok_or(DecodeError::InvalidUtf8)
        })
        .collect::<Result<Vec<_>, _>>()?;

    indices
        .into_iter()
        .map(|index| match usize::try_from(index) {
            Ok(i) => strings
                .get(i)
                .map(|s| s.to_string())
                .ok_or(DecodeError::LengthMismatch {
                    expected: i + 1,
                    actual: strings.len(),
                }),
            Err(_) => Ok(String::new()),
        })
        .collect()
}

fn int_values(array: TypedArray) -> Result<Vec<i32>, DecodeError> {
    match array {
        TypedArray::Int { values, .. } => Ok(values),
        TypedArray::Float { .. } => Err(DecodeError::TypeMismatch {
            encoding: "string-array",
            found: "float data",
        }),
    }
}

fn check_rows(expected: usize, actual: usize) -> Result<(), DecodeError> {
    if expected != actual {
        return Err(DecodeError::LengthMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::field::TextField;
    use std::sync::Arc;

    fn text_field(values: &[&str]) -> Field {
        let mut source = String::new();
        let mut spans = Vec::new();
        for value in values {
            let start = source.len();
            source.push_str(value);
            spans.push((start, source.len()));
            source.push(' ');
        }
        Field::Text(TextField::new(Arc::from(source), spans))
    }

    #[test]
    fn string_column_deduplicates_and_keeps_markers() {
        let field = text_field(&["ALA", "GLY", "ALA", "?", ".", "GLY"]);
        let column = encode_column("label_comp_id", &field, &ColumnPlan::Str).unwrap();
        match &column.data.encoding[0] {
            Encoding::StringArray { string_data, .. } => assert_eq!(string_data, "ALAGLY"),
            other => panic!("unexpected encoding {other:?}"),
        }
        assert!(column.mask.is_some());

        let decoded = decode_column(&column, 6).unwrap();
        assert_eq!(decoded.str(2), "ALA");
        assert_eq!(decoded.str(5), "GLY");
        assert_eq!(decoded.value_kind(3), ValueKind::Unknown);
        assert_eq!(decoded.value_kind(4), ValueKind::NotSpecified);
        assert_eq!(decoded.str(3), "");
    }

    #[test]
    fn numeric_column_without_markers_has_no_mask() {
        let field = text_field(&["1", "2", "3", "4"]);
        let plan = ColumnPlan::Int(vec![Stage::Delta, Stage::RunLength, Stage::IntegerPacking]);
        let column = encode_column("id", &field, &plan).unwrap();
        assert!(column.mask.is_none());
        let decoded = decode_column(&column, 4).unwrap();
        assert_eq!(decoded.int(3), 4);
        assert_eq!(decoded.binary_encoding().unwrap().len(), 4);
    }

    #[test]
    fn float_column_uses_fixed_point() {
        let field = text_field(&["1.234", "-2.5", "?"]);
        let plan = ColumnPlan::Float(vec![
            Stage::FixedPoint { factor: 1000.0 },
            Stage::Delta,
            Stage::IntegerPacking,
        ]);
        let decoded = decode_column(&encode_column("x", &field, &plan).unwrap(), 3).unwrap();
        assert_eq!(decoded.float(0), 1.234);
        assert_eq!(decoded.float(1), -2.5);
        assert_eq!(decoded.value_kind(2), ValueKind::Unknown);
    }

    #[test]
    fn row_count_is_checked_on_decode() {
        let field = text_field(&["1", "2"]);
        let column = encode_column("id", &field, &ColumnPlan::Int(Vec::new())).unwrap();
        assert_eq!(
            decode_column(&column, 3).unwrap_err(),
            DecodeError::LengthMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn preset_fixed_point_refuses_values_it_cannot_hold() {
        let field = text_field(&["5000000.25", "12.5"]);
        let plan = ColumnPlan::Float(vec![
            Stage::FixedPoint { factor: 1000.0 },
            Stage::Delta,
            Stage::IntegerPacking,
        ]);
        assert_eq!(
            encode_column("b_iso", &field, &plan).unwrap_err(),
            EncodeError::OutOfRange {
                stage: "fixed-point",
                row: 0
            }
        );
    }

    #[test]
    fn oversized_run_length_is_rejected_against_the_row_count() {
        let column = EncodedColumn {
            name: "id".into(),
            data: EncodedData {
                encoding: vec![
                    Encoding::RunLength {
                        src_type: DataType::Int32,
                        src_size: 50_000_000,
                    },
                    Encoding::ByteArray {
                        data_type: DataType::Uint32,
                    },
                ],
                data: [7u32, 50_000_000].iter().flat_map(|v| v.to_le_bytes()).collect(),
            },
            mask: None,
        };
        assert_eq!(
            decode_column(&column, 1).unwrap_err(),
            DecodeError::SizeLimit {
                size: 50_000_000,
                limit: 1
            }
        );
    }

    #[test]
    fn plan_is_recovered_from_recorded_chain() {
        let field = text_field(&["1.5", "2.5"]);
        let plan = ColumnPlan::Float(vec![Stage::FixedPoint { factor: 10.0 }, Stage::Delta]);
        let column = encode_column("b", &field, &plan).unwrap();
        assert_eq!(ColumnPlan::from_encoding(&column.data.encoding), Some(plan));

        let strings = encode_column("s", &field, &ColumnPlan::Str).unwrap();
        assert_eq!(
            ColumnPlan::from_encoding(&strings.data.encoding),
            Some(ColumnPlan::Str)
        );
        assert_eq!(
            ColumnPlan::from_encoding(&[Encoding::ByteArray {
                data_type: DataType::Float64
            }]),
            Some(ColumnPlan::Float(Vec::new()))
        );
    }
}
