//! Generic application and reversal of encoding stages.
//!
//! [`encode_array`] folds a list of [`Stage`]s over a typed array and always
//! finishes with a byte-array stage; [`decode_array`] replays the recorded
//! [`Encoding`] descriptors backwards. All integer arithmetic wraps, so delta
//! and run-length transforms round-trip for every `i32` input.

use super::encoding::{DataType, EncodedData, Encoding, TypedArray};
use super::error::{DecodeError, EncodeError};

/// A transform to apply during encoding. Parameters that depend on the data
/// (origin, sizes, packing width) are chosen when the stage runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    FixedPoint { factor: f64 },
    Delta,
    RunLength,
    IntegerPacking,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::FixedPoint { .. } => "fixed-point",
            Stage::Delta => "delta",
            Stage::RunLength => "run-length",
            Stage::IntegerPacking => "integer-packing",
        }
    }
}

/// Encodes `array` with `stages` followed by the terminal byte-array stage.
///
/// # Errors
///
/// Returns [`EncodeError::TypeMismatch`] if a stage receives data it cannot
/// transform, such as delta coding of floats, and [`EncodeError::OutOfRange`]
/// if a fixed-point value does not fit in 32 bits.
pub fn encode_array(array: TypedArray, stages: &[Stage]) -> Result<EncodedData, EncodeError> {
    let mut encoding = Vec::with_capacity(stages.len() + 1);
    let mut current = array;
    for &stage in stages {
        current = apply(stage, current, &mut encoding)?;
    }
    let data_type = current.data_type();
    let data = to_bytes(&current);
    encoding.push(Encoding::ByteArray { data_type });
    Ok(EncodedData { encoding, data })
}

fn apply(
    stage: Stage,
    array: TypedArray,
    encoding: &mut Vec<Encoding>,
) -> Result<TypedArray, EncodeError> {
    let mismatch = |data_type| EncodeError::TypeMismatch {
        stage: stage.name(),
        data_type,
    };
    match (stage, array) {
        (Stage::FixedPoint { factor }, TypedArray::Float { data_type, values }) => {
            if let Some(row) = values.iter().position(|&v| !fixed_point_fits(v, factor)) {
                return Err(EncodeError::OutOfRange {
                    stage: stage.name(),
                    row,
                });
            }
            encoding.push(Encoding::FixedPoint {
                factor,
                src_type: data_type,
            });
            Ok(TypedArray::int32(
                values.iter().map(|v| (v * factor).round() as i32).collect(),
            ))
        }
        (Stage::Delta, TypedArray::Int { data_type, values }) => {
            let origin = values.first().copied().unwrap_or(0);
            let mut output = Vec::with_capacity(values.len());
            if !values.is_empty() {
                output.push(0);
            }
            output.extend(values.windows(2).map(|w| w[1].wrapping_sub(w[0])));
            encoding.push(Encoding::Delta {
                origin,
                src_type: data_type,
            });
            Ok(TypedArray::int32(output))
        }
        (Stage::RunLength, TypedArray::Int { data_type, values }) => {
            let mut output = Vec::new();
            let mut iter = values.iter().copied();
            if let Some(first) = iter.next() {
                let (mut value, mut run) = (first, 1i32);
                for next in iter {
                    if next == value {
                        run += 1;
                    } else {
                        output.extend([value, run]);
                        value = next;
                        run = 1;
                    }
                }
                output.extend([value, run]);
            }
            encoding.push(Encoding::RunLength {
                src_type: data_type,
                src_size: values.len(),
            });
            Ok(TypedArray::int32(output))
        }
        (Stage::IntegerPacking, TypedArray::Int { data_type, values }) => {
            let packing = determine_packing(&values);
            if packing.byte_count == 4 {
                return Ok(TypedArray::Int { data_type, values });
            }
            let packed = pack(&values, &packing);
            encoding.push(Encoding::IntegerPacking {
                byte_count: packing.byte_count,
                is_unsigned: !packing.is_signed,
                src_size: values.len(),
            });
            Ok(TypedArray::Int {
                data_type: packing.data_type(),
                values: packed,
            })
        }
        (_, array) => Err(mismatch(array.data_type())),
    }
}

/// Whether `value` scaled by `factor` still fits in an `i32`.
pub fn fixed_point_fits(value: f64, factor: f64) -> bool {
    (value * factor).round().abs() <= f64::from(i32::MAX)
}

/// Decodes data produced by [`encode_array`] or by any other binary CIF writer.
/// No intermediate array may grow beyond `max_len` elements.
///
/// # Errors
///
/// Fails on malformed byte lengths, inconsistent sizes, declared sizes above
/// `max_len` and descriptor chains that do not form a valid numeric pipeline.
pub fn decode_array(encoded: &EncodedData, max_len: usize) -> Result<TypedArray, DecodeError> {
    decode_parts(&encoded.encoding, &encoded.data, max_len)
}

/// Like [`decode_array`] for a chain and payload stored apart.
pub fn decode_parts(
    encoding: &[Encoding],
    data: &[u8],
    max_len: usize,
) -> Result<TypedArray, DecodeError> {
    let mut descriptors = encoding.iter().rev();
    let mut current = match descriptors.next() {
        Some(Encoding::ByteArray { data_type }) => from_bytes(data, *data_type)?,
        Some(other) => {
            return Err(DecodeError::TypeMismatch {
                encoding: other.name(),
                found: "raw bytes",
            });
        }
        None => {
            return Err(DecodeError::TypeMismatch {
                encoding: "none",
                found: "raw bytes",
            });
        }
    };
    for descriptor in descriptors {
        if let Some(size) = descriptor.src_size().filter(|&size| size > max_len) {
            return Err(DecodeError::SizeLimit {
                size,
                limit: max_len,
            });
        }
        current = unapply(descriptor, current)?;
    }
    Ok(current)
}

fn unapply(descriptor: &Encoding, array: TypedArray) -> Result<TypedArray, DecodeError> {
    let mismatch = |array: &TypedArray| DecodeError::TypeMismatch {
        encoding: descriptor.name(),
        found: array.describe(),
    };
    match (descriptor, array) {
        (Encoding::FixedPoint { factor, src_type }, TypedArray::Int { values, .. }) => {
            Ok(TypedArray::Float {
                data_type: *src_type,
                values: values.iter().map(|&v| f64::from(v) / factor).collect(),
            })
        }
        (Encoding::Delta { origin, src_type }, TypedArray::Int { values, .. }) => {
            let mut acc = *origin;
            let output = values
                .into_iter()
                .map(|delta| {
                    acc = acc.wrapping_add(delta);
                    acc
                })
                .collect();
            Ok(TypedArray::Int {
                data_type: *src_type,
                values: output,
            })
        }
        (Encoding::RunLength { src_type, src_size }, TypedArray::Int { values, .. }) => {
            if values.len() % 2 != 0 {
                return Err(DecodeError::LengthMismatch {
                    expected: values.len() + 1,
                    actual: values.len(),
                });
            }
            let mut output = Vec::new();
            for pair in values.chunks_exact(2) {
                let run = usize::try_from(pair[1]).unwrap_or(0);
                if output.len() + run > *src_size {
                    return Err(DecodeError::LengthMismatch {
                        expected: *src_size,
                        actual: output.len() + run,
                    });
                }
                output.extend(std::iter::repeat_n(pair[0], run));
            }
            check_len(*src_size, output.len())?;
            Ok(TypedArray::Int {
                data_type: *src_type,
                values: output,
            })
        }
        (
            Encoding::IntegerPacking {
                byte_count,
                is_unsigned,
                src_size,
            },
            TypedArray::Int { values, .. },
        ) => {
            let limits = Packing {
                byte_count: *byte_count,
                is_signed: !is_unsigned,
                size: *src_size,
            };
            let output = unpack(&values, &limits, *src_size)?;
            Ok(TypedArray::int32(output))
        }
        (_, array) => Err(mismatch(&array)),
    }
}

fn check_len(expected: usize, actual: usize) -> Result<(), DecodeError> {
    if expected != actual {
        return Err(DecodeError::LengthMismatch { expected, actual });
    }
    Ok(())
}

struct Packing {
    byte_count: u8,
    is_signed: bool,
    size: usize,
}

impl Packing {
    fn upper_limit(&self) -> i64 {
        match (self.byte_count, self.is_signed) {
            (1, true) => 0x7F,
            (1, false) => 0xFF,
            (_, true) => 0x7FFF,
            (_, false) => 0xFFFF,
        }
    }

    fn lower_limit(&self) -> i64 {
        if self.is_signed {
            -self.upper_limit() - 1
        } else {
            0
        }
    }

    fn data_type(&self) -> DataType {
        match (self.byte_count, self.is_signed) {
            (1, true) => DataType::Int8,
            (1, false) => DataType::Uint8,
            (_, true) => DataType::Int16,
            (_, false) => DataType::Uint16,
        }
    }
}

/// Number of packed elements needed when saturating at `upper`.
fn packing_size(values: &[i32], upper: i64) -> usize {
    let lower = -upper - 1;
    values
        .iter()
        .map(|&v| {
            let v = i64::from(v);
            let limit = if v >= 0 { upper } else { lower };
            if v == 0 {
                1
            } else {
                let (a, b) = (v.abs(), limit.abs());
                let chunks = (a + b - 1) / b;
                (chunks + i64::from(a % b == 0)) as usize
            }
        })
        .sum()
}

/// Picks the narrowest width whose total byte size beats plain 32-bit storage.
fn determine_packing(values: &[i32]) -> Packing {
    let is_signed = values.iter().any(|&v| v < 0);
    let (size8, size16) = if is_signed {
        (packing_size(values, 0x7F), packing_size(values, 0x7FFF))
    } else {
        (packing_size(values, 0xFF), packing_size(values, 0xFFFF))
    };
    if values.len() * 4 < size16 * 2 {
        Packing {
            byte_count: 4,
            is_signed,
            size: values.len(),
        }
    } else if size16 * 2 < size8 {
        Packing {
            byte_count: 2,
            is_signed,
            size: size16,
        }
    } else {
        Packing {
            byte_count: 1,
            is_signed,
            size: size8,
        }
    }
}

fn pack(values: &[i32], packing: &Packing) -> Vec<i32> {
    let (upper, lower) = (packing.upper_limit(), packing.lower_limit());
    let mut output = Vec::with_capacity(packing.size);
    for &v in values {
        let mut value = i64::from(v);
        if value >= 0 {
            while value >= upper {
                output.push(upper as i32);
                value -= upper;
            }
        } else {
            while value <= lower {
                output.push(lower as i32);
                value -= lower;
            }
        }
        output.push(value as i32);
    }
    output
}

fn unpack(values: &[i32], packing: &Packing, src_size: usize) -> Result<Vec<i32>, DecodeError> {
    let (upper, lower) = (packing.upper_limit(), packing.lower_limit());
    let saturated = |t: i64| t == upper || (packing.is_signed && t == lower);
    let mut output = Vec::with_capacity(src_size.min(values.len()));
    let mut iter = values.iter().map(|&v| i64::from(v));
    while let Some(mut t) = iter.next() {
        let mut value = 0i64;
        while saturated(t) {
            value += t;
            t = iter.next().ok_or(DecodeError::UnexpectedEof)?;
        }
        output.push((value + t) as i32);
    }
    check_len(src_size, output.len())?;
    Ok(output)
}

fn to_bytes(array: &TypedArray) -> Vec<u8> {
    let data_type = array.data_type();
    let mut out = Vec::with_capacity(array.len() * data_type.byte_size());
    match array {
        TypedArray::Int { values, .. } => {
            for &v in values {
                match data_type {
                    DataType::Int8 => out.extend((v as i8).to_le_bytes()),
                    DataType::Uint8 => out.extend((v as u8).to_le_bytes()),
                    DataType::Int16 => out.extend((v as i16).to_le_bytes()),
                    DataType::Uint16 => out.extend((v as u16).to_le_bytes()),
                    DataType::Uint32 => out.extend((v as u32).to_le_bytes()),
                    DataType::Float32 => out.extend((v as f32).to_le_bytes()),
                    DataType::Float64 => out.extend(f64::from(v).to_le_bytes()),
                    DataType::Int32 => out.extend(v.to_le_bytes()),
                }
            }
        }
        TypedArray::Float { values, .. } => {
            for &v in values {
                match data_type {
                    DataType::Float32 => out.extend((v as f32).to_le_bytes()),
                    _ => out.extend(v.to_le_bytes()),
                }
            }
        }
    }
    out
}

fn from_bytes(bytes: &[u8], data_type: DataType) -> Result<TypedArray, DecodeError> {
    let size = data_type.byte_size();
    if bytes.len() % size != 0 {
        return Err(DecodeError::LengthMismatch {
            expected: bytes.len().div_ceil(size) * size,
            actual: bytes.len(),
        });
    }
    let chunks = bytes.chunks_exact(size);
    let array = match data_type {
        DataType::Int8 => int_array(data_type, chunks.map(|c| i32::from(c[0] as i8))),
        DataType::Uint8 => int_array(data_type, chunks.map(|c| i32::from(c[0]))),
        DataType::Int16 => int_array(
            data_type,
            chunks.map(|c| i32::from(i16::from_le_bytes([c[0], c[1]]))),
        ),
        DataType::Uint16 => int_array(
            data_type,
            chunks.map(|c| i32::from(u16::from_le_bytes([c[0], c[1]]))),
        ),
        DataType::Int32 => int_array(
            data_type,
            chunks.map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]])),
        ),
        DataType::Uint32 => int_array(
            data_type,
            chunks.map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as i32),
        ),
        DataType::Float32 => TypedArray::Float {
            data_type,
            values: chunks
                .map(|c| f64::from(f32::from_le_bytes([c[0], c[1], c[2], c[3]])))
                .collect(),
        },
        DataType::Float64 => TypedArray::Float {
            data_type,
            values: chunks
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        },
    };
    Ok(array)
}

fn int_array(data_type: DataType, values: impl Iterator<Item = i32>) -> TypedArray {
    TypedArray::Int {
        data_type,
        values: values.collect(),
    }
}
