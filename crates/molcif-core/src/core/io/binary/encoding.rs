use super::error::DecodeError;
use serde::{Deserialize, Serialize};

/// Element type of a typed array as stored in binary CIF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint16,
    Uint32,
    Float32,
    Float64,
}

impl DataType {
    pub fn code(self) -> u8 {
        match self {
            DataType::Int8 => 1,
            DataType::Int16 => 2,
            DataType::Int32 => 3,
            DataType::Uint8 => 4,
            DataType::Uint16 => 5,
            DataType::Uint32 => 6,
            DataType::Float32 => 32,
            DataType::Float64 => 33,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, DecodeError> {
        Ok(match code {
            1 => DataType::Int8,
            2 => DataType::Int16,
            3 => DataType::Int32,
            4 => DataType::Uint8,
            5 => DataType::Uint16,
            6 => DataType::Uint32,
            32 => DataType::Float32,
            33 => DataType::Float64,
            _ => return Err(DecodeError::UnknownDataType(code)),
        })
    }

    pub fn byte_size(self) -> usize {
        match self {
            DataType::Int8 | DataType::Uint8 => 1,
            DataType::Int16 | DataType::Uint16 => 2,
            DataType::Int32 | DataType::Uint32 | DataType::Float32 => 4,
            DataType::Float64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }
}

/// One transform applied to a column, with the parameters needed to undo it.
///
/// A column stores its descriptors in the order they were applied; decoding
/// walks them from last to first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Encoding {
    /// Terminal stage: the typed array serialized as little-endian bytes.
    ByteArray { data_type: DataType },
    FixedPoint { factor: f64, src_type: DataType },
    RunLength { src_type: DataType, src_size: usize },
    Delta { origin: i32, src_type: DataType },
    IntegerPacking {
        byte_count: u8,
        is_unsigned: bool,
        src_size: usize,
    },
    /// Strings as a de-duplicated table; the column data holds per-row indices.
    StringArray {
        data_encoding: Vec<Encoding>,
        string_data: String,
        offset_encoding: Vec<Encoding>,
        offsets: Vec<u8>,
    },
}

impl Encoding {
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::ByteArray { .. } => "byte-array",
            Encoding::FixedPoint { .. } => "fixed-point",
            Encoding::RunLength { .. } => "run-length",
            Encoding::Delta { .. } => "delta",
            Encoding::IntegerPacking { .. } => "integer-packing",
            Encoding::StringArray { .. } => "string-array",
        }
    }

    /// Element count this stage restores when it is undone, if it records one.
    pub fn src_size(&self) -> Option<usize> {
        match self {
            Encoding::RunLength { src_size, .. } | Encoding::IntegerPacking { src_size, .. } => {
                Some(*src_size)
            }
            _ => None,
        }
    }
}

/// A typed numeric array. Integer element types share an `i32` buffer,
/// float element types an `f64` buffer; `data_type` decides the byte layout.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
    Int { data_type: DataType, values: Vec<i32> },
    Float { data_type: DataType, values: Vec<f64> },
}

impl TypedArray {
    pub fn int32(values: Vec<i32>) -> Self {
        TypedArray::Int {
            data_type: DataType::Int32,
            values,
        }
    }

    pub fn float64(values: Vec<f64>) -> Self {
        TypedArray::Float {
            data_type: DataType::Float64,
            values,
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            TypedArray::Int { data_type, .. } | TypedArray::Float { data_type, .. } => *data_type,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedArray::Int { values, .. } => values.len(),
            TypedArray::Float { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn describe(&self) -> &'static str {
        match self {
            TypedArray::Int { .. } => "integer data",
            TypedArray::Float { .. } => "float data",
        }
    }
}

/// Encoded bytes together with the descriptor chain that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedData {
    pub encoding: Vec<Encoding>,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_codes_match_binary_cif() {
        for data_type in [
            DataType::Int8,
            DataType::Int16,
            DataType::Int32,
            DataType::Uint8,
            DataType::Uint16,
            DataType::Uint32,
            DataType::Float32,
            DataType::Float64,
        ] {
            assert_eq!(DataType::from_code(data_type.code()).unwrap(), data_type);
        }
        assert_eq!(DataType::Float32.code(), 32);
        assert_eq!(DataType::Uint8.code(), 4);
        assert_eq!(DataType::from_code(7), Err(DecodeError::UnknownDataType(7)));
    }

    #[test]
    fn encodings_serialize_with_kind_tag() {
        let encoding = Encoding::FixedPoint {
            factor: 1000.0,
            src_type: DataType::Float32,
        };
        let json = serde_json::to_string(&encoding).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"fixed-point","factor":1000.0,"src_type":"float32"}"#
        );
    }
}
