use crate::core::io::binary::encoding::Encoding;
use std::borrow::Cow;
use std::sync::Arc;

/// Distinguishes a present value from the two CIF markers.
///
/// `.` marks a value that is not applicable and `?` marks a value that is
/// unknown. Consumers treat the three cases differently, so every field
/// accessor can report which one applies to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Present,
    NotSpecified,
    Unknown,
}

impl ValueKind {
    /// Mask code used by the binary column layout.
    pub fn mask_code(self) -> u8 {
        match self {
            ValueKind::Present => 0,
            ValueKind::NotSpecified => 1,
            ValueKind::Unknown => 2,
        }
    }

    pub fn from_mask_code(code: u8) -> Self {
        match code {
            1 => ValueKind::NotSpecified,
            2 => ValueKind::Unknown,
            _ => ValueKind::Present,
        }
    }

    fn of_text(text: &str) -> Self {
        match text {
            "." => ValueKind::NotSpecified,
            "?" => ValueKind::Unknown,
            _ => ValueKind::Present,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Present(Cow<'a, str>),
    NotSpecified,
    Unknown,
}

/// Values of a column decoded from the binary representation.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Int(Vec<i32>),
    Float(Vec<f64>),
    Str(Vec<String>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Int(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A column backed by spans into the original source text.
#[derive(Debug, Clone)]
pub struct TextField {
    data: Arc<str>,
    spans: Vec<(usize, usize)>,
}

impl TextField {
    pub(crate) fn new(data: Arc<str>, spans: Vec<(usize, usize)>) -> Self {
        Self { data, spans }
    }

    #[inline]
    fn raw(&self, row: usize) -> &str {
        let (start, end) = self.spans[row];
        &self.data[start..end]
    }
}

/// A column materialized from a binary encoded source.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryField {
    values: ColumnValues,
    mask: Option<Vec<u8>>,
    encoding: Vec<Encoding>,
}

impl BinaryField {
    pub fn new(values: ColumnValues, mask: Option<Vec<u8>>, encoding: Vec<Encoding>) -> Self {
        Self {
            values,
            mask,
            encoding,
        }
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }
}

/// A single named column of a category, addressable by row index.
#[derive(Debug, Clone)]
pub enum Field {
    Text(TextField),
    Binary(BinaryField),
}

impl Field {
    pub fn row_count(&self) -> usize {
        match self {
            Field::Text(f) => f.spans.len(),
            Field::Binary(f) => f.values.len(),
        }
    }

    pub fn value_kind(&self, row: usize) -> ValueKind {
        match self {
            Field::Text(f) => ValueKind::of_text(f.raw(row)),
            Field::Binary(f) => f
                .mask
                .as_ref()
                .map_or(ValueKind::Present, |m| ValueKind::from_mask_code(m[row])),
        }
    }

    /// The row as a string; the `.` and `?` markers read as an empty string.
    pub fn str(&self, row: usize) -> Cow<'_, str> {
        if self.value_kind(row) != ValueKind::Present {
            return Cow::Borrowed("");
        }
        match self {
            Field::Text(f) => Cow::Borrowed(f.raw(row)),
            Field::Binary(f) => match &f.values {
                ColumnValues::Str(v) => Cow::Borrowed(v[row].as_str()),
                ColumnValues::Int(v) => Cow::Owned(v[row].to_string()),
                ColumnValues::Float(v) => Cow::Owned(v[row].to_string()),
            },
        }
    }

    /// The row as an integer. Unparsable text and markers read as 0.
    pub fn int(&self, row: usize) -> i32 {
        if self.value_kind(row) != ValueKind::Present {
            return 0;
        }
        match self {
            Field::Text(f) => parse_int(f.raw(row)),
            Field::Binary(f) => match &f.values {
                ColumnValues::Int(v) => v[row],
                ColumnValues::Float(v) => v[row] as i32,
                ColumnValues::Str(v) => parse_int(&v[row]),
            },
        }
    }

    /// The row as a float. Unparsable text and markers read as 0.0.
    pub fn float(&self, row: usize) -> f64 {
        if self.value_kind(row) != ValueKind::Present {
            return 0.0;
        }
        match self {
            Field::Text(f) => parse_float(f.raw(row)),
            Field::Binary(f) => match &f.values {
                ColumnValues::Int(v) => v[row] as f64,
                ColumnValues::Float(v) => v[row],
                ColumnValues::Str(v) => parse_float(&v[row]),
            },
        }
    }

    pub fn value(&self, row: usize) -> FieldValue<'_> {
        match self.value_kind(row) {
            ValueKind::Present => FieldValue::Present(self.str(row)),
            ValueKind::NotSpecified => FieldValue::NotSpecified,
            ValueKind::Unknown => FieldValue::Unknown,
        }
    }

    /// The encoding chain the column was stored with, if it came from a binary source.
    pub fn binary_encoding(&self) -> Option<&[Encoding]> {
        match self {
            Field::Text(_) => None,
            Field::Binary(f) => Some(&f.encoding),
        }
    }

    pub fn has_markers(&self) -> bool {
        (0..self.row_count()).any(|row| self.value_kind(row) != ValueKind::Present)
    }
}

fn parse_int(text: &str) -> i32 {
    text.parse::<i32>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().map(|v| v as i32))
        .unwrap_or(0)
}

fn parse_float(text: &str) -> f64 {
    text.parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_field(source: &str, spans: Vec<(usize, usize)>) -> Field {
        Field::Text(TextField::new(Arc::from(source), spans))
    }

    #[test]
    fn text_field_distinguishes_markers_from_values() {
        let field = text_field("12 . ? abc", vec![(0, 2), (3, 4), (5, 6), (7, 10)]);
        assert_eq!(field.row_count(), 4);
        assert_eq!(field.value_kind(0), ValueKind::Present);
        assert_eq!(field.value_kind(1), ValueKind::NotSpecified);
        assert_eq!(field.value_kind(2), ValueKind::Unknown);
        assert_eq!(field.value(3), FieldValue::Present(Cow::Borrowed("abc")));
        assert_eq!(field.value(1), FieldValue::NotSpecified);
        assert_eq!(field.value(2), FieldValue::Unknown);
    }

    #[test]
    fn markers_read_as_empty_or_zero() {
        let field = text_field("? .", vec![(0, 1), (2, 3)]);
        assert_eq!(field.str(0), "");
        assert_eq!(field.int(0), 0);
        assert_eq!(field.float(1), 0.0);
        assert!(field.has_markers());
    }

    #[test]
    fn numeric_accessors_parse_text_leniently() {
        let field = text_field("42 -3.5 x1", vec![(0, 2), (3, 7), (8, 10)]);
        assert_eq!(field.int(0), 42);
        assert_eq!(field.float(1), -3.5);
        assert_eq!(field.int(1), -3);
        assert_eq!(field.int(2), 0);
    }

    #[test]
    fn binary_field_uses_mask_for_value_kind() {
        let field = Field::Binary(BinaryField::new(
            ColumnValues::Int(vec![1, 0, 3]),
            Some(vec![0, 2, 0]),
            Vec::new(),
        ));
        assert_eq!(field.value_kind(1), ValueKind::Unknown);
        assert_eq!(field.str(0), "1");
        assert_eq!(field.str(1), "");
        assert_eq!(field.float(2), 3.0);
        assert_eq!(field.binary_encoding(), Some(&[][..]));
    }
}
