use super::Encoder;
use crate::core::io::binary::EncodeError;
use crate::core::models::data::Category;
use crate::core::models::field::{Field, FieldValue};

/// Writes CIF text: one `data_` header per block, key-value pairs for
/// single-row categories and `loop_` tables for everything else.
#[derive(Debug, Default)]
pub struct TextEncoder {
    out: String,
    has_block: bool,
}

impl TextEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_single(&mut self, category: &Category) {
        let width = category
            .field_names()
            .iter()
            .map(|name| category.name.len() + 1 + name.len())
            .max()
            .unwrap_or(0);
        for (name, field) in category.fields() {
            let column = format!("{}.{}", category.name, name);
            match format_value(field, 0) {
                Formatted::Inline(value) => {
                    self.out.push_str(&format!("{column:<width$} {value}\n"));
                }
                Formatted::Multiline(value) => {
                    self.out.push_str(&format!("{column}\n;{value}\n;\n"));
                }
            }
        }
    }

    fn write_loop(&mut self, category: &Category) {
        self.out.push_str("loop_\n");
        for name in category.field_names() {
            self.out.push_str(&format!("{}.{}\n", category.name, name));
        }
        for row in 0..category.row_count() {
            let mut line_start = true;
            for (_, field) in category.fields() {
                match format_value(field, row) {
                    Formatted::Inline(value) => {
                        if !line_start {
                            self.out.push(' ');
                        }
                        self.out.push_str(&value);
                        line_start = false;
                    }
                    Formatted::Multiline(value) => {
                        if !line_start {
                            self.out.push('\n');
                        }
                        self.out.push_str(&format!(";{value}\n;\n"));
                        line_start = true;
                    }
                }
            }
            if !line_start {
                self.out.push('\n');
            }
        }
    }
}

impl Encoder for TextEncoder {
    fn start_block(&mut self, header: &str) {
        self.out.push_str(&format!("data_{header}\n#\n"));
        self.has_block = true;
    }

    fn write_category(&mut self, category: &Category) -> Result<(), EncodeError> {
        if !self.has_block {
            self.start_block("");
        }
        if category.field_count() == 0 {
            return Ok(());
        }
        if category.row_count() == 1 {
            self.write_single(category);
        } else {
            self.write_loop(category);
        }
        self.out.push_str("#\n");
        Ok(())
    }

    fn into_bytes(self: Box<Self>) -> Vec<u8> {
        self.out.into_bytes()
    }
}

enum Formatted {
    Inline(String),
    Multiline(String),
}

fn format_value(field: &Field, row: usize) -> Formatted {
    let text = match field.value(row) {
        FieldValue::NotSpecified => return Formatted::Inline(".".to_string()),
        FieldValue::Unknown => return Formatted::Inline("?".to_string()),
        FieldValue::Present(text) => text,
    };

    if text.contains(['\n', '\r']) {
        return Formatted::Multiline(text.into_owned());
    }
    if !needs_quotes(&text) {
        return Formatted::Inline(text.into_owned());
    }
    for quote in ['\'', '"'] {
        if !closes_early(&text, quote) {
            return Formatted::Inline(format!("{quote}{text}{quote}"));
        }
    }
    Formatted::Multiline(text.into_owned())
}

fn needs_quotes(text: &str) -> bool {
    let Some(first) = text.chars().next() else {
        return true;
    };
    if matches!(first, '_' | '#' | '$' | '\'' | '"' | ';' | '[' | ']') {
        return true;
    }
    if text.contains([' ', '\t']) {
        return true;
    }
    let bytes = text.as_bytes();
    let has_prefix = |prefix: &[u8]| {
        bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix)
    };
    has_prefix(b"data_")
        || has_prefix(b"save_")
        || has_prefix(b"loop_")
        || has_prefix(b"stop_")
        || has_prefix(b"global_")
}

/// A quote only ends a quoted value when whitespace follows it.
fn closes_early(text: &str, quote: char) -> bool {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == quote && matches!(chars.peek(), Some(' ' | '\t')) {
            return true;
        }
    }
    false
}
