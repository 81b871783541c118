use super::error::{CifError, CifParseErrorKind};
use super::tokenizer::{Token, TokenKind, Tokenizer, is_in_namespace, namespace_end};
use crate::core::models::data::Category;
use crate::core::models::field::{Field, TextField};
use std::sync::Arc;

const DEFAULT_ROW_ESTIMATE: usize = 32;

pub(crate) fn unexpected(tokenizer: &Tokenizer<'_>, token: Token, expected: &'static str) -> CifError {
    let found = match token.kind {
        TokenKind::End => "end of input".to_string(),
        _ => tokenizer.text(token).to_string(),
    };
    CifError::parse(
        token.line,
        CifParseErrorKind::UnexpectedToken { expected, found },
    )
}

fn check_terminated(token: Token, strict: bool) -> Result<(), CifError> {
    if strict && token.malformed {
        return Err(CifError::parse(
            token.line,
            CifParseErrorKind::UnterminatedValue,
        ));
    }
    Ok(())
}

fn field_name<'a>(column: &'a str, namespace: &str) -> &'a str {
    column.get(namespace.len() + 1..).unwrap_or("")
}

fn category_name(column: &str) -> &str {
    &column[..namespace_end(column)]
}

/// Reads `_name.field value` pairs sharing the namespace of the current column name.
pub(crate) fn read_single_row(
    tokenizer: &mut Tokenizer<'_>,
    source: &Arc<str>,
    strict: bool,
) -> Result<Category, CifError> {
    let namespace = category_name(tokenizer.current_text());
    let mut category = Category::new(namespace, 1);

    while tokenizer.token().kind == TokenKind::ColumnName
        && is_in_namespace(tokenizer.current_text(), namespace)
    {
        let name = field_name(tokenizer.current_text(), namespace);
        let value = tokenizer.move_next();
        if value.kind != TokenKind::Value {
            return Err(unexpected(tokenizer, value, "a value"));
        }
        check_terminated(value, strict)?;
        category.push_field(
            name.to_string(),
            Field::Text(TextField::new(
                Arc::clone(source),
                vec![(value.start, value.end)],
            )),
        );
        tokenizer.move_next();
    }

    Ok(category)
}

/// A `loop_` whose values may be read over several steps.
#[derive(Debug)]
pub(crate) struct LoopReadState {
    category: String,
    loop_line: usize,
    field_names: Vec<String>,
    spans: Vec<Vec<(usize, usize)>>,
    value_count: usize,
}

impl LoopReadState {
    /// Consumes the `loop_` keyword and the column names after it.
    pub(crate) fn begin(tokenizer: &mut Tokenizer<'_>) -> Self {
        let loop_line = tokenizer.token().line;
        tokenizer.move_next();

        let namespace = match tokenizer.token().kind {
            TokenKind::ColumnName => category_name(tokenizer.current_text()),
            _ => "",
        };
        let mut field_names = Vec::new();
        while tokenizer.token().kind == TokenKind::ColumnName {
            field_names.push(field_name(tokenizer.current_text(), namespace).to_string());
            tokenizer.move_next();
        }

        let capacity = estimate_rows(namespace, tokenizer.data().len());
        let spans = field_names
            .iter()
            .map(|_| Vec::with_capacity(capacity))
            .collect();

        Self {
            category: namespace.to_string(),
            loop_line,
            field_names,
            spans,
            value_count: 0,
        }
    }

    /// Reads at most `budget` values round-robin into the column buffers.
    /// Returns the number of values read.
    pub(crate) fn read_values(
        &mut self,
        tokenizer: &mut Tokenizer<'_>,
        budget: usize,
        strict: bool,
    ) -> Result<usize, CifError> {
        let field_count = self.spans.len();
        let mut read = 0;
        while read < budget {
            let token = tokenizer.token();
            if token.kind != TokenKind::Value {
                break;
            }
            check_terminated(token, strict)?;
            if field_count > 0 {
                self.spans[self.value_count % field_count].push((token.start, token.end));
            }
            self.value_count += 1;
            read += 1;
            tokenizer.move_next();
        }
        Ok(read)
    }

    /// Builds the category once all values are read. A loop without columns
    /// is an arity error even when it has no values.
    pub(crate) fn finish(self, source: &Arc<str>) -> Result<Category, CifError> {
        let field_count = self.field_names.len();
        if field_count == 0 || self.value_count % field_count != 0 {
            return Err(CifError::parse(
                self.loop_line,
                CifParseErrorKind::LoopArity {
                    loop_line: self.loop_line,
                    value_count: self.value_count,
                    field_count,
                },
            ));
        }

        let mut category = Category::new(self.category, self.value_count / field_count);
        for (name, spans) in self.field_names.into_iter().zip(self.spans) {
            category.push_field(name, Field::Text(TextField::new(Arc::clone(source), spans)));
        }
        Ok(category)
    }
}

/// Capacity hint for the column buffers; `_atom_site` usually dominates a file.
fn estimate_rows(namespace: &str, input_len: usize) -> usize {
    if namespace == "_atom_site" {
        (input_len / 100).max(DEFAULT_ROW_ESTIMATE)
    } else {
        DEFAULT_ROW_ESTIMATE
    }
}
