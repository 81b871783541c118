use super::field::Field;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CategoryError {
    #[error("Field '{field}' has {actual} rows but category '{category}' has {expected}")]
    RowCountMismatch {
        category: String,
        field: String,
        expected: usize,
        actual: usize,
    },
}

/// A named table of equally long columns.
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    row_count: usize,
    field_names: Vec<String>,
    fields: Vec<Field>,
    lookup: HashMap<String, usize>,
}

impl Category {
    pub fn new(name: impl Into<String>, row_count: usize) -> Self {
        Self {
            name: name.into(),
            row_count,
            field_names: Vec::new(),
            fields: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Adds a column, replacing an earlier column of the same name in place.
    ///
    /// # Errors
    ///
    /// Returns [`CategoryError::RowCountMismatch`] if the field length differs
    /// from the category row count.
    pub fn add_field(&mut self, name: impl Into<String>, field: Field) -> Result<(), CategoryError> {
        let name = name.into();
        if field.row_count() != self.row_count {
            return Err(CategoryError::RowCountMismatch {
                category: self.name.clone(),
                field: name,
                expected: self.row_count,
                actual: field.row_count(),
            });
        }
        self.push_field(name, field);
        Ok(())
    }

    /// Adds a column whose length the caller has already checked.
    pub(crate) fn push_field(&mut self, name: String, field: Field) {
        debug_assert_eq!(field.row_count(), self.row_count);
        match self.lookup.get(&name) {
            Some(&idx) => self.fields[idx] = field,
            None => {
                self.lookup.insert(name.clone(), self.fields.len());
                self.field_names.push(name);
                self.fields.push(field);
            }
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.lookup.get(name).map(|&idx| &self.fields[idx])
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Iterates `(name, field)` pairs in source order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.field_names
            .iter()
            .map(String::as_str)
            .zip(self.fields.iter())
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// A `data_` block and its categories in order of appearance.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub header: String,
    categories: Vec<Category>,
    lookup: HashMap<String, usize>,
}

impl Block {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Default::default()
        }
    }

    /// Inserts a category. A repeated name overwrites the earlier category.
    pub fn insert_category(&mut self, category: Category) {
        match self.lookup.get(&category.name) {
            Some(&idx) => self.categories[idx] = category,
            None => {
                self.lookup
                    .insert(category.name.clone(), self.categories.len());
                self.categories.push(category);
            }
        }
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.lookup.get(name).map(|&idx| &self.categories[idx])
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// A parsed or decoded CIF file.
#[derive(Debug, Clone, Default)]
pub struct CifFile {
    pub blocks: Vec<Block>,
}

impl CifFile {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn block(&self, header: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.header == header)
    }
}
