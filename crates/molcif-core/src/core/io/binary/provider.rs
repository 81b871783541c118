use super::column::ColumnPlan;
use super::encoding::Encoding;
use super::presets::preset;
use crate::core::models::data::CifFile;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Supplies a column plan for a `category.field` pair when the encoder has
/// better knowledge than its own defaults.
pub trait EncodingProvider: Send + Sync {
    fn plan(&self, category: &str, field: &str) -> Option<ColumnPlan>;
}

/// Asks each provider in turn; the first plan wins.
impl EncodingProvider for Vec<Arc<dyn EncodingProvider>> {
    fn plan(&self, category: &str, field: &str) -> Option<ColumnPlan> {
        self.iter().find_map(|provider| provider.plan(category, field))
    }
}

/// Replays the encodings observed in a decoded binary file.
#[derive(Debug, Clone, Default)]
pub struct FileEncodingProvider {
    chains: HashMap<String, Vec<Encoding>>,
}

fn column_key(category: &str, field: &str) -> String {
    format!("{category}.{field}")
}

impl FileEncodingProvider {
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl EncodingProvider for FileEncodingProvider {
    fn plan(&self, category: &str, field: &str) -> Option<ColumnPlan> {
        self.chains
            .get(&column_key(category, field))
            .and_then(|chain| ColumnPlan::from_encoding(chain))
    }
}

/// Collects the encoding chain of every binary field in `file`. Text fields
/// contribute nothing.
pub fn encoding_provider_from_file(file: &CifFile) -> FileEncodingProvider {
    let mut chains = HashMap::new();
    for block in &file.blocks {
        for category in block.categories() {
            for (name, field) in category.fields() {
                if let Some(chain) = field.binary_encoding() {
                    chains
                        .entry(column_key(&category.name, name))
                        .or_insert_with(|| chain.to_vec());
                }
            }
        }
    }
    FileEncodingProvider { chains }
}

#[derive(Debug, Error)]
pub enum HintsError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Unknown encoding preset '{preset}' for column '{column}'")]
    UnknownPreset { column: String, preset: String },
    #[error("Column '{0}' must be written as '_category.field'")]
    InvalidColumn(String),
}

/// Preset names per column, e.g. `"_atom_site.Cartn_x" = "fixed-point-3"`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncodingHints {
    #[serde(default)]
    columns: HashMap<String, String>,
}

impl EncodingHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, HintsError> {
        let content = std::fs::read_to_string(path).map_err(|e| HintsError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let hints: EncodingHints = toml::from_str(&content).map_err(|e| HintsError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        for (column, name) in &hints.columns {
            Self::validate(column, name)?;
        }
        Ok(hints)
    }

    /// Assigns a preset to a `_category.field` column.
    pub fn insert(&mut self, column: &str, preset_name: &str) -> Result<(), HintsError> {
        Self::validate(column, preset_name)?;
        self.columns
            .insert(column.to_string(), preset_name.to_string());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn validate(column: &str, preset_name: &str) -> Result<(), HintsError> {
        if !column.starts_with('_') || !column.contains('.') {
            return Err(HintsError::InvalidColumn(column.to_string()));
        }
        if preset(preset_name).is_none() {
            return Err(HintsError::UnknownPreset {
                column: column.to_string(),
                preset: preset_name.to_string(),
            });
        }
        Ok(())
    }
}

impl EncodingProvider for EncodingHints {
    fn plan(&self, category: &str, field: &str) -> Option<ColumnPlan> {
        self.columns
            .get(&column_key(category, field))
            .and_then(|name| preset(name))
            .map(ColumnPlan::from_stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::binary::codec::Stage;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn hints_load_from_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[columns]\n\"_atom_site.Cartn_x\" = \"fixed-point-3\"\n\"_atom_site.id\" = \"delta-rle\""
        )
        .unwrap();
        let hints = EncodingHints::load(file.path()).unwrap();
        assert_eq!(
            hints.plan("_atom_site", "Cartn_x"),
            Some(ColumnPlan::Float(vec![
                Stage::FixedPoint { factor: 1000.0 },
                Stage::Delta,
                Stage::IntegerPacking
            ]))
        );
        assert!(matches!(
            hints.plan("_atom_site", "id"),
            Some(ColumnPlan::Int(_))
        ));
        assert_eq!(hints.plan("_atom_site", "type_symbol"), None);
    }

    #[test]
    fn unknown_presets_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[columns]\n\"_a.b\" = \"gzip\"").unwrap();
        assert!(matches!(
            EncodingHints::load(file.path()),
            Err(HintsError::UnknownPreset { .. })
        ));

        let mut hints = EncodingHints::new();
        assert!(matches!(
            hints.insert("atom_site", "pack"),
            Err(HintsError::InvalidColumn(_))
        ));
        hints.insert("_a.b", "pack").unwrap();
        assert!(!hints.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "colums = 1").unwrap();
        assert!(matches!(
            EncodingHints::load(file.path()),
            Err(HintsError::Toml { .. })
        ));
    }

    #[test]
    fn chained_providers_take_the_first_plan() {
        let mut first = EncodingHints::new();
        first.insert("_a.x", "pack").unwrap();
        let mut second = EncodingHints::new();
        second.insert("_a.x", "rle").unwrap();
        second.insert("_a.y", "fixed-point-2").unwrap();

        let chain: Vec<Arc<dyn EncodingProvider>> = vec![Arc::new(first), Arc::new(second)];
        assert_eq!(
            chain.plan("_a", "x"),
            Some(ColumnPlan::Int(vec![Stage::IntegerPacking]))
        );
        assert!(matches!(chain.plan("_a", "y"), Some(ColumnPlan::Float(_))));
        assert_eq!(chain.plan("_a", "z"), None);
    }
}
