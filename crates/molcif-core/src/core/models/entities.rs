use super::atomic::ChainTable;
use super::data::Category;
use super::ids::EntityIndex;
use super::model::ModelError;
use std::collections::HashMap;

/// The `_entity` table with an id lookup.
#[derive(Debug, Clone, Default)]
pub struct Entities {
    ids: Vec<String>,
    kinds: Vec<String>,
    lookup: HashMap<String, EntityIndex>,
}

impl Entities {
    fn push(&mut self, id: String, kind: String) {
        if self.lookup.contains_key(&id) {
            return;
        }
        self.lookup.insert(id.clone(), EntityIndex(self.ids.len()));
        self.ids.push(id);
        self.kinds.push(kind);
    }

    /// Reads `_entity.id` and `_entity.type`. Repeated ids keep their first row.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingField`] if the category has no `id` column.
    pub fn from_category(category: &Category) -> Result<Self, ModelError> {
        let id = category.field("id").ok_or(ModelError::MissingField {
            category: "_entity",
            field: "id",
        })?;
        let kind = category.field("type");
        let mut entities = Self::default();
        for row in 0..category.row_count() {
            entities.push(
                id.str(row).into_owned(),
                kind.map(|k| k.str(row).into_owned()).unwrap_or_default(),
            );
        }
        Ok(entities)
    }

    /// One entity per distinct `label_entity_id`, in chain order. Used when a
    /// file has no `_entity` category.
    pub fn synthesize(chains: &ChainTable) -> Self {
        let mut entities = Self::default();
        for id in &chains.label_entity_id {
            entities.push(id.clone(), String::new());
        }
        entities
    }

    pub fn entity_index(&self, id: &str) -> Option<EntityIndex> {
        self.lookup.get(id).copied()
    }

    pub fn id(&self, entity: EntityIndex) -> Option<&str> {
        self.ids.get(entity.0).map(String::as_str)
    }

    /// The `_entity.type` value; empty for synthesized entities.
    pub fn kind(&self, entity: EntityIndex) -> Option<&str> {
        self.kinds.get(entity.0).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::cif::parse;

    #[test]
    fn entity_category_is_indexed_in_row_order() {
        let file = parse("data_x\nloop_\n_entity.id\n_entity.type\n1 polymer\n2 water\n1 dup\n").unwrap();
        let entities = Entities::from_category(file.blocks[0].category("_entity").unwrap()).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities.entity_index("2"), Some(EntityIndex(1)));
        assert_eq!(entities.kind(EntityIndex(0)), Some("polymer"));
        assert_eq!(entities.entity_index("3"), None);
    }

    #[test]
    fn missing_entities_are_synthesized_from_chains() {
        let chains = ChainTable {
            label_entity_id: vec!["1".into(), "2".into(), "1".into()],
            label_asym_id: vec!["A".into(), "B".into(), "C".into()],
            auth_asym_id: vec!["A".into(), "B".into(), "C".into()],
        };
        let entities = Entities::synthesize(&chains);
        assert_eq!(entities.len(), 2);
        assert_eq!(entities.id(EntityIndex(1)), Some("2"));
        assert_eq!(entities.kind(EntityIndex(0)), Some(""));
    }

    #[test]
    fn entity_without_id_column_is_rejected() {
        let file = parse("data_x\n_entity.type polymer\n").unwrap();
        let err = Entities::from_category(file.blocks[0].category("_entity").unwrap()).unwrap_err();
        assert!(matches!(err, ModelError::MissingField { category: "_entity", field: "id" }));
    }
}
