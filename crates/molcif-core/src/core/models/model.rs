use super::atomic::{AtomicData, AtomicSegments, read_atom_site};
use super::data::Block;
use super::entities::Entities;
use super::ids::{AtomIndex, ChainIndex, ResidueIndex};
use crate::core::index::{AtomicIndex, IndexError, build_index};
use nalgebra::Point3;
use std::ops::Range;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Block '{0}' has no _atom_site category")]
    MissingAtomSite(String),
    #[error("Required field '{category}.{field}' is missing")]
    MissingField {
        category: &'static str,
        field: &'static str,
    },
    #[error("Failed to build the structure index: {0}")]
    Index(#[from] IndexError),
}

/// One structure: the atomic hierarchy of a data block, its entities and the
/// index over both.
#[derive(Debug, Clone)]
pub struct Model {
    pub entry_id: String,
    pub atomic: AtomicData,
    pub segments: AtomicSegments,
    pub entities: Entities,
    pub index: AtomicIndex,
}

impl Model {
    /// Reads `_atom_site` and `_entity` from `block` and indexes them.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if `_atom_site` or one of its required fields is
    /// missing, or if a chain references an unknown entity.
    #[instrument(skip_all, name = "model_from_block", fields(block = %block.header))]
    pub fn from_block(block: &Block) -> Result<Self, ModelError> {
        let atom_site = block
            .category("_atom_site")
            .ok_or_else(|| ModelError::MissingAtomSite(block.header.clone()))?;
        let (atomic, segments) = read_atom_site(atom_site)?;

        let entities = match block.category("_entity") {
            Some(category) => Entities::from_category(category)?,
            None => {
                info!("No _entity category; deriving entities from atom records");
                Entities::synthesize(&atomic.chains)
            }
        };

        let index = build_index(&atomic, &entities, &segments)?;
        Ok(Self {
            entry_id: block.header.clone(),
            atomic,
            segments,
            entities,
            index,
        })
    }

    pub fn atom_count(&self) -> usize {
        self.atomic.atom_count()
    }

    pub fn residue_count(&self) -> usize {
        self.atomic.residue_count()
    }

    pub fn chain_count(&self) -> usize {
        self.atomic.chain_count()
    }

    pub fn position(&self, atom: AtomIndex) -> Option<&Point3<f64>> {
        self.atomic.atoms.position.get(atom.0)
    }

    pub fn residue_atoms(&self, residue: ResidueIndex) -> Option<Range<usize>> {
        (residue.0 < self.residue_count()).then(|| self.segments.residue_atoms.range(residue.0))
    }

    pub fn chain_atoms(&self, chain: ChainIndex) -> Option<Range<usize>> {
        (chain.0 < self.chain_count()).then(|| self.segments.chain_atoms.range(chain.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::cif::parse;

    const NO_ENTITY: &str = "\
data_1XYZ
loop_
_atom_site.label_atom_id
_atom_site.label_comp_id
_atom_site.label_asym_id
_atom_site.label_entity_id
_atom_site.label_seq_id
_atom_site.auth_seq_id
_atom_site.auth_asym_id
_atom_site.Cartn_x
_atom_site.Cartn_y
_atom_site.Cartn_z
N  MET A 1 1 1 A 1.0 2.0 3.0
CA MET A 1 1 1 A 2.0 2.0 3.0
N  LYS A 1 2 2 A 3.0 2.0 3.0
ZN ZN  B 2 . 300 A 9.0 9.0 9.0
";

    #[test]
    fn model_is_built_with_synthesized_entities() {
        let file = parse(NO_ENTITY).unwrap();
        let model = Model::from_block(&file.blocks[0]).unwrap();
        assert_eq!(model.entry_id, "1XYZ");
        assert_eq!(model.atom_count(), 4);
        assert_eq!(model.residue_count(), 3);
        assert_eq!(model.chain_count(), 2);
        assert_eq!(model.entities.len(), 2);
        assert_eq!(model.residue_atoms(ResidueIndex(0)), Some(0..2));
        assert_eq!(model.residue_atoms(ResidueIndex(3)), None);
        assert_eq!(model.chain_atoms(ChainIndex(1)), Some(3..4));
        assert_eq!(model.position(AtomIndex(1)), Some(&Point3::new(2.0, 2.0, 3.0)));
    }

    #[test]
    fn shared_auth_chain_resolves_to_the_first_label_chain() {
        let file = parse(NO_ENTITY).unwrap();
        let model = Model::from_block(&file.blocks[0]).unwrap();
        assert_eq!(model.index.find_residue_auth("A", 2, None), Some(ResidueIndex(1)));
        assert_eq!(model.index.find_residue_auth("A", 300, None), None);
        assert_eq!(model.index.find_residue("2", "B", 300, None), Some(ResidueIndex(2)));
    }

    #[test]
    fn block_without_atoms_is_rejected() {
        let file = parse("data_empty\n_cell.length_a 10\n").unwrap();
        assert_eq!(
            Model::from_block(&file.blocks[0]).unwrap_err(),
            ModelError::MissingAtomSite("empty".into())
        );
    }

    #[test]
    fn index_failures_are_wrapped() {
        let text = format!("{NO_ENTITY}loop_\n_entity.id\n1\n");
        let file = parse(&text).unwrap();
        assert_eq!(
            Model::from_block(&file.blocks[0]).unwrap_err(),
            ModelError::Index(IndexError::MissingEntity {
                entity_id: "2".into()
            })
        );
    }
}
