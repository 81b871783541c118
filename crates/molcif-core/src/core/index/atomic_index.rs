use super::keys::ResidueKey;
use super::sorted::find_predecessor_index;
use crate::core::models::atomic::{AtomicData, AtomicSegments};
use crate::core::models::entities::Entities;
use crate::core::models::ids::{ChainIndex, EntityIndex, ResidueIndex};
use std::collections::HashMap;
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Missing entity entry for entity id '{entity_id}'")]
    MissingEntity { entity_id: String },
}

/// Chain and residue lookup tables of one model. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct AtomicIndex {
    entities: Entities,
    chain_entity: Vec<EntityIndex>,
    entity_label_asym: HashMap<EntityIndex, HashMap<String, ChainIndex>>,
    auth_asym: HashMap<String, ChainIndex>,
    chain_label_seq: Vec<HashMap<ResidueKey, ResidueIndex>>,
    chain_auth_seq: Vec<HashMap<ResidueKey, ResidueIndex>>,
    /// `label_seq_id` per residue; ascending within each chain.
    label_seq_ids: Vec<i32>,
    chain_residues: Vec<Range<usize>>,
}

/// Builds the index with one forward pass over the chain segments and, per
/// chain, its residue segments.
///
/// The first chain seen for an `auth_asym_id` (or an entity and
/// `label_asym_id` pair) wins.
///
/// # Errors
///
/// Returns [`IndexError::MissingEntity`] if a chain names an entity id that
/// `entities` does not contain. No partial index is produced.
#[instrument(skip_all, name = "build_index")]
pub fn build_index(
    data: &AtomicData,
    entities: &Entities,
    segments: &AtomicSegments,
) -> Result<AtomicIndex, IndexError> {
    let chain_count = segments.chain_atoms.count();
    let mut index = AtomicIndex {
        entities: entities.clone(),
        chain_entity: Vec::with_capacity(chain_count),
        entity_label_asym: HashMap::new(),
        auth_asym: HashMap::new(),
        chain_label_seq: Vec::with_capacity(chain_count),
        chain_auth_seq: Vec::with_capacity(chain_count),
        label_seq_ids: data.residues.label_seq_id.clone(),
        chain_residues: Vec::with_capacity(chain_count),
    };

    let residues = &data.residues;
    for chain in 0..chain_count {
        let chain_index = ChainIndex(chain);
        let entity_id = &data.chains.label_entity_id[chain];
        let entity = entities
            .entity_index(entity_id)
            .ok_or_else(|| IndexError::MissingEntity {
                entity_id: entity_id.clone(),
            })?;
        index.chain_entity.push(entity);

        index
            .auth_asym
            .entry(data.chains.auth_asym_id[chain].clone())
            .or_insert(chain_index);
        index
            .entity_label_asym
            .entry(entity)
            .or_default()
            .entry(data.chains.label_asym_id[chain].clone())
            .or_insert(chain_index);

        let range = segments.chain_residues.range(chain);
        let mut by_label = HashMap::with_capacity(range.len());
        let mut by_auth = HashMap::with_capacity(range.len());
        for residue in range.clone() {
            let ins_code = residues.ins_code[residue].as_str();
            by_label.insert(
                ResidueKey::new(residues.label_seq_id[residue], ins_code),
                ResidueIndex(residue),
            );
            by_auth.insert(
                ResidueKey::new(residues.auth_seq_id[residue], ins_code),
                ResidueIndex(residue),
            );
        }
        index.chain_label_seq.push(by_label);
        index.chain_auth_seq.push(by_auth);
        index.chain_residues.push(range);
    }

    debug!(
        chains = chain_count,
        residues = index.label_seq_ids.len(),
        "Built structure index"
    );
    Ok(index)
}

impl AtomicIndex {
    pub fn entity_of_chain(&self, chain: ChainIndex) -> Option<EntityIndex> {
        self.chain_entity.get(chain.0).copied()
    }

    pub fn chain_count(&self) -> usize {
        self.chain_entity.len()
    }

    pub fn find_chain_by_label(&self, entity_id: &str, label_asym_id: &str) -> Option<ChainIndex> {
        let entity = self.entities.entity_index(entity_id)?;
        self.entity_label_asym
            .get(&entity)?
            .get(label_asym_id)
            .copied()
    }

    pub fn find_chain_by_auth(&self, auth_asym_id: &str) -> Option<ChainIndex> {
        self.auth_asym.get(auth_asym_id).copied()
    }

    /// Resolves a residue by its label chain and author sequence number.
    pub fn find_residue(
        &self,
        entity_id: &str,
        label_asym_id: &str,
        auth_seq_id: i32,
        ins_code: Option<&str>,
    ) -> Option<ResidueIndex> {
        let chain = self.find_chain_by_label(entity_id, label_asym_id)?;
        let key = ResidueKey::new(auth_seq_id, ins_code.unwrap_or(""));
        self.chain_auth_seq[chain.0].get(&key).copied()
    }

    pub fn find_residue_auth(
        &self,
        auth_asym_id: &str,
        auth_seq_id: i32,
        ins_code: Option<&str>,
    ) -> Option<ResidueIndex> {
        let chain = self.find_chain_by_auth(auth_asym_id)?;
        let key = ResidueKey::new(auth_seq_id, ins_code.unwrap_or(""));
        self.chain_auth_seq[chain.0].get(&key).copied()
    }

    /// Resolves a residue by label sequence number. Without an exact match the
    /// nearest preceding residue of the same chain is returned, or the chain's
    /// first residue when none precedes the query.
    pub fn find_residue_insertion(
        &self,
        entity_id: &str,
        label_asym_id: &str,
        label_seq_id: i32,
        ins_code: Option<&str>,
    ) -> Option<ResidueIndex> {
        let chain = self.find_chain_by_label(entity_id, label_asym_id)?;
        let key = ResidueKey::new(label_seq_id, ins_code.unwrap_or(""));
        if let Some(&residue) = self.chain_label_seq[chain.0].get(&key) {
            return Some(residue);
        }

        let range = self.chain_residues[chain.0].clone();
        let local = find_predecessor_index(&self.label_seq_ids[range.clone()], label_seq_id);
        let residue = match local {
            Some(offset) => (range.start + offset).min(range.end - 1),
            None => range.start,
        };
        Some(ResidueIndex(residue))
    }

    pub fn chain_residues(&self, chain: ChainIndex) -> Option<Range<usize>> {
        self.chain_residues.get(chain.0).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::cif::parse;
    use crate::core::models::atomic::read_atom_site;

    const STRUCTURE: &str = "\
data_test
loop_
_entity.id
_entity.type
1 polymer
2 water
loop_
_atom_site.label_asym_id
_atom_site.label_entity_id
_atom_site.label_seq_id
_atom_site.auth_seq_id
_atom_site.pdbx_PDB_ins_code
_atom_site.auth_asym_id
_atom_site.Cartn_x
_atom_site.Cartn_y
_atom_site.Cartn_z
A 1 1 101 ? P 0 0 0
A 1 2 102 ? P 0 0 0
A 1 2 102 ? P 0 0 0
A 1 3 102 A P 0 0 0
B 1 5 5 ? Q 0 0 0
B 1 8 8 ? Q 0 0 0
B 1 12 12 ? Q 0 0 0
C 2 . 501 ? P 0 0 0
";

    fn build(text: &str) -> Result<AtomicIndex, IndexError> {
        let file = parse(text).unwrap();
        let block = &file.blocks[0];
        let (data, segments) = read_atom_site(block.category("_atom_site").unwrap()).unwrap();
        let entities = Entities::from_category(block.category("_entity").unwrap()).unwrap();
        build_index(&data, &entities, &segments)
    }

    mod build {
        use super::*;

        #[test]
        fn chains_are_numbered_in_scan_order() {
            let index = build(STRUCTURE).unwrap();
            assert_eq!(index.chain_count(), 3);
            assert_eq!(index.entity_of_chain(ChainIndex(0)), Some(EntityIndex(0)));
            assert_eq!(index.entity_of_chain(ChainIndex(2)), Some(EntityIndex(1)));
            assert_eq!(index.entity_of_chain(ChainIndex(3)), None);
            assert_eq!(index.chain_residues(ChainIndex(1)), Some(3..6));
        }

        #[test]
        fn unknown_entity_fails_the_whole_build() {
            let text = STRUCTURE.replace("C 2 . 501", "C 3 . 501");
            assert_eq!(
                build(&text).unwrap_err(),
                IndexError::MissingEntity {
                    entity_id: "3".into()
                }
            );
        }
    }

    mod chains {
        use super::*;

        #[test]
        fn first_auth_asym_id_occurrence_wins() {
            let index = build(STRUCTURE).unwrap();
            assert_eq!(index.find_chain_by_auth("P"), Some(ChainIndex(0)));
            assert_eq!(index.find_chain_by_auth("Q"), Some(ChainIndex(1)));
            assert_eq!(index.find_chain_by_auth("Z"), None);
        }

        #[test]
        fn label_lookup_needs_the_matching_entity() {
            let index = build(STRUCTURE).unwrap();
            assert_eq!(index.find_chain_by_label("1", "B"), Some(ChainIndex(1)));
            assert_eq!(index.find_chain_by_label("2", "C"), Some(ChainIndex(2)));
            assert_eq!(index.find_chain_by_label("2", "A"), None);
            assert_eq!(index.find_chain_by_label("9", "A"), None);
        }
    }

    mod residues {
        use super::*;

        #[test]
        fn residues_resolve_by_author_numbering() {
            let index = build(STRUCTURE).unwrap();
            assert_eq!(index.find_residue("1", "A", 102, None), Some(ResidueIndex(1)));
            assert_eq!(index.find_residue("1", "A", 102, Some("A")), Some(ResidueIndex(2)));
            assert_eq!(index.find_residue_auth("Q", 8, None), Some(ResidueIndex(4)));
            assert_eq!(index.find_residue_auth("P", 501, None), None);
        }

        #[test]
        fn misses_are_reported_without_failing() {
            let index = build(STRUCTURE).unwrap();
            assert_eq!(index.find_residue("1", "A", 999, None), None);
            assert_eq!(index.find_residue("1", "A", 102, Some("Z")), None);
            assert_eq!(index.find_residue_auth("Z", 1, None), None);
            assert_eq!(index.find_residue_insertion("1", "Z", 1, None), None);
        }

        #[test]
        fn insertion_lookup_falls_back_to_the_nearest_predecessor() {
            let index = build(STRUCTURE).unwrap();
            assert_eq!(index.find_residue_insertion("1", "B", 8, None), Some(ResidueIndex(4)));
            assert_eq!(index.find_residue_insertion("1", "B", 10, None), Some(ResidueIndex(4)));
        }

        #[test]
        fn insertion_fallback_stays_inside_the_chain() {
            let index = build(STRUCTURE).unwrap();
            assert_eq!(index.find_residue_insertion("1", "B", 2, None), Some(ResidueIndex(3)));
            assert_eq!(index.find_residue_insertion("1", "B", 100, None), Some(ResidueIndex(5)));
            assert_eq!(index.find_residue_insertion("1", "A", 50, None), Some(ResidueIndex(2)));
        }
    }
}
