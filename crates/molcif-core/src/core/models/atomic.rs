use super::data::Category;
use super::field::Field;
use super::ids::{AtomIndex, ChainIndex, ResidueIndex};
use super::model::ModelError;
use nalgebra::Point3;
use std::ops::Range;
use tracing::debug;

/// Partition of `0..len` into consecutive non-empty segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmentation {
    /// Segment `i` covers `offsets[i]..offsets[i + 1]`.
    offsets: Vec<usize>,
    /// Segment of each element.
    index: Vec<usize>,
}

impl Segmentation {
    /// Starts a new segment at every element `i > 0` for which `is_start(i)`
    /// holds.
    pub fn from_boundaries(len: usize, is_start: impl Fn(usize) -> bool) -> Self {
        let mut offsets = vec![0];
        offsets.extend((1..len).filter(|&i| is_start(i)));
        if len > 0 {
            offsets.push(len);
        }

        let mut index = Vec::with_capacity(len);
        for (segment, bounds) in offsets.windows(2).enumerate() {
            index.extend(std::iter::repeat_n(segment, bounds[1] - bounds[0]));
        }
        Self { offsets, index }
    }

    pub fn count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn range(&self, segment: usize) -> Range<usize> {
        self.offsets[segment]..self.offsets[segment + 1]
    }

    pub fn segment_of(&self, element: usize) -> Option<usize> {
        self.index.get(element).copied()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }
}

/// Atom-ordered segmentations of one model.
#[derive(Debug, Clone)]
pub struct AtomicSegments {
    pub residue_atoms: Segmentation,
    pub chain_atoms: Segmentation,
    /// Residues of each chain.
    pub chain_residues: Segmentation,
}

impl AtomicSegments {
    pub fn residue_of(&self, atom: AtomIndex) -> Option<ResidueIndex> {
        self.residue_atoms.segment_of(atom.0).map(ResidueIndex)
    }

    pub fn chain_of(&self, atom: AtomIndex) -> Option<ChainIndex> {
        self.chain_atoms.segment_of(atom.0).map(ChainIndex)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AtomTable {
    pub label_atom_id: Vec<String>,
    pub type_symbol: Vec<String>,
    pub position: Vec<Point3<f64>>,
}

#[derive(Debug, Clone, Default)]
pub struct ResidueTable {
    pub label_comp_id: Vec<String>,
    pub label_seq_id: Vec<i32>,
    pub auth_seq_id: Vec<i32>,
    pub ins_code: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ChainTable {
    pub label_entity_id: Vec<String>,
    pub label_asym_id: Vec<String>,
    pub auth_asym_id: Vec<String>,
}

/// Per-atom, per-residue and per-chain columns of one model.
#[derive(Debug, Clone, Default)]
pub struct AtomicData {
    pub atoms: AtomTable,
    pub residues: ResidueTable,
    pub chains: ChainTable,
}

impl AtomicData {
    pub fn atom_count(&self) -> usize {
        self.atoms.position.len()
    }

    pub fn residue_count(&self) -> usize {
        self.residues.label_seq_id.len()
    }

    pub fn chain_count(&self) -> usize {
        self.chains.label_asym_id.len()
    }
}

fn required<'a>(category: &'a Category, field: &'static str) -> Result<&'a Field, ModelError> {
    category.field(field).ok_or(ModelError::MissingField {
        category: "_atom_site",
        field,
    })
}

fn strings(field: Option<&Field>, rows: impl Iterator<Item = usize>) -> Vec<String> {
    match field {
        Some(field) => rows.map(|r| field.str(r).into_owned()).collect(),
        None => rows.map(|_| String::new()).collect(),
    }
}

fn changed(field: Option<&Field>, row: usize) -> bool {
    field.is_some_and(|f| f.str(row) != f.str(row - 1))
}

/// Rows of the first model when `pdbx_PDB_model_num` is present.
fn first_model_rows(category: &Category) -> usize {
    let rows = category.row_count();
    let Some(model_num) = category.field("pdbx_PDB_model_num") else {
        return rows;
    };
    if rows == 0 {
        return 0;
    }
    let first = model_num.str(0);
    let count = (1..rows).find(|&r| model_num.str(r) != first).unwrap_or(rows);
    if count < rows {
        debug!(
            model = %first,
            atoms = count,
            skipped = rows - count,
            "Reading the first model only"
        );
    }
    count
}

/// Reads the atom, residue and chain tables from `_atom_site`.
///
/// A new chain starts whenever `label_entity_id` or `label_asym_id` changes
/// between consecutive atoms; a new residue starts at every chain start and
/// whenever a sequence number or insertion code changes.
///
/// # Errors
///
/// Returns [`ModelError::MissingField`] if an identifier or coordinate column
/// is absent.
pub fn read_atom_site(category: &Category) -> Result<(AtomicData, AtomicSegments), ModelError> {
    let label_entity_id = required(category, "label_entity_id")?;
    let label_asym_id = required(category, "label_asym_id")?;
    let x = required(category, "Cartn_x")?;
    let y = required(category, "Cartn_y")?;
    let z = required(category, "Cartn_z")?;
    let label_seq_id = category.field("label_seq_id");
    let auth_seq_id = match category.field("auth_seq_id") {
        Some(field) => field,
        None => label_seq_id.ok_or(ModelError::MissingField {
            category: "_atom_site",
            field: "auth_seq_id",
        })?,
    };
    let auth_asym_id = category.field("auth_asym_id").unwrap_or(label_asym_id);
    let ins_code = category.field("pdbx_PDB_ins_code");

    let atom_count = first_model_rows(category);

    let chain_start = |i: usize| {
        changed(Some(label_entity_id), i) || changed(Some(label_asym_id), i)
    };
    let chain_atoms = Segmentation::from_boundaries(atom_count, chain_start);
    let residue_atoms = Segmentation::from_boundaries(atom_count, |i| {
        chain_start(i)
            || changed(label_seq_id, i)
            || changed(Some(auth_seq_id), i)
            || changed(ins_code, i)
    });
    let chain_residues = Segmentation::from_boundaries(residue_atoms.count(), |r| {
        chain_start(residue_atoms.range(r).start)
    });

    let atoms = AtomTable {
        label_atom_id: strings(category.field("label_atom_id"), 0..atom_count),
        type_symbol: strings(category.field("type_symbol"), 0..atom_count),
        position: (0..atom_count)
            .map(|r| Point3::new(x.float(r), y.float(r), z.float(r)))
            .collect(),
    };

    let residue_starts = &residue_atoms.offsets()[..residue_atoms.count()];
    let residue_rows = || residue_starts.iter().copied();
    let residues = ResidueTable {
        label_comp_id: strings(category.field("label_comp_id"), residue_rows()),
        label_seq_id: match label_seq_id {
            Some(field) => residue_rows().map(|row| field.int(row)).collect(),
            None => residue_rows().map(|row| auth_seq_id.int(row)).collect(),
        },
        auth_seq_id: residue_rows().map(|row| auth_seq_id.int(row)).collect(),
        ins_code: strings(ins_code, residue_rows()),
    };

    let chain_starts = &chain_atoms.offsets()[..chain_atoms.count()];
    let chain_rows = || chain_starts.iter().copied();
    let chains = ChainTable {
        label_entity_id: strings(Some(label_entity_id), chain_rows()),
        label_asym_id: strings(Some(label_asym_id), chain_rows()),
        auth_asym_id: strings(Some(auth_asym_id), chain_rows()),
    };

    debug!(
        atoms = atom_count,
        residues = residue_atoms.count(),
        chains = chain_atoms.count(),
        "Read atomic hierarchy"
    );

    Ok((
        AtomicData {
            atoms,
            residues,
            chains,
        },
        AtomicSegments {
            residue_atoms,
            chain_atoms,
            chain_residues,
        },
    ))
}
