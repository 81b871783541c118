use crate::core::models::ids::{AtomIndex, ChainIndex, ResidueIndex};
use crate::core::models::model::Model;
use nalgebra::Point3;
use std::ops::Range;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument};

/// Atoms scanned between timeout checks in spatial queries.
const TIMEOUT_CHECK_INTERVAL: usize = 4096;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Query timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u128 },
    #[error("Query failed: {0}")]
    Evaluation(String),
}

/// Evaluation state shared by the parts of one query run.
pub struct QueryContext<'a> {
    pub model: &'a Model,
    started: Instant,
    timeout: Option<Duration>,
}

impl<'a> QueryContext<'a> {
    /// A `timeout_ms` of 0 disables the timeout.
    pub fn new(model: &'a Model, timeout_ms: u64) -> Self {
        Self {
            model,
            started: Instant::now(),
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        }
    }

    /// # Errors
    ///
    /// Returns [`QueryError::Timeout`] once the run has exceeded its budget.
    pub fn check_timeout(&self) -> Result<(), QueryError> {
        match self.timeout {
            Some(limit) if self.started.elapsed() > limit => Err(QueryError::Timeout {
                elapsed_ms: self.started.elapsed().as_millis(),
            }),
            _ => Ok(()),
        }
    }
}

/// A query evaluated against one model.
pub trait StructureQuery<T> {
    fn evaluate(&self, ctx: &QueryContext) -> Result<T, QueryError>;
}

impl<T, F> StructureQuery<T> for F
where
    F: Fn(&QueryContext) -> Result<T, QueryError>,
{
    fn evaluate(&self, ctx: &QueryContext) -> Result<T, QueryError> {
        self(ctx)
    }
}

/// Runs `query` against `model`. The timeout is enforced by the query's own
/// calls to [`QueryContext::check_timeout`].
///
/// # Errors
///
/// Returns whatever the query returns, including [`QueryError::Timeout`].
#[instrument(skip_all, name = "query_workflow", fields(entry = %model.entry_id, timeout_ms = timeout_ms))]
pub fn run<T>(query: &impl StructureQuery<T>, model: &Model, timeout_ms: u64) -> Result<T, QueryError> {
    let ctx = QueryContext::new(model, timeout_ms);
    let result = query.evaluate(&ctx);
    debug!(
        elapsed_ms = ctx.started.elapsed().as_millis() as u64,
        ok = result.is_ok(),
        "Query finished"
    );
    result
}

/// How a residue is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResidueSelector {
    /// Author chain and author sequence number.
    Auth {
        asym_id: String,
        seq_id: i32,
        ins_code: Option<String>,
    },
    /// Entity and label chain with the author sequence number.
    Label {
        entity_id: String,
        asym_id: String,
        seq_id: i32,
        ins_code: Option<String>,
    },
    /// Entity and label chain with the label sequence number; falls back to
    /// the nearest preceding residue of that chain.
    LabelNearest {
        entity_id: String,
        asym_id: String,
        seq_id: i32,
        ins_code: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResidueHit {
    pub residue: ResidueIndex,
    pub chain: ChainIndex,
    pub comp_id: String,
    pub label_seq_id: i32,
    pub auth_seq_id: i32,
    pub atoms: Range<usize>,
}

/// Resolves a residue through the structure index. `Ok(None)` means the
/// residue does not exist.
pub fn residue_atoms(
    selector: ResidueSelector,
) -> impl Fn(&QueryContext) -> Result<Option<ResidueHit>, QueryError> {
    move |ctx| {
        let index = &ctx.model.index;
        let residue = match &selector {
            ResidueSelector::Auth {
                asym_id,
                seq_id,
                ins_code,
            } => index.find_residue_auth(asym_id, *seq_id, ins_code.as_deref()),
            ResidueSelector::Label {
                entity_id,
                asym_id,
                seq_id,
                ins_code,
            } => index.find_residue(entity_id, asym_id, *seq_id, ins_code.as_deref()),
            ResidueSelector::LabelNearest {
                entity_id,
                asym_id,
                seq_id,
                ins_code,
            } => index.find_residue_insertion(entity_id, asym_id, *seq_id, ins_code.as_deref()),
        };
        let Some(residue) = residue else {
            return Ok(None);
        };
        hit(ctx.model, residue).map(Some)
    }
}

/// Describes a residue already known by index, e.g. one returned by
/// [`residues_near`].
pub fn residue_hit(
    residue: ResidueIndex,
) -> impl Fn(&QueryContext) -> Result<ResidueHit, QueryError> {
    move |ctx| hit(ctx.model, residue)
}

fn hit(model: &Model, residue: ResidueIndex) -> Result<ResidueHit, QueryError> {
    let atoms = model
        .residue_atoms(residue)
        .ok_or_else(|| QueryError::Evaluation(format!("residue {residue} is out of range")))?;
    let chain = model
        .segments
        .chain_of(AtomIndex(atoms.start))
        .ok_or_else(|| QueryError::Evaluation(format!("residue {residue} has no chain")))?;
    let residues = &model.atomic.residues;
    Ok(ResidueHit {
        residue,
        chain,
        comp_id: residues.label_comp_id[residue.0].clone(),
        label_seq_id: residues.label_seq_id[residue.0],
        auth_seq_id: residues.auth_seq_id[residue.0],
        atoms,
    })
}

/// Residues with at least one atom within `radius` of any atom of `center`,
/// excluding `center` itself, in residue order.
pub fn residues_near(
    center: ResidueIndex,
    radius: f64,
) -> impl Fn(&QueryContext) -> Result<Vec<ResidueIndex>, QueryError> {
    move |ctx| {
        let model = ctx.model;
        let center_atoms = model
            .residue_atoms(center)
            .ok_or_else(|| QueryError::Evaluation(format!("residue {center} is out of range")))?;
        let centers: Vec<Point3<f64>> = model.atomic.atoms.position[center_atoms].to_vec();
        let radius_sq = radius * radius;

        let mut found = Vec::new();
        for (atom, position) in model.atomic.atoms.position.iter().enumerate() {
            if atom % TIMEOUT_CHECK_INTERVAL == 0 {
                ctx.check_timeout()?;
            }
            let Some(residue) = model.segments.residue_of(AtomIndex(atom)) else {
                continue;
            };
            if residue == center || found.last() == Some(&residue) {
                continue;
            }
            if centers
                .iter()
                .any(|c| (position - c).norm_squared() <= radius_sq)
            {
                found.push(residue);
            }
        }
        Ok(found)
    }
}
