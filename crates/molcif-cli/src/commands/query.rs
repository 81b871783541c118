use super::{Context, select_block};
use crate::cli::QueryArgs;
use crate::error::{CliError, Result};
use molcif::core::models::model::Model;
use molcif::engine::error::EngineError;
use molcif::workflows::query::{
    ResidueHit, ResidueSelector, residue_atoms, residue_hit, residues_near, run as run_query,
};
use tracing::info;

fn selector(args: &QueryArgs) -> ResidueSelector {
    let ins_code = args.ins_code.clone();
    match (&args.entity, args.nearest) {
        (Some(entity_id), true) => ResidueSelector::LabelNearest {
            entity_id: entity_id.clone(),
            asym_id: args.chain.clone(),
            seq_id: args.seq,
            ins_code,
        },
        (Some(entity_id), false) => ResidueSelector::Label {
            entity_id: entity_id.clone(),
            asym_id: args.chain.clone(),
            seq_id: args.seq,
            ins_code,
        },
        (None, _) => ResidueSelector::Auth {
            asym_id: args.chain.clone(),
            seq_id: args.seq,
            ins_code,
        },
    }
}

fn describe(model: &Model, hit: &ResidueHit) -> String {
    let chains = &model.atomic.chains;
    let ins_code = &model.atomic.residues.ins_code[hit.residue.0];
    format!(
        "{} {}{} (label {} {}, auth {}) atoms {}..{}",
        hit.comp_id,
        hit.auth_seq_id,
        ins_code,
        chains.label_asym_id[hit.chain.0],
        hit.label_seq_id,
        chains.auth_asym_id[hit.chain.0],
        hit.atoms.start,
        hit.atoms.end
    )
}

pub async fn run(args: QueryArgs, ctx: &Context) -> Result<()> {
    let file = ctx.load(&args.input)?;
    let block = select_block(&file, args.block.as_deref())?;
    let model = Model::from_block(block).map_err(EngineError::from)?;
    let timeout_ms = args.timeout_ms.unwrap_or(ctx.settings.query_timeout_ms);

    let selector = selector(&args);
    info!(?selector, timeout_ms, "Resolving residue");
    let hit = tokio::task::block_in_place(|| {
        run_query(&residue_atoms(selector), &model, timeout_ms)
    })?
    .ok_or_else(|| {
        CliError::NotFound(format!(
            "No residue {}{} in chain {} of block '{}'",
            args.seq,
            args.ins_code.as_deref().unwrap_or(""),
            args.chain,
            block.header
        ))
    })?;
    println!("{}", describe(&model, &hit));

    if let Some(radius) = args.within {
        let neighbors = tokio::task::block_in_place(|| {
            run_query(&residues_near(hit.residue, radius), &model, timeout_ms)
        })?;
        info!(count = neighbors.len(), radius, "Found neighboring residues");
        for residue in neighbors {
            let neighbor = run_query(&residue_hit(residue), &model, timeout_ms)?;
            println!("  {}", describe(&model, &neighbor));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use molcif::core::io::cif::parse;
    use molcif::core::models::ids::ResidueIndex;

    fn args(extra: &[&str]) -> QueryArgs {
        let mut argv = vec!["mcif", "query", "-i", "in.cif"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Query(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn selector_follows_the_addressing_flags() {
        assert_eq!(
            selector(&args(&["--chain", "A", "--seq", "10", "--ins-code", "B"])),
            ResidueSelector::Auth {
                asym_id: "A".into(),
                seq_id: 10,
                ins_code: Some("B".into())
            }
        );
        assert!(matches!(
            selector(&args(&["--chain", "A", "--seq", "10", "--entity", "1"])),
            ResidueSelector::Label { .. }
        ));
        assert!(matches!(
            selector(&args(&["--chain", "A", "--seq", "10", "--entity", "1", "--nearest"])),
            ResidueSelector::LabelNearest { .. }
        ));
    }

    #[test]
    fn hits_are_described_with_both_numberings() {
        let text = "\
data_1TST
loop_
_atom_site.label_atom_id
_atom_site.label_comp_id
_atom_site.label_asym_id
_atom_site.label_entity_id
_atom_site.label_seq_id
_atom_site.auth_seq_id
_atom_site.pdbx_PDB_ins_code
_atom_site.auth_asym_id
_atom_site.Cartn_x
_atom_site.Cartn_y
_atom_site.Cartn_z
N  GLY A 1 1 10 ? P 0.0 0.0 0.0
CA GLY A 1 1 10 ? P 1.0 0.0 0.0
N  ALA A 1 2 10 A P 3.0 0.0 0.0
";
        let file = parse(text).unwrap();
        let model = Model::from_block(&file.blocks[0]).unwrap();
        let hit = run_query(
            &residue_atoms(selector(&args(&["--chain", "P", "--seq", "10", "--ins-code", "A"]))),
            &model,
            0,
        )
        .unwrap()
        .unwrap();
        assert_eq!(hit.residue, ResidueIndex(1));
        assert_eq!(describe(&model, &hit), "ALA 10A (label A 2, auth P) atoms 2..3");
    }
}
