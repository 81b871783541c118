use super::Context;
use crate::cli::InfoArgs;
use crate::error::Result;
use molcif::core::models::data::{Block, CifFile};
use molcif::core::models::model::Model;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Serialize, PartialEq, Eq)]
struct CategorySummary {
    name: String,
    rows: usize,
    fields: usize,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct StructureSummary {
    atoms: usize,
    residues: usize,
    chains: usize,
    entities: usize,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct BlockSummary {
    header: String,
    categories: Vec<CategorySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    structure: Option<StructureSummary>,
}

fn summarize_block(block: &Block) -> BlockSummary {
    let categories = block
        .categories()
        .iter()
        .map(|category| CategorySummary {
            name: category.name.clone(),
            rows: category.row_count(),
            fields: category.field_count(),
        })
        .collect();

    let structure = block.category("_atom_site").and_then(|_| match Model::from_block(block) {
        Ok(model) => Some(StructureSummary {
            atoms: model.atom_count(),
            residues: model.residue_count(),
            chains: model.chain_count(),
            entities: model.entities.len(),
        }),
        Err(e) => {
            warn!("Block '{}' has atoms but no usable structure: {}", block.header, e);
            None
        }
    });

    BlockSummary {
        header: block.header.clone(),
        categories,
        structure,
    }
}

fn summarize(file: &CifFile) -> Vec<BlockSummary> {
    file.blocks.iter().map(summarize_block).collect()
}

fn render_text(summaries: &[BlockSummary]) -> String {
    let mut out = String::new();
    for block in summaries {
        out.push_str(&format!("data_{}\n", block.header));
        for category in &block.categories {
            out.push_str(&format!(
                "  {:<32} {:>8} rows  {:>3} fields\n",
                category.name, category.rows, category.fields
            ));
        }
        if let Some(s) = &block.structure {
            out.push_str(&format!(
                "  structure: {} atoms, {} residues, {} chains, {} entities\n",
                s.atoms, s.residues, s.chains, s.entities
            ));
        }
    }
    out
}

pub async fn run(args: InfoArgs, ctx: &Context) -> Result<()> {
    let file = ctx.load(&args.input)?;
    info!(blocks = file.blocks.len(), "Summarizing input");
    let summaries = summarize(&file);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print!("{}", render_text(&summaries));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use molcif::core::io::cif::parse;

    const SAMPLE: &str = "\
data_1ABC
_exptl.method 'X-RAY DIFFRACTION'
loop_
_atom_site.label_atom_id
_atom_site.label_asym_id
_atom_site.label_entity_id
_atom_site.label_seq_id
_atom_site.Cartn_x
_atom_site.Cartn_y
_atom_site.Cartn_z
N  A 1 1 0.0 0.0 0.0
CA A 1 1 1.0 0.0 0.0
N  A 1 2 2.0 0.0 0.0
data_meta
_cell.length_a 10
";

    #[test]
    fn blocks_are_summarized_in_order() {
        let summaries = summarize(&parse(SAMPLE).unwrap());
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].header, "1ABC");
        assert_eq!(
            summaries[0].categories,
            vec![
                CategorySummary {
                    name: "_exptl".into(),
                    rows: 1,
                    fields: 1
                },
                CategorySummary {
                    name: "_atom_site".into(),
                    rows: 3,
                    fields: 7
                },
            ]
        );
        assert_eq!(
            summaries[0].structure,
            Some(StructureSummary {
                atoms: 3,
                residues: 2,
                chains: 1,
                entities: 1
            })
        );
        assert_eq!(summaries[1].structure, None);
    }

    #[test]
    fn text_and_json_renderings_agree() {
        let summaries = summarize(&parse(SAMPLE).unwrap());
        let text = render_text(&summaries);
        assert!(text.starts_with("data_1ABC\n"));
        assert!(text.contains("structure: 3 atoms, 2 residues, 1 chains, 1 entities"));

        let json: serde_json::Value = serde_json::to_value(&summaries).unwrap();
        assert_eq!(json[0]["categories"][1]["rows"], 3);
        assert_eq!(json[1]["header"], "meta");
        assert!(json[1].get("structure").is_none());
    }
}
