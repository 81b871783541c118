pub mod convert;
pub mod export;
pub mod info;
pub mod query;

use crate::config::Settings;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use molcif::core::models::data::{Block, CifFile};
use molcif::engine::computation::CancellationToken;
use molcif::engine::error::EngineError;
use molcif::engine::progress::ProgressReporter;
use molcif::workflows;
use std::path::Path;
use tracing::info;

/// State shared by every command of one invocation.
pub struct Context {
    pub settings: Settings,
    pub token: CancellationToken,
    pub quiet: bool,
}

impl Context {
    pub fn progress(&self) -> CliProgressHandler {
        if self.quiet {
            CliProgressHandler::hidden()
        } else {
            CliProgressHandler::new()
        }
    }

    /// Reads a text or binary input on a blocking-capable worker.
    pub fn load(&self, path: &Path) -> Result<CifFile> {
        info!("Loading input file {:?}", path);
        let handler = self.progress();
        let reporter = ProgressReporter::with_callback(handler.get_callback());
        let file = tokio::task::block_in_place(|| {
            workflows::parse::load(path, &self.settings.parser, &reporter, &self.token)
        })?;
        Ok(file)
    }
}

/// The block named `header`, or the first block of the file.
pub fn select_block<'a>(file: &'a CifFile, header: Option<&str>) -> Result<&'a Block> {
    let block = match header {
        Some(header) => file.block(header),
        None => file.blocks.first(),
    };
    block.ok_or_else(|| {
        EngineError::BlockNotFound(header.unwrap_or("<first>").to_string()).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::config::PartialConfig;
    use crate::error::CliError;
    use clap::Parser;
    use molcif::core::io::binary::wire::has_magic;
    use molcif::core::io::cif::parse;

    const SAMPLE: &str = "\
data_1ABC
loop_
_atom_site.id
_atom_site.label_asym_id
_atom_site.label_entity_id
_atom_site.label_seq_id
_atom_site.Cartn_x
_atom_site.Cartn_y
_atom_site.Cartn_z
1 A 1 1 10.125 0.5 ?
2 A 1 2 11.25 0.5 1.5
";

    fn context(token: CancellationToken) -> Context {
        let cli = Cli::try_parse_from(["mcif", "info", "unused.cif"]).unwrap();
        Context {
            settings: PartialConfig::default().merge_with_cli(&cli).unwrap(),
            token,
            quiet: true,
        }
    }

    fn command(argv: &[&str]) -> Commands {
        let mut full = vec!["mcif"];
        full.extend_from_slice(argv);
        Cli::try_parse_from(full).unwrap().command
    }

    #[test]
    fn blocks_are_selected_by_header_or_position() {
        let file = parse("data_one\n_a.b 1\ndata_two\n_a.b 2\n").unwrap();
        assert_eq!(select_block(&file, None).unwrap().header, "one");
        assert_eq!(select_block(&file, Some("two")).unwrap().header, "two");
        assert!(matches!(
            select_block(&file, Some("three")),
            Err(CliError::Core(EngineError::BlockNotFound(name))) if name == "three"
        ));
        assert!(select_block(&CifFile::default(), None).is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn converted_binary_exports_like_the_text_source() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.cif");
        let binary = dir.path().join("out.bcif");
        let from_text = dir.path().join("text.csv");
        let from_binary = dir.path().join("binary.csv");
        std::fs::write(&input, SAMPLE).unwrap();
        let ctx = context(CancellationToken::new());

        let Commands::Convert(args) = command(&[
            "convert", "-i", input.to_str().unwrap(), "-o", binary.to_str().unwrap(), "--auto-classify",
        ]) else {
            panic!("expected the convert command");
        };
        convert::run(args, &ctx).await.unwrap();
        assert!(has_magic(&std::fs::read(&binary).unwrap()));

        for (source, csv) in [(&input, &from_text), (&binary, &from_binary)] {
            let Commands::Export(args) = command(&[
                "export", "-i", source.to_str().unwrap(), "-C", "atom_site", "-o", csv.to_str().unwrap(),
            ]) else {
                panic!("expected the export command");
            };
            export::run(args, &ctx).await.unwrap();
        }
        let text_csv = std::fs::read_to_string(&from_text).unwrap();
        assert_eq!(text_csv, std::fs::read_to_string(&from_binary).unwrap());
        assert!(text_csv.ends_with("2,A,1,2,11.25,0.5,1.5\n"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancelled_loads_report_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.cif");
        std::fs::write(&input, SAMPLE).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let err = context(token).load(&input).unwrap_err();
        assert!(err.is_cancelled());
    }
}
