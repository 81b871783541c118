use crate::core::io::binary::{EncodingProvider, encoding_provider_from_file};
use crate::core::io::writer::create_encoder;
use crate::core::models::data::CifFile;
use crate::engine::config::EncoderConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Provider that replays the encodings of a decoded binary source, or `None`
/// when the source came from text.
pub fn reused_encoding(source: &CifFile) -> Option<Arc<dyn EncodingProvider>> {
    let provider = encoding_provider_from_file(source);
    if provider.is_empty() {
        return None;
    }
    debug!(columns = provider.len(), "Reusing source encodings");
    Some(Arc::new(provider))
}

/// Serializes `file` as text or binary CIF, reporting one step per category.
///
/// # Errors
///
/// Returns [`EngineError::Encode`] if a column cannot be encoded.
#[instrument(skip_all, name = "convert_workflow", fields(binary = config.binary))]
pub fn convert(
    file: &CifFile,
    config: &EncoderConfig,
    provider: Option<Arc<dyn EncodingProvider>>,
    reporter: &ProgressReporter,
) -> Result<Vec<u8>, EngineError> {
    let total: u64 = file
        .blocks
        .iter()
        .map(|block| block.categories().len() as u64)
        .sum();

    reporter.report(Progress::PhaseStart { name: "Encoding" });
    reporter.report(Progress::TaskStart { total });

    let mut encoder = create_encoder(config.to_options(provider));
    let mut current = 0;
    for block in &file.blocks {
        encoder.start_block(&block.header);
        for category in block.categories() {
            encoder.write_category(category)?;
            current += 1;
            reporter.report(Progress::TaskUpdate { current, total });
        }
    }
    let bytes = encoder.into_bytes();

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);
    info!(categories = total, bytes = bytes.len(), "Encoding complete");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::binary::{EncodingHints, decode};
    use crate::core::io::cif::parse;
    use crate::engine::config::EncoderConfigBuilder;

    const SAMPLE: &str = "\
data_1ABC
_exptl.method 'X-RAY DIFFRACTION'
loop_
_atom_site.id
_atom_site.Cartn_x
_atom_site.occupancy
1 10.125 1.00
2 11.250 1.00
3 12.500 0.50
";

    fn binary(auto_classify: bool) -> EncoderConfig {
        EncoderConfigBuilder::new()
            .binary(true)
            .auto_classify(auto_classify)
            .build()
            .unwrap()
    }

    #[test]
    fn text_converts_to_binary_and_back() {
        let file = parse(SAMPLE).unwrap();
        let bytes = convert(&file, &binary(true), None, &ProgressReporter::new()).unwrap();
        let decoded = decode(&bytes).unwrap();

        let text_config = EncoderConfigBuilder::new().binary(false).build().unwrap();
        let text = convert(&decoded, &text_config, None, &ProgressReporter::new()).unwrap();
        let reparsed = parse(std::str::from_utf8(&text).unwrap()).unwrap();

        let atoms = reparsed.blocks[0].category("_atom_site").unwrap();
        assert_eq!(atoms.row_count(), 3);
        assert_eq!(atoms.field("Cartn_x").unwrap().float(0), 10.125);
        assert_eq!(atoms.field("occupancy").unwrap().float(2), 0.5);
    }

    #[test]
    fn reencoding_reuses_the_source_chains() {
        let file = parse(SAMPLE).unwrap();
        let mut hints = EncodingHints::new();
        hints.insert("_atom_site.Cartn_x", "fixed-point-3").unwrap();
        let first = convert(&file, &binary(false), Some(Arc::new(hints)), &ProgressReporter::new()).unwrap();
        let decoded = decode(&first).unwrap();

        assert!(reused_encoding(&file).is_none());
        let provider = reused_encoding(&decoded);
        assert!(provider.is_some());
        let second = convert(&decoded, &binary(false), provider, &ProgressReporter::new()).unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn hinted_fixed_point_falls_back_for_large_values() {
        let file = parse("data_big\nloop_\n_cell.id\n_cell.length\n1 5000000.25\n2 12.5\n").unwrap();
        let mut hints = EncodingHints::new();
        hints.insert("_cell.length", "fixed-point-3").unwrap();
        let bytes = convert(&file, &binary(false), Some(Arc::new(hints)), &ProgressReporter::new()).unwrap();

        let decoded = decode(&bytes).unwrap();
        let length = decoded.blocks[0].category("_cell").unwrap().field("length").unwrap();
        assert_eq!(length.float(0), 5000000.25);
        assert_eq!(length.float(1), 12.5);
    }

    #[test]
    fn each_category_is_reported() {
        let file = parse(SAMPLE).unwrap();
        let events = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let reporter = ProgressReporter::with_callback(Box::new(move |event| {
            sink.lock().unwrap().push(event);
        }));
        convert(&file, &binary(false), None, &reporter).unwrap();
        let events = events.lock().unwrap();
        assert!(events.contains(&Progress::TaskStart { total: 2 }));
        assert!(events.contains(&Progress::TaskUpdate { current: 2, total: 2 }));
    }
}
