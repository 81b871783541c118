use crate::core::io::binary::wire::has_magic;
use crate::core::io::cif::{CifError, CifParser, ParseStep};
use crate::core::io::traits::{BinaryCif, CifFormat};
use crate::core::models::data::CifFile;
use crate::engine::computation::{Cancelled, CancellationToken, ChunkedTask, StepOutcome, drive};
use crate::engine::config::ParserConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

impl From<Cancelled> for CifError {
    fn from(_: Cancelled) -> Self {
        CifError::Cancelled
    }
}

impl ChunkedTask for CifParser {
    type Output = CifFile;
    type Error = CifError;

    fn step(&mut self) -> Result<StepOutcome, CifError> {
        Ok(match CifParser::step(self)? {
            ParseStep::Pending { position, total } => StepOutcome::Pending {
                current: position as u64,
                total: total as u64,
            },
            ParseStep::Done => StepOutcome::Done,
        })
    }

    fn finish(self) -> Result<CifFile, CifError> {
        CifParser::finish(self)
    }
}

/// Parses CIF text in chunks, reporting progress in bytes and stopping at the
/// first chunk boundary after `token` is cancelled.
///
/// # Errors
///
/// Returns [`CifError::Parse`] for malformed input and [`CifError::Cancelled`]
/// when cancelled. No partial file is returned in either case.
#[instrument(skip_all, name = "parse_workflow")]
pub fn parse_with(
    text: impl Into<Arc<str>>,
    config: &ParserConfig,
    reporter: &ProgressReporter,
    token: &CancellationToken,
) -> Result<CifFile, CifError> {
    let parser = CifParser::new(text)
        .with_chunk_size(config.chunk_size)
        .with_strict(config.strict);
    info!(
        bytes = parser.total(),
        chunk_size = config.chunk_size,
        strict = config.strict,
        "Parsing CIF text"
    );

    reporter.report(Progress::PhaseStart { name: "Parsing" });
    let result = drive(parser, reporter, token);
    reporter.report(Progress::PhaseFinish);

    let file = result?;
    info!(blocks = file.blocks.len(), "Parsing complete");
    Ok(file)
}

/// Reads a text or binary file, choosing by its leading magic bytes.
///
/// # Errors
///
/// Returns [`EngineError::Io`] if the file cannot be read or is not UTF-8
/// text, and the parse or decode error otherwise.
#[instrument(skip_all, name = "load_workflow", fields(path = %path.display()))]
pub fn load(
    path: &Path,
    config: &ParserConfig,
    reporter: &ProgressReporter,
    token: &CancellationToken,
) -> Result<CifFile, EngineError> {
    let io_error = |source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    };
    let bytes = std::fs::read(path).map_err(io_error)?;

    if has_magic(&bytes) {
        reporter.report(Progress::PhaseStart { name: "Decoding" });
        let file = BinaryCif::read_from(&mut bytes.as_slice());
        reporter.report(Progress::PhaseFinish);
        let file = file?;
        info!(blocks = file.blocks.len(), "Decoded binary CIF");
        return Ok(file);
    }

    let text = String::from_utf8(bytes)
        .map_err(|err| io_error(io::Error::new(io::ErrorKind::InvalidData, err)))?;
    Ok(parse_with(text, config, reporter, token)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::ParserConfigBuilder;
    use std::sync::Mutex;

    fn sample(rows: usize) -> String {
        let mut text = String::from("data_big\nloop_\n_atom_site.id\n_atom_site.type_symbol\n");
        for i in 0..rows {
            text.push_str(&format!("{i} C\n"));
        }
        text
    }

    #[test]
    fn progress_is_reported_per_chunk() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let reporter = ProgressReporter::with_callback(Box::new(move |event| {
            sink.lock().unwrap().push(event);
        }));
        let config = ParserConfigBuilder::new().chunk_size(50).build().unwrap();

        let file = parse_with(sample(100), &config, &reporter, &CancellationToken::new()).unwrap();
        assert_eq!(file.blocks[0].category("_atom_site").unwrap().row_count(), 100);

        let events = events.lock().unwrap();
        assert_eq!(events.first(), Some(&Progress::PhaseStart { name: "Parsing" }));
        assert_eq!(events.last(), Some(&Progress::PhaseFinish));
        let updates: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                Progress::TaskUpdate { current, .. } => Some(*current),
                _ => None,
            })
            .collect();
        assert!(updates.len() >= 3);
        assert!(updates.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn cancellation_yields_no_file() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let reporter = ProgressReporter::with_callback(Box::new(move |event| {
            if matches!(event, Progress::TaskUpdate { .. }) {
                trigger.cancel();
            }
        }));
        let config = ParserConfigBuilder::new().chunk_size(10).build().unwrap();
        let err = parse_with(sample(100), &config, &reporter, &token).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn parse_errors_are_not_cancellations() {
        let config = ParserConfig::default();
        let err = parse_with(
            "data_x\nloop_\n_a.b\n_a.c\n1 2 3\n",
            &config,
            &ProgressReporter::new(),
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(!err.is_cancelled());
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn load_detects_binary_input() {
        let dir = tempfile::tempdir().unwrap();
        let text_path = dir.path().join("in.cif");
        let binary_path = dir.path().join("in.bcif");
        std::fs::write(&text_path, sample(5)).unwrap();
        let file = crate::core::io::cif::parse(&sample(5)).unwrap();
        BinaryCif::write_to_path(&file, &binary_path).unwrap();

        let config = ParserConfig::default();
        let token = CancellationToken::new();
        for path in [&text_path, &binary_path] {
            let loaded = load(path, &config, &ProgressReporter::new(), &token).unwrap();
            let atoms = loaded.blocks[0].category("_atom_site").unwrap();
            assert_eq!(atoms.row_count(), 5);
            assert_eq!(atoms.field("type_symbol").unwrap().str(4), "C");
        }
    }

    #[test]
    fn load_reports_missing_files_with_their_path() {
        let err = load(
            Path::new("/nonexistent/input.cif"),
            &ParserConfig::default(),
            &ProgressReporter::new(),
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Io { ref path, .. } if path.ends_with("input.cif")));
    }
}
