use crate::cli::Cli;
use crate::error::{CliError, Result};
use molcif::engine::config::{ParserConfig, ParserConfigBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialParserConfig {
    chunk_size: Option<usize>,
    strict: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialEncoderConfig {
    encoder_name: Option<String>,
    auto_classify: Option<bool>,
    reuse_encoding: Option<bool>,
    hints: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialQueryConfig {
    timeout_ms: Option<u64>,
}

/// The configuration file as written, every key optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    parser: Option<PartialParserConfig>,
    encoder: Option<PartialEncoderConfig>,
    query: Option<PartialQueryConfig>,
}

/// Encoder settings shared by every `convert` run. Per-run flags are merged
/// on top of these by the command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncoderSettings {
    pub encoder_name: Option<String>,
    pub auto_classify: bool,
    pub reuse_encoding: bool,
    pub hints: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub parser: ParserConfig,
    pub encoder: EncoderSettings,
    pub query_timeout_ms: u64,
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads the file named by `--config`, or starts empty without one.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Command-line flags win over `--set` values, which win over the file.
    pub fn merge_with_cli(mut self, cli: &Cli) -> Result<Settings> {
        self.apply_set_values(&cli.set_values)?;

        let parser = self.parser.take().unwrap_or_default();
        let encoder = self.encoder.take().unwrap_or_default();
        let query = self.query.take().unwrap_or_default();

        let mut builder = ParserConfigBuilder::new().strict(cli.strict || parser.strict.unwrap_or(false));
        if let Some(chunk_size) = cli.chunk_size.or(parser.chunk_size) {
            builder = builder.chunk_size(chunk_size);
        }
        let parser = builder.build().map_err(|e| CliError::Config(e.to_string()))?;

        Ok(Settings {
            parser,
            encoder: EncoderSettings {
                encoder_name: encoder.encoder_name,
                auto_classify: encoder.auto_classify.unwrap_or(false),
                reuse_encoding: encoder.reuse_encoding.unwrap_or(false),
                hints: encoder.hints,
            },
            query_timeout_ms: query.timeout_ms.unwrap_or(0),
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;

            match key {
                "parser.chunk-size" => {
                    self.parser.get_or_insert_with(Default::default).chunk_size =
                        Some(parse_value(key, value_str)?);
                }
                "parser.strict" => {
                    self.parser.get_or_insert_with(Default::default).strict =
                        Some(parse_value(key, value_str)?);
                }
                "encoder.encoder-name" => {
                    self.encoder.get_or_insert_with(Default::default).encoder_name =
                        Some(value_str.to_string());
                }
                "encoder.auto-classify" => {
                    self.encoder.get_or_insert_with(Default::default).auto_classify =
                        Some(parse_value(key, value_str)?);
                }
                "encoder.reuse-encoding" => {
                    self.encoder.get_or_insert_with(Default::default).reuse_encoding =
                        Some(parse_value(key, value_str)?);
                }
                "encoder.hints" => {
                    self.encoder.get_or_insert_with(Default::default).hints =
                        Some(PathBuf::from(value_str));
                }
                "query.timeout-ms" => {
                    self.query.get_or_insert_with(Default::default).timeout_ms =
                        Some(parse_value(key, value_str)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}
