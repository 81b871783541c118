use super::Context;
use crate::cli::{ConvertArgs, OutputFormat};
use crate::config::EncoderSettings;
use crate::error::{CliError, Result};
use molcif::core::io::binary::{EncodingHints, EncodingProvider};
use molcif::core::models::data::CifFile;
use molcif::engine::config::{EncoderConfig, EncoderConfigBuilder};
use molcif::engine::progress::ProgressReporter;
use molcif::workflows::convert::{convert, reused_encoding};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// `.bcif` outputs are binary unless a format flag says otherwise.
fn output_is_binary(format: OutputFormat, output: &Path) -> bool {
    if format.binary {
        return true;
    }
    if format.text {
        return false;
    }
    output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bcif"))
}

fn encoder_config(args: &ConvertArgs, settings: &EncoderSettings) -> Result<EncoderConfig> {
    let mut builder = EncoderConfigBuilder::new()
        .binary(output_is_binary(args.format, &args.output))
        .auto_classify(args.auto_classify || settings.auto_classify);
    if let Some(name) = &settings.encoder_name {
        builder = builder.encoder_name(name.clone());
    }
    builder.build().map_err(|e| CliError::Config(e.to_string()))
}

/// Column presets from the hints file, overridden by `--preset` flags.
fn encoding_hints(args: &ConvertArgs, settings: &EncoderSettings) -> Result<EncodingHints> {
    let mut hints = match args.hints.as_ref().or(settings.hints.as_ref()) {
        Some(path) => EncodingHints::load(path)?,
        None => EncodingHints::new(),
    };
    for preset in &args.presets {
        let (column, name) = preset.split_once('=').ok_or_else(|| {
            CliError::Argument(format!(
                "Invalid --preset format: '{}'. Expected COLUMN=PRESET.",
                preset
            ))
        })?;
        hints.insert(column, name)?;
    }
    Ok(hints)
}

/// Explicit hints take precedence over encodings replayed from the source.
fn encoding_provider(
    hints: EncodingHints,
    source: &CifFile,
    reuse: bool,
) -> Option<Arc<dyn EncodingProvider>> {
    let mut providers: Vec<Arc<dyn EncodingProvider>> = Vec::new();
    if !hints.is_empty() {
        providers.push(Arc::new(hints));
    }
    if reuse {
        match reused_encoding(source) {
            Some(provider) => providers.push(provider),
            None => debug!("Input carries no binary encodings to reuse"),
        }
    }
    match providers.len() {
        0 => None,
        1 => providers.pop(),
        _ => Some(Arc::new(providers)),
    }
}

pub async fn run(args: ConvertArgs, ctx: &Context) -> Result<()> {
    let settings = &ctx.settings.encoder;
    let config = encoder_config(&args, settings)?;
    let hints = encoding_hints(&args, settings)?;

    let file = ctx.load(&args.input)?;
    let provider = encoding_provider(
        hints,
        &file,
        args.reuse_encoding || settings.reuse_encoding,
    );

    info!(
        binary = config.binary,
        auto_classify = config.auto_classify,
        custom_encodings = provider.is_some(),
        "Converting {:?} to {:?}",
        &args.input,
        &args.output
    );

    let handler = ctx.progress();
    let reporter = ProgressReporter::with_callback(handler.get_callback());
    let bytes = tokio::task::block_in_place(|| convert(&file, &config, provider, &reporter))?;
    std::fs::write(&args.output, &bytes)?;

    if !ctx.quiet {
        println!(
            "✓ Wrote {} ({} bytes, {})",
            args.output.display(),
            bytes.len(),
            if config.binary { "binary" } else { "text" }
        );
    }
    Ok(())
}
