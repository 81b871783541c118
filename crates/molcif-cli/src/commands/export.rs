use super::{Context, select_block};
use crate::cli::ExportArgs;
use crate::error::{CliError, Result};
use molcif::core::models::data::{Block, Category};
use molcif::core::models::field::FieldValue;
use std::borrow::Cow;
use std::io::Write;
use tracing::info;

/// Accepts `atom_site` as well as `_atom_site`.
fn find_category<'a>(block: &'a Block, name: &str) -> Result<&'a Category> {
    let name = if name.starts_with('_') {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("_{name}"))
    };
    block.category(&name).ok_or_else(|| {
        CliError::NotFound(format!(
            "Category '{}' not found in block '{}'",
            name, block.header
        ))
    })
}

/// Writes a header row of field names, then one record per row. Markers are
/// written as `.` and `?`.
fn write_csv<W: Write>(category: &Category, writer: W) -> Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(category.field_names())?;
    for row in 0..category.row_count() {
        let record = category.fields().map(|(_, field)| match field.value(row) {
            FieldValue::Present(value) => value,
            FieldValue::NotSpecified => Cow::Borrowed("."),
            FieldValue::Unknown => Cow::Borrowed("?"),
        });
        csv.write_record(record.map(|value| value.into_owned()))?;
    }
    csv.flush()?;
    Ok(category.row_count())
}

pub async fn run(args: ExportArgs, ctx: &Context) -> Result<()> {
    let file = ctx.load(&args.input)?;
    let block = select_block(&file, args.block.as_deref())?;
    let category = find_category(block, &args.category)?;

    let rows = match &args.output {
        Some(path) => {
            info!("Exporting {} to {:?}", category.name, path);
            write_csv(category, std::fs::File::create(path)?)?
        }
        None => write_csv(category, std::io::stdout().lock())?,
    };
    info!(rows, "Export complete");
    Ok(())
}
