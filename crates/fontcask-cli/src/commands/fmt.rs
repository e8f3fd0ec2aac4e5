use super::{issue_line, json_pretty, EXIT_CATALOG_ERROR, EXIT_SUCCESS};
use fontcask_schema::{format_catalog, parse_catalog_file, FormatMode, SourceCatalog};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub fn run(catalog_path: &Path, check: bool, json: bool) -> Result<u8, String> {
    let catalog = parse_catalog_file(catalog_path).map_err(|e| e.to_string())?;
    let base_path = catalog_path.parent().unwrap_or_else(|| Path::new("."));
    let mode = if check {
        FormatMode::Check
    } else {
        FormatMode::Fix
    };

    let (fixed, issues) = format_catalog(&catalog, base_path, mode);

    if !check {
        write_catalog(&fixed, catalog_path).map_err(|e| format!("failed to write catalog: {e}"))?;
    }

    if json {
        let payload = serde_json::json!({
            "checked": check,
            "issues": issues.iter().map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        for issue in &issues {
            eprintln!("{}", issue_line(issue));
        }
        match (check, issues.len()) {
            (true, 0) => println!("catalog is clean"),
            (true, n) => println!("{n} issue(s) found"),
            (false, 0) => println!("catalog formatted"),
            (false, n) => println!("catalog formatted, {n} issue(s) need manual fixes"),
        }
    }

    if issues.is_empty() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_CATALOG_ERROR)
    }
}

/// Rewrite the catalog with four-space indentation and a trailing newline,
/// renamed into place so an interrupted run never truncates it.
fn write_catalog(catalog: &SourceCatalog, path: &Path) -> Result<(), std::io::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    catalog.serialize(&mut ser)?;
    buf.push(b'\n');

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&buf)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
