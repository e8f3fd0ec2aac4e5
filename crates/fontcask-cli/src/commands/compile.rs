use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use fontcask_core::{write_output, CompileContext, CompileOutput, Compiler, RandomIds, MANIFEST_FILE};
use fontcask_schema::parse_catalog_file;
use semver::Version;
use std::path::Path;
use url::Url;

pub fn run(
    catalog_path: &Path,
    version: &Version,
    base_url: &Url,
    output: &Path,
    base_path: Option<&Path>,
    json: bool,
) -> Result<u8, String> {
    let catalog = parse_catalog_file(catalog_path).map_err(|e| e.to_string())?;
    tracing::debug!(
        "parsed {} fonts and {} groups from {}",
        catalog.fonts.len(),
        catalog.groups.len(),
        catalog_path.display()
    );
    let base_path = base_path
        .unwrap_or_else(|| catalog_path.parent().unwrap_or_else(|| Path::new(".")))
        .to_path_buf();

    let pb = if json {
        None
    } else {
        Some(spinner("compiling catalog..."))
    };

    let ctx = CompileContext {
        base_path,
        base_url: base_url.clone(),
    };
    let mut ids = RandomIds;
    let result: Result<CompileOutput, _> = Compiler::new(ctx, &mut ids)
        .and_then(|c| c.compile(&catalog, version.clone()))
        .and_then(|out| write_output(&out, output).map(|()| out));

    let compiled = match result {
        Ok(out) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "catalog compiled");
            }
            out
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "compile failed");
            }
            return Err(e.to_string());
        }
    };

    let manifest = &compiled.manifest;
    if json {
        let payload = serde_json::json!({
            "version": manifest.version.to_string(),
            "fonts": manifest.fonts.len(),
            "groups": manifest.groups.len(),
            "downloads": manifest.downloads.len(),
            "manifest": output.join(MANIFEST_FILE),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "compiled {} fonts ({} downloads) at version {}",
            manifest.fonts.len(),
            manifest.downloads.len(),
            manifest.version
        );
        println!("manifest: {}", output.join(MANIFEST_FILE).display());
    }
    Ok(EXIT_SUCCESS)
}
