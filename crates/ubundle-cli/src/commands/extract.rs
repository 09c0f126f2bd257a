use anyhow::Context;
use serde_json::json;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

use super::open_bundle;
use crate::output::{
    OutputStyle, format_key_value, format_path, format_size, format_success, format_warning,
    print_json,
};
use crate::{ExtractArgs, OutputFormat};

pub fn handle(args: &ExtractArgs, format: OutputFormat, no_color: bool) -> anyhow::Result<()> {
    let style = OutputStyle::new(no_color);
    let bundle = open_bundle(&args.bundle)?;

    fs::create_dir_all(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    let mut written = Vec::new();
    let mut skipped = Vec::new();
    for (index, entry) in bundle.directory().iter().enumerate() {
        if args.serialized_only && !entry.is_serialized_file() {
            continue;
        }
        if let Some(filter) = &args.filter
            && !entry.path.contains(filter.as_str())
        {
            continue;
        }

        let Some(target) = output_path(&args.output, &entry.path) else {
            warn!(entry = %entry.path, "entry path escapes the output directory, skipping");
            skipped.push(entry.path.clone());
            continue;
        };
        let data = bundle.entry_data(index)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&target, data)
            .with_context(|| format!("failed to write {}", target.display()))?;
        info!(entry = %entry.path, size = data.len(), "extracted");
        written.push((entry.path.clone(), target, data.len()));
    }

    match format {
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let value = json!({
                "output": args.output.display().to_string(),
                "extracted": written.iter().map(|(path, target, size)| json!({
                    "path": path,
                    "file": target.display().to_string(),
                    "size": size,
                })).collect::<Vec<_>>(),
                "skipped": skipped,
            });
            print_json(&value, format).context("failed to serialize extraction report")?;
        }
        OutputFormat::Text => {
            for (path, target, size) in &written {
                println!(
                    "{}",
                    format_key_value(
                        path,
                        &format!(
                            "{} -> {}",
                            format_size(*size as u64),
                            format_path(&target.display().to_string(), style)
                        ),
                        style
                    )
                );
            }
            for path in &skipped {
                println!(
                    "{}",
                    format_warning(&format!("skipped unsafe path {path:?}"), style)
                );
            }
            println!(
                "{}",
                format_success(
                    &format!(
                        "Extracted {} entries to {}",
                        written.len(),
                        args.output.display()
                    ),
                    style
                )
            );
        }
    }
    Ok(())
}

/// Join an entry path under `root`, or `None` if it is absolute or climbs
/// out of `root`. Both separators are accepted.
fn output_path(root: &Path, entry_path: &str) -> Option<PathBuf> {
    let normalized = entry_path.replace('\\', "/");
    let relative = Path::new(&normalized);
    let mut target = root.to_path_buf();
    let mut depth = 0usize;
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                target.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    (depth > 0).then_some(target)
}
