use std::path::Path;

use anyhow::{Context, Result};

use marginalia_lib::publication::Publication;
use marginalia_lib::sidebar::{build_tree, render_tree};
use marginalia_lib::store::AnnotationStore;

use crate::app::App;
use crate::OutputFormat;

pub async fn run(
    app: &App,
    manifest: &Path,
    base_url: &str,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let publication = Publication::load(manifest, base_url)
        .with_context(|| format!("Failed to load manifest {}", manifest.display()))?;
    let annotations = app
        .store
        .get_annotations()
        .await
        .context("Failed to read annotations")?;

    let tree = build_tree(&publication, &annotations, &app.settings.ui);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
        OutputFormat::Plain => {
            if let Some(title) = publication.title() {
                println!("{}", title);
            }
            if tree.is_empty() {
                println!("(no annotations)");
            } else {
                println!("{}", render_tree(&tree, use_color));
            }
        }
    }

    Ok(())
}
