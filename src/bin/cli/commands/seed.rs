use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use marginalia_lib::annotations::{Annotation, InitialAnnotations};
use marginalia_lib::store::AnnotationStore;

use crate::app::App;
use crate::OutputFormat;

/// Accepted seed file shapes
#[derive(Deserialize)]
#[serde(untagged)]
enum SeedFile {
    List(Vec<Annotation>),
    Wrapped(InitialAnnotations),
}

pub async fn run(app: &App, file: &Path, format: &OutputFormat) -> Result<()> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let seed: SeedFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse annotations in {}", file.display()))?;
    let annotations = match seed {
        SeedFile::List(annotations) => annotations,
        SeedFile::Wrapped(initial) => initial.highlights,
    };

    let count = app
        .store
        .init_annotations(annotations)
        .await
        .context("Failed to write annotations")?;

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "seeded": count,
                    "store": app.store.path().display().to_string(),
                }))?
            );
        }
        OutputFormat::Plain => {
            println!("Seeded {} annotations into {}", count, app.store.path().display());
        }
    }

    Ok(())
}
