use anyhow::{Context, Result};

use marginalia_lib::publication::strip_fragment;
use marginalia_lib::sidebar::readable_timestamp;
use marginalia_lib::store::AnnotationStore;

use crate::app::App;
use crate::OutputFormat;

pub async fn run(app: &App, href: Option<&str>, format: &OutputFormat) -> Result<()> {
    let mut annotations = app
        .store
        .get_annotations()
        .await
        .context("Failed to read annotations")?;

    if let Some(href) = href {
        annotations.retain(|a| strip_fragment(&a.href) == strip_fragment(href));
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&annotations)?);
        }
        OutputFormat::Plain => {
            if annotations.is_empty() {
                println!("(no annotations)");
                return Ok(());
            }
            for a in &annotations {
                println!(
                    "{}  {:>3}%  {:<9}  {}",
                    a.id,
                    (a.progression() * 100.0).round() as i64,
                    a.marker.as_str(),
                    a.href
                );
                println!("    \"{}\"  {}", a.text.highlight.trim(), readable_timestamp(&a.created));
            }
        }
    }

    Ok(())
}
