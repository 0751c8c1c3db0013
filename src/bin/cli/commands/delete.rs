use anyhow::{Context, Result};

use marginalia_lib::coordinator::DeleteOutcome;

use crate::app::App;
use crate::OutputFormat;

pub async fn run(app: &App, id: &str, format: &OutputFormat) -> Result<()> {
    let outcome = app
        .coordinator()
        .delete(id)
        .await
        .with_context(|| format!("Failed to delete annotation {}", id))?;

    match format {
        OutputFormat::Json => {
            let output = match &outcome {
                DeleteOutcome::Deleted(annotation) => serde_json::json!({
                    "deleted": true,
                    "annotation": annotation,
                }),
                DeleteOutcome::NothingDeleted => serde_json::json!({
                    "deleted": false,
                    "id": id,
                }),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => match &outcome {
            DeleteOutcome::Deleted(annotation) => {
                println!("Deleted {} ({})", annotation.id, annotation.href);
            }
            DeleteOutcome::NothingDeleted => println!("No annotation with id {}", id),
        },
    }

    Ok(())
}
