//! `opsclaw upload` — push a file to the knowledge base.

use opsclaw_config::AppConfig;
use opsclaw_core::display::print_box;
use opsclaw_tools::KnowledgeBaseUploader;
use std::path::Path;

pub async fn run(
    config: &AppConfig,
    file: &Path,
    name: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let uploader = KnowledgeBaseUploader::from_config(&config.knowledge_base)
        .ok_or("Knowledge base upload needs ELEVEN_LABS_API_KEY and knowledge_base.enabled = true")?;

    let name = name
        .or_else(|| file.file_name().map(|n| n.to_string_lossy().into_owned()))
        .ok_or_else(|| format!("Cannot derive a document name from {}", file.display()))?;

    let receipt = uploader.upload(file, &name).await?;
    print_box("Knowledge Base Upload", &receipt.message, Some("green"));
    Ok(())
}
