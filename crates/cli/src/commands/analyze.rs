//! `opsclaw analyze` — ask the vision model about one graph image.

use opsclaw_config::AppConfig;
use opsclaw_core::display::print_box;
use opsclaw_tools::anomaly::analyze_graph;
use std::path::Path;

pub async fn run(config: &AppConfig, image: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let vision = opsclaw_providers::vision_from_config(config)?
        .ok_or("GEMINI_API_KEY is not set; add it to the environment or [vision] in config.toml")?;

    let analysis = analyze_graph(&vision, image).await?;
    print_box(
        "Graph Analysis Result",
        &format!("Analysis of {}\n\n{analysis}", image.display()),
        None,
    );
    Ok(())
}
