//! `opsclaw doctor` — report which keys and endpoints are configured.

use opsclaw_config::{AppConfig, SpeechBackend};
use std::path::Path;

/// One line of the report.
struct Check {
    label: &'static str,
    ok: bool,
    hint: &'static str,
}

fn key_checks(config: &AppConfig) -> Vec<Check> {
    vec![
        Check {
            label: "Anthropic API key (agent)",
            ok: config.has_api_key(),
            hint: "set ANTHROPIC_API_KEY; prompt and oncall cannot run without it",
        },
        Check {
            label: "Gemini API key (graph analysis)",
            ok: config.vision.api_key.is_some(),
            hint: "set GEMINI_API_KEY to enable check_graph_for_anomalies",
        },
        Check {
            label: "ElevenLabs API key (knowledge base)",
            ok: !config.knowledge_base.enabled || config.knowledge_base.api_key.is_some(),
            hint: "set ELEVEN_LABS_API_KEY or disable [knowledge_base]",
        },
        Check {
            label: "ElevenLabs API key (speech)",
            ok: config.speech.backend != SpeechBackend::Elevenlabs || config.speech.api_key.is_some(),
            hint: "set ELEVEN_LABS_API_KEY or use speech.backend = \"local\"",
        },
    ]
}

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 opsclaw doctor");
    println!("========================================\n");

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    if path.exists() {
        println!("  ✅ Config file: {}", path.display());
    } else {
        println!("  ⚠️  No config file at {} (using defaults)", path.display());
    }

    let config = match AppConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            return Ok(());
        }
    };

    let mut issues = 0;
    for check in key_checks(&config) {
        if check.ok {
            println!("  ✅ {}", check.label);
        } else {
            println!("  ⚠️  {} missing: {}", check.label, check.hint);
            issues += 1;
        }
    }

    println!();
    println!("  Model:        {}", config.model);
    println!("  LLM API:      {}", config.api_url);
    println!("  Web service:  {}", config.web_service.base_url);
    println!("  Vision model: {}", config.vision.model);
    println!("  Shell:        {:?} approval", config.shell.approval);
    println!("  Speech:       {:?}", config.speech.backend);
    println!(
        "  Rate limit:   {} tokens / {} ms (cooldown at {:.0}%)",
        config.rate_limit.tokens_per_minute,
        config.rate_limit.window_ms,
        config.rate_limit.threshold * 100.0
    );

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
