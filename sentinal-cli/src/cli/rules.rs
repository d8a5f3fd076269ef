//! Rules command: list the rule catalog

use super::build_catalog;
use anyhow::{anyhow, Result};
use console::style;
use sentinal::config::ProjectConfig;
use sentinal::models::ArtifactKind;

pub(super) fn run(config: &ProjectConfig, kind: Option<&str>) -> Result<()> {
    let catalog = build_catalog(config)?;

    let kinds: Vec<ArtifactKind> = match kind {
        Some(k) => {
            let parsed: ArtifactKind = k.parse().map_err(|e| anyhow!("{}", e))?;
            if !parsed.is_supported() {
                return Err(anyhow!("No rules for artifact kind '{}'", k));
            }
            vec![parsed]
        }
        None => ArtifactKind::SUPPORTED.to_vec(),
    };

    for kind in kinds {
        let rules = catalog.rules(kind);
        println!("\n{} ({} rules)", style(kind.to_string().to_uppercase()).bold(), rules.len());
        for rule in rules {
            println!(
                "  {:<9} {:<22} {}",
                rule.severity.to_string(),
                style(&rule.category).cyan(),
                rule.description
            );
        }
    }
    println!();
    Ok(())
}
