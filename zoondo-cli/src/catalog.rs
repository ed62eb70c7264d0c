//! Check-catalog command - load a catalog and list what it references

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use zoondo_core::{Capabilities, Catalog};

#[derive(Args)]
pub struct CatalogArgs {
    /// Catalog JSON file
    pub path: PathBuf,
}

pub fn run(args: CatalogArgs) -> Result<()> {
    let catalog = Catalog::load(&args.path)?;
    let missing = unregistered_resolvers(&catalog, &Capabilities::builtin());

    let mut tribes: Vec<_> = catalog.tribes.values().collect();
    tribes.sort_by(|a, b| a.name.cmp(&b.name));
    for tribe in tribes {
        println!(
            "{}: {} fighters, {} trumps, {} in hand",
            tribe.name,
            tribe.fighters.len(),
            tribe.trumps.len(),
            tribe.composition.trumps.len()
        );
    }

    for name in &missing {
        tracing::warn!("Resolver {} has no registered capability; it will count as a draw", name);
    }
    println!("{} resolvers, {} unregistered", catalog.resolvers().len(), missing.len());

    Ok(())
}

/// Resolver names the catalog uses that no capability answers to
fn unregistered_resolvers(catalog: &Catalog, capabilities: &Capabilities) -> Vec<String> {
    catalog
        .resolvers()
        .into_iter()
        .filter(|name| !capabilities.contains(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_catalog_is_fully_registered() {
        let missing = unregistered_resolvers(&Catalog::sample().unwrap(), &Capabilities::builtin());
        assert!(missing.is_empty(), "unregistered: {missing:?}");
    }

    #[test]
    fn test_empty_registry_reports_every_resolver() {
        let catalog = Catalog::sample().unwrap();
        let missing = unregistered_resolvers(&catalog, &Capabilities::new());
        assert_eq!(missing, catalog.resolvers());
    }
}
