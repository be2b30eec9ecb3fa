//! Implementation of the `pinsh store` subcommands.
//!
//! The store commands manage the local content-addressed store that backs
//! resolution: `add` registers an entry for a `(locator, pin)` pair and
//! `list` shows what the store holds.

use anyhow::{Context, Result};
use clap::Subcommand;
use owo_colors::OwoColorize;

use pinsh_lib::store::{ContentStore, EntryMetadata};

use crate::output::{print_success, symbols, truncate_hash};

#[derive(Subcommand)]
pub enum StoreCommands {
  /// Register a store entry for a pinned locator
  Add {
    /// Locator the entry was materialized from
    locator: String,

    /// Exact pin the content corresponds to
    pin: String,

    /// Content hash to record
    #[arg(long)]
    hash: Option<String>,

    /// Capability tag the content provides (repeatable)
    #[arg(long = "capability")]
    capabilities: Vec<String>,

    /// Variant label for coexisting builds of the same pin
    #[arg(long)]
    variant: Option<String>,
  },

  /// List store entries
  List,
}

/// Execute a store subcommand.
pub fn cmd_store(command: StoreCommands) -> Result<()> {
  let store = ContentStore::new();

  match command {
    StoreCommands::Add {
      locator,
      pin,
      hash,
      capabilities,
      variant,
    } => {
      let mut metadata = EntryMetadata::new(&locator, &pin);
      if let Some(hash) = hash {
        metadata = metadata.with_hash(hash);
      }
      if let Some(variant) = variant {
        metadata = metadata.with_variant(variant);
      }
      for capability in capabilities {
        metadata = metadata.with_capability(capability);
      }

      let path = store.add(&metadata).context("Failed to add store entry")?;
      print_success(&format!("Added {}", path.display()));
    }

    StoreCommands::List => {
      let entries = store.entries().context("Failed to read store")?;

      if entries.is_empty() {
        println!("Store is empty: {}", store.store_dir().display());
        return Ok(());
      }

      for (path, metadata) in entries {
        let label = path
          .file_name()
          .map(|n| n.to_string_lossy().into_owned())
          .unwrap_or_default();

        println!(
          "  {} {} {} {}",
          symbols::INFO.dimmed(),
          label.cyan(),
          format!("{}#{}", metadata.locator, truncate_hash(&metadata.pin)).dimmed(),
          if metadata.capabilities.is_empty() {
            String::new()
          } else {
            format!("[{}]", metadata.capabilities.iter().cloned().collect::<Vec<_>>().join(", "))
          }
        );
      }
    }
  }

  Ok(())
}
