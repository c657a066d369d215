//! JSON output document
//!
//! One document per run, holding the compiled descriptors of every input
//! database in input order.

use anyhow::{Context, Result};
use can_codec::{CompiledDatabase, DatabaseStats};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Compiled descriptors of one input file
#[derive(Debug, Serialize)]
pub struct CompiledFile {
    /// DBC file the descriptors were derived from
    pub source: PathBuf,
    /// Statistics of the parsed database
    pub stats: DatabaseStats,
    #[serde(flatten)]
    pub compiled: CompiledDatabase,
}

#[derive(Debug, Serialize)]
pub struct Document {
    pub generator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    pub databases: Vec<CompiledFile>,
}

impl Document {
    pub fn new(databases: Vec<CompiledFile>, timestamp: bool) -> Self {
        Self {
            generator: format!("can-codec {}", can_codec::VERSION),
            generated_at: timestamp.then(|| chrono::Utc::now().to_rfc3339()),
            databases,
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        json.context("Failed to serialize compiled descriptors")
    }

    /// Write the document to `path`, or stdout if none
    pub fn write(&self, path: Option<&Path>, pretty: bool) -> Result<()> {
        let json = self.to_json(pretty)?;
        match path {
            Some(path) => {
                fs::write(path, json + "\n")
                    .with_context(|| format!("Failed to write output file: {:?}", path))?;
                log::info!("Wrote {:?}", path);
            }
            None => println!("{}", json),
        }
        Ok(())
    }
}
