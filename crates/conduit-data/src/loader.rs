//! Loading pipeline: reads data files, resolves `extends` references, builds
//! the block catalog and the engine configuration.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers.

use crate::schema::BlockData;
use conduit_core::catalog::{BlockCatalog, BlockTypeDef, CatalogBuilder, CatalogError};
use conduit_core::config::EngineConfig;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Base name of the block catalog file.
pub const BLOCKS_FILE: &str = "blocks";
/// Base name of the engine configuration file.
pub const ENGINE_FILE: &str = "engine";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The resolved definitions do not form a valid catalog.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at the
/// given `toml_key` from a top-level table. For RON and JSON, deserializes
/// directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(path: &Path, toml_key: &str) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }
    let content = std::fs::read_to_string(path)?;
    let mut table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .remove(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?;
    array.try_into().map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Check whether a name already exists in a map, returning a `DuplicateName`
/// error if so.
pub fn check_duplicate<V>(map: &HashMap<String, V>, name: &str, file: &Path) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Catalog and configuration
// ===========================================================================

/// Resolve block entries into a frozen catalog.
///
/// Entries register in file order; an `extends` reference must name an
/// entry that appears earlier. `file` is only used in error messages.
pub fn build_catalog(blocks: &[BlockData], file: &Path) -> Result<BlockCatalog, DataLoadError> {
    let mut resolved: HashMap<String, BlockTypeDef> = HashMap::new();
    let mut builder = CatalogBuilder::new();

    for block in blocks {
        check_duplicate(&resolved, &block.name, file)?;
        let def = match &block.extends {
            Some(base) => block.apply(resolve_name(&resolved, base, file, "block")?.clone()),
            None => block.to_def(),
        };
        builder.register(def.clone())?;
        resolved.insert(block.name.clone(), def);
    }

    Ok(builder.build()?)
}

/// Load `blocks.{ron,toml,json}` from `dir`.
pub fn load_catalog(dir: &Path) -> Result<BlockCatalog, DataLoadError> {
    let path = require_data_file(dir, BLOCKS_FILE)?;
    let blocks: Vec<BlockData> = deserialize_list(&path, "blocks")?;
    let catalog = build_catalog(&blocks, &path)?;
    tracing::info!(file = %path.display(), blocks = catalog.len(), "block catalog loaded");
    Ok(catalog)
}

/// Load `engine.{ron,toml,json}` from `dir`, or the defaults if absent.
pub fn load_engine_config(dir: &Path) -> Result<EngineConfig, DataLoadError> {
    match find_data_file(dir, ENGINE_FILE)? {
        Some(path) => {
            let config = deserialize_file(&path)?;
            tracing::info!(file = %path.display(), "engine configuration loaded");
            Ok(config)
        }
        None => {
            tracing::debug!(dir = %dir.display(), "no engine configuration; using defaults");
            Ok(EngineConfig::default())
        }
    }
}

/// Everything an engine needs from a data directory.
#[derive(Debug, Clone)]
pub struct EngineData {
    pub catalog: BlockCatalog,
    pub config: EngineConfig,
}

pub fn load_engine_data(dir: &Path) -> Result<EngineData, DataLoadError> {
    Ok(EngineData {
        catalog: load_catalog(dir)?,
        config: load_engine_config(dir)?,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
