use crate::error::BetsFileError;
use crate::models::{Bet, BetsFile};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Answer of [`save_bets_file`]; failures are reported, never raised
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Parse bets.json text. The top level must be an object with a "bets" array.
pub fn parse_bets_json(json: &str) -> Result<BetsFile, BetsFileError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if !value.get("bets").is_some_and(serde_json::Value::is_array) {
        return Err(BetsFileError::Invalid(
            "JSON must contain a \"bets\" array.".to_string(),
        ));
    }
    Ok(serde_json::from_value(value)?)
}

/// Load bets from a JSON file. A missing file means no bets.
pub fn load_bets_file(path: impl AsRef<Path>) -> Result<BetsFile, BetsFileError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(BetsFile::default());
    }
    let json = std::fs::read_to_string(path)?;
    parse_bets_json(&json)
}

/// Save bets to a JSON file, creating parent directories as needed
pub fn save_bets_file(path: impl AsRef<Path>, bets: &[Bet]) -> SaveResult {
    match write_bets_file(path.as_ref(), bets) {
        Ok(()) => SaveResult {
            ok: true,
            error: None,
        },
        Err(e) => {
            warn!(path = %path.as_ref().display(), error = %e, "Failed to save bets file");
            SaveResult {
                ok: false,
                error: Some(e.to_string()),
            }
        }
    }
}

fn write_bets_file(path: &Path, bets: &[Bet]) -> Result<(), BetsFileError> {
    let file = BetsFile {
        bets: bets.to_vec(),
    };
    let json = serde_json::to_string_pretty(&file)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    Ok(())
}
