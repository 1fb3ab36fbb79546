//! Recipe file loading.
//!
//! A recipe is the collaborator-side JSON document pairing the raw string
//! parameter map (values may be `"NA"`) with the part capability profile and
//! optional per-station pipeline overrides. Numeric parsing happens inside
//! the core, at `ToleranceParameters::from_map`.

use std::collections::BTreeMap;
use std::path::Path;

use ringspect::{PartProfile, PreprocessConfig, RenderConfig, SelectionPolicy, StationConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeFile {
    /// Flat parameter map, string-valued with the `"NA"` sentinel.
    pub parameters: BTreeMap<String, String>,
    /// Which measurements and defect zones apply.
    pub profile: PartProfile,
    /// Optional pipeline overrides; defaults match `StationConfig::new`.
    #[serde(default)]
    pub preprocess: Option<PreprocessConfig>,
    #[serde(default)]
    pub selection: Option<SelectionPolicy>,
    #[serde(default)]
    pub render: Option<RenderConfig>,
}

impl RecipeFile {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Build one station's config with this recipe's overrides applied.
    pub fn station_config(&self, index: u8, out_dir: &Path) -> StationConfig {
        let mut config = StationConfig::new(index, out_dir);
        if let Some(pre) = &self.preprocess {
            config.preprocess = pre.clone();
        }
        if let Some(sel) = &self.selection {
            config.selection = sel.clone();
        }
        if let Some(render) = &self.render {
            config.render = *render;
        }
        config
    }
}
