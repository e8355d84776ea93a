use serde::Deserialize;

/// TOML-deserializable config file. All fields are Option for layered merging.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub defaults: DefaultsFileConfig,
    #[serde(default)]
    pub targeting: TargetingFileConfig,
    #[serde(default)]
    pub filters: FiltersFileConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultsFileConfig {
    pub format: Option<String>,
    pub lang: Option<String>,
    pub quiet: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TargetingFileConfig {
    pub ext: Option<Vec<String>>,
    pub exclude_ext: Option<Vec<String>>,
    pub ignore_paths: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FiltersFileConfig {
    pub include_verbs: Option<Vec<String>>,
    pub exclude_verbs: Option<Vec<String>>,
    pub auth: Option<String>,
}

impl FileConfig {
    /// Load from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}
