use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

fn default_n_clusters() -> usize {
    2
}

fn default_max_iter() -> usize {
    10
}

/// Settings for a k-means run, loadable from a JSON file.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct KMeansConfig {
    #[serde(default = "default_n_clusters", alias = "n-clusters")]
    pub n_clusters: usize,
    #[serde(default = "default_max_iter", alias = "maxiter")]
    pub max_iter: usize,
    #[serde(default, alias = "elem")]
    pub elementwise: bool,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            n_clusters: default_n_clusters(),
            max_iter: default_max_iter(),
            elementwise: false,
            seed: None,
        }
    }
}

impl KMeansConfig {
    pub fn load(config_path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        if !Path::new(config_path).exists() {
            return Err(format!("Config file not found at: {}", config_path).into());
        }

        let mut file = File::open(config_path)
            .map_err(|e| format!("Failed to open config file {}: {}", config_path, e))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| format!("Failed to read config file {}: {}", config_path, e))?;

        let config: KMeansConfig = serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to deserialize JSON from {}: {}", config_path, e))?;

        Ok(config)
    }
}
