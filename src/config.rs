use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{histograms::HistogramSettings, AnglesError, AnglesResult};

fn default_mass_bin_pattern() -> String {
    "*".to_string()
}

fn default_in_tree_name() -> String {
    "rootPwaEvtTree".to_string()
}

fn default_prod_kin_part_names_obj_name() -> String {
    "prodKinParticles".to_string()
}

fn default_decay_kin_part_names_obj_name() -> String {
    "decayKinParticles".to_string()
}

fn default_prod_kin_momenta_leaf_name() -> String {
    "prodKinMomenta".to_string()
}

fn default_decay_kin_momenta_leaf_name() -> String {
    "decayKinMomenta".to_string()
}

fn default_phase_space_quantifier() -> String {
    "genbod".to_string()
}

fn default_acc_corr_quantifier() -> String {
    "acc".to_string()
}

/// The run configuration.
///
/// Read from a YAML file with camelCase keys, for example
/// ```yaml
/// dataDirectory: ~/data/3pi
/// massBinDirectoryNamePattern: "*"
/// pdgFileName: particleDataTable.txt
/// decayKinPartNames: [pi-, pi-, pi+]
/// histograms:
///   mass: {bins: 50, low: 0.5, high: 2.5}
/// ```
/// `~` and environment variables are expanded in every path, and relative paths are resolved
/// against the directory containing the configuration file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Directory containing one subdirectory per mass bin.
    pub data_directory: PathBuf,
    /// Glob pattern selecting the mass-bin directories inside [`Config::data_directory`].
    #[serde(default = "default_mass_bin_pattern")]
    pub mass_bin_directory_name_pattern: String,
    /// Path of the particle data table.
    pub pdg_file_name: PathBuf,
    /// Name of the event tree (ROOT) inside each data file.
    #[serde(default = "default_in_tree_name")]
    pub in_tree_name: String,
    /// Metadata key holding the production particle names.
    #[serde(default = "default_prod_kin_part_names_obj_name")]
    pub prod_kin_part_names_obj_name: String,
    /// Metadata key holding the decay particle names.
    #[serde(default = "default_decay_kin_part_names_obj_name")]
    pub decay_kin_part_names_obj_name: String,
    /// Column prefix of the production momenta.
    #[serde(default = "default_prod_kin_momenta_leaf_name")]
    pub prod_kin_momenta_leaf_name: String,
    /// Column prefix of the decay momenta.
    #[serde(default = "default_decay_kin_momenta_leaf_name")]
    pub decay_kin_momenta_leaf_name: String,
    /// Production particle names used when a data file does not carry them.
    #[serde(default)]
    pub prod_kin_part_names: Option<Vec<String>>,
    /// Decay particle names used when a data file does not carry them.
    #[serde(default)]
    pub decay_kin_part_names: Option<Vec<String>>,
    /// Files whose stem ends in `.<quantifier>` hold phase-space events and are skipped.
    #[serde(default = "default_phase_space_quantifier")]
    pub phase_space_event_file_extension_quantifier: String,
    /// Files whose stem ends in `.<quantifier>` hold accepted phase-space events and are skipped.
    #[serde(default = "default_acc_corr_quantifier")]
    pub acc_corr_ps_event_file_extension_quantifier: String,
    /// Histogram binning.
    #[serde(default)]
    pub histograms: HistogramSettings,
}

impl Config {
    /// Create a configuration with default settings for the given data directory and particle
    /// data table.
    pub fn new<D: Into<PathBuf>, P: Into<PathBuf>>(data_directory: D, pdg_file_name: P) -> Self {
        Self {
            data_directory: data_directory.into(),
            mass_bin_directory_name_pattern: default_mass_bin_pattern(),
            pdg_file_name: pdg_file_name.into(),
            in_tree_name: default_in_tree_name(),
            prod_kin_part_names_obj_name: default_prod_kin_part_names_obj_name(),
            decay_kin_part_names_obj_name: default_decay_kin_part_names_obj_name(),
            prod_kin_momenta_leaf_name: default_prod_kin_momenta_leaf_name(),
            decay_kin_momenta_leaf_name: default_decay_kin_momenta_leaf_name(),
            prod_kin_part_names: None,
            decay_kin_part_names: None,
            phase_space_event_file_extension_quantifier: default_phase_space_quantifier(),
            acc_corr_ps_event_file_extension_quantifier: default_acc_corr_quantifier(),
            histograms: HistogramSettings::default(),
        }
    }

    /// Read and validate a configuration file.
    pub fn read_file<P: AsRef<Path>>(path: P) -> AnglesResult<Self> {
        let path = expand_path(&path.as_ref().to_string_lossy())?;
        let text = fs::read_to_string(&path).map_err(|err| AnglesError::ConfigError {
            path: path.display().to_string(),
            reason: format!("cannot read file ({err})"),
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&text, base_dir).map_err(|err| match err {
            AnglesError::ConfigError { reason, .. } => AnglesError::ConfigError {
                path: path.display().to_string(),
                reason,
            },
            other => AnglesError::ConfigError {
                path: path.display().to_string(),
                reason: other.to_string(),
            },
        })
    }

    /// Parse and validate a configuration from YAML text, resolving relative paths against
    /// `base_dir`.
    pub fn from_yaml(text: &str, base_dir: &Path) -> AnglesResult<Self> {
        let mut config: Self = serde_yaml_ng::from_str(text)?;
        config.data_directory = resolve_path(&config.data_directory, base_dir)?;
        config.pdg_file_name = resolve_path(&config.pdg_file_name, base_dir)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values which cannot work.
    pub fn validate(&self) -> AnglesResult<()> {
        let invalid = |reason: String| AnglesError::ConfigError {
            path: String::new(),
            reason,
        };
        if self.mass_bin_directory_name_pattern.is_empty() {
            return Err(invalid(
                "massBinDirectoryNamePattern must not be empty".to_string(),
            ));
        }
        glob::Pattern::new(&self.mass_bin_directory_name_pattern)?;
        for (key, value) in [
            ("inTreeName", &self.in_tree_name),
            ("prodKinMomentaLeafName", &self.prod_kin_momenta_leaf_name),
            ("decayKinMomentaLeafName", &self.decay_kin_momenta_leaf_name),
        ] {
            if value.is_empty() {
                return Err(invalid(format!("{key} must not be empty")));
            }
        }
        if let Some(names) = &self.prod_kin_part_names {
            if names.is_empty() {
                return Err(invalid(
                    "prodKinPartNames must list at least the beam".to_string(),
                ));
            }
        }
        self.histograms
            .validate()
            .map_err(|err| invalid(format!("histograms: {err}")))
    }

    /// The glob pattern matching every mass-bin directory.
    pub fn mass_bin_glob(&self) -> String {
        let directory = glob::Pattern::escape(&self.data_directory.to_string_lossy());
        format!(
            "{}/{}",
            directory.trim_end_matches('/'),
            self.mass_bin_directory_name_pattern
        )
    }
}

/// Expand `~` and environment variables in a path.
pub fn expand_path(path: &str) -> AnglesResult<PathBuf> {
    Ok(PathBuf::from(&*shellexpand::full(path)?))
}

fn resolve_path(path: &Path, base_dir: &Path) -> AnglesResult<PathBuf> {
    let expanded = expand_path(&path.to_string_lossy())?;
    if expanded.is_relative() {
        Ok(base_dir.join(expanded))
    } else {
        Ok(expanded)
    }
}
