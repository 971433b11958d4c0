use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use derivative::Derivative;
use getset::Setters;
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::utils::fs::has_file_in_file_tree;

/// Key of the loader config in package.json
const PACKAGE_JSON_KEY: &str = "tsloader";

#[derive(Derivative, Serialize, Deserialize, Setters)]
#[derivative(Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[getset(set = "pub")]
pub struct LoaderConfig {
  /// When set, the source map of every compiled module is appended to the
  /// code as a base64 data url. Otherwise, the map is kept in the source
  /// map registry. Maps never carry the original source text.
  #[serde(default)]
  pub embed_source_maps: bool,

  /// Extension of the files that are compiled. A leading dot is dropped.
  #[serde(
    default = "_default_extension",
    deserialize_with = "deserialize_extension"
  )]
  #[derivative(Default(value = "_default_extension()"))]
  pub extension: String,
}

fn _default_extension() -> String {
  String::from("ts")
}

fn deserialize_extension<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  let extension = String::deserialize(deserializer)?;
  match extension.trim_start_matches('.') {
    "" => Err(de::Error::custom("extension can't be empty")),
    trimmed => Ok(trimmed.to_owned()),
  }
}

#[derive(Deserialize)]
struct Package {
  #[serde(rename = "tsloader")]
  loader: Option<LoaderConfig>,
}

impl LoaderConfig {
  /// Loads the config from `package.json` in the given directory.
  /// Returns the default config if package.json doesn't have a
  /// `tsloader` field.
  pub fn load(dir: &Path) -> Result<Self> {
    Self::from_file(&dir.join("package.json"))
  }

  /// Finds the closest package.json up the directory tree from `dir`
  /// and loads the config from it. Defaults are used if no package.json
  /// is found.
  pub fn find_in_path_hierarchy(dir: &Path) -> Result<Self> {
    match has_file_in_file_tree(Some(dir), "package.json") {
      Some(package_dir) => Self::load(&package_dir),
      None => Ok(Self::default()),
    }
  }

  fn from_file(file: &PathBuf) -> Result<Self> {
    let content = fs::read(file).map_err(|e| anyhow!("{}: {:?}", e, file))?;
    let package = serde_json::from_slice::<Package>(&content)
      .map_err(|e| anyhow!("Invalid {PACKAGE_JSON_KEY} config: {e}"))?;
    Ok(package.loader.unwrap_or_default())
  }
}
