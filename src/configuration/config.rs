#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::env;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::fs;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    ConfigFile,
    GeminiToken,
    #[strum(serialize = "gemini-url")]
    GeminiURL,
    ImageModel,
    OutputDir,
    RequestTimeout,
    StorageDir,
    TextModel,
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    fn app_dir(base: Option<path::PathBuf>) -> path::PathBuf {
        return base
            .unwrap_or_else(|| return path::PathBuf::from("."))
            .join("gardenia");
    }

    pub fn default(key: ConfigKey) -> String {
        #[cfg(not(target_os = "macos"))]
        let config_path = Config::app_dir(dirs::config_dir()).join("config.toml");
        #[cfg(target_os = "macos")]
        let config_path = Config::app_dir(env::var("HOME").ok().map(|home| {
            return path::PathBuf::from(home).join(".config");
        }))
        .join("config.toml");

        let storage_dir = Config::app_dir(dirs::data_dir()).join("storage");

        let res = match key {
            ConfigKey::GeminiToken => "".to_string(),
            ConfigKey::GeminiURL => "https://generativelanguage.googleapis.com".to_string(),
            ConfigKey::ImageModel => "gemini-2.5-flash-image".to_string(),
            ConfigKey::OutputDir => "gardenia-designs".to_string(),
            ConfigKey::RequestTimeout => "120000".to_string(),
            ConfigKey::TextModel => "gemini-2.5-flash".to_string(),

            // Special
            ConfigKey::ConfigFile => config_path.to_string_lossy().to_string(),
            ConfigKey::StorageDir => storage_dir.to_string_lossy().to_string(),
        };

        return res;
    }

    /// Path of the debug log directory, overridable with `GARDENIA_LOG_DIR`.
    pub fn log_dir() -> path::PathBuf {
        if let Ok(dir) = env::var("GARDENIA_LOG_DIR") {
            return path::PathBuf::from(dir);
        }

        return Config::app_dir(dirs::cache_dir());
    }

    /// Reads one key from the config file. Empty strings count as unset.
    fn file_value(doc: &toml_edit::Document, key: ConfigKey) -> Result<Option<String>> {
        let item = match doc.get(&key.to_string()) {
            Some(item) => item,
            None => return Ok(None),
        };

        if let Some(num) = item.as_integer() {
            return Ok(Some(num.to_string()));
        }

        match item.as_str() {
            Some("") => return Ok(None),
            Some(text) => return Ok(Some(text.to_string())),
            None => bail!(format!(
                "config.toml has an invalid value for key '{key}', expected a string or integer"
            )),
        }
    }

    /// Layers defaults, the config file, then environment and flags.
    pub async fn load(clap_arg_matches: Vec<&ArgMatches>) -> Result<()> {
        for key in ConfigKey::iter() {
            Config::set(key, &Config::default(key))
        }

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for matches in clap_arg_matches.as_slice() {
            if let Ok(Some(arg_config_file)) =
                matches.try_get_one::<String>(&ConfigKey::ConfigFile.to_string())
            {
                config_file = arg_config_file.to_string();
            }
        }

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let doc = fs::read_to_string(&config_path)
                .await?
                .parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                if let Some(val) = Config::file_value(&doc, key)? {
                    Config::set(key, &val);
                }
            }
            tracing::debug!(path = ?config_path, "Loaded config file");
        }

        for key in ConfigKey::iter() {
            for matches in clap_arg_matches.as_slice() {
                if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                    if val.is_empty() {
                        continue;
                    }
                    Config::set(key, val)
                }
            }
        }

        if Config::get(ConfigKey::RequestTimeout).parse::<u64>().is_err() {
            bail!(format!(
                "request-timeout must be a number of milliseconds, got '{}'",
                Config::get(ConfigKey::RequestTimeout)
            ));
        }

        tracing::debug!(
            gemini_url = Config::get(ConfigKey::GeminiURL),
            image_model = Config::get(ConfigKey::ImageModel),
            text_model = Config::get(ConfigKey::TextModel),
            request_timeout = Config::get(ConfigKey::RequestTimeout),
            storage_dir = Config::get(ConfigKey::StorageDir),
            output_dir = Config::get(ConfigKey::OutputDir),
            "config"
        );

        return Ok(());
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::ConfigFile {
                    return None;
                }

                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))?;

                let mut description = arg
                    .get_help()
                    .map(|help| return help.to_string())
                    .unwrap_or_default();

                description = description
                    .split("[default:")
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if val.parse::<i64>().is_ok() {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = {}", toml_edit::value(val.as_str()));
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}
