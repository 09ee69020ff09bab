use crate::config::schema::{BootstrapConfig, OutputConfig};
use crate::error::{Error, Result};
use crate::output::{FrameSink, console::ConsoleSink, json::JsonLinesSink};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use validator::Validate;

/// Prefix of environment variables overriding bootstrap settings,
/// e.g. `ANALYTICS_DASHBOARD__DASHBOARD__SHOP_ID`.
pub const ENV_PREFIX: &str = "ANALYTICS_DASHBOARD";

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<BootstrapConfig> {
        let path = path.as_ref();
        let mut visited = HashSet::new();
        let config = Self::load_with_inheritance(path, &mut visited)?;
        let mut config = Self::apply_env_overrides(config)?;

        // Relative page paths are relative to the config file.
        if let Some(dir) = path.parent() {
            let page = Path::new(&config.page);
            if !config.page.is_empty() && page.is_relative() {
                config.page = dir.join(page).to_string_lossy().into_owned();
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn load_with_inheritance(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<BootstrapConfig> {
        let path = fs::canonicalize(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        if !visited.insert(path.clone()) {
            return Err(Error::Config(format!(
                "Circular inheritance detected involving {}",
                path.display()
            )));
        }

        let config = Self::load_file(&path)?;

        let Some(parent_path_str) = &config.extends else {
            return Ok(config);
        };

        let parent_path = path
            .parent()
            .ok_or_else(|| {
                Error::Config(format!(
                    "Cannot determine parent directory for {}",
                    path.display()
                ))
            })?
            .join(parent_path_str);

        let parent = Self::load_with_inheritance(&parent_path, visited)?;
        Ok(Self::merge_configs(parent, config))
    }

    fn load_file(path: &Path) -> Result<BootstrapConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            Some("toml") => Ok(toml::from_str(&content)?),
            _ => Err(Error::Config(format!(
                "Unsupported file extension: {}",
                path.display()
            ))),
        }
    }

    fn merge_configs(mut parent: BootstrapConfig, child: BootstrapConfig) -> BootstrapConfig {
        if !child.page.is_empty() {
            parent.page = child.page;
        }
        if child.output.is_some() {
            parent.output = child.output;
        }
        parent.progress |= child.progress;

        for (base, over) in [
            (&mut parent.dashboard, child.dashboard),
            (&mut parent.widget, child.widget),
        ] {
            if over.endpoint.is_some() {
                base.endpoint = over.endpoint;
            }
            if over.shop_id.is_some() {
                base.shop_id = over.shop_id;
            }
            if over.refresh_interval_secs.is_some() {
                base.refresh_interval_secs = over.refresh_interval_secs;
            }
            if over.time_range.is_some() {
                base.time_range = over.time_range;
            }
        }

        parent.extends = None;
        parent
    }

    fn apply_env_overrides(config: BootstrapConfig) -> Result<BootstrapConfig> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&config)?)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn create_sink(
        config: &BootstrapConfig,
        multi: Option<Arc<indicatif::MultiProgress>>,
    ) -> Result<Box<dyn FrameSink>> {
        let sink: Box<dyn FrameSink> = match &config.output {
            Some(OutputConfig::JsonLines { path }) => {
                Box::new(JsonLinesSink::new(PathBuf::from(path))?)
            }
            Some(OutputConfig::Console) | None => Box::new(ConsoleSink::new(multi)),
        };
        Ok(sink)
    }
}
