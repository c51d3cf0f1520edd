//! Rendering a project as YAML or JSON.
//!
//! The YAML view is the typed model written out as-is. The JSON view is a
//! key-ordered map that always carries `name` and `services` and splices
//! extension fields in at the top level.

use composure_common::constants::RESERVED_PROJECT_KEYS;
use composure_common::error::{ComposeError, Result};
use serde_json::{Map, Value};

use crate::project::Project;
use crate::types::{ServiceVolumeConfig, VolumeType};

impl Project {
    /// Renders the project as YAML.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::ExtensionConflict` if an extension key shadows
    /// a project key, `ComposeError::InvalidVolume` for a mount without a
    /// target or a bind mount without a source, and `ComposeError::Yaml`
    /// if encoding fails.
    pub fn to_yaml(&self) -> Result<Vec<u8>> {
        self.check_serializable()?;
        Ok(serde_yaml::to_string(self)?.into_bytes())
    }

    /// Renders the project as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Project::to_yaml`], with encoding failures
    /// reported as `ComposeError::Serialization`.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        self.check_serializable()?;

        let mut map = Map::new();
        let _ = map.insert("name".into(), Value::String(self.name.clone()));
        let _ = map.insert("services".into(), serde_json::to_value(&self.services)?);
        if !self.networks.is_empty() {
            let _ = map.insert("networks".into(), serde_json::to_value(&self.networks)?);
        }
        if !self.volumes.is_empty() {
            let _ = map.insert("volumes".into(), serde_json::to_value(&self.volumes)?);
        }
        if !self.secrets.is_empty() {
            let _ = map.insert("secrets".into(), serde_json::to_value(&self.secrets)?);
        }
        if !self.configs.is_empty() {
            let _ = map.insert("configs".into(), serde_json::to_value(&self.configs)?);
        }
        for (key, value) in &self.extensions {
            let _ = map.insert(key.clone(), value.clone());
        }

        Ok(serde_json::to_vec_pretty(&Value::Object(map))?)
    }

    fn check_serializable(&self) -> Result<()> {
        if let Some(key) = self
            .extensions
            .keys()
            .find(|key| RESERVED_PROJECT_KEYS.contains(&key.as_str()))
        {
            return Err(ComposeError::ExtensionConflict { key: key.clone() });
        }
        for (name, service) in &self.services {
            for volume in &service.volumes {
                check_volume(name, volume)?;
            }
        }
        Ok(())
    }
}

fn check_volume(service: &str, volume: &ServiceVolumeConfig) -> Result<()> {
    if volume.target.is_empty() {
        return Err(ComposeError::InvalidVolume {
            message: format!("service {service}: {} mount has no target", volume.kind),
        });
    }
    if matches!(volume.kind, VolumeType::Bind | VolumeType::Npipe) && volume.source.is_empty() {
        return Err(ComposeError::InvalidVolume {
            message: format!(
                "service {service}: {} mount on {} has no source",
                volume.kind, volume.target
            ),
        });
    }
    Ok(())
}
