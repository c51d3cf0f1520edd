//! Dropping shared resources no enabled service uses.

use std::collections::{BTreeMap, BTreeSet};

use crate::project::Project;
use crate::types::ServiceConfig;

/// Names of the resources enabled services refer to.
#[derive(Debug, Default)]
struct Requirements {
    networks: BTreeSet<String>,
    volumes: BTreeSet<String>,
    secrets: BTreeSet<String>,
    configs: BTreeSet<String>,
}

impl Requirements {
    fn add(&mut self, service: &ServiceConfig) {
        self.networks.extend(service.networks.keys().cloned());
        self.volumes.extend(
            service
                .volumes
                .iter()
                .filter(|volume| volume.is_named_volume())
                .map(|volume| volume.source.clone()),
        );
        self.secrets
            .extend(service.secrets.iter().map(|secret| secret.source.clone()));
        if let Some(build) = &service.build {
            self.secrets
                .extend(build.secrets.iter().map(|secret| secret.source.clone()));
        }
        self.configs
            .extend(service.configs.iter().map(|config| config.source.clone()));
    }
}

fn retain_required<V>(resources: &mut BTreeMap<String, V>, required: &BTreeSet<String>) {
    resources.retain(|name, _| required.contains(name));
}

impl Project {
    /// Returns a copy keeping only the networks, named volumes, secrets and
    /// configs that enabled services reference.
    ///
    /// Bind mounts and anonymous volumes never keep a volume alive.
    /// References to resources the project does not declare are ignored.
    #[must_use]
    pub fn without_unnecessary_resources(&self) -> Self {
        let mut required = Requirements::default();
        for service in self.services.values() {
            required.add(service);
        }
        tracing::debug!(
            networks = required.networks.len(),
            volumes = required.volumes.len(),
            secrets = required.secrets.len(),
            configs = required.configs.len(),
            "pruning unused resources"
        );

        let mut project = self.clone();
        retain_required(&mut project.networks, &required.networks);
        retain_required(&mut project.volumes, &required.volumes);
        retain_required(&mut project.secrets, &required.secrets);
        retain_required(&mut project.configs, &required.configs);
        project
    }
}
