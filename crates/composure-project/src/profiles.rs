//! Profile filtering and service selection.
//!
//! These operations move services between `services` and
//! `disabled_services`; the union of the two is preserved.

use std::collections::HashSet;

use composure_common::constants::ALL_PROFILES;
use composure_common::error::Result;

use crate::graph::DependencyPolicy;
use crate::project::Project;
use crate::types::{ServiceConfig, Services};

impl ServiceConfig {
    /// Returns true if the service is enabled under `profiles`.
    ///
    /// A service without profiles is always enabled, and the `*` profile
    /// enables every service.
    #[must_use]
    pub fn has_profile<S: AsRef<str>>(&self, profiles: &[S]) -> bool {
        if self.profiles.is_empty() {
            return true;
        }
        profiles.iter().map(AsRef::as_ref).any(|requested| {
            requested == ALL_PROFILES || self.profiles.iter().any(|p| p == requested)
        })
    }
}

impl Project {
    /// Re-partitions all services into enabled and disabled per `profiles`
    /// and records `profiles` as the active set.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature leaves room for profile
    /// validation.
    pub fn with_profiles<S: AsRef<str>>(&self, profiles: &[S]) -> Result<Self> {
        let profiles: Vec<String> = profiles.iter().map(|p| p.as_ref().to_owned()).collect();
        tracing::debug!(profiles = ?profiles, "applying profiles");

        let mut project = self.clone();
        let (enabled, disabled): (Services, Services) = project
            .all_services()
            .into_iter()
            .partition(|(_, service)| service.has_profile(&profiles));
        project.services = enabled;
        project.disabled_services = disabled;
        project.profiles = profiles;
        Ok(project)
    }

    /// Enables the named services by activating their profiles.
    ///
    /// Activating a profile enables every service that declares it, not
    /// only the named ones. The environment of the result is re-resolved
    /// with env files discarded.
    ///
    /// # Errors
    ///
    /// Returns any error from environment resolution.
    pub fn with_services_enabled<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Ok(self.clone());
        }

        let mut profiles = self.profiles.clone();
        for name in names.iter().map(AsRef::as_ref) {
            if self.services.contains_key(name) {
                continue;
            }
            let Some(service) = self.disabled_services.get(name) else {
                tracing::debug!(service = %name, "cannot enable unknown service");
                continue;
            };
            for profile in &service.profiles {
                if !profiles.contains(profile) {
                    profiles.push(profile.clone());
                }
            }
        }

        self.with_profiles(&profiles)?
            .with_services_environment_resolved(true)
    }

    /// Restricts the enabled services to `names` and the services reached
    /// from them under `policy`.
    ///
    /// Every other enabled service is disabled, and `depends_on` edges of
    /// the survivors that leave the selection are dropped, even required
    /// ones. An empty `names` selects everything.
    ///
    /// # Errors
    ///
    /// Returns any traversal error from [`Project::for_each_service`].
    pub fn with_selected_services<S: AsRef<str>>(
        &self,
        names: &[S],
        policy: DependencyPolicy,
    ) -> Result<Self> {
        if names.is_empty() {
            return Ok(self.clone());
        }

        let mut selected = HashSet::new();
        self.for_each_service(
            names,
            |name, _| {
                let _ = selected.insert(name.to_owned());
                Ok(())
            },
            policy,
        )?;
        tracing::debug!(selected = selected.len(), ?policy, "selecting services");

        let excluded: Vec<String> = self
            .services
            .keys()
            .filter(|name| !selected.contains(*name))
            .cloned()
            .collect();
        let mut project = self.with_services_disabled(&excluded);
        for service in project.services.values_mut() {
            service.depends_on.retain(|dep, _| selected.contains(dep));
        }
        Ok(project)
    }

    /// Moves the named services to `disabled_services` and drops every
    /// `depends_on` edge of the remaining services that targets them.
    ///
    /// Names that are not enabled are ignored.
    #[must_use]
    pub fn with_services_disabled<S: AsRef<str>>(&self, names: &[S]) -> Self {
        let mut project = self.clone();
        for name in names.iter().map(AsRef::as_ref) {
            let Some(service) = project.services.remove(name) else {
                continue;
            };
            tracing::debug!(service = %name, "disabling service");
            let _ = project.disabled_services.insert(name.to_owned(), service);
            for remaining in project.services.values_mut() {
                let _ = remaining.depends_on.remove(name);
            }
        }
        project
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnvFile, ServiceDependency};

    fn profiled() -> Project {
        Project::new("p", "/tmp")
            .with_service(ServiceConfig::new("web"))
            .with_service(ServiceConfig::new("debugger").with_profiles(["debug"]))
            .with_service(ServiceConfig::new("tracer").with_profiles(["debug", "trace"]))
            .with_service(ServiceConfig::new("admin").with_profiles(["ops"]))
    }

    #[test]
    fn has_profile_rules() {
        let always = ServiceConfig::new("a");
        let debug = ServiceConfig::new("b").with_profiles(["debug"]);
        let none: [&str; 0] = [];
        assert!(always.has_profile(&none));
        assert!(!debug.has_profile(&none));
        assert!(debug.has_profile(&["debug"]));
        assert!(!debug.has_profile(&["deb"]));
        assert!(debug.has_profile(&["*"]));
    }

    #[test]
    fn with_profiles_partitions_services() {
        let project = profiled().with_profiles(&["debug"]).expect("profiles");
        assert_eq!(project.service_names(), vec!["debugger", "tracer", "web"]);
        assert_eq!(project.disabled_service_names(), vec!["admin"]);
        assert_eq!(project.profiles, vec!["debug"]);
    }

    #[test]
    fn with_profiles_is_idempotent() {
        let once = profiled().with_profiles(&["trace"]).expect("profiles");
        let twice = once.with_profiles(&["trace"]).expect("profiles");
        assert_eq!(once.service_names(), twice.service_names());
        assert_eq!(once.disabled_service_names(), twice.disabled_service_names());
    }

    #[test]
    fn with_profiles_recombines_disabled_services() {
        let narrowed = profiled().with_profiles(&["ops"]).expect("profiles");
        assert_eq!(narrowed.service_names(), vec!["admin", "web"]);
        let widened = narrowed.with_profiles(&["debug"]).expect("profiles");
        assert_eq!(widened.service_names(), vec!["debugger", "tracer", "web"]);
    }

    #[test]
    fn wildcard_enables_everything() {
        let project = profiled().with_profiles(&["*"]).expect("profiles");
        assert_eq!(project.services.len(), 4);
        assert!(project.disabled_services.is_empty());
    }

    #[test]
    fn with_profiles_leaves_receiver_untouched() {
        let original = profiled();
        let _ = original.with_profiles(&["debug"]).expect("profiles");
        assert_eq!(original.services.len(), 4);
        assert!(original.disabled_services.is_empty());
    }

    #[test]
    fn enabling_a_service_cascades_through_its_profiles() {
        let none: [&str; 0] = [];
        let project = profiled().with_profiles(&none).expect("profiles");
        assert_eq!(project.service_names(), vec!["web"]);

        let enabled = project.with_services_enabled(&["debugger"]).expect("enable");
        assert_eq!(enabled.service_names(), vec!["debugger", "tracer", "web"]);
        assert_eq!(enabled.profiles, vec!["debug"]);
    }

    #[test]
    fn enabling_a_service_resolves_its_env_files() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        std::fs::write(dir.path().join("debug.env"), "TRACE_LEVEL=verbose\n")
            .expect("write env file");
        let mut debugger = ServiceConfig::new("debugger")
            .with_profiles(["debug"])
            .depends_on("web");
        debugger.env_files.push(EnvFile::required("debug.env"));
        let none: [&str; 0] = [];
        let project = Project::new("p", dir.path())
            .with_service(ServiceConfig::new("web"))
            .with_service(debugger)
            .with_profiles(&none)
            .expect("profiles");
        assert_eq!(project.disabled_service_names(), vec!["debugger"]);

        let enabled = project.with_services_enabled(&["debugger"]).expect("enable");
        let service = &enabled.services["debugger"];
        assert_eq!(service.environment.value("TRACE_LEVEL"), Some("verbose"));
        assert!(service.env_files.is_empty());
        assert_eq!(
            service.depends_on,
            project.disabled_services["debugger"].depends_on
        );
        assert!(service.depends_on.contains_key("web"));
    }

    #[test]
    fn enabling_an_enabled_service_is_a_noop() {
        let project = profiled().with_profiles(&["ops"]).expect("profiles");
        let enabled = project.with_services_enabled(&["web"]).expect("enable");
        assert_eq!(enabled.service_names(), project.service_names());
    }

    fn chain() -> Project {
        Project::new("p", "/tmp")
            .with_service(ServiceConfig::new("a").depends_on("b"))
            .with_service(ServiceConfig::new("b").depends_on("c"))
            .with_service(ServiceConfig::new("c"))
            .with_service(ServiceConfig::new("x").depends_on("a"))
            .with_service(ServiceConfig::new("y"))
    }

    #[test]
    fn selection_keeps_dependency_closure() {
        let project = chain()
            .with_selected_services(&["a"], DependencyPolicy::IncludeDependencies)
            .expect("select");
        assert_eq!(project.service_names(), vec!["a", "b", "c"]);
        assert_eq!(project.disabled_service_names(), vec!["x", "y"]);
    }

    #[test]
    fn selection_without_dependencies_drops_required_edges() {
        let project = chain()
            .with_selected_services(&["a"], DependencyPolicy::IgnoreDependencies)
            .expect("select");
        assert_eq!(project.service_names(), vec!["a"]);
        assert!(project.services["a"].depends_on.is_empty());
    }

    #[test]
    fn selection_with_dependents() {
        let project = chain()
            .with_selected_services(&["b"], DependencyPolicy::IncludeDependents)
            .expect("select");
        assert_eq!(project.service_names(), vec!["a", "b", "x"]);
        assert!(project.services["b"].depends_on.is_empty());
        assert!(project.services["a"].depends_on.contains_key("b"));
    }

    #[test]
    fn empty_selection_copies_project() {
        let none: [&str; 0] = [];
        let project = chain()
            .with_selected_services(&none, DependencyPolicy::default())
            .expect("select");
        assert_eq!(project, chain());
    }

    #[test]
    fn selection_of_unknown_service_fails() {
        assert!(
            chain()
                .with_selected_services(&["nope"], DependencyPolicy::default())
                .is_err()
        );
    }

    #[test]
    fn disabling_strips_incoming_edges() {
        let project = chain().with_services_disabled(&["b"]);
        assert!(!project.services.contains_key("b"));
        assert!(project.disabled_services.contains_key("b"));
        assert!(project.services["a"].depends_on.is_empty());
        assert_eq!(
            project.disabled_services["b"].depends_on.get("c"),
            Some(&ServiceDependency::default())
        );
    }

    #[test]
    fn disabling_unknown_service_is_a_noop() {
        assert_eq!(chain().with_services_disabled(&["ghost"]), chain());
    }
}
