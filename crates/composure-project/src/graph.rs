//! Dependency traversal over the services of a project.
//!
//! [`Project::for_each_service`] walks services along `depends_on` edges
//! (or their reverse) and dispatches each reached service exactly once,
//! after everything it leads to has been dispatched. [`DependencyGraph`]
//! builds a `petgraph` view of the enabled services for full startup
//! ordering with cycle detection.

use std::collections::{BTreeMap, HashMap, HashSet};

use composure_common::error::{ComposeError, Result};
use petgraph::graph::NodeIndex;

use crate::project::Project;
use crate::types::{ServiceConfig, ServiceDependency};

/// Which edges a traversal follows from each service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DependencyPolicy {
    /// Follow `depends_on` edges to the services a service needs.
    #[default]
    IncludeDependencies,
    /// Follow reverse edges to the services that need a service.
    IncludeDependents,
    /// Visit only the requested services.
    IgnoreDependencies,
}

enum Frame {
    Enter(String),
    Dispatch(String),
}

impl Project {
    /// Calls `visit` on each named service and, per `policy`, on its
    /// transitive dependencies or dependents.
    ///
    /// Every service is visited at most once. The services a service leads
    /// to are visited before it. `visit` receives its own copy of the
    /// service.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::NotFound` if a requested name is not an
    /// enabled service, `ComposeError::MissingDependency` if a required edge
    /// points to a missing service, or the first error returned by `visit`.
    /// Visits performed before the failure are not undone.
    pub fn for_each_service<S, F>(
        &self,
        names: &[S],
        mut visit: F,
        policy: DependencyPolicy,
    ) -> Result<()>
    where
        S: AsRef<str>,
        F: FnMut(&str, ServiceConfig) -> Result<()>,
    {
        let mut seen = HashSet::new();
        self.walk_with_seen(names, &mut visit, policy, &mut seen)
    }

    /// Like [`Project::for_each_service`] but records visited names in a
    /// caller-owned set.
    ///
    /// Names already in `seen` are skipped, so successive calls sharing one
    /// set never visit a service twice.
    ///
    /// # Errors
    ///
    /// Same as [`Project::for_each_service`].
    pub fn walk_with_seen<S, F>(
        &self,
        names: &[S],
        visit: &mut F,
        policy: DependencyPolicy,
        seen: &mut HashSet<String>,
    ) -> Result<()>
    where
        S: AsRef<str>,
        F: FnMut(&str, ServiceConfig) -> Result<()>,
    {
        for name in names {
            let name = name.as_ref();
            if !self.services.contains_key(name) {
                return Err(ComposeError::no_such_service(name));
            }
        }

        let mut stack: Vec<Frame> = names
            .iter()
            .rev()
            .map(|name| Frame::Enter(name.as_ref().to_owned()))
            .collect();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(name) => {
                    if seen.contains(&name) {
                        continue;
                    }
                    let Some(service) = self.services.get(&name) else {
                        continue;
                    };
                    let next = self.edges_to_follow(&name, service, policy)?;
                    let _ = seen.insert(name.clone());
                    stack.push(Frame::Dispatch(name));
                    stack.extend(next.into_iter().rev().map(Frame::Enter));
                }
                Frame::Dispatch(name) => {
                    if let Some(service) = self.services.get(&name) {
                        visit(&name, service.clone())?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns the existing neighbours of `service` under `policy`.
    ///
    /// Missing neighbours reached through a non-required edge are skipped.
    fn edges_to_follow(
        &self,
        name: &str,
        service: &ServiceConfig,
        policy: DependencyPolicy,
    ) -> Result<Vec<String>> {
        let edges = match policy {
            DependencyPolicy::IncludeDependencies => service.depends_on.clone(),
            DependencyPolicy::IncludeDependents => self.dependents_for_service(name),
            DependencyPolicy::IgnoreDependencies => return Ok(Vec::new()),
        };

        let mut next = Vec::with_capacity(edges.len());
        for (target, dependency) in edges {
            if self.services.contains_key(&target) {
                next.push(target);
            } else if dependency.required {
                return Err(ComposeError::MissingDependency {
                    service: target,
                    dependent: name.to_owned(),
                });
            } else {
                tracing::debug!(
                    service = %name,
                    dependency = %target,
                    "skipping missing optional dependency"
                );
            }
        }
        Ok(next)
    }

    /// Returns the enabled services depending on `name`, with the edge each
    /// declares.
    fn dependents_for_service(&self, name: &str) -> BTreeMap<String, ServiceDependency> {
        self.services
            .iter()
            .filter_map(|(dependent, service)| {
                service
                    .depends_on
                    .get(name)
                    .map(|dependency| (dependent.clone(), dependency.clone()))
            })
            .collect()
    }

    /// Returns the sorted names of enabled services that depend on `name`.
    #[must_use]
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.dependents_for_service(name).into_keys().collect()
    }
}

/// A dependency graph of the enabled services.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Edges point from a dependency to its dependent.
    graph: petgraph::Graph<String, ()>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: petgraph::Graph::new(),
        }
    }

    /// Builds the graph of a project's enabled services.
    ///
    /// Edges to services that are not enabled are left out.
    #[must_use]
    pub fn from_project(project: &Project) -> Self {
        let mut graph = Self::new();
        let nodes: HashMap<&str, NodeIndex> = project
            .services
            .keys()
            .map(|name| (name.as_str(), graph.add_service(name)))
            .collect();
        for (name, service) in &project.services {
            for dependency in service.depends_on.keys() {
                if let (Some(&dependent), Some(&dependency)) =
                    (nodes.get(name.as_str()), nodes.get(dependency.as_str()))
                {
                    graph.add_dependency(dependent, dependency);
                }
            }
        }
        graph
    }

    /// Adds a service node to the graph.
    pub fn add_service(&mut self, name: impl Into<String>) -> NodeIndex {
        self.graph.add_node(name.into())
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        let _ = self.graph.add_edge(dependency, dependent, ());
    }

    /// Returns the services in startup order, dependencies first.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::DependencyCycle` naming the services on a
    /// cycle.
    pub fn startup_order(&self) -> Result<Vec<String>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(_) => Err(ComposeError::DependencyCycle {
                services: self.cycle_members(),
            }),
        }
    }

    fn cycle_members(&self) -> Vec<String> {
        let mut members: Vec<String> = petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&idx| self.graph.contains_edge(idx, idx))
            })
            .flatten()
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect();
        members.sort();
        members
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> Project {
        Project::new("diamond", "/tmp")
            .with_service(ServiceConfig::new("a").depends_on("b").depends_on("c"))
            .with_service(ServiceConfig::new("b").depends_on("d"))
            .with_service(ServiceConfig::new("c").depends_on("d"))
            .with_service(ServiceConfig::new("d"))
    }

    fn visited(project: &Project, names: &[&str], policy: DependencyPolicy) -> Result<Vec<String>> {
        let mut order = Vec::new();
        project.for_each_service(
            names,
            |name, _| {
                order.push(name.to_owned());
                Ok(())
            },
            policy,
        )?;
        Ok(order)
    }

    fn pos(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).expect(name)
    }

    #[test]
    fn service_without_dependencies_visits_itself() {
        let order = visited(&diamond(), &["d"], DependencyPolicy::IncludeDependencies)
            .expect("should walk");
        assert_eq!(order, vec!["d"]);
    }

    #[test]
    fn diamond_visits_shared_dependency_once() {
        let order = visited(&diamond(), &["a"], DependencyPolicy::IncludeDependencies)
            .expect("should walk");
        assert_eq!(order.len(), 4);
        assert!(pos(&order, "d") < pos(&order, "b"));
        assert!(pos(&order, "d") < pos(&order, "c"));
        assert!(pos(&order, "b") < pos(&order, "a"));
        assert!(pos(&order, "c") < pos(&order, "a"));
    }

    #[test]
    fn dependents_policy_walks_reverse_edges() {
        let order =
            visited(&diamond(), &["d"], DependencyPolicy::IncludeDependents).expect("should walk");
        assert_eq!(order.len(), 4);
        assert!(pos(&order, "a") < pos(&order, "b"));
        assert!(pos(&order, "a") < pos(&order, "c"));
        assert!(pos(&order, "b") < pos(&order, "d"));
        assert!(pos(&order, "c") < pos(&order, "d"));
    }

    #[test]
    fn ignore_policy_visits_only_requested() {
        let order = visited(&diamond(), &["a", "c"], DependencyPolicy::IgnoreDependencies)
            .expect("should walk");
        assert_eq!(order, vec!["a", "c"]);
    }

    #[test]
    fn unknown_requested_service_fails() {
        let err = visited(&diamond(), &["zz"], DependencyPolicy::default()).expect_err("missing");
        assert!(matches!(err, ComposeError::NotFound { .. }), "got: {err}");
    }

    #[test]
    fn missing_required_dependency_fails() {
        let project =
            Project::new("p", "/tmp").with_service(ServiceConfig::new("a").depends_on("z"));
        let err = visited(&project, &["a"], DependencyPolicy::default()).expect_err("missing");
        assert!(
            matches!(&err, ComposeError::MissingDependency { service, dependent } if service == "z" && dependent == "a"),
            "got: {err}"
        );
    }

    #[test]
    fn missing_optional_dependency_is_skipped() {
        let project = Project::new("p", "/tmp")
            .with_service(ServiceConfig::new("a").depends_on_optional("z"));
        let order = visited(&project, &["a"], DependencyPolicy::default()).expect("should walk");
        assert_eq!(order, vec!["a"]);
    }

    #[test]
    fn cycle_terminates() {
        let project = Project::new("p", "/tmp")
            .with_service(ServiceConfig::new("a").depends_on("b"))
            .with_service(ServiceConfig::new("b").depends_on("a"));
        let order = visited(&project, &["a"], DependencyPolicy::default()).expect("should walk");
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn visitor_error_aborts_walk() {
        let mut calls = 0;
        let result = diamond().for_each_service(
            &["a"],
            |name, _| {
                calls += 1;
                if name == "d" {
                    return Err(ComposeError::Config {
                        message: "boom".into(),
                    });
                }
                Ok(())
            },
            DependencyPolicy::default(),
        );
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn visitor_mutation_does_not_leak() {
        let project = diamond();
        project
            .for_each_service(
                &["d"],
                |_, mut service| {
                    service.image = "mutated".into();
                    Ok(())
                },
                DependencyPolicy::default(),
            )
            .expect("should walk");
        assert!(project.services["d"].image.is_empty());
    }

    #[test]
    fn shared_seen_set_spans_calls() {
        let project = diamond();
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut record = |name: &str, _: ServiceConfig| -> Result<()> {
            order.push(name.to_owned());
            Ok(())
        };
        project
            .walk_with_seen(&["b"], &mut record, DependencyPolicy::default(), &mut seen)
            .expect("first walk");
        project
            .walk_with_seen(&["a"], &mut record, DependencyPolicy::default(), &mut seen)
            .expect("second walk");
        assert_eq!(order, vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn dependents_of_lists_sorted_dependents() {
        assert_eq!(diamond().dependents_of("d"), vec!["b", "c"]);
        assert!(diamond().dependents_of("a").is_empty());
    }

    #[test]
    fn startup_order_puts_dependencies_first() {
        let order = DependencyGraph::from_project(&diamond())
            .startup_order()
            .expect("should resolve");
        assert_eq!(order.len(), 4);
        assert!(pos(&order, "d") < pos(&order, "b"));
        assert!(pos(&order, "b") < pos(&order, "a"));
        assert!(pos(&order, "c") < pos(&order, "a"));
    }

    #[test]
    fn startup_order_reports_cycle_members() {
        let project = Project::new("p", "/tmp")
            .with_service(ServiceConfig::new("a").depends_on("b"))
            .with_service(ServiceConfig::new("b").depends_on("c"))
            .with_service(ServiceConfig::new("c").depends_on("a"))
            .with_service(ServiceConfig::new("lonely"));
        let err = DependencyGraph::from_project(&project)
            .startup_order()
            .expect_err("cycle");
        assert!(
            matches!(&err, ComposeError::DependencyCycle { services } if services == &["a", "b", "c"]),
            "got: {err}"
        );
    }

    #[test]
    fn startup_order_ignores_edges_to_disabled_services() {
        let project = Project::new("p", "/tmp")
            .with_service(ServiceConfig::new("a").depends_on_optional("gone"));
        let order = DependencyGraph::from_project(&project)
            .startup_order()
            .expect("should resolve");
        assert_eq!(order, vec!["a"]);
    }
}
