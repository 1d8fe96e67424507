//! Module dependency graph.
//!
//! Edges come from each module's `require` list, with `@group` entries
//! expanded to the modules carrying that group. Ordering is a depth-first walk
//! over the whole graph that only emits the requested names: a module comes
//! after every requested module it reaches, directly or through modules that
//! were not requested. A back-edge anywhere on the walked path is a cycle.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::module::Module;

/// Error during dependency ordering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DependencyError {
    /// Circular dependency detected; `chain` starts and ends with the same module
    #[error("Circular dependency detected: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },
}

/// Directed graph over module names.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from modules' `require` lists.
    ///
    /// A `@group` entry depends on every other module carrying that group, in
    /// the given module order. A module never depends on itself through one of
    /// its own groups.
    pub fn from_modules<'a>(modules: impl IntoIterator<Item = &'a Module>) -> Self {
        let modules: Vec<&Module> = modules.into_iter().collect();
        let mut graph = Self::new();
        for module in &modules {
            let mut requires: Vec<String> = Vec::new();
            for dep in module.required_modules() {
                if dep.starts_with('@') {
                    let members = modules
                        .iter()
                        .filter(|m| m.has_group(dep) && m.name() != module.name())
                        .map(|m| m.name());
                    for member in members {
                        if !requires.iter().any(|r| r == member) {
                            requires.push(member.to_string());
                        }
                    }
                } else if !requires.contains(dep) {
                    requires.push(dep.clone());
                }
            }
            graph.add_module(module.name(), requires);
        }
        graph
    }

    /// Register a module and its dependencies.
    pub fn add_module(&mut self, name: impl Into<String>, requires: Vec<String>) {
        self.edges.insert(name.into(), requires);
    }

    /// Whether the graph knows a module.
    pub fn contains(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    /// Declared dependencies of a module.
    pub fn requires(&self, name: &str) -> &[String] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Order `requested` so that dependencies come before dependents.
    ///
    /// Only names in `requested` are emitted, but dependencies outside it are
    /// still walked so that transitive requirements keep their order. Names
    /// the graph does not know are skipped. Duplicates keep their first
    /// occurrence.
    pub fn sort<S: AsRef<str>>(&self, requested: &[S]) -> Result<Vec<String>, DependencyError> {
        let allowed: HashSet<&str> = requested.iter().map(|s| s.as_ref()).collect();
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut visiting = Vec::new();

        for name in requested {
            self.visit(name.as_ref(), &allowed, &mut visited, &mut visiting, &mut result)?;
        }

        Ok(result)
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        allowed: &HashSet<&str>,
        visited: &mut HashSet<&'a str>,
        visiting: &mut Vec<&'a str>,
        result: &mut Vec<String>,
    ) -> Result<(), DependencyError> {
        if visited.contains(name) {
            return Ok(());
        }
        let Some(deps) = self.edges.get(name) else {
            return Ok(());
        };

        if let Some(start) = visiting.iter().position(|n| *n == name) {
            let mut chain: Vec<String> =
                visiting[start..].iter().map(|n| n.to_string()).collect();
            chain.push(name.to_string());
            return Err(DependencyError::Cycle { chain });
        }

        visiting.push(name);
        for dep in deps {
            self.visit(dep, allowed, visited, visiting, result)?;
        }
        visiting.pop();

        visited.insert(name);
        if allowed.contains(name) {
            result.push(name.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleConfig;

    fn graph(edges: &[(&str, &[&str])]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (name, deps) in edges {
            graph.add_module(*name, deps.iter().map(|d| d.to_string()).collect());
        }
        graph
    }

    #[test]
    fn test_dependency_before_dependent() {
        let g = graph(&[("A", &["B"]), ("B", &[])]);
        assert_eq!(g.sort(&["A", "B"]).unwrap(), vec!["B", "A"]);
    }

    #[test]
    fn test_transitive_chain() {
        let g = graph(&[("App", &["Web"]), ("Web", &["Runtime"]), ("Runtime", &[])]);
        assert_eq!(g.sort(&["App", "Runtime", "Web"]).unwrap(), vec!["Runtime", "Web", "App"]);
    }

    #[test]
    fn test_unrequested_dependency_is_walked_but_not_emitted() {
        let g = graph(&[("A", &["B"]), ("B", &["C"]), ("C", &[])]);
        assert_eq!(g.sort(&["A", "C"]).unwrap(), vec!["C", "A"]);
    }

    #[test]
    fn test_unknown_names_skipped() {
        let g = graph(&[("A", &["Ghost"])]);
        assert_eq!(g.sort(&["Ghost", "A"]).unwrap(), vec!["A"]);
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let g = graph(&[("A", &[]), ("B", &[])]);
        assert_eq!(g.sort(&["B", "A", "B"]).unwrap(), vec!["B", "A"]);
    }

    #[test]
    fn test_cycle_is_reported() {
        let g = graph(&[("A", &["B"]), ("B", &["C"]), ("C", &["A"])]);
        let err = g.sort(&["A", "B", "C"]).unwrap_err();
        assert_eq!(
            err,
            DependencyError::Cycle {
                chain: vec!["A".to_string(), "B".to_string(), "C".to_string(), "A".to_string()]
            }
        );
        assert_eq!(err.to_string(), "Circular dependency detected: A -> B -> C -> A");
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let g = graph(&[("A", &["A"])]);
        assert!(g.sort(&["A"]).is_err());
    }

    #[test]
    fn test_unreachable_cycle_is_ignored() {
        let g = graph(&[("A", &["B"]), ("B", &["A"]), ("C", &[])]);
        assert_eq!(g.sort(&["C"]).unwrap(), vec!["C"]);
    }

    #[test]
    fn test_cycle_through_unrequested_module_is_reported() {
        let g = graph(&[("A", &["B"]), ("B", &["A"]), ("C", &[])]);
        let err = g.sort(&["A", "C"]).unwrap_err();
        let chain = vec!["A".to_string(), "B".to_string(), "A".to_string()];
        assert_eq!(err, DependencyError::Cycle { chain });
    }

    #[test]
    fn test_every_module_after_its_requested_dependencies() {
        let g = graph(&[
            ("E", &["D", "B"]),
            ("D", &["C"]),
            ("C", &["A"]),
            ("B", &["A"]),
            ("A", &[]),
        ]);
        let requested = ["E", "C", "A", "D", "B"];
        let order = g.sort(&requested).unwrap();
        assert_eq!(order.len(), requested.len());
        for (i, name) in order.iter().enumerate() {
            for dep in g.requires(name) {
                let pos = order.iter().position(|n| n == dep).unwrap();
                assert!(pos < i, "{} must come before {}", dep, name);
            }
        }
    }

    /// Every module the graph reaches from `name`, excluding `name` itself.
    fn reachable(g: &DependencyGraph, name: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = g.requires(name).iter().map(String::as_str).collect();
        while let Some(next) = stack.pop() {
            if seen.insert(next.to_string()) {
                stack.extend(g.requires(next).iter().map(String::as_str));
            }
        }
        seen
    }

    #[test]
    fn test_transitive_order_with_gaps_in_requested_set() {
        let g = graph(&[
            ("App", &["Web", "Auth"]),
            ("Web", &["Ui"]),
            ("Ui", &["Runtime"]),
            ("Auth", &["Crypto"]),
            ("Crypto", &["Runtime"]),
            ("Runtime", &[]),
        ]);
        let requested = ["App", "Crypto", "Ui", "Runtime"];
        let order = g.sort(&requested).unwrap();
        assert_eq!(order.len(), requested.len());

        for (i, name) in order.iter().enumerate() {
            for dep in reachable(&g, name) {
                if let Some(pos) = order.iter().position(|n| *n == dep) {
                    assert!(pos < i, "{} must come before {}", dep, name);
                }
            }
        }
    }

    fn module(name: &str, groups: &[&str], require: &[&str]) -> Module {
        let config = ModuleConfig {
            name: Some(name.to_string()),
            groups: groups.iter().map(|s| s.to_string()).collect(),
            require: require.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        Module::from_config(format!("/proj/{}", name), config).unwrap()
    }

    #[test]
    fn test_group_requirement_expands_to_members() {
        let modules = [
            module("Y", &[], &["@core"]),
            module("X", &["core"], &[]),
            module("Z", &["core"], &[]),
        ];
        let g = DependencyGraph::from_modules(modules.iter());

        assert_eq!(g.requires("Y"), ["X".to_string(), "Z".to_string()]);
        assert_eq!(g.sort(&["Y", "X"]).unwrap(), vec!["X", "Y"]);
    }

    #[test]
    fn test_group_requirement_skips_the_requiring_module() {
        let modules = [module("A", &["ui"], &["@ui"]), module("B", &["ui"], &[])];
        let g = DependencyGraph::from_modules(modules.iter());

        assert_eq!(g.requires("A"), ["B".to_string()]);
        assert_eq!(g.sort(&["A", "B"]).unwrap(), vec!["B", "A"]);
    }
}
