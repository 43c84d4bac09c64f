//! The Scanner Registry (C2, §4.2) — the process-wide map from scanner name
//! to its static metadata and invocation entry point, plus profile
//! resolution and dependency-DAG topological ordering.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

use crate::config::ProfileConfig;
use crate::error::ZeroError;
use crate::ids::ScannerName;
use crate::runner::ScannerFn;

/// Static metadata about a registered scanner (§3).
#[derive(Clone)]
pub struct ScannerDescriptor {
    /// The registered name.
    pub name: ScannerName,
    /// A one-line human description, shown by `zero scanners list`.
    pub description: String,
    /// Other scanners that must complete before this one starts.
    pub dependencies: BTreeSet<ScannerName>,
    /// Estimates wall-clock duration for a working copy of the given file
    /// count; used by the slow-scanner policy callback.
    pub estimate: fn(u64) -> Duration,
    /// `true` if this scanner is declared "slow on large repos" (§4.4).
    pub slow_on_large_repos: bool,
}

fn default_estimate(_file_count: u64) -> Duration {
    Duration::from_secs(5)
}

impl ScannerDescriptor {
    /// Builds a descriptor with no declared dependencies and a flat 5s
    /// estimate — the common case for a simple scanner.
    #[must_use]
    pub fn new(name: ScannerName, description: impl Into<String>) -> Self {
        Self {
            name,
            description: description.into(),
            dependencies: BTreeSet::new(),
            estimate: default_estimate,
            slow_on_large_repos: false,
        }
    }

    /// Declares a dependency on `scanner`.
    #[must_use]
    pub fn depends_on(mut self, scanner: ScannerName) -> Self {
        self.dependencies.insert(scanner);
        self
    }

    /// Overrides the duration estimator.
    #[must_use]
    pub const fn with_estimate(mut self, estimate: fn(u64) -> Duration) -> Self {
        self.estimate = estimate;
        self
    }

    /// Marks this scanner as slow on large repositories (§4.4).
    #[must_use]
    pub const fn slow_on_large(mut self) -> Self {
        self.slow_on_large_repos = true;
        self
    }
}

struct Entry {
    descriptor: ScannerDescriptor,
    run: ScannerFn,
    insertion_order: usize,
}

/// The process-wide registry of scanners.
///
/// Populated once at process start via [`ScannerRegistry::register`]. The
/// global dependency graph is an invariant: acyclic, and every dependency
/// must itself be registered (checked at [`ScannerRegistry::validate`]).
#[derive(Default)]
pub struct ScannerRegistry {
    entries: HashMap<ScannerName, Entry>,
}

impl ScannerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `descriptor` and its invocation entry point.
    ///
    /// # Errors
    /// Fatal (per §4.2): returns an error if `descriptor.name` is already
    /// registered. Must be called before the first scheduler invocation.
    pub fn register(&mut self, descriptor: ScannerDescriptor, run: ScannerFn) -> Result<(), ZeroError> {
        let name = descriptor.name.clone();
        if self.entries.contains_key(&name) {
            return Err(ZeroError::Config {
                path: std::path::PathBuf::new(),
                detail: format!("duplicate scanner registration for '{name}'"),
            });
        }
        let insertion_order = self.entries.len();
        self.entries.insert(
            name,
            Entry {
                descriptor,
                run,
                insertion_order,
            },
        );
        Ok(())
    }

    /// Looks up a scanner's descriptor and invocation entry point.
    ///
    /// # Errors
    /// [`ZeroError::UnknownScanner`] if `name` is not registered.
    pub fn lookup(&self, name: &ScannerName) -> Result<(&ScannerDescriptor, &ScannerFn), ZeroError> {
        self.entries
            .get(name)
            .map(|e| (&e.descriptor, &e.run))
            .ok_or_else(|| ZeroError::UnknownScanner { name: name.to_string() })
    }

    /// Validates the global invariant: every declared dependency is itself
    /// registered, and the dependency graph is acyclic. Call once after all
    /// [`register`](Self::register) calls, before serving any requests.
    ///
    /// # Errors
    /// [`ZeroError::UnsatisfiableDependency`] for a dangling dependency,
    /// [`ZeroError::DependencyCycle`] for a cycle.
    pub fn validate(&self) -> Result<(), ZeroError> {
        for entry in self.entries.values() {
            for dep in &entry.descriptor.dependencies {
                if !self.entries.contains_key(dep) {
                    return Err(ZeroError::UnsatisfiableDependency {
                        scanner: entry.descriptor.name.clone(),
                        missing: dep.to_string(),
                    });
                }
            }
        }
        let all: Vec<ScannerName> = self.entries.keys().cloned().collect();
        self.topological_order(&all).map(|_| ())
    }

    /// Resolves a profile into its ordered scanner list and per-scanner
    /// feature overrides.
    ///
    /// # Errors
    /// [`ZeroError::UnknownScanner`] if the profile names a scanner this
    /// registry has no entry for.
    pub fn resolve_profile(
        &self,
        profile: &ProfileConfig,
    ) -> Result<Vec<(ScannerName, serde_json::Value)>, ZeroError> {
        profile
            .scanner_names()?
            .into_iter()
            .map(|name| {
                self.lookup(&name)?;
                let feature_config = profile
                    .feature_overrides
                    .get(name.as_str())
                    .cloned()
                    .unwrap_or(serde_json::Value::Null);
                Ok((name, feature_config))
            })
            .collect()
    }

    /// Returns the slow-on-large-repo subset of `scanners`, in the declared
    /// set's order (§4.4).
    #[must_use]
    pub fn slow_scanners<'a>(&self, scanners: &'a [ScannerName]) -> Vec<&'a ScannerName> {
        scanners
            .iter()
            .filter(|name| {
                self.entries
                    .get(*name)
                    .is_some_and(|e| e.descriptor.slow_on_large_repos)
            })
            .collect()
    }

    /// Every registered scanner's descriptor, in insertion order — what
    /// `zero scanners list` renders.
    #[must_use]
    pub fn descriptors(&self) -> Vec<&ScannerDescriptor> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.insertion_order);
        entries.into_iter().map(|e| &e.descriptor).collect()
    }

    /// Stable topological sort of `scanners` by the dependency relation
    /// (§4.2): ties broken by registry insertion order, restricted to the
    /// requested subset (a scanner's dependency outside the subset is
    /// treated as already-satisfied — the subset is what the *scheduler*
    /// will run, not the whole registry).
    ///
    /// # Errors
    /// - [`ZeroError::UnknownScanner`] if `scanners` names an unregistered scanner.
    /// - [`ZeroError::DependencyCycle`] if the requested subset's
    ///   dependencies (restricted to the subset) contain a cycle.
    pub fn topological_order(&self, scanners: &[ScannerName]) -> Result<Vec<ScannerName>, ZeroError> {
        let requested: HashSet<&ScannerName> = scanners.iter().collect();
        let mut ordered_candidates: Vec<&ScannerName> = scanners.iter().collect();
        ordered_candidates.sort_by_key(|name| {
            self.entries
                .get(*name)
                .map_or(usize::MAX, |e| e.insertion_order)
        });

        let mut result = Vec::with_capacity(scanners.len());
        let mut done: HashSet<&ScannerName> = HashSet::new();
        let mut visiting: HashSet<&ScannerName> = HashSet::new();

        fn visit<'a>(
            name: &'a ScannerName,
            registry: &'a ScannerRegistry,
            requested: &HashSet<&'a ScannerName>,
            ordered_candidates: &[&'a ScannerName],
            done: &mut HashSet<&'a ScannerName>,
            visiting: &mut HashSet<&'a ScannerName>,
            result: &mut Vec<ScannerName>,
            cycle_path: &mut Vec<ScannerName>,
        ) -> Result<(), ZeroError> {
            if done.contains(name) {
                return Ok(());
            }
            let (descriptor, _) = registry.lookup(name)?;
            if visiting.contains(name) {
                cycle_path.push(name.clone());
                return Err(ZeroError::DependencyCycle {
                    cycle: cycle_path.clone(),
                });
            }
            visiting.insert(name);
            cycle_path.push(name.clone());
            for dep in &descriptor.dependencies {
                if requested.contains(dep) {
                    visit(
                        dep,
                        registry,
                        requested,
                        ordered_candidates,
                        done,
                        visiting,
                        result,
                        cycle_path,
                    )?;
                }
            }
            cycle_path.pop();
            visiting.remove(name);
            done.insert(name);
            result.push(name.clone());
            Ok(())
        }

        for name in &ordered_candidates {
            let mut cycle_path = Vec::new();
            visit(
                name,
                self,
                &requested,
                &ordered_candidates,
                &mut done,
                &mut visiting,
                &mut result,
                &mut cycle_path,
            )?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ScannerOutcome;
    use std::sync::Arc;

    fn name(s: &str) -> ScannerName {
        ScannerName::new(s).unwrap()
    }

    fn noop_fn() -> ScannerFn {
        Arc::new(|_ctx| Ok(ScannerOutcome::default()))
    }

    fn registry_with(names: &[(&str, &[&str])]) -> ScannerRegistry {
        let mut reg = ScannerRegistry::new();
        for (n, deps) in names {
            let mut descriptor = ScannerDescriptor::new(name(n), "test scanner");
            for d in *deps {
                descriptor = descriptor.depends_on(name(d));
            }
            reg.register(descriptor, noop_fn()).unwrap();
        }
        reg
    }

    #[test]
    fn lookup_unknown_fails() {
        let reg = ScannerRegistry::new();
        assert!(matches!(reg.lookup(&name("x")), Err(ZeroError::UnknownScanner { .. })));
    }

    #[test]
    fn register_duplicate_fails() {
        let mut reg = ScannerRegistry::new();
        reg.register(ScannerDescriptor::new(name("sbom"), "d"), noop_fn()).unwrap();
        assert!(reg.register(ScannerDescriptor::new(name("sbom"), "d"), noop_fn()).is_err());
    }

    #[test]
    fn validate_detects_dangling_dependency() {
        let reg = registry_with(&[("y", &["x"])]);
        assert!(matches!(
            reg.validate(),
            Err(ZeroError::UnsatisfiableDependency { .. })
        ));
    }

    #[test]
    fn validate_passes_for_acyclic_graph() {
        let reg = registry_with(&[("x", &[]), ("y", &["x"])]);
        assert!(reg.validate().is_ok());
    }

    #[test]
    fn topological_order_respects_dependency() {
        let reg = registry_with(&[("x", &[]), ("y", &["x"])]);
        let order = reg.topological_order(&[name("y"), name("x")]).unwrap();
        assert_eq!(order, vec![name("x"), name("y")]);
    }

    #[test]
    fn topological_order_ties_break_by_insertion_order() {
        let reg = registry_with(&[("b", &[]), ("a", &[])]);
        let order = reg.topological_order(&[name("a"), name("b")]).unwrap();
        assert_eq!(order, vec![name("b"), name("a")]);
    }

    #[test]
    fn topological_order_detects_cycle_in_subset() {
        let mut reg = ScannerRegistry::new();
        reg.register(
            ScannerDescriptor::new(name("a"), "d").depends_on(name("b")),
            noop_fn(),
        )
        .unwrap();
        reg.register(
            ScannerDescriptor::new(name("b"), "d").depends_on(name("a")),
            noop_fn(),
        )
        .unwrap();
        assert!(matches!(
            reg.topological_order(&[name("a"), name("b")]),
            Err(ZeroError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn resolve_profile_applies_feature_overrides() {
        let reg = registry_with(&[("sbom", &[])]);
        let mut profile = ProfileConfig {
            scanners: vec!["sbom".to_owned()],
            ..ProfileConfig::default()
        };
        profile.scanners = vec!["sbom".to_owned()];
        profile
            .feature_overrides
            .insert("sbom".to_owned(), serde_json::json!({"depth": 2}));
        let resolved = reg.resolve_profile(&profile).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].1, serde_json::json!({"depth": 2}));
    }

    #[test]
    fn resolve_profile_unknown_scanner_fails() {
        let reg = ScannerRegistry::new();
        let profile = ProfileConfig {
            scanners: vec!["ghost".to_owned()],
            ..ProfileConfig::default()
        };
        assert!(reg.resolve_profile(&profile).is_err());
    }

    #[test]
    fn slow_scanners_filters_declared_set() {
        let mut reg = ScannerRegistry::new();
        reg.register(ScannerDescriptor::new(name("sbom"), "d").slow_on_large(), noop_fn())
            .unwrap();
        reg.register(ScannerDescriptor::new(name("license"), "d"), noop_fn()).unwrap();
        let scanners = vec![name("sbom"), name("license")];
        let slow = reg.slow_scanners(&scanners);
        assert_eq!(slow, vec![&name("sbom")]);
    }
}
