//! Marker registry: the set of marker definitions this generator understands.
//!
//! Built once with [`Registry::metrics`] and passed by reference to whoever
//! needs to parse or document markers.

use std::collections::BTreeMap;
use std::fmt;

use crate::args::Args;
use crate::{gauge, info, resource, stateset, Marker, MarkerError};

/// Where a marker may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    Package,
    Type,
    Field,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Target::Package => "package",
            Target::Type => "type",
            Target::Field => "field",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgHelp {
    pub name: &'static str,
    pub kind: &'static str,
    pub optional: bool,
    pub summary: &'static str,
}

impl ArgHelp {
    pub const fn required(name: &'static str, kind: &'static str, summary: &'static str) -> Self {
        Self { name, kind, optional: false, summary }
    }

    pub const fn optional(name: &'static str, kind: &'static str, summary: &'static str) -> Self {
        Self { name, kind, optional: true, summary }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Help {
    /// Empty for markers that are not listed by `--which-markers`.
    pub category: &'static str,
    pub summary: &'static str,
    pub args: Vec<ArgHelp>,
}

type Build = fn(&Args) -> Result<Marker, MarkerError>;

pub struct Definition {
    pub name: &'static str,
    pub targets: &'static [Target],
    /// Takes a single unnamed value: `+name=value`.
    pub anonymous: bool,
    pub help: Help,
    build: Build,
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition").field("name", &self.name).field("targets", &self.targets).finish()
    }
}

impl Definition {
    pub(crate) fn new(name: &'static str, targets: &'static [Target], help: Help, build: Build) -> Self {
        Self { name, targets, anonymous: false, help, build }
    }

    pub(crate) fn anonymous(name: &'static str, targets: &'static [Target], help: Help, build: Build) -> Self {
        Self { name, targets, anonymous: true, help, build }
    }

    fn allowed_args(&self) -> Vec<&'static str> {
        if self.anonymous { vec![""] } else { self.help.args.iter().map(|a| a.name).collect() }
    }

    fn build(&self, args: &Args) -> Result<Marker, MarkerError> {
        args.check_known(&self.allowed_args())?;
        (self.build)(args)
    }
}

pub struct Registry {
    /// Longest name first so `Metrics:gaugeX` never shadows `Metrics:gauge`.
    defs: Vec<Definition>,
}

impl Registry {
    pub fn new(mut defs: Vec<Definition>) -> Self {
        defs.sort_by(|a, b| b.name.len().cmp(&a.name.len()).then(a.name.cmp(b.name)));
        Self { defs }
    }

    /// All markers understood by the metric generator.
    pub fn metrics() -> Self {
        Self::new(vec![
            resource::group_name_definition(),
            resource::version_name_definition(),
            resource::gvk_definition(),
            resource::name_prefix_definition(),
            resource::label_from_path_definition(),
            gauge::definition(),
            info::definition(),
            stateset::definition(),
        ])
    }

    /// Parse one comment line. `None` when the line is not a marker this
    /// registry knows about (other tools share the `+` syntax).
    pub fn parse(&self, line: &str, target: Target) -> Option<Result<Marker, MarkerError>> {
        let body = line.trim().strip_prefix('+')?;
        let (def, rest) = self.lookup(body)?;
        if !def.targets.contains(&target) {
            return Some(Err(MarkerError::WrongTarget { marker: def.name.to_string(), target }));
        }
        let args = match rest {
            Rest::Nothing => Ok(Args::empty(def.name)),
            Rest::Args(s) => Args::parse(def.name, s),
            Rest::Value(v) => Ok(Args::anonymous(def.name, v)),
        };
        Some(args.and_then(|a| def.build(&a)))
    }

    fn lookup<'l>(&self, body: &'l str) -> Option<(&Definition, Rest<'l>)> {
        self.defs.iter().find_map(|def| {
            let rest = body.strip_prefix(def.name)?;
            if rest.is_empty() {
                Some((def, Rest::Nothing))
            } else if let Some(args) = rest.strip_prefix(':') {
                Some((def, Rest::Args(args)))
            } else {
                rest.strip_prefix('=').map(|v| (def, Rest::Value(v)))
            }
        })
    }

    /// Documented definitions grouped by category, both sorted by name.
    pub fn help_by_category(&self) -> BTreeMap<&'static str, Vec<&Definition>> {
        let mut out: BTreeMap<&'static str, Vec<&Definition>> = BTreeMap::new();
        for def in self.defs.iter().filter(|d| !d.help.category.is_empty()) {
            out.entry(def.help.category).or_default().push(def);
        }
        for defs in out.values_mut() {
            defs.sort_by_key(|d| d.name);
        }
        out
    }
}

enum Rest<'l> {
    Nothing,
    Args(&'l str),
    Value(&'l str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_foreign_markers() {
        let reg = Registry::metrics();
        assert!(reg.parse("+kubebuilder:object:root=true", Target::Type).is_none());
        assert!(reg.parse("plain prose", Target::Type).is_none());
        assert!(reg.parse("+Metrics:gaugeish", Target::Field).is_none());
    }

    #[test]
    fn parses_package_markers() {
        let reg = Registry::metrics();
        let m = reg.parse("+groupName=example.com", Target::Package).unwrap().unwrap();
        assert_eq!(m, Marker::GroupName("example.com".into()));
        let m = reg.parse("+versionName=v1beta1", Target::Package).unwrap().unwrap();
        assert_eq!(m, Marker::VersionName("v1beta1".into()));
    }

    #[test]
    fn gvk_without_args() {
        let reg = Registry::metrics();
        let m = reg.parse("+Metrics:gvk", Target::Type).unwrap().unwrap();
        assert!(m.is_gvk());
        let m = reg.parse("+Metrics:gvk:namePrefix=widgets", Target::Type).unwrap().unwrap();
        assert!(m.is_gvk() && m.as_resource().is_some());
    }

    #[test]
    fn enforces_targets() {
        let reg = Registry::metrics();
        let err = reg.parse("+Metrics:gvk", Target::Field).unwrap().unwrap_err();
        assert!(matches!(err, MarkerError::WrongTarget { target: Target::Field, .. }));
        assert!(reg.parse("+groupName=x", Target::Type).unwrap().is_err());
    }

    #[test]
    fn reports_unknown_and_missing_arguments() {
        let reg = Registry::metrics();
        let err = reg.parse("+Metrics:gauge:name=x,color=red", Target::Field).unwrap().unwrap_err();
        assert!(matches!(err, MarkerError::UnknownArgument { .. }));
        let err = reg.parse("+Metrics:gauge:JSONPath=.x", Target::Field).unwrap().unwrap_err();
        assert!(matches!(err, MarkerError::MissingArgument { .. }));
    }

    #[test]
    fn help_lists_metrics_category_only() {
        let reg = Registry::metrics();
        let help = reg.help_by_category();
        assert_eq!(help.keys().copied().collect::<Vec<_>>(), vec!["Metrics"]);
        let names: Vec<_> = help["Metrics"].iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec!["Metrics:gauge", "Metrics:gvk", "Metrics:info", "Metrics:labelFromPath", "Metrics:namePrefix", "Metrics:stateset"]
        );
    }
}
