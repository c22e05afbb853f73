//! Resource construction for one tracked Group/Kind.

use metricgen_core::Resource;
use metricgen_markers::MarkerError;
use tracing::{debug, warn};

use crate::assembler::MetricParser;
use crate::error::{Diagnostic, FatalError};
use crate::graph::{GroupKind, TypeIdent};

impl MetricParser<'_> {
    /// Build (once) the resource for `gk`. Every package declaring the group
    /// may contribute a type named after the kind; only types carrying the
    /// gvk marker count.
    pub fn resource_for(&mut self, gk: &GroupKind) -> Result<&Resource, FatalError> {
        if self.resources.contains_key(gk) {
            return Ok(&self.resources[gk]);
        }
        let graph = self.graph;
        let packages = graph.packages_declaring_group(&gk.group);
        let mut resource = Resource::new(&gk.group, "", &gk.kind);
        let mut contributing = Vec::new();

        for package in &packages {
            let ident = TypeIdent::new(package.clone(), gk.kind.clone());
            let Some(info) = graph.type_info(&ident) else { continue };
            if !info.is_tracked_kind() {
                debug!(ty = %ident, "kind name without gvk marker; not tracked here");
                continue;
            }
            let Some(gv) = graph.group_version_of(package) else { continue };

            let version = &mut resource.group_version_kind.version;
            if version.is_empty() {
                *version = gv.version.clone();
            } else if *version != gv.version {
                return Err(FatalError::VersionConflict {
                    group_kind: gk.clone(),
                    existing: version.clone(),
                    found: gv.version.clone(),
                    package: package.clone(),
                });
            }

            let generators = self.generators_for_type(&ident)?;
            resource.metrics.extend(generators);
            contributing.push(ident);
        }
        resource.metrics.sort_by(|a, b| a.name.cmp(&b.name));

        'types: for ident in &contributing {
            let Some(info) = graph.type_info(ident) else { continue };
            for marker in info.markers.iter().filter_map(|m| m.as_resource()) {
                if let Err(error) = marker.apply_to_resource(&mut resource) {
                    if matches!(error, MarkerError::Conflict(_)) {
                        warn!(resource = %resource.gvk_key(), %error, "conflicting resource marker");
                    }
                    self.diagnostics.push(Diagnostic::new(info.position.clone(), error));
                    break 'types;
                }
            }
        }

        debug!(resource = %resource.gvk_key(), metrics = resource.metrics.len(), "resource built");
        Ok(self.resources.entry(gk.clone()).or_insert(resource))
    }
}
