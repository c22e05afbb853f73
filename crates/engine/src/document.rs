use std::cmp::Ordering;

use metricgen_core::{MetricsDocument, Resource};

/// Assemble the final document: empty resources are dropped, metrics within
/// a resource are ordered by name, resources by [`compare_resources`].
pub fn build_document(resources: impl IntoIterator<Item = Resource>) -> MetricsDocument {
    let mut resources: Vec<Resource> = resources
        .into_iter()
        .filter(|r| !r.metrics.is_empty())
        .map(|mut r| {
            r.metrics.sort_by(|a, b| a.name.cmp(&b.name));
            r
        })
        .collect();
    resources.sort_by(compare_resources);
    MetricsDocument::new(resources)
}

/// Total order on resources. Unprefixed resources come first; prefixes
/// compare lexicographically; ties fall back to `group/version/kind`.
pub fn compare_resources(a: &Resource, b: &Resource) -> Ordering {
    a.metric_name_prefix
        .cmp(&b.metric_name_prefix)
        .then_with(|| a.gvk_key().cmp(&b.gvk_key()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use metricgen_core::{Generator, MetricGauge};

    fn resource(kind: &str, prefix: Option<&str>, metrics: &[&str]) -> Resource {
        let mut r = Resource::new("example.com", "v1", kind);
        r.metric_name_prefix = prefix.map(str::to_string);
        r.metrics = metrics.iter().map(|n| Generator::new(*n, "", MetricGauge::default())).collect();
        r
    }

    fn kinds(doc: &MetricsDocument) -> Vec<&str> {
        doc.spec.resources.iter().map(|r| r.group_version_kind.kind.as_str()).collect()
    }

    #[test]
    fn empty_resources_are_dropped() {
        let doc = build_document(vec![resource("A", None, &[]), resource("B", None, &["x"])]);
        assert_eq!(kinds(&doc), ["B"]);
    }

    #[test]
    fn unprefixed_sort_before_prefixed() {
        let doc = build_document(vec![
            resource("A", Some("zeta"), &["x"]),
            resource("B", Some("alpha"), &["x"]),
            resource("C", None, &["x"]),
            resource("D", Some("alpha"), &["x"]),
        ]);
        assert_eq!(kinds(&doc), ["C", "B", "D", "A"]);
    }

    #[test]
    fn order_does_not_depend_on_input_order() {
        let input = vec![
            resource("Widget", None, &["b", "a"]),
            resource("Gadget", Some("g"), &["c"]),
            resource("Bolt", None, &["z", "y"]),
        ];
        let mut reversed = input.clone();
        reversed.reverse();
        let a = build_document(input);
        assert_eq!(a, build_document(reversed));
        assert_eq!(kinds(&a), ["Bolt", "Widget", "Gadget"]);
        let names: Vec<&str> = a.spec.resources[1].metrics.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }
}
