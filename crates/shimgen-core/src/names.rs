//! Dotted-name resolution against the namespaces of a source unit.
//!
//! Declarations arrive with fully qualified dotted names such as
//! `class cv.SimpleBlobDetector.Params` or `cv.Mat.depth`. Resolution splits
//! them into namespace, enclosing path, enclosing type, and local name.

use serde::Serialize;

/// A declaration name split into its scoping parts.
///
/// Empty fields mean "not present": an entity with an empty
/// `enclosing_type` is a free function or a module-level constant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct EntityName {
    /// Matched namespace (e.g. `cv`), empty when none matched.
    pub namespace: String,
    /// Dotted path of enclosing types (e.g. `SimpleBlobDetector`).
    pub enclosing_path: String,
    /// Innermost enclosing type.
    pub enclosing_type: String,
    /// Name of the entity itself.
    pub local_name: String,
}

impl EntityName {
    /// Resolve a full declaration name against the known namespaces.
    ///
    /// A leading kind marker (`class `, `struct `, `const `) is dropped. The
    /// longest namespace that prefixes the name wins, so a nested namespace
    /// `a.b` always takes precedence over `a`.
    pub fn resolve<S: AsRef<str>>(full_name: &str, namespaces: &[S]) -> Self {
        let name = strip_kind_marker(full_name);

        let mut candidates: Vec<&str> = namespaces
            .iter()
            .map(AsRef::as_ref)
            .filter(|ns| !ns.is_empty())
            .collect();
        candidates.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let (namespace, local) = candidates
            .iter()
            .find_map(|ns| {
                name.strip_prefix(ns)
                    .and_then(|rest| rest.strip_prefix('.'))
                    .map(|rest| (ns.to_string(), rest))
            })
            .unwrap_or_else(|| (String::new(), name));

        let pieces: Vec<&str> = local.split('.').collect();
        match pieces.as_slice() {
            [single] => Self {
                namespace,
                local_name: single.to_string(),
                ..Default::default()
            },
            [owner, name] => Self {
                namespace,
                enclosing_path: owner.to_string(),
                enclosing_type: owner.to_string(),
                local_name: name.to_string(),
            },
            [path @ .., owner, name] => Self {
                namespace,
                enclosing_path: path
                    .iter()
                    .chain(std::iter::once(owner))
                    .copied()
                    .collect::<Vec<_>>()
                    .join("."),
                enclosing_type: owner.to_string(),
                local_name: name.to_string(),
            },
            [] => Self {
                namespace,
                ..Default::default()
            },
        }
    }

    /// Whether the entity lives inside a type.
    pub fn is_member(&self) -> bool {
        !self.enclosing_type.is_empty()
    }

    /// The enclosing path in native scope syntax (`A::B`).
    pub fn owner_qualified(&self) -> String {
        self.enclosing_path.replace('.', "::")
    }

    /// The entity path below the namespace in native scope syntax.
    pub fn qualified(&self) -> String {
        if self.enclosing_path.is_empty() {
            self.local_name.clone()
        } else {
            format!("{}::{}", self.owner_qualified(), self.local_name)
        }
    }

    /// The namespace in native scope syntax (`cv::ml`).
    pub fn native_namespace(&self) -> String {
        self.namespace.replace('.', "::")
    }

    /// Fully qualified native name (`cv::Mat::depth`).
    pub fn native_qualified(&self) -> String {
        if self.namespace.is_empty() {
            self.qualified()
        } else {
            format!("{}::{}", self.native_namespace(), self.qualified())
        }
    }
}

impl std::fmt::Display for EntityName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts = [
            self.namespace.as_str(),
            self.enclosing_path.as_str(),
            self.local_name.as_str(),
        ];
        let joined: Vec<&str> = parts.into_iter().filter(|p| !p.is_empty()).collect();
        write!(f, "{}", joined.join("."))
    }
}

/// Drop a leading declaration kind keyword.
///
/// Only a first token without dots counts as a keyword, so member names
/// containing spaces (`cv.Algorithm.operator ()`) are left intact.
pub(crate) fn strip_kind_marker(full_name: &str) -> &str {
    let trimmed = full_name.trim();
    match trimmed.split_once(' ') {
        Some((keyword, rest)) if !keyword.contains('.') => rest.trim(),
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn longest_namespace_wins() {
        let name = EntityName::resolve("a.b.c.d", &["a", "a.b"]);
        assert_eq!(name.namespace, "a.b");
        assert_eq!(name.enclosing_path, "c");
        assert_eq!(name.enclosing_type, "c");
        assert_eq!(name.local_name, "d");
    }

    #[test]
    fn namespace_order_does_not_matter() {
        let forward = EntityName::resolve("a.b.c.d", &["a", "a.b"]);
        let backward = EntityName::resolve("a.b.c.d", &["a.b", "a"]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn bare_free_function() {
        let name = EntityName::resolve("cv.add", &["cv"]);
        assert_eq!(name.namespace, "cv");
        assert!(!name.is_member());
        assert_eq!(name.local_name, "add");
        assert_eq!(name.native_qualified(), "cv::add");
    }

    #[test]
    fn method_of_class() {
        let name = EntityName::resolve("cv.Mat.depth", &["cv"]);
        assert_eq!(name.enclosing_path, "Mat");
        assert_eq!(name.enclosing_type, "Mat");
        assert_eq!(name.local_name, "depth");
        assert_eq!(name.qualified(), "Mat::depth");
    }

    #[test]
    fn nested_class_path() {
        let name = EntityName::resolve("class cv.SimpleBlobDetector.Params", &["cv"]);
        assert_eq!(name.enclosing_path, "SimpleBlobDetector");
        assert_eq!(name.local_name, "Params");

        let deep = EntityName::resolve("cv.A.B.C.run", &["cv"]);
        assert_eq!(deep.enclosing_path, "A.B.C");
        assert_eq!(deep.enclosing_type, "C");
        assert_eq!(deep.local_name, "run");
        assert_eq!(deep.owner_qualified(), "A::B::C");
    }

    #[test]
    fn kind_marker_is_stripped() {
        let name = EntityName::resolve("const cv.CV_8U", &["cv"]);
        assert_eq!(name.local_name, "CV_8U");
        assert!(!name.is_member());
    }

    #[test]
    fn operator_names_keep_their_spaces() {
        let name = EntityName::resolve("cv.Algorithm.operator ()", &["cv"]);
        assert_eq!(name.enclosing_type, "Algorithm");
        assert_eq!(name.local_name, "operator ()");
    }

    #[test]
    fn unknown_namespace_keeps_whole_path() {
        let name = EntityName::resolve("other.Thing.run", &["cv"]);
        assert_eq!(name.namespace, "");
        assert_eq!(name.enclosing_path, "other.Thing");
        assert_eq!(name.enclosing_type, "Thing");
        assert_eq!(name.local_name, "run");
    }

    #[test]
    fn malformed_input_yields_empty_fields() {
        let name = EntityName::resolve("", &["cv"]);
        assert_eq!(name, EntityName::default());
    }

    #[test]
    fn display_joins_present_parts() {
        let name = EntityName::resolve("cv.Mat.depth", &["cv"]);
        assert_eq!(name.to_string(), "cv.Mat.depth");
    }
}
