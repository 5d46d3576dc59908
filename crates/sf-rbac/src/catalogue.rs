//! Path-pattern + HTTP-method -> required-permission mapping.
//!
//! Patterns use `{id}` as a wildcard path segment. The table is matched by
//! exact segment count and literal-or-wildcard comparison per segment, most
//! specific entries first; unmatched `/admin/...` paths default to
//! `admin.system`, anything else unmatched requires no permission.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

struct Entry {
    pattern: &'static str,
    method: HttpMethod,
    permission: &'static str,
}

const CATALOGUE: &[Entry] = &[
    Entry { pattern: "/sprints", method: HttpMethod::Get, permission: "sprint.read" },
    Entry { pattern: "/sprints", method: HttpMethod::Post, permission: "sprint.write" },
    Entry { pattern: "/sprints/{id}", method: HttpMethod::Get, permission: "sprint.read" },
    Entry { pattern: "/sprints/{id}", method: HttpMethod::Put, permission: "sprint.write" },
    Entry { pattern: "/sprints/{id}", method: HttpMethod::Delete, permission: "sprint.delete" },
    Entry { pattern: "/reports", method: HttpMethod::Get, permission: "report.read" },
    Entry { pattern: "/reports", method: HttpMethod::Post, permission: "report.create" },
    Entry { pattern: "/admin/roles", method: HttpMethod::Get, permission: "admin.roles" },
    Entry { pattern: "/admin/roles", method: HttpMethod::Post, permission: "admin.roles" },
    Entry { pattern: "/admin/roles", method: HttpMethod::Put, permission: "admin.roles" },
    Entry { pattern: "/admin/roles", method: HttpMethod::Delete, permission: "admin.roles" },
    Entry { pattern: "/users/{id}/roles", method: HttpMethod::Get, permission: "user.roles" },
    Entry { pattern: "/users/{id}/roles", method: HttpMethod::Post, permission: "user.roles" },
    Entry { pattern: "/users/{id}/roles", method: HttpMethod::Put, permission: "user.roles" },
    Entry { pattern: "/users/{id}/roles", method: HttpMethod::Delete, permission: "user.roles" },
];

fn segments_match(pattern: &str, path: &str) -> bool {
    let p: Vec<&str> = pattern.trim_matches('/').split('/').collect();
    let q: Vec<&str> = path.trim_matches('/').split('/').collect();
    if p.len() != q.len() {
        return false;
    }
    p.iter().zip(q.iter()).all(|(ps, qs)| *ps == "{id}" || ps == qs)
}

/// Returns the permission string required for `(path, method)`, or `None`
/// if the path is unprotected. Unknown `/admin/...` paths still require
/// `admin.system`.
pub fn required_permission(path: &str, method: HttpMethod) -> Option<&'static str> {
    CATALOGUE
        .iter()
        .find(|e| e.method == method && segments_match(e.pattern, path))
        .map(|e| e.permission)
        .or_else(|| {
            if path.trim_matches('/').starts_with("admin") {
                Some("admin.system")
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_and_item_routes_require_different_permissions() {
        assert_eq!(required_permission("/sprints", HttpMethod::Get), Some("sprint.read"));
        assert_eq!(required_permission("/sprints", HttpMethod::Post), Some("sprint.write"));
        assert_eq!(required_permission("/sprints/42", HttpMethod::Put), Some("sprint.write"));
        assert_eq!(required_permission("/sprints/42", HttpMethod::Delete), Some("sprint.delete"));
    }

    #[test]
    fn nested_wildcard_segment_matches() {
        assert_eq!(required_permission("/users/bob/roles", HttpMethod::Get), Some("user.roles"));
    }

    #[test]
    fn unknown_admin_path_defaults_to_admin_system() {
        assert_eq!(required_permission("/admin/feature-flags", HttpMethod::Get), Some("admin.system"));
    }

    #[test]
    fn unknown_non_admin_path_is_unprotected() {
        assert_eq!(required_permission("/healthz", HttpMethod::Get), None);
    }
}
