//! Scope Policy (C6): path-prefix authorization per token scope
//! (spec.md §4.6).
//!
//! Grounded on `original_source/app/core/permissions.py`'s
//! `SCOPE_PERMISSIONS` table and `validate_path_access` — every pattern in
//! that table is a literal path prefix (no regex metacharacters beyond the
//! leading `^` anchor), so the static list is reproduced here as plain
//! prefixes rather than pulled through a regex engine.

use zncproxy_core::types::AccessScope;

/// The certificates_only allow-list, in the original's order (order is
/// irrelevant to correctness here since matching is "any prefix matches",
/// but preserved for readability against the source).
const CERTIFICATES_ONLY_PREFIXES: &[&str] = &[
    "certificates/filter",
    "certificates/details/",
    "certificates/export/",
    "certificates/import/",
    "certificates/remove",
    "certificates/restore",
    "certificates/activeForTesting",
    "certificates/activeForTesting/activate/",
    "certificates/activeForTesting/deactivate/",
    "certificates/activeForTesting/enhanced",
    "certificates/activeForTesting/options/",
    "certificates/activeForTesting/usecases/",
    "certificates/update/",
    "certificates/update/cancel",
    "certificates/update/metrics",
    "certificates/checkSystemIntegrityReport",
    "certificates/checkSystemIntegrityLog",
    "certificates/checkSystemIntegrityLogExistance",
    "configurations/certificatesColumnOrder",
    "configurations/certificatesColumnVisibility",
];

/// `authorize(path, scope) -> bool` (spec.md §4.6). `path` may carry a
/// leading slash; exactly one is stripped before matching.
pub fn authorize(path: &str, scope: AccessScope) -> bool {
    let path = path.strip_prefix('/').unwrap_or(path);

    match scope {
        AccessScope::Full => true,
        AccessScope::CertificatesOnly => CERTIFICATES_ONLY_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scope_allows_everything() {
        assert!(authorize("anything/at/all", AccessScope::Full));
        assert!(authorize("/anything/at/all", AccessScope::Full));
    }

    #[test]
    fn certificates_only_allows_listed_prefixes() {
        assert!(authorize(
            "certificates/filter",
            AccessScope::CertificatesOnly
        ));
        assert!(authorize(
            "/certificates/details/abc-123",
            AccessScope::CertificatesOnly
        ));
        assert!(authorize(
            "configurations/certificatesColumnOrder",
            AccessScope::CertificatesOnly
        ));
    }

    #[test]
    fn certificates_only_denies_other_paths() {
        assert!(!authorize(
            "users/currentUser",
            AccessScope::CertificatesOnly
        ));
    }

    #[test]
    fn leading_slash_is_stripped_exactly_once() {
        assert!(authorize(
            "/certificates/filter",
            AccessScope::CertificatesOnly
        ));
    }
}
