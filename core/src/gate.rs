//! Create-if-absent guarded by a prior lookup.
//!
//! # Design
//! A gated create runs two steps in order: the lookup result is inspected
//! first, and the create closure only runs once that lookup has come back
//! `ok` with `exists == false`. Creating twice with the same title and shape
//! therefore issues a single POST.
//!
//! A resource found with the same title but a different shape is handled by
//! `ShapePolicy`: `Lenient` returns it as found, `Strict` fails.

use tracing::{debug, warn};

use crate::error::ApiError;
use crate::types::{Resource, ShapePolicy};

/// Runs an existence-gated create.
///
/// `mismatch` returns a description of how the found resource differs from
/// the request, or `None` when it matches.
pub(crate) fn ensure_exists<D>(
    kind: &'static str,
    lookup: Resource<D>,
    policy: ShapePolicy,
    mismatch: impl FnOnce(&D) -> Option<String>,
    create: impl FnOnce() -> Resource<D>,
) -> Resource<D> {
    if !lookup.ok {
        return lookup;
    }
    if !lookup.exists {
        debug!(kind, title = %lookup.title, "not found, creating");
        return create();
    }

    let Some(detail) = lookup.details.as_ref().and_then(mismatch) else {
        debug!(kind, title = %lookup.title, "already exists, skipping create");
        return lookup;
    };

    match policy {
        ShapePolicy::Lenient => {
            warn!(kind, title = %lookup.title, %detail, "exists with a different shape, returning it");
            lookup
        }
        ShapePolicy::Strict => {
            let error = ApiError::ShapeMismatch {
                kind,
                title: lookup.title.clone(),
                detail,
            };
            Resource::failed(lookup.title, error)
        }
    }
}
