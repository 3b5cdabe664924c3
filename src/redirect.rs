//! Post-redirect path validation.
//!
//! Used on return from an external payment flow, where the "go back to" path
//! was stored before navigating away and is therefore untrusted by the time
//! it is read back. Rejections fall back to the policy default silently — a
//! forged candidate is a security event, not a user error.

use crate::config::RedirectPolicy;

/// Normalize and validate a candidate path against the allow-list.
///
/// - absent candidate ⇒ default path
/// - absolute URL ⇒ parsed, only the path component kept; unparseable ⇒ default
/// - missing leading `/` ⇒ corrected, then validated
/// - `://` anywhere or a leading `//` (protocol-relative) ⇒ default
/// - any `.` or `..` segment ⇒ default
/// - path must start with an allowed prefix; the `"/"` prefix matches only
///   the root path exactly
///
/// Pure and infallible; the caller performs the navigation and clears any
/// stored pre-checkout path after consuming it.
#[must_use]
pub fn sanitize(candidate: Option<&str>, policy: &RedirectPolicy) -> String {
    let fallback = policy.default_path.clone();

    let Some(raw) = candidate.map(str::trim).filter(|s| !s.is_empty()) else {
        return fallback;
    };

    // Absolute URLs (any scheme, including scheme-only forms like
    // `javascript:`) are reduced to their path component.
    let mut path = match url::Url::parse(raw) {
        Ok(parsed) => parsed.path().to_owned(),
        Err(url::ParseError::RelativeUrlWithoutBase) => raw.to_owned(),
        Err(e) => {
            tracing::debug!(error = %e, candidate = raw, "unparseable redirect candidate");
            return fallback;
        }
    };

    if !path.starts_with('/') {
        path.insert(0, '/');
    }

    // Protocol-relative and embedded-scheme forms are open-redirect vectors,
    // and dot segments resolve past the allow-list boundary in the browser
    // (`/app/../admin` lands on `/admin`).
    if path.starts_with("//") || path.contains("://") || has_dot_segments(&path) {
        tracing::debug!(candidate = raw, "rejected redirect candidate");
        return fallback;
    }

    if is_allowed(&path, &policy.allowed_prefixes) {
        path
    } else {
        tracing::debug!(candidate = raw, path, "redirect candidate outside allow-list");
        fallback
    }
}

fn has_dot_segments(path: &str) -> bool {
    path.split('/').any(|segment| segment == "." || segment == "..")
}

fn is_allowed(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| {
        path == prefix.as_str() || (prefix != "/" && path.starts_with(&format!("{prefix}/")))
    })
}

#[cfg(test)]
#[path = "redirect_test.rs"]
mod tests;
