use url::Url;

/// Whether a discovered candidate points at a remote resource that can actually be fetched.
///
/// Only absolute `http`/`https` URLs with a host qualify. Inline payloads (`data:`),
/// object URLs (`blob:`), script links and relative or malformed strings are rejected.
pub fn is_fetchable_reference(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return false;
    }
    match Url::parse(trimmed) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}
