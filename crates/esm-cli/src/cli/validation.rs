/// Parse and validate a CDN origin given with `--cdn`.
///
/// The origin must be an absolute http(s) URL without a query or fragment. A
/// trailing slash is removed so that `https://esm.sh/` and `https://esm.sh`
/// produce the same bindings.
///
/// # Errors
///
/// Returns an error message if the origin is not usable.
pub fn parse_cdn_origin(s: &str) -> Result<String, String> {
    let origin = s.trim().trim_end_matches('/');
    if origin.is_empty() {
        return Err("CDN origin cannot be empty".to_string());
    }

    let Some((scheme, rest)) = origin.split_once("://") else {
        return Err(format!("CDN origin must be an absolute URL: '{}'", s));
    };
    if scheme != "http" && scheme != "https" {
        return Err(format!("CDN origin must use http or https: '{}'", s));
    }
    if rest.is_empty() || rest.contains(['?', '#', ' ']) {
        return Err(format!("CDN origin must be a plain host URL: '{}'", s));
    }

    Ok(origin.to_string())
}
