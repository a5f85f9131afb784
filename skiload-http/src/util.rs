use crate::{Error, Result};

pub(super) fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

pub(super) fn host_header_value(parsed: &url::Url) -> Option<String> {
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_string()),
    }
}

/// Joins a base address (`http://host:port`, optionally with a path prefix) and an
/// absolute request path without doubling or dropping the separating slash.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Appends `segments` to the path of `base`, percent-encoding each one so that spaces,
/// `/`, `?` and `#` stay inside their segment.
pub fn join_url_segments<'a, I>(base: &str, segments: I) -> Result<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut url = url::Url::parse(base).map_err(|_| Error::InvalidUrl(base.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| Error::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}
