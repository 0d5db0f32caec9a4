use http::HeaderValue;
use url::Url;

/// Whether a browser `Origin` may call the API.
///
/// Allowed: an exact scheme/host/port match with the configured portal origin, and any
/// loopback host (local development).
pub fn origin_allowed(origin: &HeaderValue, portal_origin: Option<&str>) -> bool {
    let Ok(origin_str) = origin.to_str() else {
        return false;
    };
    let Ok(url) = Url::parse(origin_str) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };

    if let Some(portal) = portal_origin.and_then(|p| Url::parse(p).ok()) {
        if portal.scheme() == url.scheme()
            && portal.host_str() == url.host_str()
            && portal.port_or_known_default() == url.port_or_known_default()
        {
            return true;
        }
    }

    host.eq_ignore_ascii_case("localhost") || host == "[::1]" || host == "::1" || host.starts_with("127.")
}
