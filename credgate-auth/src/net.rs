//! Host name helpers

use url::Host;

/// Base domain an SSO cookie is scoped to
///
/// Strips the host-specific leftmost label when at least two labels remain
/// afterwards. IP literals and single-label names are returned as given.
///
/// ```
/// use credgate_auth::net::base_domain;
///
/// assert_eq!(base_domain("www.example.org"), "example.org");
/// assert_eq!(base_domain("example.org"), "example.org");
/// assert_eq!(base_domain("10.0.0.1"), "10.0.0.1");
/// ```
pub fn base_domain(server_name: &str) -> String {
    let host = strip_port(server_name.trim()).trim_end_matches('.').to_lowercase();

    match Host::parse(&host) {
        Ok(Host::Domain(_)) => {}
        // IPs and unparseable names are not split
        _ => return host,
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 3 {
        return host;
    }
    labels[1..].join(".")
}

fn strip_port(server_name: &str) -> &str {
    // Bracketed IPv6 literal, optionally with a port
    if let Some(rest) = server_name.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match server_name.rsplit_once(':') {
        Some((host, port))
            if !host.contains(':') && port.chars().all(|c| c.is_ascii_digit()) =>
        {
            host
        }
        _ => server_name,
    }
}
