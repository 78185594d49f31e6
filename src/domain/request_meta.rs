use http::header::{ACCEPT_LANGUAGE, HOST, REFERER, USER_AGENT};
use http::{HeaderMap, HeaderName, Request, Uri};
use std::net::{IpAddr, SocketAddr};

/// Peer address of the proxied connection.
///
/// Hosts insert it into the request extensions so the filter can fall back
/// to it when the client IP header is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteAddr(pub SocketAddr);

/// Borrowed view over the parts of a request the tracker inspects.
#[derive(Debug, Clone, Copy)]
pub struct RequestMeta<'a> {
    uri: &'a Uri,
    headers: &'a HeaderMap,
    remote_addr: Option<SocketAddr>,
}

impl<'a> RequestMeta<'a> {
    pub fn new(uri: &'a Uri, headers: &'a HeaderMap, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            uri,
            headers,
            remote_addr,
        }
    }

    pub fn from_request<B>(request: &'a Request<B>) -> Self {
        let remote_addr = request
            .extensions()
            .get::<RemoteAddr>()
            .map(|remote| remote.0);
        Self::new(request.uri(), request.headers(), remote_addr)
    }

    pub fn header(&self, name: &HeaderName) -> Option<&'a str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Raw host as sent by the client, port included.
    pub fn host(&self) -> &'a str {
        self.header(&HOST)
            .or_else(|| self.uri.authority().map(|authority| authority.as_str()))
            .unwrap_or_default()
    }

    pub fn hostname(&self) -> String {
        parse_domain_from_host(self.host())
    }

    pub fn path(&self) -> &'a str {
        self.uri.path()
    }

    /// Request URL in the form the client sent it (path and query for origin-form requests).
    pub fn url(&self) -> String {
        self.uri.to_string()
    }

    pub fn user_agent(&self) -> &'a str {
        self.header(&USER_AGENT).unwrap_or_default()
    }

    pub fn referrer(&self) -> Option<&'a str> {
        self.header(&REFERER).filter(|value| !value.is_empty())
    }

    pub fn language(&self) -> Option<String> {
        self.header(&ACCEPT_LANGUAGE).and_then(parse_accept_language)
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Textual client address: the configured header when present, else the peer IP.
    pub fn client_ip_source(&self, header: &HeaderName) -> Option<String> {
        match self.header(header).map(first_forwarded) {
            Some(value) if !value.is_empty() => Some(value.to_string()),
            _ => self.remote_addr.map(|addr| addr.ip().to_string()),
        }
    }

    /// Client address used for IP exclusion.
    ///
    /// `None` means the source was missing or did not parse as an address.
    pub fn client_ip(&self, header: &HeaderName) -> Option<IpAddr> {
        self.client_ip_source(header)?.parse().ok()
    }
}

fn first_forwarded(value: &str) -> &str {
    value.split(',').next().unwrap_or_default().trim()
}

/// Strips the port (and IPv6 brackets) from a `Host` value and lower-cases it.
pub fn parse_domain_from_host(host: &str) -> String {
    let host = host.trim();
    let hostname = if let Some(rest) = host.strip_prefix('[') {
        rest.split(']').next().unwrap_or(rest)
    } else if host.matches(':').count() == 1 {
        host.split(':').next().unwrap_or(host)
    } else {
        host
    };
    hostname.trim_end_matches('.').to_ascii_lowercase()
}

/// Primary language tag of an `Accept-Language` value, e.g. `en-US` from `en-US,en;q=0.9`.
pub fn parse_accept_language(value: &str) -> Option<String> {
    let tag = value.split(',').next()?.split(';').next()?.trim();
    if tag.is_empty() || tag == "*" {
        None
    } else {
        Some(tag.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_strips_port_and_brackets() {
        assert_eq!(parse_domain_from_host("Example.com:8080"), "example.com");
        assert_eq!(parse_domain_from_host("example.com"), "example.com");
        assert_eq!(parse_domain_from_host("[::1]:443"), "::1");
        assert_eq!(parse_domain_from_host("::1"), "::1");
    }

    #[test]
    fn accept_language_takes_first_tag() {
        assert_eq!(
            parse_accept_language("de-CH,de;q=0.9,en;q=0.8"),
            Some("de-CH".to_string())
        );
        assert_eq!(parse_accept_language("fr;q=0.5"), Some("fr".to_string()));
        assert_eq!(parse_accept_language("*"), None);
        assert_eq!(parse_accept_language(""), None);
    }

    #[test]
    fn client_ip_prefers_header_then_remote_addr() {
        let header = HeaderName::from_static("x-real-ip");
        let remote: SocketAddr = "10.0.0.9:51234".parse().unwrap();

        let request = Request::builder()
            .uri("/")
            .header("x-real-ip", "203.0.113.7, 10.0.0.1")
            .extension(RemoteAddr(remote))
            .body(())
            .unwrap();
        let meta = RequestMeta::from_request(&request);
        assert_eq!(meta.client_ip(&header), Some("203.0.113.7".parse().unwrap()));

        let request = Request::builder()
            .uri("/")
            .extension(RemoteAddr(remote))
            .body(())
            .unwrap();
        let meta = RequestMeta::from_request(&request);
        assert_eq!(meta.client_ip(&header), Some(remote.ip()));

        let request = Request::builder()
            .uri("/")
            .header("x-real-ip", "not-an-ip")
            .body(())
            .unwrap();
        assert_eq!(RequestMeta::from_request(&request).client_ip(&header), None);
    }

    #[test]
    fn host_falls_back_to_absolute_uri() {
        let request = Request::builder()
            .uri("http://blog.example.com:8080/post?id=1")
            .body(())
            .unwrap();
        let meta = RequestMeta::from_request(&request);

        assert_eq!(meta.hostname(), "blog.example.com");
        assert_eq!(meta.path(), "/post");
    }
}
