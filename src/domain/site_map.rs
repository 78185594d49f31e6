use std::collections::HashMap;

/// Hostname to collector site identifier mapping.
///
/// Keys are normalized to lower case so lookups match regardless of how the
/// client spelled the `Host` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteMap {
    sites: HashMap<String, String>,
}

impl SiteMap {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let sites = entries
            .into_iter()
            .map(|(host, site_id)| (host.as_ref().trim().to_ascii_lowercase(), site_id.into()))
            .collect();
        Self { sites }
    }

    pub fn resolve(&self, hostname: &str) -> Option<&str> {
        if let Some(site_id) = self.sites.get(hostname) {
            return Some(site_id);
        }
        self.sites
            .get(&hostname.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, hostname: &str) -> bool {
        self.resolve(hostname).is_some()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
