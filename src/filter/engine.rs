use super::rules::{DEFAULT_TRACK_EXTENSIONS, FilterRules};
use crate::diagnostics::Diagnostics;
use crate::domain::{RequestMeta, SiteMap};
use http::StatusCode;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;

/// Why a request was not tracked. The first matching rule wins.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    #[error("invalid IP {0}")]
    InvalidClientIp(String),
    #[error("no client IP available")]
    MissingClientIp,
    #[error("ignoring IP {0}")]
    IgnoredIp(IpAddr),
    #[error("ignoring user-agent {0}")]
    IgnoredUserAgent(String),
    #[error("ignoring location {0}")]
    IgnoredUrl(String),
    #[error("ignoring resource {0}")]
    UntrackedResource(String),
    #[error("ignoring domain {0}")]
    UnknownSite(String),
}

/// Decides which requests and responses count as trackable page views.
///
/// Pure over request metadata and the immutable rule set; the only side
/// effect is debug logging of exclusions.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    rules: FilterRules,
    sites: Arc<SiteMap>,
    diagnostics: Diagnostics,
}

impl FilterEngine {
    pub fn new(rules: FilterRules, sites: Arc<SiteMap>, diagnostics: Diagnostics) -> Self {
        Self {
            rules,
            sites,
            diagnostics,
        }
    }

    pub fn rules(&self) -> &FilterRules {
        &self.rules
    }

    pub fn sites(&self) -> &SiteMap {
        &self.sites
    }

    pub fn should_track(&self, request: &RequestMeta<'_>) -> bool {
        match self.evaluate(request) {
            Ok(()) => true,
            Err(exclusion) => {
                self.diagnostics.debug(format_args!("{exclusion}"));
                false
            }
        }
    }

    pub fn should_track_status(&self, status: StatusCode) -> bool {
        if status.as_u16() >= 400 {
            if self.rules.track_errors {
                return true;
            }
            self.diagnostics.debug(format_args!("not reporting {} error", status.as_u16()));
            return false;
        }
        true
    }

    /// Runs the pre-dispatch checks in order: client IP, user-agent, URL,
    /// resource extension, site resolution.
    pub fn evaluate(&self, request: &RequestMeta<'_>) -> Result<(), Exclusion> {
        self.check_client_ip(request)?;
        self.check_user_agent(request)?;
        self.check_url(request)?;

        let path = request.path();
        if !self.should_track_resource(path) {
            return Err(Exclusion::UntrackedResource(path.to_string()));
        }

        if self.rules.create_new_websites() {
            return Ok(());
        }

        let hostname = request.hostname();
        if self.sites.contains(&hostname) {
            Ok(())
        } else {
            Err(Exclusion::UnknownSite(hostname))
        }
    }

    fn check_client_ip(&self, request: &RequestMeta<'_>) -> Result<(), Exclusion> {
        if self.rules.ignored_prefixes.is_empty() {
            return Ok(());
        }

        let source = request
            .client_ip_source(&self.rules.client_ip_header)
            .ok_or(Exclusion::MissingClientIp)?;
        let ip: IpAddr = source
            .parse()
            .map_err(|_| Exclusion::InvalidClientIp(source.clone()))?;

        if self
            .rules
            .ignored_prefixes
            .iter()
            .any(|prefix| prefix.contains(&ip))
        {
            return Err(Exclusion::IgnoredIp(ip));
        }
        Ok(())
    }

    fn check_user_agent(&self, request: &RequestMeta<'_>) -> Result<(), Exclusion> {
        let user_agent = request.user_agent();
        if self
            .rules
            .ignored_user_agents
            .iter()
            .any(|ignored| user_agent.contains(ignored.as_str()))
        {
            return Err(Exclusion::IgnoredUserAgent(user_agent.to_string()));
        }
        Ok(())
    }

    fn check_url(&self, request: &RequestMeta<'_>) -> Result<(), Exclusion> {
        if self.rules.ignored_urls.is_empty() {
            return Ok(());
        }
        let url = request.url();
        if self.rules.ignored_urls.iter().any(|regex| regex.is_match(&url)) {
            return Err(Exclusion::IgnoredUrl(url));
        }
        Ok(())
    }

    pub fn should_track_resource(&self, path: &str) -> bool {
        if self.rules.track_all_resources {
            return true;
        }

        let extension = path_extension(path);

        if !self.rules.track_extensions.is_empty() {
            return self
                .rules
                .track_extensions
                .iter()
                .any(|allowed| allowed == extension);
        }

        DEFAULT_TRACK_EXTENSIONS
            .iter()
            .any(|content| *content == extension)
    }
}

/// File extension of the last path segment including the dot, or `""`.
pub fn path_extension(path: &str) -> &str {
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rfind('.') {
        Some(index) => &segment[index..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_extension_matches_last_segment() {
        assert_eq!(path_extension("/foo.html"), ".html");
        assert_eq!(path_extension("/archive.tar.gz"), ".gz");
        assert_eq!(path_extension("/page"), "");
        assert_eq!(path_extension("/v1.2/page"), "");
        assert_eq!(path_extension("/"), "");
        assert_eq!(path_extension("/.env"), ".env");
    }

    #[test]
    fn status_filter_respects_track_errors() {
        let sites = Arc::new(SiteMap::default());
        let diagnostics = Diagnostics::new("test", false);
        let engine = FilterEngine::new(FilterRules::default(), sites.clone(), diagnostics.clone());

        assert!(engine.should_track_status(StatusCode::OK));
        assert!(engine.should_track_status(StatusCode::PERMANENT_REDIRECT));
        assert!(!engine.should_track_status(StatusCode::NOT_FOUND));
        assert!(!engine.should_track_status(StatusCode::BAD_GATEWAY));

        let rules = FilterRules {
            track_errors: true,
            ..FilterRules::default()
        };
        let engine = FilterEngine::new(rules, sites, diagnostics);
        assert!(engine.should_track_status(StatusCode::NOT_FOUND));
    }
}
