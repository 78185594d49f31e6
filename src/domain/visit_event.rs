use serde::{Deserialize, Serialize};

/// Event type tag understood by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Pageview,
    CustomEvent,
}

/// One observed page view (or named custom event) ready for delivery.
///
/// Built once at interception time and never mutated afterwards; the queue
/// owns it until the delivery client has made its single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitEvent {
    pub api_key: String,
    pub site_id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub pathname: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<String>,
}

impl VisitEvent {
    pub fn pageview(
        api_key: impl Into<String>,
        site_id: impl Into<String>,
        pathname: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            site_id: site_id.into(),
            kind: EventKind::Pageview,
            pathname: pathname.into(),
            hostname: String::new(),
            ip_address: None,
            user_agent: String::new(),
            language: None,
            event_name: None,
            referrer: None,
            properties: None,
        }
    }

    /// Turns the event into a named custom event carrying serialized properties.
    pub fn into_custom(
        mut self,
        name: impl Into<String>,
        properties: Option<&serde_json::Value>,
    ) -> Result<Self, serde_json::Error> {
        self.kind = EventKind::CustomEvent;
        self.event_name = Some(name.into());
        self.properties = properties.map(serde_json::to_string).transpose()?;
        Ok(self)
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_ip_address(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn with_referrer(mut self, referrer: Option<String>) -> Self {
        self.referrer = referrer;
        self
    }
}
