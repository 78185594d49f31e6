/// (De)serializes the website list as a TOML/JSON table of `host = "site_id"`.
pub mod website_map {
    use super::super::WebsiteMapping;
    use serde::{Deserialize, Deserializer, Serializer, ser::SerializeMap};
    use std::collections::BTreeMap;

    pub fn serialize<S>(websites: &[WebsiteMapping], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(websites.len()))?;
        for website in websites {
            map.serialize_entry(&website.host, &website.site_id)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<WebsiteMapping>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let table = BTreeMap::<String, SiteId>::deserialize(deserializer)?;
        Ok(table
            .into_iter()
            .map(|(host, site_id)| WebsiteMapping::new(host, site_id.0))
            .collect())
    }

    /// Site ids are strings on the wire, but numeric ids are accepted in files.
    struct SiteId(String);

    impl<'de> Deserialize<'de> for SiteId {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            #[derive(Deserialize)]
            #[serde(untagged)]
            enum Raw {
                Text(String),
                Number(i64),
            }

            Ok(match Raw::deserialize(deserializer)? {
                Raw::Text(text) => SiteId(text),
                Raw::Number(number) => SiteId(number.to_string()),
            })
        }
    }
}
