#![allow(dead_code)]

use std::env;
use tracing::warn;

pub const DEFAULT_LWA_TOKEN_URL: &str = "https://api.amazon.com/auth/o2/token";

/// Selling Partner API regional endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    NorthAmerica,
    #[default]
    Europe,
    FarEast,
}

impl Region {
    pub fn from_str(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "na" => Some(Region::NorthAmerica),
            "eu" => Some(Region::Europe),
            "fe" => Some(Region::FarEast),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Region::NorthAmerica => "na",
            Region::Europe => "eu",
            Region::FarEast => "fe",
        }
    }

    pub fn endpoint(&self) -> String {
        format!("https://sellingpartnerapi-{}.amazon.com", self.code())
    }
}

#[derive(Debug, Clone)]
pub struct SpApiConfig {
    pub endpoint: String,
    pub lwa: LwaCredentials,
    pub static_access_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LwaCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub token_url: String,
}

impl LwaCredentials {
    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty() && !self.refresh_token.is_empty()
    }
}

impl SpApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let region = match var("SPAPI_REGION") {
            Some(raw) => Region::from_str(&raw).unwrap_or_else(|| {
                warn!(target = "spapi.config", region = %raw, "unknown SPAPI_REGION; using eu");
                Region::default()
            }),
            None => Region::default(),
        };
        let endpoint = var("SPAPI_ENDPOINT")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| region.endpoint());

        Self {
            endpoint,
            lwa: LwaCredentials {
                client_id: var("LWA_CLIENT_ID").unwrap_or_default(),
                client_secret: var("LWA_CLIENT_SECRET").unwrap_or_default(),
                refresh_token: var("LWA_REFRESH_TOKEN").unwrap_or_default(),
                token_url: var("LWA_TOKEN_URL").unwrap_or_else(|| DEFAULT_LWA_TOKEN_URL.to_string()),
            },
            static_access_token: var("SPAPI_ACCESS_TOKEN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_europe_endpoint() {
        let cfg = SpApiConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg.endpoint, "https://sellingpartnerapi-eu.amazon.com");
        assert_eq!(cfg.lwa.token_url, DEFAULT_LWA_TOKEN_URL);
        assert!(!cfg.lwa.is_complete());
        assert!(cfg.static_access_token.is_none());
    }

    #[test]
    fn region_and_override() {
        let cfg = SpApiConfig::from_lookup(lookup(&[("SPAPI_REGION", "NA")]));
        assert_eq!(cfg.endpoint, "https://sellingpartnerapi-na.amazon.com");

        let cfg = SpApiConfig::from_lookup(lookup(&[
            ("SPAPI_REGION", "fe"),
            ("SPAPI_ENDPOINT", "http://localhost:9000/"),
        ]));
        assert_eq!(cfg.endpoint, "http://localhost:9000");
    }

    #[test]
    fn unknown_region_falls_back() {
        let cfg = SpApiConfig::from_lookup(lookup(&[("SPAPI_REGION", "mars")]));
        assert_eq!(cfg.endpoint, Region::Europe.endpoint());
    }

    #[test]
    fn lwa_credentials_complete() {
        let cfg = SpApiConfig::from_lookup(lookup(&[
            ("LWA_CLIENT_ID", "amzn1.application-oa2-client.x"),
            ("LWA_CLIENT_SECRET", "secret"),
            ("LWA_REFRESH_TOKEN", "Atzr|abc"),
            ("SPAPI_ACCESS_TOKEN", "  "),
        ]));
        assert!(cfg.lwa.is_complete());
        assert!(cfg.static_access_token.is_none());
    }
}
