use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};

/// Client fingerprint forwarded with each login for the backend's audit
/// trail. The guard never inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub user_agent: String,
    pub platform: String,
    pub language: String,
    pub timestamp: String,
    pub screen_resolution: String,
    pub timezone: String,
}

impl DeviceInfo {
    pub fn detect() -> Self {
        let language = std::env::var("LC_ALL")
            .or_else(|_| std::env::var("LANG"))
            .ok()
            .and_then(|lang| lang.split('.').next().map(|l| l.replace('_', "-")))
            .filter(|lang| !lang.is_empty())
            .unwrap_or_else(|| "en-US".to_string());

        Self {
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            language,
            timestamp: Utc::now().to_rfc3339(),
            screen_resolution: "unknown".to_string(),
            timezone: Local::now().format("%:z").to_string(),
        }
    }

    /// The wire form: a JSON document carried as a string field.
    pub fn to_wire(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
