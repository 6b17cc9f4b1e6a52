use std::{collections::HashMap, fs, time::Duration};

use dashboard_core::ControllerConfig;
use shared::domain::{SchoolId, TenantContext, TenantId};

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_url: String,
    pub school_id: i64,
    pub tenant_id: String,
    pub page_size: u32,
    pub debounce_ms: u64,
    pub request_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000/api".into(),
            school_id: 1,
            tenant_id: "demo".into(),
            page_size: 10,
            debounce_ms: 500,
            request_timeout_seconds: 30,
        }
    }
}

impl Settings {
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig::new(
            self.server_url.clone(),
            TenantContext::new(
                SchoolId(self.school_id),
                TenantId::new(self.tenant_id.clone()),
            ),
        )
        .with_page_size(self.page_size)
        .with_debounce_window(Duration::from_millis(self.debounce_ms))
        .with_request_timeout(Duration::from_secs(self.request_timeout_seconds))
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("dashboard.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("server_url") {
                settings.server_url = normalize_base_url(v);
            }
            if let Some(v) = file_cfg.get("school_id") {
                if let Ok(parsed) = v.parse::<i64>() {
                    settings.school_id = parsed;
                }
            }
            if let Some(v) = file_cfg.get("tenant_id") {
                settings.tenant_id = v.clone();
            }
            if let Some(v) = file_cfg.get("page_size") {
                if let Ok(parsed) = v.parse::<u32>() {
                    settings.page_size = parsed;
                }
            }
        }
    }

    if let Ok(v) = std::env::var("DASHBOARD_SERVER_URL") {
        settings.server_url = normalize_base_url(&v);
    }
    if let Ok(v) = std::env::var("APP__SERVER_URL") {
        settings.server_url = normalize_base_url(&v);
    }

    if let Ok(v) = std::env::var("DASHBOARD_SCHOOL_ID") {
        if let Ok(parsed) = v.parse::<i64>() {
            settings.school_id = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__SCHOOL_ID") {
        if let Ok(parsed) = v.parse::<i64>() {
            settings.school_id = parsed;
        }
    }

    if let Ok(v) = std::env::var("DASHBOARD_TENANT_ID") {
        settings.tenant_id = v;
    }
    if let Ok(v) = std::env::var("APP__TENANT_ID") {
        settings.tenant_id = v;
    }

    if let Ok(v) = std::env::var("APP__PAGE_SIZE") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.page_size = parsed;
        }
    }

    if let Ok(v) = std::env::var("APP__DEBOUNCE_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.debounce_ms = parsed;
        }
    }

    if let Ok(v) = std::env::var("APP__REQUEST_TIMEOUT_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_seconds = parsed;
        }
    }

    settings
}

/// Accepts bare host:port values and trailing slashes from config files.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');

    if trimmed.is_empty() {
        return Settings::default().server_url;
    }

    if trimmed.contains("://") {
        return trimmed.to_string();
    }

    format!("http://{trimmed}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bare_host_to_http_url() {
        assert_eq!(
            normalize_base_url("localhost:8000/api"),
            "http://localhost:8000/api"
        );
        assert_eq!(
            normalize_base_url("https://portal.greenwood.edu/api/"),
            "https://portal.greenwood.edu/api"
        );
        assert_eq!(normalize_base_url(""), Settings::default().server_url);
    }

    #[test]
    fn controller_config_carries_tenant_scope() {
        let settings = Settings {
            school_id: 9,
            tenant_id: "greenwood".into(),
            debounce_ms: 250,
            ..Settings::default()
        };

        let config = settings.controller_config();
        assert_eq!(
            config.tenant,
            TenantContext::new(SchoolId(9), TenantId::new("greenwood"))
        );
        assert_eq!(config.debounce_window, Duration::from_millis(250));
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn env_override_wins_over_defaults() {
        std::env::set_var("APP__PAGE_SIZE", "25");
        let settings = load_settings();
        std::env::remove_var("APP__PAGE_SIZE");

        assert_eq!(settings.page_size, 25);
    }
}
