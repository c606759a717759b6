use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{BenchError, BenchResult};

pub const DEFAULT_SITES_PATH: &str = "fastly.json";

/// Origin value the site list uses for "no origin to compare against".
const ORIGIN_PLACEHOLDER: &str = "#";

/// One entry of the site list file, keyed by site key.
#[derive(Clone, Debug, Deserialize)]
pub struct SiteEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "rawUrl")]
    pub raw_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Site {
    pub name: String,
    pub accelerated_url: String,
    pub origin_url: Option<String>,
    pub description: String,
}

impl Site {
    pub fn new(
        name: impl Into<String>,
        accelerated_url: impl Into<String>,
        origin_url: Option<String>,
    ) -> Self {
        let name = name.into();
        let description = description_for(&name).to_string();
        Self {
            name,
            accelerated_url: accelerated_url.into(),
            origin_url,
            description,
        }
    }

    /// The origin URL to measure, or `None` when it is missing or a placeholder.
    pub fn origin_target(&self) -> Option<&str> {
        self.origin_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty() && *url != ORIGIN_PLACEHOLDER)
    }
}

/// Sites resolved for a session, plus why the defaults were used if they were.
#[derive(Clone, Debug)]
pub struct SiteSource {
    pub sites: Vec<Site>,
    pub fallback_reason: Option<String>,
}

impl SiteSource {
    pub fn used_defaults(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

pub fn accelerated_url(key: &str, provider_domain: &str) -> String {
    format!(
        "https://{}.{}/",
        key.trim().to_lowercase(),
        provider_domain.trim().trim_matches('.')
    )
}

pub fn description_for(name: &str) -> &'static str {
    match name {
        "Paper" => "Minecraft 高性能服务端",
        "Geyser" => "Minecraft 跨版本代理",
        "Purpur" => "Paper 分支服务端",
        "Pumpkin" => "Rust Minecraft 服务端",
        _ => "文档站点",
    }
}

pub fn default_sites(provider_domain: &str) -> Vec<Site> {
    [
        ("Paper", "https://papermc.io/"),
        ("Geyser", "https://geysermc.org/"),
        ("Purpur", "https://purpurmc.org/"),
        ("Pumpkin", "https://pumpkin.org/"),
    ]
    .into_iter()
    .map(|(name, origin)| {
        Site::new(
            name,
            accelerated_url(name, provider_domain),
            Some(origin.to_string()),
        )
    })
    .collect()
}

/// Builds sites from a key -> entry object, keeping the object's entry order.
pub fn sites_from_entries(
    entries: Map<String, Value>,
    provider_domain: &str,
) -> BenchResult<Vec<Site>> {
    if entries.is_empty() {
        return Err(BenchError::InvalidSiteConfig(
            "site list is empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut sites = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        if key.trim().is_empty() {
            return Err(BenchError::InvalidSiteConfig(
                "site key must not be empty".to_string(),
            ));
        }
        let entry: SiteEntry = serde_json::from_value(value)
            .map_err(|e| BenchError::InvalidSiteConfig(format!("site '{key}': {e}")))?;
        let name = entry
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| key.clone());
        if !seen.insert(name.clone()) {
            return Err(BenchError::InvalidSiteConfig(format!(
                "duplicate site name '{name}'"
            )));
        }
        sites.push(Site::new(
            name,
            accelerated_url(&key, provider_domain),
            entry.raw_url,
        ));
    }
    Ok(sites)
}

pub fn load_sites(path: impl AsRef<Path>, provider_domain: &str) -> BenchResult<Vec<Site>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    );
    let entries = if is_yaml {
        serde_yaml::from_slice::<Map<String, Value>>(&bytes)
            .map_err(|error| invalid_site_list(path, error))?
    } else {
        serde_json::from_slice::<Map<String, Value>>(&bytes)
            .map_err(|error| invalid_site_list(path, error))?
    };
    sites_from_entries(entries, provider_domain)
}

fn invalid_site_list(path: &Path, error: impl std::fmt::Display) -> BenchError {
    BenchError::InvalidSiteConfig(format!("invalid site list '{}': {error}", path.display()))
}

/// Loads the site list, substituting the built-in defaults on any failure.
pub fn load_sites_or_default(path: impl AsRef<Path>, provider_domain: &str) -> SiteSource {
    let path = path.as_ref();
    match load_sites(path, provider_domain) {
        Ok(sites) => {
            info!(path = %path.display(), count = sites.len(), "site list loaded");
            SiteSource {
                sites,
                fallback_reason: None,
            }
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "site list unavailable, using defaults");
            SiteSource {
                sites: default_sites(provider_domain),
                fallback_reason: Some(error.to_string()),
            }
        }
    }
}
