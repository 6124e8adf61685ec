//! Host identity.
//!
//! Resource attributes may name the host that produced a batch; when they
//! do, that name wins over any default. Series without a resource-level host
//! fall back to [`HostResolver`], which owns its own cache.

use crate::core::Labels;
use once_cell::sync::OnceCell;
use std::path::Path;

/// Custom attribute overriding every other host source.
pub const ATTRIBUTE_DATADOG_HOSTNAME: &str = "datadog.host.name";
/// Semantic convention: cloud provider name.
pub const ATTRIBUTE_CLOUD_PROVIDER: &str = "cloud.provider";
/// Semantic convention: cloud host id (EC2 instance id on AWS).
pub const ATTRIBUTE_HOST_ID: &str = "host.id";
/// Semantic convention: host name.
pub const ATTRIBUTE_HOST_NAME: &str = "host.name";

const CLOUD_PROVIDER_AWS: &str = "aws";
const UNKNOWN_HOSTNAME: &str = "unknown";

/// Returns the host named by resource attributes, if any.
///
/// Precedence: `datadog.host.name`, then `host.id` on AWS, then `host.name`.
pub fn hostname_from_attributes(attrs: &Labels) -> Option<&str> {
    let non_empty = |key: &str| attrs.get(key).filter(|v| !v.is_empty());

    if let Some(host) = non_empty(ATTRIBUTE_DATADOG_HOSTNAME) {
        return Some(host);
    }

    if attrs.get(ATTRIBUTE_CLOUD_PROVIDER) == Some(CLOUD_PROVIDER_AWS) {
        if let Some(host) = non_empty(ATTRIBUTE_HOST_ID) {
            return Some(host);
        }
    }

    non_empty(ATTRIBUTE_HOST_NAME)
}

/// Resolves the default hostname once and remembers it.
#[derive(Debug, Default)]
pub struct HostResolver {
    configured: Option<String>,
    resolved: OnceCell<String>,
}

impl HostResolver {
    /// Creates a resolver preferring `configured` when set.
    pub fn new(configured: Option<String>) -> Self {
        Self {
            configured: configured.filter(|h| !h.is_empty()),
            resolved: OnceCell::new(),
        }
    }

    /// The default hostname.
    pub fn hostname(&self) -> &str {
        if let Some(configured) = &self.configured {
            return configured;
        }
        self.resolved.get_or_init(|| {
            let host = system_hostname().unwrap_or_else(|| UNKNOWN_HOSTNAME.to_string());
            tracing::debug!("Default hostname resolved to {}", host);
            host
        })
    }
}

fn system_hostname() -> Option<String> {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| read_hostname_file(Path::new("/etc/hostname")))
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
}

fn read_hostname_file(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok()
}
