use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CounterStore;
use crate::config::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub limit: u32,
    pub window: Duration,
}

impl RateLimitRule {
    pub fn new(limit: u32, window_secs: u64) -> Self {
        Self {
            limit,
            window: Duration::from_secs(window_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub default_rule: RateLimitRule,
    /// Per-path overrides, keyed by the full request path.
    pub rules: HashMap<String, RateLimitRule>,
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_rule: RateLimitRule::new(100, 60),  // 100 requests per minute
            rules: HashMap::new(),
            trust_forwarded_for: false,
        }
    }
}

impl RateLimitConfig {
    /// Stricter limits on the credential endpoints, keyed under `api_prefix`.
    pub fn with_auth_rules(api_prefix: &str) -> Self {
        let prefix = api_prefix.trim_end_matches('/');
        let mut config = Self::default();
        config.rules.insert(format!("{}/auth/login", prefix), RateLimitRule::new(5, 60));
        config.rules.insert(format!("{}/auth/register", prefix), RateLimitRule::new(3, 300));
        config.rules.insert(format!("{}/auth/refresh", prefix), RateLimitRule::new(10, 60));
        config
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let mut config = Self::with_auth_rules(&settings.server.api_prefix);
        config.enabled = !settings.is_development();
        config.default_rule = RateLimitRule::new(
            settings.rate_limit.default_limit,
            settings.rate_limit.default_window_secs,
        );
        config.trust_forwarded_for = settings.rate_limit.trust_forwarded_for;
        config
    }

    pub fn rule_for(&self, path: &str) -> RateLimitRule {
        self.rules.get(path).copied().unwrap_or(self.default_rule)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub window_secs: u64,
    /// Seconds until the window resets; only set when denied.
    pub retry_after: Option<u64>,
}

impl RateLimitDecision {
    fn unrestricted(rule: RateLimitRule) -> Self {
        Self {
            allowed: true,
            limit: rule.limit,
            remaining: rule.limit,
            window_secs: rule.window.as_secs(),
            retry_after: None,
        }
    }
}

/// Fixed-window request counter per (client, path).
pub struct RateLimiter {
    store: Option<Arc<dyn CounterStore>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Option<Arc<dyn CounterStore>>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn counter_key(client_id: &str, path: &str) -> String {
        format!("rate_limit:{}:{}", client_id, path)
    }

    /// Count this request. Fails open: a missing or unreachable store
    /// allows the request and logs a warning.
    pub async fn check(&self, client_id: &str, path: &str) -> RateLimitDecision {
        let rule = self.config.rule_for(path);
        if !self.config.enabled {
            return RateLimitDecision::unrestricted(rule);
        }

        let store = match &self.store {
            Some(store) => store,
            None => {
                tracing::warn!("Rate limit store unavailable, allowing request to {}", path);
                return RateLimitDecision::unrestricted(rule);
            }
        };

        let key = Self::counter_key(client_id, path);
        match store.hit(&key, rule.window).await {
            Ok(hit) => {
                let allowed = hit.count <= u64::from(rule.limit);
                let remaining = u64::from(rule.limit).saturating_sub(hit.count) as u32;
                if !allowed {
                    tracing::warn!("Rate limit exceeded for client {} on {}", client_id, path);
                }
                RateLimitDecision {
                    allowed,
                    limit: rule.limit,
                    remaining,
                    window_secs: rule.window.as_secs(),
                    retry_after: (!allowed).then(|| hit.ttl_secs.max(1)),
                }
            }
            Err(e) => {
                tracing::warn!("Rate limit check failed, allowing request: {}", e);
                RateLimitDecision::unrestricted(rule)
            }
        }
    }
}
