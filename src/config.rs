use envconfig::Envconfig;
use serde::{Deserialize, Serialize};

use crate::models::SubscriptionTier;

#[derive(Envconfig, Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[envconfig(from = "DATABASE_URL", default = "sqlite:mindmap.db?mode=rwc")]
    pub database_url: String,

    #[envconfig(from = "MINDMAP_SERVER_PORT", default = "3000")]
    pub server_port: u16,

    #[envconfig(from = "MINDMAP_TOKEN_KEY", default = "change-me-in-production")]
    pub token_key: String,

    #[envconfig(from = "MINDMAP_TOKEN_TTL_SECONDS", default = "86400")] // 24 hours
    pub token_ttl_seconds: u64,

    #[envconfig(from = "MAX_MINDMAPS_FREE", default = "3")]
    pub max_mindmaps_free: i64,

    #[envconfig(from = "MAX_MINDMAPS_PREMIUM", default = "50")]
    pub max_mindmaps_premium: i64,

    #[envconfig(from = "MAX_MINDMAPS_ENTERPRISE", default = "-1")] // -1 = unlimited
    pub max_mindmaps_enterprise: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, envconfig::Error> {
        Self::init_from_env()
    }

    /// Maximum number of non-archived mindmaps for a subscription tier.
    /// A negative value means unlimited.
    pub fn mindmap_limit(&self, tier: SubscriptionTier) -> i64 {
        match tier {
            SubscriptionTier::Free => self.max_mindmaps_free,
            SubscriptionTier::Premium => self.max_mindmaps_premium,
            SubscriptionTier::Enterprise => self.max_mindmaps_enterprise,
        }
    }
}
