mod logger;

use std::sync::Arc;

use anyhow::{Context, Result};
use fsu_portal::auth::AuthService;
use fsu_portal::board::{self, DashboardStats};
use fsu_portal::config::Config;
use fsu_portal::models::{Notice, Suggestion};
use fsu_portal::store::Entity;
use fsu_portal::{ApiClient, NoticeService, NoticeStore, ReadTier, SnapshotCache, SuggestionService, SuggestionStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logger::init_logging();

    let config = Config::from_env();
    tracing::info!(api_url = %config.api_url, cache = %config.cache_path, "Starting FSU portal sync");

    let cache = Arc::new(SnapshotCache::open(&config.cache_path).context("Failed to open snapshot cache")?);
    let api = ApiClient::new(&config.api_url, config.request_timeout).context("Failed to build HTTP client")?;

    let auth = AuthService::new(api.clone());
    let notices = NoticeStore::new(NoticeService::new(api.clone()), cache.clone());
    let suggestions = SuggestionStore::new(SuggestionService::new(api.clone()), cache.clone());

    let logged_in = match &config.credentials {
        Some(credentials) => match auth.login(credentials).await {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(error = %err, "Login failed, continuing with public data only");
                false
            }
        },
        None => {
            tracing::info!("No admin credentials configured, suggestions will not be fetched");
            false
        }
    };

    let tier = notices.refresh().await;
    report_tier(&cache, Notice::CACHE_KEY, tier, notices.error());

    if logged_in {
        let tier = suggestions.refresh().await;
        report_tier(&cache, Suggestion::CACHE_KEY, tier, suggestions.error());
    }

    let notice_items = notices.items();
    for notice in board::display_order(&notice_items) {
        let attachment = notice.attachment_url(api.base_url());
        tracing::info!(
            id = %notice.id,
            date = %notice.date,
            category = %notice.category,
            pinned = notice.pinned,
            attachment = attachment.as_deref().unwrap_or("-"),
            "{}",
            notice.title
        );
    }

    let stats = DashboardStats::collect(&notice_items, &suggestions.items());
    tracing::info!(
        notices = stats.total_notices,
        suggestions = stats.total_suggestions,
        pending = stats.pending_suggestions,
        "Dashboard"
    );

    if logged_in {
        auth.logout().await;
    }

    tracing::info!("Sync completed");
    Ok(())
}

fn report_tier(cache: &SnapshotCache, resource: &str, tier: ReadTier, error: Option<String>) {
    match tier {
        ReadTier::Remote => tracing::info!(resource, "Served from API"),
        ReadTier::Snapshot => {
            let saved_at = cache
                .saved_at(resource)
                .ok()
                .flatten()
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string());
            tracing::warn!(
                resource,
                saved_at = %saved_at,
                error = error.as_deref().unwrap_or(""),
                "Served from local snapshot"
            );
        }
        ReadTier::Defaults => tracing::warn!(
            resource,
            error = error.as_deref().unwrap_or(""),
            "Served built-in defaults"
        ),
    }
}
