use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use recruitchat::config::{SupabaseConfig, WebhookConfig};
use recruitchat::favorites::FavoriteCache;
use recruitchat::retry::RetryPolicy;
use recruitchat::supabase::SupabaseClient;

#[allow(dead_code)]
pub fn create_temp_cache() -> (FavoriteCache, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("favorites.db");
    let cache =
        FavoriteCache::new_with_path(db_path).expect("failed to create favorites cache with path");
    (cache, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Supabase settings pointing at a mock server, without retries
#[allow(dead_code)]
pub fn supabase_config(uri: &str) -> SupabaseConfig {
    SupabaseConfig {
        url: uri.to_string(),
        api_key: "anon-key".to_string(),
        access_token: Some("user-token".to_string()),
        recruiter_id: "recruiter-1".to_string(),
        retry: RetryPolicy::none(),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn supabase_client(uri: &str) -> SupabaseClient {
    SupabaseClient::new(&supabase_config(uri)).expect("failed to create supabase client")
}

/// Webhook settings pointing at `<uri>/webhook/chat`
#[allow(dead_code)]
pub fn webhook_config(uri: &str) -> WebhookConfig {
    WebhookConfig {
        url: format!("{}/webhook/chat", uri),
        timeout_seconds: 5,
        retry: RetryPolicy::none(),
    }
}

/// Retry quickly in tests
#[allow(dead_code)]
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
    }
}
