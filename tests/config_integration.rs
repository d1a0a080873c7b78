mod common;

use serial_test::serial;

use recruitchat::cli::Cli;
use recruitchat::config::{Config, StoreBackend};

#[test]
#[serial]
fn test_shipped_config_is_valid() {
    let config = Config::load("config/config.yaml", &Cli::default()).unwrap();

    assert_eq!(config.supabase.favorites_table, "chat_favoritos");
    assert_eq!(config.supabase.postings_table, "vagas");
    assert_eq!(config.webhook.retry.max_retries, 0);
    assert!(config.favorites.require_job_posting);
    config.validate().unwrap();
}

#[test]
#[serial]
fn test_partial_file_keeps_defaults_and_cli_wins() {
    let (_dir, path) = common::temp_config_file(
        "supabase:\n  url: https://example.supabase.co\n  api_key: key\n  recruiter_id: r1\nwebhook:\n  url: https://n8n.example.com/webhook/chat\n",
    );
    let cli = Cli {
        webhook_url: Some("https://override.example.com/hook".to_string()),
        offline: true,
        ..Cli::default()
    };

    let config = Config::load(path.to_str().unwrap(), &cli).unwrap();

    assert_eq!(config.webhook.url, "https://override.example.com/hook");
    assert_eq!(config.webhook.timeout_seconds, 120);
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(config.sync.poll_interval_seconds, 3);
    config.validate().unwrap();
}

#[test]
#[serial]
fn test_zero_poll_interval_is_rejected() {
    let (_dir, path) = common::temp_config_file("sync:\n  poll_interval_seconds: 0\nstore:\n  backend: memory\n");

    let config = Config::load(path.to_str().unwrap(), &Cli::default()).unwrap();

    assert!(config.validate().is_err());
}
