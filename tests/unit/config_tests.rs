use std::io::Write;
use std::net::{IpAddr, Ipv4Addr};

use job_relay::config::{GlobalConfig, TransportPreference, MAX_SEARCH_RESULTS};
use job_relay::AppError;

fn sample_toml() -> &'static str {
    r#"
[server]
host = "0.0.0.0"
http_port = 8080
keep_alive_seconds = 5

[client]
server_url = "http://relay.internal:8080"
transport = "byte-stream"
connect_timeout_seconds = 3

[tools]
search_base_url = "http://search.test/res/v1/web/search"
search_max_results = 5
scrape_base_url = "http://scrape.test/v1/scrape"
request_timeout_seconds = 12
"#
}

#[test]
fn parses_full_config() {
    let config = GlobalConfig::from_toml_str(sample_toml()).expect("config parses");

    assert_eq!(config.server.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    assert_eq!(config.server.http_port, 8080);
    assert_eq!(config.server.keep_alive_seconds, 5);
    assert_eq!(config.server.bind_addr().to_string(), "0.0.0.0:8080");
    assert_eq!(config.client.server_url, "http://relay.internal:8080");
    assert_eq!(config.client.transport, TransportPreference::ByteStream);
    assert_eq!(config.client.connect_timeout_seconds, 3);
    assert_eq!(config.tools.search_max_results, 5);
    assert_eq!(config.tools.request_timeout_seconds, 12);
}

#[test]
fn empty_file_yields_defaults() {
    let config = GlobalConfig::from_toml_str("").expect("empty config parses");

    assert_eq!(config, GlobalConfig::default());
    assert_eq!(config.server.http_port, 3000);
    assert_eq!(config.server.keep_alive_seconds, 15);
    assert_eq!(config.client.server_url, "http://localhost:3000");
    assert_eq!(config.client.transport, TransportPreference::Auto);
    assert_eq!(config.tools.search_max_results, 10);
}

#[test]
fn partial_section_keeps_other_defaults() {
    let config = GlobalConfig::from_toml_str("[server]\nhttp_port = 4000\n").expect("parses");
    assert_eq!(config.server.http_port, 4000);
    assert_eq!(config.server.keep_alive_seconds, 15);
}

#[test]
fn every_transport_preference_parses() {
    for (raw, expected) in [
        ("auto", TransportPreference::Auto),
        ("event-source", TransportPreference::EventSource),
        ("byte-stream", TransportPreference::ByteStream),
        ("polling", TransportPreference::Polling),
        ("buffered", TransportPreference::Buffered),
    ] {
        let toml = format!("[client]\ntransport = \"{raw}\"\n");
        let config = GlobalConfig::from_toml_str(&toml).expect("parses");
        assert_eq!(config.client.transport, expected, "{raw}");
    }
}

#[test]
fn unknown_transport_is_rejected() {
    let result = GlobalConfig::from_toml_str("[client]\ntransport = \"carrier-pigeon\"\n");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn invalid_server_url_is_rejected() {
    let result = GlobalConfig::from_toml_str("[client]\nserver_url = \"localhost\"\n");
    assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("server_url")));
}

#[test]
fn non_http_server_url_is_rejected() {
    let result = GlobalConfig::from_toml_str("[client]\nserver_url = \"ws://localhost:3000\"\n");
    assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("http")));
}

#[test]
fn search_max_results_must_be_in_range() {
    for bad in [0, MAX_SEARCH_RESULTS + 1] {
        let toml = format!("[tools]\nsearch_max_results = {bad}\n");
        let result = GlobalConfig::from_toml_str(&toml);
        assert!(
            matches!(&result, Err(AppError::Config(msg)) if msg.contains("search_max_results")),
            "{bad} must be rejected"
        );
    }
}

#[test]
fn credentials_in_file_are_ignored() {
    let toml = "[tools]\nbrave_api_key = \"from-file\"\n";
    let config = GlobalConfig::from_toml_str(toml).expect("parses");
    assert!(config.tools.brave_api_key.is_empty());
}

#[test]
fn load_from_path_reads_file() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    file.write_all(sample_toml().as_bytes()).expect("write");

    let config = GlobalConfig::load_from_path(file.path()).expect("load");
    assert_eq!(config.server.http_port, 8080);
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = GlobalConfig::load_from_path(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("failed to read config")));
}

// ── Credentials ──────────────────────────────────────────────────────────────

/// NOTE: mutates process-global env vars, so runs serially.
#[test]
#[serial_test::serial]
#[allow(unsafe_code)]
fn credentials_load_from_environment() {
    unsafe {
        std::env::set_var("BRAVE_SEARCH_API_KEY", "brave-test-key");
        std::env::set_var("FIRECRAWL_API_KEY", "fc-test-key");
    }

    let mut config = GlobalConfig::default();
    config.load_credentials();

    assert_eq!(config.tools.brave_api_key, "brave-test-key");
    assert_eq!(config.tools.firecrawl_api_key, "fc-test-key");

    unsafe {
        std::env::remove_var("BRAVE_SEARCH_API_KEY");
        std::env::remove_var("FIRECRAWL_API_KEY");
    }
}

#[test]
#[serial_test::serial]
#[allow(unsafe_code)]
fn missing_or_blank_credentials_leave_tools_disabled() {
    unsafe {
        std::env::remove_var("BRAVE_SEARCH_API_KEY");
        std::env::set_var("FIRECRAWL_API_KEY", "   ");
    }

    let mut config = GlobalConfig::default();
    config.load_credentials();

    assert!(config.tools.brave_api_key.is_empty());
    assert!(config.tools.firecrawl_api_key.is_empty());

    unsafe {
        std::env::remove_var("FIRECRAWL_API_KEY");
    }
}
