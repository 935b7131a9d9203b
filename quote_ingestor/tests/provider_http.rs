use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use quote_ingestor::{
    models::request_params::OutputSize,
    providers::{
        ProviderError, QuoteProvider,
        alpha_vantage::{AlphaVantageConfig, AlphaVantageProvider},
        retry::RetryPolicy,
    },
};
use secrecy::SecretString;
use serde_json::json;
use shared_utils::event_log::{LogLevel, MemoryLog};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

/// Minimal HTTP server answering each connection with the next scripted
/// response; the last one repeats once the script runs out.
struct Stub {
    url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl Stub {
    async fn start(script: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        tokio::spawn(async move {
            let mut served = 0usize;
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&chunk[..n]),
                    }
                }
                let request_line = String::from_utf8_lossy(&head)
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                seen.lock().unwrap().push(request_line);

                let (status, body) = &script[served.min(script.len() - 1)];
                served += 1;
                let reason = match *status {
                    200 => "OK",
                    503 => "Service Unavailable",
                    _ => "Error",
                };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            url: format!("http://{addr}/query"),
            requests,
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn provider(url: &str, retries: u32) -> (AlphaVantageProvider, Arc<MemoryLog>) {
    let log = Arc::new(MemoryLog::new());
    let config = AlphaVantageConfig {
        base_url: url.to_string(),
        timeout: Duration::from_secs(5),
        retry: RetryPolicy::immediate(retries),
        ..AlphaVantageConfig::new(SecretString::from("demo-key"))
    };
    (AlphaVantageProvider::new(config, log.clone()).unwrap(), log)
}

/// Kept as literal text: the provider reads days in document order.
const DAILY_BODY: &str = r#"{
    "Meta Data": {
        "1. Information": "Daily Prices (open, high, low, close) and Volumes",
        "2. Symbol": "NVDA",
        "3. Last Refreshed": "2024-01-05",
        "4. Output Size": "Compact",
        "5. Time Zone": "US/Eastern"
    },
    "Time Series (Daily)": {
        "2024-01-05": {
            "1. open": "484.62",
            "2. high": "495.00",
            "3. low": "483.00",
            "4. close": "490.97",
            "5. volume": "41456781"
        },
        "2024-01-04": {
            "1. open": "477.67",
            "2. high": "485.00",
            "3. low": "475.08",
            "4. close": "479.98",
            "5. volume": "43855000"
        }
    }
}"#;

#[tokio::test]
async fn fetches_and_flattens_daily_series() {
    let stub = Stub::start(vec![(200, DAILY_BODY.to_string())]).await;
    let (provider, log) = provider(&stub.url, 3);

    let raw = provider.fetch_daily("NVDA", OutputSize::Compact).await.unwrap();

    assert_eq!(raw.symbol, "NVDA");
    assert_eq!(raw.last_refreshed.as_deref(), Some("2024-01-05"));
    assert_eq!(raw.rows.len(), 2);
    assert_eq!(raw.rows[0].date, "2024-01-05");
    assert_eq!(raw.rows[0].high.as_deref(), Some("495.00"));
    assert_eq!(raw.rows[1].volume.as_deref(), Some("43855000"));

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    for part in [
        "GET /query?",
        "function=TIME_SERIES_DAILY",
        "symbol=NVDA",
        "apikey=demo-key",
        "outputsize=compact",
    ] {
        assert!(requests[0].contains(part), "{part} missing from {}", requests[0]);
    }
    assert!(log.contains(LogLevel::Info, "fetched 2 rows for NVDA"));
}

#[tokio::test]
async fn missing_field_in_sample_row_is_a_schema_change_without_retry() {
    let body = json!({
        "Meta Data": { "2. Symbol": "NVDA" },
        "Time Series (Daily)": {
            "2024-01-05": {
                "1. open": "484.62",
                "3. low": "483.00",
                "4. close": "490.97",
                "5. volume": "41456781"
            }
        }
    })
    .to_string();
    let stub = Stub::start(vec![(200, body)]).await;
    let (provider, _) = provider(&stub.url, 3);

    let err = provider
        .fetch_daily("NVDA", OutputSize::Compact)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::SchemaChanged { .. }), "{err}");
    assert!(!err.is_retryable());
    assert!(err.to_string().starts_with("API specification may have changed"));
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn rate_limit_note_surfaces_provider_message() {
    let body = json!({
        "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."
    })
    .to_string();
    let stub = Stub::start(vec![(200, body)]).await;
    let (provider, _) = provider(&stub.url, 3);

    let err = provider
        .fetch_daily("NVDA", OutputSize::Compact)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::SchemaChanged { .. }));
    assert!(err.to_string().contains("5 calls per minute"));
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn server_errors_are_retried_until_the_budget_is_spent() {
    let stub = Stub::start(vec![(503, "{}".to_string())]).await;
    let (provider, log) = provider(&stub.url, 2);

    let err = provider
        .fetch_daily("NVDA", OutputSize::Compact)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Transport { .. }), "{err}");
    assert!(err.is_retryable());
    assert_eq!(stub.requests().len(), 3);
    assert_eq!(log.messages(LogLevel::Warn).len(), 3);
    assert!(log.contains(LogLevel::Error, "all 3 attempts failed"));
}

#[tokio::test]
async fn transient_failure_then_success() {
    let stub = Stub::start(vec![(503, "{}".to_string()), (200, DAILY_BODY.to_string())]).await;
    let (provider, log) = provider(&stub.url, 3);

    let raw = provider.fetch_daily("NVDA", OutputSize::Full).await.unwrap();

    assert_eq!(raw.rows.len(), 2);
    let requests = stub.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].contains("outputsize=full"));
    assert_eq!(log.messages(LogLevel::Warn).len(), 1);
}

#[tokio::test]
async fn connection_errors_never_leak_the_api_key() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/query", listener.local_addr().unwrap());
    drop(listener);
    let (provider, log) = provider(&url, 1);

    let err = provider
        .fetch_daily("NVDA", OutputSize::Compact)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Transport { .. }), "{err}");
    assert!(!err.to_string().contains("demo-key"));
    for (_, message) in log.entries() {
        assert!(!message.contains("demo-key"), "{message}");
    }
}
