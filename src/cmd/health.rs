//! `detour health`: query `/healthz` of a running instance.

use http_body_util::BodyExt;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::cli::HealthArgs;
use crate::error::DetourError;
use crate::health::HealthResponse;

pub async fn execute(args: HealthArgs) -> Result<(), DetourError> {
    let url = format!("{}/healthz", args.url.trim_end_matches('/'));
    let uri: hyper::Uri = url
        .parse()
        .map_err(|e: hyper::http::uri::InvalidUri| DetourError::UriParse {
            source: Box::new(e),
        })?;

    let connector = hyper_util::client::legacy::connect::HttpConnector::new();
    let client = Client::builder(TokioExecutor::new()).build(connector);

    let req = hyper::Request::builder()
        .uri(uri)
        .body(http_body_util::Empty::<bytes::Bytes>::new())
        .map_err(|e| DetourError::HttpRequest {
            source: Box::new(e),
        })?;

    let response = tokio::time::timeout(std::time::Duration::from_secs(10), client.request(req))
        .await
        .map_err(|_| DetourError::HttpRequest {
            source: "health check timed out after 10s".into(),
        })?
        .map_err(|e| DetourError::HttpRequest {
            source: Box::new(e),
        })?;

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| DetourError::HttpRequest {
            source: Box::new(e),
        })?
        .to_bytes();

    if !status.is_success() {
        return Err(DetourError::HealthCheckFailed(status));
    }

    if args.json {
        println!("{}", String::from_utf8_lossy(&body));
        return Ok(());
    }

    match serde_json::from_slice::<HealthResponse>(&body) {
        Ok(health) => print_summary(&args.url, &health),
        Err(e) => {
            eprintln!("Failed to parse health response: {e}");
            println!("{}", String::from_utf8_lossy(&body));
        }
    }

    Ok(())
}

fn print_summary(url: &str, health: &HealthResponse) {
    let mark = if health.status == "healthy" {
        "\u{2713}"
    } else {
        "!"
    };
    println!("{mark} detour is {} ({url})", health.status);
    println!("  build:          {} ({})", health.version, health.commit);
    println!("  uptime:         {}", format_uptime(health.uptime_seconds));
    println!("  rule source:    {}", health.rules.source);
    match (&health.rules.version, health.rules.loaded_ago_seconds) {
        (Some(version), Some(ago)) => {
            println!(
                "  rule version:   {version} (loaded {ago}s ago, {} reloads)",
                health.rules.reloads
            );
        }
        _ => println!("  rule version:   not loaded"),
    }
    println!(
        "  rules:          {} total, {} available",
        health.rules.total, health.rules.available
    );
    println!(
        "  requests:       {} claimed ({} forwarded, {} failed), {} unclaimed",
        health.stats.requests_claimed,
        health.stats.requests_forwarded,
        health.stats.requests_failed,
        health.stats.requests_unclaimed
    );
}

fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}
