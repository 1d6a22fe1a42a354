//! Mock metrics endpoint
//!
//! Serves a fixed inflation envelope at `/api/v1/inflation/data` so the
//! dashboard can run without the real backend.
//!
//! Fault injection:
//! - `--rate-limit-every N` answers every Nth request with HTTP 429
//! - `--fail-status` answers with a well-formed but unsuccessful envelope
//! - `--delay-ms` holds each response back
//!
//! Usage:
//!   cargo run --bin mock-metrics -- --port 5001 --rate-limit-every 3

use bytes::Bytes;
use clap::Parser;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use inflation_dashboard::domain::MetricKind;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DATA_PATH: &str = "/api/v1/inflation/data";
const AS_OF: &str = "2024-06-01";

#[derive(Parser, Debug, Clone)]
#[command(name = "mock-metrics")]
#[command(about = "Mock inflation metrics endpoint for local runs")]
struct Args {
    /// HTTP port to listen on
    #[arg(short, long, default_value = "5001")]
    port: u16,

    /// Answer every Nth request with 429 (0 disables)
    #[arg(long, default_value = "0")]
    rate_limit_every: u64,

    /// Answer with an unsuccessful status envelope
    #[arg(long)]
    fail_status: bool,

    /// Delay before each response (ms)
    #[arg(long, default_value = "0")]
    delay_ms: u64,
}

struct MockState {
    args: Args,
    requests: AtomicU64,
    body: Bytes,
}

/// (current, baseline, units, history) per indicator
fn fixture_values(kind: MetricKind) -> (f64, f64, &'static str, [f64; 6]) {
    match kind {
        MetricKind::Cpi => (
            313.049,
            303.365,
            "Index 1982-1984=100",
            [309.7, 310.3, 311.0, 312.2, 313.2, 313.0],
        ),
        MetricKind::CoreCpi => (
            318.140,
            307.653,
            "Index 1982-1984=100",
            [314.4, 315.6, 316.7, 317.6, 318.1, 318.1],
        ),
        MetricKind::Food => (
            333.810,
            329.101,
            "Index 1982-1984=100",
            [331.5, 332.0, 332.3, 332.9, 333.4, 333.8],
        ),
        MetricKind::Gas => (
            3.449,
            3.622,
            "Dollars per Gallon",
            [3.09, 3.27, 3.52, 3.61, 3.58, 3.45],
        ),
        MetricKind::Housing => (
            325.978,
            309.012,
            "Index Jan 2000=100",
            [318.2, 320.4, 322.1, 323.9, 325.2, 326.0],
        ),
    }
}

fn fixture_envelope() -> Value {
    let months = ["2024-01-01", "2024-02-01", "2024-03-01", "2024-04-01", "2024-05-01", AS_OF];
    let mut metrics = serde_json::Map::new();

    for kind in MetricKind::ALL {
        let (current, baseline, units, history) = fixture_values(kind);
        let change = (current - baseline) / baseline * 100.0;
        let historical: Vec<Value> = months
            .iter()
            .zip(history)
            .map(|(date, value)| json!({ "date": date, "value": value }))
            .collect();

        metrics.insert(
            kind.key().to_string(),
            json!({
                "title": kind.default_title(),
                "current_value": current,
                "baseline_value": baseline,
                "percentage_change": (change * 100.0).round() / 100.0,
                "historical_data": historical,
                "units": units,
                "last_updated": AS_OF,
                "series_id": kind.series_id(),
            }),
        );
    }

    json!({
        "status": "Success",
        "metrics": metrics,
        "analysis": "Price growth continues to cool from its 2022 peak.",
        "last_updated": AS_OF,
    })
}

fn json_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(body))
        .expect("static response should not fail")
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<MockState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, DATA_PATH) => {
            let n = state.requests.fetch_add(1, Ordering::Relaxed) + 1;

            if state.args.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(state.args.delay_ms)).await;
            }

            let every = state.args.rate_limit_every;
            if every > 0 && n % every == 0 {
                warn!(request = %n, "mock_rate_limited");
                return Ok(json_response(
                    StatusCode::TOO_MANY_REQUESTS,
                    Bytes::from(r#"{"status":"Error","message":"rate limited"}"#),
                ));
            }

            if state.args.fail_status {
                warn!(request = %n, "mock_fail_status");
                return Ok(json_response(
                    StatusCode::OK,
                    Bytes::from(r#"{"status":"Error","message":"upstream unavailable"}"#),
                ));
            }

            info!(request = %n, "mock_served");
            Ok(json_response(StatusCode::OK, state.body.clone()))
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found")))
            .expect("static response should not fail")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr).await?;

    info!(
        port = %args.port,
        path = %DATA_PATH,
        rate_limit_every = %args.rate_limit_every,
        fail_status = %args.fail_status,
        delay_ms = %args.delay_ms,
        "mock_metrics_started"
    );

    let body = Bytes::from(serde_json::to_vec(&fixture_envelope())?);
    let state = Arc::new(MockState { args, requests: AtomicU64::new(0), body });

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| handle_request(req, state.clone()));
                            if let Err(e) =
                                http1::Builder::new().serve_connection(io, service).await
                            {
                                error!(error = %e, "mock_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "mock_accept_error");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("mock_metrics_shutdown");
                return Ok(());
            }
        }
    }
}
