//! `tabularium-diag` -- checks that a Tabularium backend is reachable and
//! that the library CRUD cycle works end to end.
//!
//! ```text
//! tabularium-diag [--json] [--debug] [BASE_URL]
//! ```
//!
//! `BASE_URL` overrides the configured base for this run. Exits with status 1
//! when any check fails.
//!
//! # Environment variables
//!
//! | Variable                    | Required | Default | Description                          |
//! |-----------------------------|----------|---------|--------------------------------------|
//! | `TABULARIUM_API_URL`        | no       | --      | Backend base URL                     |
//! | `TABULARIUM_DEPLOY_HOST`    | no       | --      | Host used for production detection   |
//! | `TABULARIUM_API_DEBUG`      | no       | `false` | Log every attempt                    |
//! | `TABULARIUM_API_TIMEOUT_MS` | no       | --      | Per-attempt timeout                  |
//! | `TABULARIUM_API_RETRIES`    | no       | `1`     | Transport retries                    |
//! | `TABULARIUM_UPSERT_METHOD`  | no       | `POST`  | First verb for the AKIN upsert       |
//! | `RUST_LOG`                  | no       | --      | Log filter                           |

use anyhow::{bail, Context};
use tabularium_client::diagnostics::{self, CheckStatus, DiagnosticReport};
use tabularium_client::{ApiClient, ClientConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct Args {
    json: bool,
    debug: bool,
    base_url: Option<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        json: false,
        debug: false,
        base_url: None,
    };

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => args.json = true,
            "--debug" => args.debug = true,
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            url if args.base_url.is_none() => args.base_url = Some(url.to_string()),
            extra => bail!("unexpected argument {extra}"),
        }
    }

    Ok(args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabularium_client=info,tabularium_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args().context("usage: tabularium-diag [--json] [--debug] [BASE_URL]")?;
    let config = ClientConfig::from_env().context("Failed to load client configuration")?;
    let api = ApiClient::new(config);

    if let Some(url) = args.base_url {
        api.core().set_base_url(url).await;
    }
    if args.debug {
        api.core().set_debug(true).await;
    }

    let base_url = api.core().base_url().await;
    tracing::info!(
        %base_url,
        json = args.json,
        "Starting tabularium-diag",
    );

    let report = diagnostics::run_diagnostics(&api).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &DiagnosticReport) {
    println!("Diagnostics {} against {}", report.run_id, report.base_url);
    for check in &report.checks {
        let mark = match check.status {
            CheckStatus::Success => "ok  ",
            CheckStatus::Failure => "FAIL",
        };
        println!("  [{mark}] {:<22} {}", check.name, check.detail);
    }
}
