use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use screening_core::config::AppConfig;
use screening_core::error::AppError;
use screening_core::telemetry;
use screening_core::workflows::screening::{
    screening_router, BackgroundCheck, CandidateId, CheckRequest, CheckType, CriminalOutcome,
    CriminalScope, LifecycleEngine, MemoryCheckRepository, Priority, ScreeningConfig,
    SubCheckResult, TracingPublisher, VerificationOutcome,
};

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Screening Orchestrator",
    about = "Run the background-check lifecycle service or walk a check through its lifecycle offline",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk one background check through its full lifecycle and print the result
    Simulate(SimulateArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Check tier to simulate (basic, standard, comprehensive)
    #[arg(long, default_value = "comprehensive", value_parser = parse_check_type)]
    check_type: CheckType,
    /// Scheduling priority to record on the check
    #[arg(long, default_value = "normal", value_parser = parse_priority)]
    priority: Priority,
    /// Report a records-found result for the county criminal search
    #[arg(long)]
    criminal_hit: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Simulate(args) => run_simulation(args),
    }
}

fn parse_check_type(raw: &str) -> Result<CheckType, String> {
    CheckType::parse(raw).ok_or_else(|| format!("'{raw}' is not basic, standard, or comprehensive"))
}

fn parse_priority(raw: &str) -> Result<Priority, String> {
    Priority::parse(raw).ok_or_else(|| format!("'{raw}' is not low, normal, high, or urgent"))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let engine = Arc::new(LifecycleEngine::new(
        Arc::new(MemoryCheckRepository::default()),
        Arc::new(TracingPublisher),
        ScreeningConfig {
            policy: config.screening.policy(),
            ..ScreeningConfig::default()
        },
    ));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(screening_router(engine))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "screening lifecycle service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_simulation(args: SimulateArgs) -> Result<(), AppError> {
    let engine = LifecycleEngine::new(
        Arc::new(MemoryCheckRepository::default()),
        Arc::new(TracingPublisher),
        ScreeningConfig::default(),
    );

    let check = engine.create(CheckRequest {
        candidate_id: CandidateId("cand-demo".to_string()),
        check_type: args.check_type.label().to_string(),
        priority: args.priority,
        requested_by: "simulate-cli".to_string(),
    })?;
    let id = check.id.clone();

    engine.record_consent(&id, true, chrono::Utc::now())?;
    engine.start(&id)?;

    for kind in args.check_type.required_verifications() {
        engine.record_sub_check_result(
            &id,
            SubCheckResult::Verification {
                kind: *kind,
                result: VerificationOutcome::Pass,
                verified_by: "Simulated Provider".to_string(),
            },
        )?;
    }
    for scope in args.check_type.required_criminal_scopes() {
        let result = if args.criminal_hit && *scope == CriminalScope::County {
            CriminalOutcome::RecordsFound
        } else {
            CriminalOutcome::Clear
        };
        match engine.record_sub_check_result(&id, SubCheckResult::Criminal {
            scope: *scope,
            result,
        }) {
            Ok(_) => {}
            // a criminal hit fails the check; later results are rejected
            Err(screening_core::workflows::screening::ScreeningError::InvalidTransition {
                ..
            }) => break,
            Err(err) => return Err(err.into()),
        }
    }
    if args.check_type.includes_credit() {
        let current = engine.get(&id)?;
        if !current.is_terminal() {
            engine.record_sub_check_result(&id, SubCheckResult::Credit { score: 712 })?;
        }
    }

    render_check(&engine.get(&id)?);
    Ok(())
}

fn render_check(check: &BackgroundCheck) {
    println!("background check {}", check.id.0);
    println!("  candidate:  {}", check.candidate_id.0);
    println!("  tier:       {}", check.check_type.label());
    println!("  priority:   {}", check.priority.label());
    println!("  status:     {}", check.status.label());
    println!("  progress:   {}%", check.progress);
    for verification in &check.verification_results {
        println!(
            "  verification/{}: {:?} ({:?})",
            verification.kind.label(),
            verification.status,
            verification.result
        );
    }
    for criminal in &check.criminal_checks {
        println!(
            "  criminal/{} [{}]: {:?} ({:?})",
            criminal.scope.label(),
            criminal.jurisdiction,
            criminal.status,
            criminal.result
        );
    }
    if let Some(credit) = &check.credit_check {
        println!(
            "  credit: {:?} (score {:?}, rating {:?})",
            credit.status, credit.credit_score, credit.credit_rating
        );
    }
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    if state.readiness.load(Ordering::Acquire) {
        (StatusCode::OK, Json(json!({ "status": "ready" }))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "starting" })),
        )
            .into_response()
    }
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
