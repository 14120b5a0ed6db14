mod assets;

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use anyhow::{Context, Result};
use axum::{
    extract::{Form, State},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::{
    engine::{EngineBuilder, EngineSettings},
    record::TickRecord,
    scenario::Scenario,
};

#[derive(Clone, Serialize)]
pub struct StateEnvelope {
    pub scenario: Option<String>,
    pub total_ticks: u64,
    pub latest: Option<TickRecord>,
    pub completed: bool,
}

#[derive(Clone)]
struct AppState {
    records: Arc<Mutex<Vec<TickRecord>>>,
    total_ticks: u64,
    scenario_name: Option<String>,
    simulation_done: Arc<AtomicBool>,
}

impl AppState {
    fn idle() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            total_ticks: 0,
            scenario_name: None,
            simulation_done: Arc::new(AtomicBool::new(true)),
        }
    }
}

pub struct WebServerConfig {
    /// Scenario simulated in the background while the server runs, if any.
    pub scenario: Option<Scenario>,
    pub ticks: u64,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct DataForm {
    pub data: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DataResponse {
    pub success: bool,
    pub data: String,
}

pub fn router() -> Router {
    router_with_state(Arc::new(AppState::idle()))
}

fn router_with_state(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/about", get(about))
        .route("/data", post(receive_data))
        .route("/api/state", get(latest_state))
        .route("/api/records", get(all_records))
        .with_state(state)
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        scenario,
        ticks,
        host,
        port,
    } = config;

    let state = match scenario {
        Some(scenario) => Arc::new(spawn_simulation(scenario, ticks)?),
        None => Arc::new(AppState::idle()),
    };

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    info!(%addr, "web front-end listening (Ctrl+C to stop)");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router_with_state(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn spawn_simulation(scenario: Scenario, ticks: u64) -> Result<AppState> {
    let mut ecosystem = scenario.build_ecosystem()?;
    let records: Arc<Mutex<Vec<TickRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let simulation_done = Arc::new(AtomicBool::new(false));

    let records_for_sim = records.clone();
    let done_for_sim = simulation_done.clone();
    let scenario_name = scenario.name.clone();
    let settings = EngineSettings {
        scenario_name: scenario_name.clone(),
    };

    let sim_handle = tokio::task::spawn_blocking(move || -> Result<()> {
        let mut engine = EngineBuilder::new(settings).build();
        engine.run_with_hook(&mut ecosystem, ticks, |record| {
            records_for_sim
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(record.clone());
        })?;
        done_for_sim.store(true, Ordering::SeqCst);
        Ok(())
    });

    let label = scenario_name.clone();
    tokio::spawn(async move {
        match sim_handle.await {
            Ok(Ok(())) => info!(scenario = %label, "simulation completed"),
            Ok(Err(err)) => error!(scenario = %label, "simulation error: {err:?}"),
            Err(err) => error!(scenario = %label, "simulation task failed: {err:?}"),
        }
    });

    Ok(AppState {
        records,
        total_ticks: ticks,
        scenario_name: Some(scenario_name),
        simulation_done,
    })
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down web front-end");
}

async fn index() -> Html<&'static str> {
    Html(assets::INDEX_HTML)
}

async fn about() -> Html<&'static str> {
    Html(assets::ABOUT_HTML)
}

/// Echoes the submitted `data` field back as JSON.
pub async fn receive_data(Form(form): Form<DataForm>) -> Json<DataResponse> {
    Json(DataResponse {
        success: true,
        data: form.data,
    })
}

async fn latest_state(State(state): State<Arc<AppState>>) -> Json<StateEnvelope> {
    let latest = state
        .records
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .last()
        .cloned();
    Json(StateEnvelope {
        scenario: state.scenario_name.clone(),
        total_ticks: state.total_ticks,
        latest,
        completed: state.simulation_done.load(Ordering::SeqCst),
    })
}

async fn all_records(State(state): State<Arc<AppState>>) -> Json<Vec<TickRecord>> {
    Json(
        state
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn data_endpoint_echoes_form_field() {
        let Json(reply) = receive_data(Form(DataForm {
            data: "hello".to_string(),
        }))
        .await;
        assert_eq!(
            reply,
            DataResponse {
                success: true,
                data: "hello".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn idle_state_reports_completed() {
        let Json(envelope) = latest_state(State(Arc::new(AppState::idle()))).await;
        assert!(envelope.completed);
        assert!(envelope.latest.is_none());
        assert!(envelope.scenario.is_none());
    }

    #[test]
    fn router_builds() {
        let _ = router();
    }
}
