use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::{Arc, Mutex};

use soa_core::result_store::{ResultStore, RunId, RunResult};
use soa_core::{run_sweep, Engine, EngineConfig, SoaError};

use crate::schema::{
    CalibrationResponse, ErrorBody, ErrorResponse, EvaluateRequest, RunResponse,
    SolveInputPowerRequest, SolveInputPowerResponse, SweepRequest,
};

pub struct HttpServerConfig {
    pub bind_addr: String,
    pub engine: EngineConfig,
}

#[derive(Clone)]
pub(crate) struct ApiState {
    engine: Arc<Engine>,
    store: Arc<Mutex<ResultStore>>,
}

impl ApiState {
    pub(crate) fn new(engine: Engine) -> Self {
        ApiState {
            engine: Arc::new(engine),
            store: Arc::new(Mutex::new(ResultStore::new())),
        }
    }
}

pub async fn run(config: HttpServerConfig) -> Result<(), String> {
    let engine = Engine::new(config.engine).map_err(|err| err.to_string())?;
    let app = build_router(ApiState::new(engine));
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|err| format!("bind {} failed: {}", config.bind_addr, err))?;
    log::info!("http: listening on {}", config.bind_addr);
    axum::serve(listener, app)
        .await
        .map_err(|err| format!("server error: {}", err))
}

pub(crate) fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/v1/evaluate", post(evaluate))
        .route("/v1/solve/input-power", post(solve_input_power))
        .route("/v1/sweep", post(sweep))
        .route("/v1/runs/{id}", get(get_run))
        .route("/v1/calibration", get(calibration))
        .with_state(state)
}

async fn evaluate(
    State(state): State<ApiState>,
    Json(payload): Json<EvaluateRequest>,
) -> axum::response::Response {
    match state
        .engine
        .evaluate(&payload.geometry, &payload.operating_point)
    {
        Ok(report) => Json(report).into_response(),
        Err(err) => invalid_input(err),
    }
}

async fn solve_input_power(
    State(state): State<ApiState>,
    Json(payload): Json<SolveInputPowerRequest>,
) -> axum::response::Response {
    let solved = state.engine.solve_input_power_for_target_output(
        &payload.geometry,
        payload.target_output_power,
        payload.drive_current_ma,
        payload.wavelength_nm,
        payload.temperature_c,
    );
    match solved {
        Ok(solved) => Json(SolveInputPowerResponse {
            target_output_power: payload.target_output_power,
            outcome: solved.outcome,
            advisories: solved.advisories,
        })
        .into_response(),
        Err(err) => invalid_input(err),
    }
}

async fn sweep(
    State(state): State<ApiState>,
    Json(payload): Json<SweepRequest>,
) -> axum::response::Response {
    let engine = Arc::clone(&state.engine);
    let spec = payload.sweep.clone();
    let points = tokio::task::spawn_blocking(move || {
        run_sweep(&engine, &payload.geometry, &payload.operating_point, &payload.sweep)
    })
    .await;
    let points = match points {
        Ok(Ok(points)) => points,
        Ok(Err(err)) => return invalid_input(err),
        Err(err) => {
            log::error!("http: sweep task failed: {}", err);
            return api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "SWEEP_FAILED",
                "sweep task did not complete",
                None,
            );
        }
    };

    let mut store = match state.store.lock() {
        Ok(guard) => guard,
        Err(_) => return store_unavailable(),
    };
    let run_id = store.add_run(RunResult::new(spec, points));
    let run = match store.get(run_id).cloned() {
        Some(run) => run,
        None => {
            return api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "RUN_NOT_FOUND",
                "run result not found",
                None,
            );
        }
    };
    Json(run_to_response(run_id, run)).into_response()
}

async fn get_run(State(state): State<ApiState>, Path(id): Path<usize>) -> axum::response::Response {
    let store = match state.store.lock() {
        Ok(guard) => guard,
        Err(_) => return store_unavailable(),
    };
    let run = match store.get(RunId(id)).cloned() {
        Some(run) => run,
        None => {
            return api_error(
                StatusCode::NOT_FOUND,
                "RUN_NOT_FOUND",
                "run_id not found",
                None,
            );
        }
    };
    Json(run_to_response(RunId(id), run)).into_response()
}

async fn calibration(State(state): State<ApiState>) -> axum::response::Response {
    Json(CalibrationResponse::new(state.engine.coefficients().clone())).into_response()
}

fn run_to_response(run_id: RunId, run: RunResult) -> RunResponse {
    RunResponse {
        run_id: run_id.0,
        run,
    }
}

fn invalid_input(err: SoaError) -> axum::response::Response {
    let code = match err {
        SoaError::InvalidSweep(_) => "INVALID_SWEEP",
        _ => "INVALID_INPUT",
    };
    api_error(StatusCode::BAD_REQUEST, code, &err.to_string(), None)
}

fn store_unavailable() -> axum::response::Response {
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "STORE_ERROR",
        "result store is unavailable",
        None,
    )
}

fn api_error(
    status: StatusCode,
    code: &str,
    message: &str,
    details: Option<Vec<String>>,
) -> axum::response::Response {
    let body = ErrorResponse {
        error: ErrorBody {
            code: code.to_string(),
            message: message.to_string(),
            details,
        },
    };
    (status, Json(body)).into_response()
}
