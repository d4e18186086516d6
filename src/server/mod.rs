//! HTTP boundary for the pitch simulator.
//!
//! # Endpoints
//!
//! - `GET  /health`               - Liveness probe
//! - `POST /conversation`         - Run a simulation
//! - `GET  /conversation/analyze` - Demographics and scores of the latest run
//! - `GET  /conversation/play`    - Audio of the latest run's best conversation

pub mod routes;

pub use routes::{app_router, ApiError, AppState, SPEECH_SWITCH_HEADER};
