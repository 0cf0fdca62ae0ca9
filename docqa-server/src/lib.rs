//! `docqa-server` exposes the document question-answering pipeline over a
//! small HTTP JSON API: `POST /upload` (multipart), `POST /chat`, and a
//! `GET /` health check.

pub mod protocol;
pub mod server;

pub use server::{AppState, ServerConfig, app_router, run_server};
