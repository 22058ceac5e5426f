use crate::state::AppState;
use axum::{extract::State, Json};
use types::SolveEnvelope;
use utoipa::ToSchema;

#[derive(serde::Serialize, ToSchema)]
pub struct JobCreated {
    pub jobId: String,
    pub status: &'static str,
}

/// Enqueues a solve. The full Index Builder -> Model Builder -> solver ->
/// Decoder pipeline runs asynchronously on the `jobs` queue; this handler
/// only returns the job id.
#[utoipa::path(
    post,
    path = "/v1/solve",
    request_body = SolveEnvelope,
    responses((status = 200, description = "Job enqueued", body = JobCreated))
)]
pub async fn solve(State(state): State<AppState>, Json(env): Json<SolveEnvelope>) -> Json<JobCreated> {
    let id = state.jobs.enqueue(env);
    Json(JobCreated { jobId: id.0, status: "queued" })
}
