use std::collections::HashMap;

use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use sched_core::scoring::compute_adjacency_score;
use types::Grid;

#[derive(Deserialize, ToSchema)]
pub struct ExplainIn {
    pub periodsPerDay: u32,
    pub schedule: Grid,
}

#[derive(Serialize, ToSchema)]
pub struct ExplainOut {
    pub objective: f64,
    pub counts: Counts,
}

#[derive(Serialize, ToSchema)]
pub struct Counts {
    pub pairsTotal: i64,
    pub pairsByClass: HashMap<String, i64>,
}

/// Recomputes the soft adjacency objective for an already-decoded schedule,
/// without re-solving -- useful for inspecting why a particular grid scored
/// the way it did.
#[utoipa::path(
    post,
    path = "/v1/explain",
    request_body = ExplainIn,
    responses(
        (status = 200, description = "Adjacency-objective breakdown for a provided schedule", body = ExplainOut)
    )
)]
pub async fn explain(Json(input): Json<ExplainIn>) -> Json<ExplainOut> {
    let score = compute_adjacency_score(input.periodsPerDay, &input.schedule);
    let pairs_by_class = score
        .pairs_by_class
        .into_iter()
        .map(|(class, v)| (class.to_string(), v))
        .collect();

    Json(ExplainOut {
        objective: score.pairs_total as f64,
        counts: Counts {
            pairsTotal: score.pairs_total,
            pairsByClass: pairs_by_class,
        },
    })
}
