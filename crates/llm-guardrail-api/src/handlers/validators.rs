//! Validator catalog handler

use crate::models::{ValidatorCatalogResponse, ValidatorInfo};
use crate::state::AppState;
use axum::{extract::State, Json};
use llm_guardrail_core::Direction;

/// GET /v1/validators
pub async fn list_validators(State(state): State<AppState>) -> Json<ValidatorCatalogResponse> {
    let registry = state.engine.registry();
    let catalog = |direction: Direction| -> Vec<ValidatorInfo> {
        registry
            .descriptors(direction)
            .iter()
            .map(|d| ValidatorInfo {
                name: d.name.clone(),
                on_fail: d.on_fail,
            })
            .collect()
    };

    Json(ValidatorCatalogResponse {
        input: catalog(Direction::Input),
        output: catalog(Direction::Output),
    })
}
