// ABOUTME: Form-submission endpoint addressed by block id; any stored contact-form block accepts posts.
// ABOUTME: Validates posted fields against the block's declared fields and logs the submission.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Form, Path, State};
use pagewright_core::{Block, BlockContent, DocumentStore};
use pagewright_store::ActivityEntry;
use serde_json::Value;

use crate::api::parse_id;
use crate::app_state::SharedState;
use crate::error::ApiError;

const DEFAULT_SUCCESS_MESSAGE: &str = "Thanks! Your message has been sent.";

/// POST /api/sites/{site}/forms/{block_id} - Accept a urlencoded submission.
/// Field values are checked, never stored; only the fact of the submission
/// goes to the activity log. The block is looked up by id alone, so it need
/// not sit on a published page.
pub async fn submit_form(
    State(state): State<SharedState>,
    Path((site, id)): Path<(String, String)>,
    Form(values): Form<BTreeMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let block_id = parse_id(&id, "block")?;
    let site = state.site(&site).await?;

    let block = site
        .storage
        .store
        .get::<Block>(block_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("form".to_string()))?;
    let BlockContent::Form(form) = BlockContent::from_block(&block)? else {
        return Err(ApiError::NotFound("form".to_string()));
    };

    if let Err(fields) = form.validate_submission(&values) {
        tracing::debug!(block_id = %block_id, "form submission rejected: {} fields", fields.len());
        return Err(ApiError::InvalidSubmission(fields));
    }

    let known = form
        .fields
        .iter()
        .filter(|f| values.get(&f.name).is_some_and(|v| !v.trim().is_empty()))
        .count();
    site.storage.record(
        ActivityEntry::new("form_submitted", Some(block_id.to_string()))
            .with_detail(format!("{} fields", known)),
    );

    Ok(Json(serde_json::json!({
        "ok": true,
        "message": form.success_message.as_deref().unwrap_or(DEFAULT_SUCCESS_MESSAGE),
    })))
}
