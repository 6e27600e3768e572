//! Mashup handlers: the request form and job submission.

use super::GenerateForm;
use crate::api::AppState;
use crate::api::pages::{ACK_PAGE, FORM_PAGE};
use crate::error::{Field, ValidationError};
use crate::validation::{validate_web_form, web_message};
use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    http::HeaderValue,
    response::{Html, IntoResponse, Response},
};
use tracing::{debug, info};

/// Header carrying the id of the job started by `POST /generate`
pub const JOB_ID_HEADER: &str = "x-job-id";

/// GET / - Request form
pub async fn index() -> Html<&'static str> {
    Html(FORM_PAGE)
}

/// POST /generate - Validate the form and start a background job
///
/// Invalid input gets the plain-text message with status 200 and no job is created.
/// A body the form extractor cannot read counts as missing fields.
/// Valid input gets the acknowledgment page immediately; the result arrives by mail.
pub async fn generate(
    State(state): State<AppState>,
    form: Result<Form<GenerateForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(e) => {
            debug!(error = %e, "unreadable mashup form");
            let missing = ValidationError::MissingField {
                field: Field::Query,
            };
            return web_message(&missing).into_response();
        }
    };

    let request = match validate_web_form(
        form.singer.as_deref(),
        form.n.as_deref(),
        form.y.as_deref(),
        form.email.as_deref(),
    ) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "rejected mashup form");
            return web_message(&e).into_response();
        }
    };

    let handle = state.runner.spawn(request).await;
    info!(job_id = %handle.id(), "mashup job accepted");

    let mut response = Html(ACK_PAGE).into_response();
    if let Ok(value) = HeaderValue::from_str(&handle.id().to_string()) {
        response.headers_mut().insert(JOB_ID_HEADER, value);
    }
    response
}
