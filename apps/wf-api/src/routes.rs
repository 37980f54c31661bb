use axum::{
	Json, Router,
	body::Bytes,
	extract::{Request, State},
	http::{HeaderMap, StatusCode, header},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use wf_service::{
	EnqueueRequest, EnqueueResponse, Error, QueueItemView, RetryResponse, SessionFillRequest,
	SingleExampleRequest, SingleExampleResponse, TriggerResponse, WordEntry,
};

pub const HEADER_USER_ID: &str = "X-WF-User-Id";

#[derive(Debug, Deserialize)]
struct EnqueueBody {
	#[serde(default, alias = "wordId")]
	word_id: String,
	#[serde(default, alias = "wordText")]
	word_text: String,
	#[serde(default, alias = "profileId")]
	profile_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct RetryBody {
	#[serde(default, alias = "userId")]
	user_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessageBody {
	message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message, None),
			Error::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "not_found", message, None),
			Error::Conflict { message } =>
				json_error(StatusCode::CONFLICT, "conflict", message, None),
			Error::Provider { message } =>
				json_error(StatusCode::BAD_GATEWAY, "provider_error", message, None),
			Error::Generation { message } =>
				json_error(StatusCode::BAD_GATEWAY, "generation_error", message, None),
			Error::Storage { message } => {
				tracing::error!(error = %message, "Storage error while serving request.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"storage_error",
					"Internal storage error.",
					None,
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	let protected = Router::new()
		.route("/v1/queue/add", post(enqueue))
		.route("/v1/generation/session", post(fill_session))
		.route("/v1/generation/example", post(single_example))
		.route_layer(middleware::from_fn_with_state(state.clone(), require_api_token));

	Router::new().route("/health", get(health)).merge(protected).with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/queue/all", get(list_queue))
		.route("/v1/admin/queue/trigger", post(trigger))
		.route("/v1/admin/queue/retry", post(retry))
		.route_layer(middleware::from_fn_with_state(state.clone(), require_admin_token))
		.with_state(state)
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn enqueue(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<EnqueueBody>,
) -> Result<Json<MessageBody>, ApiError> {
	let user_id = required_user_id(&headers)?;
	let EnqueueResponse { message, .. } = state
		.service
		.enqueue(EnqueueRequest {
			user_id,
			profile_id: payload.profile_id,
			word_id: payload.word_id,
			word_text: payload.word_text,
		})
		.await?;

	Ok(Json(MessageBody { message }))
}

async fn fill_session(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<SessionFillRequest>,
) -> Result<Json<Vec<WordEntry>>, ApiError> {
	required_user_id(&headers)?;

	Ok(Json(state.service.fill_session(payload).await?))
}

async fn single_example(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<SingleExampleRequest>,
) -> Result<Json<SingleExampleResponse>, ApiError> {
	required_user_id(&headers)?;

	Ok(Json(state.service.generate_single_example(payload).await?))
}

async fn list_queue(State(state): State<AppState>) -> Result<Json<Vec<QueueItemView>>, ApiError> {
	Ok(Json(state.service.list_queue().await?))
}

async fn trigger(State(state): State<AppState>) -> Result<Json<TriggerResponse>, ApiError> {
	Ok(Json(state.service.trigger_pass().await?))
}

async fn retry(
	State(state): State<AppState>,
	body: Bytes,
) -> Result<Json<RetryResponse>, ApiError> {
	let payload: RetryBody = if body.iter().all(u8::is_ascii_whitespace) {
		RetryBody::default()
	} else {
		serde_json::from_slice(&body).map_err(|err| {
			json_error(
				StatusCode::BAD_REQUEST,
				"invalid_request",
				format!("Invalid retry body: {err}"),
				None,
			)
		})?
	};

	Ok(Json(state.service.retry_failed_items(payload.user_id.as_deref()).await?))
}

async fn require_api_token(
	State(state): State<AppState>,
	req: Request,
	next: Next,
) -> Result<Response, ApiError> {
	authorize(req.headers(), state.api_token())?;

	Ok(next.run(req).await)
}

async fn require_admin_token(
	State(state): State<AppState>,
	req: Request,
	next: Next,
) -> Result<Response, ApiError> {
	authorize(req.headers(), state.admin_token())?;

	Ok(next.run(req).await)
}

/// No configured token means the route is open.
fn authorize(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
	let Some(expected) = expected else {
		return Ok(());
	};

	if read_bearer_token(headers).is_some_and(|token| token == expected) {
		return Ok(());
	}

	Err(json_error(
		StatusCode::UNAUTHORIZED,
		"unauthorized",
		"A valid Bearer token is required.",
		None,
	))
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

fn required_user_id(headers: &HeaderMap) -> Result<String, ApiError> {
	headers
		.get(HEADER_USER_ID)
		.and_then(|value| value.to_str().ok())
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.map(str::to_string)
		.ok_or_else(|| {
			json_error(
				StatusCode::UNAUTHORIZED,
				"unauthorized",
				format!("{HEADER_USER_ID} header is required."),
				Some(vec![HEADER_USER_ID.to_string()]),
			)
		})
}
