//! Strategy hooks that customize backend requests and classify backend rejections.
//!
//! Implementations decorate outgoing request bodies and normalize error mapping without
//! tying flows to any particular HTTP client.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, backend::BackendOperation};

/// Strategy hook that lets deployments decorate requests and classify errors.
///
/// Implementors are required to be `Send + Sync`, and the hooks only see crate-owned data
/// types so downstream crates never depend on transport-specific structures. Override only
/// what you need; `augment_request` has a default no-op implementation.
pub trait BackendStrategy: Send + Sync {
	/// Maps a non-success backend response into the broker taxonomy.
	fn classify_error(&self, ctx: &BackendErrorContext) -> BackendErrorKind;

	/// Gives deployments a chance to add fields to a JSON request body before dispatching.
	fn augment_request(&self, _operation: BackendOperation, _body: &mut Value) {}
}

/// Canonical backend error categories used by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendErrorKind {
	/// The backend rejected the provider credential; the session must be cleared.
	CredentialInvalid,
	/// Failure is temporary and may be retried.
	Transient,
}

/// Context passed to strategies when classifying backend errors.
///
/// Only primitive data is kept (status code, error type, message, body preview) so
/// strategies stay decoupled from the HTTP client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendErrorContext {
	/// Operation associated with the failing request.
	pub operation: BackendOperation,
	/// HTTP status code returned by the backend, when available.
	pub http_status: Option<u16>,
	/// Short backend error type (the `__type` field without its namespace).
	pub error_type: Option<String>,
	/// Backend-supplied message.
	pub message: Option<String>,
	/// Preview of the response body for non-JSON payloads.
	pub body_preview: Option<String>,
}
impl BackendErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a new context scoped to the provided operation.
	pub fn new(operation: BackendOperation) -> Self {
		Self { operation, http_status: None, error_type: None, message: None, body_preview: None }
	}

	/// Adds an HTTP status code (e.g., 400, 401, 500).
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the backend error type; namespaces such as `com.amazon#` are stripped.
	pub fn with_error_type(mut self, error_type: impl AsRef<str>) -> Self {
		let raw = error_type.as_ref();
		let short = raw.rsplit_once('#').map_or(raw, |(_, name)| name);

		self.error_type = Some(short.to_owned());

		self
	}

	/// Adds the backend-supplied message.
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());

		self
	}

	/// Adds a body preview for responses that are not structured errors.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}

	/// Human-readable reason built from the most specific field available.
	pub fn reason(&self) -> String {
		match (&self.error_type, &self.message) {
			(Some(kind), Some(message)) => format!("{kind}: {message}"),
			(None, Some(message)) => message.clone(),
			(Some(kind), None) => kind.clone(),
			(None, None) => match (&self.body_preview, self.http_status) {
				(Some(body), _) if !body.trim().is_empty() => body.clone(),
				(_, Some(status)) => format!("HTTP {status}"),
				_ => "unknown backend failure".into(),
			},
		}
	}
}

/// Default strategy for the federated-identity backend.
///
/// It prioritizes the structured error type, then falls back to message hints, and finally
/// the HTTP status code.
#[derive(Debug, Default)]
pub struct DefaultBackendStrategy;
impl Display for DefaultBackendStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-backend-strategy")
	}
}
impl BackendStrategy for DefaultBackendStrategy {
	fn classify_error(&self, ctx: &BackendErrorContext) -> BackendErrorKind {
		if let Some(kind) = ctx.error_type.as_deref().and_then(classify_error_type) {
			return kind;
		}
		if let Some(kind) = classify_text(ctx.message.as_deref()) {
			return kind;
		}
		if let Some(kind) = classify_text(ctx.body_preview.as_deref()) {
			return kind;
		}

		classify_status(ctx.http_status)
	}
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= BackendErrorContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = body.chars().take(BackendErrorContext::BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

fn classify_error_type(value: &str) -> Option<BackendErrorKind> {
	match value {
		"NotAuthorizedException" | "ResourceNotFoundException" =>
			Some(BackendErrorKind::CredentialInvalid),
		"TooManyRequestsException"
		| "LimitExceededException"
		| "InternalErrorException"
		| "ServiceUnavailableException"
		| "ThrottlingException" => Some(BackendErrorKind::Transient),
		_ => None,
	}
}

fn classify_text(text: Option<&str>) -> Option<BackendErrorKind> {
	let lowered = text?.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("invalid login token") || text.contains("expired") =>
			Some(BackendErrorKind::CredentialInvalid),
		text if text.contains("throttl") || text.contains("rate exceeded") =>
			Some(BackendErrorKind::Transient),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> BackendErrorKind {
	match status {
		Some(400 | 401 | 403) => BackendErrorKind::CredentialInvalid,
		_ => BackendErrorKind::Transient,
	}
}
