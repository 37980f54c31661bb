pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Generation error: {message}")]
	Generation { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<wf_storage::Error> for Error {
	fn from(err: wf_storage::Error) -> Self {
		match err {
			wf_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			wf_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			wf_storage::Error::NotFound(message) => Self::NotFound { message },
			wf_storage::Error::Conflict(message) => Self::Conflict { message },
			wf_storage::Error::Corrupt(message) => Self::Storage { message },
		}
	}
}

impl From<wf_providers::Error> for Error {
	fn from(err: wf_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
