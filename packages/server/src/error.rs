//! Mapping of engine errors onto HTTP responses.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::Utc;
use problem_map_analysis::AnalysisError;
use problem_map_analytics::AnalyticsError;
use problem_map_database::DbError;
use problem_map_density::DensityError;
use problem_map_districts::DistrictError;
use problem_map_ingest::IngestError;
use problem_map_server_models::ApiErrorBody;
use problem_map_spatial::CodecError;
use thiserror::Error;

/// Any failure a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Report creation or lookup failed.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Analysis generation failed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Statistics aggregation failed.
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// Density map build failed.
    #[error(transparent)]
    Density(#[from] DensityError),

    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] DbError),

    /// The request is malformed.
    #[error("{message}")]
    BadRequest {
        /// What is wrong with the request.
        message: String,
    },
}

const fn codec_status(error: &CodecError) -> StatusCode {
    match error {
        CodecError::Encoding { .. } | CodecError::Decoding { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        CodecError::NonFinite { .. } | CodecError::OutOfRange { .. } => StatusCode::BAD_REQUEST,
    }
}

const fn district_status(error: &DistrictError) -> StatusCode {
    match error {
        DistrictError::NotFound { .. } => StatusCode::NOT_FOUND,
        DistrictError::Codec(e) => codec_status(e),
        DistrictError::ResolutionFailed(_) | DistrictError::Store(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        DistrictError::Dataset(_) | DistrictError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Ingest(e) => match e {
                IngestError::Validation { .. } => StatusCode::BAD_REQUEST,
                IngestError::Coordinates(e) => codec_status(e),
                IngestError::District(e) => district_status(e),
                IngestError::ProblemNotFound { .. } | IngestError::UnknownDistrict { .. } => {
                    StatusCode::NOT_FOUND
                }
                IngestError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::Analysis(e) => match e {
                AnalysisError::UnknownScope { .. } => StatusCode::NOT_FOUND,
                AnalysisError::Unavailable { reason, .. } if reason.is_store() => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                AnalysisError::Unavailable { .. } => StatusCode::BAD_GATEWAY,
                AnalysisError::Cancelled => StatusCode::REQUEST_TIMEOUT,
                AnalysisError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::Analytics(_) | Self::Density(_) | Self::Store(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed ({status}): {self}");
        } else {
            log::debug!("Request rejected ({status}): {self}");
        }

        HttpResponse::build(status).json(ApiErrorBody {
            message: self.to_string(),
            time: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use problem_map_problem_models::Scope;
    use problem_map_spatial::GeoPoint;

    use super::*;

    #[test]
    fn taxonomy_maps_to_distinct_status_classes() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (
                IngestError::Validation {
                    message: "empty name".to_string(),
                }
                .into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                IngestError::District(DistrictError::NotFound {
                    point: GeoPoint::new(0.0, 0.0),
                })
                .into(),
                StatusCode::NOT_FOUND,
            ),
            (
                AnalysisError::UnknownScope {
                    kind: "district",
                    id: 1,
                }
                .into(),
                StatusCode::NOT_FOUND,
            ),
            (
                AnalysisError::Unavailable {
                    scope: Scope::City,
                    reason: problem_map_analysis::UnavailableReason::AttemptsExhausted {
                        attempts: 3,
                    },
                }
                .into(),
                StatusCode::BAD_GATEWAY,
            ),
            (AnalysisError::Cancelled.into(), StatusCode::REQUEST_TIMEOUT),
            (
                IngestError::Coordinates(CodecError::Encoding {
                    message: "bad".to_string(),
                })
                .into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.status_code(), status, "{error}");
        }
    }
}
