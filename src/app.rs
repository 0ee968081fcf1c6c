use crate::app_state::SharedAppState;
use crate::error::DecimatorError;
use crate::metrics;
use crate::models;
use crate::pipeline;
use crate::validated_query::ValidatedQuery;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

impl IntoResponse for models::Response {
    fn into_response(self) -> Response {
        (
            [(&header::CONTENT_TYPE, self.format.mime().to_string())],
            self.body,
        )
            .into_response()
    }
}

pub fn router(state: SharedAppState) -> Router {
    fn v1() -> Router<SharedAppState> {
        Router::new().route("/data", get(data))
    }

    Router::new()
        .nest("/v1", v1())
        .route("/healthz", get(health))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .on_request(metrics::request_counter)
                    .on_response(metrics::record_response_metrics),
            ),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn data(
    State(state): State<SharedAppState>,
    ValidatedQuery(request): ValidatedQuery<models::DataRequest>,
) -> Result<models::Response, DecimatorError> {
    pipeline::produce(&state, &request).await
}
