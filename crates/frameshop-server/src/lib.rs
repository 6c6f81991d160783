use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use frameshop_config::{Config, Criteria};
use frameshop_contracts::{ErrorBody, ErrorResponse, ExplainState, Frame, FrameRequest};
use frameshop_kernel::{
    explain, recommend, AttestationGateway, Criterion, EngineError, GatewayError, Gateways,
    OwnershipGateway, ProductCatalog, VerificationConfig, VerificationRegistry,
};
use tracing::{error, info, warn};

pub mod frame_html;
pub mod store;
pub mod upstream;

pub use frame_html::{FrameBuilder, FrameDocument};
pub use store::{CatalogStore, Seed};
pub use upstream::{AirstackGateway, EasGateway, HubValidator, MessageValidator};

pub async fn serve(cfg: Config) -> Result<(), String> {
    let addr: SocketAddr = cfg
        .server
        .listen_addr
        .parse()
        .map_err(|e| format!("invalid listen_addr: {e}"))?;

    let app = build_app(cfg).await?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("bind failed: {e}"))?;
    info!(%addr, "frameshop listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| format!("serve failed: {e}"))
}

#[derive(Clone)]
pub struct Collaborators {
    pub validator: Arc<dyn MessageValidator>,
    pub attestations: Arc<dyn AttestationGateway>,
    pub ownership: Arc<dyn OwnershipGateway>,
    pub catalog: Arc<dyn ProductCatalog>,
}

impl Collaborators {
    pub fn from_config(cfg: &Config) -> Result<Self, String> {
        Ok(Self {
            validator: Arc::new(HubValidator::new(&cfg.message_validation)?),
            attestations: Arc::new(EasGateway::new(&cfg.attestations)?),
            ownership: Arc::new(AirstackGateway::new(&cfg.ownership)?),
            catalog: Arc::new(CatalogStore::from_config(&cfg.store)?),
        })
    }
}

pub async fn build_app(cfg: Config) -> Result<Router, String> {
    let collaborators = Collaborators::from_config(&cfg)?;
    Ok(build_app_with(cfg, collaborators))
}

pub fn build_app_with(cfg: Config, collaborators: Collaborators) -> Router {
    let state = AppState::new(cfg, collaborators);
    Router::new()
        .route("/v1/healthz", get(healthz))
        .route("/api/frame/{id}/html", get(frame_html))
        .route("/api/frame/{id}/action", post(frame_action))
        .route("/api/frame/{id}/explain", post(frame_explain))
        .with_state(state)
}

pub fn verification_config(criteria: &Criteria) -> VerificationConfig {
    VerificationConfig {
        receipts_attester: criteria.receipts_attester.clone(),
        receipts_running_schema: criteria.receipts_running_schema.clone(),
        receipts_min_count: criteria.receipts_min_count,
        coinbase_attester: criteria.coinbase_attester.clone(),
        coinbase_country_schema: criteria.coinbase_country_schema.clone(),
        coinbase_account_schema: criteria.coinbase_account_schema.clone(),
        coinbase_one_schema: criteria.coinbase_one_schema.clone(),
    }
}

#[derive(Debug)]
enum FrameFailure {
    Malformed(String),
    Authentication,
    NotFound(String),
    Upstream(GatewayError),
    EmptyCatalog { shop: String },
}

impl FrameFailure {
    fn log(&self, request_id: &str) {
        match self {
            FrameFailure::Malformed(reason) => {
                warn!(request_id, reason = %reason, "malformed frame callback")
            }
            FrameFailure::Authentication => {
                warn!(request_id, "frame message failed validation")
            }
            FrameFailure::NotFound(id) => info!(request_id, frame_id = %id, "frame not found"),
            FrameFailure::Upstream(e) => error!(request_id, error = %e, "upstream query failed"),
            FrameFailure::EmptyCatalog { shop } => {
                error!(request_id, shop = %shop, "no products configured for shop")
            }
        }
    }
}

#[derive(Clone)]
struct AppState {
    builder: Arc<FrameBuilder>,
    registry: Arc<VerificationRegistry>,
    collaborators: Collaborators,
}

impl AppState {
    fn new(cfg: Config, collaborators: Collaborators) -> Self {
        Self {
            registry: Arc::new(VerificationRegistry::new(&verification_config(
                &cfg.criteria,
            ))),
            builder: Arc::new(FrameBuilder::new(cfg.frame)),
            collaborators,
        }
    }

    async fn load_frame(&self, raw_id: &str) -> Result<Frame, FrameFailure> {
        let frame_id =
            parse_frame_id(raw_id).ok_or_else(|| FrameFailure::NotFound(raw_id.to_string()))?;
        self.collaborators
            .catalog
            .frame(frame_id)
            .await
            .map_err(FrameFailure::Upstream)?
            .ok_or_else(|| FrameFailure::NotFound(raw_id.to_string()))
    }

    async fn process_action(
        &self,
        raw_id: &str,
        request: &FrameRequest,
        request_id: &str,
    ) -> Result<FrameDocument, FrameFailure> {
        let message = self
            .collaborators
            .validator
            .validate(request)
            .await
            .map_err(FrameFailure::Upstream)?;
        if !message.valid {
            return Err(FrameFailure::Authentication);
        }

        let frame = self.load_frame(raw_id).await?;
        let criterion = Criterion::parse(&frame.matching_criteria);
        if !criterion.is_known() {
            warn!(request_id, frame_id = frame.id, criterion = %criterion, "unknown matching criterion");
        }
        let address = message.account_address();
        let dev = message.dev_input().is_some();

        let gateways = Gateways {
            attestations: self.collaborators.attestations.as_ref(),
            ownership: self.collaborators.ownership.as_ref(),
            catalog: self.collaborators.catalog.as_ref(),
        };
        let (outcome, products) = tokio::try_join!(
            self.registry
                .verify(&criterion, &address, frame.id, gateways),
            self.collaborators.catalog.products_for_shop(&frame.shop),
        )
        .map_err(FrameFailure::Upstream)?;

        let recommendation = recommend(&criterion, &outcome, &products, &mut rand::thread_rng())
            .map_err(|e| match e {
                EngineError::EmptyCatalog => FrameFailure::EmptyCatalog {
                    shop: frame.shop.clone(),
                },
            })?;
        let explanation = explain::render(
            &self.registry,
            &criterion,
            outcome.valid,
            &address,
            &recommendation.rule,
        );

        info!(
            request_id,
            frame_id = frame.id,
            criterion = %criterion,
            valid = outcome.valid,
            fallback = recommendation.is_fallback(),
            product_id = %recommendation.product.id,
            "recommendation served"
        );
        Ok(self
            .builder
            .recommendation(&frame, &recommendation, dev.then_some(explanation)))
    }

    async fn process_explain(
        &self,
        raw_id: &str,
        request: &FrameRequest,
        request_id: &str,
    ) -> Result<FrameDocument, FrameFailure> {
        let message = self
            .collaborators
            .validator
            .validate(request)
            .await
            .map_err(FrameFailure::Upstream)?;
        if !message.valid {
            return Err(FrameFailure::Authentication);
        }
        let frame = self.load_frame(raw_id).await?;
        let raw_state = request
            .untrusted_data
            .state
            .as_deref()
            .ok_or_else(|| FrameFailure::Malformed("missing explain state".to_string()))?;
        let state: ExplainState = serde_json::from_str(raw_state)
            .map_err(|e| FrameFailure::Malformed(format!("explain state: {e}")))?;
        info!(request_id, frame_id = frame.id, "explanation served");
        Ok(self.builder.explanation(&frame, &state))
    }

    fn respond(
        &self,
        outcome: Result<FrameDocument, FrameFailure>,
        request_id: &str,
    ) -> Html<String> {
        match outcome {
            Ok(doc) => Html(doc.render()),
            Err(failure) => {
                failure.log(request_id);
                Html(self.builder.fallback().render())
            }
        }
    }
}

fn parse_frame_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

fn request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

fn error_response(status: StatusCode, code: &str, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
                details: None,
            },
        }),
    )
}

async fn frame_html(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Html<String>, (StatusCode, Json<ErrorResponse>)> {
    match state.load_frame(&raw_id).await {
        Ok(frame) => Ok(Html(state.builder.landing(&frame).render())),
        Err(FrameFailure::NotFound(_)) if parse_frame_id(&raw_id).is_none() => Err(
            error_response(StatusCode::BAD_REQUEST, "validation_error", "invalid frame id"),
        ),
        Err(FrameFailure::NotFound(_)) => Err(error_response(
            StatusCode::NOT_FOUND,
            "not_found",
            "frame not found",
        )),
        Err(other) => {
            other.log(&request_id());
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "failed to load frame",
            ))
        }
    }
}

fn read_request(
    payload: Result<Json<FrameRequest>, JsonRejection>,
) -> Result<FrameRequest, FrameFailure> {
    payload
        .map(|Json(request)| request)
        .map_err(|rejection| FrameFailure::Malformed(rejection.body_text()))
}

async fn frame_action(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<FrameRequest>, JsonRejection>,
) -> Html<String> {
    let request_id = request_id();
    let outcome = match read_request(payload) {
        Ok(request) => state.process_action(&raw_id, &request, &request_id).await,
        Err(failure) => Err(failure),
    };
    state.respond(outcome, &request_id)
}

async fn frame_explain(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<FrameRequest>, JsonRejection>,
) -> Html<String> {
    let request_id = request_id();
    let outcome = match read_request(payload) {
        Ok(request) => state.process_explain(&raw_id, &request, &request_id).await,
        Err(failure) => Err(failure),
    };
    state.respond(outcome, &request_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_ids_must_be_integers() {
        assert_eq!(parse_frame_id("42"), Some(42));
        assert_eq!(parse_frame_id(" 7 "), Some(7));
        assert_eq!(parse_frame_id("abc"), None);
        assert_eq!(parse_frame_id(""), None);
    }
}
