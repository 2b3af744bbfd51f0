//! HTTP/JSON API server implementation.
//!
//! The REST surface consumed by the platform frontend: affiliation
//! validation, strategy recommendation, and the position-size calculator.

use std::sync::Arc;
use std::sync::OnceLock;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::allocation::{CopyStrategy, InvestorProfile, StrategyAllocation, StrategyAllocator};
use crate::calculators;
use crate::error::GatewayError;
use crate::partner::{AffiliationPort, normalize_email};

/// Affiliation policy toggles, resolved from configuration at startup.
#[derive(Debug, Clone)]
pub struct AffiliationPolicy {
    /// Whether affiliation checks actually call the partner API.
    pub use_partner_api: bool,
    /// Whether demo emails bypass the affiliation check.
    pub demo_bypass: bool,
}

/// Shared state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Affiliation lookup port (stubbed in handler tests).
    pub affiliation: Arc<dyn AffiliationPort>,
    /// Strategy allocator.
    pub allocator: StrategyAllocator,
    /// Affiliation policy toggles.
    pub policy: AffiliationPolicy,
    /// Service version reported by the health endpoint.
    pub version: String,
}

/// Create the Axum router with all endpoints.
#[must_use]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/validate-affiliation", post(validate_affiliation))
        .route("/v1/recommend-strategies", post(recommend_strategies))
        .route("/v1/position-size", post(position_size))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: state.version,
    })
}

/// Health response body.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: String,
}

/// Emails that bypass the affiliation check in demo mode.
#[allow(clippy::expect_used)] // Pattern is a compile-time constant.
fn is_demo_email(email: &str) -> bool {
    static DEMO_EMAIL: OnceLock<regex::Regex> = OnceLock::new();
    let re = DEMO_EMAIL.get_or_init(|| {
        regex::Regex::new("(?i)demo|exness").expect("demo email pattern is valid")
    });
    re.is_match(email)
}

/// Request to validate broker affiliation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateAffiliationRequest {
    /// Email address to check.
    pub email: String,
}

/// Response from affiliation validation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateAffiliationResponse {
    /// Whether the email is affiliated with the partner ID.
    pub affiliation: bool,
    /// Trading account identifiers linked to the email.
    pub accounts: Vec<String>,
    /// Broker-side client identifier.
    pub client_uid: Option<String>,
    /// Where the answer came from: `partner_api`, `demo`, or `bypass`.
    pub source: String,
}

/// Validate affiliation endpoint.
async fn validate_affiliation(
    State(state): State<AppState>,
    Json(req): Json<ValidateAffiliationRequest>,
) -> Result<Json<ValidateAffiliationResponse>, ApiError> {
    let correlation_id = Uuid::new_v4();

    let email = normalize_email(&req.email)
        .map_err(|e| ApiError::with_correlation(e.into(), correlation_id))?;

    if state.policy.demo_bypass && is_demo_email(&email) {
        tracing::info!(%correlation_id, "Demo email accepted without upstream check");
        return Ok(Json(ValidateAffiliationResponse {
            affiliation: true,
            accounts: Vec::new(),
            client_uid: None,
            source: "demo".to_string(),
        }));
    }

    if !state.policy.use_partner_api {
        tracing::info!(%correlation_id, "Partner API disabled, accepting affiliation");
        return Ok(Json(ValidateAffiliationResponse {
            affiliation: true,
            accounts: Vec::new(),
            client_uid: None,
            source: "bypass".to_string(),
        }));
    }

    tracing::info!(%correlation_id, email = %email, "Checking affiliation");

    let result = state.affiliation.check_affiliation(&email).await.map_err(|e| {
        tracing::warn!(%correlation_id, error = %e, "Affiliation check failed");
        ApiError::with_correlation(e.into(), correlation_id)
    })?;

    if !result.is_affiliated {
        tracing::info!(%correlation_id, email = %email, "Email not affiliated");
        return Err(ApiError::with_correlation(
            GatewayError::not_affiliated(&email),
            correlation_id,
        ));
    }

    tracing::info!(
        %correlation_id,
        accounts = result.accounts.len(),
        "Email affiliated"
    );

    Ok(Json(ValidateAffiliationResponse {
        affiliation: true,
        accounts: result.accounts,
        client_uid: result.client_uid,
        source: "partner_api".to_string(),
    }))
}

/// Request for strategy recommendations.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendStrategiesRequest {
    /// Investor profile from the onboarding wizard.
    pub profile: InvestorProfile,
    /// Published strategies to allocate across.
    pub strategies: Vec<CopyStrategy>,
}

/// Response with recommended allocations.
#[derive(Debug, Serialize)]
pub struct RecommendStrategiesResponse {
    /// Recommended allocations; empty when nothing is compatible.
    pub allocations: Vec<StrategyAllocation>,
}

/// Recommend strategies endpoint.
///
/// Zero compatible strategies is a valid answer, not an error; the frontend
/// shows a "no match" message.
async fn recommend_strategies(
    State(state): State<AppState>,
    Json(req): Json<RecommendStrategiesRequest>,
) -> Json<RecommendStrategiesResponse> {
    let allocations = state.allocator.recommend(&req.profile, &req.strategies);

    tracing::info!(
        risk_tolerance = req.profile.risk_tolerance,
        candidates = req.strategies.len(),
        allocations = allocations.len(),
        "Strategy recommendation computed"
    );

    Json(RecommendStrategiesResponse { allocations })
}

/// Request for the position-size calculator.
#[derive(Debug, Serialize, Deserialize)]
pub struct PositionSizeRequest {
    /// Account balance.
    pub balance: Decimal,
    /// Risk per trade, percent of balance.
    pub risk_pct: Decimal,
    /// Stop-loss distance in pips.
    pub stop_loss_pips: Decimal,
    /// Monetary pip value per standard lot.
    pub pip_value_per_lot: Decimal,
    /// Contract size, required for margin output.
    #[serde(default)]
    pub contract_size: Option<Decimal>,
    /// Instrument price, required for margin output.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Account leverage, required for margin output.
    #[serde(default)]
    pub leverage: Option<Decimal>,
}

/// Response from the position-size calculator.
#[derive(Debug, Serialize, Deserialize)]
pub struct PositionSizeResponse {
    /// Capital at risk for the trade.
    pub risk_amount: Decimal,
    /// Lot size rounded down to 0.01 steps.
    pub lot_size: Decimal,
    /// Required margin, when contract size, price, and leverage were given.
    pub required_margin: Option<Decimal>,
}

/// Position-size calculator endpoint.
async fn position_size(
    Json(req): Json<PositionSizeRequest>,
) -> Result<Json<PositionSizeResponse>, ApiError> {
    let risk_amount = calculators::risk_amount(req.balance, req.risk_pct)?;
    let lot_size = calculators::lot_size(risk_amount, req.stop_loss_pips, req.pip_value_per_lot)?;

    let required_margin = match (req.contract_size, req.price, req.leverage) {
        (Some(contract_size), Some(price), Some(leverage)) => Some(calculators::required_margin(
            lot_size,
            contract_size,
            price,
            leverage,
        )?),
        _ => None,
    };

    Ok(Json(PositionSizeResponse {
        risk_amount,
        lot_size,
        required_margin,
    }))
}

/// API error type with correlation for traceability.
#[derive(Debug)]
pub struct ApiError(GatewayError);

impl ApiError {
    /// Wrap a gateway error and tag it with the request correlation id.
    #[must_use]
    pub fn with_correlation(error: GatewayError, correlation_id: Uuid) -> Self {
        Self(error.with_context("correlation_id", correlation_id.to_string()))
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self(error)
    }
}

impl From<calculators::CalculatorError> for ApiError {
    fn from(error: calculators::CalculatorError) -> Self {
        Self(error.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.code().status();
        (status, Json(self.0.to_http_response())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AllocationSettings;
    use crate::partner::{AffiliationResult, PartnerError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    /// Stub port returning a canned answer, counting upstream calls.
    struct StubAffiliation {
        response: Result<AffiliationResult, PartnerError>,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl StubAffiliation {
        fn new(response: Result<AffiliationResult, PartnerError>) -> Arc<Self> {
            Arc::new(Self {
                response,
                calls: std::sync::atomic::AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AffiliationPort for StubAffiliation {
        async fn check_affiliation(
            &self,
            _email: &str,
        ) -> Result<AffiliationResult, PartnerError> {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.response.clone()
        }
    }

    fn affiliated() -> AffiliationResult {
        AffiliationResult {
            is_affiliated: true,
            partner_id: Some("1100".to_string()),
            client_uid: Some("c-9f2".to_string()),
            accounts: vec!["10012345".to_string()],
        }
    }

    fn unaffiliated() -> AffiliationResult {
        AffiliationResult {
            is_affiliated: false,
            partner_id: None,
            client_uid: None,
            accounts: Vec::new(),
        }
    }

    fn make_state(stub: Arc<StubAffiliation>, policy: AffiliationPolicy) -> AppState {
        AppState {
            affiliation: stub,
            allocator: StrategyAllocator::with_settings(AllocationSettings::default()),
            policy,
            version: "test".to_string(),
        }
    }

    fn default_policy() -> AffiliationPolicy {
        AffiliationPolicy {
            use_partner_api: true,
            demo_bypass: false,
        }
    }

    async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> axum::response::Response {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_check_reports_version() {
        let stub = StubAffiliation::new(Ok(affiliated()));
        let app = create_router(make_state(stub, default_policy()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn affiliated_email_returns_accounts() {
        let stub = StubAffiliation::new(Ok(affiliated()));
        let app = create_router(make_state(Arc::clone(&stub), default_policy()));

        let response = post_json(
            app,
            "/v1/validate-affiliation",
            serde_json::json!({"email": "Trader@Example.com"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["affiliation"], true);
        assert_eq!(body["source"], "partner_api");
        assert_eq!(body["accounts"][0], "10012345");
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn unaffiliated_email_is_forbidden() {
        let stub = StubAffiliation::new(Ok(unaffiliated()));
        let app = create_router(make_state(stub, default_policy()));

        let response = post_json(
            app,
            "/v1/validate-affiliation",
            serde_json::json!({"email": "user@example.com"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["code"], "NOT_AFFILIATED");
    }

    #[tokio::test]
    async fn invalid_email_is_bad_request() {
        let stub = StubAffiliation::new(Ok(affiliated()));
        let app = create_router(make_state(Arc::clone(&stub), default_policy()));

        let response = post_json(
            app,
            "/v1/validate-affiliation",
            serde_json::json!({"email": "not-an-email"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn demo_email_bypasses_upstream() {
        let stub = StubAffiliation::new(Err(PartnerError::Timeout));
        let policy = AffiliationPolicy {
            use_partner_api: true,
            demo_bypass: true,
        };
        let app = create_router(make_state(Arc::clone(&stub), policy));

        let response = post_json(
            app,
            "/v1/validate-affiliation",
            serde_json::json!({"email": "student@DEMO-platform.com"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["affiliation"], true);
        assert_eq!(body["source"], "demo");
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn demo_bypass_disabled_still_calls_upstream() {
        let stub = StubAffiliation::new(Ok(affiliated()));
        let app = create_router(make_state(Arc::clone(&stub), default_policy()));

        let response = post_json(
            app,
            "/v1/validate-affiliation",
            serde_json::json!({"email": "someone@exness.com"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn disabled_partner_api_accepts_everyone() {
        let stub = StubAffiliation::new(Err(PartnerError::Timeout));
        let policy = AffiliationPolicy {
            use_partner_api: false,
            demo_bypass: false,
        };
        let app = create_router(make_state(Arc::clone(&stub), policy));

        let response = post_json(
            app,
            "/v1/validate-affiliation",
            serde_json::json!({"email": "anyone@example.com"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["source"], "bypass");
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn throttled_upstream_maps_to_429() {
        let stub = StubAffiliation::new(Err(PartnerError::Throttled {
            retry_after_secs: 2,
        }));
        let app = create_router(make_state(stub, default_policy()));

        let response = post_json(
            app,
            "/v1/validate-affiliation",
            serde_json::json!({"email": "user@example.com"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn timeout_upstream_maps_to_504() {
        let stub = StubAffiliation::new(Err(PartnerError::Timeout));
        let app = create_router(make_state(stub, default_policy()));

        let response = post_json(
            app,
            "/v1/validate-affiliation",
            serde_json::json!({"email": "user@example.com"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = body_json(response).await;
        assert_eq!(body["code"], "UPSTREAM_TIMEOUT");
        assert!(body["details"]["correlation_id"].is_string());
    }

    #[tokio::test]
    async fn recommend_strategies_returns_allocations() {
        let stub = StubAffiliation::new(Ok(affiliated()));
        let app = create_router(make_state(stub, default_policy()));

        let response = post_json(
            app,
            "/v1/recommend-strategies",
            serde_json::json!({
                "profile": {
                    "risk_tolerance": 5,
                    "total_investment": "9000",
                    "experience": "intermediate",
                    "investment_horizon": "medium"
                },
                "strategies": [
                    {"id": "c1", "name": "Steady", "risk_band": "conservative",
                     "monthly_return_pct": "1.2", "copiers": 300},
                    {"id": "m1", "name": "Balanced", "risk_band": "moderate",
                     "monthly_return_pct": "2.9", "copiers": 120}
                ]
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["allocations"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn recommend_strategies_no_match_is_ok_and_empty() {
        let stub = StubAffiliation::new(Ok(affiliated()));
        let app = create_router(make_state(stub, default_policy()));

        let response = post_json(
            app,
            "/v1/recommend-strategies",
            serde_json::json!({
                "profile": {
                    "risk_tolerance": 2,
                    "total_investment": "9000",
                    "experience": "beginner",
                    "investment_horizon": "long"
                },
                "strategies": [
                    {"id": "a1", "name": "Yolo", "risk_band": "aggressive",
                     "monthly_return_pct": "8.0", "copiers": 40}
                ]
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["allocations"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn position_size_anchor_case() {
        let stub = StubAffiliation::new(Ok(affiliated()));
        let app = create_router(make_state(stub, default_policy()));

        let response = post_json(
            app,
            "/v1/position-size",
            serde_json::json!({
                "balance": "10000",
                "risk_pct": "2",
                "stop_loss_pips": "50",
                "pip_value_per_lot": "10"
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["risk_amount"], "200");
        assert_eq!(body["lot_size"], "0.4");
    }

    #[tokio::test]
    async fn position_size_rejects_zero_balance() {
        let stub = StubAffiliation::new(Ok(affiliated()));
        let app = create_router(make_state(stub, default_policy()));

        let response = post_json(
            app,
            "/v1/position-size",
            serde_json::json!({
                "balance": "0",
                "risk_pct": "2",
                "stop_loss_pips": "50",
                "pip_value_per_lot": "10"
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn demo_pattern_is_case_insensitive() {
        assert!(is_demo_email("user@demo.com"));
        assert!(is_demo_email("USER@EXNESS.COM"));
        assert!(is_demo_email("demo-account@school.org"));
        assert!(!is_demo_email("user@example.com"));
    }
}
