//! HTTP server for the gateway API.

mod http;

pub use http::{
    AffiliationPolicy, ApiError, AppState, PositionSizeRequest, PositionSizeResponse,
    RecommendStrategiesRequest, RecommendStrategiesResponse, ValidateAffiliationRequest,
    ValidateAffiliationResponse, create_router,
};
