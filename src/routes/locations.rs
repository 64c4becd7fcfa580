//! Visitor location endpoints.
//!
//! `POST /api/location` counts a visit for the caller's visitor cookie and
//! refreshes that cookie on every response. `GET /api/locations` lists every
//! known location for the globe view.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::{debug, error};

use crate::services::identity::VisitorId;
use crate::services::visits::{self, LocationRecord, VisitError};
use crate::state::AppState;

pub const VISITOR_COOKIE: &str = "visitor_id";
const VISITOR_COOKIE_DAYS: i64 = 365;

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub lat: f64,
    pub lng: f64,
}

pub(crate) fn visitor_cookie(visitor: &VisitorId, secure: bool) -> Cookie<'static> {
    Cookie::build((VISITOR_COOKIE, visitor.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::days(VISITOR_COOKIE_DAYS))
        .build()
}

pub(crate) fn visit_error_to_status(err: &VisitError) -> (StatusCode, &'static str) {
    match err {
        VisitError::InvalidCoordinates { .. } => (StatusCode::BAD_REQUEST, "invalid coordinates"),
        VisitError::Storage(e) => {
            error!(error = %e, "api: visit storage failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

/// `POST /api/location`: record a visit, returning `{added, isFirst, visitorCount}`.
pub async fn record_location(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LocationRequest>,
) -> Response {
    let (visitor, fresh) = VisitorId::from_cookie_or_generate(jar.get(VISITOR_COOKIE).map(Cookie::value));
    if fresh {
        debug!(visitor_id = %visitor, "api: issued visitor cookie");
    }
    let jar = jar.add(visitor_cookie(&visitor, state.config.cookie_secure));

    match visits::record_visit(state.visits.as_ref(), req.lat, req.lng, &visitor).await {
        Ok(outcome) => (jar, Json(outcome)).into_response(),
        Err(e) => (jar, visit_error_to_status(&e)).into_response(),
    }
}

/// `GET /api/locations`
pub async fn list_locations(
    State(state): State<AppState>,
) -> Result<Json<Vec<LocationRecord>>, (StatusCode, &'static str)> {
    visits::list_locations(state.visits.as_ref())
        .await
        .map(Json)
        .map_err(|e| visit_error_to_status(&e))
}

#[cfg(test)]
#[path = "locations_test.rs"]
mod tests;
