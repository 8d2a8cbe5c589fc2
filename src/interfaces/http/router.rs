//! API router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::{PaymentService, ReservationService};
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::interfaces::http::common::{ApiResponse, PageDto};
use crate::interfaces::http::middleware::{auth_middleware, AuthState};
use crate::interfaces::http::modules::{health, metrics, payments, request_id, reservations};

/// Everything the handlers need. Each handler extracts its own slice via
/// `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub reservations: Arc<ReservationService>,
    pub payments: Arc<PaymentService>,
    pub db: DatabaseConnection,
    pub jwt_config: JwtConfig,
    pub started_at: Arc<Instant>,
}

impl FromRef<AppState> for reservations::ReservationAppState {
    fn from_ref(s: &AppState) -> Self {
        Self {
            service: Arc::clone(&s.reservations),
        }
    }
}

impl FromRef<AppState> for payments::PaymentAppState {
    fn from_ref(s: &AppState) -> Self {
        Self {
            service: Arc::clone(&s.payments),
        }
    }
}

impl FromRef<AppState> for health::HealthState {
    fn from_ref(s: &AppState) -> Self {
        Self {
            db: s.db.clone(),
            started_at: Arc::clone(&s.started_at),
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(s: &AppState) -> Self {
        Self {
            jwt_config: s.jwt_config.clone(),
        }
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT issued by the account service"))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        reservations::create_reservation,
        reservations::list_reservations,
        reservations::get_reservation,
        reservations::update_reservation,
        payments::create_payment,
        payments::retry_payment,
        payments::payment_callback,
    ),
    components(
        schemas(
            ApiResponse<String>,
            PageDto<reservations::ReservationDto>,
            health::HealthResponse,
            health::ComponentHealth,
            reservations::ReservationDto,
            reservations::CreateReservationRequest,
            reservations::UpdateReservationRequest,
            payments::PaymentDto,
            payments::PaymentResultDto,
            payments::CreatePaymentRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Reservations", description = "Booking cars by calendar day and moving bookings through their lifecycle"),
        (name = "Payments", description = "Charging reservations through the payment gateway"),
    ),
    info(
        title = "Car Rental API",
        version = "1.0.0",
        description = "Reservations, availability and payments for a car rental fleet"
    )
)]
pub struct ApiDoc;

/// Build the full router. `metrics` is `None` where no global recorder is
/// installed (tests).
pub fn create_api_router(state: AppState, metrics: Option<PrometheusHandle>) -> Router {
    let auth = middleware::from_fn_with_state(AuthState::from_ref(&state), auth_middleware);

    let reservation_routes = Router::new()
        .route(
            "/",
            post(reservations::create_reservation).get(reservations::list_reservations),
        )
        .route(
            "/{id}",
            get(reservations::get_reservation).patch(reservations::update_reservation),
        )
        .route_layer(auth.clone());

    let payment_routes = Router::new()
        .route("/{id}", post(payments::create_payment))
        .route("/retry/{id}", post(payments::retry_payment))
        .route_layer(auth)
        // The gateway redirects the customer's browser here without a token.
        .route("/callback", get(payments::payment_callback));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health::health_check))
        .nest("/api/reservation", reservation_routes)
        .nest("/api/payment", payment_routes)
        .with_state(state);

    if let Some(handle) = metrics {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics::prometheus_metrics))
                .with_state(metrics::MetricsState { handle }),
        );
    }

    router
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::request_id_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::application::services::test_support::{paid, Fixture};
    use crate::domain::reservation::ReservationStatus;
    use crate::infrastructure::crypto::jwt::create_token;
    use crate::infrastructure::{init_database, DatabaseConfig};

    struct TestApp {
        fx: Fixture,
        router: Router,
        jwt: JwtConfig,
    }

    impl TestApp {
        async fn new() -> Self {
            let fx = Fixture::new();
            let jwt = JwtConfig {
                secret: "router-test".into(),
                ..Default::default()
            };
            let state = AppState {
                reservations: Arc::new(fx.reservation_service()),
                payments: Arc::new(fx.payment_service()),
                db: init_database(&DatabaseConfig::in_memory()).await.unwrap(),
                jwt_config: jwt.clone(),
                started_at: Arc::new(Instant::now()),
            };
            Self {
                router: create_api_router(state, None),
                fx,
                jwt,
            }
        }

        fn token(&self, user_id: &str, is_admin: bool) -> String {
            create_token(user_id, is_admin, &self.jwt).unwrap()
        }

        async fn send(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut req = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            let req = match body {
                Some(body) => req
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())),
                None => req.body(Body::empty()),
            }
            .unwrap();

            let resp = self.router.clone().oneshot(req).await.unwrap();
            let status = resp.status();
            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
        }
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let app = TestApp::new().await;
        let (status, body) = app.send("GET", "/api/reservation", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "No token provided");

        let (status, _) = app
            .send("POST", "/api/payment/r1", Some("garbage"), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_then_fetch_reservation() {
        let app = TestApp::new().await;
        let car = app.fx.car(150).await;
        let token = app.token("u1", false);

        let (status, body) = app
            .send(
                "POST",
                "/api/reservation",
                Some(&token),
                Some(json!({ "carId": car.id, "startDate": "2025-05-03", "endDate": "2025-05-05" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "pending");
        assert_eq!(body["data"]["totalPrice"], 300.0);
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = app
            .send("GET", &format!("/api/reservation/{}", id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["userId"], "u1");

        let stranger = app.token("u2", false);
        let (status, body) = app
            .send("GET", &format!("/api/reservation/{}", id), Some(&stranger), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized");
    }

    #[tokio::test]
    async fn bad_input_maps_to_400_and_missing_car_to_404() {
        let app = TestApp::new().await;
        let token = app.token("u1", false);

        let (status, body) = app
            .send(
                "POST",
                "/api/reservation",
                Some(&token),
                Some(json!({ "carId": "", "startDate": "2025-05-03", "endDate": "2025-05-05" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "carId is required");

        let (status, body) = app
            .send(
                "POST",
                "/api/reservation",
                Some(&token),
                Some(json!({ "carId": "nope", "startDate": "2025-05-03", "endDate": "2025-05-05" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Car not found");
    }

    #[tokio::test]
    async fn empty_listing_is_404() {
        let app = TestApp::new().await;
        let (status, body) = app
            .send("GET", "/api/reservation", Some(&app.token("u1", false)), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No reservations found");
    }

    #[tokio::test]
    async fn listing_reports_total_pages() {
        let app = TestApp::new().await;
        let car = app.fx.car(100).await;
        for start in [3, 6, 9] {
            app.fx
                .reservation(&car, "u1", start, start + 1, ReservationStatus::Pending, 1)
                .await;
        }

        let (status, body) = app
            .send(
                "GET",
                "/api/reservation?limit=2&page=1",
                Some(&app.token("u1", false)),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 3);
        assert_eq!(body["data"]["totalPages"], 2);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn patch_status_uses_transition_message() {
        let app = TestApp::new().await;
        let car = app.fx.car(100).await;
        let r = app
            .fx
            .reservation(&car, "u1", 3, 5, ReservationStatus::Pending, 1)
            .await;
        let token = app.token("u1", false);

        let (status, body) = app
            .send(
                "PATCH",
                &format!("/api/reservation/{}", r.id),
                Some(&token),
                Some(json!({ "status": "archived" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

        let (status, body) = app
            .send(
                "PATCH",
                &format!("/api/reservation/{}", r.id),
                Some(&token),
                Some(json!({ "status": "cancelled" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["message"], "Reservation cancelled successfully");
        assert_eq!(body["data"]["status"], "cancelled");
    }

    #[tokio::test]
    async fn payment_and_callback() {
        let app = TestApp::new().await;
        let car = app.fx.car(100).await;
        let r = app
            .fx
            .reservation(&car, "u1", 3, 5, ReservationStatus::Pending, 1)
            .await;
        app.fx.gateway.push_charge(Ok(paid("tx-1")));

        let (status, body) = app
            .send(
                "POST",
                &format!("/api/payment/{}", r.id),
                Some(&app.token("u1", false)),
                Some(json!({ "description": "rental", "source": { "type": "token", "token": "tok" } })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["message"], "Payment successful");
        assert_eq!(body["data"]["payment"]["amount"], 20_000);
        assert_eq!(app.fx.stored(&r.id).await.status, ReservationStatus::Upcoming);

        app.fx.gateway.set_payment(paid("tx-1"));
        let (status, body) = app
            .send("GET", "/api/payment/callback?id=tx-1", None, None)
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["message"], "Payment has been completed successfully");

        let (status, _) = app
            .send("GET", "/api/payment/callback?id=unknown", None, None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn callback_rejects_ids_outside_the_payment_path() {
        let app = TestApp::new().await;
        for query in ["id=", "id=../x", "id=..%2Finvoices", "id=tx%2F1"] {
            let (status, body) = app
                .send("GET", &format!("/api/payment/callback?{}", query), None, None)
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}: {}", query, body);
            assert_eq!(body["message"], "Invalid transaction id");
            assert!(body.get("data").is_none());
        }
        assert_eq!(app.fx.gateway.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn health_and_docs_are_public() {
        let app = TestApp::new().await;
        let (status, body) = app.send("GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = app.send("GET", "/api-doc/openapi.json", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/reservation"].is_object());
    }
}
