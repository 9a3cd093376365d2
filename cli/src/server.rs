use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{FromRequest, Path, Query, Request, State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

use nourish_core::calories::CalorieRequest;
use nourish_core::models::{
    BudgetRequest, BudgetSummary, CaloricData, Expense, ExpenseRequest, Meal, MealSuggestions,
    Profile, ProfileUpdate, RawWeightSample, SaveCaloricData, User, UserId, WeightEntry,
    WeightImportSummary,
};
use nourish_core::service::NourishService;

const BODY_LIMIT: usize = 5 * 1024 * 1024; // 5 MB
const TOKEN_COOKIE: &str = "token";

#[derive(Clone)]
struct AppState {
    svc: Arc<Mutex<NourishService>>,
}

impl AppState {
    fn svc(&self) -> MutexGuard<'_, NourishService> {
        self.svc.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct MealQuery {
    q: Option<String>,
}

#[derive(Serialize)]
struct Ack {
    ok: bool,
}

const ACK: Ack = Ack { ok: true };

#[derive(Serialize)]
struct DeletedCount {
    deleted: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    Unauthenticated,
    NotFound(String),
    BadRequest(String),
    PayloadTooLarge,
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "Invalid or missing token".to_string(),
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large".to_string(),
            ),
            Self::Internal(err) => {
                error!(error = %format!("{err:#}"), "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<nourish_core::Error> for ApiError {
    fn from(err: nourish_core::Error) -> Self {
        use nourish_core::Error;
        match err {
            Error::Unauthenticated => Self::Unauthenticated,
            Error::Validation(msg) | Error::InvalidInput(msg) => Self::BadRequest(msg),
            Error::NotFound(msg) => Self::NotFound(msg),
            Error::Storage(e) => Self::Internal(e),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::BadRequest(rejection.body_text())
        }
    }
}

/// `Json` whose rejections go through `ApiError`, so malformed bodies get the JSON error shape.
struct ApiJson<T>(T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

// --- Middleware ---

/// Pull the credential from the `token` cookie, falling back to `Authorization: Bearer`.
fn extract_credential(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == TOKEN_COOKIE && !value.is_empty()).then(|| value.to_string())
        });
    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
    })
}

async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let credential = extract_credential(request.headers());
    let user = state.svc().authenticate(credential.as_deref());
    match user {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Public handlers ---

async fn compute_calories(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CalorieRequest>,
) -> Result<Json<CaloricData>, ApiError> {
    Ok(Json(state.svc().compute_calories(&req)?))
}

async fn list_meals(
    State(state): State<AppState>,
    Query(query): Query<MealQuery>,
) -> Result<Json<Vec<Meal>>, ApiError> {
    Ok(Json(state.svc().list_meals(query.q.as_deref())?))
}

async fn get_meal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Meal>, ApiError> {
    Ok(Json(state.svc().get_meal(id)?))
}

// --- Account handlers ---

async fn save_calories(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    ApiJson(req): ApiJson<SaveCaloricData>,
) -> Result<Json<Ack>, ApiError> {
    state.svc().save_calories(user, &req)?;
    Ok(Json(ACK))
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.svc().profile(user)?))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    ApiJson(req): ApiJson<ProfileUpdate>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.svc().update_profile(user, &req)?))
}

async fn personalized_meals(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
) -> Result<Json<MealSuggestions>, ApiError> {
    Ok(Json(state.svc().personalized_meals(user)?))
}

async fn get_budget(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
) -> Result<Json<BudgetSummary>, ApiError> {
    Ok(Json(state.svc().budget_summary(user)?))
}

async fn set_budget(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    ApiJson(req): ApiJson<BudgetRequest>,
) -> Result<Json<Ack>, ApiError> {
    state.svc().set_budget(user, &req)?;
    Ok(Json(ACK))
}

async fn add_expense(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    ApiJson(req): ApiJson<ExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    let expense = state.svc().add_expense(user, &req)?;
    Ok((StatusCode::CREATED, Json(expense)))
}

async fn delete_expense(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    state.svc().remove_expense(user, &id)?;
    Ok(Json(ACK))
}

async fn list_weights(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
) -> Result<Json<Vec<WeightEntry>>, ApiError> {
    Ok(Json(state.svc().list_weights(user)?))
}

async fn append_weight(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    ApiJson(req): ApiJson<RawWeightSample>,
) -> Result<(StatusCode, Json<WeightEntry>), ApiError> {
    let entry = state.svc().append_weight(user, &req)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn delete_all_weights(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
) -> Result<Json<DeletedCount>, ApiError> {
    let deleted = state.svc().remove_all_weights(user)?;
    Ok(Json(DeletedCount { deleted }))
}

async fn import_weights(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    ApiJson(rows): ApiJson<Vec<RawWeightSample>>,
) -> Result<Json<WeightImportSummary>, ApiError> {
    Ok(Json(state.svc().import_weights(user, &rows)?))
}

async fn import_weights_csv(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    body: Bytes,
) -> Result<Json<WeightImportSummary>, ApiError> {
    Ok(Json(state.svc().import_weights_csv(user, &body[..])?))
}

async fn export_weights(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
) -> Result<Response, ApiError> {
    let mut csv = Vec::new();
    state.svc().export_weights_csv(user, &mut csv)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"weight_history.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

async fn delete_weight(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    state.svc().remove_weight(user, &id)?;
    Ok(Json(ACK))
}

async fn list_favorites(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
) -> Result<Json<Vec<Meal>>, ApiError> {
    Ok(Json(state.svc().list_favorites(user)?))
}

async fn add_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    Path(meal_id): Path<i64>,
) -> Result<Json<Ack>, ApiError> {
    state.svc().add_favorite(user, meal_id)?;
    Ok(Json(ACK))
}

async fn remove_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    Path(meal_id): Path<i64>,
) -> Result<Json<Ack>, ApiError> {
    state.svc().remove_favorite(user, meal_id)?;
    Ok(Json(ACK))
}

// --- Router ---

fn build_router(state: AppState) -> Router {
    let account = Router::new()
        .route("/api/calories", post(save_calories))
        .route("/api/profile", get(get_profile).put(update_profile))
        .route("/api/meals/personalized", get(personalized_meals))
        .route("/api/budget", get(get_budget).put(set_budget))
        .route("/api/budget/expenses", post(add_expense))
        .route(
            "/api/budget/expenses/{id}",
            axum::routing::delete(delete_expense),
        )
        .route(
            "/api/weight",
            get(list_weights)
                .post(append_weight)
                .delete(delete_all_weights),
        )
        .route("/api/weight/import", post(import_weights))
        .route("/api/weight/import/csv", post(import_weights_csv))
        .route("/api/weight/export", get(export_weights))
        .route("/api/weight/{id}", axum::routing::delete(delete_weight))
        .route("/api/favorites", get(list_favorites))
        .route(
            "/api/favorites/{meal_id}",
            post(add_favorite).delete(remove_favorite),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/api/calories/compute", post(compute_calories))
        .route("/api/meals", get(list_meals))
        .route("/api/meals/{id}", get(get_meal))
        .merge(account)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

pub async fn start_server(svc: NourishService, port: u16, bind: &str) -> anyhow::Result<()> {
    let state = AppState {
        svc: Arc::new(Mutex::new(svc)),
    };
    let app = build_router(state);

    if bind != "127.0.0.1" && bind != "localhost" {
        tracing::warn!(%bind, "listening beyond loopback; tokens travel in clear text without a TLS proxy");
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    info!(address = %format!("http://{bind}:{port}"), "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use chrono::Duration;
    use http_body_util::BodyExt;
    use nourish_core::models::{NewMeal, NewUser};
    use tower::ServiceExt;

    const SECRET: &[u8] = b"server-test-secret-server-test-secret";

    struct TestApp {
        state: AppState,
        token: String,
    }

    impl TestApp {
        fn new() -> Self {
            let svc = NourishService::new_in_memory(SECRET).unwrap();
            let user = svc
                .create_user(&NewUser {
                    email: "ada@example.com".to_string(),
                    name: Some("Ada".to_string()),
                    address: None,
                    phone: None,
                })
                .unwrap();
            let token = svc.issue_token(user.id, Duration::days(1)).unwrap();
            Self {
                state: AppState {
                    svc: Arc::new(Mutex::new(svc)),
                },
                token,
            }
        }

        fn router(&self) -> Router {
            build_router(self.state.clone())
        }

        fn bearer(&self) -> String {
            format!("Bearer {}", self.token)
        }

        async fn send(&self, request: axum::http::Request<Body>) -> (StatusCode, Vec<u8>) {
            let response = self.router().oneshot(request).await.unwrap();
            let status = response.status();
            let body = response.into_body().collect().await.unwrap().to_bytes();
            (status, body.to_vec())
        }

        async fn send_json(
            &self,
            method: &str,
            uri: &str,
            body: serde_json::Value,
        ) -> (StatusCode, serde_json::Value) {
            let request = axum::http::Request::builder()
                .method(method)
                .uri(uri)
                .header("Authorization", self.bearer())
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            let (status, bytes) = self.send(request).await;
            let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
            (status, json)
        }

        async fn get_json(&self, uri: &str) -> (StatusCode, serde_json::Value) {
            let request = axum::http::Request::get(uri)
                .header("Authorization", self.bearer())
                .body(Body::empty())
                .unwrap();
            let (status, bytes) = self.send(request).await;
            let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
            (status, json)
        }

        async fn delete(&self, uri: &str) -> StatusCode {
            let request = axum::http::Request::delete(uri)
                .header("Authorization", self.bearer())
                .body(Body::empty())
                .unwrap();
            self.send(request).await.0
        }
    }

    #[test]
    fn credential_prefers_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; token=abc.def.ghi"),
        );
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer other"),
        );
        assert_eq!(extract_credential(&headers).as_deref(), Some("abc.def.ghi"));

        headers.remove(header::COOKIE);
        assert_eq!(extract_credential(&headers).as_deref(), Some("other"));

        headers.remove(header::AUTHORIZATION);
        assert_eq!(extract_credential(&headers), None);
    }

    #[tokio::test]
    async fn missing_token_returns_401() {
        let app = TestApp::new();
        let (status, body) = app
            .send(
                axum::http::Request::get("/api/profile")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Invalid or missing token");
    }

    #[tokio::test]
    async fn expired_token_returns_401_and_changes_nothing() {
        let app = TestApp::new();
        let expired = {
            let svc = app.state.svc();
            let user = svc.find_user_by_email("ada@example.com").unwrap().id;
            svc.issue_token(user, Duration::seconds(-120)).unwrap()
        };
        let request = axum::http::Request::put("/api/budget")
            .header("Authorization", format!("Bearer {expired}"))
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"budget_type": "weekly", "budget_amount": 100})
                    .to_string(),
            ))
            .unwrap();
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, json) = app.get_json("/api/budget").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.get("budget_type").is_none());
    }

    #[tokio::test]
    async fn cookie_token_is_accepted() {
        let app = TestApp::new();
        let request = axum::http::Request::get("/api/profile")
            .header("Cookie", format!("token={}", app.token))
            .body(Body::empty())
            .unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["email"], "ada@example.com");
    }

    #[tokio::test]
    async fn compute_calories_is_public() {
        let app = TestApp::new();
        let request = axum::http::Request::post("/api/calories/compute")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "gender": "male",
                    "weight_kg": 70,
                    "height_cm": 175,
                    "age": 25,
                    "activity_level": "sedentary",
                    "goal": "maintain"
                })
                .to_string(),
            ))
            .unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!((json["bmr"].as_f64().unwrap() - 1673.75).abs() < 1e-9);
        assert!((json["target_calories"].as_f64().unwrap() - 2008.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn compute_calories_invalid_input_is_400() {
        let app = TestApp::new();
        let (status, json) = app
            .send_json(
                "POST",
                "/api/calories/compute",
                serde_json::json!({
                    "gender": "male",
                    "weight_kg": 70,
                    "height_cm": 175,
                    "age": 25,
                    "activity_level": "sedentary",
                    "goal": "weight_loss"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("specific_goal"));
    }

    #[tokio::test]
    async fn save_calories_updates_profile() {
        let app = TestApp::new();
        let (status, _) = app
            .send_json(
                "POST",
                "/api/calories",
                serde_json::json!({
                    "bmr": 1673.75,
                    "tdee": 2008.5,
                    "target_calories": 1508.5,
                    "activity_level": "sedentary",
                    "goal": "weight_loss"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, profile) = app.get_json("/api/profile").await;
        assert!((profile["caloric_data"]["target_calories"].as_f64().unwrap() - 1508.5).abs() < 1e-9);
        assert_eq!(profile["goal"], "weight_loss");
    }

    #[tokio::test]
    async fn budget_flow() {
        let app = TestApp::new();
        let (status, _) = app
            .send_json(
                "PUT",
                "/api/budget",
                serde_json::json!({"budget_type": "weekly", "budget_amount": 100}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, thirty) = app
            .send_json(
                "POST",
                "/api/budget/expenses",
                serde_json::json!({"amount": 30, "description": "Groceries", "category": "Food"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        app.send_json(
            "POST",
            "/api/budget/expenses",
            serde_json::json!({"amount": 20, "description": "Bus", "category": "Transport"}),
        )
        .await;

        let (_, summary) = app.get_json("/api/budget").await;
        assert!((summary["remaining_budget"].as_f64().unwrap() - 50.0).abs() < f64::EPSILON);
        assert!((summary["by_category"]["Food"].as_f64().unwrap() - 30.0).abs() < f64::EPSILON);

        let id = thirty["id"].as_str().unwrap();
        let uri = format!("/api/budget/expenses/{id}");
        assert_eq!(app.delete(&uri).await, StatusCode::OK);
        assert_eq!(app.delete(&uri).await, StatusCode::NOT_FOUND);

        let (_, summary) = app.get_json("/api/budget").await;
        assert!((summary["remaining_budget"].as_f64().unwrap() - 80.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn add_expense_validation_is_400() {
        let app = TestApp::new();
        app.send_json(
            "PUT",
            "/api/budget",
            serde_json::json!({"budget_type": "monthly", "budget_amount": 300}),
        )
        .await;
        let (status, _) = app
            .send_json(
                "POST",
                "/api/budget/expenses",
                serde_json::json!({"amount": -5, "description": "Refund", "category": "Food"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_body_is_400_with_error_shape() {
        let app = TestApp::new();
        app.send_json(
            "PUT",
            "/api/budget",
            serde_json::json!({"budget_type": "weekly", "budget_amount": 50}),
        )
        .await;
        let (status, json) = app
            .send_json(
                "POST",
                "/api/budget/expenses",
                serde_json::json!({"amount": "ten", "description": "Lunch", "category": "Food"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().is_some());

        let request = axum::http::Request::put("/api/budget")
            .header("Authorization", app.bearer())
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn update_profile_sets_preferences() {
        let app = TestApp::new();
        let (status, user) = app
            .send_json(
                "PUT",
                "/api/profile",
                serde_json::json!({"activity_level": "moderate", "goal": "maintain", "phone": "555-0100"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["activity_level"], "moderate");
        assert_eq!(user["phone"], "555-0100");
        assert!(user.get("caloric_data").is_none());

        let (_, profile) = app.get_json("/api/profile").await;
        assert_eq!(profile["goal"], "maintain");

        let (status, _) = app
            .send_json("PUT", "/api/profile", serde_json::json!({"goal": "bulk"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn personalized_meals_follow_target_and_budget() {
        let app = TestApp::new();
        for (name, calories, cost) in [("Pasta", 800.0, 4.0), ("Salad", 300.0, 6.0)] {
            app.state
                .svc()
                .add_meal(&NewMeal {
                    name: name.to_string(),
                    total_calories: calories,
                    total_protein: 0.0,
                    total_carbs: 0.0,
                    total_fats: 0.0,
                    estimated_cost: cost,
                    ingredients: vec![],
                })
                .unwrap();
        }

        let (status, open) = app.get_json("/api/meals/personalized").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(open["meals"].as_array().unwrap().len(), 2);
        assert!(open["calorie_limit"].is_null());

        app.send_json(
            "PUT",
            "/api/budget",
            serde_json::json!({"budget_type": "weekly", "budget_amount": 5}),
        )
        .await;
        let (_, fitted) = app.get_json("/api/meals/personalized").await;
        assert_eq!(fitted["meals"].as_array().unwrap().len(), 1);
        assert_eq!(fitted["meals"][0]["name"], "Pasta");

        let request = axum::http::Request::get("/api/meals/personalized")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.send(request).await.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn weight_flow() {
        let app = TestApp::new();
        let (status, _) = app
            .send_json(
                "POST",
                "/api/weight",
                serde_json::json!({"date": "2024-03-02", "weight": 80.2}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, summary) = app
            .send_json(
                "POST",
                "/api/weight/import",
                serde_json::json!([
                    {"date": "01-03-2024", "weight": "81"},
                    {"date": "soon", "weight": 80},
                    {"date": "2024-03-03", "weight": "heavy"}
                ]),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["imported"], 1);
        assert_eq!(summary["skipped"], 2);

        let (_, entries) = app.get_json("/api/weight").await;
        let dates: Vec<_> = entries
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["date"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-03-02"]);

        let request = axum::http::Request::get("/api/weight/export")
            .header("Authorization", app.bearer())
            .body(Body::empty())
            .unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "Date,Weight (kg)\n01-03-2024,81\n02-03-2024,80.2\n"
        );

        let first_id = entries[0]["id"].as_str().unwrap();
        assert_eq!(
            app.delete(&format!("/api/weight/{first_id}")).await,
            StatusCode::OK
        );
        assert_eq!(
            app.delete(&format!("/api/weight/{first_id}")).await,
            StatusCode::NOT_FOUND
        );

        assert_eq!(app.delete("/api/weight").await, StatusCode::OK);
        let (_, entries) = app.get_json("/api/weight").await;
        assert!(entries.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn weight_csv_import() {
        let app = TestApp::new();
        let request = axum::http::Request::post("/api/weight/import/csv")
            .header("Authorization", app.bearer())
            .header("content-type", "text/csv")
            .body(Body::from("Date,Weight (kg)\n05/01/2024,70\nx,y\n"))
            .unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["imported"], 1);
    }

    #[tokio::test]
    async fn weight_csv_import_skips_invalid_utf8_row() {
        let app = TestApp::new();
        let body: &'static [u8] = b"Date,Weight (kg)\n01-01-2024,80\n02-01-2024,\xff\xfe\n03-01-2024,79\n";
        let request = axum::http::Request::post("/api/weight/import/csv")
            .header("Authorization", app.bearer())
            .header("content-type", "text/csv")
            .body(Body::from(body))
            .unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["imported"], 2);
        assert_eq!(json["skipped"], 1);

        let (_, entries) = app.get_json("/api/weight").await;
        assert_eq!(entries.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn favorites_flow() {
        let app = TestApp::new();
        let meal_id = app
            .state
            .svc()
            .add_meal(&NewMeal {
                name: "Veggie wrap".to_string(),
                total_calories: 420.0,
                total_protein: 15.0,
                total_carbs: 55.0,
                total_fats: 14.0,
                estimated_cost: 3.2,
                ingredients: vec![],
            })
            .unwrap()
            .id;

        let uri = format!("/api/favorites/{meal_id}");
        assert_eq!(
            app.send_json("POST", &uri, serde_json::Value::Null).await.0,
            StatusCode::OK
        );
        assert_eq!(
            app.send_json("POST", &uri, serde_json::Value::Null).await.0,
            StatusCode::OK
        );
        let (_, favorites) = app.get_json("/api/favorites").await;
        assert_eq!(favorites.as_array().unwrap().len(), 1);
        assert_eq!(favorites[0]["name"], "Veggie wrap");

        assert_eq!(app.delete(&uri).await, StatusCode::OK);
        assert_eq!(app.delete("/api/favorites/31337").await, StatusCode::OK);
        let (_, favorites) = app.get_json("/api/favorites").await;
        assert!(favorites.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn meal_catalog_is_public() {
        let app = TestApp::new();
        let request = axum::http::Request::get("/api/meals/77")
            .body(Body::empty())
            .unwrap();
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let request = axum::http::Request::get("/api/meals?q=wrap")
            .body(Body::empty())
            .unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"[]");
    }

    #[tokio::test]
    async fn security_headers_present() {
        let app = TestApp::new();
        let response = app
            .router()
            .oneshot(
                axum::http::Request::get("/api/profile")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let app = TestApp::new();
        let big_body = vec![0u8; BODY_LIMIT + 1];
        let request = axum::http::Request::post("/api/calories/compute")
            .header("content-type", "application/json")
            .body(Body::from(big_body))
            .unwrap();
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let error = ApiError::Internal(anyhow::anyhow!("secret database path /home/user/nourish.db"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }
}
