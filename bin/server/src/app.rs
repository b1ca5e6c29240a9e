//! Router assembly.

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{self, AppState, routes};
use crate::error::StartupError;

/// Builds the application router.
///
/// Layers run outside-in: CORS, tracing, then authentication, so preflight
/// requests are answered before any token check.
pub fn router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        // Federation entry points
        .route("/oauth2/authorization/{provider}", get(routes::authorize))
        .route("/login/oauth2/code/{provider}", get(routes::callback))
        // Refresh token cookie
        .route("/api/auth/refresh", post(routes::refresh))
        .route("/api/auth/logout", post(routes::logout))
        // Protected
        .route("/api/me", get(routes::me))
        .route("/api/admin/check", get(routes::admin_check))
        .route("/error", get(routes::error_page))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::authenticate,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Builds a credentialed CORS layer for an explicit list of origins.
///
/// # Errors
///
/// Returns `WildcardCorsOrigin` if `*` is listed and `InvalidCorsOrigin`
/// for values that are not valid header values.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, StartupError> {
    let mut allowed = Vec::with_capacity(origins.len());
    for origin in origins {
        if origin == "*" {
            return Err(StartupError::WildcardCorsOrigin);
        }
        let value = HeaderValue::from_str(origin).map_err(|_| StartupError::InvalidCorsOrigin {
            origin: origin.clone(),
        })?;
        allowed.push(value);
    }

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ProviderGateway;
    use crate::config::FederationConfig;
    use crate::error::ProviderError;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use hotelres_core::AccountId;
    use hotelres_platform_access::{
        Account, AccountStatus, AccountStore, CallbackData, FEDERATED_PASSWORD_SENTINEL,
        InMemoryAccountStore, LoginId, LoginInitiation, Provider, Role, TokenConfig, TokenIssuer,
    };
    use rootcause::prelude::Report;
    use serde_json::{Value as JsonValue, json};
    use std::collections::HashMap;
    use tower::ServiceExt;

    const STATE: &str = "fixed-state";

    /// Gateway that returns canned user-info payloads.
    struct FakeGateway {
        payloads: HashMap<Provider, JsonValue>,
    }

    #[async_trait]
    impl ProviderGateway for FakeGateway {
        fn is_configured(&self, provider: Provider) -> bool {
            self.payloads.contains_key(&provider)
        }

        fn begin_login(
            &self,
            provider: Provider,
        ) -> Result<LoginInitiation, Report<ProviderError>> {
            Ok(LoginInitiation {
                authorization_url: format!("https://{provider}.example/authorize?state={STATE}"),
                state: STATE.to_string(),
            })
        }

        async fn fetch_user_info(
            &self,
            provider: Provider,
            callback: &CallbackData,
        ) -> Result<JsonValue, Report<ProviderError>> {
            if callback.code == "bad-code" {
                return Err(ProviderError::TokenExchange {
                    provider: provider.to_string(),
                    details: "invalid_grant".to_string(),
                }
                .into());
            }
            self.payloads.get(&provider).cloned().ok_or_else(|| {
                ProviderError::NotConfigured {
                    provider: provider.to_string(),
                }
                .into()
            })
        }
    }

    struct TestApp {
        router: Router,
        store: Arc<InMemoryAccountStore>,
        tokens: Arc<TokenIssuer>,
    }

    fn test_app_with(store: InMemoryAccountStore) -> TestApp {
        let store = Arc::new(store);
        let tokens = Arc::new(
            TokenIssuer::new(&TokenConfig::new("router-test-secret-at-least-32-bytes"))
                .expect("issuer"),
        );
        let gateway = FakeGateway {
            payloads: HashMap::from([
                (Provider::Kakao, json!({ "id": 555, "kakao_account": {} })),
                (
                    Provider::Naver,
                    json!({
                        "response": { "id": "nv1", "name": "Park", "email": "park@naver.com" }
                    }),
                ),
            ]),
        };
        let state = Arc::new(AppState::new(
            store.clone(),
            tokens.clone(),
            Arc::new(gateway),
            &FederationConfig::default(),
        ));
        let cors = cors_layer(&[
            "http://localhost:5173".to_string(),
            "http://127.0.0.1:5173".to_string(),
        ])
        .expect("cors");

        TestApp {
            router: router(state, cors),
            store,
            tokens,
        }
    }

    fn test_app() -> TestApp {
        test_app_with(InMemoryAccountStore::new())
    }

    async fn send(app: &TestApp, request: Request<Body>) -> Response {
        app.router.clone().oneshot(request).await.expect("response")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request")
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .expect("location")
            .to_str()
            .expect("ascii")
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|value| value.to_str().expect("ascii").to_string())
            .collect()
    }

    fn cookie_value(set_cookie: &str, name: &str) -> String {
        set_cookie
            .split(';')
            .next()
            .and_then(|pair| pair.strip_prefix(&format!("{name}=")))
            .expect("cookie value")
            .to_string()
    }

    fn clears_state_cookie(response: &Response) -> bool {
        set_cookies(response)
            .iter()
            .any(|c| c.starts_with("oauth2_state=") && c.contains("Max-Age=0"))
    }

    async fn json_body(response: Response) -> JsonValue {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    async fn complete_kakao_login(app: &TestApp) -> Response {
        let request = Request::builder()
            .uri(format!("/login/oauth2/code/kakao?code=abc&state={STATE}"))
            .header(header::COOKIE, format!("oauth2_state={STATE}"))
            .body(Body::empty())
            .expect("request");
        send(app, request).await
    }

    #[tokio::test]
    async fn authorization_entry_point_redirects_with_state_cookie() {
        let app = test_app();

        let response = send(&app, get("/oauth2/authorization/kakao")).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            location(&response),
            "https://kakao.example/authorize?state=fixed-state"
        );
        let cookies = set_cookies(&response);
        let state_cookie = cookies
            .iter()
            .find(|c| c.starts_with("oauth2_state="))
            .expect("state cookie");
        assert!(state_cookie.contains("HttpOnly"));
        assert!(state_cookie.contains("Path=/login/oauth2"));
        assert!(state_cookie.contains("Max-Age=600"));
    }

    #[tokio::test]
    async fn unknown_or_unconfigured_provider_is_not_found() {
        let app = test_app();

        let unknown = send(&app, get("/oauth2/authorization/facebook")).await;
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

        let unconfigured = send(&app, get("/oauth2/authorization/google")).await;
        assert_eq!(unconfigured.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn callback_redirects_with_token_fragment_and_refresh_cookie() {
        let app = test_app();

        let response = complete_kakao_login(&app).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let target = location(&response);
        let token = target
            .strip_prefix("http://localhost:5173/main#token=")
            .expect("fragment");
        let verified = app.tokens.verify_access(token).expect("access token");
        assert_eq!(verified.login_id.as_str(), "kakao_555");

        let cookies = set_cookies(&response);
        let refresh = cookies
            .iter()
            .find(|c| c.starts_with("refreshToken="))
            .expect("refresh cookie");
        assert!(refresh.contains("HttpOnly"));
        assert!(refresh.contains("SameSite=Lax"));
        assert!(refresh.contains("Secure"));
        assert!(refresh.contains("Path=/api/auth"));
        assert!(refresh.contains("Max-Age=604800"));
        assert!(clears_state_cookie(&response));

        assert_eq!(app.store.len(), 1);
    }

    #[tokio::test]
    async fn repeated_callback_reuses_account() {
        let app = test_app();

        complete_kakao_login(&app).await;
        let second = complete_kakao_login(&app).await;

        assert_eq!(second.status(), StatusCode::FOUND);
        assert_eq!(app.store.len(), 1);
    }

    #[tokio::test]
    async fn callback_with_mismatched_state_fails_without_account() {
        let app = test_app();
        let request = Request::builder()
            .uri("/login/oauth2/code/kakao?code=abc&state=forged")
            .header(header::COOKIE, format!("oauth2_state={STATE}"))
            .body(Body::empty())
            .expect("request");

        let response = send(&app, request).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/error");
        assert!(clears_state_cookie(&response));
        assert!(app.store.is_empty());
    }

    #[tokio::test]
    async fn callback_without_state_cookie_fails() {
        let app = test_app();

        let response = send(
            &app,
            get(&format!("/login/oauth2/code/kakao?code=abc&state={STATE}")),
        )
        .await;

        assert_eq!(location(&response), "/error");
        assert!(app.store.is_empty());
    }

    #[tokio::test]
    async fn provider_failure_redirects_to_error_page() {
        let app = test_app();
        let request = Request::builder()
            .uri(format!("/login/oauth2/code/kakao?code=bad-code&state={STATE}"))
            .header(header::COOKIE, format!("oauth2_state={STATE}"))
            .body(Body::empty())
            .expect("request");

        let response = send(&app, request).await;

        assert_eq!(location(&response), "/error");
        assert!(clears_state_cookie(&response));
        assert!(
            set_cookies(&response)
                .iter()
                .all(|c| !c.starts_with("refreshToken="))
        );
        assert!(app.store.is_empty());
    }

    #[tokio::test]
    async fn provider_denial_redirects_to_error_page() {
        let app = test_app();

        let response = send(&app, get("/login/oauth2/code/naver?error=access_denied")).await;

        assert_eq!(location(&response), "/error");
        assert!(clears_state_cookie(&response));
    }

    #[tokio::test]
    async fn protected_path_without_token_is_unauthorized_without_redirect() {
        let app = test_app();

        let response = send(&app, get("/api/me")).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::LOCATION).is_none());
    }

    #[tokio::test]
    async fn protected_path_with_invalid_token_is_unauthorized() {
        let app = test_app();
        let foreign = TokenIssuer::new(&TokenConfig::new("some-other-secret-that-is-32-bytes"))
            .expect("issuer")
            .issue_access(&LoginId::from_stored("kakao_555".to_string()), Role::Admin)
            .expect("issue");

        let response = send(&app, get_with_bearer("/api/me", &foreign.token)).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::LOCATION).is_none());
    }

    #[tokio::test]
    async fn unrouted_protected_path_still_requires_authentication() {
        let app = test_app();

        let response = send(&app, get("/api/reservations")).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn error_page_is_public() {
        let app = test_app();

        let response = send(&app, get("/error")).await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn me_returns_linked_account() {
        let app = test_app();
        let login = complete_kakao_login(&app).await;
        let token = location(&login)
            .split_once("#token=")
            .map(|(_, token)| token.to_string())
            .expect("token");

        let response = send(&app, get_with_bearer("/api/me", &token)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["login_id"], "kakao_555");
        assert_eq!(body["role"], "ROLE_USER");
        assert_eq!(body["display_name"], "KAKAO user");
        assert_eq!(body["email"], "kakao_555@placeholder.invalid");
        assert_eq!(body["placeholder_email"], true);
    }

    #[tokio::test]
    async fn refresh_cookie_mints_access_token() {
        let app = test_app();
        let login = complete_kakao_login(&app).await;
        let refresh = set_cookies(&login)
            .iter()
            .find(|c| c.starts_with("refreshToken="))
            .map(|c| cookie_value(c, "refreshToken"))
            .expect("refresh cookie");

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/refresh")
            .header(header::COOKIE, format!("refreshToken={refresh}"))
            .body(Body::empty())
            .expect("request");
        let response = send(&app, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["expires_in"], 3600);
        let access = body["access_token"].as_str().expect("access token");
        let verified = app.tokens.verify_access(access).expect("verify");
        assert_eq!(verified.role, Some(Role::User));
    }

    #[tokio::test]
    async fn refresh_rejects_access_token_in_cookie() {
        let app = test_app();
        let access = app
            .tokens
            .issue_access(&LoginId::from_stored("kakao_555".to_string()), Role::User)
            .expect("issue");
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/refresh")
            .header(header::COOKIE, format!("refreshToken={}", access.token))
            .body(Body::empty())
            .expect("request");

        let response = send(&app, request).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_rejects_suspended_account() {
        let login_id = LoginId::from_stored("naver_nv1".to_string());
        let now = chrono::Utc::now();
        let suspended = Account::with_all_fields(
            AccountId::new(),
            login_id.clone(),
            FEDERATED_PASSWORD_SENTINEL.to_string(),
            "Park".to_string(),
            "park@naver.com".to_string(),
            AccountStatus::Suspended,
            Role::User,
            now,
            now,
        );
        let app = test_app_with(InMemoryAccountStore::with_accounts([suspended]));
        let refresh = app.tokens.issue_refresh(&login_id).expect("issue");
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/refresh")
            .header(header::COOKIE, format!("refreshToken={}", refresh.token))
            .body(Body::empty())
            .expect("request");

        let response = send(&app, request).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(
            app.store
                .find_by_login_id(&login_id)
                .await
                .expect("find")
                .is_some()
        );
    }

    #[tokio::test]
    async fn logout_clears_refresh_cookie() {
        let app = test_app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/logout")
            .body(Body::empty())
            .expect("request");

        let response = send(&app, request).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let cookies = set_cookies(&response);
        let cleared = cookies
            .iter()
            .find(|c| c.starts_with("refreshToken="))
            .expect("cleared cookie");
        assert!(cleared.contains("Max-Age=0"));
        assert!(cleared.contains("Path=/api/auth"));
    }

    #[tokio::test]
    async fn admin_check_requires_admin_role() {
        let app = test_app();
        let guest = app
            .tokens
            .issue_access(&LoginId::from_stored("guest01".to_string()), Role::User)
            .expect("issue");
        let staff = app
            .tokens
            .issue_access(&LoginId::from_stored("staff01".to_string()), Role::Admin)
            .expect("issue");

        let forbidden = send(&app, get_with_bearer("/api/admin/check", &guest.token)).await;
        let allowed = send(&app, get_with_bearer("/api/admin/check", &staff.token)).await;

        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(allowed.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn preflight_from_allowed_origin_gets_credentialed_cors() {
        let app = test_app();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/me")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
            .body(Body::empty())
            .expect("request");

        let response = send(&app, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("http://localhost:5173"))
        );
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
            Some(&HeaderValue::from_static("true"))
        );
    }

    #[tokio::test]
    async fn preflight_from_unknown_origin_gets_no_cors_grant() {
        let app = test_app();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/me")
            .header(header::ORIGIN, "https://evil.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .expect("request");

        let response = send(&app, request).await;

        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[test]
    fn wildcard_origin_is_rejected() {
        assert!(matches!(
            cors_layer(&["*".to_string()]),
            Err(StartupError::WildcardCorsOrigin)
        ));
        assert!(matches!(
            cors_layer(&["http://ok.example".to_string(), "bad\norigin".to_string()]),
            Err(StartupError::InvalidCorsOrigin { .. })
        ));
    }
}
