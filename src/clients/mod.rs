/// Observatory backend client module
use crate::config::HttpSettings;
use crate::domain::{
    FilterInfo, ObservationRequest, PasswordCheck, ScheduleEntry, SpecFileCoverage, StatusReport,
    SubmitReceipt, Target, VisibilityOutcome, VisibilityQuery, WeatherReport, TARGET_MINALT,
    TARGET_MINMOONSEP,
};
use crate::errors::{ApiError, ApiResult};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// HTTP client wrapper with common configuration
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(settings: &HttpSettings) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }

    pub fn get_client(&self) -> &Client {
        &self.client
    }
}

/// Everything the portal needs from the observatory backend.
///
/// Views and services are written against this trait so they can run
/// against an in-memory backend in tests.
pub trait ObservatoryApi {
    async fn fetch_targets(&self) -> ApiResult<Vec<Target>>;
    async fn fetch_status(&self) -> ApiResult<StatusReport>;
    async fn fetch_filter_info(&self) -> ApiResult<Vec<FilterInfo>>;
    async fn fetch_daily_schedule(&self) -> ApiResult<Vec<ScheduleEntry>>;
    async fn fetch_spec_options(&self) -> ApiResult<Vec<String>>;
    async fn fetch_spec_file(&self, file: &str) -> ApiResult<SpecFileCoverage>;
    /// A backend-reported failure comes back as `VisibilityOutcome::Failed`,
    /// only transport problems are errors.
    async fn fetch_visibility(&self, query: &VisibilityQuery) -> ApiResult<VisibilityOutcome>;
    async fn fetch_weather(&self) -> ApiResult<WeatherReport>;
    async fn send_request(&self, request: &ObservationRequest) -> ApiResult<SubmitReceipt>;
    async fn validate_password(&self, password: &str) -> ApiResult<bool>;
}

/// Client for the observatory REST backend
pub struct ObservatoryClient {
    http_client: HttpClient,
    base_url: String,
}

impl ObservatoryClient {
    pub fn new(base_url: String, settings: &HttpSettings) -> ApiResult<Self> {
        Ok(Self {
            http_client: HttpClient::new(settings)?,
            base_url,
        })
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the status code with the decoded body
    async fn send_for_value(&self, req: RequestBuilder) -> ApiResult<(u16, Value)> {
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let json: Value = resp.json().await?;
        Ok((status, json))
    }

    /// Decode a successful body, turning `{"error": ...}` answers into errors
    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> ApiResult<T> {
        let (status, json) = self.send_for_value(req).await?;
        if !(200..300).contains(&status) || json.get("error").is_some() {
            let message = json
                .get("error")
                .and_then(|e| e.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("request failed with status {}", status));
            return Err(ApiError::Upstream { status, message });
        }
        serde_json::from_value(json)
            .map_err(|e| ApiError::Internal(format!("unexpected response shape: {}", e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        debug!("GET {}", path);
        let req = self.http_client.get_client().get(self.url(path));
        self.send_json(req).await
    }
}

impl ObservatoryApi for ObservatoryClient {
    async fn fetch_targets(&self) -> ApiResult<Vec<Target>> {
        self.get_json("/api/targets").await
    }

    async fn fetch_status(&self) -> ApiResult<StatusReport> {
        self.get_json("/api/status").await
    }

    async fn fetch_filter_info(&self) -> ApiResult<Vec<FilterInfo>> {
        self.get_json("/api/filtinfo").await
    }

    async fn fetch_daily_schedule(&self) -> ApiResult<Vec<ScheduleEntry>> {
        self.get_json("/api/daily_schedule").await
    }

    async fn fetch_spec_options(&self) -> ApiResult<Vec<String>> {
        self.get_json("/api/spec-options").await
    }

    async fn fetch_spec_file(&self, file: &str) -> ApiResult<SpecFileCoverage> {
        debug!("GET /api/spec-file file={}", file);
        let req = self
            .http_client
            .get_client()
            .get(self.url("/api/spec-file"))
            .query(&[("file", file)]);
        self.send_json(req).await
    }

    async fn fetch_visibility(&self, query: &VisibilityQuery) -> ApiResult<VisibilityOutcome> {
        debug!(
            "GET /api/staralt_data ra={} dec={} objname={}",
            query.ra, query.dec, query.objname
        );
        let req = self
            .http_client
            .get_client()
            .get(self.url("/api/staralt_data"))
            .query(&[
                ("ra", query.ra.clone()),
                ("dec", query.dec.clone()),
                ("objname", query.objname.clone()),
                ("target_minalt", TARGET_MINALT.to_string()),
                ("target_minmoonsep", TARGET_MINMOONSEP.to_string()),
            ]);

        let (status, json) = self.send_for_value(req).await?;
        if json.get("error").is_none() && !(200..300).contains(&status) {
            return Err(ApiError::Upstream {
                status,
                message: format!("staralt request failed with status {}", status),
            });
        }
        VisibilityOutcome::from_value(json)
            .map_err(|e| ApiError::Internal(format!("unexpected staralt shape: {}", e)))
    }

    async fn fetch_weather(&self) -> ApiResult<WeatherReport> {
        self.get_json("/api/weather").await
    }

    async fn send_request(&self, request: &ObservationRequest) -> ApiResult<SubmitReceipt> {
        debug!("POST /api/send_email target={}", request.target);
        let req = self
            .http_client
            .get_client()
            .post(self.url("/api/send_email"))
            .json(request);
        self.send_json(req).await
    }

    async fn validate_password(&self, password: &str) -> ApiResult<bool> {
        let req = self
            .http_client
            .get_client()
            .post(self.url("/api/validate-password"))
            .json(&serde_json::json!({ "password": password }));
        let (status, json) = self.send_for_value(req).await?;
        if let Ok(check) = serde_json::from_value::<PasswordCheck>(json) {
            return Ok(check.valid);
        }
        match status {
            401 | 403 => Ok(false),
            _ => Err(ApiError::Upstream {
                status,
                message: "password check returned no verdict".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::tests::sample_track;
    use axum::{
        extract::{Query, State},
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

    /// Staralt stand-in: RA "0" answers with an error payload, RA "1" with a bare 500
    async fn staralt(
        State(seen): State<Seen>,
        Query(params): Query<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        let ra = params.get("ra").cloned().unwrap_or_default();
        seen.lock().unwrap().push(params);
        match ra.as_str() {
            "0" => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "bad coordinates"})),
            ),
            "1" => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "boom"})),
            ),
            _ => (
                StatusCode::OK,
                Json(serde_json::to_value(sample_track(&["r", "g"])).unwrap()),
            ),
        }
    }

    async fn spawn_backend(seen: Seen) -> String {
        let app = Router::new()
            .route("/api/staralt_data", get(staralt))
            .route(
                "/api/spec-file",
                get(|| async {
                    (
                        StatusCode::NOT_FOUND,
                        Json(json!({"error": "File not found"})),
                    )
                }),
            )
            .route(
                "/api/validate-password",
                post(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"detail": "denied"}))) }),
            )
            .with_state(seen);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn query(ra: &str) -> VisibilityQuery {
        VisibilityQuery {
            ra: ra.into(),
            dec: "-05:23:28".into(),
            objname: "M42".into(),
        }
    }

    #[tokio::test]
    async fn test_visibility_request_and_answers() {
        let seen = Seen::default();
        let base_url = spawn_backend(seen.clone()).await;
        let client = ObservatoryClient::new(base_url, &HttpSettings::default()).unwrap();

        let outcome = client.fetch_visibility(&query("05:35:17")).await.unwrap();
        assert!(matches!(outcome, VisibilityOutcome::Track(_)));
        assert!(outcome.is_observable_tonight());
        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen[0]["ra"], "05:35:17");
            assert_eq!(seen[0]["dec"], "-05:23:28");
            assert_eq!(seen[0]["objname"], "M42");
            assert_eq!(seen[0]["target_minalt"], "30");
            assert_eq!(seen[0]["target_minmoonsep"], "40");
        }

        let outcome = client.fetch_visibility(&query("0")).await.unwrap();
        assert_eq!(outcome, VisibilityOutcome::Failed("bad coordinates".into()));

        let err = client.fetch_visibility(&query("1")).await.unwrap_err();
        assert!(matches!(err, ApiError::Upstream { status: 500, .. }));
        assert_eq!(err.code(), "UPSTREAM_5XX");
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let base_url = spawn_backend(Seen::default()).await;
        let client = ObservatoryClient::new(base_url, &HttpSettings::default()).unwrap();

        let err = client.fetch_spec_file("missing.specmode").await.unwrap_err();
        assert_eq!(err.code(), "UPSTREAM_404");
        assert!(err.to_string().contains("File not found"));

        assert!(!client.validate_password("guess").await.unwrap());
    }
}
