use crate::application::ports::remote_api::{LostPetConfirmation, PetSafetyApi};
use crate::domain::entities::{
    CreateAlertData, MarkPetFoundData, MarkPetLostData, MissingPetAlert, Pet, ReportSightingData,
    Sighting, UpdatePetData,
};
use crate::shared::config::ApiConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PetBody {
    pet: Pet,
}

#[derive(Debug, Deserialize)]
struct AlertBody {
    alert: MissingPetAlert,
}

#[derive(Debug, Deserialize)]
struct SightingBody {
    sighting: Sighting,
}

/// `PetSafetyApi` over HTTPS with the service's `{success, data, error}` envelope.
pub struct HttpPetSafetyApi {
    client: Client,
    base_url: Url,
    auth_token: RwLock<Option<String>>,
}

impl HttpPetSafetyApi {
    pub fn new(config: &ApiConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| AppError::ConfigurationError(format!("http client: {err}")))?;
        Self::with_client(client, &config.base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| AppError::ConfigurationError(format!("api base url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::ConfigurationError(format!(
                "api base url cannot take a path: {base_url}"
            )));
        }
        Ok(Self {
            client,
            base_url,
            auth_token: RwLock::new(None),
        })
    }

    pub async fn set_auth_token(&self, token: Option<String>) {
        *self.auth_token.write().await = token;
    }

    /// Appends percent-encoded segments to the base url.
    fn url(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::ConfigurationError(format!("api base url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request<B, T>(&self, method: Method, segments: &[&str], body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Send,
    {
        let url = self.url(segments)?;
        let path = url.path().to_string();
        let mut builder: RequestBuilder = self.client.request(method.clone(), url);
        if let Some(token) = self.auth_token.read().await.as_deref() {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .json(body)
            .send()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        if !status.is_success() {
            let message = error_message(&text).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            tracing::debug!(
                target: "offline::executor",
                %method,
                path = %path,
                status = status.as_u16(),
                %message,
                "remote call rejected"
            );
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Auth(message),
                _ => AppError::Server {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&text)
            .map_err(|err| AppError::DeserializationError(err.to_string()))?;
        if !envelope.success {
            return Err(AppError::Server {
                status: status.as_u16(),
                message: envelope
                    .error
                    .unwrap_or_else(|| "request was not successful".to_string()),
            });
        }
        envelope
            .data
            .ok_or_else(|| AppError::DeserializationError(format!("{path}: response has no data")))
    }
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Envelope<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .filter(|message| !message.trim().is_empty())
}

#[async_trait]
impl PetSafetyApi for HttpPetSafetyApi {
    async fn mark_pet_lost(&self, data: &MarkPetLostData) -> Result<LostPetConfirmation, AppError> {
        self.request(
            Method::POST,
            &["pets", data.pet_id.as_str(), "mark-missing"],
            data,
        )
        .await
    }

    async fn mark_pet_found(&self, data: &MarkPetFoundData) -> Result<Pet, AppError> {
        let body: PetBody = self
            .request(
                Method::POST,
                &["pets", data.pet_id.as_str(), "mark-found"],
                data,
            )
            .await?;
        Ok(body.pet)
    }

    async fn report_sighting(&self, data: &ReportSightingData) -> Result<Sighting, AppError> {
        let body: SightingBody = self
            .request(
                Method::POST,
                &["alerts", data.alert_id.as_str(), "sightings"],
                data,
            )
            .await?;
        Ok(body.sighting)
    }

    async fn create_alert(&self, data: &CreateAlertData) -> Result<MissingPetAlert, AppError> {
        let body: AlertBody = self.request(Method::POST, &["alerts"], data).await?;
        Ok(body.alert)
    }

    async fn update_pet(&self, data: &UpdatePetData) -> Result<Pet, AppError> {
        let body: PetBody = self
            .request(
                Method::PATCH,
                &["pets", data.pet_id.as_str()],
                &data.changes,
            )
            .await?;
        Ok(body.pet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::EntityId;
    use axum::extract::Path;
    use axum::http::HeaderMap;
    use axum::routing::{patch, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    async fn spawn_server(app: Router) -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), handle)
    }

    fn api(base_url: &str) -> HttpPetSafetyApi {
        HttpPetSafetyApi::new(&ApiConfig {
            base_url: base_url.to_string(),
            request_timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn mark_pet_lost_returns_pet_and_alert() {
        let app = Router::new().route(
            "/pets/:pet_id/mark-missing",
            post(|Path(pet_id): Path<String>, Json(body): Json<Value>| async move {
                assert_eq!(body["petId"], json!(pet_id.clone()));
                Json(json!({
                    "success": true,
                    "data": {
                        "pet": {"id": pet_id, "name": "Rex", "isMissing": true},
                        "alert": {
                            "id": "alert-9",
                            "petId": pet_id,
                            "status": "active",
                            "createdAt": "2025-03-01T10:00:00Z"
                        }
                    }
                }))
            }),
        );
        let (base_url, server) = spawn_server(app).await;

        let confirmation = api(&base_url)
            .mark_pet_lost(&MarkPetLostData::new(EntityId::new("pet-1").unwrap()))
            .await
            .unwrap();

        assert!(confirmation.pet.is_missing);
        assert_eq!(confirmation.alert.unwrap().id.as_str(), "alert-9");
        server.abort();
    }

    #[tokio::test]
    async fn report_sighting_sends_wire_keys() {
        let app = Router::new().route(
            "/alerts/:alert_id/sightings",
            post(|Path(alert_id): Path<String>, Json(body): Json<Value>| async move {
                assert_eq!(body["sightingNotes"], json!("by the gate"));
                Json(json!({
                    "success": true,
                    "data": {"sighting": {
                        "id": "s-1",
                        "alertId": alert_id,
                        "notes": "by the gate",
                        "sightedAt": "2025-03-01T10:00:00Z"
                    }}
                }))
            }),
        );
        let (base_url, server) = spawn_server(app).await;

        let mut data = ReportSightingData::new(EntityId::new("alert-1").unwrap());
        data.notes = Some("by the gate".to_string());
        let sighting = api(&base_url).report_sighting(&data).await.unwrap();

        assert_eq!(sighting.id.as_str(), "s-1");
        assert_eq!(sighting.alert_id.as_str(), "alert-1");
        server.abort();
    }

    #[tokio::test]
    async fn bearer_token_is_forwarded() {
        let app = Router::new().route(
            "/pets/:pet_id",
            patch(|headers: HeaderMap, Path(pet_id): Path<String>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(json!({
                    "success": true,
                    "data": {"pet": {"id": pet_id, "name": auth}}
                }))
            }),
        );
        let (base_url, server) = spawn_server(app).await;

        let client = api(&base_url);
        client.set_auth_token(Some("secret".to_string())).await;
        let pet = client
            .update_pet(&UpdatePetData {
                pet_id: EntityId::new("pet-1").unwrap(),
                changes: Default::default(),
            })
            .await
            .unwrap();

        assert_eq!(pet.name, "Bearer secret");
        server.abort();
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let app = Router::new()
            .route(
                "/pets/:pet_id/mark-found",
                post(|| async {
                    (
                        axum::http::StatusCode::UNAUTHORIZED,
                        Json(json!({"success": false, "error": "token expired"})),
                    )
                }),
            )
            .route(
                "/alerts",
                post(|| async {
                    (
                        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"success": false, "error": "boom"})),
                    )
                }),
            );
        let (base_url, server) = spawn_server(app).await;
        let client = api(&base_url);

        let auth = client
            .mark_pet_found(&MarkPetFoundData {
                pet_id: EntityId::new("pet-1").unwrap(),
            })
            .await
            .unwrap_err();
        assert!(matches!(auth, AppError::Auth(message) if message == "token expired"));

        let server_err = client
            .create_alert(&CreateAlertData::new(EntityId::new("pet-1").unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(
            server_err,
            AppError::Server { status: 500, message } if message == "boom"
        ));
        server.abort();
    }

    #[tokio::test]
    async fn ids_are_encoded_as_single_path_segments() {
        let app = Router::new().route(
            "/v1/pets/:pet_id/mark-found",
            post(|Path(pet_id): Path<String>| async move {
                Json(json!({
                    "success": true,
                    "data": {"pet": {"id": pet_id, "name": "Rex"}}
                }))
            }),
        );
        let (base_url, server) = spawn_server(app).await;

        let pet = api(&format!("{base_url}/v1/"))
            .mark_pet_found(&MarkPetFoundData {
                pet_id: EntityId::new("pet/1?x=2").unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(pet.id.as_str(), "pet/1?x=2");
        server.abort();
    }

    #[test]
    fn base_url_must_be_absolute() {
        let err = HttpPetSafetyApi::with_client(Client::new(), "not a url").err();
        assert!(matches!(err, Some(AppError::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn unsuccessful_envelope_is_a_server_error() {
        let app = Router::new().route(
            "/alerts",
            post(|| async { Json(json!({"success": false, "error": "pet already has an alert"})) }),
        );
        let (base_url, server) = spawn_server(app).await;

        let err = api(&base_url)
            .create_alert(&CreateAlertData::new(EntityId::new("pet-1").unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Server { status: 200, .. }));
        server.abort();
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = api(&format!("http://{addr}"))
            .mark_pet_found(&MarkPetFoundData {
                pet_id: EntityId::new("pet-1").unwrap(),
            })
            .await
            .unwrap_err();
        assert!(err.is_connectivity());
    }
}
