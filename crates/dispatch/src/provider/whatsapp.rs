//! WhatsApp Business Cloud API gateway.
//!
//! Wraps the Graph `/{phone_number_id}/messages` endpoint for text and
//! location sends plus the phone-number metadata endpoint for health probes.

use crate::config::WhatsAppConfig;
use crate::error::ProviderErrorKind;
use crate::provider::phone;
use crate::provider::{MessagePart, MessageProvider, PartOutcome, ProviderHealth};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, StatusCode, header};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::{Duration, timeout};
use tracing::debug;

type ProviderHttpClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Gateway to the WhatsApp Business Cloud API.
///
/// One outbound attempt per call; no retries. Timeout and connection errors
/// map to [`ProviderErrorKind::Transient`].
pub struct WhatsAppGateway {
    client: ProviderHttpClient,
    base_url: String,
    phone_number_id: String,
    business_account_id: Option<String>,
    access_token: String,
    timeout: Duration,
}

/// WhatsApp Business account metadata, for boundary-level diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct AccountInfo {
    pub available: bool,
    pub name: Option<String>,
    pub timezone_id: Option<String>,
    pub message_template_namespace: Option<String>,
    pub error: Option<String>,
}

impl AccountInfo {
    fn unavailable(error: impl Into<String>) -> Self {
        Self {
            available: false,
            name: None,
            timezone_id: None,
            message_template_namespace: None,
            error: Some(error.into()),
        }
    }
}

impl WhatsAppGateway {
    pub fn new(config: &WhatsAppConfig) -> Self {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(https);
        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            phone_number_id: config.phone_number_id.clone(),
            business_account_id: config.business_account_id.clone(),
            access_token: config.access_token.clone(),
            timeout: config.request_timeout(),
        }
    }

    fn messages_uri(&self) -> String {
        format!("{}/{}/messages", self.base_url, self.phone_number_id)
    }

    async fn execute(
        &self,
        request: Request<Full<Bytes>>,
    ) -> Result<(StatusCode, Bytes), (ProviderErrorKind, String)> {
        let uri = request.uri().clone();
        debug!(method = %request.method(), uri = %uri, "provider request");

        // One deadline for the whole exchange, body included: a provider
        // that returns headers and then stalls the body must not hang the
        // pipeline past the per-call timeout.
        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| (ProviderErrorKind::Transient, format!("network error: {e}")))?;
            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| {
                    (
                        ProviderErrorKind::Transient,
                        format!("failed to read provider response: {e}"),
                    )
                })?
                .to_bytes();
            Ok((status, body))
        };

        let (status, body) = match timeout(self.timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                return Err((
                    ProviderErrorKind::Transient,
                    format!("timeout after {:?}", self.timeout),
                ));
            }
        };
        debug!(status = %status, uri = %uri, "provider response");
        Ok((status, body))
    }

    async fn post_message(&self, part: MessagePart, payload: serde_json::Value) -> PartOutcome {
        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(e) => {
                return PartOutcome::failed(
                    part,
                    ProviderErrorKind::Unknown,
                    format!("failed to encode payload: {e}"),
                );
            }
        };

        let request = Request::builder()
            .method(Method::POST)
            .uri(self.messages_uri())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.access_token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)));
        let request = match request {
            Ok(request) => request,
            Err(e) => {
                return PartOutcome::failed(
                    part,
                    ProviderErrorKind::Unknown,
                    format!("failed to build request: {e}"),
                );
            }
        };

        let (status, body) = match self.execute(request).await {
            Ok(pair) => pair,
            Err((kind, detail)) => {
                tracing::warn!(
                    name = "provider.send.transport_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    part = ?part,
                    error_kind = %kind,
                    detail = %detail,
                    message = "Provider call failed before a response was received"
                );
                return PartOutcome::failed(part, kind, detail);
            }
        };

        if !status.is_success() {
            let (kind, detail) = classify_error(status, &body);
            tracing::warn!(
                name = "provider.send.rejected",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                part = ?part,
                status = %status,
                error_kind = %kind,
                detail = %detail,
                message = "Provider rejected the message"
            );
            return PartOutcome::failed(part, kind, detail);
        }

        match serde_json::from_slice::<SendResponse>(&body) {
            Ok(parsed) if !parsed.messages.is_empty() => {
                let id = parsed.messages[0].id.clone();
                tracing::info!(
                    name = "provider.send.accepted",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    part = ?part,
                    provider_message_id = %id,
                    message = "Provider accepted the message"
                );
                PartOutcome::sent(part, id)
            }
            _ => PartOutcome::failed(
                part,
                ProviderErrorKind::Unknown,
                "provider response did not contain a message id",
            ),
        }
    }

    /// Business account metadata, when a business account id is configured.
    #[tracing::instrument(skip(self))]
    pub async fn account_info(&self) -> AccountInfo {
        let Some(account_id) = &self.business_account_id else {
            return AccountInfo::unavailable("no business account id configured");
        };
        let uri = format!(
            "{}/{}?fields=name,timezone_id,message_template_namespace",
            self.base_url, account_id
        );
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.access_token))
            .body(Full::new(Bytes::new()));
        let request = match request {
            Ok(request) => request,
            Err(e) => return AccountInfo::unavailable(format!("failed to build request: {e}")),
        };

        match self.execute(request).await {
            Ok((status, body)) if status.is_success() => {
                match serde_json::from_slice::<BusinessAccountMetadata>(&body) {
                    Ok(meta) => AccountInfo {
                        available: true,
                        name: meta.name,
                        timezone_id: meta.timezone_id,
                        message_template_namespace: meta.message_template_namespace,
                        error: None,
                    },
                    Err(e) => AccountInfo::unavailable(format!("malformed metadata: {e}")),
                }
            }
            Ok((status, body)) => {
                let (_, detail) = classify_error(status, &body);
                AccountInfo::unavailable(detail)
            }
            Err((_, detail)) => AccountInfo::unavailable(detail),
        }
    }
}

impl MessageProvider for WhatsAppGateway {
    #[tracing::instrument(skip(self, body))]
    async fn send_text(&self, phone_number: &str, body: &str) -> PartOutcome {
        let Some(number) = phone::normalize(phone_number) else {
            return PartOutcome::failed(
                MessagePart::Text,
                ProviderErrorKind::LocalValidation,
                format!("invalid phone number format: {phone_number}"),
            );
        };
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": phone::wire_format(&number),
            "type": "text",
            "text": { "body": body },
        });
        self.post_message(MessagePart::Text, payload).await
    }

    #[tracing::instrument(skip(self, label))]
    async fn send_location(
        &self,
        phone_number: &str,
        latitude: f64,
        longitude: f64,
        label: &str,
    ) -> PartOutcome {
        let Some(number) = phone::normalize(phone_number) else {
            return PartOutcome::failed(
                MessagePart::Location,
                ProviderErrorKind::LocalValidation,
                format!("invalid phone number format: {phone_number}"),
            );
        };
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": phone::wire_format(&number),
            "type": "location",
            "location": {
                "latitude": latitude,
                "longitude": longitude,
                "name": label,
                "address": format!("{latitude}, {longitude}"),
            },
        });
        self.post_message(MessagePart::Location, payload).await
    }

    #[tracing::instrument(skip(self))]
    async fn health_check(&self) -> ProviderHealth {
        let uri = format!(
            "{}/{}?fields=display_phone_number,verified_name,quality_rating",
            self.base_url, self.phone_number_id
        );
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.access_token))
            .body(Full::new(Bytes::new()));
        let request = match request {
            Ok(request) => request,
            Err(e) => return ProviderHealth::unhealthy(format!("failed to build request: {e}")),
        };

        match self.execute(request).await {
            Ok((status, body)) if status.is_success() => {
                match serde_json::from_slice::<PhoneNumberMetadata>(&body) {
                    Ok(meta) => ProviderHealth {
                        healthy: true,
                        display_number: meta.display_phone_number,
                        verified_name: meta.verified_name,
                        quality_rating: meta.quality_rating,
                        error: None,
                    },
                    Err(e) => ProviderHealth::unhealthy(format!("malformed metadata: {e}")),
                }
            }
            Ok((status, body)) => {
                let (_, detail) = classify_error(status, &body);
                ProviderHealth::unhealthy(detail)
            }
            Err((_, detail)) => ProviderHealth::unhealthy(detail),
        }
    }
}

/// Map a non-success response into the closed error taxonomy.
///
/// Graph error codes take precedence over the HTTP status: the API reports
/// most application errors with status 400 and a structured body.
fn classify_error(status: StatusCode, body: &[u8]) -> (ProviderErrorKind, String) {
    let parsed: Option<GraphErrorEnvelope> = serde_json::from_slice(body).ok();
    let (code, message) = match parsed {
        Some(envelope) => (envelope.error.code, envelope.error.message),
        None => (None, None),
    };
    let detail = match (&message, code) {
        (Some(msg), Some(code)) => format!("HTTP {status}, code {code}: {msg}"),
        (Some(msg), None) => format!("HTTP {status}: {msg}"),
        _ => format!("HTTP {status}"),
    };

    let kind = match code {
        Some(190) => ProviderErrorKind::InvalidCredential,
        Some(4) | Some(80007) | Some(130429) => ProviderErrorKind::RateLimited,
        Some(131021) | Some(131026) | Some(131030) => ProviderErrorKind::InvalidRecipient,
        _ => match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderErrorKind::InvalidCredential,
            StatusCode::TOO_MANY_REQUESTS => ProviderErrorKind::RateLimited,
            s if s.is_server_error() => ProviderErrorKind::Transient,
            _ => ProviderErrorKind::Unknown,
        },
    };
    (kind, detail)
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Deserialize)]
struct GraphErrorEnvelope {
    error: GraphError,
}

#[derive(Deserialize)]
struct GraphError {
    message: Option<String>,
    code: Option<i64>,
}

#[derive(Deserialize)]
struct BusinessAccountMetadata {
    name: Option<String>,
    timezone_id: Option<String>,
    message_template_namespace: Option<String>,
}

#[derive(Deserialize)]
struct PhoneNumberMetadata {
    display_phone_number: Option<String>,
    verified_name: Option<String>,
    quality_rating: Option<String>,
}
