//! # Backend HTTP Client
//!
//! Typed access to the VISUM data server and speech server.
//!
//! ## Endpoints
//! - `GET  /data/scan_bluetooth`
//! - `POST /data/search_interactions`
//! - `POST /data/save_interaction`
//! - `GET  /data/sys_check/:module`
//! - `POST /data/image_check` (multipart)
//! - `GET  /data/get_recommendations/:color/:texture`
//! - `GET  /data/get_assistance/:prompt`
//! - `GET  /data/speak/:text` (speech host)
//!
//! Path parameters go through `Url::path_segments_mut`, which percent-encodes
//! them, so free text prompts are safe to embed.

use crate::backend::{InteractionStore, ScanSource, StatusProbe};
use crate::config::Config;
use crate::error::ClientError;
use crate::models::{
    value_to_text, InteractionDraft, InteractionRecord, ScanOutcome, ScanResponse, SearchRequest,
    SearchResponse, SkinProfile, SysCheckResponse,
};
use crate::recommendation::{self, Recommendation};
use crate::status::Subsystem;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct VisumClient {
    http: reqwest::Client,
    server: Url,
    speech: Url,
}

impl VisumClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            server: parse_base(&config.server_address)?,
            speech: parse_base(&config.speech_address)?,
        })
    }

    pub async fn scan_bluetooth(&self) -> Result<ScanOutcome, ClientError> {
        let url = endpoint(&self.server, &["data", "scan_bluetooth"])?;
        let response: ScanResponse = self.get_json(url).await?;
        Ok(response.into())
    }

    pub async fn search_interactions(
        &self,
        address: &str,
    ) -> Result<Vec<InteractionRecord>, ClientError> {
        let url = endpoint(&self.server, &["data", "search_interactions"])?;
        let path = url.path().to_string();
        let response = self
            .http
            .post(url)
            .json(&SearchRequest { query: address })
            .send()
            .await?;

        // the backend reports lookup failures in the body, sometimes with a non-2xx status
        let status = response.status();
        let bytes = response.bytes().await?;
        match serde_json::from_slice::<SearchResponse>(&bytes) {
            Ok(body) if body.success => Ok(body.results.unwrap_or_default()),
            Ok(body) => Err(ClientError::Backend(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            )),
            Err(_) if !status.is_success() => Err(ClientError::Status {
                endpoint: path,
                status: status.as_u16(),
            }),
            Err(e) => Err(ClientError::Decode {
                endpoint: path,
                reason: e.to_string(),
            }),
        }
    }

    pub async fn save_interaction(&self, draft: &InteractionDraft) -> Result<Value, ClientError> {
        let url = endpoint(&self.server, &["data", "save_interaction"])?;
        let path = url.path().to_string();
        let response = self.http.post(url).json(draft).send().await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            log::error!("Saving interaction failed ({}): {}", status, body);
            return Err(match body.get("error").and_then(value_to_text) {
                Some(message) => ClientError::Backend(message),
                None => ClientError::Status {
                    endpoint: path,
                    status: status.as_u16(),
                },
            });
        }
        Ok(body)
    }

    pub async fn sys_check(&self, module: Subsystem) -> Result<bool, ClientError> {
        let url = endpoint(&self.server, &["data", "sys_check", module.as_str()])?;
        let path = url.path().to_string();
        let response: SysCheckResponse = self.get_json(url).await?;
        match response.info.as_str() {
            "True" => Ok(true),
            "False" => Ok(false),
            other => Err(ClientError::Decode {
                endpoint: path,
                reason: format!("unexpected info value {:?}", other),
            }),
        }
    }

    pub async fn image_check(&self, image: Vec<u8>) -> Result<SkinProfile, ClientError> {
        let url = endpoint(&self.server, &["data", "image_check"])?;
        let part = Part::bytes(image)
            .file_name("capture.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new().part("image", part);

        let path = url.path().to_string();
        let response = self.http.post(url).multipart(form).send().await?;
        decode(path, response).await
    }

    pub async fn get_recommendations(
        &self,
        color: &str,
        texture: &str,
    ) -> Result<Recommendation, ClientError> {
        let url = endpoint(&self.server, &["data", "get_recommendations", color, texture])?;
        let payload: Value = self.get_json(url).await?;
        Ok(recommendation::normalize(&payload))
    }

    pub async fn get_assistance(&self, prompt: &str) -> Result<String, ClientError> {
        let url = endpoint(&self.server, &["data", "get_assistance", prompt])?;
        let path = url.path().to_string();
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                endpoint: path,
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        Ok(assistant_text(&body))
    }

    pub async fn speak(&self, text: &str) -> Result<(), ClientError> {
        let url = endpoint(&self.speech, &["data", "speak", text])?;
        let path = url.path().to_string();
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status {
                endpoint: path,
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        let path = url.path().to_string();
        let response = self.http.get(url).send().await?;
        decode(path, response).await
    }
}

#[async_trait]
impl ScanSource for VisumClient {
    async fn scan(&self) -> Result<ScanOutcome, ClientError> {
        self.scan_bluetooth().await
    }
}

#[async_trait]
impl InteractionStore for VisumClient {
    async fn search(&self, address: &str) -> Result<Vec<InteractionRecord>, ClientError> {
        self.search_interactions(address).await
    }

    async fn save(&self, draft: &InteractionDraft) -> Result<(), ClientError> {
        let result = self.save_interaction(draft).await?;
        log::info!("Interaction saved for {}: {}", draft.device.address, result);
        Ok(())
    }
}

#[async_trait]
impl StatusProbe for VisumClient {
    async fn is_available(&self, module: Subsystem) -> Result<bool, ClientError> {
        self.sys_check(module).await
    }
}

fn parse_base(address: &str) -> Result<Url, ClientError> {
    let url = Url::parse(address).map_err(|_| ClientError::InvalidAddress(address.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidAddress(address.to_string()));
    }
    Ok(url)
}

/// Append `segments` to `base`, percent-encoding each one
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ClientError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidAddress(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn decode<T: DeserializeOwned>(path: String, response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status {
            endpoint: path,
            status: status.as_u16(),
        });
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
        endpoint: path,
        reason: e.to_string(),
    })
}

/// The assistant endpoint answers with plain text, a JSON string, or a JSON
/// object wrapping the answer.
fn assistant_text(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(text)) => text,
        Ok(Value::Object(map)) => ["response", "answer", "text"]
            .iter()
            .find_map(|key| map.get(*key).and_then(value_to_text))
            .unwrap_or_else(|| body.to_string()),
        _ => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sighting;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Answer exactly one HTTP request with `status` and `body`; returns the base URL
    async fn respond_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        base
    }

    /// Consume headers and body so closing the socket doesn't reset the connection
    async fn read_request(socket: &mut TcpStream) {
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&chunk[..n]);
            let Some(header_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= header_end + 4 + content_length {
                return;
            }
        }
    }

    fn client_for(base: String) -> VisumClient {
        let config = Config {
            server_address: base,
            request_timeout_ms: 2000,
            ..Config::default()
        };
        VisumClient::new(&config).unwrap()
    }

    fn draft() -> InteractionDraft {
        InteractionDraft {
            device: Sighting {
                address: "AA:BB".to_string(),
                name: None,
                rssi: -50,
            },
            analysis: None,
            ingredients: Vec::new(),
            products: Vec::new(),
            recommendations: None,
            saved_at: "2025-03-01T10:15:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_scan_decodes_found_device() {
        let base = respond_once(
            "200 OK",
            r#"{"found": true, "device": {"address": "AA:BB", "name": "Pixel 8", "rssi": -48}}"#,
        )
        .await;
        let outcome = client_for(base).scan_bluetooth().await.unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::Found(Sighting {
                address: "AA:BB".to_string(),
                name: Some("Pixel 8".to_string()),
                rssi: -48,
            })
        );
    }

    #[tokio::test]
    async fn test_scan_not_found() {
        let base = respond_once("200 OK", r#"{"found": false}"#).await;
        let outcome = client_for(base).scan_bluetooth().await.unwrap();
        assert_eq!(outcome, ScanOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_scan_server_error_maps_to_status() {
        let base = respond_once("503 Service Unavailable", "{}").await;
        match client_for(base).scan_bluetooth().await {
            Err(ClientError::Status { endpoint, status }) => {
                assert_eq!(status, 503);
                assert_eq!(endpoint, "/data/scan_bluetooth");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scan_garbage_body_maps_to_decode() {
        let base = respond_once("200 OK", "scanner warming up").await;
        assert!(matches!(
            client_for(base).scan_bluetooth().await,
            Err(ClientError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_failure_body_maps_to_backend_error() {
        let base = respond_once(
            "404 Not Found",
            r#"{"success": false, "error": "No interactions found"}"#,
        )
        .await;
        match client_for(base).search_interactions("AA:BB").await {
            Err(ClientError::Backend(message)) => assert_eq!(message, "No interactions found"),
            other => panic!("expected backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_success_returns_records() {
        let base = respond_once(
            "200 OK",
            r#"{"success": true, "results": [{"timestamp": "2025-03-01T10:15:00Z", "Recommendations": "Hydrate"}]}"#,
        )
        .await;
        let records = client_for(base).search_interactions("AA:BB").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].recommendations.as_deref(), Some("Hydrate"));
    }

    #[tokio::test]
    async fn test_sys_check_parses_flags() {
        let base = respond_once("200 OK", r#"{"info": "True"}"#).await;
        assert!(client_for(base).sys_check(Subsystem::Gpio).await.unwrap());

        let base = respond_once("200 OK", r#"{"info": "False"}"#).await;
        assert!(!client_for(base).sys_check(Subsystem::Kinect).await.unwrap());
    }

    #[tokio::test]
    async fn test_sys_check_rejects_unknown_flag() {
        let base = respond_once("200 OK", r#"{"info": "Maybe"}"#).await;
        assert!(matches!(
            client_for(base).sys_check(Subsystem::Gpio).await,
            Err(ClientError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_save_failure_surfaces_backend_reason() {
        let base = respond_once("500 Internal Server Error", r#"{"error": "Database unavailable"}"#).await;
        match client_for(base).save_interaction(&draft()).await {
            Err(ClientError::Backend(message)) => assert_eq!(message, "Database unavailable"),
            other => panic!("expected backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_failure_without_reason_maps_to_status() {
        let base = respond_once("500 Internal Server Error", "oops").await;
        assert!(matches!(
            client_for(base).save_interaction(&draft()).await,
            Err(ClientError::Status { status: 500, .. })
        ));
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let base = parse_base("http://localhost:5000").unwrap();
        let url = endpoint(&base, &["data", "scan_bluetooth"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/data/scan_bluetooth");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let base = parse_base("http://kiosk.local/api/").unwrap();
        let url = endpoint(&base, &["data", "sys_check", "GPIO"]).unwrap();
        assert_eq!(url.as_str(), "http://kiosk.local/api/data/sys_check/GPIO");
    }

    #[test]
    fn test_endpoint_percent_encodes_free_text() {
        let base = parse_base("http://localhost:5000").unwrap();
        let url = endpoint(&base, &["data", "get_assistance", "what/is my skin type?"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/data/get_assistance/what%2Fis%20my%20skin%20type%3F"
        );
    }

    #[test]
    fn test_invalid_base_is_rejected() {
        assert!(matches!(
            parse_base("not a url"),
            Err(ClientError::InvalidAddress(_))
        ));
        assert!(matches!(
            parse_base("mailto:kiosk@example.com"),
            Err(ClientError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_client_builds_from_default_config() {
        assert!(VisumClient::new(&Config::default()).is_ok());
    }

    #[test]
    fn test_assistant_text_shapes() {
        assert_eq!(assistant_text("Use sunscreen."), "Use sunscreen.");
        assert_eq!(assistant_text("\"Use sunscreen.\""), "Use sunscreen.");
        assert_eq!(assistant_text(r#"{"response": "Hydrate."}"#), "Hydrate.");
    }
}
