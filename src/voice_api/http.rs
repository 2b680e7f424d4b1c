//! HTTP voice-cloning / TTS provider

use super::normalize::{self, AudioLocation};
use super::scratch::ScratchFile;
use super::types::{SynthesisRequest, SynthesizedAudio, VoiceReference, VoiceSample};
use super::{GatewayError, VoiceGateway};
use crate::config::{UploadEncoding, VoiceApiConfig};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde_json::{json, Map, Value};
use tokio_util::io::ReaderStream;

/// Upper bound on synthesized audio (the Bot API upload limit)
const MAX_AUDIO_BYTES: u64 = 50 * 1024 * 1024;

/// Longest error body kept in error messages
const MAX_ERROR_BODY: usize = 512;

/// Voice gateway over a JSON/HTTP API with bearer auth
pub struct HttpVoiceGateway {
    client: Client,
    config: VoiceApiConfig,
}

impl HttpVoiceGateway {
    pub fn new(config: VoiceApiConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn upload_url(&self) -> String {
        self.config.endpoint(&self.config.schema.upload_path)
    }

    fn synthesis_url(&self) -> String {
        self.config.endpoint(&self.config.schema.synthesis_path)
    }

    /// Build the upload body from the staged sample
    async fn upload_body(
        &self,
        sample: &VoiceSample,
        staged: &ScratchFile,
    ) -> Result<UploadBody, GatewayError> {
        let extension = sample.format.extension();
        match self.config.schema.upload_encoding {
            UploadEncoding::Multipart => {
                let (file, len) = staged.open().await?;
                let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), len)
                    .file_name(format!("{}.{extension}", sample.label))
                    .mime_str(sample.format.mime())
                    .map_err(|e| GatewayError::io(format!("Invalid sample MIME type: {e}")))?;
                let form = Form::new()
                    .text("label", sample.label.clone())
                    .text("format", extension)
                    .part("file", part);
                Ok(UploadBody::Multipart(form))
            }
            UploadEncoding::Base64Json => {
                let bytes = staged.read_all().await?;
                Ok(UploadBody::Json(json!({
                    "audio": BASE64.encode(bytes),
                    "format": extension,
                    "label": sample.label,
                })))
            }
        }
    }

    fn synthesis_body(&self, request: &SynthesisRequest) -> Value {
        let mut body = Map::new();
        body.insert("text".to_string(), json!(request.text));
        body.insert(
            self.config.schema.voice_id_field.clone(),
            json!(request.voice.as_str()),
        );
        body.insert("emotion".to_string(), json!(request.emotion));
        body.insert("speed".to_string(), json!(request.speed));
        body.insert(
            "format".to_string(),
            json!(self.config.output_format.extension()),
        );
        if let Some(model) = &self.config.schema.model {
            body.insert("model".to_string(), json!(model));
        }
        Value::Object(body)
    }

    /// Fetch audio that the API published at a URL
    async fn fetch_remote(&self, url: &str, staged: &ScratchFile) -> Result<(), GatewayError> {
        tracing::debug!(url = %url, "Fetching synthesized audio");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(&e))?;
        let response = ensure_success(response).await?;
        staged
            .write_stream(response.bytes_stream(), MAX_AUDIO_BYTES)
            .await?;
        Ok(())
    }
}

enum UploadBody {
    Multipart(Form),
    Json(Value),
}

#[async_trait]
impl VoiceGateway for HttpVoiceGateway {
    async fn establish_voice_reference(
        &self,
        sample: &VoiceSample,
    ) -> Result<VoiceReference, GatewayError> {
        let staged = ScratchFile::create(
            &self.config.scratch_dir,
            "sample-",
            sample.format.extension(),
        )?;
        staged.write_all(&sample.bytes).await?;

        let request = self
            .client
            .post(self.upload_url())
            .bearer_auth(&self.config.api_key);
        let request = match self.upload_body(sample, &staged).await? {
            UploadBody::Multipart(form) => request.multipart(form),
            UploadBody::Json(body) => request.json(&body),
        };

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(&e))?;
        let response = ensure_success(response).await?;
        let body = response.text().await.map_err(|e| {
            GatewayError::transport(format!("Failed to read response: {e}"))
        })?;

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            GatewayError::malformed(format!(
                "Failed to parse clone response: {e} - body: {}",
                truncate(&body)
            ))
        })?;
        normalize::check_embedded_status(&value)?;

        normalize::extract_reference(&value, &self.config.schema.voice_id_field).ok_or_else(|| {
            GatewayError::malformed(format!("No voice id in response: {}", truncate(&body)))
        })
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio, GatewayError> {
        let format = self.config.output_format;
        let staged = ScratchFile::create(&self.config.scratch_dir, "speech-", format.extension())?;

        let response = self
            .client
            .post(self.synthesis_url())
            .bearer_auth(&self.config.api_key)
            .json(&self.synthesis_body(request))
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(&e))?;
        let response = ensure_success(response).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        if normalize::is_binary_content_type(content_type.as_deref()) {
            staged
                .write_stream(response.bytes_stream(), MAX_AUDIO_BYTES)
                .await?;
        } else {
            let body = response.text().await.map_err(|e| {
                GatewayError::transport(format!("Failed to read response: {e}"))
            })?;
            let value: Value = serde_json::from_str(&body).map_err(|e| {
                GatewayError::malformed(format!(
                    "Failed to parse synthesis response: {e} - body: {}",
                    truncate(&body)
                ))
            })?;
            normalize::check_embedded_status(&value)?;

            match normalize::locate_audio(&value, self.config.schema.inline_audio)? {
                AudioLocation::Inline(bytes) => staged.write_all(&bytes).await?,
                AudioLocation::Remote(url) => self.fetch_remote(&url, &staged).await?,
            }
        }

        let bytes = staged.read_all().await?;
        if bytes.is_empty() {
            return Err(GatewayError::malformed("Synthesized audio is empty"));
        }
        Ok(SynthesizedAudio { bytes, format })
    }
}

/// Turn a non-success status into `RemoteRejected`
async fn ensure_success(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::rejected(
        status.as_u16(),
        format!("HTTP {status}: {}", truncate(&body)),
    ))
}

fn truncate(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY {
        let head: String = body.chars().take(MAX_ERROR_BODY).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}
