//! Client for the face-encoding sidecar service.
//!
//! Embedding extraction runs out of process (the model runtime is a separate
//! deployment); this client posts raw image bytes and gets back either an
//! embedding or `null` when no face was found. The request timeout bounds
//! the one slow external call in the scan path.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::engine::FaceEncoder;

#[derive(Clone)]
pub struct HttpFaceEncoder {
    client: reqwest::Client,
    url: String,
}

#[derive(Deserialize)]
struct EncodeResponse {
    embedding: Option<Vec<f64>>,
}

impl HttpFaceEncoder {
    pub fn new(url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build face encoder client")?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl FaceEncoder for HttpFaceEncoder {
    async fn encode(&self, image: &[u8]) -> anyhow::Result<Option<Vec<f64>>> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .context("face encoder request failed")?
            .error_for_status()
            .context("face encoder returned an error status")?;

        let body: EncodeResponse = response
            .json()
            .await
            .context("invalid face encoder response")?;

        Ok(body.embedding.filter(|e| !e.is_empty()))
    }
}
