use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope returned by mutating calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiReply {
    pub status: String,
    pub payload: ReplyPayload,
    #[serde(default)]
    pub error: Option<ReplyError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyError {
    pub kind: String,
    #[serde(default)]
    pub diverged: bool,
}

impl ApiReply {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// HTTP status plus decoded envelope.
#[derive(Debug, Clone)]
pub struct ConfigReply {
    pub http_status: u16,
    pub reply: ApiReply,
}

pub struct ConfigClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ConfigClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    fn config_url(&self) -> String {
        format!("{}/api/config", self.base_url)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Fetch the configuration. An empty `keys` asks for everything.
    pub async fn get(&self, keys: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
        let mut builder = self.authorize(self.client.get(self.config_url()));
        if !keys.is_empty() {
            builder = builder.json(&keys);
        }
        let resp = builder.send().await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(format!("config service returned error status {}: {}", status, text).into());
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Partial update.
    pub async fn update(&self, config: &Value) -> Result<ConfigReply, Box<dyn std::error::Error>> {
        let resp = self
            .authorize(self.client.put(self.config_url()))
            .json(config)
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// Import a complete snapshot.
    pub async fn import(&self, config: &Value) -> Result<ConfigReply, Box<dyn std::error::Error>> {
        let resp = self
            .authorize(self.client.post(self.config_url()))
            .json(config)
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// Reset to defaults.
    pub async fn reset(&self) -> Result<ConfigReply, Box<dyn std::error::Error>> {
        let resp = self
            .authorize(self.client.delete(self.config_url()))
            .send()
            .await?;
        Self::decode(resp).await
    }

    pub async fn health(&self) -> Result<Value, reqwest::Error> {
        self.client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?
            .json()
            .await
    }

    async fn decode(resp: Response) -> Result<ConfigReply, Box<dyn std::error::Error>> {
        let http_status = resp.status().as_u16();
        let text = resp.text().await?;
        let reply = serde_json::from_str::<ApiReply>(&text)
            .map_err(|e| format!("unexpected response ({}): {}: {}", http_status, e, text))?;
        Ok(ConfigReply { http_status, reply })
    }
}
