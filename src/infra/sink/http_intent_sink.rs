use crate::domain::models::side_effect::SideEffect;
use crate::domain::ports::IntentSink;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::error;

pub struct HttpIntentSink {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpIntentSink {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
        }
    }
}

#[derive(Serialize)]
struct IntentEnvelope<'a> {
    #[serde(rename = "type")]
    intent_type: &'a str,
    booking_id: &'a str,
    payload: &'a serde_json::Value,
}

#[async_trait]
impl IntentSink for HttpIntentSink {
    async fn deliver(&self, intent: &SideEffect) -> Result<(), AppError> {
        let payload = serde_json::to_value(&intent.payload.0)
            .map_err(|e| AppError::InternalWithMsg(format!("Intent payload serialization error: {}", e)))?;

        let envelope = IntentEnvelope {
            intent_type: &intent.intent_type,
            booking_id: &intent.booking_id,
            payload: &payload,
        };

        let res = self.client.post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&envelope)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Intent sink connection error: {}", e);
                error!("{}", msg);
                AppError::InternalWithMsg(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Intent sink rejected delivery. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::InternalWithMsg(msg));
        }

        Ok(())
    }
}
