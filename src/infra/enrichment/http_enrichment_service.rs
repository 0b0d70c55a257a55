use crate::domain::models::attendee_context::EnrichmentProfile;
use crate::domain::ports::EnrichmentService;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::error;

pub struct HttpEnrichmentService {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpEnrichmentService {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
        }
    }
}

#[derive(Deserialize)]
struct PersonResponse {
    display_name: Option<String>,
    company: Option<String>,
    title: Option<String>,
}

#[async_trait]
impl EnrichmentService for HttpEnrichmentService {
    async fn lookup(&self, email: &str) -> Result<Option<EnrichmentProfile>, AppError> {
        let res = self.client.get(&self.api_url)
            .query(&[("email", email)])
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Enrichment service connection error: {}", e);
                error!("{}", msg);
                AppError::InternalWithMsg(msg)
            })?;

        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !res.status().is_success() {
            let status = res.status();
            let msg = format!("Enrichment service failed. Status: {}", status);
            error!("{}", msg);
            return Err(AppError::InternalWithMsg(msg));
        }

        let person: PersonResponse = res.json().await.map_err(|e| {
            let msg = format!("Enrichment response parse error: {}", e);
            error!("{}", msg);
            AppError::InternalWithMsg(msg)
        })?;

        Ok(Some(EnrichmentProfile {
            display_name: person.display_name,
            company: person.company,
            title: person.title,
        }))
    }
}
