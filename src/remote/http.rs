use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};

use super::{RemoteAnnotationApi, RemoteCapabilities, RemoteError, RemoteResult};
use crate::annotations::Annotation;
use crate::config::RemoteSettings;

/// Remote annotation API over HTTP + JSON
pub struct HttpAnnotationApi {
    client: Client,
    base_url: String,
    add_path: Option<String>,
    delete_path: Option<String>,
    token: Option<String>,
}

impl HttpAnnotationApi {
    pub fn new(settings: &RemoteSettings) -> Result<Self, RemoteError> {
        // Normalize URL - ensure no trailing slash
        let base_url = settings.base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(RemoteError::InvalidUrl(
                "URL must start with http:// or https://".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            add_path: settings.add_path.clone(),
            delete_path: settings.delete_path.clone(),
            token: settings.token.clone(),
        })
    }

    /// Build full URL for a path
    fn url(&self, path: &str) -> RemoteResult<Url> {
        let path = path.trim_start_matches('/');
        let raw = if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Url::parse(&raw).map_err(|e| RemoteError::InvalidUrl(format!("{}: {}", raw, e)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check_status(response: Response) -> RemoteResult<Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::AuthFailed),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(RemoteError::Server {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

/// Read the assigned id from a response body, accepting string or numeric ids
fn assigned_id(body: &serde_json::Value) -> Option<String> {
    match body.get("id")? {
        serde_json::Value::String(id) if !id.is_empty() => Some(id.clone()),
        serde_json::Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[async_trait]
impl RemoteAnnotationApi for HttpAnnotationApi {
    fn capabilities(&self) -> RemoteCapabilities {
        RemoteCapabilities {
            add: self.add_path.is_some(),
            delete: self.delete_path.is_some(),
        }
    }

    async fn add_annotation(&self, annotation: &Annotation) -> RemoteResult<Annotation> {
        let path = self
            .add_path
            .as_deref()
            .ok_or(RemoteError::NotConfigured("add"))?;
        let url = self.url(path)?;

        let response = self
            .authorize(self.client.post(url).json(annotation))
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let body: serde_json::Value = response.json().await?;
        let id = assigned_id(&body).ok_or(RemoteError::MissingId)?;

        log::debug!("Remote assigned id {} to annotation {}", id, annotation.id);
        let mut confirmed = annotation.clone();
        confirmed.id = id;
        Ok(confirmed)
    }

    async fn delete_annotation(&self, annotation: &Annotation) -> RemoteResult<()> {
        let path = self
            .delete_path
            .as_deref()
            .ok_or(RemoteError::NotConfigured("delete"))?;
        let mut url = self.url(path)?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push(&annotation.id);

        let response = self.authorize(self.client.delete(url)).send().await?;

        // Already gone remotely, so a repeated delete still succeeds
        if response.status() == StatusCode::NOT_FOUND {
            log::debug!("Remote annotation {} already deleted", annotation.id);
            return Ok(());
        }
        Self::check_status(response).await?;
        Ok(())
    }
}
