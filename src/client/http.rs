use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, Url };
use std::time::Duration;
use thiserror::Error;

use crate::models::api::{
    ConversationsResponse,
    PostMessageRequest,
    PostMessageResponse,
    StatusResponse,
};
use crate::models::chat::Conversation;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered with status {0}")]
    Status(u16),
    #[error("invalid service URL: {0}")]
    InvalidUrl(String),
}

/// Transport used by [`super::ChatClient`] to reach the conversation service.
#[async_trait]
pub trait ConversationApi: Send + Sync {
    async fn fetch_conversations(&self) -> Result<Vec<Conversation>, ClientError>;

    async fn send_message(
        &self,
        conversation_id: &str,
        text: &str
    ) -> Result<PostMessageResponse, ClientError>;

    async fn delete_conversation(&self, conversation_id: &str) -> Result<StatusResponse, ClientError>;
}

pub struct HttpConversationApi {
    http: HttpClient,
    base_url: Url,
}

impl HttpConversationApi {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        let http = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(resp)
    }
}

#[async_trait]
impl ConversationApi for HttpConversationApi {
    async fn fetch_conversations(&self) -> Result<Vec<Conversation>, ClientError> {
        let url = self.endpoint(&["conversations"])?;
        debug!("GET {}", url);
        let resp = Self::check(self.http.get(url).send().await?)?;
        Ok(resp.json::<ConversationsResponse>().await?.conversations)
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        text: &str
    ) -> Result<PostMessageResponse, ClientError> {
        let url = self.endpoint(&["conversations", conversation_id, "messages"])?;
        debug!("POST {}", url);
        let body = PostMessageRequest { message: Some(text.to_string()) };
        let resp = Self::check(self.http.post(url).json(&body).send().await?)?;
        Ok(resp.json::<PostMessageResponse>().await?)
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<StatusResponse, ClientError> {
        let url = self.endpoint(&["conversations", conversation_id])?;
        debug!("DELETE {}", url);
        let resp = Self::check(self.http.delete(url).send().await?)?;
        Ok(resp.json::<StatusResponse>().await?)
    }
}
