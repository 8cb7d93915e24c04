use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    domain::{BankingItem, NewStarter, NewStarterId},
    error::ApiError,
    protocol::{
        ConfirmCollectionRequest, CreateBankingItemRequest, DirectoryUser,
        GenerateCredentialsRequest, NewStarterForm,
    },
};
use tracing::debug;
use url::Url;

use crate::{
    error::{RemoteError, RemoteResult},
    settings::ClientSettings,
};

/// The onboarding API as seen by the stores.
///
/// Response bodies are the bare records; no envelope is unwrapped.
#[async_trait]
pub trait OnboardingRemote: Send + Sync {
    async fn list_banking_items(&self) -> RemoteResult<Vec<BankingItem>>;
    async fn create_banking_item(
        &self,
        request: &CreateBankingItemRequest,
    ) -> RemoteResult<BankingItem>;
    async fn confirm_collection(
        &self,
        request: &ConfirmCollectionRequest,
    ) -> RemoteResult<BankingItem>;
    async fn search_directory_users(&self, query: &str) -> RemoteResult<Vec<DirectoryUser>>;
    async fn list_new_starters(&self) -> RemoteResult<Vec<NewStarter>>;
    async fn create_new_starter(&self, form: &NewStarterForm) -> RemoteResult<NewStarter>;
    async fn generate_credentials(
        &self,
        request: &GenerateCredentialsRequest,
    ) -> RemoteResult<Vec<NewStarter>>;
    async fn send_welcome_email(&self, starter_id: &NewStarterId) -> RemoteResult<NewStarter>;
}

#[derive(Debug, Clone)]
pub struct HttpRemote {
    http: Client,
    base_url: Url,
}

impl HttpRemote {
    pub fn new(settings: &ClientSettings) -> RemoteResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(http, settings.api_url.clone()))
    }

    pub fn with_client(http: Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> RemoteResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> RemoteResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().clone();
        let body = response.text().await?;
        debug!(%url, status = status.as_u16(), bytes = body.len(), "onboarding api response");

        if !status.is_success() {
            return Err(match serde_json::from_str::<ApiError>(&body) {
                Ok(api_error) => RemoteError::Rejected {
                    status: status.as_u16(),
                    code: Some(api_error.code),
                    message: api_error.message,
                },
                Err(_) if body.trim().is_empty() => RemoteError::rejected(
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("request failed"),
                ),
                Err(_) => RemoteError::rejected(status.as_u16(), body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl OnboardingRemote for HttpRemote {
    async fn list_banking_items(&self) -> RemoteResult<Vec<BankingItem>> {
        let url = self.endpoint(&["banking-items"])?;
        Self::execute(self.http.get(url)).await
    }

    async fn create_banking_item(
        &self,
        request: &CreateBankingItemRequest,
    ) -> RemoteResult<BankingItem> {
        let url = self.endpoint(&["banking-items"])?;
        Self::execute(self.http.post(url).json(request)).await
    }

    async fn confirm_collection(
        &self,
        request: &ConfirmCollectionRequest,
    ) -> RemoteResult<BankingItem> {
        let url = self.endpoint(&["banking-items", "confirm"])?;
        Self::execute(self.http.post(url).json(request)).await
    }

    async fn search_directory_users(&self, query: &str) -> RemoteResult<Vec<DirectoryUser>> {
        let url = self.endpoint(&["ad", "users"])?;
        Self::execute(self.http.get(url).query(&[("q", query)])).await
    }

    async fn list_new_starters(&self) -> RemoteResult<Vec<NewStarter>> {
        let url = self.endpoint(&["new-starters"])?;
        Self::execute(self.http.get(url)).await
    }

    async fn create_new_starter(&self, form: &NewStarterForm) -> RemoteResult<NewStarter> {
        let url = self.endpoint(&["new-starters"])?;
        Self::execute(self.http.post(url).json(form)).await
    }

    async fn generate_credentials(
        &self,
        request: &GenerateCredentialsRequest,
    ) -> RemoteResult<Vec<NewStarter>> {
        let url = self.endpoint(&["new-starters", "generate-credentials"])?;
        Self::execute(self.http.post(url).json(request)).await
    }

    async fn send_welcome_email(&self, starter_id: &NewStarterId) -> RemoteResult<NewStarter> {
        let url = self.endpoint(&["new-starters", starter_id.as_str(), "send-welcome"])?;
        Self::execute(self.http.post(url)).await
    }
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
