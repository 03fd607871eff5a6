//! HTTP client for the policy-execution engine.

use async_trait::async_trait;
use reqwest::Client;

use callflow_policy::{PolicyDocument, PolicyStore, TransportError};

use crate::credential::ApiCredential;
use crate::response::{expect_success, read_json, request_error};

/// Authenticated client for one organization's policy documents.
#[derive(Debug, Clone)]
pub struct PolicyEngineClient {
    http: Client,
    base_url: String,
    credential: ApiCredential,
}

impl PolicyEngineClient {
    pub fn new(base_url: impl Into<String>, credential: ApiCredential) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential,
        }
    }

    /// Share a connection pool with other clients against the same host.
    pub fn with_http(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    fn policies_url(&self) -> String {
        format!(
            "{}/organisations/{}/policies",
            self.base_url, self.credential.organization_id
        )
    }
}

#[async_trait]
impl PolicyStore for PolicyEngineClient {
    async fn create(&self, document: &PolicyDocument) -> Result<PolicyDocument, TransportError> {
        self.credential.ensure_fresh()?;
        let response = self
            .http
            .post(self.policies_url())
            .header("Authorization", self.credential.bearer())
            .json(document)
            .send()
            .await
            .map_err(request_error)?;
        read_json(response).await
    }

    async fn update(
        &self,
        policy_id: u64,
        document: &PolicyDocument,
    ) -> Result<PolicyDocument, TransportError> {
        self.credential.ensure_fresh()?;
        let response = self
            .http
            .put(format!("{}/{policy_id}", self.policies_url()))
            .header("Authorization", self.credential.bearer())
            .json(document)
            .send()
            .await
            .map_err(request_error)?;
        read_json(response).await
    }

    async fn delete(&self, policy_id: u64) -> Result<(), TransportError> {
        self.credential.ensure_fresh()?;
        let response = self
            .http
            .delete(format!("{}/{policy_id}", self.policies_url()))
            .header("Authorization", self.credential.bearer())
            .send()
            .await
            .map_err(request_error)?;
        expect_success(response).await
    }
}
