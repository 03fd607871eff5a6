//! HTTP client for the event-subscription service.

use async_trait::async_trait;
use reqwest::Client;

use callflow_policy::{
    EventSubscription, SubscriptionDraft, SubscriptionService, SubscriptionUpdate, TransportError,
};

use crate::credential::ApiCredential;
use crate::response::{expect_success, read_json, request_error};

/// Authenticated client for one organization's event subscriptions.
#[derive(Debug, Clone)]
pub struct EventSubscriptionClient {
    http: Client,
    base_url: String,
    credential: ApiCredential,
}

impl EventSubscriptionClient {
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

    fn subscriptions_url(&self) -> String {
        format!(
            "{}/organisations/{}/event-subscriptions",
            self.base_url, self.credential.organization_id
        )
    }
}

#[async_trait]
impl SubscriptionService for EventSubscriptionClient {
    async fn list(&self, policy_id: u64) -> Result<Vec<EventSubscription>, TransportError> {
        self.credential.ensure_fresh()?;
        let response = self
            .http
            .get(self.subscriptions_url())
            .query(&[("policyId", policy_id.to_string())])
            .header("Authorization", self.credential.bearer())
            .send()
            .await
            .map_err(request_error)?;
        read_json(response).await
    }

    async fn create(&self, draft: &SubscriptionDraft) -> Result<EventSubscription, TransportError> {
        self.credential.ensure_fresh()?;
        let response = self
            .http
            .post(self.subscriptions_url())
            .header("Authorization", self.credential.bearer())
            .json(draft)
            .send()
            .await
            .map_err(request_error)?;
        read_json(response).await
    }

    async fn update(
        &self,
        subscription_id: &str,
        changes: &SubscriptionUpdate,
    ) -> Result<EventSubscription, TransportError> {
        self.credential.ensure_fresh()?;
        let response = self
            .http
            .patch(format!("{}/{subscription_id}", self.subscriptions_url()))
            .header("Authorization", self.credential.bearer())
            .json(changes)
            .send()
            .await
            .map_err(request_error)?;
        read_json(response).await
    }

    async fn delete(&self, subscription_id: &str) -> Result<(), TransportError> {
        self.credential.ensure_fresh()?;
        let response = self
            .http
            .delete(format!("{}/{subscription_id}", self.subscriptions_url()))
            .header("Authorization", self.credential.bearer())
            .send()
            .await
            .map_err(request_error)?;
        expect_success(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credential() -> ApiCredential {
        ApiCredential::new("tok-1", "org-1", Utc::now() + Duration::hours(1))
    }

    fn subscription_body(id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "eventType": "salesforce",
            "policyId": 100,
            "enabled": true,
            "config": { "nodeId": "n1" },
            "organizationId": "org-1"
        })
    }

    #[tokio::test]
    async fn list_filters_by_policy_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/organisations/org-1/event-subscriptions"))
            .and(query_param("policyId", "100"))
            .and(header("Authorization", "Bearer tok-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([subscription_body("sub-1", "Event 1")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = EventSubscriptionClient::new(server.uri(), credential());
        let subs = client.list(100).await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].id, "sub-1");
        assert_eq!(subs[0].node_id(), Some("n1"));
    }

    #[tokio::test]
    async fn create_posts_draft_without_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/organisations/org-1/event-subscriptions"))
            .and(body_json(json!({
                "name": "Event 1",
                "eventType": "salesforce",
                "policyId": 100,
                "enabled": true,
                "config": { "nodeId": "n1" }
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(subscription_body("sub-1", "Event 1")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = EventSubscriptionClient::new(server.uri(), credential());
        let draft = SubscriptionDraft {
            name: "Event 1".into(),
            event_type: "salesforce".into(),
            policy_id: 100,
            enabled: true,
            config: json!({ "nodeId": "n1" }),
        };
        let created = client.create(&draft).await.unwrap();
        assert_eq!(created.id, "sub-1");
    }

    #[tokio::test]
    async fn update_patches_the_subscription_path() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/organisations/org-1/event-subscriptions/sub-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(subscription_body("sub-1", "Renamed")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = EventSubscriptionClient::new(server.uri(), credential());
        let changes = SubscriptionUpdate {
            name: "Renamed".into(),
            event_type: "salesforce".into(),
            enabled: true,
            config: None,
        };
        let updated = client.update("sub-1", &changes).await.unwrap();
        assert_eq!(updated.name, "Renamed");
    }

    #[tokio::test]
    async fn delete_maps_missing_subscription_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/organisations/org-1/event-subscriptions/sub-gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let client = EventSubscriptionClient::new(server.uri(), credential());
        let err = client.delete("sub-gone").await.unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn expired_credential_short_circuits() {
        let server = MockServer::start().await;
        let expired = ApiCredential::new("tok-1", "org-1", Utc::now() - Duration::minutes(1));
        let client = EventSubscriptionClient::new(server.uri(), expired);
        let err = client.list(100).await.unwrap_err();
        assert!(matches!(err, TransportError::CredentialExpired { .. }));
    }
}
