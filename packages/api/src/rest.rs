//! Row reads and writes through the hosted REST storage service.
//!
//! Requests carry the session's access token when signed in, so the service's
//! row-level policies scope every read and write to the current user.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use store::{BackendError, SelectQuery, TableBackend};

use crate::client::BackendClient;
use crate::error::decode;

#[async_trait]
impl TableBackend for BackendClient {
    async fn select(&self, query: SelectQuery) -> Result<Vec<Value>, BackendError> {
        let url = self.endpoint(&format!("rest/v1/{}", query.table))?;
        let mut params = vec![("select", query.column_list())];
        if let Some(order) = &query.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(("order", format!("{}.{direction}", order.column)));
        }

        let request = self
            .request(Method::GET, url)
            .bearer_auth(self.bearer().await)
            .header("Accept", "application/json")
            .query(&params);
        let response = self.send(request).await?;
        response.json::<Vec<Value>>().await.map_err(decode)
    }

    async fn insert(&self, table: &str, record: Value) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        let request = self
            .request(Method::POST, url)
            .bearer_auth(self.bearer().await)
            .header("Prefer", "return=minimal")
            .json(&record);
        self.send(request).await?;
        tracing::debug!(table, "Row inserted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use store::{AppConfig, AuthBackend, LinkRepository, NewLink};
    use std::sync::Arc;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> BackendClient {
        BackendClient::new(&AppConfig::new(server.uri(), "anon")).unwrap()
    }

    #[tokio::test]
    async fn test_list_query_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/links"))
            .and(query_param(
                "select",
                "id,url,title,description,tags,favorite,created_at",
            ))
            .and(query_param("order", "created_at.desc"))
            .and(header("apikey", "anon"))
            .and(header("authorization", "Bearer anon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": "b",
                    "url": "https://newer.dev",
                    "title": "Newer",
                    "description": null,
                    "tags": ["x"],
                    "favorite": true,
                    "created_at": "2024-05-02T10:00:00+00:00"
                },
                {
                    "id": "a",
                    "url": "https://older.dev",
                    "title": null,
                    "description": null,
                    "tags": null,
                    "favorite": false,
                    "created_at": "2024-05-01T10:00:00+00:00"
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let repo = LinkRepository::new(Arc::new(client_for(&server)));
        let links = repo.list().await.unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].display_title(), "Newer");
        assert_eq!(links[1].display_title(), "https://older.dev");
    }

    #[tokio::test]
    async fn test_signed_in_requests_use_session_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt-u1",
                "expires_in": 3600,
                "user": { "id": "u1" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/links"))
            .and(header("authorization", "Bearer jwt-u1"))
            .and(header("prefer", "return=minimal"))
            .and(body_json(json!({
                "url": "https://rust-lang.org",
                "title": null,
                "description": null,
                "tags": ["rust"],
                "favorite": false
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = Arc::new(client_for(&server));
        client
            .sign_in_with_password("a@x.com", "secret1")
            .await
            .unwrap();
        let repo = LinkRepository::new(client);
        repo.insert(&NewLink {
            url: "https://rust-lang.org".into(),
            title: None,
            description: None,
            tags: Some(vec!["rust".into()]),
            favorite: false,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_insert_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "code": "42501",
                "details": null,
                "hint": null,
                "message": "new row violates row-level security policy for table \"profiles\""
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .insert("profiles", json!({ "id": "u1", "email": "a@x.com" }))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BackendError::api(
                403,
                "new row violates row-level security policy for table \"profiles\""
            )
        );
    }

    #[tokio::test]
    async fn test_select_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/links"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.select(SelectQuery::new("links")).await.unwrap_err();
        assert_eq!(err, BackendError::api(503, "Service Unavailable"));
    }
}
