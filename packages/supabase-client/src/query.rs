//! PostgREST table queries.
//!
//! A small builder over the `/rest/v1/<table>` endpoints: column selection
//! (including embedded relations such as `*, organizations(*)`), equality
//! filters, inserts and filtered updates.

use std::fmt;

use reqwest::{Method, Request};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, SupabaseError};
use crate::SupabaseClient;

/// A relation name, optionally schema-qualified (`auth.users`).
///
/// PostgREST only routes bare table names; the schema travels in the
/// `Accept-Profile` / `Content-Profile` headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub schema: Option<String>,
    pub table: String,
}

impl Relation {
    pub fn parse(name: &str) -> Self {
        match name.split_once('.') {
            Some((schema, table)) if !schema.is_empty() && !table.is_empty() => Self {
                schema: Some(schema.to_string()),
                table: table.to_string(),
            },
            _ => Self {
                schema: None,
                table: name.to_string(),
            },
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.table),
            None => f.write_str(&self.table),
        }
    }
}

enum Operation {
    Select,
    Insert(Value),
    Update(Value),
}

/// Query against one relation. Built by [`SupabaseClient::from`].
pub struct TableQuery<'a> {
    client: &'a SupabaseClient,
    relation: Relation,
    columns: Option<String>,
    filters: Vec<(String, String)>,
    operation: Operation,
}

impl<'a> TableQuery<'a> {
    pub(crate) fn new(client: &'a SupabaseClient, relation: &str) -> Self {
        Self {
            client,
            relation: Relation::parse(relation),
            columns: None,
            filters: Vec::new(),
            operation: Operation::Select,
        }
    }

    /// Columns to return, PostgREST syntax. Defaults to `*`.
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = Some(columns.into());
        self
    }

    /// Add a `column = value` filter.
    pub fn eq(mut self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.filters.push((column.into(), format!("eq.{}", value)));
        self
    }

    /// Turn the query into an insert of `row` (an object or an array of objects).
    pub fn insert<T: Serialize + ?Sized>(mut self, row: &T) -> Result<Self> {
        let body = serde_json::to_value(row)
            .map_err(|e| SupabaseError::Parse(format!("Failed to serialize insert: {}", e)))?;
        self.operation = Operation::Insert(body);
        Ok(self)
    }

    /// Turn the query into an update applying `changes` to the filtered rows.
    pub fn update<T: Serialize + ?Sized>(mut self, changes: &T) -> Result<Self> {
        let body = serde_json::to_value(changes)
            .map_err(|e| SupabaseError::Parse(format!("Failed to serialize update: {}", e)))?;
        self.operation = Operation::Update(body);
        Ok(self)
    }

    /// Build the HTTP request without sending it.
    pub fn build(self) -> Result<Request> {
        let (method, body) = match self.operation {
            Operation::Select => (Method::GET, None),
            Operation::Insert(body) => (Method::POST, Some(body)),
            Operation::Update(body) => {
                if self.filters.is_empty() {
                    return Err(SupabaseError::Config(format!(
                        "Refusing to update every row of '{}': add a filter",
                        self.relation
                    )));
                }
                (Method::PATCH, Some(body))
            }
        };

        let url = format!("{}/rest/v1/{}", self.client.base_url, self.relation.table);

        let mut params = Vec::with_capacity(self.filters.len() + 1);
        params.push((
            "select".to_string(),
            self.columns.unwrap_or_else(|| "*".to_string()),
        ));
        params.extend(self.filters);

        let mut builder = self.client.request(method.clone(), &url).query(&params);

        if let Some(schema) = &self.relation.schema {
            let header = if method == Method::GET {
                "Accept-Profile"
            } else {
                "Content-Profile"
            };
            builder = builder.header(header, schema);
        }

        if let Some(body) = body {
            builder = builder
                .header("Prefer", "return=representation")
                .json(&body);
        }

        builder
            .build()
            .map_err(|e| SupabaseError::Config(format!("Invalid request: {}", e)))
    }

    /// Send the query and decode the returned rows.
    pub async fn execute<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let client = self.client;
        let relation = self.relation.to_string();
        let request = self.build()?;
        let method = request.method().clone();

        let response = client.http_client.execute(request).await.map_err(|e| {
            warn!(%method, %relation, error = %e, "PostgREST request failed");
            SupabaseError::Network(e.to_string())
        })?;

        let status = response.status();
        debug!(%method, %relation, status = status.as_u16(), "PostgREST request");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SupabaseError::from_response(status.as_u16(), &body));
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| SupabaseError::Parse(format!("Failed to decode rows from '{}': {}", relation, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> SupabaseClient {
        SupabaseClient::new("https://demo.supabase.co/", "anon-key")
    }

    fn query_pairs(request: &Request) -> Vec<(String, String)> {
        request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_relation_parse() {
        assert_eq!(
            Relation::parse("auth.users"),
            Relation {
                schema: Some("auth".into()),
                table: "users".into()
            }
        );
        assert_eq!(Relation::parse("profiles").schema, None);
        assert_eq!(Relation::parse(".profiles").table, ".profiles");
        assert_eq!(Relation::parse("auth.users").to_string(), "auth.users");
    }

    #[test]
    fn test_select_with_filter() {
        let client = client();
        let request = client
            .from("organizations")
            .eq("slug", "tech-solutions")
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().path(), "/rest/v1/organizations");
        assert_eq!(
            query_pairs(&request),
            vec![
                ("select".to_string(), "*".to_string()),
                ("slug".to_string(), "eq.tech-solutions".to_string()),
            ]
        );
        assert_eq!(request.headers()["apikey"], "anon-key");
        assert_eq!(request.headers()["authorization"], "Bearer anon-key");
        assert!(request.headers().get("prefer").is_none());
    }

    #[test]
    fn test_embedded_select_is_encoded() {
        let client = client();
        let request = client
            .from("profiles")
            .select("*, organizations(*)")
            .eq("id", "7f1c")
            .build()
            .unwrap();

        assert!(request.url().as_str().contains("organizations%28*%29"));
        assert_eq!(
            query_pairs(&request)[0],
            ("select".to_string(), "*, organizations(*)".to_string())
        );
    }

    #[test]
    fn test_schema_qualified_select_uses_accept_profile() {
        let client = client();
        let request = client
            .from("auth.users")
            .select("id, email")
            .eq("email", "admin@tech-solutions.com")
            .build()
            .unwrap();

        assert_eq!(request.url().path(), "/rest/v1/users");
        assert_eq!(request.headers()["accept-profile"], "auth");
        assert_eq!(
            query_pairs(&request)[1],
            (
                "email".to_string(),
                "eq.admin@tech-solutions.com".to_string()
            )
        );
    }

    #[test]
    fn test_insert_requests_representation() {
        let client = client();
        let request = client
            .from("organizations")
            .insert(&json!({"name": "Tech Solutions Inc", "slug": "tech-solutions"}))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.headers()["prefer"], "return=representation");
        assert_eq!(request.headers()["content-type"], "application/json");

        let body: Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["slug"], "tech-solutions");
    }

    #[test]
    fn test_schema_qualified_write_uses_content_profile() {
        let client = client();
        let request = client
            .from("app.profiles")
            .insert(&json!({"id": "1"}))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.headers()["content-profile"], "app");
        assert!(request.headers().get("accept-profile").is_none());
    }

    #[test]
    fn test_filtered_update() {
        let client = client();
        let request = client
            .from("profiles")
            .update(&json!({"role": "admin"}))
            .unwrap()
            .eq("id", "42")
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(
            query_pairs(&request)[1],
            ("id".to_string(), "eq.42".to_string())
        );
    }

    #[test]
    fn test_unfiltered_update_is_refused() {
        let client = client();
        let result = client
            .from("profiles")
            .update(&json!({"role": "admin"}))
            .unwrap()
            .build();

        match result {
            Err(SupabaseError::Config(message)) => assert!(message.contains("profiles")),
            other => panic!("expected config error, got {:?}", other.map(|r| r.url().clone())),
        }
    }
}
