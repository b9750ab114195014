//! Firefly III ledger client.
//!
//! - `GET  /api/v1/categories` (paginated) for the category set
//! - `PUT  /api/v1/transactions/{id}` to assign a category to every split
//!
//! Every written-back split also gets a marker tag so categorized
//! transactions can be found in the ledger.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use autocat_core::{CancellationToken, CategoryMap, TransactionId};

use super::{LedgerClient, LedgerError};

pub const DEFAULT_TAG: &str = "AI categorized";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Upper bound on category pages fetched per call.
const MAX_CATEGORY_PAGES: u32 = 50;

#[derive(Debug, Clone)]
pub struct FireflyConfig {
    pub base_url: String,
    pub personal_token: String,
    pub tag: String,
}

impl FireflyConfig {
    pub fn new(base_url: impl Into<String>, personal_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            personal_token: personal_token.into(),
            tag: DEFAULT_TAG.to_string(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct CategoryPage {
    #[serde(default)]
    data: Vec<CategoryResource>,
    #[serde(default)]
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct CategoryResource {
    id: String,
    attributes: CategoryAttributes,
}

#[derive(Debug, Deserialize)]
struct CategoryAttributes {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    current_page: u32,
    total_pages: u32,
}

#[derive(Debug, Serialize)]
struct UpdateTransactionGroup<'a> {
    apply_rules: bool,
    fire_webhooks: bool,
    transactions: Vec<SplitUpdate<'a>>,
}

#[derive(Debug, Serialize)]
struct SplitUpdate<'a> {
    transaction_journal_id: JsonValue,
    category_id: &'a str,
    tags: Vec<String>,
}

/// HTTP client for a Firefly III instance.
#[derive(Debug, Clone)]
pub struct FireflyClient {
    client: Client,
    config: FireflyConfig,
}

impl FireflyClient {
    pub fn new(config: FireflyConfig) -> Result<Self, LedgerError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, LedgerError> {
        let response = request
            .bearer_auth(&self.config.personal_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    fn split_update<'a>(&self, split: &JsonValue, category_id: &'a str) -> SplitUpdate<'a> {
        let mut tags: Vec<String> = split
            .get("tags")
            .and_then(JsonValue::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(JsonValue::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if !tags.iter().any(|t| *t == self.config.tag) {
            tags.push(self.config.tag.clone());
        }

        SplitUpdate {
            transaction_journal_id: split
                .get("transaction_journal_id")
                .cloned()
                .unwrap_or(JsonValue::Null),
            category_id,
            tags,
        }
    }
}

/// Run a ledger call, dropping it as soon as `cancel` fires.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    call: impl Future<Output = Result<T, LedgerError>>,
) -> Result<T, LedgerError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LedgerError::Cancelled),
        result = call => result,
    }
}

#[async_trait]
impl LedgerClient for FireflyClient {
    async fn get_categories(&self, cancel: &CancellationToken) -> Result<CategoryMap, LedgerError> {
        let mut categories = CategoryMap::new();
        let mut page = 1;

        loop {
            let request = self
                .client
                .get(self.url("/api/v1/categories"))
                .query(&[("page", page)]);
            let body: CategoryPage = until_cancelled(cancel, async {
                self.send(request)
                    .await?
                    .json()
                    .await
                    .map_err(|e| LedgerError::Decode(e.to_string()))
            })
            .await?;

            for resource in body.data {
                categories.insert(resource.attributes.name, resource.id);
            }

            let pagination = body.meta.and_then(|m| m.pagination);
            match pagination {
                Some(p) if p.current_page < p.total_pages && page < MAX_CATEGORY_PAGES => {
                    page += 1;
                }
                _ => break,
            }
        }

        debug!(count = categories.len(), "fetched ledger categories");
        Ok(categories)
    }

    async fn set_category(
        &self,
        transaction_id: &TransactionId,
        transactions: &[JsonValue],
        category_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), LedgerError> {
        let body = UpdateTransactionGroup {
            apply_rules: true,
            fire_webhooks: true,
            transactions: transactions
                .iter()
                .map(|split| self.split_update(split, category_id))
                .collect(),
        };

        let request = self
            .client
            .put(self.url(&format!("/api/v1/transactions/{transaction_id}")))
            .json(&body);
        until_cancelled(cancel, self.send(request)).await?;

        debug!(transaction_id = %transaction_id, category_id, "category written back to ledger");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        extract::{Path, Query},
        http::{HeaderMap, StatusCode},
        routing::{get, put},
    };
    use serde_json::{Value, json};

    use super::*;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: String) -> FireflyClient {
        FireflyClient::new(FireflyConfig::new(base_url, "token-123")).unwrap()
    }

    #[tokio::test]
    async fn categories_are_collected_across_pages() {
        let app = Router::new().route(
            "/api/v1/categories",
            get(|headers: HeaderMap, Query(q): Query<std::collections::HashMap<String, u32>>| async move {
                assert_eq!(headers["authorization"], "Bearer token-123");
                let page = q.get("page").copied().unwrap_or(1);
                let (id, name) = if page == 1 { ("1", "Groceries") } else { ("2", "Shopping") };
                Json(json!({
                    "data": [{ "id": id, "attributes": { "name": name } }],
                    "meta": { "pagination": { "current_page": page, "total_pages": 2 } }
                }))
            }),
        );
        let base = serve(app).await;

        let categories = client(base)
            .get_categories(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(categories.names(), vec!["Groceries".to_string(), "Shopping".to_string()]);
        assert_eq!(categories.get("Shopping"), Some("2"));
    }

    #[tokio::test]
    async fn write_back_tags_every_split() {
        let captured: Arc<Mutex<Option<(String, Value)>>> = Arc::new(Mutex::new(None));
        let sink = captured.clone();
        let app = Router::new().route(
            "/api/v1/transactions/:id",
            put(move |Path(id): Path<String>, Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    *sink.lock().unwrap() = Some((id, body));
                    StatusCode::OK
                }
            }),
        );
        let base = serve(app).await;

        let splits = vec![json!({
            "transaction_journal_id": "981",
            "tags": ["online"]
        })];
        client(base)
            .set_category(&TransactionId::new("4711"), &splits, "7", &CancellationToken::new())
            .await
            .unwrap();

        let (id, body) = captured.lock().unwrap().clone().unwrap();
        assert_eq!(id, "4711");
        assert_eq!(body["apply_rules"], true);
        assert_eq!(body["fire_webhooks"], true);
        assert_eq!(body["transactions"][0]["transaction_journal_id"], "981");
        assert_eq!(body["transactions"][0]["category_id"], "7");
        assert_eq!(body["transactions"][0]["tags"], json!(["online", "AI categorized"]));
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_slow_ledger() {
        let app = Router::new().route(
            "/api/v1/transactions/:id",
            put(|| async {
                tokio::time::sleep(std::time::Duration::from_secs(10)).await;
                StatusCode::OK
            }),
        );
        let base = serve(app).await;
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = client(base)
            .set_category(&TransactionId::new("1"), &[json!({})], "7", &token)
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::Cancelled));
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_category_fetch() {
        let token = CancellationToken::new();
        token.cancel();

        let err = client("http://127.0.0.1:9".to_string())
            .get_categories(&token)
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::Cancelled));
    }

    #[tokio::test]
    async fn error_status_surfaces_status_and_body() {
        let app = Router::new().route(
            "/api/v1/categories",
            get(|| async { (StatusCode::UNAUTHORIZED, "bad token") }),
        );
        let base = serve(app).await;

        let err = client(base)
            .get_categories(&CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            LedgerError::Http { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad token");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
