use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use stockbot_core::config::SheetsConfig;
use stockbot_core::{CellAddress, CellStore, CellValue, SheetRef, StoreError};
use tracing::debug;

use crate::auth::{ServiceAccountTokenSource, TokenSource};

/// `spreadsheets.values` payload, used for both reads and writes.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    major_dimension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<Vec<serde_json::Value>>>,
}

/// Google Sheets v4 client over REST. Build it once at startup and share it.
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenSource>,
}

impl SheetsClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|error| StoreError::Transport(format!("invalid sheets base url: {error}")))?;
        Ok(Self { http, base_url, tokens })
    }

    pub fn from_config(config: &SheetsConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| {
                StoreError::Transport(format!("could not build http client: {error}"))
            })?;
        let tokens = Arc::new(ServiceAccountTokenSource::new(http.clone(), config));
        Self::new(http, &config.api_base_url, tokens)
    }

    fn values_url(&self, sheet: &SheetRef, range: &str) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Transport("sheets base url cannot carry a path".to_owned()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", sheet.sheet_id.as_str(), "values", range]);
        Ok(url)
    }

    async fn bearer(&self) -> Result<String, StoreError> {
        let token = self.tokens.access_token().await?;
        Ok(format!("Bearer {}", token.expose_secret()))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status { status: status.as_u16(), body })
}

fn transport(error: reqwest::Error) -> StoreError {
    StoreError::Transport(error.to_string())
}

#[async_trait]
impl CellStore for SheetsClient {
    async fn get_cell(
        &self,
        sheet: &SheetRef,
        cell: &CellAddress,
    ) -> Result<Option<CellValue>, StoreError> {
        let range = sheet.range(cell);
        let url = self.values_url(sheet, &range)?;
        let response = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.bearer().await?)
            .query(&[("valueRenderOption", "UNFORMATTED_VALUE")])
            .send()
            .await
            .map_err(transport)?;

        let payload: ValueRange = check_status(response)
            .await?
            .json()
            .await
            .map_err(|error| StoreError::Decode(error.to_string()))?;

        let value = payload
            .values
            .as_ref()
            .and_then(|rows| rows.first())
            .and_then(|row| row.first())
            .and_then(CellValue::from_json);
        debug!(
            event_name = "store.sheets.read",
            range = %range,
            found = value.is_some(),
            "read cell"
        );
        Ok(value)
    }

    async fn update_cell(
        &self,
        sheet: &SheetRef,
        cell: &CellAddress,
        value: i64,
    ) -> Result<(), StoreError> {
        let range = sheet.range(cell);
        let url = self.values_url(sheet, &range)?;
        let body = ValueRange {
            range: Some(range.clone()),
            major_dimension: Some("ROWS".to_owned()),
            values: Some(vec![vec![serde_json::Value::from(value)]]),
        };

        let response = self
            .http
            .put(url)
            .header(reqwest::header::AUTHORIZATION, self.bearer().await?)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        check_status(response).await?;

        debug!(event_name = "store.sheets.write", range = %range, value, "wrote cell");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use stockbot_core::{
        CellAddress, CellStore, CellValue, Item, ItemId, SheetRef, Storage, StorageId, StoreError,
    };

    use super::SheetsClient;
    use crate::auth::StaticTokenSource;

    #[derive(Clone, Default)]
    struct FakeSheets {
        cells: Arc<Mutex<HashMap<String, serde_json::Value>>>,
        requests: Arc<Mutex<Vec<String>>>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("authorization").and_then(|value| value.to_str().ok())
            == Some("Bearer test-token")
    }

    async fn read_values(
        State(state): State<FakeSheets>,
        Path((sheet_id, range)): Path<(String, String)>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> Result<Json<serde_json::Value>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        if sheet_id == "forbidden" {
            return Err(StatusCode::FORBIDDEN);
        }
        let render = query.get("valueRenderOption").cloned().unwrap_or_default();
        state.requests.lock().expect("lock").push(format!("GET {range} {render}"));

        let cells = state.cells.lock().expect("lock");
        Ok(Json(match cells.get(&range) {
            Some(value) => serde_json::json!({ "range": range, "values": [[value]] }),
            None => serde_json::json!({ "range": range, "majorDimension": "ROWS" }),
        }))
    }

    async fn write_values(
        State(state): State<FakeSheets>,
        Path((_sheet_id, range)): Path<(String, String)>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> Result<Json<serde_json::Value>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        let input = query.get("valueInputOption").cloned().unwrap_or_default();
        state.requests.lock().expect("lock").push(format!("PUT {range} {input}"));
        state.cells.lock().expect("lock").insert(range.clone(), body["values"][0][0].clone());
        Ok(Json(serde_json::json!({ "updatedRange": range, "updatedCells": 1 })))
    }

    async fn spawn_fake(state: FakeSheets) -> String {
        let app = Router::new()
            .route(
                "/v4/spreadsheets/{sheet_id}/values/{range}",
                get(read_values).put(write_values),
            )
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{address}")
    }

    fn client(base_url: &str, token: &str) -> SheetsClient {
        SheetsClient::new(reqwest::Client::new(), base_url, Arc::new(StaticTokenSource::new(token)))
            .expect("client")
    }

    fn cell(column: &str, row: u32) -> CellAddress {
        CellAddress::for_stock(
            &Item { id: ItemId("widget".to_owned()), name: "Widget".to_owned(), row },
            &Storage {
                id: StorageId("a".to_owned()),
                name: "A".to_owned(),
                column: column.to_owned(),
            },
        )
    }

    #[tokio::test]
    async fn reads_single_unformatted_cell_value() {
        let fake = FakeSheets::default();
        fake.cells.lock().expect("lock").insert("Main Stock!B3".to_owned(), serde_json::json!(10));
        let base_url = spawn_fake(fake.clone()).await;

        let value = client(&base_url, "test-token")
            .get_cell(&SheetRef::new("sheet-1", "Main Stock"), &cell("B", 3))
            .await
            .expect("read");

        assert_eq!(value, Some(CellValue::Number(10.0)));
        assert_eq!(
            fake.requests.lock().expect("lock").as_slice(),
            ["GET Main Stock!B3 UNFORMATTED_VALUE".to_owned()]
        );
    }

    #[tokio::test]
    async fn empty_range_reads_as_none() {
        let base_url = spawn_fake(FakeSheets::default()).await;

        let value = client(&base_url, "test-token")
            .get_cell(&SheetRef::new("sheet-1", "Inventory"), &cell("C", 9))
            .await
            .expect("read");

        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn writes_with_user_entered_input_mode() {
        let fake = FakeSheets::default();
        let base_url = spawn_fake(fake.clone()).await;
        let client = client(&base_url, "test-token");
        let sheet = SheetRef::new("sheet-1", "Inventory");

        client.update_cell(&sheet, &cell("B", 3), 15).await.expect("write");
        let value = client.get_cell(&sheet, &cell("B", 3)).await.expect("read back");

        assert_eq!(value, Some(CellValue::Number(15.0)));
        assert_eq!(
            fake.requests.lock().expect("lock").first().map(String::as_str),
            Some("PUT Inventory!B3 USER_ENTERED")
        );
    }

    #[tokio::test]
    async fn http_failures_propagate_as_status_errors() {
        let base_url = spawn_fake(FakeSheets::default()).await;

        let unauthorized = client(&base_url, "wrong-token")
            .get_cell(&SheetRef::new("sheet-1", "Inventory"), &cell("B", 3))
            .await
            .expect_err("bad token");
        assert!(matches!(unauthorized, StoreError::Status { status: 401, .. }));

        let forbidden = client(&base_url, "test-token")
            .get_cell(&SheetRef::new("forbidden", "Inventory"), &cell("B", 3))
            .await
            .expect_err("no permission");
        assert!(matches!(forbidden, StoreError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn unreachable_store_is_a_transport_error() {
        let error = client("http://127.0.0.1:9", "test-token")
            .update_cell(&SheetRef::new("sheet-1", "Inventory"), &cell("B", 3), 1)
            .await
            .expect_err("nothing listens on the discard port");
        assert!(matches!(error, StoreError::Transport(_)));
    }
}
