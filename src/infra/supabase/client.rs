use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde_json::{Map, Value};
use tracing::debug;

use super::config::StoreConfig;
use crate::fetch::auth::ApiKey;
use crate::fetch::{BasicClient, HttpClient};
use crate::reference::data::category_name_of;
use crate::services::reference_api::{CATEGORIES_TABLE, PLATES_TABLE, PlateRow, ReferenceApi};

const PLATE_COLUMN: &str = "placa";
const GROUP_COLUMN: &str = "grupo";
const CATEGORY_COLUMN: &str = "categoria";
const CATEGORY_NAME_COLUMN: &str = "nome";

/// [`ReferenceApi`] over a Supabase project's PostgREST endpoint.
///
/// Every request carries the project key twice, as `apikey` and as a bearer
/// token, which is what the hosted gateway expects for anonymous keys.
pub struct SupabaseClient<C = ApiKey<ApiKey<BasicClient>>> {
    rest_url: Url,
    http: C,
}

impl SupabaseClient {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let http = ApiKey::new(
            ApiKey::bearer(BasicClient::new(), &config.key)?,
            "apikey",
            &config.key,
        )?;
        Self::with_client(&config.url, http)
    }
}

impl<C: HttpClient> SupabaseClient<C> {
    /// Uses `http` for transport. `base_url` is the project URL, without the
    /// `/rest/v1` suffix.
    pub fn with_client(base_url: &str, http: C) -> Result<Self> {
        let base = format!("{}/rest/v1/", base_url.trim_end_matches('/'));
        let rest_url = Url::parse(&base).with_context(|| format!("Invalid store URL '{base_url}'"))?;
        Ok(Self { rest_url, http })
    }

    /// Builds `<rest>/<table>?<filters>`; each filter is an `eq.` match.
    fn table_url(&self, table: &str, filters: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.rest_url.join(table)?;
        if !filters.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (column, value) in filters {
                pairs.append_pair(column, &format!("eq.{value}"));
            }
        }
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url, body: Option<Value>) -> Result<reqwest::Response> {
        debug!(%method, path = url.path(), query = url.query().unwrap_or(""), "Reference store request");

        let mut req = reqwest::Request::new(method.clone(), url.clone());
        if let Some(body) = body {
            req.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            req.headers_mut().insert(
                HeaderName::from_static("prefer"),
                HeaderValue::from_static("return=minimal"),
            );
            *req.body_mut() = Some(serde_json::to_vec(&body)?.into());
        }

        let response = self
            .http
            .execute(req)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send {} {}: {}", method, url.path(), e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!(
                "Reference store returned status {} for {} {}: {}",
                status,
                method,
                url.path(),
                body
            );
        }
        Ok(response)
    }

    async fn select(&self, table: &str, order: &str) -> Result<Vec<Value>> {
        let mut url = self.table_url(table, &[])?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", order);

        let response = self.send(Method::GET, url, None).await?;
        response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse {} rows: {}", table, e))
    }

    async fn patch(&self, table: &str, filters: &[(&str, &str)], body: Value) -> Result<()> {
        let url = self.table_url(table, filters)?;
        self.send(Method::PATCH, url, Some(body)).await?;
        Ok(())
    }
}

/// `{"<column>": value}` body for a PATCH or POST.
fn single_field(column: &str, value: impl Into<Value>) -> Value {
    let mut body = Map::new();
    body.insert(column.to_string(), value.into());
    Value::Object(body)
}

#[async_trait]
impl<C: HttpClient> ReferenceApi for SupabaseClient<C> {
    async fn fetch_plate_rows(&self) -> Result<Vec<Map<String, Value>>> {
        let order = format!("{GROUP_COLUMN}.asc,{PLATE_COLUMN}.asc");
        let rows = self.select(PLATES_TABLE, &order).await?;

        // Rows that are not JSON objects carry no fields and are dropped.
        Ok(rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect())
    }

    async fn fetch_categories(&self) -> Result<Vec<String>> {
        let order = format!("{CATEGORY_NAME_COLUMN}.asc");
        let rows = self.select(CATEGORIES_TABLE, &order).await?;
        Ok(rows.iter().filter_map(category_name_of).collect())
    }

    async fn insert_plate(&self, row: &PlateRow) -> Result<()> {
        let url = self.table_url(PLATES_TABLE, &[])?;
        self.send(Method::POST, url, Some(serde_json::to_value(row)?))
            .await?;
        Ok(())
    }

    async fn update_plate(&self, plate: &str, row: &PlateRow) -> Result<()> {
        self.patch(PLATES_TABLE, &[(PLATE_COLUMN, plate)], serde_json::to_value(row)?)
            .await
    }

    async fn delete_plate(&self, plate: &str) -> Result<()> {
        let url = self.table_url(PLATES_TABLE, &[(PLATE_COLUMN, plate)])?;
        self.send(Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn set_group_category(&self, group: &str, category: Option<&str>) -> Result<()> {
        self.patch(
            PLATES_TABLE,
            &[(GROUP_COLUMN, group)],
            single_field(CATEGORY_COLUMN, category),
        )
        .await
    }

    async fn replace_row_category(&self, from: &str, to: Option<&str>) -> Result<()> {
        self.patch(
            PLATES_TABLE,
            &[(CATEGORY_COLUMN, from)],
            single_field(CATEGORY_COLUMN, to),
        )
        .await
    }

    async fn insert_category(&self, name: &str) -> Result<()> {
        let url = self.table_url(CATEGORIES_TABLE, &[])?;
        self.send(Method::POST, url, Some(single_field(CATEGORY_NAME_COLUMN, name)))
            .await?;
        Ok(())
    }

    async fn rename_category(&self, from: &str, to: &str) -> Result<()> {
        self.patch(
            CATEGORIES_TABLE,
            &[(CATEGORY_NAME_COLUMN, from)],
            single_field(CATEGORY_NAME_COLUMN, to),
        )
        .await
    }

    async fn delete_category(&self, name: &str) -> Result<()> {
        let url = self.table_url(CATEGORIES_TABLE, &[(CATEGORY_NAME_COLUMN, name)])?;
        self.send(Method::DELETE, url, None).await?;
        Ok(())
    }
}
