// Table and RPC access
//
// Thin typed wrappers over the REST surface: equality-filtered selects,
// inserts/upserts returning the stored rows, patch updates and RPC calls.
// Filters use the `column=eq.value` convention.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::client::BackendClient;
use crate::error::Error;

/// Sort direction for [`Select::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// A select query against one table.
///
/// ```ignore
/// let rows: Vec<AppUserRecord> = Select::new("app_users")
///     .eq("email", "a@b.c")
///     .limit(1)
///     .fetch(&client)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Select {
    table: String,
    columns: String,
    params: Vec<(String, String)>,
}

impl Select {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_owned(),
            columns: "*".into(),
            params: Vec::new(),
        }
    }

    /// Restrict the returned columns (default `*`).
    pub fn columns(mut self, columns: &str) -> Self {
        columns.clone_into(&mut self.columns);
        self
    }

    /// `column = value`
    pub fn eq(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        self.params.push((column.to_owned(), format!("eq.{value}")));
        self
    }

    /// `column >= value`
    pub fn gte(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        self.params.push((column.to_owned(), format!("gte.{value}")));
        self
    }

    pub fn order(mut self, column: &str, order: Order) -> Self {
        let dir = match order {
            Order::Ascending => "asc",
            Order::Descending => "desc",
        };
        self.params.push(("order".into(), format!("{column}.{dir}")));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.params.push(("limit".into(), limit.to_string()));
        self
    }

    /// Run the query and return every matching row.
    pub async fn fetch<T: DeserializeOwned>(&self, client: &BackendClient) -> Result<Vec<T>, Error> {
        let mut url = client.rest_url(&self.table)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", &self.columns);
            for (k, v) in &self.params {
                pairs.append_pair(k, v);
            }
        }
        debug!("GET {url}");
        let resp = client
            .execute(client.authorize(client.http().get(url)))
            .await?;
        client.handle_response(resp).await
    }

    /// Run the query and return the first row, if any.
    ///
    /// "No rows" is `Ok(None)`, never an error: callers use it to decide
    /// whether to try the next lookup source.
    pub async fn fetch_one<T: DeserializeOwned>(
        self,
        client: &BackendClient,
    ) -> Result<Option<T>, Error> {
        let rows: Vec<T> = self.limit(1).fetch(client).await?;
        Ok(rows.into_iter().next())
    }
}

impl BackendClient {
    /// Insert one row and return the stored representation.
    pub async fn insert<B, T>(&self, table: &str, row: &B) -> Result<Option<T>, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.rest_url(table)?;
        debug!("POST {url}");
        let request = self
            .authorize(self.http().post(url))
            .header("Prefer", "return=representation")
            .json(row);
        let resp = self.execute(request).await?;
        let rows: Vec<T> = self.handle_response(resp).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert or merge one row keyed on `on_conflict`.
    pub async fn upsert<B, T>(
        &self,
        table: &str,
        on_conflict: &str,
        row: &B,
    ) -> Result<Option<T>, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut url = self.rest_url(table)?;
        url.query_pairs_mut().append_pair("on_conflict", on_conflict);
        debug!("POST (upsert) {url}");
        let request = self
            .authorize(self.http().post(url))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(row);
        let resp = self.execute(request).await?;
        let rows: Vec<T> = self.handle_response(resp).await?;
        Ok(rows.into_iter().next())
    }

    /// Patch every row where `column = value`.
    pub async fn update_eq<B>(
        &self,
        table: &str,
        column: &str,
        value: &str,
        patch: &B,
    ) -> Result<(), Error>
    where
        B: Serialize + ?Sized,
    {
        let mut url = self.rest_url(table)?;
        url.query_pairs_mut()
            .append_pair(column, &format!("eq.{value}"));
        debug!("PATCH {url}");
        let request = self
            .authorize(self.http().patch(url))
            .header("Prefer", "return=minimal")
            .json(patch);
        let resp = self.execute(request).await?;
        self.handle_empty(resp).await
    }

    /// Call a database function (`POST /rest/v1/rpc/{function}`).
    pub async fn rpc<B, T>(&self, function: &str, args: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.rpc_url(function)?;
        debug!("POST {url}");
        let request = self
            .authorize(self.http().post(url))
            .json(args);
        let resp = self.execute(request).await?;
        self.handle_response(resp).await
    }

    /// Call a database function whose result is ignored (`void` functions
    /// answer with an empty body).
    pub async fn rpc_void<B>(&self, function: &str, args: &B) -> Result<(), Error>
    where
        B: Serialize + ?Sized,
    {
        let url = self.rpc_url(function)?;
        debug!("POST {url}");
        let request = self
            .authorize(self.http().post(url))
            .json(args);
        let resp = self.execute(request).await?;
        self.handle_empty(resp).await
    }
}
