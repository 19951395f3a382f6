//! reqwest-backed Sheets values client.

use async_trait::async_trait;

use super::{send_with_retry, RetryPolicy, SheetsApi, SheetsApiError, ValueRange};

/// Static-key client for the Sheets v4 `values` endpoints.
///
/// Every request carries `key=<api key>`. When an OAuth access token is
/// configured it is also sent as a bearer token, which the API requires for
/// writes to non-public spreadsheets.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    retry: RetryPolicy,
}

impl SheetsClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        access_token: Option<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            access_token: access_token.filter(|t| !t.trim().is_empty()),
            retry,
        }
    }

    /// `{base}/spreadsheets/{id}/values/{range}{suffix}` with each segment
    /// percent-encoded.
    pub(crate) fn values_url(
        &self,
        spreadsheet_id: &str,
        range: &str,
        suffix: &str,
    ) -> Result<url::Url, SheetsApiError> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| SheetsApiError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        let last = format!("{}{}", range, suffix);
        url.path_segments_mut()
            .map_err(|_| SheetsApiError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["spreadsheets", spreadsheet_id, "values", last.as_str()]);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.query(&[("key", self.api_key.as_str())]);
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, SheetsApiError> {
        let resp = send_with_retry(self.authorize(request), &self.retry).await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(SheetsApiError::AuthRejected(status.as_u16()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetsApiError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl SheetsApi for SheetsClient {
    async fn read_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsApiError> {
        let url = self.values_url(spreadsheet_id, range, "")?;
        let request = self
            .http
            .get(url)
            .query(&[("majorDimension", "ROWS")]);

        let resp = self.execute(request).await?;
        let body: ValueRange = resp.json().await?;
        Ok(body.into_string_rows())
    }

    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<(), SheetsApiError> {
        let url = self.values_url(spreadsheet_id, range, ":append")?;
        let request = self
            .http
            .post(url)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&ValueRange::rows(rows, None));

        self.execute(request).await?;
        Ok(())
    }

    async fn update_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<(), SheetsApiError> {
        let url = self.values_url(spreadsheet_id, range, "")?;
        let request = self
            .http
            .put(url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&ValueRange::rows(rows, Some(range)));

        self.execute(request).await?;
        Ok(())
    }

    async fn clear_range(&self, spreadsheet_id: &str, range: &str) -> Result<(), SheetsApiError> {
        let url = self.values_url(spreadsheet_id, range, ":clear")?;
        let request = self.http.post(url).json(&serde_json::json!({}));

        self.execute(request).await?;
        Ok(())
    }
}
