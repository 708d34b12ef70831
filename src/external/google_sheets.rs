use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::{
    config::GoogleConfig,
    entities::TripLogRow,
    error::{trip_log_failed_error, Error},
    external::{google_auth::ServiceAccount, TripLedger},
};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Appends trip rows to the mileage spreadsheet.
pub struct GoogleSheets {
    http: reqwest::Client,
    account: Arc<ServiceAccount>,
    sheet_id: String,
    sheet_name: String,
}

impl GoogleSheets {
    pub fn new(http: reqwest::Client, account: Arc<ServiceAccount>, config: &GoogleConfig) -> Self {
        Self {
            http,
            account,
            sheet_id: config.sheet_id.clone(),
            sheet_name: config.sheet_name.clone(),
        }
    }
}

#[async_trait]
impl TripLedger for GoogleSheets {
    #[tracing::instrument(skip(self, row))]
    async fn append(&self, row: &TripLogRow) -> Result<(), Error> {
        let token = self.account.access_token().await?;
        let range = format!("{}!A1", self.sheet_name);

        let res = self
            .http
            .post(format!("{}/{}/values/{}:append", SHEETS_API, self.sheet_id, range))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(token)
            .json(&json!({ "values": [row.to_cells()] }))
            .send()
            .await
            .map_err(trip_log_failed_error)?;

        if !res.status().is_success() {
            return Err(trip_log_failed_error(res.status()));
        }

        Ok(())
    }
}
