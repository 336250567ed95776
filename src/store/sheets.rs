//! Implements the `Store` trait using the `sheets::Client` to interact with a
//! Google sheet. Each month partition is a tab of the configured spreadsheet.

use crate::config::Credentials;
use crate::store::{PartitionStatus, Store};
use crate::Result;
use anyhow::Context;
use sheets::types::{
    AddSheetRequest, BatchUpdateSpreadsheetRequest, DateTimeRenderOption, Dimension,
    GridProperties, InsertDataOption, Request, SheetProperties, ValueInputOption, ValueRange,
    ValueRenderOption,
};
use sheets::ClientError;
use tracing::trace;

/// Implements the `Store` trait against the Google Sheets API. Holds the
/// credential material so the access token can be refreshed between calls.
pub struct GoogleStore {
    spreadsheet_id: String,
    credentials: Credentials,
    client: sheets::Client,
}

impl GoogleStore {
    pub fn new(spreadsheet_id: impl Into<String>, credentials: Credentials) -> Self {
        let client = credentials.client();
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            credentials,
            client,
        }
    }

    /// Refreshes the access token if a refresh token is available.
    async fn refresh_client(&mut self) -> Result<()> {
        if self.credentials.refresh_token().is_empty() {
            return Ok(());
        }
        let _ = self
            .client
            .refresh_access_token()
            .await
            .map_err(map_client_error)
            .context("Failed to refresh Google access token")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for GoogleStore {
    async fn get_partition(&mut self, label: &str) -> Result<PartitionStatus> {
        trace!("get_partition for {label}");
        self.refresh_client().await?;
        let response = self
            .client
            .spreadsheets()
            .get(&self.spreadsheet_id, false, &[])
            .await
            .map_err(map_client_error)
            .context("Failed to fetch spreadsheet metadata")?;
        let found = response
            .body
            .sheets
            .iter()
            .filter_map(|sheet| sheet.properties.as_ref())
            .any(|properties| properties.title == label);
        Ok(if found {
            PartitionStatus::Found
        } else {
            PartitionStatus::NotFound
        })
    }

    async fn create_partition(
        &mut self,
        label: &str,
        column_count: i64,
        row_capacity: i64,
    ) -> Result<()> {
        trace!("create_partition for {label}");
        self.refresh_client().await?;
        let request = BatchUpdateSpreadsheetRequest {
            include_spreadsheet_in_response: None,
            requests: vec![Request {
                add_banding: None,
                add_chart: None,
                add_conditional_format_rule: None,
                add_data_source: None,
                add_dimension_group: None,
                add_filter_view: None,
                add_named_range: None,
                add_protected_range: None,
                add_sheet: Some(AddSheetRequest {
                    properties: Some(SheetProperties {
                        data_source_sheet_properties: None,
                        grid_properties: Some(GridProperties {
                            column_count,
                            column_group_control_after: false,
                            frozen_column_count: 0,
                            frozen_row_count: 0,
                            hide_gridlines: false,
                            row_count: row_capacity,
                            row_group_control_after: false,
                        }),
                        hidden: false,
                        index: 0,
                        right_to_left: false,
                        sheet_id: 0,
                        sheet_type: None,
                        tab_color: None,
                        tab_color_style: None,
                        title: label.to_string(),
                    }),
                }),
                add_slicer: None,
                append_cells: None,
                append_dimension: None,
                auto_fill: None,
                auto_resize_dimensions: None,
                clear_basic_filter: None,
                copy_paste: None,
                create_developer_metadata: None,
                cut_paste: None,
                delete_banding: None,
                delete_conditional_format_rule: None,
                delete_data_source: None,
                delete_developer_metadata: None,
                delete_dimension: None,
                delete_dimension_group: None,
                delete_duplicates: None,
                delete_embedded_object: None,
                delete_filter_view: None,
                delete_named_range: None,
                delete_protected_range: None,
                delete_range: None,
                delete_sheet: None,
                duplicate_filter_view: None,
                duplicate_sheet: None,
                find_replace: None,
                insert_dimension: None,
                insert_range: None,
                merge_cells: None,
                move_dimension: None,
                paste_data: None,
                randomize_range: None,
                refresh_data_source: None,
                repeat_cell: None,
                set_basic_filter: None,
                set_data_validation: None,
                sort_range: None,
                text_to_columns: None,
                trim_whitespace: None,
                unmerge_cells: None,
                update_banding: None,
                update_borders: None,
                update_cells: None,
                update_chart_spec: None,
                update_conditional_format_rule: None,
                update_data_source: None,
                update_developer_metadata: None,
                update_dimension_group: None,
                update_dimension_properties: None,
                update_embedded_object_border: None,
                update_embedded_object_position: None,
                update_filter_view: None,
                update_named_range: None,
                update_protected_range: None,
                update_sheet_properties: None,
                update_slicer_spec: None,
                update_spreadsheet_properties: None,
            }],
            response_include_grid_data: None,
            response_ranges: vec![],
        };
        self.client
            .spreadsheets()
            .batch_update(&self.spreadsheet_id, &request)
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to create sheet {label}"))?;
        Ok(())
    }

    async fn write_row(&mut self, label: &str, range: &str, row: Vec<String>) -> Result<()> {
        trace!("write_row for {label}!{range}");
        self.refresh_client().await?;
        let range = format!("{label}!{range}");
        let body = ValueRange {
            major_dimension: Some(Dimension::Rows),
            range: range.clone(),
            values: vec![row],
        };
        self.client
            .spreadsheets()
            .values_update(
                &self.spreadsheet_id,
                &range,
                false,
                DateTimeRenderOption::FormattedString,
                ValueRenderOption::FormattedValue,
                ValueInputOption::UserEntered,
                &body,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to write {range}"))?;
        Ok(())
    }

    async fn append_row(&mut self, label: &str, row: Vec<String>) -> Result<()> {
        trace!("append_row for {label}");
        self.refresh_client().await?;
        let range = format!("{label}!A1");
        let body = ValueRange {
            major_dimension: Some(Dimension::Rows),
            range: String::new(),
            values: vec![row],
        };
        self.client
            .spreadsheets()
            .values_append(
                &self.spreadsheet_id,
                &range,
                false,
                InsertDataOption::InsertRows,
                DateTimeRenderOption::FormattedString,
                ValueRenderOption::FormattedValue,
                ValueInputOption::UserEntered,
                &body,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to append a row to {label}"))?;
        Ok(())
    }

    async fn read_column_range(&mut self, label: &str, columns: &str) -> Result<Vec<Vec<String>>> {
        trace!("read_column_range for {label}!{columns}");
        self.refresh_client().await?;
        let range = format!("{label}!{columns}");
        let response = self
            .client
            .spreadsheets()
            .values_get(
                &self.spreadsheet_id,
                &range,
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to fetch {range}"))?;
        Ok(response.body.values)
    }
}

fn map_client_error(e: sheets::ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
    };
    Err::<(), ClientError>(e).context(error_name).err().unwrap()
}
