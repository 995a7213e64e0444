//! Efficiency dashboard endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use persistence::repositories::MetricBucketRepository;
use serde::{Deserialize, Serialize};
use shared::pagination::{PageInfo, PageQuery};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::metric_bucket::EfficiencyRow;

/// Query parameters for the efficiency dashboard.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencyQuery {
    /// Shift-date to report on; defaults to the current UTC date.
    pub date: Option<NaiveDate>,

    pub page: Option<i64>,
    pub per_page: Option<i64>,

    /// Case-insensitive substring filter on device name and alias.
    pub search: Option<String>,

    /// Return only buckets updated after this instant (RFC 3339), for
    /// polling consumers.
    pub updated_since: Option<DateTime<Utc>>,
}

/// Paged efficiency dashboard response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencyResponse {
    pub data: Vec<EfficiencyRow>,
    pub pagination: PageInfo,
    pub as_of: DateTime<Utc>,
}

/// Per-shift efficiency rows for an organization's devices.
///
/// GET /api/v1/organizations/:org_id/efficiency
pub async fn list_efficiency(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    Query(query): Query<EfficiencyQuery>,
) -> Result<Json<EfficiencyResponse>, ApiError> {
    let shift_date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let paging = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };

    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let repo = MetricBucketRepository::new(state.pool.clone());
    let (entities, total) = repo
        .list_efficiency(
            org_id,
            shift_date,
            search,
            query.updated_since,
            paging.effective_per_page(),
            paging.offset(),
        )
        .await?;

    let data = entities
        .into_iter()
        .map(EfficiencyRow::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(EfficiencyResponse {
        data,
        pagination: PageInfo::new(paging.effective_page(), paging.effective_per_page(), total),
        as_of: Utc::now(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_efficiency_query_deserializes_camel_case() {
        let query: EfficiencyQuery = serde_json::from_str(
            r#"{"date": "2024-03-11", "page": 2, "perPage": 50, "search": "loom"}"#,
        )
        .unwrap();
        assert_eq!(
            query.date,
            Some(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap())
        );
        assert_eq!(query.page, Some(2));
        assert_eq!(query.per_page, Some(50));
        assert_eq!(query.search.as_deref(), Some("loom"));
        assert!(query.updated_since.is_none());
    }
}
