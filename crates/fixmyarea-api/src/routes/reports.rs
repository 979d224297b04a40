//! `/reports` — complaint aggregates for administrators.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use fixmyarea_core::error::FixMyAreaError;
use fixmyarea_core::models::user::Role;
use fixmyarea_records::ReportDimension;
use serde::Deserialize;
use surrealdb::Connection;

use crate::error::ApiResult;
use crate::extract::{ApiQuery, AuthUser};
use crate::state::AppState;

pub fn routes<C: Connection>() -> Router<AppState<C>> {
    Router::new()
        .route("/complaints", get(complaints::<C>))
        .route("/staff-performance", get(staff_performance::<C>))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportQuery {
    group_by: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

/// RFC 3339 timestamps pass through; bare `YYYY-MM-DD` dates cover the
/// whole day.
fn parse_bound(raw: Option<&str>, bound: Bound) -> Result<Option<DateTime<Utc>>, FixMyAreaError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| FixMyAreaError::validation(format!("Invalid date: {raw}")))?;
    let time = match bound {
        Bound::Start => NaiveTime::MIN,
        Bound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN),
    };
    Ok(Some(date.and_time(time).and_utc()))
}

async fn complaints<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require(&[Role::Admin, Role::Staff])?;
    let dimension = match query.group_by.as_deref() {
        Some(raw) => raw.parse::<ReportDimension>()?,
        None => ReportDimension::Status,
    };
    let from = parse_bound(query.start_date.as_deref(), Bound::Start)?;
    let to = parse_bound(query.end_date.as_deref(), Bound::End)?;
    Ok(Json(state.reports.group_by(dimension, from, to).await?))
}

async fn staff_performance<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    user.require(&[Role::Admin])?;
    Ok(Json(state.reports.staff_performance().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn bare_dates_cover_the_whole_day() {
        let start = parse_bound(Some("2024-03-01"), Bound::Start).unwrap().unwrap();
        let end = parse_bound(Some("2024-03-01"), Bound::End).unwrap().unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert!(end > Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap());
    }

    #[test]
    fn timestamps_and_blanks() {
        let at = parse_bound(Some("2024-03-01T10:00:00+02:00"), Bound::Start)
            .unwrap()
            .unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
        assert_eq!(parse_bound(Some(" "), Bound::End).unwrap(), None);
        assert!(parse_bound(Some("yesterday"), Bound::Start).is_err());
    }
}
