//! `GET /api/shifts`: the shift calendar.
//!
//! Query parameters (all optional): `from` and `to` (`YYYY-MM-DD`, inclusive)
//! and `controller_id`. The response is one object per date with shifts, in
//! date order; within a date shifts are ordered morning, evening, night.

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::NaiveDate;
use serde::Serialize;
use turnos_core::{
  shift::CalendarEntry,
  store::{ShiftQuery, ShiftStore},
};

use crate::{AppState, Result, error::Error};

/// All shifts of one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
  pub date:   NaiveDate,
  pub shifts: Vec<CalendarEntry>,
}

/// Group date-ordered entries by date, keeping their order.
pub fn group_by_date(entries: Vec<CalendarEntry>) -> Vec<CalendarDay> {
  let mut days: Vec<CalendarDay> = Vec::new();
  for entry in entries {
    match days.last_mut() {
      Some(day) if day.date == entry.date => day.shifts.push(entry),
      _ => days.push(CalendarDay { date: entry.date, shifts: vec![entry] }),
    }
  }
  days
}

pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(query): Query<ShiftQuery>,
) -> Result<Json<Vec<CalendarDay>>>
where
  S: ShiftStore + 'static,
{
  if let (Some(from), Some(to)) = (query.from, query.to)
    && from > to
  {
    return Err(Error::BadRequest(format!("from ({from}) is after to ({to})")));
  }

  let entries = state.store.list_shifts(&query).await.map_err(Error::store)?;
  Ok(Json(group_by_date(entries)))
}

#[cfg(test)]
mod tests {
  use turnos_core::shift::ShiftCode;

  use super::*;

  fn entry(shift_id: i64, day: u32, code: &str) -> CalendarEntry {
    let code = ShiftCode::parse(code).unwrap();
    CalendarEntry {
      shift_id,
      date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
      period: code.period(),
      code,
      controller_id: 1,
      controller_name: "Manuel Gil Romero".into(),
      team: Some("A".into()),
    }
  }

  #[test]
  fn groups_consecutive_dates() {
    let days = group_by_date(vec![entry(1, 1, "M"), entry(2, 1, "T"), entry(3, 3, "N")]);
    assert_eq!(days.len(), 2);
    assert_eq!(days[0].shifts.len(), 2);
    assert_eq!(days[1].date, NaiveDate::from_ymd_opt(2024, 5, 3).unwrap());
    assert_eq!(days[1].shifts[0].shift_id, 3);
  }

  #[test]
  fn empty_calendar() {
    assert!(group_by_date(Vec::new()).is_empty());
  }
}
