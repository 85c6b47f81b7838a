//! Roster table parser.
//!
//! Pipeline:
//!   raw text
//!     └─ split_cells() per line
//!          └─ find the header row (labels, then days 1..=n)
//!               └─ find the month/year line above it
//!                    └─ every later line with cells → RosterRow
//!
//! Layout accepted:
//!
//! ```text
//! TURNERO MENSUAL  MAYO 2024
//! APELLIDOS NOMBRE | CAT | EQ | 1 | 2 | 3 | … | 31
//! GIL ROMERO MANUEL | TS | A | M | T |   | … | N
//! ```
//!
//! Cells are separated by `|`, tab or `;` when the line contains one of them,
//! otherwise by runs of two or more spaces. The team column is optional.
//!
//! Space-aligned tables (the text of a PDF roster) are read by position: a
//! blank day leaves only spaces behind, so each data cell is placed under the
//! header cell it lines up with rather than counted from the left.

use std::cmp::Ordering;

use chrono::NaiveDate;
use tracing::{debug, warn};
use turnos_core::{names::name_key, shift::normalize_team};

use crate::{Error, Roster, RosterRow, Result};

const MONTHS: [(&str, u32); 13] = [
  ("ENERO", 1),
  ("FEBRERO", 2),
  ("MARZO", 3),
  ("ABRIL", 4),
  ("MAYO", 5),
  ("JUNIO", 6),
  ("JULIO", 7),
  ("AGOSTO", 8),
  ("SEPTIEMBRE", 9),
  ("SETIEMBRE", 9),
  ("OCTUBRE", 10),
  ("NOVIEMBRE", 11),
  ("DICIEMBRE", 12),
];

/// Cells meaning "no shift that day".
const BLANKS: [&str; 4] = ["", "-", ".", "·"];

pub(crate) fn is_blank(cell: &str) -> bool { BLANKS.contains(&cell.trim()) }

// ─── Cell splitting ──────────────────────────────────────────────────────────

/// Character columns `start..end` occupied by a cell of a space-aligned line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
  start: usize,
  end:   usize,
}

impl Span {
  fn overlaps(self, other: Span) -> bool { self.start < other.end && other.start < self.end }
}

/// The explicit cell separator of a line, if it has one.
fn separator(line: &str) -> Option<char> {
  let line = line.trim();
  ['|', '\t', ';'].into_iter().find(|c| line.contains(*c))
}

/// Cells of a line split on runs of two or more spaces, with their columns.
///
/// Columns count characters, not bytes, so accented names keep the cells
/// after them aligned.
fn wide_spans(line: &str) -> Vec<(Span, &str)> {
  let mut spans = Vec::new();
  // (column, byte offset) where the open cell starts.
  let mut open: Option<(usize, usize)> = None;
  // (column, byte offset) just past the last non-space character.
  let mut end = (0usize, 0usize);
  let mut spaces = 0usize;

  for (col, (byte, c)) in line.char_indices().enumerate() {
    if c == ' ' {
      spaces += 1;
      continue;
    }
    match open {
      None => open = Some((col, byte)),
      Some((start_col, start_byte)) if spaces >= 2 => {
        spans.push((Span { start: start_col, end: end.0 }, &line[start_byte..end.1]));
        open = Some((col, byte));
      }
      Some(_) => {}
    }
    spaces = 0;
    end = (col + 1, byte + c.len_utf8());
  }
  if let Some((start_col, start_byte)) = open {
    spans.push((Span { start: start_col, end: end.0 }, &line[start_byte..end.1]));
  }
  spans
}

/// Split a line into trimmed cells, dropping trailing blank cells.
pub(crate) fn split_cells(line: &str) -> Vec<String> {
  let raw: Vec<&str> = match separator(line) {
    Some('|') => line.trim().trim_matches('|').split('|').collect(),
    Some(sep) => line.trim().split(sep).collect(),
    None => wide_spans(line).into_iter().map(|(_, text)| text).collect(),
  };

  let mut cells: Vec<String> = raw.into_iter().map(|c| c.trim().to_owned()).collect();
  while cells.last().is_some_and(|c| c.is_empty()) {
    cells.pop();
  }
  cells
}

/// The header column a data cell belongs to.
///
/// A cell overlapping exactly one header cell belongs to it. A cell in the gap
/// between header cells belongs to the column whose half of the gap holds its
/// centre. `None` when it overlaps several header cells or sits on a midpoint.
fn column_of(span: Span, columns: &[Span]) -> Option<usize> {
  let mut overlapping = columns
    .iter()
    .enumerate()
    .filter(|(_, c)| c.overlaps(span))
    .map(|(i, _)| i);
  match (overlapping.next(), overlapping.next()) {
    (Some(i), None) => return Some(i),
    (Some(_), Some(_)) => return None,
    (None, _) => {}
  }

  // Doubled coordinates keep the midpoints integral.
  let centre = span.start + span.end;
  let mut index = 0;
  for pair in columns.windows(2) {
    match centre.cmp(&(pair[0].end + pair[1].start)) {
      Ordering::Less => break,
      Ordering::Equal => return None,
      Ordering::Greater => index += 1,
    }
  }
  Some(index)
}

/// Place the cells of a space-aligned row under the header columns, leaving
/// blank cells where nothing lines up. `None` if the placement is ambiguous.
fn align(spans: &[(Span, &str)], columns: &[Span]) -> Option<Vec<String>> {
  let mut cells: Vec<String> = Vec::new();
  for (span, text) in spans {
    let col = column_of(*span, columns)?;
    if col < cells.len() {
      return None;
    }
    cells.resize(col, String::new());
    cells.push((*text).to_owned());
  }
  Some(cells)
}

// ─── Header and period ───────────────────────────────────────────────────────

/// Column layout learned from the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout {
  /// Label columns before day 1: 2 (name, category) or 3 (… and team).
  labels:  usize,
  days:    usize,
  /// Positions of the header cells when the header is space-aligned.
  columns: Option<Vec<Span>>,
}

/// If `cells` end in the consecutive day numbers `1..=n`, return the layout.
fn header_layout(cells: &[String]) -> Option<Layout> {
  let first = cells.iter().position(|c| c == "1")?;
  let days = cells.get(first..)?;
  let consecutive = days
    .iter()
    .enumerate()
    .all(|(i, c)| c.parse::<usize>().is_ok_and(|d| d == i + 1));
  consecutive.then_some(Layout { labels: first, days: days.len(), columns: None })
}

/// Find a Spanish month name followed by a four-digit year.
fn parse_period(line: &str) -> Option<(i32, u32)> {
  let words: Vec<String> = line
    .split(|c: char| !c.is_alphanumeric())
    .filter(|w| !w.is_empty())
    .map(str::to_uppercase)
    .collect();

  words.iter().enumerate().find_map(|(i, word)| {
    let (_, month) = MONTHS.iter().find(|(name, _)| name == word)?;
    let year = words
      .get(i + 1..)?
      .iter()
      .find(|w| w.len() == 4 && w.chars().all(|c| c.is_ascii_digit()))?
      .parse::<i32>()
      .ok()?;
    (1900..=2100).contains(&year).then_some((year, *month))
  })
}

// ─── Rows ────────────────────────────────────────────────────────────────────

fn parse_row(
  line_no: usize,
  line: &str,
  cells: Vec<String>,
  layout: &Layout,
) -> Option<RosterRow> {
  if cells.len() <= 1 {
    debug!(line = line_no, "skipping line without table cells");
    return None;
  }
  let cells = match &layout.columns {
    Some(columns) if separator(line).is_none() => {
      let Some(aligned) = align(&wide_spans(line), columns) else {
        warn!(line = line_no, "row cells do not line up with the header columns; skipping row");
        return None;
      };
      aligned
    }
    _ => cells,
  };
  if cells.len() < layout.labels {
    warn!(line = line_no, "row has fewer cells than label columns; skipping row");
    return None;
  }
  let day_cells = cells.len() - layout.labels;
  if day_cells > layout.days {
    warn!(
      line = line_no,
      day_cells,
      days = layout.days,
      "row has more day cells than the header; skipping row",
    );
    return None;
  }

  let mut cells = cells.into_iter();
  let name = name_key(&cells.next().unwrap_or_default());
  if name.is_empty() {
    warn!(line = line_no, "row without controller name; skipping row");
    return None;
  }
  let role = cells.next().unwrap_or_default().to_uppercase();
  let team = if layout.labels >= 3 {
    let raw = cells.next().unwrap_or_default();
    normalize_team(&raw).unwrap_or_else(|e| {
      warn!(line = line_no, error = %e, "ignoring team cell");
      None
    })
  } else {
    None
  };

  Some(RosterRow { line: line_no, name, role, team, cells: cells.collect() })
}

// ─── Entry point ─────────────────────────────────────────────────────────────

pub(crate) fn parse_text(text: &str) -> Result<Roster> {
  let lines: Vec<&str> = text.lines().collect();

  let (header_idx, mut layout) = lines
    .iter()
    .enumerate()
    .find_map(|(i, line)| header_layout(&split_cells(line)).map(|l| (i, l)))
    .ok_or_else(|| Error::InvalidFormat("missing header row with day numbers".into()))?;

  let header = lines[header_idx];
  if separator(header).is_none() {
    layout.columns = Some(wide_spans(header).into_iter().map(|(span, _)| span).collect());
  }

  if !(2..=3).contains(&layout.labels) {
    return Err(Error::InvalidFormat(format!(
      "header has {} label columns before the days; expected name, category and optional team",
      layout.labels,
    )));
  }

  let (year, month) = lines[..header_idx]
    .iter()
    .find_map(|line| parse_period(line))
    .ok_or_else(|| Error::InvalidFormat("missing month and year above the header".into()))?;

  let days = u32::try_from(layout.days)
    .ok()
    .filter(|d| NaiveDate::from_ymd_opt(year, month, *d).is_some())
    .ok_or_else(|| {
      Error::InvalidFormat(format!("{} day columns do not fit {month:02}/{year}", layout.days))
    })?;

  let mut rows = Vec::new();
  for (i, line) in lines.iter().enumerate().skip(header_idx + 1) {
    let cells = split_cells(line);
    if cells.is_empty() {
      continue;
    }
    // Repeated page headers and titles in multi-page exports.
    if header_layout(&cells).is_some() || parse_period(line).is_some() {
      continue;
    }
    if let Some(row) = parse_row(i + 1, line, cells, &layout) {
      rows.push(row);
    }
  }

  if rows.is_empty() {
    return Err(Error::InvalidFormat("roster table has no controller rows".into()));
  }

  debug!(year, month, days, rows = rows.len(), "parsed roster");
  Ok(Roster { year, month, days, rows })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cells(v: &[&str]) -> Vec<String> { v.iter().map(|s| s.to_string()).collect() }

  #[test]
  fn split_on_pipes_keeps_inner_blanks() {
    assert_eq!(
      split_cells("| GIL ROMERO MANUEL | TS | A | M |  | N | | |"),
      cells(&["GIL ROMERO MANUEL", "TS", "A", "M", "", "N"])
    );
  }

  #[test]
  fn split_on_tabs_and_semicolons() {
    assert_eq!(split_cells("A B\tTS\t\tM"), cells(&["A B", "TS", "", "M"]));
    assert_eq!(split_cells("A B;TS;;M;"), cells(&["A B", "TS", "", "M"]));
  }

  #[test]
  fn split_on_wide_spaces() {
    assert_eq!(
      split_cells("  GIL ROMERO MANUEL   TS  A  M  -  N  "),
      cells(&["GIL ROMERO MANUEL", "TS", "A", "M", "-", "N"])
    );
    assert_eq!(split_cells("Página 1 de 2"), cells(&["Página 1 de 2"]));
  }

  fn span(start: usize, end: usize) -> Span { Span { start, end } }

  #[test]
  fn wide_spans_count_characters() {
    let spans = wide_spans("  PEÑA GOMEZ ANA   CON      T");
    assert_eq!(
      spans,
      vec![
        (span(2, 16), "PEÑA GOMEZ ANA"),
        (span(19, 22), "CON"),
        (span(28, 29), "T"),
      ]
    );
    assert!(wide_spans("   ").is_empty());
  }

  #[test]
  fn cells_go_to_the_column_they_line_up_with() {
    // NOMBRE  CAT  1   2   3
    let columns = [span(0, 6), span(8, 11), span(13, 14), span(17, 18), span(21, 22)];
    assert_eq!(column_of(span(9, 11), &columns), Some(1));
    assert_eq!(column_of(span(12, 16), &columns), Some(2));
    // Gap between "1" and "2" is 14..17; its midpoint is 15.5.
    assert_eq!(column_of(span(14, 15), &columns), Some(2));
    assert_eq!(column_of(span(16, 17), &columns), Some(3));
    assert_eq!(column_of(span(15, 16), &columns), None);
    assert_eq!(column_of(span(30, 31), &columns), Some(4));
    assert_eq!(column_of(span(13, 18), &columns), None);
  }

  #[test]
  fn align_fills_blanks_and_rejects_collisions() {
    let columns = [span(0, 6), span(8, 11), span(13, 14), span(17, 18), span(21, 22)];
    assert_eq!(
      align(&[(span(0, 3), "GIL"), (span(8, 10), "TS"), (span(21, 22), "N")], &columns),
      Some(cells(&["GIL", "TS", "", "", "N"]))
    );
    assert_eq!(
      align(&[(span(0, 3), "GIL"), (span(13, 14), "M"), (span(14, 15), "T")], &columns),
      None
    );
  }

  #[test]
  fn header_detection() {
    let layout = header_layout(&cells(&["APELLIDOS NOMBRE", "CAT", "EQ", "1", "2", "3"]));
    assert_eq!(layout, Some(Layout { labels: 3, days: 3, columns: None }));
    assert_eq!(header_layout(&cells(&["X", "1", "3"])), None);
    assert_eq!(header_layout(&cells(&["GIL", "TS", "A", "M"])), None);
  }

  #[test]
  fn period_detection() {
    assert_eq!(parse_period("TURNERO MENSUAL - Mayo 2024"), Some((2024, 5)));
    assert_eq!(parse_period("SETIEMBRE/2023"), Some((2023, 9)));
    assert_eq!(parse_period("DICIEMBRE"), None);
    assert_eq!(parse_period("2024 MAYO"), None);
    assert_eq!(parse_period("MAYO 0042"), None);
  }
}
