//! Monthly roster ("turnero") parser.
//!
//! Converts an uploaded roster document into [`turnos_core`] roster entries.
//! Pure synchronous; no HTTP or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! let text = "TURNERO MAYO 2024\n\
//!             APELLIDOS NOMBRE | CAT | EQ | 1 | 2\n\
//!             GIL ROMERO MANUEL | TS | A | M | T\n";
//! let roster = turnos_roster::parse(text.as_bytes()).unwrap();
//! println!("{} rows, {} entries", roster.rows.len(), roster.entries().count());
//! ```

pub mod error;
mod extract;
mod parse;

pub use error::{Error, Result};

use chrono::NaiveDate;
use tracing::warn;
use turnos_core::shift::{RosterEntry, ShiftCode};

// ─── Public types
// ─────────────────────────────────────────────────────────────

/// A structurally valid roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
  pub year:  i32,
  /// 1-based month.
  pub month: u32,
  /// Number of day columns in the header (`1..=days`).
  pub days:  u32,
  pub rows:  Vec<RosterRow>,
}

/// One controller row of the roster table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
  /// 1-based line number in the extracted text, for diagnostics.
  pub line:  usize,
  /// Normalized `"APELLIDOS NOMBRE"`.
  pub name:  String,
  pub role:  String,
  pub team:  Option<String>,
  /// Raw day cells; index 0 is day 1. Trailing blanks may be missing.
  pub cells: Vec<String>,
}

impl RosterRow {
  fn entry(&self, year: i32, month: u32, index: usize) -> Option<RosterEntry> {
    let cell = self.cells.get(index)?;
    if parse::is_blank(cell) {
      return None;
    }
    let day = u32::try_from(index + 1).ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    match ShiftCode::parse(cell) {
      Ok(code) => Some(RosterEntry {
        name: self.name.clone(),
        role: self.role.clone(),
        team: self.team.clone(),
        date,
        code,
      }),
      Err(_) => {
        warn!(line = self.line, day, cell = %cell, "unrecognized shift code; skipping cell");
        None
      }
    }
  }
}

impl Roster {
  /// Lazily yield one entry per non-blank cell, row by row.
  pub fn entries(&self) -> impl Iterator<Item = RosterEntry> + '_ {
    self.rows.iter().flat_map(move |row| {
      (0..row.cells.len()).filter_map(move |i| row.entry(self.year, self.month, i))
    })
  }

  /// Owning variant of [`Roster::entries`], for handing to a store.
  pub fn into_entries(self) -> IntoEntries {
    IntoEntries {
      year:    self.year,
      month:   self.month,
      rows:    self.rows.into_iter(),
      current: None,
    }
  }
}

/// Iterator returned by [`Roster::into_entries`].
pub struct IntoEntries {
  year:    i32,
  month:   u32,
  rows:    std::vec::IntoIter<RosterRow>,
  current: Option<(RosterRow, usize)>,
}

impl Iterator for IntoEntries {
  type Item = RosterEntry;

  fn next(&mut self) -> Option<RosterEntry> {
    loop {
      if let Some((row, index)) = &mut self.current {
        while *index < row.cells.len() {
          let i = *index;
          *index += 1;
          if let Some(entry) = row.entry(self.year, self.month, i) {
            return Some(entry);
          }
        }
      }
      self.current = Some((self.rows.next()?, 0));
    }
  }
}

// ─── Public API
// ───────────────────────────────────────────────────────────────

/// Parse an uploaded roster. PDFs are recognised by their `%PDF-` magic and
/// have their text extracted first; anything else is read as text.
pub fn parse(bytes: &[u8]) -> Result<Roster> {
  let text = extract::roster_text(bytes)?;
  parse::parse_text(&text)
}

/// Parse roster text directly.
pub fn parse_text(text: &str) -> Result<Roster> { parse::parse_text(text) }

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  const MAY: &str = "\
TURNERO MENSUAL MAYO 2024
APELLIDOS NOMBRE | CAT | EQ | 1 | 2 | 3 | 4 | 5
GIL ROMERO MANUEL | TS | a | M | T | - | N |
PEÑA GOMEZ ANA | CON | B | . | MB09 | M | | T
";

  fn may(day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 5, day).unwrap() }

  fn codes(roster: &Roster, name: &str) -> Vec<(u32, String)> {
    use chrono::Datelike;
    roster
      .entries()
      .filter(|e| e.name == name)
      .map(|e| (e.date.day(), e.code.to_string()))
      .collect()
  }

  #[test]
  fn parses_pipe_table() {
    let roster = parse_text(MAY).unwrap();
    assert_eq!((roster.year, roster.month, roster.days), (2024, 5, 5));
    assert_eq!(roster.rows.len(), 2);

    let gil = &roster.rows[0];
    assert_eq!(gil.name, "GIL ROMERO MANUEL");
    assert_eq!(gil.role, "TS");
    assert_eq!(gil.team.as_deref(), Some("A"));
    assert_eq!(gil.line, 3);

    assert_eq!(
      codes(&roster, "GIL ROMERO MANUEL"),
      vec![(1, "M".into()), (2, "T".into()), (4, "N".into())]
    );
    assert_eq!(
      codes(&roster, "PEÑA GOMEZ ANA"),
      vec![(2, "MB09".into()), (3, "M".into()), (5, "T".into())]
    );
  }

  #[test]
  fn owned_entries_match_borrowed() {
    let roster = parse_text(MAY).unwrap();
    let borrowed: Vec<RosterEntry> = roster.entries().collect();
    let owned: Vec<RosterEntry> = roster.into_entries().collect();
    assert_eq!(borrowed.len(), 6);
    assert_eq!(borrowed, owned);
    assert_eq!(owned[0].date, may(1));
  }

  #[test]
  fn wide_space_layout_without_team() {
    let text = "Mayo 2024\n\
                APELLIDOS NOMBRE  CAT  1  2  3\n\
                gil romero manuel  TS  M  -  N\n";
    let roster = parse_text(text).unwrap();
    assert_eq!(roster.rows.len(), 1);
    assert_eq!(roster.rows[0].team, None);
    assert_eq!(
      codes(&roster, "GIL ROMERO MANUEL"),
      vec![(1, "M".into()), (3, "N".into())]
    );
  }

  /// A space-aligned line with each text starting at the given column.
  fn aligned(cells: &[(usize, &str)]) -> String {
    let mut line = String::new();
    for (col, text) in cells {
      let width = line.chars().count();
      line.extend(std::iter::repeat_n(' ', col - width));
      line.push_str(text);
    }
    line
  }

  fn wide_header() -> String {
    aligned(&[
      (0, "APELLIDOS NOMBRE"),
      (21, "CAT"),
      (27, "EQ"),
      (33, "1"),
      (38, "2"),
      (43, "3"),
      (48, "4"),
      (53, "5"),
    ])
  }

  fn wide_roster(rows: &[Vec<(usize, &str)>]) -> String {
    let mut text = format!("TURNERO MAYO 2024\n{}\n", wide_header());
    for row in rows {
      text.push_str(&aligned(row));
      text.push('\n');
    }
    text
  }

  #[test]
  fn wide_layout_keeps_blank_days_in_place() {
    let text = wide_roster(&[vec![
      (0, "GIL ROMERO MANUEL"),
      (21, "TS"),
      (27, "A"),
      (33, "M"),
      (43, "N"),
      (53, "T"),
    ]]);
    let roster = parse_text(&text).unwrap();
    assert_eq!(roster.rows[0].team.as_deref(), Some("A"));
    assert_eq!(
      codes(&roster, "GIL ROMERO MANUEL"),
      vec![(1, "M".into()), (3, "N".into()), (5, "T".into())]
    );
  }

  #[test]
  fn wide_layout_blank_team_does_not_take_first_shift() {
    let text = wide_roster(&[vec![
      (0, "PEÑA GOMEZ ANA"),
      (21, "CON"),
      (33, "T"),
      (38, "N"),
      (48, "M"),
    ]]);
    let roster = parse_text(&text).unwrap();
    let row = &roster.rows[0];
    assert_eq!(row.role, "CON");
    assert_eq!(row.team, None);
    assert_eq!(
      codes(&roster, "PEÑA GOMEZ ANA"),
      vec![(1, "T".into()), (2, "N".into()), (4, "M".into())]
    );
  }

  #[test]
  fn wide_layout_places_offset_cells_by_nearest_column() {
    // A wide code overhanging its column and a code right of its day number.
    let text = wide_roster(&[vec![
      (0, "RUIZ SANZ LUIS"),
      (21, "CON"),
      (27, "B"),
      (37, "MB09"),
      (52, "N"),
    ]]);
    let roster = parse_text(&text).unwrap();
    assert_eq!(
      codes(&roster, "RUIZ SANZ LUIS"),
      vec![(2, "MB09".into()), (5, "N".into())]
    );
  }

  #[test]
  fn wide_layout_skips_rows_that_straddle_columns() {
    let text = wide_roster(&[
      vec![(0, "GIL ROMERO MANUEL"), (21, "TS"), (27, "A"), (33, "BAJA MEDICA")],
      vec![(0, "RUIZ SANZ LUIS"), (21, "CON"), (27, "B"), (33, "M"), (38, "T")],
      vec![(20, "Página 1 de 2")],
    ]);
    let roster = parse_text(&text).unwrap();
    let names: Vec<&str> = roster.rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["RUIZ SANZ LUIS"]);
    assert_eq!(roster.entries().count(), 2);
  }

  #[test]
  fn pdf_roster_keeps_dates_of_blank_cells() {
    let roster = parse(include_bytes!("../tests/data/turnero.pdf")).unwrap();
    assert_eq!((roster.year, roster.month, roster.days), (2024, 5, 5));

    let entries: Vec<(String, Option<String>, NaiveDate, String)> = roster
      .entries()
      .map(|e| (e.name, e.team, e.date, e.code.to_string()))
      .collect();
    let gil = || ("GIL ROMERO MANUEL".to_owned(), Some("A".to_owned()));
    let pena = || ("PENA GOMEZ ANA".to_owned(), None::<String>);
    let ruiz = || ("RUIZ SANZ LUIS".to_owned(), Some("B".to_owned()));
    let expected: Vec<(String, Option<String>, NaiveDate, String)> = [
      (gil(), 1, "M"),
      (gil(), 3, "N"),
      (gil(), 5, "T"),
      (pena(), 1, "T"),
      (pena(), 2, "N"),
      (pena(), 4, "M"),
      (ruiz(), 2, "MB09"),
      (ruiz(), 5, "N"),
    ]
    .into_iter()
    .map(|((name, team), day, code)| (name, team, may(day), code.to_owned()))
    .collect();
    assert_eq!(entries, expected);
  }

  #[test]
  fn multi_page_export_skips_repeated_headers() {
    let text = "\
TURNERO MAYO 2024
APELLIDOS NOMBRE\tCAT\tEQ\t1\t2\t3
GIL ROMERO MANUEL\tTS\tA\tM\tT\tN
Página 1 de 2

TURNERO MAYO 2024
APELLIDOS NOMBRE\tCAT\tEQ\t1\t2\t3
PEÑA GOMEZ ANA\tCON\tB\tN\t\tM
Página 2 de 2
";
    let roster = parse_text(text).unwrap();
    let names: Vec<&str> = roster.rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["GIL ROMERO MANUEL", "PEÑA GOMEZ ANA"]);
    assert_eq!(roster.entries().count(), 5);
  }

  #[test]
  fn unrecognized_codes_and_bad_rows_are_skipped() {
    let text = "\
MAYO 2024
APELLIDOS NOMBRE | CAT | EQ | 1 | 2 | 3
GIL ROMERO MANUEL | TS | A | M? | T | N
;TS;A;M;M;M
PEÑA GOMEZ ANA | CON | B | M | M | M | M
RUIZ SANZ LUIS | CON | 7 | N
";
    let roster = parse_text(text).unwrap();
    let names: Vec<&str> = roster.rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["GIL ROMERO MANUEL", "RUIZ SANZ LUIS"]);
    assert_eq!(
      codes(&roster, "GIL ROMERO MANUEL"),
      vec![(2, "T".into()), (3, "N".into())]
    );
    assert_eq!(roster.rows[1].team, None);
  }

  #[test]
  fn garbled_names_are_normalized() {
    let text = "MAYO 2024\nNOMBRE | CAT | 1\nMUÃ‘OZ  PEREZ ANA | CON | M\n";
    let roster = parse_text(text).unwrap();
    assert_eq!(roster.rows[0].name, "MUÑOZ PEREZ ANA");
  }

  #[test]
  fn latin1_bytes_are_accepted() {
    let mut bytes = b"MAYO 2024\nNOMBRE | CAT | 1\nPE".to_vec();
    bytes.push(0xD1);
    bytes.extend_from_slice(b"A GOMEZ ANA | CON | T\n");
    let roster = parse(&bytes).unwrap();
    assert_eq!(roster.rows[0].name, "PEÑA GOMEZ ANA");
  }

  #[test]
  fn missing_header_is_invalid() {
    let err = parse_text("MAYO 2024\nGIL ROMERO MANUEL | TS | M\n").unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)));
  }

  #[test]
  fn missing_period_is_invalid() {
    let err = parse_text("NOMBRE | CAT | 1 | 2\nGIL | TS | M | T\n").unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)));
  }

  #[test]
  fn too_many_days_for_month_is_invalid() {
    let days: Vec<String> = (1..=30).map(|d| d.to_string()).collect();
    let text = format!(
      "FEBRERO 2023\nNOMBRE | CAT | {}\nGIL | TS | M\n",
      days.join(" | ")
    );
    let err = parse_text(&text).unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)));
  }

  #[test]
  fn wrong_label_count_is_invalid() {
    let err = parse_text("MAYO 2024\nNOMBRE | 1 | 2\nGIL | M | T\n").unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)));
  }

  #[test]
  fn table_without_rows_is_invalid() {
    let err = parse_text("MAYO 2024\nNOMBRE | CAT | 1 | 2\n\nPágina 1\n").unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)));
  }

  #[test]
  fn plain_prose_is_invalid() {
    let err = parse(b"Querido diario, hoy no hay turnos.").unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)));
  }
}
