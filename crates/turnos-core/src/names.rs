//! Name normalization for controller records.
//!
//! Rosters print names as `"APELLIDOS NOMBRE"`, upper-case, sometimes with
//! accented letters mangled by a wrong codec somewhere between the PDF
//! export and us. Everything here is best effort: no function in this module
//! fails or panics on odd input.

// ─── Encoding repair ─────────────────────────────────────────────────────────

/// Windows-1252 characters in the 0x80..=0x9F range, which Latin-1 leaves as
/// C1 control codes.
const CP1252_HIGH: [(char, u8); 27] = [
  ('€', 0x80),
  ('‚', 0x82),
  ('ƒ', 0x83),
  ('„', 0x84),
  ('…', 0x85),
  ('†', 0x86),
  ('‡', 0x87),
  ('ˆ', 0x88),
  ('‰', 0x89),
  ('Š', 0x8A),
  ('‹', 0x8B),
  ('Œ', 0x8C),
  ('Ž', 0x8E),
  ('‘', 0x91),
  ('’', 0x92),
  ('“', 0x93),
  ('”', 0x94),
  ('•', 0x95),
  ('–', 0x96),
  ('—', 0x97),
  ('˜', 0x98),
  ('™', 0x99),
  ('š', 0x9A),
  ('›', 0x9B),
  ('œ', 0x9C),
  ('ž', 0x9E),
  ('Ÿ', 0x9F),
];

/// The byte `c` would have come from under Latin-1 / Windows-1252 decoding.
fn single_byte(c: char) -> Option<u8> {
  u8::try_from(u32::from(c)).ok().or_else(|| {
    CP1252_HIGH
      .iter()
      .find(|(ch, _)| *ch == c)
      .map(|(_, byte)| *byte)
  })
}

fn repair_once(text: &str) -> Option<String> {
  if text.is_ascii() {
    return None;
  }
  let bytes = text.chars().map(single_byte).collect::<Option<Vec<u8>>>()?;
  let repaired = String::from_utf8(bytes).ok()?;
  (repaired != text).then_some(repaired)
}

/// Undo UTF-8 text that was decoded as Latin-1 or Windows-1252
/// (`"MUÃ‘OZ"` → `"MUÑOZ"`).
///
/// Repair is attempted only when every char maps back to a single byte and
/// those bytes form valid UTF-8; otherwise the text is returned unchanged.
/// It is repeated until nothing changes, so doubly-mangled text is repaired
/// too and `fix_encoding(fix_encoding(s)) == fix_encoding(s)`. Every
/// successful pass shortens the text, so the loop terminates.
///
/// Correct Spanish names survive untouched: an accented capital followed by
/// a plain letter is never valid UTF-8. Text that really contains pairs such
/// as `"Ã©"` is indistinguishable from mojibake and gets rewritten.
pub fn fix_encoding(text: &str) -> String {
  let mut current = text.to_owned();
  while let Some(next) = repair_once(&current) {
    current = next;
  }
  current
}

/// The natural key stored for a controller: encoding repaired, whitespace
/// collapsed, upper-cased.
pub fn name_key(raw: &str) -> String {
  fix_encoding(raw)
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
    .to_uppercase()
}

// ─── Splitting ───────────────────────────────────────────────────────────────

/// Particles that belong to the word after them (`DE LA FUENTE`, `DEL RÍO`).
const CONNECTIVES: &[&str] =
  &["DE", "DEL", "LA", "LAS", "LOS", "Y", "E", "SAN", "SANTA", "VAN", "VON"];

fn is_connective(word: &str) -> bool {
  CONNECTIVES.iter().any(|c| word.eq_ignore_ascii_case(c))
}

/// A name split into its given-name and surname parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
  pub given:    String,
  pub surnames: String,
}

/// Group words so that connectives stay attached to the following word.
fn name_units(text: &str) -> Vec<String> {
  let mut units: Vec<String> = Vec::new();
  let mut pending: Vec<&str> = Vec::new();
  for word in text.split_whitespace() {
    pending.push(word);
    if !is_connective(word) {
      units.push(pending.join(" "));
      pending.clear();
    }
  }
  if !pending.is_empty() {
    let tail = pending.join(" ");
    match units.last_mut() {
      Some(last) => {
        last.push(' ');
        last.push_str(&tail);
      }
      None => units.push(tail),
    }
  }
  units
}

/// Split `"APELLIDOS NOMBRE"` into its parts.
///
/// An explicit comma (`"GIL ROMERO, MANUEL"`) wins. Otherwise two surname
/// units are assumed when there are three or more units, so compound given
/// names (`"GARCIA DEL RIO JOSE LUIS"`) keep both words. Two units are read
/// as one surname and one given name; a single unit is taken as a surname.
pub fn parse_name(raw: &str) -> ParsedName {
  let text = fix_encoding(raw);

  if let Some((surnames, given)) = text.split_once(',') {
    return ParsedName {
      given:    collapse_whitespace(given),
      surnames: collapse_whitespace(surnames),
    };
  }

  let units = name_units(&text);
  let surname_units = if units.len() >= 3 { 2 } else { units.len().min(1) };
  let (surnames, given) = units.split_at(surname_units);

  ParsedName {
    given:    given.join(" "),
    surnames: surnames.join(" "),
  }
}

fn collapse_whitespace(s: &str) -> String {
  s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ─── Capitalization ──────────────────────────────────────────────────────────

fn capitalize_word(word: &str) -> String {
  word
    .split('-')
    .map(|segment| {
      let mut chars = segment.chars();
      match chars.next() {
        Some(first) => first
          .to_uppercase()
          .chain(chars.flat_map(char::to_lowercase))
          .collect(),
        None => String::new(),
      }
    })
    .collect::<Vec<String>>()
    .join("-")
}

fn capitalize_part(part: &str) -> String {
  part
    .split_whitespace()
    .enumerate()
    .map(|(i, word)| {
      if i > 0 && is_connective(word) {
        word.to_lowercase()
      } else {
        capitalize_word(word)
      }
    })
    .collect::<Vec<_>>()
    .join(" ")
}

/// Title-case a given name and surnames the Spanish way: connectives stay
/// lower-case unless they open their part (`"De la Fuente"`, `"María de los
/// Ángeles"`).
pub fn capitaliza_nombre(given: &str, surnames: &str) -> (String, String) {
  (capitalize_part(given), capitalize_part(surnames))
}

// ─── Placeholder e-mail ──────────────────────────────────────────────────────

fn fold_to_ascii(c: char) -> Option<char> {
  let folded = match c {
    'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
    'é' | 'è' | 'ê' | 'ë' => 'e',
    'í' | 'ì' | 'î' | 'ï' => 'i',
    'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
    'ú' | 'ù' | 'û' | 'ü' => 'u',
    'ñ' => 'n',
    'ç' => 'c',
    'ý' | 'ÿ' => 'y',
    other => other,
  };
  (folded.is_ascii_alphanumeric() || matches!(folded, '.' | '-' | '_'))
    .then_some(folded)
}

/// E-mail for controllers first seen in a roster:
/// `"PEÑA GÓMEZ ANA"` → `"pena.gomez.ana@example.com"`.
pub fn placeholder_email(name: &str) -> String {
  let local: String = fix_encoding(name)
    .to_lowercase()
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(".")
    .chars()
    .filter_map(fold_to_ascii)
    .collect();
  format!("{local}@example.com")
}
