//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Drop the accent from common Spanish/Portuguese vowels; `ñ` is kept.
pub fn fold_accent(ch: char) -> char {
  match ch {
    'á' | 'à' | 'ä' | 'â' => 'a',
    'é' | 'è' | 'ë' | 'ê' => 'e',
    'í' | 'ì' | 'ï' | 'î' => 'i',
    'ó' | 'ò' | 'ö' | 'ô' => 'o',
    'ú' | 'ù' | 'ü' | 'û' => 'u',
    'Á' | 'À' | 'Ä' | 'Â' => 'A',
    'É' | 'È' | 'Ë' | 'Ê' => 'E',
    'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
    'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
    'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
    other => other,
  }
}

/// ASCII slug for file names: lowercase alphanumerics separated by single dashes.
pub fn slugify(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for ch in s.chars().map(fold_accent) {
    let ch = match ch {
      'ñ' | 'Ñ' => 'n',
      c => c,
    };
    if ch.is_ascii_alphanumeric() {
      out.push(ch.to_ascii_lowercase());
    } else if !out.is_empty() && !out.ends_with('-') {
      out.push('-');
    }
  }
  out.trim_end_matches('-').to_string()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
