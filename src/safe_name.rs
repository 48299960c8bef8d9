//! Derivation of safe names (slugs) from human-readable titles.
//!
//! A safe name is the only stable handle of a sheet or a composer: it is the
//! primary key in the database, a path component on disk and a URL segment.
//! Derivation is therefore deterministic and idempotent, and its output only
//! ever contains `[a-z0-9-.]`.

use crate::catalog_store::CatalogError;

/// Longest safe name produced, in bytes (all characters are ASCII).
pub const MAX_SAFE_NAME_LEN: usize = 255;

/// Derives the safe name of `text`.
///
/// Unicode is transliterated to ASCII, the result lower-cased, whitespace and
/// underscores become hyphens, everything outside `[a-z0-9-.]` is dropped and
/// separator runs collapse. A run of separators that contains at least one
/// hyphen becomes a single hyphen, so `"N. 1"` gives `"n-1"` while `"op.10"`
/// keeps its dot. Leading and trailing separators are trimmed, which also
/// rules out `.` and `..` as results.
///
/// Returns an empty string when nothing survives; see [`require_safe_name`].
pub fn derive_safe_name(text: &str) -> String {
    let ascii = deunicode::deunicode_with_tofu(text, "");

    let mut out = String::with_capacity(ascii.len().min(MAX_SAFE_NAME_LEN));
    let mut pending_separators = String::new();

    for c in ascii.chars() {
        let c = if c.is_ascii_whitespace() || c == '_' {
            '-'
        } else {
            c.to_ascii_lowercase()
        };
        match c {
            'a'..='z' | '0'..='9' => {
                flush_separators(&mut out, &mut pending_separators);
                out.push(c);
            }
            '-' | '.' => pending_separators.push(c),
            _ => {}
        }
    }

    if out.len() > MAX_SAFE_NAME_LEN {
        out.truncate(MAX_SAFE_NAME_LEN);
        let trimmed_len = out.trim_end_matches(['-', '.']).len();
        out.truncate(trimmed_len);
    }
    out
}

fn flush_separators(out: &mut String, pending: &mut String) {
    if !pending.is_empty() && !out.is_empty() {
        if pending.contains('-') {
            out.push('-');
        } else {
            out.push_str(pending);
        }
    }
    pending.clear();
}

/// Derives the safe name of `text`, failing when the result is empty.
pub fn require_safe_name(field: &'static str, text: &str) -> Result<String, CatalogError> {
    let safe_name = derive_safe_name(text);
    if safe_name.is_empty() {
        return Err(CatalogError::Validation {
            field,
            reason: format!("'{}' has no usable characters for a safe name", text),
        });
    }
    Ok(safe_name)
}

/// Whether `name` is already a non-empty safe name.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty() && derive_safe_name(name) == name
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn in_alphabet(name: &str) -> bool {
        name.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    }

    proptest! {
        #[test]
        fn derive_is_idempotent_and_bounded(text in any::<String>()) {
            let once = derive_safe_name(&text);
            prop_assert!(in_alphabet(&once), "{:?} -> {:?}", text, once);
            prop_assert!(once.len() <= MAX_SAFE_NAME_LEN);
            prop_assert_eq!(derive_safe_name(&once), once);
        }

        #[test]
        fn derive_handles_long_separator_heavy_text(
            text in "[a-zA-Z0-9 ._\\-\u{e9}\u{436}\u{9f8d}]{0,600}"
        ) {
            let once = derive_safe_name(&text);
            prop_assert!(in_alphabet(&once), "{:?} -> {:?}", text, once);
            prop_assert!(once.len() <= MAX_SAFE_NAME_LEN);
            prop_assert!(!once.starts_with(['-', '.']) && !once.ends_with(['-', '.']));
            prop_assert_eq!(derive_safe_name(&once), once);
        }
    }

    const SAMPLES: &[&str] = &[
        "",
        "   ",
        "Étude N. 1",
        "Frédéric Chopin",
        "Für Elise",
        "Pyotr Ilyich Tchaikovsky",
        "Пётр Ильич Чайковский",
        "坂本龍一",
        "Nocturne Op.9 No.2",
        "__init__",
        "...hidden",
        "trailing...",
        "a - b & c",
        "École #1.pdf",
        "../../etc/passwd",
        "Sonata\tin\nC",
        "🎹 Piano 🎹",
        "--already-safe--",
        "x.-.-.y",
    ];

    #[test]
    fn test_scenario_names() {
        assert_eq!(derive_safe_name("Étude N. 1"), "etude-n-1");
        assert_eq!(derive_safe_name("Frédéric Chopin"), "frederic-chopin");
        assert_eq!(derive_safe_name("Franz Liszt"), "franz-liszt");
    }

    #[test]
    fn test_keeps_dots_between_words() {
        assert_eq!(derive_safe_name("Nocturne Op.9 No.2"), "nocturne-op.9-no.2");
        assert_eq!(derive_safe_name("École #1.pdf"), "ecole-1.pdf");
    }

    #[test]
    fn test_collapses_separators() {
        assert_eq!(derive_safe_name("a - b & c"), "a-b-c");
        assert_eq!(derive_safe_name("Sonata\tin\nC"), "sonata-in-c");
        assert_eq!(derive_safe_name("__init__"), "init");
        assert_eq!(derive_safe_name("x.-.-.y"), "x-y");
    }

    #[test]
    fn test_trims_edges() {
        assert_eq!(derive_safe_name("...hidden"), "hidden");
        assert_eq!(derive_safe_name("trailing..."), "trailing");
        assert_eq!(derive_safe_name("../../etc/passwd"), "etcpasswd");
        assert_eq!(derive_safe_name("--already-safe--"), "already-safe");
    }

    #[test]
    fn test_transliterates_non_latin_scripts() {
        let russian = derive_safe_name("Пётр Ильич Чайковский");
        assert!(!russian.is_empty());
        assert!(russian.starts_with("p"));

        let japanese = derive_safe_name("坂本龍一");
        assert!(!japanese.is_empty());
    }

    #[test]
    fn test_empty_input_gives_empty_name() {
        assert_eq!(derive_safe_name(""), "");
        assert_eq!(derive_safe_name("   "), "");
        assert_eq!(derive_safe_name("#?!"), "");
    }

    #[test]
    fn test_output_alphabet_and_idempotence() {
        for sample in SAMPLES {
            let once = derive_safe_name(sample);
            assert!(in_alphabet(&once), "{:?} -> {:?}", sample, once);
            assert_eq!(derive_safe_name(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_truncates_to_max_length() {
        let long_title = "Variation ".repeat(60);
        let safe_name = derive_safe_name(&long_title);
        assert!(safe_name.len() <= MAX_SAFE_NAME_LEN);
        assert!(!safe_name.ends_with('-'));
        assert_eq!(derive_safe_name(&safe_name), safe_name);

        let exact = "a".repeat(400);
        assert_eq!(derive_safe_name(&exact).len(), MAX_SAFE_NAME_LEN);
    }

    #[test]
    fn test_require_safe_name_rejects_empty() {
        assert_eq!(
            require_safe_name("sheet_name", "Für Elise").unwrap(),
            "fur-elise"
        );
        assert!(matches!(
            require_safe_name("sheet_name", "  !!  "),
            Err(CatalogError::Validation {
                field: "sheet_name",
                ..
            })
        ));
    }

    #[test]
    fn test_is_safe_name() {
        assert!(is_safe_name("etude-n-1"));
        assert!(!is_safe_name("Etude"));
        assert!(!is_safe_name(""));
        assert!(!is_safe_name("../x"));
    }
}
