use regex::Regex;
use std::sync::LazyLock;

use super::prompt::NOT_FOUND_MARKER;

/// Sent instead of an empty or "not found" answer.
pub const FALLBACK_REPLY: &str = "Bu sualla bağlı sənədlərdə dəqiq məlumat tapa bilmədim. \
Zəhmət olmasa, bir az daha ətraflı yazın: hansı platformadan (iOS, Android, Windows və s.) istifadə edirsiniz, \
mobil operatorunuz hansıdır və Asan İmza hansı telefon nömrəsinə bağlıdır?";

const NOT_FOUND_VARIANTS: [&str; 3] = [
    NOT_FOUND_MARKER,
    "Sənədlərdə tapılmadı",
    "Не найдено в документах",
];

// 【4:0†faq.pdf】
static FULLWIDTH_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"【[^】]*】").expect("valid regex"));

// [1], [1:0], [1:0†faq.pdf]. ASCII digits only.
static BRACKET_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[0-9]+(?::[0-9]+)?(?:†[^\]]*)?\]").expect("valid regex")
});

// (1), (1:0), (1:0†faq.pdf), (1:0†guide (v2).pdf). Longer bare numbers like
// (2024) or (0035) are text. The file name may hold one level of parentheses.
static PAREN_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((?:[0-9]{1,2}|[0-9]+:[0-9]+|[0-9]+(?::[0-9]+)?†(?:[^()]|\([^()]*\))*)\)")
        .expect("valid regex")
});

static HORIZONTAL_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("valid regex"));

static LINE_EDGE_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ?\n ?").expect("valid regex"));

static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Final text for the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalReply {
    Answer(String),
    Fallback,
}

impl FinalReply {
    pub fn text(&self) -> &str {
        match self {
            Self::Answer(text) => text,
            Self::Fallback => FALLBACK_REPLY,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }
}

/// Strips citation markers and normalizes whitespace.
///
/// Marker removal runs until nothing changes, so nested leftovers such as
/// `[[1]2]` are also removed and a second call is a no-op. Line breaks are
/// kept (at most one blank line in a row) so structured answers keep their
/// layout.
pub fn sanitize(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = strip_markers_once(&current);
        if next == current {
            break;
        }
        current = next;
    }

    let collapsed = HORIZONTAL_SPACE_RE.replace_all(&current, " ");
    let collapsed = LINE_EDGE_SPACE_RE.replace_all(&collapsed, "\n");
    let collapsed = BLANK_LINES_RE.replace_all(&collapsed, "\n\n");
    collapsed.trim().to_string()
}

fn strip_markers_once(text: &str) -> String {
    let text = FULLWIDTH_MARKER_RE.replace_all(text, "");
    let text = BRACKET_MARKER_RE.replace_all(&text, "");
    PAREN_MARKER_RE.replace_all(&text, "").into_owned()
}

pub fn is_not_found(text: &str) -> bool {
    let normalized = text.trim().trim_end_matches('.').trim().to_lowercase();
    NOT_FOUND_VARIANTS
        .iter()
        .any(|marker| marker.to_lowercase() == normalized)
}

/// Sanitizes the raw assistant text, substituting the clarifying fallback
/// when nothing usable is left.
pub fn finalize_reply(raw: Option<&str>) -> FinalReply {
    let text = sanitize(raw.unwrap_or_default());
    if text.is_empty() || is_not_found(&text) {
        FinalReply::Fallback
    } else {
        FinalReply::Answer(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_fullwidth_markers() {
        assert_eq!(
            sanitize("Sertifikatı yeniləyin【4:0†asan_faq.pdf】."),
            "Sertifikatı yeniləyin."
        );
    }

    #[test]
    fn strips_numeric_bracket_markers() {
        assert_eq!(
            sanitize("PIN kodu bloklanıb [1] və ya [2:3] [1:0†faq.pdf] səbəbdən."),
            "PIN kodu bloklanıb və ya səbəbdən."
        );
    }

    #[test]
    fn strips_numeric_paren_markers() {
        assert_eq!(
            sanitize("Operatora müraciət edin (1) (3:1) (2:0†guide.docx)."),
            "Operatora müraciət edin ."
        );
    }

    #[test]
    fn keeps_ordinary_parentheticals() {
        let text = "Telefonu yeniləyin (məsələn, Android 14), kod (0035) və il (2024) [qeyd].";
        assert_eq!(sanitize(text), text);
    }

    #[test]
    fn collapses_spaces_but_keeps_layout() {
        let raw = "  ERROR_CODE:   0035 \n\n\n\nTITLE:\tSertifikat  \n SOLUTION: yeniləyin  ";
        assert_eq!(
            sanitize(raw),
            "ERROR_CODE: 0035\n\nTITLE: Sertifikat\nSOLUTION: yeniləyin"
        );
    }

    #[test]
    fn error_code_layout_passes_unchanged() {
        let reply = "ERROR_CODE: 0035\nTITLE: Sertifikat etibarsızdır\nDESCRIPTION: Sertifikatın müddəti bitib.\nCAUSES: Müddət bitib.\nSOLUTION: ASAN xidmətə müraciət edin.";
        assert_eq!(sanitize(reply), reply);
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let samples = [
            "a [[1]2] b",
            "x ((1)) y",
            "【【1】】 z",
            "text  [1]  (2)  more\n\n\n\nend 【3†f】",
            "  \t ",
            "(1:0†a(b)c)",
            "Salam (dost) [12:4†x.pdf] ok",
        ];
        for sample in samples {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn nested_markers_are_fully_removed() {
        assert_eq!(sanitize("a [[1]2] b"), "a b");
        assert_eq!(sanitize("x ((1)2) y"), "x y");
    }

    #[test]
    fn file_names_with_parentheses_are_removed_whole() {
        assert_eq!(sanitize("Bax (1:0†a(b)c) burada"), "Bax burada");
        assert_eq!(
            sanitize("Təlimat (2:1†guide (v2).pdf) oxuyun"),
            "Təlimat oxuyun"
        );
    }

    #[test]
    fn non_ascii_digits_are_not_citations() {
        assert_eq!(sanitize("x (١) y"), "x (١) y");
        assert_eq!(sanitize("bənd [٣] və (١:٢)"), "bənd [٣] və (١:٢)");
        assert_eq!(sanitize("x (١) (1) y"), "x (١) y");
    }

    #[test]
    fn not_found_marker_triggers_fallback() {
        assert_eq!(finalize_reply(Some("Not found in documents")), FinalReply::Fallback);
        assert_eq!(finalize_reply(Some(" not found in documents. ")), FinalReply::Fallback);
        assert_eq!(finalize_reply(Some("Sənədlərdə tapılmadı")), FinalReply::Fallback);
        assert_eq!(FinalReply::Fallback.text(), FALLBACK_REPLY);
    }

    #[test]
    fn empty_or_citation_only_reply_triggers_fallback() {
        assert!(finalize_reply(None).is_fallback());
        assert!(finalize_reply(Some("")).is_fallback());
        assert!(finalize_reply(Some(" 【4:0†faq.pdf】 [1] ")).is_fallback());
    }

    #[test]
    fn answers_mentioning_the_marker_are_kept() {
        let reply = finalize_reply(Some("Kod 9999 Not found in documents, amma 0035 var."));
        assert_eq!(
            reply,
            FinalReply::Answer("Kod 9999 Not found in documents, amma 0035 var.".into())
        );
    }

    #[test]
    fn fallback_asks_for_platform_operator_and_phone() {
        assert!(FALLBACK_REPLY.contains("platform"));
        assert!(FALLBACK_REPLY.contains("operator"));
        assert!(FALLBACK_REPLY.contains("telefon nömrəsi"));
    }

    fn marker_soup() -> impl Strategy<Value = String> {
        let piece = prop_oneof![
            "[a-zə ]{1,4}",
            "[0-9]{1,3}",
            "[()\\[\\]【】†:.\n\t]",
            Just("(1:0†".to_string()),
            Just("[2†".to_string()),
        ];
        prop::collection::vec(piece, 0..24).prop_map(|parts| parts.concat())
    }

    fn digit_free_words() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-zəA-Z()\\[\\]†:.,١٢٣]{1,8}", 0..10)
            .prop_map(|words| words.join(" "))
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(text in marker_soup()) {
            let once = sanitize(&text);
            prop_assert_eq!(sanitize(&once), once);
        }

        #[test]
        fn sanitized_text_has_no_markers(text in marker_soup()) {
            let out = sanitize(&text);
            prop_assert!(!FULLWIDTH_MARKER_RE.is_match(&out), "fullwidth marker left in {:?}", out);
            prop_assert!(!BRACKET_MARKER_RE.is_match(&out), "bracket marker left in {:?}", out);
            prop_assert!(!PAREN_MARKER_RE.is_match(&out), "paren marker left in {:?}", out);
        }

        #[test]
        fn digit_free_brackets_are_left_alone(text in digit_free_words()) {
            prop_assert_eq!(sanitize(&text), text);
        }
    }
}
