use regex::Regex;
use std::sync::LazyLock;

/// Marker the assistant is told to answer with when the documents have
/// nothing relevant. The sanitizer swaps it for a clarifying question.
pub const NOT_FOUND_MARKER: &str = "Not found in documents";

const INSTRUCTIONS: &str = r#"You are Asİm, the support assistant for the Asan İmza mobile signature service.

Rules:
1. Before answering, ALWAYS search the attached documents with the file_search tool. Answer only from what the documents say.
2. Reply in the same language the user wrote in (Azerbaijani, Russian or English).
3. If the user's message looks like an error code (for example "0035" or "xəta 112"), find that code in the documents and answer in exactly this layout:
ERROR_CODE: <code>
TITLE: <short title>
DESCRIPTION: <what the error means>
CAUSES: <why it happens>
SOLUTION: <what the user should do>
4. If the code matches more than one entry, repeat the whole layout once per entry, separated by a blank line.
5. If the documents contain nothing relevant, reply with exactly: Not found in documents
6. Do not mention files, sources or citations in the answer."#;

/// Appended to the run instructions when the first attempt answered without
/// searching.
pub const STRICT_INSTRUCTIONS: &str = "Your previous answer was given without searching the documents. \
You MUST call the file_search tool now and base the answer only on the passages it returns. \
Do not answer from memory. If the search returns nothing relevant, reply with exactly: Not found in documents";

static ERROR_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:(?:error|xəta|xeta|kod|code|ошибка|код)\s*[:#№-]?\s*)?#?\s*([0-9]{3,5})\s*$")
        .expect("valid regex")
});

/// Returns the code when the whole message is an error code, optionally with
/// a leading "error"/"xəta"/"kod" word.
pub fn looks_like_error_code(message: &str) -> Option<&str> {
    ERROR_CODE_RE
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Wraps the raw user message with the search and formatting instructions.
pub fn enrich(message: &str) -> String {
    let message = message.trim();
    let hint = match looks_like_error_code(message) {
        Some(code) => format!("\n\nThe user's message is error code {code}. Use the error-code layout."),
        None => String::new(),
    };

    format!("{INSTRUCTIONS}{hint}\n\nUser message:\n{message}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_bare_and_prefixed_codes() {
        assert_eq!(looks_like_error_code("0035"), Some("0035"));
        assert_eq!(looks_like_error_code("  xəta 112 "), Some("112"));
        assert_eq!(looks_like_error_code("Error: 4021"), Some("4021"));
        assert_eq!(looks_like_error_code("kod #0035"), Some("0035"));
    }

    #[test]
    fn ignores_questions_containing_numbers() {
        assert_eq!(looks_like_error_code("0035 xətası nə deməkdir?"), None);
        assert_eq!(looks_like_error_code("12"), None);
        assert_eq!(looks_like_error_code("+994501234567"), None);
    }

    #[test]
    fn only_ascii_digits_form_a_code() {
        assert_eq!(looks_like_error_code("٠٠٣٥"), None);
        assert_eq!(looks_like_error_code("xəta ١١٢"), None);
    }

    #[test]
    fn enrichment_keeps_message_and_demands_search() {
        let prompt = enrich("Sertifikatımı necə yeniləyim?");
        assert!(prompt.ends_with("User message:\nSertifikatımı necə yeniləyim?"));
        assert!(prompt.contains("file_search"));
        assert!(prompt.contains("same language"));
        assert!(prompt.contains(NOT_FOUND_MARKER));
        assert!(!prompt.contains("The user's message is error code"));
    }

    #[test]
    fn enrichment_lists_all_five_headings() {
        let prompt = enrich("0035");
        for heading in ["ERROR_CODE:", "TITLE:", "DESCRIPTION:", "CAUSES:", "SOLUTION:"] {
            assert!(prompt.contains(heading), "missing {heading}");
        }
        assert!(prompt.contains("The user's message is error code 0035."));
    }

    #[test]
    fn enrichment_is_deterministic() {
        assert_eq!(enrich("salam"), enrich("salam"));
    }
}
