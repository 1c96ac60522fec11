use regex::Regex;
use std::sync::LazyLock;

use crate::types::ContentType;

static CODE_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:function|class|import|export|const|let|var|def|return|fn|struct|impl|pub|async|await)\b",
    )
    .expect("static code-token pattern")
});

static STRUCTURE_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)\||\t|^[ \t]*(?:[-*•][ \t]|\d+[.)][ \t])").expect("static structure pattern")
});

/// Matches per 100 characters.
fn ratio(matches: usize, len: usize) -> f32 {
    if len == 0 {
        return 0.0;
    }
    matches as f32 / len as f32 * 100.0
}

/// Code and structure marker densities of `text`, in matches per 100 chars.
pub fn marker_ratios(text: &str) -> (f32, f32) {
    let len = text.chars().count();
    let code = CODE_TOKENS.find_iter(text).count();
    let structured = STRUCTURE_MARKERS.find_iter(text).count();
    (ratio(code, len), ratio(structured, len))
}

/// Heuristic content classification. Misclassification only changes the
/// chunk size that gets used.
pub fn detect_content_type(text: &str, code_threshold: f32, structured_threshold: f32) -> ContentType {
    let (code, structured) = marker_ratios(text);
    if code > code_threshold {
        ContentType::Code
    } else if structured > structured_threshold {
        ContentType::Structured
    } else {
        ContentType::Narrative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> ContentType {
        detect_content_type(text, 0.5, 0.3)
    }

    #[test]
    fn source_code_is_code() {
        let src = "import os\n\ndef main():\n    return os.getcwd()\n\nclass Foo:\n    pass\n";
        assert_eq!(detect(src), ContentType::Code);

        let rust = "pub fn add(a: i32) -> i32 {\n    let b = a;\n    return b;\n}\n";
        assert_eq!(detect(rust), ContentType::Code);
    }

    #[test]
    fn tables_and_lists_are_structured() {
        let table = "| name | qty |\n|------|-----|\n| a | 1 |\n| b | 2 |\n";
        assert_eq!(detect(table), ContentType::Structured);

        let list = "Shopping:\n- eggs\n- milk\n- bread\n1. first\n2. second\n";
        assert_eq!(detect(list), ContentType::Structured);
    }

    #[test]
    fn prose_is_narrative() {
        let prose = "The river bends twice before reaching the town. Farmers along its banks \
                     grow wheat and barley, and in autumn the fields turn gold.";
        assert_eq!(detect(prose), ContentType::Narrative);
    }

    #[test]
    fn empty_text_is_narrative() {
        assert_eq!(detect(""), ContentType::Narrative);
        assert_eq!(marker_ratios(""), (0.0, 0.0));
    }

    #[test]
    fn thresholds_are_tunable() {
        let prose = "We return home and let the dog out.";
        assert_eq!(detect(prose), ContentType::Code);
        assert_eq!(detect_content_type(prose, 10.0, 10.0), ContentType::Narrative);
    }
}
