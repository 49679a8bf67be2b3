use std::sync::LazyLock;

use regex::Regex;

/// A trimmed line opens a new step when it starts with a digit and carries a
/// `.` within its first four characters (ordinals "1." through "999.").
static STEP_START_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d.{0,2}\.").unwrap());

/// Splits one instruction block into ordered step strings.
///
/// Heuristic numbered-list splitter, not an outline grammar: it expects the
/// flat `1.`/`2.` lists the instruct role emits. Nested or lettered sub-steps
/// fold into their parent step, and text before the first numbered line is
/// dropped. Continuation lines are space-joined onto the open step. Never
/// fails; malformed input degrades to zero or partial steps.
pub fn parse_steps(instructions: &str) -> Vec<String> {
    let mut steps = Vec::new();
    let mut current = String::new();

    for line in instructions.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if STEP_START_RE.is_match(line) {
            if !current.is_empty() {
                steps.push(std::mem::take(&mut current));
            }
            current = line.to_string();
        } else if !current.is_empty() {
            current.push(' ');
            current.push_str(line);
        }
    }

    if !current.is_empty() {
        steps.push(current);
    }

    tracing::debug!(count = steps.len(), "parsed instruction steps");
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_lines_become_ordered_steps() {
        let steps = parse_steps("1. Click X\n2. Click Y\n3. Click Z");
        assert_eq!(steps, vec!["1. Click X", "2. Click Y", "3. Click Z"]);
    }

    #[test]
    fn test_step_keeps_its_numbering_prefix() {
        let steps = parse_steps("1. Open the menu");
        assert_eq!(steps.len(), 1);
        assert!(steps[0].starts_with("1."));
    }

    #[test]
    fn test_reparsing_an_extracted_step_is_identity() {
        let steps = parse_steps("1. Click the red Submit button\n2. Check your email");
        for step in &steps {
            assert_eq!(parse_steps(step), vec![step.clone()]);
        }
    }

    #[test]
    fn test_continuation_lines_join_open_step() {
        let steps = parse_steps("1. Click the button\nlabeled Continue\n2. Wait");
        assert_eq!(steps, vec!["1. Click the button labeled Continue", "2. Wait"]);
    }

    #[test]
    fn test_text_before_first_numbered_line_is_dropped() {
        let steps = parse_steps("Here is what to do:\n1. Click X");
        assert_eq!(steps, vec!["1. Click X"]);
    }

    #[test]
    fn test_empty_input_yields_no_steps() {
        assert!(parse_steps("").is_empty());
        assert!(parse_steps("\n  \n").is_empty());
    }

    #[test]
    fn test_unnumbered_text_alone_yields_no_steps() {
        assert!(parse_steps("just a sentence with no list").is_empty());
    }

    #[test]
    fn test_ordinals_up_to_three_digits() {
        let steps = parse_steps("99. Click X\n999. Click Y");
        assert_eq!(steps.len(), 2);

        // Four-digit ordinals miss the first-four-characters window and
        // fold into the previous step.
        let steps = parse_steps("999. Click X\n1000. Click Y");
        assert_eq!(steps, vec!["999. Click X 1000. Click Y"]);
    }

    #[test]
    fn test_lettered_sub_steps_fold_into_parent() {
        let steps = parse_steps("1. Do the following\na. First thing\nb. Second thing");
        assert_eq!(steps, vec!["1. Do the following a. First thing b. Second thing"]);
    }

    #[test]
    fn test_blank_lines_between_steps_are_ignored() {
        let steps = parse_steps("1. Click X\n\n2. Click Y\n");
        assert_eq!(steps, vec!["1. Click X", "2. Click Y"]);
    }
}
