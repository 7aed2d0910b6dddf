//! Follow-up versus new-topic detection
//!
//! Session history is only carried into the prompt when the new question
//! continues the previous one.

use turf_advisor_core::Topic;

const NEW_TOPIC_SIGNALS: &[&str] = &[
    "different question", "new question", "unrelated", "switching topic", "change of topic",
    "another question", "also wondering",
];

const FOLLOW_UP_SIGNALS: &[&str] = &[
    "what about", "how about", "and ", "also ", "what if", "same ", "that ", "the rate",
    "the product", "this disease", "those ",
];

/// Follow-up signals only count near the start of the question
const FOLLOW_UP_WINDOW: usize = 30;

const RELATED_TOPICS: &[&[Topic]] = &[
    &[Topic::Chemical],
    &[Topic::Cultural, Topic::Irrigation, Topic::Fertilizer],
    &[Topic::Equipment],
    &[Topic::Diagnostic, Topic::Disease],
];

fn subjects_differ(previous: Option<&str>, current: Option<&str>) -> bool {
    matches!((previous, current), (Some(p), Some(c)) if p != c)
}

/// Whether `question` starts a new conversation thread.
///
/// A different specific subject (pythium after summer patch) counts as a
/// change even within one topic.
pub fn is_significant_topic_change(
    previous_topic: Option<Topic>,
    current_topic: Option<Topic>,
    question: &str,
    previous_subject: Option<&str>,
    current_subject: Option<&str>,
) -> bool {
    let Some(previous) = previous_topic else {
        return subjects_differ(previous_subject, current_subject);
    };
    let Some(current) = current_topic else {
        return true;
    };

    if previous == current {
        return subjects_differ(previous_subject, current_subject);
    }

    let lower = question.to_lowercase();
    if NEW_TOPIC_SIGNALS.iter().any(|s| lower.contains(s)) {
        return true;
    }

    if RELATED_TOPICS
        .iter()
        .any(|group| group.contains(&previous) && group.contains(&current))
    {
        return subjects_differ(previous_subject, current_subject);
    }

    let opening: String = lower.chars().take(FOLLOW_UP_WINDOW).collect();
    if FOLLOW_UP_SIGNALS.iter().any(|s| opening.contains(s)) {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_history() {
        assert!(!is_significant_topic_change(None, Some(Topic::Disease), "pythium", None, Some("pythium")));
    }

    #[test]
    fn test_same_topic_new_subject() {
        assert!(is_significant_topic_change(
            Some(Topic::Disease),
            Some(Topic::Disease),
            "what about pythium",
            Some("summer patch"),
            Some("pythium"),
        ));
        assert!(!is_significant_topic_change(
            Some(Topic::Disease),
            Some(Topic::Disease),
            "how often should I spray for it",
            Some("pythium"),
            None,
        ));
    }

    #[test]
    fn test_undetected_topic_is_a_change() {
        assert!(is_significant_topic_change(Some(Topic::Chemical), None, "thanks", None, None));
    }

    #[test]
    fn test_related_topics_continue() {
        assert!(!is_significant_topic_change(
            Some(Topic::Irrigation),
            Some(Topic::Fertilizer),
            "should I water in the urea",
            None,
            None,
        ));
        assert!(!is_significant_topic_change(
            Some(Topic::Disease),
            Some(Topic::Diagnostic),
            "the spots are turning brown now",
            Some("dollar spot"),
            None,
        ));
    }

    #[test]
    fn test_follow_up_and_new_topic_signals() {
        assert!(!is_significant_topic_change(
            Some(Topic::Disease),
            Some(Topic::Equipment),
            "what about the sprayer nozzles",
            None,
            None,
        ));
        assert!(is_significant_topic_change(
            Some(Topic::Disease),
            Some(Topic::Equipment),
            "different question: what about the sprayer nozzles",
            None,
            None,
        ));
        assert!(is_significant_topic_change(
            Some(Topic::Disease),
            Some(Topic::Equipment),
            "how do I set bedknife contact",
            None,
            None,
        ));
    }
}
