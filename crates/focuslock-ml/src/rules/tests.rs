use super::*;

// ============================================================================
// Media marker tests
// ============================================================================

#[test]
fn test_spotify_process_is_distracting() {
    let engine = RuleEngine::default();
    assert_eq!(
        engine.classify("Spotify", "Daily Mix 1"),
        Some(Classification::Distracting)
    );
}

#[test]
fn test_media_marker_beats_educational_keyword() {
    let engine = RuleEngine::default();
    assert_eq!(
        engine.classify("Spotify", "Lecture on History"),
        Some(Classification::Distracting)
    );
}

#[test]
fn test_media_marker_in_title() {
    let engine = RuleEngine::default();
    assert_eq!(
        engine.classify("firefox", "Spotify - Web Player"),
        Some(Classification::Distracting)
    );
}

// ============================================================================
// Video marker tests
// ============================================================================

#[test]
fn test_youtube_with_whole_word_keyword_is_productive() {
    let engine = RuleEngine::default();
    assert_eq!(
        engine.classify("chrome", "Data Structures Class 3 - YouTube"),
        Some(Classification::Productive)
    );
}

#[test]
fn test_hyphenated_word_does_not_match_keyword() {
    let engine = RuleEngine::default();
    assert_eq!(
        engine.classify("chrome", "World-class Music Video - YouTube"),
        Some(Classification::Distracting)
    );
}

#[test]
fn test_keyword_inside_longer_word_does_not_match() {
    let engine = RuleEngine::default();
    // "classic" and "studying" contain keywords but are different words
    assert_eq!(
        engine.classify("chrome", "Classic Rock Hits while studying - YouTube"),
        Some(Classification::Distracting)
    );
}

#[test]
fn test_keyword_next_to_punctuation_matches() {
    let engine = RuleEngine::default();
    assert_eq!(
        engine.classify("chrome", "Python: Lesson #4 (Loops) - YouTube"),
        Some(Classification::Productive)
    );
}

#[test]
fn test_youtube_without_keyword_is_distracting() {
    let engine = RuleEngine::default();
    assert_eq!(
        engine.classify("chrome", "Funny Cats Compilation - YouTube"),
        Some(Classification::Distracting)
    );
}

#[test]
fn test_keyword_in_process_name_is_ignored() {
    let engine = RuleEngine::default();
    // Keywords only count when they appear in the title
    assert_eq!(
        engine.classify("youtube-python-course", "Top 10 Goals"),
        Some(Classification::Distracting)
    );
}

#[test]
fn test_no_marker_defers_to_predictor() {
    let engine = RuleEngine::default();
    assert!(engine.classify("code", "main.rs - focuslock").is_none());
    assert!(engine.classify("", "").is_none());
}

#[test]
fn test_custom_markers_are_lowercased() {
    let engine = RuleEngine::new(&["Tidal"], &["Twitch"], &["Speedrun"]);
    assert_eq!(
        engine.classify("tidal", "Now playing"),
        Some(Classification::Distracting)
    );
    assert_eq!(
        engine.classify("firefox", "SPEEDRUN analysis - Twitch"),
        Some(Classification::Productive)
    );
    assert!(engine.classify("spotify", "anything").is_none());
}

// ============================================================================
// User rule tests
// ============================================================================

#[test]
fn test_add_rule_invalid_regex() {
    let mut engine = RuleEngine::default();
    let rule = Rule {
        pattern: "[invalid".to_string(),
        classification: Classification::Distracting,
    };
    assert!(engine.add_rule(rule).is_err());
    assert_eq!(engine.rule_count(), 0);
}

#[test]
fn test_user_rule_matches_combined_text() {
    let mut engine = RuleEngine::default();
    engine
        .add_rule(Rule {
            pattern: r"^steam\b".to_string(),
            classification: Classification::Distracting,
        })
        .unwrap();
    engine
        .add_rule(Rule {
            pattern: r"jira".to_string(),
            classification: Classification::Productive,
        })
        .unwrap();

    assert_eq!(
        engine.classify("Steam", "Library"),
        Some(Classification::Distracting)
    );
    assert_eq!(
        engine.classify("firefox", "PROJ-12 - Jira"),
        Some(Classification::Productive)
    );
    assert!(engine.classify("firefox", "Docs").is_none());
}

#[test]
fn test_built_in_markers_take_priority_over_user_rules() {
    let mut engine = RuleEngine::default();
    engine
        .add_rule(Rule {
            pattern: "spotify".to_string(),
            classification: Classification::Productive,
        })
        .unwrap();
    assert_eq!(
        engine.classify("spotify", "Focus playlist"),
        Some(Classification::Distracting)
    );
}

#[test]
fn test_rule_deserialize() {
    let json = r#"{"pattern":"(?i)slack","classification":"distracting"}"#;
    let rule: Rule = serde_json::from_str(json).unwrap();
    assert_eq!(rule.pattern, "(?i)slack");
    assert_eq!(rule.classification, Classification::Distracting);
}

// ============================================================================
// Tokenizer tests
// ============================================================================

#[test]
fn test_words_splits_on_punctuation_and_spaces() {
    let collected: Vec<&str> = words("data structures: class 3 | chapter_2").collect();
    assert_eq!(
        collected,
        vec!["data", "structures", "class", "3", "chapter_2"]
    );
}

#[test]
fn test_words_keeps_hyphenated_words_together() {
    let collected: Vec<&str> = words("world-class -intro- don't").collect();
    assert_eq!(collected, vec!["world-class", "intro", "don't"]);
}
