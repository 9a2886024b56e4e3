use std::collections::HashMap;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::tokenizer::pattern_path;
use crate::{Graphmaster, GraphmasterError, Options, PatternTree, render_path};

fn best(tree: &PatternTree<&'static str>, input: &str, that: &str, topic: &str) -> Option<&'static str> {
    tree.match_text(input, that, topic, &Options::default()).unwrap().map(|m| m.template)
}

#[test]
fn priority_examples_matching() {
    let tree = crate::tree! {
        "HELLO THERE" => "exact",
        "HELLO _" => "hello-underscore",
        "HELLO *" => "hello-star",
        "A _" => "a-underscore",
        "A *" => "a-star",
        "X *" => "x-star",
        "_ Y" => "underscore-y",
        "*" => "catch-all",
    };

    // Array of (expected_template, input)
    let cases: Vec<(&str, &str)> = vec![
        ("exact", "HELLO THERE"),
        ("exact", "hello there"),
        ("hello-underscore", "hello you"),
        ("hello-underscore", "hello there friend"),
        ("a-underscore", "A B C"),
        ("a-underscore", "a b"),
        // The literal X at the first position outranks `_` even though
        // "_ Y" would also fit.
        ("x-star", "x y"),
        ("underscore-y", "z y"),
        ("catch-all", "HELLO"),
        ("catch-all", "something else entirely"),
        ("catch-all", "*"),
    ];

    for (expected, input) in cases {
        assert_eq!(best(&tree, input, "", ""), Some(expected), "input {input:?}");
    }
}

#[test]
fn exact_beats_wildcard() {
    let tree = crate::tree! { "HELLO _" => "wildcard", "HELLO THERE" => "exact" };
    assert_eq!(best(&tree, "HELLO THERE", "", ""), Some("exact"));
}

#[test]
fn underscore_beats_star() {
    let tree = crate::tree! { "A *" => "star", "A _" => "underscore" };
    assert_eq!(best(&tree, "A B C", "", ""), Some("underscore"));
}

#[test]
fn round_trip_without_stars() {
    let mut tree = PatternTree::new();
    tree.learn("HELLO", "*", "*", "t").unwrap();

    let empty: [&str; 0] = [];
    let found = tree.match_input(&["HELLO"], &empty, &empty, &Options::default()).unwrap().unwrap();
    assert_eq!(found.template, "t");
    assert!(found.stars.is_empty());
    assert_eq!(found.path, "HELLO <THAT> * <TOPIC> *");
}

#[test]
fn wildcard_capture_keeps_original_text() {
    let tree = crate::tree! { "MY NAME IS _" => "name" };
    let empty: [&str; 0] = [];

    let found = tree.match_input(&["MY", "NAME", "IS", "ADA"], &empty, &empty, &Options::default()).unwrap().unwrap();
    assert_eq!(found.stars.inputs(), ["ADA"]);

    let found = tree.match_text("my name is Ada Lovelace", "", "", &Options::default()).unwrap().unwrap();
    assert_eq!(found.stars.input(1), "Ada Lovelace");
    assert_eq!(found.path, "MY NAME IS _ <THAT> * <TOPIC> *");
}

#[test]
fn greedy_then_shrink() {
    let tree = crate::tree! { "* IS GOOD" => "good" };
    let found = tree.match_text("THIS IS GOOD", "", "", &Options::default()).unwrap().unwrap();
    assert_eq!(found.stars.inputs(), ["THIS"]);

    // Overlapping wildcard patterns still resolve by literal, `_`, `*` at
    // each branch point.
    let tree = crate::tree! {
        "* IS GOOD" => "star-good",
        "* IS GOOD IS GOOD" => "star-good-good",
        "_ IS *" => "underscore-is",
    };
    let found = tree.match_text("THIS IS GOOD IS GOOD", "", "", &Options::default()).unwrap().unwrap();
    assert_eq!(found.template, "underscore-is");
    assert_eq!(found.stars.inputs(), ["THIS IS GOOD", "GOOD"]);
}

#[test]
fn that_and_topic_select_more_specific_categories() {
    let tree = crate::tree! {
        "YES" => "yes",
        "YES", that: "DO YOU LIKE CATS" => "yes-cats",
        "YES", that: "DO YOU LIKE _" => "yes-something",
        "HELLO" => "hello",
        "HELLO", topic: "CATS" => "hello-cats",
    };

    let cases: Vec<(&str, (&str, &str, &str))> = vec![
        ("yes-cats", ("yes", "do you like cats", "")),
        ("yes-something", ("yes", "do you like dogs", "")),
        ("yes", ("yes", "what is your name", "")),
        ("yes", ("yes", "", "")),
        ("hello-cats", ("hello", "", "cats")),
        ("hello", ("hello", "", "dogs")),
        ("hello", ("hello", "", "")),
    ];

    for (expected, (input, that, topic)) in cases {
        assert_eq!(best(&tree, input, that, topic), Some(expected), "{input:?} / {that:?} / {topic:?}");
    }

    let found = tree.match_text("yes", "do you like big dogs", "", &Options::default()).unwrap().unwrap();
    assert_eq!(found.stars.thats(), ["big dogs"]);
    assert!(found.stars.inputs().is_empty());
}

#[test]
fn no_match_without_catch_all() {
    let tree = crate::tree! { "HELLO" => "hello" };
    assert_eq!(best(&tree, "goodbye", "", ""), None);
    assert_eq!(best(&tree, "", "", ""), None);
}

#[test]
fn pruning_keeps_siblings_matchable() {
    let brain = Graphmaster::new();
    brain.learn("A B", "", "", "ab").unwrap();
    brain.learn("A C", "", "", "ac").unwrap();

    assert_eq!(brain.forget("A B", "", "").unwrap(), "ab");
    assert_eq!(brain.match_text("a c", "", "").unwrap().map(|m| m.template), Some("ac"));
    assert!(brain.match_text("a b", "", "").unwrap().is_none());
    brain.read().check_consistency().unwrap();

    brain.forget("A C", "", "").unwrap();
    assert_eq!(brain.stats().nodes, 1);
    assert!(brain.is_empty());
    assert_eq!(
        brain.forget("A C", "", ""),
        Err(GraphmasterError::CategoryNotFound { path: "A C <THAT> * <TOPIC> *".into() })
    );
}

#[test]
fn relearning_after_forget() {
    let brain = Graphmaster::new();
    brain.learn("HELLO *", "", "", 1).unwrap();
    brain.forget("HELLO *", "", "").unwrap();
    assert_eq!(brain.learn("HELLO *", "", "", 2).unwrap(), None);
    assert_eq!(brain.match_text("hello world", "", "").unwrap().map(|m| m.template), Some(2));
}

#[test]
fn budget_stops_adversarial_corpus() {
    let brain = Graphmaster::new();
    for i in 0..20 {
        brain.learn(&format!("_ _ * _ * END{i}"), "", "", i).unwrap();
        brain.learn(&format!("* _ _ * _ STOP{i}"), "", "", i).unwrap();
    }
    let input = vec!["WORD"; 40];
    let empty: [&str; 0] = [];

    let err = brain.match_with_budget(&input, &empty, &empty, 2_000).unwrap_err();
    assert!(matches!(err, GraphmasterError::MatchBudgetExceeded { budget: 2_000, steps: 2_001 }));
}

#[test]
fn metrics_report_steps_within_budget() {
    let brain = Graphmaster::with_options(Options::default().with_step_budget(50));
    brain.learn("HELLO", "", "", ()).unwrap();
    let found = brain.match_text("hello", "", "").unwrap().unwrap();
    assert!(found.metrics.steps > 0);
    assert!(found.metrics.steps <= 50);
    assert!(found.metrics.budget_used(50) <= 1.0);
}

#[test]
fn concurrent_matches_see_whole_mutations() {
    let brain = Graphmaster::new();
    brain.learn("*", "", "", 0u32).unwrap();

    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 1..=100u32 {
                brain.learn(&format!("WORD{i} ALPHA BETA"), "", "", i).unwrap();
            }
            for i in 1..=100u32 {
                brain.forget(&format!("WORD{i} ALPHA BETA"), "", "").unwrap();
            }
        });

        for _ in 0..4 {
            s.spawn(|| {
                for i in 1..=100u32 {
                    let input = format!("word{i} alpha beta");
                    let found = brain.match_text(&input, "", "").unwrap().unwrap();
                    if found.template == i {
                        assert!(found.stars.is_empty());
                    } else {
                        assert_eq!(found.template, 0);
                        assert_eq!(found.stars.input(1), input);
                    }
                    brain.read().check_consistency().unwrap();
                }
            });
        }
    });

    assert_eq!(brain.len(), 1);
    brain.read().check_consistency().unwrap();
}

fn key_strategy() -> impl Strategy<Value = (String, String, String)> {
    let word = prop::sample::select(vec!["A", "B", "C", "_", "*"]);
    let pattern = prop::collection::vec(word, 1..4).prop_map(|words| words.join(" "));
    let that = prop::sample::select(vec!["", "A", "B _"]).prop_map(String::from);
    let topic = prop::sample::select(vec!["", "C", "*"]).prop_map(String::from);
    (pattern, that, topic)
}

proptest! {
    #[test]
    fn learn_and_forget_keep_the_tree_consistent(
        ops in prop::collection::vec((any::<bool>(), key_strategy()), 1..40)
    ) {
        let mut tree = PatternTree::new();
        let mut model: HashMap<String, usize> = HashMap::new();

        for (step, (learn, (pattern, that, topic))) in ops.into_iter().enumerate() {
            let key = render_path(&pattern_path(&pattern, &that, &topic).unwrap());
            if learn {
                let previous = tree.learn(&pattern, &that, &topic, step).unwrap();
                prop_assert_eq!(previous, model.insert(key, step));
            } else {
                match model.remove(&key) {
                    Some(template) => prop_assert_eq!(tree.forget(&pattern, &that, &topic).unwrap(), template),
                    None => {
                        let is_not_found = matches!(
                            tree.forget(&pattern, &that, &topic),
                            Err(GraphmasterError::CategoryNotFound { .. })
                        );
                        prop_assert!(is_not_found);
                    }
                }
            }
            prop_assert_eq!(tree.check_consistency(), Ok(()));
            prop_assert_eq!(tree.len(), model.len());
        }

        let keys: Vec<(String, String, String)> =
            tree.categories().map(|c| (c.pattern().to_string(), c.that().to_string(), c.topic().to_string())).collect();
        for (pattern, that, topic) in keys {
            tree.forget(&pattern, &that, &topic).unwrap();
        }
        prop_assert_eq!(tree.node_count(), 1);
        prop_assert_eq!(tree.stats().height, 0);
    }

    #[test]
    fn literal_patterns_match_themselves(
        patterns in prop::collection::vec(prop::collection::vec(prop::sample::select(vec!["A", "B", "C"]), 1..5), 1..10)
    ) {
        let mut tree = crate::tree! { "*" => usize::MAX, "A _" => usize::MAX - 1, "_ B *" => usize::MAX - 2 };
        for (i, words) in patterns.iter().enumerate() {
            tree.learn(&words.join(" "), "", "", i).unwrap();
        }
        for words in &patterns {
            let pattern = words.join(" ");
            let expected = tree.get(&pattern, "", "").map(|c| c.template);
            let found = tree.match_text(&pattern.to_lowercase(), "", "", &Options::default()).unwrap();
            prop_assert_eq!(found.map(|m| m.template), expected);
        }
    }
}
