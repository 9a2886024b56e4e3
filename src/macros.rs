#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build a [`PatternTree`](crate::PatternTree) from a list of categories.
///
/// `that` and `topic` are optional and default to the `*` wildcard. Panics if
/// any key is malformed, so it is meant for fixtures and tests.
///
/// ```
/// let tree = graphmaster::tree! {
///     "HELLO" => 1,
///     "YES", that: "DO YOU LIKE CATS" => 2,
///     "_", topic: "CATS" => 3,
/// };
/// assert_eq!(tree.len(), 3);
/// ```
#[macro_export]
macro_rules! tree {
    (
        $(
            $pattern:literal
            $(, that: $that:literal)?
            $(, topic: $topic:literal)?
            => $template:expr
        ),* $(,)?
    ) => {{
        let mut tree = $crate::PatternTree::new();
        $(
            let that: &str = [$($that,)? ""][0];
            let topic: &str = [$($topic,)? ""][0];
            if let Err(err) = tree.learn($pattern, that, topic, $template) {
                panic!("invalid category {:?}: {}", $pattern, err);
            }
        )*
        tree
    }};
}
