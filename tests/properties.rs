//! Property tests for the editing engine, normalizer and resolver

use gitvision::core::edit::{EditError, apply};
use gitvision::core::normalize::{Utterance, normalize_text};
use gitvision::core::{Action, ActiveContext, Buffer, Resolution, Resolver};
use proptest::prelude::*;

fn buffer_of(n: usize) -> Buffer
{
    Buffer::from_lines((1..=n).map(|i| format!("row {i}")))
}

/// Words that look like line scaffolding when they appear in user text
fn content_word() -> impl Strategy<Value = &'static str>
{
    prop::sample::select(vec![
        "delete", "remove", "line", "lines", "ln", "ln3", "line5", "3", "7", "-", "through", "one",
        "twenty", "five", "x", "=", "TODO",
    ])
}

/// Command-ish vocabulary; free-form bytes mostly exercise nothing
fn token() -> impl Strategy<Value = &'static str>
{
    prop::sample::select(vec![
        "delete", "remove", "rm", "replace", "line", "lines", "ln", "ln3", "line5", "3", "7", "-", "to",
        "through", "with", "in", "one", "twenty", "five", "hundred", "app.py", "x",
    ])
}

proptest! {
    #[test]
    fn delete_range_shrinks_by_span(n in 1usize..60, a in 1usize..60, b in 1usize..60)
    {
        let (start, end) = (a.min(b), a.max(b));
        prop_assume!(end <= n);
        let out = apply(&buffer_of(n), &Action::DeleteLineRange { path: None, start, end }).unwrap();
        prop_assert_eq!(out.buffer.len(), n - (end - start + 1));

        let expected: Vec<String> = (1..=n)
            .filter(|i| *i < start || *i > end)
            .map(|i| format!("row {i}"))
            .collect();
        let actual: Vec<&str> = out.buffer.lines().collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn insert_after_lands_on_next_line(n in 0usize..40, k in 0usize..40)
    {
        prop_assume!(k <= n);
        let out = apply(&buffer_of(n), &Action::InsertAfterLine { path: None, line: k, text: "new".into() }).unwrap();
        prop_assert_eq!(out.buffer.len(), n + 1);
        prop_assert_eq!(out.buffer.line(k + 1), Some("new"));
    }

    #[test]
    fn insert_then_delete_restores(n in 1usize..40, k in 0usize..40)
    {
        prop_assume!(k <= n);
        let buf = buffer_of(n);
        let ins = apply(&buf, &Action::InsertAfterLine { path: None, line: k, text: "tmp".into() }).unwrap();
        let del = apply(&ins.buffer, &Action::DeleteLineRange { path: None, start: k + 1, end: k + 1 }).unwrap();
        prop_assert_eq!(del.buffer.to_text(), buf.to_text());
    }

    #[test]
    fn out_of_range_is_rejected(n in 0usize..30, extra in 1usize..30)
    {
        let line = n + extra;
        let err = apply(&buffer_of(n), &Action::ReplaceLine { path: None, line, text: "x".into() }).unwrap_err();
        let is_out_of_range = matches!(err, EditError::OutOfRange { .. });
        prop_assert!(is_out_of_range);
    }

    #[test]
    fn normalize_is_idempotent(words in prop::collection::vec(token(), 0..8))
    {
        let s = words.join(" ");
        let once = normalize_text(&s);
        prop_assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn resolution_is_deterministic(
        verb in prop::sample::select(vec!["delete", "remove", "replace", "insert", "git", "create"]),
        noun in prop::sample::select(vec!["line", "lines", "file", "folder", "branch", "status"]),
        n in 1usize..20,
    )
    {
        let text = format!("{verb} {noun} {n}");
        let ctx = ActiveContext::with_path("app.py");
        let resolver = Resolver::new();
        let first = resolver.resolve(&Utterance::new(&text), &ctx);
        let second = resolver.resolve(&Utterance::new(&text), &ctx);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn bare_insert_payload_is_verbatim(
        verb in prop::sample::select(vec!["append", "prepend", "add", "insert"]),
        words in prop::collection::vec(content_word(), 1..8),
    )
    {
        let text = format!("{verb} # {}", words.join(" "));
        prop_assert_eq!(normalize_text(&text), text);
    }

    #[test]
    fn quoted_commit_message_is_never_an_edit(words in prop::collection::vec(content_word(), 1..6))
    {
        let message = words.join(" ");
        let text = format!("git commit -m '{message}'");
        let resolution = Resolver::new().resolve(&Utterance::new(&text), &ActiveContext::with_path("app.py"));
        let Resolution::Action(r) = resolution else {
            return Err(TestCaseError::fail(format!("no action for {text:?}")));
        };
        prop_assert_eq!(r.action, Action::GitCommit { message });
    }
}
