//! End-to-end hook tests against a mock GitHub API.

use std::time::Duration;

use serde_json::{Value, json};

use prwarden_service::config::{CacheConfig, GitHubConfig, RetryConfig};
use prwarden_service::{ScopeId, Service, WebhookEvent};
use prwarden_test::MockGitHub;

fn service(mock: &MockGitHub) -> Service {
    let github = GitHubConfig {
        api_url: mock.url("/"),
        bot_username: "prwarden".into(),
        repo: Some("acme/widgets".into()),
        ..Default::default()
    };
    let retry = RetryConfig {
        max_attempts: 3,
        delay: Duration::from_millis(10),
    };
    Service::create(github, &CacheConfig::default(), &retry).unwrap()
}

fn event(name: &str, payload: Value) -> WebhookEvent {
    WebhookEvent::new(name, ScopeId::random(), payload)
}

/// Registers the PR, its issue and its labels on the mock server.
fn mock_pr(mock: &MockGitHub, mergeable: Value, labels: Value) {
    mock.respond(
        "GET",
        "/pr/1",
        json!({
            "number": 1,
            "url": mock.url("/pr/1"),
            "issue_url": mock.url("/issue/1"),
            "diff_url": mock.url("/pr/1.diff"),
            "statuses_url": mock.url("/statuses/abc123"),
            "mergeable": mergeable,
        }),
    );
    mock.respond(
        "GET",
        "/issue/1",
        json!({
            "url": mock.url("/issue/1"),
            "labels_url": mock.url("/issue/1/labels{/name}"),
            "comments_url": mock.url("/issue/1/comments"),
        }),
    );
    mock.respond("GET", "/issue/1/labels", labels);
}

const DIFF_WITH_FRAGMENT: &str = "\
diff --git a/news/1234.bugfix b/news/1234.bugfix
new file mode 100644
index 000..789
--- /dev/null
+++ b/news/1234.bugfix
@@ -0,0 +1 @@
+Fixed it.
";

const DIFF_WITHOUT_FRAGMENT: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
index 123..456 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1 +1 @@
-old
+new
";

#[tokio::test]
async fn test_news_hook_posts_success_for_fragment() {
    prwarden_test::setup();
    let mock = MockGitHub::start().await;
    mock_pr(&mock, Value::Null, json!([]));
    mock.respond_text("GET", "/pr/1.diff", DIFF_WITH_FRAGMENT);
    mock.respond("POST", "/statuses/abc123", json!({}));

    let service = service(&mock);
    let ran = service
        .handle(&event(
            "pull_request",
            json!({"action": "labeled", "pull_request": {"url": mock.url("/pr/1")}}),
        ))
        .await
        .unwrap();

    // `labeled` is only matched by the news hook, not the conflict hook.
    assert_eq!(ran, vec!["news-file"]);

    let status = mock
        .requests()
        .into_iter()
        .find(|r| r.method == "POST" && r.path == "/statuses/abc123")
        .expect("no status was posted");
    let body = status.body.unwrap();
    assert_eq!(body["state"], "success");
    assert_eq!(body["context"], "news-file/pr");
}

#[tokio::test]
async fn test_news_hook_posts_failure_without_fragment() {
    prwarden_test::setup();
    let mock = MockGitHub::start().await;
    mock_pr(&mock, Value::Null, json!([]));
    mock.respond_text("GET", "/pr/1.diff", DIFF_WITHOUT_FRAGMENT);
    mock.respond("POST", "/statuses/abc123", json!({}));

    let service = service(&mock);
    service
        .handle(&event(
            "pull_request",
            json!({"action": "labeled", "pull_request": {"url": mock.url("/pr/1")}}),
        ))
        .await
        .unwrap();

    let status = mock
        .requests()
        .into_iter()
        .find(|r| r.method == "POST" && r.path == "/statuses/abc123")
        .expect("no status was posted");
    assert_eq!(status.body.unwrap()["state"], "failure");
}

#[tokio::test]
async fn test_news_hook_trivial_label_passes_without_fragment() {
    prwarden_test::setup();
    let mock = MockGitHub::start().await;
    mock_pr(&mock, Value::Null, json!([{"name": "trivial"}]));
    mock.respond_text("GET", "/pr/1.diff", DIFF_WITHOUT_FRAGMENT);
    mock.respond("POST", "/statuses/abc123", json!({}));

    let service = service(&mock);
    service
        .handle(&event(
            "pull_request",
            json!({"action": "labeled", "pull_request": {"url": mock.url("/pr/1")}}),
        ))
        .await
        .unwrap();

    let status = mock
        .requests()
        .into_iter()
        .find(|r| r.method == "POST" && r.path == "/statuses/abc123")
        .expect("no status was posted");
    assert_eq!(status.body.unwrap()["state"], "success");
}

#[tokio::test]
async fn test_removed_fragment_does_not_count() {
    prwarden_test::setup();
    let mock = MockGitHub::start().await;
    mock_pr(&mock, Value::Null, json!([]));
    mock.respond_text(
        "GET",
        "/pr/1.diff",
        "\
diff --git a/news/999.bugfix b/news/999.bugfix
deleted file mode 100644
index 789..000
--- a/news/999.bugfix
+++ /dev/null
@@ -1 +0,0 @@
-gone
",
    );
    mock.respond("POST", "/statuses/abc123", json!({}));

    let service = service(&mock);
    service
        .handle(&event(
            "pull_request",
            json!({"action": "labeled", "pull_request": {"url": mock.url("/pr/1")}}),
        ))
        .await
        .unwrap();

    let status = mock
        .requests()
        .into_iter()
        .find(|r| r.method == "POST" && r.path == "/statuses/abc123")
        .expect("no status was posted");
    assert_eq!(status.body.unwrap()["state"], "failure");
}

#[tokio::test]
async fn test_conflict_hook_marks_unmergeable_pr() {
    prwarden_test::setup();
    let mock = MockGitHub::start().await;

    // Mergeability is computed lazily; the first fetch comes back null and
    // the success condition forces a refetch.
    mock_pr(&mock, Value::Null, json!([]));
    mock_pr(&mock, json!(false), json!([]));
    mock.respond_text("GET", "/pr/1.diff", DIFF_WITHOUT_FRAGMENT);
    mock.respond("POST", "/statuses/abc123", json!({}));
    mock.respond("POST", "/issue/1/comments", json!({}));
    mock.respond("POST", "/issue/1/labels", json!({}));

    let service = service(&mock);
    let ran = service
        .handle(&event(
            "pull_request",
            json!({"action": "opened", "pull_request": {"url": mock.url("/pr/1")}}),
        ))
        .await
        .unwrap();
    assert_eq!(ran, vec!["news-file", "merge-conflict"]);

    assert_eq!(mock.hits("GET", "/pr/1"), 2);
    assert_eq!(mock.hits("POST", "/issue/1/comments"), 1);

    let label_post = mock
        .requests()
        .into_iter()
        .find(|r| r.method == "POST" && r.path == "/issue/1/labels")
        .expect("no label was added");
    assert_eq!(label_post.body.unwrap(), json!(["needs rebase or merge"]));
}

#[tokio::test]
async fn test_conflict_hook_clears_label_when_mergeable() {
    prwarden_test::setup();
    let mock = MockGitHub::start().await;

    mock_pr(&mock, json!(true), json!([{"name": "needs rebase or merge"}]));
    mock.respond_text("GET", "/pr/1.diff", DIFF_WITHOUT_FRAGMENT);
    mock.respond("POST", "/statuses/abc123", json!({}));
    mock.respond(
        "DELETE",
        "/issue/1/labels/needs%20rebase%20or%20merge",
        json!({}),
    );

    let service = service(&mock);
    service
        .handle(&event(
            "pull_request",
            json!({"action": "opened", "pull_request": {"url": mock.url("/pr/1")}}),
        ))
        .await
        .unwrap();

    assert_eq!(mock.hits("DELETE", "/issue/1/labels/needs%20rebase%20or%20merge"), 1);
    assert_eq!(mock.hits("POST", "/issue/1/comments"), 0);
}

#[tokio::test]
async fn test_conflict_hook_leaves_consistent_state_alone() {
    prwarden_test::setup();
    let mock = MockGitHub::start().await;

    mock_pr(&mock, json!(true), json!([]));
    mock.respond_text("GET", "/pr/1.diff", DIFF_WITHOUT_FRAGMENT);
    mock.respond("POST", "/statuses/abc123", json!({}));

    let service = service(&mock);
    service
        .handle(&event(
            "pull_request",
            json!({"action": "opened", "pull_request": {"url": mock.url("/pr/1")}}),
        ))
        .await
        .unwrap();

    let writes = mock
        .requests()
        .into_iter()
        .filter(|r| r.method != "GET" && r.path != "/statuses/abc123")
        .count();
    assert_eq!(writes, 0);
}

#[tokio::test]
async fn test_fetches_are_deduplicated_within_a_delivery() {
    prwarden_test::setup();
    let mock = MockGitHub::start().await;

    // Both matching hooks walk PR -> issue -> labels; with one delivery
    // scope each resource is fetched exactly once.
    mock_pr(&mock, json!(true), json!([]));
    mock.respond_text("GET", "/pr/1.diff", DIFF_WITH_FRAGMENT);
    mock.respond("POST", "/statuses/abc123", json!({}));

    let service = service(&mock);
    service
        .handle(&event(
            "pull_request",
            json!({"action": "opened", "pull_request": {"url": mock.url("/pr/1")}}),
        ))
        .await
        .unwrap();

    assert_eq!(mock.hits("GET", "/pr/1"), 1);
    assert_eq!(mock.hits("GET", "/issue/1"), 1);
    assert_eq!(mock.hits("GET", "/issue/1/labels"), 1);
}

#[tokio::test]
async fn test_request_review_command_dismisses_reviews() {
    prwarden_test::setup();
    let mock = MockGitHub::start().await;

    mock.respond(
        "GET",
        "/comment/9",
        json!({
            "url": mock.url("/comment/9"),
            "issue_url": mock.url("/issue/1"),
            "body": "thanks!\n\n@PRwarden request  review\n",
        }),
    );
    mock.respond(
        "GET",
        "/issue/1",
        json!({
            "url": mock.url("/issue/1"),
            "pull_request": {"url": mock.url("/pr/1")},
        }),
    );
    mock.respond(
        "GET",
        "/pr/1",
        json!({"number": 1, "url": mock.url("/pr/1")}),
    );
    mock.respond(
        "GET",
        "/pr/1/reviews",
        json!([
            {"id": 7, "state": "APPROVED"},
            {"id": 8, "state": "COMMENTED"},
        ]),
    );
    mock.respond("PUT", "/pr/1/reviews/7/dismissals", json!({}));

    let service = service(&mock);
    let ran = service
        .handle(&event(
            "issue_comment",
            json!({"action": "created", "comment": {"url": mock.url("/comment/9")}}),
        ))
        .await
        .unwrap();
    assert_eq!(ran, vec!["commands"]);

    // Only the submitted verdict is dismissed, not the plain comment review.
    assert_eq!(mock.hits("PUT", "/pr/1/reviews/7/dismissals"), 1);
    assert_eq!(mock.hits("PUT", "/pr/1/reviews/8/dismissals"), 0);
}

#[tokio::test]
async fn test_request_review_ignores_plain_issues() {
    prwarden_test::setup();
    let mock = MockGitHub::start().await;

    mock.respond(
        "GET",
        "/comment/9",
        json!({
            "url": mock.url("/comment/9"),
            "issue_url": mock.url("/issue/1"),
            "body": "@prwarden request review",
        }),
    );
    mock.respond("GET", "/issue/1", json!({"url": mock.url("/issue/1")}));

    let service = service(&mock);
    service
        .handle(&event(
            "issue_comment",
            json!({"action": "created", "comment": {"url": mock.url("/comment/9")}}),
        ))
        .await
        .unwrap();

    assert!(mock.requests().iter().all(|r| r.method == "GET"));
}

#[tokio::test]
async fn test_unaddressed_comments_run_nothing() {
    prwarden_test::setup();
    let mock = MockGitHub::start().await;

    mock.respond(
        "GET",
        "/comment/9",
        json!({
            "url": mock.url("/comment/9"),
            "issue_url": mock.url("/issue/1"),
            "body": "someone should request review",
        }),
    );

    let service = service(&mock);
    service
        .handle(&event(
            "issue_comment",
            json!({"action": "created", "comment": {"url": mock.url("/comment/9")}}),
        ))
        .await
        .unwrap();

    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn test_unrelated_events_are_skipped() {
    prwarden_test::setup();
    let mock = MockGitHub::start().await;

    let service = service(&mock);
    let ran = service
        .handle(&event("push", json!({"ref": "refs/heads/main"})))
        .await
        .unwrap();

    assert!(ran.is_empty());
    assert!(mock.requests().is_empty());

    let ran = service
        .handle(&event(
            "pull_request",
            json!({"action": "closed", "pull_request": {"url": mock.url("/pr/1")}}),
        ))
        .await
        .unwrap();
    assert!(ran.is_empty());
}
