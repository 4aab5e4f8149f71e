//! Integration tests for the GitHub client against a wiremock server.

use release_bot::github::GitHubClient;
use release_bot_core::contract::{NewRelease, PullRequestProvider};
use release_bot_core::error::ProviderError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> GitHubClient {
    GitHubClient::new(&server.uri(), "acme/shop", "test-token")
}

fn pr_json(number: u64, title: &str, body: Option<&str>) -> serde_json::Value {
    json!({
        "number": number,
        "title": title,
        "body": body,
        "user": { "login": "alice" },
        "html_url": format!("https://github.com/acme/shop/pull/{number}")
    })
}

#[tokio::test]
async fn get_pull_request_maps_fields_and_sends_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/pulls/12"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pr_json(12, "Add login", Some("## What does this PR do?\nLogin"))))
        .mount(&server)
        .await;

    let pr = client(&server).get_pull_request(12).await.expect("pull request");

    assert_eq!(pr.number, 12);
    assert_eq!(pr.title, "Add login");
    assert_eq!(pr.author, "alice");
    assert_eq!(pr.url, "https://github.com/acme/shop/pull/12");
    assert_eq!(pr.body.as_deref(), Some("## What does this PR do?\nLogin"));
}

#[tokio::test]
async fn empty_description_becomes_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/pulls/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pr_json(3, "Tweak", Some(""))))
        .mount(&server)
        .await;

    let pr = client(&server).get_pull_request(3).await.expect("pull request");
    assert_eq!(pr.body, None);
}

#[tokio::test]
async fn latest_release_tag_is_none_without_releases() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/releases/latest"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;

    let tag = client(&server).latest_release_tag().await.expect("no error on 404");
    assert_eq!(tag, None);
}

#[tokio::test]
async fn latest_release_tag_returns_tag_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag_name": "v1.2.3",
            "name": "v1.2.3",
            "body": "notes",
            "html_url": "https://github.com/acme/shop/releases/tag/v1.2.3"
        })))
        .mount(&server)
        .await;

    let tag = client(&server).latest_release_tag().await.expect("tag");
    assert_eq!(tag.as_deref(), Some("v1.2.3"));
}

#[tokio::test]
async fn pull_request_commits_follow_pages() {
    let server = MockServer::start().await;
    let first_page: Vec<_> = (0..100)
        .map(|i| json!({ "sha": format!("a{i}"), "commit": { "message": format!("Change {i} (#{i})") }, "parents": [] }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/pulls/40/commits"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/pulls/40/commits"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "sha": "b", "commit": { "message": "Last change (#200)" }, "parents": [] }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let messages = client(&server)
        .list_pull_request_commits(40)
        .await
        .expect("commits");

    assert_eq!(messages.len(), 101);
    assert_eq!(messages[0], "Change 0 (#0)");
    assert_eq!(messages[100], "Last change (#200)");
}

#[tokio::test]
async fn get_commit_collects_parents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/commits/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": "abc",
            "commit": { "message": "Merge pull request #7 from acme/staging" },
            "parents": [{ "sha": "p1" }, { "sha": "p2" }]
        })))
        .mount(&server)
        .await;

    let commit = client(&server).get_commit("abc").await.expect("commit");
    assert_eq!(commit.parents, vec!["p1".to_string(), "p2".to_string()]);
    assert_eq!(commit.message, "Merge pull request #7 from acme/staging");
}

#[tokio::test]
async fn unauthorized_and_rate_limited_are_distinguished() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/pulls/1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/pulls/2"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/pulls/3"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let github = client(&server);
    assert!(matches!(github.get_pull_request(1).await, Err(ProviderError::Unauthorized)));
    assert!(matches!(github.get_pull_request(2).await, Err(ProviderError::RateLimited)));
    match github.get_pull_request(3).await {
        Err(ProviderError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn create_release_asks_for_generated_notes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/shop/releases"))
        .and(body_partial_json(json!({
            "tag_name": "v1.3.0",
            "target_commitish": "abc",
            "generate_release_notes": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "tag_name": "v1.3.0",
            "name": "v1.3.0",
            "body": "## Release Summary\n- Login",
            "html_url": "https://github.com/acme/shop/releases/tag/v1.3.0"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let release = client(&server)
        .create_release(NewRelease {
            tag: "v1.3.0".to_string(),
            name: "v1.3.0".to_string(),
            body: "## Release Summary\n- Login".to_string(),
            target_sha: "abc".to_string(),
        })
        .await
        .expect("release");

    assert_eq!(release.tag, "v1.3.0");
    assert_eq!(release.url, "https://github.com/acme/shop/releases/tag/v1.3.0");
}

#[tokio::test]
async fn add_label_posts_label_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/shop/issues/9/labels"))
        .and(body_partial_json(json!({ "labels": ["security-review-required"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .add_label(9, "security-review-required")
        .await
        .expect("label added");
}
