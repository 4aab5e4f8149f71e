use release_bot_core::chat::Priority;
use release_bot_core::config::BotConfig;
use release_bot_core::contract::{
    Commit, MockChatClient, MockPullRequestProvider, PostedMessage, PullRequest, Release,
};
use release_bot_core::error::ProviderError;
use release_bot_core::pipeline::{
    announce_release, fill_release_summary, is_release_title, notify_pull_request,
    open_deploy_pull_request, publish_release, release, summarize_deploy_pull_request,
    RunStatus,
};

fn pr(number: u64, title: &str, body: Option<&str>) -> PullRequest {
    PullRequest {
        number,
        title: title.to_string(),
        body: body.map(str::to_string),
        author: "alice".to_string(),
        url: format!("https://github.com/acme/shop/pull/{number}"),
    }
}

fn config() -> BotConfig {
    let mut config = BotConfig::default();
    config.chat.channel = "C1".to_string();
    config
}

fn posted(ts: &str) -> PostedMessage {
    PostedMessage {
        ok: true,
        timestamp: Some(ts.to_string()),
        error: None,
    }
}

fn published(tag: &str, body: &str) -> Release {
    Release {
        tag: tag.to_string(),
        name: tag.to_string(),
        body: body.to_string(),
        url: format!("https://github.com/acme/shop/releases/tag/{tag}"),
    }
}

#[tokio::test]
async fn open_deploy_pull_request_creates_one_when_missing() {
    let mut provider = MockPullRequestProvider::new();
    provider
        .expect_list_open_pull_requests()
        .returning(|_| Ok(vec![pr(3, "Add login", None)]));
    provider
        .expect_create_pull_request()
        .withf(|req| req.head == "staging" && req.base == "main" && req.title == "Deploy to production")
        .times(1)
        .returning(|req| Ok(pr(60, &req.title, Some(&req.body))));

    let outcome = open_deploy_pull_request(&provider, &config()).await;
    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(outcome.reason.as_deref(), Some("Opened deploy pull request #60"));
}

#[tokio::test]
async fn open_deploy_pull_request_skips_when_open() {
    let mut provider = MockPullRequestProvider::new();
    provider
        .expect_list_open_pull_requests()
        .returning(|_| Ok(vec![pr(50, "Deploy to production", None)]));

    let outcome = open_deploy_pull_request(&provider, &config()).await;
    assert_eq!(outcome.status, RunStatus::Skipped);
}

#[tokio::test]
async fn summarize_rewrites_deploy_body_and_comments_on_missing_descriptions() {
    let mut provider = MockPullRequestProvider::new();
    provider
        .expect_list_open_pull_requests()
        .returning(|_| Ok(vec![pr(50, "Deploy to production", None)]));
    provider.expect_list_pull_request_commits().returning(|_| {
        Ok(vec![
            "Add export (#1)".to_string(),
            "Merge pull request #2 from acme/quick-fix".to_string(),
            "Deploy to production (#50)".to_string(),
        ])
    });
    provider.expect_get_pull_request().returning(|n| match n {
        1 => Ok(pr(1, "Export", Some("## What does this PR do?\nAdds export\n## Type of change\n- [x] Feature"))),
        2 => Ok(pr(2, "Quick fix", None)),
        _ => Ok(pr(n, "Deploy to production", None)),
    });
    provider
        .expect_update_pull_request_body()
        .withf(|number, body| {
            *number == 50
                && body.contains("- #1 by @alice")
                && !body.contains("#2 by")
                && body.contains("## Release Actions\n- New Feature")
        })
        .times(1)
        .returning(|_, _| Ok(()));
    provider
        .expect_create_comment()
        .withf(|number, body| *number == 2 && body.contains("No PR description provided"))
        .times(1)
        .returning(|_, _| Ok(()));

    let outcome = summarize_deploy_pull_request(&provider, &config()).await;
    assert_eq!(outcome.status, RunStatus::Success, "{outcome:?}");
    assert_eq!(outcome.reason.as_deref(), Some("Summarised 1 pull requests into #50"));
}

#[tokio::test]
async fn summarize_skips_without_deploy_pull_request() {
    let mut provider = MockPullRequestProvider::new();
    provider.expect_list_open_pull_requests().returning(|_| Ok(vec![]));

    let outcome = summarize_deploy_pull_request(&provider, &config()).await;
    assert_eq!(outcome.status, RunStatus::Skipped);
}

#[tokio::test]
async fn summarize_reports_provider_failure_as_error() {
    let mut provider = MockPullRequestProvider::new();
    provider
        .expect_list_open_pull_requests()
        .returning(|_| Err(ProviderError::Unauthorized));

    let outcome = summarize_deploy_pull_request(&provider, &config()).await;
    assert!(outcome.is_error());
    assert!(outcome.reason.unwrap().contains("Unauthorized"));
}

fn summary_source(provider: &mut MockPullRequestProvider, target_body: &'static str) {
    provider.expect_get_pull_request().returning(move |n| match n {
        1 => Ok(pr(1, "Export", Some("## What does this PR do?\nAdds export"))),
        _ => Ok(pr(n, "Release 1.3", Some(target_body))),
    });
}

#[tokio::test]
async fn fill_release_summary_overwrites_only_its_section() {
    let mut provider = MockPullRequestProvider::new();
    summary_source(&mut provider, "Intro\n\n## Release Summary\nold\n\n## Notes\nkeep");
    provider
        .expect_update_pull_request_body()
        .withf(|number, body| {
            *number == 9 && body == "Intro\n\n## Release Summary\n\n- Adds export\n\n## Notes\nkeep"
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let outcome = fill_release_summary(&provider, 9, &[1], &config()).await;
    assert_eq!(outcome.status, RunStatus::Success);
}

#[tokio::test]
async fn fill_release_summary_is_idempotent() {
    let mut provider = MockPullRequestProvider::new();
    summary_source(&mut provider, "Intro\n\n## Release Summary\n\n- Adds export\n");

    let outcome = fill_release_summary(&provider, 9, &[1], &config()).await;
    assert_eq!(outcome.status, RunStatus::Skipped);
}

#[tokio::test]
async fn fill_release_summary_comments_on_contributors_without_description() {
    let mut provider = MockPullRequestProvider::new();
    provider.expect_get_pull_request().returning(|n| match n {
        1 => Ok(pr(1, "Export", Some("## What does this PR do?\nAdds export"))),
        2 => Ok(pr(2, "Hotfix", None)),
        _ => Ok(pr(n, "Release 1.3", Some("Intro\n"))),
    });
    provider
        .expect_create_comment()
        .withf(|number, body| *number == 2 && body.contains("No PR description provided"))
        .times(1)
        .returning(|_, _| Ok(()));
    provider
        .expect_update_pull_request_body()
        .withf(|number, body| *number == 9 && body == "Intro\n\n## Release Summary\n\n- Adds export\n")
        .times(1)
        .returning(|_, _| Ok(()));

    let outcome = fill_release_summary(&provider, 9, &[1, 2], &config()).await;
    assert_eq!(outcome.status, RunStatus::Success, "{outcome:?}");
}

#[tokio::test]
async fn publish_release_fails_when_the_version_cannot_be_bumped() {
    let mut provider = MockPullRequestProvider::new();
    provider
        .expect_latest_release_tag()
        .returning(|| Ok(Some("v18446744073709551615.0.0".to_string())));
    provider
        .expect_get_commit()
        .returning(|_| Ok(merge_commit("\n## Release Actions\n- Breaking Change\n")));
    provider.expect_create_release().never();

    let outcome = release::<_, MockChatClient>(&provider, None, "abc", "acme/shop", &config()).await;
    assert!(outcome.is_error());
    assert!(outcome.reason.unwrap().contains("Invalid version format"));
}

fn merge_commit(actions: &str) -> Commit {
    Commit {
        sha: "abc".to_string(),
        message: format!(
            "Deploy to production (#50)\n\n## Release Pull Requests\n- #1 by @alice\n\n## Release Summary\n- Adds export\n{actions}"
        ),
        parents: vec!["p1".to_string(), "p2".to_string()],
    }
}

#[tokio::test]
async fn publish_release_bumps_from_release_actions() {
    let mut provider = MockPullRequestProvider::new();
    provider
        .expect_latest_release_tag()
        .returning(|| Ok(Some("v1.2.3".to_string())));
    provider
        .expect_get_commit()
        .returning(|_| Ok(merge_commit("\n## Release Actions\n- New Feature\n")));
    provider
        .expect_create_release()
        .withf(|req| {
            req.tag == "v1.3.0"
                && req.target_sha == "abc"
                && req.body == "## Release Summary\n- Adds export\n\n## Release Actions\n- New Feature"
        })
        .times(1)
        .returning(|req| Ok(published(&req.tag, &req.body)));

    let published = publish_release(&provider, "abc").await.expect("release");
    assert_eq!(published.tag, "v1.3.0");
}

#[tokio::test]
async fn first_release_starts_from_zero() {
    let mut provider = MockPullRequestProvider::new();
    provider.expect_latest_release_tag().returning(|| Ok(None));
    provider
        .expect_get_commit()
        .returning(|_| Ok(merge_commit("\n## Release Actions\n- Breaking Change\n")));
    provider
        .expect_create_release()
        .withf(|req| req.tag == "v1.0.0")
        .times(1)
        .returning(|req| Ok(published(&req.tag, &req.body)));

    let published = publish_release(&provider, "abc").await.expect("release");
    assert_eq!(published.tag, "v1.0.0");
}

#[tokio::test]
async fn missing_latest_release_counts_as_first_release() {
    let mut provider = MockPullRequestProvider::new();
    provider
        .expect_latest_release_tag()
        .returning(|| Err(ProviderError::NotFound("/releases/latest".to_string())));
    provider.expect_get_commit().returning(|_| Ok(merge_commit("")));
    provider
        .expect_create_release()
        .withf(|req| req.tag == "v0.0.1")
        .times(1)
        .returning(|req| Ok(published(&req.tag, &req.body)));

    assert!(publish_release(&provider, "abc").await.is_ok());
}

#[tokio::test]
async fn invalid_latest_tag_is_an_error_outcome() {
    let mut provider = MockPullRequestProvider::new();
    provider
        .expect_latest_release_tag()
        .returning(|| Ok(Some("release-7".to_string())));

    let outcome = release::<_, MockChatClient>(&provider, None, "abc", "acme/shop", &config()).await;
    assert!(outcome.is_error());
    assert!(outcome.reason.unwrap().contains("Invalid version format"));
}

#[tokio::test]
async fn release_announces_when_chat_is_given() {
    let mut provider = MockPullRequestProvider::new();
    provider
        .expect_latest_release_tag()
        .returning(|| Ok(Some("v1.2.3".to_string())));
    provider.expect_get_commit().returning(|_| Ok(merge_commit("")));
    provider
        .expect_create_release()
        .returning(|req| Ok(published(&req.tag, &req.body)));

    let mut chat = MockChatClient::new();
    chat.expect_list_recent_messages().returning(|_, _| Ok(vec![]));
    chat.expect_post_message()
        .withf(|channel, text, thread| {
            channel == "C1"
                && text.starts_with("<https://github.com/acme/shop/releases/tag/v1.2.4|Deploying v1.2.4> to `acme/shop`")
                && thread.is_none()
        })
        .times(1)
        .returning(|_, _, _| Ok(posted("1.1")));
    chat.expect_get_permalink()
        .returning(|_, _| Ok("https://acme.slack.com/archives/C1/p11".to_string()));

    let outcome = release(&provider, Some(&chat), "abc", "acme/shop", &config()).await;
    assert_eq!(outcome.status, RunStatus::Success, "{outcome:?}");
    assert_eq!(outcome.thread_url.as_deref(), Some("https://acme.slack.com/archives/C1/p11"));
}

#[tokio::test]
async fn announce_is_skipped_when_already_posted() {
    let mut chat = MockChatClient::new();
    chat.expect_list_recent_messages().returning(|_, _| {
        Ok(vec![
            "unrelated".to_string(),
            "<https://github.com/acme/shop/releases/tag/v1.3.0|Deploying v1.3.0> to `acme/shop`\nnotes".to_string(),
        ])
    });

    let outcome = announce_release(&chat, &published("v1.3.0", "notes"), "acme/shop", &config()).await;
    assert_eq!(outcome.status, RunStatus::Skipped);
}

#[test]
fn release_titles_match_whole_words() {
    let keywords = BotConfig::default().release.skip_title_keywords;
    assert!(is_release_title("Release v2", &keywords));
    assert!(is_release_title("Deploy to production", &keywords));
    assert!(is_release_title("[deploy] bump", &keywords));
    assert!(!is_release_title("Redeploy script cleanup", &keywords));
    assert!(!is_release_title("Add login", &keywords));
}

#[tokio::test]
async fn notify_skips_release_pull_requests() {
    let mut provider = MockPullRequestProvider::new();
    provider
        .expect_get_pull_request()
        .returning(|n| Ok(pr(n, "Release v2", Some("## What does this PR do?\nShip"))));
    let chat = MockChatClient::new();

    let outcome = notify_pull_request(&provider, &chat, 7, None, vec![], &config()).await;
    assert_eq!(outcome.status, RunStatus::Skipped);
    assert_eq!(outcome.reason.as_deref(), Some("Production deploy or release PR"));
}

#[tokio::test]
async fn notify_skips_duplicates() {
    let mut provider = MockPullRequestProvider::new();
    provider
        .expect_get_pull_request()
        .returning(|n| Ok(pr(n, "Add login", Some("## What does this PR do?\nAdds login"))));
    let mut chat = MockChatClient::new();
    chat.expect_list_recent_messages().returning(|_, _| {
        Ok(vec!["Reviewing <https://github.com/acme/shop/pull/12|Add login>\n*Priority: low*".to_string()])
    });

    let outcome = notify_pull_request(&provider, &chat, 12, Some(Priority::Low), vec![], &config()).await;
    assert_eq!(outcome.status, RunStatus::Skipped);
    assert_eq!(outcome.reason.as_deref(), Some("Review already exists"));
}

#[tokio::test]
async fn high_priority_notification_is_threaded_and_escalated() {
    let mut provider = MockPullRequestProvider::new();
    provider.expect_get_pull_request().returning(|n| {
        Ok(pr(
            n,
            "Add login",
            Some("## What does this PR do?\nAdds login for @alice\n## Type of change\n- [x] Feature"),
        ))
    });
    provider
        .expect_create_comment()
        .withf(|number, body| {
            *number == 12
                && body.contains("https://acme.slack.com/archives/C1/p11")
                && body.contains("Token stored in plain text")
        })
        .times(1)
        .returning(|_, _| Ok(()));
    provider
        .expect_list_labels()
        .returning(|| Ok(vec!["bug".to_string()]));
    provider
        .expect_create_label()
        .withf(|name, color, _| name == "security-review-required" && color == "d73a4a")
        .times(1)
        .returning(|_, _, _| Ok(()));
    provider
        .expect_add_label()
        .withf(|number, name| *number == 12 && name == "security-review-required")
        .times(1)
        .returning(|_, _| Ok(()));

    let mut chat = MockChatClient::new();
    chat.expect_list_recent_messages().returning(|_, _| Ok(vec![]));
    chat.expect_post_message()
        .withf(|_, text, thread| {
            thread.is_none()
                && text.starts_with("Reviewing <https://github.com/acme/shop/pull/12|Add login>\n*Priority: high")
        })
        .times(1)
        .returning(|_, _, _| Ok(posted("1.1")));
    chat.expect_post_message()
        .withf(|_, text, thread| {
            thread.as_deref() == Some("1.1") && text.contains("Token stored in plain text")
        })
        .times(1)
        .returning(|_, _, _| Ok(posted("1.2")));
    chat.expect_get_permalink()
        .withf(|channel, ts| channel == "C1" && ts == "1.1")
        .returning(|_, _| Ok("https://acme.slack.com/archives/C1/p11".to_string()));

    let outcome = notify_pull_request(
        &provider,
        &chat,
        12,
        Some(Priority::High),
        vec!["## Review\n- Token stored in plain text".to_string()],
        &config(),
    )
    .await;

    assert_eq!(outcome.status, RunStatus::Success, "{outcome:?}");
    assert_eq!(outcome.priority.as_deref(), Some("high"));
    assert_eq!(outcome.thread_url.as_deref(), Some("https://acme.slack.com/archives/C1/p11"));
    assert_eq!(outcome.reason.as_deref(), Some("Notified #12"));
}

#[tokio::test]
async fn rejected_post_is_an_error_outcome() {
    let mut provider = MockPullRequestProvider::new();
    provider
        .expect_get_pull_request()
        .returning(|n| Ok(pr(n, "Add login", Some("## What does this PR do?\nAdds login"))));
    let mut chat = MockChatClient::new();
    chat.expect_list_recent_messages().returning(|_, _| Ok(vec![]));
    chat.expect_post_message().returning(|_, _, _| {
        Ok(PostedMessage {
            ok: false,
            timestamp: None,
            error: Some("channel_not_found".to_string()),
        })
    });

    let outcome = notify_pull_request(&provider, &chat, 12, None, vec![], &config()).await;
    assert!(outcome.is_error());
    assert!(outcome.reason.unwrap().contains("channel_not_found"));
}
