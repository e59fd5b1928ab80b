//! Administrative commands through the client.

use serde_json::json;

use gerrit_ssh::admin::{AdminError, CreateProjectCommand, QueryCommand, ReviewCommand};
use gerrit_ssh::ssh::TransportError;

use crate::support::{client, record, ScriptedProvider, Step};

#[tokio::test]
async fn test_list_projects() {
    let provider = ScriptedProvider::new([Step::ok("All-Projects\n\ninfra/tools\n")]);
    let client = client(&provider);

    let projects = client.list_projects(false).await.unwrap();

    assert_eq!(projects, vec!["All-Projects", "infra/tools"]);
    assert_eq!(provider.commands(), vec!["gerrit ls-projects"]);
    assert_eq!(provider.opens(), 1);
    assert_eq!(provider.closes(), 1);
}

#[tokio::test]
async fn test_close_failure_keeps_command_result() {
    let provider = ScriptedProvider::new([Step::ok("All-Projects\n").fail_close()]);
    let client = client(&provider);

    let projects = client.list_projects(false).await.unwrap();

    assert_eq!(projects, vec!["All-Projects"]);
    assert_eq!(provider.closes(), 1);
}

#[tokio::test]
async fn test_each_command_opens_its_own_session() {
    let provider = ScriptedProvider::new([Step::ok("Administrators\n"), Step::ok("All-Projects\n")]);
    let client = client(&provider);

    client.list_groups(true).await.unwrap();
    client.list_projects(true).await.unwrap();

    assert_eq!(
        provider.commands(),
        vec!["gerrit ls-groups -v", "gerrit ls-projects --description"]
    );
    assert_eq!(provider.opens(), 2);
    assert_eq!(provider.closes(), 2);
}

#[tokio::test]
async fn test_non_zero_exit_is_command_failed() {
    let provider = ScriptedProvider::new([Step::exit(1, "", "fatal: not permitted\n")]);
    let client = client(&provider);

    let err = client.list_groups(false).await.unwrap_err();

    match err {
        AdminError::CommandFailed {
            command,
            code,
            stderr,
        } => {
            assert_eq!(command, "gerrit ls-groups");
            assert_eq!(code, Some(1));
            assert_eq!(stderr, "fatal: not permitted");
        }
        other => panic!("Expected CommandFailed, got {other:?}"),
    }
    assert_eq!(provider.closes(), 1);
}

#[tokio::test]
async fn test_open_failure_is_transport_error() {
    let provider = ScriptedProvider::new([Step::FailOpen]);
    let client = client(&provider);

    let err = client.get_version().await.unwrap_err();

    assert!(matches!(err, AdminError::Transport(TransportError::Open { .. })));
    assert_eq!(provider.closes(), 0);
}

#[tokio::test]
async fn test_get_version() {
    let provider = ScriptedProvider::new([Step::ok("gerrit version 3.4.1\n")]);
    let client = client(&provider);

    assert_eq!(client.get_version().await.unwrap(), "3.4.1");
    assert_eq!(provider.commands(), vec!["gerrit version"]);
}

#[tokio::test]
async fn test_get_version_unexpected_output() {
    let provider = ScriptedProvider::new([Step::ok("gerrit\n")]);
    let client = client(&provider);

    let err = client.get_version().await.unwrap_err();
    assert!(matches!(err, AdminError::UnexpectedOutput { .. }));
}

#[tokio::test]
async fn test_create_project_on_new_server() {
    let provider = ScriptedProvider::new([Step::ok("gerrit version 3.4.1\n"), Step::ok("")]);
    let client = client(&provider);

    client
        .create_project(&CreateProjectCommand::new("infra/tools").description("Tools"))
        .await
        .unwrap();

    assert_eq!(
        provider.commands()[1],
        "gerrit create-project --require-change-id --description \"Tools\" \"infra/tools\""
    );
}

#[tokio::test]
async fn test_create_project_when_version_unknown() {
    let provider = ScriptedProvider::new([
        Step::exit(1, "", "fatal: gerrit: version: not found"),
        Step::ok(""),
    ]);
    let client = client(&provider);

    client
        .create_project(&CreateProjectCommand::new("infra/tools"))
        .await
        .unwrap();

    assert_eq!(
        provider.commands()[1],
        "gerrit create-project --require-change-id --name \"infra/tools\""
    );
}

#[tokio::test]
async fn test_create_group_returns_stderr() {
    let provider = ScriptedProvider::new([Step::exit(0, "", "group created\n")]);
    let client = client(&provider);

    let stderr = client.create_group("Release Managers", false, None).await.unwrap();

    assert_eq!(stderr, "group created\n");
    assert_eq!(provider.commands(), vec!["gerrit create-group \"Release Managers\""]);
}

#[tokio::test]
async fn test_update_project_rejects_key_before_connecting() {
    let provider = ScriptedProvider::new([]);
    let client = client(&provider);

    let err = client.update_project("infra/tools", "owner", "x").await.unwrap_err();

    assert!(matches!(err, AdminError::InvalidUpdateKey(_)));
    assert_eq!(provider.opens(), 0);
}

#[tokio::test]
async fn test_list_plugins() {
    let plugins = json!({
        "replication": {"id": "replication", "version": "v3.4.1"},
        "download-commands": {"id": "download-commands", "version": "v3.4.1"}
    });
    let provider = ScriptedProvider::new([Step::ok(&plugins.to_string())]);
    let client = client(&provider);

    let mut names = client.list_plugins().await.unwrap();
    names.sort();

    assert_eq!(names, vec!["download-commands", "replication"]);
    assert_eq!(provider.commands(), vec!["gerrit plugin ls --format json"]);
}

#[tokio::test]
async fn test_replicate_probes_plugins_once() {
    let provider = ScriptedProvider::new([
        Step::ok("{\"replication\":{}}"),
        Step::ok("scheduled\n"),
        Step::ok(""),
    ]);
    let client = client(&provider);

    client.replicate(None).await.unwrap();
    client.replicate(Some("infra/tools")).await.unwrap();

    assert_eq!(
        provider.commands(),
        vec![
            "gerrit plugin ls --format json",
            "replication start --all",
            "replication start infra/tools",
        ]
    );
}

#[tokio::test]
async fn test_replicate_falls_back_to_legacy_command() {
    let provider = ScriptedProvider::new([
        Step::exit(1, "", "fatal: plugin: not found"),
        Step::ok(""),
    ]);
    let client = client(&provider);

    client.replicate(Some("infra/tools")).await.unwrap();

    assert_eq!(provider.commands()[1], "gerrit replicate infra/tools");
}

#[tokio::test]
async fn test_review() {
    let provider = ScriptedProvider::new([Step::ok("")]);
    let client = client(&provider);

    let review = ReviewCommand::new("12345,2", "infra/tools")
        .message("LGTM")
        .label("code-review", "+2");
    client.review(&review).await.unwrap();

    assert_eq!(
        provider.commands(),
        vec!["gerrit review 12345,2 --project infra/tools --message \"LGTM\" --code-review +2"]
    );
}

#[tokio::test]
async fn test_query_returns_first_row() {
    let provider = ScriptedProvider::new([Step::ok(
        "{\"project\":\"infra/tools\",\"number\":1}\n{\"type\":\"stats\",\"rowCount\":1}\n",
    )]);
    let client = client(&provider);

    let row = client
        .query(&QueryCommand::new("change:1").comments(true))
        .await
        .unwrap();

    assert_eq!(row, Some(record(json!({"project": "infra/tools", "number": 1}))));
    assert_eq!(
        provider.commands(),
        vec!["gerrit query --format json --comments change:1"]
    );
}

#[tokio::test]
async fn test_query_without_output_is_none() {
    let provider = ScriptedProvider::new([Step::ok(""), Step::ok("{}\n")]);
    let client = client(&provider);

    assert!(client.query(&QueryCommand::new("change:1")).await.unwrap().is_none());
    assert!(client.query(&QueryCommand::new("change:1")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_bulk_query_returns_every_row() {
    let provider = ScriptedProvider::new([Step::ok(
        "{\"number\":1}\n{\"number\":2}\n{\"type\":\"stats\",\"rowCount\":2}\n",
    )]);
    let client = client(&provider);

    let rows = client.bulk_query("status:open").await.unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1], record(json!({"number": 2})));
}

#[tokio::test]
async fn test_bulk_query_rejects_non_json() {
    let provider = ScriptedProvider::new([Step::ok("not json\n")]);
    let client = client(&provider);

    let err = client.bulk_query("status:open").await.unwrap_err();
    assert!(matches!(err, AdminError::Json(_)));
}
