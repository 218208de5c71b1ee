// ABOUTME: End-to-end smoke test for a full swarm request driven by a scripted provider.
// ABOUTME: Covers agent creation by the model, delegation, teams, lifecycle tools and the topology export.

use std::sync::Arc;

use serde_json::json;

use opencore_agent::testing::{ScriptedProvider, StaticProviderFactory};
use opencore_agent::{Swarm, SwarmSettings};
use opencore_core::{ActivityKind, AgentStatus, Attachment, Role};

fn scripted_swarm(
    provider: ScriptedProvider,
) -> (Swarm, Arc<ScriptedProvider>, Arc<StaticProviderFactory>) {
    let provider = Arc::new(provider);
    let factory = Arc::new(StaticProviderFactory::new(provider.clone()));
    let swarm = Swarm::new(SwarmSettings::default(), factory.clone());
    (swarm, provider, factory)
}

#[tokio::test]
async fn smoke_test_create_then_delegate() {
    // 1. The manager hires a coder, delegates to it, then reports.
    let (swarm, provider, factory) = scripted_swarm(
        ScriptedProvider::new()
            .call(
                "c1",
                "create_agent",
                json!({
                    "name": "Coder",
                    "role": "Rust Developer",
                    "instructions": "Write small, correct functions.",
                    "model": "anthropic/claude-3-5-sonnet"
                }),
            )
            .call(
                "c2",
                "delegate_task",
                json!({"to_agent": "Coder", "task": "Write fizzbuzz"}),
            )
            .reply("fn fizzbuzz() {}")
            .reply("TASK COMPLETE. Coder delivered fizzbuzz."),
    );

    let reply = swarm.chat("Get me fizzbuzz in Rust", &[]).await;
    assert_eq!(reply, "TASK COMPLETE. Coder delivered fizzbuzz.");
    assert_eq!(provider.remaining(), 0);

    // 2. The coder exists, was created by the manager, and ran on its own model.
    assert!(swarm.contains("Coder"));
    assert!(
        factory
            .requested_models()
            .contains(&"anthropic/claude-3-5-sonnet".to_string())
    );

    // 3. The coder's first request carried the delegated task and the common tools only.
    let requests = provider.requests();
    let coder_request = &requests[2];
    assert_eq!(
        coder_request.last_text().as_deref(),
        Some("Request from Manager: Write fizzbuzz")
    );
    assert_eq!(
        coder_request.tool_names(),
        vec!["create_agent", "delegate_task", "list_agents"]
    );

    // 4. Topology shows both agents and both directions of the delegation.
    let graph = swarm.get_graph_data();
    assert_eq!(graph.nodes.len(), 2);
    assert_eq!(graph.node("Coder").unwrap().parent.as_deref(), Some("Manager"));
    let edges: Vec<(&str, &str)> = graph
        .edges
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();
    assert_eq!(edges, vec![("Manager", "Coder"), ("Coder", "Manager")]);

    // 5. Activity log covers this request only.
    let kinds: Vec<ActivityKind> = swarm.activity_log().iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ActivityKind::Lifecycle,
            ActivityKind::Delegation,
            ActivityKind::Response
        ]
    );

    // 6. The graph serializes in the export shape.
    let exported = serde_json::to_value(&graph).unwrap();
    for key in ["id", "name", "parent", "status", "last_thought"] {
        assert!(exported["nodes"][0].get(key).is_some(), "node missing {}", key);
    }
    assert!(exported["edges"][0]["timestamp"].is_string());
}

#[tokio::test]
async fn smoke_test_team_and_lifecycle() {
    let (swarm, _provider, _factory) = scripted_swarm(
        ScriptedProvider::new()
            .call(
                "t1",
                "create_team",
                json!({
                    "name": "Docs",
                    "goal": "Write the user guide",
                    "lead_role": "Editor",
                    "lead_instructions": "Hire a writer."
                }),
            )
            .call("t2", "toggle_agent", json!({"name": "Docs_Lead"}))
            .call(
                "t3",
                "delegate_task",
                json!({"to_agent": "Docs_Lead", "task": "Start"}),
            )
            .call("t4", "remove_agent", json!({"name": "Docs_Lead"}))
            .reply("ACKNOWLEDGED."),
    );

    let reply = swarm.chat("Set up a docs team", &[]).await;
    assert_eq!(reply, "ACKNOWLEDGED.");

    let manager = swarm.agent("Manager").unwrap();
    let manager = manager.lock().await;
    let results: Vec<String> = manager
        .messages()
        .iter()
        .filter(|m| m.role == Role::Tool)
        .filter_map(|m| m.text())
        .collect();

    assert!(results[0].contains("Team 'Docs' created"));
    assert_eq!(results[1], "Agent 'Docs_Lead' deactivated.");
    assert_eq!(results[2], "Error: Agent 'Docs_Lead' is inactive.");
    assert_eq!(results[3], "Agent 'Docs_Lead' removed.");

    assert!(!swarm.contains("Docs_Lead"));
    assert_eq!(swarm.teams().get("Docs"), Some(&Vec::new()));
    assert_eq!(
        swarm.get_graph_data().node("Manager").unwrap().status,
        AgentStatus::Active
    );
}

#[tokio::test]
async fn smoke_test_attachments_reach_the_provider() {
    let (swarm, provider, _factory) = scripted_swarm(ScriptedProvider::new().reply("Read it."));

    let notes = Attachment::new("notes.txt", "text/plain", "line one");
    let reply = swarm.chat("Summarize", &[notes]).await;
    assert_eq!(reply, "Read it.");

    let sent = provider.requests()[0].last_text().unwrap();
    assert!(sent.contains("Summarize"));
    assert!(sent.contains("--- [Attachment: notes.txt] ---"));
    assert!(sent.contains("line one"));
}

#[tokio::test]
async fn smoke_test_missing_credentials_are_reported_as_configuration() {
    // Production factory with no keys: the request fails before any network call.
    let settings = SwarmSettings::default();
    let factory = Arc::new(opencore_agent::EnvProviderFactory::new(settings.providers.clone()));
    let swarm = Swarm::new(settings, factory);

    let reply = swarm.chat("hello", &[]).await;
    assert_eq!(
        reply,
        "Error: Configuration invalid. Please check your settings (API key or credentials)."
    );
}
