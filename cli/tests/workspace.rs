//! End-to-end runs of the subcommands against a temporary vault.

use std::path::Path;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use vaultgraph_cli::config::VaultConfig;
use vaultgraph_cli::{Vault, VaultGraphConfig, Workspace, commands};
use vaultgraph_embeddings::{
    CancellationToken, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, Result,
    RunOutcome, StatusCounts,
};
use vaultgraph_graph::GraphLink;

/// Embeds text by counting a few topic words.
struct TopicProvider;

#[async_trait]
impl EmbeddingProvider for TopicProvider {
    fn name(&self) -> &str {
        "topic"
    }

    fn model(&self) -> &str {
        "topic-3"
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let text = request.text.to_lowercase();
        let count = |word: &str| text.matches(word).count() as f32;
        let vector = vec![
            count("rust") + 0.01,
            count("garden") + 0.01,
            count("music") + 0.01,
        ];
        EmbeddingResponse::from_vector(vector, "topic-3")
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(full, content).unwrap();
}

fn workspace(root: &Path) -> Workspace {
    let mut config = VaultGraphConfig::default();
    config.generation.inter_request_delay_ms = 0;
    config.graph.threshold = 0.9;
    Workspace::new(Vault::new(root, VaultConfig::default()), config)
}

fn sample_vault() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "rust/ownership.md", "# Ownership\nRust borrow checker, rust lifetimes.");
    write(root, "rust/traits.md", "# Traits\nRust traits and rust generics.");
    write(root, "rust/linked.md", "Rust macros. See [[ownership]].");
    write(root, "garden/tomatoes.md", "Garden tomatoes need sun. #garden");
    write(root, "music/scales.md", "Music scales and music theory.");
    write(root, ".obsidian/app.md", "rust rust rust");
    temp_dir
}

#[tokio::test]
async fn test_generate_then_status() {
    let vault = sample_vault();
    let workspace = workspace(vault.path());

    assert_eq!(
        workspace.status().await,
        StatusCounts {
            new: 5,
            ..StatusCounts::default()
        }
    );

    let mut names = Vec::new();
    let summary = workspace
        .generate(&TopicProvider, &CancellationToken::new(), |_, _, name| {
            names.push(name.to_string())
        })
        .await
        .unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.processed, 5);
    assert_eq!(
        names,
        vec!["tomatoes", "scales", "linked", "ownership", "traits"]
    );
    assert!(vault.path().join(".vaultgraph/embeddings.json").exists());

    assert_eq!(workspace.status().await.up_to_date, 5);

    let again = workspace
        .generate(&TopicProvider, &CancellationToken::new(), |_, _, _| {})
        .await
        .unwrap();
    assert_eq!(again.outcome, RunOutcome::NothingToDo);
}

#[tokio::test]
async fn test_graph_excludes_manual_links() {
    let vault = sample_vault();
    let workspace = workspace(vault.path());
    workspace
        .generate(&TopicProvider, &CancellationToken::new(), |_, _, _| {})
        .await
        .unwrap();

    let graph = workspace.graph().await.unwrap();
    let pairs: Vec<(&str, &str)> = graph
        .edges
        .iter()
        .map(|e| (e.a.as_str(), e.b.as_str()))
        .collect();

    // linked.md links to ownership.md by hand, so only the other rust pairs
    // get similarity edges.
    assert_eq!(
        pairs,
        vec![
            ("rust/linked.md", "rust/traits.md"),
            ("rust/ownership.md", "rust/traits.md"),
        ]
    );
    assert_eq!(graph.stats.nodes, 5);
}

#[tokio::test]
async fn test_deleted_documents_leave_the_cache() {
    let vault = sample_vault();
    let workspace = workspace(vault.path());
    workspace
        .generate(&TopicProvider, &CancellationToken::new(), |_, _, _| {})
        .await
        .unwrap();

    std::fs::remove_file(vault.path().join("music/scales.md")).unwrap();
    let summary = workspace
        .generate(&TopicProvider, &CancellationToken::new(), |_, _, _| {})
        .await
        .unwrap();
    assert_eq!(summary.outcome, RunOutcome::NothingToDo);

    let graph = workspace.graph().await.unwrap();
    assert_eq!(graph.stats.nodes, 4);
    assert!(workspace.related("music/scales.md", 5, 0.0).await.is_err());
}

#[tokio::test]
async fn test_related_and_clear() {
    let vault = sample_vault();
    let workspace = workspace(vault.path());
    workspace
        .generate(&TopicProvider, &CancellationToken::new(), |_, _, _| {})
        .await
        .unwrap();

    let related = workspace.related("rust/traits.md", 2, 0.5).await.unwrap();
    let paths: Vec<&str> = related.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|p| p.starts_with("rust/")));

    workspace.clear().await.unwrap();
    assert_eq!(workspace.status().await.new, 5);
}

#[tokio::test]
async fn test_health_of_custom_provider() {
    let health = commands::health(&TopicProvider).await.unwrap();
    assert!(health.ok);
    assert_eq!(health.model, "topic-3");
}

#[tokio::test]
async fn test_links_of_non_utf8_notes_are_extracted() {
    let vault = sample_vault();
    std::fs::write(
        vault.path().join("rust/latin1.md"),
        b"caf\xe9 rust notes, see [[ownership]]",
    )
    .unwrap();
    let workspace = workspace(vault.path());

    let documents = workspace.vault.scan();
    let links = workspace.vault.links(&documents).await.unwrap();
    assert!(links.contains(&GraphLink::Manual {
        source: "rust/latin1.md".to_string(),
        target: "rust/ownership.md".to_string(),
    }));

    let summary = workspace
        .generate(&TopicProvider, &CancellationToken::new(), |_, _, _| {})
        .await
        .unwrap();
    assert_eq!((summary.processed, summary.failed), (6, 0));
}
