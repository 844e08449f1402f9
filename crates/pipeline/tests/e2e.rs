//! End-to-end build tests — raw sources in, provider payload out.

use std::sync::Arc;

use loreweave_core::budget::TokenBudget;
use loreweave_core::message::ChatMessage;
use loreweave_core::source::{ContentItem, PromptDefinition};
use loreweave_core::worldbook::WorldBookEntry;
use loreweave_pipeline::{BuildOptions, InMemoryLibrary, PromptEngine};
use loreweave_providers::{OutputFormat, ProviderPayload};
use loreweave_worldbook::InMemoryTimedEffects;

fn engine(definition: PromptDefinition) -> PromptEngine {
    let library = InMemoryLibrary::new();
    library.insert(definition);
    PromptEngine::new(Arc::new(library), Arc::new(InMemoryTimedEffects::new()))
}

fn assistant_definition() -> PromptDefinition {
    PromptDefinition {
        id: "preset-1".into(),
        items: vec![{
            let mut item = ContentItem::new("main_system", "You are a helpful assistant.");
            item.role = "system".into();
            item
        }],
        world_book: Vec::new(),
    }
}

#[tokio::test]
async fn openai_build_preserves_history_and_input() {
    let engine = engine(assistant_definition());
    let history = vec![
        ChatMessage::user("Once upon a time"),
        ChatMessage::assistant("a dragon slept beneath the city."),
        ChatMessage::user("What happened next?"),
    ];
    let options = BuildOptions {
        session_id: "session-1".into(),
        message_index: 3,
        budget: TokenBudget::new(4096),
        ..BuildOptions::default()
    };

    let outcome = engine
        .build("preset-1", &options, Some("Continue the story"), &history)
        .await
        .unwrap();

    assert!(!outcome.stats.over_budget);
    let ProviderPayload::OpenAi(messages) = &outcome.result else {
        panic!("expected OpenAI payload");
    };
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0].role, "system");
    assert_eq!(messages[0].content, "You are a helpful assistant.");
    assert_eq!(messages[1].content, "Once upon a time");
    assert_eq!(messages[2].content, "a dragon slept beneath the city.");
    assert_eq!(messages[3].content, "What happened next?");
    assert_eq!(messages[4].role, "user");
    assert_eq!(messages[4].content, "Continue the story");
}

#[tokio::test]
async fn claude_build_lifts_system_prompt() {
    let engine = engine(assistant_definition());
    let options = BuildOptions {
        session_id: "session-1".into(),
        format: OutputFormat::Claude,
        ..BuildOptions::default()
    };

    let outcome = engine
        .build("preset-1", &options, Some("Hello"), &[])
        .await
        .unwrap();

    let ProviderPayload::Claude(payload) = &outcome.result else {
        panic!("expected Claude payload");
    };
    assert_eq!(payload.system.as_deref(), Some("You are a helpful assistant."));
    assert_eq!(payload.messages.len(), 1);
    assert_eq!(payload.messages[0].role, "user");
    assert_eq!(payload.messages[0].content, "Hello");
}

#[tokio::test]
async fn gemini_build_emits_system_instruction() {
    let engine = engine(assistant_definition());
    let options = BuildOptions {
        session_id: "session-1".into(),
        format: OutputFormat::Gemini,
        ..BuildOptions::default()
    };

    let outcome = engine
        .build("preset-1", &options, Some("hi"), &[])
        .await
        .unwrap();

    let ProviderPayload::Gemini(payload) = &outcome.result else {
        panic!("expected Gemini payload");
    };
    let instruction = payload.system_instruction.as_ref().unwrap();
    assert_eq!(instruction.parts[0].text, "You are a helpful assistant.");
    assert_eq!(payload.contents.len(), 1);
    assert_eq!(payload.contents[0].role, "user");
    assert_eq!(payload.contents[0].parts[0].text, "hi");
}

#[tokio::test]
async fn lore_timers_persist_across_builds() {
    let mut definition = assistant_definition();
    definition.world_book = vec![{
        let mut entry = WorldBookEntry::new("vault", "Vault", "The vault hides a crown.")
            .with_keywords(["vault"]);
        entry.sticky = 1;
        entry
    }];
    let engine = engine(definition);
    let mut options = BuildOptions {
        session_id: "session-1".into(),
        message_index: 1,
        debug: true,
        ..BuildOptions::default()
    };

    // First build triggers the entry and starts its sticky timer.
    let first = engine
        .build("preset-1", &options, Some("open the vault"), &[])
        .await
        .unwrap();
    assert_eq!(first.debug.unwrap().activated_entries, vec!["vault".to_string()]);

    // Second build has no keyword hit; the sticky timer keeps it active.
    options.message_index = 2;
    let second = engine
        .build("preset-1", &options, Some("look around"), &[])
        .await
        .unwrap();
    assert_eq!(second.debug.unwrap().activated_entries, vec!["vault".to_string()]);

    // Third build: sticky exhausted, no hit, entry gone.
    options.message_index = 3;
    let third = engine
        .build("preset-1", &options, Some("walk away"), &[])
        .await
        .unwrap();
    assert!(third.debug.unwrap().activated_entries.is_empty());
}
