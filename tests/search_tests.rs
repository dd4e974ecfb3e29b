//! Search, context-window, and encrypted-variant tests against the full
//! sync-then-search path.

mod common;

use std::sync::Arc;

use chatsearch::{
    ContextWindowUseCase, FieldCipher, PointFilter, PointPayload, SearchMessagesUseCase,
    SearchQuery, SyncOptions, VectorRepository,
};
use common::{channel, message, Harness, ScriptedChat};

const TEST_KEY: &str = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";

fn unrelated_messages() -> Vec<chatsearch::Message> {
    [
        "lunch order for friday",
        "deploy window moved to monday",
        "who broke the staging cluster",
        "new laptop arrived today",
        "standup is cancelled tomorrow",
        "parking garage closes early",
        "coffee machine needs repair",
        "welcome our new teammate",
        "retro notes are posted",
    ]
    .iter()
    .enumerate()
    .map(|(i, text)| {
        message(
            "C1",
            &format!("{}.000100", 100 + i * 10),
            "alice",
            text,
        )
    })
    .collect()
}

#[tokio::test]
async fn test_search_finds_relevant_message_first() {
    let mut history = unrelated_messages();
    history.push(message(
        "C1",
        "500.000100",
        "bob",
        "the budget discussion is scheduled",
    ));

    let chat = ScriptedChat::new()
        .with_channel_page(vec![channel("C1", "general")])
        .with_history("C1", history);

    let harness = Harness::new(chat);
    harness
        .sync_use_case()
        .execute(&SyncOptions::default())
        .await
        .expect("sync");
    assert_eq!(harness.vector.count().await.unwrap(), 10);

    let search = SearchMessagesUseCase::new(harness.vector.clone(), harness.embedding.clone());
    let results = search
        .execute(SearchQuery::new("budget").with_limit(5).with_min_score(0.15))
        .await
        .expect("search");

    assert!(!results.is_empty());
    let top = &results[0];
    assert_eq!(
        top.payload().text.as_deref(),
        Some("the budget discussion is scheduled")
    );
    assert!(top.score() >= 0.15);
}

#[tokio::test]
async fn test_search_results_ordered_by_descending_score() {
    let chat = ScriptedChat::new()
        .with_channel_page(vec![channel("C1", "general")])
        .with_history("C1", unrelated_messages());

    let harness = Harness::new(chat);
    harness
        .sync_use_case()
        .execute(&SyncOptions::default())
        .await
        .expect("sync");

    let search = SearchMessagesUseCase::new(harness.vector.clone(), harness.embedding.clone());
    let results = search
        .execute(SearchQuery::new("deploy window").with_limit(9))
        .await
        .expect("search");

    assert!(results.len() > 1);
    for pair in results.windows(2) {
        assert!(pair[0].score() >= pair[1].score());
    }
}

#[tokio::test]
async fn test_search_channel_filter() {
    let chat = ScriptedChat::new()
        .with_channel_page(vec![channel("C1", "general"), channel("C2", "random")])
        .with_history(
            "C1",
            vec![message("C1", "100.000100", "alice", "budget planning here")],
        )
        .with_history(
            "C2",
            vec![message("C2", "100.000200", "bob", "budget planning there")],
        );

    let harness = Harness::new(chat);
    harness
        .sync_use_case()
        .execute(&SyncOptions::default())
        .await
        .expect("sync");

    let search = SearchMessagesUseCase::new(harness.vector.clone(), harness.embedding.clone());
    let results = search
        .execute(SearchQuery::new("budget planning").with_channel("C2"))
        .await
        .expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].payload().channel_id, "C2");
}

#[tokio::test]
async fn test_search_time_range_filter() {
    let chat = ScriptedChat::new()
        .with_channel_page(vec![channel("C1", "general")])
        .with_history(
            "C1",
            vec![
                message("C1", "100.000100", "alice", "budget talk early"),
                message("C1", "900.000100", "alice", "budget talk late"),
            ],
        );

    let harness = Harness::new(chat);
    harness
        .sync_use_case()
        .execute(&SyncOptions::default())
        .await
        .expect("sync");

    let search = SearchMessagesUseCase::new(harness.vector.clone(), harness.embedding.clone());
    let results = search
        .execute(
            SearchQuery::new("budget talk")
                .with_limit(10)
                .with_time_range(500.0, 1000.0),
        )
        .await
        .expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].payload().ts, "900.000100");
}

#[tokio::test]
async fn test_context_window_is_chronological_and_bounded() {
    let chat = ScriptedChat::new()
        .with_channel_page(vec![channel("C1", "general")])
        .with_history(
            "C1",
            vec![
                // 10-minute spacing; a ±15 minute window around the third
                // message covers exactly its neighbors.
                message("C1", "600.000100", "alice", "way before"),
                message("C1", "1800.000100", "bob", "just before"),
                message("C1", "2400.000100", "carol", "the center"),
                message("C1", "3000.000100", "dave", "just after"),
                message("C1", "4200.000100", "erin", "way after"),
            ],
        );

    let harness = Harness::new(chat);
    harness
        .sync_use_case()
        .execute(&SyncOptions::default())
        .await
        .expect("sync");

    let context = ContextWindowUseCase::new(harness.vector.clone());
    let messages = context
        .execute("C1", "2400.000100", 15)
        .await
        .expect("context");

    let texts: Vec<&str> = messages
        .iter()
        .map(|m| m.text.as_deref().unwrap_or(""))
        .collect();
    assert_eq!(texts, vec!["just before", "the center", "just after"]);
}

#[tokio::test]
async fn test_encrypted_sync_stores_ciphertext() {
    let cipher = Arc::new(FieldCipher::from_hex_key(TEST_KEY).expect("key"));

    let chat = ScriptedChat::new()
        .with_channel_page(vec![channel("C1", "general")])
        .with_history(
            "C1",
            vec![message("C1", "100.000100", "alice", "the secret budget")],
        );

    let harness = Harness::new(chat);
    harness
        .sync_use_case()
        .with_cipher(cipher)
        .execute(&SyncOptions::default())
        .await
        .expect("sync");

    // What the store holds is ciphertext, tagged as the encrypted variant.
    let payloads = harness
        .vector
        .scroll(&PointFilter::default(), 10)
        .await
        .expect("scroll");
    assert_eq!(payloads.len(), 1);
    match &payloads[0] {
        PointPayload::EncryptedMessage(fields) => {
            let stored = fields.text.as_deref().expect("text present");
            assert_ne!(stored, "the secret budget");
            assert_eq!(stored.split(':').count(), 3);
            // Structural fields remain usable for filtering.
            assert_eq!(fields.channel_id, "C1");
            assert_eq!(fields.ts, "100.000100");
        }
        PointPayload::Message(_) => panic!("expected the encrypted payload variant"),
    }
}

#[tokio::test]
async fn test_encrypted_search_returns_plaintext() {
    let cipher = Arc::new(FieldCipher::from_hex_key(TEST_KEY).expect("key"));

    let mut history = unrelated_messages();
    history.push(message("C1", "500.000100", "bob", "the budget discussion"));

    let chat = ScriptedChat::new()
        .with_channel_page(vec![channel("C1", "general")])
        .with_history("C1", history);

    let harness = Harness::new(chat);
    harness
        .sync_use_case()
        .with_cipher(cipher.clone())
        .execute(&SyncOptions::default())
        .await
        .expect("sync");

    let search = SearchMessagesUseCase::new(harness.vector.clone(), harness.embedding.clone())
        .with_cipher(cipher);
    let results = search
        .execute(SearchQuery::new("budget discussion").with_limit(3))
        .await
        .expect("search");

    // The caller sees the original author and text, never ciphertext.
    let top = &results[0];
    assert_eq!(top.payload().text.as_deref(), Some("the budget discussion"));
    assert_eq!(top.payload().user_name.as_deref(), Some("bob"));
}

#[tokio::test]
async fn test_encrypted_search_without_key_is_an_error() {
    let cipher = Arc::new(FieldCipher::from_hex_key(TEST_KEY).expect("key"));

    let chat = ScriptedChat::new()
        .with_channel_page(vec![channel("C1", "general")])
        .with_history(
            "C1",
            vec![message("C1", "100.000100", "alice", "classified notes")],
        );

    let harness = Harness::new(chat);
    harness
        .sync_use_case()
        .with_cipher(cipher)
        .execute(&SyncOptions::default())
        .await
        .expect("sync");

    // A search wired without the cipher must refuse rather than leak
    // ciphertext.
    let search = SearchMessagesUseCase::new(harness.vector.clone(), harness.embedding.clone());
    let result = search
        .execute(SearchQuery::new("classified notes"))
        .await;
    assert!(result.is_err());
}
