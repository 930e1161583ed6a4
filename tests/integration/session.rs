// tests/integration/session.rs
use super::{
    create_failing_model_harness, create_harness, create_test_repo, harness_from, patient,
    Arc, FailingInserts, FakeModel, Uuid,
};
use companion_engine::models::internal::{NewMessage, PersonalizationProfile, Role};
use companion_engine::orchestrator::{ConversationView, SessionError, DEFAULT_APOLOGY};
use companion_engine::storage::{ChatRepository, QuotaStore};
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_user_message_is_stored_before_model_call() {
    let h = create_harness("That sounds like a long day.").await;
    let owner = Uuid::new_v4();
    let mut view = h.orchestrator.open_conversation(patient(owner)).await.unwrap();

    let outcome = h
        .orchestrator
        .send_message(&mut view, "I had a rough day at work")
        .await
        .unwrap();

    let call = h.model.last_call().unwrap();
    assert_eq!(call.stored_user_messages, 1);
    assert_eq!(
        call.history.last().map(|e| e.content.as_str()),
        Some("I had a rough day at work")
    );

    let stored = h.repo.messages_for_owner(owner).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].role, Role::User);
    assert_eq!(stored[1].role, Role::Assistant);
    assert!(stored[0].created_at < stored[1].created_at);

    assert!(!outcome.model_failed);
    assert_eq!(outcome.assistant_message.content, "That sounds like a long day.");
    assert_eq!(view.messages().len(), 2);
    assert!(!view.has_pending());
}

#[tokio::test]
async fn test_model_failure_stores_apology() {
    let h = create_failing_model_harness().await;
    let owner = Uuid::new_v4();
    let mut view = h.orchestrator.open_conversation(patient(owner)).await.unwrap();

    let outcome = h.orchestrator.send_message(&mut view, "hello").await.unwrap();

    assert!(outcome.model_failed);
    assert_eq!(h.model.call_count(), 1);

    let stored = h.repo.messages_for_owner(owner).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].content, "hello");
    assert_eq!(stored[1].content, DEFAULT_APOLOGY);
    assert!(stored[0].created_at < stored[1].created_at);
    assert_eq!(view.messages()[1].content, DEFAULT_APOLOGY);
}

#[tokio::test]
async fn test_empty_model_reply_is_treated_as_failure() {
    let h = create_harness("   ").await;
    let owner = Uuid::new_v4();
    let mut view = ConversationView::new(patient(owner));

    let outcome = h.orchestrator.send_message(&mut view, "hi").await.unwrap();
    assert!(outcome.model_failed);
    assert_eq!(outcome.assistant_message.content, DEFAULT_APOLOGY);
}

#[tokio::test]
async fn test_anonymization_applies_to_storage_only() {
    let h = create_harness("Nice to meet you, Dana.").await;
    let owner = Uuid::new_v4();
    h.repo.set_anonymization(owner, true).await.unwrap();
    let mut view = h.orchestrator.open_conversation(patient(owner)).await.unwrap();

    let outcome = h
        .orchestrator
        .send_message(&mut view, "My name is Dana")
        .await
        .unwrap();

    let stored = h.repo.messages_for_owner(owner).await.unwrap();
    assert_eq!(stored[0].content, "My name is [NAME]");
    assert_eq!(stored[1].content, "Nice to meet you, [NAME].");

    assert_eq!(outcome.user_message.content, "My name is Dana");
    assert_eq!(outcome.assistant_message.content, "Nice to meet you, Dana.");
    assert_eq!(view.messages()[0].content, "My name is Dana");
    assert_eq!(
        h.model.last_call().unwrap().history.last().unwrap().content,
        "My name is Dana"
    );
    assert_eq!(h.scrubber.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_scrubber_outage_stores_original_text() {
    let h = create_harness("I'm here for you.").await;
    let owner = Uuid::new_v4();
    h.repo.set_anonymization(owner, true).await.unwrap();
    h.scrubber.fail.store(true, Ordering::SeqCst);
    let mut view = ConversationView::new(patient(owner));

    let text = "Dana here — café ☕ at 5:30, call 555-0100";
    h.orchestrator.send_message(&mut view, text).await.unwrap();

    let stored = h.repo.messages_for_owner(owner).await.unwrap();
    assert_eq!(stored[0].content.as_bytes(), text.as_bytes());
}

#[tokio::test]
async fn test_disabled_anonymization_never_calls_scrubber() {
    let h = create_harness("Okay.").await;
    let mut view = ConversationView::new(patient(Uuid::new_v4()));

    h.orchestrator.send_message(&mut view, "Dana").await.unwrap();
    assert_eq!(h.scrubber.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_user_persist_failure_skips_model_and_stays_pending() {
    let repo = create_test_repo().await;
    let model = FakeModel::replying(repo.clone(), "unused");
    let failing = Arc::new(FailingInserts {
        inner: repo.clone(),
        fail_role: Role::User,
    });
    let h = harness_from(repo, failing, model);
    let owner = Uuid::new_v4();
    let mut view = ConversationView::new(patient(owner));

    let err = h
        .orchestrator
        .send_message(&mut view, "hello")
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Persistence(_)));
    assert!(err.is_retryable());
    assert_eq!(h.model.call_count(), 0);
    assert_eq!(view.messages().len(), 1);
    assert!(view.messages()[0].pending);
    assert_eq!(h.repo.count_messages(owner).await.unwrap(), 0);
}

#[tokio::test]
async fn test_assistant_persist_failure_keeps_user_message() {
    let repo = create_test_repo().await;
    let model = FakeModel::replying(repo.clone(), "I hear you.");
    let failing = Arc::new(FailingInserts {
        inner: repo.clone(),
        fail_role: Role::Assistant,
    });
    let h = harness_from(repo, failing, model);
    let owner = Uuid::new_v4();
    let mut view = ConversationView::new(patient(owner));

    let err = h
        .orchestrator
        .send_message(&mut view, "hello")
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Persistence(_)));
    assert_eq!(h.model.call_count(), 1);
    assert_eq!(view.messages().len(), 2);
    assert!(!view.messages()[0].pending);
    assert!(view.messages()[1].pending);

    let stored = h.repo.messages_for_owner(owner).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].role, Role::User);
}

#[tokio::test]
async fn test_resync_picks_up_out_of_band_turns() {
    let h = create_harness("Okay.").await;
    let owner = Uuid::new_v4();
    let mut view = h.orchestrator.open_conversation(patient(owner)).await.unwrap();
    h.orchestrator.send_message(&mut view, "first").await.unwrap();

    h.repo
        .insert_message(NewMessage {
            owner_id: owner,
            role: Role::User,
            content: "said over voice".to_string(),
            created_at: chrono::Utc::now() + chrono::Duration::seconds(1),
        })
        .await
        .unwrap();

    h.orchestrator.resync(&mut view).await.unwrap();
    assert_eq!(view.messages().len(), 3);
    assert_eq!(view.history().last().unwrap().content, "said over voice");
}

#[tokio::test]
async fn test_profile_is_read_on_every_send() {
    let h = create_harness("Okay.").await;
    let owner = Uuid::new_v4();
    let mut view = ConversationView::new(patient(owner));

    h.orchestrator.send_message(&mut view, "hi").await.unwrap();
    assert!(!h
        .model
        .last_call()
        .unwrap()
        .system_prompt
        .contains("Generalized anxiety"));

    h.repo
        .upsert_profile(PersonalizationProfile {
            diagnosis: Some("Generalized anxiety".to_string()),
            triggers_to_avoid: Some("Talking about exams".to_string()),
            ..PersonalizationProfile::empty(owner)
        })
        .await
        .unwrap();

    h.orchestrator.send_message(&mut view, "hi again").await.unwrap();
    let prompt = h.model.last_call().unwrap().system_prompt;
    assert!(prompt.contains("Generalized anxiety"));
    assert!(prompt.contains("Talking about exams"));
}

#[tokio::test]
async fn test_successful_send_reports_usage() {
    let h = create_harness("Okay.").await;
    let owner = Uuid::new_v4();
    let mut view = ConversationView::new(patient(owner));

    let outcome = h.orchestrator.send_message(&mut view, "hi").await.unwrap();
    assert_eq!(
        outcome.usage.unwrap().summary(),
        "1 of 3 messages used today"
    );
    assert_eq!(h.repo.quota_state(owner).await.unwrap().messages_used_today, 1);
}
