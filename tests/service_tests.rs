//! Integration tests for the custom editor service
use std::sync::Arc;
use std::time::Duration;

use custom_editor_host::host::{
    CommandRegistry, CustomEditorService, EditorEvent, MemoryProvider, SAVE_AS_COMMAND,
    SAVE_COMMAND,
};
use custom_editor_host::DocumentId;
use serde_json::json;

const VIEW_TYPE: &str = "demo.hex";

fn doc(name: &str) -> DocumentId {
    DocumentId::parse(&format!("file:///work/{}", name)).expect("valid location")
}

async fn service_with_provider(
    provider: MemoryProvider,
) -> (CustomEditorService, Arc<MemoryProvider>) {
    let service = CustomEditorService::new();
    let provider = Arc::new(provider);
    service.register_provider(VIEW_TYPE, provider.clone()).await;
    (service, provider)
}

#[tokio::test]
async fn test_open_before_registration_is_an_error() {
    let service = CustomEditorService::new();
    let err = service
        .open_document(&doc("x.hex"), VIEW_TYPE)
        .await
        .expect_err("no provider registered");
    assert!(err.to_string().contains(VIEW_TYPE));
    assert!(!service.is_open(&doc("x.hex")).await);
}

#[tokio::test]
async fn test_undo_redo_on_never_edited_document_is_noop() {
    let (service, provider) = service_with_provider(MemoryProvider::new(VIEW_TYPE)).await;
    let x = doc("x.hex");
    service.open_document(&x, VIEW_TYPE).await.expect("open");

    service.undo(&x).await.expect("undo");
    service.redo(&x).await.expect("redo");

    assert!(service.undo_stack(&x).await.is_empty());
    assert!(service.redo_stack(&x).await.is_empty());
    let document = provider.document(&x).await.expect("resolved document");
    assert!(document.content().await.is_empty());
}

#[tokio::test]
async fn test_edit_undo_redo_scenario() {
    let (service, provider) = service_with_provider(MemoryProvider::new(VIEW_TYPE)).await;
    let x = doc("x.hex");
    service.open_document(&x, VIEW_TYPE).await.expect("open");
    let document = provider.document(&x).await.expect("resolved document");

    for edit in ["a", "b", "c"] {
        document.simulate_edit(json!(edit)).await;
    }
    assert_eq!(service.undo_stack(&x).await, vec![json!("a"), json!("b"), json!("c")]);

    service.undo(&x).await.expect("undo");
    assert_eq!(service.undo_stack(&x).await, vec![json!("a"), json!("b")]);
    assert_eq!(service.redo_stack(&x).await, vec![json!("c")]);
    assert_eq!(document.content().await, vec![json!("a"), json!("b")]);

    service.redo(&x).await.expect("redo");
    assert_eq!(service.undo_stack(&x).await, vec![json!("a"), json!("b"), json!("c")]);
    assert!(service.redo_stack(&x).await.is_empty());
    assert_eq!(document.content().await, vec![json!("a"), json!("b"), json!("c")]);
}

#[tokio::test]
async fn test_undo_all_moves_records_in_reverse_order() {
    let (service, provider) = service_with_provider(MemoryProvider::new(VIEW_TYPE)).await;
    let x = doc("x.hex");
    service.open_document(&x, VIEW_TYPE).await.expect("open");
    let document = provider.document(&x).await.expect("resolved document");

    for i in 0..4 {
        document.simulate_edit(json!({ "seq": i })).await;
    }
    for _ in 0..4 {
        service.undo(&x).await.expect("undo");
    }
    // Extra undo on the now empty stack changes nothing
    service.undo(&x).await.expect("undo");

    assert!(service.undo_stack(&x).await.is_empty());
    assert_eq!(
        service.redo_stack(&x).await,
        vec![
            json!({ "seq": 3 }),
            json!({ "seq": 2 }),
            json!({ "seq": 1 }),
            json!({ "seq": 0 })
        ]
    );
    assert!(document.content().await.is_empty());
}

#[tokio::test]
async fn test_interleaved_undo_redo_never_duplicates_records() {
    let (service, provider) = service_with_provider(MemoryProvider::new(VIEW_TYPE)).await;
    let x = doc("x.hex");
    service.open_document(&x, VIEW_TYPE).await.expect("open");
    let document = provider.document(&x).await.expect("resolved document");

    for edit in ["a", "b", "c"] {
        document.simulate_edit(json!(edit)).await;
    }
    service.undo(&x).await.expect("undo");
    service.undo(&x).await.expect("undo");
    service.redo(&x).await.expect("redo");
    service.undo(&x).await.expect("undo");
    service.redo(&x).await.expect("redo");
    service.redo(&x).await.expect("redo");
    service.redo(&x).await.expect("redo");

    let mut all = service.undo_stack(&x).await;
    all.extend(service.redo_stack(&x).await);
    assert_eq!(all, vec![json!("a"), json!("b"), json!("c")]);
}

#[tokio::test]
async fn test_concurrent_opens_resolve_once() {
    let provider = MemoryProvider::new(VIEW_TYPE).with_resolve_delay(Duration::from_millis(20));
    let (service, provider) = service_with_provider(provider).await;
    let mut events = service.subscribe();
    let x = doc("x.hex");

    let (first, second) = tokio::join!(
        service.open_document(&x, VIEW_TYPE),
        service.open_document(&x, VIEW_TYPE)
    );

    let first = first.expect("first open");
    let second = second.expect("second open");
    assert_eq!(first.document, second.document);
    assert_eq!(provider.resolve_calls(), 1);

    // Opening again after completion reuses the resolution as well
    service.open_document(&x, VIEW_TYPE).await.expect("third open");
    assert_eq!(provider.resolve_calls(), 1);

    // Only one open notification is emitted
    assert_eq!(
        events.try_recv().expect("opened event"),
        EditorEvent::Opened {
            document: x.clone(),
            view_type: VIEW_TYPE.to_string()
        }
    );
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_resolution_is_shared() {
    let x = doc("broken.hex");
    let provider = MemoryProvider::new(VIEW_TYPE)
        .unresolvable(x.clone())
        .with_resolve_delay(Duration::from_millis(10));
    let (service, provider) = service_with_provider(provider).await;

    let (first, second) = tokio::join!(
        service.open_document(&x, VIEW_TYPE),
        service.open_document(&x, VIEW_TYPE)
    );

    assert!(format!("{:#}", first.expect_err("first fails")).contains("cannot be resolved"));
    assert!(format!("{:#}", second.expect_err("second fails")).contains("cannot be resolved"));
    assert_eq!(provider.resolve_calls(), 1);
    assert!(!service.is_open(&x).await);
}

#[tokio::test]
async fn test_close_clears_history_and_resolution() {
    let (service, provider) = service_with_provider(MemoryProvider::new(VIEW_TYPE)).await;
    let mut events = service.subscribe();
    let x = doc("x.hex");
    service.open_document(&x, VIEW_TYPE).await.expect("open");
    let document = provider.document(&x).await.expect("resolved document");
    document.simulate_edit(json!("a")).await;
    document.simulate_edit(json!("b")).await;
    service.undo(&x).await.expect("undo");

    assert!(service.close_document(&x).await);
    assert!(!service.is_open(&x).await);
    assert_eq!(service.active_document().await, None);

    service.undo(&x).await.expect("undo after close");
    service.redo(&x).await.expect("redo after close");
    assert!(service.undo_stack(&x).await.is_empty());
    assert!(service.redo_stack(&x).await.is_empty());

    // A new open resolves again
    service.open_document(&x, VIEW_TYPE).await.expect("reopen");
    assert_eq!(provider.resolve_calls(), 2);

    let received: Vec<EditorEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert_eq!(
        received,
        vec![
            EditorEvent::Opened {
                document: x.clone(),
                view_type: VIEW_TYPE.to_string()
            },
            EditorEvent::Closed { document: x.clone() },
            EditorEvent::Opened {
                document: x.clone(),
                view_type: VIEW_TYPE.to_string()
            },
        ]
    );
}

#[tokio::test]
async fn test_close_during_open_cancels_the_open() {
    let provider = MemoryProvider::new(VIEW_TYPE).with_resolve_delay(Duration::from_millis(30));
    let (service, provider) = service_with_provider(provider).await;
    let mut events = service.subscribe();
    let x = doc("x.hex");

    let closing = async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        service.close_document(&x).await
    };
    let (opened, closed) = tokio::join!(service.open_document(&x, VIEW_TYPE), closing);

    assert!(!closed);
    let err = opened.expect_err("open is abandoned by the close");
    assert!(err.to_string().contains("closed while it was being opened"));
    assert!(!service.is_open(&x).await);
    assert_eq!(service.active_document().await, None);
    assert!(events.try_recv().is_err());

    // The abandoned resolution no longer feeds the command log
    let document = provider.document(&x).await.expect("resolved document");
    document.simulate_edit(json!("late")).await;
    assert!(service.undo_stack(&x).await.is_empty());

    // The next open resolves from scratch and opens normally
    service.open_document(&x, VIEW_TYPE).await.expect("reopen");
    assert_eq!(provider.resolve_calls(), 2);
    assert!(service.is_open(&x).await);
    assert!(matches!(
        events.try_recv(),
        Ok(EditorEvent::Opened { .. })
    ));
}

#[tokio::test]
async fn test_edits_after_close_are_dropped() {
    let (service, provider) = service_with_provider(MemoryProvider::new(VIEW_TYPE)).await;
    let x = doc("x.hex");
    service.open_document(&x, VIEW_TYPE).await.expect("open");
    let document = provider.document(&x).await.expect("resolved document");
    document.simulate_edit(json!("a")).await;

    assert!(service.close_document(&x).await);
    document.simulate_edit(json!("z")).await;
    assert!(service.undo_stack(&x).await.is_empty());

    // Reopening subscribes a fresh sink
    service.open_document(&x, VIEW_TYPE).await.expect("reopen");
    document.simulate_edit(json!("b")).await;
    assert_eq!(service.undo_stack(&x).await, vec![json!("b")]);
}

#[tokio::test]
async fn test_close_unknown_document() {
    let service = CustomEditorService::new();
    assert!(!service.close_document(&doc("never.hex")).await);
}

#[tokio::test]
async fn test_document_without_capability_skips_actions() {
    let ro = doc("rom.hex");
    let (service, provider) =
        service_with_provider(MemoryProvider::new(VIEW_TYPE).read_only(ro.clone())).await;

    let editor = service.open_document(&ro, VIEW_TYPE).await.expect("open");
    assert!(editor.capability.is_none());

    service.record_edit(&ro, json!("a")).await;
    service.undo(&ro).await.expect("undo is skipped");
    service.save(&ro).await.expect("save is skipped");
    service.save_as(&ro, &doc("copy.hex")).await.expect("save as is skipped");

    // Skipped undo leaves the record where it was
    assert_eq!(service.undo_stack(&ro).await, vec![json!("a")]);
    let document = provider.document(&ro).await.expect("resolved document");
    assert!(document.snapshots().await.is_empty());
}

#[tokio::test]
async fn test_save_failure_is_returned() {
    let (service, provider) = service_with_provider(MemoryProvider::new(VIEW_TYPE)).await;
    let x = doc("x.hex");
    service.open_document(&x, VIEW_TYPE).await.expect("open");
    let document = provider.document(&x).await.expect("resolved document");
    document.set_fail_saves(true);

    let err = service.save(&x).await.expect_err("save fails");
    assert!(format!("{:#}", err).contains("rejected"));
}

#[tokio::test]
async fn test_save_commands_target_active_document() {
    let (service, provider) = service_with_provider(MemoryProvider::new(VIEW_TYPE)).await;
    let commands = CommandRegistry::new();
    service.register_commands(&commands).await;
    let mut events = service.subscribe();

    let x = doc("x.hex");
    let y = doc("y.hex");
    service.open_document(&x, VIEW_TYPE).await.expect("open x");
    service.open_document(&y, VIEW_TYPE).await.expect("open y");
    assert_eq!(service.active_document().await, Some(y.clone()));

    assert!(service.set_active(&x).await);
    commands.execute(SAVE_COMMAND, &[]).await.expect("save command");
    commands
        .execute(SAVE_AS_COMMAND, &[json!("file:///work/x-copy.hex")])
        .await
        .expect("save as command");

    let x_document = provider.document(&x).await.expect("x");
    let y_document = provider.document(&y).await.expect("y");
    assert_eq!(x_document.snapshots().await.len(), 2);
    assert_eq!(x_document.save_targets().await, vec![doc("x-copy.hex")]);
    assert!(y_document.snapshots().await.is_empty());

    let saved: Vec<EditorEvent> = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|event| matches!(event, EditorEvent::Saved { .. }))
        .collect();
    assert_eq!(
        saved,
        vec![
            EditorEvent::Saved {
                document: x.clone(),
                target: None
            },
            EditorEvent::Saved {
                document: x.clone(),
                target: Some(doc("x-copy.hex"))
            },
        ]
    );
}

#[tokio::test]
async fn test_save_command_logs_failures_instead_of_returning_them() {
    let (service, provider) = service_with_provider(MemoryProvider::new(VIEW_TYPE)).await;
    let commands = CommandRegistry::new();
    service.register_commands(&commands).await;

    let x = doc("x.hex");
    service.open_document(&x, VIEW_TYPE).await.expect("open");
    provider.document(&x).await.expect("x").set_fail_saves(true);

    commands
        .execute(SAVE_COMMAND, &[])
        .await
        .expect("command swallows save failure");
}

#[tokio::test]
async fn test_save_commands_without_active_document() {
    let service = CustomEditorService::new();
    let commands = CommandRegistry::new();
    service.register_commands(&commands).await;

    commands.execute(SAVE_COMMAND, &[]).await.expect("nothing to save");
    assert!(commands.execute(SAVE_AS_COMMAND, &[]).await.is_err());
}

#[tokio::test]
async fn test_open_with_default_uses_selector() {
    let service = CustomEditorService::new();
    let hex = Arc::new(MemoryProvider::new("demo.hex"));
    let notes = Arc::new(MemoryProvider::new("demo.notes"));
    service
        .register_provider_with_selector("demo.hex", "*.hex", hex.clone())
        .await
        .expect("register hex");
    service
        .register_provider_with_selector("demo.notes", "*.md", notes.clone())
        .await
        .expect("register notes");

    let editor = service
        .open_with_default(&doc("readme.md"))
        .await
        .expect("open notes");
    assert_eq!(editor.document.view_type, "demo.notes");
    assert_eq!(notes.resolve_calls(), 1);
    assert_eq!(hex.resolve_calls(), 0);

    assert!(service.open_with_default(&doc("archive.zip")).await.is_err());
}

#[tokio::test]
async fn test_reregistering_replaces_provider() {
    let service = CustomEditorService::new();
    let old = Arc::new(MemoryProvider::new(VIEW_TYPE));
    let new = Arc::new(MemoryProvider::new(VIEW_TYPE));
    service.register_provider(VIEW_TYPE, old.clone()).await;
    service.register_provider(VIEW_TYPE, new.clone()).await;
    assert_eq!(service.view_types().await, vec![VIEW_TYPE.to_string()]);

    service.open_document(&doc("x.hex"), VIEW_TYPE).await.expect("open");
    assert_eq!(old.resolve_calls(), 0);
    assert_eq!(new.resolve_calls(), 1);

    assert!(service.unregister_provider(VIEW_TYPE).await);
    assert!(service.open_document(&doc("y.hex"), VIEW_TYPE).await.is_err());
}
