mod common;

use async_trait::async_trait;
use mechaflow::client::sync::{
    DefinitionEditor, DefinitionSession, DescriptorCache, Notification, NotificationEvent, NotificationSink,
    PublishProgress,
};
use mechaflow::definition::types::{ActivityDefinition, DefinitionSummary};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Editor double recording every call the session makes
#[derive(Default)]
struct RecordingEditor {
    current: Mutex<Option<ActivityDefinition>>,
    updates: Mutex<Vec<ActivityDefinition>>,
    version_loads: Mutex<Vec<Vec<DefinitionSummary>>>,
}

#[async_trait]
impl DefinitionEditor for RecordingEditor {
    async fn show(&self, definition: ActivityDefinition) {
        *self.current.lock().unwrap() = Some(definition);
    }

    async fn current_definition(&self) -> ActivityDefinition {
        self.current.lock().unwrap().clone().expect("a definition is open")
    }

    async fn update_definition(&self, definition: ActivityDefinition) {
        *self.current.lock().unwrap() = Some(definition.clone());
        self.updates.lock().unwrap().push(definition);
    }

    async fn load_versions(&self, versions: Vec<DefinitionSummary>) {
        self.version_loads.lock().unwrap().push(versions);
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<(NotificationEvent, Notification)>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn emit(&self, event: NotificationEvent, notification: Notification) {
        self.events.lock().unwrap().push((event, notification));
    }
}

#[derive(Default)]
struct CountingProgress {
    begun: AtomicUsize,
    completed: AtomicUsize,
}

impl PublishProgress for CountingProgress {
    fn begin(&self) {
        self.begun.fetch_add(1, Ordering::SeqCst);
    }

    fn complete(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    session: DefinitionSession,
    editor: Arc<RecordingEditor>,
    sink: Arc<RecordingSink>,
    cache: Arc<DescriptorCache>,
}

async fn harness() -> Harness {
    let state = common::setup().await;
    let client = common::local_client(&state);

    let cache = Arc::new(DescriptorCache::new(client.clone()));
    cache.refresh().await.unwrap();

    let editor = Arc::new(RecordingEditor::default());
    let sink = Arc::new(RecordingSink::default());
    let session = DefinitionSession::new(client, editor.clone(), sink.clone(), Arc::clone(&cache));

    Harness {
        session,
        editor,
        sink,
        cache,
    }
}

#[tokio::test]
async fn test_new_definition_opens_default_draft() {
    let h = harness().await;

    let draft = h.session.new_definition().await.unwrap();

    assert_eq!(draft.type_name, "Activity1");
    assert_eq!(draft.display_name, "Activity 1");
    assert_eq!(draft.category, "Custom");
    assert_eq!(draft.version, 1);
    assert!(draft.is_latest && !draft.is_published);
    assert_eq!(draft.root.id, "Flowchart1");
    assert_eq!(h.editor.current_definition().await, draft);
}

#[tokio::test]
async fn test_first_save_reloads_editor() {
    let h = harness().await;
    let draft = h.session.new_definition().await.unwrap();

    let saved = h.session.save(draft, false).await.unwrap();

    let updates = h.editor.updates.lock().unwrap().clone();
    assert_eq!(updates, vec![saved.clone()]);
    let loads = h.editor.version_loads.lock().unwrap().clone();
    assert_eq!(loads.len(), 1);
    assert_eq!(loads[0][0].id, saved.id);
}

#[tokio::test]
async fn test_in_place_save_does_not_reload() {
    let h = harness().await;
    let draft = h.session.new_definition().await.unwrap();
    let saved = h.session.save(draft, false).await.unwrap();

    let mut edited = saved.clone();
    edited.display_name = "Say Hello".to_string();
    let again = h.session.on_definition_updated(edited).await.unwrap();

    assert_eq!(again.identity(), saved.identity());
    assert_eq!(h.editor.updates.lock().unwrap().len(), 1);
    assert_eq!(h.editor.version_loads.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_publish_notifies_and_refreshes_cache() {
    let h = harness().await;
    let draft = h.session.new_definition().await.unwrap();
    let saved = h.session.save(draft, false).await.unwrap();
    h.editor.show(saved.clone()).await;
    assert!(h.cache.find("Activity1").is_none());

    let progress = CountingProgress::default();
    let published = h.session.publish(&progress).await.unwrap();

    assert!(published.is_published);
    assert_eq!(progress.begun.load(Ordering::SeqCst), 1);
    assert_eq!(progress.completed.load(Ordering::SeqCst), 1);

    let events = h.sink.events.lock().unwrap().clone();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].0, NotificationEvent::Add);
    assert_eq!(events[0].1.message, "Starting publishing Activity1");
    assert_eq!(events[1].0, NotificationEvent::Update);
    assert_eq!(events[1].1.message, "Activity1 publish finished");
    assert_eq!(events[1].1.id, saved.definition_id);

    // Publishing flips is_published, so the editor adopted the server copy
    assert_eq!(h.editor.current_definition().await, published);
    assert!(h.cache.find("Activity1").is_some());
}

#[tokio::test]
async fn test_failed_publish_still_completes_progress() {
    let h = harness().await;
    let mut draft = h.session.new_definition().await.unwrap();
    draft.type_name = String::new();
    h.editor.show(draft).await;

    let progress = CountingProgress::default();
    assert!(h.session.publish(&progress).await.is_err());

    assert_eq!(progress.begun.load(Ordering::SeqCst), 1);
    assert_eq!(progress.completed.load(Ordering::SeqCst), 1);
    // Only the start notification went out
    let events = h.sink.events.lock().unwrap().clone();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, NotificationEvent::Add);
}

#[tokio::test]
async fn test_second_editor_with_stale_draft_gets_conflict() {
    let state = common::setup().await;
    let client = common::local_client(&state);
    let cache = Arc::new(DescriptorCache::new(client.clone()));
    cache.refresh().await.unwrap();

    let session = |editor: Arc<RecordingEditor>| {
        DefinitionSession::new(
            client.clone(),
            editor,
            Arc::new(RecordingSink::default()),
            Arc::clone(&cache),
        )
    };
    let alice = session(Arc::new(RecordingEditor::default()));
    let bob = session(Arc::new(RecordingEditor::default()));

    let draft = alice.new_definition().await.unwrap();
    let saved = alice.save(draft, false).await.unwrap();
    let opened = bob.open(&saved.definition_id).await.unwrap();

    // Alice keeps autosaving from her original copy; the session tracks the revision
    let mut first = saved.clone();
    first.display_name = "Alice 1".to_string();
    alice.on_definition_updated(first).await.unwrap();
    let mut second = saved.clone();
    second.display_name = "Alice 2".to_string();
    alice.on_definition_updated(second).await.unwrap();

    let mut stale = opened.clone();
    stale.display_name = "Bob".to_string();
    let err = bob.on_definition_updated(stale).await.unwrap_err();
    assert!(err.is_conflict(), "unexpected error: {}", err);

    let latest = client
        .definitions()
        .get(&saved.definition_id, mechaflow::VersionOptions::Latest)
        .await
        .unwrap();
    assert_eq!(latest.display_name, "Alice 2");
}
