use super::*;
use crate::config::EditorConfig;
use crate::foundation::error::{ReelError, ReelResult};
use crate::model::item::{Geometry, Item, ItemList};
use crate::model::layer::{Layer, LayerId};
use crate::model::timeline::{SessionDocument, Timeline};
use crate::timeline::mutate::DurationEdit;
use crate::timeline::session::EditorSession;
use std::collections::VecDeque;
use std::future::Future;

type Answer = (Duration, ReelResult<Option<SessionDocument>>);

#[derive(Default)]
struct RecordingStore {
    calls: Mutex<Vec<Mutation>>,
    answers: Mutex<VecDeque<Answer>>,
}

impl RecordingStore {
    fn answering(answers: Vec<Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<Mutation> {
        self.calls.lock().unwrap().clone()
    }
}

impl SessionStore for RecordingStore {
    fn persist(
        &self,
        _session_id: &str,
        mutation: &Mutation,
    ) -> impl Future<Output = ReelResult<Option<SessionDocument>>> + Send {
        self.calls.lock().unwrap().push(mutation.clone());
        let (delay, answer) = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((Duration::ZERO, Ok(None)));
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            answer
        }
    }
}

fn session() -> SharedSession {
    EditorSession::new(
        EditorConfig::default(),
        Timeline::from_layers(vec![
            Layer::with_id(LayerId::from("A"), 2.0),
            Layer::with_id(LayerId::from("B"), 3.0),
        ]),
    )
    .into_shared()
}

fn items_of(n: usize) -> Mutation {
    let items = (0..n)
        .map(|_| Item::image("a.png", Geometry::new(0.0, 0.0, 1.0, 1.0)))
        .collect();
    Mutation::UpdateItems {
        layer_id: LayerId::from("A"),
        items: ItemList::from_items(items),
    }
}

fn doc_with_a_duration(session: &SharedSession, secs: f64) -> SessionDocument {
    let mut doc = lock_session(session).document();
    doc.layers[0].duration = secs;
    doc
}

fn items_key() -> CoalesceKey {
    CoalesceKey::Items(LayerId::from("A"))
}

const WINDOW: Duration = Duration::from_millis(5);

#[tokio::test(start_paused = true)]
async fn rapid_edits_persist_only_the_latest() {
    let store = Arc::new(RecordingStore::default());
    let debouncer = Debouncer::new(store.clone(), session(), WINDOW);
    for n in 1..=3 {
        debouncer.push(items_key(), items_of(n));
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert_eq!(debouncer.pending_count(), 1);
    assert!(store.calls().is_empty());

    tokio::time::sleep(Duration::from_millis(20)).await;
    debouncer.settle().await;

    let calls = store.calls();
    assert_eq!(calls.len(), 1);
    let Mutation::UpdateItems { items, .. } = &calls[0] else {
        panic!("expected an item update");
    };
    assert_eq!(items.len(), 3);
    assert_eq!(debouncer.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn distinct_keys_do_not_coalesce() {
    let store = Arc::new(RecordingStore::default());
    let debouncer = Debouncer::new(store.clone(), session(), WINDOW);
    debouncer.push(items_key(), items_of(1));
    debouncer.push(
        CoalesceKey::Duration(LayerId::from("A")),
        Mutation::SetDuration {
            layer_id: LayerId::from("A"),
            duration: 4.0,
            edit: DurationEdit::Stretch,
        },
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    debouncer.settle().await;
    let ops: Vec<&str> = store.calls().iter().map(Mutation::op_name).collect();
    assert_eq!(ops.len(), 2);
    assert!(ops.contains(&"updateItems"));
    assert!(ops.contains(&"setDuration"));
}

#[tokio::test(start_paused = true)]
async fn answer_superseded_by_newer_edit_is_discarded() {
    let shared = session();
    let store = Arc::new(RecordingStore::answering(vec![
        (
            Duration::from_millis(50),
            Ok(Some(doc_with_a_duration(&shared, 9.0))),
        ),
        (
            Duration::from_millis(1),
            Ok(Some(doc_with_a_duration(&shared, 4.0))),
        ),
    ]));
    let debouncer = Debouncer::new(store.clone(), shared.clone(), WINDOW);

    debouncer.push(items_key(), items_of(1));
    tokio::time::sleep(Duration::from_millis(6)).await;
    assert_eq!(store.calls().len(), 1);
    debouncer.push(items_key(), items_of(2));

    tokio::time::sleep(Duration::from_millis(100)).await;
    debouncer.settle().await;

    assert_eq!(store.calls().len(), 2);
    let s = lock_session(&shared);
    assert_eq!(s.timeline().layers[0].duration, 4.0);
    assert_eq!(s.timeline().layers[1].duration_offset, 4.0);
}

#[tokio::test(start_paused = true)]
async fn flush_persists_without_waiting() {
    let store = Arc::new(RecordingStore::default());
    let debouncer = Debouncer::new(store.clone(), session(), Duration::from_secs(60));
    debouncer.push(items_key(), items_of(2));
    debouncer.flush().await;
    assert_eq!(store.calls().len(), 1);
    assert_eq!(debouncer.pending_count(), 0);

    tokio::time::sleep(Duration::from_secs(120)).await;
    debouncer.settle().await;
    assert_eq!(store.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_persist_is_recorded_until_next_success() {
    let store = Arc::new(RecordingStore::answering(vec![(
        Duration::ZERO,
        Err(ReelError::transport("store offline")),
    )]));
    let debouncer = Debouncer::new(store.clone(), session(), WINDOW);
    debouncer.push(items_key(), items_of(1));
    debouncer.flush().await;
    let err = debouncer.last_error(&items_key()).unwrap();
    assert!(err.contains("store offline"));

    debouncer.push(items_key(), items_of(1));
    debouncer.flush().await;
    assert!(debouncer.last_error(&items_key()).is_none());
}
