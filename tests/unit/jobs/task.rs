use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn cancel_stops_before_completion() {
    let done = Arc::new(AtomicBool::new(false));
    let flag = done.clone();
    let task = ScheduledTask::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        flag.store(true, Ordering::SeqCst);
    });
    tokio::time::sleep(Duration::from_secs(1)).await;
    task.cancel();
    task.cancel();
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(!done.load(Ordering::SeqCst));
    assert!(task.is_finished());
    task.join().await;
}

#[tokio::test(start_paused = true)]
async fn join_waits_for_completion() {
    let done = Arc::new(AtomicBool::new(false));
    let flag = done.clone();
    let task = ScheduledTask::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        flag.store(true, Ordering::SeqCst);
    });
    task.join().await;
    assert!(done.load(Ordering::SeqCst));
}
