// tests/trigger_queue.rs

use assetflow::engine::TriggerQueue;
use assetflow::types::TriggerWhileRunningBehaviour;

#[test]
fn queue_mode_keeps_one_entry_per_trigger_in_order() {
    let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 16);
    queue.record_trigger("sass");
    queue.record_trigger("sass");
    queue.record_trigger("scripts");

    assert_eq!(queue.len(), 3);
    assert_eq!(queue.pop_front().as_deref(), Some("sass"));
    assert_eq!(queue.pop_front().as_deref(), Some("sass"));
    assert_eq!(queue.pop_front().as_deref(), Some("scripts"));
    assert!(queue.is_empty());
}

#[test]
fn queue_mode_drops_oldest_past_the_limit() {
    let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 2);
    queue.record_trigger("a");
    queue.record_trigger("b");
    queue.record_trigger("c");

    assert_eq!(queue.len(), 2);
    assert_eq!(queue.front().map(String::as_str), Some("b"));
}

#[test]
fn cancel_mode_keeps_only_the_latest_trigger() {
    let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Cancel, 16);
    queue.record_trigger("a");
    queue.record_trigger("b");

    assert_eq!(queue.len(), 1);
    assert_eq!(queue.pop_front().as_deref(), Some("b"));
}

#[test]
fn zero_length_is_clamped_to_one() {
    let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 0);
    queue.record_trigger("a");
    queue.record_trigger("b");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.behaviour(), TriggerWhileRunningBehaviour::Queue);
}
