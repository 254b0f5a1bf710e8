use super::*;
use crate::action::Tool;

fn action(n: u32) -> DrawAction {
    DrawAction::segment(Tool::Pen, (0.0, 0.0), (f64::from(n), 0.0))
}

#[test]
fn append_keeps_insertion_order() {
    let mut log = HistoryLog::new(10);
    for n in 0..3 {
        assert!(log.append(action(n)).is_none());
    }
    let xs: Vec<f64> = log.iter().map(|a| a.x).collect();
    assert_eq!(xs, vec![0.0, 1.0, 2.0]);
}

#[test]
fn overflow_evicts_oldest() {
    let mut log = HistoryLog::new(1000);
    for n in 0..1000 {
        log.append(action(n));
    }
    let evicted = log.append(action(1000)).expect("evicted");
    assert!((evicted.x - 0.0).abs() < f64::EPSILON);
    assert_eq!(log.len(), 1000);
    assert!((log.iter().next().expect("first").x - 1.0).abs() < f64::EPSILON);
    assert!((log.snapshot().last().expect("last").x - 1000.0).abs() < f64::EPSILON);
}

#[test]
fn clear_empties_the_log() {
    let mut log = HistoryLog::new(4);
    log.append(action(1));
    log.clear();
    assert!(log.is_empty());
    assert!(log.snapshot().is_empty());
}

#[test]
fn replace_keeps_newest_entries() {
    let mut log = HistoryLog::new(2);
    log.append(action(9));
    log.replace(vec![action(1), action(2), action(3)]);
    let xs: Vec<f64> = log.iter().map(|a| a.x).collect();
    assert_eq!(xs, vec![2.0, 3.0]);
}

#[test]
fn zero_capacity_is_raised_to_one() {
    let mut log = HistoryLog::new(0);
    assert_eq!(log.capacity(), 1);
    log.append(action(1));
    log.append(action(2));
    assert_eq!(log.len(), 1);
}

#[test]
fn default_capacity_is_one_thousand() {
    assert_eq!(HistoryLog::default().capacity(), DEFAULT_HISTORY_CAPACITY);
}
