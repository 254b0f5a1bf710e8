use super::*;
use frames::Tool;

fn stroke(x: f64) -> DrawAction {
    DrawAction::segment(Tool::Pen, (0.0, 0.0), (x, 0.0))
}

#[test]
fn retains_most_recent_window_in_order() {
    let history = History::new(1000);
    for n in 0..1001 {
        history.append(stroke(f64::from(n)));
    }

    let snapshot = history.snapshot();
    assert_eq!(snapshot.len(), 1000);
    assert!((snapshot[0].x - 1.0).abs() < f64::EPSILON);
    assert!((snapshot[999].x - 1000.0).abs() < f64::EPSILON);
    assert!(snapshot.windows(2).all(|w| w[0].x < w[1].x));
}

#[test]
fn clear_reports_removed_count() {
    let history = History::new(10);
    history.append(stroke(1.0));
    history.append(stroke(2.0));

    assert_eq!(history.clear(), 2);
    assert_eq!(history.len(), 0);
    assert_eq!(history.clear(), 0);
}

#[test]
fn clones_share_the_same_log() {
    let history = History::new(10);
    let other = history.clone();
    other.append(stroke(1.0));
    assert_eq!(history.len(), 1);
}
