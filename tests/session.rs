use std::cell::RefCell;
use std::rc::Rc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::json;

use task_scheduler::clock::ManualClock;
use task_scheduler::command::MAX_HISTORY;
use task_scheduler::fields::{Priority, SortCriterion};
use task_scheduler::service::{FilterOptions, SortOptions};
use task_scheduler::session::Session;
use task_scheduler::task::TaskDetails;

fn monday_morning() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 9, 1).unwrap().and_hms_opt(8, 0, 0).unwrap()
}

fn details(title: &str, due_in: Duration, priority: Priority, remind: i64) -> TaskDetails {
    TaskDetails {
        title: title.into(),
        description: String::new(),
        deadline: monday_morning() + due_in,
        priority,
        owner: Some(1),
        project: Some(1),
        reminder_minutes: remind,
    }
}

#[test]
fn full_day_with_reminders_undo_and_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sched").join("data.json");
    let clock = Rc::new(ManualClock::new(monday_morning()));
    let mut session = Session::open(&path, clock.clone());

    let fired = Rc::new(RefCell::new(Vec::new()));
    let sink = fired.clone();
    session.subscribe_reminders(move |n| sink.borrow_mut().push(n.message.clone()));

    let standup = session.add_task(details("Standup", Duration::minutes(60), Priority::High, 15)).unwrap();
    let review = session.add_task(details("Code review", Duration::hours(4), Priority::Medium, 30)).unwrap();
    let report = session.add_task(details("Report", Duration::hours(8), Priority::Critical, 60)).unwrap();
    assert_eq!(session.reminders().len(), 3);

    // Standup reminder at 08:45.
    clock.advance(Duration::minutes(45));
    assert_eq!(session.poll_reminders().len(), 1);
    assert_eq!(*fired.borrow(), vec!["Task 'Standup' is due in 15 minutes".to_string()]);

    // Finishing the review early cancels its reminder; undo brings it back.
    assert!(session.set_completed(review, true).unwrap());
    assert!(session.reminders().find_reminder(review).is_none());
    assert!(session.undo());
    assert!(session.reminders().find_reminder(review).is_some());
    assert!(session.redo());

    // Moving the report earlier re-arms it.
    let mut moved = session.service().find_task(report).unwrap().details();
    moved.deadline = monday_morning() + Duration::hours(2);
    session.edit_task(report, moved).unwrap();
    assert_eq!(
        session.reminders().find_reminder(report).map(|r| r.fire_at),
        Some(monday_morning() + Duration::hours(1))
    );

    clock.advance(Duration::hours(3));
    let notes = session.poll_reminders();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].task_id, report);
    assert_eq!(notes[0].message, "Task 'Report' is overdue");

    let open_first = session.service().filtered_and_sorted_tasks(
        &FilterOptions::default(),
        &SortOptions { criterion: SortCriterion::Priority, ascending: false },
    );
    let order: Vec<u64> = open_first.iter().map(|t| t.id).collect();
    assert_eq!(order, vec![report, standup, review]);

    session.save().unwrap();
    let snapshot = session.service().to_json();

    let reopened = Session::open(&path, Rc::new(ManualClock::new(monday_morning())));
    assert_eq!(reopened.service().to_json(), snapshot);
    assert!(reopened.service().find_task(review).unwrap().completed);
    assert_eq!(reopened.service().find_task(report).unwrap().priority, Priority::Critical);
    assert!(!reopened.commands().can_undo());
}

#[test]
fn history_is_capped() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Rc::new(ManualClock::new(monday_morning()));
    let mut session = Session::open(dir.path().join("data.json"), clock);

    for i in 0..(MAX_HISTORY + 10) {
        session
            .add_task(details(&format!("T{i}"), Duration::days(1), Priority::Low, 60))
            .unwrap();
    }
    assert_eq!(session.commands().len(), MAX_HISTORY);

    let mut undone = 0;
    while session.undo() {
        undone += 1;
    }
    assert_eq!(undone, MAX_HISTORY);
    assert_eq!(session.service().get_all_tasks().len(), 10);
}

#[test]
fn import_export_between_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Rc::new(ManualClock::new(monday_morning()));
    let mut source = Session::open(dir.path().join("a.json"), clock.clone());
    source.add_task(details("Shared", Duration::days(2), Priority::High, 20)).unwrap();
    let export = dir.path().join("export.json");
    assert_eq!(source.service().export_tasks_to_file(&export).unwrap(), 1);

    let mut target = Session::open(dir.path().join("b.json"), clock);
    assert_eq!(target.import_tasks(&export, true).unwrap(), 1);
    assert_eq!(target.import_tasks(&export, true).unwrap(), 0);

    let imported = target.service().search_by_title("shared").pop().unwrap();
    assert_eq!(imported.reminder_minutes, 20);
    assert_eq!(imported.project, target.service().find_project_by_name("Development").map(|p| p.id));
    assert!(target.reminders().find_reminder(imported.id).is_some());

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, json!({"tasks": []}).to_string()).unwrap();
    assert!(target.import_tasks(&bad, true).is_err());
}
