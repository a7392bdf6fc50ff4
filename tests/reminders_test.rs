//! Same-day reminder pass tests

mod helpers;

use chrono::Duration;
use helpers::*;
use PoolMate::jobs::OutcomeStatus;
use PoolMate::models::Event;
use PoolMate::scheduling::RunWindow;
use PoolMate::services::TemplateKind;

/// An event dated today with its pool already assigned
async fn assigned_today(app: &TestApp, title: &str, event_time: &str) -> Event {
    let event = app.closed_event(title, event_time, fixed_now()).await;
    app.registrant(event.id, "Asha", Some("asha@example.com"), Some("9876500001")).await;
    app.registrant(event.id, "Bilal", None, Some("9876500002")).await;
    app.linked_trainer(event.id, "Coach Dev", Some("dev@example.com"), Some("9876500009")).await;
    app.engine.assign_pools_at(event.id, fixed_now()).await.unwrap();
    event
}

#[tokio::test]
async fn test_morning_event_follows_morning_window() {
    let app = TestApp::new();
    let event = assigned_today(&app, "Sunrise Yoga", "09:00 AM - 10:00 AM").await;

    let evening = app.scheduler.send_due_reminders_at(RunWindow::Evening, fixed_now()).await.unwrap();
    let outcome = evening.outcome(event.id).unwrap();
    assert_eq!(outcome.status, OutcomeStatus::Skipped);
    assert_eq!(outcome.reason.as_deref(), Some("WrongWindow"));
    assert!(!app.store.event(event.id).await.unwrap().reminder2_sent);
    assert!(app.sender.attempts_of(TemplateKind::ReminderUser).is_empty());

    let morning = app.scheduler.send_due_reminders_at(RunWindow::Morning, fixed_now()).await.unwrap();
    assert_eq!(morning.outcome(event.id).unwrap().status, OutcomeStatus::Success);
    assert!(app.store.event(event.id).await.unwrap().reminder2_sent);
    assert_eq!(app.sender.attempts_of(TemplateKind::ReminderUser).len(), 2);
    assert_eq!(app.sender.attempts_of(TemplateKind::ReminderTrainer).len(), 1);
}

#[tokio::test]
async fn test_afternoon_event_follows_evening_window() {
    let app = TestApp::new();
    let event = assigned_today(&app, "Power Hour", "03:00 PM - 04:00 PM").await;

    let morning = app.scheduler.send_due_reminders_at(RunWindow::Morning, fixed_now()).await.unwrap();
    assert_eq!(morning.outcome(event.id).unwrap().status, OutcomeStatus::Skipped);

    let evening = app.scheduler.send_due_reminders_at(RunWindow::Evening, fixed_now()).await.unwrap();
    assert_eq!(evening.outcome(event.id).unwrap().status, OutcomeStatus::Success);
    assert!(app.store.event(event.id).await.unwrap().reminder2_sent);
}

#[tokio::test]
async fn test_unparseable_time_is_always_due() {
    let app = TestApp::new();
    let event = assigned_today(&app, "Mystery Class", "after lunch").await;

    let evening = app.scheduler.send_due_reminders_at(RunWindow::Evening, fixed_now()).await.unwrap();
    assert_eq!(evening.outcome(event.id).unwrap().status, OutcomeStatus::Success);
}

#[tokio::test]
async fn test_links_fall_back_to_shared_link() {
    let app = TestApp::new();
    let event = assigned_today(&app, "Sunrise Yoga", "09:00 AM - 10:00 AM").await;
    let pool = app.store.pools_for(event.id).await.remove(0);
    let shared = pool.meet_link.unwrap();

    app.scheduler.send_due_reminders_at(RunWindow::Morning, fixed_now()).await.unwrap();

    let users = app.sender.attempts_of(TemplateKind::ReminderUser);
    let link_for = |phone: &str| {
        users
            .iter()
            .find(|a| a.recipient == phone)
            .map(|a| a.message.body[3].clone())
            .unwrap()
    };
    assert_ne!(link_for("9876500001"), shared); // personal link
    assert!(link_for("9876500001").starts_with("https://zoom.us/w/"));
    assert_eq!(link_for("9876500002"), shared);

    let trainers = app.sender.attempts_of(TemplateKind::ReminderTrainer);
    assert_eq!(trainers[0].message.body[3], shared);
    assert_eq!(trainers[0].message.body[2], "09:00 AM - 10:00 AM");
}

#[tokio::test]
async fn test_send_failures_still_mark_event() {
    let app = TestApp::new();
    let event = assigned_today(&app, "Sunrise Yoga", "09:00 AM - 10:00 AM").await;
    app.sender.fail_for("9876500001");

    let summary = app.scheduler.send_due_reminders_at(RunWindow::Morning, fixed_now()).await.unwrap();

    let outcome = summary.outcome(event.id).unwrap();
    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.notifications_failed, 1);
    assert_eq!(outcome.notifications_sent, 2);
    assert!(app.store.event(event.id).await.unwrap().reminder2_sent);

    // reminded events are not picked up again today
    let again = app.scheduler.send_due_reminders_at(RunWindow::Morning, fixed_now()).await.unwrap();
    assert_eq!(again.total, 0);
}

#[tokio::test]
async fn test_assigned_event_without_link_fails_loudly() {
    let app = TestApp::new();
    let event = app.closed_event("Walk Club", "06:00 AM - 07:00 AM", fixed_now()).await;
    app.registrant(event.id, "Asha", None, Some("9876500001")).await;
    app.engine.assign_pools_at(event.id, fixed_now()).await.unwrap();

    let summary = app.scheduler.send_due_reminders_at(RunWindow::Morning, fixed_now()).await.unwrap();

    let outcome = summary.outcome(event.id).unwrap();
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(outcome.reason.as_deref(), Some("NoMeetLink"));
    assert!(!app.store.event(event.id).await.unwrap().reminder2_sent);
    assert_eq!(app.sender.attempts_of(TemplateKind::ErrorEscalation).len(), 1);
    assert!(app.sender.attempts_of(TemplateKind::ReminderUser).is_empty());
}

#[tokio::test]
async fn test_only_todays_assigned_events_are_selected() {
    let app = TestApp::new();
    let today = assigned_today(&app, "Today", "09:00 AM - 10:00 AM").await;

    let tomorrow = app.closed_event("Tomorrow", "09:00 AM - 10:00 AM", fixed_now() + Duration::days(1)).await;
    app.registrant(tomorrow.id, "Chen", Some("chen@example.com"), Some("9876500003")).await;
    app.engine.assign_pools_at(tomorrow.id, fixed_now()).await.unwrap();

    let unassigned = app.closed_event("Unassigned", "09:00 AM - 10:00 AM", fixed_now()).await;

    let summary = app.scheduler.send_due_reminders_at(RunWindow::Morning, fixed_now()).await.unwrap();

    assert_eq!(summary.total, 1);
    assert!(summary.outcome(today.id).is_some());
    assert!(summary.outcome(tomorrow.id).is_none());
    assert!(summary.outcome(unassigned.id).is_none());
}
