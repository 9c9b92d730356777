use chrono::{DateTime, TimeZone, Utc};
use syncdesk_schedule::{
    classify, describe, label, predict_occurrences, JobSchedule, ScheduleKind,
    DEFAULT_OCCURRENCE_COUNT,
};

fn jan1(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
}

#[test]
fn labels_for_table() {
    let five = classify("*/5 * * * *");
    assert_eq!(five, ScheduleKind::EveryNMinutes(5));
    assert_eq!(label(&five), "Every 5 min");

    let three = classify("0 */3 * * *");
    assert_eq!(three, ScheduleKind::EveryNHours(3));
    assert_eq!(label(&three), "Every 3 hours");
    assert_eq!(three.to_string(), "Every 3 hours");
}

#[test]
fn prediction_is_pure() {
    let kind = classify("*/7 * * * *");
    let last = Some(Utc.with_ymd_and_hms(2023, 12, 31, 23, 58, 13).unwrap());
    let now = jan1(5, 30);

    let a = predict_occurrences(&kind, last, now, 5).unwrap();
    let b = predict_occurrences(&kind, last, now, 5).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 5);
    assert!(a[0] > now);
    assert!(a.windows(2).all(|w| w[1] - w[0] == chrono::Duration::minutes(7)));
}

#[test]
fn daily_and_weekly_step_from_last_run() {
    let last = Some(Utc.with_ymd_and_hms(2023, 12, 20, 0, 0, 0).unwrap());

    let daily = predict_occurrences(&classify("0 0 * * *"), last, jan1(5, 30), 2).unwrap();
    assert_eq!(
        daily,
        vec![
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
        ]
    );

    let weekly = predict_occurrences(&classify("0 0 * * 0"), last, jan1(5, 30), 1).unwrap();
    assert_eq!(weekly, vec![Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()]);
}

#[test]
fn describe_never_run_job_from_api() {
    let job: JobSchedule = serde_json::from_str(
        r#"{"id":3,"name":"sync","schedule":"15min","last_run":"0001-01-01T00:00:00Z"}"#,
    )
    .unwrap();

    let summary = describe(&job, jan1(5, 30), DEFAULT_OCCURRENCE_COUNT);
    assert_eq!(summary.kind, ScheduleKind::EveryNMinutes(15));
    assert_eq!(summary.label, "Every 15 min");
    let runs = summary.next_runs.unwrap();
    assert_eq!(runs.len(), DEFAULT_OCCURRENCE_COUNT);
    assert_eq!(runs[0], jan1(5, 45));
    assert_eq!(runs[4], jan1(6, 45));
}

#[test]
fn describe_manual_and_custom_jobs() {
    let manual = JobSchedule {
        id: 1,
        name: "backfill".into(),
        schedule: "manual".into(),
        last_run: None,
    };
    let summary = describe(&manual, jan1(0, 0), 5);
    assert_eq!(summary.label, "Manual");
    assert_eq!(summary.next_runs, None);

    let custom = JobSchedule {
        schedule: "30 2 * * 1-5".into(),
        ..manual
    };
    let summary = describe(&custom, jan1(0, 0), 5);
    assert_eq!(summary.label, "30 2 * * 1-5");
    assert_eq!(summary.next_runs, None);
}

#[test]
fn summary_json_shape() {
    let job = JobSchedule {
        id: 9,
        name: "hourly".into(),
        schedule: "0 * * * *".into(),
        last_run: Some(jan1(0, 0)),
    };
    let summary = describe(&job, jan1(5, 30), 1);
    let value = serde_json::to_value(&summary).unwrap();
    assert_eq!(value["kind"]["kind"], "hourly");
    assert_eq!(value["label"], "Every hour");
    assert_eq!(value["next_runs"][0], "2024-01-01T06:00:00Z");
}
