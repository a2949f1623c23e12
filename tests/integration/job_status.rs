//! Job records and progress events for regeneration runs.

use revgeom::progress::JobStatus;

use crate::integration::{place, regenerate, test_service};

#[test]
fn successful_run_records_ordered_events() {
    let svc = test_service();
    let project = svc.create_project("tower", 1.0).unwrap();
    let r1 = svc
        .checkin(
            project.oid,
            "initial",
            1,
            vec![place(100, 10.0, 0.0, 0.0), place(101, 10.0, 20.0, 20.0)],
        )
        .unwrap();

    let outcome = regenerate(&svc, r1.oid, None);
    let job = svc
        .progress()
        .store()
        .get_job(&outcome.job_id)
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.roid, r1.oid);
    assert_eq!(job.engine, "vertex-bounds");
    assert_eq!(job.message.as_deref(), Some(outcome.done_message().as_str()));
    assert!(job.ended_at_ms.is_some());

    let events = svc.job_events(&outcome.job_id).unwrap();
    assert_eq!(events.first().unwrap().event_type, "job_started");
    assert_eq!(events.first().unwrap().seq, 1);
    assert_eq!(events.last().unwrap().event_type, "job_ended");
    assert!(events.windows(2).all(|w| w[1].seq == w[0].seq + 1));

    let percentages: Vec<u64> = events
        .iter()
        .filter(|e| e.event_type == "progress")
        .filter_map(|e| e.data["percentage"].as_u64())
        .collect();
    assert_eq!(percentages, vec![50, 100]);
    assert!(events
        .iter()
        .filter(|e| e.event_type == "progress")
        .all(|e| e.data["label"] == "Generating geometry..."));

    let meta = svc.progress().store().get_meta(&outcome.job_id).unwrap().unwrap();
    assert_eq!(meta.latest_status, JobStatus::Completed);
    assert_eq!(meta.percentage, 100);
}

#[test]
fn jobs_are_listed_newest_first() {
    let svc = test_service();
    let project = svc.create_project("tower", 1.0).unwrap();
    let r1 = svc
        .checkin(project.oid, "initial", 1, vec![place(100, 1.0, 0.0, 0.0)])
        .unwrap();

    let first = regenerate(&svc, r1.oid, None);
    std::thread::sleep(std::time::Duration::from_millis(5));
    let second = regenerate(&svc, r1.oid, Some(100));

    let jobs = svc.jobs().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].job_id, second.job_id);
    assert_eq!(jobs[1].job_id, first.job_id);
}

#[test]
fn active_jobs_are_marked_interrupted_on_recovery() {
    let svc = test_service();
    let job_id = svc.progress().start_job("regenerate_geometry", 1, "vertex-bounds").unwrap();

    let (interrupted, _) = svc
        .recover_jobs(revgeom::progress::PrunePolicy::default())
        .unwrap();
    assert_eq!(interrupted, 1);
    let job = svc.progress().store().get_job(&job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Interrupted);
}
