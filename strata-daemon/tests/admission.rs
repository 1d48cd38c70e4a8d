mod common;

use common::*;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use strata_core::domain::job::OUTDIR_PARAM;
use strata_core::domain::status::StatusName;
use strata_daemon::service::{REDACTED_TOKEN, ToolCountCache};

#[tokio::test]
async fn test_pending_job_is_queued_and_launched() {
    let h = harness();
    let mut job = job("job-1", "variant-stats", StatusName::Pending);
    job.params.insert("cohort".to_string(), json!("ALL"));
    h.catalog.add_job(job).unwrap();

    assert_eq!(h.daemon.check_pending_jobs().await.unwrap(), 1);

    let job = h.catalog.job("job-1").unwrap();
    assert_eq!(job.status.name, StatusName::Queued);

    let out_dir = job.out_dir.expect("output directory");
    assert_eq!(out_dir.path, "JOBS/bob/job-1/");
    assert!(out_dir.uri.is_dir());
    assert_eq!(std::fs::read_dir(&out_dir.uri).unwrap().count(), 0);

    let stored = job.command_line.expect("command line");
    assert!(stored.contains(REDACTED_TOKEN));
    assert!(!stored.contains(USER_TOKEN));

    let launches = h.executor.launches();
    assert_eq!(launches.len(), 1);
    let launch = &launches[0];
    assert_eq!(launch.job_id, "job-1");
    assert_eq!(launch.command_line, stored.replace(REDACTED_TOKEN, USER_TOKEN));
    assert!(launch.command_line.contains(" variant stats-run --cohort ALL "));
    assert!(
        launch
            .command_line
            .contains(&format!("--outdir {}", out_dir.uri.display()))
    );
    assert_eq!(launch.stdout, out_dir.uri.join("job-1.log"));
    assert_eq!(launch.stderr, out_dir.uri.join("job-1.err"));
}

#[tokio::test]
async fn test_ceiling_keeps_job_pending() {
    let h = harness();
    h.catalog
        .add_job(job("running", "variant-index", StatusName::Running))
        .unwrap();
    let pending = job("waiting", "variant-index", StatusName::Pending);
    h.catalog.add_job(pending.clone()).unwrap();

    let handled = h
        .daemon
        .check_pending_job(&pending, &mut ToolCountCache::new())
        .await;

    assert_eq!(handled, 0);
    assert_eq!(
        h.catalog.job("waiting").unwrap().status.name,
        StatusName::Pending
    );
    assert!(h.executor.launches().is_empty());
}

#[tokio::test]
async fn test_ceiling_never_exceeded_in_one_pass() {
    let h = harness();
    for i in 0..3 {
        h.catalog
            .add_job(job(&format!("index-{}", i), "variant-index", StatusName::Pending))
            .unwrap();
    }
    h.catalog
        .add_job(job("stats", "variant-stats", StatusName::Pending))
        .unwrap();

    assert_eq!(h.daemon.check_pending_jobs().await.unwrap(), 2);

    let active = h
        .executor
        .launches()
        .iter()
        .filter(|l| l.job_id.starts_with("index-"))
        .count();
    assert_eq!(active, 1);
    assert_eq!(
        h.catalog.job("stats").unwrap().status.name,
        StatusName::Queued
    );
}

#[tokio::test]
async fn test_missing_study_aborts() {
    let h = harness();
    let mut job = job("job-1", "variant-stats", StatusName::Pending);
    job.study = None;
    h.catalog.add_job(job).unwrap();

    assert_eq!(h.daemon.check_pending_jobs().await.unwrap(), 1);

    let job = h.catalog.job("job-1").unwrap();
    assert_eq!(job.status.name, StatusName::Aborted);
    assert_eq!(job.status.description, "Missing mandatory 'study' field");
}

#[tokio::test]
async fn test_unknown_tool_aborts() {
    let h = harness();
    h.catalog
        .add_job(job("job-1", "format-disk", StatusName::Pending))
        .unwrap();

    assert_eq!(h.daemon.check_pending_jobs().await.unwrap(), 1);

    let job = h.catalog.job("job-1").unwrap();
    assert_eq!(job.status.name, StatusName::Aborted);
    assert_eq!(job.status.description, "Tool id 'format-disk' not found.");
}

#[tokio::test]
async fn test_missing_user_token_aborts() {
    let h = harness();
    let mut job = job("job-1", "variant-stats", StatusName::Pending);
    job.user_id = "carol".to_string();
    h.catalog.add_job(job).unwrap();

    h.daemon.check_pending_jobs().await.unwrap();

    let job = h.catalog.job("job-1").unwrap();
    assert_eq!(job.status.name, StatusName::Aborted);
    assert_eq!(
        job.status.description,
        "Internal error. Could not obtain token for user 'carol'"
    );
}

#[tokio::test]
async fn test_non_empty_out_dir_aborts() {
    let h = harness();
    let reused = h.dir.path().join("study").join("reused");
    std::fs::create_dir_all(&reused).unwrap();
    std::fs::write(reused.join("old.vcf"), "").unwrap();

    let mut job = job("job-1", "variant-stats", StatusName::Pending);
    job.params.insert(OUTDIR_PARAM.to_string(), json!("reused"));
    h.catalog.add_job(job).unwrap();

    h.daemon.check_pending_jobs().await.unwrap();

    let job = h.catalog.job("job-1").unwrap();
    assert_eq!(job.status.name, StatusName::Aborted);
    assert_eq!(
        job.status.description,
        "Cannot create output directory. outdir reused/ is not an empty directory"
    );
}

#[tokio::test]
async fn test_launch_failure_aborts() {
    let h = harness();
    h.executor.fail_launch.store(true, Ordering::SeqCst);
    h.catalog
        .add_job(job("job-1", "variant-stats", StatusName::Pending))
        .unwrap();

    assert_eq!(h.daemon.check_pending_jobs().await.unwrap(), 1);

    let job = h.catalog.job("job-1").unwrap();
    assert_eq!(job.status.name, StatusName::Aborted);
    assert!(job.status.description.starts_with("Error executing job. "));
}

#[tokio::test]
async fn test_failed_update_leaves_job_pending() {
    let h = harness();
    let (catalog, daemon) = flaky_daemon(&h);
    catalog.fail_updates.store(true, Ordering::SeqCst);
    h.catalog
        .add_job(job("job-1", "variant-stats", StatusName::Pending))
        .unwrap();

    assert_eq!(daemon.check_pending_jobs().await.unwrap(), 0);

    assert_eq!(
        h.catalog.job("job-1").unwrap().status.name,
        StatusName::Pending
    );
    assert!(h.executor.launches().is_empty());
}

#[tokio::test]
async fn test_unsafe_param_name_aborts() {
    let h = harness();
    let mut job = job("job-1", "variant-stats", StatusName::Pending);
    job.params = HashMap::from([("x;touch /tmp/pwned;".to_string(), json!("1"))]);
    h.catalog.add_job(job).unwrap();

    assert_eq!(h.daemon.check_pending_jobs().await.unwrap(), 1);

    let job = h.catalog.job("job-1").unwrap();
    assert_eq!(job.status.name, StatusName::Aborted);
    assert_eq!(
        job.status.description,
        "Invalid parameter name 'x;touch /tmp/pwned;'"
    );
    assert!(h.executor.launches().is_empty());
}
