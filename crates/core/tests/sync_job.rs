mod support;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use dealsync_core::{LocalRunLock, SyncJob, SyncPhase, SyncSettings};
use dealsync_domain::{DealFilter, ErrorKind, NegotiationStatus};
use support::fixtures::{deal, funnels, negotiation, page};
use support::source::{Gate, ScriptedDealSource};
use support::store::InMemoryNegotiationStore;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
}

fn won_filter() -> DealFilter {
    DealFilter::recently_won(today(), 11)
}

fn job(source: ScriptedDealSource, store: &InMemoryNegotiationStore) -> SyncJob {
    SyncJob::new(
        Arc::new(source),
        Arc::new(store.clone()),
        Arc::new(LocalRunLock::new()),
        SyncSettings::default(),
    )
}

fn standard_source() -> ScriptedDealSource {
    ScriptedDealSource::new(funnels())
        .with_pages(
            &DealFilter::open(),
            vec![page(vec![deal("d1", "s1", None), deal("d2", "s3", None)], false)],
        )
        .with_pages(&won_filter(), vec![page(vec![deal("d3", "s2", Some(true))], false)])
}

#[tokio::test]
async fn mirrors_both_filters_into_the_table() {
    let store = InMemoryNegotiationStore::seeded(vec![negotiation("stale")]);
    let source = standard_source();
    let job = job(source.clone(), &store);

    let report = job.run_at(today()).await.unwrap();

    assert_eq!(report.fetched, 3);
    assert_eq!((report.inserted, report.updated, report.deleted), (3, 0, 1));
    assert_eq!(store.ids(), ["d1", "d2", "d3"]);

    let rows = store.rows();
    assert_eq!(rows[1].funnel, "Renovação");
    assert_eq!(rows[1].stage, "Negociação");
    assert_eq!(rows[2].status, NegotiationStatus::Won);

    let filters: Vec<_> = source.requests().into_iter().map(|(filter, _, _)| filter).collect();
    assert_eq!(
        filters,
        ["win=null", "win=true&closed_at_period=true&start_date=2025-02-01T00:00:00"]
    );
}

#[tokio::test]
async fn rerun_without_changes_is_idempotent() {
    let store = InMemoryNegotiationStore::default();
    let job = job(standard_source(), &store);

    job.run_at(today()).await.unwrap();
    let after_first = store.rows();
    let report = job.run_at(today()).await.unwrap();

    assert_eq!((report.inserted, report.updated, report.deleted), (0, 3, 0));
    assert_eq!(store.rows(), after_first);
}

#[tokio::test]
async fn unknown_stage_aborts_and_leaves_table_unchanged() {
    let store = InMemoryNegotiationStore::seeded(vec![negotiation("keep")]);
    let source = ScriptedDealSource::new(funnels()).with_pages(
        &DealFilter::open(),
        vec![page(vec![deal("d1", "s1", None), deal("d2", "missing", None)], false)],
    );
    let job = job(source, &store);

    let err = job.run_at(today()).await.unwrap_err();

    assert_eq!(err.phase, SyncPhase::Normalize);
    assert_eq!(err.kind(), ErrorKind::DataIntegrity);
    assert_eq!(store.ids(), ["keep"]);
    assert_eq!(store.apply_calls(), 0);
}

#[tokio::test]
async fn catalog_failure_is_tagged_with_its_phase() {
    let store = InMemoryNegotiationStore::default();
    let job = job(standard_source().failing_catalog(), &store);

    let err = job.run_at(today()).await.unwrap_err();

    assert_eq!(err.phase, SyncPhase::Catalog);
    assert_eq!(err.kind(), ErrorKind::UpstreamFetch);
    assert!(err.to_string().contains("Failed to fetch funnels"));
}

#[tokio::test]
async fn page_failure_aborts_before_any_write() {
    let store = InMemoryNegotiationStore::seeded(vec![negotiation("keep")]);
    let job = job(standard_source().failing_page(&won_filter(), 1), &store);

    let err = job.run_at(today()).await.unwrap_err();

    assert_eq!(err.phase, SyncPhase::Fetch);
    assert!(err.to_string().contains("page 1"));
    assert_eq!(store.ids(), ["keep"]);
}

#[tokio::test]
async fn write_failure_rolls_back_and_releases_the_lock() {
    let store = InMemoryNegotiationStore::seeded(vec![negotiation("old")]);
    store.fail_inserts(true);
    let job = job(standard_source(), &store);

    let err = job.run_at(today()).await.unwrap_err();
    assert_eq!(err.phase, SyncPhase::Reconcile);
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(store.ids(), ["old"]);

    store.fail_inserts(false);
    let report = job.run_at(today()).await.unwrap();
    assert_eq!((report.inserted, report.deleted), (3, 1));
}

#[tokio::test]
async fn overlapping_run_fails_fast() {
    let gate = Gate::default();
    let store = InMemoryNegotiationStore::default();
    let job = Arc::new(job(standard_source().with_gate(gate.clone()), &store));

    let first = tokio::spawn({
        let job = Arc::clone(&job);
        async move { job.run_at(today()).await }
    });
    gate.entered.notified().await;

    let err = job.run_at(today()).await.unwrap_err();
    assert_eq!(err.phase, SyncPhase::Lock);
    assert_eq!(err.kind(), ErrorKind::Concurrency);

    gate.release.notify_one();
    let report = first.await.unwrap().unwrap();
    assert_eq!(report.inserted, 3);

    // Lock is free again; pre-release the gate for the next run.
    gate.release.notify_one();
    assert!(job.run_at(today()).await.is_ok());
}

#[tokio::test]
async fn abandoned_run_releases_its_lock() {
    let gate = Gate::default();
    let store = InMemoryNegotiationStore::default();
    let lock = Arc::new(LocalRunLock::new());
    let job = SyncJob::new(
        Arc::new(standard_source().with_gate(gate.clone())),
        Arc::new(store.clone()),
        lock.clone(),
        SyncSettings::default(),
    );

    let timed_out =
        tokio::time::timeout(Duration::from_millis(50), job.run_at(today())).await;
    assert!(timed_out.is_err());

    for _ in 0..100 {
        if !lock.is_held(&SyncSettings::default().job_name) {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(!lock.is_held(&SyncSettings::default().job_name));
    assert!(store.ids().is_empty());
}
