mod support;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Semaphore;

use retrovault::models::{DataSource, Id, UserInfo};
use retrovault::seed::SeedingOrchestrator;
use retrovault::sources::SeedSource;
use retrovault::store::DocumentStore;
use support::StubSource;

// The seed future crosses threads when served by axum, so the in-flight
// guard must never be live across an await.
#[test]
fn seed_future_is_send() {
    fn assert_send<F: std::future::Future + Send>(_: &F) {}

    let store = support::memory_store();
    let sources: Vec<Arc<dyn SeedSource>> = vec![Arc::new(StubSource::new(DataSource::Mock))];
    let orchestrator = SeedingOrchestrator::new(store, sources);
    let user_id = Id::from_string("u1");
    let info = UserInfo::default();

    let future = orchestrator.seed(&user_id, &info, false);
    assert_send(&future);
}

#[tokio::test]
async fn concurrent_seeds_share_one_physical_run() -> Result<()> {
    let store = support::memory_store();
    let gate = Arc::new(Semaphore::new(0));
    let source = Arc::new(StubSource::gated(DataSource::Sample, gate.clone()));
    let sources: Vec<Arc<dyn SeedSource>> = vec![source.clone()];
    let orchestrator = Arc::new(SeedingOrchestrator::new(store.clone(), sources));

    let user_id = Id::from_string("u1");
    let mut handles = Vec::new();
    for _ in 0..4 {
        let orchestrator = orchestrator.clone();
        let user_id = user_id.clone();
        handles.push(tokio::spawn(async move {
            orchestrator.seed(&user_id, &UserInfo::default(), false).await
        }));
    }

    // Wait until the leader is inside the source, then release it. Joiners
    // registered before or after the release all share the same run.
    while source.attempts() == 0 {
        tokio::task::yield_now().await;
    }
    gate.add_permits(1);

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await??);
    }

    assert_eq!(source.attempts(), 1, "only one caller may hit the sources");
    for result in &results {
        assert_eq!(result.data_source, DataSource::Sample);
        assert_eq!(result.accounts_count, 2);
        assert_eq!(result.transactions_count, 3);
    }

    // One run means one set of documents.
    assert_eq!(store.list_accounts(&user_id).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn forced_and_unforced_runs_do_not_join_each_other() -> Result<()> {
    let store = support::memory_store();
    let gate = Arc::new(Semaphore::new(0));
    let source = Arc::new(StubSource::gated(DataSource::Sample, gate.clone()));
    let sources: Vec<Arc<dyn SeedSource>> = vec![source.clone()];
    let orchestrator = Arc::new(SeedingOrchestrator::new(store, sources));

    let user_id = Id::from_string("u1");
    let unforced = {
        let orchestrator = orchestrator.clone();
        let user_id = user_id.clone();
        tokio::spawn(async move { orchestrator.seed(&user_id, &UserInfo::default(), false).await })
    };
    let forced = {
        let orchestrator = orchestrator.clone();
        let user_id = user_id.clone();
        tokio::spawn(async move { orchestrator.seed(&user_id, &UserInfo::default(), true).await })
    };

    // Both runs must be in flight at once; if the forced call had joined the
    // unforced run this loop would never complete.
    while source.attempts() < 2 {
        tokio::task::yield_now().await;
    }
    gate.add_permits(2);

    unforced.await??;
    forced.await??;
    assert_eq!(source.attempts(), 2, "distinct keys mean distinct runs");

    Ok(())
}

#[tokio::test]
async fn progress_is_visible_while_a_run_is_in_flight() -> Result<()> {
    let store = support::memory_store();
    let gate = Arc::new(Semaphore::new(0));
    let source = Arc::new(StubSource::gated(DataSource::Mock, gate.clone()));
    let sources: Vec<Arc<dyn SeedSource>> = vec![source.clone()];
    let orchestrator = Arc::new(SeedingOrchestrator::new(store, sources));

    let user_id = Id::from_string("u1");
    assert!(orchestrator.progress(&user_id, false).is_none());

    let run = {
        let orchestrator = orchestrator.clone();
        let user_id = user_id.clone();
        tokio::spawn(async move { orchestrator.seed(&user_id, &UserInfo::default(), false).await })
    };

    while source.attempts() == 0 {
        tokio::task::yield_now().await;
    }
    let progress = orchestrator
        .progress(&user_id, false)
        .expect("run should be registered while in flight");
    assert!(progress.percent < 100);

    gate.add_permits(1);
    run.await??;

    // The slot is released once the run finishes.
    assert!(orchestrator.progress(&user_id, false).is_none());

    Ok(())
}
