//! Lock manager integration tests over a shared lock table.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use egress_lock::LockError;
    use futures::future::join_all;

    use crate::Harness;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_should_grant_lock_to_exactly_one_contender() {
        let harness = Harness::new("exclusive");
        let tasks = (0..32).map(|_| {
            let manager = harness.lock_manager();
            tokio::spawn(async move { manager.obtain("shared-lock", 25).await })
        });

        let winners: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.expect("task panicked").expect("lock store"))
            .flatten()
            .collect();

        assert_eq!(winners.len(), 1);
        assert_eq!(harness.locks.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_should_never_overlap_critical_sections() {
        let harness = Harness::new("overlap");
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks = (0..12).map(|_| {
            let manager = harness.lock_manager();
            let inside = inside.clone();
            let peak = peak.clone();
            tokio::spawn(async move {
                manager
                    .with_lock("critical", 25, 1_000, || async {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, LockError>(())
                    })
                    .await
            })
        });

        for result in join_all(tasks).await {
            result.expect("task panicked").expect("with_lock failed");
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(harness.locks.is_empty());
    }
}
