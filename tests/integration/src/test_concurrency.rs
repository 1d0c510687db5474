//! Concurrent grant and revoke integration tests.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use egress_policy::{PolicyDocument, UpdaterError};
    use futures::future::join_all;

    use crate::{Harness, account};

    fn current_policy(harness: &Harness) -> PolicyDocument {
        let text = harness
            .policies
            .policy(&harness.bucket)
            .expect("bucket should have a policy");
        PolicyDocument::parse(&text).expect("stored policy should parse")
    }

    fn arns(range: std::ops::Range<u32>) -> BTreeSet<String> {
        range.map(|n| account(n).root_arn()).collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_should_keep_every_concurrent_grant() {
        let harness = Harness::new("fanin");
        let tasks = (0..16).map(|n| {
            let updater = harness.updater(500);
            let grant = harness.grant("env-1", account(n), true, false);
            tokio::spawn(async move { updater.grant_access(&grant).await })
        });

        for result in join_all(tasks).await {
            result.expect("task panicked").expect("grant failed");
        }

        let policy = current_policy(&harness);
        assert_eq!(policy.grantees("env-1"), arns(0..16));
        for sid in ["Get:env-1", "List:env-1"] {
            let statement = policy.find(sid).expect("managed statement");
            assert_eq!(statement.principal_arns().len(), 16, "duplicates in {sid}");
        }
        assert!(policy.find("Put:env-1").is_none());
        assert_eq!(harness.audit.events().len(), 16);
        assert!(harness.locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_should_keep_grants_for_different_resources() {
        let harness = Harness::new("resources");
        let tasks = (0..8).map(|n| {
            let updater = harness.updater(500);
            let grant = harness.grant(&format!("store-{n}"), account(n), true, true);
            tokio::spawn(async move { updater.grant_access(&grant).await })
        });
        for result in join_all(tasks).await {
            result.expect("task panicked").expect("grant failed");
        }

        let policy = current_policy(&harness);
        assert_eq!(policy.statements().len(), 24);
        for n in 0..8 {
            let expected: BTreeSet<_> = [account(n).root_arn()].into_iter().collect();
            assert_eq!(policy.grantees(&format!("store-{n}")), expected);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_should_serialize_mixed_grants_and_revokes() {
        let harness = Harness::new("mixed");
        let setup = harness.updater(500);
        for n in 0..8 {
            setup
                .grant_access(&harness.grant("env-1", account(n), true, true))
                .await
                .expect("setup grant failed");
        }

        let revokes = (0..4).map(|n| {
            let updater = harness.updater(500);
            let grant = harness.grant("env-1", account(n), true, true);
            tokio::spawn(async move { updater.revoke_access(&grant).await })
        });
        let grants = (8..12).map(|n| {
            let updater = harness.updater(500);
            let grant = harness.grant("env-1", account(n), true, true);
            tokio::spawn(async move { updater.grant_access(&grant).await })
        });
        for result in join_all(revokes.chain(grants)).await {
            result.expect("task panicked").expect("update failed");
        }

        let policy = current_policy(&harness);
        assert_eq!(policy.grantees("env-1"), arns(4..12));
        assert!(harness.locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_should_report_busy_when_lock_stays_held() {
        let harness = Harness::new("busy");
        let other = harness.lock_manager();
        let held = other
            .obtain(&format!("bucket-policy:{}", harness.bucket), 25)
            .await
            .expect("lock store")
            .expect("lock should be free");

        let err = harness
            .updater(2)
            .grant_access(&harness.grant("env-1", account(1), true, false))
            .await
            .expect_err("lock is held elsewhere");

        assert!(matches!(err, UpdaterError::LockUnavailable(_)));
        assert!(err.is_retryable());
        assert!(harness.policies.policy(&harness.bucket).is_none());
        assert!(harness.audit.events().is_empty());

        other.release(&held).await.expect("release");
        harness
            .updater(2)
            .grant_access(&harness.grant("env-1", account(1), true, false))
            .await
            .expect("lock is free again");
    }
}
