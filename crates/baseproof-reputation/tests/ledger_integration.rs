//! Integration tests for the reputation ledger under concurrent load.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use baseproof_reputation::{
    Clock, InMemoryStore, LedgerConfig, LedgerConfigBuilder, ManualClock, Polarity, Profile,
    ProfileId, ProfileMetadata, ReputationError, ReputationLedger, Tier, VouchRequest,
};
use chrono::{DateTime, Duration, Utc};

fn start() -> DateTime<Utc> {
    // 2025-03-10 10:00:00 UTC
    DateTime::from_timestamp(1_741_600_800, 0).unwrap()
}

fn pid(s: &str) -> ProfileId {
    ProfileId::parse(s).unwrap()
}

async fn setup(
    config: LedgerConfig,
    ids: &[String],
) -> (Arc<ReputationLedger<InMemoryStore>>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start()));
    let ledger = ReputationLedger::with_config(
        Arc::new(InMemoryStore::new()),
        clock.clone(),
        config,
    )
    .unwrap();
    for id in ids {
        ledger
            .register_profile(&pid(id), ProfileMetadata::default())
            .await
            .unwrap();
    }
    (Arc::new(ledger), clock)
}

fn ids(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("0x{prefix}{i:02}")).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sender_race_for_last_slots() {
    let recipients = ids("r", 20);
    let mut all = recipients.clone();
    all.push("0xsender".to_string());
    let (ledger, _) = setup(LedgerConfig::default(), &all).await;

    let mut handles = Vec::new();
    for recipient in &recipients {
        let ledger = Arc::clone(&ledger);
        let request = VouchRequest::new(pid("0xsender"), pid(recipient), Polarity::Positive);
        handles.push(tokio::spawn(async move { ledger.apply_vouch(request).await }));
    }

    let mut allowed = 0;
    let mut limited = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => allowed += 1,
            Err(ReputationError::RateLimitExceeded { daily_remaining, .. }) => {
                assert_eq!(daily_remaining, 0);
                limited += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(allowed, 5);
    assert_eq!(limited, 15);
    let sender = ledger.profile(&pid("0xsender")).await.unwrap().unwrap();
    assert_eq!(sender.vouches_given, 5);
    assert_eq!(ledger.store().vouch_count(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_senders_one_recipient_no_lost_updates() {
    let senders = ids("s", 40);
    let mut all = senders.clone();
    all.push("0xtarget".to_string());
    let (ledger, _) = setup(LedgerConfig::default(), &all).await;
    let mut target = Profile::new(pid("0xtarget"), ProfileMetadata::default(), start());
    target.trust_score = 500;
    ledger.store().seed_profile(target).unwrap();

    let mut handles = Vec::new();
    for (i, sender) in senders.iter().enumerate() {
        let ledger = Arc::clone(&ledger);
        let polarity = if i % 4 == 0 {
            Polarity::Negative
        } else {
            Polarity::Positive
        };
        let request = VouchRequest::new(pid(sender), pid("0xtarget"), polarity);
        handles.push(tokio::spawn(async move { ledger.apply_vouch(request).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // 30 positive at +10, 10 negative at -25, all from Basic senders. No
    // interleaving can reach a bound from 500.
    let target = ledger.profile(&pid("0xtarget")).await.unwrap().unwrap();
    assert_eq!(target.trust_score, 500 + 300 - 250);
    assert_eq!(target.vouches_received, 40);
    assert_eq!(target.positive_vouches, 30);
    assert_eq!(target.negative_vouches, 10);
    assert_eq!(ledger.vouches_received(&pid("0xtarget")).await.unwrap().len(), 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposing_vouches_do_not_deadlock() {
    let config = LedgerConfigBuilder::new()
        .with_daily_limit(100)
        .with_weekly_limit(100)
        .build_validated()
        .unwrap();
    let (ledger, _) = setup(config, &["0xa".to_string(), "0xb".to_string()]).await;

    let mut handles = Vec::new();
    for i in 0..100 {
        let ledger = Arc::clone(&ledger);
        let (from, to) = if i % 2 == 0 { ("0xa", "0xb") } else { ("0xb", "0xa") };
        let request = VouchRequest::new(pid(from), pid(to), Polarity::Positive);
        handles.push(tokio::spawn(async move { ledger.apply_vouch(request).await }));
    }

    let joined = tokio::time::timeout(StdDuration::from_secs(10), async {
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    })
    .await;
    assert!(joined.is_ok(), "opposing commits deadlocked");

    let a = ledger.profile(&pid("0xa")).await.unwrap().unwrap();
    let b = ledger.profile(&pid("0xb")).await.unwrap().unwrap();
    assert_eq!(a.vouches_given, 50);
    assert_eq!(a.vouches_received, 50);
    assert_eq!(b.vouches_given, 50);
    assert_eq!(a.trust_score + b.trust_score, 200 + 100 * 10);
}

#[tokio::test]
async fn test_climb_to_silver_changes_weight() {
    let senders = ids("s", 30);
    let mut all = senders.clone();
    all.push("0xclimber".to_string());
    all.push("0xpeer".to_string());
    let (ledger, _) = setup(LedgerConfig::default(), &all).await;

    // 90 positive Basic vouches take 0xclimber from 100 to 1000.
    for sender in &senders {
        for _ in 0..3 {
            ledger
                .apply_vouch(VouchRequest::new(
                    pid(sender),
                    pid("0xclimber"),
                    Polarity::Positive,
                ))
                .await
                .unwrap();
        }
    }

    let climber = ledger.profile(&pid("0xclimber")).await.unwrap().unwrap();
    assert_eq!(climber.trust_score, 1000);
    assert_eq!(climber.tier(), Tier::Silver);

    let applied = ledger
        .apply_vouch(VouchRequest::new(
            pid("0xclimber"),
            pid("0xpeer"),
            Polarity::Negative,
        ))
        .await
        .unwrap();
    assert_eq!(applied.weight(), 37);
    assert_eq!(applied.new_recipient_score(), 63);
}

#[tokio::test]
async fn test_week_of_vouching() {
    let recipients = ids("r", 5);
    let mut all = recipients.clone();
    all.push("0xsender".to_string());
    let (ledger, clock) = setup(LedgerConfig::default(), &all).await;
    let sender = pid("0xsender");

    for _day in 0..7 {
        for recipient in &recipients {
            ledger
                .apply_vouch(VouchRequest::new(
                    sender.clone(),
                    pid(recipient),
                    Polarity::Positive,
                ))
                .await
                .unwrap();
        }
        clock.advance(Duration::days(1));
    }

    // Seven days after the first vouch the weekly window has rolled.
    let quota = ledger.vouch_quota(&sender).await.unwrap();
    assert!(quota.allowed);
    assert_eq!(quota.daily_remaining, 5);
    assert_eq!(quota.weekly_remaining, 35);

    // One hour earlier it had not, even though the day had.
    let earlier = ledger
        .vouch_quota_at(&sender, clock.now() - Duration::hours(1))
        .await
        .unwrap();
    assert!(!earlier.allowed);
    assert_eq!(earlier.daily_remaining, 5);
    assert_eq!(earlier.weekly_remaining, 0);

    let given = ledger.vouches_given(&sender).await.unwrap();
    assert_eq!(given.len(), 35);
    assert!(given[0].created_at > given[34].created_at);
}
