//! Store 生命周期集成测试：结构迁移、过期清理、节流

use powgate_store::schema::{DB_FILE, SCHEMA_FILE};
use powgate_store::{
    CHALLENGE_LIFETIME, CLEANUP_INTERVAL, ChallengeEntry, ManualClock, SCHEMA_VERSION, Store,
    TOKEN_LIFETIME, TokenEntry,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

const NOW: u64 = 1_750_000_000;

fn challenge(nonce: &str, epoch: u64) -> ChallengeEntry {
    ChallengeEntry {
        nonce: nonce.to_string(),
        fingerprint: "9f86d081884c7d65".to_string(),
        difficulty: 4,
        epoch,
    }
}

fn token(value: &str, epoch: u64) -> TokenEntry {
    TokenEntry {
        token: value.to_string(),
        fingerprint: "9f86d081884c7d65".to_string(),
        epoch,
    }
}

async fn open_with_manual_clock(dir: &Path) -> (Store, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(NOW));
    let store = Store::open_with_clock(dir, clock.clone())
        .await
        .expect("open store");
    (store, clock)
}

#[tokio::test]
async fn rows_survive_reopen_with_current_schema() {
    let temp = tempdir().unwrap();

    let (store, _clock) = open_with_manual_clock(temp.path()).await;
    store.add_challenge(&challenge("aa01", NOW)).await;
    store.add_token(&token("bb02", NOW)).await;
    store.close().await;

    let marker = std::fs::read_to_string(temp.path().join(SCHEMA_FILE)).unwrap();
    assert_eq!(marker.trim(), SCHEMA_VERSION.to_string());

    let (store, _clock) = open_with_manual_clock(temp.path()).await;
    assert_eq!(store.get_challenge("aa01").await, Some(challenge("aa01", NOW)));
    assert_eq!(store.get_token("bb02").await, Some(token("bb02", NOW)));
    store.close().await;
}

#[tokio::test]
async fn stale_schema_marker_recreates_empty_database() {
    let temp = tempdir().unwrap();

    let (store, _clock) = open_with_manual_clock(temp.path()).await;
    store.add_challenge(&challenge("aa01", NOW)).await;
    store.add_token(&token("bb02", NOW)).await;
    store.close().await;

    std::fs::write(temp.path().join(SCHEMA_FILE), "1\n").unwrap();

    let (store, _clock) = open_with_manual_clock(temp.path()).await;
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.challenges, 0);
    assert_eq!(stats.tokens, 0);
    assert_eq!(store.get_challenge("aa01").await, None);

    let marker = std::fs::read_to_string(temp.path().join(SCHEMA_FILE)).unwrap();
    assert_eq!(marker.trim(), SCHEMA_VERSION.to_string());
    store.close().await;
}

#[tokio::test]
async fn current_marker_with_empty_database_file_is_rebuilt() {
    let temp = tempdir().unwrap();
    std::fs::write(temp.path().join(DB_FILE), b"").unwrap();
    std::fs::write(temp.path().join(SCHEMA_FILE), SCHEMA_VERSION.to_string()).unwrap();

    let store = Store::open(temp.path()).await.expect("open store");
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.challenges, 0);
    assert_eq!(stats.tokens, 0);

    let fresh = token("cc03", u64::MAX >> 1);
    store.add_token(&fresh).await;
    assert_eq!(store.get_token("cc03").await, Some(fresh));

    let marker = std::fs::read_to_string(temp.path().join(SCHEMA_FILE)).unwrap();
    assert_eq!(marker.trim(), SCHEMA_VERSION.to_string());
    store.close().await;
}

#[tokio::test]
async fn missing_schema_marker_recreates_database() {
    let temp = tempdir().unwrap();

    let (store, _clock) = open_with_manual_clock(temp.path()).await;
    store.add_token(&token("bb02", NOW)).await;
    store.close().await;

    std::fs::remove_file(temp.path().join(SCHEMA_FILE)).unwrap();

    let (store, _clock) = open_with_manual_clock(temp.path()).await;
    assert_eq!(store.stats().await.unwrap().tokens, 0);
    assert!(temp.path().join(DB_FILE).exists());
    assert!(temp.path().join(SCHEMA_FILE).exists());
    store.close().await;
}

#[tokio::test]
async fn explicit_sweep_purges_only_expired_rows() {
    let temp = tempdir().unwrap();
    let (store, _clock) = open_with_manual_clock(temp.path()).await;

    let token_life = TOKEN_LIFETIME.as_secs();
    let challenge_life = CHALLENGE_LIFETIME.as_secs();

    store.add_token(&token("01", NOW - token_life - 1)).await;
    store.add_token(&token("02", NOW - 1)).await;
    // 恰好等于有效期的不算过期
    store.add_token(&token("03", NOW - token_life)).await;
    store.add_challenge(&challenge("04", NOW - challenge_life - 1)).await;
    store.add_challenge(&challenge("05", NOW - 1)).await;

    let report = store.sweep().await.unwrap();
    assert_eq!(report.tokens_removed, 1);
    assert_eq!(report.challenges_removed, 1);

    assert_eq!(store.get_token("01").await, None);
    assert_eq!(store.get_token("02").await, Some(token("02", NOW - 1)));
    assert!(store.get_token("03").await.is_some());
    assert_eq!(store.get_challenge("04").await, None);
    assert!(store.get_challenge("05").await.is_some());
    store.close().await;
}

#[tokio::test]
async fn token_reads_within_interval_sweep_at_most_once() {
    let temp = tempdir().unwrap();
    let (store, clock) = open_with_manual_clock(temp.path()).await;
    assert_eq!(store.sweeps_run(), 0);

    store.get_token("abcd").await;
    store.get_token("abcd").await;
    assert_eq!(store.sweeps_run(), 1);

    clock.advance(CLEANUP_INTERVAL / 2);
    store.get_token("abcd").await;
    assert_eq!(store.sweeps_run(), 1);

    clock.advance(CLEANUP_INTERVAL / 2 + Duration::from_secs(1));
    store.get_token("abcd").await;
    store.get_token("abcd").await;
    assert_eq!(store.sweeps_run(), 2);
    store.close().await;
}

#[tokio::test]
async fn challenge_reads_never_sweep() {
    let temp = tempdir().unwrap();
    let (store, clock) = open_with_manual_clock(temp.path()).await;

    store.add_challenge(&challenge("0f", NOW)).await;
    clock.advance(CHALLENGE_LIFETIME + CLEANUP_INTERVAL + Duration::from_secs(1));

    // 过期了但还没有被清理
    assert!(store.get_challenge("0f").await.is_some());
    assert_eq!(store.sweeps_run(), 0);

    // token 读路径顺带清掉它
    store.get_token("ff").await;
    assert_eq!(store.sweeps_run(), 1);
    assert_eq!(store.get_challenge("0f").await, None);
    store.close().await;
}

#[tokio::test]
async fn token_expires_after_interval_elapses() {
    let temp = tempdir().unwrap();
    let (store, clock) = open_with_manual_clock(temp.path()).await;

    store.add_token(&token("c0ffee", NOW)).await;
    assert!(store.get_token("c0ffee").await.is_some());

    clock.advance(TOKEN_LIFETIME + Duration::from_secs(1));
    assert_eq!(store.get_token("c0ffee").await, None);
    store.close().await;
}

#[tokio::test]
async fn reopen_runs_initial_sweep() {
    let temp = tempdir().unwrap();

    let (store, _clock) = open_with_manual_clock(temp.path()).await;
    store
        .add_token(&token("01", NOW - TOKEN_LIFETIME.as_secs() - 60))
        .await;
    store.close().await;

    let (store, _clock) = open_with_manual_clock(temp.path()).await;
    assert_eq!(store.sweeps_run(), 1);
    assert_eq!(store.stats().await.unwrap().tokens, 0);
    store.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_token_reads_share_one_sweep() {
    let temp = tempdir().unwrap();
    let (store, _clock) = open_with_manual_clock(temp.path()).await;
    store.add_token(&token("1234", NOW)).await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move { store.get_token("1234").await }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), Some(token("1234", NOW)));
    }

    assert_eq!(store.sweeps_run(), 1);
    store.close().await;
}

#[tokio::test]
async fn invalid_keys_never_mutate_storage() {
    let temp = tempdir().unwrap();
    let (store, _clock) = open_with_manual_clock(temp.path()).await;
    store.add_challenge(&challenge("aa", NOW)).await;
    store.add_token(&token("aa", NOW)).await;

    for bad in ["", "AA", "aa'", "a a", "aa\"; DELETE FROM challenges; --"] {
        store.add_challenge(&challenge(bad, NOW)).await;
        store.add_token(&token(bad, NOW)).await;
        assert_eq!(store.get_challenge(bad).await, None);
        assert_eq!(store.get_token(bad).await, None);
        store.drop_challenge(bad).await;
        store.drop_token(bad).await;
    }

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.challenges, 1);
    assert_eq!(stats.tokens, 1);
    assert_eq!(store.sweeps_run(), 0);
    store.close().await;
}
