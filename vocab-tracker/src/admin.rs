//! Password-gated community statistics.

use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::{
    error::AppError,
    model::{Difficulty, UserId, Word},
    storage::{Order, Storage, WordQuery, WordStat},
};

const HISTORY_DAYS: i64 = 30;
const RECENT_WORDS: u32 = 20;
const TOP_USERS: usize = 10;

/// Shared-secret check. The secret never leaves this side; callers only learn
/// whether their password was accepted.
#[derive(Clone)]
pub struct AdminGate {
    secret: Option<String>,
}

impl AdminGate {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|secret| !secret.is_empty()),
        }
    }

    pub fn verify(&self, password: &str) -> Result<(), AppError> {
        match &self.secret {
            Some(secret) if constant_time_eq(secret.as_bytes(), password.as_bytes()) => Ok(()),
            Some(_) => Err(AppError::Unauthorized),
            None => {
                tracing::warn!("admin password is not configured");
                Err(AppError::Unauthorized)
            }
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_words: usize,
    pub words_today: i64,
    pub avg_per_user: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DifficultyCount {
    pub difficulty: Difficulty,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentWord {
    pub word: String,
    pub difficulty: Difficulty,
    pub display_name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUser {
    pub display_name: String,
    pub word_count: usize,
    pub latest_activity: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub stats: DashboardStats,
    pub words_by_date: Vec<DateCount>,
    pub difficulty_breakdown: Vec<DifficultyCount>,
    pub recent_words: Vec<RecentWord>,
    pub top_users: Vec<TopUser>,
}

/// Verifies the password, then reads and aggregates everything in one go.
pub async fn dashboard(
    gate: &AdminGate,
    storage: &Storage,
    password: &str,
) -> Result<DashboardData, AppError> {
    gate.verify(password)?;
    let now = Utc::now().naive_utc();
    let today = WordQuery {
        created_since: now.date().and_hms_opt(0, 0, 0),
        ..Default::default()
    };
    let newest = WordQuery {
        order: Order::Newest,
        limit: Some(RECENT_WORDS),
        ..Default::default()
    };
    let (total_users, stats, words_today, recent) = futures::try_join!(
        storage.count_profiles(),
        storage.select_word_stats(),
        storage.count_words(&today),
        storage.select_words(&newest),
    )
    .map_err(AppError::FetchFailed)?;

    let mut user_ids: Vec<UserId> = stats
        .iter()
        .filter_map(|stat| stat.user_id)
        .chain(recent.iter().filter_map(|word| word.owner))
        .collect();
    user_ids.sort_unstable();
    user_ids.dedup();
    let names: HashMap<UserId, String> = storage
        .select_profiles(&user_ids)
        .await
        .map_err(AppError::FetchFailed)?
        .into_iter()
        .map(|profile| (profile.id, profile.name().to_owned()))
        .collect();

    Ok(aggregate(now, total_users, words_today, &stats, &recent, &names))
}

pub fn aggregate(
    now: NaiveDateTime,
    total_users: i64,
    words_today: i64,
    stats: &[WordStat],
    recent: &[Word],
    names: &HashMap<UserId, String>,
) -> DashboardData {
    let display_name = |user: Option<UserId>| {
        user.and_then(|id| names.get(&id))
            .cloned()
            .unwrap_or_else(|| "Unknown".to_owned())
    };

    let total_words = stats.len();
    let avg_per_user = if total_users > 0 {
        (total_words as f64 / total_users as f64 * 10.0).round() / 10.0
    } else {
        0.0
    };

    let history_start = (now - chrono::Duration::days(HISTORY_DAYS)).date();
    let mut by_date: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for stat in stats {
        let date = stat.created_at.date();
        if date >= history_start {
            *by_date.entry(date).or_default() += 1;
        }
    }

    let difficulty_breakdown = Difficulty::ALL
        .iter()
        .map(|difficulty| DifficultyCount {
            difficulty: *difficulty,
            count: stats
                .iter()
                .filter(|stat| stat.difficulty == *difficulty)
                .count(),
        })
        .filter(|entry| entry.count > 0)
        .collect();

    let mut per_user: HashMap<UserId, (usize, NaiveDateTime)> = HashMap::new();
    for stat in stats {
        let Some(user) = stat.user_id else { continue };
        let entry = per_user.entry(user).or_insert((0, stat.created_at));
        entry.0 += 1;
        if stat.created_at > entry.1 {
            entry.1 = stat.created_at;
        }
    }
    let mut top_users: Vec<TopUser> = per_user
        .into_iter()
        .map(|(user, (word_count, latest_activity))| TopUser {
            display_name: display_name(Some(user)),
            word_count,
            latest_activity,
        })
        .collect();
    top_users.sort_by(|a, b| {
        b.word_count
            .cmp(&a.word_count)
            .then(b.latest_activity.cmp(&a.latest_activity))
    });
    top_users.truncate(TOP_USERS);

    DashboardData {
        stats: DashboardStats {
            total_users,
            total_words,
            words_today,
            avg_per_user,
        },
        words_by_date: by_date
            .into_iter()
            .map(|(date, count)| DateCount { date, count })
            .collect(),
        difficulty_breakdown,
        recent_words: recent
            .iter()
            .map(|word| RecentWord {
                word: word.word.clone(),
                difficulty: word.difficulty,
                display_name: display_name(word.owner),
                created_at: word.created_at,
            })
            .collect(),
        top_users,
    }
}

pub type DashboardUpdate = Result<DashboardData, AppError>;

/// Refreshes the dashboard every `period`, publishing each result. A new
/// snapshot replaces the previous one; the task ends once every receiver is
/// gone.
pub fn spawn_dashboard_refresh(
    gate: AdminGate,
    storage: Storage,
    password: String,
    period: Duration,
) -> (watch::Receiver<Option<DashboardUpdate>>, JoinHandle<()>) {
    let (sender, receiver) = watch::channel(None);
    let handle = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = sender.closed() => break,
            }
            let update = dashboard(&gate, &storage, &password).await;
            if let Err(error) = &update {
                tracing::warn!(%error, "dashboard refresh failed");
            }
            if sender.send(Some(update)).is_err() {
                break;
            }
        }
        tracing::debug!("dashboard refresh stopped");
    });
    (receiver, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::WordId, storage::WordRecord};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn stat(
        id: i64,
        difficulty: Difficulty,
        created_at: NaiveDateTime,
        user: Option<i64>,
    ) -> WordStat {
        WordStat {
            id: WordId(id),
            difficulty,
            created_at,
            user_id: user.map(UserId),
        }
    }

    #[test]
    fn gate_rejects_wrong_and_missing_secrets_alike() {
        let gate = AdminGate::new(Some("hunter2".into()));
        assert!(gate.verify("hunter2").is_ok());
        assert!(matches!(gate.verify("hunter3"), Err(AppError::Unauthorized)));
        assert!(matches!(gate.verify(""), Err(AppError::Unauthorized)));
        let unconfigured = AdminGate::new(Some(String::new()));
        assert!(matches!(unconfigured.verify(""), Err(AppError::Unauthorized)));
    }

    #[test]
    fn aggregates_counts_history_and_contributors() {
        let now = at(31, 12);
        let stats = vec![
            stat(1, Difficulty::Easy, at(31, 9), Some(1)),
            stat(2, Difficulty::Easy, at(31, 10), Some(1)),
            stat(3, Difficulty::Hard, at(30, 10), Some(2)),
            stat(4, Difficulty::Hard, at(1, 10), None),
        ];
        let names = HashMap::from([(UserId(1), "ada".to_owned())]);
        let data = aggregate(now, 3, 2, &stats, &[], &names);

        assert_eq!(data.stats.total_words, 4);
        assert_eq!(data.stats.avg_per_user, 1.3);
        assert_eq!(
            data.words_by_date,
            vec![
                DateCount {
                    date: at(1, 0).date(),
                    count: 1
                },
                DateCount {
                    date: at(30, 0).date(),
                    count: 1
                },
                DateCount {
                    date: at(31, 0).date(),
                    count: 2
                },
            ]
        );
        assert_eq!(
            data.difficulty_breakdown,
            vec![
                DifficultyCount {
                    difficulty: Difficulty::Easy,
                    count: 2
                },
                DifficultyCount {
                    difficulty: Difficulty::Hard,
                    count: 2
                },
            ]
        );
        assert_eq!(data.top_users.len(), 2);
        assert_eq!(data.top_users[0].display_name, "ada");
        assert_eq!(data.top_users[0].word_count, 2);
        assert_eq!(data.top_users[0].latest_activity, at(31, 10));
        assert_eq!(data.top_users[1].display_name, "Unknown");
    }

    #[test]
    fn old_words_fall_out_of_the_history() {
        let now = at(31, 12);
        let stats = vec![stat(1, Difficulty::Medium, at(1, 11) - chrono::Duration::days(1), None)];
        let data = aggregate(now, 0, 0, &stats, &[], &HashMap::new());
        assert!(data.words_by_date.is_empty());
        assert_eq!(data.stats.avg_per_user, 0.0);
    }

    #[tokio::test]
    async fn dashboard_requires_the_password() {
        let storage = Storage::in_memory().await.unwrap();
        let gate = AdminGate::new(Some("secret".into()));
        let error = dashboard(&gate, &storage, "guess").await.unwrap_err();
        assert!(matches!(error, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn dashboard_reports_unreadable_store() {
        let storage = Storage::in_memory().await.unwrap();
        storage.close().await;
        let gate = AdminGate::new(Some("secret".into()));
        let error = dashboard(&gate, &storage, "secret").await.unwrap_err();
        assert!(matches!(error, AppError::FetchFailed(_)));
    }

    #[tokio::test]
    async fn dashboard_reads_live_data() {
        let storage = Storage::in_memory().await.unwrap();
        let ada = storage.insert_profile(Some("ada")).await.unwrap();
        storage.insert_profile(None).await.unwrap();
        for word in ["cat", "dog", "owl"] {
            storage
                .insert_word(
                    Some(ada.id),
                    &WordRecord {
                        word: word.into(),
                        definition: format!("meaning of {word}"),
                        senses: vec![],
                        example_sentence: None,
                        difficulty: Difficulty::Easy,
                    },
                )
                .await
                .unwrap();
        }
        let gate = AdminGate::new(Some("secret".into()));
        let data = dashboard(&gate, &storage, "secret").await.unwrap();
        assert_eq!(data.stats.total_users, 2);
        assert_eq!(data.stats.total_words, 3);
        assert_eq!(data.stats.words_today, 3);
        assert_eq!(data.stats.avg_per_user, 1.5);
        assert_eq!(data.recent_words[0].word, "owl");
        assert_eq!(data.recent_words[0].display_name, "ada");
        assert_eq!(data.top_users[0].word_count, 3);
    }

    #[tokio::test]
    async fn refresh_task_publishes_and_stops_with_its_receiver() {
        let storage = Storage::in_memory().await.unwrap();
        let gate = AdminGate::new(Some("secret".into()));
        let (mut receiver, handle) = spawn_dashboard_refresh(
            gate,
            storage,
            "secret".into(),
            Duration::from_millis(10),
        );
        for _ in 0..2 {
            tokio::time::timeout(Duration::from_secs(5), receiver.changed())
                .await
                .unwrap()
                .unwrap();
            let snapshot = receiver.borrow_and_update();
            let data = snapshot.as_ref().unwrap().as_ref().unwrap();
            assert_eq!(data.stats.total_words, 0);
        }
        drop(receiver);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
