//! Per-run memoized lookup of mentioned users, roles and channels.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait,
    futures::future::{BoxFuture, FutureExt, Shared},
    serde::{Deserialize, Serialize},
    skald_common::types::Snowflake,
    skald_markdown::EntityKind,
    tokio::sync::Mutex,
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use skald_metrics::{counter, entities as entity_metrics, labels};

// ── Capability traits ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub avatar_url: Option<String>,
    pub color: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInfo {
    pub name: String,
    pub color: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub name: String,
}

/// Looks up a user by id. `Ok(None)` means the user does not exist.
#[async_trait]
pub trait ResolveUser: Send + Sync {
    async fn resolve_user(&self, id: Snowflake) -> anyhow::Result<Option<UserInfo>>;
}

#[async_trait]
pub trait ResolveRole: Send + Sync {
    async fn resolve_role(&self, id: Snowflake) -> anyhow::Result<Option<RoleInfo>>;
}

#[async_trait]
pub trait ResolveChannel: Send + Sync {
    async fn resolve_channel(&self, id: Snowflake) -> anyhow::Result<Option<ChannelInfo>>;
}

/// The lookup callbacks for one run. Missing callbacks resolve everything of
/// that kind to the unknown sentinel.
#[derive(Clone, Default)]
pub struct Resolvers {
    pub user: Option<Arc<dyn ResolveUser>>,
    pub role: Option<Arc<dyn ResolveRole>>,
    pub channel: Option<Arc<dyn ResolveChannel>>,
}

impl fmt::Debug for Resolvers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolvers")
            .field("user", &self.user.is_some())
            .field("role", &self.role.is_some())
            .field("channel", &self.channel.is_some())
            .finish()
    }
}

// ── Resolved values ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: Snowflake,
}

impl EntityKey {
    #[must_use]
    pub fn new(kind: EntityKind, id: Snowflake) -> Self {
        Self { kind, id }
    }
}

impl From<(EntityKind, Snowflake)> for EntityKey {
    fn from((kind, id): (EntityKind, Snowflake)) -> Self {
        Self { kind, id }
    }
}

/// `user:123`, used as the map key in serialized documents.
impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// `false` for the sentinel returned when a lookup fails.
    pub exists: bool,
}

impl ResolvedEntity {
    /// Sentinel for entities that could not be resolved; shows the raw id.
    #[must_use]
    pub fn unknown(key: EntityKey) -> Self {
        Self {
            name: key.id.to_string(),
            color: None,
            avatar_url: None,
            exists: false,
        }
    }
}

impl From<UserInfo> for ResolvedEntity {
    fn from(info: UserInfo) -> Self {
        Self {
            name: info.name,
            color: info.color,
            avatar_url: info.avatar_url,
            exists: true,
        }
    }
}

impl From<RoleInfo> for ResolvedEntity {
    fn from(info: RoleInfo) -> Self {
        Self {
            name: info.name,
            color: info.color,
            avatar_url: None,
            exists: true,
        }
    }
}

impl From<ChannelInfo> for ResolvedEntity {
    fn from(info: ChannelInfo) -> Self {
        Self {
            name: info.name,
            color: None,
            avatar_url: None,
            exists: true,
        }
    }
}

// ── Resolver ────────────────────────────────────────────────────────────────

type PendingEntity = Shared<BoxFuture<'static, ResolvedEntity>>;

/// Resolves entity keys for one run, calling each callback at most once per
/// key. The first request for a key starts the lookup; concurrent requests
/// await the same future.
pub struct EntityResolver {
    resolvers: Resolvers,
    cache: Mutex<HashMap<EntityKey, PendingEntity>>,
    lookups: Arc<AtomicUsize>,
}

impl EntityResolver {
    #[must_use]
    pub fn new(resolvers: Resolvers) -> Self {
        Self {
            resolvers,
            cache: Mutex::new(HashMap::new()),
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Never fails: errors and misses become [`ResolvedEntity::unknown`].
    pub async fn resolve(&self, key: EntityKey) -> ResolvedEntity {
        let pending = {
            let mut cache = self.cache.lock().await;
            if let Some(pending) = cache.get(&key) {
                #[cfg(feature = "metrics")]
                counter!(entity_metrics::CACHE_HITS_TOTAL, labels::KIND => key.kind.as_str())
                    .increment(1);
                pending.clone()
            } else {
                let pending = self.lookup(key).boxed().shared();
                cache.insert(key, pending.clone());
                pending
            }
        };
        pending.await
    }

    /// Completed resolutions.
    pub async fn snapshot(&self) -> BTreeMap<EntityKey, ResolvedEntity> {
        let cache = self.cache.lock().await;
        cache
            .iter()
            .filter_map(|(key, pending)| pending.peek().map(|e| (*key, e.clone())))
            .collect()
    }

    /// Number of callback invocations so far.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    fn lookup(&self, key: EntityKey) -> impl Future<Output = ResolvedEntity> + Send + 'static {
        let resolvers = self.resolvers.clone();
        let lookups = Arc::clone(&self.lookups);

        async move {
            let EntityKey { kind, id } = key;
            let outcome: Option<anyhow::Result<Option<ResolvedEntity>>> = match kind {
                EntityKind::User => match resolvers.user {
                    Some(r) => Some(r.resolve_user(id).await.map(|o| o.map(Into::into))),
                    None => None,
                },
                EntityKind::Role => match resolvers.role {
                    Some(r) => Some(r.resolve_role(id).await.map(|o| o.map(Into::into))),
                    None => None,
                },
                EntityKind::Channel => match resolvers.channel {
                    Some(r) => Some(r.resolve_channel(id).await.map(|o| o.map(Into::into))),
                    None => None,
                },
            };
            if outcome.is_some() {
                lookups.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "metrics")]
                counter!(entity_metrics::LOOKUPS_TOTAL, labels::KIND => kind.as_str()).increment(1);
            }

            match outcome {
                Some(Ok(Some(entity))) => entity,
                Some(Ok(None)) => {
                    debug!(%key, "entity not found");
                    unresolved(key)
                },
                Some(Err(e)) => {
                    warn!(%key, error = %e, "entity lookup failed");
                    unresolved(key)
                },
                None => {
                    debug!(%key, "no resolver for entity kind");
                    unresolved(key)
                },
            }
        }
    }
}

fn unresolved(key: EntityKey) -> ResolvedEntity {
    #[cfg(feature = "metrics")]
    counter!(entity_metrics::UNRESOLVED_TOTAL, labels::KIND => key.kind.as_str()).increment(1);
    ResolvedEntity::unknown(key)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::time::Duration};

    #[derive(Default)]
    struct CountingUsers {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ResolveUser for CountingUsers {
        async fn resolve_user(&self, id: Snowflake) -> anyhow::Result<Option<UserInfo>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            match id.0 {
                123 => Ok(Some(UserInfo {
                    name: "Ann".into(),
                    avatar_url: None,
                    color: Some(0xff0000),
                })),
                500 => anyhow::bail!("upstream timeout"),
                _ => Ok(None),
            }
        }
    }

    fn user(id: u64) -> EntityKey {
        EntityKey::new(EntityKind::User, Snowflake(id))
    }

    fn resolver_with(users: Arc<CountingUsers>) -> EntityResolver {
        EntityResolver::new(Resolvers {
            user: Some(users),
            ..Resolvers::default()
        })
    }

    #[tokio::test]
    async fn resolves_known_user() {
        let resolver = resolver_with(Arc::new(CountingUsers::default()));
        let ann = resolver.resolve(user(123)).await;
        assert_eq!(ann.name, "Ann");
        assert!(ann.exists);
        assert_eq!(ann.color, Some(0xff0000));
    }

    #[tokio::test]
    async fn memoizes_sequential_requests() {
        let users = Arc::new(CountingUsers::default());
        let resolver = resolver_with(users.clone());
        resolver.resolve(user(123)).await;
        resolver.resolve(user(123)).await;
        assert_eq!(users.calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.lookups(), 1);
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_lookup() {
        let users = Arc::new(CountingUsers::default());
        let resolver = resolver_with(users.clone());
        let results =
            futures::future::join_all((0..10).map(|_| resolver.resolve(user(123)))).await;
        assert!(results.iter().all(|e| e.name == "Ann"));
        assert_eq!(users.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_become_sentinel() {
        let resolver = resolver_with(Arc::new(CountingUsers::default()));
        let missing = resolver.resolve(user(7)).await;
        let errored = resolver.resolve(user(500)).await;
        assert_eq!(missing, ResolvedEntity::unknown(user(7)));
        assert_eq!(errored.name, "500");
        assert!(!errored.exists);
    }

    #[tokio::test]
    async fn missing_callback_is_sentinel_without_lookup() {
        let resolver = EntityResolver::new(Resolvers::default());
        let role = EntityKey::new(EntityKind::Role, Snowflake(9));
        assert!(!resolver.resolve(role).await.exists);
        assert_eq!(resolver.lookups(), 0);
    }

    #[tokio::test]
    async fn snapshot_is_ordered_by_key() {
        let resolver = resolver_with(Arc::new(CountingUsers::default()));
        resolver.resolve(user(123)).await;
        resolver
            .resolve(EntityKey::new(EntityKind::Channel, Snowflake(1)))
            .await;
        resolver.resolve(user(7)).await;
        let keys: Vec<String> = resolver
            .snapshot()
            .await
            .keys()
            .map(ToString::to_string)
            .collect();
        assert_eq!(keys, vec!["user:7", "user:123", "channel:1"]);
    }
}
