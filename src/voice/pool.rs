//! The pool reconciler.
//!
//! Reacts to three triggers: the ready/reconnect sweep ([`VoicePool::reconcile`]),
//! a member joining a managed channel ([`VoicePool::handle_join`]), and a
//! member leaving one ([`VoicePool::handle_leave`]). Each trigger acquires
//! the same serialization lock before observing the channel set, so at most
//! one create/delete decision is in flight at a time. Failures on the
//! reactive path are logged and swallowed; the next trigger re-derives the
//! state and corrects any drift.

use std::sync::Arc;

use rand::rngs::StdRng;
use tokio::sync::Mutex;
use tracing::instrument;

use super::config::VoiceConfig;
use super::gateway::ChannelGateway;
use super::gateway::ChannelSnapshot;
use super::gateway::GatewayError;
use super::names::NameAllocator;
use super::VoiceError;
use crate::serenity;

/// Keeps exactly one empty voice channel available in the managed category.
pub struct VoicePool {
    config: VoiceConfig,
    gateway: Arc<dyn ChannelGateway>,
    names: NameAllocator,
    /// Serializes every observe-decide-act sequence on the channel set.
    lock: Mutex<()>,
    /// Injected so tests can fix the permutation.
    rng: Mutex<StdRng>,
}

impl VoicePool {
    /// The lock is constructed by the caller and handed over here; the pool
    /// is its only user for the lifetime of the process.
    pub fn new(
        config: VoiceConfig,
        gateway: Arc<dyn ChannelGateway>,
        lock: Mutex<()>,
        rng: StdRng,
    ) -> Self {
        let names = NameAllocator::new(&config);
        Self {
            config,
            gateway,
            names,
            lock,
            rng: Mutex::new(rng),
        }
    }

    /// Restores the pool invariant from whatever state the category is in:
    /// deletes all but one empty channel, or creates one if none is empty.
    ///
    /// Idempotent; runs on ready and on every reconnect. Individual
    /// create/delete failures are logged and do not abort the sweep.
    pub async fn reconcile(&self) {
        let _guard = self.lock.lock().await;

        let channels = match self.gateway.list_channels().await {
            Ok(channels) => channels,
            Err(error) => {
                tracing::error!("Failed to enumerate voice channels: {error}");
                return;
            }
        };

        let empty: Vec<&ChannelSnapshot> =
            channels.iter().filter(|c| self.is_empty(c)).collect();

        if empty.len() > 1 {
            // Keep one arbitrary survivor, all are equally empty.
            let doomed = empty[1..].iter().map(|c| self.delete_channel(c));
            futures::future::join_all(doomed).await;
        }

        if empty.is_empty() {
            let _ = self.create_channel(&channels).await;
        }

        tracing::info!("Checked voice channels.");
    }

    /// A member joined `channel`. If that filled the last empty channel in
    /// the category, a new one is created.
    #[instrument(skip(self))]
    pub async fn handle_join(&self, channel: serenity::ChannelId) {
        let _guard = self.lock.lock().await;

        let channels = match self.gateway.list_channels().await {
            Ok(channels) => channels,
            Err(error) => {
                tracing::error!("Failed to enumerate voice channels: {error}");
                return;
            }
        };

        // Not ours to manage.
        if !channels.iter().any(|c| c.id == channel) {
            return;
        }

        if channels.iter().any(|c| self.is_empty(c)) {
            return;
        }

        let _ = self.create_channel(&channels).await;
    }

    /// A member left `channel`. If that emptied it while another empty
    /// channel already exists, the vacated channel is deleted; the sole
    /// empty channel is never deleted.
    #[instrument(skip(self))]
    pub async fn handle_leave(&self, channel: serenity::ChannelId) {
        let _guard = self.lock.lock().await;

        let channels = match self.gateway.list_channels().await {
            Ok(channels) => channels,
            Err(error) => {
                tracing::error!("Failed to enumerate voice channels: {error}");
                return;
            }
        };

        let Some(vacated) = channels.iter().find(|c| c.id == channel) else {
            return;
        };
        if !self.is_empty(vacated) {
            return;
        }

        let another_empty = channels
            .iter()
            .any(|c| c.id != channel && self.is_empty(c));
        if another_empty {
            self.delete_channel(vacated).await;
        }

        // Normally a no-op, since a deletion only happens when another empty
        // channel exists. Corrects drift left by failed or partial
        // operations.
        match self.gateway.list_channels().await {
            Ok(channels) => {
                if !channels.iter().any(|c| self.is_empty(c)) {
                    let _ = self.create_channel(&channels).await;
                }
            }
            Err(error) => tracing::error!("Failed to enumerate voice channels: {error}"),
        }
    }

    /// Sets the user limit of a channel in the managed category.
    ///
    /// Limits and renames don't change the empty/non-empty partition, so
    /// neither operation takes the pool lock.
    pub async fn set_limit(
        &self,
        channel: serenity::ChannelId,
        value: u16,
    ) -> Result<(), VoiceError> {
        self.ensure_managed(channel).await?;

        if let Err(error) = self.gateway.set_user_limit(channel, value).await {
            tracing::error!("Failed to set user limit of {channel} to {value}: {error}");
            return Err(error.into());
        }

        self.log_channel_event(format!("Set user limit of {channel} to {value}."));
        Ok(())
    }

    /// Renames a channel in the managed category. Throttling surfaces as
    /// [`VoiceError::RateLimitExceeded`] so callers can tell the user why.
    pub async fn rename(
        &self,
        channel: serenity::ChannelId,
        name: &str,
    ) -> Result<(), VoiceError> {
        self.ensure_managed(channel).await?;

        match self.gateway.rename_channel(channel, name).await {
            Ok(()) => {
                self.log_channel_event(format!("Renamed {channel} to \"{name}\"."));
                Ok(())
            }
            Err(GatewayError::RateLimited) => {
                let message =
                    format!("Failed to rename {channel} to \"{name}\" due to a rate limit.");
                if self.config.logging.rate_limit {
                    tracing::error!("{message}");
                } else {
                    tracing::debug!("{message}");
                }
                Err(VoiceError::RateLimitExceeded)
            }
            Err(error) => {
                tracing::error!("Failed to rename {channel} to \"{name}\": {error}");
                Err(error.into())
            }
        }
    }

    /// Logs a member joining, leaving, or moving between voice channels.
    pub fn log_member_movement(
        &self,
        member: &str,
        before: Option<serenity::ChannelId>,
        after: Option<serenity::ChannelId>,
    ) {
        if !self.config.logging.member_events {
            return;
        }
        match (before, after) {
            (Some(from), Some(to)) => {
                tracing::info!("\"{member}\" moved from {from} to {to}.");
            }
            (Some(from), None) => tracing::info!("\"{member}\" left {from}."),
            (None, Some(to)) => tracing::info!("\"{member}\" joined {to}."),
            (None, None) => {}
        }
    }

    fn counted_members(&self, channel: &ChannelSnapshot) -> u32 {
        if self.config.ignore_bots {
            channel.humans
        } else {
            channel.humans + channel.bots
        }
    }

    fn is_empty(&self, channel: &ChannelSnapshot) -> bool {
        self.counted_members(channel) == 0
    }

    async fn ensure_managed(&self, channel: serenity::ChannelId) -> Result<(), VoiceError> {
        let channels = self.gateway.list_channels().await?;
        if channels.iter().any(|c| c.id == channel) {
            Ok(())
        } else {
            Err(VoiceError::UnmanagedCategory)
        }
    }

    /// Creates one channel named by the allocator. Failures are logged and
    /// reported as `None`.
    async fn create_channel(&self, current: &[ChannelSnapshot]) -> Option<serenity::ChannelId> {
        let in_use: Vec<String> = current.iter().map(|c| c.name.clone()).collect();
        let name = {
            let mut rng = self.rng.lock().await;
            self.names.next_name(&in_use, &mut *rng)
        };

        match self.gateway.create_channel(&name).await {
            Ok(id) => {
                self.log_channel_event(format!("Created \"{name}\" ({id})."));
                Some(id)
            }
            Err(error) => {
                tracing::error!("Failed to create voice channel \"{name}\": {error}");
                None
            }
        }
    }

    /// Deletes one channel. Failures are logged and swallowed.
    async fn delete_channel(&self, channel: &ChannelSnapshot) {
        match self.gateway.delete_channel(channel.id).await {
            Ok(()) => {
                self.log_channel_event(format!(
                    "Deleted \"{}\" ({}).",
                    channel.name, channel.id
                ));
            }
            Err(error) => {
                tracing::error!(
                    "Failed to delete voice channel \"{}\": {error}",
                    channel.name
                );
            }
        }
    }

    fn log_channel_event(&self, message: String) {
        if self.config.logging.channel_events {
            tracing::info!("{message}");
        } else {
            tracing::debug!("{message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::AtomicU64;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use rand::SeedableRng;

    use super::super::config::ChannelOrderStrategy;
    use super::*;

    /// In-memory stand-in for the remote channel set.
    struct FakeGateway {
        channels: StdMutex<Vec<ChannelSnapshot>>,
        next_id: AtomicU64,
        creates: AtomicUsize,
        deletes: AtomicUsize,
        fail_delete: StdMutex<HashSet<serenity::ChannelId>>,
        rate_limit_renames: bool,
    }

    impl FakeGateway {
        fn new(channels: Vec<ChannelSnapshot>) -> Arc<Self> {
            Arc::new(Self {
                channels: StdMutex::new(channels),
                next_id: AtomicU64::new(100),
                creates: AtomicUsize::new(0),
                deletes: AtomicUsize::new(0),
                fail_delete: StdMutex::new(HashSet::new()),
                rate_limit_renames: false,
            })
        }

        fn join(&self, channel: serenity::ChannelId) {
            let mut channels = self.channels.lock().unwrap();
            channels.iter_mut().find(|c| c.id == channel).unwrap().humans += 1;
        }

        fn leave(&self, channel: serenity::ChannelId) {
            let mut channels = self.channels.lock().unwrap();
            channels.iter_mut().find(|c| c.id == channel).unwrap().humans -= 1;
        }

        fn empty_count(&self) -> usize {
            self.channels
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.humans == 0)
                .count()
        }

        fn names(&self) -> Vec<String> {
            self.channels
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.name.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ChannelGateway for FakeGateway {
        async fn list_channels(&self) -> Result<Vec<ChannelSnapshot>, GatewayError> {
            Ok(self.channels.lock().unwrap().clone())
        }

        async fn create_channel(&self, name: &str) -> Result<serenity::ChannelId, GatewayError> {
            let id = serenity::ChannelId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.channels.lock().unwrap().push(ChannelSnapshot {
                id,
                name: name.to_string(),
                humans: 0,
                bots: 0,
            });
            Ok(id)
        }

        async fn delete_channel(&self, channel: serenity::ChannelId) -> Result<(), GatewayError> {
            if self.fail_delete.lock().unwrap().contains(&channel) {
                return Err(GatewayError::Timeout);
            }
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.channels.lock().unwrap().retain(|c| c.id != channel);
            Ok(())
        }

        async fn rename_channel(
            &self,
            channel: serenity::ChannelId,
            name: &str,
        ) -> Result<(), GatewayError> {
            if self.rate_limit_renames {
                return Err(GatewayError::RateLimited);
            }
            let mut channels = self.channels.lock().unwrap();
            if let Some(target) = channels.iter_mut().find(|c| c.id == channel) {
                target.name = name.to_string();
            }
            Ok(())
        }

        async fn set_user_limit(
            &self,
            _channel: serenity::ChannelId,
            _limit: u16,
        ) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    fn chan(id: u64, name: &str, humans: u32) -> ChannelSnapshot {
        ChannelSnapshot {
            id: serenity::ChannelId::new(id),
            name: name.to_string(),
            humans,
            bots: 0,
        }
    }

    fn test_config() -> VoiceConfig {
        VoiceConfig {
            enabled: true,
            ignore_bots: true,
            channel_order_strategy: ChannelOrderStrategy::FirstAvailable,
            ensure_unique_names: true,
            overflow_channel_name: "Overflow {number}".to_string(),
            available_channel_names: ["Lobby", "Study Room", "Lecture Hall"]
                .map(String::from)
                .to_vec(),
            ..Default::default()
        }
    }

    fn pool_with(gateway: &Arc<FakeGateway>, config: VoiceConfig) -> VoicePool {
        VoicePool::new(
            config,
            gateway.clone(),
            Mutex::new(()),
            StdRng::seed_from_u64(7),
        )
    }

    fn id(n: u64) -> serenity::ChannelId {
        serenity::ChannelId::new(n)
    }

    #[tokio::test]
    async fn reconcile_creates_a_channel_when_none_are_empty() {
        let gateway = FakeGateway::new(vec![chan(1, "Lobby", 2)]);
        let pool = pool_with(&gateway, test_config());

        pool.reconcile().await;

        assert_eq!(gateway.creates.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.empty_count(), 1);
        // First free candidate; "Lobby" is taken.
        assert!(gateway.names().contains(&"Study Room".to_string()));
    }

    #[tokio::test]
    async fn reconcile_deletes_all_but_one_empty_channel() {
        let gateway = FakeGateway::new(vec![
            chan(1, "Lobby", 0),
            chan(2, "Study Room", 0),
            chan(3, "Lecture Hall", 0),
            chan(4, "Overflow 1", 3),
        ]);
        let pool = pool_with(&gateway, test_config());

        pool.reconcile().await;

        assert_eq!(gateway.deletes.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.creates.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.empty_count(), 1);
    }

    #[tokio::test]
    async fn reconcile_twice_changes_nothing_the_second_time() {
        let gateway = FakeGateway::new(vec![chan(1, "Lobby", 1), chan(2, "Study Room", 0)]);
        let pool = pool_with(&gateway, test_config());

        pool.reconcile().await;
        let creates = gateway.creates.load(Ordering::SeqCst);
        let deletes = gateway.deletes.load(Ordering::SeqCst);

        pool.reconcile().await;
        assert_eq!(gateway.creates.load(Ordering::SeqCst), creates);
        assert_eq!(gateway.deletes.load(Ordering::SeqCst), deletes);
    }

    #[tokio::test]
    async fn join_creates_a_channel_only_when_no_empty_remains() {
        let gateway = FakeGateway::new(vec![chan(1, "Lobby", 1), chan(2, "Study Room", 0)]);
        let pool = pool_with(&gateway, test_config());

        // Someone takes the sole empty channel.
        gateway.join(id(2));
        pool.handle_join(id(2)).await;
        assert_eq!(gateway.creates.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.empty_count(), 1);

        // Another member joins an occupied channel; an empty one still exists.
        gateway.join(id(1));
        pool.handle_join(id(1)).await;
        assert_eq!(gateway.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_joins_create_exactly_one_channel() {
        let gateway = FakeGateway::new(vec![chan(1, "Lobby", 0)]);
        let pool = pool_with(&gateway, test_config());

        // Two members pile into the only channel before either handler runs.
        gateway.join(id(1));
        gateway.join(id(1));

        tokio::join!(pool.handle_join(id(1)), pool.handle_join(id(1)));

        assert_eq!(gateway.creates.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.empty_count(), 1);
    }

    #[tokio::test]
    async fn newly_emptied_channel_is_deleted_when_another_empty_exists() {
        // The category holds Lobby (occupied) and Extra (empty). The member
        // leaving Lobby empties it while Extra is already empty, so Lobby
        // goes and Extra stays as the sole empty channel.
        let gateway = FakeGateway::new(vec![chan(1, "Lobby", 1), chan(2, "Extra", 0)]);
        let pool = pool_with(&gateway, test_config());

        gateway.leave(id(1));
        pool.handle_leave(id(1)).await;

        assert_eq!(gateway.deletes.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.creates.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.names(), vec!["Extra".to_string()]);
    }

    #[tokio::test]
    async fn the_last_empty_channel_is_never_deleted() {
        let gateway = FakeGateway::new(vec![chan(1, "Lobby", 1)]);
        let pool = pool_with(&gateway, test_config());

        gateway.leave(id(1));
        pool.handle_leave(id(1)).await;

        assert_eq!(gateway.deletes.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.names(), vec!["Lobby".to_string()]);
    }

    #[tokio::test]
    async fn concurrent_leaves_keep_a_single_empty_channel() {
        let gateway = FakeGateway::new(vec![chan(1, "Lobby", 1), chan(2, "Study Room", 1)]);
        let pool = pool_with(&gateway, test_config());

        gateway.leave(id(1));
        gateway.leave(id(2));

        tokio::join!(pool.handle_leave(id(1)), pool.handle_leave(id(2)));

        assert_eq!(gateway.empty_count(), 1);
        assert_eq!(gateway.deletes.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn events_for_unmanaged_channels_are_ignored() {
        let gateway = FakeGateway::new(vec![chan(1, "Lobby", 2)]);
        let pool = pool_with(&gateway, test_config());

        // Channel 99 is outside the managed category; nothing may happen,
        // even though the category currently has no empty channel.
        pool.handle_join(id(99)).await;
        pool.handle_leave(id(99)).await;

        assert_eq!(gateway.creates.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.deletes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reconcile_continues_past_a_failed_delete() {
        let gateway = FakeGateway::new(vec![
            chan(1, "Lobby", 0),
            chan(2, "Study Room", 0),
            chan(3, "Lecture Hall", 0),
        ]);
        gateway.fail_delete.lock().unwrap().insert(id(2));
        let pool = pool_with(&gateway, test_config());

        pool.reconcile().await;

        // The failing channel survives, the other doomed one still went.
        let names = gateway.names();
        assert!(names.contains(&"Study Room".to_string()));
        assert!(!names.contains(&"Lecture Hall".to_string()));
        assert_eq!(gateway.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bots_do_not_count_toward_occupancy_when_ignored() {
        let mut lounge = chan(1, "Lobby", 0);
        lounge.bots = 1;
        let gateway = FakeGateway::new(vec![lounge.clone()]);
        let pool = pool_with(&gateway, test_config());

        // The channel only holds a bot, so it still counts as empty.
        pool.reconcile().await;
        assert_eq!(gateway.creates.load(Ordering::SeqCst), 0);

        // With `ignore_bots` off the same channel counts as occupied.
        let gateway = FakeGateway::new(vec![lounge]);
        let config = VoiceConfig {
            ignore_bots: false,
            ..test_config()
        };
        let pool = pool_with(&gateway, config);
        pool.reconcile().await;
        assert_eq!(gateway.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invariant_holds_across_an_event_sequence() {
        let gateway = FakeGateway::new(vec![chan(1, "Lobby", 0)]);
        let pool = pool_with(&gateway, test_config());

        // A member joins the empty Lobby; a replacement appears.
        gateway.join(id(1));
        pool.handle_join(id(1)).await;
        assert_eq!(gateway.empty_count(), 1);

        // The replacement fills up too.
        let replacement = gateway
            .channels
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.humans == 0)
            .unwrap()
            .id;
        gateway.join(replacement);
        pool.handle_join(replacement).await;
        assert_eq!(gateway.empty_count(), 1);

        // Everyone drains back out of Lobby.
        gateway.leave(id(1));
        pool.handle_leave(id(1)).await;
        assert_eq!(gateway.empty_count(), 1);

        // And out of the replacement; the pool is back to one channel.
        gateway.leave(replacement);
        pool.handle_leave(replacement).await;
        assert_eq!(gateway.empty_count(), 1);
        assert!(!gateway.names().is_empty());
    }

    #[tokio::test]
    async fn limit_and_rename_reject_unmanaged_channels() {
        let gateway = FakeGateway::new(vec![chan(1, "Lobby", 1)]);
        let pool = pool_with(&gateway, test_config());

        assert!(matches!(
            pool.set_limit(id(99), 5).await,
            Err(VoiceError::UnmanagedCategory)
        ));
        assert!(matches!(
            pool.rename(id(99), "Hideout").await,
            Err(VoiceError::UnmanagedCategory)
        ));
    }

    #[tokio::test]
    async fn throttled_renames_surface_as_rate_limit_errors() {
        let gateway = Arc::new(FakeGateway {
            channels: StdMutex::new(vec![chan(1, "Lobby", 1)]),
            next_id: AtomicU64::new(100),
            creates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            fail_delete: StdMutex::new(HashSet::new()),
            rate_limit_renames: true,
        });
        let pool = pool_with(&gateway, test_config());

        assert!(matches!(
            pool.rename(id(1), "Hideout").await,
            Err(VoiceError::RateLimitExceeded)
        ));
    }

    #[tokio::test]
    async fn set_limit_succeeds_on_managed_channels() {
        let gateway = FakeGateway::new(vec![chan(1, "Lobby", 1)]);
        let pool = pool_with(&gateway, test_config());

        assert!(pool.set_limit(id(1), 10).await.is_ok());
    }
}
