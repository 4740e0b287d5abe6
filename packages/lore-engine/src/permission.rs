use std::{
	sync::{Arc, Mutex},
	time::{Duration, Instant},
};

use ahash::{AHashMap, AHashSet};
use tokio::{sync::Semaphore, task::JoinSet};
use uuid::Uuid;

use lore_config::{AuthzProviderConfig, Permissions};

use crate::{AuthorizationProvider, fusion::FusedCandidate};

#[derive(Debug, Clone, Copy)]
struct Decision {
	allowed: bool,
	decided_at: Instant,
}

/// Per-identity, per-passage access decisions with a short-lived cache.
///
/// Fail-closed: an authorization error or timeout resolves to denial for
/// that pair, never to access. A cached decision older than its TTL is
/// treated as absent, never as a stale truth. Cache misses are resolved
/// concurrently, bounded by a semaphore so a cache-cold burst cannot
/// overwhelm the authorization backend; no lock is held across a call.
pub struct PermissionFilter {
	provider: Arc<dyn AuthorizationProvider>,
	provider_cfg: Arc<AuthzProviderConfig>,
	ttl: Duration,
	checks: Arc<Semaphore>,
	cache: Mutex<AHashMap<String, AHashMap<Uuid, Decision>>>,
}

impl PermissionFilter {
	pub fn new(
		provider: Arc<dyn AuthorizationProvider>,
		provider_cfg: AuthzProviderConfig,
		cfg: &Permissions,
	) -> Self {
		Self {
			provider,
			provider_cfg: Arc::new(provider_cfg),
			ttl: Duration::from_secs(cfg.ttl_secs),
			checks: Arc::new(Semaphore::new(cfg.max_concurrent_checks as usize)),
			cache: Mutex::new(AHashMap::new()),
		}
	}

	/// Drops candidates the identity may not read, preserving the relative
	/// order of the survivors. A denied passage is removed, never reordered
	/// or flagged.
	pub async fn filter(
		&self,
		identity: &str,
		candidates: Vec<FusedCandidate>,
	) -> Vec<FusedCandidate> {
		if candidates.is_empty() {
			return candidates;
		}

		let mut decisions: AHashMap<Uuid, bool> = AHashMap::with_capacity(candidates.len());
		let mut pending: AHashSet<Uuid> = AHashSet::new();

		{
			let now = Instant::now();
			let cache = self.cache.lock().unwrap_or_else(|err| err.into_inner());
			let known = cache.get(identity);

			for candidate in &candidates {
				let id = candidate.passage_id;

				if decisions.contains_key(&id) || pending.contains(&id) {
					continue;
				}
				match known.and_then(|entries| entries.get(&id)) {
					Some(decision) if now.duration_since(decision.decided_at) < self.ttl => {
						decisions.insert(id, decision.allowed);
					},
					_ => {
						pending.insert(id);
					},
				}
			}
		}

		tracing::debug!(
			cached = decisions.len(),
			misses = pending.len(),
			"Permission cache consulted."
		);

		if !pending.is_empty() {
			let mut checks = JoinSet::new();

			for passage_id in pending {
				let provider = self.provider.clone();
				let provider_cfg = self.provider_cfg.clone();
				let permits = self.checks.clone();
				let identity = identity.to_string();

				checks.spawn(async move {
					let Ok(_permit) = permits.acquire_owned().await else {
						return (passage_id, false);
					};
					let allowed =
						match provider.can_access(&provider_cfg, &identity, passage_id).await {
							Ok(allowed) => allowed,
							Err(err) => {
								tracing::warn!(
									error = %err,
									passage_id = %passage_id,
									"Authorization check failed; denying access."
								);

								false
							},
						};

					(passage_id, allowed)
				});
			}

			let mut resolved = Vec::new();

			while let Some(joined) = checks.join_next().await {
				match joined {
					Ok((passage_id, allowed)) => resolved.push((passage_id, allowed)),
					Err(err) => {
						tracing::warn!(error = %err, "Authorization check task failed.");
					},
				}
			}

			let decided_at = Instant::now();
			let mut cache = self.cache.lock().unwrap_or_else(|err| err.into_inner());
			let known = cache.entry(identity.to_string()).or_default();

			for (passage_id, allowed) in resolved {
				known.insert(passage_id, Decision { allowed, decided_at });
				decisions.insert(passage_id, allowed);
			}
		}

		// Anything unresolved (e.g. a panicked check task) stays denied.
		candidates
			.into_iter()
			.filter(|candidate| {
				decisions.get(&candidate.passage_id).copied().unwrap_or(false)
			})
			.collect()
	}

	/// Removes every cached decision for the identity in one critical
	/// section, so a permission change cannot be outlived by stale grants
	/// or denials. Returns the number of entries dropped.
	pub fn invalidate(&self, identity: &str) -> usize {
		let mut cache = self.cache.lock().unwrap_or_else(|err| err.into_inner());
		let dropped = cache.remove(identity).map(|entries| entries.len()).unwrap_or(0);

		tracing::info!(identity, dropped, "Permission cache invalidated.");

		dropped
	}
}
