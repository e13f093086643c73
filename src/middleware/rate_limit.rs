use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    DefaultKeyedRateLimiter, Quota, RateLimiter,
    clock::{Clock, DefaultClock},
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::BridgeError;

/// Fixed-budget limiter keyed by client IP.
#[derive(Clone)]
pub struct ApiRateLimiter {
    limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
    clock: DefaultClock,
}

impl ApiRateLimiter {
    /// `max` requests per `window`, replenished evenly across the window.
    pub fn new(max: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(max.max(1)).unwrap_or(NonZeroU32::MIN);
        let period = window
            .checked_div(burst.get())
            .filter(|p| !p.is_zero())
            .unwrap_or(Duration::from_millis(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
            clock: DefaultClock::default(),
        }
    }

    /// `Err` carries the time until the next request would be allowed.
    pub fn check(&self, key: IpAddr) -> Result<(), Duration> {
        self.limiter
            .check_key(&key)
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Clients currently holding limiter state.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    /// Drops state for clients whose budget has fully refilled.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Prunes every `every` until `stop` flips to `true`.
    pub fn spawn_pruner(&self, every: Duration, mut stop: watch::Receiver<bool>) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        limiter.prune();
                        debug!(clients = limiter.tracked_clients(), "rate limiter pruned");
                    }
                    _ = stop.wait_for(|stopping| *stopping) => break,
                }
            }
        })
    }
}

pub async fn rate_limit(
    State(limiter): State<ApiRateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if let Err(wait) = limiter.check(ip) {
        warn!(client = %ip, "rate limit exceeded");
        return BridgeError::RateLimited {
            retry_after_secs: wait.as_secs().max(1),
        }
        .into_response();
    }

    next.run(req).await
}
