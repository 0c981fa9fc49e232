use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use config::Config;

use crate::memo::Memo;
use crate::selector::select_gas_fee;
use crate::source::GasFeeSource;
use crate::state::EstimateState;
use crate::types::{GasFeeResponse, GasSpeed, TransactionGasFeeInfo, TransactionRequest};

/// Low-fee chains produce blocks faster, so their quotes go stale sooner.
pub fn polling_interval(config: &Config, chain_id: Option<u64>) -> Duration {
    let is_l2 = chain_id
        .and_then(|chain_id| u32::try_from(chain_id).ok())
        .map(|chain_id| config.is_l2_chain(chain_id))
        .unwrap_or(false);

    if is_l2 {
        config.polling.l2_interval()
    } else {
        config.polling.default_interval()
    }
}

/// Fee schedule for one transaction descriptor.
///
/// An absent descriptor skips the request entirely. The schedule is fetched
/// only by `refresh`; projecting it for a speed never touches the network.
#[derive(Debug)]
pub struct GasFeeQuery<Source> {
    source: Arc<Source>,
    request: Option<TransactionRequest>,
    response: EstimateState<GasFeeResponse>,
    version: u64,
    projection: Memo<(u64, GasSpeed), Option<TransactionGasFeeInfo>>,
}

impl<Source: GasFeeSource> GasFeeQuery<Source> {
    pub fn new(source: Arc<Source>, request: Option<TransactionRequest>) -> Self {
        GasFeeQuery {
            source,
            request,
            response: EstimateState::Idle,
            version: 0,
            projection: Memo::new(),
        }
    }

    pub fn state(&self) -> &EstimateState<GasFeeResponse> {
        &self.response
    }

    pub fn set_request(&mut self, request: Option<TransactionRequest>) {
        if self.request == request {
            return;
        }

        debug!("Gas fee query input changed to {:?}", request);
        self.request = request;
        self.set_response(EstimateState::Idle);
    }

    pub async fn refresh(&mut self) -> &EstimateState<GasFeeResponse> {
        let Some(request) = self.request.clone() else {
            self.set_response(EstimateState::Unavailable);
            return &self.response;
        };

        if self.response.resolved().is_none() {
            self.set_response(EstimateState::Loading);
        }

        match self.source.fetch_gas_fee(&request).await {
            Ok(response) => self.set_response(EstimateState::Resolved(response)),
            Err(err) => {
                warn!("Gas fee request failed for {:?}: {}", request, err);
                self.set_response(EstimateState::Unavailable);
            }
        }

        &self.response
    }

    pub fn fee_info(&mut self, speed: GasSpeed) -> Option<TransactionGasFeeInfo> {
        let response = self.response.resolved();
        self.projection
            .get_or_compute((self.version, speed), |(_, speed)| select_gas_fee(response, *speed))
    }

    fn set_response(&mut self, response: EstimateState<GasFeeResponse>) {
        if self.response != response {
            self.version += 1;
            self.projection.invalidate();
        }
        self.response = response;
    }
}

/// Keeps a gas fee query fresh on a fixed interval until dropped.
#[derive(Debug)]
pub struct GasFeePoller {
    handle: Option<JoinHandle<()>>,
    receiver: watch::Receiver<EstimateState<GasFeeResponse>>,
}

impl GasFeePoller {
    pub fn spawn<Source: GasFeeSource + 'static>(
        source: Arc<Source>,
        request: Option<TransactionRequest>,
        interval: Duration,
    ) -> Self {
        let Some(request) = request else {
            debug!("Gas fee request skipped, not polling");
            let (_, receiver) = watch::channel(EstimateState::Unavailable);
            return GasFeePoller { handle: None, receiver };
        };

        info!("Polling gas fee every {}ms for {:?}", interval.as_millis(), request);

        let (sender, receiver) = watch::channel(EstimateState::Idle);
        let handle = tokio::spawn(async move {
            let mut query = GasFeeQuery::new(source, Some(request));
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                if query.state().resolved().is_none() {
                    sender.send_replace(EstimateState::Loading);
                }
                let state = query.refresh().await.clone();

                if sender.send(state).is_err() {
                    debug!("All gas fee subscribers gone, stopping poller");
                    break;
                }
            }
        });

        GasFeePoller { handle: Some(handle), receiver }
    }

    pub fn state(&self) -> EstimateState<GasFeeResponse> {
        self.receiver.borrow().clone()
    }

    /// Projects the latest schedule; never issues a request.
    pub fn fee_info(&self, speed: GasSpeed) -> Option<TransactionGasFeeInfo> {
        select_gas_fee(self.receiver.borrow().resolved(), speed)
    }

    /// Waits for the next published state, `None` once polling has stopped.
    pub async fn changed(&mut self) -> Option<EstimateState<GasFeeResponse>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for GasFeePoller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use alloy::primitives::U256;

    use config::get_sample_config;

    use crate::selector::tests::{eip1559_response, legacy_response};
    use crate::state::EstimateState;
    use crate::tests::{CountingSource, MockGasSource};
    use crate::types::{GasParams, GasSpeed, TransactionRequest};

    use super::*;

    fn request(chain_id: u64) -> TransactionRequest {
        TransactionRequest::default().with_chain_id(chain_id)
    }

    #[test]
    fn test_polling_interval_by_chain() {
        let config = get_sample_config();

        assert_eq!(polling_interval(&config, Some(42161)), Duration::from_secs(3));
        assert_eq!(polling_interval(&config, Some(10)), Duration::from_secs(3));
        assert_eq!(polling_interval(&config, Some(1)), Duration::from_secs(12));
        assert_eq!(polling_interval(&config, Some(137)), Duration::from_secs(12));
        assert_eq!(polling_interval(&config, Some(999_999)), Duration::from_secs(12));
        assert_eq!(polling_interval(&config, Some(u64::MAX)), Duration::from_secs(12));
        assert_eq!(polling_interval(&config, None), Duration::from_secs(12));
    }

    #[tokio::test]
    async fn test_skipped_query_never_fetches() {
        let mut source = MockGasSource::new();
        source.expect_fetch_gas_fee().times(0);

        let mut query = GasFeeQuery::new(Arc::new(source), None);

        assert_eq!(query.refresh().await, &EstimateState::Unavailable);
        assert_eq!(query.fee_info(GasSpeed::Urgent), None);
    }

    #[tokio::test]
    async fn test_changing_speed_does_not_refetch() {
        let mut source = MockGasSource::new();
        source.expect_fetch_gas_fee().times(1).returning(|_| Ok(eip1559_response()));

        let mut query = GasFeeQuery::new(Arc::new(source), Some(request(1)));
        assert_eq!(query.fee_info(GasSpeed::Urgent), None);

        query.refresh().await;

        let urgent = query.fee_info(GasSpeed::Urgent).unwrap();
        let normal = query.fee_info(GasSpeed::Normal).unwrap();
        let urgent_again = query.fee_info(GasSpeed::Urgent).unwrap();

        assert_eq!(urgent, urgent_again);
        assert_eq!(normal.speed, GasSpeed::Normal);
        assert_eq!(
            normal.params,
            GasParams::Eip1559 {
                max_priority_fee_per_gas: U256::from(1_000_000_000u64),
                max_fee_per_gas: U256::from(30_000_000_000u64),
                gas_limit: U256::from(46000),
            }
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_is_unavailable() {
        let source = Arc::new(CountingSource::failing());
        let mut query = GasFeeQuery::new(source.clone(), Some(request(1)));

        assert_eq!(query.refresh().await, &EstimateState::Unavailable);
        assert_eq!(query.fee_info(GasSpeed::Fast), None);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_new_request_resets_the_schedule() {
        let source = Arc::new(CountingSource::new(legacy_response()));
        let mut query = GasFeeQuery::new(source.clone(), Some(request(1)));

        query.refresh().await;
        assert!(query.fee_info(GasSpeed::Fast).is_some());

        query.set_request(Some(request(1)));
        assert!(query.fee_info(GasSpeed::Fast).is_some());

        query.set_request(Some(request(137)));
        assert_eq!(query.state(), &EstimateState::Idle);
        assert_eq!(query.fee_info(GasSpeed::Fast), None);

        query.refresh().await;
        assert!(query.fee_info(GasSpeed::Fast).is_some());
        assert_eq!(source.calls(), 2);
        assert_eq!(source.last_request().unwrap().chain_id, Some(137));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_refreshes_until_dropped() {
        let source = Arc::new(CountingSource::new(eip1559_response()));
        let mut poller =
            GasFeePoller::spawn(source.clone(), Some(request(1)), Duration::from_secs(1));

        let state = poller.changed().await.unwrap();
        let state =
            if state == EstimateState::Loading { poller.changed().await.unwrap() } else { state };
        assert_eq!(state, EstimateState::Resolved(eip1559_response()));
        assert_eq!(
            poller.fee_info(GasSpeed::Urgent).unwrap().gas_fee,
            U256::from(1_840_000_000_000_000u64)
        );

        tokio::time::sleep(Duration::from_millis(3500)).await;
        let polled = source.calls();
        assert!(polled >= 3, "expected at least 3 polls, got {polled}");

        drop(poller);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(source.calls(), polled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skipped_poller_never_fetches() {
        let source = Arc::new(CountingSource::new(eip1559_response()));
        let poller = GasFeePoller::spawn(source.clone(), None, Duration::from_secs(1));

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(poller.state(), EstimateState::Unavailable);
        assert_eq!(poller.fee_info(GasSpeed::Urgent), None);
        assert_eq!(source.calls(), 0);
    }
}
