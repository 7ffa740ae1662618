//! Sync Positions Use Case
//!
//! Read path over a live session: fetch the net and day position books,
//! drop closed positions, and report per-book P&L totals.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::application::ports::{BrokerAuth, BrokerError, BrokerPort, CredentialStore, PortalUser};
use crate::domain::link_state::LinkState;
use crate::domain::position::PositionBook;
use crate::error::ServiceError;
use crate::observability::metrics;

/// Filtered position books plus display totals.
#[derive(Debug, Clone)]
pub struct PositionReport {
    /// Net and day books, open positions only.
    pub positions: PositionBook,
    /// Summed P&L across the returned net book.
    pub total_net: Decimal,
    /// Summed P&L across the returned day book.
    pub total_day: Decimal,
}

/// Use case for listing positions through a live session.
pub struct SyncPositions<S, B>
where
    S: CredentialStore,
    B: BrokerPort,
{
    store: Arc<S>,
    broker: Arc<B>,
}

impl<S, B> SyncPositions<S, B>
where
    S: CredentialStore,
    B: BrokerPort,
{
    /// Create a new `SyncPositions` use case.
    pub const fn new(store: Arc<S>, broker: Arc<B>) -> Self {
        Self { store, broker }
    }

    /// Fetch the position books. Read-only portal sessions may call this;
    /// the only store write it can ever make is the teardown forced by a
    /// rejected token.
    pub async fn execute(&self, user: &PortalUser) -> Result<PositionReport, ServiceError> {
        let record = self.store.get(&user.user_id).await?;
        let from = record.state();

        if !record.has_credentials() {
            return Err(ServiceError::not_configured());
        }
        // No broker call is attempted without a token.
        let (Some(api_key), Some(access_token)) =
            (record.api_key.as_deref(), record.access_token.as_deref())
        else {
            return Err(ServiceError::not_authorized());
        };
        let auth = BrokerAuth::new(api_key, access_token);

        let book = match self.broker.fetch_positions(&auth).await {
            Ok(book) => book,
            Err(BrokerError::Unauthorized) => {
                if let Err(clear_err) = self.store.clear(&user.user_id).await {
                    tracing::error!(user_id = %user.user_id, error = %clear_err, "failed to tear down rejected session");
                    return Err(ServiceError::from(clear_err));
                }
                metrics::record_link_transition(from, LinkState::Disconnected);
                tracing::warn!(user_id = %user.user_id, "broker rejected stored session; link disconnected");
                return Err(ServiceError::from(BrokerError::Unauthorized));
            }
            Err(e) => return Err(ServiceError::from(e)),
        };

        // Closed positions are dropped before totals, so the totals always
        // match the rows the client renders.
        let positions = book.open_only();
        let total_net = positions.total_net_pnl();
        let total_day = positions.total_day_pnl();

        Ok(PositionReport {
            positions,
            total_net,
            total_day,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::BrokerSession;
    use crate::domain::credential::{CredentialPatch, UserId};
    use crate::domain::position::{BrokerProfile, MarginSummary, Position};
    use crate::error::ErrorCode;
    use crate::infrastructure::persistence::InMemoryCredentialStore;
    use crate::infrastructure::sealing::SecretCodec;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct PositionsBroker {
        book: Result<PositionBook, BrokerError>,
        calls: AtomicUsize,
    }

    impl PositionsBroker {
        fn with_book(book: PositionBook) -> Self {
            Self {
                book: Ok(book),
                calls: AtomicUsize::new(0),
            }
        }

        fn rejecting() -> Self {
            Self {
                book: Err(BrokerError::Unauthorized),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BrokerPort for PositionsBroker {
        fn authorization_url(&self, api_key: &str, _redirect_uri: &str) -> String {
            format!("https://broker.test/login?api_key={api_key}")
        }

        async fn exchange_request_token(
            &self,
            _api_key: &str,
            _api_secret: &str,
            _request_token: &str,
        ) -> Result<BrokerSession, BrokerError> {
            Err(BrokerError::Protocol {
                message: "not used".to_string(),
            })
        }

        async fn fetch_profile(&self, _auth: &BrokerAuth) -> Result<BrokerProfile, BrokerError> {
            Err(BrokerError::Protocol {
                message: "not used".to_string(),
            })
        }

        async fn fetch_margins(&self, _auth: &BrokerAuth) -> Result<MarginSummary, BrokerError> {
            Err(BrokerError::Protocol {
                message: "not used".to_string(),
            })
        }

        async fn fetch_positions(&self, _auth: &BrokerAuth) -> Result<PositionBook, BrokerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.book.clone()
        }
    }

    fn position(symbol: &str, quantity: i64, pnl: Decimal) -> Position {
        Position {
            symbol: symbol.to_string(),
            exchange: "NSE".to_string(),
            quantity,
            average_price: dec!(100),
            last_price: dec!(101),
            pnl,
            realised: Decimal::ZERO,
            unrealised: pnl,
        }
    }

    async fn authorized_store(user_id: &UserId) -> Arc<InMemoryCredentialStore> {
        let store = Arc::new(InMemoryCredentialStore::new(SecretCodec::ephemeral().unwrap()));
        store.enroll(user_id).await.unwrap();
        store
            .set(user_id, CredentialPatch::configure("K1", "S1"))
            .await
            .unwrap();
        store
            .set(user_id, CredentialPatch::authorized("T1", Utc::now()))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn closed_positions_are_filtered_and_totals_match() {
        let user = PortalUser::full(UserId::new("u-1"));
        let store = authorized_store(&user.user_id).await;
        let broker = Arc::new(PositionsBroker::with_book(PositionBook {
            net: vec![
                position("INFY", 10, dec!(25.50)),
                position("TCS", 0, dec!(99.00)),
                position("SBIN", -5, dec!(-4.25)),
            ],
            day: vec![position("INFY", 10, dec!(12.00)), position("TCS", 0, dec!(1.00))],
        }));

        let use_case = SyncPositions::new(store, broker);
        let report = use_case.execute(&user).await.unwrap();

        assert_eq!(report.positions.net.len(), 2);
        assert_eq!(report.positions.day.len(), 1);
        assert!(report.positions.net.iter().all(|p| p.quantity != 0));
        assert_eq!(report.total_net, dec!(21.25));
        assert_eq!(report.total_day, dec!(12.00));
    }

    #[tokio::test]
    async fn missing_token_means_no_broker_call() {
        let user = PortalUser::full(UserId::new("u-1"));
        let store = Arc::new(InMemoryCredentialStore::new(SecretCodec::ephemeral().unwrap()));
        store.enroll(&user.user_id).await.unwrap();
        store
            .set(&user.user_id, CredentialPatch::configure("K1", "S1"))
            .await
            .unwrap();
        let broker = Arc::new(PositionsBroker::with_book(PositionBook::default()));

        let use_case = SyncPositions::new(store, broker.clone());
        let err = use_case.execute(&user).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::NotAuthorized);
        assert!(err.code().needs_auth());
        assert_eq!(broker.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_token_downgrades_the_link() {
        let user = PortalUser::full(UserId::new("u-1"));
        let store = authorized_store(&user.user_id).await;
        let use_case = SyncPositions::new(store.clone(), Arc::new(PositionsBroker::rejecting()));

        let err = use_case.execute(&user).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BrokerUnauthorized);

        let record = store.get(&user.user_id).await.unwrap();
        assert_eq!(record.state(), LinkState::Unconfigured);
        assert!(!record.is_connected);
    }

    #[tokio::test]
    async fn read_only_scope_may_list_positions() {
        let user = PortalUser::read_only(UserId::new("u-1"));
        let store = authorized_store(&user.user_id).await;
        let broker = Arc::new(PositionsBroker::with_book(PositionBook {
            net: vec![position("INFY", 10, dec!(25.50))],
            day: vec![],
        }));

        let use_case = SyncPositions::new(store, broker);
        let report = use_case.execute(&user).await.unwrap();

        assert_eq!(report.positions.net.len(), 1);
        assert_eq!(report.total_day, Decimal::ZERO);
    }
}
