//! Single-writer ledger service
//!
//! The ledger is owned by one tokio task. Callers hold a cloneable
//! [`LedgerHandle`] and send requests over a channel; the task applies them
//! one at a time, so each operation is fully committed or fully rejected
//! before the next one is looked at. Committed events are re-published on a
//! broadcast channel for observers.

use crate::token::{
    EventRecord, Ledger, LedgerError, Operation, Query, QueryResult, Receipt, SpenderRegistry,
};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

/// Service errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Ledger service has shut down")]
    Closed,
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Pending requests before senders wait
    pub queue_capacity: usize,
    /// Events buffered per subscriber before it lags
    pub event_buffer: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            event_buffer: 100,
        }
    }
}

enum Request {
    Submit {
        operation: Operation,
        reply: oneshot::Sender<Result<Receipt, LedgerError>>,
    },
    Query {
        query: Query,
        reply: oneshot::Sender<QueryResult>,
    },
    Events {
        since: u64,
        reply: oneshot::Sender<Vec<EventRecord>>,
    },
}

/// The task that owns the ledger
pub struct LedgerService {
    ledger: Ledger,
    spenders: Box<dyn SpenderRegistry>,
    requests: mpsc::Receiver<Request>,
    events: broadcast::Sender<EventRecord>,
}

impl LedgerService {
    /// Spawn the service on the current tokio runtime.
    ///
    /// The task ends once every handle has been dropped and yields the final
    /// ledger.
    pub fn spawn(
        ledger: Ledger,
        spenders: impl SpenderRegistry + 'static,
        config: ServiceConfig,
    ) -> (LedgerHandle, JoinHandle<Ledger>) {
        let (request_tx, request_rx) = mpsc::channel(config.queue_capacity);
        let (event_tx, _) = broadcast::channel(config.event_buffer);

        let service = LedgerService {
            ledger,
            spenders: Box::new(spenders),
            requests: request_rx,
            events: event_tx.clone(),
        };

        let handle = LedgerHandle {
            requests: request_tx,
            events: event_tx,
        };

        log::info!("Ledger service started for {}", service.ledger.address());
        (handle, tokio::spawn(service.run()))
    }

    async fn run(mut self) -> Ledger {
        while let Some(request) = self.requests.recv().await {
            self.handle(request);
        }

        log::info!(
            "Ledger service stopped after {} events",
            self.ledger.events().len()
        );
        self.ledger
    }

    fn handle(&mut self, request: Request) {
        match request {
            Request::Submit { operation, reply } => {
                let result = operation.apply(&mut self.ledger, self.spenders.as_mut());
                if let Ok(receipt) = &result {
                    for record in &receipt.events {
                        // Ignore send errors (no subscribers)
                        let _ = self.events.send(record.clone());
                    }
                }
                let _ = reply.send(result);
            }
            Request::Query { query, reply } => {
                let _ = reply.send(query.evaluate(&self.ledger));
            }
            Request::Events { since, reply } => {
                let _ = reply.send(self.ledger.events().since(since).to_vec());
            }
        }
    }
}

/// Cloneable access to a running [`LedgerService`]
#[derive(Clone)]
pub struct LedgerHandle {
    requests: mpsc::Sender<Request>,
    events: broadcast::Sender<EventRecord>,
}

impl LedgerHandle {
    /// Submit a state-changing operation and wait for its outcome
    pub async fn submit(&self, operation: Operation) -> Result<Receipt, ServiceError> {
        let (reply, response) = oneshot::channel();
        self.send(Request::Submit { operation, reply }).await?;
        Ok(response.await.map_err(|_| ServiceError::Closed)??)
    }

    /// Evaluate a read-only query
    pub async fn query(&self, query: Query) -> Result<QueryResult, ServiceError> {
        let (reply, response) = oneshot::channel();
        self.send(Request::Query { query, reply }).await?;
        response.await.map_err(|_| ServiceError::Closed)
    }

    /// Committed events at or after `cursor`
    pub async fn events_since(&self, cursor: u64) -> Result<Vec<EventRecord>, ServiceError> {
        let (reply, response) = oneshot::channel();
        self.send(Request::Events {
            since: cursor,
            reply,
        })
        .await?;
        response.await.map_err(|_| ServiceError::Closed)
    }

    /// Receive events as they are committed
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }

    async fn send(&self, request: Request) -> Result<(), ServiceError> {
        self.requests
            .send(request)
            .await
            .map_err(|_| ServiceError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{LedgerEvent, NoContracts};
    use alloy_primitives::{Address, U256};

    fn addr(n: u8) -> Address {
        Address::with_last_byte(n)
    }

    fn spawn_test_service() -> (LedgerHandle, JoinHandle<Ledger>) {
        let ledger = Ledger::with_supply(U256::from(1_000_000u64), addr(1)).unwrap();
        LedgerService::spawn(ledger, NoContracts, ServiceConfig::default())
    }

    #[tokio::test]
    async fn test_submit_and_query() {
        let (handle, task) = spawn_test_service();

        let receipt = handle
            .submit(Operation::Transfer {
                caller: addr(1),
                to: addr(2),
                amount: U256::from(100u64),
            })
            .await
            .unwrap();
        assert_eq!(receipt.events.len(), 1);

        let balance = handle
            .query(Query::BalanceOf { account: addr(2) })
            .await
            .unwrap();
        assert_eq!(balance, QueryResult::Amount(U256::from(100u64)));

        drop(handle);
        let ledger = task.await.unwrap();
        assert_eq!(ledger.balance_of(&addr(1)), U256::from(999_900u64));
    }

    #[tokio::test]
    async fn test_rejection_reported() {
        let (handle, _task) = spawn_test_service();

        let result = handle
            .submit(Operation::Burn {
                caller: addr(2),
                amount: U256::from(1u64),
            })
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::Ledger(LedgerError::InsufficientBalance { .. }))
        ));
        assert!(handle.events_since(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_committed_events() {
        let (handle, _task) = spawn_test_service();
        let mut events = handle.subscribe();

        handle
            .submit(Operation::Burn {
                caller: addr(1),
                amount: U256::from(10u64),
            })
            .await
            .unwrap();

        let record = events.recv().await.unwrap();
        assert_eq!(record.sequence, 0);
        assert_eq!(
            record.event,
            LedgerEvent::Burn {
                from: addr(1),
                value: U256::from(10u64),
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_submitters_conserve_supply() {
        let (handle, task) = spawn_test_service();

        // Seed ten accounts
        for n in 10..20u8 {
            handle
                .submit(Operation::Transfer {
                    caller: addr(1),
                    to: addr(n),
                    amount: U256::from(1_000u64),
                })
                .await
                .unwrap();
        }

        let mut workers = Vec::new();
        for n in 10..20u8 {
            let handle = handle.clone();
            workers.push(tokio::spawn(async move {
                for i in 0..50u64 {
                    let to = addr(10 + ((n + 1) % 10));
                    let _ = handle
                        .submit(Operation::Transfer {
                            caller: addr(n),
                            to,
                            amount: U256::from(i % 70),
                        })
                        .await;
                    if i % 10 == 0 {
                        let _ = handle
                            .submit(Operation::Burn {
                                caller: addr(n),
                                amount: U256::from(1u64),
                            })
                            .await;
                    }
                }
            }));
        }
        for worker in workers {
            worker.await.unwrap();
        }

        let resumed = handle.events_since(5).await.unwrap();
        assert_eq!(resumed[0].sequence, 5);

        drop(handle);
        let ledger = task.await.unwrap();
        assert!(ledger.check_invariants().is_ok());
        assert!(ledger.replay_matches().unwrap());
        assert!(ledger.total_supply() < U256::from(1_000_000u64));
    }

    #[tokio::test]
    async fn test_closed_service() {
        let (handle, task) = spawn_test_service();
        task.abort();
        let _ = task.await;

        assert_eq!(
            handle.query(Query::TotalSupply).await,
            Err(ServiceError::Closed)
        );
    }
}
