//! The external ledger that stores the current root.
//!
//! A ledger call either confirms the root or fails with a publication error.
//! The publisher layers timeouts and retries on top; implementations make a
//! single attempt per call.

use std::{future::Future, pin::Pin, sync::Arc};

use rootsync_core::Root;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Boxed future returned by ledger calls.
pub type LedgerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Acknowledgement that the ledger now holds a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfirmation {
    /// Root the ledger stored.
    pub root: Root,
    /// Ledger-side identifier for the write (transaction hash).
    pub confirmation_id: String,
}

/// Single-attempt root storage on an external ledger.
pub trait Ledger: Send + Sync + 'static {
    /// Sets the ledger's current root.
    ///
    /// Setting the same root twice must be harmless.
    fn set_root(&self, root: Root) -> LedgerFuture<'_, LedgerConfirmation>;
}

impl<L: Ledger + ?Sized> Ledger for Arc<L> {
    fn set_root(&self, root: Root) -> LedgerFuture<'_, LedgerConfirmation> {
        (**self).set_root(root)
    }
}

pub mod mock {
    //! Scriptable ledger for tests.

    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use rootsync_core::Root;

    use super::{Ledger, LedgerConfirmation, LedgerFuture};
    use crate::error::{PublishError, Result};

    /// Outcome of one mocked ledger call.
    #[derive(Debug, Clone)]
    pub enum MockOutcome {
        /// Confirm the root.
        Confirm,
        /// Fail with the given error.
        Fail(PublishError),
        /// Never answer.
        Hang,
    }

    #[derive(Debug)]
    struct State {
        script: VecDeque<MockOutcome>,
        fallback: MockOutcome,
        calls: Vec<Root>,
        confirmed: Option<Root>,
        delay: Option<Duration>,
    }

    /// In-memory ledger with scripted outcomes.
    ///
    /// Each call pops the next scripted outcome, falling back to the default
    /// outcome once the script is exhausted. Every call is recorded.
    /// Cloning shares state.
    #[derive(Debug, Clone)]
    pub struct MockLedger {
        state: Arc<Mutex<State>>,
    }

    impl Default for MockLedger {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockLedger {
        /// Creates a ledger that confirms every call.
        pub fn new() -> Self {
            Self::with_fallback(MockOutcome::Confirm)
        }

        /// Creates a ledger that answers every unscripted call with `fallback`.
        pub fn with_fallback(fallback: MockOutcome) -> Self {
            Self {
                state: Arc::new(Mutex::new(State {
                    script: VecDeque::new(),
                    fallback,
                    calls: Vec::new(),
                    confirmed: None,
                    delay: None,
                })),
            }
        }

        /// Queues outcomes for the next calls, in order.
        pub fn script(&self, outcomes: impl IntoIterator<Item = MockOutcome>) {
            self.with_state(|state| state.script.extend(outcomes));
        }

        /// Replaces the outcome for unscripted calls.
        pub fn set_fallback(&self, fallback: MockOutcome) {
            self.with_state(|state| state.fallback = fallback);
        }

        /// Delays every call by `delay` before answering.
        pub fn set_delay(&self, delay: Duration) {
            self.with_state(|state| state.delay = Some(delay));
        }

        /// Roots passed to `set_root`, in call order.
        pub fn calls(&self) -> Vec<Root> {
            self.with_state(|state| state.calls.clone())
        }

        /// Number of `set_root` calls so far.
        pub fn call_count(&self) -> usize {
            self.with_state(|state| state.calls.len())
        }

        /// Root the ledger currently holds.
        pub fn confirmed_root(&self) -> Option<Root> {
            self.with_state(|state| state.confirmed)
        }

        fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
            let mut guard = match self.state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            f(&mut guard)
        }

        fn next_outcome(&self, root: Root) -> (MockOutcome, Option<Duration>) {
            self.with_state(|state| {
                state.calls.push(root);
                let outcome = state.script.pop_front().unwrap_or_else(|| state.fallback.clone());
                (outcome, state.delay)
            })
        }
    }

    impl Ledger for MockLedger {
        fn set_root(&self, root: Root) -> LedgerFuture<'_, LedgerConfirmation> {
            Box::pin(async move {
                let (outcome, delay) = self.next_outcome(root);
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }

                let result: Result<LedgerConfirmation> = match outcome {
                    MockOutcome::Confirm => {
                        let calls = self.with_state(|state| {
                            state.confirmed = Some(root);
                            state.calls.len()
                        });
                        Ok(LedgerConfirmation { root, confirmation_id: format!("mock-tx-{calls}") })
                    },
                    MockOutcome::Fail(error) => Err(error),
                    MockOutcome::Hang => std::future::pending().await,
                };
                result
            })
        }
    }

}
