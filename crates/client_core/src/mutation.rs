use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::{
    domain::MenuEntry,
    protocol::{OrderRequest, OrderResult},
};
use tracing::{info, warn};

use crate::{
    error::{ClientError, Result},
    query::{QueryClient, QueryKey},
    source::MenuDataSource,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MutationState {
    #[default]
    Idle,
    Pending,
    Succeeded(OrderResult),
    Failed(String),
}

/// Order submission. A call made while another is pending is rejected with
/// [`ClientError::SubmissionInProgress`]; the data source is not contacted.
pub struct SubmitOrderMutation {
    source: Arc<dyn MenuDataSource>,
    queries: QueryClient<Vec<MenuEntry>>,
    state: Mutex<MutationState>,
}

/// Puts the mutation back to idle if the submitting future is dropped early.
struct PendingGuard<'a> {
    mutation: &'a SubmitOrderMutation,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.mutation.lock_state() = MutationState::Idle;
        }
    }
}

impl SubmitOrderMutation {
    pub fn new(source: Arc<dyn MenuDataSource>, queries: QueryClient<Vec<MenuEntry>>) -> Self {
        Self {
            source,
            queries,
            state: Mutex::new(MutationState::Idle),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, MutationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> MutationState {
        self.lock_state().clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.lock_state(), MutationState::Pending)
    }

    pub fn reset(&self) {
        let mut state = self.lock_state();
        if !matches!(*state, MutationState::Pending) {
            *state = MutationState::Idle;
        }
    }

    pub async fn submit(&self, request: OrderRequest) -> Result<OrderResult> {
        let mut guard = {
            let mut state = self.lock_state();
            if matches!(*state, MutationState::Pending) {
                warn!("rejecting order submission while another is pending");
                return Err(ClientError::SubmissionInProgress);
            }
            *state = MutationState::Pending;
            PendingGuard {
                mutation: self,
                armed: true,
            }
        };

        let outcome = self.source.submit_order(&request).await;
        guard.armed = false;

        match &outcome {
            Ok(result) => {
                info!(order_id = %result.order_id, items = request.items.len(), "order submitted");
                *self.lock_state() = MutationState::Succeeded(result.clone());
                self.queries.invalidate(QueryKey::Menus).await;
            }
            Err(err) => {
                warn!(error = %err, "order submission failed");
                *self.lock_state() = MutationState::Failed(err.to_string());
            }
        }
        outcome
    }
}

#[cfg(test)]
#[path = "tests/mutation_tests.rs"]
mod tests;
