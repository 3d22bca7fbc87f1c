//! Client-local selection state and the submit flow built on it.

use std::sync::Arc;

use shared::protocol::{OrderRequest, OrderResult};
use tracing::debug;

use crate::{
    error::{ClientError, Result},
    mutation::SubmitOrderMutation,
};

/// Selected menu names in first-insertion order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    names: Vec<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the name was already selected.
    pub fn select(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    /// Returns `false` when the name was not selected.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.names.len();
        self.names.retain(|selected| selected != name);
        self.names.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|selected| selected == name)
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    pub fn to_order_request(&self) -> OrderRequest {
        OrderRequest {
            items: self.names.clone(),
        }
    }
}

/// How the last `submit` ended. The controller is idle again in every case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Nothing was selected; no request went out.
    Rejected(String),
    /// Order accepted; the selection was cleared.
    Succeeded(OrderResult),
    /// Order failed; the selection is unchanged.
    Failed(String),
}

pub struct SelectionController {
    selection: SelectionSet,
    mutation: Arc<SubmitOrderMutation>,
    last_outcome: Option<SubmissionOutcome>,
}

impl SelectionController {
    pub fn new(mutation: Arc<SubmitOrderMutation>) -> Self {
        Self {
            selection: SelectionSet::new(),
            mutation,
            last_outcome: None,
        }
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn last_outcome(&self) -> Option<&SubmissionOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.mutation.is_pending()
    }

    pub fn select(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.selection.select(name.clone()) {
            debug!(%name, "selected menu");
        }
    }

    pub fn remove(&mut self, name: &str) {
        if self.selection.remove(name) {
            debug!(%name, "removed menu from selection");
        }
    }

    /// Validates, then submits the current selection in insertion order.
    /// `&mut self` keeps submissions from one controller strictly sequential.
    pub async fn submit(&mut self) -> Result<OrderResult> {
        if self.selection.is_empty() {
            let err = ClientError::empty_selection();
            self.last_outcome = Some(SubmissionOutcome::Rejected(err.to_string()));
            return Err(err);
        }

        let request = self.selection.to_order_request();
        match self.mutation.submit(request).await {
            Ok(result) => {
                self.selection.clear();
                self.last_outcome = Some(SubmissionOutcome::Succeeded(result.clone()));
                Ok(result)
            }
            Err(err) => {
                self.last_outcome = Some(SubmissionOutcome::Failed(err.to_string()));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
