//! Headless model of the menu selector screen: what to draw, and which alert
//! to raise after an order attempt.

use shared::domain::{MenuEntry, MenuId};

use crate::{
    error::ClientError,
    menus::MenuClient,
    query::QueryState,
    selection::{SelectionController, SelectionSet},
};

pub const LOADING_LABEL: &str = "Loading menus...";
pub const EMPTY_SELECTION_PLACEHOLDER: &str = "Nothing yet...";
pub const ORDER_LABEL: &str = "Order";
pub const ORDERING_LABEL: &str = "Ordering...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuRow {
    pub id: MenuId,
    pub name: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitButton {
    pub label: &'static str,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenView {
    Loading {
        label: &'static str,
    },
    Error {
        message: String,
    },
    Ready {
        rows: Vec<MenuRow>,
        chips: Vec<String>,
        placeholder: Option<&'static str>,
        submit: SubmitButton,
    },
}

/// Blocking alert shown after a submit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: &'static str,
    pub message: String,
}

impl Notification {
    fn from_error(err: &ClientError) -> Self {
        match err {
            ClientError::Validation(message) => Self {
                title: "Notice",
                message: message.clone(),
            },
            other => Self {
                title: "Error",
                message: other.to_string(),
            },
        }
    }
}

pub struct MenuScreen {
    client: MenuClient,
    controller: SelectionController,
}

impl MenuScreen {
    pub fn new(client: MenuClient) -> Self {
        let controller = SelectionController::new(client.submit_order());
        Self { client, controller }
    }

    pub fn selection(&self) -> &SelectionSet {
        self.controller.selection()
    }

    pub fn select(&mut self, name: impl Into<String>) {
        self.controller.select(name);
    }

    pub fn remove(&mut self, name: &str) {
        self.controller.remove(name);
    }

    pub async fn render(&self) -> ScreenView {
        match self.client.menus().await {
            QueryState::Loading => ScreenView::Loading {
                label: LOADING_LABEL,
            },
            QueryState::Error { message, .. } => ScreenView::Error {
                message: format!("Failed to load menus: {message}"),
            },
            QueryState::Ready { data, .. } => self.ready_view(&data),
        }
    }

    fn ready_view(&self, menus: &[MenuEntry]) -> ScreenView {
        let selection = self.controller.selection();
        let pending = self.controller.is_submitting();
        ScreenView::Ready {
            rows: menus
                .iter()
                .map(|entry| MenuRow {
                    id: entry.id.clone(),
                    name: entry.name.clone(),
                    selected: selection.contains(&entry.name),
                })
                .collect(),
            chips: selection.as_slice().to_vec(),
            placeholder: selection.is_empty().then_some(EMPTY_SELECTION_PLACEHOLDER),
            submit: SubmitButton {
                label: if pending { ORDERING_LABEL } else { ORDER_LABEL },
                enabled: !pending,
            },
        }
    }

    pub async fn submit(&mut self) -> Notification {
        match self.controller.submit().await {
            Ok(result) => Notification {
                title: "Order complete",
                message: result.message,
            },
            Err(err) => Notification::from_error(&err),
        }
    }
}

#[cfg(test)]
#[path = "tests/screen_tests.rs"]
mod tests;
