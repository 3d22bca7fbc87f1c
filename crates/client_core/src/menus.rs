use std::sync::Arc;

use shared::domain::MenuEntry;

use crate::{
    config::ClientSettings,
    error::Result,
    mutation::SubmitOrderMutation,
    query::{Query, QueryClient, QueryKey, QueryOptions, QueryState},
    source::{menu_source_from_settings, MenuDataSource},
};

/// Menu catalog query and order mutation over one data source and one cache.
#[derive(Clone)]
pub struct MenuClient {
    queries: QueryClient<Vec<MenuEntry>>,
    menus: Query<Vec<MenuEntry>>,
    submit_order: Arc<SubmitOrderMutation>,
}

impl MenuClient {
    pub fn new(source: Arc<dyn MenuDataSource>, options: QueryOptions) -> Self {
        let queries = QueryClient::new();
        let menus = {
            let source = Arc::clone(&source);
            Query::new(QueryKey::Menus, options, move || {
                let source = Arc::clone(&source);
                async move { source.list_menus().await }
            })
        };
        let submit_order = Arc::new(SubmitOrderMutation::new(source, queries.clone()));
        Self {
            queries,
            menus,
            submit_order,
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let source = menu_source_from_settings(settings)?;
        Ok(Self::new(source, QueryOptions::from_settings(settings)))
    }

    pub fn queries(&self) -> &QueryClient<Vec<MenuEntry>> {
        &self.queries
    }

    pub fn menus_query(&self) -> &Query<Vec<MenuEntry>> {
        &self.menus
    }

    /// Current catalog state; kicks off a background fetch when needed.
    pub async fn menus(&self) -> QueryState<Vec<MenuEntry>> {
        self.queries.observe(&self.menus).await
    }

    pub async fn fetch_menus(&self) -> Result<Arc<Vec<MenuEntry>>> {
        self.queries.fetch(&self.menus).await
    }

    pub async fn refresh_menus(&self) -> Result<Arc<Vec<MenuEntry>>> {
        self.queries.refetch(&self.menus).await
    }

    pub fn submit_order(&self) -> Arc<SubmitOrderMutation> {
        Arc::clone(&self.submit_order)
    }
}
