//! Integration catalog and connection state

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    callback::{CallbackOutcome, ConnectStatus, read_outcome, strip_outcome},
    persistence::Persisted,
};

/// Display metadata for one integration card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrationInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub icon: &'static str,
}

const CATALOG: [IntegrationInfo; 3] = [
    IntegrationInfo {
        id: "google-drive",
        name: "Google Drive",
        description: "Accede y analiza archivos almacenados en tu Google Drive para generar insights automáticos.",
        category: "Almacenamiento",
        icon: "🟡",
    },
    IntegrationInfo {
        id: "salesforce",
        name: "Salesforce",
        description: "Conéctate a Salesforce para acceder a tus datos de CRM directamente en la app.",
        category: "CRM",
        icon: "🔵",
    },
    IntegrationInfo {
        id: "hubspot",
        name: "HubSpot",
        description: "Sincroniza contactos, negocios y propietarios de HubSpot para analizar tu embudo comercial.",
        category: "CRM",
        icon: "🟠",
    },
];

/// Integrations offered in the connect dialog
pub fn catalog() -> &'static [IntegrationInfo] {
    &CATALOG
}

pub fn lookup(id: &str) -> Option<&'static IntegrationInfo> {
    CATALOG.iter().find(|info| info.id == id)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationState {
    pub id: String,
    pub connected: bool,
}

/// Connection flags, at most one entry per integration id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrationStore {
    integrations: Vec<IntegrationState>,
}

impl IntegrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn integrations(&self) -> &[IntegrationState] {
        &self.integrations
    }

    /// Mark `id` connected, adding it on first use
    pub fn connect(&mut self, id: &str) {
        match self.integrations.iter_mut().find(|i| i.id == id) {
            Some(existing) => existing.connected = true,
            None => self.integrations.push(IntegrationState {
                id: id.to_string(),
                connected: true,
            }),
        }
    }

    /// Local flag flip; provider-side grants are left alone
    pub fn disconnect(&mut self, id: &str) {
        if let Some(existing) = self.integrations.iter_mut().find(|i| i.id == id) {
            existing.connected = false;
        }
    }

    pub fn is_connected(&self, id: &str) -> bool {
        self.integrations.iter().any(|i| i.id == id && i.connected)
    }

    /// Apply the outcome carried by a landing URL
    ///
    /// Returns the outcome, if any, and the URL to replace the current one
    /// with. The returned URL no longer carries the outcome, so applying it
    /// again changes nothing.
    pub fn apply_callback(&mut self, url: &Url) -> (Option<CallbackOutcome>, Url) {
        let Some(outcome) = read_outcome(url) else {
            return (None, url.clone());
        };

        if outcome.status == ConnectStatus::Success {
            info!("Integration connected: {}", outcome.provider);
            self.connect(&outcome.provider);
        }

        (Some(outcome), strip_outcome(url))
    }
}

impl Persisted for IntegrationStore {
    const STORAGE_KEY: &'static str = "atom-integrations-storage";
}
