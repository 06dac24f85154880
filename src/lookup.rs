//! # Interaction History Lookup
//!
//! State behind the "View Log" panel: the device being inspected, the
//! interactions returned for it, and a wrap-around cursor into them.
//!
//! Every search gets a [`SearchTicket`]. Only the ticket of the most recent
//! search can complete it, so a slow response for a device the user has since
//! closed or replaced is dropped instead of overwriting newer state.

use crate::backend::InteractionStore;
use crate::error::ClientError;
use crate::models::InteractionRecord;
use crate::registry::SightedDevice;

pub const SEARCH_UNREACHABLE_MESSAGE: &str =
    "Failed to search for interaction history. Please check your connection to the server.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Identifies one search request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket {
    generation: u64,
}

#[derive(Debug, Default)]
pub struct InteractionBrowser {
    device: Option<SightedDevice>,
    records: Vec<InteractionRecord>,
    cursor: usize,
    loading: bool,
    error: Option<String>,
    held: Option<Direction>,
    generation: u64,
}

impl InteractionBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the panel for `device` and invalidate any earlier search
    pub fn begin_search(&mut self, device: SightedDevice) -> SearchTicket {
        self.generation += 1;
        self.device = Some(device);
        self.records.clear();
        self.cursor = 0;
        self.loading = true;
        self.error = None;
        self.held = None;
        SearchTicket {
            generation: self.generation,
        }
    }

    /// Apply a search result. Returns `false` when the ticket is stale.
    pub fn complete(
        &mut self,
        ticket: SearchTicket,
        result: Result<Vec<InteractionRecord>, String>,
    ) -> bool {
        if ticket.generation != self.generation || self.device.is_none() {
            log::debug!("Discarding stale interaction search #{}", ticket.generation);
            return false;
        }

        self.loading = false;
        self.cursor = 0;
        match result {
            Ok(records) => {
                log::info!("Loaded {} interactions", records.len());
                self.records = records;
                self.error = None;
            }
            Err(message) => {
                self.records.clear();
                self.error = Some(message);
            }
        }
        true
    }

    /// Close the panel; any search still running becomes stale
    pub fn close(&mut self) {
        self.generation += 1;
        self.device = None;
        self.records.clear();
        self.cursor = 0;
        self.loading = false;
        self.error = None;
        self.held = None;
    }

    pub fn next(&mut self) {
        if self.records.is_empty() {
            return;
        }
        self.cursor = if self.cursor + 1 >= self.records.len() {
            0
        } else {
            self.cursor + 1
        };
    }

    pub fn prev(&mut self) {
        if self.records.is_empty() {
            return;
        }
        self.cursor = if self.cursor == 0 {
            self.records.len() - 1
        } else {
            self.cursor - 1
        };
    }

    pub fn step(&mut self, direction: Direction) {
        match direction {
            Direction::Previous => self.prev(),
            Direction::Next => self.next(),
        }
    }

    /// Jump straight to `index` (clicking a card). Out of range is ignored.
    pub fn select(&mut self, index: usize) {
        if index < self.records.len() {
            self.cursor = index;
        }
    }

    /// Start continuous navigation; the caller ticks [`Self::hold_tick`]
    pub fn hold(&mut self, direction: Direction) {
        self.held = Some(direction);
    }

    pub fn release(&mut self) {
        self.held = None;
    }

    /// One step of continuous navigation, if a direction is held
    pub fn hold_tick(&mut self) {
        if let Some(direction) = self.held {
            self.step(direction);
        }
    }

    pub fn held(&self) -> Option<Direction> {
        self.held
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn device(&self) -> Option<&SightedDevice> {
        self.device.as_ref()
    }

    pub fn records(&self) -> &[InteractionRecord] {
        &self.records
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&InteractionRecord> {
        self.records.get(self.cursor)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

fn search_error_message(error: &ClientError) -> String {
    match error {
        ClientError::Backend(reason) => format!("Failed to fetch interaction history: {}", reason),
        _ => SEARCH_UNREACHABLE_MESSAGE.to_string(),
    }
}

/// Run one search against `store`; pair the result with its ticket.
/// Failures come back as the text shown in the panel.
pub async fn search<S: InteractionStore + ?Sized>(
    store: &S,
    address: String,
    ticket: SearchTicket,
) -> (SearchTicket, Result<Vec<InteractionRecord>, String>) {
    let result = store.search(&address).await.map_err(|e| {
        log::error!("Interaction search for {} failed: {}", address, e);
        search_error_message(&e)
    });
    (ticket, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Analysis, InteractionDraft, Item, Sighting};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    fn device(address: &str) -> SightedDevice {
        SightedDevice::new(address, Some("Pixel 8".to_string()), -55, Utc::now())
    }

    fn record(recommendation: &str) -> InteractionRecord {
        InteractionRecord {
            timestamp: Some("2025-03-01T10:15:00Z".to_string()),
            saved_at: None,
            analysis: None,
            ingredients: None,
            products: None,
            recommendations: Some(recommendation.to_string()),
            device: None,
        }
    }

    /// Backend that stores saved drafts and returns them on search
    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Vec<InteractionDraft>>,
        offline: bool,
    }

    #[async_trait]
    impl InteractionStore for MemoryStore {
        async fn search(&self, address: &str) -> Result<Vec<InteractionRecord>, ClientError> {
            if self.offline {
                return Err(ClientError::Status {
                    endpoint: "/data/search_interactions".to_string(),
                    status: 502,
                });
            }
            let saved = self.saved.lock().unwrap();
            let records: Vec<_> = saved
                .iter()
                .filter(|d| d.device.address == address)
                .map(|d| InteractionRecord {
                    timestamp: Some(d.saved_at.clone()),
                    saved_at: Some(d.saved_at.clone()),
                    analysis: d.analysis.clone(),
                    ingredients: Some(d.ingredients.clone()),
                    products: Some(d.products.clone()),
                    recommendations: d.recommendations.clone(),
                    device: Some(d.device.clone()),
                })
                .collect();
            if records.is_empty() {
                return Err(ClientError::Backend("No interactions found".to_string()));
            }
            Ok(records)
        }

        async fn save(&self, draft: &InteractionDraft) -> Result<(), ClientError> {
            self.saved.lock().unwrap().push(draft.clone());
            Ok(())
        }
    }

    #[test]
    fn test_cursor_wraps_forward_and_back() {
        let mut browser = InteractionBrowser::new();
        let ticket = browser.begin_search(device("AA:BB"));
        assert!(browser.complete(ticket, Ok(vec![record("r0"), record("r1")])));

        assert_eq!(browser.cursor(), 0);
        browser.next();
        assert_eq!(browser.cursor(), 1);
        browser.next();
        assert_eq!(browser.cursor(), 0);
        browser.prev();
        assert_eq!(browser.cursor(), 1);
        assert_eq!(browser.current().unwrap().recommendations.as_deref(), Some("r1"));
    }

    #[test]
    fn test_navigation_on_empty_is_noop() {
        let mut browser = InteractionBrowser::new();
        browser.next();
        browser.prev();
        assert_eq!(browser.cursor(), 0);
        assert!(browser.current().is_none());
    }

    #[test]
    fn test_hold_navigation_steps_once_per_tick() {
        let mut browser = InteractionBrowser::new();
        let ticket = browser.begin_search(device("AA:BB"));
        browser.complete(ticket, Ok(vec![record("a"), record("b"), record("c")]));

        browser.hold(Direction::Previous);
        browser.hold_tick();
        assert_eq!(browser.cursor(), 2);
        browser.hold_tick();
        assert_eq!(browser.cursor(), 1);

        browser.release();
        browser.hold_tick();
        assert_eq!(browser.cursor(), 1);
    }

    #[test]
    fn test_select_ignores_out_of_range() {
        let mut browser = InteractionBrowser::new();
        let ticket = browser.begin_search(device("AA:BB"));
        browser.complete(ticket, Ok(vec![record("a"), record("b")]));
        browser.select(1);
        assert_eq!(browser.cursor(), 1);
        browser.select(5);
        assert_eq!(browser.cursor(), 1);
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut browser = InteractionBrowser::new();
        let first = browser.begin_search(device("AA:BB"));
        let second = browser.begin_search(device("CC:DD"));

        assert!(!browser.complete(first, Ok(vec![record("old")])));
        assert!(browser.is_loading());
        assert!(browser.complete(second, Ok(vec![record("new")])));
        assert_eq!(browser.current().unwrap().recommendations.as_deref(), Some("new"));
    }

    #[test]
    fn test_response_after_close_is_discarded() {
        let mut browser = InteractionBrowser::new();
        let ticket = browser.begin_search(device("AA:BB"));
        browser.close();

        assert!(!browser.complete(ticket, Ok(vec![record("late")])));
        assert!(!browser.is_open());
        assert!(browser.records().is_empty());
    }

    #[test]
    fn test_backend_error_message() {
        let mut browser = InteractionBrowser::new();
        let ticket = browser.begin_search(device("AA:BB"));
        let error = ClientError::Backend("No interactions found".to_string());
        browser.complete(ticket, Err(search_error_message(&error)));

        assert_eq!(
            browser.error(),
            Some("Failed to fetch interaction history: No interactions found")
        );
        assert!(browser.records().is_empty());
        assert!(!browser.is_loading());
    }

    #[tokio::test]
    async fn test_transport_error_yields_empty_history() {
        let store = MemoryStore {
            offline: true,
            ..Default::default()
        };
        let mut browser = InteractionBrowser::new();
        let ticket = browser.begin_search(device("AA:BB"));

        let (ticket, result) = search(&store, "AA:BB".to_string(), ticket).await;
        browser.complete(ticket, result);
        assert_eq!(browser.error(), Some(SEARCH_UNREACHABLE_MESSAGE));
        assert!(browser.records().is_empty());
    }

    #[tokio::test]
    async fn test_saved_interaction_round_trips_through_search() {
        let store = MemoryStore::default();
        let draft = InteractionDraft {
            device: Sighting {
                address: "AA:BB".to_string(),
                name: Some("Pixel 8".to_string()),
                rssi: -55,
            },
            analysis: Some(Analysis {
                color: Some("Medium".to_string()),
                texture: Some("Rough".to_string()),
            }),
            ingredients: vec![Item::new("Niacinamide", Some("Evens tone".to_string()))],
            products: vec![Item::new("Gel Cleanser", None)],
            recommendations: Some("Cleanse twice daily".to_string()),
            saved_at: "2025-03-01T10:15:00Z".to_string(),
        };
        store.save(&draft).await.unwrap();

        let mut browser = InteractionBrowser::new();
        let ticket = browser.begin_search(device("AA:BB"));
        let (ticket, result) = search(&store, "AA:BB".to_string(), ticket).await;
        assert!(browser.complete(ticket, result));

        let current = browser.current().unwrap();
        assert_eq!(current.analysis, draft.analysis);
        assert_eq!(current.ingredients.as_ref(), Some(&draft.ingredients));
        assert_eq!(current.products.as_ref(), Some(&draft.products));
        assert_eq!(current.recommendations, draft.recommendations);

        // exact address match only
        let ticket = browser.begin_search(device("AA:B"));
        let (ticket, result) = search(&store, "AA:B".to_string(), ticket).await;
        browser.complete(ticket, result);
        assert!(browser.records().is_empty());
    }

    #[test]
    fn test_record_survives_wire_round_trip() {
        let record = InteractionRecord {
            timestamp: Some("2025-03-01T10:15:00Z".to_string()),
            saved_at: None,
            analysis: Some(Analysis {
                color: Some("Fair".to_string()),
                texture: Some("Smooth".to_string()),
            }),
            ingredients: Some(vec![Item::new("Ceramides", Some("Barrier".to_string()))]),
            products: Some(vec![Item::new("Cream", None)]),
            recommendations: Some("Moisturize".to_string()),
            device: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        let decoded: InteractionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, record);
    }
}
