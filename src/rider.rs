//! Rider pages: the bus list and the live view of one bus.

use bus_location::{Bus, Config, LocationStore, LocationSubscriber, ViewState, ViewportController};
use realtime::{DocumentStore, MapEvent, MapView};
use tracing::error;

use crate::display::MapModel;
use crate::route::{self, RouteStop};

/// The buses a rider can pick from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BusList {
    pub buses: Vec<Bus>,
    pub error: Option<String>,
}

impl BusList {
    /// Loads every bus. A failed load yields an empty list with an error message.
    pub async fn load<S: DocumentStore + 'static>(store: &LocationStore<S>) -> Self {
        match store.buses().await {
            Ok(buses) => Self { buses, error: None },
            Err(err) => {
                error!(error = %err, "failed to load buses");
                Self {
                    buses: Vec::new(),
                    error: Some("Failed to load buses. Please try again later.".to_string()),
                }
            }
        }
    }

    /// Message shown in place of the list, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        if let Some(error) = &self.error {
            return Some(error);
        }
        self.buses.is_empty().then_some("No buses available at the moment.")
    }
}

/// Live location page for one bus.
pub struct BusLocationView<S> {
    bus_id: String,
    subscriber: LocationSubscriber<S>,
    viewport: ViewportController,
    initial_zoom: u8,
    loading: bool,
    centered: bool,
    state: ViewState,
}

impl<S> BusLocationView<S>
where
    S: DocumentStore + 'static,
{
    /// Opens the view and starts listening to the bus's location record.
    #[must_use]
    pub fn open(store: LocationStore<S>, bus_id: &str, config: &Config) -> Self {
        let mut subscriber = LocationSubscriber::new(store, config.history_capacity);
        subscriber.watch(bus_id);
        Self {
            bus_id: bus_id.to_string(),
            subscriber,
            viewport: ViewportController::from_config(config),
            initial_zoom: config.initial_zoom,
            loading: true,
            centered: false,
            state: ViewState::absent(),
        }
    }

    #[must_use]
    pub fn bus_id(&self) -> &str {
        &self.bus_id
    }

    /// The bus's route schedule.
    #[must_use]
    pub fn route(&self) -> &'static [RouteStop] {
        route::schedule(&self.bus_id)
    }

    /// Waits for the next store notification and applies it. The map is centered
    /// at the initial zoom on the first position after an absence. Returns false
    /// once the subscription has ended.
    pub async fn next(&mut self, map: &mut impl MapView) -> bool {
        let Some(state) = self.subscriber.next().await else {
            return false;
        };
        self.loading = false;

        match &state.record {
            Some(record) => {
                self.viewport.update_position(record.lat_lng());
                if !self.centered {
                    map.set_view(record.lat_lng(), self.initial_zoom);
                    self.centered = true;
                }
            }
            None => {
                self.viewport.clear_position();
                self.centered = false;
            }
        }
        self.state = state;
        true
    }

    /// Forwards a viewport event. Returns whether the recenter control is shown.
    pub fn on_map_event(&mut self, event: MapEvent) -> bool {
        self.viewport.handle(event)
    }

    pub fn recenter(&mut self, map: &mut impl MapView) -> bool {
        self.viewport.recenter(map)
    }

    #[must_use]
    pub const fn show_recenter(&self) -> bool {
        self.viewport.show_recenter()
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub const fn state(&self) -> &ViewState {
        &self.state
    }

    /// The map contents, when a live record exists.
    #[must_use]
    pub fn map_model(&self) -> Option<MapModel> {
        let record = self.state.record.as_ref()?;
        Some(MapModel::new(record, &self.state.history))
    }

    /// Message shown in place of the map, if any.
    #[must_use]
    pub const fn message(&self) -> Option<&'static str> {
        if self.loading {
            Some("Loading location data...")
        } else if self.state.exists {
            None
        } else {
            Some("No live location data available for this bus at the moment.")
        }
    }

    /// Stops listening. Dropping the view does the same.
    pub fn close(&mut self) {
        self.subscriber.stop();
    }
}
