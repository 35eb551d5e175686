//! Page flow driven by the authentication state.

use std::sync::Arc;

use bus_location::{Config, LocationStore};
use realtime::{AuthError, Authenticator, DocumentStore, Geolocation, Result, Session};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::driver::DriverDashboard;
use crate::rider::{BusList, BusLocationView};

/// The page shown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Page {
    Home,
    BusLocation { bus_id: String },
    Login,
    DriverDashboard,
}

/// Application state.
///
/// The session only ever changes through the authenticator's push notifications:
/// a signed-in session moves the app to the driver dashboard, signing out moves
/// it home. Page-specific state (the dashboard's tracking, the rider's
/// subscription) lives only while its page is shown.
pub struct App<A, G, S> {
    auth: Arc<A>,
    geo: Arc<G>,
    store: LocationStore<S>,
    config: Config,
    auth_state: watch::Receiver<Option<Session>>,
    session: Option<Session>,
    page: Page,
    login_error: Option<AuthError>,
    dashboard: Option<DriverDashboard<G, S>>,
    bus_view: Option<BusLocationView<S>>,
}

impl<A, G, S> App<A, G, S>
where
    A: Authenticator + 'static,
    G: Geolocation + 'static,
    S: DocumentStore + 'static,
{
    /// Creates the app on the home page, then applies the current auth state.
    pub async fn new(auth: Arc<A>, geo: Arc<G>, store: Arc<S>, config: Config) -> Self {
        let auth_state = auth.on_auth_state_changed();
        let store = LocationStore::new(store, config.collections.clone());
        let mut app = Self {
            auth,
            geo,
            store,
            config,
            auth_state,
            session: None,
            page: Page::Home,
            login_error: None,
            dashboard: None,
            bus_view: None,
        };

        let session = app.auth_state.borrow_and_update().clone();
        if session.is_some() {
            app.apply_session(session).await;
        }
        app
    }

    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The error of the last failed sign-in, shown on the login page.
    #[must_use]
    pub const fn login_error(&self) -> Option<&AuthError> {
        self.login_error.as_ref()
    }

    pub fn dashboard(&mut self) -> Option<&mut DriverDashboard<G, S>> {
        self.dashboard.as_mut()
    }

    pub fn bus_view(&mut self) -> Option<&mut BusLocationView<S>> {
        self.bus_view.as_mut()
    }

    /// Loads the rider's bus list.
    pub async fn bus_list(&self) -> BusList {
        BusList::load(&self.store).await
    }

    /// Opens the live view of a bus.
    pub fn select_bus(&mut self, bus_id: &str) {
        self.leave();
        self.bus_view = Some(BusLocationView::open(self.store.clone(), bus_id, &self.config));
        self.page = Page::BusLocation { bus_id: bus_id.to_string() };
    }

    pub fn back(&mut self) {
        self.leave();
        self.page = Page::Home;
    }

    pub fn open_login(&mut self) {
        self.leave();
        self.login_error = None;
        self.page = Page::Login;
    }

    /// Signs in. On success the page follows the resulting auth notification; on
    /// failure it stays on the login page with the error recorded.
    ///
    /// # Errors
    ///
    /// Returns the sign-in error.
    pub async fn login(&mut self, email: &str, password: &str) -> std::result::Result<(), AuthError> {
        self.login_error = None;
        match self.auth.sign_in(email, password).await {
            Ok(session) => {
                info!(uid = %session.uid, "driver signed in");
                self.sync_auth().await;
                Ok(())
            }
            Err(err) => {
                debug!(code = err.code(), "sign-in failed");
                self.login_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Signs out. Tracking ends when the resulting auth notification tears the
    /// dashboard down.
    ///
    /// # Errors
    ///
    /// Returns the sign-out error. The session, page and tracking are unchanged.
    pub async fn logout(&mut self) -> Result<()> {
        if let Err(err) = self.auth.sign_out().await {
            error!(error = %err, "sign-out failed");
            return Err(err);
        }
        self.sync_auth().await;
        Ok(())
    }

    /// Applies an auth notification that has already arrived. Returns whether one
    /// was pending.
    pub async fn sync_auth(&mut self) -> bool {
        if !self.auth_state.has_changed().unwrap_or(false) {
            return false;
        }
        let session = self.auth_state.borrow_and_update().clone();
        self.apply_session(session).await;
        true
    }

    /// Waits for the next auth notification and applies it. Returns false when
    /// the authenticator has gone away.
    pub async fn auth_changed(&mut self) -> bool {
        if self.auth_state.changed().await.is_err() {
            return false;
        }
        let session = self.auth_state.borrow_and_update().clone();
        self.apply_session(session).await;
        true
    }

    async fn apply_session(&mut self, session: Option<Session>) {
        self.leave();
        match &session {
            Some(driver) => {
                let dashboard = DriverDashboard::load(
                    driver.clone(),
                    Arc::clone(&self.geo),
                    self.store.clone(),
                    &self.config,
                )
                .await;
                self.dashboard = Some(dashboard);
                self.page = Page::DriverDashboard;
            }
            None => self.page = Page::Home,
        }
        self.session = session;
    }

    // tear down whatever the current page holds
    fn leave(&mut self) {
        if let Some(mut dashboard) = self.dashboard.take() {
            dashboard.close();
        }
        if let Some(mut view) = self.bus_view.take() {
            view.close();
        }
    }
}
