//! Ensayar: a browser test-automation core built around page objects,
//! composable scenarios, and session-scoped network interception.
//!
//! Tests never touch selectors or raw requests. They talk to
//! [`pages`](crate::pages) for behavior, [`scenario`](crate::scenario)
//! for starting state, and [`intercept`](crate::intercept) for network
//! control; every test runs against a fresh [`session::Session`] whose
//! state, rules, and captured traffic die with it.
//!
//! ```no_run
//! use ensayar::environment::{self, Profile};
//! use ensayar::pages::{LoginPage, Page};
//! use ensayar::session::Session;
//!
//! # async fn run() -> ensayar::EnsayarResult<()> {
//! let session = Session::sim(environment::resolve_from_env());
//! let login = LoginPage::new(session);
//! login.open().await?;
//! let inventory = login.login_as(Profile::Standard).await?;
//! assert_eq!(inventory.product_names().await?.len(), 6);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod driver;
pub mod environment;
pub mod intercept;
pub mod locator;
pub mod pages;
pub mod result;
pub mod scenario;
pub mod session;

pub use result::{EnsayarError, EnsayarResult};

/// The items most tests want in scope
pub mod prelude {
    pub use crate::catalog::{self, CheckoutInfo, Product};
    pub use crate::driver::{AutomationDriver, SimDriver};
    pub use crate::environment::{self, Profile, Target};
    pub use crate::intercept::{
        AbortReason, HttpMethod, InterceptionEngine, MockResponse, Outcome, RequestView, Rule,
        UrlPattern,
    };
    pub use crate::locator::{Locator, Selector};
    pub use crate::pages::{
        CartPage, CheckoutCompletePage, CheckoutInfoPage, CheckoutOverviewPage, InventoryPage,
        LoginPage, Page, SortOption,
    };
    pub use crate::result::{EnsayarError, EnsayarResult};
    pub use crate::scenario::{
        presets, ScenarioFixture, ScenarioHandle, ScenarioPages, ScenarioRegistry,
    };
    pub use crate::session::{Session, SessionState};
}
