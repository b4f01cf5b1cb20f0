//! Scenario composition.
//!
//! A scenario definition names its prerequisite definitions; building one
//! resolves the dependency graph depth-first, runs each setup exactly
//! once in dependency order against the test's session, and hands back a
//! handle that tears the applied fixtures down in reverse order.
//!
//! Definitions must be registered after their dependencies, which makes a
//! dependency cycle unrepresentable: a cycle would need some definition
//! to name a not-yet-registered one, and that registration is rejected.

use crate::pages::{
    CartPage, CheckoutInfoPage, CheckoutOverviewPage, InventoryPage, LoginPage,
};
use crate::result::{EnsayarError, EnsayarResult};
use crate::session::{Session, SessionState};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A reusable piece of test state with explicit prerequisites
#[async_trait]
pub trait ScenarioFixture: Send + Sync {
    /// Unique name this definition is registered and depended on by
    fn name(&self) -> &str;

    /// Names of definitions that must be applied before this one
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Bring the session into this fixture's state
    async fn setup(&self, session: &Arc<Session>) -> EnsayarResult<()>;

    /// Undo this fixture's effects. Most fixtures rely on the session
    /// being discarded instead and keep the default no-op.
    async fn teardown(&self, _session: &Arc<Session>) -> EnsayarResult<()> {
        Ok(())
    }
}

fn build_error(scenario: &str, message: impl Into<String>) -> EnsayarError {
    EnsayarError::ScenarioBuild {
        scenario: scenario.to_string(),
        message: message.into(),
    }
}

/// Registry of scenario definitions
#[derive(Default)]
pub struct ScenarioRegistry {
    by_name: HashMap<String, Arc<dyn ScenarioFixture>>,
}

impl std::fmt::Debug for ScenarioRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.by_name.keys().collect();
        names.sort();
        f.debug_struct("ScenarioRegistry")
            .field("definitions", &names)
            .finish()
    }
}

impl ScenarioRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Fails on a duplicate name, a dependency
    /// that is not registered yet, or a self-dependency.
    pub fn register(&mut self, fixture: Arc<dyn ScenarioFixture>) -> EnsayarResult<()> {
        let name = fixture.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(build_error(&name, "a definition with this name already exists"));
        }
        for dep in fixture.dependencies() {
            if dep == name {
                return Err(build_error(&name, "definition depends on itself"));
            }
            if !self.by_name.contains_key(&dep) {
                return Err(build_error(
                    &name,
                    format!("dependency '{dep}' is not registered"),
                ));
            }
        }
        let _ = self.by_name.insert(name, fixture);
        Ok(())
    }

    /// Number of registered definitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Setup order for a scenario: dependencies first, each definition
    /// exactly once even when the graph reaches it along several paths
    pub fn resolve(&self, name: &str) -> EnsayarResult<Vec<Arc<dyn ScenarioFixture>>> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        self.visit(name, name, &mut visited, &mut order)?;
        Ok(order)
    }

    fn visit(
        &self,
        scenario: &str,
        name: &str,
        visited: &mut HashSet<String>,
        order: &mut Vec<Arc<dyn ScenarioFixture>>,
    ) -> EnsayarResult<()> {
        if visited.contains(name) {
            return Ok(());
        }
        let fixture = self.by_name.get(name).ok_or_else(|| {
            build_error(scenario, format!("definition '{name}' is not registered"))
        })?;
        let _ = visited.insert(name.to_string());
        for dep in fixture.dependencies() {
            self.visit(scenario, &dep, visited, order)?;
        }
        order.push(Arc::clone(fixture));
        Ok(())
    }

    /// Build a scenario against a session.
    ///
    /// Setups run sequentially in resolved order. If one fails, the
    /// fixtures already applied are torn down in reverse before the
    /// error is returned, wrapped with the failing definition's name.
    pub async fn build(
        &self,
        name: &str,
        session: &Arc<Session>,
    ) -> EnsayarResult<ScenarioHandle> {
        let order = self.resolve(name)?;
        tracing::info!(
            scenario = name,
            steps = order.len(),
            session = %session.id(),
            "building scenario"
        );

        let mut applied: Vec<Arc<dyn ScenarioFixture>> = Vec::with_capacity(order.len());
        for fixture in order {
            tracing::debug!(fixture = fixture.name(), "applying fixture");
            if let Err(e) = fixture.setup(session).await {
                let failed = fixture.name().to_string();
                for done in applied.iter().rev() {
                    if let Err(td) = done.teardown(session).await {
                        tracing::warn!(fixture = done.name(), error = %td, "teardown after failed build");
                    }
                }
                return Err(build_error(&failed, e.to_string()));
            }
            applied.push(fixture);
        }
        Ok(ScenarioHandle {
            session: Arc::clone(session),
            applied,
        })
    }
}

/// The page objects valid for the state a scenario reached
#[derive(Debug)]
pub enum ScenarioPages {
    /// Not logged in; only the login form applies
    Anonymous(LoginPage),
    /// Logged in on the product grid
    Authenticated(InventoryPage),
    /// Logged in with items in the cart
    CartPopulated {
        /// The product grid
        inventory: InventoryPage,
        /// The cart review page
        cart: CartPage,
    },
    /// Checkout flow at the buyer information step
    CheckoutInfo(CheckoutInfoPage),
    /// Checkout flow at the order overview step
    CheckoutOverview(CheckoutOverviewPage),
}

impl ScenarioPages {
    /// The inventory page, for states that include one
    pub fn into_inventory(self) -> EnsayarResult<InventoryPage> {
        match self {
            Self::Authenticated(inventory) | Self::CartPopulated { inventory, .. } => {
                Ok(inventory)
            }
            other => Err(EnsayarError::Usage {
                message: format!("scenario produced {other:?}, not an inventory page"),
            }),
        }
    }

    /// The cart page, for the populated-cart state
    pub fn into_cart(self) -> EnsayarResult<CartPage> {
        match self {
            Self::CartPopulated { cart, .. } => Ok(cart),
            other => Err(EnsayarError::Usage {
                message: format!("scenario produced {other:?}, not a cart page"),
            }),
        }
    }

    /// The order overview page, for the checkout-ready state
    pub fn into_overview(self) -> EnsayarResult<CheckoutOverviewPage> {
        match self {
            Self::CheckoutOverview(overview) => Ok(overview),
            other => Err(EnsayarError::Usage {
                message: format!("scenario produced {other:?}, not an order overview"),
            }),
        }
    }
}

/// A built scenario; carries the session it advanced and tears its
/// fixtures down in reverse order
pub struct ScenarioHandle {
    session: Arc<Session>,
    applied: Vec<Arc<dyn ScenarioFixture>>,
}

impl std::fmt::Debug for ScenarioHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.applied.iter().map(|h| h.name()).collect();
        f.debug_struct("ScenarioHandle")
            .field("applied", &names)
            .finish()
    }
}

impl ScenarioHandle {
    /// Names of the applied fixtures, in setup order
    #[must_use]
    pub fn applied(&self) -> Vec<&str> {
        self.applied.iter().map(|h| h.name()).collect()
    }

    /// The session the scenario advanced
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Page objects for the state the build reached, so the test body
    /// starts from the fixture's pages instead of reconstructing them.
    /// Pages are cheap wrappers; each call builds a fresh bundle.
    pub fn pages(&self) -> EnsayarResult<ScenarioPages> {
        let session = Arc::clone(&self.session);
        Ok(match session.state() {
            SessionState::Anonymous => ScenarioPages::Anonymous(LoginPage::new(session)),
            SessionState::Authenticated => {
                ScenarioPages::Authenticated(InventoryPage::new(session)?)
            }
            SessionState::CartPopulated(_) => ScenarioPages::CartPopulated {
                inventory: InventoryPage::new(Arc::clone(&session))?,
                cart: CartPage::new(session)?,
            },
            SessionState::CheckoutStep(1) => {
                ScenarioPages::CheckoutInfo(CheckoutInfoPage::new(session)?)
            }
            SessionState::CheckoutStep(_) => {
                ScenarioPages::CheckoutOverview(CheckoutOverviewPage::new(session)?)
            }
        })
    }

    /// Tear down in reverse setup order, stopping at the first failure
    pub async fn teardown(self) -> EnsayarResult<()> {
        for fixture in self.applied.iter().rev() {
            tracing::debug!(fixture = fixture.name(), "tearing down fixture");
            fixture.teardown(&self.session).await?;
        }
        Ok(())
    }
}

/// Ready-made definitions for the store's common starting points
pub mod presets {
    use super::{ScenarioFixture, ScenarioRegistry};
    use crate::catalog::{ids, CheckoutInfo};
    use crate::environment::Profile;
    use crate::pages::{CheckoutInfoPage, InventoryPage, LoginPage, Page};
    use crate::result::EnsayarResult;
    use crate::session::Session;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Name of the logged-in scenario
    pub const AUTHENTICATED: &str = "authenticated";
    /// Name of the populated-cart scenario
    pub const CART_WITH_ITEMS: &str = "cart-with-items";
    /// Name of the ready-to-order scenario
    pub const CHECKOUT_READY: &str = "checkout-ready";

    /// Session logged in as a profile
    #[derive(Debug)]
    pub struct AuthenticatedUser {
        profile: Profile,
    }

    impl AuthenticatedUser {
        /// Log in as the standard user
        #[must_use]
        pub const fn standard() -> Self {
            Self {
                profile: Profile::Standard,
            }
        }

        /// Log in as a specific profile
        #[must_use]
        pub const fn with_profile(profile: Profile) -> Self {
            Self { profile }
        }
    }

    #[async_trait]
    impl ScenarioFixture for AuthenticatedUser {
        fn name(&self) -> &str {
            AUTHENTICATED
        }

        async fn setup(&self, session: &Arc<Session>) -> EnsayarResult<()> {
            let login = LoginPage::new(Arc::clone(session));
            login.open().await?;
            let _ = login.login_as(self.profile).await?;
            Ok(())
        }
    }

    /// Cart pre-populated with products; depends on [`AuthenticatedUser`]
    #[derive(Debug)]
    pub struct CartWithItems {
        product_ids: Vec<String>,
    }

    impl CartWithItems {
        /// Cart holding one bike light
        #[must_use]
        pub fn one_bike_light() -> Self {
            Self::with_products(&[ids::BIKE_LIGHT])
        }

        /// Cart holding the given products
        #[must_use]
        pub fn with_products(product_ids: &[&str]) -> Self {
            Self {
                product_ids: product_ids.iter().map(ToString::to_string).collect(),
            }
        }
    }

    #[async_trait]
    impl ScenarioFixture for CartWithItems {
        fn name(&self) -> &str {
            CART_WITH_ITEMS
        }

        fn dependencies(&self) -> Vec<String> {
            vec![AUTHENTICATED.to_string()]
        }

        async fn setup(&self, session: &Arc<Session>) -> EnsayarResult<()> {
            let inventory = InventoryPage::new(Arc::clone(session))?;
            for id in &self.product_ids {
                inventory.add_to_cart(id).await?;
            }
            Ok(())
        }
    }

    /// Checkout flow advanced to the order overview; depends on
    /// [`CartWithItems`]
    #[derive(Debug)]
    pub struct CheckoutReady {
        info: CheckoutInfo,
    }

    impl CheckoutReady {
        /// Use the standard test buyer information
        #[must_use]
        pub fn test_buyer() -> Self {
            Self {
                info: CheckoutInfo::test_data(),
            }
        }
    }

    #[async_trait]
    impl ScenarioFixture for CheckoutReady {
        fn name(&self) -> &str {
            CHECKOUT_READY
        }

        fn dependencies(&self) -> Vec<String> {
            vec![CART_WITH_ITEMS.to_string()]
        }

        async fn setup(&self, session: &Arc<Session>) -> EnsayarResult<()> {
            let inventory = InventoryPage::new(Arc::clone(session))?;
            let cart = inventory.open_cart().await?;
            let info_page: CheckoutInfoPage = cart.checkout().await?;
            info_page.fill_info(&self.info).await?;
            let _ = info_page.continue_to_overview().await?;
            Ok(())
        }
    }

    /// Registry pre-loaded with the standard presets
    pub fn registry() -> EnsayarResult<ScenarioRegistry> {
        let mut registry = ScenarioRegistry::new();
        registry.register(Arc::new(AuthenticatedUser::standard()))?;
        registry.register(Arc::new(CartWithItems::one_bike_light()))?;
        registry.register(Arc::new(CheckoutReady::test_buyer()))?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Test fixture that records its setup/teardown into a shared log
    struct Recording {
        name: &'static str,
        deps: Vec<&'static str>,
        log: Arc<Mutex<Vec<String>>>,
        fail_setup: bool,
    }

    impl Recording {
        fn new(name: &'static str, deps: &[&'static str], log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                deps: deps.to_vec(),
                log: Arc::clone(log),
                fail_setup: false,
            })
        }

        fn failing(
            name: &'static str,
            deps: &[&'static str],
            log: &Arc<Mutex<Vec<String>>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                name,
                deps: deps.to_vec(),
                log: Arc::clone(log),
                fail_setup: true,
            })
        }
    }

    #[async_trait]
    impl ScenarioFixture for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn dependencies(&self) -> Vec<String> {
            self.deps.iter().map(ToString::to_string).collect()
        }

        async fn setup(&self, _session: &Arc<Session>) -> EnsayarResult<()> {
            self.log.lock().unwrap().push(format!("setup:{}", self.name));
            if self.fail_setup {
                return Err(EnsayarError::Driver {
                    message: format!("{} setup failed", self.name),
                });
            }
            Ok(())
        }

        async fn teardown(&self, _session: &Arc<Session>) -> EnsayarResult<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("teardown:{}", self.name));
            Ok(())
        }
    }

    fn sim_session() -> Arc<Session> {
        Session::sim(crate::environment::resolve(None))
    }

    mod registry_tests {
        use super::*;

        #[test]
        fn duplicate_names_are_rejected() {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut registry = ScenarioRegistry::new();
            registry.register(Recording::new("base", &[], &log)).unwrap();
            let err = registry
                .register(Recording::new("base", &[], &log))
                .unwrap_err();
            assert!(matches!(err, EnsayarError::ScenarioBuild { .. }));
        }

        #[test]
        fn unregistered_dependency_is_rejected() {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut registry = ScenarioRegistry::new();
            let err = registry
                .register(Recording::new("child", &["missing"], &log))
                .unwrap_err();
            assert!(err.to_string().contains("'missing' is not registered"));
        }

        #[test]
        fn self_dependency_is_rejected() {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut registry = ScenarioRegistry::new();
            let err = registry
                .register(Recording::new("loop", &["loop"], &log))
                .unwrap_err();
            assert!(err.to_string().contains("depends on itself"));
        }

        #[test]
        fn diamond_dependencies_resolve_each_definition_once() {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut registry = ScenarioRegistry::new();
            registry.register(Recording::new("a", &[], &log)).unwrap();
            registry.register(Recording::new("b", &["a"], &log)).unwrap();
            registry.register(Recording::new("c", &["a"], &log)).unwrap();
            registry
                .register(Recording::new("d", &["b", "c"], &log))
                .unwrap();

            let order: Vec<String> = registry
                .resolve("d")
                .unwrap()
                .iter()
                .map(|f| f.name().to_string())
                .collect();
            assert_eq!(order, vec!["a", "b", "c", "d"]);
        }
    }

    mod build_tests {
        use super::*;

        #[tokio::test]
        async fn builds_in_dependency_order_and_tears_down_in_reverse() {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut registry = ScenarioRegistry::new();
            registry.register(Recording::new("a", &[], &log)).unwrap();
            registry.register(Recording::new("b", &["a"], &log)).unwrap();

            let session = sim_session();
            let handle = registry.build("b", &session).await.unwrap();
            assert_eq!(handle.applied(), vec!["a", "b"]);
            handle.teardown().await.unwrap();

            let events = log.lock().unwrap().clone();
            assert_eq!(
                events,
                vec!["setup:a", "setup:b", "teardown:b", "teardown:a"]
            );
        }

        #[tokio::test]
        async fn failed_setup_unwinds_applied_fixtures() {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut registry = ScenarioRegistry::new();
            registry.register(Recording::new("a", &[], &log)).unwrap();
            registry
                .register(Recording::failing("broken", &["a"], &log))
                .unwrap();

            let session = sim_session();
            let err = registry.build("broken", &session).await.unwrap_err();
            assert!(err.to_string().contains("broken"));

            let events = log.lock().unwrap().clone();
            assert_eq!(events, vec!["setup:a", "setup:broken", "teardown:a"]);
        }

        #[tokio::test]
        async fn unknown_scenario_is_a_build_error() {
            let registry = ScenarioRegistry::new();
            let session = sim_session();
            let err = registry.build("nope", &session).await.unwrap_err();
            assert!(matches!(err, EnsayarError::ScenarioBuild { .. }));
        }
    }

    mod preset_tests {
        use super::*;
        use crate::session::SessionState;

        #[tokio::test]
        async fn checkout_ready_reaches_the_overview_step() {
            let registry = presets::registry().unwrap();
            let session = sim_session();
            let handle = registry
                .build(presets::CHECKOUT_READY, &session)
                .await
                .unwrap();
            assert_eq!(
                handle.applied(),
                vec![
                    presets::AUTHENTICATED,
                    presets::CART_WITH_ITEMS,
                    presets::CHECKOUT_READY
                ]
            );
            assert_eq!(session.state(), SessionState::CheckoutStep(2));
        }

        #[tokio::test]
        async fn built_scenario_hands_back_the_matching_pages() {
            let registry = presets::registry().unwrap();
            let session = sim_session();
            let handle = registry
                .build(presets::CART_WITH_ITEMS, &session)
                .await
                .unwrap();

            match handle.pages().unwrap() {
                ScenarioPages::CartPopulated { inventory, .. } => {
                    assert_eq!(inventory.cart_count().await.unwrap(), 1);
                }
                other => panic!("expected cart pages, got {other:?}"),
            }

            // Wrong-shape extraction is an explicit usage error
            let err = handle.pages().unwrap().into_overview().unwrap_err();
            assert!(matches!(err, EnsayarError::Usage { .. }));
        }

        #[tokio::test]
        async fn scenarios_do_not_leak_between_sessions() {
            let registry = presets::registry().unwrap();

            let first = sim_session();
            let _ = registry
                .build(presets::CART_WITH_ITEMS, &first)
                .await
                .unwrap();
            assert_eq!(first.state(), SessionState::CartPopulated(1));

            // A second session built from scratch sees none of it
            let second = sim_session();
            assert_eq!(second.state(), SessionState::Anonymous);
            assert_eq!(second.engine().rule_count(), 0);
            assert!(second.engine().captured_requests().is_empty());
        }
    }
}
