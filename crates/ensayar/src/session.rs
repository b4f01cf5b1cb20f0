//! Test sessions.
//!
//! A [`Session`] bundles one driver, one interception engine, and the
//! progress tag page objects check before acting. Every test gets a fresh
//! session; dropping it discards cookies, cart state, interception rules,
//! and captured traffic in one move, which is what keeps tests isolated.

use crate::driver::{AutomationDriver, SimDriver};
use crate::environment::Target;
use crate::intercept::{InterceptionEngine, Rule};
use crate::result::{EnsayarError, EnsayarResult};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// How far through the store flow a session has progressed.
///
/// Page objects require a minimum state at construction, so using a page
/// out of order fails with a [`EnsayarError::Usage`] instead of a vague
/// timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not logged in
    Anonymous,
    /// Logged in, cart empty
    Authenticated,
    /// Logged in with N items in the cart
    CartPopulated(usize),
    /// In the checkout flow, at step K (1-based)
    CheckoutStep(u8),
}

impl SessionState {
    const fn rank(self) -> u8 {
        match self {
            Self::Anonymous => 0,
            Self::Authenticated => 1,
            Self::CartPopulated(_) => 2,
            Self::CheckoutStep(_) => 3,
        }
    }

    /// Whether a session in this state meets a page's requirement.
    /// Later states satisfy earlier requirements; a populated-cart
    /// requirement additionally needs at least the required item count.
    #[must_use]
    pub fn satisfies(self, required: Self) -> bool {
        match (self, required) {
            (Self::CartPopulated(have), Self::CartPopulated(need)) => have >= need,
            (Self::CheckoutStep(have), Self::CheckoutStep(need)) => have >= need,
            _ => self.rank() >= required.rank(),
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::CartPopulated(n) => write!(f, "cart with {n} item(s)"),
            Self::CheckoutStep(k) => write!(f, "checkout step {k}"),
        }
    }
}

/// One test's isolated browser context
pub struct Session {
    id: Uuid,
    target: Target,
    driver: Box<dyn AutomationDriver>,
    engine: Arc<InterceptionEngine>,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session from a target and a driver. A fresh interception
    /// engine is created and installed into the driver here, so rules
    /// registered on this session never affect any other.
    #[must_use]
    pub fn new(target: Target, driver: Box<dyn AutomationDriver>) -> Arc<Self> {
        let engine = Arc::new(InterceptionEngine::new());
        driver.install_interception(Arc::clone(&engine));
        let session = Self {
            id: Uuid::new_v4(),
            target,
            driver,
            engine,
            state: Mutex::new(SessionState::Anonymous),
        };
        tracing::debug!(session = %session.id, env = %session.target.env, "session created");
        Arc::new(session)
    }

    /// Create a session backed by the in-process storefront simulation
    #[must_use]
    pub fn sim(target: Target) -> Arc<Self> {
        let driver = Box::new(SimDriver::new(&target.base_url));
        Self::new(target, driver)
    }

    /// Unique session id
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The environment target this session points at
    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    /// The session's driver
    #[must_use]
    pub fn driver(&self) -> &dyn AutomationDriver {
        self.driver.as_ref()
    }

    /// The session's interception engine, for observation assertions
    #[must_use]
    pub fn engine(&self) -> &Arc<InterceptionEngine> {
        &self.engine
    }

    /// Register an interception rule on this session
    pub fn intercept(&self, rule: Rule) -> EnsayarResult<()> {
        self.engine.register(rule)
    }

    /// Current progress tag
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /// Record a progress transition
    pub fn set_state(&self, state: SessionState) {
        tracing::debug!(session = %self.id, %state, "session state");
        *self.state.lock().unwrap() = state;
    }

    /// Fail with a [`EnsayarError::Usage`] unless the session has reached
    /// the required state
    pub fn require(&self, required: SessionState) -> EnsayarResult<()> {
        let current = self.state();
        if current.satisfies(required) {
            Ok(())
        } else {
            Err(EnsayarError::Usage {
                message: format!("session is {current}, but this page requires {required}"),
            })
        }
    }

    /// Explicitly destroy the session: the browser context is discarded
    /// and every interception rule and captured request goes with it.
    /// Dropping the session has the same effect; this is for tests that
    /// need teardown before the end of scope.
    pub async fn close(&self) -> EnsayarResult<()> {
        tracing::debug!(session = %self.id, "closing session");
        self.driver.close().await?;
        self.engine.clear_rules();
        self.engine.clear_captured();
        self.set_state(SessionState::Anonymous);
        Ok(())
    }

    /// Navigate to a path under the session's base URL
    pub async fn goto(&self, path: &str) -> EnsayarResult<()> {
        let url = format!("{}{path}", self.target.base_url);
        self.driver.goto(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment;

    mod state_tests {
        use super::*;

        #[test]
        fn later_states_satisfy_earlier_requirements() {
            assert!(SessionState::Authenticated.satisfies(SessionState::Anonymous));
            assert!(SessionState::CartPopulated(1).satisfies(SessionState::Authenticated));
            assert!(SessionState::CheckoutStep(2).satisfies(SessionState::CartPopulated(1)));
        }

        #[test]
        fn earlier_states_do_not_satisfy_later_requirements() {
            assert!(!SessionState::Anonymous.satisfies(SessionState::Authenticated));
            assert!(!SessionState::Authenticated.satisfies(SessionState::CartPopulated(1)));
        }

        #[test]
        fn cart_requirement_checks_item_count() {
            assert!(SessionState::CartPopulated(3).satisfies(SessionState::CartPopulated(2)));
            assert!(!SessionState::CartPopulated(1).satisfies(SessionState::CartPopulated(2)));
        }
    }

    mod session_tests {
        use super::*;

        #[test]
        fn fresh_session_is_anonymous_with_no_rules() {
            let session = Session::sim(environment::resolve(None));
            assert_eq!(session.state(), SessionState::Anonymous);
            assert_eq!(session.engine().rule_count(), 0);
            assert!(session.engine().captured_requests().is_empty());
        }

        #[test]
        fn sessions_have_distinct_ids() {
            let a = Session::sim(environment::resolve(None));
            let b = Session::sim(environment::resolve(None));
            assert_ne!(a.id(), b.id());
        }

        #[test]
        fn require_names_both_states() {
            let session = Session::sim(environment::resolve(None));
            let err = session
                .require(SessionState::CartPopulated(1))
                .unwrap_err();
            let message = err.to_string();
            assert!(message.contains("anonymous"));
            assert!(message.contains("cart with 1 item(s)"));
        }

        #[tokio::test]
        async fn close_discards_rules_and_state() {
            let session = Session::sim(environment::resolve(None));
            session
                .intercept(crate::intercept::Rule::observe(
                    crate::intercept::UrlPattern::Any,
                ))
                .unwrap();
            session.set_state(SessionState::Authenticated);

            session.close().await.unwrap();

            assert_eq!(session.state(), SessionState::Anonymous);
            assert_eq!(session.engine().rule_count(), 0);
            assert!(session.engine().captured_requests().is_empty());
        }

        #[tokio::test]
        async fn goto_is_relative_to_the_target() {
            let session = Session::sim(environment::resolve(Some("local")));
            session.goto("/").await.unwrap();
            assert_eq!(session.driver().current_url().await, "http://localhost:3000/");
        }
    }
}
