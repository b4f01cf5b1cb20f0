//! Login page.

use super::{InventoryPage, Page};
use crate::environment::Profile;
use crate::locator::Locator;
use crate::result::{EnsayarError, EnsayarResult};
use crate::session::{Session, SessionState};
use async_trait::async_trait;
use std::sync::Arc;

/// The store's login form
#[derive(Debug)]
pub struct LoginPage {
    session: Arc<Session>,
    username_input: Locator,
    password_input: Locator,
    login_button: Locator,
    error_banner: Locator,
    error_close_button: Locator,
}

impl LoginPage {
    /// Build the page. Available in any session state.
    #[must_use]
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            username_input: Locator::test_id("user-name").named("username input"),
            password_input: Locator::test_id("password").named("password input"),
            login_button: Locator::test_id("login-button").named("login button"),
            error_banner: Locator::test_id("error").named("error banner"),
            error_close_button: Locator::test_id("error-button").named("error close button"),
        }
    }

    /// Dismiss the error banner
    pub async fn close_error(&self) -> EnsayarResult<()> {
        self.session.driver().click(&self.error_close_button).await
    }

    /// Submit the login form with raw credentials
    pub async fn login(&self, username: &str, password: &str) -> EnsayarResult<()> {
        let driver = self.session.driver();
        driver.fill(&self.username_input, username).await?;
        driver.fill(&self.password_input, password).await?;
        driver.click(&self.login_button).await
    }

    /// The error banner's text, if one is displayed
    pub async fn error_message(&self) -> EnsayarResult<Option<String>> {
        let driver = self.session.driver();
        if driver.is_visible(&self.error_banner).await? {
            Ok(Some(driver.text(&self.error_banner).await?))
        } else {
            Ok(None)
        }
    }

    /// Log in as a known profile and land on the inventory page.
    ///
    /// A rejected login (locked-out profile, banner shown) is an error
    /// carrying the banner text; use [`Self::login`] plus
    /// [`Self::error_message`] to assert on rejection paths instead.
    pub async fn login_as(&self, profile: Profile) -> EnsayarResult<InventoryPage> {
        let credentials = profile.credentials();
        tracing::info!(username = credentials.username, "logging in");
        self.login(credentials.username, credentials.password)
            .await?;

        // Still on the login page means the attempt was rejected
        if self.is_current().await {
            let banner = self
                .error_message()
                .await?
                .unwrap_or_else(|| "no error banner shown".to_string());
            return Err(EnsayarError::AssertionFailed {
                message: format!("login as '{}' rejected: {banner}", credentials.username),
            });
        }

        self.session.set_state(SessionState::Authenticated);
        InventoryPage::new(Arc::clone(&self.session))
    }
}

#[async_trait]
impl Page for LoginPage {
    fn name(&self) -> &'static str {
        "login"
    }

    fn path(&self) -> &'static str {
        "/"
    }

    fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment;

    fn fresh_page() -> LoginPage {
        LoginPage::new(Session::sim(environment::resolve(None)))
    }

    #[tokio::test]
    async fn successful_login_yields_the_inventory_page() {
        let page = fresh_page();
        page.open().await.unwrap();
        let inventory = page.login_as(Profile::Standard).await.unwrap();
        assert!(inventory.is_current().await);
        assert_eq!(page.session().state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn locked_out_profile_is_rejected_with_the_banner_text() {
        let page = fresh_page();
        page.open().await.unwrap();
        let err = page.login_as(Profile::LockedOut).await.unwrap_err();
        assert!(err.to_string().contains("locked out"));
        assert_eq!(page.session().state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn rejection_path_exposes_the_banner() {
        let page = fresh_page();
        page.open().await.unwrap();
        page.login("standard_user", "not-the-password").await.unwrap();
        let banner = page.error_message().await.unwrap();
        assert!(banner.unwrap().contains("do not match any user"));
    }

    #[tokio::test]
    async fn closed_error_banner_disappears() {
        let page = fresh_page();
        page.open().await.unwrap();
        page.login("standard_user", "not-the-password").await.unwrap();
        assert!(page.error_message().await.unwrap().is_some());

        page.close_error().await.unwrap();
        assert_eq!(page.error_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn no_banner_before_any_attempt() {
        let page = fresh_page();
        page.open().await.unwrap();
        assert_eq!(page.error_message().await.unwrap(), None);
    }
}
