//! Checkout flow pages: information, overview, confirmation.

use super::{parse_money, InventoryPage, Page};
use crate::catalog::CheckoutInfo;
use crate::locator::Locator;
use crate::result::EnsayarResult;
use crate::session::{Session, SessionState};
use async_trait::async_trait;
use std::sync::Arc;

/// Checkout step one: buyer information form
#[derive(Debug)]
pub struct CheckoutInfoPage {
    session: Arc<Session>,
    first_name_input: Locator,
    last_name_input: Locator,
    postal_code_input: Locator,
    continue_button: Locator,
    cancel_button: Locator,
    error_banner: Locator,
}

impl CheckoutInfoPage {
    /// Build the page; the cart must hold at least one item
    pub fn new(session: Arc<Session>) -> EnsayarResult<Self> {
        session.require(SessionState::CartPopulated(1))?;
        Ok(Self {
            session,
            first_name_input: Locator::test_id("firstName").named("first name input"),
            last_name_input: Locator::test_id("lastName").named("last name input"),
            postal_code_input: Locator::test_id("postalCode").named("postal code input"),
            continue_button: Locator::test_id("continue").named("continue button"),
            cancel_button: Locator::test_id("cancel").named("cancel button"),
            error_banner: Locator::test_id("error").named("error banner"),
        })
    }

    /// Fill the buyer information form
    pub async fn fill_info(&self, info: &CheckoutInfo) -> EnsayarResult<()> {
        let driver = self.session.driver();
        driver.fill(&self.first_name_input, &info.first_name).await?;
        driver.fill(&self.last_name_input, &info.last_name).await?;
        driver
            .fill(&self.postal_code_input, &info.postal_code)
            .await
    }

    /// Fill the form with the standard test buyer
    pub async fn fill_with_test_data(&self) -> EnsayarResult<()> {
        self.fill_info(&CheckoutInfo::test_data()).await
    }

    /// Which checkout step the session is on, when it is in the flow
    #[must_use]
    pub fn current_step(&self) -> Option<u8> {
        match self.session.state() {
            SessionState::CheckoutStep(step) => Some(step),
            _ => None,
        }
    }

    /// The validation banner's text, if one is displayed
    pub async fn error_message(&self) -> EnsayarResult<Option<String>> {
        let driver = self.session.driver();
        if driver.is_visible(&self.error_banner).await? {
            Ok(Some(driver.text(&self.error_banner).await?))
        } else {
            Ok(None)
        }
    }

    /// Submit the form and move to the order overview
    pub async fn continue_to_overview(&self) -> EnsayarResult<CheckoutOverviewPage> {
        self.session.driver().click(&self.continue_button).await?;
        if let Some(banner) = self.error_message().await? {
            return Err(crate::result::EnsayarError::AssertionFailed {
                message: format!("checkout information rejected: {banner}"),
            });
        }
        self.session.set_state(SessionState::CheckoutStep(2));
        CheckoutOverviewPage::new(Arc::clone(&self.session))
    }

    /// Abandon checkout and return to the cart
    pub async fn cancel(&self) -> EnsayarResult<()> {
        self.session.driver().click(&self.cancel_button).await
    }
}

#[async_trait]
impl Page for CheckoutInfoPage {
    fn name(&self) -> &'static str {
        "checkout information"
    }

    fn path(&self) -> &'static str {
        "/checkout-step-one.html"
    }

    fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

/// Checkout step two: order overview with totals
#[derive(Debug)]
pub struct CheckoutOverviewPage {
    session: Arc<Session>,
    item_names: Locator,
    subtotal_label: Locator,
    tax_label: Locator,
    total_label: Locator,
    finish_button: Locator,
    cancel_button: Locator,
}

impl CheckoutOverviewPage {
    /// Build the page; the session must have reached checkout step two
    pub fn new(session: Arc<Session>) -> EnsayarResult<Self> {
        session.require(SessionState::CheckoutStep(2))?;
        Ok(Self {
            session,
            item_names: Locator::css(".inventory_item_name").named("order item names"),
            subtotal_label: Locator::test_id("subtotal-label").named("subtotal label"),
            tax_label: Locator::test_id("tax-label").named("tax label"),
            total_label: Locator::test_id("total-label").named("total label"),
            finish_button: Locator::test_id("finish").named("finish button"),
            cancel_button: Locator::test_id("cancel").named("cancel button"),
        })
    }

    /// Names of the products in the order
    pub async fn item_names(&self) -> EnsayarResult<Vec<String>> {
        self.session.driver().texts(&self.item_names).await
    }

    /// Which checkout step the session is on, when it is in the flow
    #[must_use]
    pub fn current_step(&self) -> Option<u8> {
        match self.session.state() {
            SessionState::CheckoutStep(step) => Some(step),
            _ => None,
        }
    }

    /// Item total before tax
    pub async fn subtotal(&self) -> EnsayarResult<f64> {
        let label = self.session.driver().text(&self.subtotal_label).await?;
        parse_money(&label)
    }

    /// Tax amount
    pub async fn tax(&self) -> EnsayarResult<f64> {
        let label = self.session.driver().text(&self.tax_label).await?;
        parse_money(&label)
    }

    /// Grand total
    pub async fn total(&self) -> EnsayarResult<f64> {
        let label = self.session.driver().text(&self.total_label).await?;
        parse_money(&label)
    }

    /// Place the order
    pub async fn finish(&self) -> EnsayarResult<CheckoutCompletePage> {
        self.session.driver().click(&self.finish_button).await?;
        // Order placed, cart is empty again
        self.session.set_state(SessionState::Authenticated);
        Ok(CheckoutCompletePage::new(Arc::clone(&self.session)))
    }

    /// Abandon checkout and return to the product grid
    pub async fn cancel(&self) -> EnsayarResult<()> {
        self.session.driver().click(&self.cancel_button).await
    }
}

#[async_trait]
impl Page for CheckoutOverviewPage {
    fn name(&self) -> &'static str {
        "checkout overview"
    }

    fn path(&self) -> &'static str {
        "/checkout-step-two.html"
    }

    fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

/// Order confirmation page
#[derive(Debug)]
pub struct CheckoutCompletePage {
    session: Arc<Session>,
    header: Locator,
    back_button: Locator,
}

impl CheckoutCompletePage {
    /// Build the page
    #[must_use]
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            header: Locator::test_id("complete-header").named("confirmation header"),
            back_button: Locator::test_id("back-to-products").named("back to products button"),
        }
    }

    /// The confirmation header text
    pub async fn confirmation(&self) -> EnsayarResult<String> {
        self.session.driver().text(&self.header).await
    }

    /// Whether the order confirmation is actually displayed
    pub async fn is_order_complete(&self) -> EnsayarResult<bool> {
        Ok(self.is_current().await && self.session.driver().is_visible(&self.header).await?)
    }

    /// Return to the product grid
    pub async fn back_to_products(&self) -> EnsayarResult<InventoryPage> {
        self.session.driver().click(&self.back_button).await?;
        InventoryPage::new(Arc::clone(&self.session))
    }
}

#[async_trait]
impl Page for CheckoutCompletePage {
    fn name(&self) -> &'static str {
        "checkout complete"
    }

    fn path(&self) -> &'static str {
        "/checkout-complete.html"
    }

    fn session(&self) -> &Arc<Session> {
        &self.session
    }
}
