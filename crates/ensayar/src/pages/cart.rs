//! Shopping cart page.

use super::{parse_money, CheckoutInfoPage, InventoryPage, Page};
use crate::locator::Locator;
use crate::result::EnsayarResult;
use crate::session::{Session, SessionState};
use async_trait::async_trait;
use std::sync::Arc;

/// The cart review page
#[derive(Debug)]
pub struct CartPage {
    session: Arc<Session>,
    item_names: Locator,
    item_prices: Locator,
    checkout_button: Locator,
    continue_shopping_button: Locator,
}

impl CartPage {
    /// Build the page; the session must be authenticated
    pub fn new(session: Arc<Session>) -> EnsayarResult<Self> {
        session.require(SessionState::Authenticated)?;
        Ok(Self {
            session,
            item_names: Locator::css(".inventory_item_name").named("cart item names"),
            item_prices: Locator::css(".inventory_item_price").named("cart item prices"),
            checkout_button: Locator::test_id("checkout").named("checkout button"),
            continue_shopping_button: Locator::test_id("continue-shopping")
                .named("continue shopping button"),
        })
    }

    /// Names of the products currently in the cart
    pub async fn item_names(&self) -> EnsayarResult<Vec<String>> {
        self.session.driver().texts(&self.item_names).await
    }

    /// Prices of the products currently in the cart, in line-item order
    pub async fn item_prices(&self) -> EnsayarResult<Vec<f64>> {
        let labels = self.session.driver().texts(&self.item_prices).await?;
        labels.iter().map(|label| parse_money(label)).collect()
    }

    /// Number of line items in the cart
    pub async fn item_count(&self) -> EnsayarResult<usize> {
        self.session.driver().count(&self.item_names).await
    }

    /// Whether the cart holds no items
    pub async fn is_empty(&self) -> EnsayarResult<bool> {
        Ok(self.item_count().await? == 0)
    }

    /// Take an item out of the cart
    pub async fn remove(&self, product_id: &str) -> EnsayarResult<()> {
        let button = Locator::test_id(format!("remove-{product_id}"))
            .named(format!("remove '{product_id}' button"));
        self.session.driver().click(&button).await
    }

    /// Start the checkout flow. The cart must hold at least one item.
    pub async fn checkout(&self) -> EnsayarResult<CheckoutInfoPage> {
        self.session.require(SessionState::CartPopulated(1))?;
        self.session.driver().click(&self.checkout_button).await?;
        self.session.set_state(SessionState::CheckoutStep(1));
        CheckoutInfoPage::new(Arc::clone(&self.session))
    }

    /// Go back to the product grid
    pub async fn continue_shopping(&self) -> EnsayarResult<InventoryPage> {
        self.session
            .driver()
            .click(&self.continue_shopping_button)
            .await?;
        InventoryPage::new(Arc::clone(&self.session))
    }
}

#[async_trait]
impl Page for CartPage {
    fn name(&self) -> &'static str {
        "cart"
    }

    fn path(&self) -> &'static str {
        "/cart.html"
    }

    fn session(&self) -> &Arc<Session> {
        &self.session
    }
}
