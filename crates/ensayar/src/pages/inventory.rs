//! Product listing page.

use super::{parse_money, CartPage, Page};
use crate::locator::Locator;
use crate::result::EnsayarResult;
use crate::session::{Session, SessionState};
use async_trait::async_trait;
use std::sync::Arc;

/// Options of the product sort dropdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOption {
    /// Name A to Z
    NameAscending,
    /// Name Z to A
    NameDescending,
    /// Price low to high
    PriceAscending,
    /// Price high to low
    PriceDescending,
}

impl SortOption {
    /// The dropdown option value for this sort
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::NameAscending => "az",
            Self::NameDescending => "za",
            Self::PriceAscending => "lohi",
            Self::PriceDescending => "hilo",
        }
    }
}

/// The product grid shown after login
#[derive(Debug)]
pub struct InventoryPage {
    session: Arc<Session>,
    item_names: Locator,
    item_prices: Locator,
    sort_select: Locator,
    cart_badge: Locator,
    cart_link: Locator,
    load_error: Locator,
}

impl InventoryPage {
    /// Build the page; the session must be authenticated
    pub fn new(session: Arc<Session>) -> EnsayarResult<Self> {
        session.require(SessionState::Authenticated)?;
        Ok(Self {
            session,
            item_names: Locator::css(".inventory_item_name").named("product names"),
            item_prices: Locator::css(".inventory_item_price").named("product prices"),
            sort_select: Locator::test_id("product-sort-container").named("sort dropdown"),
            cart_badge: Locator::css(".shopping_cart_badge").named("cart badge"),
            cart_link: Locator::css(".shopping_cart_link").named("cart link"),
            load_error: Locator::test_id("error").named("load error banner"),
        })
    }

    /// Product names in display order
    pub async fn product_names(&self) -> EnsayarResult<Vec<String>> {
        self.session.driver().texts(&self.item_names).await
    }

    /// Name of the first product in display order
    pub async fn first_product_name(&self) -> EnsayarResult<String> {
        self.session.driver().text(&self.item_names).await
    }

    /// Number of products in the grid
    pub async fn product_count(&self) -> EnsayarResult<usize> {
        self.session.driver().count(&self.item_names).await
    }

    /// Product prices in display order
    pub async fn product_prices(&self) -> EnsayarResult<Vec<f64>> {
        let labels = self.session.driver().texts(&self.item_prices).await?;
        labels.iter().map(|label| parse_money(label)).collect()
    }

    /// Re-sort the product grid
    pub async fn sort_by(&self, option: SortOption) -> EnsayarResult<()> {
        self.session
            .driver()
            .select_option(&self.sort_select, option.value())
            .await
    }

    /// Put a product in the cart by its id, e.g. `"sauce-labs-bike-light"`
    pub async fn add_to_cart(&self, product_id: &str) -> EnsayarResult<()> {
        let button = Locator::test_id(format!("add-to-cart-{product_id}"))
            .named(format!("add '{product_id}' button"));
        self.session.driver().click(&button).await?;
        let count = self.cart_count().await?;
        self.session.set_state(SessionState::CartPopulated(count));
        Ok(())
    }

    /// Take a product back out of the cart
    pub async fn remove_from_cart(&self, product_id: &str) -> EnsayarResult<()> {
        let button = Locator::test_id(format!("remove-{product_id}"))
            .named(format!("remove '{product_id}' button"));
        self.session.driver().click(&button).await?;
        let count = self.cart_count().await?;
        if count == 0 {
            self.session.set_state(SessionState::Authenticated);
        } else {
            self.session.set_state(SessionState::CartPopulated(count));
        }
        Ok(())
    }

    /// Number shown on the cart badge; zero when the badge is hidden
    pub async fn cart_count(&self) -> EnsayarResult<usize> {
        let driver = self.session.driver();
        if !driver.is_visible(&self.cart_badge).await? {
            return Ok(0);
        }
        let text = driver.text(&self.cart_badge).await?;
        Ok(text.parse().unwrap_or(0))
    }

    /// The load error banner's text, if the product fetch failed
    pub async fn load_error(&self) -> EnsayarResult<Option<String>> {
        let driver = self.session.driver();
        if driver.is_visible(&self.load_error).await? {
            Ok(Some(driver.text(&self.load_error).await?))
        } else {
            Ok(None)
        }
    }

    /// Open the cart page
    pub async fn open_cart(&self) -> EnsayarResult<CartPage> {
        self.session.driver().click(&self.cart_link).await?;
        CartPage::new(Arc::clone(&self.session))
    }
}

#[async_trait]
impl Page for InventoryPage {
    fn name(&self) -> &'static str {
        "inventory"
    }

    fn path(&self) -> &'static str {
        "/inventory.html"
    }

    fn session(&self) -> &Arc<Session> {
        &self.session
    }
}
