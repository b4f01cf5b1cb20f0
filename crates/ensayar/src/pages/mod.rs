//! Page objects for the demo storefront.
//!
//! Each page owns its locators and exposes behavior as semantic methods;
//! nothing outside this module touches selectors. Constructors check the
//! session's progress tag, so building a page the flow has not reached
//! yet fails loudly instead of timing out later.

mod cart;
mod checkout;
mod inventory;
mod login;

pub use cart::CartPage;
pub use checkout::{CheckoutCompletePage, CheckoutInfoPage, CheckoutOverviewPage};
pub use inventory::{InventoryPage, SortOption};
pub use login::LoginPage;

use crate::result::{EnsayarError, EnsayarResult};
use crate::session::Session;
use async_trait::async_trait;
use std::sync::Arc;

/// Common surface of every page object
#[async_trait]
pub trait Page: Send + Sync {
    /// Human-readable page name, used in errors and logs
    fn name(&self) -> &'static str;

    /// Path of this page under the session's base URL
    fn path(&self) -> &'static str;

    /// The owning session
    fn session(&self) -> &Arc<Session>;

    /// Navigate the session to this page
    async fn open(&self) -> EnsayarResult<()> {
        tracing::debug!(page = self.name(), path = self.path(), "opening page");
        self.session().goto(self.path()).await
    }

    /// Whether the session is currently on this page
    async fn is_current(&self) -> bool {
        self.session()
            .driver()
            .current_url()
            .await
            .ends_with(self.path())
    }
}

/// Parse a money amount out of a label like `"Item total: $39.98"`
pub(crate) fn parse_money(label: &str) -> EnsayarResult<f64> {
    let amount = label
        .split('$')
        .nth(1)
        .ok_or_else(|| EnsayarError::AssertionFailed {
            message: format!("no money amount in '{label}'"),
        })?;
    amount
        .trim()
        .parse::<f64>()
        .map_err(|_| EnsayarError::AssertionFailed {
            message: format!("unparseable money amount in '{label}'"),
        })
}
