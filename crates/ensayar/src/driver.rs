//! Browser automation driver abstraction.
//!
//! Page objects talk to an [`AutomationDriver`], never to a concrete
//! browser. [`SimDriver`] is the in-process implementation: a
//! deterministic simulation of the demo storefront whose network traffic
//! flows through the session's [`InterceptionEngine`], so every mocking
//! and blocking behavior is exercisable without a real browser or
//! backend.

use crate::catalog::{self, Product};
use crate::environment;
use crate::intercept::{HttpMethod, InterceptionEngine, MockResponse, RequestView};
use crate::locator::Locator;
use crate::result::{EnsayarError, EnsayarResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Driver operations page objects are written against
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Navigate to a URL (absolute, or a path under the base URL)
    async fn goto(&self, url: &str) -> EnsayarResult<()>;

    /// Current URL
    async fn current_url(&self) -> String;

    /// Fill an input element
    async fn fill(&self, locator: &Locator, value: &str) -> EnsayarResult<()>;

    /// Click an element
    async fn click(&self, locator: &Locator) -> EnsayarResult<()>;

    /// Select an option in a dropdown by value
    async fn select_option(&self, locator: &Locator, value: &str) -> EnsayarResult<()>;

    /// Text content of the first matching element
    async fn text(&self, locator: &Locator) -> EnsayarResult<String>;

    /// Text content of every matching element, in document order
    async fn texts(&self, locator: &Locator) -> EnsayarResult<Vec<String>>;

    /// Number of matching elements
    async fn count(&self, locator: &Locator) -> EnsayarResult<usize> {
        Ok(self.texts(locator).await?.len())
    }

    /// Whether any matching element is currently visible
    async fn is_visible(&self, locator: &Locator) -> EnsayarResult<bool>;

    /// Install the session's interception engine. All network activity the
    /// driver performs afterwards resolves through it.
    fn install_interception(&self, engine: Arc<InterceptionEngine>);

    /// Discard the browser context: cookies, form state, and the current
    /// page are gone. The driver may be reused afterwards as if freshly
    /// created.
    async fn close(&self) -> EnsayarResult<()>;
}

/// Login error banners, matching the demo site verbatim
mod banners {
    pub const LOCKED_OUT: &str = "Epic sadface: Sorry, this user has been locked out.";
    pub const BAD_CREDENTIALS: &str =
        "Epic sadface: Username and password do not match any user in this service";
    pub const USERNAME_REQUIRED: &str = "Epic sadface: Username is required";
    pub const PASSWORD_REQUIRED: &str = "Epic sadface: Password is required";
    pub const FIRST_NAME_REQUIRED: &str = "Error: First Name is required";
    pub const LAST_NAME_REQUIRED: &str = "Error: Last Name is required";
    pub const POSTAL_CODE_REQUIRED: &str = "Error: Postal Code is required";
    pub const PRODUCTS_UNAVAILABLE: &str = "Unable to load products";
}

/// Inventory sort orders, keyed by the sort dropdown's option values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortOrder {
    NameAsc,
    NameDesc,
    PriceAsc,
    PriceDesc,
}

impl SortOrder {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "az" => Some(Self::NameAsc),
            "za" => Some(Self::NameDesc),
            "lohi" => Some(Self::PriceAsc),
            "hilo" => Some(Self::PriceDesc),
            _ => None,
        }
    }

    fn apply(self, products: &mut [Product]) {
        match self {
            Self::NameAsc => products.sort_by(|a, b| a.name.cmp(&b.name)),
            Self::NameDesc => products.sort_by(|a, b| b.name.cmp(&a.name)),
            Self::PriceAsc => products.sort_by(|a, b| a.price.total_cmp(&b.price)),
            Self::PriceDesc => products.sort_by(|a, b| b.price.total_cmp(&a.price)),
        }
    }
}

/// What a click does, decided while the state lock is held and executed
/// after it is released (navigation may await a network fetch)
enum ClickEffect {
    Settled,
    Navigate(String),
}

#[derive(Debug)]
struct SimState {
    base_url: String,
    path: String,
    logged_in: Option<String>,
    glitch: bool,
    error_banner: Option<String>,
    form: HashMap<String, String>,
    inventory: Vec<Product>,
    sort: SortOrder,
    cart: Vec<String>,
}

/// Deterministic in-process storefront simulation
pub struct SimDriver {
    state: Mutex<SimState>,
    engine: Mutex<Option<Arc<InterceptionEngine>>>,
}

impl std::fmt::Debug for SimDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimDriver")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Extract the id from a `[data-test="..."]` selector
fn test_id(css: &str) -> Option<&str> {
    css.strip_prefix("[data-test=\"")
        .and_then(|rest| rest.strip_suffix("\"]"))
}

fn not_ready(state: &SimState, locator: &Locator) -> EnsayarError {
    EnsayarError::ElementNotReady {
        page: state.path.clone(),
        field: locator.field_name(),
        ms: locator.timeout_ms(),
    }
}

impl SimDriver {
    /// Create a driver rooted at a base URL
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            state: Mutex::new(SimState {
                base_url: base_url.trim_end_matches('/').to_string(),
                path: "/".to_string(),
                logged_in: None,
                glitch: false,
                error_banner: None,
                form: HashMap::new(),
                inventory: Vec::new(),
                sort: SortOrder::NameAsc,
                cart: Vec::new(),
            }),
            engine: Mutex::new(None),
        }
    }

    /// Resolve a fetch through the interception engine; `fallback` stands
    /// in for the real backend response when no rule claims the request.
    async fn fetch(
        &self,
        url: String,
        method: HttpMethod,
        fallback: MockResponse,
    ) -> EnsayarResult<MockResponse> {
        let engine = self.engine.lock().unwrap().clone();
        let view = RequestView::new(&url, method, None);
        match engine {
            Some(engine) => engine.resolve(view, || async move { Ok(fallback) }).await,
            None => Ok(fallback),
        }
    }

    /// Load a path, performing whatever network activity that page does
    async fn load_path(&self, path: String) -> EnsayarResult<()> {
        let (base_url, glitch, logged_in) = {
            let state = self.state.lock().unwrap();
            (
                state.base_url.clone(),
                state.glitch,
                state.logged_in.is_some(),
            )
        };

        if path != "/" && !logged_in {
            let mut state = self.state.lock().unwrap();
            state.path = "/".to_string();
            state.error_banner = Some(format!(
                "Epic sadface: You can only access '{path}' when you are logged in."
            ));
            return Ok(());
        }

        // Simulated backend latency for the glitchy profile
        if glitch {
            tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        }

        if path == "/inventory.html" {
            let products = self
                .fetch(
                    format!("{base_url}/api/products"),
                    HttpMethod::Get,
                    MockResponse::json(&catalog::all())?,
                )
                .await?;

            // Analytics beacon: blockable, and its failure never breaks the page
            if let Err(e) = self
                .fetch(
                    format!("{base_url}/analytics/collect"),
                    HttpMethod::Post,
                    MockResponse::new(),
                )
                .await
            {
                tracing::debug!(error = %e, "analytics beacon dropped");
            }

            let mut state = self.state.lock().unwrap();
            if products.is_ok() {
                state.inventory = products.body_json()?;
                state.error_banner = None;
            } else {
                tracing::warn!(status = products.status, "products request failed");
                state.inventory.clear();
                state.error_banner = Some(banners::PRODUCTS_UNAVAILABLE.to_string());
            }
            let sort = state.sort;
            sort.apply(&mut state.inventory);
            state.path = path;
        } else {
            let mut state = self.state.lock().unwrap();
            state.path = path;
            state.error_banner = None;
        }
        Ok(())
    }

    fn price_of(state: &SimState, id: &str) -> f64 {
        state
            .inventory
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.price)
            .or_else(|| catalog::by_id(id).map(|p| p.price))
            .unwrap_or(0.0)
    }

    fn name_of(state: &SimState, id: &str) -> String {
        state
            .inventory
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.clone())
            .or_else(|| catalog::by_id(id).map(|p| p.name))
            .unwrap_or_else(|| id.to_string())
    }

    fn cart_subtotal(state: &SimState) -> f64 {
        state.cart.iter().map(|id| Self::price_of(state, id)).sum()
    }

    /// Decide the effect of a click while holding the state lock
    fn apply_click(state: &mut SimState, locator: &Locator) -> EnsayarResult<ClickEffect> {
        let css = locator.selector().to_css();

        if css == ".shopping_cart_link" {
            return Ok(ClickEffect::Navigate("/cart.html".to_string()));
        }

        let Some(id) = test_id(&css) else {
            return Err(not_ready(state, locator));
        };

        if id == "error-button" {
            if state.error_banner.take().is_none() {
                return Err(not_ready(state, locator));
            }
            return Ok(ClickEffect::Settled);
        }

        if let Some(product) = id.strip_prefix("add-to-cart-") {
            if state.path != "/inventory.html" || state.cart.iter().any(|c| c == product) {
                return Err(not_ready(state, locator));
            }
            state.cart.push(product.to_string());
            return Ok(ClickEffect::Settled);
        }

        if let Some(product) = id.strip_prefix("remove-") {
            let before = state.cart.len();
            state.cart.retain(|c| c != product);
            if state.cart.len() == before {
                return Err(not_ready(state, locator));
            }
            return Ok(ClickEffect::Settled);
        }

        match (state.path.as_str(), id) {
            ("/", "login-button") => {
                let username = state.form.get("user-name").cloned().unwrap_or_default();
                let password = state.form.get("password").cloned().unwrap_or_default();
                if username.is_empty() {
                    state.error_banner = Some(banners::USERNAME_REQUIRED.to_string());
                    return Ok(ClickEffect::Settled);
                }
                if password.is_empty() {
                    state.error_banner = Some(banners::PASSWORD_REQUIRED.to_string());
                    return Ok(ClickEffect::Settled);
                }
                let known = environment::KNOWN_PROFILES
                    .iter()
                    .map(|p| p.credentials())
                    .find(|c| c.username == username && c.password == password);
                match known {
                    None => {
                        state.error_banner = Some(banners::BAD_CREDENTIALS.to_string());
                        Ok(ClickEffect::Settled)
                    }
                    Some(_) if username == "locked_out_user" => {
                        state.error_banner = Some(banners::LOCKED_OUT.to_string());
                        Ok(ClickEffect::Settled)
                    }
                    Some(_) => {
                        state.logged_in = Some(username.clone());
                        state.glitch = username == "performance_glitch_user";
                        state.error_banner = None;
                        Ok(ClickEffect::Navigate("/inventory.html".to_string()))
                    }
                }
            }
            ("/cart.html", "checkout") => {
                Ok(ClickEffect::Navigate("/checkout-step-one.html".to_string()))
            }
            ("/cart.html", "continue-shopping") => {
                Ok(ClickEffect::Navigate("/inventory.html".to_string()))
            }
            ("/checkout-step-one.html", "continue") => {
                let missing = ["firstName", "lastName", "postalCode"]
                    .iter()
                    .find(|key| state.form.get(**key).map_or(true, String::is_empty));
                match missing {
                    Some(&"firstName") => {
                        state.error_banner = Some(banners::FIRST_NAME_REQUIRED.to_string());
                        Ok(ClickEffect::Settled)
                    }
                    Some(&"lastName") => {
                        state.error_banner = Some(banners::LAST_NAME_REQUIRED.to_string());
                        Ok(ClickEffect::Settled)
                    }
                    Some(_) => {
                        state.error_banner = Some(banners::POSTAL_CODE_REQUIRED.to_string());
                        Ok(ClickEffect::Settled)
                    }
                    None => Ok(ClickEffect::Navigate("/checkout-step-two.html".to_string())),
                }
            }
            ("/checkout-step-one.html", "cancel") => {
                Ok(ClickEffect::Navigate("/cart.html".to_string()))
            }
            ("/checkout-step-two.html", "cancel") => {
                Ok(ClickEffect::Navigate("/inventory.html".to_string()))
            }
            ("/checkout-step-two.html", "finish") => {
                state.cart.clear();
                Ok(ClickEffect::Navigate("/checkout-complete.html".to_string()))
            }
            ("/checkout-complete.html", "back-to-products") => {
                Ok(ClickEffect::Navigate("/inventory.html".to_string()))
            }
            _ => Err(not_ready(state, locator)),
        }
    }

    fn element_text(state: &SimState, css: &str) -> Option<String> {
        if css == "[data-test=\"error\"]" {
            return state.error_banner.clone();
        }
        if css == ".shopping_cart_badge" {
            return (!state.cart.is_empty()).then(|| state.cart.len().to_string());
        }
        if css == ".title" {
            let title = match state.path.as_str() {
                "/inventory.html" => "Products",
                "/cart.html" => "Your Cart",
                "/checkout-step-one.html" => "Checkout: Your Information",
                "/checkout-step-two.html" => "Checkout: Overview",
                "/checkout-complete.html" => "Checkout: Complete!",
                _ => return None,
            };
            return Some(title.to_string());
        }

        match (state.path.as_str(), css) {
            ("/checkout-complete.html", "[data-test=\"complete-header\"]") => {
                Some("Thank you for your order!".to_string())
            }
            ("/checkout-step-two.html", "[data-test=\"subtotal-label\"]") => Some(format!(
                "Item total: {}",
                catalog::format_price(Self::cart_subtotal(state))
            )),
            ("/checkout-step-two.html", "[data-test=\"tax-label\"]") => Some(format!(
                "Tax: {}",
                catalog::format_price(catalog::tax(Self::cart_subtotal(state)))
            )),
            ("/checkout-step-two.html", "[data-test=\"total-label\"]") => {
                let subtotal = Self::cart_subtotal(state);
                Some(format!(
                    "Total: {}",
                    catalog::format_price(subtotal + catalog::tax(subtotal))
                ))
            }
            _ => None,
        }
    }

    fn element_texts(state: &SimState, css: &str) -> Option<Vec<String>> {
        let on_inventory = state.path == "/inventory.html";
        let listing_cart = matches!(
            state.path.as_str(),
            "/cart.html" | "/checkout-step-two.html"
        );

        match css {
            ".inventory_item_name" if on_inventory => {
                Some(state.inventory.iter().map(|p| p.name.clone()).collect())
            }
            ".inventory_item_name" if listing_cart => Some(
                state
                    .cart
                    .iter()
                    .map(|id| Self::name_of(state, id))
                    .collect(),
            ),
            ".inventory_item_price" if on_inventory => Some(
                state
                    .inventory
                    .iter()
                    .map(|p| catalog::format_price(p.price))
                    .collect(),
            ),
            ".inventory_item_price" if listing_cart => Some(
                state
                    .cart
                    .iter()
                    .map(|id| catalog::format_price(Self::price_of(state, id)))
                    .collect(),
            ),
            _ => None,
        }
    }

    fn control_visible(state: &SimState, css: &str) -> bool {
        if css == ".shopping_cart_link" {
            return state.logged_in.is_some();
        }
        let Some(id) = test_id(css) else {
            return false;
        };
        if id == "error-button" {
            return state.error_banner.is_some();
        }
        if let Some(product) = id.strip_prefix("add-to-cart-") {
            return state.path == "/inventory.html"
                && state.inventory.iter().any(|p| p.id == product)
                && !state.cart.iter().any(|c| c == product);
        }
        if let Some(product) = id.strip_prefix("remove-") {
            return matches!(state.path.as_str(), "/inventory.html" | "/cart.html")
                && state.cart.iter().any(|c| c == product);
        }
        match (state.path.as_str(), id) {
            ("/", "user-name" | "password" | "login-button") => true,
            ("/inventory.html", "product-sort-container") => true,
            ("/cart.html", "checkout" | "continue-shopping") => true,
            (
                "/checkout-step-one.html",
                "firstName" | "lastName" | "postalCode" | "continue" | "cancel",
            ) => true,
            ("/checkout-step-two.html", "finish" | "cancel") => true,
            ("/checkout-complete.html", "back-to-products") => true,
            _ => false,
        }
    }
}

#[async_trait]
impl AutomationDriver for SimDriver {
    async fn goto(&self, url: &str) -> EnsayarResult<()> {
        let path = {
            let state = self.state.lock().unwrap();
            url.strip_prefix(&state.base_url)
                .unwrap_or(url)
                .to_string()
        };
        let path = if path.is_empty() { "/".to_string() } else { path };
        if !path.starts_with('/') {
            return Err(EnsayarError::Navigation {
                url: url.to_string(),
                message: "URL is outside the session's base URL".to_string(),
            });
        }
        self.load_path(path).await
    }

    async fn current_url(&self) -> String {
        let state = self.state.lock().unwrap();
        if state.path == "/" {
            format!("{}/", state.base_url)
        } else {
            format!("{}{}", state.base_url, state.path)
        }
    }

    async fn fill(&self, locator: &Locator, value: &str) -> EnsayarResult<()> {
        let mut state = self.state.lock().unwrap();
        let css = locator.selector().to_css();
        let fillable = test_id(&css).is_some_and(|id| {
            matches!(
                (state.path.as_str(), id),
                ("/", "user-name" | "password")
                    | ("/checkout-step-one.html", "firstName" | "lastName" | "postalCode")
            )
        });
        if !fillable {
            return Err(not_ready(&state, locator));
        }
        let key = test_id(&css).unwrap_or(&css).to_string();
        let _ = state.form.insert(key, value.to_string());
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> EnsayarResult<()> {
        let effect = {
            let mut state = self.state.lock().unwrap();
            Self::apply_click(&mut state, locator)?
        };
        match effect {
            ClickEffect::Settled => Ok(()),
            ClickEffect::Navigate(path) => self.load_path(path).await,
        }
    }

    async fn select_option(&self, locator: &Locator, value: &str) -> EnsayarResult<()> {
        let mut state = self.state.lock().unwrap();
        let css = locator.selector().to_css();
        if state.path != "/inventory.html" || test_id(&css) != Some("product-sort-container") {
            return Err(not_ready(&state, locator));
        }
        let sort = SortOrder::parse(value).ok_or_else(|| EnsayarError::Usage {
            message: format!("unknown sort option '{value}'"),
        })?;
        state.sort = sort;
        sort.apply(&mut state.inventory);
        Ok(())
    }

    async fn text(&self, locator: &Locator) -> EnsayarResult<String> {
        let state = self.state.lock().unwrap();
        let css = locator.selector().to_css();
        Self::element_text(&state, &css)
            .or_else(|| {
                Self::element_texts(&state, &css).and_then(|texts| texts.into_iter().next())
            })
            .ok_or_else(|| not_ready(&state, locator))
    }

    async fn texts(&self, locator: &Locator) -> EnsayarResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        let css = locator.selector().to_css();
        Self::element_texts(&state, &css)
            .or_else(|| Self::element_text(&state, &css).map(|t| vec![t]))
            .ok_or_else(|| not_ready(&state, locator))
    }

    async fn is_visible(&self, locator: &Locator) -> EnsayarResult<bool> {
        let state = self.state.lock().unwrap();
        let css = locator.selector().to_css();
        Ok(Self::control_visible(&state, &css)
            || Self::element_text(&state, &css).is_some()
            || Self::element_texts(&state, &css).is_some_and(|t| !t.is_empty()))
    }

    fn install_interception(&self, engine: Arc<InterceptionEngine>) {
        *self.engine.lock().unwrap() = Some(engine);
    }

    async fn close(&self) -> EnsayarResult<()> {
        let mut state = self.state.lock().unwrap();
        let base_url = state.base_url.clone();
        *state = SimState {
            base_url,
            path: "/".to_string(),
            logged_in: None,
            glitch: false,
            error_banner: None,
            form: HashMap::new(),
            inventory: Vec::new(),
            sort: SortOrder::NameAsc,
            cart: Vec::new(),
        };
        Ok(())
    }
}
