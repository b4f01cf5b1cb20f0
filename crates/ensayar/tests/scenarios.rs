//! Scenario presets and full purchase flows, each on its own session.

use ensayar::prelude::*;
use std::sync::Arc;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn fresh_session() -> Arc<Session> {
    init_logging();
    Session::sim(environment::resolve(None))
}

#[tokio::test]
async fn full_purchase_flow_from_checkout_ready_preset() {
    let registry = presets::registry().unwrap();
    let session = fresh_session();
    let handle = registry
        .build(presets::CHECKOUT_READY, &session)
        .await
        .unwrap();

    let overview = handle.pages().unwrap().into_overview().unwrap();
    let items = overview.item_names().await.unwrap();
    assert_eq!(items, vec!["Sauce Labs Bike Light".to_string()]);

    let subtotal = overview.subtotal().await.unwrap();
    let tax = overview.tax().await.unwrap();
    let total = overview.total().await.unwrap();
    assert!((subtotal - 9.99).abs() < 0.001);
    assert!((tax - 0.80).abs() < 0.001);
    assert!((total - 10.79).abs() < 0.001);

    let complete = overview.finish().await.unwrap();
    assert_eq!(
        complete.confirmation().await.unwrap(),
        "Thank you for your order!"
    );

    handle.teardown().await.unwrap();
}

#[tokio::test]
async fn cart_with_items_preset_holds_exactly_the_fixture_product() {
    let registry = presets::registry().unwrap();
    let session = fresh_session();
    let handle = registry
        .build(presets::CART_WITH_ITEMS, &session)
        .await
        .unwrap();

    let inventory = handle.pages().unwrap().into_inventory().unwrap();
    let cart = inventory.open_cart().await.unwrap();
    assert_eq!(cart.item_count().await.unwrap(), 1);
    assert_eq!(
        cart.item_names().await.unwrap().first().map(String::as_str),
        Some("Sauce Labs Bike Light")
    );
}

#[tokio::test]
async fn back_to_back_builds_start_from_scratch() {
    let registry = presets::registry().unwrap();

    for _ in 0..2 {
        let session = fresh_session();
        let handle = registry
            .build(presets::CART_WITH_ITEMS, &session)
            .await
            .unwrap();
        // Exactly one item each time; a leak would show up as two
        assert_eq!(session.state(), SessionState::CartPopulated(1));
        let inventory = handle.pages().unwrap().into_inventory().unwrap();
        assert_eq!(inventory.cart_count().await.unwrap(), 1);
    }
}

#[tokio::test]
async fn custom_fixture_composes_with_the_presets() {
    struct BulkCart;

    #[async_trait::async_trait]
    impl ScenarioFixture for BulkCart {
        fn name(&self) -> &str {
            "bulk-cart"
        }

        fn dependencies(&self) -> Vec<String> {
            vec![presets::AUTHENTICATED.to_string()]
        }

        async fn setup(&self, session: &Arc<Session>) -> EnsayarResult<()> {
            let inventory = InventoryPage::new(Arc::clone(session))?;
            for id in [
                catalog::ids::BACKPACK,
                catalog::ids::BIKE_LIGHT,
                catalog::ids::FLEECE_JACKET,
            ] {
                inventory.add_to_cart(id).await?;
            }
            Ok(())
        }
    }

    let mut registry = presets::registry().unwrap();
    registry.register(Arc::new(BulkCart)).unwrap();

    let session = fresh_session();
    let handle = registry.build("bulk-cart", &session).await.unwrap();
    assert_eq!(handle.applied(), vec![presets::AUTHENTICATED, "bulk-cart"]);
    assert_eq!(session.state(), SessionState::CartPopulated(3));

    let cart = handle.pages().unwrap().into_cart().unwrap();
    cart.open().await.unwrap();
    assert_eq!(cart.item_count().await.unwrap(), 3);
}

#[tokio::test]
async fn scenario_with_interception_runs_against_a_mocked_backend() {
    let registry = presets::registry().unwrap();
    let session = fresh_session();
    session
        .intercept(Rule::fulfill(
            UrlPattern::Contains("/api/products".to_string()),
            MockResponse::json(&catalog::all()).unwrap(),
        ))
        .unwrap();

    let _ = registry
        .build(presets::CHECKOUT_READY, &session)
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::CheckoutStep(2));
    session
        .engine()
        .assert_requested(&UrlPattern::Contains("/api/products".to_string()))
        .unwrap();
}

#[tokio::test]
async fn locked_out_profile_fails_the_authenticated_scenario() {
    let mut registry = ScenarioRegistry::new();
    registry
        .register(Arc::new(
            ensayar::scenario::presets::AuthenticatedUser::with_profile(Profile::LockedOut),
        ))
        .unwrap();

    let session = fresh_session();
    let err = registry
        .build(presets::AUTHENTICATED, &session)
        .await
        .unwrap_err();
    assert!(matches!(err, EnsayarError::ScenarioBuild { .. }));
    assert!(err.to_string().contains("locked out"));
    assert_eq!(session.state(), SessionState::Anonymous);
}

#[tokio::test]
async fn environment_selection_steers_the_session() {
    init_logging();
    let target = environment::resolve(Some("local"));
    let session = Session::sim(target);
    assert_eq!(session.target().base_url, "http://localhost:3000");

    let login = LoginPage::new(Arc::clone(&session));
    login.open().await.unwrap();
    let inventory = login.login_as(Profile::Standard).await.unwrap();
    assert!(session
        .driver()
        .current_url()
        .await
        .starts_with("http://localhost:3000"));
    assert_eq!(inventory.product_names().await.unwrap().len(), 6);
}

#[tokio::test]
async fn unknown_environment_falls_back_to_prod() {
    init_logging();
    let target = environment::resolve(Some("qa-west-2"));
    assert_eq!(target.env, "prod");
    let session = Session::sim(target);
    assert_eq!(session.target().base_url, "https://www.saucedemo.com");
}
