//! The checkout controller.
//!
//! [`CheckoutController`] owns the form, the dropdown option lists, and the
//! submission lifecycle. It is driven by one task through `&mut self`; its
//! collaborators (reference data, order service, navigator) are injected so
//! the whole flow can run against fakes.
//!
//! # Flow
//!
//! 1. [`initialize`](CheckoutController::initialize): stored email, option
//!    lists, cart totals
//! 2. User edits through [`form_mut`](CheckoutController::form_mut) and
//!    [`select_country`](CheckoutController::select_country)
//! 3. [`submit`](CheckoutController::submit): validate, assemble, place the
//!    order, then reset and navigate on success

use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::watch;
use tower_sessions::Session;
use tracing::{debug, instrument, warn};

use crate::cart::{CartSnapshot, CartState, CartTotals};
use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, add_breadcrumb, capture_order_failure};
use crate::form::{AddressForm, CardType, FormErrors, FormModel};
use crate::navigation::Navigator;
use crate::order::{OrderService, SubmissionState, submit_order};
use crate::purchase::assemble_purchase;
use crate::reference::{
    AddressGroup, Country, ReferenceData, State, StatesGuard, StatesRequest, StatesResponse,
    expiration_start_month,
};
use crate::session;
use crate::shop::ApiError;

/// Result of a placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    pub tracking_number: String,
}

/// Checkout form controller.
pub struct CheckoutController<R, O, N> {
    reference: R,
    orders: O,
    navigator: N,
    cart: CartState,
    cart_rx: watch::Receiver<CartSnapshot>,
    session: Session,
    order_timeout: Duration,
    products_path: String,
    today: NaiveDate,

    form: FormModel,
    billing_same_as_shipping: bool,
    countries: Vec<Country>,
    shipping_states: Vec<State>,
    billing_states: Vec<State>,
    credit_card_months: Vec<u32>,
    credit_card_years: Vec<i32>,
    states_guard: StatesGuard,
    submission: SubmissionState,
}

impl<R, O, N> CheckoutController<R, O, N>
where
    R: ReferenceData,
    O: OrderService,
    N: Navigator,
{
    /// Create a controller with an empty form.
    ///
    /// Call [`initialize`](Self::initialize) before presenting the form.
    pub fn new(
        reference: R,
        orders: O,
        navigator: N,
        cart: CartState,
        session: Session,
        config: &CheckoutConfig,
    ) -> Self {
        Self {
            reference,
            orders,
            navigator,
            cart_rx: cart.subscribe(),
            cart,
            session,
            order_timeout: config.api.order_timeout,
            products_path: config.products_path.clone(),
            today: chrono::Local::now().date_naive(),
            form: FormModel::new(),
            billing_same_as_shipping: false,
            countries: Vec::new(),
            shipping_states: Vec::new(),
            billing_states: Vec::new(),
            credit_card_months: Vec::new(),
            credit_card_years: Vec::new(),
            states_guard: StatesGuard::default(),
            submission: SubmissionState::Idle,
        }
    }

    /// Pin the date used for expiration rules.
    #[must_use]
    pub const fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Prefill the email, load the option lists, and read the cart totals.
    ///
    /// Lists that fail to load keep their previous contents; the failure is
    /// logged and initialization carries on.
    #[instrument(skip(self))]
    pub async fn initialize(&mut self) {
        if let Some(email) = session::stored_user_email(&self.session).await {
            debug!("Prefilled email from session");
            self.form.value_mut().customer.email = email;
        }

        let start_month = expiration_start_month(self.today, None);
        let (months, years, countries) = tokio::join!(
            self.reference.credit_card_months(start_month),
            self.reference.credit_card_years(),
            self.reference.countries(),
        );

        replace_or_warn(&mut self.credit_card_months, months, "credit card months");
        replace_or_warn(&mut self.credit_card_years, years, "credit card years");
        replace_or_warn(&mut self.countries, countries, "countries");

        self.review_cart_details();
    }

    /// Re-read the cart totals shown next to the form.
    pub fn review_cart_details(&mut self) -> CartTotals {
        let totals = self.cart_rx.borrow_and_update().totals;
        debug!(
            total_price = %totals.total_price,
            total_quantity = totals.total_quantity,
            "Reviewed cart details"
        );
        totals
    }

    // =========================================================================
    // Form
    // =========================================================================

    /// Form values and touched state.
    pub const fn form(&self) -> &FormModel {
        &self.form
    }

    /// Mutable form access for user edits.
    pub const fn form_mut(&mut self) -> &mut FormModel {
        &mut self.form
    }

    /// Toggle "billing address same as shipping".
    ///
    /// Enabling copies the shipping address and its state list into billing;
    /// disabling clears both.
    pub fn set_billing_same_as_shipping(&mut self, enabled: bool) {
        self.billing_same_as_shipping = enabled;
        self.form.set_billing_same_as_shipping(enabled);
        self.states_guard.invalidate(AddressGroup::Billing);
        self.billing_states = if enabled {
            self.shipping_states.clone()
        } else {
            Vec::new()
        };

        add_breadcrumb(
            "checkout",
            "Toggled billing same as shipping",
            Some(&[("enabled", if enabled { "true" } else { "false" })]),
        );
    }

    /// Whether billing currently mirrors shipping.
    pub const fn billing_same_as_shipping(&self) -> bool {
        self.billing_same_as_shipping
    }

    /// Set a group's country and clear its state, returning the states lookup
    /// to run.
    ///
    /// Any lookup still in flight for the group is superseded.
    pub fn begin_country_selection(
        &mut self,
        group: AddressGroup,
        country: Country,
    ) -> StatesRequest {
        add_breadcrumb(
            "checkout",
            "Selected country",
            Some(&[("group", group.path()), ("country_code", country.code.as_str())]),
        );

        let request = self.states_guard.begin(group, &country.code);
        let address = self.address_mut(group);
        address.country = Some(country);
        address.state = None;
        request
    }

    /// Fetch the states for a pending lookup.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::ReferenceData` if the states cannot be loaded.
    pub async fn load_states(
        &self,
        request: StatesRequest,
    ) -> Result<StatesResponse, CheckoutError> {
        let states = self
            .reference
            .states(&request.country_code)
            .await
            .map_err(CheckoutError::ReferenceData)?;
        Ok(StatesResponse { request, states })
    }

    /// Apply loaded states to their group, selecting the first one.
    ///
    /// Returns `false` (and changes nothing) if the response belongs to a
    /// superseded selection.
    pub fn apply_states(&mut self, response: StatesResponse) -> bool {
        let StatesResponse { request, states } = response;
        if !self.states_guard.is_current(&request) {
            debug!(
                group = request.group.path(),
                country_code = %request.country_code,
                "Discarding stale states response"
            );
            return false;
        }

        let group = request.group;
        self.address_mut(group).state = states.first().cloned();
        *self.states_mut(group) = states;
        true
    }

    /// Select a country and load its states.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::ReferenceData` if the states cannot be loaded;
    /// the group's state list is left unchanged.
    #[instrument(skip(self, country), fields(group = group.path(), country_code = %country.code))]
    pub async fn select_country(
        &mut self,
        group: AddressGroup,
        country: Country,
    ) -> Result<(), CheckoutError> {
        let request = self.begin_country_selection(group, country);
        match self.load_states(request).await {
            Ok(response) => {
                self.apply_states(response);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to load states; keeping previous options");
                Err(e)
            }
        }
    }

    /// Set the expiration year and reload the months it allows.
    #[instrument(skip(self))]
    pub async fn select_expiration_year(&mut self, year: i32) {
        self.form.value_mut().credit_card.expiration_year = Some(year);
        let start_month = expiration_start_month(self.today, Some(year));
        let months = self.reference.credit_card_months(start_month).await;
        replace_or_warn(&mut self.credit_card_months, months, "credit card months");
    }

    /// Every current validation error, touched or not.
    ///
    /// Besides the field rules, a selected state must be one of the states
    /// loaded for its group's country.
    pub fn validation_errors(&self) -> FormErrors {
        let mut errors = self
            .form
            .value()
            .validate_at(self.today)
            .err()
            .unwrap_or_default();

        for group in [AddressGroup::Shipping, AddressGroup::Billing] {
            if let Some(state) = &self.address(group).state
                && !self.states(group).contains(state)
            {
                errors.insert(format!("{}.state", group.path()), "not_in_country");
            }
        }
        errors
    }

    /// Validation errors of touched fields only.
    pub fn visible_errors(&self) -> FormErrors {
        self.form.visible(self.validation_errors())
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Validate the form and place the order.
    ///
    /// An invalid form marks every field as touched and sends nothing. A
    /// placed order clears the cart, resets the form, and navigates to the
    /// products page. A failed or timed-out order leaves everything as it was.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Validation` for an invalid form and
    /// `CheckoutError::Order` if the order could not be placed.
    #[instrument(skip(self))]
    pub async fn submit(&mut self) -> Result<OrderConfirmation, CheckoutError> {
        let errors = self.validation_errors();
        if !errors.is_empty() {
            self.form.mark_all_as_touched();
            debug!(invalid_fields = errors.len(), "Checkout form is invalid");
            return Err(CheckoutError::Validation(errors));
        }

        let purchase = assemble_purchase(self.form.value(), &self.cart.snapshot())?;
        let items = purchase.order_items.len().to_string();
        add_breadcrumb("checkout", "Submitted order", Some(&[("items", items.as_str())]));

        self.submission = SubmissionState::Pending;
        let outcome = submit_order(&self.orders, &purchase, self.order_timeout).await;
        self.submission = SubmissionState::from_outcome(&outcome);

        match outcome {
            Ok(response) => {
                self.reset_after_order().await;
                Ok(OrderConfirmation {
                    tracking_number: response.order_tracking_number,
                })
            }
            Err(e) => {
                capture_order_failure(&e);
                Err(e.into())
            }
        }
    }

    /// Clear the cart, reset the form, and navigate to the products page.
    ///
    /// A session failure while clearing the cart is logged; the in-memory cart
    /// is empty regardless.
    #[instrument(skip(self))]
    pub async fn reset_after_order(&mut self) {
        if let Err(e) = self.cart.clear().await {
            warn!(error = %e, "Failed to remove persisted cart items");
        }
        self.review_cart_details();

        self.form.reset();
        self.billing_same_as_shipping = false;
        self.states_guard.invalidate(AddressGroup::Shipping);
        self.states_guard.invalidate(AddressGroup::Billing);
        self.shipping_states.clear();
        self.billing_states.clear();

        self.navigator.navigate_by_url(&self.products_path);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current cart totals.
    pub fn totals(&self) -> CartTotals {
        self.cart_rx.borrow().totals
    }

    /// Lifecycle of the most recent submit.
    pub const fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    /// Country options.
    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    /// State options of one address group.
    pub fn states(&self, group: AddressGroup) -> &[State] {
        match group {
            AddressGroup::Shipping => &self.shipping_states,
            AddressGroup::Billing => &self.billing_states,
        }
    }

    /// Expiration month options.
    pub fn credit_card_months(&self) -> &[u32] {
        &self.credit_card_months
    }

    /// Expiration year options.
    pub fn credit_card_years(&self) -> &[i32] {
        &self.credit_card_years
    }

    /// Card type options.
    pub const fn card_types(&self) -> &'static [CardType] {
        &CardType::ALL
    }

    fn address(&self, group: AddressGroup) -> &AddressForm {
        match group {
            AddressGroup::Shipping => &self.form.value().shipping_address,
            AddressGroup::Billing => &self.form.value().billing_address,
        }
    }

    const fn address_mut(&mut self, group: AddressGroup) -> &mut AddressForm {
        let form = self.form.value_mut();
        match group {
            AddressGroup::Shipping => &mut form.shipping_address,
            AddressGroup::Billing => &mut form.billing_address,
        }
    }

    const fn states_mut(&mut self, group: AddressGroup) -> &mut Vec<State> {
        match group {
            AddressGroup::Shipping => &mut self.shipping_states,
            AddressGroup::Billing => &mut self.billing_states,
        }
    }
}

/// Replace an option list, or keep it and log if loading failed.
fn replace_or_warn<T>(target: &mut Vec<T>, loaded: Result<Vec<T>, ApiError>, list: &str) {
    match loaded {
        Ok(options) => {
            debug!(list, count = options.len(), "Loaded options");
            *target = options;
        }
        Err(e) => warn!(list, error = %e, "Failed to load options; keeping previous ones"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rust_decimal_macros::dec;
    use shopfront_core::{CountryId, Money, ProductId, StateId};

    use super::*;
    use crate::cart::CartItem;
    use crate::purchase::{Purchase, PurchaseResponse};
    use crate::reference;
    use crate::session::{in_memory_session, keys};

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    struct FakeReference {
        states: HashMap<&'static str, Vec<State>>,
        fail_countries: bool,
    }

    impl FakeReference {
        fn new() -> Self {
            let mut states = HashMap::new();
            states.insert("US", vec![state(1, "Alabama"), state(2, "Alaska")]);
            states.insert("CA", vec![state(3, "Alberta")]);
            Self {
                states,
                fail_countries: false,
            }
        }
    }

    impl ReferenceData for FakeReference {
        async fn countries(&self) -> Result<Vec<Country>, ApiError> {
            if self.fail_countries {
                return Err(ApiError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            Ok(vec![country(1, "US", "United States"), country(2, "CA", "Canada")])
        }

        async fn states(&self, country_code: &str) -> Result<Vec<State>, ApiError> {
            Ok(self.states.get(country_code).cloned().unwrap_or_default())
        }

        async fn credit_card_months(&self, start_month: u32) -> Result<Vec<u32>, ApiError> {
            Ok(reference::credit_card_months(start_month))
        }

        async fn credit_card_years(&self) -> Result<Vec<i32>, ApiError> {
            Ok(reference::credit_card_years(2026))
        }
    }

    enum Outcome {
        Accept(&'static str),
        Reject(&'static str),
        Hang,
    }

    struct FakeOrders {
        outcome: Outcome,
        calls: AtomicUsize,
        placed: Mutex<Vec<Purchase>>,
    }

    impl FakeOrders {
        fn new(outcome: Outcome) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
                placed: Mutex::new(Vec::new()),
            }
        }
    }

    impl OrderService for &FakeOrders {
        async fn place_order(&self, purchase: &Purchase) -> Result<PurchaseResponse, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.placed.lock().unwrap().push(purchase.clone());
            match self.outcome {
                Outcome::Accept(tracking) => Ok(PurchaseResponse {
                    order_tracking_number: tracking.to_string(),
                }),
                Outcome::Reject(message) => Err(ApiError::Api {
                    status: 500,
                    message: message.to_string(),
                }),
                Outcome::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!("timeout fires first")
                }
            }
        }
    }

    type Controller<'a> = CheckoutController<FakeReference, &'a FakeOrders, watch::Sender<String>>;

    fn state(id: i64, name: &str) -> State {
        State {
            id: StateId::new(id),
            name: name.to_string(),
        }
    }

    fn country(id: i64, code: &str, name: &str) -> Country {
        Country {
            id: CountryId::new(id),
            code: code.to_string(),
            name: name.to_string(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn cart_item(id: i64, price: rust_decimal::Decimal, quantity: u32) -> CartItem {
        CartItem {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            image_url: format!("assets/images/products/{id}.png"),
            unit_price: Money::new(price).unwrap(),
            quantity,
        }
    }

    async fn controller(reference: FakeReference, orders: &FakeOrders) -> (Controller<'_>, Session) {
        let session = in_memory_session();
        let cart = CartState::restore(session.clone()).await;
        cart.add_to_cart(cart_item(1, dec!(10), 2)).await.unwrap();
        cart.add_to_cart(cart_item(2, dec!(5), 1)).await.unwrap();

        let mut config = CheckoutConfig::with_base_url("http://localhost:8080/api").unwrap();
        config.api.order_timeout = Duration::from_millis(50);

        let (navigator, _) = watch::channel(String::from("/checkout"));
        let controller = CheckoutController::new(
            reference,
            orders,
            navigator,
            cart,
            session.clone(),
            &config,
        )
        .with_today(today());
        (controller, session)
    }

    async fn fill_valid(controller: &mut Controller<'_>) {
        {
            let form = controller.form_mut().value_mut();
            form.customer.first_name = "Ada".to_string();
            form.customer.last_name = "Lovelace".to_string();
            form.customer.email = "ada@example.com".to_string();
            form.shipping_address.street = "1 Main Street".to_string();
            form.shipping_address.city = "Huntsville".to_string();
            form.shipping_address.zip_code = "35801".to_string();
        }
        controller
            .select_country(AddressGroup::Shipping, country(1, "US", "United States"))
            .await
            .unwrap();
        controller.set_billing_same_as_shipping(true);

        let card = &mut controller.form_mut().value_mut().credit_card;
        card.card_type = Some(CardType::Visa);
        card.name_on_card = "Ada Lovelace".to_string();
        card.card_number = "4111111111111111".to_string();
        card.security_code = "123".to_string();
        card.expiration_month = Some(12);
        card.expiration_year = Some(2027);
    }

    // -------------------------------------------------------------------------
    // Initialization
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_initialize_loads_options_and_email() {
        let orders = FakeOrders::new(Outcome::Accept("unused"));
        let (mut controller, session) = controller(FakeReference::new(), &orders).await;
        session
            .insert(keys::USER_EMAIL, "ada@example.com")
            .await
            .unwrap();

        controller.initialize().await;

        assert_eq!(controller.form().value().customer.email, "ada@example.com");
        assert_eq!(controller.countries().len(), 2);
        assert_eq!(controller.credit_card_months(), [10, 11, 12]);
        assert_eq!(controller.credit_card_years().len(), 11);
        assert_eq!(controller.totals().total_price.amount(), dec!(25));
        assert_eq!(controller.totals().total_quantity, 3);
        assert_eq!(controller.card_types().len(), 4);
    }

    #[tokio::test]
    async fn test_initialize_tolerates_failed_countries() {
        let orders = FakeOrders::new(Outcome::Accept("unused"));
        let mut reference = FakeReference::new();
        reference.fail_countries = true;
        let (mut controller, _) = controller(reference, &orders).await;

        controller.initialize().await;

        assert!(controller.countries().is_empty());
        assert_eq!(controller.credit_card_months(), [10, 11, 12]);
        assert_eq!(controller.form().value().customer.email, "");
    }

    #[tokio::test]
    async fn test_future_expiration_year_offers_all_months() {
        let orders = FakeOrders::new(Outcome::Accept("unused"));
        let (mut controller, _) = controller(FakeReference::new(), &orders).await;
        controller.initialize().await;

        controller.select_expiration_year(2028).await;
        assert_eq!(controller.credit_card_months().len(), 12);

        controller.select_expiration_year(2026).await;
        assert_eq!(controller.credit_card_months(), [10, 11, 12]);
    }

    // -------------------------------------------------------------------------
    // Countries & states
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_select_country_selects_first_state() {
        let orders = FakeOrders::new(Outcome::Accept("unused"));
        let (mut controller, _) = controller(FakeReference::new(), &orders).await;

        controller
            .select_country(AddressGroup::Shipping, country(1, "US", "United States"))
            .await
            .unwrap();

        assert_eq!(controller.states(AddressGroup::Shipping).len(), 2);
        assert_eq!(
            controller.form().value().shipping_address.state,
            Some(state(1, "Alabama"))
        );
        assert!(controller.states(AddressGroup::Billing).is_empty());
    }

    #[tokio::test]
    async fn test_country_without_states_clears_selection() {
        let orders = FakeOrders::new(Outcome::Accept("unused"));
        let (mut controller, _) = controller(FakeReference::new(), &orders).await;

        controller
            .select_country(AddressGroup::Billing, country(1, "US", "United States"))
            .await
            .unwrap();
        controller
            .select_country(AddressGroup::Billing, country(9, "AQ", "Antarctica"))
            .await
            .unwrap();

        assert!(controller.states(AddressGroup::Billing).is_empty());
        assert_eq!(controller.form().value().billing_address.state, None);
    }

    #[tokio::test]
    async fn test_stale_states_response_discarded() {
        let orders = FakeOrders::new(Outcome::Accept("unused"));
        let (mut controller, _) = controller(FakeReference::new(), &orders).await;

        let first =
            controller.begin_country_selection(AddressGroup::Shipping, country(1, "US", "United States"));
        let second =
            controller.begin_country_selection(AddressGroup::Shipping, country(2, "CA", "Canada"));
        let first = controller.load_states(first).await.unwrap();
        let second = controller.load_states(second).await.unwrap();

        // Responses arrive out of order
        assert!(controller.apply_states(second));
        assert!(!controller.apply_states(first));

        assert_eq!(controller.states(AddressGroup::Shipping), [state(3, "Alberta")]);
        assert_eq!(
            controller.form().value().shipping_address.state,
            Some(state(3, "Alberta"))
        );
    }

    #[tokio::test]
    async fn test_billing_same_as_shipping_copies_states() {
        let orders = FakeOrders::new(Outcome::Accept("unused"));
        let (mut controller, _) = controller(FakeReference::new(), &orders).await;
        fill_valid(&mut controller).await;

        assert!(controller.billing_same_as_shipping());
        assert_eq!(
            controller.form().value().billing_address,
            controller.form().value().shipping_address
        );
        assert_eq!(controller.states(AddressGroup::Billing).len(), 2);

        controller.set_billing_same_as_shipping(false);
        assert_eq!(controller.form().value().billing_address, AddressForm::default());
        assert!(controller.states(AddressGroup::Billing).is_empty());
    }

    #[tokio::test]
    async fn test_state_must_belong_to_country() {
        let orders = FakeOrders::new(Outcome::Accept("unused"));
        let (mut controller, _) = controller(FakeReference::new(), &orders).await;
        fill_valid(&mut controller).await;
        assert!(controller.validation_errors().is_empty());

        controller.form_mut().value_mut().billing_address.state = Some(state(3, "Alberta"));

        let errors = controller.validation_errors();
        assert!(errors.has("billing_address.state", "not_in_country"));
        assert_eq!(errors.len(), 1);
    }

    // -------------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_invalid_submit_touches_all_and_sends_nothing() {
        let orders = FakeOrders::new(Outcome::Accept("unused"));
        let (mut controller, _) = controller(FakeReference::new(), &orders).await;
        assert!(controller.visible_errors().is_empty());

        let err = controller.submit().await.unwrap_err();

        assert!(matches!(err, CheckoutError::Validation(ref e) if e.contains("customer.first_name")));
        assert_eq!(orders.calls.load(Ordering::SeqCst), 0);
        assert!(controller.form().is_touched("credit_card.security_code"));
        assert_eq!(controller.visible_errors(), controller.validation_errors());
        assert_eq!(controller.submission(), &SubmissionState::Idle);
    }

    #[tokio::test]
    async fn test_successful_submit_resets_and_navigates() {
        let orders = FakeOrders::new(Outcome::Accept("ABC123"));
        let (mut controller, session) = controller(FakeReference::new(), &orders).await;
        let mut route = controller.navigator.subscribe();
        fill_valid(&mut controller).await;

        let confirmation = controller.submit().await.unwrap();

        assert_eq!(confirmation.tracking_number, "ABC123");
        let placed = orders.placed.lock().unwrap();
        assert_eq!(placed[0].order.total_price.amount(), dec!(25));
        assert_eq!(placed[0].order.total_quantity, 3);
        assert_eq!(placed[0].order_items.len(), 2);
        assert_eq!(placed[0].billing_address.state, "Alabama");

        assert!(controller.totals().total_price.is_zero());
        assert_eq!(controller.totals().total_quantity, 0);
        let stored: Option<Vec<CartItem>> = session.get(keys::CART_ITEMS).await.unwrap();
        assert!(stored.is_none());

        assert!(controller.form().is_pristine());
        assert_eq!(controller.form().value(), &crate::form::CheckoutForm::default());
        assert!(controller.states(AddressGroup::Shipping).is_empty());
        assert!(!controller.billing_same_as_shipping());
        assert_eq!(*route.borrow_and_update(), "/products");
        assert_eq!(
            controller.submission().alert_message().unwrap(),
            "Your order has been placed successfully! Order ID: ABC123"
        );
    }

    #[tokio::test]
    async fn test_failed_submit_leaves_form_unchanged() {
        let orders = FakeOrders::new(Outcome::Reject("Card declined"));
        let (mut controller, _) = controller(FakeReference::new(), &orders).await;
        let route = controller.navigator.subscribe();
        fill_valid(&mut controller).await;
        let before = controller.form().value().clone();

        let err = controller.submit().await.unwrap_err();

        assert_eq!(err.to_string(), "Card declined");
        assert_eq!(controller.form().value(), &before);
        assert_eq!(controller.totals().total_quantity, 3);
        assert_eq!(*route.borrow(), "/checkout");
        assert_eq!(
            controller.submission(),
            &SubmissionState::Failed {
                message: "Card declined".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_timed_out_submit_does_not_reset() {
        let orders = FakeOrders::new(Outcome::Hang);
        let (mut controller, _) = controller(FakeReference::new(), &orders).await;
        let route = controller.navigator.subscribe();
        fill_valid(&mut controller).await;
        let form_before = controller.form().value().clone();
        let totals_before = controller.totals();

        let err = controller.submit().await.unwrap_err();

        assert!(matches!(err, CheckoutError::Order(crate::order::OrderError::TimedOut(_))));
        assert_eq!(controller.submission(), &SubmissionState::TimedOut);
        assert_eq!(controller.form().value(), &form_before);
        assert_eq!(controller.totals(), totals_before);
        assert_eq!(controller.states(AddressGroup::Shipping).len(), 2);
        assert_eq!(*route.borrow(), "/checkout");
    }
}
