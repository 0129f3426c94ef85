//! Route definitions for the Smart Inventory Platform
//!
//! Every route except login and health sits behind the JWT middleware.
//! Role checks happen in the handlers through `AuthUser::require`.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/me", get(handlers::me))
        .route("/auth/navigation", get(handlers::navigation))
        .nest("/staff", staff_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/customers", customer_routes())
        .nest("/products", product_routes())
        .nest("/stock", stock_routes())
        .nest("/requests", request_routes())
        .nest("/orders", order_routes())
        .nest("/purchase-orders", purchase_order_routes())
        .nest("/reports", report_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Public
        .route("/health", get(handlers::health_check))
        .route("/auth/login", post(handlers::login))
        .merge(protected)
}

fn staff_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_staff).post(handlers::create_staff))
        .route(
            "/:staff_id",
            get(handlers::get_staff)
                .put(handlers::update_staff)
                .delete(handlers::deactivate_staff),
        )
}

fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .route(
            "/:supplier_id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::deactivate_supplier),
        )
}

fn customer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_customers).post(handlers::create_customer),
        )
        .route(
            "/:customer_id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::deactivate_customer),
        )
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::deactivate_product),
        )
        .route("/:product_id/adjust", put(handlers::adjust_quantity))
        .route("/:product_id/batches", get(handlers::list_batches))
        .route(
            "/:product_id/batches/available",
            get(handlers::list_available_batches),
        )
        .route("/:product_id/batches/:batch_id", get(handlers::get_batch))
        .route(
            "/:product_id/allocation-preview",
            get(handlers::preview_allocation),
        )
}

fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/in", post(handlers::stock_in))
        .route("/transactions", get(handlers::list_transactions))
        .route(
            "/transactions/:reference_id",
            get(handlers::transactions_for_reference),
        )
        .route("/approved-requests", get(handlers::approved_requests))
        .route("/fulfill", post(handlers::fulfill_item))
        .route("/fulfill/request", post(handlers::fulfill_request))
}

fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_requests).post(handlers::create_request))
        .route("/:request_id", get(handlers::get_request))
        .route("/:request_id/items", get(handlers::list_request_items))
        .route("/:request_id/approve", put(handlers::approve_request))
        .route("/:request_id/reject", put(handlers::reject_request))
        .route("/:request_id/close", put(handlers::close_request))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route("/confirmed", get(handlers::list_confirmed_orders))
        .route("/ready-to-close", get(handlers::list_orders_ready_to_close))
        .route("/:order_id/items", get(handlers::list_order_items))
        .route("/:order_id/close", put(handlers::close_order))
}

fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchase_orders).post(handlers::create_purchase_order),
        )
        .route("/:po_id", get(handlers::get_purchase_order))
        .route("/:po_id/pricing", put(handlers::update_pricing))
        .route("/:po_id/receive", post(handlers::receive_purchase_order))
}

fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/export", get(handlers::export_report))
}
