use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        orders::{CreateOrderRequest, OrderResponse, UserOrder, UserOrderList},
        payments::{CreatePaymentRequest, CustomerDetail, ItemDetail, PaymentData, VaNumber, WebhookRequest},
    },
    models::{OrderStatus, PaymentStatus},
    response::{ApiResponse, Meta},
    routes::{health, orders, payments},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "service_signature",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "x-api-key",
                "hex(sha256(\"{x-service-name}:{secret}:{x-request-at}\"))",
            ))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        orders::create_order,
        orders::list_user_orders,
        orders::get_order,
    ),
    components(
        schemas(
            CreateOrderRequest,
            OrderResponse,
            UserOrder,
            UserOrderList,
            OrderStatus,
            Meta,
            ApiResponse<OrderResponse>,
            ApiResponse<UserOrderList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Orders", description = "Field booking orders"),
    )
)]
pub struct OrderApiDoc;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        payments::create_payment,
        payments::get_payment,
        payments::webhook,
    ),
    components(
        schemas(
            CreatePaymentRequest,
            CustomerDetail,
            ItemDetail,
            PaymentData,
            PaymentStatus,
            VaNumber,
            WebhookRequest,
            Meta,
            ApiResponse<PaymentData>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Payments", description = "Payment links and gateway callbacks"),
    )
)]
pub struct PaymentApiDoc;

pub fn order_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", OrderApiDoc::openapi())
}

pub fn payment_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", PaymentApiDoc::openapi())
}
