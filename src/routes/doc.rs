use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{
            AuthResponse, ForgotPasswordRequest, LoginOutcome, LoginRequest, PublicUser,
            RegisterRequest, ResetPasswordRequest, SetTwoFactorRequest, VerifyOtpRequest,
        },
        cart::{AddToCartRequest, CartItemDto, CartList},
        categories::CategoryList,
        orders::{OrderHistory, OrderHistoryEntry, OrderLine, OrderWithItems},
        products::{ProductDetail, ProductList},
    },
    models::{CartItem, Category, Order, OrderItem, Product},
    response::{ApiResponse, Meta},
    routes::{auth, cart, categories, health, images, orders, params, products},
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
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::verify_otp,
        auth::forgot_password,
        auth::reset_password,
        auth::set_two_factor,
        auth::me,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        categories::list_categories,
        cart::cart_list,
        cart::add_to_cart,
        cart::remove_from_cart,
        orders::checkout,
        orders::order_history,
        images::get_image,
    ),
    components(
        schemas(
            Product,
            Category,
            CartItem,
            Order,
            OrderItem,
            PublicUser,
            RegisterRequest,
            LoginRequest,
            VerifyOtpRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            SetTwoFactorRequest,
            AuthResponse,
            LoginOutcome,
            AddToCartRequest,
            CartItemDto,
            CartList,
            CategoryList,
            ProductDetail,
            ProductList,
            OrderWithItems,
            OrderLine,
            OrderHistoryEntry,
            OrderHistory,
            params::Pagination,
            params::ProductQuery,
            Meta,
            ApiResponse<ProductDetail>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderHistory>,
            ApiResponse<CartList>,
            ApiResponse<AuthResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login, 2FA and password reset"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout and order history"),
        (name = "Images", description = "Product image retrieval"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
