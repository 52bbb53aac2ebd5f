//! The guest checkout gate.
//!
//! A request may proceed without an authenticated principal **only** when it pays cash on
//! delivery; every other payment method requires a valid token. For guests the customer contact
//! block is mandatory. An invalid or expired token on the cash path degrades gracefully to a
//! guest checkout: the extractor has already reduced it to `None`, so a bad token can never
//! grant more than an absent one.

use bistro_order_engine::db_types::{CustomerInfo, PaymentMethod};

use crate::{auth::JwtClaims, data_objects::CustomerInfoParams, errors::ServerError};

pub const GUEST_INFO_REQUIRED: &str =
    "Customer information (full name, email, and phone) is required for guest orders";

/// The resolved checkout identity: an authenticated owner or a guest, plus the contact snapshot
/// that will be stored on the order.
#[derive(Debug, Clone)]
pub struct CheckoutPrincipal {
    pub user_id: Option<i64>,
    pub customer: CustomerInfo,
}

impl CheckoutPrincipal {
    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }
}

pub fn resolve_checkout_principal(
    payment_method: PaymentMethod,
    claims: Option<JwtClaims>,
    customer_info: Option<CustomerInfoParams>,
) -> Result<CheckoutPrincipal, ServerError> {
    match claims {
        Some(claims) => {
            let info = customer_info.unwrap_or_default();
            // Missing fields fall back to the token's claims; the principal carries no phone.
            let full_name = info
                .full_name
                .filter(|s| !s.trim().is_empty())
                .or_else(|| claims.name.clone())
                .ok_or_else(|| ServerError::ValidationError("customer_info.full_name is required".to_string()))?;
            let email = info.email.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| claims.email.clone());
            let phone = info.phone.filter(|s| !s.trim().is_empty());
            Ok(CheckoutPrincipal {
                user_id: Some(claims.sub),
                customer: CustomerInfo { full_name, email, phone },
            })
        },
        None if payment_method == PaymentMethod::CashOnDelivery => {
            let info =
                customer_info.ok_or_else(|| ServerError::ValidationError(GUEST_INFO_REQUIRED.to_string()))?;
            match (
                info.full_name.filter(|s| !s.trim().is_empty()),
                info.email.filter(|s| !s.trim().is_empty()),
                info.phone.filter(|s| !s.trim().is_empty()),
            ) {
                (Some(full_name), Some(email), Some(phone)) => Ok(CheckoutPrincipal {
                    user_id: None,
                    customer: CustomerInfo { full_name, email, phone: Some(phone) },
                }),
                _ => Err(ServerError::ValidationError(GUEST_INFO_REQUIRED.to_string())),
            }
        },
        None => Err(ServerError::AuthenticationRequired),
    }
}
