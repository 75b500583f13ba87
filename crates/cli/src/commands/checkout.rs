//! `bazaar checkout`

use clap::Args;

use bazaar_storefront::error::StorefrontError;
use bazaar_storefront::services::{CheckoutService, PaymentMethod, ShippingDetails};

use crate::context::Context;

#[derive(Args)]
pub struct CheckoutArgs {
    /// Recipient name
    #[arg(long)]
    name: String,

    /// Contact email
    #[arg(long)]
    email: String,

    /// Contact phone
    #[arg(long)]
    phone: String,

    /// Street address
    #[arg(long)]
    address: String,

    #[arg(long)]
    city: String,

    #[arg(long)]
    postal_code: String,

    /// `card`, `upi` or `cod`
    #[arg(long, default_value = "card")]
    payment: PaymentMethod,
}

impl CheckoutArgs {
    fn details(&self) -> ShippingDetails {
        ShippingDetails {
            full_name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            postal_code: self.postal_code.clone(),
        }
    }
}

pub async fn run(ctx: &mut Context, args: CheckoutArgs) -> Result<(), StorefrontError> {
    let service = CheckoutService::new(ctx.config.checkout);
    tracing::info!("Processing payment...");

    let order = service
        .place_order(&mut ctx.cart, &args.details(), args.payment)
        .await?;

    tracing::info!("Order {} confirmed", order.order_id);
    tracing::info!("Paid {} by {}", ctx.price(order.totals.total), order.payment_method.label());
    tracing::info!("Confirmation sent to {}", order.email);
    tracing::info!("You earned {} coins", order.earned_coins());
    Ok(())
}
