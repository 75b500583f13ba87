//! `bazaar cart ...`

use clap::Subcommand;

use bazaar_core::ProductId;
use bazaar_storefront::cart::AddItem;
use bazaar_storefront::error::StorefrontError;

use super::{ProductArgs, VariantArgs};
use crate::context::Context;

#[derive(Subcommand)]
pub enum CartAction {
    /// Show lines and totals
    Show,
    /// Add a product (merges with an existing line of the same variant)
    Add {
        #[command(flatten)]
        product: ProductArgs,

        #[command(flatten)]
        variant: VariantArgs,

        /// Units to add
        #[arg(long, default_value_t = 1)]
        qty: u32,
    },
    /// Remove a line
    Remove {
        product_id: String,

        #[command(flatten)]
        variant: VariantArgs,
    },
    /// Set a line's quantity (values below 1 become 1)
    Update {
        product_id: String,
        quantity: u32,

        #[command(flatten)]
        variant: VariantArgs,
    },
    /// Apply a discount code
    Discount { code: String },
    /// Remove the applied discount code
    Undiscount,
    /// Toggle loyalty-coin redemption
    Coins,
    /// Empty the cart
    Clear,
}

pub fn run(ctx: &mut Context, action: CartAction) -> Result<(), StorefrontError> {
    match action {
        CartAction::Show => show(ctx),
        CartAction::Add {
            product,
            variant,
            qty,
        } => {
            let product = product.to_product();
            let quantity = ctx.cart.add_item(
                &product,
                AddItem {
                    quantity: qty,
                    variant: variant.key(),
                    open_cart: true,
                },
            )?;
            tracing::info!("{} now has quantity {quantity}", product.title);
        }
        CartAction::Remove {
            product_id,
            variant,
        } => {
            let product_id = ProductId::new(product_id);
            if !ctx.cart.remove_item(&product_id, &variant.key()) {
                return Err(not_in_cart(&product_id, &variant));
            }
            tracing::info!("Removed {product_id} ({})", variant.key());
        }
        CartAction::Update {
            product_id,
            quantity,
            variant,
        } => {
            let product_id = ProductId::new(product_id);
            if !ctx.cart.update_quantity(&product_id, quantity, &variant.key()) {
                return Err(not_in_cart(&product_id, &variant));
            }
            show(ctx);
        }
        CartAction::Discount { code } => {
            let amount = ctx.cart.apply_discount(&code)?;
            tracing::info!("You save {}", ctx.price(amount));
        }
        CartAction::Undiscount => {
            ctx.cart.remove_discount();
            tracing::info!("Discount removed");
        }
        CartAction::Coins => {
            let redeeming = ctx.cart.toggle_redeem_coins();
            tracing::info!(
                "Coin redemption {}",
                if redeeming { "on" } else { "off" }
            );
        }
        CartAction::Clear => {
            ctx.cart.clear();
            tracing::info!("Cart cleared");
        }
    }
    Ok(())
}

fn not_in_cart(product_id: &ProductId, variant: &VariantArgs) -> StorefrontError {
    StorefrontError::NotFound(format!("{product_id} ({}) is not in the cart", variant.key()))
}

fn show(ctx: &Context) {
    if ctx.cart.is_empty() {
        tracing::info!("Your cart is empty");
        return;
    }

    for line in ctx.cart.lines() {
        tracing::info!(
            "{:>3} x {} [{}] {} = {}",
            line.quantity,
            line.title,
            line.variant,
            ctx.price(line.unit_price),
            ctx.price(line.line_total())
        );
    }

    let totals = ctx.cart.totals();
    tracing::info!("Subtotal: {}", ctx.price(totals.subtotal));
    if let Some(code) = ctx.cart.discount_code() {
        tracing::info!("Discount ({code}): -{}", ctx.price(totals.discount_amount));
    }
    if ctx.cart.is_redeeming_coins() {
        tracing::info!("Coins: -{}", ctx.price(totals.coin_discount));
    }
    tracing::info!("Total: {}", ctx.price(totals.total));
    tracing::info!("You will earn {} coins", totals.earned_coins);
}
