//! `bazaar wishlist ...`

use clap::Subcommand;

use bazaar_core::ProductId;
use bazaar_storefront::error::StorefrontError;
use bazaar_storefront::wishlist::WishlistMode;

use super::{ProductArgs, VariantArgs};
use crate::context::Context;

#[derive(Subcommand)]
pub enum WishlistAction {
    /// List saved products
    Show,
    /// Save a product
    Add(ProductArgs),
    /// Remove a saved product
    Remove { product_id: String },
    /// Save the product if absent, remove it if present
    Toggle(ProductArgs),
    /// Move a saved product into the cart
    MoveToCart {
        product_id: String,

        #[command(flatten)]
        variant: VariantArgs,
    },
}

pub async fn run(ctx: &mut Context, action: WishlistAction) -> Result<(), StorefrontError> {
    ctx.sync_wishlist().await?;

    match action {
        WishlistAction::Show => show(ctx),
        WishlistAction::Add(product) => {
            ctx.wishlist.add(product.to_product()).await?;
        }
        WishlistAction::Remove { product_id } => {
            let product_id = ProductId::new(product_id);
            if !ctx.wishlist.contains(&product_id) {
                return Err(not_saved(&product_id));
            }
            ctx.wishlist.remove(&product_id).await?;
        }
        WishlistAction::Toggle(product) => {
            let saved = ctx.wishlist.toggle(product.to_product()).await?;
            tracing::info!(
                "{} is {} your wishlist",
                product.id,
                if saved { "in" } else { "no longer in" }
            );
        }
        WishlistAction::MoveToCart {
            product_id,
            variant,
        } => {
            let product_id = ProductId::new(product_id);
            if !ctx.wishlist.contains(&product_id) {
                return Err(not_saved(&product_id));
            }
            ctx.wishlist
                .move_to_cart(&product_id, variant.key(), &mut ctx.cart)
                .await?;
            tracing::info!("Moved {product_id} to the cart");
        }
    }
    Ok(())
}

fn not_saved(product_id: &ProductId) -> StorefrontError {
    StorefrontError::NotFound(format!("{product_id} is not in the wishlist"))
}

fn show(ctx: &Context) {
    let mode = match ctx.wishlist.mode() {
        WishlistMode::Guest => "guest",
        WishlistMode::Account => "account",
    };
    let items = ctx.wishlist.items();
    if items.is_empty() {
        tracing::info!("Your {mode} wishlist is empty");
        return;
    }

    tracing::info!("Wishlist ({mode}, {} item(s)):", items.len());
    for product in &items {
        tracing::info!("  {} - {} {}", product.id, product.title, ctx.price(product.price));
    }
}
