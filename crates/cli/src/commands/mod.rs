//! CLI command implementations.

pub mod account;
pub mod cart;
pub mod checkout;
pub mod wishlist;

use clap::Args;
use rust_decimal::Decimal;

use bazaar_core::{Product, ProductId, VariantKey};

pub use cart::CartAction;
pub use checkout::CheckoutArgs;
pub use wishlist::WishlistAction;

/// Product details supplied on the command line. There is no catalog
/// lookup, so whatever is passed here is what the stores record.
#[derive(Args, Debug)]
pub struct ProductArgs {
    /// Product ID
    pub id: String,

    /// Display title (defaults to the ID)
    #[arg(long)]
    pub title: Option<String>,

    /// Unit price in the store currency
    #[arg(long)]
    pub price: Decimal,

    /// Product URL handle
    #[arg(long)]
    pub handle: Option<String>,

    /// Image URL
    #[arg(long)]
    pub image_url: Option<String>,
}

impl ProductArgs {
    pub fn to_product(&self) -> Product {
        let mut product = Product::new(
            ProductId::new(self.id.as_str()),
            self.title.clone().unwrap_or_else(|| self.id.clone()),
            self.price,
        );
        product.handle = self.handle.clone().unwrap_or_else(|| self.id.clone());
        product.image_url.clone_from(&self.image_url);
        product
    }
}

/// Size/color selection for cart lines.
#[derive(Args, Debug, Default)]
pub struct VariantArgs {
    /// Size option
    #[arg(long)]
    pub size: Option<String>,

    /// Color option
    #[arg(long)]
    pub color: Option<String>,
}

impl VariantArgs {
    pub fn key(&self) -> VariantKey {
        VariantKey::new(self.size.as_deref(), self.color.as_deref())
    }
}
