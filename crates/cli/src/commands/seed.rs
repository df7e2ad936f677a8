//! Sample catalogue for local development.
//!
//! Products are keyed by slug, so running the command twice leaves the
//! existing rows alone. Opening stock is written as `restock` movements so
//! the ledger matches the counts.

use rust_decimal::Decimal;
use tracing::info;

use qyve_core::MovementType;

use super::{CommandError, connect};

/// Actor recorded on seeded stock movements.
const SEED_ACTOR: &str = "seed";

struct SampleProduct {
    slug: &'static str,
    name: &'static str,
    description: &'static str,
    category: &'static str,
    /// Whole rupiah.
    price: i64,
    weight_grams: i32,
    is_preorder: bool,
    sizes: &'static [(&'static str, i32)],
}

const CATALOGUE: &[SampleProduct] = &[
    SampleProduct {
        slug: "essential-tee-black",
        name: "Essential Tee - Black",
        description: "Heavyweight 240gsm cotton tee, boxy fit.",
        category: "tops",
        price: 249_000,
        weight_grams: 280,
        is_preorder: false,
        sizes: &[("S", 12), ("M", 20), ("L", 15), ("XL", 4)],
    },
    SampleProduct {
        slug: "essential-tee-bone",
        name: "Essential Tee - Bone",
        description: "Heavyweight 240gsm cotton tee, boxy fit.",
        category: "tops",
        price: 249_000,
        weight_grams: 280,
        is_preorder: false,
        sizes: &[("S", 8), ("M", 3), ("L", 10), ("XL", 0)],
    },
    SampleProduct {
        slug: "cargo-pants-olive",
        name: "Utility Cargo Pants - Olive",
        description: "Ripstop cargo pants with adjustable hems.",
        category: "bottoms",
        price: 549_000,
        weight_grams: 650,
        is_preorder: false,
        sizes: &[("28", 5), ("30", 9), ("32", 9), ("34", 2)],
    },
    SampleProduct {
        slug: "coach-jacket-navy",
        name: "Coach Jacket - Navy",
        description: "Water-repellent coach jacket. Ships in the next production run.",
        category: "outerwear",
        price: 799_000,
        weight_grams: 900,
        is_preorder: true,
        sizes: &[("M", 0), ("L", 0), ("XL", 0)],
    },
];

/// Insert the sample catalogue.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn catalogue() -> Result<(), CommandError> {
    let pool = connect().await?;
    let mut tx = pool.begin().await?;
    let mut created = 0;

    for product in CATALOGUE {
        let inserted: Option<(i64,)> = sqlx::query_as(
            r"
            INSERT INTO product (slug, name, description, category, price, weight_grams, is_preorder)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (slug) DO NOTHING
            RETURNING id
            ",
        )
        .bind(product.slug)
        .bind(product.name)
        .bind(product.description)
        .bind(product.category)
        .bind(Decimal::from(product.price))
        .bind(product.weight_grams)
        .bind(product.is_preorder)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((product_id,)) = inserted else {
            info!(slug = product.slug, "Product already exists, skipping");
            continue;
        };

        for &(size, quantity) in product.sizes {
            sqlx::query(
                "INSERT INTO product_size (product_id, size, stock_quantity) VALUES ($1, $2, $3)",
            )
            .bind(product_id)
            .bind(size)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

            if quantity > 0 {
                sqlx::query(
                    r"
                    INSERT INTO stock_movement
                        (product_id, size, movement_type, quantity_change, previous_stock,
                         new_stock, reason, created_by)
                    VALUES ($1, $2, $3, $4, 0, $4, 'opening stock', $5)
                    ",
                )
                .bind(product_id)
                .bind(size)
                .bind(MovementType::Restock)
                .bind(quantity)
                .bind(SEED_ACTOR)
                .execute(&mut *tx)
                .await?;
            }
        }

        created += 1;
        info!(slug = product.slug, product_id, "Seeded product");
    }

    tx.commit().await?;
    info!(created, total = CATALOGUE.len(), "Seeding complete!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_is_well_formed() {
        let mut slugs: Vec<_> = CATALOGUE.iter().map(|p| p.slug).collect();
        slugs.sort_unstable();
        slugs.dedup();
        assert_eq!(slugs.len(), CATALOGUE.len());

        for product in CATALOGUE {
            assert!(!product.sizes.is_empty(), "{} has no sizes", product.slug);
            assert!(product.sizes.iter().all(|&(_, qty)| qty >= 0));
            assert!(product.price > 0);
        }
    }
}
