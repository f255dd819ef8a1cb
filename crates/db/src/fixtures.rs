use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use shopfront_core::domain::product::{Category, CategorySlug, Product, ProductId};

use crate::repositories::{CatalogRepository, RepositoryError, SqlCatalogRepository};
use crate::DbPool;

struct SeedProduct {
    id: &'static str,
    slug: &'static str,
    name: &'static str,
    description: &'static str,
    price_cents: i64,
    category: &'static str,
    age_hours: i64,
}

const SEED_CATEGORIES: &[(&str, &str)] =
    &[("coffee", "Coffee"), ("tea", "Tea"), ("equipment", "Equipment")];

const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        id: "prod-espresso-beans",
        slug: "espresso-beans",
        name: "Espresso Beans",
        description: "Dark roast arabica, 500g bag.",
        price_cents: 1999,
        category: "coffee",
        age_hours: 72,
    },
    SeedProduct {
        id: "prod-filter-papers",
        slug: "filter-papers",
        name: "Filter Papers",
        description: "Pack of 100 unbleached filters.",
        price_cents: 450,
        category: "coffee",
        age_hours: 48,
    },
    SeedProduct {
        id: "prod-sencha",
        slug: "sencha-loose-leaf",
        name: "Sencha Loose Leaf",
        description: "Japanese green tea, 100g tin.",
        price_cents: 1250,
        category: "tea",
        age_hours: 24,
    },
    SeedProduct {
        id: "prod-hand-grinder",
        slug: "hand-grinder",
        name: "Hand Grinder",
        description: "Conical burr grinder with 40 click settings.",
        price_cents: 8900,
        category: "equipment",
        age_hours: 12,
    },
];

/// Load a small demo catalog so a fresh database has something to sell.
/// Idempotent: seeds upsert by id.
pub async fn seed_demo_catalog(pool: &DbPool) -> Result<(), RepositoryError> {
    let repo = SqlCatalogRepository::new(pool.clone());
    let now = Utc::now();

    for (slug, name) in SEED_CATEGORIES {
        repo.save_category(Category {
            slug: CategorySlug(slug.to_string()),
            name: name.to_string(),
        })
        .await?;
    }

    for seed in SEED_PRODUCTS {
        repo.save_product(Product {
            id: ProductId(seed.id.to_string()),
            slug: seed.slug.to_string(),
            name: seed.name.to_string(),
            description: seed.description.to_string(),
            price: Decimal::new(seed.price_cents, 2),
            category: CategorySlug(seed.category.to_string()),
            available: true,
            created_at: now - Duration::hours(seed.age_hours),
        })
        .await?;
    }

    Ok(())
}
