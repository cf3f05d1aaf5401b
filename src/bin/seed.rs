use std::str::FromStr;

use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::{
    db::{create_orm_conn, run_migrations},
    gateway::{
        CatalogGateway, NewCategory, NewProduct, NewProfile, ProductFilter, ProfileGateway,
        postgres::PgGateway,
    },
};

const CATALOG: &[(&str, &[(&str, &str, f64, &[&str])])] = &[
    (
        "Sneakers",
        &[
            ("Runner Pro", "89.90", 4.7, &["40", "41", "42", "43"]),
            ("Court Classic", "64.50", 4.2, &["39", "40", "41"]),
        ],
    ),
    (
        "T-Shirts",
        &[
            ("Basic Tee", "12.99", 4.1, &["S", "M", "L", "XL"]),
            ("Graphic Tee", "18.00", 3.8, &["M", "L"]),
        ],
    ),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    let gateway = PgGateway::new(orm);

    ensure_profile(&gateway, "admin", "Store", "Admin", true).await?;
    ensure_profile(&gateway, "shopper", "Test", "Shopper", false).await?;

    if gateway.count_products(&ProductFilter::default()).await? > 0 {
        tracing::info!("catalog already seeded");
        return Ok(());
    }

    for (name, products) in CATALOG {
        let category = gateway
            .insert_category(NewCategory {
                name: name.to_string(),
                pic_url: None,
            })
            .await?;
        for (title, price, rating, sizes) in *products {
            gateway
                .insert_product(NewProduct {
                    title: title.to_string(),
                    description: format!("{title} from the {name} range"),
                    pic_url: vec![format!("https://picsum.photos/seed/{}/600", slug(title))],
                    brand: category.id,
                    price: Decimal::from_str(price)?,
                    rating: Some(*rating),
                    size: sizes.iter().map(|s| s.to_string()).collect(),
                })
                .await?;
        }
        tracing::info!(category = name, products = products.len(), "category seeded");
    }

    Ok(())
}

async fn ensure_profile(
    gateway: &PgGateway,
    user_id: &str,
    first_name: &str,
    last_name: &str,
    is_admin: bool,
) -> anyhow::Result<()> {
    if gateway.find_profile(user_id).await?.is_some() {
        return Ok(());
    }
    gateway
        .insert_profile(NewProfile {
            user_id: user_id.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone: None,
            address: Some("Calle Falsa 123".to_string()),
            email: Some(format!("{user_id}@example.com")),
            is_admin,
        })
        .await?;
    tracing::info!(user_id, is_admin, "profile seeded");
    Ok(())
}

fn slug(title: &str) -> String {
    title.to_ascii_lowercase().replace(' ', "-")
}
