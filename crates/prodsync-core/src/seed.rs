//! Demo catalogue for local runs
//!
//! Seeding only happens into an empty store, so restarting the daemon
//! against a file store does not duplicate records.

use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{NewProduct, Price, Product, ProductId};
use crate::traits::RecordStoreFactory;

struct DemoProduct {
    id: u128,
    name: &'static str,
    description: &'static str,
    price: Price,
    created_days_ago: i64,
    updated_days_ago: Option<i64>,
}

const DEMO_PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        id: 0x11111111_1111_1111_1111_111111111111,
        name: "Laptop Pro 15",
        description: "High-performance laptop with 15-inch display, 16GB RAM, 512GB SSD",
        price: Price::new(1299, 99),
        created_days_ago: 30,
        updated_days_ago: Some(5),
    },
    DemoProduct {
        id: 0x22222222_2222_2222_2222_222222222222,
        name: "Wireless Mouse",
        description: "Ergonomic wireless mouse with adjustable DPI",
        price: Price::new(49, 99),
        created_days_ago: 25,
        updated_days_ago: None,
    },
    DemoProduct {
        id: 0x33333333_3333_3333_3333_333333333333,
        name: "Mechanical Keyboard",
        description: "RGB mechanical keyboard with Cherry MX switches",
        price: Price::new(149, 99),
        created_days_ago: 20,
        updated_days_ago: Some(2),
    },
    DemoProduct {
        id: 0x44444444_4444_4444_4444_444444444444,
        name: "4K Monitor 27\"",
        description: "Ultra HD 4K monitor with HDR support and 144Hz refresh rate",
        price: Price::new(599, 99),
        created_days_ago: 15,
        updated_days_ago: None,
    },
    DemoProduct {
        id: 0x55555555_5555_5555_5555_555555555555,
        name: "USB-C Hub",
        description: "7-in-1 USB-C hub with HDMI, USB 3.0, and SD card reader",
        price: Price::new(79, 99),
        created_days_ago: 10,
        updated_days_ago: None,
    },
    DemoProduct {
        id: 0x66666666_6666_6666_6666_666666666666,
        name: "Noise Cancelling Headphones",
        description: "Premium wireless headphones with active noise cancellation",
        price: Price::new(349, 99),
        created_days_ago: 8,
        updated_days_ago: Some(1),
    },
    DemoProduct {
        id: 0x77777777_7777_7777_7777_777777777777,
        name: "Webcam HD 1080p",
        description: "Full HD webcam with built-in microphone and auto-focus",
        price: Price::new(89, 99),
        created_days_ago: 5,
        updated_days_ago: None,
    },
    DemoProduct {
        id: 0x88888888_8888_8888_8888_888888888888,
        name: "External SSD 1TB",
        description: "Portable SSD with USB 3.2 Gen 2 and 1050MB/s read speed",
        price: Price::new(129, 99),
        created_days_ago: 3,
        updated_days_ago: None,
    },
    DemoProduct {
        id: 0x99999999_9999_9999_9999_999999999999,
        name: "Desk Lamp LED",
        description: "Adjustable LED desk lamp with multiple brightness levels",
        price: Price::new(39, 99),
        created_days_ago: 2,
        updated_days_ago: None,
    },
    DemoProduct {
        id: 0xaaaaaaaa_aaaa_aaaa_aaaa_aaaaaaaaaaaa,
        name: "Laptop Stand",
        description: "Aluminum laptop stand with adjustable height and angle",
        price: Price::new(59, 99),
        created_days_ago: 1,
        updated_days_ago: None,
    },
    DemoProduct {
        id: 0xbbbbbbbb_bbbb_bbbb_bbbb_bbbbbbbbbbbb,
        name: "Cable Ties (50 pack)",
        description: "  Reusable nylon cable ties  ",
        price: Price::new(4, 99),
        created_days_ago: 1,
        updated_days_ago: None,
    },
];

/// The demo catalogue, with timestamps relative to `now`
pub fn demo_products(now: DateTime<Utc>) -> Result<Vec<Product>> {
    DEMO_PRODUCTS
        .iter()
        .map(|demo| {
            let mut product = Product::create(
                NewProduct::new(demo.name, demo.price).with_description(demo.description),
            )?;
            product.id = ProductId::from_uuid(Uuid::from_u128(demo.id));
            product.created_at = now - Duration::days(demo.created_days_ago);
            product.updated_at = demo.updated_days_ago.map(|days| now - Duration::days(days));
            Ok(product)
        })
        .collect()
}

/// Insert the demo catalogue if the store holds no records
///
/// Returns the number of records inserted.
pub async fn seed_if_empty(factory: &dyn RecordStoreFactory) -> Result<usize> {
    let store = factory.open().await?;

    if !store.list_records().await?.is_empty() {
        info!("Store already has records, skipping demo seed");
        return Ok(0);
    }

    for product in demo_products(Utc::now())? {
        store.add_record(product).await?;
    }
    let inserted = store.commit().await?;

    info!("Seeded {} demo products", inserted);
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryRecordStore, MemoryRecordStoreFactory};

    #[test]
    fn demo_products_are_valid_and_unique() {
        let products = demo_products(Utc::now()).unwrap();
        assert_eq!(products.len(), DEMO_PRODUCTS.len());

        let mut ids: Vec<_> = products.iter().map(|p| p.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), products.len());
    }

    #[test]
    fn ids_are_stable() {
        let products = demo_products(Utc::now()).unwrap();
        assert_eq!(
            products[0].id.to_string(),
            "11111111-1111-1111-1111-111111111111"
        );
    }

    #[tokio::test]
    async fn seeds_only_once() {
        let factory = MemoryRecordStoreFactory::new(MemoryRecordStore::new());

        let first = seed_if_empty(&factory).await.unwrap();
        assert_eq!(first, DEMO_PRODUCTS.len());

        let second = seed_if_empty(&factory).await.unwrap();
        assert_eq!(second, 0);
        assert_eq!(factory.store().len().await, DEMO_PRODUCTS.len());
    }
}
