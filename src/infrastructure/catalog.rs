use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::{Catalog, ProductSnapshot};
use crate::schema::products;

use super::models::ProductRow;

impl From<ProductRow> for ProductSnapshot {
    fn from(row: ProductRow) -> Self {
        ProductSnapshot {
            id: row.id,
            title: row.title,
            image: row.image,
            price: row.price,
            vendor_id: row.vendor_id,
            vendor_name: row.vendor_name,
        }
    }
}

/// Reads the catalog's `products` table.
pub struct DieselCatalog {
    pool: DbPool,
}

impl DieselCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl Catalog for DieselCatalog {
    fn get_product(&self, id: Uuid) -> Result<Option<ProductSnapshot>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(ProductSnapshot::from))
    }
}
