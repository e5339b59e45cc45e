//! Catalog CRUD and vector/fuzzy search (spec C2), grounded on the teacher's
//! episode CRUD idiom (`memory-storage-turso/src/storage/episodes/crud.rs`)
//! and its brute-force similarity search
//! (`memory-storage-turso/src/storage/search.rs`).

use async_trait::async_trait;
use libsql::{params, params_from_iter, Row};
use search_core::error::{Error, Result};
use search_core::store::{ScoredProduct, VectorStore};
use search_core::types::product::{AttributeValue, Product, ProductStatus, StockStatus};
use search_core::types::Filters;
use std::collections::BTreeMap;
use tracing::debug;

use crate::connection::VectorTursoStore;

const SELECT_COLUMNS: &str = "external_id, internal_id, store_id, title, description, vendor, \
    product_type, price, tags, seo_title, seo_description, attributes, stock_status, sku, \
    barcode, status, image_url, text_embedding, image_embedding, combined_embedding";

/// Cosine similarity, normalized from `[-1, 1]` to `[0, 1]` so a caller can
/// compare it directly against `similarity_threshold` (spec §4.1).
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    ((dot / (mag_a * mag_b)) + 1.0) / 2.0
}

fn stock_status_str(s: StockStatus) -> &'static str {
    match s {
        StockStatus::InStock => "in_stock",
        StockStatus::OutOfStock => "out_of_stock",
        StockStatus::Backorder => "backorder",
    }
}

fn parse_stock_status(s: &str) -> StockStatus {
    match s {
        "out_of_stock" => StockStatus::OutOfStock,
        "backorder" => StockStatus::Backorder,
        _ => StockStatus::InStock,
    }
}

fn status_str(s: ProductStatus) -> &'static str {
    match s {
        ProductStatus::Active => "active",
        ProductStatus::Draft => "draft",
        ProductStatus::Archived => "archived",
    }
}

fn parse_status(s: &str) -> ProductStatus {
    match s {
        "draft" => ProductStatus::Draft,
        "archived" => ProductStatus::Archived,
        _ => ProductStatus::Active,
    }
}

fn row_to_product(row: &Row) -> Result<Product> {
    let tags_json: String = row.get(8).map_err(|e| Error::Serialization(e.to_string()))?;
    let attributes_json: String = row.get(11).map_err(|e| Error::Serialization(e.to_string()))?;
    let text_embedding_json: String = row.get(17).map_err(|e| Error::Serialization(e.to_string()))?;
    let image_embedding_json: Option<String> =
        row.get(18).map_err(|e| Error::Serialization(e.to_string()))?;
    let combined_embedding_json: String =
        row.get(19).map_err(|e| Error::Serialization(e.to_string()))?;
    let stock_status: String = row.get(12).map_err(|e| Error::Serialization(e.to_string()))?;
    let status: String = row.get(15).map_err(|e| Error::Serialization(e.to_string()))?;

    Ok(Product {
        external_id: row.get(0).map_err(|e| Error::Serialization(e.to_string()))?,
        internal_id: row.get(1).map_err(|e| Error::Serialization(e.to_string()))?,
        store_id: row.get(2).map_err(|e| Error::Serialization(e.to_string()))?,
        title: row.get(3).map_err(|e| Error::Serialization(e.to_string()))?,
        description: row.get(4).map_err(|e| Error::Serialization(e.to_string()))?,
        vendor: row.get(5).map_err(|e| Error::Serialization(e.to_string()))?,
        product_type: row.get(6).map_err(|e| Error::Serialization(e.to_string()))?,
        price: row.get(7).map_err(|e| Error::Serialization(e.to_string()))?,
        tags: serde_json::from_str(&tags_json)?,
        seo_title: row.get(9).map_err(|e| Error::Serialization(e.to_string()))?,
        seo_description: row.get(10).map_err(|e| Error::Serialization(e.to_string()))?,
        attributes: serde_json::from_str::<BTreeMap<String, AttributeValue>>(&attributes_json)?,
        stock_status: parse_stock_status(&stock_status),
        sku: row.get(13).map_err(|e| Error::Serialization(e.to_string()))?,
        barcode: row.get(14).map_err(|e| Error::Serialization(e.to_string()))?,
        status: parse_status(&status),
        image_url: row.get(16).map_err(|e| Error::Serialization(e.to_string()))?,
        text_embedding: serde_json::from_str(&text_embedding_json)?,
        image_embedding: image_embedding_json
            .map(|s| serde_json::from_str(&s))
            .transpose()?,
        combined_embedding: serde_json::from_str(&combined_embedding_json)?,
    })
}

/// Build a `WHERE` clause and matching params for `filters`, to push the
/// cheap, selective predicates down to SQL before the remaining candidates
/// are scored in Rust (spec §4.1 "predicate pushdown").
fn filter_clause(filters: &Filters) -> (String, Vec<libsql::Value>) {
    let mut clauses = vec!["status != 'archived'".to_string()];
    let mut args: Vec<libsql::Value> = Vec::new();

    if let Some(min) = filters.min_price {
        clauses.push("price >= ?".to_string());
        args.push(min.into());
    }
    if let Some(max) = filters.max_price {
        clauses.push("price <= ?".to_string());
        args.push(max.into());
    }
    if let Some(store) = &filters.store_scope {
        clauses.push("store_id = ?".to_string());
        args.push(store.clone().into());
    }
    if let Some(status) = filters.status {
        clauses.push("status = ?".to_string());
        args.push(status_str(status).to_string().into());
    }
    if let Some(stock) = filters.stock_status {
        clauses.push("stock_status = ?".to_string());
        args.push(stock_status_str(stock).to_string().into());
    }

    (clauses.join(" AND "), args)
}

#[async_trait]
impl VectorStore for VectorTursoStore {
    async fn upsert_product(&self, product: &Product) -> Result<()> {
        debug!(external_id = %product.external_id, "upserting product");
        let conn = self.get_connection().await?;

        let sql = format!(
            "INSERT OR REPLACE INTO products ({SELECT_COLUMNS}, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, strftime('%s', 'now'))"
        );

        conn.execute(
            &sql,
            params![
                product.external_id.clone(),
                product.internal_id,
                product.store_id.clone(),
                product.title.clone(),
                product.description.clone(),
                product.vendor.clone(),
                product.product_type.clone(),
                product.price,
                serde_json::to_string(&product.tags)?,
                product.seo_title.clone(),
                product.seo_description.clone(),
                serde_json::to_string(&product.attributes)?,
                stock_status_str(product.stock_status),
                product.sku.clone(),
                product.barcode.clone(),
                status_str(product.status),
                product.image_url.clone(),
                serde_json::to_string(&product.text_embedding)?,
                product
                    .image_embedding
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                serde_json::to_string(&product.combined_embedding)?,
            ],
        )
        .await
        .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        Ok(())
    }

    async fn get_product(&self, external_id: &str) -> Result<Option<Product>> {
        let conn = self.get_connection().await?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM products WHERE external_id = ?");
        let mut rows = conn
            .query(&sql, params![external_id.to_string()])
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        match rows.next().await.map_err(|e| Error::StoreUnavailable(e.to_string()))? {
            Some(row) => Ok(Some(row_to_product(&row)?)),
            None => Ok(None),
        }
    }

    async fn search_semantic(
        &self,
        embedding: &[f32],
        filters: &Filters,
        similarity_threshold: f32,
        offset: u32,
        limit: u32,
    ) -> Result<(Vec<ScoredProduct>, u64)> {
        let conn = self.get_connection().await?;
        let (where_clause, args) = filter_clause(filters);
        let sql = format!("SELECT {SELECT_COLUMNS} FROM products WHERE {where_clause}");

        let mut rows = conn
            .query(&sql, params_from_iter(args))
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        let mut scored = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::StoreUnavailable(e.to_string()))? {
            let product = row_to_product(&row)?;
            let similarity = cosine_similarity(embedding, &product.combined_embedding);
            if similarity >= similarity_threshold {
                scored.push(ScoredProduct { product, similarity });
            }
        }

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.product.internal_id.cmp(&b.product.internal_id))
        });
        let total = scored.len() as u64;
        let page = scored
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok((page, total))
    }

    async fn search_fuzzy(
        &self,
        query: &str,
        filters: &Filters,
        min_trigram_score: f32,
        offset: u32,
        limit: u32,
    ) -> Result<(Vec<ScoredProduct>, u64)> {
        let conn = self.get_connection().await?;
        let (where_clause, mut args) = filter_clause(filters);
        let like_pattern = format!("%{}%", query.to_lowercase().replace(['%', '_'], ""));
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM products WHERE {where_clause} \
             AND (LOWER(title) LIKE ? OR LOWER(COALESCE(description, '')) LIKE ?)"
        );
        args.push(like_pattern.clone().into());
        args.push(like_pattern.into());

        let mut rows = conn
            .query(&sql, params_from_iter(args))
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        let mut scored = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::StoreUnavailable(e.to_string()))? {
            let product = row_to_product(&row)?;
            let score = strsim::normalized_levenshtein(&product.title.to_lowercase(), &query.to_lowercase());
            let score = score.max(0.6) as f32; // the LIKE pushdown already guarantees a substring hit
            if score >= min_trigram_score {
                scored.push(ScoredProduct { product, similarity: score });
            }
        }

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.product.internal_id.cmp(&b.product.internal_id))
        });
        let total = scored.len() as u64;
        let page = scored
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok((page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_core::types::product::{AttributeValue as AV, ProductStatus as PS, StockStatus as SS};

    fn product(id: i64, title: &str, price: f64, vendor: &str) -> Product {
        Product {
            external_id: format!("ext-{id}"),
            internal_id: id,
            store_id: None,
            title: title.into(),
            description: None,
            vendor: Some(vendor.into()),
            product_type: Some("boots".into()),
            price,
            tags: vec!["boots".into()],
            seo_title: None,
            seo_description: None,
            attributes: BTreeMap::from([("color".to_string(), AV::Text("black".into()))]),
            stock_status: SS::InStock,
            sku: None,
            barcode: None,
            status: PS::Active,
            image_url: None,
            text_embedding: vec![1.0, 0.0],
            image_embedding: None,
            combined_embedding: vec![1.0, 0.0],
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = VectorTursoStore::new(":memory:", "").await.unwrap();
        let p = product(1, "black leather boots", 59.0, "acme");
        store.upsert_product(&p).await.unwrap();

        let fetched = store.get_product("ext-1").await.unwrap().unwrap();
        assert_eq!(fetched.title, "black leather boots");
        assert_eq!(fetched.attributes.get("color"), Some(&AV::Text("black".into())));
    }

    #[tokio::test]
    async fn semantic_search_filters_by_similarity_threshold() {
        let store = VectorTursoStore::new(":memory:", "").await.unwrap();
        store.upsert_product(&product(1, "boots", 50.0, "acme")).await.unwrap();
        let mut far = product(2, "sandals", 50.0, "acme");
        far.combined_embedding = vec![0.0, 1.0];
        store.upsert_product(&far).await.unwrap();

        let (results, total) = store
            .search_semantic(&[1.0, 0.0], &Filters::default(), 0.9, 0, 10)
            .await
            .unwrap();

        assert_eq!(total, 1);
        assert_eq!(results[0].product.external_id, "ext-1");
    }

    #[tokio::test]
    async fn semantic_search_respects_price_filter() {
        let store = VectorTursoStore::new(":memory:", "").await.unwrap();
        store.upsert_product(&product(1, "boots", 10.0, "acme")).await.unwrap();
        store.upsert_product(&product(2, "boots", 90.0, "acme")).await.unwrap();

        let filters = Filters {
            min_price: Some(50.0),
            ..Default::default()
        };
        let (results, total) = store
            .search_semantic(&[1.0, 0.0], &filters, 0.0, 0, 10)
            .await
            .unwrap();

        assert_eq!(total, 1);
        assert_eq!(results[0].product.external_id, "ext-2");
    }

    #[tokio::test]
    async fn fuzzy_search_matches_substring() {
        let store = VectorTursoStore::new(":memory:", "").await.unwrap();
        store.upsert_product(&product(1, "suede ankle boots", 50.0, "acme")).await.unwrap();

        let (results, _total) = store
            .search_fuzzy("ankle boots", &Filters::default(), 0.3, 0, 10)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
    }
}
