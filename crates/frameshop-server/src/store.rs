use std::sync::Arc;

use async_trait::async_trait;
use frameshop_config::Store;
use frameshop_contracts::{Frame, Product, RecommendationRow};
use frameshop_kernel::{GatewayError, ProductCatalog};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub frames: Vec<Frame>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub recommendations: Vec<RecommendationRow>,
}

impl Seed {
    pub fn load(path: &str) -> Result<Self, String> {
        let text = std::fs::read_to_string(path).map_err(|e| format!("read seed failed: {e}"))?;
        serde_json::from_str(&text).map_err(|e| format!("parse seed failed: {e}"))
    }
}

#[derive(Default)]
struct MemoryStore {
    frames: Vec<Frame>,
    products: Vec<Product>,
    recommendations: Vec<RecommendationRow>,
}

enum StoreBackend {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

struct SqliteStore {
    conn: Connection,
}

#[derive(Clone)]
pub struct CatalogStore {
    backend: Arc<Mutex<StoreBackend>>,
}

impl CatalogStore {
    pub fn memory(seed: Seed) -> Result<Self, String> {
        let mut backend = StoreBackend::Memory(MemoryStore::default());
        backend.apply_seed(seed)?;
        Ok(Self::wrap(backend))
    }

    pub fn sqlite(path: &str, seed: Seed) -> Result<Self, String> {
        let mut backend = StoreBackend::Sqlite(SqliteStore::new(path)?);
        backend.apply_seed(seed)?;
        Ok(Self::wrap(backend))
    }

    pub fn from_config(cfg: &Store) -> Result<Self, String> {
        let seed = match cfg.seed_path.as_deref() {
            Some(path) => Seed::load(path)?,
            None => Seed::default(),
        };
        if cfg.kind == "sqlite" {
            let sqlite_path = cfg
                .sqlite_path
                .as_deref()
                .ok_or_else(|| "store.sqlite_path is required for sqlite store".to_string())?;
            Self::sqlite(sqlite_path, seed)
        } else {
            Self::memory(seed)
        }
    }

    fn wrap(backend: StoreBackend) -> Self {
        Self {
            backend: Arc::new(Mutex::new(backend)),
        }
    }
}

#[async_trait]
impl ProductCatalog for CatalogStore {
    async fn frame(&self, id: i64) -> Result<Option<Frame>, GatewayError> {
        let backend = self.backend.lock().await;
        backend.get_frame(id).map_err(GatewayError::Store)
    }

    async fn products_for_shop(&self, shop: &str) -> Result<Vec<Product>, GatewayError> {
        let backend = self.backend.lock().await;
        backend.get_products(shop).map_err(GatewayError::Store)
    }

    async fn recommendation_rows(
        &self,
        address: &str,
        frame_id: i64,
    ) -> Result<Vec<RecommendationRow>, GatewayError> {
        let backend = self.backend.lock().await;
        backend
            .get_recommendations(address, frame_id)
            .map_err(GatewayError::Store)
    }
}

impl StoreBackend {
    fn apply_seed(&mut self, seed: Seed) -> Result<(), String> {
        for frame in &seed.frames {
            self.save_frame(frame)?;
        }
        for product in &seed.products {
            self.save_product(product)?;
        }
        for row in &seed.recommendations {
            self.save_recommendation(row)?;
        }
        Ok(())
    }

    fn get_frame(&self, id: i64) -> Result<Option<Frame>, String> {
        match self {
            StoreBackend::Memory(store) => Ok(store.frames.iter().find(|f| f.id == id).cloned()),
            StoreBackend::Sqlite(store) => store.get_frame(id),
        }
    }

    fn get_products(&self, shop: &str) -> Result<Vec<Product>, String> {
        match self {
            StoreBackend::Memory(store) => Ok(store
                .products
                .iter()
                .filter(|p| p.shop == shop)
                .cloned()
                .collect()),
            StoreBackend::Sqlite(store) => store.get_products(shop),
        }
    }

    fn get_recommendations(
        &self,
        address: &str,
        frame_id: i64,
    ) -> Result<Vec<RecommendationRow>, String> {
        match self {
            StoreBackend::Memory(store) => Ok(store
                .recommendations
                .iter()
                .filter(|r| {
                    r.frame_id == frame_id && r.wallet_address.eq_ignore_ascii_case(address)
                })
                .cloned()
                .collect()),
            StoreBackend::Sqlite(store) => store.get_recommendations(address, frame_id),
        }
    }

    fn save_frame(&mut self, frame: &Frame) -> Result<(), String> {
        match self {
            StoreBackend::Memory(store) => {
                store.frames.retain(|f| f.id != frame.id);
                store.frames.push(frame.clone());
                Ok(())
            }
            StoreBackend::Sqlite(store) => store.save_frame(frame),
        }
    }

    fn save_product(&mut self, product: &Product) -> Result<(), String> {
        match self {
            StoreBackend::Memory(store) => {
                match store.products.iter_mut().find(|p| p.id == product.id) {
                    Some(existing) => *existing = product.clone(),
                    None => store.products.push(product.clone()),
                }
                Ok(())
            }
            StoreBackend::Sqlite(store) => store.save_product(product),
        }
    }

    fn save_recommendation(&mut self, row: &RecommendationRow) -> Result<(), String> {
        if row.primary_product_id().is_none() {
            return Err(format!(
                "recommendation row for {} on frame {} needs at least one product id",
                row.wallet_address, row.frame_id
            ));
        }
        match self {
            StoreBackend::Memory(store) => {
                store.recommendations.push(row.clone());
                Ok(())
            }
            StoreBackend::Sqlite(store) => store.save_recommendation(row),
        }
    }
}

impl SqliteStore {
    fn new(path: &str) -> Result<Self, String> {
        let conn = Connection::open(path).map_err(|e| e.to_string())?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS frames (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                shop TEXT NOT NULL,
                matching_criteria TEXT NOT NULL DEFAULT '',
                image TEXT NOT NULL,
                button_label TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                shop TEXT NOT NULL,
                handle TEXT NOT NULL,
                variant_id TEXT,
                image TEXT NOT NULL,
                price TEXT,
                position INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS products_by_shop ON products(shop, position);
            CREATE TABLE IF NOT EXISTS user_products (
                wallet_address TEXT NOT NULL,
                frame_id INTEGER NOT NULL,
                product_id_1 TEXT NOT NULL,
                product_id_2 TEXT,
                product_id_3 TEXT
            );
            ",
        )
        .map_err(|e| e.to_string())?;
        Ok(Self { conn })
    }

    fn get_frame(&self, id: i64) -> Result<Option<Frame>, String> {
        self.conn
            .query_row(
                "SELECT id, title, shop, matching_criteria, image, button_label FROM frames WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Frame {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        shop: row.get(2)?,
                        matching_criteria: row.get(3)?,
                        image: row.get(4)?,
                        button_label: row.get(5)?,
                    })
                },
            )
            .optional()
            .map_err(|e| e.to_string())
    }

    fn get_products(&self, shop: &str) -> Result<Vec<Product>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT id, title, description, shop, handle, variant_id, image, price
                FROM products WHERE shop = ?1 ORDER BY position
                ",
            )
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(params![shop], |row| {
                Ok(Product {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    shop: row.get(3)?,
                    handle: row.get(4)?,
                    variant_id: row.get(5)?,
                    image: row.get(6)?,
                    price: row.get(7)?,
                })
            })
            .map_err(|e| e.to_string())?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())
    }

    fn get_recommendations(
        &self,
        address: &str,
        frame_id: i64,
    ) -> Result<Vec<RecommendationRow>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT wallet_address, frame_id, product_id_1, product_id_2, product_id_3
                FROM user_products
                WHERE wallet_address = ?1 COLLATE NOCASE AND frame_id = ?2
                ORDER BY rowid
                ",
            )
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(params![address, frame_id], |row| {
                let ids: [Option<String>; 3] = [row.get(2)?, row.get(3)?, row.get(4)?];
                Ok(RecommendationRow {
                    wallet_address: row.get(0)?,
                    frame_id: row.get(1)?,
                    product_ids: ids.into_iter().flatten().collect(),
                })
            })
            .map_err(|e| e.to_string())?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())
    }

    fn save_frame(&mut self, frame: &Frame) -> Result<(), String> {
        self.conn
            .execute(
                "
                INSERT INTO frames (id, title, shop, matching_criteria, image, button_label)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    title=excluded.title,
                    shop=excluded.shop,
                    matching_criteria=excluded.matching_criteria,
                    image=excluded.image,
                    button_label=excluded.button_label
                ",
                params![
                    frame.id,
                    frame.title,
                    frame.shop,
                    frame.matching_criteria,
                    frame.image,
                    frame.button_label
                ],
            )
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn save_product(&mut self, product: &Product) -> Result<(), String> {
        self.conn
            .execute(
                "
                INSERT INTO products
                (id, title, description, shop, handle, variant_id, image, price, position)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                        (SELECT COALESCE(MAX(position), 0) + 1 FROM products))
                ON CONFLICT(id) DO UPDATE SET
                    title=excluded.title,
                    description=excluded.description,
                    shop=excluded.shop,
                    handle=excluded.handle,
                    variant_id=excluded.variant_id,
                    image=excluded.image,
                    price=excluded.price
                ",
                params![
                    product.id,
                    product.title,
                    product.description,
                    product.shop,
                    product.handle,
                    product.variant_id,
                    product.image,
                    product.price
                ],
            )
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn save_recommendation(&mut self, row: &RecommendationRow) -> Result<(), String> {
        let primary = row
            .primary_product_id()
            .ok_or_else(|| "recommendation row needs at least one product id".to_string())?;
        self.conn
            .execute(
                "
                INSERT INTO user_products
                (wallet_address, frame_id, product_id_1, product_id_2, product_id_3)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
                params![
                    row.wallet_address,
                    row.frame_id,
                    primary,
                    row.product_ids.get(1),
                    row.product_ids.get(2)
                ],
            )
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn product(id: &str, shop: &str) -> Product {
        Product {
            id: id.to_string(),
            title: format!("title {id}"),
            description: String::new(),
            shop: shop.to_string(),
            handle: id.to_string(),
            variant_id: None,
            image: String::new(),
            price: None,
        }
    }

    fn seed() -> Seed {
        Seed {
            frames: vec![Frame {
                id: 4,
                title: "f".to_string(),
                shop: "a.shop".to_string(),
                matching_criteria: "ALL".to_string(),
                image: "https://cdn.example/f.png".to_string(),
                button_label: "Go".to_string(),
            }],
            products: vec![
                product("p3", "a.shop"),
                product("p1", "a.shop"),
                product("p2", "b.shop"),
            ],
            recommendations: vec![RecommendationRow {
                wallet_address: "0xAbC".to_string(),
                frame_id: 4,
                product_ids: vec!["p1".to_string(), "p3".to_string()],
            }],
        }
    }

    async fn exercise(store: CatalogStore) {
        let frame = store.frame(4).await.unwrap().expect("frame 4");
        assert_eq!(frame.shop, "a.shop");
        assert!(store.frame(5).await.unwrap().is_none());

        let ids: Vec<String> = store
            .products_for_shop("a.shop")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["p3", "p1"]);

        let rows = store.recommendation_rows("0xabc", 4).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].primary_product_id(), Some("p1"));
        assert!(store.recommendation_rows("0xabc", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_store_serves_seed() {
        exercise(CatalogStore::memory(seed()).unwrap()).await;
    }

    fn temp_db(tag: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir()
            .join(format!("frameshop-store-{tag}-{nanos}.db"))
            .to_string_lossy()
            .to_string()
    }

    #[tokio::test]
    async fn sqlite_store_serves_seed_in_catalog_order() {
        let store = CatalogStore::sqlite(&temp_db("order"), seed()).unwrap();
        exercise(store).await;
    }

    #[test]
    fn seed_rows_without_products_are_rejected_by_both_backends() {
        let mut bad = seed();
        bad.recommendations[0].product_ids.clear();

        let err = CatalogStore::memory(bad.clone())
            .err()
            .expect("memory store should reject the row");
        assert!(err.contains("needs at least one product id"));

        let err = CatalogStore::sqlite(&temp_db("empty-ids"), bad)
            .err()
            .expect("sqlite store should reject the row");
        assert!(err.contains("needs at least one product id"));
    }
}
