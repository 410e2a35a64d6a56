use crate::models::{Offer, Search};
use crate::store::{OfferStore, SearchStore};
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS searches (
        id         INTEGER PRIMARY KEY,
        user_id    INTEGER NOT NULL,
        url        TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(user_id, url)
    );
    CREATE INDEX IF NOT EXISTS idx_searches_user ON searches(user_id);

    CREATE TABLE IF NOT EXISTS offers (
        id                 INTEGER PRIMARY KEY,
        user_id            INTEGER NOT NULL,
        title              TEXT NOT NULL,
        price              INTEGER NOT NULL,
        location           TEXT NOT NULL,
        time               TEXT NOT NULL,
        url                TEXT NOT NULL,
        additional_payment INTEGER NOT NULL DEFAULT 0,
        description        TEXT NOT NULL DEFAULT '',
        rooms              TEXT NOT NULL DEFAULT '',
        area               TEXT NOT NULL DEFAULT '',
        floor              TEXT NOT NULL DEFAULT '',
        images             TEXT NOT NULL DEFAULT '[]',
        created_at         TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(title, price, user_id)
    );
";

/// Offer and search store on a single sqlite connection.
///
/// The mutex serializes the poller against CLI writers sharing the store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }
}

fn search_from_row(row: &Row<'_>) -> rusqlite::Result<Search> {
    Ok(Search {
        id: row.get(0)?,
        user_id: row.get(1)?,
        url: row.get(2)?,
    })
}

impl OfferStore for SqliteStore {
    fn offer_exists(&self, title: &str, price: i64, user_id: i64) -> Result<bool> {
        let exists = self.conn()?.query_row(
            "SELECT EXISTS(SELECT 1 FROM offers WHERE title = ?1 AND price = ?2 AND user_id = ?3)",
            params![title, price, user_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn add_offer(&self, offer: &Offer, user_id: i64) -> Result<()> {
        let images = serde_json::to_string(&offer.images)?;
        let inserted = self.conn()?.execute(
            "INSERT OR IGNORE INTO offers
                (user_id, title, price, location, time, url, additional_payment,
                 description, rooms, area, floor, images)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                user_id,
                offer.title,
                offer.price,
                offer.location,
                offer.time,
                offer.url,
                offer.additional_payment,
                offer.description,
                offer.rooms,
                offer.area,
                offer.floor,
                images,
            ],
        )?;
        if inserted == 0 {
            debug!("Offer {} already stored for user {}", offer.url, user_id);
        }
        Ok(())
    }

    fn list_offers(&self) -> Result<Vec<(Offer, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, title, price, location, time, url, additional_payment,
                    description, rooms, area, floor, images
             FROM offers ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            let offer = Offer {
                title: row.get(1)?,
                price: row.get(2)?,
                location: row.get(3)?,
                time: row.get(4)?,
                url: row.get(5)?,
                additional_payment: row.get(6)?,
                description: row.get(7)?,
                rooms: row.get(8)?,
                area: row.get(9)?,
                floor: row.get(10)?,
                images: Vec::new(),
            };
            Ok((offer, row.get::<_, String>(11)?, row.get::<_, i64>(0)?))
        })?;

        let mut offers = Vec::new();
        for row in rows {
            let (mut offer, images, user_id) = row?;
            offer.images = serde_json::from_str(&images)
                .with_context(|| format!("Corrupt image list for offer {}", offer.url))?;
            offers.push((offer, user_id));
        }
        Ok(offers)
    }
}

impl SearchStore for SqliteStore {
    fn add_search(&self, user_id: i64, url: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO searches (user_id, url) VALUES (?1, ?2)",
            params![user_id, url],
        )?;
        let id = conn.query_row(
            "SELECT id FROM searches WHERE user_id = ?1 AND url = ?2",
            params![user_id, url],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn delete_search(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM searches WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn search_exists(&self, id: i64) -> Result<bool> {
        let exists = self.conn()?.query_row(
            "SELECT EXISTS(SELECT 1 FROM searches WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn list_searches(&self) -> Result<Vec<Search>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, user_id, url FROM searches ORDER BY id")?;
        let searches = stmt
            .query_map([], search_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(searches)
    }

    fn searches_for_user(&self, user_id: i64) -> Result<Vec<Search>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, user_id, url FROM searches WHERE user_id = ?1 ORDER BY id")?;
        let searches = stmt
            .query_map(params![user_id], search_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(searches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(title: &str, price: i64) -> Offer {
        Offer {
            title: title.into(),
            price,
            location: "Kraków, Podgórze".into(),
            time: "16:30".into(),
            url: format!("https://www.olx.pl/d/oferta/{title}.html"),
            additional_payment: 500,
            images: vec!["https://img/1.jpg".into(), "https://img/2.jpg".into()],
            ..Offer::default()
        }
    }

    #[test]
    fn offers_dedup_per_subscriber() {
        let store = SqliteStore::open_in_memory().unwrap();
        let o = offer("kawalerka", 1700);

        assert!(!store.offer_exists(&o.title, o.price, 1).unwrap());
        store.add_offer(&o, 1).unwrap();
        store.add_offer(&o, 1).unwrap();
        assert!(store.offer_exists(&o.title, o.price, 1).unwrap());
        assert!(!store.offer_exists(&o.title, o.price, 2).unwrap());
        assert!(!store.offer_exists(&o.title, 1800, 1).unwrap());

        store.add_offer(&o, 2).unwrap();
        assert_eq!(store.list_offers().unwrap().len(), 2);
    }

    #[test]
    fn list_offers_round_trips_images() {
        let store = SqliteStore::open_in_memory().unwrap();
        let o = offer("dwa-pokoje", 3200);
        store.add_offer(&o, 7).unwrap();

        let rows = store.list_offers().unwrap();
        assert_eq!(rows, vec![(o, 7)]);
    }

    #[test]
    fn searches_are_unique_per_user() {
        let store = SqliteStore::open_in_memory().unwrap();
        let url = "https://www.olx.pl/nieruchomosci/mieszkania/wynajem/krakow/";

        let a = store.add_search(1, url).unwrap();
        assert_eq!(store.add_search(1, url).unwrap(), a);
        let b = store.add_search(2, url).unwrap();
        assert_ne!(a, b);

        assert_eq!(store.list_searches().unwrap().len(), 2);
        assert_eq!(
            store.searches_for_user(2).unwrap(),
            vec![Search {
                id: b,
                user_id: 2,
                url: url.into()
            }]
        );
    }

    #[test]
    fn delete_search() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.add_search(1, "https://www.olx.pl/x").unwrap();

        assert!(store.search_exists(id).unwrap());
        assert!(store.delete_search(id).unwrap());
        assert!(!store.search_exists(id).unwrap());
        assert!(!store.delete_search(id).unwrap());
        assert!(store.list_searches().unwrap().is_empty());
    }
}
