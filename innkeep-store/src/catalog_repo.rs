use async_trait::async_trait;
use innkeep_core::{Branch, BranchId, CatalogRepository, Price, Room, RoomId, RoomType, StoreError};
use sqlx::PgPool;

use crate::database::backend;

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BranchRow {
    id: i64,
    name: String,
    state: String,
}

#[derive(sqlx::FromRow)]
pub(crate) struct RoomRow {
    id: i64,
    room_number: String,
    room_type: String,
    branch_id: i64,
}

#[derive(sqlx::FromRow)]
struct PriceRow {
    room_type: String,
    nightly_rate_minor: i64,
    currency: String,
}

pub(crate) fn parse_room_type(raw: &str) -> Result<RoomType, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Backend(format!("unexpected room_type {} in storage", raw)))
}

impl From<BranchRow> for Branch {
    fn from(row: BranchRow) -> Self {
        Branch {
            id: BranchId(row.id),
            name: row.name,
            state: row.state,
        }
    }
}

impl TryFrom<RoomRow> for Room {
    type Error = StoreError;

    fn try_from(row: RoomRow) -> Result<Self, Self::Error> {
        Ok(Room {
            id: RoomId(row.id),
            number: row.room_number,
            room_type: parse_room_type(&row.room_type)?,
            branch_id: BranchId(row.branch_id),
        })
    }
}

impl TryFrom<PriceRow> for Price {
    type Error = StoreError;

    fn try_from(row: PriceRow) -> Result<Self, Self::Error> {
        Ok(Price {
            room_type: parse_room_type(&row.room_type)?,
            nightly_rate_minor: row.nightly_rate_minor,
            currency: row.currency,
        })
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn branch(&self, id: BranchId) -> Result<Option<Branch>, StoreError> {
        let row = sqlx::query_as::<_, BranchRow>("SELECT id, name, state FROM branches WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        Ok(row.map(Branch::from))
    }

    async fn room(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        let row = sqlx::query_as::<_, RoomRow>(
            "SELECT id, room_number, room_type, branch_id FROM rooms WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Room::try_from).transpose()
    }

    async fn rooms_of_type(
        &self,
        branch_id: BranchId,
        room_type: RoomType,
    ) -> Result<Vec<Room>, StoreError> {
        let rows = sqlx::query_as::<_, RoomRow>(
            r#"
            SELECT id, room_number, room_type, branch_id
            FROM rooms
            WHERE branch_id = $1 AND room_type = $2
            ORDER BY id
            "#,
        )
        .bind(branch_id.0)
        .bind(room_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(Room::try_from).collect()
    }

    async fn price_for(&self, room_type: RoomType) -> Result<Option<Price>, StoreError> {
        let row = sqlx::query_as::<_, PriceRow>(
            "SELECT room_type, nightly_rate_minor, currency FROM prices WHERE room_type = $1",
        )
        .bind(room_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Price::try_from).transpose()
    }

    async fn prices(&self) -> Result<Vec<Price>, StoreError> {
        let rows = sqlx::query_as::<_, PriceRow>(
            "SELECT room_type, nightly_rate_minor, currency FROM prices ORDER BY nightly_rate_minor",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(Price::try_from).collect()
    }
}
