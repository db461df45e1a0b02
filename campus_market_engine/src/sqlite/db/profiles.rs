use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{Address, Profile, ProfileUpdate};

/// Creates the profile row if it does not exist yet, and overwrites only the fields present in `update`.
pub async fn upsert_profile(
    address: &Address,
    update: ProfileUpdate,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO profiles (address, name, school, campus, phone, avatar, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            ON CONFLICT (address) DO UPDATE SET
                name = COALESCE(excluded.name, profiles.name),
                school = COALESCE(excluded.school, profiles.school),
                campus = COALESCE(excluded.campus, profiles.campus),
                phone = COALESCE(excluded.phone, profiles.phone),
                avatar = COALESCE(excluded.avatar, profiles.avatar),
                updated_at = excluded.updated_at;
        "#,
    )
    .bind(address)
    .bind(update.name)
    .bind(update.school)
    .bind(update.campus)
    .bind(update.phone)
    .bind(update.avatar)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    debug!("🗃️ Profile for {address} saved");
    Ok(())
}

pub async fn fetch_profile(address: &Address, conn: &mut SqliteConnection) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT p.*, (SELECT COALESCE(SUM(delta), 0) FROM points_log WHERE address = p.address) AS points
            FROM profiles p
            WHERE p.address = $1;
        "#,
    )
    .bind(address)
    .fetch_optional(conn)
    .await
}
