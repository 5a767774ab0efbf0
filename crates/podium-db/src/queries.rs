use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use podium_types::models::{ClaimRecord, User};

use crate::{Database, Result, StoreError};

impl Database {
    // -- Users --

    /// Insert a new user with zero points. Name uniqueness is enforced by
    /// the store; a duplicate maps to `StoreError::Conflict`.
    pub fn create_user(&self, name: &str) -> Result<User> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, total_points, created_at, updated_at)
                 VALUES (?1, ?2, 0, ?3, ?3)",
                params![id.to_string(), name, now],
            )
            .map_err(|e| StoreError::from_unique_violation(e, name))?;

            Ok(User {
                id,
                name: name.to_string(),
                total_points: 0,
                created_at: now,
                updated_at: now,
            })
        })
    }

    pub fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, total_points, created_at, updated_at
                 FROM users WHERE id = ?1",
            )?;

            let row = stmt
                .query_row([id.to_string()], read_user)
                .optional()?;

            row.map(UserRow::into_user).transpose()
        })
    }

    /// All users, oldest first.
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, total_points, created_at, updated_at
                 FROM users ORDER BY created_at ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([], read_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(UserRow::into_user).collect()
        })
    }

    /// All users, pre-sorted by the ranking criteria. The rank engine
    /// re-sorts defensively, so this ordering is a read-path convenience,
    /// not a correctness requirement.
    pub fn list_users_by_rank(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, total_points, created_at, updated_at
                 FROM users
                 ORDER BY total_points DESC, updated_at ASC, created_at ASC, id ASC",
            )?;

            let rows = stmt
                .query_map([], read_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(UserRow::into_user).collect()
        })
    }

    // -- Claims --

    /// Atomically add `points` to a user's total and append the claim
    /// record, in one transaction. The UPDATE is the serialization point:
    /// there is no read-modify-write of the total in process memory, so
    /// concurrent claims against the same user can never lose an increment.
    ///
    /// Returns the updated user together with the new record.
    pub fn apply_claim(&self, user_id: Uuid, points: i64) -> Result<(User, ClaimRecord)> {
        let record_id = Uuid::new_v4();
        let now = Utc::now();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let user = tx
                .query_row(
                    "UPDATE users
                     SET total_points = total_points + ?1, updated_at = ?2
                     WHERE id = ?3
                     RETURNING id, name, total_points, created_at, updated_at",
                    params![points, now, user_id.to_string()],
                    read_user,
                )
                .optional()?
                .ok_or(StoreError::NotFound)?
                .into_user()?;

            tx.execute(
                "INSERT INTO claims (id, user_id, points, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![record_id.to_string(), user_id.to_string(), points, now],
            )?;

            tx.commit()?;

            Ok((
                user,
                ClaimRecord {
                    id: record_id,
                    user_id,
                    points,
                    created_at: now,
                },
            ))
        })
    }

    /// A user's claim records, newest first, capped at `limit`. Equal
    /// timestamps fall back to insertion order (rowid) so the result is
    /// always a true suffix of the chronological log.
    pub fn list_claims(&self, user_id: Uuid, limit: u32) -> Result<Vec<ClaimRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, points, created_at
                 FROM claims
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(params![user_id.to_string(), limit], read_claim)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(ClaimRow::into_record).collect()
        })
    }
}

// -- Row types --
// Ids come back as TEXT; parsing into Uuid happens here so handlers never
// see raw strings.

struct UserRow {
    id: String,
    name: String,
    total_points: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User> {
        let id = parse_id(&self.id)?;
        Ok(User {
            id,
            name: self.name,
            total_points: self.total_points,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

struct ClaimRow {
    id: String,
    user_id: String,
    points: i64,
    created_at: DateTime<Utc>,
}

impl ClaimRow {
    fn into_record(self) -> Result<ClaimRecord> {
        Ok(ClaimRecord {
            id: parse_id(&self.id)?,
            user_id: parse_id(&self.user_id)?,
            points: self.points,
            created_at: self.created_at,
        })
    }
}

fn read_user(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        total_points: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn read_claim(row: &rusqlite::Row) -> rusqlite::Result<ClaimRow> {
    Ok(ClaimRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        points: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("bad uuid: {raw}")))
}

/// Extension trait for optional query results.
trait OptionalExt<T> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[test]
    fn create_and_find_user() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("Alice").unwrap();
        assert_eq!(user.total_points, 0);

        let found = db.find_user(user.id).unwrap().unwrap();
        assert_eq!(found.name, "Alice");
        assert_eq!(found.id, user.id);

        assert!(db.find_user(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn duplicate_name_is_conflict_and_leaves_table_unchanged() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("Alice").unwrap();

        let err = db.create_user("Alice").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn apply_claim_increments_total_and_appends_record() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("Alice").unwrap();

        let (updated, record) = db.apply_claim(user.id, 7).unwrap();
        assert_eq!(updated.total_points, 7);
        assert_eq!(record.points, 7);
        assert_eq!(record.user_id, user.id);
        assert!(updated.updated_at >= user.updated_at);

        let (updated, _) = db.apply_claim(user.id, 3).unwrap();
        assert_eq!(updated.total_points, 10);

        let claims = db.list_claims(user.id, 100).unwrap();
        assert_eq!(claims.len(), 2);
        // Newest first
        assert_eq!(claims[0].points, 3);
        assert_eq!(claims[1].points, 7);
    }

    #[test]
    fn apply_claim_for_unknown_user_is_not_found_and_mutates_nothing() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("Alice").unwrap();

        let err = db.apply_claim(Uuid::new_v4(), 5).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));

        let users = db.list_users().unwrap();
        assert_eq!(users[0].total_points, 0);
        assert!(db.list_claims(users[0].id, 100).unwrap().is_empty());
    }

    #[test]
    fn out_of_range_points_rejected_by_check_constraint() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("Alice").unwrap();

        assert!(db.apply_claim(user.id, 0).is_err());
        assert!(db.apply_claim(user.id, 11).is_err());

        // The failed transactions left no trace.
        assert_eq!(db.find_user(user.id).unwrap().unwrap().total_points, 0);
        assert!(db.list_claims(user.id, 100).unwrap().is_empty());
    }

    #[test]
    fn history_is_capped_and_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("Alice").unwrap();

        for i in 0..105 {
            let points = (i % 10) + 1;
            db.apply_claim(user.id, points).unwrap();
        }

        let claims = db.list_claims(user.id, 100).unwrap();
        assert_eq!(claims.len(), 100);

        // Newest-first: the first returned record is claim #105, points 105 % 10 == 5.
        assert_eq!(claims[0].points, (104 % 10) + 1);
        // A true prefix of the reversed log: record k from the end has the
        // points of claim 104 - k.
        for (k, record) in claims.iter().enumerate() {
            let i = 104 - k as i64;
            assert_eq!(record.points, (i % 10) + 1);
        }
    }

    #[test]
    fn rank_criteria_ordering() {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_user("Alice").unwrap();
        let bob = db.create_user("Bob").unwrap();
        let carol = db.create_user("Carol").unwrap();

        db.apply_claim(bob.id, 10).unwrap();
        db.apply_claim(alice.id, 4).unwrap();
        db.apply_claim(carol.id, 4).unwrap();

        let names: Vec<String> = db
            .list_users_by_rank()
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();

        // Bob leads; Alice reached 4 before Carol did.
        assert_eq!(names, vec!["Bob", "Alice", "Carol"]);
    }
}
