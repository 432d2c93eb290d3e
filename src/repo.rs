use tracing::debug;

use crate::db::schema::{self, KEY_COLUMN, USER_COLUMNS, USER_FEATURE_COLUMNS};
use crate::db::{DBBehavior, Dialect, Records, SqlValue, Table};
use crate::error::{SeedError, SeedResult};
use crate::model::{User, UserFeatures};
use crate::target::{SampleUser, TargetFilter, TargetPreview};

/// Table-level operations over whichever backend is open.
pub struct Repo<'a> {
    db: &'a mut dyn DBBehavior,
}

impl<'a> Repo<'a> {
    pub fn new(db: &'a mut dyn DBBehavior) -> Self {
        Self { db }
    }

    pub fn dialect(&self) -> Dialect {
        self.db.dialect()
    }

    /// Apply the development DDL (`CREATE TABLE IF NOT EXISTS`).
    pub fn create_tables(&mut self) -> SeedResult<()> {
        debug!(dialect = ?self.dialect(), "creating tables");
        self.db.execute_batch(schema::create_tables_sql(self.dialect()))
    }

    pub fn upsert_users(&mut self, users: &[User]) -> SeedResult<u64> {
        let sql = self.dialect().upsert_sql(Table::Users, KEY_COLUMN, &USER_COLUMNS);
        debug!(%sql, "upserting users");
        let rows: Vec<_> = users.iter().map(user_values).collect();
        self.db.upsert_rows(&sql, &rows)
    }

    /// Every referenced user must already exist.
    pub fn upsert_user_features(&mut self, features: &[UserFeatures]) -> SeedResult<u64> {
        let sql = self
            .dialect()
            .upsert_sql(Table::UserFeatures, KEY_COLUMN, &USER_FEATURE_COLUMNS);
        debug!(%sql, "upserting user_features");
        let rows: Vec<_> = features.iter().map(user_feature_values).collect();
        self.db.upsert_rows(&sql, &rows)
    }

    pub fn count_rows(&mut self, table: Table) -> SeedResult<u64> {
        let sql = format!(
            "SELECT {} FROM {}",
            self.dialect().text_cast("COUNT(*)"),
            table.name()
        );
        let records = self.db.fetch_records(&sql, &[])?;
        parse_count(&records)
    }

    /// All `user_id` values of `table`, sorted.
    pub fn user_ids(&mut self, table: Table) -> SeedResult<Vec<String>> {
        let sql = format!(
            "SELECT {key} FROM {table} ORDER BY {key}",
            key = KEY_COLUMN,
            table = table.name()
        );
        let records = self.db.fetch_records(&sql, &[])?;
        Ok(records
            .rows
            .into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .collect())
    }

    /// `user_features` rows whose user is missing.
    pub fn orphan_features(&mut self) -> SeedResult<u64> {
        let sql = format!(
            "SELECT {} FROM user_features uf \
             LEFT JOIN users u ON u.user_id = uf.user_id \
             WHERE u.user_id IS NULL",
            self.dialect().text_cast("COUNT(*)")
        );
        let records = self.db.fetch_records(&sql, &[])?;
        parse_count(&records)
    }

    /// Count and sample of users matching `filter`, ages relative to `current_year`.
    pub fn preview_target(
        &mut self,
        filter: &TargetFilter,
        sample_size: usize,
        current_year: i32,
    ) -> SeedResult<TargetPreview> {
        let dialect = self.dialect();
        let clause = filter.where_clause(dialect, current_year);
        let from = "FROM users u LEFT JOIN user_features uf ON uf.user_id = u.user_id";

        let count_sql = format!(
            "SELECT {} {from} {}",
            dialect.text_cast("COUNT(*)"),
            clause.sql
        );
        debug!(sql = %count_sql, "target count");
        let count = parse_count(&self.db.fetch_records(&count_sql, &clause.params)?)?;

        let sample_sql = format!(
            "SELECT {}, {}, {}, {}, {} {from} {} ORDER BY u.user_id LIMIT {sample_size}",
            dialect.text_cast("u.user_id"),
            dialect.text_cast("u.gender"),
            dialect.text_cast("u.birth_year"),
            dialect.text_cast("uf.skin_type"),
            dialect.text_cast("uf.skin_concern_primary"),
            clause.sql
        );
        let records = self.db.fetch_records(&sample_sql, &clause.params)?;
        let sample = records
            .rows
            .into_iter()
            .map(|row| {
                let mut cells = row.into_iter();
                let mut next = || cells.next().flatten();
                let user_id = next().unwrap_or_default();
                let gender = next();
                let birth_year = next().and_then(|y| y.trim().parse::<i32>().ok());
                SampleUser {
                    user_id,
                    gender,
                    birth_year,
                    age: birth_year.map(|y| current_year - y),
                    skin_type: next(),
                    skin_concern: next(),
                }
            })
            .collect();

        Ok(TargetPreview { count, sample })
    }
}

fn parse_count(records: &Records) -> SeedResult<u64> {
    let raw = records
        .scalar()
        .ok_or_else(|| SeedError::Storage("count query returned no rows".to_string()))?;
    raw.trim()
        .parse()
        .map_err(|_| SeedError::Storage(format!("unexpected count value '{raw}'")))
}

/// Bind values in `USER_COLUMNS` order.
fn user_values(u: &User) -> Vec<SqlValue> {
    vec![
        SqlValue::text(&u.user_id),
        SqlValue::text(&u.customer_name),
        SqlValue::text(u.gender.as_str()),
        SqlValue::Int(u.birth_year),
        SqlValue::text(u.region),
        SqlValue::text(u.preferred_channel),
        SqlValue::Bool(u.sms_opt_in),
        SqlValue::Bool(u.kakao_opt_in),
        SqlValue::Bool(u.push_opt_in),
        SqlValue::Bool(u.email_opt_in),
        SqlValue::text(&u.phone_e164),
        SqlValue::Text(u.kakao_user_key.clone()),
        SqlValue::Text(u.push_token.clone()),
        SqlValue::Text(u.email.clone()),
        SqlValue::timestamp(u.updated_at),
    ]
}

/// Bind values in `USER_FEATURE_COLUMNS` order.
fn user_feature_values(f: &UserFeatures) -> Vec<SqlValue> {
    vec![
        SqlValue::text(&f.user_id),
        SqlValue::text(f.lifecycle_stage.as_str()),
        SqlValue::timestamp(f.last_browse_at),
        SqlValue::Timestamp(f.last_cart_at),
        SqlValue::Timestamp(f.last_purchase_at),
        SqlValue::Int(f.cart_items_count),
        SqlValue::text(f.persona_id),
        SqlValue::text(f.skin_type),
        SqlValue::text(f.skin_concern_primary),
        SqlValue::text(f.sensitivity_level),
        SqlValue::text(f.top_category_30d),
        SqlValue::timestamp(f.updated_at),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Sqlite;
    use crate::model::Gender;
    use crate::seeder::{self, generate, generate_batch};
    use crate::target::AgeBand;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap()
    }

    fn seeded() -> Sqlite {
        let mut db = Sqlite::open_in_memory().unwrap();
        let mut repo = Repo::new(&mut db);
        repo.create_tables().unwrap();
        seeder::seed(&mut repo, now()).unwrap();
        db
    }

    /// Every `users` column except `updated_at`, ordered by id.
    fn user_snapshot(repo: &mut Repo<'_>) -> Vec<Vec<Option<String>>> {
        let cols = USER_COLUMNS[..USER_COLUMNS.len() - 1].join(", ");
        repo.db
            .fetch_records(&format!("SELECT {cols} FROM users ORDER BY user_id"), &[])
            .unwrap()
            .rows
    }

    #[test]
    fn test_value_arity_matches_columns() {
        let (user, features) = generate(1, now());
        assert_eq!(user_values(&user).len(), USER_COLUMNS.len());
        assert_eq!(user_feature_values(&features).len(), USER_FEATURE_COLUMNS.len());
    }

    #[test]
    fn test_seed_writes_fifty_of_each() {
        let mut db = Sqlite::open_in_memory().unwrap();
        let mut repo = Repo::new(&mut db);
        repo.create_tables().unwrap();

        let report = seeder::seed(&mut repo, now()).unwrap();
        assert_eq!(report.users_written, 50);
        assert_eq!(report.features_written, 50);
        assert_eq!(report.users_total, 50);
        assert_eq!(report.features_total, 50);

        let ids = repo.user_ids(Table::Users).unwrap();
        let expected: Vec<String> = (1..=50).map(seeder::user_id).collect();
        assert_eq!(ids, expected);
        assert_eq!(repo.user_ids(Table::UserFeatures).unwrap(), expected);
        assert_eq!(repo.orphan_features().unwrap(), 0);
    }

    #[test]
    fn test_reseed_is_idempotent() {
        let mut db = seeded();
        let mut repo = Repo::new(&mut db);
        let before = user_snapshot(&mut repo);

        let later = now() + Duration::hours(3);
        let report = seeder::seed(&mut repo, later).unwrap();
        assert_eq!(report.users_total, 50);
        assert_eq!(report.features_total, 50);
        assert_eq!(user_snapshot(&mut repo), before);

        let records = repo
            .db
            .fetch_records(
                "SELECT updated_at, last_browse_at FROM user_features WHERE user_id = 'u_007'",
                &[],
            )
            .unwrap();
        assert_eq!(
            records.rows,
            vec![vec![
                Some("2026-10-19 12:15:00".to_string()),
                Some("2026-10-12 12:15:00".to_string()),
            ]]
        );
    }

    #[test]
    fn test_stored_row_for_user_seven() {
        let mut db = seeded();
        let mut repo = Repo::new(&mut db);
        let records = repo
            .db
            .fetch_records(
                "SELECT gender, birth_year, region, sms_opt_in, phone_e164, email \
                 FROM users WHERE user_id = ?1",
                &[SqlValue::text("u_007")],
            )
            .unwrap();
        assert_eq!(
            records.rows[0],
            vec![
                Some("F".to_string()),
                Some("1987".to_string()),
                Some("Incheon".to_string()),
                Some("0".to_string()),
                Some("+821000000007".to_string()),
                None,
            ]
        );
    }

    #[test]
    fn test_features_without_users_violate_constraint() {
        let mut db = Sqlite::open_in_memory().unwrap();
        let mut repo = Repo::new(&mut db);
        repo.create_tables().unwrap();

        let features: Vec<_> = generate_batch(now()).into_iter().map(|(_, f)| f).collect();
        let err = repo.upsert_user_features(&features).unwrap_err();
        assert!(err.is_constraint_violation(), "{err}");
        assert_eq!(repo.count_rows(Table::UserFeatures).unwrap(), 0);
    }

    #[test]
    fn test_orphans_are_counted() {
        let mut db = seeded();
        db.execute_batch("PRAGMA foreign_keys = OFF; DELETE FROM users WHERE user_id = 'u_050';")
            .unwrap();
        let mut repo = Repo::new(&mut db);
        assert_eq!(repo.orphan_features().unwrap(), 1);
    }

    #[test]
    fn test_preview_by_gender_and_skin_type() {
        let mut db = seeded();
        let mut repo = Repo::new(&mut db);

        let female = TargetFilter {
            genders: vec![Gender::F],
            ..Default::default()
        };
        let preview = repo.preview_target(&female, 5, 2026).unwrap();
        assert_eq!(preview.count, 25);
        assert_eq!(preview.sample.len(), 5);
        assert_eq!(preview.sample[0].user_id, "u_001");
        assert_eq!(preview.sample[0].birth_year, Some(1981));
        assert_eq!(preview.sample[0].age, Some(45));
        assert_eq!(preview.sample[0].skin_type.as_deref(), Some("oily"));

        let dry = TargetFilter {
            skin_types: vec!["dry".to_string()],
            ..Default::default()
        };
        assert_eq!(repo.preview_target(&dry, 5, 2026).unwrap().count, 12);

        let both = TargetFilter {
            genders: vec![Gender::F],
            skin_types: vec!["dry".to_string()],
            ..Default::default()
        };
        let preview = repo.preview_target(&both, 5, 2026).unwrap();
        assert_eq!(preview.count, 0);
        assert!(preview.sample.is_empty());
    }

    #[test]
    fn test_preview_by_age_band() {
        let mut db = seeded();
        let mut repo = Repo::new(&mut db);

        // 30s in 2026: born 1987..=1996, i.e. n mod 25 in 7..=16
        let thirties = TargetFilter {
            age_bands: vec![AgeBand::Thirties],
            ..Default::default()
        };
        assert_eq!(repo.preview_target(&thirties, 5, 2026).unwrap().count, 20);

        let everyone = TargetFilter::default();
        assert_eq!(repo.preview_target(&everyone, 3, 2026).unwrap().count, 50);
    }
}
