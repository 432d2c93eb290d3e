//! Segment preview over the seeded tables: how many users a campaign filter
//! would reach, plus a few example rows.

use std::fmt;

use crate::db::{Dialect, SqlValue};
use crate::model::Gender;

/// Age decade, resolved to a birth-year range against the current year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum AgeBand {
    #[value(name = "10s")]
    Teens,
    #[value(name = "20s")]
    Twenties,
    #[value(name = "30s")]
    Thirties,
    #[value(name = "40s")]
    Forties,
    #[value(name = "50s+")]
    FiftiesPlus,
}

impl AgeBand {
    pub fn label(self) -> &'static str {
        match self {
            AgeBand::Teens => "10s",
            AgeBand::Twenties => "20s",
            AgeBand::Thirties => "30s",
            AgeBand::Forties => "40s",
            AgeBand::FiftiesPlus => "50s+",
        }
    }

    /// Inclusive `(min, max)` birth years; `50s+` has no lower bound.
    pub fn birth_year_range(self, current_year: i32) -> (Option<i32>, i32) {
        let decade = match self {
            AgeBand::Teens => 10,
            AgeBand::Twenties => 20,
            AgeBand::Thirties => 30,
            AgeBand::Forties => 40,
            AgeBand::FiftiesPlus => return (None, current_year - 50),
        };
        (Some(current_year - (decade + 9)), current_year - decade)
    }
}

/// OR within a field, AND across fields. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetFilter {
    pub genders: Vec<Gender>,
    pub age_bands: Vec<AgeBand>,
    pub skin_types: Vec<String>,
    pub skin_concerns: Vec<String>,
}

/// Rendered `WHERE` clause (empty when unfiltered) and its bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

struct ClauseBuilder {
    dialect: Dialect,
    params: Vec<SqlValue>,
}

impl ClauseBuilder {
    fn bind(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        self.dialect.placeholder(self.params.len())
    }

    fn in_list(&mut self, column: &str, values: impl IntoIterator<Item = SqlValue>) -> String {
        let marks: Vec<String> = values.into_iter().map(|v| self.bind(v)).collect();
        format!("{column} IN ({})", marks.join(", "))
    }
}

impl TargetFilter {
    pub fn is_empty(&self) -> bool {
        self.genders.is_empty()
            && self.age_bands.is_empty()
            && self.skin_types.is_empty()
            && self.skin_concerns.is_empty()
    }

    pub fn where_clause(&self, dialect: Dialect, current_year: i32) -> WhereClause {
        let mut b = ClauseBuilder {
            dialect,
            params: Vec::new(),
        };
        let mut conditions = Vec::new();

        if !self.genders.is_empty() {
            conditions.push(b.in_list(
                "u.gender",
                self.genders.iter().map(|g| SqlValue::text(g.as_str())),
            ));
        }

        if !self.age_bands.is_empty() {
            let ranges: Vec<String> = self
                .age_bands
                .iter()
                .map(|band| match band.birth_year_range(current_year) {
                    (Some(min), max) => {
                        let lo = b.bind(SqlValue::Int(min));
                        let hi = b.bind(SqlValue::Int(max));
                        format!("(u.birth_year BETWEEN {lo} AND {hi})")
                    }
                    (None, max) => format!("(u.birth_year <= {})", b.bind(SqlValue::Int(max))),
                })
                .collect();
            conditions.push(format!("({})", ranges.join(" OR ")));
        }

        if !self.skin_types.is_empty() {
            conditions.push(b.in_list(
                "uf.skin_type",
                self.skin_types.iter().map(SqlValue::text),
            ));
        }

        if !self.skin_concerns.is_empty() {
            conditions.push(b.in_list(
                "uf.skin_concern_primary",
                self.skin_concerns.iter().map(SqlValue::text),
            ));
        }

        let sql = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        WhereClause {
            sql,
            params: b.params,
        }
    }

    /// One-line description, e.g. `gender=F / age=20s,30s`.
    pub fn summary(&self) -> String {
        fn join<T>(items: &[T], f: impl Fn(&T) -> &str) -> String {
            items.iter().map(f).collect::<Vec<_>>().join(",")
        }

        let mut parts = Vec::new();
        if !self.genders.is_empty() {
            parts.push(format!("gender={}", join(&self.genders, |g| g.as_str())));
        }
        if !self.age_bands.is_empty() {
            parts.push(format!("age={}", join(&self.age_bands, |a| a.label())));
        }
        if !self.skin_types.is_empty() {
            parts.push(format!("skin_type={}", self.skin_types.join(",")));
        }
        if !self.skin_concerns.is_empty() {
            parts.push(format!("skin_concern={}", self.skin_concerns.join(",")));
        }

        if parts.is_empty() {
            "no target conditions".to_string()
        } else {
            parts.join(" / ")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleUser {
    pub user_id: String,
    pub gender: Option<String>,
    pub birth_year: Option<i32>,
    pub age: Option<i32>,
    pub skin_type: Option<String>,
    pub skin_concern: Option<String>,
}

impl fmt::Display for SampleUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_dash<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map_or_else(|| "-".to_string(), T::to_string)
        }
        write!(
            f,
            "{:<8} {:<2} {:<5} {:<4} {:<12} {}",
            self.user_id,
            or_dash(&self.gender),
            or_dash(&self.birth_year),
            or_dash(&self.age),
            or_dash(&self.skin_type),
            or_dash(&self.skin_concern),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPreview {
    pub count: u64,
    pub sample: Vec<SampleUser>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_birth_year_ranges() {
        assert_eq!(AgeBand::Twenties.birth_year_range(2026), (Some(1997), 2006));
        assert_eq!(AgeBand::Teens.birth_year_range(2026), (Some(2007), 2016));
        assert_eq!(AgeBand::FiftiesPlus.birth_year_range(2026), (None, 1976));
    }

    #[test]
    fn test_empty_filter_has_no_where() {
        let clause = TargetFilter::default().where_clause(Dialect::Postgres, 2026);
        assert_eq!(clause.sql, "");
        assert!(clause.params.is_empty());
        assert!(TargetFilter::default().is_empty());
    }

    #[test]
    fn test_where_clause_postgres_numbering() {
        let filter = TargetFilter {
            genders: vec![Gender::F, Gender::M],
            age_bands: vec![AgeBand::Twenties, AgeBand::FiftiesPlus],
            skin_types: vec!["dry".into()],
            skin_concerns: vec![],
        };
        let clause = filter.where_clause(Dialect::Postgres, 2026);
        assert_eq!(
            clause.sql,
            "WHERE u.gender IN ($1, $2) \
             AND ((u.birth_year BETWEEN $3 AND $4) OR (u.birth_year <= $5)) \
             AND uf.skin_type IN ($6)"
        );
        assert_eq!(
            clause.params,
            vec![
                SqlValue::text("F"),
                SqlValue::text("M"),
                SqlValue::Int(1997),
                SqlValue::Int(2006),
                SqlValue::Int(1976),
                SqlValue::text("dry"),
            ]
        );
    }

    #[test]
    fn test_where_clause_mysql_markers() {
        let filter = TargetFilter {
            skin_concerns: vec!["acne".into(), "pores".into()],
            ..Default::default()
        };
        let clause = filter.where_clause(Dialect::MySql, 2026);
        assert_eq!(clause.sql, "WHERE uf.skin_concern_primary IN (?, ?)");
    }

    #[test]
    fn test_summary() {
        assert_eq!(TargetFilter::default().summary(), "no target conditions");
        let filter = TargetFilter {
            genders: vec![Gender::F],
            age_bands: vec![AgeBand::Twenties, AgeBand::Thirties],
            ..Default::default()
        };
        assert_eq!(filter.summary(), "gender=F / age=20s,30s");
    }
}
