use std::collections::BTreeSet;
use std::fmt;

use tracing::warn;

use crate::db::Table;
use crate::error::SeedResult;
use crate::repo::Repo;
use crate::seeder::{user_id, DEMO_USER_COUNT};

/// Outcome of checking the seeded tables against the expected demo id set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub missing_users: Vec<String>,
    pub missing_features: Vec<String>,
    /// Ids in `users` outside `u_001..u_050`; reported, never a failure.
    pub extra_users: usize,
    pub orphan_features: u64,
}

impl IntegrityReport {
    pub fn is_consistent(&self) -> bool {
        self.missing_users.is_empty() && self.missing_features.is_empty() && self.orphan_features == 0
    }
}

impl fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "missing users: {}", list(&self.missing_users))?;
        writeln!(f, "missing user_features: {}", list(&self.missing_features))?;
        writeln!(f, "non-demo users: {}", self.extra_users)?;
        write!(f, "orphan user_features: {}", self.orphan_features)
    }
}

fn list(ids: &[String]) -> String {
    if ids.is_empty() {
        "none".to_string()
    } else {
        ids.join(", ")
    }
}

pub fn check(repo: &mut Repo<'_>) -> SeedResult<IntegrityReport> {
    let expected: BTreeSet<String> = (1..=DEMO_USER_COUNT).map(user_id).collect();
    let users: BTreeSet<String> = repo.user_ids(Table::Users)?.into_iter().collect();
    let features: BTreeSet<String> = repo.user_ids(Table::UserFeatures)?.into_iter().collect();

    let report = IntegrityReport {
        missing_users: expected.difference(&users).cloned().collect(),
        missing_features: expected.difference(&features).cloned().collect(),
        extra_users: users.difference(&expected).count(),
        orphan_features: repo.orphan_features()?,
    };

    if !report.is_consistent() {
        warn!(
            missing_users = report.missing_users.len(),
            missing_features = report.missing_features.len(),
            orphans = report.orphan_features,
            "seeded tables are inconsistent"
        );
    }
    Ok(report)
}
