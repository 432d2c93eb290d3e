use chrono::{Duration, Local, NaiveDateTime, SubsecRound};
use tracing::{debug, info};

use crate::error::SeedResult;
use crate::model::{
    Gender, LifecycleStage, User, UserFeatures, PERSONAS, PREFERRED_CHANNEL, REGIONS,
    SENSITIVITY_LEVELS, SKIN_CONCERNS, SKIN_TYPES, TOP_CATEGORIES,
};
use crate::repo::Repo;
use crate::db::Table;

/// Number of demo accounts written by every run.
pub const DEMO_USER_COUNT: u32 = 50;

/// Row totals observed after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users_written: u64,
    pub features_written: u64,
    pub users_total: u64,
    pub features_total: u64,
}

/// Timestamp shared by every record of one run.
pub fn run_timestamp() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

pub fn user_id(n: u32) -> String {
    format!("u_{n:03}")
}

fn pick<T: Copy>(list: &[T], n: u32) -> T {
    list[n as usize % list.len()]
}

fn lifecycle_stage(n: u32) -> LifecycleStage {
    if n % 10 == 0 {
        LifecycleStage::Dormant
    } else if n % 3 == 0 {
        LifecycleStage::New
    } else {
        LifecycleStage::Active
    }
}

/// Derive the demo user and its features for index `n`.
///
/// Everything except the `last_*_at` and `updated_at` columns is a pure
/// function of `n`; those are offsets from `now`.
pub fn generate(n: u32, now: NaiveDateTime) -> (User, UserFeatures) {
    let id = user_id(n);

    let user = User {
        user_id: id.clone(),
        customer_name: format!("Demo Customer {n:03}"),
        gender: pick(&Gender::ALL, n),
        birth_year: 1980 + (n % 25) as i32,
        region: pick(&REGIONS, n),
        preferred_channel: PREFERRED_CHANNEL,
        sms_opt_in: n % 7 != 0,
        kakao_opt_in: false,
        push_opt_in: false,
        email_opt_in: false,
        phone_e164: format!("+8210{n:08}"),
        kakao_user_key: None,
        push_token: None,
        email: None,
        updated_at: now,
    };

    let features = UserFeatures {
        user_id: id,
        lifecycle_stage: lifecycle_stage(n),
        last_browse_at: now - Duration::days(i64::from(n % 14)),
        last_cart_at: (n % 4 != 0).then(|| now - Duration::hours(i64::from(n % 48))),
        last_purchase_at: (n % 5 != 0).then(|| now - Duration::days(i64::from(n % 60))),
        cart_items_count: (n % 4) as i32,
        persona_id: pick(&PERSONAS, n),
        skin_type: pick(&SKIN_TYPES, n),
        skin_concern_primary: pick(&SKIN_CONCERNS, n),
        sensitivity_level: pick(&SENSITIVITY_LEVELS, n),
        top_category_30d: pick(&TOP_CATEGORIES, n),
        updated_at: now,
    };

    (user, features)
}

/// The full demo batch, `u_001` through `u_050`, in order.
pub fn generate_batch(now: NaiveDateTime) -> Vec<(User, UserFeatures)> {
    (1..=DEMO_USER_COUNT).map(|n| generate(n, now)).collect()
}

/// Generate the batch in memory, then upsert users before user features.
pub fn seed(repo: &mut Repo<'_>, now: NaiveDateTime) -> SeedResult<SeedReport> {
    let (users, features): (Vec<User>, Vec<UserFeatures>) =
        generate_batch(now).into_iter().unzip();
    debug!(count = users.len(), %now, "generated demo batch");

    let users_written = repo.upsert_users(&users)?;
    debug!(rows = users_written, "users upserted");
    let features_written = repo.upsert_user_features(&features)?;
    debug!(rows = features_written, "user_features upserted");

    let report = SeedReport {
        users_written,
        features_written,
        users_total: repo.count_rows(Table::Users)?,
        features_total: repo.count_rows(Table::UserFeatures)?,
    };
    info!(
        users = report.users_total,
        user_features = report.features_total,
        "seed finished"
    );
    Ok(report)
}
