use chrono::NaiveDateTime;

/// Gender codes as stored in `users.gender`, indexed by `n mod 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Gender {
    #[value(name = "M")]
    M,
    #[value(name = "F")]
    F,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::M, Gender::F];

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::M => "M",
            Gender::F => "F",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Active,
    New,
    Dormant,
}

impl LifecycleStage {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleStage::Active => "active",
            LifecycleStage::New => "new",
            LifecycleStage::Dormant => "dormant",
        }
    }
}

pub const PREFERRED_CHANNEL: &str = "SMS";

pub const REGIONS: [&str; 5] = ["Seoul", "Busan", "Incheon", "Daegu", "Gwangju"];
pub const PERSONAS: [&str; 2] = ["trend_seeker", "value_seeker"];
pub const SKIN_TYPES: [&str; 4] = ["dry", "oily", "combination", "normal"];
pub const SKIN_CONCERNS: [&str; 6] = [
    "acne",
    "sensitivity",
    "dryness",
    "pigmentation",
    "wrinkles",
    "pores",
];
pub const SENSITIVITY_LEVELS: [&str; 3] = ["low", "mid", "high"];
pub const TOP_CATEGORIES: [&str; 4] = ["skincare", "makeup", "suncare", "unknown"];

/// Row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: String,
    pub customer_name: String,
    pub gender: Gender,
    pub birth_year: i32,
    pub region: &'static str,
    pub preferred_channel: &'static str,
    pub sms_opt_in: bool,
    pub kakao_opt_in: bool,
    pub push_opt_in: bool,
    pub email_opt_in: bool,
    pub phone_e164: String,
    pub kakao_user_key: Option<String>,
    pub push_token: Option<String>,
    pub email: Option<String>,
    pub updated_at: NaiveDateTime,
}

/// Row of the `user_features` table, one per [`User`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFeatures {
    pub user_id: String,
    pub lifecycle_stage: LifecycleStage,
    pub last_browse_at: NaiveDateTime,
    pub last_cart_at: Option<NaiveDateTime>,
    pub last_purchase_at: Option<NaiveDateTime>,
    pub cart_items_count: i32,
    pub persona_id: &'static str,
    pub skin_type: &'static str,
    pub skin_concern_primary: &'static str,
    pub sensitivity_level: &'static str,
    pub top_category_30d: &'static str,
    pub updated_at: NaiveDateTime,
}
