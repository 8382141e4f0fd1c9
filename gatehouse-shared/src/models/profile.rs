/// Profile detail owned 1:1 by an account
///
/// # Schema
///
/// ```sql
/// CREATE TABLE account_profiles (
///     account_id UUID PRIMARY KEY REFERENCES accounts(id) ON DELETE CASCADE,
///     first_name VARCHAR(50),
///     last_name VARCHAR(50),
///     gender VARCHAR(20),
///     dob DATE,
///     phone VARCHAR(42),
///     bio TEXT,
///     url TEXT,
///     created_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,

    /// "male" or "female"
    pub gender: Option<String>,

    /// Date of birth
    pub dob: Option<NaiveDate>,

    pub phone: Option<String>,
    pub bio: Option<String>,
    pub url: Option<String>,
}
