/// Demo data
///
/// Creates a regular `demo` account and an `admin` account, both with
/// password `default` and a filled-in profile. Accounts whose username or
/// email is already taken are left alone, so seeding twice is harmless.

use chrono::NaiveDate;
use gatehouse_shared::{
    auth::credential::CredentialStore,
    models::{
        account::{Account, AccountRole, AccountStatus, NewAccount},
        profile::Profile,
    },
    store::{AccountRepository, StoreError},
};

const DEFAULT_PASSWORD: &str = "default";

struct SeedAccount {
    username: &'static str,
    email: &'static str,
    role: AccountRole,
    first_name: &'static str,
    gender: &'static str,
    dob: (i32, u32, u32),
    bio: &'static str,
}

const SEED_ACCOUNTS: [SeedAccount; 2] = [
    SeedAccount {
        username: "demo",
        email: "demo@example.com",
        role: AccountRole::User,
        first_name: "Demo",
        gender: "female",
        dob: (1985, 2, 17),
        bio: "Demo dude is pretty sweet.",
    },
    SeedAccount {
        username: "admin",
        email: "admin@example.com",
        role: AccountRole::Admin,
        first_name: "Admin",
        gender: "male",
        dob: (1980, 2, 17),
        bio: "Admin dude is the administrator.",
    },
];

impl SeedAccount {
    fn to_new(&self, password_hash: String) -> NewAccount {
        let (year, month, day) = self.dob;
        NewAccount {
            username: self.username.to_string(),
            email: self.email.to_string(),
            password_hash,
            role: self.role,
            status: AccountStatus::Active,
            profile: Profile {
                first_name: Some(self.first_name.to_string()),
                last_name: Some("Dude".to_string()),
                gender: Some(self.gender.to_string()),
                dob: NaiveDate::from_ymd_opt(year, month, day),
                phone: Some("1234567890".to_string()),
                bio: Some(self.bio.to_string()),
                url: Some(format!("http://www.example.com/{}", self.username)),
            },
        }
    }
}

/// Inserts the demo accounts; returns how many were created
pub async fn seed(accounts: &dyn AccountRepository, credentials: &CredentialStore) -> anyhow::Result<usize> {
    let mut created = 0;

    for seed in &SEED_ACCOUNTS {
        let account = Account::from_new(seed.to_new(credentials.hash(DEFAULT_PASSWORD)?));

        match accounts.insert_account(&account).await {
            Ok(()) => {
                tracing::info!(username = seed.username, role = seed.role.as_str(), "Seeded account");
                created += 1;
            }
            Err(StoreError::Conflict { field }) => {
                tracing::info!(username = seed.username, field, "Seed account already exists, skipping");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(created)
}
