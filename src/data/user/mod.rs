use chrono::{DateTime, Utc};
use rocket::http::Status;
use uuid::Uuid;

use crate::resp::problem::Problem;
use crate::role::Role;

pub mod db;

/// Work factor for newly hashed passwords. Verification reads the cost
/// from the stored hash, so this can be raised without migrations.
const BCRYPT_COST: u32 = 10;

/// A bcrypt hash in modular crypt format, salt included. The clear text
/// password is never stored.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(password: impl AsRef<str>) -> Result<PasswordHash, Problem> {
        bcrypt::hash(password.as_ref(), BCRYPT_COST)
            .map(PasswordHash)
            .map_err(|e| {
                tracing::error!("unable to hash password: {}", e);
                password_unusable_err()
            })
    }

    pub fn verify(&self, password: impl AsRef<str>) -> bool {
        bcrypt::verify(password.as_ref(), &self.0).unwrap_or(false)
    }
}

fn password_unusable_err() -> Problem {
    Problem::new_untyped(Status::InternalServerError, "Unable to process password.")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", with = "bson::serde_helpers::uuid_1_as_binary")]
    pub id: Uuid,
    pub roll_no: String,
    pub pw_hash: PasswordHash,
    pub role: Role,
    #[serde(default)]
    pub enrolled_courses: Vec<Uuid>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        roll_no: impl ToString,
        password: impl AsRef<str>,
        role: Role,
    ) -> Result<User, Problem> {
        let pw_hash = PasswordHash::new(password)?;

        let id = Uuid::new_v4();
        tracing::info!("Creating a new user with UUID: {}", id.to_string());

        Ok(User {
            id,
            roll_no: roll_no.to_string(),
            pw_hash,
            role,
            enrolled_courses: Vec::new(),
            created_at: Utc::now(),
        })
    }

    /// Records enrollment on the user side. Returns whether the course was
    /// newly added; enrolling into the same course again is a no-op.
    pub fn add_course(&mut self, course: Uuid) -> bool {
        if self.enrolled_courses.contains(&course) {
            return false;
        }

        self.enrolled_courses.push(course);
        true
    }
}

pub mod filter {
    use bson::spec::BinarySubtype;
    use bson::{doc, Bson, Document};
    use uuid::Uuid;

    use crate::role::Role;

    #[inline]
    pub fn by_id(id: Uuid) -> Document {
        doc! {
            "_id": Bson::Binary(bson::Binary {
                subtype: BinarySubtype::Uuid,
                bytes: id.as_bytes().to_vec(),
            })
        }
    }

    #[inline]
    pub fn by_roll_no(roll_no: impl ToString) -> Document {
        doc! { "roll_no": roll_no.to_string() }
    }

    #[inline]
    pub fn student_by_roll_no(roll_no: impl ToString) -> Document {
        doc! {
            "roll_no": roll_no.to_string(),
            "role": Role::Student.to_string(),
        }
    }
}
