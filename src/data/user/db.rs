use mongodb::Database;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::resp::problem::Problem;
use crate::role::Role;
use crate::security::Security;

use super::filter;
use super::User;

pub static USER_COLLECTION_NAME: &str = "user";

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;
    use uuid::Uuid;

    #[inline]
    pub fn duplicate_user(roll_no: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "User already exists.")
            .insert_str("roll_no", roll_no)
            .to_owned()
    }

    #[inline]
    pub fn bad_roll_no(roll_no: impl ToString, detail: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Bad roll number.")
            .insert_str("roll_no", roll_no)
            .detail(detail)
            .to_owned()
    }

    #[inline]
    pub fn bad_password(detail: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Bad password.")
            .detail(detail)
            .to_owned()
    }

    #[inline]
    pub fn bad_teacher_code() -> Problem {
        Problem::new_untyped(Status::BadRequest, "Invalid teacher registration code.")
    }

    /// Login failures all look alike; whether the roll number or the
    /// password was wrong stays hidden.
    #[inline]
    pub fn bad_credentials() -> Problem {
        Problem::new_untyped(Status::BadRequest, "Invalid credentials.")
    }

    #[inline]
    pub fn not_found(id: Uuid) -> Problem {
        Problem::new_untyped(Status::NotFound, "User doesn't exist.")
            .insert("id", id.to_string())
            .clone()
    }

    #[inline]
    pub fn student_not_found(roll_no: impl ToString) -> Problem {
        Problem::new_untyped(Status::NotFound, "Student not found.")
            .insert_str("roll_no", roll_no)
            .clone()
    }
}

#[derive(Clone, Deserialize, ToSchema)]
pub struct SignupData {
    pub roll_no: String,
    #[schema(format = "password")]
    pub password: String,
    /// Must match the configured registration code; grants the teacher role.
    #[serde(default)]
    pub teacher_code: Option<String>,
}

impl std::fmt::Debug for SignupData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SignupData:{}", self.roll_no)
    }
}

impl SignupData {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.roll_no.trim().is_empty() {
            return Err(problem::bad_roll_no(
                self.roll_no.to_string(),
                "Roll number can't be empty.",
            ));
        }

        if self.roll_no.len() > 32 {
            return Err(problem::bad_roll_no(
                self.roll_no.to_string(),
                "Roll number can't be longer than 32 (bytes) characters.",
            ));
        }

        if self.password.len() < 8 {
            return Err(problem::bad_password(
                "Password must be at least 8 characters (bytes) long.",
            ));
        }

        if self.password.len() > 1024 {
            return Err(problem::bad_password(
                "Passwords longer than 1024 characters aren't supported.",
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Deserialize, ToSchema)]
pub struct LoginData {
    pub roll_no: String,
    #[schema(format = "password")]
    pub password: String,
}

impl std::fmt::Debug for LoginData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LoginData:{}", self.roll_no)
    }
}

impl LoginData {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.roll_no.is_empty() || self.roll_no.len() > 32 || self.password.len() > 1024 {
            return Err(problem::bad_credentials());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserCreatedResponse {
    pub id: Uuid,
    pub roll_no: String,
    pub role: Role,
}

impl From<&User> for UserCreatedResponse {
    fn from(user: &User) -> Self {
        UserCreatedResponse {
            id: user.id,
            roll_no: user.roll_no.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub id: Uuid,
    pub roll_no: String,
    pub role: Role,
}

pub trait UserDbExt {
    async fn register(&self, signup: SignupData, security: &Security) -> Result<User, Problem>;

    async fn authenticate(&self, login: LoginData) -> Result<User, Problem>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, Problem>;

    async fn find_user_by_roll_no(&self, roll_no: impl AsRef<str>) -> Result<Option<User>, Problem>;

    /// Roll number lookup restricted to the student role; teachers can't be
    /// enrolled into courses.
    async fn find_student_by_roll_no(
        &self,
        roll_no: impl AsRef<str>,
    ) -> Result<Option<User>, Problem>;

    async fn save_user(&self, user: &User) -> Result<(), Problem>;
}

impl UserDbExt for Database {
    async fn register(&self, signup: SignupData, security: &Security) -> Result<User, Problem> {
        signup.validate()?;

        let role = match &signup.teacher_code {
            Some(code) => {
                if security.teacher_code.as_deref() != Some(code.as_str()) {
                    return Err(problem::bad_teacher_code());
                }
                Role::Teacher
            }
            None => Role::Student,
        };

        if self
            .find_user_by_roll_no(&signup.roll_no)
            .await?
            .is_some()
        {
            return Err(problem::duplicate_user(&signup.roll_no));
        }

        let user = User::new(&signup.roll_no, &signup.password, role)?;

        self.collection(USER_COLLECTION_NAME)
            .insert_one(
                bson::to_document(&user).expect("User must be serializable to BSON"),
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(user)
    }

    async fn authenticate(&self, login: LoginData) -> Result<User, Problem> {
        login.validate()?;

        let user = self
            .find_user_by_roll_no(&login.roll_no)
            .await?
            .ok_or_else(problem::bad_credentials)?;

        if !user.pw_hash.verify(&login.password) {
            return Err(problem::bad_credentials());
        }

        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, Problem> {
        self.collection(USER_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn find_user_by_roll_no(&self, roll_no: impl AsRef<str>) -> Result<Option<User>, Problem> {
        self.collection(USER_COLLECTION_NAME)
            .find_one(filter::by_roll_no(roll_no.as_ref()), None)
            .await
            .map_err(Problem::from)
    }

    async fn find_student_by_roll_no(
        &self,
        roll_no: impl AsRef<str>,
    ) -> Result<Option<User>, Problem> {
        self.collection(USER_COLLECTION_NAME)
            .find_one(filter::student_by_roll_no(roll_no.as_ref()), None)
            .await
            .map_err(Problem::from)
    }

    async fn save_user(&self, user: &User) -> Result<(), Problem> {
        self.collection::<bson::Document>(USER_COLLECTION_NAME)
            .replace_one(
                filter::by_id(user.id),
                bson::to_document(user).expect("User must be serializable to BSON"),
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::Status;

    #[test]
    fn signup_rejects_out_of_bounds_fields() {
        let blank = SignupData {
            roll_no: "  ".to_string(),
            password: "hunter2!well".to_string(),
            teacher_code: None,
        };
        assert!(blank.validate().is_err());

        let short_password = SignupData {
            roll_no: "b190001cs".to_string(),
            password: "short".to_string(),
            teacher_code: None,
        };
        assert!(short_password.validate().is_err());

        let fine = SignupData {
            roll_no: "b190001cs".to_string(),
            password: "hunter2!well".to_string(),
            teacher_code: None,
        };
        assert!(fine.validate().is_ok());
    }

    #[test]
    fn login_validation_failure_looks_like_bad_credentials() {
        let junk = LoginData {
            roll_no: "".to_string(),
            password: "hunter2!well".to_string(),
        };

        let problem = junk.validate().expect_err("empty roll number should fail");
        assert_eq!(problem.status, Status::BadRequest);
        assert_eq!(problem.title, problem::bad_credentials().title);
    }

    #[test]
    fn request_debug_output_hides_passwords() {
        let signup = SignupData {
            roll_no: "b190001cs".to_string(),
            password: "hunter2!well".to_string(),
            teacher_code: None,
        };
        let login = LoginData {
            roll_no: "b190001cs".to_string(),
            password: "hunter2!well".to_string(),
        };

        assert!(!format!("{:?}", signup).contains("hunter2"));
        assert!(!format!("{:?}", login).contains("hunter2"));
    }

    #[test]
    fn signup_body_defaults_to_student_signup() {
        let signup: SignupData =
            serde_json::from_str(r#"{"roll_no":"b190001cs","password":"hunter2!well"}"#)
                .expect("minimal body should parse");

        assert_eq!(signup.roll_no, "b190001cs");
        assert!(signup.teacher_code.is_none());
    }
}
