use mongodb::Database;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;

use crate::data::user::db::{
    LoginData, LoginResponse, SignupData, UserCreatedResponse, UserDbExt,
};
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::Problem;
use crate::security::Security;

/// Register a new user
///
/// A valid `teacher_code` grants the teacher role; without one the account
/// is a student.
#[utoipa::path(
    request_body = SignupData,
    responses(
        (status = 201, description = "Account created", body = UserCreatedResponse),
        (status = 400, description = "Duplicate roll number or invalid teacher code", body = Problem),
    )
)]
#[post("/auth/register", format = "application/json", data = "<signup>")]
#[tracing::instrument]
pub async fn register(
    signup: Json<SignupData>,
    db: &State<Database>,
    security: &State<Security>,
) -> Result<status::Custom<Json<UserCreatedResponse>>, Problem> {
    let user = db.register(signup.into_inner(), security).await?;

    Ok(status::Custom(
        Status::Created,
        Json(UserCreatedResponse::from(&user)),
    ))
}

/// Exchange credentials for a session token
#[utoipa::path(
    request_body = LoginData,
    responses(
        (status = 200, description = "Session token and account summary", body = LoginResponse),
        (status = 400, description = "Invalid credentials", body = Problem),
    )
)]
#[post("/auth/login", format = "application/json", data = "<login>")]
#[tracing::instrument]
pub async fn login(
    login: Json<LoginData>,
    db: &State<Database>,
    security: &State<Security>,
) -> Result<Json<LoginResponse>, Problem> {
    let user = db.authenticate(login.into_inner()).await?;

    let token = UserRoleToken::new(&user).encode_jwt(&security.token_secret)?;

    Ok(Json(LoginResponse {
        token,
        id: user.id,
        roll_no: user.roll_no,
        role: user.role,
    }))
}

///////////////////////
//       TESTS
///////////////////////

#[cfg(test)]
mod auth_endpoints {
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::Value;

    use crate::security::Security;

    // The database handle is constructed lazily by the driver, so requests
    // that fail validation before any query work without a running store.
    async fn test_client() -> Client {
        let db = mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .expect("default mongodb uri should parse")
            .database("coursehub_route_tests");

        let rocket = crate::route::mount_api(
            rocket::build()
                .manage(Security::test_fixture())
                .manage(db),
        );

        Client::tracked(rocket).await.expect("valid rocket")
    }

    #[rocket::async_test]
    async fn register_rejects_short_passwords() {
        let client = test_client().await;

        let response = client
            .post("/api/auth/register")
            .header(ContentType::JSON)
            .body(r#"{"roll_no":"b190001cs","password":"short"}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
        assert_eq!(
            response.content_type(),
            Some(ContentType::new("application", "problem+json"))
        );
    }

    #[rocket::async_test]
    async fn register_rejects_wrong_teacher_code() {
        let client = test_client().await;

        let response = client
            .post("/api/auth/register")
            .header(ContentType::JSON)
            .body(r#"{"roll_no":"t0001","password":"hunter2!well","teacher_code":"wrong"}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);

        let problem: Value = response.into_json().await.expect("problem body");
        assert_eq!(problem["title"], "Invalid teacher registration code.");
    }

    #[rocket::async_test]
    async fn login_validation_reads_as_bad_credentials() {
        let client = test_client().await;

        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(r#"{"roll_no":"","password":"hunter2!well"}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);

        let problem: Value = response.into_json().await.expect("problem body");
        assert_eq!(problem["title"], "Invalid credentials.");
    }

    #[rocket::async_test]
    async fn malformed_register_body_is_rejected() {
        let client = test_client().await;

        let response = client
            .post("/api/auth/register")
            .header(ContentType::JSON)
            .body(r#"{"roll_no": 17}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
        assert_eq!(
            response.content_type(),
            Some(ContentType::new("application", "problem+json"))
        );
    }
}
