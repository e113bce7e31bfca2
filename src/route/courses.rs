use chrono::Utc;
use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use uuid::Uuid;

use crate::data::course::db::{CourseDbExt, SubmissionData};
use crate::data::course::{Course, Submission};
use crate::data::user::db::{problem as user_problem, UserDbExt};
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::Problem;

/// Courses the calling user is enrolled in
#[utoipa::path(
    responses(
        (status = 200, description = "Enrolled courses", body = Vec<Course>),
        (status = 401, description = "Missing or invalid session token", body = Problem),
    ),
    security(("token" = []))
)]
#[get("/courses/my-courses")]
#[tracing::instrument]
pub async fn my_courses(
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Vec<Course>>, Problem> {
    let user = db
        .get_user(auth.user)
        .await?
        .ok_or_else(|| user_problem::not_found(auth.user))?;

    Ok(Json(db.courses_for_student(&user).await?))
}

/// Get course details
#[utoipa::path(
    params(
        ("id", description = "course ID")
    ),
    responses(
        (status = 200, description = "Course contents", body = Course),
        (status = 401, description = "Missing or invalid session token", body = Problem),
        (status = 404, description = "Queried course doesn't exist", body = Problem),
    ),
    security(("token" = []))
)]
#[get("/courses/<id>")]
#[tracing::instrument]
pub async fn course_info(
    id: Uuid,
    _auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Course>, Problem> {
    Ok(Json(db.get_course(id).await?))
}

/// Submit homework
///
/// Submitting again for the same homework replaces the earlier file
/// reference instead of adding a second entry.
#[utoipa::path(
    params(
        ("course_id", description = "course ID"),
        ("homework_id", description = "homework ID"),
    ),
    request_body = SubmissionData,
    responses(
        (status = 200, description = "Stored submission", body = Submission),
        (status = 401, description = "Missing or invalid session token", body = Problem),
        (status = 404, description = "Course or homework doesn't exist", body = Problem),
    ),
    security(("token" = []))
)]
#[post(
    "/courses/<course_id>/homework/<homework_id>/submit",
    format = "application/json",
    data = "<submission>"
)]
#[tracing::instrument]
pub async fn submit_homework(
    course_id: Uuid,
    homework_id: Uuid,
    submission: Json<SubmissionData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Submission>, Problem> {
    let stored = db
        .submit_homework(
            course_id,
            homework_id,
            auth.user,
            submission.into_inner().file_url,
            Utc::now(),
        )
        .await?;

    Ok(Json(stored))
}

///////////////////////
//       TESTS
///////////////////////
