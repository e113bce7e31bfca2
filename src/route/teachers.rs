use mongodb::Database;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;
use uuid::Uuid;

use crate::data::course::db::{
    CourseCreateData, CourseDbExt, EnrollData, EnrollmentResponse, HomeworkData, LectureData,
    QuizData, SyllabusData,
};
use crate::data::course::{Course, Homework, Lecture, Quiz, Resource};
use crate::resp::jwt::TeacherToken;
use crate::resp::problem::Problem;

/// Courses owned by the calling teacher
#[utoipa::path(
    responses(
        (status = 200, description = "Owned courses", body = Vec<Course>),
        (status = 401, description = "Missing or invalid session token", body = Problem),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
    ),
    security(("token" = []))
)]
#[get("/teachers/my-courses")]
#[tracing::instrument]
pub async fn taught_courses(
    auth: TeacherToken,
    db: &State<Database>,
) -> Result<Json<Vec<Course>>, Problem> {
    Ok(Json(db.courses_owned_by(auth.user).await?))
}

/// Create a course
#[utoipa::path(
    request_body = CourseCreateData,
    responses(
        (status = 201, description = "Created course", body = Course),
        (status = 400, description = "Course code already in use", body = Problem),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
    ),
    security(("token" = []))
)]
#[post("/teachers/courses", format = "application/json", data = "<course>")]
#[tracing::instrument]
pub async fn course_create(
    course: Json<CourseCreateData>,
    auth: TeacherToken,
    db: &State<Database>,
) -> Result<status::Custom<Json<Course>>, Problem> {
    let course = db.create_course(course.into_inner(), auth.user).await?;

    Ok(status::Custom(Status::Created, Json(course)))
}

/// Enroll a student
///
/// Looks the student up by roll number and records the enrollment on both
/// the course and the student document. Enrolling an already enrolled
/// student changes nothing.
#[utoipa::path(
    params(
        ("id", description = "course ID")
    ),
    request_body = EnrollData,
    responses(
        (status = 200, description = "Enrollment record", body = EnrollmentResponse),
        (status = 403, description = "Course owned by another teacher", body = Problem),
        (status = 404, description = "Course or student doesn't exist", body = Problem),
    ),
    security(("token" = []))
)]
#[post(
    "/teachers/courses/<id>/enroll",
    format = "application/json",
    data = "<enroll>"
)]
#[tracing::instrument]
pub async fn enroll(
    id: Uuid,
    enroll: Json<EnrollData>,
    auth: TeacherToken,
    db: &State<Database>,
) -> Result<Json<EnrollmentResponse>, Problem> {
    let enrollment = db
        .enroll_student(id, &enroll.into_inner().roll_no, auth.user)
        .await?;

    Ok(Json(enrollment))
}

/// Add homework to a course
#[utoipa::path(
    params(
        ("id", description = "course ID")
    ),
    request_body = HomeworkData,
    responses(
        (status = 201, description = "Updated homework list, newest first", body = Vec<Homework>),
        (status = 403, description = "Course owned by another teacher", body = Problem),
        (status = 404, description = "Queried course doesn't exist", body = Problem),
    ),
    security(("token" = []))
)]
#[post(
    "/teachers/courses/<id>/homeworks",
    format = "application/json",
    data = "<homework>"
)]
#[tracing::instrument]
pub async fn homework_add(
    id: Uuid,
    homework: Json<HomeworkData>,
    auth: TeacherToken,
    db: &State<Database>,
) -> Result<status::Custom<Json<Vec<Homework>>>, Problem> {
    let homeworks = db.add_homework(id, auth.user, homework.into_inner()).await?;

    Ok(status::Custom(Status::Created, Json(homeworks)))
}

/// Add a lecture notification to a course
#[utoipa::path(
    params(
        ("id", description = "course ID")
    ),
    request_body = LectureData,
    responses(
        (status = 201, description = "Updated lecture list, newest first", body = Vec<Lecture>),
        (status = 403, description = "Course owned by another teacher", body = Problem),
        (status = 404, description = "Queried course doesn't exist", body = Problem),
    ),
    security(("token" = []))
)]
#[post(
    "/teachers/courses/<id>/lectures",
    format = "application/json",
    data = "<lecture>"
)]
#[tracing::instrument]
pub async fn lecture_add(
    id: Uuid,
    lecture: Json<LectureData>,
    auth: TeacherToken,
    db: &State<Database>,
) -> Result<status::Custom<Json<Vec<Lecture>>>, Problem> {
    let lectures = db.add_lecture(id, auth.user, lecture.into_inner()).await?;

    Ok(status::Custom(Status::Created, Json(lectures)))
}

/// Replace the course syllabus
#[utoipa::path(
    params(
        ("id", description = "course ID")
    ),
    request_body = SyllabusData,
    responses(
        (status = 200, description = "Stored syllabus", body = SyllabusData),
        (status = 403, description = "Course owned by another teacher", body = Problem),
        (status = 404, description = "Queried course doesn't exist", body = Problem),
    ),
    security(("token" = []))
)]
#[put(
    "/teachers/courses/<id>/syllabus",
    format = "application/json",
    data = "<syllabus>"
)]
#[tracing::instrument]
pub async fn syllabus_update(
    id: Uuid,
    syllabus: Json<SyllabusData>,
    auth: TeacherToken,
    db: &State<Database>,
) -> Result<Json<SyllabusData>, Problem> {
    let syllabus = db
        .set_syllabus(id, auth.user, syllabus.into_inner().syllabus)
        .await?;

    Ok(Json(SyllabusData { syllabus }))
}

/// Add a resource link to a course
#[utoipa::path(
    params(
        ("id", description = "course ID")
    ),
    request_body = Resource,
    responses(
        (status = 201, description = "Updated resource list", body = Vec<Resource>),
        (status = 403, description = "Course owned by another teacher", body = Problem),
        (status = 404, description = "Queried course doesn't exist", body = Problem),
    ),
    security(("token" = []))
)]
#[post(
    "/teachers/courses/<id>/resources",
    format = "application/json",
    data = "<resource>"
)]
#[tracing::instrument]
pub async fn resource_add(
    id: Uuid,
    resource: Json<Resource>,
    auth: TeacherToken,
    db: &State<Database>,
) -> Result<status::Custom<Json<Vec<Resource>>>, Problem> {
    let resources = db.add_resource(id, auth.user, resource.into_inner()).await?;

    Ok(status::Custom(Status::Created, Json(resources)))
}

/// Add a quiz to a course
#[utoipa::path(
    params(
        ("id", description = "course ID")
    ),
    request_body = QuizData,
    responses(
        (status = 201, description = "Updated quiz list", body = Vec<Quiz>),
        (status = 400, description = "Quiz without questions", body = Problem),
        (status = 403, description = "Course owned by another teacher", body = Problem),
        (status = 404, description = "Queried course doesn't exist", body = Problem),
    ),
    security(("token" = []))
)]
#[post(
    "/teachers/courses/<id>/quizzes",
    format = "application/json",
    data = "<quiz>"
)]
#[tracing::instrument]
pub async fn quiz_add(
    id: Uuid,
    quiz: Json<QuizData>,
    auth: TeacherToken,
    db: &State<Database>,
) -> Result<status::Custom<Json<Vec<Quiz>>>, Problem> {
    let quizzes = db.add_quiz(id, auth.user, quiz.into_inner()).await?;

    Ok(status::Custom(Status::Created, Json(quizzes)))
}

///////////////////////
//       TESTS
///////////////////////

#[cfg(test)]
mod teacher_endpoints {
    use rocket::http::{ContentType, Header, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::Value;
    use uuid::Uuid;

    use crate::data::user::User;
    use crate::resp::jwt::{UserRoleToken, AUTH_HEADER_NAME};
    use crate::role::Role;
    use crate::security::Security;

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

    fn auth_header(role: Role) -> Header<'static> {
        let user = User::new("t0001", "hunter2!well", role).expect("hashing should work");
        let token = UserRoleToken::new(&user)
            .encode_jwt(&Security::test_fixture().token_secret)
            .expect("encoding should work for example");

        Header::new(AUTH_HEADER_NAME, token)
    }

    #[rocket::async_test]
    async fn teacher_routes_reject_missing_tokens() {
        let client = test_client().await;

        let response = client.get("/api/teachers/my-courses").dispatch().await;

        assert_eq!(response.status(), Status::Unauthorized);
        assert_eq!(
            response.content_type(),
            Some(ContentType::new("application", "problem+json"))
        );
    }

    #[rocket::async_test]
    async fn students_are_kept_out_of_teacher_routes() {
        let client = test_client().await;
        let student = auth_header(Role::Student);

        let listing = client
            .get("/api/teachers/my-courses")
            .header(student.clone())
            .dispatch()
            .await;
        assert_eq!(listing.status(), Status::Forbidden);

        let problem: Value = listing.into_json().await.expect("problem body");
        assert_eq!(problem["title"], "Access denied. Teachers only.");

        let create = client
            .post("/api/teachers/courses")
            .header(ContentType::JSON)
            .header(student.clone())
            .body(r#"{"name":"Operating Systems","course_code":"CS3002"}"#)
            .dispatch()
            .await;
        assert_eq!(create.status(), Status::Forbidden);

        let enroll = client
            .post(format!("/api/teachers/courses/{}/enroll", Uuid::new_v4()))
            .header(ContentType::JSON)
            .header(student)
            .body(r#"{"roll_no":"b190001cs"}"#)
            .dispatch()
            .await;
        assert_eq!(enroll.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn course_creation_rejects_malformed_bodies() {
        let client = test_client().await;

        let response = client
            .post("/api/teachers/courses")
            .header(ContentType::JSON)
            .header(auth_header(Role::Teacher))
            .body(r#"{"name":"Operating Systems"}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
        assert_eq!(
            response.content_type(),
            Some(ContentType::new("application", "problem+json"))
        );
    }
}
