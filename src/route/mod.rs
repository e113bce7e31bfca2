use std::collections::BTreeMap;

use rocket::{Build, Catcher, Request, Rocket, Route};

pub mod auth;
pub mod courses;
pub mod teachers;

use auth::*;
use courses::*;
use teachers::*;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    data::course::db::{
        CourseCreateData, EnrollData, EnrollmentResponse, HomeworkData, LectureData, QuizData,
        SubmissionData, SyllabusData,
    },
    data::course::{Course, Homework, Lecture, Question, Quiz, Resource, Submission},
    data::user::db::{LoginData, LoginResponse, SignupData, UserCreatedResponse},
    resp::jwt::doc::TokenHeader,
    resp::problem::{problems, stashed_guard_problem, Problem},
    role::Role,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        register,
        login,
        my_courses,
        course_info,
        submit_homework,
        taught_courses,
        course_create,
        enroll,
        homework_add,
        lecture_add,
        syllabus_update,
        resource_add,
        quiz_add
    ),
    components(schemas(
        Role,
        Problem,
        SignupData,
        LoginData,
        UserCreatedResponse,
        LoginResponse,
        Course,
        Lecture,
        Resource,
        Question,
        Quiz,
        Homework,
        Submission,
        CourseCreateData,
        EnrollData,
        EnrollmentResponse,
        HomeworkData,
        LectureData,
        SyllabusData,
        QuizData,
        SubmissionData
    )),
    modifiers(&TokenHeader, &API_PREFIX)
)]
pub struct ApiDoc;

pub struct PathPrefix(pub &'static str);
static API_PREFIX: PathPrefix = PathPrefix("/api");

impl utoipa::Modify for PathPrefix {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut new_paths = BTreeMap::new();

        for (path, item) in std::mem::take(&mut openapi.paths.paths) {
            new_paths.insert(self.0.to_string() + path.as_ref(), item);
        }

        openapi.paths.paths = new_paths;
    }
}

// Guard and body failures land here; when a guard stashed its problem the
// catcher replays it so the caller sees the specific body, not a generic one.

#[catch(400)]
fn bad_request(req: &Request) -> Problem {
    stashed_guard_problem(req).unwrap_or_else(problems::malformed_body)
}

#[catch(401)]
fn unauthorized(req: &Request) -> Problem {
    stashed_guard_problem(req).unwrap_or_else(problems::unauthorized)
}

#[catch(403)]
fn forbidden(req: &Request) -> Problem {
    stashed_guard_problem(req).unwrap_or_else(problems::forbidden)
}

#[catch(404)]
fn not_found(req: &Request) -> Problem {
    stashed_guard_problem(req).unwrap_or_else(problems::not_found)
}

#[catch(422)]
fn unprocessable(req: &Request) -> Problem {
    stashed_guard_problem(req).unwrap_or_else(problems::malformed_body)
}

#[catch(500)]
fn internal(req: &Request) -> Problem {
    stashed_guard_problem(req).unwrap_or_else(problems::internal)
}

pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        internal
    ]
}

pub fn api() -> Vec<Route> {
    routes![
        register,
        login,
        my_courses,
        course_info,
        submit_homework,
        taught_courses,
        course_create,
        enroll,
        homework_add,
        lecture_add,
        syllabus_update,
        resource_add,
        quiz_add
    ]
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/api", api())
        .register("/", catchers())
        .mount(
            "/",
            SwaggerUi::new("/swagger/<_..>").url("/api/openapi.json", ApiDoc::openapi()),
        )
}

#[cfg(test)]
mod api_doc {
    use super::*;

    #[test]
    fn openapi_paths_carry_api_prefix() {
        let doc = ApiDoc::openapi();

        assert!(!doc.paths.paths.is_empty());
        assert!(doc.paths.paths.keys().all(|path| path.starts_with("/api/")));
        assert!(doc.paths.paths.contains_key("/api/auth/login"));
        assert!(doc.paths.paths.contains_key("/api/teachers/courses"));
    }

    #[test]
    fn token_security_scheme_is_registered() {
        let doc = ApiDoc::openapi();

        let components = doc.components.expect("components should be generated");
        assert!(components.security_schemes.contains_key("token"));
    }
}
