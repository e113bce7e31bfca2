use std::io::Cursor;

use rocket::http::ContentType;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::{response, Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use utoipa::ToSchema;

/// Implements [RFC7807](https://tools.ietf.org/html/rfc7807).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Problem {
    #[serde(skip)]
    pub status: Status,
    pub type_uri: String,
    pub title: String,

    pub detail: Option<String>,

    #[schema(value_type = Object)]
    pub body: Map<String, Value>,
}

impl Default for Problem {
    fn default() -> Self {
        Problem {
            status: Status::InternalServerError,
            type_uri: "about:blank".to_string(),
            title: "Problem".to_string(),
            detail: None,
            body: Map::new(),
        }
    }
}

impl Problem {
    // TODO: Add problem type URIs
    pub fn new_untyped(status: Status, title: impl ToString) -> Problem {
        Problem {
            status,
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn detail(&mut self, value: impl ToString) -> &mut Problem {
        self.detail = Some(value.to_string());
        self
    }

    pub fn insert<V: Serialize>(&mut self, key: impl ToString, value: V) -> &mut Problem {
        self.body.insert(
            key.to_string(),
            serde_json::to_value(value).expect("data must be JSON serializable"),
        );
        self
    }

    pub fn insert_str(&mut self, key: impl ToString, value: impl ToString) -> &mut Problem {
        self.body
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.title)
    }
}

impl std::error::Error for Problem {}

impl<'r> Responder<'r, 'static> for Problem {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let mut body = self.body.clone();

        // Following are required by rfc7807
        body.insert(String::from("type"), Value::from(self.type_uri));
        body.insert(String::from("title"), Value::from(self.title));
        body.insert(String::from("status"), Value::from(self.status.code));

        // Optional parameters as specified by rfc7807
        if let Some(detail) = self.detail {
            body.insert(String::from("detail"), Value::from(detail));
        }

        let body_string = serde_json::to_string(&body)
            .expect("JSON map keys and values must be JSON serializable");

        Response::build()
            .status(self.status)
            .header(ContentType::new("application", "problem+json"))
            .raw_header("Content-Language", "en")
            .sized_body(body_string.len(), Cursor::new(body_string))
            .ok()
    }
}

/// Request-local slot where failing guards leave their problem so the
/// status catchers can render the exact body instead of a generic one.
#[derive(Debug, Clone, Default)]
pub struct GuardProblem(Option<Problem>);

pub fn stash_guard_problem(req: &Request<'_>, problem: &Problem) {
    req.local_cache(|| GuardProblem(Some(problem.clone())));
}

pub fn stashed_guard_problem(req: &Request<'_>) -> Option<Problem> {
    req.local_cache(GuardProblem::default).0.clone()
}

pub mod problems {
    use crate::resp::problem::Problem;
    use rocket::http::Status;

    #[inline]
    pub fn malformed_body() -> Problem {
        Problem::new_untyped(
            Status::BadRequest,
            "There was a problem parsing part of the request.",
        )
    }

    #[inline]
    pub fn unauthorized() -> Problem {
        Problem::new_untyped(Status::Unauthorized, "Unable to authorize user.")
    }

    #[inline]
    pub fn forbidden() -> Problem {
        Problem::new_untyped(Status::Forbidden, "Access denied.")
    }

    #[inline]
    pub fn not_found() -> Problem {
        Problem::new_untyped(Status::NotFound, "Resource doesn't exist.")
    }

    #[inline]
    pub fn internal() -> Problem {
        Problem::new_untyped(
            Status::InternalServerError,
            "Server failed while processing request.",
        )
    }
}

impl From<mongodb::error::Error> for Problem {
    fn from(e: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        fn store_problem() -> Problem {
            Problem::new_untyped(
                Status::InternalServerError,
                "Document store failed while processing request.",
            )
        }

        fn access_problem() -> Problem {
            Problem::new_untyped(
                Status::InternalServerError,
                "Server was unable to access the document store.",
            )
        }

        match e.kind.as_ref() {
            ErrorKind::Authentication { .. } => access_problem(),
            ErrorKind::DnsResolve { .. } => access_problem(),
            ErrorKind::ServerSelection { .. } => access_problem(),
            ErrorKind::InvalidTlsConfig { .. } => access_problem(),
            ErrorKind::Io(_) => store_problem()
                .detail("An IO error occurred. Submitted data might not be properly stored.")
                .clone(),
            ErrorKind::Write(_) => store_problem()
                .detail("A write error occurred. Submitted data might not be properly stored.")
                .clone(),
            _ => store_problem(),
        }
    }
}

impl From<bson::de::Error> for Problem {
    fn from(_: bson::de::Error) -> Self {
        Problem::new_untyped(
            Status::InternalServerError,
            "An error occurred while processing BSON data.",
        )
    }
}

impl From<bson::ser::Error> for Problem {
    fn from(_: bson::ser::Error) -> Self {
        Problem::new_untyped(
            Status::InternalServerError,
            "An error occurred while processing BSON data.",
        )
    }
}

impl From<serde_json::Error> for Problem {
    fn from(_: serde_json::Error) -> Self {
        Problem::new_untyped(
            Status::InternalServerError,
            "An error occurred while processing JSON data.",
        )
    }
}

// Signing-side failures only; token verification maps its own errors so
// expired and tampered tokens are indistinguishable to the caller.
impl From<jsonwebtoken::errors::Error> for Problem {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        Problem::new_untyped(
            Status::InternalServerError,
            "Unable to issue session token.",
        )
    }
}

impl From<std::io::Error> for Problem {
    fn from(_: std::io::Error) -> Self {
        Problem::new_untyped(Status::InternalServerError, "Server IO error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_renders_rfc7807_members() {
        let problem = Problem::new_untyped(Status::NotFound, "Course doesn't exist.")
            .detail("No course with that id.")
            .insert_str("course_id", "c-1")
            .clone();

        assert_eq!(problem.status, Status::NotFound);
        assert_eq!(problem.title, "Course doesn't exist.");
        assert_eq!(problem.detail.as_deref(), Some("No course with that id."));
        assert_eq!(
            problem.body.get("course_id"),
            Some(&Value::String("c-1".to_string()))
        );
    }

    #[test]
    fn taxonomy_constructors_carry_expected_statuses() {
        assert_eq!(problems::malformed_body().status, Status::BadRequest);
        assert_eq!(problems::unauthorized().status, Status::Unauthorized);
        assert_eq!(problems::forbidden().status, Status::Forbidden);
        assert_eq!(problems::not_found().status, Status::NotFound);
        assert_eq!(problems::internal().status, Status::InternalServerError);
    }
}
