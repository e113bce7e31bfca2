use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::resp::problem::Problem;

pub mod db;

pub static COURSE_COLLECTION_NAME: &str = "courses";

fn default_syllabus() -> String {
    "Syllabus not available yet.".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Lecture {
    pub title: String,
    pub date: DateTime<Utc>,
    pub notification: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Resource {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Question {
    pub question_text: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// Quiz metadata published to a course. Taking quizzes and grading answers
/// are out of scope; nothing here records student responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Quiz {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub title: String,
    pub due_date: DateTime<Utc>,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Submission {
    pub student: Uuid,
    pub file_url: String,
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Homework {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

impl Homework {
    /// One submission per student. A resubmission overwrites the stored file
    /// reference and resets the timestamp instead of growing the list.
    pub fn upsert_submission(
        &mut self,
        student: Uuid,
        file_url: impl ToString,
        now: DateTime<Utc>,
    ) -> Submission {
        let file_url = file_url.to_string();

        match self.submissions.iter_mut().find(|s| s.student == student) {
            Some(existing) => {
                existing.file_url = file_url;
                existing.submitted_at = now;
                existing.clone()
            }
            None => {
                let submission = Submission {
                    student,
                    file_url,
                    submitted_at: now,
                };
                self.submissions.push(submission.clone());
                submission
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Course {
    #[serde(
        default = "Uuid::new_v4",
        rename = "_id",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    pub name: String,
    pub course_code: String,
    pub teacher: Uuid,

    #[serde(default)]
    pub students: Vec<Uuid>,
    #[serde(default)]
    pub lectures: Vec<Lecture>,
    #[serde(default = "default_syllabus")]
    pub syllabus: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
    #[serde(default)]
    pub homeworks: Vec<Homework>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn new(name: impl ToString, course_code: impl ToString, teacher: Uuid) -> Course {
        let now = Utc::now();

        Course {
            id: Uuid::new_v4(),
            name: name.to_string(),
            course_code: course_code.to_string(),
            teacher,
            students: Vec::new(),
            lectures: Vec::new(),
            syllabus: default_syllabus(),
            resources: Vec::new(),
            quizzes: Vec::new(),
            homeworks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Every mutating teacher operation runs through this check; only the
    /// owning teacher may change a course.
    pub fn ensure_owned_by(&self, teacher: Uuid) -> Result<(), Problem> {
        if self.teacher != teacher {
            return Err(db::problem::not_course_owner(self.id));
        }

        Ok(())
    }

    /// Records enrollment on the course side. Returns whether the student
    /// was newly added.
    pub fn add_student(&mut self, student: Uuid) -> bool {
        if self.students.contains(&student) {
            return false;
        }

        self.students.push(student);
        true
    }

    /// Newest first, so fresh assignments lead the list.
    pub fn add_homework(&mut self, homework: Homework) {
        self.homeworks.insert(0, homework);
    }

    /// Newest first, same as homeworks.
    pub fn add_lecture(&mut self, lecture: Lecture) {
        self.lectures.insert(0, lecture);
    }

    pub fn add_resource(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    pub fn add_quiz(&mut self, quiz: Quiz) {
        self.quizzes.push(quiz);
    }

    pub fn set_syllabus(&mut self, syllabus: impl ToString) {
        self.syllabus = syllabus.to_string();
    }

    pub fn homework_mut(&mut self, homework: Uuid) -> Option<&mut Homework> {
        self.homeworks.iter_mut().find(|hw| hw.id == homework)
    }
}

pub mod filter {
    use bson::spec::BinarySubtype;
    use bson::{doc, Bson, Document};
    use uuid::Uuid;

    #[inline]
    fn uuid_binary(id: Uuid) -> Bson {
        Bson::Binary(bson::Binary {
            subtype: BinarySubtype::Uuid,
            bytes: id.as_bytes().to_vec(),
        })
    }

    #[inline]
    pub fn by_id(id: Uuid) -> Document {
        doc! { "_id": uuid_binary(id) }
    }

    #[inline]
    pub fn by_course_code(code: impl ToString) -> Document {
        doc! { "course_code": code.to_string() }
    }

    #[inline]
    pub fn owned_by(teacher: Uuid) -> Document {
        doc! { "teacher": teacher.to_string() }
    }

    #[inline]
    pub fn any_of(ids: &[Uuid]) -> Document {
        let ids: Vec<Bson> = ids.iter().copied().map(uuid_binary).collect();
        doc! { "_id": { "$in": ids } }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rocket::http::Status;

    fn sample_course(teacher: Uuid) -> Course {
        Course::new("Operating Systems", "CS3002", teacher)
    }

    fn sample_homework() -> Homework {
        Homework {
            id: Uuid::new_v4(),
            title: "Scheduling exercise".to_string(),
            description: "Implement round robin.".to_string(),
            due_date: Utc::now() + Duration::days(7),
            submissions: Vec::new(),
        }
    }

    #[test]
    fn resubmission_replaces_previous_file() {
        let mut homework = sample_homework();
        let student = Uuid::new_v4();
        let first = Utc::now();
        let second = first + Duration::hours(3);

        homework.upsert_submission(student, "files/one.pdf", first);
        let updated = homework.upsert_submission(student, "files/two.pdf", second);

        assert_eq!(homework.submissions.len(), 1);
        assert_eq!(homework.submissions[0].file_url, "files/two.pdf");
        assert_eq!(homework.submissions[0].submitted_at, second);
        assert_eq!(updated.file_url, "files/two.pdf");
    }

    #[test]
    fn submissions_from_different_students_coexist() {
        let mut homework = sample_homework();
        let now = Utc::now();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        homework.upsert_submission(a, "files/a.pdf", now);
        homework.upsert_submission(b, "files/b.pdf", now);
        homework.upsert_submission(a, "files/a2.pdf", now + Duration::minutes(5));

        assert_eq!(homework.submissions.len(), 2);
        assert_eq!(homework.submissions[0].student, a);
        assert_eq!(homework.submissions[0].file_url, "files/a2.pdf");
        assert_eq!(homework.submissions[1].student, b);
    }

    #[test]
    fn enrolling_student_twice_keeps_one_entry() {
        let mut course = sample_course(Uuid::new_v4());
        let student = Uuid::new_v4();

        assert!(course.add_student(student));
        assert!(!course.add_student(student));
        assert_eq!(course.students, vec![student]);
    }

    #[test]
    fn homeworks_and_lectures_are_newest_first() {
        let mut course = sample_course(Uuid::new_v4());

        let mut first = sample_homework();
        first.title = "first".to_string();
        let mut second = sample_homework();
        second.title = "second".to_string();

        course.add_homework(first);
        course.add_homework(second);
        assert_eq!(course.homeworks[0].title, "second");
        assert_eq!(course.homeworks[1].title, "first");

        let lecture = |title: &str| Lecture {
            title: title.to_string(),
            date: Utc::now(),
            notification: "Room change.".to_string(),
        };
        course.add_lecture(lecture("monday"));
        course.add_lecture(lecture("friday"));
        assert_eq!(course.lectures[0].title, "friday");
        assert_eq!(course.lectures[1].title, "monday");
    }

    #[test]
    fn resources_and_quizzes_append_in_order() {
        let mut course = sample_course(Uuid::new_v4());

        course.add_resource(Resource {
            name: "slides".to_string(),
            url: "https://example.com/slides".to_string(),
        });
        course.add_resource(Resource {
            name: "errata".to_string(),
            url: "https://example.com/errata".to_string(),
        });
        assert_eq!(course.resources[0].name, "slides");
        assert_eq!(course.resources[1].name, "errata");

        let quiz = |title: &str| Quiz {
            id: Uuid::new_v4(),
            title: title.to_string(),
            due_date: Utc::now(),
            questions: vec![Question {
                question_text: "2 + 2?".to_string(),
                options: vec!["3".to_string(), "4".to_string()],
                correct_answer: "4".to_string(),
            }],
        };
        course.add_quiz(quiz("week 1"));
        course.add_quiz(quiz("week 2"));
        assert_eq!(course.quizzes[0].title, "week 1");
        assert_eq!(course.quizzes[1].title, "week 2");
    }

    #[test]
    fn foreign_teacher_fails_ownership_check() {
        let owner = Uuid::new_v4();
        let course = sample_course(owner);

        assert!(course.ensure_owned_by(owner).is_ok());

        let problem = course
            .ensure_owned_by(Uuid::new_v4())
            .expect_err("non-owner should be rejected");
        assert_eq!(problem.status, Status::Forbidden);
    }

    #[test]
    fn minimal_document_deserializes_with_defaults() {
        let teacher = Uuid::new_v4();
        let document = bson::doc! {
            "name": "Operating Systems",
            "course_code": "CS3002",
            "teacher": teacher.to_string(),
        };

        let course: Course =
            bson::from_document(document).expect("minimal course document should deserialize");

        assert_eq!(course.syllabus, "Syllabus not available yet.");
        assert_eq!(course.teacher, teacher);
        assert!(course.students.is_empty());
        assert!(course.homeworks.is_empty());
    }

    #[test]
    fn course_serializes_id_as_bson_binary() {
        let course = sample_course(Uuid::new_v4());

        let document = bson::to_document(&course).expect("Course must be serializable to BSON");
        assert!(matches!(document.get("_id"), Some(bson::Bson::Binary(_))));

        let back: Course = bson::from_document(document).expect("Course must round-trip");
        assert_eq!(back.id, course.id);
        assert_eq!(back.course_code, course.course_code);
    }
}
