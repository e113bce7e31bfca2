use bson::{from_bson, Bson, Document};
use chrono::{DateTime, Utc};
use mongodb::Database;
use rocket::futures::StreamExt;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::user::db::{problem as user_problem, UserDbExt};
use crate::data::user::User;
use crate::resp::problem::Problem;

use super::filter;
use super::{Course, Homework, Lecture, Question, Quiz, Resource, Submission};
use super::COURSE_COLLECTION_NAME;

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;
    use uuid::Uuid;

    #[inline]
    pub fn course_not_found(id: Uuid) -> Problem {
        Problem::new_untyped(Status::NotFound, "Course not found.")
            .insert("id", id.to_string())
            .clone()
    }

    #[inline]
    pub fn duplicate_course_code(code: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Course code already in use.")
            .insert_str("course_code", code)
            .clone()
    }

    #[inline]
    pub fn not_course_owner(id: Uuid) -> Problem {
        Problem::new_untyped(
            Status::Forbidden,
            "You are not authorized to modify this course.",
        )
        .insert("id", id.to_string())
        .clone()
    }

    #[inline]
    pub fn homework_not_found(id: Uuid) -> Problem {
        Problem::new_untyped(Status::NotFound, "Homework not found.")
            .insert("id", id.to_string())
            .clone()
    }

    #[inline]
    pub fn empty_quiz() -> Problem {
        Problem::new_untyped(Status::BadRequest, "A quiz needs at least one question.")
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CourseCreateData {
    pub name: String,
    pub course_code: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EnrollData {
    pub roll_no: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EnrollmentResponse {
    pub course: Uuid,
    pub student: Uuid,
    pub roll_no: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct HomeworkData {
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
}

impl From<HomeworkData> for Homework {
    fn from(data: HomeworkData) -> Self {
        Homework {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            due_date: data.due_date,
            submissions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LectureData {
    pub title: String,
    pub date: DateTime<Utc>,
    pub notification: String,
}

impl From<LectureData> for Lecture {
    fn from(data: LectureData) -> Self {
        Lecture {
            title: data.title,
            date: data.date,
            notification: data.notification,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SyllabusData {
    pub syllabus: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct QuizData {
    pub title: String,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuizData {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.questions.is_empty() {
            return Err(problem::empty_quiz());
        }

        Ok(())
    }
}

impl From<QuizData> for Quiz {
    fn from(data: QuizData) -> Self {
        Quiz {
            id: Uuid::new_v4(),
            title: data.title,
            due_date: data.due_date,
            questions: data.questions,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmissionData {
    pub file_url: String,
}

pub trait CourseDbExt {
    async fn create_course(&self, data: CourseCreateData, owner: Uuid) -> Result<Course, Problem>;

    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, Problem>;

    /// [`CourseDbExt::find_course`] with absence turned into the not-found
    /// problem.
    async fn get_course(&self, id: Uuid) -> Result<Course, Problem>;

    async fn courses_owned_by(&self, teacher: Uuid) -> Result<Vec<Course>, Problem>;

    async fn courses_for_student(&self, student: &User) -> Result<Vec<Course>, Problem>;

    async fn save_course(&self, course: &mut Course) -> Result<(), Problem>;

    async fn enroll_student(
        &self,
        course_id: Uuid,
        roll_no: &str,
        teacher: Uuid,
    ) -> Result<EnrollmentResponse, Problem>;

    async fn add_homework(
        &self,
        course_id: Uuid,
        teacher: Uuid,
        data: HomeworkData,
    ) -> Result<Vec<Homework>, Problem>;

    async fn add_lecture(
        &self,
        course_id: Uuid,
        teacher: Uuid,
        data: LectureData,
    ) -> Result<Vec<Lecture>, Problem>;

    async fn add_resource(
        &self,
        course_id: Uuid,
        teacher: Uuid,
        resource: Resource,
    ) -> Result<Vec<Resource>, Problem>;

    async fn add_quiz(
        &self,
        course_id: Uuid,
        teacher: Uuid,
        data: QuizData,
    ) -> Result<Vec<Quiz>, Problem>;

    async fn set_syllabus(
        &self,
        course_id: Uuid,
        teacher: Uuid,
        syllabus: String,
    ) -> Result<String, Problem>;

    async fn submit_homework(
        &self,
        course_id: Uuid,
        homework_id: Uuid,
        student: Uuid,
        file_url: String,
        now: DateTime<Utc>,
    ) -> Result<Submission, Problem>;
}

impl CourseDbExt for Database {
    async fn create_course(&self, data: CourseCreateData, owner: Uuid) -> Result<Course, Problem> {
        let existing: Option<Document> = self
            .collection(COURSE_COLLECTION_NAME)
            .find_one(filter::by_course_code(&data.course_code), None)
            .await
            .map_err(Problem::from)?;

        if existing.is_some() {
            return Err(problem::duplicate_course_code(&data.course_code));
        }

        let course = Course::new(data.name, data.course_code, owner);

        self.collection(COURSE_COLLECTION_NAME)
            .insert_one(
                bson::to_document(&course).expect("Course must be serializable to BSON"),
                None,
            )
            .await
            .map_err(Problem::from)?;

        tracing::info!("Created course {} ({})", course.course_code, course.id);

        Ok(course)
    }

    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, Problem> {
        self.collection(COURSE_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn get_course(&self, id: Uuid) -> Result<Course, Problem> {
        self.find_course(id)
            .await?
            .ok_or_else(|| problem::course_not_found(id))
    }

    async fn courses_owned_by(&self, teacher: Uuid) -> Result<Vec<Course>, Problem> {
        collect_courses(self, filter::owned_by(teacher)).await
    }

    async fn courses_for_student(&self, student: &User) -> Result<Vec<Course>, Problem> {
        if student.enrolled_courses.is_empty() {
            return Ok(Vec::new());
        }

        collect_courses(self, filter::any_of(&student.enrolled_courses)).await
    }

    async fn save_course(&self, course: &mut Course) -> Result<(), Problem> {
        course.updated_at = Utc::now();

        self.collection::<Document>(COURSE_COLLECTION_NAME)
            .replace_one(
                filter::by_id(course.id),
                bson::to_document(course).expect("Course must be serializable to BSON"),
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(())
    }

    async fn enroll_student(
        &self,
        course_id: Uuid,
        roll_no: &str,
        teacher: Uuid,
    ) -> Result<EnrollmentResponse, Problem> {
        let mut course = self.get_course(course_id).await?;

        let mut student = self
            .find_student_by_roll_no(roll_no)
            .await?
            .ok_or_else(|| user_problem::student_not_found(roll_no))?;

        course.ensure_owned_by(teacher)?;

        // Both sides only gain the reference when it's missing, so enrolling
        // an already enrolled student is a no-op.
        let student_added = student.add_course(course.id);
        if student_added {
            self.save_user(&student).await?;
        }

        if course.add_student(student.id) {
            if let Err(persist) = self.save_course(&mut course).await {
                // The student side already landed; take it back out so the
                // two documents don't disagree about the enrollment.
                if student_added {
                    student.enrolled_courses.retain(|c| *c != course.id);
                    if let Err(revert) = self.save_user(&student).await {
                        tracing::error!(
                            "unable to revert enrollment of {} into {}: {}",
                            student.id,
                            course.id,
                            revert
                        );
                    }
                }
                return Err(persist);
            }
        }

        tracing::info!("Enrolled {} into course {}", student.roll_no, course.id);

        Ok(EnrollmentResponse {
            course: course.id,
            student: student.id,
            roll_no: student.roll_no,
        })
    }

    async fn add_homework(
        &self,
        course_id: Uuid,
        teacher: Uuid,
        data: HomeworkData,
    ) -> Result<Vec<Homework>, Problem> {
        let mut course = self.get_course(course_id).await?;
        course.ensure_owned_by(teacher)?;

        course.add_homework(data.into());
        self.save_course(&mut course).await?;

        Ok(course.homeworks)
    }

    async fn add_lecture(
        &self,
        course_id: Uuid,
        teacher: Uuid,
        data: LectureData,
    ) -> Result<Vec<Lecture>, Problem> {
        let mut course = self.get_course(course_id).await?;
        course.ensure_owned_by(teacher)?;

        course.add_lecture(data.into());
        self.save_course(&mut course).await?;

        Ok(course.lectures)
    }

    async fn add_resource(
        &self,
        course_id: Uuid,
        teacher: Uuid,
        resource: Resource,
    ) -> Result<Vec<Resource>, Problem> {
        let mut course = self.get_course(course_id).await?;
        course.ensure_owned_by(teacher)?;

        course.add_resource(resource);
        self.save_course(&mut course).await?;

        Ok(course.resources)
    }

    async fn add_quiz(
        &self,
        course_id: Uuid,
        teacher: Uuid,
        data: QuizData,
    ) -> Result<Vec<Quiz>, Problem> {
        data.validate()?;

        let mut course = self.get_course(course_id).await?;
        course.ensure_owned_by(teacher)?;

        course.add_quiz(data.into());
        self.save_course(&mut course).await?;

        Ok(course.quizzes)
    }

    async fn set_syllabus(
        &self,
        course_id: Uuid,
        teacher: Uuid,
        syllabus: String,
    ) -> Result<String, Problem> {
        let mut course = self.get_course(course_id).await?;
        course.ensure_owned_by(teacher)?;

        course.set_syllabus(syllabus);
        self.save_course(&mut course).await?;

        Ok(course.syllabus)
    }

    async fn submit_homework(
        &self,
        course_id: Uuid,
        homework_id: Uuid,
        student: Uuid,
        file_url: String,
        now: DateTime<Utc>,
    ) -> Result<Submission, Problem> {
        let mut course = self.get_course(course_id).await?;

        let homework = course
            .homework_mut(homework_id)
            .ok_or_else(|| problem::homework_not_found(homework_id))?;
        let submission = homework.upsert_submission(student, file_url, now);

        // Read-modify-write without a store-side guard: two concurrent
        // submissions by the same student can interleave between the scan
        // above and this replace. Last write wins.
        self.save_course(&mut course).await?;

        Ok(submission)
    }
}

async fn collect_courses(db: &Database, filter: Document) -> Result<Vec<Course>, Problem> {
    let mut documents = db
        .collection::<Document>(COURSE_COLLECTION_NAME)
        .find(filter, None)
        .await
        .map_err(Problem::from)?;

    let mut courses = Vec::new();
    while let Some(result) = documents.next().await {
        let document = result.map_err(Problem::from)?;
        match from_bson::<Course>(Bson::Document(document)) {
            Ok(course) => courses.push(course),
            Err(_) => {
                tracing::warn!("Unable to deserialize Course document.")
            }
        }
    }

    Ok(courses)
}
