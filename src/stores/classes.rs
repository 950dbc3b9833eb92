//! Postgres-backed `ClassStore`.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    db::PgTransaction,
    error::StoreError,
    models::class::{Class, Course, Email, Enrollment, Student},
};

use super::ClassStore;

/// Row of the `courses` table. Capacity is an `INTEGER` column and is
/// checked on the way into the domain.
#[derive(Debug, sqlx::FromRow)]
struct CourseRow {
    id: Uuid,
    code: String,
    title: String,
    capacity: i32,
    description: String,
}

impl TryFrom<CourseRow> for Course {
    type Error = StoreError;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        let capacity = u32::try_from(row.capacity).map_err(|_| {
            StoreError::InvalidRow(format!(
                "course {:?} has negative capacity {}",
                row.code, row.capacity
            ))
        })?;

        Ok(Course {
            id: row.id,
            code: row.code,
            title: row.title,
            capacity,
            description: row.description,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StudentRow {
    id: Uuid,
    name: String,
    birthdate: NaiveDate,
    email: String,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Student {
            id: row.id,
            name: row.name,
            birthdate: row.birthdate,
            email: Email::new(row.email),
        }
    }
}

/// Each enrollment row binds two of the 65535 parameters a statement allows.
const ENROLLMENTS_PER_STATEMENT: usize = 65535 / 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct PgClassStore;

#[async_trait]
impl ClassStore<PgTransaction> for PgClassStore {
    async fn get_class_by_course_code(
        &self,
        tx: &mut PgTransaction,
        course_code: &str,
    ) -> Result<Class, StoreError> {
        let course: Course = sqlx::query_as::<_, CourseRow>(
            "SELECT id, code, title, capacity, description FROM courses WHERE code = $1",
        )
        .bind(course_code)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StoreError::NotFound)?
        .try_into()?;

        let students = sqlx::query_as::<_, StudentRow>(
            r#"
            SELECT s.id, s.name, s.birthdate, s.email
            FROM students s
            JOIN enrollments e ON e.student_id = s.id
            WHERE e.course_id = $1
            ORDER BY s.email
            "#,
        )
        .bind(course.id)
        .fetch_all(&mut **tx)
        .await?
        .into_iter()
        .map(Student::from)
        .collect();

        Ok(Class { course, students })
    }

    async fn get_students_by_email(
        &self,
        tx: &mut PgTransaction,
        emails: &[Email],
    ) -> Result<Vec<Student>, StoreError> {
        let emails: Vec<String> = emails.iter().map(|e| e.as_str().to_string()).collect();

        let students = sqlx::query_as::<_, StudentRow>(
            "SELECT id, name, birthdate, email FROM students WHERE email = ANY($1) ORDER BY email",
        )
        .bind(emails)
        .fetch_all(&mut **tx)
        .await?
        .into_iter()
        .map(Student::from)
        .collect();

        Ok(students)
    }

    async fn insert_enrollments(
        &self,
        tx: &mut PgTransaction,
        course_id: Uuid,
        student_ids: &[Uuid],
    ) -> Result<Vec<Enrollment>, StoreError> {
        let mut enrollments = Vec::with_capacity(student_ids.len());

        for chunk in student_ids.chunks(ENROLLMENTS_PER_STATEMENT) {
            let mut builder =
                QueryBuilder::<Postgres>::new("INSERT INTO enrollments (course_id, student_id) ");
            builder.push_values(chunk, |mut row, student_id| {
                row.push_bind(course_id).push_bind(*student_id);
            });
            builder.push(" RETURNING id, course_id, student_id");

            let rows = builder
                .build_query_as::<Enrollment>()
                .fetch_all(&mut **tx)
                .await?;
            enrollments.extend(rows);
        }

        Ok(enrollments)
    }
}
