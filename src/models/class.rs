//! Course, student and enrollment models.
//!
//! A `Class` is not a table: it is a course together with the students
//! currently enrolled in it, rebuilt by a join every time it is read.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An email address, compared as an exact, case-sensitive string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: Uuid,
    /// Unique business key
    pub code: String,
    pub title: String,
    pub capacity: u32,
    pub description: String,
}

/// A registered student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub birthdate: NaiveDate,
    pub email: Email,
}

/// A student named in an enrollment request. Only the email is used to
/// resolve the registered student.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Enrollee {
    pub name: String,
    pub birthdate: NaiveDate,
    pub email: Email,
}

/// A course and its currently enrolled students.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    pub course: Course,
    pub students: Vec<Student>,
}

impl Class {
    pub fn enrolled_count(&self) -> u32 {
        u32::try_from(self.students.len()).unwrap_or(u32::MAX)
    }

    /// Remaining places; an over-full course has none.
    pub fn available_spaces(&self) -> u32 {
        self.course.capacity.saturating_sub(self.enrolled_count())
    }

    pub fn emails(&self) -> Vec<Email> {
        self.students.iter().map(|s| s.email.clone()).collect()
    }
}

/// Represents an enrollment record from the database.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub course_id: Uuid,
    pub student_id: Uuid,
}

/// Request to enroll a batch of students in one course.
///
/// # JSON Example
///
/// ```json
/// {
///   "course_code": "SICP",
///   "students": [
///     { "name": "Kassandra Reyes", "birthdate": "1994-03-02", "email": "k.reyes@example.com" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnrollmentRequest {
    pub course_code: String,
    pub students: Vec<Enrollee>,
}

impl EnrollmentRequest {
    pub fn emails(&self) -> Vec<Email> {
        self.students.iter().map(|s| s.email.clone()).collect()
    }
}
