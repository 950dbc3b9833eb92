//! Course enrollment workflow.
//!
//! Inside one serializable transaction the workflow reads the class, resolves
//! the requested students by email and then checks, in this order:
//!
//! 1. every requested email belongs to a registered student
//! 2. none of them is already enrolled in the course
//! 3. the course has room for all of them
//!
//! Only when all three hold are the enrollments inserted and committed. The
//! first failing check decides the error, so a request with both unknown and
//! already-enrolled students reports the unknown ones.

use std::collections::BTreeSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::{EnrollmentError, StoreError},
    models::class::{Email, EnrollmentRequest},
    scope::{Database, IsolationLevel, TransactionScope},
    stores::ClassStore,
    validation,
};

use super::{EnrollmentService, RetryPolicy, release};

pub struct EnrollmentWorkflow<D, C> {
    database: D,
    classes: C,
    retry: RetryPolicy,
}

impl<D, C> EnrollmentWorkflow<D, C>
where
    D: Database,
    C: ClassStore<D::Tx>,
{
    pub fn new(database: D, classes: C) -> Self {
        Self {
            database,
            classes,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Enroll every student of the request in the course, or none of them.
    ///
    /// Emails are matched exactly and duplicates within the request count
    /// once.
    ///
    /// # Errors
    ///
    /// - `Invalid`: empty course code or no students; no transaction is opened
    /// - `CourseNotFound`, `UnregisteredStudents`, `AlreadyEnrolled`,
    ///   `Oversubscribed`: business rejections, nothing is written
    /// - `Conflict`: lost a race with a concurrent enrollment
    /// - `Store` / `Scope`: infrastructure failure
    #[tracing::instrument(
        name = "enrollment",
        skip_all,
        fields(course_code = %request.course_code, students = request.students.len())
    )]
    pub async fn enroll(&self, request: &EnrollmentRequest) -> Result<(), EnrollmentError> {
        let emails = validate_request(request).inspect_err(log_failure)?;

        let mut attempt = 1;
        loop {
            match self.attempt(&request.course_code, &emails).await {
                Ok(()) => {
                    tracing::info!(enrolled = emails.len(), "students enrolled");
                    return Ok(());
                }
                Err(EnrollmentError::Conflict(err)) if attempt < self.retry.max_attempts() => {
                    tracing::warn!(attempt, error = %err, "enrollment conflicted, retrying");
                    attempt += 1;
                }
                Err(err) => {
                    log_failure(&err);
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(&self, course_code: &str, emails: &[Email]) -> Result<(), EnrollmentError> {
        let mut scope = TransactionScope::new(&self.database);
        scope.begin(IsolationLevel::Serializable).await?;

        let outcome = self.check_and_enroll(&mut scope, course_code, emails).await;
        release(&mut scope).await;

        outcome
    }

    async fn check_and_enroll(
        &self,
        scope: &mut TransactionScope<'_, D>,
        course_code: &str,
        emails: &[Email],
    ) -> Result<(), EnrollmentError> {
        let tx = scope.transaction()?;

        let class = self
            .classes
            .get_class_by_course_code(tx, course_code)
            .await
            .map_err(|err| match err {
                StoreError::NotFound => EnrollmentError::CourseNotFound {
                    course_code: course_code.to_string(),
                },
                other => other.into(),
            })?;

        let students = self.classes.get_students_by_email(tx, emails).await?;
        let registered: Vec<Email> = students.iter().map(|s| s.email.clone()).collect();

        let missing = validation::email_set_difference(emails, &registered);
        if !missing.is_empty() {
            return Err(EnrollmentError::UnregisteredStudents {
                missing: missing.into_iter().collect(),
            });
        }

        let already = validation::email_set_intersection(emails, &class.emails());
        if !already.is_empty() {
            return Err(EnrollmentError::AlreadyEnrolled {
                students: already.into_iter().collect(),
            });
        }

        let attempted = u32::try_from(emails.len()).unwrap_or(u32::MAX);
        if !validation::has_capacity(class.course.capacity, class.enrolled_count(), attempted) {
            return Err(EnrollmentError::Oversubscribed {
                course_code: class.course.code.clone(),
                available_spaces: class.available_spaces(),
                attempted_enrollments: attempted,
            });
        }

        let student_ids: Vec<Uuid> = students.iter().map(|s| s.id).collect();
        let inserted = self
            .classes
            .insert_enrollments(tx, class.course.id, &student_ids)
            .await?;
        tracing::debug!(inserted = inserted.len(), "enrollment rows written");

        scope.commit().await?;

        Ok(())
    }
}

#[async_trait]
impl<D, C> EnrollmentService for EnrollmentWorkflow<D, C>
where
    D: Database,
    C: ClassStore<D::Tx>,
{
    async fn submit_enrollment(&self, request: EnrollmentRequest) -> Result<(), EnrollmentError> {
        self.enroll(&request).await
    }
}

/// Structural checks. Returns the requested emails, deduplicated in
/// first-seen order.
fn validate_request(request: &EnrollmentRequest) -> Result<Vec<Email>, EnrollmentError> {
    if request.course_code.trim().is_empty() {
        return Err(EnrollmentError::Invalid("course code is required".to_string()));
    }
    if request.students.is_empty() {
        return Err(EnrollmentError::Invalid(
            "at least one student is required".to_string(),
        ));
    }
    if request.students.iter().any(|s| s.email.as_str().is_empty()) {
        return Err(EnrollmentError::Invalid(
            "every student needs an email".to_string(),
        ));
    }

    let mut seen = BTreeSet::new();
    Ok(request
        .emails()
        .into_iter()
        .filter(|email| seen.insert(email.clone()))
        .collect())
}

fn log_failure(err: &EnrollmentError) {
    match err {
        EnrollmentError::Conflict(_) => {
            tracing::warn!(error = %err, "enrollment lost a serialization race");
        }
        EnrollmentError::Store(_) | EnrollmentError::Scope(_) => {
            tracing::error!(error = %err, "enrollment failed");
        }
        _ => tracing::info!(error = %err, "enrollment rejected"),
    }
}
