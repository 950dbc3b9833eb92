//! In-memory database and stores for unit tests.
//!
//! Transactions are serialized by an owned mutex guard, which is a valid
//! serializable schedule: a transaction works on a staged copy of the state,
//! commit swaps the copy in, rollback or drop throws it away. Counters record
//! every begin/commit/rollback that reaches the "driver", and fault switches
//! inject failures.

use std::{
    collections::BTreeSet,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{
        account::Account,
        class::{Class, Course, Email, Enrollment, Student},
        transaction::{NewTransaction, Transaction},
    },
    scope::{Database, IsolationLevel, TransactionHandle},
};

use super::{AccountStore, ClassStore, LedgerStore};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    pub courses: Vec<Course>,
    pub students: Vec<Student>,
    pub enrollments: Vec<Enrollment>,
}

#[derive(Debug, Default)]
pub struct Counters {
    pub begins: AtomicU32,
    pub commits: AtomicU32,
    pub rollbacks: AtomicU32,
}

#[derive(Debug, Default)]
pub struct Faults {
    pub fail_begin: AtomicBool,
    pub fail_commit: AtomicBool,
    pub fail_rollback: AtomicBool,
    /// Number of upcoming commits that report a serialization conflict.
    pub conflicts_on_commit: AtomicU32,
}

fn injected(what: &str) -> StoreError {
    StoreError::Database(sqlx::Error::Protocol(format!("injected {what} failure")))
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
    pub counters: Arc<Counters>,
    pub faults: Arc<Faults>,
}

impl MemoryDatabase {
    pub fn with_state(state: MemoryState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            ..Self::default()
        }
    }

    /// Committed state, as seen from outside any transaction.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    counters: Arc<Counters>,
    faults: Arc<Faults>,
}

#[async_trait]
impl TransactionHandle for MemoryTx {
    async fn commit(self) -> Result<(), StoreError> {
        self.counters.commits.fetch_add(1, Ordering::SeqCst);

        if self.faults.fail_commit.load(Ordering::SeqCst) {
            return Err(injected("commit"));
        }
        if self
            .faults
            .conflicts_on_commit
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::SerializationConflict(
                "could not serialize access due to read/write dependencies among transactions"
                    .to_string(),
            ));
        }

        let MemoryTx {
            mut guard, staged, ..
        } = self;
        *guard = staged;

        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);

        if self.faults.fail_rollback.load(Ordering::SeqCst) {
            return Err(injected("rollback"));
        }

        Ok(())
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    type Tx = MemoryTx;

    async fn begin(&self, _isolation: IsolationLevel) -> Result<MemoryTx, StoreError> {
        self.counters.begins.fetch_add(1, Ordering::SeqCst);

        if self.faults.fail_begin.load(Ordering::SeqCst) {
            return Err(injected("begin"));
        }

        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();

        Ok(MemoryTx {
            guard,
            staged,
            counters: Arc::clone(&self.counters),
            faults: Arc::clone(&self.faults),
        })
    }
}

/// Implements every store trait against a [`MemoryTx`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub fail_ledger_insert: AtomicBool,
    pub fail_enrollment_insert: AtomicBool,
}

#[async_trait]
impl AccountStore<MemoryTx> for MemoryStore {
    async fn find_by_iban(&self, tx: &mut MemoryTx, iban: &str) -> Result<Account, StoreError> {
        tx.staged
            .accounts
            .iter()
            .find(|account| account.organization_iban == iban)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, tx: &mut MemoryTx, account: &Account) -> Result<(), StoreError> {
        let row = tx
            .staged
            .accounts
            .iter_mut()
            .find(|row| row.id == account.id)
            .ok_or(StoreError::NotFound)?;
        *row = account.clone();

        Ok(())
    }
}

#[async_trait]
impl LedgerStore<MemoryTx> for MemoryStore {
    async fn bulk_insert(
        &self,
        tx: &mut MemoryTx,
        transactions: &[NewTransaction],
    ) -> Result<Vec<Transaction>, StoreError> {
        if self.fail_ledger_insert.load(Ordering::SeqCst) {
            return Err(injected("ledger insert"));
        }

        let inserted: Vec<Transaction> = transactions
            .iter()
            .map(|new| Transaction {
                id: Uuid::new_v4(),
                bank_account_id: new.bank_account_id,
                counterparty_name: new.counterparty_name.clone(),
                counterparty_iban: new.counterparty_iban.clone(),
                counterparty_bic: new.counterparty_bic.clone(),
                amount_cents: new.amount_cents,
                amount_currency: new.amount_currency.clone(),
                description: new.description.clone(),
            })
            .collect();
        tx.staged.transactions.extend(inserted.iter().cloned());

        Ok(inserted)
    }
}

#[async_trait]
impl ClassStore<MemoryTx> for MemoryStore {
    async fn get_class_by_course_code(
        &self,
        tx: &mut MemoryTx,
        course_code: &str,
    ) -> Result<Class, StoreError> {
        let course = tx
            .staged
            .courses
            .iter()
            .find(|course| course.code == course_code)
            .cloned()
            .ok_or(StoreError::NotFound)?;

        let enrolled: BTreeSet<Uuid> = tx
            .staged
            .enrollments
            .iter()
            .filter(|enrollment| enrollment.course_id == course.id)
            .map(|enrollment| enrollment.student_id)
            .collect();
        let students = tx
            .staged
            .students
            .iter()
            .filter(|student| enrolled.contains(&student.id))
            .cloned()
            .collect();

        Ok(Class { course, students })
    }

    async fn get_students_by_email(
        &self,
        tx: &mut MemoryTx,
        emails: &[Email],
    ) -> Result<Vec<Student>, StoreError> {
        Ok(tx
            .staged
            .students
            .iter()
            .filter(|student| emails.contains(&student.email))
            .cloned()
            .collect())
    }

    async fn insert_enrollments(
        &self,
        tx: &mut MemoryTx,
        course_id: Uuid,
        student_ids: &[Uuid],
    ) -> Result<Vec<Enrollment>, StoreError> {
        if self.fail_enrollment_insert.load(Ordering::SeqCst) {
            return Err(injected("enrollment insert"));
        }

        let mut inserted = Vec::with_capacity(student_ids.len());
        for &student_id in student_ids {
            let duplicate = tx
                .staged
                .enrollments
                .iter()
                .any(|e| e.course_id == course_id && e.student_id == student_id);
            if duplicate {
                return Err(StoreError::UniqueViolation(format!(
                    "student {student_id} already enrolled in course {course_id}"
                )));
            }

            let enrollment = Enrollment {
                id: Uuid::new_v4(),
                course_id,
                student_id,
            };
            tx.staged.enrollments.push(enrollment.clone());
            inserted.push(enrollment);
        }

        Ok(inserted)
    }
}

pub const ACME_IBAN: &str = "FR10474608000002006107XXXXX";

pub fn acme_account(balance_cents: i64) -> Account {
    Account {
        id: Uuid::new_v4(),
        organization_name: "ACME Corp".to_string(),
        organization_iban: ACME_IBAN.to_string(),
        organization_bic: "OIVUSCLQXXX".to_string(),
        balance_cents,
    }
}

pub fn course(code: &str, capacity: u32) -> Course {
    Course {
        id: Uuid::new_v4(),
        code: code.to_string(),
        title: "Structure and Interpretation of Computer Programs".to_string(),
        capacity,
        description: String::new(),
    }
}

pub fn student(name: &str, email: &str) -> Student {
    Student {
        id: Uuid::new_v4(),
        name: name.to_string(),
        birthdate: NaiveDate::from_ymd_opt(1994, 3, 2).unwrap_or_default(),
        email: Email::new(email),
    }
}

pub fn enrollment(course: &Course, student: &Student) -> Enrollment {
    Enrollment {
        id: Uuid::new_v4(),
        course_id: course.id,
        student_id: student.id,
    }
}
