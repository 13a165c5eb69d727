/// Credential hashing and login.
use anyhow::{Result, anyhow};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rusqlite::Connection;
use serde::Serialize;

use crate::db;
use crate::error::{WorkflowError, WorkflowResult};
use crate::types::{EmployeeId, Role};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Identity of the caller, handed explicitly to every operation that needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub employee_id: EmployeeId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("hashing password: {e}"))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Checks the credentials and opens a session. Unknown email and wrong
/// password fail the same way.
pub fn login(email: &str, password: &str, conn: &Connection) -> WorkflowResult<Session> {
    let employee = db::query_employee_by_email(email, conn)?
        .filter(|e| verify_password(password, &e.password_hash))
        .ok_or_else(|| WorkflowError::validation(INVALID_CREDENTIALS))?;
    let employee_id = employee
        .id
        .ok_or_else(|| WorkflowError::Store(rusqlite::Error::QueryReturnedNoRows))?;
    tracing::info!(employee_id, role = %employee.role, "login succeeded");
    Ok(Session {
        employee_id,
        name: employee.name,
        email: employee.email,
        role: employee.role,
    })
}
