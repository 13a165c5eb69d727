/// Employee database queries.
use rusqlite::{Connection, OptionalExtension, Row};

use crate::types::{Employee, EmployeeId};

pub fn create_employee(arg: Employee, conn: &Connection) -> rusqlite::Result<EmployeeId> {
    conn.execute(
        "INSERT INTO employees (name, email, password, role) VALUES (?1, ?2, ?3, ?4)",
        (&arg.name, &arg.email, &arg.password_hash, arg.role),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn query_employee_by_email(email: &str, conn: &Connection) -> rusqlite::Result<Option<Employee>> {
    conn.query_row(
        "SELECT employee_id, name, email, password, role FROM employees WHERE email = ?1",
        [email],
        employee_from_row,
    )
    .optional()
}

pub fn query_employee_by_id(
    id: EmployeeId,
    conn: &Connection,
) -> rusqlite::Result<Option<Employee>> {
    conn.query_row(
        "SELECT employee_id, name, email, password, role FROM employees WHERE employee_id = ?1",
        [id],
        employee_from_row,
    )
    .optional()
}

fn employee_from_row(row: &Row<'_>) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
    })
}
