// src/models/student.rs

use serde::Serialize;

/// Display attributes attached to submission views, joined from the
/// 'students' profile row and the underlying user account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInfo {
    pub student_number: String,
    pub program: String,
    pub year_level: i64,
    pub full_name: String,
    pub email: String,
}
