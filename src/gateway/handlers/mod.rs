pub mod admin;
pub mod health;
pub mod layout;
pub mod session;

pub use self::health::health;

use axum::http::StatusCode;

/// `GET /404_narnia`
pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}
