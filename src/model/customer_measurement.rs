use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Customer measurement record. Garment fields are free-form strings the way
/// the tailors record them ("42", "gol"); the application never does
/// arithmetic on them. `deleted_at` set means the row is trashed.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Faizan",
        "code": "1122",
        "phone": "03123456789",
        "address": "123 Main Street",
        "kameezlength": "42",
        "teera": "24",
        "baazo": "19",
        "chest": "21",
        "neck": "15",
        "daman": "23",
        "kera": "gol",
        "shalwar": "42",
        "pancha": "12",
        "pocket": "2",
        "note": "Stitching",
        "created_by": 1,
        "updated_by": null,
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z",
        "deleted_at": null
    })
)]
pub struct CustomerMeasurement {
    pub id: u64,
    pub name: String,
    pub code: String,
    pub phone: String,
    pub address: Option<String>,
    pub kameezlength: Option<String>,
    pub teera: Option<String>,
    pub baazo: Option<String>,
    pub chest: Option<String>,
    pub neck: Option<String>,
    pub daman: Option<String>,
    pub kera: Option<String>,
    pub shalwar: Option<String>,
    pub pancha: Option<String>,
    pub pocket: Option<String>,
    pub note: Option<String>,
    pub created_by: Option<u64>,
    pub updated_by: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub deleted_at: Option<DateTime<Utc>>,
}
