use serde::Serialize;

/// Appointment lifecycle states. Stored as lowercase strings; the same
/// set is enforced by a CHECK constraint on the appointments table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pendente",
            AppointmentStatus::Confirmed => "Confirmado",
            AppointmentStatus::Completed => "Concluído",
            AppointmentStatus::Cancelled => "Cancelado",
        }
    }

    pub fn badge_class(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "badge badge-pending",
            AppointmentStatus::Confirmed => "badge badge-confirmed",
            AppointmentStatus::Completed => "badge badge-completed",
            AppointmentStatus::Cancelled => "badge badge-cancelled",
        }
    }

    /// No operation leaves completed or cancelled.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRow {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub is_admin: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub display_order: i64,
    pub created_at: String,
}

/// Product row joined with its category name for display.
#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub price: f64,
    pub image_url: String,
    pub is_featured: i64,
    pub created_at: String,
    pub updated_at: String,
    pub category_name: Option<String>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_small: f64,
    pub price_medium: f64,
    pub price_large: f64,
    pub duration_minutes: i64,
    pub icon: String,
    pub is_active: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppointmentRow {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub description: String,
    pub pet_name: String,
    pub pet_type: String,
    pub service_type: String,
    pub pet_size: Option<String>,
    pub notes: Option<String>,
    pub reference_images: Option<String>,
    pub estimated_price: Option<f64>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl AppointmentRow {
    /// Case-insensitive substring match over the contact snapshot and the
    /// request description. An empty term matches everything.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.full_name.to_lowercase().contains(&term)
            || self.email.to_lowercase().contains(&term)
            || self.phone.to_lowercase().contains(&term)
            || self.description.to_lowercase().contains(&term)
    }
}

/// In-memory filter used by the appointment list views: both the search
/// term and the status filter must hold.
pub fn filter_appointments(
    rows: &[AppointmentRow],
    term: &str,
    status: Option<AppointmentStatus>,
) -> Vec<AppointmentRow> {
    rows.iter()
        .filter(|row| status.map_or(true, |wanted| row.status == wanted.as_str()))
        .filter(|row| row.matches_search(term))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appointment(
        name: &str,
        email: &str,
        phone: &str,
        description: &str,
        status: &str,
    ) -> AppointmentRow {
        AppointmentRow {
            id: "a1".into(),
            user_id: "u1".into(),
            full_name: name.into(),
            email: email.into(),
            phone: phone.into(),
            appointment_date: "2026-08-10".into(),
            appointment_time: "14:00".into(),
            description: description.into(),
            pet_name: "Floquinho".into(),
            pet_type: "cachorro".into(),
            service_type: "Banho Simples".into(),
            pet_size: None,
            notes: None,
            reference_images: None,
            estimated_price: None,
            status: status.into(),
            created_at: "2026-08-01T10:00:00Z".into(),
            updated_at: "2026-08-01T10:00:00Z".into(),
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in AppointmentStatus::ALL {
            assert_eq!(AppointmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AppointmentStatus::parse("accepted"), None);
        assert_eq!(AppointmentStatus::parse(""), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!AppointmentStatus::Pending.is_terminal());
        assert!(!AppointmentStatus::Confirmed.is_terminal());
        assert!(AppointmentStatus::Completed.is_terminal());
        assert!(AppointmentStatus::Cancelled.is_terminal());
    }

    #[test]
    fn search_is_case_insensitive_over_all_fields() {
        let row = appointment(
            "Maria Souza",
            "maria@example.com",
            "11999999999",
            "Banho Simples para Floquinho (cachorro)",
            "pending",
        );
        assert!(row.matches_search("MARIA"));
        assert!(row.matches_search("Example.COM"));
        assert!(row.matches_search("99999"));
        assert!(row.matches_search("floquinho"));
        assert!(!row.matches_search("tosa"));
        assert!(row.matches_search(""));
        assert!(row.matches_search("   "));
    }

    #[test]
    fn filter_combines_search_and_status_with_and_semantics() {
        let rows = vec![
            appointment("Maria", "m@x.com", "11911111111", "Banho", "pending"),
            appointment("Joana", "j@x.com", "11922222222", "Tosa", "pending"),
            appointment("Maria", "m2@x.com", "11933333333", "Banho", "confirmed"),
        ];

        let hits = filter_appointments(&rows, "maria", Some(AppointmentStatus::Pending));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].email, "m@x.com");

        let all_marias = filter_appointments(&rows, "maria", None);
        assert_eq!(all_marias.len(), 2);

        let all_pending = filter_appointments(&rows, "", Some(AppointmentStatus::Pending));
        assert_eq!(all_pending.len(), 2);

        assert_eq!(filter_appointments(&rows, "", None).len(), 3);
    }
}
