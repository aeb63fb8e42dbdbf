use actix_session::Session;
use actix_web::{http::header, web, HttpResponse, Result};
use askama::Template;
use chrono::{DateTime, Local, NaiveDate};
use serde::Deserialize;

use crate::{
    auth::{current_user, new_id, CurrentUser},
    filters,
    models::{filter_appointments, AppointmentRow, AppointmentStatus, ServiceRow},
    state::AppState,
    templates::{render, Nav},
};

#[derive(Clone, Debug, Default)]
struct BookingView {
    full_name: String,
    email: String,
    phone: String,
    pet_name: String,
    pet_type: String,
    pet_size: String,
    service_type: String,
    appointment_date: String,
    appointment_time: String,
    notes: String,
}

impl BookingView {
    /// Empty form with the contact block re-seeded from the profile.
    fn seeded(user: &CurrentUser) -> Self {
        let profile = user.profile.as_ref();
        Self {
            full_name: profile
                .and_then(|p| p.full_name.clone())
                .unwrap_or_default(),
            email: user.user.email.clone(),
            phone: profile.and_then(|p| p.phone.clone()).unwrap_or_default(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug)]
struct ServiceOption {
    name: String,
    selected: bool,
}

#[derive(Template)]
#[template(path = "booking.html")]
struct BookingTemplate {
    nav: Nav,
    form: BookingView,
    services: Vec<ServiceOption>,
    errors: Vec<String>,
    success: bool,
    today: String,
}

#[derive(Template)]
#[template(path = "login_required.html")]
struct LoginRequiredTemplate {
    nav: Nav,
    message: String,
    next: String,
}

#[derive(Clone, Debug)]
struct AppointmentView {
    appointment_date: String,
    appointment_time: String,
    pet_name: String,
    pet_type: String,
    pet_size: String,
    has_pet_size: bool,
    service_type: String,
    notes: String,
    has_notes: bool,
    reference_images: Vec<String>,
    status_label: &'static str,
    status_class: &'static str,
    created_at: String,
}

#[derive(Clone, Debug, Default)]
struct StatusCounts {
    total: usize,
    pending: usize,
    confirmed: usize,
    completed: usize,
    cancelled: usize,
}

#[derive(Template)]
#[template(path = "my_appointments.html")]
struct MyAppointmentsTemplate {
    nav: Nav,
    appointments: Vec<AppointmentView>,
    counts: StatusCounts,
    filter: String,
}

#[derive(Deserialize)]
struct BookingForm {
    full_name: String,
    email: String,
    phone: String,
    pet_name: String,
    pet_type: String,
    pet_size: Option<String>,
    service_type: String,
    appointment_date: String,
    appointment_time: String,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct StatusQuery {
    status: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/agendamento")
            .route(web::get().to(show_booking))
            .route(web::post().to(create_booking)),
    )
    .service(web::resource("/meus-agendamentos").route(web::get().to(my_appointments)));
}

async fn show_booking(state: web::Data<AppState>, session: Session) -> Result<HttpResponse> {
    let Some(user) = current_user(&session, &state.db).await else {
        return Ok(render(LoginRequiredTemplate {
            nav: Nav::anonymous(),
            message: "Você precisa estar autenticado para agendar um serviço".to_string(),
            next: "/agendamento".to_string(),
        }));
    };

    Ok(render(BookingTemplate {
        nav: Nav::for_user(Some(&user)),
        form: BookingView::seeded(&user),
        services: service_options(&state, "").await,
        errors: Vec::new(),
        success: false,
        today: today_string(),
    }))
}

async fn create_booking(
    state: web::Data<AppState>,
    session: Session,
    form: web::Form<BookingForm>,
) -> Result<HttpResponse> {
    let Some(user) = current_user(&session, &state.db).await else {
        return Ok(HttpResponse::SeeOther()
            .append_header((header::LOCATION, "/entrar?next=/agendamento"))
            .finish());
    };

    let form = form.into_inner();
    let mut errors = Vec::new();
    if form.full_name.trim().is_empty() {
        errors.push("Nome completo é obrigatório.".to_string());
    }
    if form.email.trim().is_empty() {
        errors.push("E-mail é obrigatório.".to_string());
    }
    if form.phone.trim().is_empty() {
        errors.push("Telefone é obrigatório.".to_string());
    }
    if form.pet_name.trim().is_empty() {
        errors.push("Nome do pet é obrigatório.".to_string());
    }
    if form.pet_type.trim().is_empty() {
        errors.push("Selecione o tipo de animal.".to_string());
    }
    if form.service_type.trim().is_empty() {
        errors.push("Selecione um serviço.".to_string());
    }
    if form.appointment_time.trim().is_empty() {
        errors.push("Escolha um horário.".to_string());
    }
    match NaiveDate::parse_from_str(form.appointment_date.trim(), "%Y-%m-%d") {
        Ok(date) if date < Local::now().date_naive() => {
            errors.push("A data deve ser a partir de hoje.".to_string());
        }
        Ok(_) => {}
        Err(_) => errors.push("Escolha uma data válida.".to_string()),
    }

    if !errors.is_empty() {
        let echo = BookingView {
            full_name: form.full_name,
            email: form.email,
            phone: form.phone,
            pet_name: form.pet_name,
            pet_type: form.pet_type,
            pet_size: form.pet_size.unwrap_or_default(),
            service_type: form.service_type.clone(),
            appointment_date: form.appointment_date,
            appointment_time: form.appointment_time,
            notes: form.notes.unwrap_or_default(),
        };
        return Ok(render(BookingTemplate {
            nav: Nav::for_user(Some(&user)),
            services: service_options(&state, &form.service_type).await,
            form: echo,
            errors,
            success: false,
            today: today_string(),
        }));
    }

    let description = format!(
        "{} para {} ({})",
        form.service_type.trim(),
        form.pet_name.trim(),
        form.pet_type.trim()
    );
    let pet_size = form
        .pet_size
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let notes = form
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let now = chrono::Utc::now().to_rfc3339();

    // Status is forced to pending here; nothing the client submits can
    // override it.
    let insert = sqlx::query(
        r#"INSERT INTO appointments
           (id, user_id, full_name, email, phone, appointment_date, appointment_time,
            description, pet_name, pet_type, service_type, pet_size, notes, status,
            created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(&user.user.id)
    .bind(form.full_name.trim())
    .bind(form.email.trim())
    .bind(form.phone.trim())
    .bind(form.appointment_date.trim())
    .bind(form.appointment_time.trim())
    .bind(&description)
    .bind(form.pet_name.trim())
    .bind(form.pet_type.trim())
    .bind(form.service_type.trim())
    .bind(pet_size)
    .bind(notes)
    .bind(AppointmentStatus::Pending.as_str())
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await;

    if let Err(err) = insert {
        log::error!("Failed to create appointment: {err}");
        return Ok(render(BookingTemplate {
            nav: Nav::for_user(Some(&user)),
            services: service_options(&state, &form.service_type).await,
            form: BookingView::seeded(&user),
            errors: vec![format!("Erro ao criar agendamento: {err}")],
            success: false,
            today: today_string(),
        }));
    }

    Ok(render(BookingTemplate {
        nav: Nav::for_user(Some(&user)),
        services: service_options(&state, "").await,
        form: BookingView::seeded(&user),
        errors: Vec::new(),
        success: true,
        today: today_string(),
    }))
}

async fn my_appointments(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<StatusQuery>,
) -> Result<HttpResponse> {
    let Some(user) = current_user(&session, &state.db).await else {
        return Ok(render(LoginRequiredTemplate {
            nav: Nav::anonymous(),
            message: "Você precisa estar autenticado para ver seus agendamentos".to_string(),
            next: "/meus-agendamentos".to_string(),
        }));
    };

    let rows = sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT id, user_id, full_name, email, phone, appointment_date, appointment_time,
                  description, pet_name, pet_type, service_type, pet_size, notes,
                  reference_images, estimated_price, status, created_at, updated_at
           FROM appointments
           WHERE user_id = ?
           ORDER BY appointment_date DESC, appointment_time DESC"#,
    )
    .bind(&user.user.id)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    let counts = StatusCounts {
        total: rows.len(),
        pending: count_status(&rows, AppointmentStatus::Pending),
        confirmed: count_status(&rows, AppointmentStatus::Confirmed),
        completed: count_status(&rows, AppointmentStatus::Completed),
        cancelled: count_status(&rows, AppointmentStatus::Cancelled),
    };

    let filter = query.status.clone().unwrap_or_default();
    let status = AppointmentStatus::parse(&filter);
    let appointments = filter_appointments(&rows, "", status)
        .into_iter()
        .map(to_view)
        .collect();

    Ok(render(MyAppointmentsTemplate {
        nav: Nav::for_user(Some(&user)),
        appointments,
        counts,
        filter,
    }))
}

async fn service_options(state: &web::Data<AppState>, selected: &str) -> Vec<ServiceOption> {
    let rows = sqlx::query_as::<_, ServiceRow>(
        r#"SELECT id, name, description, price_small, price_medium, price_large,
                  duration_minutes, icon, is_active, created_at, updated_at
           FROM services
           WHERE is_active = 1
           ORDER BY name"#,
    )
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    rows.into_iter()
        .map(|row| ServiceOption {
            selected: row.name == selected,
            name: row.name,
        })
        .collect()
}

fn count_status(rows: &[AppointmentRow], status: AppointmentStatus) -> usize {
    rows.iter()
        .filter(|row| row.status == status.as_str())
        .count()
}

fn today_string() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

fn format_created_at(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn to_view(row: AppointmentRow) -> AppointmentView {
    let status = AppointmentStatus::parse(&row.status).unwrap_or(AppointmentStatus::Pending);
    let pet_size = row.pet_size.unwrap_or_default();
    let notes = row.notes.unwrap_or_default();
    let reference_images = row
        .reference_images
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect();

    AppointmentView {
        appointment_date: row.appointment_date,
        appointment_time: row.appointment_time,
        pet_name: row.pet_name,
        pet_type: row.pet_type,
        has_pet_size: !pet_size.trim().is_empty(),
        pet_size,
        service_type: row.service_type,
        has_notes: !notes.trim().is_empty(),
        notes,
        reference_images,
        status_label: status.label(),
        status_class: status.badge_class(),
        created_at: format_created_at(&row.created_at),
    }
}
