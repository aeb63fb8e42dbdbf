use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{http::header, web, HttpResponse, Result};
use askama::Template;
use chrono::{Datelike, Local};
use futures_util::StreamExt as _;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::{current_user, new_id, CurrentUser},
    calendar::{self, DayLoad},
    db::fetch_appointment,
    filters,
    models::{
        filter_appointments, AppointmentRow, AppointmentStatus, CategoryRow, ProductRow,
        ServiceRow,
    },
    state::AppState,
    storage::{self, PORTFOLIO_BUCKET},
    templates::{render, Nav},
    workflow::{self, AdminAction},
};

const ICON_OPTIONS: [&str; 6] = ["heart", "bath", "scissors", "stethoscope", "sparkles", "dog"];

#[derive(Clone, Debug)]
struct StatCard {
    label: &'static str,
    value: String,
}

#[derive(Clone, Debug)]
struct AppointmentView {
    id: String,
    full_name: String,
    appointment_date: String,
    appointment_time: String,
    description: String,
    status_label: &'static str,
    status_class: &'static str,
}

#[derive(Clone, Debug)]
struct StatusOption {
    value: &'static str,
    label: &'static str,
    selected: bool,
}

#[derive(Clone, Debug)]
struct ActionView {
    value: &'static str,
    label: &'static str,
    css: &'static str,
}

#[derive(Clone, Debug)]
struct AppointmentDetailView {
    id: String,
    full_name: String,
    email: String,
    phone: String,
    appointment_date: String,
    appointment_time: String,
    description: String,
    pet_name: String,
    pet_type: String,
    pet_size: String,
    service_type: String,
    notes: String,
    has_notes: bool,
    reference_images: Vec<String>,
    reference_images_raw: String,
    estimated_price: String,
    status_label: &'static str,
    status_class: &'static str,
    actions: Vec<ActionView>,
    updated_at: String,
}

#[derive(Clone, Debug)]
struct CalendarCell {
    blank: bool,
    day: u32,
    date: String,
    count: i64,
    css: &'static str,
    selected: bool,
}

#[derive(Clone, Debug)]
struct DayAppointment {
    appointment_time: String,
    full_name: String,
    description: String,
    status_label: &'static str,
    status_class: &'static str,
}

#[derive(Clone, Debug)]
struct ServiceAdminView {
    id: String,
    name: String,
    description: String,
    price_small: f64,
    price_medium: f64,
    price_large: f64,
    duration_minutes: i64,
    is_active: bool,
}

#[derive(Clone, Debug, Default)]
struct ServiceFormView {
    id: String,
    name: String,
    description: String,
    price_small: String,
    price_medium: String,
    price_large: String,
    duration_minutes: String,
    icon: String,
    is_active: bool,
}

#[derive(Clone, Debug)]
struct IconOption {
    value: &'static str,
    selected: bool,
}

#[derive(Clone, Debug)]
struct ProductAdminView {
    id: String,
    title: String,
    description: String,
    category_name: String,
    price: f64,
    image_url: String,
    is_featured: bool,
}

#[derive(Clone, Debug, Default)]
struct ProductFormView {
    id: String,
    title: String,
    description: String,
    category_id: String,
    price: String,
    image_url: String,
    is_featured: bool,
}

#[derive(Clone, Debug)]
struct CategoryOption {
    id: String,
    name: String,
    selected: bool,
}

#[derive(Template)]
#[template(path = "access_denied.html")]
struct AccessDeniedTemplate {
    nav: Nav,
}

#[derive(Template)]
#[template(path = "admin_dashboard.html")]
struct AdminDashboardTemplate {
    nav: Nav,
    tab: &'static str,
    admin_name: String,
    stats: Vec<StatCard>,
    has_error: bool,
}

#[derive(Template)]
#[template(path = "admin_calendar.html")]
struct AdminCalendarTemplate {
    nav: Nav,
    tab: &'static str,
    month_label: String,
    year: i32,
    month: u32,
    prev_year: i32,
    prev_month: u32,
    next_year: i32,
    next_month: u32,
    day_names: [&'static str; 7],
    cells: Vec<CalendarCell>,
    has_selection: bool,
    selected_date: String,
    day_appointments: Vec<DayAppointment>,
}

#[derive(Template)]
#[template(path = "admin_appointments.html")]
struct AdminAppointmentsTemplate {
    nav: Nav,
    tab: &'static str,
    appointments: Vec<AppointmentView>,
    q: String,
    statuses: Vec<StatusOption>,
}

#[derive(Template)]
#[template(path = "admin_appointment_detail.html")]
struct AdminAppointmentDetailTemplate {
    nav: Nav,
    tab: &'static str,
    appointment: AppointmentDetailView,
    errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "admin_services.html")]
struct AdminServicesTemplate {
    nav: Nav,
    tab: &'static str,
    services: Vec<ServiceAdminView>,
    form: ServiceFormView,
    icons: Vec<IconOption>,
    editing: bool,
    errors: Vec<String>,
    success: String,
    has_success: bool,
}

#[derive(Template)]
#[template(path = "admin_portfolio.html")]
struct AdminPortfolioTemplate {
    nav: Nav,
    tab: &'static str,
    products: Vec<ProductAdminView>,
    categories: Vec<CategoryOption>,
    form: ProductFormView,
    editing: bool,
    errors: Vec<String>,
    success: String,
    has_success: bool,
}

#[derive(Deserialize)]
struct ListQuery {
    q: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct CalendarQuery {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<String>,
}

#[derive(Deserialize)]
struct EditQuery {
    edit: Option<String>,
}

#[derive(Deserialize)]
struct TransitionForm {
    action: String,
}

#[derive(Deserialize)]
struct AppointmentEditForm {
    pet_size: Option<String>,
    reference_images: Option<String>,
    estimated_price: Option<String>,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct ServiceForm {
    name: String,
    description: Option<String>,
    price_small: Option<String>,
    price_medium: Option<String>,
    price_large: Option<String>,
    duration_minutes: Option<String>,
    icon: Option<String>,
    is_active: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/painel-admin")
            .service(web::resource("").route(web::get().to(dashboard)))
            .service(web::resource("/calendario").route(web::get().to(calendar_view)))
            .service(web::resource("/agendamentos").route(web::get().to(list_appointments)))
            .service(
                web::resource("/agendamentos/{id}")
                    .route(web::get().to(appointment_detail))
                    .route(web::post().to(update_appointment)),
            )
            .service(
                web::resource("/agendamentos/{id}/status").route(web::post().to(transition)),
            )
            .service(
                web::resource("/agendamentos/{id}/excluir")
                    .route(web::post().to(delete_appointment)),
            )
            .service(
                web::resource("/servicos")
                    .route(web::get().to(list_services))
                    .route(web::post().to(create_service)),
            )
            .service(web::resource("/servicos/{id}").route(web::post().to(update_service)))
            .service(
                web::resource("/servicos/{id}/excluir").route(web::post().to(delete_service)),
            )
            .service(
                web::resource("/portfolio")
                    .route(web::get().to(list_portfolio))
                    .route(web::post().to(create_product)),
            )
            .service(web::resource("/portfolio/{id}").route(web::post().to(update_product)))
            .service(
                web::resource("/portfolio/{id}/excluir").route(web::post().to(delete_product)),
            )
            .service(
                web::resource("/portfolio/{id}/destaque")
                    .route(web::post().to(toggle_featured)),
            ),
    );
}

/// Admin access is decided by the profile flag; everyone else gets the
/// static access-denied page instead of a redirect.
async fn admin_gate(
    session: &Session,
    state: &web::Data<AppState>,
) -> std::result::Result<CurrentUser, HttpResponse> {
    let user = current_user(session, &state.db).await;
    match user {
        Some(user) if user.is_admin() => Ok(user),
        other => Err(render(AccessDeniedTemplate {
            nav: Nav::for_user(other.as_ref()),
        })),
    }
}

async fn dashboard(state: web::Data<AppState>, session: Session) -> Result<HttpResponse> {
    let user = match admin_gate(&session, &state).await {
        Ok(user) => user,
        Err(denied) => return Ok(denied),
    };

    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();

    // The six dashboard queries run concurrently; any failure collapses
    // into a single generic error.
    let loaded = tokio::try_join!(
        count_query(&state.db, "SELECT COUNT(*) FROM appointments"),
        count_with(
            &state.db,
            "SELECT COUNT(*) FROM appointments WHERE appointment_date = ?",
            &today,
        ),
        count_with(
            &state.db,
            "SELECT COUNT(*) FROM appointments WHERE status = ?",
            AppointmentStatus::Pending.as_str(),
        ),
        count_with(
            &state.db,
            "SELECT COUNT(*) FROM appointments WHERE status = ?",
            AppointmentStatus::Confirmed.as_str(),
        ),
        count_with(
            &state.db,
            "SELECT COUNT(*) FROM appointments WHERE status = ?",
            AppointmentStatus::Completed.as_str(),
        ),
        revenue_sum(&state.db),
    );

    let (stats, has_error) = match loaded {
        Ok((total, today, pending, confirmed, completed, revenue)) => (
            vec![
                StatCard {
                    label: "Total de Agendamentos",
                    value: total.to_string(),
                },
                StatCard {
                    label: "Agendamentos Hoje",
                    value: today.to_string(),
                },
                StatCard {
                    label: "Pendentes",
                    value: pending.to_string(),
                },
                StatCard {
                    label: "Confirmados",
                    value: confirmed.to_string(),
                },
                StatCard {
                    label: "Concluídos",
                    value: completed.to_string(),
                },
                StatCard {
                    label: "Valor Total",
                    value: format!("R$ {}", filters::brl(&revenue).unwrap_or_default()),
                },
            ],
            false,
        ),
        Err(err) => {
            log::error!("Failed to load dashboard stats: {err}");
            (Vec::new(), true)
        }
    };

    Ok(render(AdminDashboardTemplate {
        nav: Nav::for_user(Some(&user)),
        tab: "dashboard",
        admin_name: user.display_name(),
        stats,
        has_error,
    }))
}

async fn calendar_view(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<CalendarQuery>,
) -> Result<HttpResponse> {
    let user = match admin_gate(&session, &state).await {
        Ok(user) => user,
        Err(denied) => return Ok(denied),
    };

    let now = Local::now().date_naive();
    let mut year = query.year.unwrap_or_else(|| now.year());
    let mut month = query.month.unwrap_or_else(|| now.month());
    let (first, last) = match calendar::month_bounds(year, month) {
        Some(bounds) => bounds,
        None => {
            year = now.year();
            month = now.month();
            calendar::month_bounds(year, month).unwrap_or((now, now))
        }
    };
    let date_rows = sqlx::query_as::<_, (String,)>(
        "SELECT appointment_date FROM appointments WHERE appointment_date >= ? AND appointment_date <= ?",
    )
    .bind(first.format("%Y-%m-%d").to_string())
    .bind(last.format("%Y-%m-%d").to_string())
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    let mut counts: HashMap<String, i64> = HashMap::new();
    for (date,) in date_rows {
        *counts.entry(date).or_insert(0) += 1;
    }

    let selected_day = query
        .day
        .clone()
        .filter(|value| !value.trim().is_empty());

    let cells = calendar::month_grid(year, month)
        .into_iter()
        .map(|cell| match cell {
            None => CalendarCell {
                blank: true,
                day: 0,
                date: String::new(),
                count: 0,
                css: "",
                selected: false,
            },
            Some(day) => {
                let date = calendar::format_day(year, month, day);
                let count = counts.get(&date).copied().unwrap_or(0);
                CalendarCell {
                    blank: false,
                    day,
                    count,
                    css: DayLoad::for_count(count).cell_class(),
                    selected: selected_day.as_deref() == Some(date.as_str()),
                    date,
                }
            }
        })
        .collect();

    let day_appointments = match selected_day.as_deref() {
        Some(date) => sqlx::query_as::<_, AppointmentRow>(
            r#"SELECT id, user_id, full_name, email, phone, appointment_date, appointment_time,
                      description, pet_name, pet_type, service_type, pet_size, notes,
                      reference_images, estimated_price, status, created_at, updated_at
               FROM appointments
               WHERE appointment_date = ?
               ORDER BY appointment_time"#,
        )
        .bind(date)
        .fetch_all(&state.db)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|row| {
            let status =
                AppointmentStatus::parse(&row.status).unwrap_or(AppointmentStatus::Pending);
            DayAppointment {
                appointment_time: row.appointment_time,
                full_name: row.full_name,
                description: row.description,
                status_label: status.label(),
                status_class: status.badge_class(),
            }
        })
        .collect(),
        None => Vec::new(),
    };

    let (prev_year, prev_month) = calendar::prev_month(year, month);
    let (next_year, next_month) = calendar::next_month(year, month);

    Ok(render(AdminCalendarTemplate {
        nav: Nav::for_user(Some(&user)),
        tab: "calendario",
        month_label: format!("{} {year}", calendar::MONTH_NAMES[(month - 1) as usize]),
        year,
        month,
        prev_year,
        prev_month,
        next_year,
        next_month,
        day_names: calendar::DAY_NAMES,
        cells,
        has_selection: selected_day.is_some(),
        selected_date: selected_day.unwrap_or_default(),
        day_appointments,
    }))
}

async fn list_appointments(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    let user = match admin_gate(&session, &state).await {
        Ok(user) => user,
        Err(denied) => return Ok(denied),
    };

    let rows = fetch_all_appointments(&state.db).await;

    let q = query.q.clone().unwrap_or_default();
    let status_filter = query.status.clone().unwrap_or_default();
    let status = AppointmentStatus::parse(&status_filter);

    let appointments = filter_appointments(&rows, &q, status)
        .into_iter()
        .map(to_list_view)
        .collect();

    let statuses = AppointmentStatus::ALL
        .into_iter()
        .map(|s| StatusOption {
            value: s.as_str(),
            label: s.label(),
            selected: status == Some(s),
        })
        .collect();

    Ok(render(AdminAppointmentsTemplate {
        nav: Nav::for_user(Some(&user)),
        tab: "agendamentos",
        appointments,
        q,
        statuses,
    }))
}

async fn appointment_detail(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user = match admin_gate(&session, &state).await {
        Ok(user) => user,
        Err(denied) => return Ok(denied),
    };

    detail_page(&state, &user, &path.into_inner(), Vec::new()).await
}

async fn detail_page(
    state: &web::Data<AppState>,
    user: &CurrentUser,
    appointment_id: &str,
    errors: Vec<String>,
) -> Result<HttpResponse> {
    let Some(row) = fetch_appointment(&state.db, appointment_id).await else {
        return Ok(HttpResponse::NotFound().body("Agendamento não encontrado"));
    };

    Ok(render(AdminAppointmentDetailTemplate {
        nav: Nav::for_user(Some(user)),
        tab: "agendamentos",
        appointment: to_detail_view(row),
        errors,
    }))
}

async fn transition(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    form: web::Form<TransitionForm>,
) -> Result<HttpResponse> {
    let user = match admin_gate(&session, &state).await {
        Ok(user) => user,
        Err(denied) => return Ok(denied),
    };

    let appointment_id = path.into_inner();
    let Some(action) = AdminAction::parse(&form.action) else {
        return Ok(HttpResponse::BadRequest().body("Ação inválida"));
    };

    let Some(row) = fetch_appointment(&state.db, &appointment_id).await else {
        return Ok(HttpResponse::NotFound().body("Agendamento não encontrado"));
    };
    let Some(current) = AppointmentStatus::parse(&row.status) else {
        return Ok(HttpResponse::BadRequest().body("Status atual inválido"));
    };

    let target = action.target();
    if !workflow::can_transition(current, target, user.is_admin()) {
        return Ok(HttpResponse::BadRequest().body("Transição de status inválida"));
    }

    sqlx::query("UPDATE appointments SET status = ?, updated_at = ? WHERE id = ?")
        .bind(target.as_str())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&appointment_id)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    // Redirect so the view reloads what the database accepted.
    Ok(HttpResponse::SeeOther()
        .append_header((
            header::LOCATION,
            format!("/painel-admin/agendamentos/{appointment_id}"),
        ))
        .finish())
}

async fn update_appointment(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    form: web::Form<AppointmentEditForm>,
) -> Result<HttpResponse> {
    let user = match admin_gate(&session, &state).await {
        Ok(user) => user,
        Err(denied) => return Ok(denied),
    };

    let appointment_id = path.into_inner();
    let form = form.into_inner();

    let estimated_price = match form.estimated_price.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.replace(',', ".").parse::<f64>() {
            Ok(value) if value >= 0.0 => Some(value),
            _ => {
                return detail_page(
                    &state,
                    &user,
                    &appointment_id,
                    vec!["Valor estimado inválido.".to_string()],
                )
                .await;
            }
        },
    };

    let pet_size = form
        .pet_size
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let reference_images = form
        .reference_images
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let notes = form
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    sqlx::query(
        r#"UPDATE appointments
           SET pet_size = ?, reference_images = ?, estimated_price = ?, notes = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(pet_size)
    .bind(reference_images)
    .bind(estimated_price)
    .bind(notes)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&appointment_id)
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::SeeOther()
        .append_header((
            header::LOCATION,
            format!("/painel-admin/agendamentos/{appointment_id}"),
        ))
        .finish())
}

async fn delete_appointment(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(denied) = admin_gate(&session, &state).await {
        return Ok(denied);
    }

    let appointment_id = path.into_inner();
    sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(&appointment_id)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/painel-admin/agendamentos"))
        .finish())
}

async fn list_services(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<EditQuery>,
) -> Result<HttpResponse> {
    let user = match admin_gate(&session, &state).await {
        Ok(user) => user,
        Err(denied) => return Ok(denied),
    };

    let form = match query.edit.as_deref() {
        Some(id) => fetch_service_form(&state.db, id).await.unwrap_or_default(),
        None => ServiceFormView {
            duration_minutes: "60".to_string(),
            icon: "heart".to_string(),
            is_active: true,
            ..ServiceFormView::default()
        },
    };
    let editing = !form.id.is_empty();

    services_page(&state, &user, form, editing, Vec::new(), String::new()).await
}

async fn services_page(
    state: &web::Data<AppState>,
    user: &CurrentUser,
    form: ServiceFormView,
    editing: bool,
    errors: Vec<String>,
    success: String,
) -> Result<HttpResponse> {
    let rows = sqlx::query_as::<_, ServiceRow>(
        r#"SELECT id, name, description, price_small, price_medium, price_large,
                  duration_minutes, icon, is_active, created_at, updated_at
           FROM services
           ORDER BY name"#,
    )
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    let services = rows
        .into_iter()
        .map(|row| ServiceAdminView {
            id: row.id,
            name: row.name,
            description: row.description.unwrap_or_default(),
            price_small: row.price_small,
            price_medium: row.price_medium,
            price_large: row.price_large,
            duration_minutes: row.duration_minutes,
            is_active: row.is_active == 1,
        })
        .collect();

    let icons = ICON_OPTIONS
        .into_iter()
        .map(|value| IconOption {
            value,
            selected: form.icon == value,
        })
        .collect();

    Ok(render(AdminServicesTemplate {
        nav: Nav::for_user(Some(user)),
        tab: "servicos",
        services,
        form,
        icons,
        editing,
        errors,
        has_success: !success.is_empty(),
        success,
    }))
}

async fn create_service(
    state: web::Data<AppState>,
    session: Session,
    form: web::Form<ServiceForm>,
) -> Result<HttpResponse> {
    let user = match admin_gate(&session, &state).await {
        Ok(user) => user,
        Err(denied) => return Ok(denied),
    };

    let form = form.into_inner();
    if form.name.trim().is_empty() {
        let echo = service_form_echo(&form, "");
        return services_page(
            &state,
            &user,
            echo,
            false,
            vec!["Nome do serviço é obrigatório.".to_string()],
            String::new(),
        )
        .await;
    }

    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"INSERT INTO services
           (id, name, description, price_small, price_medium, price_large,
            duration_minutes, icon, is_active, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(form.name.trim())
    .bind(optional_text(form.description.as_deref()))
    .bind(parse_price(form.price_small.as_deref()))
    .bind(parse_price(form.price_medium.as_deref()))
    .bind(parse_price(form.price_large.as_deref()))
    .bind(parse_duration(form.duration_minutes.as_deref()))
    .bind(icon_or_default(form.icon.as_deref()))
    .bind(1)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await;

    if let Err(err) = result {
        log::error!("Failed to create service: {err}");
        let echo = service_form_echo(&form, "");
        return services_page(
            &state,
            &user,
            echo,
            false,
            vec!["Erro ao salvar serviço.".to_string()],
            String::new(),
        )
        .await;
    }

    services_page(
        &state,
        &user,
        blank_service_form(),
        false,
        Vec::new(),
        "Serviço criado com sucesso.".to_string(),
    )
    .await
}

async fn update_service(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    form: web::Form<ServiceForm>,
) -> Result<HttpResponse> {
    let user = match admin_gate(&session, &state).await {
        Ok(user) => user,
        Err(denied) => return Ok(denied),
    };

    let service_id = path.into_inner();
    let form = form.into_inner();
    if form.name.trim().is_empty() {
        let echo = service_form_echo(&form, &service_id);
        return services_page(
            &state,
            &user,
            echo,
            true,
            vec!["Nome do serviço é obrigatório.".to_string()],
            String::new(),
        )
        .await;
    }

    let result = sqlx::query(
        r#"UPDATE services
           SET name = ?, description = ?, price_small = ?, price_medium = ?, price_large = ?,
               duration_minutes = ?, icon = ?, is_active = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(form.name.trim())
    .bind(optional_text(form.description.as_deref()))
    .bind(parse_price(form.price_small.as_deref()))
    .bind(parse_price(form.price_medium.as_deref()))
    .bind(parse_price(form.price_large.as_deref()))
    .bind(parse_duration(form.duration_minutes.as_deref()))
    .bind(icon_or_default(form.icon.as_deref()))
    .bind(if checkbox(form.is_active.as_deref()) { 1 } else { 0 })
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&service_id)
    .execute(&state.db)
    .await;

    if let Err(err) = result {
        log::error!("Failed to update service {service_id}: {err}");
        let echo = service_form_echo(&form, &service_id);
        return services_page(
            &state,
            &user,
            echo,
            true,
            vec!["Erro ao salvar serviço.".to_string()],
            String::new(),
        )
        .await;
    }

    services_page(
        &state,
        &user,
        blank_service_form(),
        false,
        Vec::new(),
        "Serviço atualizado com sucesso.".to_string(),
    )
    .await
}

async fn delete_service(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(denied) = admin_gate(&session, &state).await {
        return Ok(denied);
    }

    sqlx::query("DELETE FROM services WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/painel-admin/servicos"))
        .finish())
}

async fn list_portfolio(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<EditQuery>,
) -> Result<HttpResponse> {
    let user = match admin_gate(&session, &state).await {
        Ok(user) => user,
        Err(denied) => return Ok(denied),
    };

    let form = match query.edit.as_deref() {
        Some(id) => fetch_product_form(&state.db, id).await.unwrap_or_default(),
        None => ProductFormView::default(),
    };
    let editing = !form.id.is_empty();

    portfolio_page(&state, &user, form, editing, Vec::new(), String::new()).await
}

async fn portfolio_page(
    state: &web::Data<AppState>,
    user: &CurrentUser,
    form: ProductFormView,
    editing: bool,
    errors: Vec<String>,
    success: String,
) -> Result<HttpResponse> {
    let rows = sqlx::query_as::<_, ProductRow>(
        r#"SELECT p.id, p.title, p.description, p.category_id, p.price, p.image_url,
                  p.is_featured, p.created_at, p.updated_at, c.name AS category_name
           FROM products p
           LEFT JOIN categories c ON p.category_id = c.id
           ORDER BY p.created_at DESC"#,
    )
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    let products = rows
        .into_iter()
        .map(|row| ProductAdminView {
            id: row.id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            category_name: row
                .category_name
                .unwrap_or_else(|| "Sem categoria".to_string()),
            price: row.price,
            image_url: row.image_url,
            is_featured: row.is_featured == 1,
        })
        .collect();

    let category_rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, slug, description, display_order, created_at FROM categories ORDER BY display_order",
    )
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    let categories = category_rows
        .into_iter()
        .map(|row| CategoryOption {
            selected: form.category_id == row.id,
            id: row.id,
            name: row.name,
        })
        .collect();

    Ok(render(AdminPortfolioTemplate {
        nav: Nav::for_user(Some(user)),
        tab: "portfolio",
        products,
        categories,
        form,
        editing,
        errors,
        has_success: !success.is_empty(),
        success,
    }))
}

async fn create_product(
    state: web::Data<AppState>,
    session: Session,
    payload: Multipart,
) -> Result<HttpResponse> {
    let user = match admin_gate(&session, &state).await {
        Ok(user) => user,
        Err(denied) => return Ok(denied),
    };

    let data = read_product_form(payload).await?;
    let mut errors = validate_product(&data);
    if data.image.is_none() && !data.image_oversize {
        errors.push("Selecione uma imagem.".to_string());
    }

    if !errors.is_empty() {
        return portfolio_page(&state, &user, data.echo(""), false, errors, String::new()).await;
    }

    let Some((file_name, bytes)) = data.image.as_ref() else {
        return portfolio_page(
            &state,
            &user,
            data.echo(""),
            false,
            vec!["Selecione uma imagem.".to_string()],
            String::new(),
        )
        .await;
    };
    let image_url = match state.uploads.save_image(PORTFOLIO_BUCKET, file_name, bytes) {
        Ok(url) => url,
        Err(err) => {
            log::error!("Image upload failed: {err}");
            return portfolio_page(
                &state,
                &user,
                data.echo(""),
                false,
                vec![err.user_message().to_string()],
                String::new(),
            )
            .await;
        }
    };

    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"INSERT INTO products
           (id, title, description, category_id, price, image_url, is_featured, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(data.title.trim())
    .bind(optional_text(Some(&data.description)))
    .bind(optional_text(Some(&data.category_id)))
    .bind(data.parsed_price().unwrap_or(0.0))
    .bind(&image_url)
    .bind(if data.is_featured { 1 } else { 0 })
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await;

    if let Err(err) = result {
        log::error!("Failed to create product: {err}");
        return portfolio_page(
            &state,
            &user,
            data.echo(""),
            false,
            vec!["Erro ao salvar produto.".to_string()],
            String::new(),
        )
        .await;
    }

    portfolio_page(
        &state,
        &user,
        ProductFormView::default(),
        false,
        Vec::new(),
        "Produto adicionado com sucesso!".to_string(),
    )
    .await
}

async fn update_product(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let user = match admin_gate(&session, &state).await {
        Ok(user) => user,
        Err(denied) => return Ok(denied),
    };

    let product_id = path.into_inner();
    let Some(existing) = fetch_product_form(&state.db, &product_id).await else {
        return Ok(HttpResponse::NotFound().body("Produto não encontrado"));
    };

    let data = read_product_form(payload).await?;
    let errors = validate_product(&data);
    if !errors.is_empty() {
        return portfolio_page(&state, &user, data.echo(&product_id), true, errors, String::new())
            .await;
    }

    let image_url = match data.image.as_ref() {
        Some((file_name, bytes)) => {
            match state.uploads.save_image(PORTFOLIO_BUCKET, file_name, bytes) {
                Ok(url) => url,
                Err(err) => {
                    log::error!("Image upload failed: {err}");
                    return portfolio_page(
                        &state,
                        &user,
                        data.echo(&product_id),
                        true,
                        vec![err.user_message().to_string()],
                        String::new(),
                    )
                    .await;
                }
            }
        }
        None => existing.image_url.clone(),
    };

    let result = sqlx::query(
        r#"UPDATE products
           SET title = ?, description = ?, category_id = ?, price = ?, image_url = ?,
               is_featured = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(data.title.trim())
    .bind(optional_text(Some(&data.description)))
    .bind(optional_text(Some(&data.category_id)))
    .bind(data.parsed_price().unwrap_or(0.0))
    .bind(&image_url)
    .bind(if data.is_featured { 1 } else { 0 })
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&product_id)
    .execute(&state.db)
    .await;

    if let Err(err) = result {
        log::error!("Failed to update product {product_id}: {err}");
        return portfolio_page(
            &state,
            &user,
            data.echo(&product_id),
            true,
            vec!["Erro ao salvar produto.".to_string()],
            String::new(),
        )
        .await;
    }

    portfolio_page(
        &state,
        &user,
        ProductFormView::default(),
        false,
        Vec::new(),
        "Produto atualizado com sucesso!".to_string(),
    )
    .await
}

async fn delete_product(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(denied) = admin_gate(&session, &state).await {
        return Ok(denied);
    }

    sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/painel-admin/portfolio"))
        .finish())
}

async fn toggle_featured(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(denied) = admin_gate(&session, &state).await {
        return Ok(denied);
    }

    sqlx::query("UPDATE products SET is_featured = 1 - is_featured, updated_at = ? WHERE id = ?")
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(path.into_inner())
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/painel-admin/portfolio"))
        .finish())
}

#[derive(Default)]
struct ProductFormData {
    title: String,
    description: String,
    category_id: String,
    price: String,
    is_featured: bool,
    image: Option<(String, Vec<u8>)>,
    image_oversize: bool,
}

impl ProductFormData {
    fn parsed_price(&self) -> Option<f64> {
        self.price.trim().replace(',', ".").parse::<f64>().ok()
    }

    fn echo(&self, id: &str) -> ProductFormView {
        ProductFormView {
            id: id.to_string(),
            title: self.title.clone(),
            description: self.description.clone(),
            category_id: self.category_id.clone(),
            price: self.price.clone(),
            image_url: String::new(),
            is_featured: self.is_featured,
        }
    }
}

async fn read_product_form(mut payload: Multipart) -> Result<ProductFormData> {
    let mut form = ProductFormData::default();

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let disposition = field.content_disposition().clone();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let file_name = disposition.get_filename().map(str::to_string);

        let mut data: Vec<u8> = Vec::new();
        let mut oversize = false;
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > storage::MAX_IMAGE_BYTES {
                // Keep draining so the remaining fields still parse.
                oversize = true;
                continue;
            }
            data.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "title" => form.title = text_field(data),
            "description" => form.description = text_field(data),
            "category_id" => form.category_id = text_field(data),
            "price" => form.price = text_field(data),
            "is_featured" => {
                let value = text_field(data);
                form.is_featured = matches!(value.as_str(), "1" | "true" | "on");
            }
            "image" => {
                if oversize {
                    form.image_oversize = true;
                } else if let Some(file_name) =
                    file_name.filter(|value| !value.trim().is_empty())
                {
                    if !data.is_empty() {
                        form.image = Some((file_name, data));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

fn text_field(data: Vec<u8>) -> String {
    String::from_utf8(data).unwrap_or_default().trim().to_string()
}

fn validate_product(data: &ProductFormData) -> Vec<String> {
    let mut errors = Vec::new();
    if data.title.trim().is_empty() {
        errors.push("Título é obrigatório.".to_string());
    }
    match data.parsed_price() {
        Some(price) if price > 0.0 => {}
        _ => errors.push("Preço inválido.".to_string()),
    }
    if data.image_oversize {
        errors.push("A imagem deve ter no máximo 5MB.".to_string());
    }
    errors
}

async fn fetch_service_form(pool: &SqlitePool, service_id: &str) -> Option<ServiceFormView> {
    let row = sqlx::query_as::<_, ServiceRow>(
        r#"SELECT id, name, description, price_small, price_medium, price_large,
                  duration_minutes, icon, is_active, created_at, updated_at
           FROM services
           WHERE id = ?
           LIMIT 1"#,
    )
    .bind(service_id)
    .fetch_optional(pool)
    .await
    .unwrap_or(None)?;

    Some(ServiceFormView {
        id: row.id,
        name: row.name,
        description: row.description.unwrap_or_default(),
        price_small: format!("{:.2}", row.price_small),
        price_medium: format!("{:.2}", row.price_medium),
        price_large: format!("{:.2}", row.price_large),
        duration_minutes: row.duration_minutes.to_string(),
        icon: row.icon,
        is_active: row.is_active == 1,
    })
}

async fn fetch_product_form(pool: &SqlitePool, product_id: &str) -> Option<ProductFormView> {
    let row = sqlx::query_as::<_, ProductRow>(
        r#"SELECT p.id, p.title, p.description, p.category_id, p.price, p.image_url,
                  p.is_featured, p.created_at, p.updated_at, c.name AS category_name
           FROM products p
           LEFT JOIN categories c ON p.category_id = c.id
           WHERE p.id = ?
           LIMIT 1"#,
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await
    .unwrap_or(None)?;

    Some(ProductFormView {
        id: row.id,
        title: row.title,
        description: row.description.unwrap_or_default(),
        category_id: row.category_id.unwrap_or_default(),
        price: format!("{:.2}", row.price),
        image_url: row.image_url,
        is_featured: row.is_featured == 1,
    })
}

fn service_form_echo(form: &ServiceForm, id: &str) -> ServiceFormView {
    ServiceFormView {
        id: id.to_string(),
        name: form.name.clone(),
        description: form.description.clone().unwrap_or_default(),
        price_small: form.price_small.clone().unwrap_or_default(),
        price_medium: form.price_medium.clone().unwrap_or_default(),
        price_large: form.price_large.clone().unwrap_or_default(),
        duration_minutes: form.duration_minutes.clone().unwrap_or_default(),
        icon: icon_or_default(form.icon.as_deref()).to_string(),
        is_active: checkbox(form.is_active.as_deref()),
    }
}

fn blank_service_form() -> ServiceFormView {
    ServiceFormView {
        duration_minutes: "60".to_string(),
        icon: "heart".to_string(),
        is_active: true,
        ..ServiceFormView::default()
    }
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_price(value: Option<&str>) -> f64 {
    value
        .map(|raw| raw.trim().replace(',', "."))
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|price| *price >= 0.0)
        .unwrap_or(0.0)
}

fn parse_duration(value: Option<&str>) -> i64 {
    value
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|minutes| *minutes > 0)
        .unwrap_or(60)
}

fn icon_or_default(value: Option<&str>) -> &str {
    match value {
        Some(icon) if ICON_OPTIONS.contains(&icon) => icon,
        _ => "heart",
    }
}

fn checkbox(value: Option<&str>) -> bool {
    matches!(value, Some("1") | Some("true") | Some("on"))
}

async fn fetch_all_appointments(pool: &SqlitePool) -> Vec<AppointmentRow> {
    sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT id, user_id, full_name, email, phone, appointment_date, appointment_time,
                  description, pet_name, pet_type, service_type, pet_size, notes,
                  reference_images, estimated_price, status, created_at, updated_at
           FROM appointments
           ORDER BY appointment_date DESC, appointment_time DESC"#,
    )
    .fetch_all(pool)
    .await
    .unwrap_or_default()
}

async fn count_query(pool: &SqlitePool, sql: &'static str) -> std::result::Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await
}

async fn count_with(
    pool: &SqlitePool,
    sql: &'static str,
    param: &str,
) -> std::result::Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(param)
        .fetch_one(pool)
        .await
}

async fn revenue_sum(pool: &SqlitePool) -> std::result::Result<f64, sqlx::Error> {
    sqlx::query_scalar::<_, Option<f64>>(
        "SELECT SUM(estimated_price) FROM appointments WHERE status IN ('confirmed', 'completed')",
    )
    .fetch_one(pool)
    .await
    .map(|value| value.unwrap_or(0.0))
}

fn to_list_view(row: AppointmentRow) -> AppointmentView {
    let status = AppointmentStatus::parse(&row.status).unwrap_or(AppointmentStatus::Pending);
    AppointmentView {
        id: row.id,
        full_name: row.full_name,
        appointment_date: row.appointment_date,
        appointment_time: row.appointment_time,
        description: row.description,
        status_label: status.label(),
        status_class: status.badge_class(),
    }
}

fn to_detail_view(row: AppointmentRow) -> AppointmentDetailView {
    let status = AppointmentStatus::parse(&row.status).unwrap_or(AppointmentStatus::Pending);
    let notes = row.notes.unwrap_or_default();
    let reference_images_raw = row.reference_images.unwrap_or_default();
    let reference_images = reference_images_raw
        .split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect();
    let actions = workflow::actions_for(status)
        .into_iter()
        .map(|action| ActionView {
            value: action.as_str(),
            label: action.label(),
            css: action.button_class(),
        })
        .collect();

    AppointmentDetailView {
        id: row.id,
        full_name: row.full_name,
        email: row.email,
        phone: row.phone,
        appointment_date: row.appointment_date,
        appointment_time: row.appointment_time,
        description: row.description,
        pet_name: row.pet_name,
        pet_type: row.pet_type,
        pet_size: row.pet_size.unwrap_or_default(),
        service_type: row.service_type,
        has_notes: !notes.trim().is_empty(),
        notes,
        reference_images,
        reference_images_raw,
        estimated_price: row
            .estimated_price
            .map(|value| format!("{value:.2}"))
            .unwrap_or_default(),
        status_label: status.label(),
        status_class: status.badge_class(),
        actions,
        updated_at: row.updated_at,
    }
}
