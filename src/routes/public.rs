use actix_session::Session;
use actix_web::{http::header, web, HttpResponse, Result};
use askama::Template;
use serde::Deserialize;

use crate::{
    auth::{self, current_user},
    filters,
    models::{CategoryRow, ProductRow, ServiceRow},
    state::AppState,
    templates::{render, Nav},
    validate,
};

#[derive(Clone, Debug)]
struct ProductCard {
    title: String,
    description: String,
    has_description: bool,
    category_name: String,
    price: f64,
    image_url: String,
}

#[derive(Clone, Debug)]
struct CategoryView {
    id: String,
    name: String,
    selected: bool,
}

#[derive(Clone, Debug)]
struct ServiceView {
    name: String,
    description: String,
    has_description: bool,
    price_small: f64,
    price_medium: f64,
    price_large: f64,
    duration_minutes: i64,
    icon: String,
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    nav: Nav,
    featured: Vec<ProductCard>,
}

#[derive(Template)]
#[template(path = "catalog.html")]
struct CatalogTemplate {
    nav: Nav,
    categories: Vec<CategoryView>,
    products: Vec<ProductCard>,
    all_selected: bool,
}

#[derive(Template)]
#[template(path = "services.html")]
struct ServicesTemplate {
    nav: Nav,
    services: Vec<ServiceView>,
}

#[derive(Template)]
#[template(path = "location.html")]
struct LocationTemplate {
    nav: Nav,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    nav: Nav,
    error: String,
    has_error: bool,
    email: String,
    next: String,
}

#[derive(Template)]
#[template(path = "signup.html")]
struct SignupTemplate {
    nav: Nav,
    errors: Vec<String>,
    full_name: String,
    phone: String,
    email: String,
    next: String,
}

#[derive(Deserialize)]
struct CatalogQuery {
    category: Option<String>,
}

#[derive(Deserialize)]
struct NextQuery {
    next: Option<String>,
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
    next: Option<String>,
}

#[derive(Deserialize)]
struct SignupForm {
    full_name: String,
    phone: String,
    email: String,
    password: String,
    confirm_password: String,
    next: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/catalogo").route(web::get().to(catalog)))
        .service(web::resource("/servicos").route(web::get().to(services)))
        .service(web::resource("/localizacao").route(web::get().to(location)))
        .service(
            web::resource("/entrar")
                .route(web::get().to(show_login))
                .route(web::post().to(do_login)),
        )
        .service(
            web::resource("/cadastrar")
                .route(web::get().to(show_signup))
                .route(web::post().to(do_signup)),
        )
        .service(web::resource("/sair").route(web::get().to(logout)))
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn home(state: web::Data<AppState>, session: Session) -> Result<HttpResponse> {
    let user = current_user(&session, &state.db).await;

    let rows = sqlx::query_as::<_, ProductRow>(
        r#"SELECT p.id, p.title, p.description, p.category_id, p.price, p.image_url,
                  p.is_featured, p.created_at, p.updated_at, c.name AS category_name
           FROM products p
           LEFT JOIN categories c ON p.category_id = c.id
           WHERE p.is_featured = 1
           ORDER BY p.created_at DESC
           LIMIT 6"#,
    )
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    Ok(render(HomeTemplate {
        nav: Nav::for_user(user.as_ref()),
        featured: rows.into_iter().map(to_card).collect(),
    }))
}

async fn catalog(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<CatalogQuery>,
) -> Result<HttpResponse> {
    let user = current_user(&session, &state.db).await;
    let selected = query
        .category
        .clone()
        .filter(|value| !value.trim().is_empty());

    let category_rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, slug, description, display_order, created_at FROM categories ORDER BY display_order",
    )
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    // Filter changes re-query the database instead of narrowing the
    // already-loaded set.
    let product_rows = match selected.as_deref() {
        Some(category_id) => sqlx::query_as::<_, ProductRow>(
            r#"SELECT p.id, p.title, p.description, p.category_id, p.price, p.image_url,
                      p.is_featured, p.created_at, p.updated_at, c.name AS category_name
               FROM products p
               LEFT JOIN categories c ON p.category_id = c.id
               WHERE p.category_id = ?
               ORDER BY p.created_at DESC"#,
        )
        .bind(category_id)
        .fetch_all(&state.db)
        .await
        .unwrap_or_default(),
        None => sqlx::query_as::<_, ProductRow>(
            r#"SELECT p.id, p.title, p.description, p.category_id, p.price, p.image_url,
                      p.is_featured, p.created_at, p.updated_at, c.name AS category_name
               FROM products p
               LEFT JOIN categories c ON p.category_id = c.id
               ORDER BY p.created_at DESC"#,
        )
        .fetch_all(&state.db)
        .await
        .unwrap_or_default(),
    };

    let categories = category_rows
        .into_iter()
        .map(|row| CategoryView {
            selected: selected.as_deref() == Some(row.id.as_str()),
            id: row.id,
            name: row.name,
        })
        .collect();

    Ok(render(CatalogTemplate {
        nav: Nav::for_user(user.as_ref()),
        categories,
        products: product_rows.into_iter().map(to_card).collect(),
        all_selected: selected.is_none(),
    }))
}

async fn services(state: web::Data<AppState>, session: Session) -> Result<HttpResponse> {
    let user = current_user(&session, &state.db).await;

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

    let services = rows
        .into_iter()
        .map(|row| {
            let description = row.description.unwrap_or_default();
            ServiceView {
                name: row.name,
                has_description: !description.trim().is_empty(),
                description,
                price_small: row.price_small,
                price_medium: row.price_medium,
                price_large: row.price_large,
                duration_minutes: row.duration_minutes,
                icon: row.icon,
            }
        })
        .collect();

    Ok(render(ServicesTemplate {
        nav: Nav::for_user(user.as_ref()),
        services,
    }))
}

async fn location(state: web::Data<AppState>, session: Session) -> Result<HttpResponse> {
    let user = current_user(&session, &state.db).await;
    Ok(render(LocationTemplate {
        nav: Nav::for_user(user.as_ref()),
    }))
}

async fn show_login(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<NextQuery>,
) -> Result<HttpResponse> {
    if current_user(&session, &state.db).await.is_some() {
        return Ok(redirect("/"));
    }
    Ok(render(LoginTemplate {
        nav: Nav::anonymous(),
        error: String::new(),
        has_error: false,
        email: String::new(),
        next: sanitize_next(query.next.as_deref()),
    }))
}

async fn do_login(
    state: web::Data<AppState>,
    session: Session,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let next = sanitize_next(form.next.as_deref());

    match auth::sign_in(&state.db, &session, &form.email, &form.password).await {
        Ok(_) => Ok(redirect(&next)),
        Err(err) => {
            if !matches!(err, auth::AuthError::InvalidCredentials) {
                log::error!("Sign-in failed: {err}");
            }
            Ok(render(LoginTemplate {
                nav: Nav::anonymous(),
                error: err.user_message().to_string(),
                has_error: true,
                email: form.email,
                next,
            }))
        }
    }
}

async fn show_signup(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<NextQuery>,
) -> Result<HttpResponse> {
    if current_user(&session, &state.db).await.is_some() {
        return Ok(redirect("/"));
    }
    Ok(render(SignupTemplate {
        nav: Nav::anonymous(),
        errors: Vec::new(),
        full_name: String::new(),
        phone: String::new(),
        email: String::new(),
        next: sanitize_next(query.next.as_deref()),
    }))
}

async fn do_signup(
    state: web::Data<AppState>,
    session: Session,
    form: web::Form<SignupForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let next = sanitize_next(form.next.as_deref());
    let phone = validate::normalize_phone(&form.phone);

    let mut errors = Vec::new();
    if form.full_name.trim().is_empty() {
        errors.push("Nome completo é obrigatório.".to_string());
    }
    if form.email.trim().is_empty() {
        errors.push("E-mail é obrigatório.".to_string());
    }
    if !validate::is_phone_valid(&phone) {
        errors.push(format!("Telefone deve ter {} dígitos.", validate::PHONE_DIGITS));
    }
    if !validate::is_password_valid(&form.password) {
        errors.push(
            "A senha deve conter no mínimo 6 caracteres, incluindo letra maiúscula, número e caractere especial."
                .to_string(),
        );
    }
    if form.password != form.confirm_password {
        errors.push("As senhas não coincidem.".to_string());
    }

    if !errors.is_empty() {
        return Ok(render(SignupTemplate {
            nav: Nav::anonymous(),
            errors,
            full_name: form.full_name,
            phone,
            email: form.email,
            next,
        }));
    }

    match auth::sign_up(
        &state.db,
        &session,
        &form.email,
        &form.password,
        &form.full_name,
        &phone,
    )
    .await
    {
        Ok(outcome) => {
            if !outcome.profile_provisioned {
                log::warn!("Sign-up finished without a profile for user {}", outcome.user_id);
            }
            Ok(redirect(&next))
        }
        Err(err) => {
            if !matches!(err, auth::AuthError::EmailTaken) {
                log::error!("Sign-up failed: {err}");
            }
            Ok(render(SignupTemplate {
                nav: Nav::anonymous(),
                errors: vec![err.user_message().to_string()],
                full_name: form.full_name,
                phone,
                email: form.email,
                next,
            }))
        }
    }
}

async fn logout(session: Session) -> HttpResponse {
    auth::sign_out(&session);
    redirect("/")
}

fn redirect(target: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, target.to_string()))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

fn sanitize_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') => path.to_string(),
        _ => "/".to_string(),
    }
}

fn to_card(row: ProductRow) -> ProductCard {
    let description = row.description.unwrap_or_default();
    ProductCard {
        title: row.title,
        has_description: !description.trim().is_empty(),
        description,
        category_name: row
            .category_name
            .unwrap_or_else(|| "Sem categoria".to_string()),
        price: row.price,
        image_url: row.image_url,
    }
}
