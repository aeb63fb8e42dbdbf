use actix_web::HttpResponse;
use askama::Template;

use crate::auth::CurrentUser;

/// Header/session context shared by every page template.
#[derive(Clone, Debug)]
pub struct Nav {
    pub logged_in: bool,
    pub display_name: String,
    pub is_admin: bool,
}

impl Nav {
    pub fn anonymous() -> Self {
        Self {
            logged_in: false,
            display_name: String::new(),
            is_admin: false,
        }
    }

    pub fn for_user(user: Option<&CurrentUser>) -> Self {
        match user {
            Some(user) => Self {
                logged_in: true,
                display_name: user.display_name(),
                is_admin: user.is_admin(),
            },
            None => Self::anonymous(),
        }
    }
}

pub fn render<T: Template>(template: T) -> HttpResponse {
    match template.render() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(body),
        Err(err) => {
            log::error!("Template render error: {err}");
            HttpResponse::InternalServerError().body("Erro interno")
        }
    }
}
