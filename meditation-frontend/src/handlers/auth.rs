use super::{is_htmx, navigate, PageContext};
use crate::dtos::auth::{LoginForm, SignupForm};
use crate::dtos::generation::field_messages;
use crate::models::AuthContext;
use crate::services::AuthFailure;
use crate::AppState;
use askama::Template;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use std::collections::BTreeMap;
use tower_sessions::Session;
use validator::Validate;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub email: String,
    pub banner: String,
    pub email_error: String,
    pub password_error: String,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub page: PageContext,
    pub email: String,
    pub banner: String,
    pub email_error: String,
    pub password_error: String,
    pub confirm_error: String,
}

fn take(errors: &mut BTreeMap<String, String>, field: &str) -> String {
    errors.remove(field).unwrap_or_default()
}

async fn already_signed_in(session: &Session) -> bool {
    matches!(AuthContext::load(session).await, Ok(Some(_)))
}

pub async fn login_page(session: Session, headers: HeaderMap) -> Response {
    if already_signed_in(&session).await {
        return navigate("/dashboard", is_htmx(&headers));
    }

    LoginTemplate {
        page: PageContext::build(&session, None, "Log in", "login").await,
        email: String::new(),
        banner: String::new(),
        email_error: String::new(),
        password_error: String::new(),
    }
    .into_response()
}

pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let page = PageContext::build(&session, None, "Log in", "login").await;

    if let Err(errors) = form.validate() {
        let mut errors = field_messages(&errors);
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            LoginTemplate {
                page,
                email: form.email,
                banner: String::new(),
                email_error: take(&mut errors, "email"),
                password_error: take(&mut errors, "password"),
            },
        )
            .into_response();
    }

    match state.identity.sign_in(form.email.trim(), &form.password).await {
        Ok(grant) => match start_session(&session, grant, form.email.trim()).await {
            Ok(()) => navigate("/dashboard", is_htmx(&headers)),
            Err(failure) => login_failed(page, form.email, failure),
        },
        Err(failure) => {
            tracing::info!(reason = ?failure, "Login rejected");
            login_failed(page, form.email, failure)
        }
    }
}

fn login_failed(page: PageContext, email: String, failure: AuthFailure) -> Response {
    let status = match failure {
        AuthFailure::Unavailable => StatusCode::BAD_GATEWAY,
        AuthFailure::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::UNAUTHORIZED,
    };

    (
        status,
        LoginTemplate {
            page,
            email,
            banner: failure.to_string(),
            email_error: String::new(),
            password_error: String::new(),
        },
    )
        .into_response()
}

pub async fn signup_page(session: Session, headers: HeaderMap) -> Response {
    if already_signed_in(&session).await {
        return navigate("/dashboard", is_htmx(&headers));
    }

    SignupTemplate {
        page: PageContext::build(&session, None, "Sign up", "signup").await,
        email: String::new(),
        banner: String::new(),
        email_error: String::new(),
        password_error: String::new(),
        confirm_error: String::new(),
    }
    .into_response()
}

pub async fn signup_handler(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<SignupForm>,
) -> Response {
    let page = PageContext::build(&session, None, "Sign up", "signup").await;

    if let Err(errors) = form.validate() {
        let mut errors = field_messages(&errors);
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            SignupTemplate {
                page,
                email: form.email,
                banner: String::new(),
                email_error: take(&mut errors, "email"),
                password_error: take(&mut errors, "password"),
                confirm_error: take(&mut errors, "confirm_password"),
            },
        )
            .into_response();
    }

    let outcome = match state.identity.sign_up(form.email.trim(), &form.password).await {
        Ok(grant) => start_session(&session, grant, form.email.trim()).await,
        Err(failure) => Err(failure),
    };

    match outcome {
        Ok(()) => {
            tracing::info!("Account created");
            navigate("/dashboard", is_htmx(&headers))
        }
        Err(failure) => {
            tracing::info!(reason = ?failure, "Signup rejected");
            let status = match failure {
                AuthFailure::EmailExists => StatusCode::CONFLICT,
                AuthFailure::Unavailable => StatusCode::BAD_GATEWAY,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            (
                status,
                SignupTemplate {
                    page,
                    email: form.email,
                    banner: failure.to_string(),
                    email_error: String::new(),
                    password_error: String::new(),
                    confirm_error: String::new(),
                },
            )
                .into_response()
        }
    }
}

/// Store a fresh [`AuthContext`] under a new session ID.
async fn start_session(
    session: &Session,
    grant: crate::services::identity_client::TokenGrant,
    login_email: &str,
) -> Result<(), AuthFailure> {
    let context = AuthContext::from_grant(grant, login_email);

    if let Err(e) = session.cycle_id().await {
        tracing::warn!(error = %e, "Failed to rotate session id");
    }

    context.store(session).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to store auth context");
        AuthFailure::Other("session".to_string())
    })?;

    tracing::info!(user_id = %context.user_id, "User logged in");
    Ok(())
}

pub async fn logout_handler(session: Session, headers: HeaderMap) -> impl IntoResponse {
    if let Ok(Some(context)) = AuthContext::load(&session).await {
        tracing::info!(user_id = %context.user_id, "User logged out");
    }

    AuthContext::teardown(&session).await;
    navigate("/login", is_htmx(&headers))
}
