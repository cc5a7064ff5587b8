use super::views::FlowView;
use super::{bearer_token, is_htmx, signed_out, CallError, PageContext};
use crate::dtos::generation::{
    FlowVariant, GenerationFormInput, HEALTH_OPTIONS, MOOD_OPTIONS,
};
use crate::models::AuthUser;
use crate::services::autofill::{apply_suggestion, summarize_selections};
use crate::services::GenerationFlow;
use crate::AppState;
use meditation_core::error::AppError;
use askama::Template;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;

/// Grace period on top of the generation timeout before an unfinished
/// submission is considered abandoned.
const STALE_GRACE_SECS: i64 = 30;

const ALREADY_SUBMITTING: &str = "Your meditation is still being generated.";

#[derive(Template)]
#[template(path = "generate.html")]
pub struct GenerateTemplate {
    pub page: PageContext,
    pub view: FlowView,
}

#[derive(Template)]
#[template(path = "partials/generation_panel.html")]
pub struct GenerationPanel {
    pub view: FlowView,
}

#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    /// `mood` or `health`.
    pub kind: String,
    pub value: String,
    /// Unsaved scalar fields posted along with the toggle.
    #[serde(flatten)]
    pub draft: GenerationFormInput,
}

async fn load_flow(
    user: &AuthUser,
    state: &AppState,
    variant: FlowVariant,
) -> Result<GenerationFlow, Response> {
    let stale_after = state.api.generation_timeout().as_secs() as i64 + STALE_GRACE_SECS;
    GenerationFlow::load(user.session(), variant, stale_after)
        .await
        .map_err(IntoResponse::into_response)
}

async fn save_flow(user: &AuthUser, flow: &GenerationFlow) {
    if let Err(e) = flow.store(user.session()).await {
        tracing::error!(variant = ?flow.variant, error = %e, "Failed to store generation form");
    }
}

/// Write the flow through to the session store immediately, so an
/// overlapping request from the same browser sees it.
async fn commit_flow(user: &AuthUser, flow: &GenerationFlow) -> Result<(), AppError> {
    flow.store(user.session()).await?;
    user.session()
        .save()
        .await
        .map_err(|e| AppError::SessionError(e.to_string()))
}

async fn respond(
    user: &AuthUser,
    view: FlowView,
    htmx: bool,
    status: StatusCode,
) -> Response {
    if htmx {
        return (status, GenerationPanel { view }).into_response();
    }

    let title = if view.personalized {
        "Personalized meditation"
    } else {
        "Generate meditation"
    };
    let page = PageContext::build(user.session(), Some(&user.context), title, view.slug).await;
    (status, GenerateTemplate { page, view }).into_response()
}

async fn show(
    variant: FlowVariant,
    state: AppState,
    headers: HeaderMap,
    user: AuthUser,
) -> Response {
    let flow = match load_flow(&user, &state, variant).await {
        Ok(flow) => flow,
        Err(response) => return response,
    };
    let view = FlowView::new(&flow, state.api.public_url());
    respond(&user, view, is_htmx(&headers), StatusCode::OK).await
}

async fn submit(
    variant: FlowVariant,
    state: AppState,
    headers: HeaderMap,
    mut user: AuthUser,
    input: GenerationFormInput,
) -> Response {
    let htmx = is_htmx(&headers);
    let mut flow = match load_flow(&user, &state, variant).await {
        Ok(flow) => flow,
        Err(response) => return response,
    };

    match flow.edit() {
        Ok(form) => form.apply_input(input),
        Err(_) => return busy(&user, &flow, &state, htmx).await,
    }

    let request = match flow.submit() {
        Ok(Some(request)) => request,
        Ok(None) => {
            save_flow(&user, &flow).await;
            let view = FlowView::new(&flow, state.api.public_url());
            let status = if htmx { StatusCode::OK } else { StatusCode::UNPROCESSABLE_ENTITY };
            return respond(&user, view, htmx, status).await;
        }
        Err(_) => return busy(&user, &flow, &state, htmx).await,
    };

    // `submitting` must be in the store before the slow backend call
    if let Err(e) = commit_flow(&user, &flow).await {
        tracing::error!(variant = ?variant, error = %e, "Failed to persist submission");
        return e.into_response();
    }

    let generated = match bearer_token(&mut user, &state).await {
        Ok(token) => state
            .api
            .generate(&token, &request)
            .await
            .map_err(CallError::from),
        Err(e) => Err(e),
    };

    let transition = match generated {
        Ok(result) => {
            tracing::info!(
                variant = ?variant,
                meditation_type = %request.meditation_type,
                duration = request.duration,
                "Meditation generated"
            );
            flow.complete(result)
        }
        Err(CallError::SignedOut) => return signed_out(user.session(), htmx).await,
        Err(CallError::Failed(message)) => flow.fail(message),
    };

    if let Err(e) = transition {
        tracing::error!(error = %e, "Generation flow out of sync");
        flow.reset();
    }

    save_flow(&user, &flow).await;
    let view = FlowView::new(&flow, state.api.public_url());
    respond(&user, view, htmx, StatusCode::OK).await
}

async fn busy(user: &AuthUser, flow: &GenerationFlow, state: &AppState, htmx: bool) -> Response {
    let mut view = FlowView::new(flow, state.api.public_url());
    if flow.is_submitting() {
        view.notice = ALREADY_SUBMITTING.to_string();
    }
    let status = if htmx { StatusCode::OK } else { StatusCode::CONFLICT };
    respond(user, view, htmx, status).await
}

async fn toggle(
    variant: FlowVariant,
    state: AppState,
    headers: HeaderMap,
    user: AuthUser,
    toggle: ToggleForm,
) -> Response {
    let htmx = is_htmx(&headers);
    let mut flow = match load_flow(&user, &state, variant).await {
        Ok(flow) => flow,
        Err(response) => return response,
    };

    let form = match flow.edit() {
        Ok(form) => form,
        Err(_) => return busy(&user, &flow, &state, htmx).await,
    };

    form.merge_input(toggle.draft);
    match toggle.kind.as_str() {
        "mood" if MOOD_OPTIONS.contains(&toggle.value.as_str()) => form.toggle_mood(&toggle.value),
        "health" if HEALTH_OPTIONS.contains(&toggle.value.as_str()) => {
            form.toggle_health_condition(&toggle.value)
        }
        _ => {
            tracing::warn!(kind = %toggle.kind, value = %toggle.value, "Ignoring unknown option");
        }
    }

    save_flow(&user, &flow).await;
    let view = FlowView::new(&flow, state.api.public_url());
    respond(&user, view, htmx, StatusCode::OK).await
}

async fn autofill(
    variant: FlowVariant,
    state: AppState,
    headers: HeaderMap,
    mut user: AuthUser,
    draft: GenerationFormInput,
) -> Response {
    let htmx = is_htmx(&headers);
    let mut flow = match load_flow(&user, &state, variant).await {
        Ok(flow) => flow,
        Err(response) => return response,
    };

    match flow.edit() {
        Ok(form) => form.merge_input(draft),
        Err(_) => return busy(&user, &flow, &state, htmx).await,
    }

    let mood_text = summarize_selections(&flow.form);
    let suggestion = match bearer_token(&mut user, &state).await {
        Ok(token) => state
            .api
            .suggest(&token, &mood_text)
            .await
            .map_err(CallError::from),
        Err(e) => Err(e),
    };

    let mut banner = String::new();
    let mut notice = String::new();
    match suggestion {
        Ok(suggestion) => {
            if let Ok(form) = flow.edit() {
                apply_suggestion(form, &suggestion, variant);
            }
            save_flow(&user, &flow).await;
            notice = "Suggestions applied. Review them before generating.".to_string();
        }
        Err(CallError::SignedOut) => return signed_out(user.session(), htmx).await,
        Err(CallError::Failed(message)) => {
            tracing::warn!(variant = ?variant, "Auto-fill failed");
            save_flow(&user, &flow).await;
            banner = message;
        }
    }

    let mut view = FlowView::new(&flow, state.api.public_url());
    view.notice = notice;
    if !banner.is_empty() {
        view.banner = banner;
    }
    respond(&user, view, htmx, StatusCode::OK).await
}

async fn reset(
    variant: FlowVariant,
    state: AppState,
    headers: HeaderMap,
    user: AuthUser,
) -> Response {
    let mut flow = match load_flow(&user, &state, variant).await {
        Ok(flow) => flow,
        Err(response) => return response,
    };

    flow.reset();
    save_flow(&user, &flow).await;
    let view = FlowView::new(&flow, state.api.public_url());
    respond(&user, view, is_htmx(&headers), StatusCode::OK).await
}

pub async fn generate_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthUser,
) -> Response {
    show(FlowVariant::Standard, state, headers, user).await
}

pub async fn personalize_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthUser,
) -> Response {
    show(FlowVariant::Personalized, state, headers, user).await
}

pub async fn generate_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthUser,
    Form(input): Form<GenerationFormInput>,
) -> Response {
    submit(FlowVariant::Standard, state, headers, user, input).await
}

pub async fn personalize_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthUser,
    Form(input): Form<GenerationFormInput>,
) -> Response {
    submit(FlowVariant::Personalized, state, headers, user, input).await
}

pub async fn generate_toggle(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthUser,
    Form(form): Form<ToggleForm>,
) -> Response {
    toggle(FlowVariant::Standard, state, headers, user, form).await
}

pub async fn personalize_toggle(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthUser,
    Form(form): Form<ToggleForm>,
) -> Response {
    toggle(FlowVariant::Personalized, state, headers, user, form).await
}

pub async fn generate_autofill(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthUser,
    Form(draft): Form<GenerationFormInput>,
) -> Response {
    autofill(FlowVariant::Standard, state, headers, user, draft).await
}

pub async fn personalize_autofill(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthUser,
    Form(draft): Form<GenerationFormInput>,
) -> Response {
    autofill(FlowVariant::Personalized, state, headers, user, draft).await
}

pub async fn generate_reset(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthUser,
) -> Response {
    reset(FlowVariant::Standard, state, headers, user).await
}

pub async fn personalize_reset(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthUser,
) -> Response {
    reset(FlowVariant::Personalized, state, headers, user).await
}
