//! Blog HTTP server
//!
//! Routes:
//! - `GET /` renders the periodically refreshed page snapshot
//! - `GET /page/*name` loads and renders one page
//! - `GET|POST /comments/:name` appends a comment and redirects to the page
//! - `GET /api/...` dumps every page as JSON
//! - `GET /files/...` serves static files

mod snapshot;

pub use snapshot::Snapshot;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::{get, MethodRouter},
    Form, Router,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::comments::Comment;
use crate::content::{Page, PageLoader};
use crate::error::BlogError;
use crate::templates::TemplateRenderer;
use crate::Blog;

/// Characters escaped when a page title is put back into a URL path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Server state shared by all handlers
pub struct AppState {
    source_dir: PathBuf,
    loader: PageLoader,
    templates: TemplateRenderer,
    snapshot: Snapshot,
}

impl AppState {
    pub fn new(source_dir: PathBuf, loader: PageLoader, templates: TemplateRenderer) -> Self {
        Self {
            source_dir,
            loader,
            templates,
            snapshot: Snapshot::new(),
        }
    }

    /// The page list the index view currently shows
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Reload every page into the snapshot. On failure the old snapshot stays.
    pub async fn refresh(&self) -> Result<usize> {
        let pages = self.load_pages().await?;
        let count = pages.len();
        self.snapshot.replace(pages);
        Ok(count)
    }

    async fn load_pages(&self) -> Result<Vec<Page>> {
        let loader = self.loader.clone();
        let source_dir = self.source_dir.clone();
        blocking(move || loader.load_pages(&source_dir)).await
    }

    async fn load_named(&self, name: String) -> Result<Page> {
        let loader = self.loader.clone();
        let source_dir = self.source_dir.clone();
        blocking(move || loader.load_named(&source_dir, &name)).await
    }

    async fn append_comment(&self, title: String, comment: Comment) -> Result<Vec<Comment>> {
        let store = self.loader.comments().clone();
        blocking(move || store.append(&title, comment)).await
    }
}

/// Start the blog server and the index refresh task
pub async fn start(blog: &Blog) -> Result<()> {
    let templates = TemplateRenderer::load(&blog.template_dir)
        .with_context(|| format!("Can't parse template files in {:?}", blog.template_dir))?;

    let state = Arc::new(AppState::new(
        blog.source_dir.clone(),
        blog.loader(),
        templates,
    ));

    spawn_refresh(state.clone(), blog.config.refresh_interval());

    let app = router(state, &blog.files_dir);

    let addr = blog.config.listen_addr()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot listen on {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router over the shared state
pub fn router(state: Arc<AppState>, files_dir: &std::path::Path) -> Router {
    let api: MethodRouter = get(api_handler).with_state(state.clone());

    Router::new()
        .route("/", get(index_handler))
        .route("/page/*name", get(page_handler))
        .route("/comments/:name", get(comment_handler).post(comment_handler))
        .nest_service("/api", api)
        .nest_service("/files", ServeDir::new(files_dir))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Reload the snapshot now and then every `every`, forever
pub fn spawn_refresh(state: Arc<AppState>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match state.refresh().await {
                Ok(count) => tracing::info!("Index loaded ({} pages)", count),
                Err(e) => tracing::error!("Index refresh failed, keeping old pages: {:#}", e),
            }
        }
    })
}

/// Run blocking filesystem work off the async workers
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let pages = state.snapshot.get();
    html_response(state.templates.render_index(&pages))
}

async fn page_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    let page = match state.load_named(name).await {
        Ok(page) => page,
        Err(e) => {
            tracing::error!("Cannot load page: {:#}", e);
            Page::default()
        }
    };
    html_response(state.templates.render_page(&page))
}

/// `/page/` with no name gets the empty page, anything else the index
async fn fallback_handler(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    if uri.path().starts_with("/page/") {
        tracing::error!("Cannot load page: no page name in {}", uri.path());
        return html_response(state.templates.render_page(&Page::default()));
    }
    index_handler(State(state)).await
}

/// Form fields of a comment submission
///
/// Fields missing from a POST body are taken from the query string.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub name: Option<String>,
    pub comment: Option<String>,
}

impl CommentForm {
    fn or(self, fallback: CommentForm) -> CommentForm {
        CommentForm {
            name: self.name.or(fallback.name),
            comment: self.comment.or(fallback.comment),
        }
    }

    fn into_comment(self) -> Comment {
        Comment::new(self.name.unwrap_or_default(), self.comment.unwrap_or_default())
    }
}

async fn comment_handler(
    State(state): State<Arc<AppState>>,
    Path(title): Path<String>,
    query: Option<Query<CommentForm>>,
    form: Option<Form<CommentForm>>,
) -> Response {
    let query = query.map(|Query(query)| query).unwrap_or_default();
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let comment = form.or(query).into_comment();

    match state.append_comment(title.clone(), comment).await {
        Ok(comments) => {
            tracing::info!("Stored comment #{} for {}", comments.len(), title);
            let location = format!("/page/{}", utf8_percent_encode(&title, SEGMENT));
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        Err(e) => {
            tracing::error!("Cannot store comment for {:?}: {:#}", title, e);
            (error_status(&e), e.to_string()).into_response()
        }
    }
}

async fn api_handler(State(state): State<Arc<AppState>>) -> Response {
    let pages = match state.load_pages().await {
        Ok(pages) => pages,
        Err(e) => {
            tracing::error!("Cannot load pages: {:#}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    match encode_json(&pages) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!("Cannot encode pages to json: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// JSON indented by one space, newline-terminated. HTML is left unescaped.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    out.push(b'\n');
    Ok(out)
}

fn html_response(rendered: crate::error::Result<String>) -> Response {
    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Error during execution of template: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

fn error_status(err: &anyhow::Error) -> StatusCode {
    match err.downcast_ref::<BlogError>() {
        Some(BlogError::InvalidTitle(_)) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
