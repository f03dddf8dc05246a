// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

// The served page and the JSON endpoints behind it.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use warp::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, SET_COOKIE};
use warp::http::{HeaderValue, StatusCode};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::app::{Assistant, Export};
use crate::config::SessionConfig;
use crate::error::AppError;
use crate::query::SearchForm;
use crate::session::{new_session_id, SessionRegistry, SessionState, SessionStatus, SharedSession};

pub const SESSION_COOKIE: &str = "rs_session";
const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: String,
    pub kind: String,
    pub message: String,
}

/// The caller's session id, resolved from the cookie.
///
/// Read-only endpoints only look the session up; it is registered by the
/// first action that stores something in it.
#[derive(Clone)]
struct SessionHandle {
    id: String,
    fresh: bool,
    registry: Arc<SessionRegistry>,
}

impl SessionHandle {
    async fn existing(&self) -> Option<SharedSession> {
        if self.fresh {
            return None;
        }
        self.registry.get(&self.id).await
    }

    async fn open(&self) -> SharedSession {
        self.registry.get_or_create(&self.id).await
    }

    /// Attach the session cookie when it was just issued.
    fn finish(&self, reply: impl Reply) -> Response {
        let mut response = reply.into_response();
        if self.fresh {
            let cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", self.id);
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().insert(SET_COOKIE, value);
            }
        }
        response
    }
}

pub async fn start_web_server(
    addr: SocketAddr,
    assistant: Arc<Assistant>,
    sessions: &SessionConfig,
) {
    let sessions = Arc::new(SessionRegistry::new(sessions));
    info!("Web interface running on http://{}", addr);
    warp::serve(routes(assistant, sessions)).run(addr).await;
}

pub fn routes(
    assistant: Arc<Assistant>,
    sessions: Arc<SessionRegistry>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let assistant_filter = warp::any().map(move || assistant.clone());
    let session_filter = with_session(sessions);

    let index = warp::get()
        .and(warp::path::end())
        .map(|| warp::reply::html(index_html()));

    let search = warp::post()
        .and(warp::path!("api" / "search"))
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(session_filter.clone())
        .and(assistant_filter.clone())
        .and_then(search_handler);

    let state = warp::get()
        .and(warp::path!("api" / "session"))
        .and(session_filter.clone())
        .and_then(session_handler);

    let export_csv = warp::get()
        .and(warp::path!("api" / "export" / "csv"))
        .and(session_filter.clone())
        .and(assistant_filter.clone())
        .and_then(csv_handler);

    let export_pdf = warp::get()
        .and(warp::path!("api" / "export" / "pdf"))
        .and(session_filter.clone())
        .and(assistant_filter.clone())
        .and_then(pdf_handler);

    let history = warp::get()
        .and(warp::path!("api" / "history"))
        .and(assistant_filter.clone())
        .and_then(history_handler);

    let reopen = warp::get()
        .and(warp::path!("api" / "history" / i64))
        .and(session_filter)
        .and(assistant_filter)
        .and_then(reopen_handler);

    index
        .or(search)
        .or(state)
        .or(export_csv)
        .or(export_pdf)
        .or(history)
        .or(reopen)
}

fn with_session(
    sessions: Arc<SessionRegistry>,
) -> impl Filter<Extract = (SessionHandle,), Error = Infallible> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).map(move |cookie: Option<String>| {
        let (id, fresh) = match cookie {
            Some(id) if is_valid_session_id(&id) => (id, false),
            _ => (new_session_id(), true),
        };
        SessionHandle {
            id,
            fresh,
            registry: sessions.clone(),
        }
    })
}

fn is_valid_session_id(id: &str) -> bool {
    id.len() == 24 && id.chars().all(|c| c.is_ascii_alphanumeric())
}

async fn search_handler(
    form: SearchForm,
    handle: SessionHandle,
    assistant: Arc<Assistant>,
) -> Result<Response, Rejection> {
    debug!(topic = %form.topic, "search submitted");
    let shared = handle.open().await;
    // One search per session at a time; a second click is refused, not queued.
    let Ok(mut session) = shared.try_lock() else {
        return Ok(handle.finish(error_reply(&AppError::Busy)));
    };
    let reply = match assistant.search(&mut session, &form).await {
        Ok(view) => warp::reply::json(&view).into_response(),
        Err(e) => error_reply(&e),
    };
    Ok(handle.finish(reply))
}

async fn session_handler(handle: SessionHandle) -> Result<Response, Rejection> {
    let status = match handle.existing().await {
        Some(shared) => status_of(&shared),
        None => SessionStatus::from(&SessionState::Idle),
    };
    Ok(handle.finish(warp::reply::json(&status)))
}

fn status_of(shared: &SharedSession) -> SessionStatus {
    match shared.try_lock() {
        Ok(session) => SessionStatus::from(session.state()),
        // Held by a running search.
        Err(_) => SessionStatus {
            state: "searching",
            topic: None,
            message: None,
            result_count: 0,
        },
    }
}

async fn csv_handler(
    handle: SessionHandle,
    assistant: Arc<Assistant>,
) -> Result<Response, Rejection> {
    let Some(shared) = handle.existing().await else {
        return Ok(handle.finish(error_reply(&AppError::NothingDisplayed)));
    };
    let session = shared.lock().await;
    let reply = match assistant.export_csv(&session) {
        Ok(export) => download_reply(export),
        Err(e) => error_reply(&e),
    };
    Ok(handle.finish(reply))
}

async fn pdf_handler(
    handle: SessionHandle,
    assistant: Arc<Assistant>,
) -> Result<Response, Rejection> {
    let Some(shared) = handle.existing().await else {
        return Ok(handle.finish(error_reply(&AppError::NothingDisplayed)));
    };
    let session = shared.lock().await;
    let reply = match assistant.export_pdf(&session).await {
        Ok(export) => download_reply(export),
        Err(e) => error_reply(&e),
    };
    Ok(handle.finish(reply))
}

async fn history_handler(assistant: Arc<Assistant>) -> Result<Response, Rejection> {
    Ok(match assistant.history().await {
        Ok(items) => warp::reply::json(&items).into_response(),
        Err(e) => error_reply(&e),
    })
}

async fn reopen_handler(
    id: i64,
    handle: SessionHandle,
    assistant: Arc<Assistant>,
) -> Result<Response, Rejection> {
    let shared = handle.open().await;
    let Ok(mut session) = shared.try_lock() else {
        return Ok(handle.finish(error_reply(&AppError::Busy)));
    };
    let reply = match assistant.reopen(&mut session, id).await {
        Ok(view) => warp::reply::json(&view).into_response(),
        Err(e) => error_reply(&e),
    };
    Ok(handle.finish(reply))
}

fn download_reply(export: Export) -> Response {
    let mut response = export.bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(export.content_type));
    let disposition = format!("attachment; filename=\"{}\"", export.file_name);
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(CONTENT_DISPOSITION, value);
    }
    response
}

fn error_reply(e: &AppError) -> Response {
    let status = if e.kind() == "no_results" { "info" } else { "error" };
    let body = warp::reply::json(&StatusMessage {
        status: status.to_string(),
        kind: e.kind().to_string(),
        message: e.user_message(),
    });
    let code = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    warp::reply::with_status(body, code).into_response()
}

fn index_html() -> String {
    INDEX_HTML.to_string()
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Scientific Search Assistant</title>
    <style>
        body { font-family: Arial; margin: 20px; background: #f5f5f5; min-height: 100vh; display: flex; flex-direction: column; }
        .content { flex: 1; }
        h1 { color: #333; }

        .status-message { padding: 10px; margin: 10px 0; display: none; }
        .status-message.success { background: #d4edda; color: #155724; border: 1px solid #c3e6cb; }
        .status-message.info { background: #fff3cd; color: #856404; border: 1px solid #ffeeba; }
        .status-message.error { background: #f8d7da; color: #721c24; border: 1px solid #f5c6cb; }

        input[type="text"], input[type="date"], select { padding: 8px; margin: 5px 0; }

        button { padding: 8px 16px; background: rgb(100, 149, 237); color: white; border: none; cursor: pointer; margin-right: 5px; }
        button:hover { background: #5a8dd4; }
        button:disabled { background: #aaa; cursor: default; }

        .tabs { margin: 20px 0; border-bottom: 2px solid #ddd; }
        .tab { display: inline-block; padding: 10px 20px; cursor: pointer; background: #e9ecef; margin-right: 5px; }
        .tab.active { background: white; border: 1px solid #ddd; border-bottom: none; }
        .tab-content { display: none; }
        .tab-content.active { display: block; }

        .search-form { background: white; padding: 20px; max-width: 800px; }
        .search-form label { display: block; margin: 10px 0 5px 0; font-weight: bold; }
        .search-form input, .search-form select { width: 100%; box-sizing: border-box; }
        .form-row { display: grid; grid-template-columns: 1fr 1fr 1fr; gap: 15px; }

        .loading { display: none; padding: 10px; background: #fff3cd; border: 1px solid #ffc107; margin: 10px 0; }
        .loading.active { display: block; }

        .metrics { display: grid; grid-template-columns: repeat(3, 1fr); gap: 15px; margin: 15px 0; }
        .metric { background: white; padding: 15px; border: 1px solid #ddd; }
        .metric .value { font-size: 28px; font-weight: bold; color: rgb(0, 150, 255); }

        .chart { background: white; padding: 15px; border: 1px solid #ddd; margin: 10px 0; }
        .bar-row { display: grid; grid-template-columns: 160px 1fr 40px; gap: 8px; align-items: center; margin: 3px 0; font-size: 13px; }
        .bar { background: rgb(100, 149, 237); height: 14px; }

        .result { background: white; padding: 15px; margin: 10px 0; border: 1px solid #ddd; }
        .result summary { cursor: pointer; font-weight: bold; }
        .result a { color: #007bff; text-decoration: none; }
        .info { color: #666; font-size: 14px; margin: 4px 0; }
        .abstract { margin-top: 10px; padding: 10px; background: #f9f9f9; border-left: 3px solid #007bff; font-size: 14px; }
        .doi-badge { background: #28a745; color: white; padding: 3px 8px; font-size: 12px; font-family: monospace; }

        .history-row { background: white; padding: 10px; margin: 6px 0; border: 1px solid #ddd; cursor: pointer; }
        .history-row:hover { background: #eef4ff; }
        #exports { display: none; margin: 15px 0; }
    </style>
</head>
<body>
    <div class="content">
        <h1>Scientific Search Assistant</h1>

        <div id="status-message" class="status-message"></div>
        <div id="loading" class="loading">Searching articles...</div>

        <div class="tabs">
            <div class="tab active" onclick="showTab(event, 'search')">Search</div>
            <div class="tab" onclick="showTab(event, 'history')">History</div>
        </div>

        <div id="search-tab" class="tab-content active">
            <div class="search-form">
                <h2>Search parameters</h2>
                <label>Research topic:</label>
                <input type="text" id="topic" placeholder="e.g. soil carbon sequestration">
                <div class="form-row">
                    <div>
                        <label>Start date:</label>
                        <input type="date" id="start_date" value="2020-01-01">
                    </div>
                    <div>
                        <label>End date:</label>
                        <input type="date" id="end_date">
                    </div>
                    <div>
                        <label>Language:</label>
                        <select id="language">
                            <option value="en,es">en,es</option>
                            <option value="en">en</option>
                            <option value="es">es</option>
                            <option value="es,en">es,en</option>
                        </select>
                    </div>
                </div>
                <br>
                <button id="search-button" onclick="startSearch()">Search articles</button>
            </div>

            <div id="exports">
                <button onclick="window.location='/api/export/pdf'">Download PDF</button>
                <button onclick="window.location='/api/export/csv'">Download CSV</button>
            </div>
            <div id="stats"></div>
            <div id="results"></div>
        </div>

        <div id="history-tab" class="tab-content">
            <h2>Recent searches</h2>
            <div id="history"></div>
        </div>
    </div>

    <script>
        document.getElementById('end_date').value = new Date().toISOString().slice(0, 10);

        function escapeHtml(text) {
            const div = document.createElement('div');
            div.textContent = text == null ? '' : String(text);
            return div.innerHTML;
        }

        function showStatusMessage(message, level) {
            const element = document.getElementById('status-message');
            element.textContent = message;
            element.className = 'status-message ' + level;
            element.style.display = 'block';
        }

        function showTab(e, tabId) {
            document.querySelectorAll('.tab').forEach(t => t.classList.remove('active'));
            document.querySelectorAll('.tab-content').forEach(c => c.classList.remove('active'));
            e.target.classList.add('active');
            document.getElementById(tabId + '-tab').classList.add('active');
            if (tabId === 'history') {
                loadHistory();
            }
        }

        function clearResults() {
            document.getElementById('exports').style.display = 'none';
            document.getElementById('stats').innerHTML = '';
            document.getElementById('results').innerHTML = '';
        }

        function startSearch() {
            const topic = document.getElementById('topic').value;
            if (!topic.trim()) {
                showStatusMessage('Please enter a research topic.', 'info');
                return;
            }
            const request = {
                topic: topic,
                start_date: document.getElementById('start_date').value,
                end_date: document.getElementById('end_date').value,
                language: document.getElementById('language').value,
            };

            const button = document.getElementById('search-button');
            button.disabled = true;
            document.getElementById('loading').classList.add('active');
            clearResults();

            fetch('/api/search', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify(request)
            })
            .then(r => r.json())
            .then(data => {
                if (data.status === 'ok') {
                    renderView(data);
                } else {
                    showStatusMessage(data.message, data.status);
                }
            })
            .catch(err => showStatusMessage('Something went wrong: ' + err, 'error'))
            .finally(() => {
                button.disabled = false;
                document.getElementById('loading').classList.remove('active');
            });
        }

        function renderView(view) {
            showStatusMessage(view.message, 'success');
            if (view.store_warning) {
                showStatusMessage(view.message + ' (' + view.store_warning + ')', 'info');
            }
            document.getElementById('exports').style.display = 'block';
            renderStats(view.summary);

            const container = document.getElementById('results');
            container.innerHTML = '';
            view.records.forEach(r => {
                const card = document.createElement('details');
                card.className = 'result';
                const link = r.link && /^https?:\/\//i.test(r.link)
                    ? `<p><a href="${escapeHtml(r.link)}" target="_blank" rel="noopener">View article</a></p>`
                    : '';
                const doi = r.doi ? `<span class="doi-badge">${escapeHtml(r.doi)}</span>` : '';
                card.innerHTML = `
                    <summary>${escapeHtml(r.title)} (${escapeHtml(r.year)})</summary>
                    <div class="info"><b>Authors:</b> ${escapeHtml(r.authors)}</div>
                    <div class="info"><b>Source:</b> ${escapeHtml(r.source || '-')} &nbsp; <b>Venue:</b> ${escapeHtml(r.venue)} ${doi}</div>
                    <div class="info"><b>Objective:</b> ${escapeHtml(r.objective)}</div>
                    <div class="info"><b>Methodology:</b> ${escapeHtml(r.methodology)}</div>
                    <div class="info"><b>Keywords:</b> ${escapeHtml(r.keywords || '-')}</div>
                    <div class="abstract">${escapeHtml(r.summary)}</div>
                    ${link}
                `;
                container.appendChild(card);
            });
        }

        function bars(title, rows) {
            if (rows.length === 0) {
                return '';
            }
            const max = Math.max(...rows.map(r => r[1]));
            const body = rows.map(([label, count]) => `
                <div class="bar-row">
                    <span>${escapeHtml(label)}</span>
                    <div class="bar" style="width: ${Math.max(2, 100 * count / max)}%"></div>
                    <span>${count}</span>
                </div>`).join('');
            return `<div class="chart"><h4>${title}</h4>${body}</div>`;
        }

        function renderStats(s) {
            document.getElementById('stats').innerHTML = `
                <h2>Descriptive statistics</h2>
                <div class="metrics">
                    <div class="metric"><div>Total articles</div><div class="value">${s.total_count}</div></div>
                    <div class="metric"><div>Unique sources</div><div class="value">${s.distinct_source_count}</div></div>
                    <div class="metric"><div>Distinct years</div><div class="value">${s.distinct_year_count}</div></div>
                </div>
                ${bars('Publications per year', s.year_histogram.map(b => [String(b.year), b.count]))}
                ${bars('Most frequent keywords', s.top_keywords.map(t => [t.term, t.count]))}
                ${bars('Most frequent authors', s.top_authors.map(t => [t.term, t.count]))}
            `;
        }

        function loadHistory() {
            fetch('/api/history')
                .then(r => r.json())
                .then(data => {
                    const container = document.getElementById('history');
                    container.innerHTML = '';
                    if (!Array.isArray(data)) {
                        container.innerHTML = `<p>${escapeHtml(data.message)}</p>`;
                        return;
                    }
                    if (data.length === 0) {
                        container.innerHTML = '<p>No searches stored yet.</p>';
                        return;
                    }
                    data.forEach(item => {
                        const row = document.createElement('div');
                        row.className = 'history-row';
                        row.innerHTML = `<b>${escapeHtml(item.topic)}</b>
                            <span class="info">${escapeHtml(item.date_range)} | ${escapeHtml(item.language)} | ${item.result_count} articles | ${escapeHtml(item.created_at)}</span>`;
                        row.onclick = () => reopen(item.id);
                        container.appendChild(row);
                    });
                });
        }

        function reopen(id) {
            fetch('/api/history/' + id)
                .then(r => r.json())
                .then(data => {
                    if (data.status !== 'ok') {
                        showStatusMessage(data.message, data.status);
                        return;
                    }
                    document.querySelectorAll('.tab')[0].click();
                    renderView(data);
                });
        }
    </script>
</body>
</html>"#;
