//! Request dispatch module
//!
//! Entry point for HTTP request processing: builds the request context,
//! resolves the handler, invokes it and streams its output back. Failures
//! are turned into responses here and never reach the connection.

use crate::config::AppState;
use crate::handler::RequestContext;
use crate::http::{
    build_empty_response, build_streaming_response, build_text_response, BodyState, ResponseBody,
};
use crate::logger::{self, AccessLogEntry};
use futures_util::{StreamExt, TryStreamExt};
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
///
/// The request body is not read; handlers see the request head only.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: Option<SocketAddr>,
) -> Result<Response<ResponseBody>, Infallible> {
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    drop(body);

    let entry = state
        .access_log
        .then(|| AccessLogEntry::from_request(&parts, remote_addr));

    let ctx = RequestContext::new(parts);
    logger::log_verbose(&format!("Dispatching {} {}", ctx.method(), ctx.path()));

    let response = dispatch(&state, ctx).await;
    Ok(match entry {
        Some(entry) => {
            let format = state.config.logging.access_log_format.clone();
            with_access_log(response, entry, started, move |entry| {
                logger::log_request(entry, &format);
            })
        }
        None => response,
    })
}

async fn dispatch(state: &AppState, mut ctx: RequestContext) -> Response<ResponseBody> {
    let handler = match state.resolver.resolve(ctx.path()).await {
        Ok(handler) => handler,
        Err(e) => {
            let message = e.to_string();
            logger::log_error(&message);
            return build_text_response(e.status(), &logger::strip_ansi(&message));
        }
    };

    let stream = match handler.invoke(&mut ctx).await {
        Ok(stream) => stream,
        Err(e) => {
            logger::log_error(&format!("Handler for {} failed: {e}", ctx.path()));
            let status = e.status();
            return if status == StatusCode::NOT_FOUND {
                build_text_response(status, &logger::strip_ansi(&e.to_string()))
            } else {
                build_empty_response(status)
            };
        }
    };

    let path = ctx.path().to_string();
    let stream = stream
        .inspect_err(move |e| {
            logger::log_error(&format!("Handler for {path} failed mid-stream: {e}"));
        })
        .boxed();

    let (status, headers) = ctx.into_response_head();
    build_streaming_response(status, headers, stream)
}

/// Emit one access record when the body finishes, fails or is dropped
fn with_access_log(
    response: Response<ResponseBody>,
    mut entry: AccessLogEntry,
    started: Instant,
    record: impl FnOnce(&AccessLogEntry) + Send + 'static,
) -> Response<ResponseBody> {
    let status = response.status();

    response.map(|body| {
        body.on_complete(move |outcome| {
            entry.finish(status.as_u16(), outcome.bytes_sent, started.elapsed());
            if ended_early(status, &entry.method, outcome.state) {
                logger::log_verbose(&format!(
                    "Response to {} {} ended early ({:?})",
                    entry.method, entry.path, outcome.state
                ));
            }
            record(&entry);
        })
    })
}

/// hyper drops bodies of HEAD, 204 and 304 responses unpolled
fn ended_early(status: StatusCode, method: &str, state: BodyState) -> bool {
    let bodyless = method == "HEAD"
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED;
    state != BodyState::Complete && !(bodyless && state == BodyState::Aborted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::HandlerError;
    use crate::handler::testing::{text_manifest, write_manifest, CountingLoader};
    use crate::handler::{
        chunks, handler_fn, Chunk, ManifestLoader, ModuleLoader, ScriptletRegistry,
    };
    use crate::path::Normalizer;
    use futures_util::stream;
    use http_body_util::BodyExt;
    use hyper::body::Bytes;
    use hyper::header::{HeaderMap, CONTENT_TYPE};
    use std::path::Path;
    use std::sync::Mutex;

    fn config(root: &Path, dev_mode: bool) -> Config {
        let mut config = Config::default();
        config.mounts.roots = vec![root.join("code").to_string_lossy().into_owned()];
        config.mounts.static_roots = vec![root.join("public").to_string_lossy().into_owned()];
        config.resolver.dev_mode = dev_mode;
        config
    }

    fn state(config: &Config, loader: Arc<dyn ModuleLoader>) -> Arc<AppState> {
        Arc::new(AppState::with_loader(config, loader, &Normalizer::new("/", "/")))
    }

    async fn get(state: &Arc<AppState>, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
        get_with(state, Request::get(uri).body(()).unwrap()).await
    }

    async fn get_with(
        state: &Arc<AppState>,
        req: Request<()>,
    ) -> (StatusCode, HeaderMap, Bytes) {
        let response = handle_request(req, Arc::clone(state), None).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = body.collect().await.unwrap().to_bytes();
        (parts.status, parts.headers, bytes)
    }

    fn registry_state(dir: &Path) -> Arc<AppState> {
        let mut registry = ScriptletRegistry::with_builtins();
        registry
            .register("chunked", |_| {
                Ok(handler_fn(|ctx| {
                    ctx.status(201).header("x-chunked", &["yes"]);
                    Ok(chunks::iter(["a", "b", "c"]))
                }))
            })
            .register("fails", |_| {
                Ok(handler_fn(|_| Err(HandlerError::Failed("boom".to_string()))))
            })
            .register("gone", |_| {
                Ok(handler_fn(|_| Err(HandlerError::NotFound("gone".to_string()))))
            })
            .register("breaks", |_| {
                Ok(handler_fn(|_| {
                    let items = vec![
                        Ok(Chunk::from("partial")),
                        Err(HandlerError::Failed("lost upstream".to_string())),
                        Ok(Chunk::from("never")),
                    ];
                    Ok(stream::iter(items).boxed())
                }))
            });
        for name in ["chunked", "fails", "gone", "breaks"] {
            write_manifest(
                &dir.join(format!("code/{name}.toml")),
                &format!("handler = \"{name}\""),
            );
        }
        let loader = Arc::new(ManifestLoader::new(Arc::new(registry)));
        state(&config(dir, false), loader)
    }

    #[tokio::test]
    async fn test_end_to_end_caches_handler() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(&dir.path().join("code/api/index.toml"), &text_manifest("ok"));
        let loader = Arc::new(CountingLoader::default());
        let state = state(&config(dir.path(), false), Arc::clone(&loader) as Arc<dyn ModuleLoader>);

        for _ in 0..2 {
            let (status, _, body) = get(&state, "/api/").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(&body[..], b"ok");
        }
        assert_eq!(loader.loads(), 1);
    }

    #[tokio::test]
    async fn test_end_to_end_dev_mode_reloads() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(&dir.path().join("code/api/index.toml"), &text_manifest("ok"));
        let loader = Arc::new(CountingLoader::default());
        let state = state(&config(dir.path(), true), Arc::clone(&loader) as Arc<dyn ModuleLoader>);

        for _ in 0..2 {
            let (status, _, body) = get(&state, "/api/").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(&body[..], b"ok");
        }
        assert_eq!(loader.loads(), 2);
    }

    #[tokio::test]
    async fn test_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&config(dir.path(), false), Arc::new(CountingLoader::default()));

        let (status, headers, body) = get(&state, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(headers[CONTENT_TYPE], "text/plain");
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(text, "Unable to locate handler for /nope");
    }

    #[tokio::test]
    async fn test_load_failure_is_500() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(&dir.path().join("code/bad.toml"), "handler = [");
        let state = state(&config(dir.path(), false), Arc::new(CountingLoader::default()));

        let (status, _, body) = get(&state, "/bad.toml").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.is_empty());
    }

    #[tokio::test]
    async fn test_percent_decoded_path() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(&dir.path().join("code/hello world.toml"), &text_manifest("spaced"));
        let state = state(&config(dir.path(), false), Arc::new(CountingLoader::default()));

        let (status, _, body) = get(&state, "/hello%20world.toml").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"spaced");
    }

    #[tokio::test]
    async fn test_streams_handler_head_and_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let state = registry_state(dir.path());

        let (status, headers, body) = get(&state, "/chunked.toml").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(headers["x-chunked"], "yes");
        assert_eq!(&body[..], b"abc");
    }

    #[tokio::test]
    async fn test_invocation_failures() {
        let dir = tempfile::tempdir().unwrap();
        let state = registry_state(dir.path());

        let (status, _, body) = get(&state, "/fails.toml").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.is_empty());

        let (status, _, body) = get(&state, "/gone.toml").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(&body[..], b"gone");
    }

    #[tokio::test]
    async fn test_mid_stream_failure_aborts_body() {
        let dir = tempfile::tempdir().unwrap();
        let state = registry_state(dir.path());

        let req = Request::get("/breaks.toml").body(()).unwrap();
        let response = handle_request(req, Arc::clone(&state), None).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut body = response.into_body();
        let first = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert_eq!(&first[..], b"partial");
        assert!(body.frame().await.unwrap().is_err());
        assert!(body.frame().await.is_none());
    }

    #[tokio::test]
    async fn test_static_files_and_revalidation() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("public/app.js");
        write_manifest(&file, "console.log(1)");
        let state = state(&config(dir.path(), false), Arc::new(CountingLoader::default()));

        let (status, headers, body) = get(&state, "/app.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], "application/javascript");
        assert_eq!(&body[..], b"console.log(1)");

        let last_modified = headers["last-modified"].to_str().unwrap().to_string();
        let req = Request::get("/app.js")
            .header("if-modified-since", last_modified)
            .body(())
            .unwrap();
        let (status, _, body) = get_with(&state, req).await;
        assert_eq!(status, StatusCode::NOT_MODIFIED);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_code_root_shadows_static_root() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(&dir.path().join("code/page.toml"), &text_manifest("code"));
        write_manifest(&dir.path().join("public/page.toml"), "static");
        let state = state(&config(dir.path(), false), Arc::new(CountingLoader::default()));

        let (_, _, body) = get(&state, "/page.toml").await;
        assert_eq!(&body[..], b"code");
    }

    type Records = Arc<Mutex<Vec<AccessLogEntry>>>;

    /// Dispatch like `handle_request`, capturing the access record
    async fn recorded(state: &Arc<AppState>, req: Request<()>) -> (Response<ResponseBody>, Records) {
        let (parts, ()) = req.into_parts();
        let entry = AccessLogEntry::from_request(&parts, Some("10.0.0.7:4711".parse().unwrap()));
        let response = dispatch(state, RequestContext::new(parts)).await;

        let records = Records::default();
        let sink = Arc::clone(&records);
        let response = with_access_log(response, entry, Instant::now(), move |entry| {
            sink.lock().unwrap().push(entry.clone());
        });
        (response, records)
    }

    async fn get_recorded(state: &Arc<AppState>, req: Request<()>) -> (Bytes, Records) {
        let (response, records) = recorded(state, req).await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (body, records)
    }

    #[tokio::test]
    async fn test_access_record_contents() {
        let dir = tempfile::tempdir().unwrap();
        let state = registry_state(dir.path());

        let req = Request::get("/chunked.toml?x=1").body(()).unwrap();
        let (body, records) = get_recorded(&state, req).await;
        assert_eq!(&body[..], b"abc");
        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.remote_addr, "10.0.0.7");
        assert_eq!(record.method, "GET");
        assert_eq!(record.path, "/chunked.toml");
        assert_eq!(record.query.as_deref(), Some("x=1"));
        assert_eq!(record.status, 201);
        assert_eq!(record.body_bytes, 3);
    }

    #[tokio::test]
    async fn test_access_record_for_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&config(dir.path(), false), Arc::new(CountingLoader::default()));

        let req = Request::get("/nope").body(()).unwrap();
        let (body, records) = get_recorded(&state, req).await;
        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, 404);
        assert_eq!(records[0].body_bytes, body.len());
    }

    #[tokio::test]
    async fn test_access_record_when_body_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(&dir.path().join("public/app.js"), "console.log(1)");
        let state = state(&config(dir.path(), false), Arc::new(CountingLoader::default()));

        let req = Request::get("/app.js").body(()).unwrap();
        let (response, records) = recorded(&state, req).await;
        drop(response);

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, 200);
        assert_eq!(records[0].body_bytes, 0);
    }

    #[test]
    fn test_bodyless_responses_do_not_end_early() {
        let aborted = BodyState::Aborted;
        assert!(!ended_early(StatusCode::NOT_MODIFIED, "GET", aborted));
        assert!(!ended_early(StatusCode::NO_CONTENT, "GET", aborted));
        assert!(!ended_early(StatusCode::OK, "HEAD", aborted));
        assert!(ended_early(StatusCode::OK, "GET", aborted));
        assert!(ended_early(StatusCode::NOT_MODIFIED, "GET", BodyState::Failed));
        assert!(!ended_early(StatusCode::OK, "GET", BodyState::Complete));
    }
}
