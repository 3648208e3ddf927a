//! Line-delimited JSON request loop
//!
//! Keeps one [`WorkspaceDetector`] (and so one cache) alive for the life
//! of the process. Each request line is answered by exactly one response
//! line carrying the same `id`; responses to concurrent requests may
//! arrive out of order. Logs never go to the output stream.

use crate::config::Config;
use crate::error::{GitspaceError, GitspaceResult};
use crate::git::{self, working_tree_status, CommandRunner, CountingRunner};
use crate::workspace::{Resolution, WorkspaceDetector};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

const RESPONSE_BUFFER: usize = 64;
const LINE_BUFFER: usize = 64;

const METHODS: &[&str] = &["detect", "info", "invalidate", "stats", "repo", "changes", "diff"];

type Line = std::io::Result<String>;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl Response {
    fn from_result(id: Value, result: GitspaceResult<Value>) -> Self {
        match result {
            Ok(value) => Self {
                id,
                result: Some(value),
                error: None,
            },
            Err(e) => Self::error(id, e.kind(), e.to_string(), e.hint().map(str::to_string)),
        }
    }

    fn error(id: Value, kind: &str, message: String, hint: Option<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(ErrorBody {
                kind: kind.to_string(),
                message,
                hint,
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetectParams {
    #[serde(rename = "override")]
    override_path: Option<String>,
    start_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InvalidateParams {
    key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RepoParams {
    dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DiffParams {
    #[serde(rename = "override")]
    override_path: Option<String>,
    start_dir: Option<PathBuf>,
    staged: bool,
}

fn params<T: Default + for<'de> Deserialize<'de>>(value: Value) -> GitspaceResult<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value)?)
}

struct ServerState {
    detector: WorkspaceDetector,
    runner: Arc<CountingRunner<CommandRunner>>,
}

impl ServerState {
    /// Resolve the workspace a request refers to
    async fn workspace(
        &self,
        override_path: Option<&str>,
        start_dir: Option<PathBuf>,
    ) -> GitspaceResult<Resolution> {
        let mut request = self.detector.request(override_path)?;
        if let Some(start_dir) = start_dir {
            request.start_dir = start_dir;
        }
        self.detector.detect_from(request).await
    }

    async fn dispatch(&self, method: &str, params_value: Value) -> GitspaceResult<Value> {
        match method {
            "detect" => {
                let p: DetectParams = params(params_value)?;
                let resolution = self
                    .workspace(p.override_path.as_deref(), p.start_dir)
                    .await?;
                Ok(serde_json::to_value(resolution)?)
            }
            "changes" => {
                let p: DetectParams = params(params_value)?;
                let resolution = self
                    .workspace(p.override_path.as_deref(), p.start_dir)
                    .await?;
                let status = working_tree_status(self.detector.resolver(), &resolution.path).await?;
                Ok(serde_json::to_value(status)?)
            }
            "diff" => {
                let p: DiffParams = params(params_value)?;
                let resolution = self
                    .workspace(p.override_path.as_deref(), p.start_dir)
                    .await?;
                let diff = git::diff(self.detector.resolver(), &resolution.path, p.staged).await?;
                Ok(serde_json::to_value(diff)?)
            }
            "info" => {
                let p: DetectParams = params(params_value)?;
                let info = match p.start_dir {
                    Some(start_dir) => {
                        let mut request = self.detector.request(p.override_path.as_deref())?;
                        request.start_dir = start_dir;
                        self.detector.info_for(&request).await
                    }
                    None => self.detector.info(p.override_path.as_deref()).await?,
                };
                Ok(serde_json::to_value(info)?)
            }
            "invalidate" => {
                let p: InvalidateParams = params(params_value)?;
                let evicted = self.detector.invalidate(p.key.as_deref());
                Ok(json!({ "evicted": evicted }))
            }
            "stats" => Ok(json!({
                "cache": self.detector.stats(),
                "git_invocations": self.runner.calls(),
            })),
            "repo" => {
                let p: RepoParams = params(params_value)?;
                let start = match p.dir {
                    Some(dir) => self.detector.validator().validate(&dir)?,
                    None => {
                        let cwd = std::env::current_dir()
                            .map_err(|e| GitspaceError::io("reading the current directory", e))?;
                        self.detector.validator().validate_path(&cwd)?
                    }
                };
                let info = self.detector.resolver().resolve_from(&start).await?;
                Ok(serde_json::to_value(info)?)
            }
            other => Err(GitspaceError::Internal(format!("unknown method: {other}"))),
        }
    }
}

/// Requests being answered, keyed by task so a panicked handler can
/// still be answered
#[derive(Default)]
struct InFlight {
    tasks: JoinSet<Response>,
    ids: HashMap<task::Id, Value>,
}

impl InFlight {
    fn spawn<F>(&mut self, id: Value, handler: F)
    where
        F: Future<Output = Response> + Send + 'static,
    {
        let handle = self.tasks.spawn(handler);
        self.ids.insert(handle.id(), id);
    }

    fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    async fn join_next(&mut self) -> Option<Result<(task::Id, Response), JoinError>> {
        self.tasks.join_next_with_id().await
    }

    /// Forget a finished task and pass its response on
    async fn settle(
        &mut self,
        joined: Result<(task::Id, Response), JoinError>,
        tx: &mpsc::Sender<Response>,
    ) {
        let response = match joined {
            Ok((task_id, response)) => {
                self.ids.remove(&task_id);
                response
            }
            Err(e) => {
                let id = self.ids.remove(&e.id()).unwrap_or(Value::Null);
                error!(error = %e, id = %id, "Request handler failed");
                Response::error(id, "internal", format!("request handler failed: {e}"), None)
            }
        };
        if tx.send(response).await.is_err() {
            warn!("Response writer closed");
        }
    }

    /// Wait for every request still running
    async fn drain(&mut self, tx: &mpsc::Sender<Response>) {
        while let Some(joined) = self.join_next().await {
            self.settle(joined, tx).await;
        }
    }
}

/// Serve requests from `input` until EOF, a `shutdown` request, or Ctrl-C
pub async fn serve<R, W>(config: &Config, input: R, output: W) -> GitspaceResult<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(input).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => Ok(line),
                Ok(None) => break,
                Err(e) => Err(e),
            };
            let failed = line.is_err();
            if tx.send(line).await.is_err() || failed {
                break;
            }
        }
    });

    let result = serve_lines(config, rx, output).await;
    reader.abort();
    result
}

/// Serve requests from the process's stdin and stdout
///
/// Stdin is read on a plain thread: a blocking read cannot be cancelled, and
/// the process must be able to exit while a read is pending.
pub async fn serve_stdio(config: &Config) -> GitspaceResult<()> {
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    std::thread::Builder::new()
        .name("gitspace-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        })
        .map_err(|e| GitspaceError::io("starting the stdin reader", e))?;

    serve_lines(config, rx, tokio::io::stdout()).await
}

async fn serve_lines<W>(
    config: &Config,
    mut lines: mpsc::Receiver<Line>,
    output: W,
) -> GitspaceResult<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let runner = Arc::new(CountingRunner::new(CommandRunner::new(
        config.git.executable.clone(),
        config.git.timeout(),
        config.git.retries,
    )));
    let state = Arc::new(ServerState {
        detector: WorkspaceDetector::with_runner(config, runner.clone()),
        runner,
    });

    let (tx, mut rx) = mpsc::channel::<Response>(RESPONSE_BUFFER);
    let writer = tokio::spawn(async move {
        let mut output = output;
        while let Some(response) = rx.recv().await {
            let mut line = match serde_json::to_string(&response) {
                Ok(line) => line,
                Err(e) => {
                    error!(error = %e, "Failed to encode response");
                    continue;
                }
            };
            line.push('\n');
            if let Err(e) = output.write_all(line.as_bytes()).await {
                error!(error = %e, "Failed to write response");
                break;
            }
            if let Err(e) = output.flush().await {
                error!(error = %e, "Failed to flush response");
                break;
            }
        }
    });

    info!("Serving requests on stdio");
    let mut in_flight = InFlight::default();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let line = tokio::select! {
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                in_flight.settle(joined, &tx).await;
                continue;
            }
            line = lines.recv() => line,
            _ = &mut ctrl_c => {
                info!("Interrupted, shutting down");
                break;
            }
        };

        let line = match line {
            Some(Ok(line)) => line,
            None => {
                debug!("Input closed");
                break;
            }
            Some(Err(e)) => {
                warn!(error = %e, "Failed to read request");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let request: Request = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                let response =
                    Response::error(Value::Null, "invalid_request", e.to_string(), None);
                if tx.send(response).await.is_err() {
                    break;
                }
                continue;
            }
        };

        debug!(method = %request.method, id = %request.id, in_flight = in_flight.len(), "Request");
        if request.method == "shutdown" {
            // Let in-flight requests answer first
            in_flight.drain(&tx).await;
            let _ = tx
                .send(Response::from_result(request.id, Ok(json!({ "ok": true }))))
                .await;
            break;
        }

        if !METHODS.contains(&request.method.as_str()) {
            let message = format!("unknown method: {}", request.method);
            if tx
                .send(Response::error(request.id, "unknown_method", message, None))
                .await
                .is_err()
            {
                break;
            }
            continue;
        }

        let state = state.clone();
        let Request { id, method, params: params_value } = request;
        in_flight.spawn(id.clone(), async move {
            let result = state.dispatch(&method, params_value).await;
            Response::from_result(id, result)
        });
    }

    in_flight.drain(&tx).await;
    drop(tx);
    writer
        .await
        .map_err(|e| GitspaceError::Internal(format!("response writer failed: {e}")))?;
    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    /// Feed `input` to a server and collect its responses by id
    async fn run(config: &Config, input: &str) -> HashMap<String, Value> {
        let (mut client_in, server_in) = tokio::io::duplex(64 * 1024);
        let (server_out, mut client_out) = tokio::io::duplex(64 * 1024);

        client_in.write_all(input.as_bytes()).await.unwrap();
        drop(client_in);

        serve(config, server_in, server_out).await.unwrap();

        let mut output = String::new();
        client_out.read_to_string(&mut output).await.unwrap();
        output
            .lines()
            .map(|line| {
                let value: Value = serde_json::from_str(line).unwrap();
                (value["id"].to_string(), value)
            })
            .collect()
    }

    #[tokio::test]
    async fn concurrent_detects_agree() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_str().unwrap();
        let input = format!(
            "{}\n{}\n",
            json!({"id": 1, "method": "detect", "params": {"override": dir, "start_dir": dir}}),
            json!({"id": 2, "method": "detect", "params": {"override": dir, "start_dir": dir}}),
        );

        let responses = run(&Config::default(), &input).await;
        let first = &responses["1"]["result"];
        assert_eq!(first["method"], "override");
        assert_eq!(
            first["path"].as_str().unwrap(),
            temp.path().canonicalize().unwrap().to_str().unwrap()
        );
        assert_eq!(responses["2"]["result"], *first);
    }

    #[tokio::test]
    async fn fresh_server_stats() {
        let input = format!("{}\n", json!({"id": "s", "method": "stats"}));
        let responses = run(&Config::default(), &input).await;
        let stats = &responses["\"s\""]["result"];
        assert_eq!(stats["cache"]["entries"], 0);
        assert_eq!(stats["cache"]["ttl_secs"], 60);
        assert_eq!(stats["git_invocations"], 0);
    }

    #[tokio::test]
    async fn invalid_override_is_a_typed_error() {
        let input = format!(
            "{}\n",
            json!({"id": 7, "method": "detect", "params": {"override": "/nonexistent/gitspace"}})
        );
        let responses = run(&Config::default(), &input).await;
        let error = &responses["7"]["error"];
        assert_eq!(error["kind"], "workspace");
        assert!(error["message"].as_str().unwrap().contains("/nonexistent/gitspace"));
    }

    #[tokio::test]
    async fn malformed_and_unknown_requests() {
        let input = format!(
            "not json\n\n{}\n{}\n",
            json!({"id": 3, "method": "frobnicate"}),
            json!({"id": 4, "method": "invalidate"}),
        );
        let responses = run(&Config::default(), &input).await;

        assert_eq!(responses["null"]["error"]["kind"], "invalid_request");
        assert_eq!(responses["3"]["error"]["kind"], "unknown_method");
        assert_eq!(responses["4"]["result"]["evicted"], 0);
    }

    #[tokio::test]
    async fn panicked_handler_still_gets_an_answer() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut in_flight = InFlight::default();
        let explode = true;

        in_flight.spawn(json!(1), async move {
            assert!(!explode, "handler exploded");
            Response::from_result(json!(1), Ok(Value::Null))
        });
        in_flight.spawn(json!(2), async {
            Response::from_result(json!(2), Ok(json!("done")))
        });
        in_flight.drain(&tx).await;
        drop(tx);

        assert!(in_flight.is_empty());
        assert_eq!(in_flight.len(), 0);
        let mut responses = HashMap::new();
        while let Some(response) = rx.recv().await {
            responses.insert(response.id.to_string(), response);
        }
        let failed = responses["1"].error.as_ref().unwrap();
        assert_eq!(failed.kind, "internal");
        assert!(failed.message.contains("handler failed"));
        assert_eq!(responses["2"].result, Some(json!("done")));
    }

    #[tokio::test]
    async fn finished_requests_are_reaped_while_serving() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut in_flight = InFlight::default();
        for n in 0..3 {
            in_flight.spawn(json!(n), async move {
                Response::from_result(json!(n), Ok(Value::Null))
            });
        }

        while let Some(joined) = in_flight.join_next().await {
            in_flight.settle(joined, &tx).await;
            assert!(rx.recv().await.is_some());
        }
        assert_eq!(in_flight.len(), 0);
        assert!(in_flight.tasks.is_empty());
    }

    #[tokio::test]
    async fn changes_and_diff_answer_for_the_detected_workspace() {
        if !test_support::git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let repo = test_support::init_repo(&temp.path().join("repo"));
        std::fs::write(repo.join("README.md"), "# Edited\n").unwrap();
        let dir = repo.to_str().unwrap();
        let input = format!(
            "{}\n{}\n{}\n",
            json!({"id": 1, "method": "changes", "params": {"override": dir}}),
            json!({"id": 2, "method": "diff", "params": {"override": dir}}),
            json!({"id": 3, "method": "diff", "params": {"override": dir, "staged": true}}),
        );

        let responses = run(&Config::default(), &input).await;
        let changes = &responses["1"]["result"];
        assert_eq!(changes["clean"], false);
        assert_eq!(changes["entries"][0]["path"], "README.md");
        assert!(responses["2"]["result"]["diff"]
            .as_str()
            .unwrap()
            .contains("+# Edited"));
        assert_eq!(responses["3"]["result"]["staged"], true);
        assert_eq!(responses["3"]["result"]["diff"], "");
    }

    #[tokio::test]
    async fn shutdown_answers_in_flight_requests_then_stops_reading() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_str().unwrap();
        let input = format!(
            "{}\n{}\n{}\n",
            json!({"id": 1, "method": "detect", "params": {"override": dir, "start_dir": dir}}),
            json!({"id": 2, "method": "shutdown"}),
            json!({"id": 3, "method": "stats"}),
        );
        let responses = run(&Config::default(), &input).await;
        assert!(responses["1"]["result"].is_object());
        assert_eq!(responses["2"]["result"]["ok"], true);
        assert!(!responses.contains_key("3"));
    }
}
