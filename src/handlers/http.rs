//! HTTP delivery handler
//!
//! Records are rendered as JSON lines and POSTed in batches. Failed batches
//! stay queued and are retried after an exponential backoff with jitter; the
//! queue is bounded and sheds its oldest lines when it overflows. Delivery
//! can run inline on the logging thread or on a background worker fed by a
//! bounded channel.

use crate::core::{diagnostic, Handler, HandlerOptions, LogRecord, LoggerError, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::Url;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const DEFAULT_BATCH_SIZE: usize = 50;
const DEFAULT_MAX_QUEUE: usize = 10_000;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_RETRY_BASE: Duration = Duration::from_millis(500);
const DEFAULT_RETRY_MAX: Duration = Duration::from_secs(30);
const WORKER_FLUSH_INTERVAL: Duration = Duration::from_millis(500);
const USER_AGENT: &str = concat!("structured_log_pipeline/", env!("CARGO_PKG_VERSION"));

/// Moves one request body to the collector
///
/// Implement this to plug in a different HTTP client.
pub trait HttpTransport: Send + Sync {
    fn send(&self, body: &[u8], content_encoding: Option<&str>) -> Result<()>;

    /// Collector address, used in error messages
    fn endpoint(&self) -> &str;
}

/// Blocking `reqwest` client posting NDJSON bodies to `http://` or
/// `https://` collectors
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    url: Url,
    endpoint: String,
    client: Client,
    timeout: Duration,
    headers: HeaderMap,
}

impl ReqwestTransport {
    pub fn new(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| {
            LoggerError::config("HttpHandler", format!("invalid collector URL '{}': {}", url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LoggerError::config(
                "HttpHandler",
                format!("unsupported scheme '{}' in '{}'", parsed.scheme(), url),
            ));
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(LoggerError::config("HttpHandler", format!("missing host in '{}'", url)));
        }

        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                LoggerError::config("HttpHandler", format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            endpoint: url.to_string(),
            url: parsed,
            client,
            timeout: DEFAULT_TIMEOUT,
            headers: HeaderMap::new(),
        })
    }

    /// Whole-request timeout, connect included
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extra request header, e.g. an authorization token
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            LoggerError::config("HttpHandler", format!("invalid header name '{}': {}", name, e))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            LoggerError::config(
                "HttpHandler",
                format!("invalid value for header '{}': {}", name.as_str(), e),
            )
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    fn build_headers(&self, content_encoding: Option<&str>) -> Result<HeaderMap> {
        let mut headers = self.headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-ndjson"));
        if let Some(encoding) = content_encoding {
            let value = HeaderValue::from_str(encoding).map_err(|e| {
                LoggerError::transport(&self.endpoint, format!("invalid content encoding: {}", e))
            })?;
            headers.insert(CONTENT_ENCODING, value);
        }
        Ok(headers)
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, body: &[u8], content_encoding: Option<&str>) -> Result<()> {
        let response = self
            .client
            .post(self.url.clone())
            .headers(self.build_headers(content_encoding)?)
            .timeout(self.timeout)
            .body(body.to_vec())
            .send()
            .map_err(|e| LoggerError::transport(&self.endpoint, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoggerError::transport(
                &self.endpoint,
                format!("collector answered {}", status),
            ));
        }
        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Exponential retry delay with +/-50% jitter
#[derive(Debug)]
struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
    retry_at: Option<Instant>,
}

impl Backoff {
    fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            failures: 0,
            retry_at: None,
        }
    }

    fn ready(&self) -> bool {
        self.retry_at.map_or(true, |at| Instant::now() >= at)
    }

    /// Record a failed attempt; returns the wait before the next one
    fn failed(&mut self) -> Duration {
        let multiplier = 2_u32.saturating_pow(self.failures.min(16));
        let capped = self.base.saturating_mul(multiplier).min(self.max);
        let delay = capped.mul_f64(rand::thread_rng().gen_range(0.5..1.5));
        self.failures = self.failures.saturating_add(1);
        self.retry_at = Some(Instant::now() + delay);
        delay
    }

    fn succeeded(&mut self) {
        self.failures = 0;
        self.retry_at = None;
    }
}

/// Pending lines plus the policy for turning them into requests
struct Batcher {
    transport: Arc<dyn HttpTransport>,
    pending: VecDeque<String>,
    batch_size: usize,
    max_queue: usize,
    compress: bool,
    backoff: Backoff,
}

impl Batcher {
    /// Queue one line; deliver once a batch is full and no retry wait is
    /// pending
    ///
    /// A failed delivery or shed lines come back as `Err`; the lines that
    /// were not delivered stay queued either way.
    fn push(&mut self, line: String) -> Result<()> {
        self.pending.push_back(line);
        let mut shed = 0;
        while self.pending.len() > self.max_queue {
            self.pending.pop_front();
            shed += 1;
        }

        let delivery = if self.pending.len() >= self.batch_size && self.backoff.ready() {
            self.attempt()
        } else {
            Ok(())
        };

        match (shed, delivery) {
            (0, result) => result,
            (shed, Ok(())) => Err(LoggerError::transport(
                self.transport.endpoint(),
                format!("retry queue full, dropped {} oldest line(s)", shed),
            )),
            (shed, Err(e)) => Err(LoggerError::transport(
                self.transport.endpoint(),
                format!("{}; retry queue full, dropped {} oldest line(s)", failure_message(&e), shed),
            )),
        }
    }

    /// Send one batch if the backoff allows it; used by the idle worker
    fn retry_due(&mut self) -> Result<()> {
        if self.pending.is_empty() || !self.backoff.ready() {
            return Ok(());
        }
        self.attempt()
    }

    /// Deliver everything queued, ignoring any retry wait
    fn drain(&mut self) -> Result<()> {
        while !self.pending.is_empty() {
            self.attempt()?;
        }
        Ok(())
    }

    fn attempt(&mut self) -> Result<()> {
        match self.deliver(self.batch_size) {
            Ok(()) => {
                self.backoff.succeeded();
                Ok(())
            }
            Err(e) => {
                let wait = self.backoff.failed();
                Err(LoggerError::transport(
                    self.transport.endpoint(),
                    format!(
                        "{}; {} line(s) queued, next attempt in {}ms",
                        failure_message(&e),
                        self.pending.len(),
                        wait.as_millis()
                    ),
                ))
            }
        }
    }

    fn deliver(&mut self, max_lines: usize) -> Result<()> {
        let count = max_lines.min(self.pending.len());
        if count == 0 {
            return Ok(());
        }
        let mut body = String::new();
        for line in self.pending.iter().take(count) {
            body.push_str(line);
            body.push('\n');
        }

        if self.compress {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(body.as_bytes())?;
            let compressed = encoder.finish()?;
            self.transport.send(&compressed, Some("gzip"))?;
        } else {
            self.transport.send(body.as_bytes(), None)?;
        }
        self.pending.drain(..count);
        Ok(())
    }
}

fn failure_message(error: &LoggerError) -> String {
    match error {
        LoggerError::TransportError { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

enum Command {
    Line(String),
    Flush(Sender<Result<()>>),
    Shutdown,
}

struct Worker {
    sender: Sender<Command>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

enum Mode {
    Inline(Mutex<Batcher>),
    Background(Worker),
}

/// POSTs records to a log collector
///
/// ```no_run
/// use structured_log_pipeline::handlers::HttpHandler;
///
/// let handler = HttpHandler::new("http://127.0.0.1:8080/logs")
///     .unwrap()
///     .with_batch_size(100)
///     .with_gzip(true)
///     .build();
/// ```
pub struct HttpHandler {
    options: Arc<HandlerOptions>,
    endpoint: String,
    mode: Mode,
}

/// Configures an [`HttpHandler`]
pub struct HttpHandlerBuilder {
    transport: Arc<dyn HttpTransport>,
    options: HandlerOptions,
    batch_size: usize,
    max_queue: usize,
    compress: bool,
    retry_base: Duration,
    retry_max: Duration,
    background: Option<usize>,
}

impl HttpHandler {
    /// Use the built-in `reqwest` transport for `url`
    pub fn new(url: &str) -> Result<HttpHandlerBuilder> {
        Ok(Self::with_transport(Arc::new(ReqwestTransport::new(url)?)))
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> HttpHandlerBuilder {
        HttpHandlerBuilder {
            transport,
            options: HandlerOptions::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_queue: DEFAULT_MAX_QUEUE,
            compress: false,
            retry_base: DEFAULT_RETRY_BASE,
            retry_max: DEFAULT_RETRY_MAX,
            background: None,
        }
    }

    /// Lines waiting for delivery; inline mode only
    pub fn pending(&self) -> usize {
        match &self.mode {
            Mode::Inline(batcher) => batcher.lock().pending.len(),
            Mode::Background(_) => 0,
        }
    }

    fn render(formatted: &LogRecord) -> Result<String> {
        match formatted.formatted() {
            Some(line) => Ok(line.to_string()),
            None => Ok(formatted.to_json()?),
        }
    }
}

impl HttpHandlerBuilder {
    #[must_use]
    pub fn with_options(mut self, options: HandlerOptions) -> Self {
        self.options = options;
        self
    }

    /// Lines per request (at least 1)
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Upper bound on queued lines awaiting a successful delivery
    #[must_use]
    pub fn with_max_queue(mut self, max_queue: usize) -> Self {
        self.max_queue = max_queue.max(1);
        self
    }

    #[must_use]
    pub fn with_gzip(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// First retry delay after a failed batch and the cap it doubles up to
    #[must_use]
    pub fn with_retry_delay(mut self, base: Duration, max: Duration) -> Self {
        self.retry_base = base;
        self.retry_max = max;
        self
    }

    /// Deliver on a worker thread fed by a channel of this capacity
    #[must_use]
    pub fn background(mut self, channel_capacity: usize) -> Self {
        self.background = Some(channel_capacity.max(1));
        self
    }

    pub fn build(self) -> HttpHandler {
        let endpoint = self.transport.endpoint().to_string();
        let options = Arc::new(self.options);
        let batcher = Batcher {
            transport: self.transport,
            pending: VecDeque::new(),
            batch_size: self.batch_size,
            max_queue: self.max_queue,
            compress: self.compress,
            backoff: Backoff::new(self.retry_base, self.retry_max),
        };

        let mode = match self.background {
            None => Mode::Inline(Mutex::new(batcher)),
            Some(capacity) => {
                let (sender, receiver) = bounded(capacity);
                let worker_options = Arc::clone(&options);
                let handle = thread::spawn(move || run_worker(batcher, receiver, worker_options));
                Mode::Background(Worker {
                    sender,
                    handle: Mutex::new(Some(handle)),
                })
            }
        };

        HttpHandler {
            options,
            endpoint,
            mode,
        }
    }
}

fn run_worker(mut batcher: Batcher, receiver: Receiver<Command>, options: Arc<HandlerOptions>) {
    let report = |error: &LoggerError| options.report_error("http", error, None);
    loop {
        match receiver.recv_timeout(WORKER_FLUSH_INTERVAL) {
            Ok(Command::Line(line)) => {
                if let Err(e) = batcher.push(line) {
                    report(&e);
                }
            }
            Ok(Command::Flush(ack)) => {
                let _ = ack.send(batcher.drain());
            }
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                if let Err(e) = batcher.drain() {
                    report(&e);
                }
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                // Partial batches go out once the channel is idle.
                if let Err(e) = batcher.retry_due() {
                    report(&e);
                }
            }
        }
    }
}

impl Handler for HttpHandler {
    fn name(&self) -> &str {
        "http"
    }

    fn options(&self) -> &HandlerOptions {
        &self.options
    }

    fn emit(&self, _record: &LogRecord, formatted: &LogRecord) -> Result<()> {
        let line = Self::render(formatted)?;
        match &self.mode {
            Mode::Inline(batcher) => batcher.lock().push(line),
            Mode::Background(worker) => match worker.sender.try_send(Command::Line(line)) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => Err(LoggerError::transport(
                    &self.endpoint,
                    "delivery channel full, record dropped",
                )),
                Err(TrySendError::Disconnected(_)) => Err(LoggerError::HandlerClosed("http".to_string())),
            },
        }
    }

    fn flush(&self) -> Result<()> {
        match &self.mode {
            Mode::Inline(batcher) => batcher.lock().drain(),
            Mode::Background(worker) => {
                let (ack, done) = bounded(1);
                if worker.sender.send(Command::Flush(ack)).is_err() {
                    return Ok(());
                }
                match done.recv_timeout(DEFAULT_TIMEOUT) {
                    Ok(result) => result,
                    Err(_) => Err(LoggerError::transport(&self.endpoint, "flush timed out")),
                }
            }
        }
    }

    fn close(&self) -> Result<()> {
        match &self.mode {
            Mode::Inline(batcher) => batcher.lock().drain(),
            Mode::Background(worker) => {
                let _ = worker.sender.send(Command::Shutdown);
                if let Some(handle) = worker.handle.lock().take() {
                    if handle.join().is_err() {
                        diagnostic("ERROR", "HTTP delivery worker panicked during shutdown");
                    }
                }
                Ok(())
            }
        }
    }
}

impl Drop for HttpHandler {
    fn drop(&mut self) {
        if let Mode::Background(worker) = &self.mode {
            let _ = worker.sender.send(Command::Shutdown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BasePolicy, EventKind, HandlerExt, LogLevel, LoggerEvent, RecordOptions};
    use crate::Logger;
    use flate2::read::GzDecoder;
    use std::io::{BufRead, BufReader, Read};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct MockTransport {
        bodies: Mutex<Vec<Vec<u8>>>,
        failing: AtomicBool,
        attempts: AtomicUsize,
    }

    impl HttpTransport for MockTransport {
        fn send(&self, body: &[u8], content_encoding: Option<&str>) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(LoggerError::transport("mock", "collector down"));
            }
            let body = match content_encoding {
                Some("gzip") => {
                    let mut plain = Vec::new();
                    GzDecoder::new(body).read_to_end(&mut plain)?;
                    plain
                }
                _ => body.to_vec(),
            };
            self.bodies.lock().push(body);
            Ok(())
        }

        fn endpoint(&self) -> &str {
            "mock"
        }
    }

    impl MockTransport {
        fn failing() -> Arc<Self> {
            let transport = Self::default();
            transport.failing.store(true, Ordering::SeqCst);
            Arc::new(transport)
        }

        fn lines(&self) -> Vec<String> {
            self.bodies
                .lock()
                .iter()
                .flat_map(|b| String::from_utf8_lossy(b).lines().map(str::to_string).collect::<Vec<_>>())
                .collect()
        }
    }

    fn record(msg: &str) -> LogRecord {
        LogRecord::create(
            RecordOptions::new(LogLevel::Info, msg)
                .base(BasePolicy::Omit)
                .timestamp(false),
        )
    }

    /// Request seen by [`serve_once`]
    struct Captured {
        request_line: String,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    }

    impl Captured {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Answer one request on a local port with `status`
    fn serve_once(status: &'static str) -> (String, thread::JoinHandle<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut headers = Vec::new();
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                if header == "\r\n" || header.is_empty() {
                    break;
                }
                if let Some((name, value)) = header.split_once(':') {
                    headers.push((name.trim().to_string(), value.trim().to_string()));
                }
            }
            let content_length = headers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
                .map(|(_, v)| v.parse().unwrap())
                .unwrap_or(0);
            let mut body = vec![0; content_length];
            reader.read_exact(&mut body).unwrap();
            let mut stream = stream;
            write!(stream, "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status)
                .unwrap();
            Captured {
                request_line,
                headers,
                body,
            }
        });
        (format!("http://{}/ingest", addr), server)
    }

    #[test]
    fn test_batches_by_size() {
        let transport = Arc::new(MockTransport::default());
        let handler = HttpHandler::with_transport(transport.clone())
            .with_batch_size(2)
            .build();

        for msg in ["a", "b", "c"] {
            handler.emit(&record(msg), &record(msg)).unwrap();
        }
        assert_eq!(transport.bodies.lock().len(), 1);
        assert_eq!(handler.pending(), 1);

        handler.flush().unwrap();
        assert_eq!(transport.lines().len(), 3);
        assert!(transport.lines()[2].contains("\"msg\":\"c\""));
    }

    #[test]
    fn test_failed_batches_are_reported_and_retried() {
        let transport = MockTransport::failing();
        let handler = HttpHandler::with_transport(transport.clone())
            .with_batch_size(1)
            .build();

        let err = handler.emit(&record("kept"), &record("kept")).unwrap_err();
        assert!(err.to_string().contains("collector down"));
        assert!(handler.flush().is_err());
        assert_eq!(handler.pending(), 1);

        transport.failing.store(false, Ordering::SeqCst);
        handler.flush().unwrap();
        assert_eq!(transport.lines().len(), 1);
        assert_eq!(handler.pending(), 0);
    }

    #[test]
    fn test_delivery_failure_raises_handler_error_event() {
        let transport = MockTransport::failing();
        let http = Arc::new(
            HttpHandler::with_transport(transport.clone())
                .with_batch_size(2)
                .with_retry_delay(Duration::ZERO, Duration::ZERO)
                .build(),
        );
        let logger = Logger::builder()
            .name("http_errors")
            .shared_handler(http.clone())
            .build()
            .unwrap();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let seen = errors.clone();
        logger.on(Some(EventKind::HandlerError), move |event| {
            if let LoggerEvent::HandlerError { handler, error, .. } = event {
                seen.lock().push((handler.clone(), error.clone()));
            }
        });

        for i in 0..10 {
            logger.info(format!("line {}", i));
        }

        let errors = errors.lock();
        assert!(!errors.is_empty());
        assert!(errors.iter().all(|(handler, _)| handler == "http"));
        assert!(errors[0].1.contains("collector down"));
        assert_eq!(http.pending(), 10);
        assert!(transport.lines().is_empty());
    }

    #[test]
    fn test_backoff_holds_back_further_attempts() {
        let transport = MockTransport::failing();
        let handler = HttpHandler::with_transport(transport.clone())
            .with_batch_size(1)
            .with_retry_delay(Duration::from_secs(60), Duration::from_secs(60))
            .build();

        assert!(handler.emit(&record("first"), &record("first")).is_err());
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);

        // Still waiting out the retry delay: queued, not sent, not an error.
        for msg in ["second", "third"] {
            handler.emit(&record(msg), &record(msg)).unwrap();
        }
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(handler.pending(), 3);

        // An explicit flush ignores the wait.
        transport.failing.store(false, Ordering::SeqCst);
        handler.flush().unwrap();
        assert_eq!(transport.lines().len(), 3);
    }

    #[test]
    fn test_backoff_doubles_and_is_capped() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(400));
        assert!(backoff.ready());

        let delays: Vec<Duration> = (0..5).map(|_| backoff.failed()).collect();
        let bounds = [100, 200, 400, 400, 400];
        for (delay, base) in delays.iter().zip(bounds) {
            assert!(*delay >= Duration::from_millis(base / 2), "{:?} below {}ms/2", delay, base);
            assert!(*delay <= Duration::from_millis(base * 3 / 2), "{:?} above {}ms*1.5", delay, base);
        }
        assert!(!backoff.ready());

        backoff.succeeded();
        assert!(backoff.ready());
        assert_eq!(backoff.failures, 0);
    }

    #[test]
    fn test_queue_overflow_sheds_oldest() {
        let transport = MockTransport::failing();
        let handler = HttpHandler::with_transport(transport.clone())
            .with_batch_size(10)
            .with_max_queue(2)
            .build();

        handler.emit(&record("1"), &record("1")).unwrap();
        handler.emit(&record("2"), &record("2")).unwrap();
        let err = handler.emit(&record("3"), &record("3")).unwrap_err();
        assert!(err.to_string().contains("dropped 1 oldest"));

        transport.failing.store(false, Ordering::SeqCst);
        handler.flush().unwrap();
        let lines = transport.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"msg\":\"2\""));
    }

    #[test]
    fn test_gzip_body() {
        let transport = Arc::new(MockTransport::default());
        let handler = HttpHandler::with_transport(transport.clone())
            .with_gzip(true)
            .build();
        handler.handle(&record("compressed"));
        handler.flush().unwrap();
        assert!(transport.lines()[0].contains("compressed"));
    }

    #[test]
    fn test_background_worker_delivers_on_flush() {
        let transport = Arc::new(MockTransport::default());
        let handler = HttpHandler::with_transport(transport.clone())
            .background(16)
            .build();
        for i in 0..5 {
            handler.handle(&record(&format!("bg{}", i)));
        }
        handler.flush().unwrap();
        assert_eq!(transport.lines().len(), 5);
        handler.close().unwrap();
    }

    #[test]
    fn test_background_worker_reports_failures() {
        let transport = MockTransport::failing();
        let http = Arc::new(
            HttpHandler::with_transport(transport.clone())
                .with_batch_size(1)
                .background(16)
                .build(),
        );
        let logger = Logger::builder()
            .name("http_worker_errors")
            .shared_handler(http.clone())
            .build()
            .unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        logger.on(Some(EventKind::HandlerError), move |event| {
            if let LoggerEvent::HandlerError { error, .. } = event {
                let _ = tx.send(error.clone());
            }
        });

        logger.info("never arrives");
        let error = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(error.contains("collector down"));
        http.close().unwrap();
    }

    #[test]
    fn test_reqwest_transport_posts_ndjson() {
        let (url, server) = serve_once("202 Accepted");
        let transport = ReqwestTransport::new(&url)
            .unwrap()
            .with_header("Authorization", "Bearer token-1")
            .unwrap();
        transport.send(b"{\"msg\":\"hi\"}\n", Some("gzip")).unwrap();

        let captured = server.join().unwrap();
        assert!(captured.request_line.starts_with("POST /ingest HTTP/1.1"));
        assert_eq!(captured.header("content-type"), Some("application/x-ndjson"));
        assert_eq!(captured.header("content-encoding"), Some("gzip"));
        assert_eq!(captured.header("authorization"), Some("Bearer token-1"));
        assert!(captured
            .header("user-agent")
            .is_some_and(|agent| agent.starts_with("structured_log_pipeline/")));
        assert_eq!(captured.body, b"{\"msg\":\"hi\"}\n");
    }

    #[test]
    fn test_reqwest_transport_rejects_error_status() {
        let (url, server) = serve_once("500 Internal Server Error");
        let transport = ReqwestTransport::new(&url).unwrap();
        let err = transport.send(b"{}\n", None).unwrap_err();
        assert!(err.to_string().contains("500"));
        server.join().unwrap();
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        assert!(ReqwestTransport::new("ftp://example.com").is_err());
        assert!(ReqwestTransport::new("http://").is_err());
        assert!(ReqwestTransport::new("not a url").is_err());
        assert!(ReqwestTransport::new("http://localhost").is_ok());
        assert!(ReqwestTransport::new("https://collector.example.com/v1/logs").is_ok());

        let transport = ReqwestTransport::new("http://localhost").unwrap();
        assert!(transport.clone().with_header("bad header", "x").is_err());
        assert!(transport.with_header("X-Api-Key", "line\nbreak").is_err());
    }
}
