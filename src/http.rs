//! Blocking HTTP plumbing shared by the provider clients.
use reqwest::blocking::{Client, RequestBuilder, Response};
use std::time::Duration;

/// Upper bound on `HttpPolicy::retries`.
pub const MAX_RETRIES: u32 = 1;

/// Bounds every request of one client.
#[derive(Debug, Clone, Copy)]
pub struct HttpPolicy {
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for HttpPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retries: MAX_RETRIES,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl HttpPolicy {
    pub fn build_client(&self, user_agent: &str) -> reqwest::Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .user_agent(user_agent)
            .build()
    }

    /// Send the request built by `make`, retrying transport errors and
    /// 5xx responses up to `retries` extra times (at most `MAX_RETRIES`).
    pub fn send(
        &self,
        what: &str,
        make: impl Fn() -> RequestBuilder,
    ) -> reqwest::Result<Response> {
        let attempts = self.retries.min(MAX_RETRIES).saturating_add(1);
        let mut attempt = 1;
        loop {
            let result = make().send().and_then(Response::error_for_status);
            match result {
                Ok(response) => return Ok(response),
                Err(e) if attempt < attempts && is_transient(&e) => {
                    log::warn!(
                        "{}: attempt {}/{} failed: {}",
                        what,
                        attempt,
                        attempts,
                        e
                    );
                    std::thread::sleep(self.retry_delay);
                    attempt += 1;
                }
                Err(e) => {
                    log::error!("{}: giving up after {} attempts: {}", what, attempt, e);
                    return Err(e);
                }
            }
        }
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        return true;
    }
    err.status().is_some_and(|s| s.is_server_error())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Local server answering every request with `status_line`.
    /// Returns the base URL and the number of requests served so far.
    fn serve(status_line: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let served = Arc::new(AtomicUsize::new(0));
        let counter = served.clone();

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut line = String::new();
                while reader.read_line(&mut line).map(|n| n > 0).unwrap_or(false) {
                    if line == "\r\n" {
                        break;
                    }
                    line.clear();
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = write!(
                    stream,
                    "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status_line
                );
                let _ = stream.flush();
            }
        });

        (url, served)
    }

    fn quick_policy(retries: u32) -> HttpPolicy {
        HttpPolicy {
            timeout: Duration::from_secs(5),
            retries,
            retry_delay: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_server_error_is_retried_once() {
        let (url, served) = serve("503 Service Unavailable");
        let policy = quick_policy(1);
        let client = policy.build_client("sat-pass-tests").unwrap();

        let err = policy.send("status", || client.get(&url)).unwrap_err();

        assert_eq!(err.status().map(|s| s.as_u16()), Some(503));
        assert_eq!(served.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_client_error_is_not_retried() {
        let (url, served) = serve("404 Not Found");
        let policy = quick_policy(1);
        let client = policy.build_client("sat-pass-tests").unwrap();

        let err = policy.send("status", || client.get(&url)).unwrap_err();

        assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
        assert_eq!(served.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_success_needs_one_attempt() {
        let (url, served) = serve("200 OK");
        let policy = quick_policy(1);
        let client = policy.build_client("sat-pass-tests").unwrap();

        let response = policy.send("status", || client.get(&url)).unwrap();

        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(served.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retries_are_capped() {
        let (url, served) = serve("500 Internal Server Error");
        let policy = quick_policy(u32::MAX);
        let client = policy.build_client("sat-pass-tests").unwrap();

        assert!(policy.send("status", || client.get(&url)).is_err());
        assert_eq!(served.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_retries_means_single_attempt() {
        let (url, served) = serve("503 Service Unavailable");
        let policy = quick_policy(0);
        let client = policy.build_client("sat-pass-tests").unwrap();

        assert!(policy.send("status", || client.get(&url)).is_err());
        assert_eq!(served.load(Ordering::SeqCst), 1);
    }
}
