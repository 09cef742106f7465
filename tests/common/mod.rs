use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;
use tiny_http::{Response, Server};

/// A request as seen by the mock server
#[derive(Clone, Debug)]
pub struct Recorded {
    pub url: String,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl Recorded {
    /// Decodes a form encoded body into its parameters
    pub fn form(&self) -> HashMap<String, String> {
        self.body.split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (
                urlencoding::decode(k).unwrap().into_owned(),
                urlencoding::decode(v).unwrap().into_owned(),
            ))
            .collect()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Local HTTP server answering every request through `respond`
pub struct MockServer {
    pub url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockServer {
    pub fn start<F>(respond: F) -> MockServer
    where
        F: Fn(&Recorded) -> (u16, String) + Send + 'static,
    {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();

        thread::spawn(move || {
            for mut request in server.incoming_requests() {
                let mut body = String::new();
                request.as_reader().read_to_string(&mut body).unwrap();

                let rec = Recorded {
                    url: request.url().to_string(),
                    body,
                    headers: request.headers().iter()
                        .map(|h| (h.field.to_string(), h.value.to_string()))
                        .collect(),
                };
                let (status, text) = respond(&rec);
                recorded.lock().unwrap().push(rec);

                let _ = request.respond(Response::from_string(text).with_status_code(status));
            }
        });

        MockServer { url: format!("http://127.0.0.1:{}", port), requests }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests carrying the given query API action
    pub fn actions(&self, action: &str) -> Vec<Recorded> {
        self.requests().into_iter()
            .filter(|r| r.form().get("Action").map(String::as_str) == Some(action))
            .collect()
    }
}
