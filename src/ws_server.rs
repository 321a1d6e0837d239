use crate::types::{InputEvent, SceneFrame};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};
use sha1_smol::Sha1;
use std::fs;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Combined HTTP + WebSocket server.
///
/// - `GET /` or `GET /visualization.html` → serves the viz page
/// - WebSocket upgrade → streams SceneFrame JSON at throttled rate, and
///   forwards `{"type":"toggle"}` / `{"type":"pointer",…}` messages from the
///   page back to the frame driver
///
/// Single port, no separate HTTP server needed.
pub struct WsServer {
    frame_rx: Receiver<SceneFrame>,
    input_tx: Sender<InputEvent>,
    addr: String,
    target_fps: u32,
    viz_path: PathBuf,
}

struct WsClient {
    stream: TcpStream,
    alive: bool,
    inbox: Vec<u8>,
}

impl WsClient {
    fn new(stream: TcpStream) -> Self {
        let _ = stream.set_nonblocking(true);
        let _ = stream.set_nodelay(true);
        Self {
            stream,
            alive: true,
            inbox: Vec::new(),
        }
    }

    /// Read whatever the browser has sent and return complete text messages.
    fn poll_text(&mut self) -> Vec<String> {
        let mut buf = [0u8; 4096];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => {
                    self.alive = false;
                    break;
                }
                Ok(n) => self.inbox.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(_) => {
                    self.alive = false;
                    break;
                }
            }
        }

        let mut out = Vec::new();
        loop {
            let (frame, used) = match decode_client_frame(&self.inbox) {
                Ok(Some(decoded)) => decoded,
                Ok(None) => break,
                Err(OversizedFrame(len)) => {
                    warn!("Dropping client: frame of {} bytes exceeds {}", len, MAX_CLIENT_PAYLOAD);
                    self.alive = false;
                    self.inbox.clear();
                    break;
                }
            };
            self.inbox.drain(..used);
            match frame.opcode {
                0x1 => out.push(String::from_utf8_lossy(&frame.payload).into_owned()),
                0x8 => {
                    self.alive = false;
                    break;
                }
                _ => {} // ping/pong/binary ignored
            }
        }
        out
    }

    fn send_text(&mut self, text: &str) -> bool {
        let payload = text.as_bytes();
        let len = payload.len();
        let mut frame = Vec::with_capacity(10 + len);
        frame.push(0x81); // FIN + text opcode
        if len < 126 {
            frame.push(len as u8);
        } else if len < 65536 {
            frame.push(126);
            frame.push((len >> 8) as u8);
            frame.push((len & 0xFF) as u8);
        } else {
            frame.push(127);
            for i in (0..8).rev() {
                frame.push(((len >> (i * 8)) & 0xFF) as u8);
            }
        }
        frame.extend_from_slice(payload);
        match self.stream.write_all(&frame) {
            Ok(()) => true,
            Err(_) => {
                self.alive = false;
                false
            }
        }
    }
}

type ClientList = Arc<Mutex<Vec<WsClient>>>;

struct ClientFrame {
    opcode: u8,
    payload: Vec<u8>,
}

/// Largest client payload accepted. Input messages are tiny JSON objects.
const MAX_CLIENT_PAYLOAD: usize = 64 * 1024;

/// A client announced a payload longer than `MAX_CLIENT_PAYLOAD`.
#[derive(Debug, PartialEq)]
struct OversizedFrame(u64);

/// Decode one masked client→server frame from the front of `buf`.
/// Returns the frame and the number of bytes it occupied, or None if the
/// buffer does not yet hold a complete frame.
fn decode_client_frame(buf: &[u8]) -> Result<Option<(ClientFrame, usize)>, OversizedFrame> {
    if buf.len() < 2 {
        return Ok(None);
    }
    let opcode = buf[0] & 0x0F;
    let masked = buf[1] & 0x80 != 0;
    let mut len = (buf[1] & 0x7F) as u64;
    let mut pos = 2;
    if len == 126 {
        if buf.len() < pos + 2 {
            return Ok(None);
        }
        len = ((buf[2] as u64) << 8) | buf[3] as u64;
        pos += 2;
    } else if len == 127 {
        if buf.len() < pos + 8 {
            return Ok(None);
        }
        len = buf[pos..pos + 8]
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64);
        pos += 8;
    }
    if len > MAX_CLIENT_PAYLOAD as u64 {
        return Err(OversizedFrame(len));
    }
    let len = len as usize;
    let mask = if masked {
        if buf.len() < pos + 4 {
            return Ok(None);
        }
        let m = [buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]];
        pos += 4;
        Some(m)
    } else {
        None
    };
    let end = match pos.checked_add(len) {
        Some(end) if end <= buf.len() => end,
        _ => return Ok(None),
    };
    let mut payload = buf[pos..end].to_vec();
    if let Some(m) = mask {
        for (i, b) in payload.iter_mut().enumerate() {
            *b ^= m[i % 4];
        }
    }
    Ok(Some((ClientFrame { opcode, payload }, end)))
}

/// Parse a browser input message. Unknown messages are ignored.
fn parse_input(text: &str) -> Option<InputEvent> {
    match serde_json::from_str::<InputEvent>(text) {
        Ok(ev) => Some(ev),
        Err(e) => {
            debug!("Ignoring client message {:?}: {}", text, e);
            None
        }
    }
}

/// Parsed HTTP request — enough to decide WS vs HTTP.
struct HttpRequest {
    path: String,
    ws_key: Option<String>,
}

fn parse_request(stream: &mut TcpStream) -> Result<HttpRequest, String> {
    let mut reader = BufReader::new(stream.try_clone().map_err(|e| e.to_string())?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).map_err(|e| e.to_string())?;
    // "GET /path HTTP/1.1"
    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();

    let mut is_upgrade = false;
    let mut ws_key = None;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).map_err(|e| e.to_string())?;
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "upgrade" => is_upgrade = value.to_ascii_lowercase().contains("websocket"),
            "sec-websocket-key" => ws_key = Some(value.trim().to_string()),
            _ => {}
        }
    }
    Ok(HttpRequest {
        path,
        ws_key: if is_upgrade { ws_key } else { None },
    })
}

fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11");
    base64_encode(&hasher.digest().bytes())
}

fn ws_handshake(stream: &mut TcpStream, key: &str) -> Result<(), String> {
    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\
         \r\n",
        accept_key(key)
    );
    stream
        .write_all(response.as_bytes())
        .map_err(|e| e.to_string())
}

fn respond(stream: &mut TcpStream, status: &str, content_type: &str, body: &[u8]) {
    let header = format!(
        "HTTP/1.1 {}\r\n\
         Content-Type: {}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         Cache-Control: no-cache\r\n\
         \r\n",
        status,
        content_type,
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(body);
}

fn serve_404(stream: &mut TcpStream) {
    respond(
        stream,
        "404 Not Found",
        "text/html",
        b"<h1>404</h1><p>Open <a href=\"/\">/</a> for the helix</p>",
    );
}

fn content_type_for(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn base64_encode(data: &[u8]) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let n = chunk
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, &b)| acc | (b as u32) << (16 - 8 * i));
        for i in 0..4 {
            if i <= chunk.len() {
                out.push(CHARS[((n >> (18 - 6 * i)) & 0x3F) as usize] as char);
            } else {
                out.push('=');
            }
        }
    }
    out
}

/// Serve one incoming connection: either upgrade it to a WebSocket client
/// or answer a single HTTP GET and close.
fn handle_connection(mut stream: TcpStream, clients: ClientList, html: Arc<Vec<u8>>, static_dir: Arc<PathBuf>) {
    let req = match parse_request(&mut stream) {
        Ok(r) => r,
        Err(e) => {
            warn!("Request parse error: {}", e);
            return;
        }
    };

    if let Some(key) = req.ws_key {
        match ws_handshake(&mut stream, &key) {
            Ok(()) => {
                info!("WebSocket client connected");
                clients.lock().unwrap_or_else(|e| e.into_inner()).push(WsClient::new(stream));
            }
            Err(e) => warn!("WS handshake failed: {}", e),
        }
        return;
    }

    match req.path.as_str() {
        "/" | "/visualization.html" | "/index.html" if !html.is_empty() => {
            respond(&mut stream, "200 OK", "text/html; charset=utf-8", &html);
        }
        path => {
            // Siblings of the viz page only; no traversal
            let clean = path.trim_start_matches('/');
            if clean.is_empty() || clean.contains("..") || clean.contains('\\') {
                serve_404(&mut stream);
                return;
            }
            match fs::read(static_dir.join(clean)) {
                Ok(data) => respond(&mut stream, "200 OK", content_type_for(clean), &data),
                Err(_) => serve_404(&mut stream),
            }
        }
    }
}

impl WsServer {
    pub fn new(
        frame_rx: Receiver<SceneFrame>,
        input_tx: Sender<InputEvent>,
        addr: String,
        target_fps: u32,
        viz_path: PathBuf,
    ) -> Self {
        Self {
            frame_rx,
            input_tx,
            addr,
            target_fps,
            viz_path,
        }
    }

    pub fn run(self) {
        let clients: ClientList = Arc::new(Mutex::new(Vec::new()));

        // Pre-load the visualization HTML
        let viz_html = match fs::read(&self.viz_path) {
            Ok(data) => {
                info!(
                    "Loaded visualization: {} ({} bytes)",
                    self.viz_path.display(),
                    data.len()
                );
                Arc::new(data)
            }
            Err(e) => {
                warn!(
                    "Could not load {}: {} — HTTP serving disabled",
                    self.viz_path.display(),
                    e
                );
                Arc::new(Vec::new())
            }
        };

        // Base directory for serving static assets (siblings of visualization.html)
        let base_dir: Arc<PathBuf> = Arc::new(
            self.viz_path
                .parent()
                .unwrap_or(std::path::Path::new("."))
                .to_path_buf(),
        );

        // Spawn acceptor thread
        let accept_clients = clients.clone();
        let addr = self.addr.clone();
        let html = viz_html.clone();
        let static_dir = base_dir.clone();
        thread::Builder::new()
            .name("ws-accept".into())
            .spawn(move || {
                let listener = match TcpListener::bind(&addr) {
                    Ok(l) => l,
                    Err(e) => {
                        error!("Server failed to bind {}: {}", addr, e);
                        return;
                    }
                };
                info!("Server listening on http://{}", addr);
                info!("  Open http://{} in your browser", addr);

                for stream in listener.incoming() {
                    match stream {
                        Ok(stream) => {
                            let cl = accept_clients.clone();
                            let html = html.clone();
                            let sdir = static_dir.clone();
                            // Short-lived per connection; WS streams move to the client list
                            thread::spawn(move || handle_connection(stream, cl, html, sdir));
                        }
                        Err(e) => warn!("TCP accept error: {}", e),
                    }
                }
            })
            .unwrap();

        // Broadcast loop; also the only reader of client input
        let frame_interval = Duration::from_micros(1_000_000 / self.target_fps.max(1) as u64);
        let mut last_send = Instant::now();

        for frame in self.frame_rx.iter() {
            let mut cl = clients.lock().unwrap_or_else(|e| e.into_inner());
            for client in cl.iter_mut() {
                for text in client.poll_text() {
                    if let Some(ev) = parse_input(&text) {
                        let _ = self.input_tx.send(ev);
                    }
                }
            }
            cl.retain(|c| c.alive);

            let now = Instant::now();
            if now.duration_since(last_send) < frame_interval {
                continue;
            }
            last_send = now;

            let json = match serde_json::to_string(&frame) {
                Ok(j) => j,
                Err(e) => {
                    warn!("JSON serialize error: {}", e);
                    continue;
                }
            };

            for client in cl.iter_mut() {
                client.send_text(&json);
            }
            cl.retain(|c| c.alive);
        }
        info!("Server broadcast loop shutting down");
    }
}
