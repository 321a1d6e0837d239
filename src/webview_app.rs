use crate::types::InputEvent;
use crossbeam_channel::Sender;
use log::debug;
use tao::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};
use wry::WebViewBuilder;

/// Open a native WebView window loading the visualization page at `url`.
///
/// Inside the webview the page posts its key/pointer input over the IPC
/// bridge (`window.ipc.postMessage`) instead of the WebSocket; those
/// messages are forwarded to the frame driver on `input_tx`.
///
/// Runs the tao event loop on the current thread and never returns
/// (exits the process when the window is closed).
pub fn run(url: &str, input_tx: Sender<InputEvent>) -> ! {
    let event_loop = EventLoop::new();

    // 720x540 canvas plus a little room for the status line
    let window = WindowBuilder::new()
        .with_title("Helix Dyads")
        .with_inner_size(tao::dpi::LogicalSize::new(760_u32, 600_u32))
        .with_min_inner_size(tao::dpi::LogicalSize::new(480_u32, 400_u32))
        .build(&event_loop)
        .expect("Failed to create window");

    let _webview = WebViewBuilder::new()
        .with_url(url)
        .with_ipc_handler(move |req| {
            let body = req.body();
            match serde_json::from_str::<InputEvent>(body) {
                Ok(ev) => {
                    let _ = input_tx.send(ev);
                }
                Err(e) => debug!("Ignoring IPC message {:?}: {}", body, e),
            }
        })
        .build(&window)
        .expect("Failed to create WebView");

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;
        if let Event::WindowEvent {
            event: WindowEvent::CloseRequested,
            ..
        } = event
        {
            *control_flow = ControlFlow::Exit;
        }
    })
}
