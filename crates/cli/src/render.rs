//! One-line text rendering of observed signals.

use fluxcall::{CallError, CallResult, Emission, Response, ResponseSource, Signal};

pub fn render(signal: &Signal<Emission<String>, CallError>) -> String {
    match signal {
        Signal::Next(Emission::Body(body)) => format!("next body: {body}"),
        Signal::Next(Emission::Response(response)) => {
            format!("next response: {}", response_line(response))
        }
        Signal::Next(Emission::Result(CallResult::Response(response))) => {
            format!("next result: {}", response_line(response))
        }
        Signal::Next(Emission::Result(CallResult::Error(error))) => {
            format!("next result: error {}", error_line(error))
        }
        Signal::Complete => "complete".to_string(),
        Signal::Error(error) => format!("error {}", error_line(error)),
    }
}

fn response_line(response: &Response<String>) -> String {
    let source = match response.source() {
        ResponseSource::Network => "network",
        ResponseSource::Fallback => "fallback",
    };
    let content = match (response.body(), response.error_body()) {
        (Some(body), _) => body.clone(),
        (None, Some(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
        (None, None) => String::new(),
    };
    format!(
        "{} {} [{source}] {content}",
        response.status().as_u16(),
        response.reason()
    )
    .trim_end()
    .to_string()
}

fn error_line(error: &CallError) -> String {
    format!("{}: {error}", error.as_label())
}
