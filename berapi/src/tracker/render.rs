use super::{StatusCategory, TrackedExchange};
use crate::context::Headers;
use serde_json::Value;
use std::{fmt::Write, time::Duration};

pub const NO_REQUESTS: &str = "No API requests tracked.";
const NO_BODY: &str = "No body";

pub fn to_text(exchanges: &[TrackedExchange]) -> String {
    if exchanges.is_empty() {
        return NO_REQUESTS.to_owned();
    }

    let mut out = String::new();
    for (number, exchange) in exchanges.iter().enumerate() {
        let _ = writeln!(
            out,
            "#{} {} {} -> {}",
            number + 1,
            exchange.request.method,
            exchange.request.url,
            outcome(exchange)
        );
        write_text_headers(&mut out, "Request headers", &exchange.request.headers);
        if let Some(body) = &exchange.request.body {
            write_text_block(&mut out, "Request body", &pretty_body(body));
        }

        if let Some(response) = &exchange.response {
            write_text_headers(&mut out, "Response headers", &response.headers);
            let body = response.body.as_deref().map(pretty_body);
            write_text_block(&mut out, "Response body", body.as_deref().unwrap_or(NO_BODY));
        }
        out.push('\n');
    }

    out
}

/// Markdown rendering, one `## Interaction` section per exchange.
pub fn to_markdown(exchanges: &[TrackedExchange]) -> String {
    if exchanges.is_empty() {
        return NO_REQUESTS.to_owned();
    }

    let mut out = String::new();
    for (number, exchange) in exchanges.iter().enumerate() {
        let request = &exchange.request;
        let _ = write!(
            out,
            "## Interaction {}: {} {}\n\n",
            number + 1,
            request.method,
            request.url
        );
        let _ = write!(out, "### Request headers recorded:\n\n```\n");
        for (key, value) in request.headers.iter() {
            let _ = writeln!(out, "{}: {}", key, value);
        }
        let _ = write!(out, "```\n\n");

        if let Some(body) = &request.body {
            let _ = write!(
                out,
                "### Request body recorded:\n\n```\n{}\n```\n\n",
                pretty_body(body)
            );
        }

        match (&exchange.response, &exchange.error) {
            (Some(response), _) => {
                let _ = write!(out, "### Response headers recorded:\n\n```\n");
                for (key, value) in response.headers.iter() {
                    let _ = writeln!(out, "{}: {}", key, value);
                }
                let _ = write!(out, "```\n\n");
                let _ = write!(
                    out,
                    "### Response body recorded ({}: {}):\n\n```\n{}\n```\n\n",
                    response.status,
                    response.headers.get("content-type").unwrap_or(""),
                    response
                        .body
                        .as_deref()
                        .map(pretty_body)
                        .unwrap_or_else(|| NO_BODY.to_owned())
                );
            }
            (None, Some(error)) => {
                let _ = write!(out, "### Transport error:\n\n```\n{}\n```\n\n", error);
            }
            (None, None) => {
                let _ = write!(out, "### Response pending\n\n");
            }
        }
    }

    out
}

pub fn to_html(exchanges: &[TrackedExchange]) -> String {
    if exchanges.is_empty() {
        return format!("<p style=\"color: #6c757d;\">{}</p>", NO_REQUESTS);
    }

    let mut out = String::new();
    for (number, exchange) in exchanges.iter().enumerate() {
        let request = &exchange.request;
        let (badge, color) = match exchange.status() {
            Some(status) => (status.to_string(), status_color(StatusCategory::from_status(status))),
            None if exchange.error.is_some() => ("error".to_owned(), "#dc3545"),
            None => ("pending".to_owned(), "#6c757d"),
        };

        let _ = write!(
            out,
            "<div class=\"berapi-exchange\" style=\"margin-bottom: 15px; border: 1px solid #dee2e6; border-radius: 6px;\">\
             <div style=\"background: #f8f9fa; padding: 10px;\">\
             <strong>#{}</strong> <span class=\"method\">{}</span> <code>{}</code> \
             <span class=\"status\" style=\"color: {};\">{}</span>",
            number + 1,
            escape(&request.method),
            escape(&request.url),
            color,
            escape(&badge)
        );
        if let Some(elapsed) = exchange.response.as_ref().and_then(|r| r.elapsed) {
            let _ = write!(out, " <span class=\"elapsed\">{}</span>", format_elapsed(elapsed));
        }
        out.push_str("</div>");

        let _ = write!(
            out,
            "<strong>Request Headers:</strong><pre>{}</pre>",
            escape(&headers_json(&request.headers))
        );
        if let Some(body) = &request.body {
            let _ = write!(out, "<strong>Request Body:</strong><pre>{}</pre>", escape(&pretty_body(body)));
        }

        let response_body = match (&exchange.response, &exchange.error) {
            (Some(response), _) => response
                .body
                .as_deref()
                .map(pretty_body)
                .unwrap_or_else(|| NO_BODY.to_owned()),
            (None, Some(error)) => error.clone(),
            (None, None) => NO_BODY.to_owned(),
        };
        let _ = write!(
            out,
            "<strong>Response Body:</strong><pre>{}</pre></div>",
            escape(&response_body)
        );
    }

    out
}

/// Indented JSON when `body` parses as JSON, otherwise the body unchanged.
pub fn pretty_body(body: &str) -> String {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return body.to_owned(),
    };

    match serde_json::to_string_pretty(&value) {
        Ok(pretty) => pretty,
        Err(_) => body.to_owned(),
    }
}

pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{} ms", elapsed.as_millis())
}

fn outcome(exchange: &TrackedExchange) -> String {
    match (&exchange.response, &exchange.error) {
        (Some(response), _) => {
            let category = StatusCategory::from_status(response.status);
            match response.elapsed {
                Some(elapsed) => format!("{} ({}, {})", response.status, category, format_elapsed(elapsed)),
                None => format!("{} ({})", response.status, category),
            }
        }
        (None, Some(error)) => format!("error: {}", error),
        (None, None) => "pending".to_owned(),
    }
}

fn write_text_headers(out: &mut String, title: &str, headers: &Headers) {
    if headers.is_empty() {
        return;
    }

    let _ = writeln!(out, "  {}:", title);
    for (key, value) in headers.iter() {
        let _ = writeln!(out, "    {}: {}", key, value);
    }
}

fn write_text_block(out: &mut String, title: &str, block: &str) {
    let _ = writeln!(out, "  {}:", title);
    for line in block.lines() {
        let _ = writeln!(out, "    {}", line);
    }
}

fn headers_json(headers: &Headers) -> String {
    let map: serde_json::Map<String, Value> = headers
        .iter()
        .map(|(key, value)| (key.to_owned(), Value::String(value.to_owned())))
        .collect();

    serde_json::to_string_pretty(&map).unwrap_or_default()
}

fn status_color(category: StatusCategory) -> &'static str {
    match category {
        StatusCategory::Success => "#28a745",
        StatusCategory::ClientError => "#ffc107",
        StatusCategory::ServerError => "#dc3545",
        StatusCategory::Neutral => "#6c757d",
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
