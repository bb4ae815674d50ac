//! Email text via mail-parser: header summary then body parts

use anyhow::{anyhow, Context};
use mail_parser::{Address, MessageParser, PartType};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<]+?>").expect("valid tag pattern"));

pub fn extract(path: &Path) -> anyhow::Result<String> {
    let raw = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    extract_from_bytes(&raw)
}

pub fn extract_from_bytes(raw: &[u8]) -> anyhow::Result<String> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| anyhow!("not a valid RFC 822 message"))?;

    let mut lines = vec![
        format!("From: {}", format_address(message.from())),
        format!("To: {}", format_address(message.to())),
        format!("Subject: {}", message.subject().unwrap_or("No Subject")),
        format!(
            "Date: {}",
            message
                .date()
                .map(|d| d.to_rfc822())
                .unwrap_or_else(|| "Unknown".to_string())
        ),
        String::new(),
    ];

    for part in &message.parts {
        match &part.body {
            PartType::Text(text) if !text.is_empty() => lines.push(text.to_string()),
            PartType::Html(html) if !html.is_empty() => lines.push(strip_tags(html)),
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}

fn format_address(address: Option<&Address<'_>>) -> String {
    let Some(address) = address else {
        return "Unknown".to_string();
    };

    let rendered: Vec<String> = match address.as_list() {
        Some(list) => list.iter().map(format_addr).collect(),
        None => address.first().map(format_addr).into_iter().collect(),
    };

    if rendered.is_empty() {
        "Unknown".to_string()
    } else {
        rendered.join(", ")
    }
}

fn format_addr(addr: &mail_parser::Addr<'_>) -> String {
    match (addr.name(), addr.address()) {
        (Some(name), Some(email)) => format!("{} <{}>", name, email),
        (None, Some(email)) => email.to_string(),
        (Some(name), None) => name.to_string(),
        (None, None) => String::new(),
    }
}

/// Drop markup tags, keep text between them
pub fn strip_tags(html: &str) -> String {
    HTML_TAG.replace_all(html, "").into_owned()
}
