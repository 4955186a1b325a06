use chrono::Local;
use common::Paste;

const PREVIEW_CHARS: usize = 60;
const SHORT_ID_LEN: usize = 8;

/// Last eight hex digits of the id, taken from the random part of a UUIDv7.
pub fn short_id(paste: &Paste) -> String {
    let simple = paste.id.simple().to_string();
    simple[simple.len() - SHORT_ID_LEN..].to_string()
}

/// One line of text, at most `max_chars` characters.
pub fn preview(text: &str, max_chars: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::new();
    for (index, ch) in single_line.chars().enumerate() {
        if index >= max_chars {
            out.push('…');
            break;
        }
        out.push(ch);
    }
    out
}

pub fn paste_line(paste: &Paste) -> String {
    let body = if paste.is_image() {
        format!("[image] {}", paste.content)
    } else {
        preview(&paste.content, PREVIEW_CHARS)
    };
    line(paste, &body)
}

/// Inline placeholder for an image whose blob cannot be fetched.
pub fn unavailable_image_line(paste: &Paste) -> String {
    line(paste, &format!("[image unavailable] {}", paste.content))
}

fn line(paste: &Paste, body: &str) -> String {
    let when = paste
        .created_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S");
    format!("{}  {when}  {body}", short_id(paste))
}

pub fn paste_count(count: usize) -> String {
    match count {
        1 => "1 paste".to_string(),
        n => format!("{n} pastes"),
    }
}
