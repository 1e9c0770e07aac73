//! Click-to-chat links for the admin WhatsApp number.

use reqwest::Url;

/// `https://wa.me/<digits>?text=<message>`; `None` when the number has no digits.
pub fn whatsapp_link(number: &str, message: &str) -> Option<String> {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let base = format!("https://wa.me/{}", digits);
    Url::parse_with_params(&base, &[("text", message)])
        .ok()
        .map(String::from)
}
