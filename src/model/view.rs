use rocket::response::content::RawHtml;

use crate::config::Options;

use super::vote::Choice;

/// Render the voting page.
///
/// `vote` is the choice the requester has just cast, if any. It is shown once
/// and not remembered for later requests.
pub fn render(options: &Options, hostname: &str, vote: Option<Choice>) -> RawHtml<String> {
    let a = escape(options.label(Choice::A));
    let b = escape(options.label(Choice::B));
    let button = |choice: Choice, label: &str| {
        let disabled = if vote == Some(choice) { " disabled" } else { "" };
        format!(
            r#"<button id="{key}" type="submit" name="vote" class="{key}" value="{key}"{disabled}>{label}</button>"#,
            key = choice.key(),
        )
    };
    let voted = vote
        .map(|choice| {
            format!(
                r#"<p id="voted" data-vote="{}">You voted for {}</p>"#,
                choice.key(),
                escape(options.label(choice))
            )
        })
        .unwrap_or_default();

    RawHtml(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{a} vs {b}!</title>
</head>
<body>
<div id="content-container">
<h3>{a} vs {b}!</h3>
<form id="choice" name="form" method="POST" action="/">
{button_a}
{button_b}
</form>
{voted}
<div id="tip">(Tip: you can change your vote)</div>
<div id="hostname">Processed by container ID {hostname}</div>
</div>
</body>
</html>
"#,
        button_a = button(Choice::A, &a),
        button_b = button(Choice::B, &b),
        hostname = escape(hostname),
    ))
}

/// Escape text for use in HTML element content and quoted attributes.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}
