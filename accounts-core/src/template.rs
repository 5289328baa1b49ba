//! Confirmation mail templates
//!
//! A template is parsed once and rendered per message. Placeholders are
//! written `{{ name }}` (the account's display name) and `{{ url }}` (the
//! confirmation link). Substituted values are HTML-escaped. Parsing only
//! checks structure; a placeholder that names an unknown field fails at
//! render time.

use crate::{Error, Result};

const FIELD_NAME: &str = "name";
const FIELD_URL: &str = "url";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(String),
}

/// Renders a notification body embedding a confirmation link
#[derive(Debug, Clone)]
pub struct ConfirmationTemplate {
    segments: Vec<Segment>,
    /// Page the link leads to; it calls back into the service with the id
    base_path: String,
}

impl ConfirmationTemplate {
    /// Parse a template whose links point at `base_path`
    pub fn new(source: &str, base_path: impl Into<String>) -> Result<Self> {
        Ok(Self {
            segments: parse(source)?,
            base_path: base_path.into(),
        })
    }

    /// Default account-creation confirmation body
    pub fn account_confirmation(base_path: impl Into<String>) -> Result<Self> {
        Self::new(DEFAULT_ACCOUNT_CONFIRMATION, base_path)
    }

    /// Default password-reset confirmation body
    pub fn password_reset(base_path: impl Into<String>) -> Result<Self> {
        Self::new(DEFAULT_PASSWORD_RESET, base_path)
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Build the link for a confirmation identifier
    pub fn confirmation_url(&self, confirmation_id: &str) -> String {
        format!("{}?id={}", self.base_path, confirmation_id)
    }

    /// Render the body for an account name and a confirmation link
    pub fn render(&self, account_name: &str, confirmation_url: &str) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(field) if field == FIELD_NAME => {
                    push_escaped(&mut out, account_name)
                }
                Segment::Field(field) if field == FIELD_URL => {
                    push_escaped(&mut out, confirmation_url)
                }
                Segment::Field(field) => {
                    return Err(Error::Template(format!("unknown field '{}'", field)))
                }
            }
        }
        Ok(out)
    }

    /// Render the body for an account name and a confirmation identifier
    pub fn render_for(&self, account_name: &str, confirmation_id: &str) -> Result<String> {
        self.render(account_name, &self.confirmation_url(confirmation_id))
    }
}

fn parse(source: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            segments.push(Segment::Text(rest[..start].to_string()));
        }
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| Error::Template("unclosed '{{'".into()))?;
        let field = after[..end].trim();
        if field.is_empty() {
            return Err(Error::Template("empty placeholder".into()));
        }
        segments.push(Segment::Field(field.to_string()));
        rest = &after[end + 2..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest.to_string()));
    }

    Ok(segments)
}

fn push_escaped(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

const DEFAULT_ACCOUNT_CONFIRMATION: &str = r#"<!DOCTYPE html>
<html>

<head>
    <link href="https://fonts.googleapis.com/css?family=Roboto:300,400" rel="stylesheet">
    <style>
        body {
            background-color: lightblue;
        }

        * {
            font-family: "Roboto", sans-serif;
            font-weight: 300;
        }

        div#main {
            max-width: 700px;
            background-color: white;
            margin: auto;
            padding: 80px;
            height: 95%;
        }
    </style>
</head>
<body>
    <div id='main'>
        <p> Hola {{ name }}, gracias por sumarte!</p>
        <p>
            Para confirmar tu alta como usuario, haz clic <a href='{{ url }}'>AQUÍ</a>.
        </p>

        <p id="rechazar">
            Si tú no has solicitado el alta de usuario puedes ignorar este mensaje.
        </p>
    </div>

    <br>
</body>
</html>
"#;

const DEFAULT_PASSWORD_RESET: &str = r#"<!DOCTYPE html>
<html>

<head>
    <link href="https://fonts.googleapis.com/css?family=Roboto:300,400" rel="stylesheet">
    <style>
        body {
            background-color: lightblue;
        }

        * {
            font-family: "Roboto", sans-serif;
            font-weight: 300;
        }

        div#main {
            max-width: 700px;
            background-color: white;
            margin: auto;
            padding: 80px;
            height: 95%;
        }
    </style>
</head>
<body>
    <div id='main'>
        <p> Hola {{ name }}!</p>
        <p>
            Para continuar con el proceso de blanqueo de contraseña, haz clic <a href='{{ url }}'>AQUÍ</a>.
        </p>

        <p id="rechazar">
            Si tú no has realizado la solicitud de blanqueo de contraseña puedes ignorar este mensaje.
        </p>
    </div>

    <br>
</body>
</html>
"#;
