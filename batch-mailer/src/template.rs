//! Message body rendering and recipient validation.

use crate::data::{FieldValue, RecipientRow};

/// Greeting used when no template file is given.
pub fn fallback_greeting(recipient: &str) -> String {
    format!("Hello {recipient},\n\nThis is a message sent with batchmail.")
}

/// Render a message body for one row.
///
/// Every column of the row set whose `{column}` placeholder appears in the
/// template is replaced, at every occurrence, with that row's value.
/// Placeholders that name no column are left as they are.
pub fn render(template: Option<&str>, row: &RecipientRow, recipient: &str) -> String {
    let Some(template) = template else {
        return fallback_greeting(recipient);
    };

    let mut body = template.to_string();
    for (column, value) in row.fields() {
        let placeholder = format!("{{{column}}}");
        if template.contains(&placeholder) {
            body = body.replace(&placeholder, &value.to_string());
        }
    }
    body
}

/// A recipient is plausible when it is a text field containing `@`.
pub fn is_valid_recipient(value: &FieldValue) -> bool {
    value.as_text().is_some_and(|v| v.contains('@'))
}
