// ── Form fragment model ──
//
// The Form Service hands back server-rendered `<form>` markup. This module
// lifts the parts the engine cares about (named controls, their values,
// select options, required/disabled flags) into a `FormDocument`, applies
// edits and error markings to it, and serializes it with the same rules a
// browser uses to build `FormData`.

use std::collections::HashMap;
use std::sync::LazyLock;

use estatedesk_api::{FieldErrors, FormPayload, NON_FIELD_ERRORS};
use regex::Regex;
use thiserror::Error;
use tracing::trace;

static CONTROL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<input\b([^>]*)>|<select\b([^>]*)>(.*?)</select\s*>|<textarea\b([^>]*)>(.*?)</textarea\s*>",
    )
    .expect("control regex is valid")
});

static OPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<option\b([^>]*)>(.*?)</option\s*>")
        .expect("option regex is valid")
});

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<label\b([^>]*)>(.*?)</label\s*>").expect("label regex is valid")
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute regex is valid")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex is valid"));

/// Controls of one property owner row, each suffixed `_<row>`.
pub const OWNER_ROW_FIELDS: [&str; 4] = ["owner_id", "owner_name", "owner_phone", "owner_ratio"];

/// Hidden input carrying the number of owner rows.
pub const OWNERS_COUNT_FIELD: &str = "owners_count";

// ── Errors ──────────────────────────────────────────────────────────

/// Edits that the mounted form refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("form has no field named '{0}'")]
    UnknownField(String),

    #[error("field '{field}' does not offer the option '{value}'")]
    UnknownOption { field: String, value: String },

    #[error("field '{0}' is disabled")]
    Disabled(String),

    #[error("a property needs at least one owner")]
    LastOwnerRow,
}

// ── Fields ──────────────────────────────────────────────────────────

/// Broad control category. `input_type` on the field keeps the raw type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum FieldKind {
    Input,
    Hidden,
    Checkbox,
    Radio,
    File,
    Select,
    Textarea,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
    pub disabled: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            selected: false,
            disabled: false,
        }
    }
}

/// One named control of the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub id: Option<String>,
    pub kind: FieldKind,
    /// Raw `type` attribute for inputs (`text`, `date`, `number`, ...).
    pub input_type: String,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    /// Current value. For checkboxes and radios this is the submitted
    /// value, and `checked` says whether it is submitted at all.
    pub value: String,
    pub checked: bool,
    pub multiple: bool,
    pub options: Vec<SelectOption>,
    pub required: bool,
    pub disabled: bool,
    pub readonly: bool,
    pub invalid: bool,
    pub error: Option<String>,
}

impl Field {
    fn blank(name: String, kind: FieldKind) -> Self {
        Self {
            name,
            id: None,
            kind,
            input_type: String::new(),
            label: None,
            placeholder: None,
            value: String::new(),
            checked: false,
            multiple: false,
            options: Vec::new(),
            required: false,
            disabled: false,
            readonly: false,
            invalid: false,
            error: None,
        }
    }

    /// Label text, falling back to the field name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Whether the user fills this field in (not hidden, not a file).
    pub fn is_editable(&self) -> bool {
        !matches!(self.kind, FieldKind::Hidden | FieldKind::File) && !self.disabled && !self.readonly
    }

    /// Values this field contributes to a submission.
    fn submitted_values(&self) -> Vec<String> {
        if self.disabled {
            return Vec::new();
        }
        match self.kind {
            FieldKind::Checkbox | FieldKind::Radio => {
                if self.checked {
                    vec![if self.value.is_empty() {
                        "on".to_owned()
                    } else {
                        self.value.clone()
                    }]
                } else {
                    Vec::new()
                }
            }
            FieldKind::Select => {
                let selected: Vec<String> = self
                    .options
                    .iter()
                    .filter(|o| o.selected && !o.disabled)
                    .map(|o| o.value.clone())
                    .collect();
                if !selected.is_empty() || self.multiple {
                    return selected;
                }
                // A single select with nothing marked submits its first
                // enabled option.
                self.options
                    .iter()
                    .find(|o| !o.disabled)
                    .map(|o| vec![o.value.clone()])
                    .unwrap_or_default()
            }
            FieldKind::File => Vec::new(),
            FieldKind::Input | FieldKind::Hidden | FieldKind::Textarea => vec![self.value.clone()],
        }
    }

    /// Current value as the user sees it (selected option values, joined).
    pub fn current_value(&self) -> String {
        match self.kind {
            FieldKind::Checkbox | FieldKind::Radio if !self.checked => String::new(),
            _ => self.submitted_values().join(","),
        }
    }
}

// ── Document ────────────────────────────────────────────────────────

/// Parsed form fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormDocument {
    fields: Vec<Field>,
    form_errors: Vec<String>,
}

impl FormDocument {
    /// Parse the named controls out of a form fragment.
    ///
    /// Controls without a `name` are ignored, as are buttons; neither
    /// contributes to a submission.
    pub fn parse(html: &str) -> Self {
        let labels = parse_labels(html);
        let mut fields = Vec::new();

        for caps in CONTROL_RE.captures_iter(html) {
            let field = if let Some(attrs) = caps.get(1) {
                parse_input(attrs.as_str())
            } else if let (Some(attrs), Some(body)) = (caps.get(2), caps.get(3)) {
                parse_select(attrs.as_str(), body.as_str())
            } else if let (Some(attrs), Some(body)) = (caps.get(4), caps.get(5)) {
                parse_textarea(attrs.as_str(), body.as_str())
            } else {
                None
            };

            if let Some(mut field) = field {
                field.label = field.id.as_ref().and_then(|id| labels.get(id).cloned());
                trace!(name = %field.name, kind = %field.kind, "parsed form control");
                fields.push(field);
            }
        }

        Self {
            fields,
            form_errors: Vec::new(),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// First field named `name`.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Form-level (non-field) error messages from the last failed submit.
    pub fn form_errors(&self) -> &[String] {
        &self.form_errors
    }

    /// Distinct field names, in document order.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for field in &self.fields {
            if !names.contains(&field.name.as_str()) {
                names.push(&field.name);
            }
        }
        names
    }

    /// Value of a hidden input, e.g. `csrfmiddlewaretoken`.
    pub fn hidden_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.kind == FieldKind::Hidden && f.name == name)
            .map(|f| f.value.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Current value of the first field named `name`.
    pub fn value(&self, name: &str) -> Option<String> {
        let group: Vec<&Field> = self.fields.iter().filter(|f| f.name == name).collect();
        if group.is_empty() {
            return None;
        }
        // Radio groups: the checked member's value.
        if group.iter().all(|f| f.kind == FieldKind::Radio) {
            return Some(
                group
                    .iter()
                    .find(|f| f.checked)
                    .map(|f| f.value.clone())
                    .unwrap_or_default(),
            );
        }
        group.first().map(|f| f.current_value())
    }

    /// Serialize with `FormData` rules: document order, disabled controls
    /// skipped, unchecked boxes skipped, every selected option submitted.
    pub fn serialize(&self) -> FormPayload {
        let mut payload = FormPayload::new();
        for field in &self.fields {
            for value in field.submitted_values() {
                payload.push(field.name.clone(), value);
            }
        }
        payload
    }

    /// Set a field from user input.
    ///
    /// Selects take an option value (comma-separated for multi-selects),
    /// checkboxes take a truthy string, radios check the group member with
    /// the matching value.
    pub fn set_value(&mut self, name: &str, value: &str) -> Result<(), FormError> {
        let indices: Vec<usize> = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.name == name)
            .map(|(i, _)| i)
            .collect();

        let Some(&first) = indices.first() else {
            return Err(FormError::UnknownField(name.to_owned()));
        };

        if indices.iter().all(|&i| self.fields[i].disabled) {
            return Err(FormError::Disabled(name.to_owned()));
        }

        match self.fields[first].kind {
            FieldKind::Radio => {
                if !indices.iter().any(|&i| self.fields[i].value == value) {
                    return Err(FormError::UnknownOption {
                        field: name.to_owned(),
                        value: value.to_owned(),
                    });
                }
                for &i in &indices {
                    let field = &mut self.fields[i];
                    field.checked = field.value == value;
                }
            }
            FieldKind::Checkbox => {
                let on = matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "1" | "on" | "true" | "yes" | "y"
                );
                self.fields[first].checked = on;
            }
            FieldKind::Select => {
                let field = &mut self.fields[first];
                let wanted: Vec<&str> = if field.multiple {
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .collect()
                } else {
                    vec![value]
                };
                if let Some(missing) = wanted
                    .iter()
                    .find(|w| !field.options.iter().any(|o| o.value == **w))
                {
                    return Err(FormError::UnknownOption {
                        field: name.to_owned(),
                        value: (*missing).to_owned(),
                    });
                }
                for option in &mut field.options {
                    option.selected = wanted.contains(&option.value.as_str());
                }
            }
            FieldKind::Input | FieldKind::Hidden | FieldKind::Textarea | FieldKind::File => {
                value.clone_into(&mut self.fields[first].value);
            }
        }
        Ok(())
    }

    /// Replace the options of a select, keeping the current selection when
    /// it is still offered.
    pub fn replace_options(
        &mut self,
        name: &str,
        options: Vec<SelectOption>,
    ) -> Result<(), FormError> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.name == name && f.kind == FieldKind::Select)
            .ok_or_else(|| FormError::UnknownField(name.to_owned()))?;

        let previous: Vec<String> = field
            .options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value.clone())
            .collect();

        field.options = options;
        for option in &mut field.options {
            if previous.contains(&option.value) {
                option.selected = true;
            }
        }
        Ok(())
    }

    pub fn set_disabled(&mut self, name: &str, disabled: bool) -> Result<(), FormError> {
        let mut found = false;
        for field in self.fields.iter_mut().filter(|f| f.name == name) {
            field.disabled = disabled;
            found = true;
        }
        if found {
            Ok(())
        } else {
            Err(FormError::UnknownField(name.to_owned()))
        }
    }

    /// Toggle `required` on every field named `name`. Unknown names are
    /// ignored.
    pub fn set_required(&mut self, name: &str, required: bool) {
        for field in self.fields.iter_mut().filter(|f| f.name == name) {
            field.required = required;
        }
    }

    /// Clear previous markings, then mark each field named in `errors`.
    ///
    /// Errors for names the form doesn't contain (including the non-field
    /// key) are kept as form-level errors so nothing the server said is
    /// dropped.
    pub fn apply_field_errors(&mut self, errors: &FieldErrors) {
        self.clear_errors();

        for (name, message) in errors {
            let mut marked = false;
            for field in self.fields.iter_mut().filter(|f| &f.name == name) {
                field.invalid = true;
                if !marked {
                    field.error = Some(message.clone());
                }
                marked = true;
            }
            if !marked {
                if name == NON_FIELD_ERRORS {
                    self.form_errors.push(message.clone());
                } else {
                    self.form_errors.push(format!("{name}: {message}"));
                }
            }
        }
    }

    pub fn clear_errors(&mut self) {
        for field in &mut self.fields {
            field.invalid = false;
            field.error = None;
        }
        self.form_errors.clear();
    }

    /// Number of owner rows on a property form.
    pub fn owner_rows(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| owner_row(&f.name).is_some_and(|(prefix, _)| prefix == "owner_name"))
            .count()
    }

    /// Append an empty owner row after the existing ones and return its
    /// index.
    pub fn add_owner_row(&mut self) -> usize {
        let index = self.owner_rows();
        let at = self
            .fields
            .iter()
            .rposition(|f| owner_row(&f.name).is_some())
            .map_or(self.fields.len(), |last| last + 1);
        self.fields.splice(at..at, owner_row_fields(index));
        self.sync_owners_count();
        trace!(index, "owner row added");
        index
    }

    /// Remove owner row `index` and renumber the rows after it so the
    /// suffixes stay contiguous from zero.
    pub fn remove_owner_row(&mut self, index: usize) -> Result<(), FormError> {
        let rows = self.owner_rows();
        if index >= rows {
            return Err(FormError::UnknownField(format!("owner_name_{index}")));
        }
        if rows <= 1 {
            return Err(FormError::LastOwnerRow);
        }

        self.fields
            .retain(|f| owner_row(&f.name).is_none_or(|(_, row)| row != index));
        for field in &mut self.fields {
            if let Some((prefix, row)) = owner_row(&field.name) {
                if row > index {
                    field.name = format!("{prefix}_{}", row - 1);
                }
            }
        }
        self.sync_owners_count();
        trace!(index, "owner row removed");
        Ok(())
    }

    fn sync_owners_count(&mut self) {
        let count = self.owner_rows().to_string();
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == OWNERS_COUNT_FIELD) {
            field.value = count;
        }
    }

    /// Names of required, enabled fields that are still empty.
    pub fn missing_required(&self) -> Vec<&str> {
        let mut missing = Vec::new();
        for name in self.field_names() {
            let required = self
                .fields
                .iter()
                .any(|f| f.name == name && f.required && !f.disabled);
            if required && self.value(name).is_none_or(|v| v.trim().is_empty()) {
                missing.push(name);
            }
        }
        missing
    }
}

/// `owner_name_2` → `("owner_name", 2)`.
fn owner_row(name: &str) -> Option<(&'static str, usize)> {
    OWNER_ROW_FIELDS.iter().find_map(|prefix| {
        let row = name.strip_prefix(prefix)?.strip_prefix('_')?.parse().ok()?;
        Some((*prefix, row))
    })
}

fn owner_row_fields(index: usize) -> Vec<Field> {
    let control = |prefix: &str, kind: FieldKind, input_type: &str| {
        let mut field = Field::blank(format!("{prefix}_{index}"), kind);
        input_type.clone_into(&mut field.input_type);
        field
    };

    let id = control("owner_id", FieldKind::Hidden, "hidden");

    let mut name = control("owner_name", FieldKind::Input, "text");
    name.label = Some("Owner name".into());
    name.placeholder = Some("Owner's full name".into());
    name.required = true;

    let mut phone = control("owner_phone", FieldKind::Input, "text");
    phone.label = Some("Phone".into());
    phone.placeholder = Some("Mobile number".into());

    let mut ratio = control("owner_ratio", FieldKind::Input, "number");
    ratio.label = Some("Ownership (%)".into());
    ratio.value = "100".into();

    vec![id, name, phone, ratio]
}

// ── Parsing helpers ─────────────────────────────────────────────────

fn parse_attrs(raw: &str) -> HashMap<String, String> {
    ATTR_RE
        .captures_iter(raw)
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| unescape_html(m.as_str()))
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

fn apply_common(field: &mut Field, attrs: &HashMap<String, String>) {
    field.id = attrs.get("id").cloned();
    field.placeholder = attrs.get("placeholder").cloned();
    field.required = attrs.contains_key("required");
    field.disabled = attrs.contains_key("disabled");
    field.readonly = attrs.contains_key("readonly");
}

fn parse_input(raw: &str) -> Option<Field> {
    let attrs = parse_attrs(raw);
    let name = attrs.get("name").filter(|n| !n.is_empty())?.clone();
    let input_type = attrs
        .get("type")
        .map_or_else(|| "text".to_owned(), |t| t.to_ascii_lowercase());

    let kind = match input_type.as_str() {
        "submit" | "button" | "reset" | "image" => return None,
        "hidden" => FieldKind::Hidden,
        "checkbox" => FieldKind::Checkbox,
        "radio" => FieldKind::Radio,
        "file" => FieldKind::File,
        _ => FieldKind::Input,
    };

    let mut field = Field::blank(name, kind);
    apply_common(&mut field, &attrs);
    field.input_type = input_type;
    field.value = attrs.get("value").cloned().unwrap_or_default();
    field.checked = attrs.contains_key("checked");
    Some(field)
}

fn parse_select(raw: &str, body: &str) -> Option<Field> {
    let attrs = parse_attrs(raw);
    let name = attrs.get("name").filter(|n| !n.is_empty())?.clone();

    let mut field = Field::blank(name, FieldKind::Select);
    apply_common(&mut field, &attrs);
    field.input_type = "select".into();
    field.multiple = attrs.contains_key("multiple");
    field.options = OPTION_RE
        .captures_iter(body)
        .map(|caps| {
            let option_attrs = parse_attrs(&caps[1]);
            let label = text_content(caps.get(2).map_or("", |m| m.as_str()));
            SelectOption {
                value: option_attrs.get("value").cloned().unwrap_or_else(|| label.clone()),
                label,
                selected: option_attrs.contains_key("selected"),
                disabled: option_attrs.contains_key("disabled"),
            }
        })
        .collect();
    Some(field)
}

fn parse_textarea(raw: &str, body: &str) -> Option<Field> {
    let attrs = parse_attrs(raw);
    let name = attrs.get("name").filter(|n| !n.is_empty())?.clone();

    let mut field = Field::blank(name, FieldKind::Textarea);
    apply_common(&mut field, &attrs);
    field.input_type = "textarea".into();
    // A newline right after the opening tag is not part of the value.
    let body = body.strip_prefix("\r\n").or_else(|| body.strip_prefix('\n')).unwrap_or(body);
    field.value = unescape_html(body);
    Some(field)
}

fn parse_labels(html: &str) -> HashMap<String, String> {
    LABEL_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let attrs = parse_attrs(&caps[1]);
            let target = attrs.get("for")?.clone();
            let text = text_content(&caps[2]);
            let text = text.trim_end_matches(['*', ':', ' ']).trim().to_owned();
            (!text.is_empty()).then_some((target, text))
        })
        .collect()
}

/// Inner text of a markup fragment, whitespace collapsed.
pub fn text_content(html: &str) -> String {
    let stripped = TAG_RE.replace_all(html, " ");
    unescape_html(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape text for inclusion in markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Decode the entities Django's templates emit.
pub fn unescape_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let Some(end) = tail.find(';').filter(|&e| e <= 10) else {
            out.push('&');
            rest = &tail[1..];
            continue;
        };
        let entity = &tail[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        if let Some(ch) = decoded {
            out.push(ch);
            rest = &tail[end + 1..];
        } else {
            out.push('&');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const OWNER_FORM: &str = r#"
        <form method="post" id="ownerForm">
          <input type="hidden" name="csrfmiddlewaretoken" value="tok123">
          <label for="id_name">Name *</label>
          <input type="text" name="name" id="id_name" value="Li &amp; Co" required>
          <label for="id_community">Community</label>
          <select name="community" id="id_community" required>
            <option value="">---------</option>
            <option value="1" selected>Maple Court</option>
            <option value="2">Cedar Park</option>
          </select>
          <select name="property" id="id_property" disabled>
            <option value="">Select a community first</option>
          </select>
          <input type="checkbox" name="is_primary" value="yes">
          <input type="radio" name="gender" value="m" checked>
          <input type="radio" name="gender" value="f">
          <textarea name="notes" id="id_notes">
first line</textarea>
          <button type="submit">Save</button>
          <input type="submit" name="go" value="Go">
        </form>
    "#;

    #[test]
    fn parses_named_controls_in_order() {
        let form = FormDocument::parse(OWNER_FORM);
        assert_eq!(
            form.field_names(),
            [
                "csrfmiddlewaretoken",
                "name",
                "community",
                "property",
                "is_primary",
                "gender",
                "notes"
            ]
        );

        let name = form.field("name").unwrap();
        assert_eq!(name.value, "Li & Co");
        assert_eq!(name.label.as_deref(), Some("Name"));
        assert!(name.required);

        let community = form.field("community").unwrap();
        assert_eq!(community.options.len(), 3);
        assert_eq!(community.options[1].label, "Maple Court");
        assert_eq!(form.value("notes").as_deref(), Some("first line"));
        assert_eq!(form.hidden_value("csrfmiddlewaretoken"), Some("tok123"));
    }

    #[test]
    fn serialize_follows_form_data_rules() {
        let form = FormDocument::parse(OWNER_FORM);
        let payload = form.serialize();
        let pairs: Vec<(&str, &str)> = payload.iter().collect();

        assert_eq!(
            pairs,
            [
                ("csrfmiddlewaretoken", "tok123"),
                ("name", "Li & Co"),
                ("community", "1"),
                ("gender", "m"),
                ("notes", "first line"),
            ]
        );
    }

    #[test]
    fn set_value_handles_each_kind() {
        let mut form = FormDocument::parse(OWNER_FORM);
        form.set_value("community", "2").unwrap();
        form.set_value("is_primary", "true").unwrap();
        form.set_value("gender", "f").unwrap();
        form.set_value("name", "Zhang").unwrap();

        let payload = form.serialize();
        assert_eq!(payload.get("community"), Some("2"));
        assert_eq!(payload.get("is_primary"), Some("yes"));
        assert_eq!(payload.get_all("gender").collect::<Vec<_>>(), ["f"]);
        assert_eq!(payload.get("name"), Some("Zhang"));
    }

    #[test]
    fn set_value_rejects_bad_input() {
        let mut form = FormDocument::parse(OWNER_FORM);
        assert_eq!(
            form.set_value("missing", "x"),
            Err(FormError::UnknownField("missing".into()))
        );
        assert!(matches!(
            form.set_value("community", "99"),
            Err(FormError::UnknownOption { .. })
        ));
        assert_eq!(
            form.set_value("property", "1"),
            Err(FormError::Disabled("property".into()))
        );
    }

    #[test]
    fn field_errors_mark_fields_and_keep_unknown_names() {
        let mut form = FormDocument::parse(OWNER_FORM);
        let mut errors = FieldErrors::new();
        errors.insert("name".into(), "This field is required.".into());
        errors.insert("phone".into(), "Enter a valid phone.".into());
        errors.insert(NON_FIELD_ERRORS.into(), "Duplicate owner.".into());
        form.apply_field_errors(&errors);

        let name = form.field("name").unwrap();
        assert!(name.invalid);
        assert_eq!(name.error.as_deref(), Some("This field is required."));
        assert_eq!(
            form.form_errors(),
            ["phone: Enter a valid phone.", "Duplicate owner."]
        );

        // A second round clears the first one's markings.
        let mut errors = FieldErrors::new();
        errors.insert("community".into(), "Pick one.".into());
        form.apply_field_errors(&errors);
        assert!(!form.field("name").unwrap().invalid);
        assert!(form.field("community").unwrap().invalid);
        assert!(form.form_errors().is_empty());
    }

    #[test]
    fn replace_options_keeps_offered_selection() {
        let mut form = FormDocument::parse(OWNER_FORM);
        form.replace_options(
            "community",
            vec![SelectOption::new("", "---------"), SelectOption::new("1", "Maple Court")],
        )
        .unwrap();
        assert_eq!(form.value("community").as_deref(), Some("1"));

        form.replace_options("community", vec![SelectOption::new("3", "Birch Row")])
            .unwrap();
        // Nothing selected: a single select falls back to its first option.
        assert_eq!(form.value("community").as_deref(), Some("3"));
    }

    #[test]
    fn missing_required_ignores_filled_fields() {
        let mut form = FormDocument::parse(OWNER_FORM);
        assert!(form.missing_required().is_empty());
        form.set_value("name", "  ").unwrap();
        form.set_value("community", "").unwrap();
        assert_eq!(form.missing_required(), ["name", "community"]);
    }

    const PROPERTY_FORM: &str = r#"
        <input type="text" name="room_number" value="A-101">
        <input type="hidden" name="owners_count" id="owners-count" value="1">
        <div id="owners-list">
          <div class="owner-row">
            <input type="hidden" name="owner_id_0" value="31">
            <input type="text" name="owner_name_0" value="Li Wei" required>
            <input type="text" name="owner_phone_0" value="13800000000">
            <input type="number" name="owner_ratio_0" value="100">
          </div>
        </div>
        <textarea name="remarks"></textarea>
    "#;

    #[test]
    fn owner_rows_are_appended_after_the_last_row() {
        let mut form = FormDocument::parse(PROPERTY_FORM);
        assert_eq!(form.owner_rows(), 1);

        assert_eq!(form.add_owner_row(), 1);
        assert_eq!(form.owner_rows(), 2);
        assert_eq!(form.value("owners_count").as_deref(), Some("2"));
        assert_eq!(form.value("owner_ratio_1").as_deref(), Some("100"));
        assert!(form.field("owner_name_1").unwrap().required);
        assert_eq!(
            form.field_names(),
            [
                "room_number",
                "owners_count",
                "owner_id_0",
                "owner_name_0",
                "owner_phone_0",
                "owner_ratio_0",
                "owner_id_1",
                "owner_name_1",
                "owner_phone_1",
                "owner_ratio_1",
                "remarks"
            ]
        );
    }

    #[test]
    fn removing_an_owner_row_renumbers_the_rest() {
        let mut form = FormDocument::parse(PROPERTY_FORM);
        form.add_owner_row();
        form.add_owner_row();
        form.set_value("owner_name_1", "Zhang Min").unwrap();
        form.set_value("owner_name_2", "Chen Jie").unwrap();

        form.remove_owner_row(0).unwrap();

        assert_eq!(form.owner_rows(), 2);
        assert_eq!(form.value("owners_count").as_deref(), Some("2"));
        assert_eq!(form.value("owner_name_0").as_deref(), Some("Zhang Min"));
        assert_eq!(form.value("owner_name_1").as_deref(), Some("Chen Jie"));
        assert!(form.field("owner_name_2").is_none());
        assert!(form.field("owner_id_2").is_none());
    }

    #[test]
    fn last_owner_row_is_kept() {
        let mut form = FormDocument::parse(PROPERTY_FORM);
        assert_eq!(form.remove_owner_row(0), Err(FormError::LastOwnerRow));
        assert_eq!(
            form.remove_owner_row(4),
            Err(FormError::UnknownField("owner_name_4".into()))
        );
        assert_eq!(form.value("owner_name_0").as_deref(), Some("Li Wei"));
        assert_eq!(form.value("owners_count").as_deref(), Some("1"));
    }

    #[test]
    fn escape_and_unescape() {
        assert_eq!(escape_html(r#"<b>"A&B"</b>"#), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
        assert_eq!(unescape_html("a &lt; b &#39;c&#x27; &unknown; &"), "a < b 'c' &unknown; &");
    }
}
