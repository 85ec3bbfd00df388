/// Serialized form fields, in document order.
///
/// Mirrors browser `FormData` semantics: a name may repeat (multi-selects,
/// checkbox groups) and order is preserved. Converted to a multipart body
/// at submit time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    entries: Vec<(String, String)>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Existing entries with the same name are kept.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replace every entry named `name` with a single value.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.entries.retain(|(n, _)| n != name);
        self.entries.push((name.to_owned(), value.into()));
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name`, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the multipart body sent to the Form Service.
    pub fn to_multipart(&self) -> reqwest::multipart::Form {
        self.entries
            .iter()
            .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                form.text(name.clone(), value.clone())
            })
    }
}

impl FromIterator<(String, String)> for FormPayload {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_names_keep_order() {
        let mut payload = FormPayload::new();
        payload.push("owners", "1");
        payload.push("name", "Block A");
        payload.push("owners", "7");

        assert_eq!(payload.get("owners"), Some("1"));
        assert_eq!(payload.get_all("owners").collect::<Vec<_>>(), ["1", "7"]);
        assert_eq!(payload.len(), 3);
    }

    #[test]
    fn set_replaces_all_values() {
        let mut payload = FormPayload::new();
        payload.push("status", "unpaid");
        payload.push("status", "partial");
        payload.set("status", "paid");

        assert_eq!(payload.get_all("status").collect::<Vec<_>>(), ["paid"]);
    }
}
