use crate::api::{NewPermission, NewUser};

/// Which add flow a form belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    AddUser,
    AddPermission,
}

impl FormKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::AddUser => "Add User",
            Self::AddPermission => "Add Permission",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub value: String,
    pub masked: bool,
    pub required: bool,
}

impl FormField {
    fn new(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            value: String::new(),
            masked: false,
            required: true,
        }
    }

    fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    fn with_value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    /// Value as it may be shown on screen.
    pub fn display_value(&self) -> String {
        if self.masked {
            "•".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }
}

/// One-to-one copy of form inputs into preview slots.
///
/// Each pair maps a source field name to the preview column it fills. The
/// copy is made on every keystroke, so the preview never lags the inputs.
#[derive(Debug, Clone)]
pub struct InlineMirror {
    pairs: Vec<(&'static str, &'static str)>,
}

impl InlineMirror {
    pub fn new(pairs: Vec<(&'static str, &'static str)>) -> Self {
        Self { pairs }
    }

    /// Preview `(column, value)` pairs; unknown sources mirror as empty.
    pub fn apply(&self, fields: &[FormField]) -> Vec<(&'static str, String)> {
        self.pairs
            .iter()
            .map(|(source, target)| {
                let value = fields
                    .iter()
                    .find(|f| f.name == *source)
                    .map(FormField::display_value)
                    .unwrap_or_default();
                (*target, value)
            })
            .collect()
    }
}

/// Text form with a focused field and a live preview.
#[derive(Debug, Clone)]
pub struct Form {
    kind: FormKind,
    fields: Vec<FormField>,
    focus: usize,
    mirror: InlineMirror,
}

impl Form {
    pub fn add_user() -> Self {
        Self {
            kind: FormKind::AddUser,
            fields: vec![
                FormField::new("username", "Username"),
                FormField::new("email", "Email").optional(),
                FormField::new("password", "Password").masked(),
                FormField::new("role", "Role").with_value("user"),
            ],
            focus: 0,
            mirror: InlineMirror::new(vec![
                ("username", "User"),
                ("email", "Email"),
                ("role", "Role"),
            ]),
        }
    }

    pub fn add_permission() -> Self {
        Self {
            kind: FormKind::AddPermission,
            fields: vec![
                FormField::new("name", "Name"),
                FormField::new("category", "Category").with_value("general"),
            ],
            focus: 0,
            mirror: InlineMirror::new(vec![("name", "Permission"), ("category", "Category")]),
        }
    }

    pub fn for_kind(kind: FormKind) -> Self {
        match kind {
            FormKind::AddUser => Self::add_user(),
            FormKind::AddPermission => Self::add_permission(),
        }
    }

    pub fn kind(&self) -> FormKind {
        self.kind
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.pop();
        }
    }

    pub fn value(&self, name: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.trim())
            .unwrap_or("")
    }

    /// Label of the first required field left blank.
    pub fn missing_required(&self) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|f| f.required && f.value.trim().is_empty())
            .map(|f| f.label)
    }

    pub fn preview(&self) -> Vec<(&'static str, String)> {
        self.mirror.apply(&self.fields)
    }

    pub fn to_new_user(&self) -> NewUser {
        NewUser {
            username: self.value("username").to_string(),
            email: self.value("email").to_string(),
            // Passwords are sent as typed.
            password: self
                .fields
                .iter()
                .find(|f| f.name == "password")
                .map(|f| f.value.clone())
                .unwrap_or_default(),
            role: self.value("role").to_string(),
        }
    }

    pub fn to_new_permission(&self) -> NewPermission {
        NewPermission {
            name: self.value("name").to_string(),
            category: self.value("category").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(form: &mut Form, s: &str) {
        for c in s.chars() {
            form.push_char(c);
        }
    }

    #[test]
    fn test_mirror_copies_each_keystroke() {
        let mut form = Form::add_user();
        type_str(&mut form, "sa");
        assert_eq!(form.preview()[0], ("User", "sa".to_string()));

        type_str(&mut form, "lem");
        form.pop_char();
        assert_eq!(form.preview()[0], ("User", "sale".to_string()));
        assert_eq!(form.preview()[2], ("Role", "user".to_string()));
    }

    #[test]
    fn test_masked_field_never_mirrors_plaintext() {
        let mirror = InlineMirror::new(vec![("password", "Secret")]);
        let mut form = Form::add_user();
        form.focus_next();
        form.focus_next();
        type_str(&mut form, "hunter2");

        assert_eq!(mirror.apply(form.fields()), vec![("Secret", "•••••••".to_string())]);
        assert_eq!(form.to_new_user().password, "hunter2");
    }

    #[test]
    fn test_unknown_mirror_source_is_empty() {
        let mirror = InlineMirror::new(vec![("missing", "Target")]);
        let form = Form::add_permission();
        assert_eq!(mirror.apply(form.fields()), vec![("Target", String::new())]);
    }

    #[test]
    fn test_focus_wraps() {
        let mut form = Form::add_permission();
        assert_eq!(form.focus(), 0);
        form.focus_prev();
        assert_eq!(form.focus(), 1);
        form.focus_next();
        assert_eq!(form.focus(), 0);
    }

    #[test]
    fn test_missing_required() {
        let mut form = Form::add_user();
        assert_eq!(form.missing_required(), Some("Username"));

        type_str(&mut form, "nour");
        assert_eq!(form.missing_required(), Some("Password"));

        form.focus_next();
        form.focus_next();
        type_str(&mut form, "pw");
        assert_eq!(form.missing_required(), None);
    }

    #[test]
    fn test_to_new_permission_trims() {
        let mut form = Form::for_kind(FormKind::AddPermission);
        type_str(&mut form, "  news  ");
        let permission = form.to_new_permission();
        assert_eq!(permission.name, "news");
        assert_eq!(permission.category, "general");
    }
}
