use crate::credentials::{validate_api_key, CredentialStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsTab {
    ApiKey,
    Appearance,
    About,
}

impl SettingsTab {
    pub const ALL: [SettingsTab; 3] = [
        SettingsTab::ApiKey,
        SettingsTab::Appearance,
        SettingsTab::About,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SettingsTab::ApiKey => "API Key",
            SettingsTab::Appearance => "Appearance",
            SettingsTab::About => "About",
        }
    }
}

/// State of the settings overlay. Only the API Key tab does anything; the
/// others show static placeholder text.
#[derive(Debug, Default)]
pub struct SettingsPanel {
    pub visible: bool,
    pub tab_index: usize,
    pub input: String,
    pub field_error: Option<String>,
    pub feedback: Option<String>,
}

impl SettingsPanel {
    pub fn open(&mut self) {
        self.visible = true;
        self.tab_index = 0;
        self.input.clear();
        self.field_error = None;
        self.feedback = None;
    }

    pub fn close(&mut self) {
        self.visible = false;
    }

    pub fn current_tab(&self) -> SettingsTab {
        SettingsTab::ALL[self.tab_index]
    }

    pub fn next_tab(&mut self) {
        self.tab_index = (self.tab_index + 1) % SettingsTab::ALL.len();
    }

    pub fn previous_tab(&mut self) {
        self.tab_index = if self.tab_index == 0 {
            SettingsTab::ALL.len() - 1
        } else {
            self.tab_index - 1
        };
    }

    pub fn push_char(&mut self, c: char) {
        self.input.push(c);
        self.field_error = None;
    }

    pub fn backspace(&mut self) {
        self.input.pop();
        self.field_error = None;
    }

    /// Validate the typed key and store it. Returns whether the save took
    /// effect; a rejected key leaves the stored credential unchanged and
    /// sets the field error.
    pub fn save(&mut self, store: &mut dyn CredentialStore) -> bool {
        let candidate = self.input.trim();
        if let Err(e) = validate_api_key(candidate) {
            self.field_error = Some(e.to_string());
            return false;
        }
        match store.set(candidate) {
            Ok(()) => {
                self.input.clear();
                self.field_error = None;
                self.feedback = Some("API key saved".to_string());
                true
            }
            Err(e) => {
                self.field_error = Some(e.to_string());
                false
            }
        }
    }

    pub fn remove(&mut self, store: &mut dyn CredentialStore) -> bool {
        match store.remove() {
            Ok(()) => {
                self.field_error = None;
                self.feedback = Some("API key removed".to_string());
                true
            }
            Err(e) => {
                self.field_error = Some(e.to_string());
                false
            }
        }
    }
}
